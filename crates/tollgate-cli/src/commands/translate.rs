//! `tollgate translate` - run one profile over a context document.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tollgate_core::EngineConfig;
use tollgate_engine::{DEFAULT_OUTPUT_PROFILE, Profile, TranslationContext, TranslationResult};

use super::Workspace;

pub fn run(
    config: Option<&EngineConfig>,
    profile: Option<&str>,
    context_path: &Path,
    default_output: bool,
) -> Result<()> {
    let workspace = Workspace::open(config)?;
    for (path, err) in &workspace.load_report.failures {
        tracing::warn!("Skipped profile {}: {}", path.display(), err);
    }

    let profile = if default_output {
        select(&workspace, DEFAULT_OUTPUT_PROFILE)?
    } else {
        match profile {
            Some(reference) => select(&workspace, reference)?,
            None => bail!("Either --profile or --default-output is required"),
        }
    };

    let content = fs::read_to_string(context_path)
        .with_context(|| format!("Failed to read context file: {:?}", context_path))?;
    let context = TranslationContext::from_json(&content)
        .with_context(|| format!("Failed to parse context file: {:?}", context_path))?;

    let result = translate(&workspace, &profile, &context)?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

/// Resolve `reference` as a document path first, then as an installed profile name.
fn select(workspace: &Workspace, reference: &str) -> Result<Arc<Profile>> {
    let path = Path::new(reference);
    if path.is_file() {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read profile: {:?}", path))?;
        let profile = workspace
            .repository
            .install_json(&content)
            .with_context(|| format!("Invalid profile {:?}", path))?;
        return Ok(profile);
    }

    match workspace.repository.get(reference) {
        Some(profile) => Ok(profile),
        None => {
            let known = workspace.repository.names().join(", ");
            bail!("Profile '{}' is neither a file nor an installed profile (installed: {})", reference, known)
        }
    }
}

fn translate(
    workspace: &Workspace,
    profile: &Profile,
    context: &TranslationContext,
) -> Result<TranslationResult> {
    workspace
        .engine()
        .translate(profile, context)
        .with_context(|| format!("Translation with profile '{}' failed", profile.name()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PROFILE: &str = r#"{
      "ver": "2",
      "name": "release",
      "type": "OUTPUT",
      "rules": [
        {"condition": {"conditionValue": "true"},
         "action": {"name": "includeOutputProfile", "parameters": ["sys:default"]}},
        {"condition": {"conditionValue": "group('/staff')"},
         "action": {"name": "createAttribute", "parameters": ["role", "'staff'"]}}
      ]
    }"#;

    #[test]
    fn test_file_profile_can_include_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("release.json");
        fs::write(&path, PROFILE).unwrap();

        let workspace = Workspace::open(None).unwrap();
        let profile = select(&workspace, path.to_str().unwrap()).unwrap();
        let context = TranslationContext::new().with_groups(["/", "/staff"]);
        let result = translate(&workspace, &profile, &context).unwrap();

        assert_eq!(result.attribute_values("role"), Some(&["staff".to_string()][..]));
        assert_eq!(
            result.attribute_values("memberOf"),
            Some(&["/".to_string(), "/staff".to_string()][..])
        );
    }

    #[test]
    fn test_unknown_reference() {
        let workspace = Workspace::open(None).unwrap();
        let err = select(&workspace, "missing").unwrap_err();
        assert!(err.to_string().contains("sys:default"));
        assert!(select(&workspace, DEFAULT_OUTPUT_PROFILE).is_ok());
    }
}
