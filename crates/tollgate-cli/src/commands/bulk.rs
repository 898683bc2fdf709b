//! `tollgate bulk` - run a scheduled rule over a directory snapshot.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use tollgate_core::{EngineConfig, ScheduledRuleDefinition};
use tollgate_engine::{BulkProcessor, BulkRunReport, InMemoryDirectory, ScheduledRule};

use super::Workspace;

pub fn run(config: Option<&EngineConfig>, rule: &str, directory_path: &Path, write: bool) -> Result<()> {
    let workspace = Workspace::open(config)?;
    let definition = find_rule(config, rule)?;
    let rule = ScheduledRule::compile(definition, &workspace.registry, workspace.repository.catalog())
        .with_context(|| format!("Invalid scheduled rule '{}'", rule))?;

    let directory = InMemoryDirectory::from_file(directory_path)?;
    let report = execute(&rule, &directory)?;

    println!("📋 Report:");
    println!("{}", serde_json::to_string_pretty(&report)?);

    let snapshot = directory.to_json()?;
    if write {
        fs::write(directory_path, &snapshot)
            .with_context(|| format!("Failed to write directory snapshot: {:?}", directory_path))?;
        println!("\n💾 Directory written to {}", directory_path.display());
    } else {
        println!("\n📁 Directory:");
        println!("{}", snapshot);
    }
    Ok(())
}

/// Resolve `reference` as a rule document path first, then as a rule id from the configuration.
fn find_rule(config: Option<&EngineConfig>, reference: &str) -> Result<ScheduledRuleDefinition> {
    let path = Path::new(reference);
    if path.is_file() {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read scheduled rule: {:?}", path))?;
        return ScheduledRuleDefinition::from_json(&content)
            .with_context(|| format!("Failed to parse scheduled rule: {:?}", path));
    }

    let config = config.ok_or_else(|| {
        anyhow!("'{}' is not a file and no configuration was given to look it up", reference)
    })?;
    config
        .scheduled_rules()
        .context("Failed to load scheduled rules")?
        .into_iter()
        .find(|r| r.id == reference)
        .ok_or_else(|| anyhow!("No scheduled rule with id '{}'", reference))
}

fn execute(rule: &ScheduledRule, directory: &InMemoryDirectory) -> Result<BulkRunReport> {
    BulkProcessor::new(directory, directory)
        .run(rule)
        .with_context(|| format!("Scheduled rule '{}' could not run", rule.id()))
}
