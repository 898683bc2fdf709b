//! `tollgate check` command implementation.
//!
//! Validates profile and scheduled rule documents:
//! - JSON Schema validation against the schemas in `schemas/`
//! - Compilation against the action registry and schema catalog
//! - Cross-document checks (duplicate names and ids, included profiles)

use anyhow::{Context, Result, bail};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tollgate_core::{EngineConfig, ProfileDefinition, ScheduledRuleDefinition};
use tollgate_engine::{ConfigurationError, ScheduledRule};

use super::Workspace;

// ============================================================================
// Embedded JSON Schemas
// ============================================================================

mod embedded_schemas {
    pub const TRANSLATION_PROFILE: &str =
        include_str!("../../../../schemas/TranslationProfile.schema.json");
    pub const SCHEDULED_RULE: &str = include_str!("../../../../schemas/ScheduledRule.schema.json");
}

// ============================================================================
// Check Result Types
// ============================================================================

/// Severity level for check results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Warning => write!(f, "WARN"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// A single check finding.
#[derive(Debug, Clone)]
pub struct CheckFinding {
    pub severity: Severity,
    /// Category of the check that produced this finding.
    pub category: String,
    pub message: String,
    pub file: Option<PathBuf>,
    /// Location within the document, e.g. "/rules/2" or "rules[2]".
    pub location: Option<String>,
}

impl CheckFinding {
    fn error(category: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, category, message)
    }

    fn warning(category: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, category, message)
    }

    fn info(category: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, category, message)
    }

    fn new(severity: Severity, category: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            category: category.into(),
            message: message.into(),
            file: None,
            location: None,
        }
    }

    fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

/// Results from running all checks.
#[derive(Debug, Default)]
pub struct CheckResults {
    pub findings: Vec<CheckFinding>,
}

impl CheckResults {
    fn add(&mut self, finding: CheckFinding) {
        self.findings.push(finding);
    }

    fn extend(&mut self, findings: impl IntoIterator<Item = CheckFinding>) {
        self.findings.extend(findings);
    }

    pub fn has_errors(&self) -> bool {
        self.findings.iter().any(|f| f.severity == Severity::Error)
    }

    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    fn count(&self, severity: Severity) -> usize {
        self.findings.iter().filter(|f| f.severity == severity).count()
    }

    /// Print human-readable summary.
    pub fn print_summary(&self) {
        let group = |severity: Severity| {
            let mut findings: Vec<_> = self
                .findings
                .iter()
                .filter(|f| f.severity == severity)
                .collect();
            findings.sort_by(|a, b| a.category.cmp(&b.category));
            findings
        };
        let errors = group(Severity::Error);
        let warnings = group(Severity::Warning);
        let infos = group(Severity::Info);

        if !errors.is_empty() {
            println!("\n❌ Errors ({}):", errors.len());
            println!("{}", "─".repeat(60));
            for finding in &errors {
                print_finding(finding);
            }
        }

        if !warnings.is_empty() {
            println!("\n⚠️  Warnings ({}):", warnings.len());
            println!("{}", "─".repeat(60));
            for finding in &warnings {
                print_finding(finding);
            }
        }

        // Info only when nothing else is reported
        if !infos.is_empty() && errors.is_empty() && warnings.is_empty() {
            println!("\nℹ️  Info ({}):", infos.len());
            println!("{}", "─".repeat(60));
            for finding in &infos {
                print_finding(finding);
            }
        }

        println!();
        println!("{}", "═".repeat(60));
        if errors.is_empty() && warnings.is_empty() {
            println!("✅ All checks passed!");
        } else {
            println!(
                "Summary: {} error(s), {} warning(s)",
                errors.len(),
                warnings.len()
            );
        }
    }
}

fn print_finding(finding: &CheckFinding) {
    let icon = match finding.severity {
        Severity::Error => "✗",
        Severity::Warning => "⚠",
        Severity::Info => "ℹ",
    };

    let location = match (&finding.file, &finding.location) {
        (Some(f), Some(l)) => format!(" [{}:{}]", f.display(), l),
        (Some(f), None) => format!(" [{}]", f.display()),
        (None, Some(l)) => format!(" [{}]", l),
        (None, None) => String::new(),
    };

    println!(
        "  {} [{}]{}: {}",
        icon, finding.category, location, finding.message
    );
}

// ============================================================================
// Main Check Runner
// ============================================================================

/// Check `files`, or every document the configuration references when `files` is empty.
pub fn run(config: Option<&EngineConfig>, files: &[PathBuf]) -> Result<()> {
    println!("🔍 Checking Tollgate documents...");

    let files = if files.is_empty() {
        match config {
            Some(config) => configured_documents(config)?,
            None => bail!("No files given and no configuration to take them from"),
        }
    } else {
        files.to_vec()
    };

    let results = check_documents(config, &files)?;
    results.print_summary();

    if results.has_errors() {
        bail!("Check failed with {} error(s)", results.error_count());
    }
    Ok(())
}

fn configured_documents(config: &EngineConfig) -> Result<Vec<PathBuf>> {
    let mut files = config
        .profile_paths()
        .context("Failed to list profile documents")?;
    files.extend(config.scheduled_rules_file.iter().cloned());
    Ok(files)
}

/// Run every check over `files` without printing.
pub fn check_documents(config: Option<&EngineConfig>, files: &[PathBuf]) -> Result<CheckResults> {
    let schemas = Schemas::load()?;
    let workspace = Workspace::empty(config)?;
    let mut checker = Checker {
        schemas,
        workspace,
        profiles: HashMap::new(),
        rule_ids: HashMap::new(),
        results: CheckResults::default(),
    };

    for file in files {
        checker.check_file(file);
    }
    checker.check_includes();

    let Checker {
        profiles,
        rule_ids,
        mut results,
        ..
    } = checker;
    results.add(CheckFinding::info(
        "summary",
        format!(
            "{} profile(s) and {} scheduled rule(s) checked",
            profiles.len(),
            rule_ids.len()
        ),
    ));
    Ok(results)
}

// ============================================================================
// Document Checks
// ============================================================================

struct Schemas {
    profile: jsonschema::Validator,
    scheduled_rule: jsonschema::Validator,
}

impl Schemas {
    fn load() -> Result<Self> {
        let compile = |name: &str, content: &str| -> Result<jsonschema::Validator> {
            let schema: JsonValue = serde_json::from_str(content)
                .with_context(|| format!("Failed to parse embedded schema: {}", name))?;
            jsonschema::validator_for(&schema)
                .map_err(|e| anyhow::anyhow!("Failed to compile embedded schema {}: {}", name, e))
        };
        Ok(Self {
            profile: compile("TranslationProfile", embedded_schemas::TRANSLATION_PROFILE)?,
            scheduled_rule: compile("ScheduledRule", embedded_schemas::SCHEDULED_RULE)?,
        })
    }
}

struct Checker {
    schemas: Schemas,
    workspace: Workspace,
    /// Profile name to the file that defined it.
    profiles: HashMap<String, PathBuf>,
    /// Scheduled rule id to the file that defined it.
    rule_ids: HashMap<String, PathBuf>,
    results: CheckResults,
}

impl Checker {
    fn check_file(&mut self, path: &Path) {
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                self.results.add(
                    CheckFinding::error("io", format!("Failed to read file: {}", e)).with_file(path),
                );
                return;
            }
        };
        let document: JsonValue = match serde_json::from_str(&content) {
            Ok(v) => v,
            Err(e) => {
                self.results.add(
                    CheckFinding::error("json", format!("Failed to parse JSON: {}", e))
                        .with_file(path),
                );
                return;
            }
        };

        match &document {
            JsonValue::Array(rules) => {
                for (index, rule) in rules.iter().enumerate() {
                    self.check_scheduled_rule(path, rule, &format!("/{}", index));
                }
            }
            JsonValue::Object(map) if map.contains_key("cronExpression") => {
                self.check_scheduled_rule(path, &document, "")
            }
            _ => self.check_profile(path, &document),
        }
    }

    fn check_profile(&mut self, path: &Path, document: &JsonValue) {
        let schema_findings = schema_findings(&self.schemas.profile, document, path, "");
        if !schema_findings.is_empty() {
            self.results.extend(schema_findings);
            return;
        }

        let definition: ProfileDefinition = match serde_json::from_value(document.clone()) {
            Ok(d) => d,
            Err(e) => {
                self.results.add(
                    CheckFinding::error("profile", format!("Malformed profile: {}", e))
                        .with_file(path),
                );
                return;
            }
        };

        let name = definition.name.clone();
        match self.workspace.repository.install(definition) {
            Ok(_) => {
                if let Some(previous) = self.profiles.insert(name.clone(), path.to_path_buf()) {
                    self.results.add(
                        CheckFinding::warning(
                            "duplicate-name",
                            format!(
                                "Profile '{}' is also defined in {}; the later document wins",
                                name,
                                previous.display()
                            ),
                        )
                        .with_file(path),
                    );
                }
            }
            Err(e) => self.results.add(configuration_finding("profile", &e, path)),
        }
    }

    fn check_scheduled_rule(&mut self, path: &Path, document: &JsonValue, pointer: &str) {
        let schema_findings = schema_findings(&self.schemas.scheduled_rule, document, path, pointer);
        if !schema_findings.is_empty() {
            self.results.extend(schema_findings);
            return;
        }

        let definition: ScheduledRuleDefinition = match serde_json::from_value(document.clone()) {
            Ok(d) => d,
            Err(e) => {
                self.results.add(
                    CheckFinding::error("scheduled-rule", format!("Malformed rule: {}", e))
                        .with_file(path),
                );
                return;
            }
        };

        let id = definition.id.clone();
        if let Some(previous) = self.rule_ids.insert(id.clone(), path.to_path_buf()) {
            self.results.add(
                CheckFinding::error(
                    "duplicate-id",
                    format!(
                        "Scheduled rule id '{}' is already used in {}",
                        id,
                        previous.display()
                    ),
                )
                .with_file(path),
            );
        }

        let compiled = ScheduledRule::compile(
            definition,
            &self.workspace.registry,
            self.workspace.repository.catalog(),
        );
        if let Err(e) = compiled {
            self.results.add(
                CheckFinding::error("scheduled-rule", e.to_string())
                    .with_file(path)
                    .with_location(id),
            );
        }
    }

    /// Every include must name a checked (or built-in) profile of the same kind.
    fn check_includes(&mut self) {
        for (name, path) in &self.profiles {
            let Some(profile) = self.workspace.repository.get(name) else {
                continue;
            };
            for (index, rule) in profile.rules().iter().enumerate() {
                let Some(included) = rule.action().included_profile() else {
                    continue;
                };
                let location = format!("rules[{}]", index);
                match self.workspace.repository.get(included) {
                    None => self.results.add(
                        CheckFinding::warning(
                            "include",
                            format!("Included profile '{}' is not among the checked documents", included),
                        )
                        .with_file(path)
                        .with_location(location),
                    ),
                    Some(target) if target.kind() != profile.kind() => self.results.add(
                        CheckFinding::error(
                            "include",
                            format!(
                                "Included profile '{}' is {}, expected {}",
                                included,
                                target.kind(),
                                profile.kind()
                            ),
                        )
                        .with_file(path)
                        .with_location(location),
                    ),
                    Some(_) => {}
                }
            }
        }
    }
}

fn schema_findings(
    validator: &jsonschema::Validator,
    document: &JsonValue,
    path: &Path,
    pointer: &str,
) -> Vec<CheckFinding> {
    validator
        .iter_errors(document)
        .map(|error| {
            let instance_path = format!("{}{}", pointer, error.instance_path());
            let location = if instance_path.is_empty() {
                "(root)".to_string()
            } else {
                instance_path
            };
            CheckFinding::error("json-schema", error.to_string())
                .with_file(path)
                .with_location(location)
        })
        .collect()
}

fn configuration_finding(category: &str, err: &ConfigurationError, path: &Path) -> CheckFinding {
    let finding = CheckFinding::error(category, err.to_string()).with_file(path);
    match err.rule_index() {
        Some(index) => finding.with_location(format!("rules[{}]", index)),
        None => finding,
    }
}
