//! Runs a scheduled rule over every listed entity.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tollgate_core::EntityId;

use super::{EntityContextBuilder, EntityManagement, IdentityDataProvider, ScheduledRule};
use crate::error::BulkError;

/// An entity the rule could not be applied to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityFailure {
    pub entity: EntityId,
    pub message: String,
}

/// Summary of one bulk run.
#[derive(Debug, Clone, Serialize)]
pub struct BulkRunReport {
    pub rule_id: String,
    pub started: DateTime<Utc>,
    pub finished: DateTime<Utc>,
    /// Entities the rule was evaluated for.
    pub processed: usize,
    /// Entities whose condition held and whose action succeeded.
    pub matched: usize,
    pub failures: Vec<EntityFailure>,
}

pub struct BulkProcessor<'a> {
    provider: &'a dyn IdentityDataProvider,
    management: &'a dyn EntityManagement,
}

impl<'a> BulkProcessor<'a> {
    pub fn new(provider: &'a dyn IdentityDataProvider, management: &'a dyn EntityManagement) -> Self {
        Self {
            provider,
            management,
        }
    }

    /// Apply `rule` to every entity. Only a failure to list entities aborts the run.
    pub fn run(&self, rule: &ScheduledRule) -> Result<BulkRunReport, BulkError> {
        let started = Utc::now();
        let entities = self
            .provider
            .list_entities()
            .map_err(|e| BulkError::Listing(format!("{:#}", e)))?;
        tracing::info!(
            "Running scheduled rule {} ({}) over {} entities",
            rule.id(),
            rule.action_name(),
            entities.len()
        );

        let contexts = EntityContextBuilder::new(self.provider);
        let mut report = BulkRunReport {
            rule_id: rule.id().to_string(),
            started,
            finished: started,
            processed: 0,
            matched: 0,
            failures: Vec::new(),
        };

        for entity in entities {
            report.processed += 1;
            let outcome = contexts
                .build(entity)
                .and_then(|context| rule.apply(&context, self.management));
            match outcome {
                Ok(true) => report.matched += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!("Scheduled rule {} failed: {}", rule.id(), e);
                    report.failures.push(EntityFailure {
                        entity,
                        message: e.to_string(),
                    });
                }
            }
        }

        report.finished = Utc::now();
        tracing::info!(
            "Scheduled rule {} finished: {} processed, {} matched, {} failed",
            report.rule_id,
            report.processed,
            report.matched,
            report.failures.len()
        );
        Ok(report)
    }
}
