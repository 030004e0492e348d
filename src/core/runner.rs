use crate::adapters::console::ConsoleClient;
use crate::config::RunConfig;
use crate::core::reconcile::{reconcile, Decision, EntityDecision, ReconcileStatus, Reconciliation};
use crate::domain::model::{Entity, Outcome, RunResult, WorkItem};
use crate::domain::ports::ArtifactSource;
use crate::utils::error::{Result, VspcError};
use futures::StreamExt;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub created: usize,
    pub would_create: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl RunSummary {
    fn from_results(results: &[RunResult]) -> Self {
        let mut summary = Self::default();
        for result in results {
            match result.outcome {
                Outcome::Created { .. } => summary.created += 1,
                Outcome::SkippedDryRun => summary.would_create += 1,
                Outcome::SkippedAlreadyExists | Outcome::SkippedNotTargeted => summary.skipped += 1,
                Outcome::Failed { .. } => summary.failed += 1,
            }
        }
        summary
    }
}

/// Result of a complete run in listing order. Companies outside the target only appear
/// in verbose runs.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub status: ReconcileStatus,
    pub results: Vec<RunResult>,
    pub summary: RunSummary,
    pub dry_run: bool,
}

impl RunReport {
    pub fn failures(&self) -> impl Iterator<Item = (&Entity, &str)> {
        self.results.iter().filter_map(|r| match &r.outcome {
            Outcome::Failed { reason } => Some((&r.entity, reason.as_str())),
            _ => None,
        })
    }

    /// The run completed but the requested company does not exist.
    pub fn target_error(&self) -> Option<VspcError> {
        match &self.status {
            ReconcileStatus::TargetNotFound { name, available } => Some(VspcError::TargetNotFound {
                name: name.clone(),
                available: available.clone(),
            }),
            _ => None,
        }
    }

    /// Per-company failures do not change the exit code; an unknown target does.
    pub fn exit_code(&self) -> i32 {
        match self.status {
            ReconcileStatus::TargetNotFound { .. } => 2,
            _ => 0,
        }
    }
}

/// Runs login, listing, reconciliation and creation for one console.
pub struct ReportRunner<A: ArtifactSource> {
    source: A,
    config: RunConfig,
}

impl<A: ArtifactSource> ReportRunner<A> {
    pub fn new(source: A, config: RunConfig) -> Self {
        Self { source, config }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub async fn run(&self) -> Result<RunReport> {
        let artifacts = self
            .source
            .extract(&self.config.console.base_url, &self.config.credentials)
            .await?;
        let client = ConsoleClient::new(&self.config.console, &artifacts)?;

        let (entities, reports) = tokio::try_join!(client.list_entities(), client.list_reports())?;

        let reconciliation = reconcile(&entities, &reports, self.config.target.as_deref());
        if self.config.verbose {
            log_decisions(&reconciliation);
        }
        tracing::info!(
            "📊 Companies with reports: {}, without reports: {}",
            reconciliation.covered_count(),
            reconciliation.work.len()
        );

        match &reconciliation.status {
            ReconcileStatus::TargetNotFound { name, available } => {
                tracing::warn!("❌ Company '{}' not found", name);
                tracing::info!("Available: {}", available.join(", "));
            }
            ReconcileStatus::TargetAlreadyCovered => {
                tracing::info!("✅ The selected company already has a report");
            }
            ReconcileStatus::AllCovered => {
                tracing::info!("✅ All companies already have reports");
            }
            ReconcileStatus::Pending => {
                tracing::info!(
                    "📝 Companies {}: {}",
                    if self.config.dry_run { "to process" } else { "needing reports" },
                    reconciliation.work.len()
                );
            }
        }

        let processed = self.process_work(&client, &reconciliation.work).await;
        let results = assemble_results(reconciliation.decisions, processed, self.config.verbose);
        let summary = RunSummary::from_results(&results);

        tracing::info!(
            "🏁 Summary - created: {}, would create: {}, skipped: {}, failed: {}",
            summary.created,
            summary.would_create,
            summary.skipped,
            summary.failed
        );

        Ok(RunReport {
            status: reconciliation.status,
            results,
            summary,
            dry_run: self.config.dry_run,
        })
    }

    /// Handles every work item. Results come back in work order even when several
    /// creations run at once.
    async fn process_work(&self, client: &ConsoleClient, work: &[WorkItem]) -> Vec<RunResult> {
        let total = work.len();
        futures::stream::iter(work.iter().enumerate())
            .map(|(index, item)| self.process_item(client, index + 1, total, item))
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await
    }

    async fn process_item(
        &self,
        client: &ConsoleClient,
        position: usize,
        total: usize,
        item: &WorkItem,
    ) -> RunResult {
        let mut entity = item.entity.clone();
        tracing::info!(
            "[{}/{}] Processing: {} (ID: {})",
            position,
            total,
            entity.name,
            entity.id
        );

        if self.config.dry_run {
            tracing::info!("    [DRY RUN] Would create report for {}", entity.name);
            return RunResult {
                entity,
                outcome: Outcome::SkippedDryRun,
            };
        }

        let outcome = match self.create_for(client, &mut entity).await {
            Ok(report_name) => {
                tracing::info!("    ✅ SUCCESS: {}", report_name);
                Outcome::Created { report_name }
            }
            Err(e) => {
                tracing::warn!("    ❌ FAILED: {}: {}", entity.name, e);
                Outcome::Failed {
                    reason: e.to_string(),
                }
            }
        };

        RunResult { entity, outcome }
    }

    async fn create_for(&self, client: &ConsoleClient, entity: &mut Entity) -> Result<String> {
        entity.locations = client.list_locations(&entity.id).await?;
        if !entity.locations.is_empty() {
            let names: Vec<&str> = entity
                .locations
                .iter()
                .map(|l| l.name.as_deref().unwrap_or("Unnamed"))
                .collect();
            tracing::info!("    📍 Locations: {}", names.join(", "));
        }

        client.create_report(entity, &self.config.template).await
    }
}

fn log_decisions(reconciliation: &Reconciliation) {
    for entry in &reconciliation.decisions {
        let entity = &entry.entity;
        match &entry.decision {
            Decision::NeedsReport => {
                tracing::debug!("Company {} ({}) has NO reports", entity.id, entity.name)
            }
            Decision::HasReport { reports } => tracing::debug!(
                "Company {} ({}) has {} report(s): {}",
                entity.id,
                entity.name,
                reports.len(),
                reports.join(", ")
            ),
            Decision::NotTargeted => {
                tracing::debug!("Company {} ({}) not targeted", entity.id, entity.name)
            }
        }
    }
}

/// Merges processed work back into the per-company decisions, keeping listing order.
/// Companies outside the target are only reported when `include_not_targeted` is set.
fn assemble_results(
    decisions: Vec<EntityDecision>,
    processed: Vec<RunResult>,
    include_not_targeted: bool,
) -> Vec<RunResult> {
    let mut processed = processed.into_iter();
    decisions
        .into_iter()
        .filter_map(|entry| {
            let outcome = match entry.decision {
                Decision::NeedsReport => return processed.next(),
                Decision::HasReport { .. } => Outcome::SkippedAlreadyExists,
                Decision::NotTargeted if include_not_targeted => Outcome::SkippedNotTargeted,
                Decision::NotTargeted => return None,
            };
            Some(RunResult {
                entity: entry.entity,
                outcome,
            })
        })
        .collect()
}
