use crate::domain::model::{Entity, ReportRecord, ResourceId, WorkItem};
use std::collections::{HashMap, HashSet};

/// Why a company did or did not end up in the work set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    NeedsReport,
    HasReport { reports: Vec<String> },
    NotTargeted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDecision {
    pub entity: Entity,
    pub decision: Decision,
}

/// Shape of the work set, so an empty result can be told apart by cause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileStatus {
    Pending,
    AllCovered,
    TargetAlreadyCovered,
    TargetNotFound { name: String, available: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub work: Vec<WorkItem>,
    pub decisions: Vec<EntityDecision>,
    pub status: ReconcileStatus,
}

impl Reconciliation {
    pub fn covered_count(&self) -> usize {
        self.decisions
            .iter()
            .filter(|d| matches!(d.decision, Decision::HasReport { .. }))
            .count()
    }
}

/// Computes the companies that still need a report.
///
/// A company needs one iff no report carries its id in the association field. Reports with
/// no association never match. With `target`, only the first company whose name equals it
/// exactly (case-sensitive) is considered. Output keeps the input order of `entities`; a repeated id
/// is only considered at its first occurrence.
pub fn reconcile(
    entities: &[Entity],
    reports: &[ReportRecord],
    target: Option<&str>,
) -> Reconciliation {
    let mut reports_by_entity: HashMap<&ResourceId, Vec<String>> = HashMap::new();
    for report in reports {
        if let Some(id) = &report.entity_id {
            reports_by_entity
                .entry(id)
                .or_default()
                .push(report.name.clone().unwrap_or_else(|| "Unnamed".to_string()));
        }
    }

    let mut seen: HashSet<&ResourceId> = HashSet::new();
    let unique: Vec<&Entity> = entities.iter().filter(|e| seen.insert(&e.id)).collect();

    // Only the first company carrying the target name is selected.
    let target_index = target.and_then(|name| unique.iter().position(|e| e.name == name));
    let target_found = target.is_none() || target_index.is_some();

    let mut work = Vec::new();
    let mut decisions = Vec::with_capacity(unique.len());

    for (index, entity) in unique.iter().copied().enumerate() {
        let decision = if target.is_some() && target_index != Some(index) {
            Decision::NotTargeted
        } else if let Some(existing) = reports_by_entity.get(&entity.id) {
            Decision::HasReport {
                reports: existing.clone(),
            }
        } else {
            work.push(WorkItem {
                entity: entity.clone(),
            });
            Decision::NeedsReport
        };

        decisions.push(EntityDecision {
            entity: entity.clone(),
            decision,
        });
    }

    let status = match target {
        Some(name) if !target_found => ReconcileStatus::TargetNotFound {
            name: name.to_string(),
            available: unique.iter().map(|e| e.name.clone()).collect(),
        },
        _ if !work.is_empty() => ReconcileStatus::Pending,
        Some(_) => ReconcileStatus::TargetAlreadyCovered,
        None => ReconcileStatus::AllCovered,
    };

    Reconciliation {
        work,
        decisions,
        status,
    }
}
