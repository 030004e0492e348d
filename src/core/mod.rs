pub mod reconcile;
pub mod runner;

pub use crate::domain::model::{Entity, Outcome, ReportRecord, RunResult, WorkItem};
pub use crate::domain::ports::ArtifactSource;
pub use crate::utils::error::Result;
