pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliArgs;

pub use adapters::{browser::BrowserArtifactSource, console::ConsoleClient};
pub use config::{ReportTemplate, RunConfig};
pub use core::reconcile::{reconcile, ReconcileStatus, Reconciliation};
pub use core::runner::{ReportRunner, RunReport, RunSummary};
pub use domain::model::{AuthArtifacts, Credentials, Entity, Outcome, ReportRecord, RunResult};
pub use domain::ports::ArtifactSource;
pub use utils::error::{Result, VspcError};
