use crate::domain::model::{AuthArtifacts, Credentials};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Source of the short-lived credentials the console's internal API requires.
#[async_trait]
pub trait ArtifactSource: Send + Sync {
    async fn extract(&self, base_url: &str, credentials: &Credentials) -> Result<AuthArtifacts>;
}
