use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Console identifier as it appears on the wire.
///
/// The console mixes numeric and string ids across endpoints, so ids compare by their
/// textual form while keeping the original JSON representation for requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourceId {
    Number(serde_json::Number),
    Text(String),
}

impl ResourceId {
    /// Reads an id from a JSON value; null, empty strings and non-scalar values are absent.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => Some(ResourceId::Number(n.clone())),
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(ResourceId::Text(s.clone())),
            _ => None,
        }
    }

    pub fn key(&self) -> String {
        match self {
            ResourceId::Number(n) => n.to_string(),
            ResourceId::Text(s) => s.clone(),
        }
    }
}

impl PartialEq for ResourceId {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for ResourceId {}

impl Hash for ResourceId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

impl From<&str> for ResourceId {
    fn from(value: &str) -> Self {
        ResourceId::Text(value.to_string())
    }
}

impl From<u64> for ResourceId {
    fn from(value: u64) -> Self {
        ResourceId::Number(value.into())
    }
}

/// Bearer token and session cookie captured from a console login.
#[derive(Clone)]
pub struct AuthArtifacts {
    pub bearer_token: String,
    pub session_cookie: String,
}

impl fmt::Debug for AuthArtifacts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthArtifacts")
            .field("bearer_token", &"<redacted>")
            .field("session_cookie", &"<redacted>")
            .finish()
    }
}

#[derive(Clone)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub id: ResourceId,
    pub name: Option<String>,
}

/// A managed company.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub id: ResourceId,
    pub name: String,
    pub locations: Vec<Location>,
}

impl Entity {
    pub fn new(id: impl Into<ResourceId>, name: &str) -> Self {
        Self {
            id: id.into(),
            name: name.to_string(),
            locations: Vec::new(),
        }
    }
}

/// Existing report as seen in the report listing. `entity_id` is `None` when the
/// report is not associated with a company.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRecord {
    pub entity_id: Option<ResourceId>,
    pub name: Option<String>,
    pub entity_name: Option<String>,
}

impl ReportRecord {
    pub fn for_entity(id: impl Into<ResourceId>) -> Self {
        Self {
            entity_id: Some(id.into()),
            name: None,
            entity_name: None,
        }
    }

    pub fn unassociated() -> Self {
        Self {
            entity_id: None,
            name: None,
            entity_name: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub entity: Entity,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Created { report_name: String },
    SkippedAlreadyExists,
    SkippedNotTargeted,
    SkippedDryRun,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    pub entity: Entity,
    pub outcome: Outcome,
}
