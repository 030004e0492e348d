use std::fmt;
use thiserror::Error;

/// Step of a run an error belongs to, used to name the failing phase in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Login,
    EntityListing,
    ReportListing,
    LocationListing,
    ReportCreation,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Phase::Login => "login",
            Phase::EntityListing => "company listing",
            Phase::ReportListing => "report listing",
            Phase::LocationListing => "location listing",
            Phase::ReportCreation => "report creation",
        };
        f.write_str(label)
    }
}

#[derive(Error, Debug)]
pub enum VspcError {
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    #[error("{phase} failed ({}): {body}", status_label(.status))]
    Api {
        phase: Phase,
        status: Option<u16>,
        body: String,
    },

    #[error("Company '{name}' not found")]
    TargetNotFound { name: String, available: Vec<String> },

    #[error("Untrusted certificate presented by {url}: {details}")]
    CertificateTrust { url: String, details: String },

    #[error("Browser automation error: {0}")]
    Browser(#[from] chromiumoxide::error::CdpError),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

fn status_label(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!("HTTP {}", code),
        None => "malformed response".to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Authentication,
    Api,
    Network,
    Browser,
    Target,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl VspcError {
    pub fn authentication(message: impl Into<String>) -> Self {
        VspcError::Authentication {
            message: message.into(),
        }
    }

    pub fn malformed(phase: Phase, details: impl Into<String>) -> Self {
        VspcError::Api {
            phase,
            status: None,
            body: details.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            VspcError::Authentication { .. } => ErrorCategory::Authentication,
            VspcError::Api { .. } | VspcError::SerializationError(_) => ErrorCategory::Api,
            VspcError::Http(_) | VspcError::CertificateTrust { .. } => ErrorCategory::Network,
            VspcError::Browser(_) => ErrorCategory::Browser,
            VspcError::TargetNotFound { .. } => ErrorCategory::Target,
            VspcError::ConfigError { .. }
            | VspcError::MissingConfigError { .. }
            | VspcError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            VspcError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            VspcError::Authentication { .. }
            | VspcError::Browser(_)
            | VspcError::CertificateTrust { .. } => ErrorSeverity::Critical,
            VspcError::TargetNotFound { .. } => ErrorSeverity::Medium,
            VspcError::Api { phase, .. } => match phase {
                Phase::ReportCreation | Phase::LocationListing => ErrorSeverity::Medium,
                _ => ErrorSeverity::High,
            },
            _ => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            VspcError::Authentication { .. } => {
                "Check the login and password, and that the console login page loads in a browser".to_string()
            }
            VspcError::Api { status: Some(401), .. } | VspcError::Api { status: Some(403), .. } => {
                "The session was rejected; run again to capture fresh credentials".to_string()
            }
            VspcError::Api { .. } => {
                "Check the console version and that the account can list companies and reports".to_string()
            }
            VspcError::TargetNotFound { available, .. } => {
                if available.is_empty() {
                    "The console returned no companies".to_string()
                } else {
                    format!("Use one of: {}", available.join(", "))
                }
            }
            VspcError::CertificateTrust { .. } => {
                "Install the console certificate or run without --strict-tls".to_string()
            }
            VspcError::Browser(_) => {
                "Make sure Chrome or Chromium is installed, or pass --chrome-path".to_string()
            }
            VspcError::Http(_) => "Check network connectivity to the console".to_string(),
            VspcError::MissingConfigError { field } => {
                format!("Provide '{}' on the command line or in the config file", field)
            }
            VspcError::InvalidConfigValueError { field, .. } => {
                format!("Fix the value of '{}'", field)
            }
            VspcError::ConfigError { .. } => "Check the config file syntax".to_string(),
            VspcError::IoError(_) | VspcError::SerializationError(_) => {
                "Run again with --verbose for details".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            VspcError::Authentication { message } => format!("Could not log in: {}", message),
            VspcError::Api { phase, status, body } => match status {
                Some(code) => format!("The console rejected the {} request (HTTP {}): {}", phase, code, body),
                None => format!("The console returned an unexpected {} response: {}", phase, body),
            },
            VspcError::TargetNotFound { name, .. } => format!("Company '{}' does not exist", name),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, VspcError>;
