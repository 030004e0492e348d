#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::domain::model::Credentials;
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_clock_time, validate_non_empty_string, validate_positive_number, validate_url, Validate,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[cfg(feature = "cli")]
pub use cli::CliArgs;
pub use toml_config::FileConfig;

/// Everything a single run needs. Built once, then passed by reference to every component.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub console: ConsoleSettings,
    pub credentials: Credentials,
    pub target: Option<String>,
    pub dry_run: bool,
    pub verbose: bool,
    pub concurrency: usize,
    pub browser: BrowserSettings,
    pub template: ReportTemplate,
}

#[derive(Debug, Clone)]
pub struct ConsoleSettings {
    pub base_url: String,
    /// Skip TLS certificate verification. Consoles usually run with a self-signed certificate.
    pub accept_invalid_certs: bool,
    pub request_timeout: Duration,
}

impl ConsoleSettings {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            accept_invalid_certs: true,
            request_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BrowserSettings {
    pub headless: bool,
    pub executable: Option<PathBuf>,
    pub login_timeout: Duration,
    pub element_timeout: Duration,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            executable: None,
            login_timeout: Duration::from_secs(30),
            element_timeout: Duration::from_secs(5),
        }
    }
}

/// Static parts of the report payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportTemplate {
    pub name_prefix: String,
    pub report_type: String,
    pub access_mode: String,
    pub aggregation_mode: String,
    pub rpo_days: u32,
    pub email_options: String,
    pub guest_os_filter: Vec<i64>,
    pub schedule_time: String,
    pub monthly_time: String,
    pub time_zone: String,
}

impl Default for ReportTemplate {
    fn default() -> Self {
        Self {
            name_prefix: "Protected Computers".to_string(),
            report_type: "protectedComputers".to_string(),
            access_mode: "public".to_string(),
            aggregation_mode: "singleCompany".to_string(),
            rpo_days: 1,
            email_options: "%Company Owner%".to_string(),
            guest_os_filter: vec![0, 1, 2],
            schedule_time: "08:00".to_string(),
            monthly_time: "07:00".to_string(),
            time_zone: "Romance Standard Time".to_string(),
        }
    }
}

impl RunConfig {
    pub fn new(base_url: &str, login: &str, password: &str) -> Self {
        Self {
            console: ConsoleSettings::new(base_url),
            credentials: Credentials {
                login: login.to_string(),
                password: password.to_string(),
            },
            target: None,
            dry_run: false,
            verbose: false,
            concurrency: 1,
            browser: BrowserSettings::default(),
            template: ReportTemplate::default(),
        }
    }

    pub fn with_target(mut self, name: &str) -> Self {
        self.target = Some(name.to_string());
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }
}

impl Validate for RunConfig {
    fn validate(&self) -> Result<()> {
        validate_url("console.url", &self.console.base_url)?;
        validate_non_empty_string("console.login", &self.credentials.login)?;
        validate_non_empty_string("console.password", &self.credentials.password)?;
        if let Some(target) = &self.target {
            validate_non_empty_string("company", target)?;
        }
        validate_positive_number("concurrency", self.concurrency, 1)?;
        validate_non_empty_string("report.time_zone", &self.template.time_zone)?;
        validate_clock_time("report.schedule_time", &self.template.schedule_time)?;
        validate_clock_time("report.monthly_time", &self.template.monthly_time)?;
        validate_positive_number("report.rpo_days", self.template.rpo_days as usize, 1)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let config = RunConfig::new("https://vspc.example.com:1280/", "admin", "secret");
        assert_eq!(config.console.base_url, "https://vspc.example.com:1280");
        assert!(config.console.accept_invalid_certs);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        assert!(RunConfig::new("https://vspc.example.com", "admin", "secret")
            .validate()
            .is_ok());
        assert!(RunConfig::new("vspc.example.com", "admin", "secret")
            .validate()
            .is_err());
        assert!(RunConfig::new("https://vspc.example.com", "admin", " ")
            .validate()
            .is_err());
        assert!(RunConfig::new("https://vspc.example.com", "admin", "secret")
            .with_concurrency(0)
            .validate()
            .is_err());

        let mut config = RunConfig::new("https://vspc.example.com", "admin", "secret");
        config.template.schedule_time = "8am".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let config = RunConfig::new("https://vspc.example.com", "admin", "hunter2");
        let rendered = format!("{:?}", config);
        assert!(rendered.contains("admin"));
        assert!(!rendered.contains("hunter2"));
    }
}
