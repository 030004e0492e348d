use crate::config::ReportTemplate;
use crate::utils::error::{Result, VspcError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Optional on-disk defaults. Any value may reference `${ENV_VAR}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub console: ConsoleSection,
    #[serde(default)]
    pub browser: BrowserSection,
    #[serde(default)]
    pub report: ReportTemplate,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConsoleSection {
    pub url: Option<String>,
    pub login: Option<String>,
    pub password: Option<String>,
    pub accept_invalid_certs: Option<bool>,
    pub request_timeout_seconds: Option<u64>,
    pub concurrency: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BrowserSection {
    pub headless: Option<bool>,
    pub executable: Option<String>,
    pub login_timeout_seconds: Option<u64>,
    pub element_timeout_seconds: Option<u64>,
}

impl FileConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(VspcError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| VspcError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${VSPC_PASSWORD})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| VspcError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[console]
url = "https://vspc.example.com:1280"
login = "admin"
password = "secret"
accept_invalid_certs = false
concurrency = 4

[browser]
headless = false
login_timeout_seconds = 45

[report]
schedule_time = "06:30"
time_zone = "UTC"
"#;

        let config = FileConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.console.url.as_deref(), Some("https://vspc.example.com:1280"));
        assert_eq!(config.console.accept_invalid_certs, Some(false));
        assert_eq!(config.console.concurrency, Some(4));
        assert_eq!(config.browser.headless, Some(false));
        assert_eq!(config.browser.login_timeout_seconds, Some(45));
        assert_eq!(config.report.schedule_time, "06:30");
        assert_eq!(config.report.time_zone, "UTC");
        // untouched template values keep their defaults
        assert_eq!(config.report.name_prefix, "Protected Computers");
        assert_eq!(config.report.guest_os_filter, vec![0, 1, 2]);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = FileConfig::from_toml_str("").unwrap();
        assert!(config.console.url.is_none());
        assert_eq!(config.report, ReportTemplate::default());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("VSPC_TEST_PASSWORD", "from-env");

        let toml_content = r#"
[console]
login = "admin"
password = "${VSPC_TEST_PASSWORD}"
"#;

        let config = FileConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.console.password.as_deref(), Some("from-env"));

        std::env::remove_var("VSPC_TEST_PASSWORD");
    }

    #[test]
    fn test_unset_env_var_is_left_verbatim() {
        let toml_content = r#"
[console]
password = "${VSPC_TEST_DEFINITELY_UNSET}"
"#;

        let config = FileConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(
            config.console.password.as_deref(),
            Some("${VSPC_TEST_DEFINITELY_UNSET}")
        );
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let result = FileConfig::from_toml_str("[console\nurl = 1");
        assert!(matches!(result, Err(VspcError::ConfigError { .. })));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[console]\nurl = \"https://vspc.example.com\"\n")
            .unwrap();

        let config = FileConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.console.url.as_deref(), Some("https://vspc.example.com"));
    }
}
