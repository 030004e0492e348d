use crate::config::{BrowserSettings, ConsoleSettings, FileConfig, RunConfig};
use crate::domain::model::Credentials;
use crate::utils::error::Result;
use crate::utils::validation::{validate_required_field, Validate};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Parser)]
#[command(name = "vspc-reports")]
#[command(about = "Create a Protected Computers report for every VSPC company that lacks one")]
pub struct CliArgs {
    #[arg(long, help = "Console base URL, e.g. https://vspc.example.com:1280")]
    pub url: Option<String>,

    #[arg(long, help = "Console user name")]
    pub login: Option<String>,

    #[arg(long, help = "Console password")]
    pub password: Option<String>,

    #[arg(long, help = "Only handle the company with exactly this name")]
    pub company: Option<String>,

    #[arg(long, help = "Show what would be created without creating anything")]
    pub dry_run: bool,

    #[arg(short, long, help = "Show per-company decisions")]
    pub verbose: bool,

    #[arg(long, help = "TOML file with console, browser and report settings")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Number of reports created in parallel")]
    pub concurrency: Option<usize>,

    #[arg(long, help = "Verify the console TLS certificate")]
    pub strict_tls: bool,

    #[arg(long, help = "Show the browser window during login")]
    pub headful: bool,

    #[arg(long, help = "Path to the Chrome/Chromium executable")]
    pub chrome_path: Option<PathBuf>,

    #[arg(long, help = "Seconds to wait for the login token")]
    pub login_timeout: Option<u64>,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,
}

impl CliArgs {
    pub fn load_file_config(&self) -> Result<FileConfig> {
        match &self.config {
            Some(path) => FileConfig::from_file(path),
            None => Ok(FileConfig::default()),
        }
    }

    /// Merges the arguments over the file config. Arguments win.
    pub fn into_run_config(self, file: FileConfig) -> Result<RunConfig> {
        let url = self.url.or(file.console.url);
        let login = self.login.or(file.console.login);
        let password = self.password.or(file.console.password);

        let mut console = ConsoleSettings::new(validate_required_field("url", &url)?);
        console.accept_invalid_certs =
            !self.strict_tls && file.console.accept_invalid_certs.unwrap_or(true);
        if let Some(seconds) = file.console.request_timeout_seconds {
            console.request_timeout = Duration::from_secs(seconds);
        }

        let defaults = BrowserSettings::default();
        let browser = BrowserSettings {
            headless: !self.headful && file.browser.headless.unwrap_or(true),
            executable: self
                .chrome_path
                .or(file.browser.executable.map(PathBuf::from)),
            login_timeout: self
                .login_timeout
                .or(file.browser.login_timeout_seconds)
                .map(Duration::from_secs)
                .unwrap_or(defaults.login_timeout),
            element_timeout: file
                .browser
                .element_timeout_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.element_timeout),
        };

        let config = RunConfig {
            console,
            credentials: Credentials {
                login: validate_required_field("login", &login)?.clone(),
                password: validate_required_field("password", &password)?.clone(),
            },
            target: self.company,
            dry_run: self.dry_run,
            verbose: self.verbose,
            concurrency: self.concurrency.or(file.console.concurrency).unwrap_or(1),
            browser,
            template: file.report,
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::VspcError;

    fn parse(args: &[&str]) -> CliArgs {
        let mut argv = vec!["vspc-reports"];
        argv.extend_from_slice(args);
        CliArgs::parse_from(argv)
    }

    #[test]
    fn test_minimal_arguments() {
        let args = parse(&[
            "--url",
            "https://vspc.example.com/",
            "--login",
            "admin",
            "--password",
            "secret",
        ]);
        let config = args.into_run_config(FileConfig::default()).unwrap();

        assert_eq!(config.console.base_url, "https://vspc.example.com");
        assert!(config.console.accept_invalid_certs);
        assert!(config.browser.headless);
        assert!(!config.dry_run);
        assert_eq!(config.concurrency, 1);
        assert!(config.target.is_none());
    }

    #[test]
    fn test_flags() {
        let args = parse(&[
            "--url",
            "https://vspc.example.com",
            "--login",
            "admin",
            "--password",
            "secret",
            "--company",
            "Globex",
            "--dry-run",
            "-v",
            "--strict-tls",
            "--concurrency",
            "3",
        ]);
        let config = args.into_run_config(FileConfig::default()).unwrap();

        assert_eq!(config.target.as_deref(), Some("Globex"));
        assert!(config.dry_run);
        assert!(config.verbose);
        assert!(!config.console.accept_invalid_certs);
        assert_eq!(config.concurrency, 3);
    }

    #[test]
    fn test_arguments_override_file() {
        let file = FileConfig::from_toml_str(
            r#"
[console]
url = "https://file.example.com"
login = "file-user"
password = "file-secret"
concurrency = 2

[browser]
login_timeout_seconds = 90
"#,
        )
        .unwrap();

        let args = parse(&["--login", "cli-user"]);
        let config = args.into_run_config(file).unwrap();

        assert_eq!(config.console.base_url, "https://file.example.com");
        assert_eq!(config.credentials.login, "cli-user");
        assert_eq!(config.credentials.password, "file-secret");
        assert_eq!(config.concurrency, 2);
        assert_eq!(config.browser.login_timeout, Duration::from_secs(90));
    }

    #[test]
    fn test_missing_password_is_reported() {
        let args = parse(&["--url", "https://vspc.example.com", "--login", "admin"]);
        let err = args.into_run_config(FileConfig::default()).unwrap_err();
        assert!(matches!(err, VspcError::MissingConfigError { field } if field == "password"));
    }
}
