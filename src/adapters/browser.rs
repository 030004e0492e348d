//! Login through the console web UI in a headless Chromium and capture the
//! bearer token and session cookie the internal API expects.

use crate::adapters::console::SESSION_COOKIE;
use crate::config::{BrowserSettings, RunConfig};
use crate::domain::model::{AuthArtifacts, Credentials};
use crate::domain::ports::ArtifactSource;
use crate::utils::error::{Result, VspcError};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{
    EventLoadingFinished, EventResponseReceived, GetResponseBodyParams, RequestId,
};
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use futures::{pin_mut, Stream, StreamExt};
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tokio::time::Instant;

const TOKEN_EXCHANGE_PATH: &str = "/api/v3/token";
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// A way to find an element on the login page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locator {
    Css(&'static str),
    XPath(&'static str),
}

impl Locator {
    async fn find(self, page: &Page) -> Option<Element> {
        match self {
            Locator::Css(selector) => page.find_element(selector).await.ok(),
            Locator::XPath(expression) => page.find_xpath(expression).await.ok(),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(selector) => write!(f, "css {}", selector),
            Locator::XPath(expression) => write!(f, "xpath {}", expression),
        }
    }
}

pub const USERNAME_LOCATORS: &[Locator] = &[
    Locator::Css(r#"input[name="username"]"#),
    Locator::Css(r#"input[type="text"]"#),
];

pub const PASSWORD_LOCATORS: &[Locator] = &[
    Locator::Css(r#"input[name="password"]"#),
    Locator::Css(r#"input[type="password"]"#),
];

pub const SUBMIT_LOCATORS: &[Locator] = &[
    Locator::XPath(r#"//button[contains(normalize-space(.), "Log in")]"#),
    Locator::Css(r#"button[type="submit"]"#),
    Locator::Css("button"),
];

enum StepAction<'a> {
    Type(&'a str),
    Click,
}

/// One interaction of the login form: which element, found how, and what to do with it.
struct LoginStep<'a> {
    role: &'static str,
    locators: &'static [Locator],
    action: StepAction<'a>,
}

fn login_steps(credentials: &Credentials) -> [LoginStep<'_>; 3] {
    [
        LoginStep {
            role: "username field",
            locators: USERNAME_LOCATORS,
            action: StepAction::Type(&credentials.login),
        },
        LoginStep {
            role: "password field",
            locators: PASSWORD_LOCATORS,
            action: StepAction::Type(&credentials.password),
        },
        LoginStep {
            role: "login button",
            locators: SUBMIT_LOCATORS,
            action: StepAction::Click,
        },
    ]
}

/// Tries `locators` in priority order and returns the first hit.
pub async fn first_match<T, F, Fut>(locators: &[Locator], mut try_locator: F) -> Option<(Locator, T)>
where
    F: FnMut(Locator) -> Fut,
    Fut: Future<Output = Option<T>>,
{
    for locator in locators {
        if let Some(found) = try_locator(*locator).await {
            return Some((*locator, found));
        }
    }
    None
}

/// Network activity relevant to the token exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkEvent {
    Response {
        request_id: String,
        url: String,
        status: i64,
    },
    Finished {
        request_id: String,
    },
}

pub fn is_token_exchange(url: &str, status: i64) -> bool {
    status == 200 && url.contains(TOKEN_EXCHANGE_PATH)
}

pub fn token_from_body(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("access_token")
        .and_then(|token| token.as_str())
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// Waits until a successful token exchange has been fully received and returns its token.
///
/// A body can only be read once loading finished, and the two events may arrive in either
/// order. `fetch_body` yields `None` for bodies that are not plain text.
pub async fn watch_token_exchange<S, F, Fut>(events: S, mut fetch_body: F) -> Result<String>
where
    S: Stream<Item = NetworkEvent>,
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<Option<String>>>,
{
    pin_mut!(events);
    let mut candidates: HashSet<String> = HashSet::new();
    let mut finished: HashSet<String> = HashSet::new();

    while let Some(event) = events.next().await {
        let ready = match event {
            NetworkEvent::Response {
                request_id,
                url,
                status,
            } => {
                if !is_token_exchange(&url, status) {
                    None
                } else if finished.contains(&request_id) {
                    Some(request_id)
                } else {
                    candidates.insert(request_id);
                    None
                }
            }
            NetworkEvent::Finished { request_id } => {
                if candidates.remove(&request_id) {
                    Some(request_id)
                } else {
                    finished.insert(request_id);
                    None
                }
            }
        };

        let Some(request_id) = ready else {
            continue;
        };

        match fetch_body(request_id).await {
            Ok(Some(body)) => match token_from_body(&body) {
                Some(token) => return Ok(token),
                None => tracing::warn!("⚠️ Token response did not contain an access_token"),
            },
            Ok(None) => tracing::warn!("⚠️ Token response body was not text"),
            Err(e) => tracing::warn!("⚠️ Could not read token response body: {}", e),
        }
    }

    Err(VspcError::authentication(
        "browser closed before the login token was observed",
    ))
}

/// Browser process, its CDP handler task and its throwaway profile.
///
/// `shutdown` closes the browser cleanly. If the session is dropped instead (error or
/// cancellation), the handler task is aborted, the browser process is killed by
/// chromiumoxide and the profile directory is removed.
struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
    _profile: TempDir,
}

impl BrowserSession {
    async fn launch(settings: &BrowserSettings, accept_invalid_certs: bool) -> Result<Self> {
        let profile = TempDir::new()?;

        let mut builder = BrowserConfig::builder()
            .user_data_dir(profile.path())
            .no_sandbox()
            .arg("--no-first-run")
            .arg("--disable-extensions");
        if !settings.headless {
            builder = builder.with_head();
        }
        if let Some(executable) = &settings.executable {
            builder = builder.chrome_executable(executable);
        }
        if accept_invalid_certs {
            builder = builder.arg("--ignore-certificate-errors");
        }

        let config = builder.build().map_err(|e| VspcError::ConfigError {
            message: format!("Invalid browser configuration: {}", e),
        })?;

        let (browser, mut handler) = Browser::launch(config).await?;
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::trace!("CDP handler: {}", e);
                }
            }
        });

        Ok(Self {
            browser,
            handler,
            _profile: profile,
        })
    }

    async fn capture(
        &self,
        base_url: &str,
        credentials: &Credentials,
        settings: &BrowserSettings,
        accept_invalid_certs: bool,
    ) -> Result<AuthArtifacts> {
        let page = self.browser.new_page("about:blank").await?;

        let responses = page
            .event_listener::<EventResponseReceived>()
            .await?
            .map(|event| NetworkEvent::Response {
                request_id: event.request_id.inner().clone(),
                url: event.response.url.clone(),
                status: event.response.status,
            });
        let finished = page
            .event_listener::<EventLoadingFinished>()
            .await?
            .map(|event| NetworkEvent::Finished {
                request_id: event.request_id.inner().clone(),
            });
        let token_watch = watch_token_exchange(futures::stream::select(responses, finished), |id| {
            let page = page.clone();
            async move {
                let response = page
                    .execute(GetResponseBodyParams::new(RequestId::new(id)))
                    .await?;
                Ok::<_, VspcError>(
                    (!response.result.base64_encoded).then(|| response.result.body.clone()),
                )
            }
        });

        let login_url = format!("{}/login", base_url);
        tracing::info!("🌐 Navigating to {}", login_url);
        page.goto(login_url.as_str())
            .await
            .map_err(|e| navigation_error(e, &login_url, accept_invalid_certs))?;

        tracing::info!("🔑 Logging in as {}", credentials.login);
        for step in login_steps(credentials) {
            let element = locate(&page, &step, settings.element_timeout).await?;
            match step.action {
                StepAction::Type(text) => {
                    element.click().await?.type_str(text).await?;
                }
                StepAction::Click => {
                    element.click().await?;
                }
            }
        }

        let bearer_token = match tokio::time::timeout(settings.login_timeout, token_watch).await {
            Ok(token) => token?,
            Err(_) => {
                return Err(VspcError::authentication(format!(
                    "token not observed within {}s; check the credentials",
                    settings.login_timeout.as_secs()
                )))
            }
        };

        let session_cookie = session_cookie(&page, settings.element_timeout).await?;
        tracing::info!("✅ Authentication credentials captured");

        Ok(AuthArtifacts {
            bearer_token,
            session_cookie,
        })
    }

    async fn shutdown(mut self) {
        if let Err(e) = self.browser.close().await {
            tracing::warn!("⚠️ Could not close browser cleanly: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            tracing::warn!("⚠️ Browser process did not exit cleanly: {}", e);
        }
        self.handler.abort();
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

async fn locate(page: &Page, step: &LoginStep<'_>, wait: Duration) -> Result<Element> {
    let deadline = Instant::now() + wait;
    loop {
        if let Some((locator, element)) = first_match(step.locators, |l| l.find(page)).await {
            tracing::debug!("{} matched by {}", step.role, locator);
            return Ok(element);
        }
        if Instant::now() >= deadline {
            return Err(VspcError::authentication(format!("{} not found", step.role)));
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

async fn session_cookie(page: &Page, wait: Duration) -> Result<String> {
    let deadline = Instant::now() + wait;
    loop {
        let cookies = page.get_cookies().await?;
        if let Some(cookie) = cookies.into_iter().find(|c| c.name == SESSION_COOKIE) {
            return Ok(cookie.value);
        }
        if Instant::now() >= deadline {
            return Err(VspcError::authentication(format!(
                "session cookie '{}' was not set after login",
                SESSION_COOKIE
            )));
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

fn navigation_error(error: CdpError, url: &str, accept_invalid_certs: bool) -> VspcError {
    let details = error.to_string();
    if !accept_invalid_certs && details.contains("ERR_CERT") {
        return VspcError::CertificateTrust {
            url: url.to_string(),
            details,
        };
    }
    VspcError::authentication(format!("login page {} could not be loaded: {}", url, details))
}

/// Anything that goes wrong while driving the browser is a failed login, except an
/// untrusted certificate which keeps its own type.
fn as_login_failure(error: VspcError) -> VspcError {
    match error {
        VspcError::Authentication { .. } | VspcError::CertificateTrust { .. } => error,
        other => VspcError::authentication(format!("browser error during login: {}", other)),
    }
}

/// Captures artifacts by logging in through a real browser.
pub struct BrowserArtifactSource {
    settings: BrowserSettings,
    accept_invalid_certs: bool,
}

impl BrowserArtifactSource {
    pub fn new(settings: BrowserSettings, accept_invalid_certs: bool) -> Self {
        Self {
            settings,
            accept_invalid_certs,
        }
    }

    pub fn from_config(config: &RunConfig) -> Self {
        Self::new(config.browser.clone(), config.console.accept_invalid_certs)
    }
}

#[async_trait]
impl ArtifactSource for BrowserArtifactSource {
    async fn extract(&self, base_url: &str, credentials: &Credentials) -> Result<AuthArtifacts> {
        tracing::info!("🚀 Starting browser for login...");
        let session = BrowserSession::launch(&self.settings, self.accept_invalid_certs)
            .await
            .map_err(as_login_failure)?;

        let result = session
            .capture(base_url, credentials, &self.settings, self.accept_invalid_certs)
            .await;
        session.shutdown().await;

        result.map_err(as_login_failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn response(id: &str, url: &str, status: i64) -> NetworkEvent {
        NetworkEvent::Response {
            request_id: id.to_string(),
            url: url.to_string(),
            status,
        }
    }

    fn finished(id: &str) -> NetworkEvent {
        NetworkEvent::Finished {
            request_id: id.to_string(),
        }
    }

    #[tokio::test]
    async fn test_first_match_prefers_priority_order() {
        let present = ["button", r#"button[type="submit"]"#];
        let hit = first_match(SUBMIT_LOCATORS, |locator| async move {
            match locator {
                Locator::Css(selector) if present.contains(&selector) => Some(selector),
                _ => None,
            }
        })
        .await;

        assert_eq!(
            hit,
            Some((Locator::Css(r#"button[type="submit"]"#), r#"button[type="submit"]"#))
        );
    }

    #[tokio::test]
    async fn test_first_match_exhaustion() {
        let attempts = AtomicUsize::new(0);
        let hit: Option<(Locator, ())> = first_match(USERNAME_LOCATORS, |_| {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { None }
        })
        .await;

        assert!(hit.is_none());
        assert_eq!(attempts.load(Ordering::SeqCst), USERNAME_LOCATORS.len());
    }

    #[test]
    fn test_token_exchange_detection() {
        assert!(is_token_exchange("https://vspc.example.com/api/v3/token", 200));
        assert!(!is_token_exchange("https://vspc.example.com/api/v3/token", 401));
        assert!(!is_token_exchange("https://vspc.example.com/api/v3/about", 200));
    }

    #[test]
    fn test_token_from_body() {
        assert_eq!(
            token_from_body(r#"{"access_token":"abc","token_type":"bearer"}"#),
            Some("abc".to_string())
        );
        assert_eq!(token_from_body(r#"{"access_token":""}"#), None);
        assert_eq!(token_from_body(r#"{"error":"invalid_grant"}"#), None);
        assert_eq!(token_from_body("<html>"), None);
    }

    #[tokio::test]
    async fn test_watch_reads_token_after_loading_finished() {
        let events = stream::iter(vec![
            response("1", "https://vspc/api/v3/about", 200),
            finished("1"),
            response("2", "https://vspc/api/v3/token", 200),
            finished("2"),
        ]);

        let token = watch_token_exchange(events, |id| async move {
            assert_eq!(id, "2");
            Ok::<_, VspcError>(Some(r#"{"access_token":"tok-2"}"#.to_string()))
        })
        .await
        .unwrap();

        assert_eq!(token, "tok-2");
    }

    #[tokio::test]
    async fn test_watch_handles_finished_before_response() {
        let events = stream::iter(vec![
            finished("7"),
            response("7", "https://vspc/api/v3/token", 200),
        ]);

        let token = watch_token_exchange(events, |_| async {
            Ok::<_, VspcError>(Some(r#"{"access_token":"late"}"#.to_string()))
        })
        .await
        .unwrap();

        assert_eq!(token, "late");
    }

    #[tokio::test]
    async fn test_watch_ignores_failed_exchange_and_fails_when_stream_ends() {
        let events = stream::iter(vec![
            response("3", "https://vspc/api/v3/token", 401),
            finished("3"),
        ]);

        let fetches = AtomicUsize::new(0);
        let result = watch_token_exchange(events, |_| {
            fetches.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, VspcError>(None) }
        })
        .await;

        assert!(matches!(result, Err(VspcError::Authentication { .. })));
        assert_eq!(fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_watch_keeps_waiting_after_unreadable_body() {
        let events = stream::iter(vec![
            response("4", "https://vspc/api/v3/token", 200),
            finished("4"),
            response("5", "https://vspc/api/v3/token", 200),
            finished("5"),
        ]);

        let token = watch_token_exchange(events, |id| async move {
            if id == "4" {
                Err(VspcError::authentication("body evicted"))
            } else {
                Ok(Some(r#"{"access_token":"second"}"#.to_string()))
            }
        })
        .await
        .unwrap();

        assert_eq!(token, "second");
    }

    #[test]
    fn test_login_failures_keep_certificate_errors() {
        let cert = VspcError::CertificateTrust {
            url: "https://vspc".to_string(),
            details: "net::ERR_CERT_AUTHORITY_INVALID".to_string(),
        };
        assert!(matches!(as_login_failure(cert), VspcError::CertificateTrust { .. }));

        let io = VspcError::IoError(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert!(matches!(as_login_failure(io), VspcError::Authentication { .. }));
    }
}
