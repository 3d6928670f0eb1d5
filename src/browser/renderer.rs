use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::debug;

use crate::config::{BrowserConfig, ChallengeConfig};
use crate::errors::FlagbotError;
use crate::models::{DialogSignal, Submission, VerificationSession};
use super::cdp::{CdpConnection, CdpEvent};
use super::chromium::ChromiumProcess;

/// Renders one submission's payload in an isolated browser session and
/// returns the captured runtime signals. The session never outlives the
/// call: teardown is unconditional on every path.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, submission: &Submission) -> Result<VerificationSession, FlagbotError>;
}

pub struct ChromiumRenderer {
    browser: BrowserConfig,
    challenge: ChallengeConfig,
}

impl ChromiumRenderer {
    pub fn new(browser: BrowserConfig, challenge: ChallengeConfig) -> Self {
        Self { browser, challenge }
    }

    /// `<base>?<param>=<url-encoded answer>`. The payload is URL-encoded and
    /// nothing else; it must reach the page intact to have a chance to fire.
    fn target_url(&self, answer: &str) -> Result<String, FlagbotError> {
        let mut url = reqwest::Url::parse(&self.challenge.base_url)
            .map_err(|e| FlagbotError::InvalidTarget(format!("challenge base URL: {}", e)))?;
        url.query_pairs_mut().append_pair(&self.challenge.param, answer);
        Ok(url.to_string())
    }

    async fn run_session(
        &self,
        browser: &ChromiumProcess,
        events: &mut mpsc::UnboundedReceiver<CdpEvent>,
        url: &str,
    ) -> Result<Vec<DialogSignal>, FlagbotError> {
        let session_id = browser.new_isolated_page().await?;
        let conn = browser.connection();

        // Dialog listener goes in before navigation starts: a signal firing
        // during page load must not be missed.
        conn.call(Some(&session_id), "Page.enable", json!({})).await?;
        conn.call(Some(&session_id), "Page.setLifecycleEventsEnabled", json!({ "enabled": true })).await?;

        let mut signals = Vec::new();
        let hard = Duration::from_millis(self.browser.hard_timeout_ms);

        // Hard wall clock from navigation start. Expiry is a verdict, not a
        // transient fault; the scheduler commits the submission as incorrect.
        match tokio::time::timeout(
            hard,
            self.navigate_and_collect(conn, &session_id, events, url, &mut signals),
        ).await {
            Ok(result) => result.map(|_| signals),
            Err(_) => Err(FlagbotError::Timeout(format!(
                "render exceeded the {}ms hard limit", self.browser.hard_timeout_ms
            ))),
        }
    }

    async fn navigate_and_collect(
        &self,
        conn: &CdpConnection,
        session_id: &str,
        events: &mut mpsc::UnboundedReceiver<CdpEvent>,
        url: &str,
        signals: &mut Vec<DialogSignal>,
    ) -> Result<(), FlagbotError> {
        let nav = conn.call(Some(session_id), "Page.navigate", json!({ "url": url })).await?;
        if let Some(err) = nav["errorText"].as_str() {
            if !err.is_empty() {
                return Err(FlagbotError::Browser(format!("navigation failed: {}", err)));
            }
        }

        // Collect until network activity settles or the settle window
        // closes, whichever comes first...
        let settle = Duration::from_millis(self.browser.settle_timeout_ms);
        self.collect_signals(conn, session_id, events, signals, settle, true).await?;

        // ...then keep listening briefly so deferred payloads can still fire.
        let dwell = Duration::from_millis(self.browser.dwell_ms);
        if !dwell.is_zero() {
            self.collect_signals(conn, session_id, events, signals, dwell, false).await?;
        }
        Ok(())
    }

    async fn collect_signals(
        &self,
        conn: &CdpConnection,
        session_id: &str,
        events: &mut mpsc::UnboundedReceiver<CdpEvent>,
        signals: &mut Vec<DialogSignal>,
        window: Duration,
        until_idle: bool,
    ) -> Result<(), FlagbotError> {
        let deadline = Instant::now() + window;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(());
            }

            let event = match tokio::time::timeout(remaining, events.recv()).await {
                Err(_) => return Ok(()), // window elapsed
                Ok(None) => return Err(FlagbotError::Browser("browser closed the event stream".into())),
                Ok(Some(event)) => event,
            };
            if event.session_id.as_deref() != Some(session_id) {
                continue;
            }

            match event.method.as_str() {
                "Page.javascriptDialogOpening" => {
                    let message = event.params["message"].as_str().unwrap_or_default().to_string();
                    let kind = event.params["type"].as_str().unwrap_or("alert").to_string();
                    debug!(kind = %kind, "dialog signal captured");
                    signals.push(DialogSignal { kind, message });
                    // Dismiss immediately: an unacknowledged dialog freezes
                    // the page and would deadlock the session.
                    conn.call(Some(session_id), "Page.handleJavaScriptDialog", json!({ "accept": false })).await?;
                }
                "Page.lifecycleEvent" => {
                    if until_idle && event.params["name"].as_str() == Some("networkIdle") {
                        return Ok(());
                    }
                }
                _ => {}
            }
        }
    }
}

#[async_trait]
impl PageRenderer for ChromiumRenderer {
    async fn render(&self, submission: &Submission) -> Result<VerificationSession, FlagbotError> {
        let target_url = self.target_url(&submission.answer)?;
        let (browser, mut events) = ChromiumProcess::launch(&self.browser).await?;

        let result = self.run_session(&browser, &mut events, &target_url).await;

        // Teardown happens whatever the drive produced.
        browser.shutdown().await;

        let signals = result?;
        Ok(VerificationSession {
            submission_id: submission.id,
            target_url,
            signals,
        })
    }
}
