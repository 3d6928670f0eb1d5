//! Headless Chromium process lifecycle. One process per submission: spawn
//! with a throwaway profile, attach the DevTools pipe, tear down
//! unconditionally when the render ends.

use std::os::fd::AsRawFd;
use std::path::PathBuf;
use std::process::Stdio;

use nix::fcntl::OFlag;
use nix::unistd::{dup2, pipe2};
use serde_json::json;
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::debug;

use crate::config::BrowserConfig;
use crate::errors::FlagbotError;
use super::cdp::{CdpConnection, CdpEvent};

pub struct ChromiumProcess {
    child: Child,
    conn: CdpConnection,
    profile_dir: PathBuf,
}

impl ChromiumProcess {
    /// Launch the browser with a fresh profile directory. Every failure in
    /// here is a launch error: the submission stays unchecked and the
    /// scheduler retries later with backoff.
    pub async fn launch(config: &BrowserConfig) -> Result<(Self, mpsc::UnboundedReceiver<CdpEvent>), FlagbotError> {
        let profile_dir = std::env::temp_dir()
            .join(format!("flagbot-profile-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&profile_dir).await?;

        // The browser reads commands on fd 3 and writes frames on fd 4.
        let (cmd_read, cmd_write) = pipe2(OFlag::O_CLOEXEC)
            .map_err(|e| FlagbotError::Browser(format!("pipe creation failed: {}", e)))?;
        let (out_read, out_write) = pipe2(OFlag::O_CLOEXEC)
            .map_err(|e| FlagbotError::Browser(format!("pipe creation failed: {}", e)))?;

        let mut command = Command::new(&config.binary);
        command
            .arg("--headless=new")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--remote-debugging-pipe")
            .arg(format!("--user-data-dir={}", profile_dir.display()))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let child_read = cmd_read.as_raw_fd();
        let child_write = out_write.as_raw_fd();
        unsafe {
            command.pre_exec(move || {
                // dup2 clears O_CLOEXEC on the duplicate, so the child keeps
                // exactly these two descriptors. Installed read end first:
                // it carries the lower fd number, so the write end can never
                // be clobbered before its own turn.
                install_fd(child_read, 3)?;
                install_fd(child_write, 4)?;
                Ok(())
            });
        }

        let child = command.spawn().map_err(|e| {
            FlagbotError::Browser(format!("failed to launch {}: {}", config.binary, e))
        })?;

        // Parent keeps the opposite ends only.
        drop(cmd_read);
        drop(out_write);
        let writer = tokio::fs::File::from_std(std::fs::File::from(cmd_write));
        let reader = tokio::fs::File::from_std(std::fs::File::from(out_read));

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let conn = CdpConnection::new(writer, reader, event_tx);

        Ok((Self { child, conn, profile_dir }, event_rx))
    }

    pub fn connection(&self) -> &CdpConnection {
        &self.conn
    }

    /// Create an isolated page: a fresh browser context (no cookies or
    /// storage shared with any other submission), one target, one flat
    /// session. Returns the session id for scoping page commands.
    pub async fn new_isolated_page(&self) -> Result<String, FlagbotError> {
        let context = self.conn
            .call(None, "Target.createBrowserContext", json!({ "disposeOnDetach": true }))
            .await?;
        let context_id = context["browserContextId"].as_str().ok_or_else(|| {
            FlagbotError::Browser("createBrowserContext returned no context id".into())
        })?.to_string();

        let target = self.conn
            .call(None, "Target.createTarget", json!({
                "url": "about:blank",
                "browserContextId": context_id,
            }))
            .await?;
        let target_id = target["targetId"].as_str().ok_or_else(|| {
            FlagbotError::Browser("createTarget returned no target id".into())
        })?.to_string();

        let attached = self.conn
            .call(None, "Target.attachToTarget", json!({
                "targetId": target_id,
                "flatten": true,
            }))
            .await?;
        let session_id = attached["sessionId"].as_str().ok_or_else(|| {
            FlagbotError::Browser("attachToTarget returned no session id".into())
        })?.to_string();

        Ok(session_id)
    }

    /// Force teardown: kill the process, reap it, drop the profile. Safe to
    /// call on an already-dead browser.
    pub async fn shutdown(mut self) {
        self.conn.shutdown();
        if let Err(e) = self.child.start_kill() {
            debug!(error = %e, "browser kill failed (already exited?)");
        }
        let _ = self.child.wait().await;
        if let Err(e) = tokio::fs::remove_dir_all(&self.profile_dir).await {
            debug!(error = %e, path = %self.profile_dir.display(), "profile cleanup failed");
        }
    }
}

/// Place `src` at `dst` with O_CLOEXEC cleared. dup2 does not clear the
/// flag when both descriptors are equal, so that case bounces through a
/// spare slot. Runs between fork and exec; dup/dup2/close are all
/// async-signal-safe.
fn install_fd(src: std::os::fd::RawFd, dst: std::os::fd::RawFd) -> std::io::Result<()> {
    if src == dst {
        let spare = nix::unistd::dup(src).map_err(std::io::Error::from)?;
        dup2(spare, dst).map_err(std::io::Error::from)?;
        nix::unistd::close(spare).map_err(std::io::Error::from)?;
    } else {
        dup2(src, dst).map_err(std::io::Error::from)?;
    }
    Ok(())
}

impl Drop for ChromiumProcess {
    fn drop(&mut self) {
        // kill_on_drop reaps the child on early-exit paths; the profile dir
        // still needs a best-effort sweep.
        let _ = std::fs::remove_dir_all(&self.profile_dir);
    }
}
