use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::browser::PageRenderer;
use crate::config::SchedulerConfig;
use crate::db::Database;
use crate::errors::retry::{with_retry, RetryConfig};
use crate::errors::FlagbotError;
use crate::models::Submission;
use crate::oracle::Oracle;
use crate::scoring::ScoreNotifier;

/// Per-tick counters, for logging and for the one-shot `check` mode.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickSummary {
    /// Submissions committed this tick.
    pub processed: usize,
    /// Of those, positive verdicts.
    pub correct: usize,
    /// Submissions left unchecked for a later tick.
    pub skipped: usize,
}

/// Single-tasked polling loop. Each firing runs one full batch to
/// completion before the next is scheduled, so at most one browser session
/// is ever open. Cancellation is process-level only.
pub struct Scheduler {
    db: Database,
    renderer: Arc<dyn PageRenderer>,
    oracle: Arc<dyn Oracle>,
    notifier: Arc<dyn ScoreNotifier>,
    config: SchedulerConfig,
    cancel: CancellationToken,
}

impl Scheduler {
    pub fn new(
        db: Database,
        renderer: Arc<dyn PageRenderer>,
        oracle: Arc<dyn Oracle>,
        notifier: Arc<dyn ScoreNotifier>,
        config: SchedulerConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self { db, renderer, oracle, notifier, config, cancel }
    }

    pub async fn run(&self) -> Result<(), FlagbotError> {
        let period = Duration::from_secs(self.config.poll_interval_secs);
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            period_secs = self.config.poll_interval_secs,
            oracle = self.oracle.name(),
            "verification loop started"
        );

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("verification loop stopping");
                    return Ok(());
                }
                _ = interval.tick() => {}
            }

            match self.run_tick().await {
                Ok(summary) if summary.processed > 0 || summary.skipped > 0 => {
                    info!(
                        processed = summary.processed,
                        correct = summary.correct,
                        skipped = summary.skipped,
                        "tick complete"
                    );
                }
                Ok(_) => {}
                // Store unreachable: nothing to do but wait for the next firing.
                Err(e) => warn!(error = %e, "tick skipped"),
            }
        }
    }

    /// One full batch: fetch everything pending and process it strictly in
    /// ascending-id order. A failure in one submission is contained there;
    /// the rest of the batch still runs.
    pub async fn run_tick(&self) -> Result<TickSummary, FlagbotError> {
        let pending = self.db.fetch_pending()?;
        let mut summary = TickSummary::default();

        for submission in pending {
            if self.cancel.is_cancelled() {
                break;
            }
            match self.process(&submission).await {
                Ok(Some(correct)) => {
                    summary.processed += 1;
                    if correct {
                        summary.correct += 1;
                    }
                }
                Ok(None) => summary.skipped += 1,
                Err(e) => {
                    // Payloads are adversarial by construction; one of them
                    // must never stall the batch.
                    error!(submission_id = submission.id, error = %e, "submission processing failed");
                    summary.skipped += 1;
                }
            }
        }
        Ok(summary)
    }

    /// Ok(Some(verdict)) when the verdict was committed, Ok(None) when the
    /// submission was left unchecked for a later tick.
    async fn process(&self, submission: &Submission) -> Result<Option<bool>, FlagbotError> {
        let retry = RetryConfig { max_retries: self.config.launch_retries };
        let rendered = with_retry("render", &retry, || self.renderer.render(submission)).await;

        let verdict = match rendered {
            Ok(session) => {
                let verdict = self.oracle.classify(&session);
                debug!(
                    submission_id = submission.id,
                    signals = session.signals.len(),
                    verdict,
                    "session classified"
                );
                verdict
            }
            // Blowing the hard wall clock is a definitive negative: a
            // payload that cannot prove itself inside the window is wrong.
            Err(FlagbotError::Timeout(reason)) => {
                info!(submission_id = submission.id, %reason, "render timed out, marking incorrect");
                false
            }
            // Renderer could not start; leave the row unchecked.
            Err(e @ FlagbotError::Browser(_)) => {
                warn!(submission_id = submission.id, error = %e, "browser unavailable, leaving submission unchecked");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        // Commit failure propagates: the row stays unchecked and the next
        // tick naturally retries it.
        self.db.mark_checked(submission.id, verdict)?;

        if verdict {
            // Best-effort: the verdict is already durable, and the scoring
            // collaborator credits idempotently on its side.
            if let Err(e) = self.notifier.notify(submission.user_id, submission.problem_id).await {
                warn!(
                    submission_id = submission.id,
                    user_id = submission.user_id,
                    problem_id = submission.problem_id,
                    error = %e,
                    "score notification failed"
                );
            }
        }

        Ok(Some(verdict))
    }
}
