use tracing::info;

use crate::cli::commands::RunArgs;
use crate::errors::FlagbotError;

/// One verification pass, then exit. Useful for cron-style deployments and
/// for poking a stuck queue by hand.
pub async fn handle_check(args: RunArgs) -> Result<(), FlagbotError> {
    let config = super::run::load_config(&args).await?;
    let (scheduler, _cancel) = super::run::build_scheduler(&config)?;

    let summary = scheduler.run_tick().await?;
    info!(
        processed = summary.processed,
        correct = summary.correct,
        skipped = summary.skipped,
        "verification pass complete"
    );
    Ok(())
}
