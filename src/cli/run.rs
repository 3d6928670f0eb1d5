use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::browser::ChromiumRenderer;
use crate::cli::commands::RunArgs;
use crate::config::{self, FlagbotConfig};
use crate::db::Database;
use crate::errors::FlagbotError;
use crate::oracle::FlagOracle;
use crate::scheduler::Scheduler;
use crate::scoring::HttpScoreNotifier;

pub async fn handle_run(args: RunArgs) -> Result<(), FlagbotError> {
    let config = load_config(&args).await?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        built = env!("BUILD_TIMESTAMP"),
        git = option_env!("GIT_HASH").unwrap_or("unknown"),
        challenge = %config.challenge.base_url,
        "flagbot starting"
    );

    let (scheduler, cancel) = build_scheduler(&config)?;

    // Ctrl-C cancels cooperatively; an in-flight render still ends on its
    // own clock.
    let ctrl_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_cancel.cancel();
        }
    });

    scheduler.run().await
}

pub(super) async fn load_config(args: &RunArgs) -> Result<FlagbotConfig, FlagbotError> {
    let mut config = config::parse_config(Path::new(&args.config)).await?;
    if let Some(path) = &args.database {
        config.database.path = path.clone();
    }
    if let Some(secs) = args.interval {
        config.scheduler.poll_interval_secs = secs;
    }
    Ok(config)
}

pub(super) fn build_scheduler(config: &FlagbotConfig) -> Result<(Scheduler, CancellationToken), FlagbotError> {
    let db = Database::new(&config.database.path)?;
    let renderer = Arc::new(ChromiumRenderer::new(
        config.browser.clone(),
        config.challenge.clone(),
    ));
    let oracle = Arc::new(FlagOracle::from_config(&config.oracle)?);
    let notifier = Arc::new(HttpScoreNotifier::new(&config.scoring)?);
    let cancel = CancellationToken::new();

    let scheduler = Scheduler::new(
        db,
        renderer,
        oracle,
        notifier,
        config.scheduler.clone(),
        cancel.clone(),
    );
    Ok((scheduler, cancel))
}
