mod bootstrap;

use std::time::Duration;

use anyhow::Result;
use duel_core::settings::Settings;
use duel_runtime::orchestrator::{ReportOrchestrator, RunConfig};
use duel_runtime::rating_client::RatingClient;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let settings = Settings::load()?;

    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;

    tracing::info!("duel-stats v{} starting", env!("CARGO_PKG_VERSION"));

    let config = RunConfig::from(&settings);
    tracing::info!(
        "Logs: {}, cache: {}, output: {}",
        config.logs_dir.display(),
        config.cache_path.display(),
        config.output.display()
    );

    let source = if settings.offline {
        tracing::info!("Offline mode; the rating service will not be contacted");
        None
    } else {
        Some(RatingClient::new(
            settings.rating_url.clone(),
            settings.game_type.clone(),
            Duration::from_secs(settings.request_timeout),
        )?)
    };

    let summary = ReportOrchestrator::new(config, source).run().await?;

    tracing::info!(
        "Done: {} rows written from {} matches ({} skipped, {} failed, {} unrated)",
        summary.rows_written,
        summary.matches_folded,
        summary.matches_skipped,
        summary.matches_failed,
        summary.matches_missing_rating
    );
    tracing::debug!("Run summary: {:?}", summary);

    Ok(())
}
