#[path = "blockpost-operator/cli.rs"]
mod cli;
#[path = "blockpost-operator/setup.rs"]
mod setup;

use crate::cli::Cli;
use blockpost_core::application::RequestTracker;
use blockpost_service::service::metrics::Metrics;
use blockpost_service::service::OperatorFlow;
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Cli::parse_args();
    args.apply_to_env();

    let app_config = Arc::new(blockpost_core::infrastructure::config::load_app_config()?);
    setup::init_logging(&app_config)?;
    info!("blockpost-operator starting version={} data_dir={}", env!("CARGO_PKG_VERSION"), app_config.service.data_dir);

    let identity = Arc::new(setup::load_identity(&app_config).await?);
    setup::log_startup_banner(&app_config, &identity);

    let flow = OperatorFlow::connect(app_config.clone(), identity)?;
    if let Err(err) = flow.register().await {
        error!("registration failed; exiting error={}", err);
        return Err(err.into());
    }
    if args.register_only {
        info!("register-only mode complete");
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    spawn_shutdown_listener(shutdown_tx);
    spawn_status_reporter(
        flow.metrics(),
        flow.monitor().tracker().clone(),
        Duration::from_secs(app_config.service.status_interval_secs.max(1)),
    );

    if let Err(err) = flow.run(shutdown_rx).await {
        error!("operator stopped on fatal error error={}", err);
        return Err(err.into());
    }
    info!("blockpost-operator stopped");
    Ok(())
}

fn spawn_shutdown_listener(shutdown_tx: watch::Sender<bool>) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("shutdown signal received"),
            Err(err) => warn!("failed to listen for shutdown signal error={}", err),
        }
        let _ = shutdown_tx.send(true);
    });
}

fn spawn_status_reporter(metrics: Arc<Metrics>, tracker: RequestTracker, interval: Duration) {
    tokio::spawn(async move {
        debug!("status reporter started interval_seconds={}", interval.as_secs());
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let snapshot = metrics.snapshot();
            info!(
                "periodic status report uptime_minutes={} observed={} duplicates={} signed={} confirmed={} already_recorded={} failed={} submitted={} retries={} pending={} completed_tracked={}",
                snapshot.uptime.as_secs() / 60,
                snapshot.requests_observed,
                snapshot.duplicates_skipped,
                snapshot.responses_signed,
                snapshot.responses_confirmed,
                snapshot.responses_already_recorded,
                snapshot.responses_failed,
                snapshot.transactions_submitted,
                snapshot.submission_retries,
                tracker.pending_len(),
                tracker.completed_len()
            );
        }
    });
}
