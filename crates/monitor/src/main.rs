//! Monitor binary that streams transaction updates from a Geyser endpoint
//! and reports token balance changes for the watched owners.

use std::io;
use std::sync::Arc;

use balance_watch_domain::config::MonitorConfig;
use balance_watch_domain::services::telemetry::{init_telemetry, TelemetryConfig};
use balance_watch_monitor::{
    connect_geyser, run_session, GeyserChannel, MonitorError, TracingObserver, UpdateDispatcher,
};
use balance_watch_storage::SinkBuilder;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> io::Result<()> {
    if let Err(err) = bootstrap().await {
        eprintln!("[monitor] terminated: {err}");
        return Err(io::Error::other(err.to_string()));
    }

    Ok(())
}

async fn bootstrap() -> Result<(), MonitorError> {
    let config = MonitorConfig::load_from_env()?;
    let telemetry_config = TelemetryConfig::from_env("MONITOR");
    let telemetry = init_telemetry(&telemetry_config)?;

    let sink = SinkBuilder::new()
        .snapshot_dir(config.snapshot_dir())
        .build()
        .await?;
    let dispatcher = Arc::new(UpdateDispatcher::new(sink, Arc::new(TracingObserver)));

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("ctrl-c received, shutting down");
                signal_token.cancel();
            }
            Err(err) => warn!(%err, "failed to listen for ctrl-c"),
        }
    });

    let mut client = connect_geyser(&config).await?;
    let (requests, updates) = client
        .subscribe()
        .await
        .map_err(|err| MonitorError::Connect(err.to_string()))?;
    let channel = GeyserChannel::new(requests, updates);

    let result = run_session(
        channel,
        config.filter(),
        dispatcher,
        config.max_in_flight(),
        shutdown,
    )
    .await;

    debug!(metrics = %telemetry.render_metrics(), "final metrics");
    result
}
