use std::time::Duration;

use balance_watch_domain::config::MonitorConfig;
use tonic::{service::Interceptor, transport::ClientTlsConfig};
use tracing::info;
use yellowstone_grpc_client::GeyserGrpcClient;

use crate::worker::MonitorError;

const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(10);
const KEEPALIVE_TIMEOUT: Duration = Duration::from_secs(1);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Dials the Geyser endpoint. TLS uses the platform roots unless the
/// configuration asks for a plaintext connection.
pub async fn connect_geyser(
    config: &MonitorConfig,
) -> Result<GeyserGrpcClient<impl Interceptor>, MonitorError> {
    info!(
        endpoint = config.geyser_endpoint(),
        insecure = config.insecure(),
        "connecting to geyser"
    );

    let mut builder = GeyserGrpcClient::build_from_shared(config.geyser_endpoint().to_string())
        .map_err(connect_error)?
        .x_token(config.x_token().map(str::to_string))
        .map_err(connect_error)?
        .connect_timeout(CONNECT_TIMEOUT)
        .http2_keep_alive_interval(KEEPALIVE_INTERVAL)
        .keep_alive_timeout(KEEPALIVE_TIMEOUT)
        .keep_alive_while_idle(true);

    if !config.insecure() {
        builder = builder
            .tls_config(ClientTlsConfig::new().with_native_roots())
            .map_err(connect_error)?;
    }

    builder.connect().await.map_err(connect_error)
}

fn connect_error(err: impl std::fmt::Display) -> MonitorError {
    MonitorError::Connect(err.to_string())
}
