use metrics_exporter_prometheus::PrometheusBuilder;
use mock_service::MockConfig;
use std::net::SocketAddr;
use std::time::Duration;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_env_filter("mock_service=debug,tower_http=info")
        .init();

    PrometheusBuilder::new()
        .with_http_listener("0.0.0.0:8002".parse::<SocketAddr>()?)
        .install()?;

    tokio::spawn(mock_service::tps_measure_task());

    let config = MockConfig {
        latency: Duration::from_millis(800),
        jitter: Duration::from_millis(200),
        max_tps: Some(20),
        throttle_first: 0,
    };
    mock_service::run("0.0.0.0:3002".parse()?, config).await;
    Ok(())
}
