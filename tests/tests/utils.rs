use mock_service::{MockConfig, MockHandle};
use soak::core::{RetryPolicy, SoakConfig};
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

pub const MODEL: &str = "us.amazon.nova-2-lite-v1:0";

#[allow(unused)]
pub fn init() {
    static ONCE_LOCK: OnceLock<()> = OnceLock::new();

    ONCE_LOCK.get_or_init(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            default_panic(info);
            error!("Panic occurred: {info:?}");
        }));

        let _ = FmtSubscriber::builder()
            .with_max_level(Level::DEBUG)
            .with_env_filter("soak=debug,soak_runtime=debug,mock_service=debug")
            .try_init();
    });
}

#[allow(unused)]
pub async fn mock(config: MockConfig) -> MockHandle {
    init();
    mock_service::spawn(config)
        .await
        .expect("mock service failed to bind")
}

/// A plan short enough for a test: one round per level, fast retries.
#[allow(unused)]
pub fn quick_config(data_dir: &Path, levels: &[usize]) -> SoakConfig {
    SoakConfig::new("us-west-2", MODEL)
        .levels(levels)
        .level_duration(Duration::from_millis(50))
        .interval(Duration::from_millis(100))
        .retry(RetryPolicy {
            max_attempts: 3,
            throttle_backoff: Duration::from_millis(20),
            retry_delay: Duration::from_millis(10),
        })
        .data_dir(data_dir)
}
