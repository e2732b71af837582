use soak_runtime::SoakRuntime;
#[allow(unused)]
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const DEFAULT_FILTER: &str = "inference_soak=info,soak=info,soak_runtime=info";

#[tokio::main]
async fn main() {
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        )
        .init();

    match SoakRuntime::new().with_args().run().await {
        Ok(summary) if summary.completed => {
            info!("Data: {}", summary.log_path.display());
        }
        Ok(summary) => {
            info!(
                "Stopped after {} batch rounds; state saved to {}",
                summary.batches,
                summary.state_path.display()
            );
        }
        Err(err) => {
            error!("Soak test failed: {err}");
            std::process::exit(1);
        }
    }
}
