//! Process shell around the soak driver.
//!
//! Loads the test image, checks the endpoint can be reached, wires stop signals to the driver's
//! cancellation token and optionally serves Prometheus metrics.
use crate::{
    cli::{SoakCli, DEFAULT_IMAGE},
    error::RuntimeError,
    signal::spawn_stop_listener,
};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use soak::core::{SoakConfig, DEFAULT_MODEL, DEFAULT_REGION};
use soak::payload::{ImagePayload, PromptPayload};
use soak::{HttpInferenceClient, RunSummary, SoakDriver};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
#[allow(unused)]
use tracing::{debug, error, info, instrument, warn};

/// Default soak runtime.
///
/// # Example
///
/// ```no_run
/// use soak_runtime::SoakRuntime;
///
/// #[tokio::main]
/// async fn main() {
///     let summary = SoakRuntime::new()
///         .with_args()
///         .run()
///         .await
///         .expect("soak run failed");
///     println!("{} rounds", summary.batches);
/// }
/// ```
pub struct SoakRuntime {
    region: String,
    model: String,
    endpoint: Option<String>,
    image: PathBuf,
    data_dir: Option<PathBuf>,
    api_key: Option<String>,
    metrics_addr: Option<SocketAddr>,
}

impl Default for SoakRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl SoakRuntime {
    pub fn new() -> Self {
        SoakRuntime {
            region: DEFAULT_REGION.to_string(),
            model: DEFAULT_MODEL.to_string(),
            endpoint: None,
            image: PathBuf::from(DEFAULT_IMAGE),
            data_dir: None,
            api_key: None,
            metrics_addr: None,
        }
    }

    /// Use the command-line arguments.
    ///
    /// `--region` and `--model` pick the target; `--endpoint`, `--image`, `--data-dir`,
    /// `--api-key` and `--metrics` adjust the plumbing. The level plan itself is fixed.
    ///
    /// # Example
    /// ```ignore
    /// $ ./inference-soak --region us-east-1 --model us.amazon.nova-2-lite-v1:0
    /// ```
    pub fn with_args(self) -> Self {
        self.apply(SoakCli::parse())
    }

    fn apply(mut self, args: SoakCli) -> Self {
        self.region = args.region;
        self.model = args.model;
        self.endpoint = args.endpoint;
        self.image = args.image;
        self.data_dir = args.data_dir;
        self.api_key = args.api_key;
        self.metrics_addr = args.metrics_addr;
        self
    }

    pub fn region(mut self, region: &str) -> Self {
        self.region = region.to_string();
        self
    }

    pub fn model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = Some(endpoint.to_string());
        self
    }

    pub fn image(mut self, image: impl Into<PathBuf>) -> Self {
        self.image = image.into();
        self
    }

    pub fn data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(data_dir.into());
        self
    }

    pub fn api_key(mut self, api_key: &str) -> Self {
        self.api_key = Some(api_key.to_string());
        self
    }

    pub fn metrics(mut self, addr: SocketAddr) -> Self {
        self.metrics_addr = Some(addr);
        self
    }

    /// Driver configuration: compile-time plan plus the region, model and data directory.
    pub fn config(&self) -> SoakConfig {
        let config = SoakConfig::new(&self.region, &self.model);
        match &self.data_dir {
            Some(dir) => config.data_dir(dir),
            None => config,
        }
    }

    #[instrument(name = "inference-soak", skip_all, fields(region = %self.region))]
    pub async fn run(self) -> Result<RunSummary, RuntimeError> {
        let config = self.config();
        config.validate().map_err(soak::SoakError::from)?;

        let image = ImagePayload::load(&self.image)?;
        info!(
            "Loaded test image {} ({} bytes)",
            self.image.display(),
            image.size()
        );

        let client = match &self.endpoint {
            Some(endpoint) => HttpInferenceClient::with_endpoint(endpoint, self.api_key.clone()),
            None => HttpInferenceClient::new(&self.region, self.api_key.clone()),
        }?;
        client.check_reachable().await?;
        info!("Endpoint {} is reachable", client.endpoint());

        if let Some(addr) = self.metrics_addr {
            PrometheusBuilder::new().with_http_listener(addr).install()?;
            info!("Serving metrics on {addr}");
        }

        let token = CancellationToken::new();
        spawn_stop_listener(token.clone())?;
        info!("Press Ctrl+C to stop; rerun to resume");

        let summary = SoakDriver::new(config, Arc::new(client), PromptPayload::with_image(image))
            .run(token)
            .await?;
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use soak::SoakError;
    use std::path::Path;

    #[test]
    fn config_follows_region() {
        let config = SoakRuntime::new().region("ap-northeast-1").config();
        assert_eq!(config.region, "ap-northeast-1");
        assert_eq!(config.data_dir, Path::new("./soak_data_ap_northeast_1"));
        assert_eq!(config.levels, vec![1, 5, 10]);
    }

    #[test]
    fn data_dir_override() {
        let config = SoakRuntime::new().data_dir("/var/soak").config();
        assert_eq!(config.data_dir, Path::new("/var/soak"));
        assert_eq!(config.state_path(), Path::new("/var/soak/run_state.json"));
    }

    #[test]
    fn args_are_applied() {
        let args = SoakCli::try_parse_from([
            "inference-soak",
            "--region",
            "eu-west-1",
            "--model",
            "m",
            "--data-dir",
            "/tmp/x",
        ])
        .unwrap();
        let config = SoakRuntime::new().apply(args).config();
        assert_eq!(config.region, "eu-west-1");
        assert_eq!(config.model_id, "m");
        assert_eq!(config.data_dir, Path::new("/tmp/x"));
    }

    #[tracing_test::traced_test]
    #[tokio::test]
    async fn missing_image_aborts_before_any_request() {
        let dir = tempfile::tempdir().unwrap();
        let res = SoakRuntime::new()
            .image(dir.path().join("missing.png"))
            .data_dir(dir.path())
            .endpoint("http://127.0.0.1:9")
            .run()
            .await;

        assert!(matches!(
            res,
            Err(RuntimeError::Soak(SoakError::MissingInput(_)))
        ));
        assert!(!dir.path().join("run_state.json").exists());
    }

    #[tokio::test]
    async fn unreachable_endpoint_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("test_image.png");
        std::fs::write(&image, b"\x89PNG").unwrap();

        // Nothing listens on the discard port.
        let res = SoakRuntime::new()
            .image(&image)
            .data_dir(dir.path())
            .endpoint("http://127.0.0.1:9")
            .run()
            .await;

        assert!(matches!(
            res,
            Err(RuntimeError::Soak(SoakError::Unreachable { .. }))
        ));
    }
}
