use clap::Parser;
use soak::core::{DEFAULT_MODEL, DEFAULT_REGION};
use std::net::SocketAddr;
use std::path::PathBuf;

pub(crate) const DEFAULT_IMAGE: &str = "test_image.png";

/// Resumable soak test against a multimodal inference endpoint.
///
/// Concurrency levels, hours per level, batch interval and service tiers are fixed. Stop with
/// Ctrl+C at any time and rerun with the same data directory to resume.
#[derive(Parser, Debug)]
#[command(name = "inference-soak", version)]
pub(crate) struct SoakCli {
    /// Region hosting the inference endpoint
    #[arg(long, default_value = DEFAULT_REGION)]
    pub region: String,

    /// Model or inference profile identifier
    #[arg(long, default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Override the endpoint derived from the region
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Image attached to every request
    #[arg(long, default_value = DEFAULT_IMAGE)]
    pub image: PathBuf,

    /// Directory for the CSV log and the resume state [default: ./soak_data_<region>]
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Bearer API key for the endpoint
    #[arg(long, env = "AWS_BEARER_TOKEN_BEDROCK", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Serve Prometheus metrics on this address
    #[arg(long = "metrics")]
    pub metrics_addr: Option<SocketAddr>,
}
