use soak::SoakError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Soak(#[from] SoakError),

    #[error("Unable to listen for stop signals: {0}")]
    Signal(#[source] std::io::Error),

    #[error("Unable to start the metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),
}
