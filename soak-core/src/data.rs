use crate::ServiceTier;
use std::time::Duration;

/// What a single request produced after all of its attempts.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutcome {
    Success(RequestMetrics),
    Failure { error: String, attempts: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequestMetrics {
    pub client_latency: Duration,
    pub server_latency: Duration,
    pub input_tokens: u64,
    pub output_tokens: u64,
    /// Tier reported back by the server, if any.
    pub confirmed_tier: Option<String>,
    pub attempts: u32,
}

impl RequestOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RequestOutcome::Success(_))
    }

    pub fn attempts(&self) -> u32 {
        match self {
            RequestOutcome::Success(metrics) => metrics.attempts,
            RequestOutcome::Failure { attempts, .. } => *attempts,
        }
    }
}

/// Aggregate of one batch at a fixed tier and concurrency.
///
/// Averages cover the successful requests only. Latencies are in milliseconds.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult {
    pub tier: ServiceTier,
    pub concurrency: usize,
    pub successful: usize,
    pub failed: usize,
    pub avg_server_latency: f64,
    pub avg_client_latency: f64,
    pub avg_input_tokens: f64,
    pub avg_output_tokens: f64,
    pub batch_time: Duration,
}

impl BatchResult {
    pub fn from_outcomes(
        tier: ServiceTier,
        concurrency: usize,
        outcomes: &[RequestOutcome],
        batch_time: Duration,
    ) -> Self {
        let successes: Vec<&RequestMetrics> = outcomes
            .iter()
            .filter_map(|outcome| match outcome {
                RequestOutcome::Success(metrics) => Some(metrics),
                RequestOutcome::Failure { .. } => None,
            })
            .collect();

        let mean = |f: fn(&RequestMetrics) -> f64| -> f64 {
            if successes.is_empty() {
                0.
            } else {
                successes.iter().map(|m| f(m)).sum::<f64>() / successes.len() as f64
            }
        };

        Self {
            tier,
            concurrency,
            successful: successes.len(),
            failed: outcomes.len() - successes.len(),
            avg_server_latency: mean(|m| as_millis(m.server_latency)),
            avg_client_latency: mean(|m| as_millis(m.client_latency)),
            avg_input_tokens: mean(|m| m.input_tokens as f64),
            avg_output_tokens: mean(|m| m.output_tokens as f64),
            batch_time,
        }
    }

    pub fn total(&self) -> usize {
        self.successful + self.failed
    }
}

fn as_millis(dur: Duration) -> f64 {
    dur.as_secs_f64() * 1e3
}
