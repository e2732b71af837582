use crate::client::{InferenceClient, InvokeRequest};
use crate::telemetry;
use soak_core::{RequestMetrics, RequestOutcome, RetryPolicy};
use std::time::Duration;
use tokio::time::Instant;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// Issues one request, retrying per `policy`.
///
/// Never fails: once the attempts are exhausted the last error is folded into a
/// [`RequestOutcome::Failure`]. Failed attempts before a success are not reported separately.
pub async fn run_request_with_retry<C>(
    client: &C,
    policy: &RetryPolicy,
    request: &InvokeRequest,
) -> RequestOutcome
where
    C: InferenceClient + Sync,
{
    let tier = request.tier;
    let mut last_error = String::from("no attempt was made");

    for attempt in 1..=policy.max_attempts {
        let start = Instant::now();
        match client.invoke(request).await {
            Ok(res) => {
                let client_latency = start.elapsed();
                telemetry::record_success(tier, client_latency);

                return RequestOutcome::Success(RequestMetrics {
                    client_latency,
                    server_latency: res.server_latency.unwrap_or(Duration::ZERO),
                    input_tokens: res.input_tokens,
                    output_tokens: res.output_tokens,
                    confirmed_tier: res.confirmed_tier,
                    attempts: attempt,
                });
            }
            Err(err) => {
                let throttled = err.is_throttled();
                last_error = err.to_string();

                if attempt < policy.max_attempts {
                    telemetry::record_retry(tier, throttled);
                    let wait = policy.delay_after(attempt, throttled);
                    if throttled {
                        warn!(
                            "{} throttled on attempt {attempt}, retrying in {}",
                            request.test_id,
                            humantime::format_duration(wait)
                        );
                    } else {
                        debug!(
                            "{} failed on attempt {attempt}: {last_error}",
                            request.test_id
                        );
                    }
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }

    telemetry::record_error(tier);
    debug!("{} gave up: {last_error}", request.test_id);
    RequestOutcome::Failure {
        error: last_error,
        attempts: policy.max_attempts,
    }
}
