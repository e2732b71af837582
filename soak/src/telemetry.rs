//! `metrics` facade hooks. Compiled out without the `metrics` feature.
use soak_core::ServiceTier;
#[allow(unused)]
use std::time::Duration;

pub(crate) const REQUEST_SUCCESS: &str = "soak.request.success";
pub(crate) const REQUEST_ERROR: &str = "soak.request.error";
pub(crate) const REQUEST_RETRY: &str = "soak.request.retry";
pub(crate) const REQUEST_LATENCY: &str = "soak.request.latency";

#[allow(unused)]
pub(crate) fn describe() {
    #[cfg(feature = "metrics")]
    {
        metrics::describe_counter!(REQUEST_SUCCESS, "Requests that eventually succeeded");
        metrics::describe_counter!(REQUEST_ERROR, "Requests that exhausted their attempts");
        metrics::describe_counter!(REQUEST_RETRY, "Failed attempts that were retried");
        metrics::describe_histogram!(
            REQUEST_LATENCY,
            metrics::Unit::Milliseconds,
            "Client-observed latency of successful attempts"
        );
    }
}

#[allow(unused)]
pub(crate) fn record_success(tier: ServiceTier, latency: Duration) {
    #[cfg(feature = "metrics")]
    {
        metrics::counter!(REQUEST_SUCCESS, "tier" => tier.as_str()).increment(1);
        metrics::histogram!(REQUEST_LATENCY, "tier" => tier.as_str())
            .record(latency.as_secs_f64() * 1e3);
    }
}

#[allow(unused)]
pub(crate) fn record_error(tier: ServiceTier) {
    #[cfg(feature = "metrics")]
    metrics::counter!(REQUEST_ERROR, "tier" => tier.as_str()).increment(1);
}

#[allow(unused)]
pub(crate) fn record_retry(tier: ServiceTier, throttled: bool) {
    #[cfg(feature = "metrics")]
    metrics::counter!(
        REQUEST_RETRY,
        "tier" => tier.as_str(),
        "throttled" => if throttled { "true" } else { "false" }
    )
    .increment(1);
}
