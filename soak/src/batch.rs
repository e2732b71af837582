use crate::client::{InferenceClient, InvokeRequest};
use crate::retry::run_request_with_retry;
use futures_util::future::join_all;
use soak_core::{RequestOutcome, RetryPolicy};
use std::sync::Arc;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn, Instrument};

/// Runs every request on its own task and waits for all of them.
///
/// Always yields exactly one outcome per request, in request order. A task that dies is counted as
/// a failure.
pub(crate) async fn fan_out<C>(
    client: &Arc<C>,
    policy: &RetryPolicy,
    requests: Vec<InvokeRequest>,
) -> Vec<RequestOutcome>
where
    C: InferenceClient + Send + Sync + 'static,
{
    let handles: Vec<_> = requests
        .into_iter()
        .map(|request| {
            let client = client.clone();
            let policy = policy.clone();
            tokio::spawn(
                async move { run_request_with_retry(client.as_ref(), &policy, &request).await }
                    .in_current_span(),
            )
        })
        .collect();

    join_all(handles)
        .await
        .into_iter()
        .map(|res| {
            res.unwrap_or_else(|err| {
                error!("Request task failed: {err}");
                RequestOutcome::Failure {
                    error: format!("request task failed: {err}"),
                    attempts: 0,
                }
            })
        })
        .collect()
}
