//! Mock of the inference runtime's `InvokeModel` endpoint.
//!
//! Answers `POST /model/{model_id}/invoke` after a simulated inference delay, echoes the requested
//! service tier, and can throttle with the same `429 ThrottlingException` shape as the real service.
use axum::{
    debug_handler,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
#[allow(unused)]
use metrics::{counter, gauge, histogram};
use rand_distr::{Distribution, Normal};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::{
    num::NonZeroU32,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tower_http::trace::TraceLayer;
use tracing::debug;

pub const SERVICE_TIER_HEADER: &str = "x-amzn-bedrock-service-tier";
pub const INVOCATION_LATENCY_HEADER: &str = "x-amzn-bedrock-invocation-latency";

pub mod prelude {
    pub use crate::{MockConfig, MockHandle};
}

#[derive(Clone, Debug)]
pub struct MockConfig {
    /// Mean simulated inference time.
    pub latency: Duration,
    /// Standard deviation of the simulated inference time.
    pub jitter: Duration,
    /// Requests per second served before throttling kicks in.
    pub max_tps: Option<u32>,
    /// Throttle this many requests before serving any.
    pub throttle_first: u64,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            latency: Duration::from_millis(5),
            jitter: Duration::ZERO,
            max_tps: None,
            throttle_first: 0,
        }
    }
}

struct MockState {
    config: MockConfig,
    limiter: Option<DefaultDirectRateLimiter>,
    requests: AtomicU64,
}

/// A mock running in the background.
#[derive(Clone)]
pub struct MockHandle {
    pub addr: SocketAddr,
    state: Arc<MockState>,
}

impl MockHandle {
    pub fn endpoint(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Invocations received so far, throttled ones included.
    pub fn requests(&self) -> u64 {
        self.state.requests.load(Ordering::SeqCst)
    }
}

fn state(config: MockConfig) -> Arc<MockState> {
    Arc::new(MockState {
        limiter: config.max_tps.map(rate_limiter),
        config,
        requests: AtomicU64::new(0),
    })
}

fn app(state: Arc<MockState>) -> Router {
    Router::new()
        .route("/model/:model_id/invoke", post(invoke))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

pub fn router(config: MockConfig) -> Router {
    app(state(config))
}

pub async fn run(addr: SocketAddr, config: MockConfig) {
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, router(config)).await.unwrap();
}

/// Binds an ephemeral local port and serves in the background.
pub async fn spawn(config: MockConfig) -> std::io::Result<MockHandle> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = state(config);

    let app = app(state.clone());
    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            tracing::error!("Mock service stopped: {err}");
        }
    });

    Ok(MockHandle { addr, state })
}

#[debug_handler]
async fn invoke(
    State(state): State<Arc<MockState>>,
    Path(model_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let n = state.requests.fetch_add(1, Ordering::SeqCst) + 1;
    TPS_MEASURE.fetch_add(1, Ordering::Relaxed);
    counter!("mock-service.requests").increment(1);

    let limited = state
        .limiter
        .as_ref()
        .is_some_and(|limiter| limiter.check().is_err());
    if n <= state.config.throttle_first || limited {
        debug!("Throttling request #{n} for {model_id}");
        counter!("mock-service.throttled").increment(1);
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({
                "__type": "ThrottlingException",
                "message": "Too many requests, please wait before trying again.",
            })),
        )
            .into_response();
    }

    let Some(messages) = body["messages"].as_array() else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "__type": "ValidationException",
                "message": "Malformed input request: messages is required",
            })),
        )
            .into_response();
    };

    let delay = simulated_latency(&state.config);
    tokio::time::sleep(delay).await;

    let tier = headers
        .get(SERVICE_TIER_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("default")
        .to_string();
    let input_tokens = estimate_input_tokens(messages);
    let output_tokens = body["inferenceConfig"]["maxTokens"]
        .as_u64()
        .unwrap_or(100)
        .min(48);

    (
        [
            (INVOCATION_LATENCY_HEADER, delay.as_millis().to_string()),
            (SERVICE_TIER_HEADER, tier),
        ],
        Json(json!({
            "output": {
                "message": {
                    "role": "assistant",
                    "content": [{ "text": "A test pattern." }],
                }
            },
            "stopReason": "end_turn",
            "usage": {
                "inputTokens": input_tokens,
                "outputTokens": output_tokens,
                "totalTokens": input_tokens + output_tokens,
            },
        })),
    )
        .into_response()
}

fn simulated_latency(config: &MockConfig) -> Duration {
    if config.jitter.is_zero() {
        return config.latency;
    }
    match Normal::new(config.latency.as_secs_f64(), config.jitter.as_secs_f64()) {
        Ok(normal) => Duration::from_secs_f64(normal.sample(&mut rand::thread_rng()).max(0.)),
        Err(_) => config.latency,
    }
}

/// Rough token count: 4 characters per text token, a flat cost per image.
fn estimate_input_tokens(messages: &[Value]) -> u64 {
    messages
        .iter()
        .filter_map(|message| message["content"].as_array())
        .flatten()
        .map(|block| {
            if block.get("image").is_some() {
                1_000
            } else {
                block["text"].as_str().map_or(0, |text| text.len() as u64 / 4 + 1)
            }
        })
        .sum()
}

/** Utils **/

pub fn rate_limiter(tps: u32) -> DefaultDirectRateLimiter {
    RateLimiter::direct(Quota::per_second(
        NonZeroU32::new(tps).unwrap_or(NonZeroU32::MIN),
    ))
}

/** TPS Printer **/

static TPS_MEASURE: AtomicU64 = AtomicU64::new(0);

pub async fn tps_measure_task() {
    loop {
        tokio::time::sleep(Duration::from_millis(1000)).await;
        let requests = TPS_MEASURE.swap(0, Ordering::Relaxed);
        if requests > 0 {
            println!("{requests} requests/s");
        }
    }
}
