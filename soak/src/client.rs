//! Seam between the driver and the remote inference endpoint.
use crate::error::SoakError;
use reqwest::header::{HeaderMap, ACCEPT};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use soak_core::ServiceTier;
use std::time::Duration;
use thiserror::Error;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};
use url::Url;

pub const SERVICE_TIER_HEADER: &str = "x-amzn-bedrock-service-tier";
pub const INVOCATION_LATENCY_HEADER: &str = "x-amzn-bedrock-invocation-latency";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);
const PREFLIGHT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone)]
pub struct InvokeRequest {
    pub model_id: String,
    pub tier: ServiceTier,
    pub test_id: String,
    pub body: Value,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvokeResponse {
    /// Server-side invocation latency, when the server reports one.
    pub server_latency: Option<Duration>,
    pub confirmed_tier: Option<String>,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvokeError {
    #[error("Throttled: {0}")]
    Throttled(String),

    #[error("Request rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl InvokeError {
    /// Rate-limit class errors back off harder than everything else.
    pub fn is_throttled(&self) -> bool {
        matches!(self, InvokeError::Throttled(_))
    }
}

/// A remote inference endpoint.
///
/// Implementations must be cheap to share between request tasks; the driver holds one behind an
/// `Arc` and calls [`invoke`](InferenceClient::invoke) from many tasks at once.
#[trait_variant::make(InferenceClient: Send)]
pub trait LocalInferenceClient {
    async fn invoke(&self, request: &InvokeRequest) -> Result<InvokeResponse, InvokeError>;
}

pub fn default_endpoint(region: &str) -> String {
    format!("https://bedrock-runtime.{region}.amazonaws.com")
}

/// [`InferenceClient`] speaking the runtime's REST `InvokeModel` API over `reqwest`.
#[derive(Clone, Debug)]
pub struct HttpInferenceClient {
    http: reqwest::Client,
    endpoint: Url,
    api_key: Option<String>,
}

impl HttpInferenceClient {
    pub fn new(region: &str, api_key: Option<String>) -> Result<Self, SoakError> {
        Self::with_endpoint(&default_endpoint(region), api_key)
    }

    pub fn with_endpoint(endpoint: &str, api_key: Option<String>) -> Result<Self, SoakError> {
        let endpoint = Url::parse(endpoint)?;
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(SoakError::Client)?;

        Ok(Self {
            http,
            endpoint,
            api_key,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Fails only if no HTTP exchange with the endpoint is possible. Any status code counts as
    /// reachable.
    pub async fn check_reachable(&self) -> Result<(), SoakError> {
        match self
            .http
            .get(self.endpoint.clone())
            .timeout(PREFLIGHT_TIMEOUT)
            .send()
            .await
        {
            Ok(res) => {
                debug!("Endpoint {} answered with {}", self.endpoint, res.status());
                Ok(())
            }
            Err(err) => Err(SoakError::Unreachable {
                endpoint: self.endpoint.to_string(),
                reason: err.to_string(),
            }),
        }
    }

    fn invoke_url(&self, model_id: &str) -> Result<Url, InvokeError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| InvokeError::Transport(format!("{} cannot be a base URL", self.endpoint)))?
            .pop_if_empty()
            .push("model")
            .push(model_id)
            .push("invoke");
        Ok(url)
    }
}

impl InferenceClient for HttpInferenceClient {
    async fn invoke(&self, request: &InvokeRequest) -> Result<InvokeResponse, InvokeError> {
        let url = self.invoke_url(&request.model_id)?;

        let mut req = self
            .http
            .post(url)
            .header(ACCEPT, "application/json")
            .json(&request.body);
        if let Some(tier) = request.tier.header_value() {
            req = req.header(SERVICE_TIER_HEADER, tier);
        }
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let res = req
            .send()
            .await
            .map_err(|err| InvokeError::Transport(err.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(classify_failure(status, body));
        }

        let server_latency = server_latency(res.headers());
        let confirmed_tier = header_str(res.headers(), SERVICE_TIER_HEADER).map(str::to_string);
        let body: ModelResponse = res
            .json()
            .await
            .map_err(|err| InvokeError::Malformed(err.to_string()))?;
        let usage = body.usage.unwrap_or_default();

        Ok(InvokeResponse {
            server_latency,
            confirmed_tier,
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ModelResponse {
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Usage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn server_latency(headers: &HeaderMap) -> Option<Duration> {
    header_str(headers, INVOCATION_LATENCY_HEADER)
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_millis)
}

pub(crate) fn classify_failure(status: StatusCode, body: String) -> InvokeError {
    if status == StatusCode::TOO_MANY_REQUESTS || body.contains("ThrottlingException") {
        InvokeError::Throttled(format!("{status}: {body}"))
    } else {
        InvokeError::Rejected {
            status: status.as_u16(),
            body,
        }
    }
}
