#![doc = include_str!("../README.md")]

mod batch;
pub mod client;
pub mod driver;
mod error;
pub mod health;
pub mod log;
pub mod payload;
pub mod retry;
pub mod store;
mod telemetry;

pub use client::{HttpInferenceClient, InferenceClient, InvokeError, InvokeRequest, InvokeResponse};
pub use driver::{RunSummary, SoakDriver};
pub use error::SoakError;
pub use soak_core as core;

pub mod prelude {
    pub use crate::client::{HttpInferenceClient, InferenceClient};
    pub use crate::driver::{RunSummary, SoakDriver};
    pub use crate::error::SoakError;
    pub use crate::payload::{ImagePayload, PromptPayload};
    pub use soak_core::{ServiceTier, SoakConfig, DEFAULT_MODEL, DEFAULT_REGION};
}
