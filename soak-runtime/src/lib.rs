pub mod runtime;

mod cli;
mod error;
mod signal;

pub use crate::error::RuntimeError;
pub use crate::runtime::SoakRuntime;
