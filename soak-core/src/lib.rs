mod config;
mod constants;
mod data;
mod state;
mod tier;

pub use config::*;
pub use constants::*;
pub use data::*;
pub use state::*;
pub use tier::*;
