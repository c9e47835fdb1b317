//! Client and wire types for the external portfolio optimizer.

mod optimizer_client;
mod types;

pub use optimizer_client::{OptimizerClient, OptimizerError, DEFAULT_TIMEOUT};
pub use types::*;
