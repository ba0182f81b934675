//! Messages API adapter: decomposition and primary execution.

pub mod client;
pub mod decomposer;
pub mod error;
pub mod executor;
pub mod types;

pub use client::LlmClient;
pub use decomposer::{parse_seeds, LlmDecomposer};
pub use error::LlmError;
pub use executor::LlmExecutor;
