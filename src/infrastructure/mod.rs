//! Infrastructure layer module
//!
//! Cross-cutting concerns that are not collaborators themselves:
//! - Configuration management (figment)
//! - Logging infrastructure (tracing)

pub mod config;
pub mod logging;
