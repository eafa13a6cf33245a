//! Infrastructure layer module
//!
//! - Configuration management
//! - Logging infrastructure
//! - Project initialization
//! - Service wiring

pub mod config;
pub mod context;
pub mod logging;
pub mod setup;

pub use context::AppContext;
