//! genagent - configurable conversational agents with knowledge-base retrieval
//!
//! # Architecture
//!
//! The crate follows a hexagonal layout:
//!
//! - **Domain Layer** (`domain`): models, errors and the port traits
//! - **Adapters** (`adapters`): port implementations (SQLite, HTTP models,
//!   embeddings, tools, YAML catalog)
//! - **Service Layer** (`services`): agent runtime, registry, knowledge store
//! - **Infrastructure Layer** (`infrastructure`): configuration, logging,
//!   wiring
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use genagent::infrastructure::{config::ConfigLoader, AppContext};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let context = AppContext::build(ConfigLoader::load()?).await?;
//!     context.agents.warm_start().await?;
//!     let result = context.agents.query_agent("support", "thread-1", "What is our refund policy?").await?;
//!     println!("{:?}", result.response());
//!     context.agents.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

pub use domain::errors::{DomainError, DomainResult, ErrorKind};
pub use domain::models::{AgentConfig, Config, QueryResult, RetrievalResult, ToolConfig};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{AgentRegistry, AgentService, KnowledgeStore};
