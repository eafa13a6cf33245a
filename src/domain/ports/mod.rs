//! Port trait definitions (Hexagonal Architecture)
//!
//! - `AgentConfigRepository` / `ToolRepository`: configuration records
//! - `ChatModel` / `ModelFactory`: language model providers
//! - `EmbeddingProvider`: text embeddings
//! - `VectorBackend`: chunk vector storage
//! - `ToolInvoker`: tool execution

pub mod chat_model;
pub mod config_repository;
pub mod embedding;
pub mod tool_invoker;
pub mod vector_backend;

pub use chat_model::{ChatModel, ChatRequest, ModelFactory, ModelReply, ModelSpec};
pub use config_repository::{AgentConfigRepository, ToolRepository};
pub use embedding::EmbeddingProvider;
pub use tool_invoker::ToolInvoker;
pub use vector_backend::{cosine_distance, MetadataFilter, ScoredRecord, VectorBackend, VectorRecord};
