pub mod agent;
pub mod config;
pub mod conversation;
pub mod knowledge;
pub mod tool;

pub use agent::{AgentConfig, AgentState, AgentSummary, QueryResult};
pub use config::{
    Config, DatabaseConfig, EmbeddingConfig, KnowledgeConfig, LoggingConfig, MemoryConfig,
    ProviderEndpoint, ProvidersConfig, RuntimeConfig, VectorBackendKind,
};
pub use conversation::{ConversationMessage, ConversationThread, Role, ToolCall};
pub use knowledge::{ChunkingConfig, KnowledgeChunk, Metadata, RetrievalResult};
pub use tool::{ApiConfig, FunctionConfig, ParameterSpec, ToolBinding, ToolConfig, ToolKind};
