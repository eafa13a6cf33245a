pub mod agent_registry;
pub mod agent_runtime;
pub mod agent_service;
pub mod conversation_memory;
pub mod knowledge_store;
pub mod prompt;
pub mod text_splitter;
pub mod timeout;
pub mod tool_binder;

pub use agent_registry::{AgentRegistry, WarmStartReport};
pub use agent_runtime::{Agent, AgentFactory, AgentRuntimeOptions};
pub use agent_service::{AgentService, SwitchOutcome};
pub use conversation_memory::{ConversationMemory, RetentionPolicy};
pub use knowledge_store::{format_context, KnowledgeStore};
pub use text_splitter::TextSplitter;
pub use tool_binder::ToolBinder;
