//! Chat model adapters.

pub mod anthropic;
pub mod factory;
pub mod mock;
pub mod openai;

pub use anthropic::AnthropicChatModel;
pub use factory::ProviderModelFactory;
pub use mock::{MockChatModel, MockModelFactory, MockStep, RecordedRequest};
pub use openai::OpenAiChatModel;
