use async_trait::async_trait;
use serde_json::Value;

use crate::domain::errors::DomainResult;

/// Executes one kind of tool. Implementations are chosen when a tool is
/// bound, never per call.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    async fn invoke(&self, arguments: Value) -> DomainResult<Value>;
}
