//! Tool invokers, one per tool kind.

pub mod api;
pub mod function;

pub use api::ApiTool;
pub use function::{FunctionHandler, FunctionRegistry, FunctionTool};
