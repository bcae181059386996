//! Completion provider abstraction and the Ollama implementation.

use async_trait::async_trait;

mod error;
mod ollama;
pub mod types;

pub use error::LlmError;
pub use ollama::OllamaProvider;
pub use types::{
    CompletionRequest, CompletionResponse, ProviderMessage, ProviderRole, ToolCall, ToolDefinition,
};

/// A black-box completion backend. One call may answer outright or request
/// tool invocations; the orchestrator owns the dispatch loop.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}
