//! The tool bridge: named, schema-described actions the completion
//! provider can invoke mid-turn. Dispatch never fails across the
//! boundary; every outcome is rendered as text for the model.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use crate::llm::{ToolCall, ToolDefinition};

mod hours;

pub use hours::register_hour_tools;

/// A single invocable action. Implementations parse their own arguments
/// and convert every failure into a `❌` string.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// JSON Schema for the arguments object.
    fn parameters(&self) -> Value;

    async fn execute(&self, arguments: Value) -> String;
}

/// Explicit name-to-handler registry. The orchestrator looks tools up by
/// the name the model requested; there is no reflective dispatch.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<&'static str, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.insert(tool.name(), tool);
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .values()
            .map(|t| ToolDefinition {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.parameters(),
            })
            .collect()
    }

    /// Execute one requested call. Unknown names come back as failure text
    /// so the model can rephrase or apologize instead of the turn dying.
    pub async fn dispatch(&self, call: &ToolCall) -> String {
        match self.tools.get(call.name.as_str()) {
            Some(tool) => {
                info!(tool = %call.name, "dispatching tool call");
                tool.execute(call.arguments.clone()).await
            }
            None => {
                warn!(tool = %call.name, "model requested unknown tool");
                format!("❌ Unknown tool: {}", call.name)
            }
        }
    }
}
