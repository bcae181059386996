//! Ollama chat API client with native tool calling.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{CompletionProvider, CompletionRequest, CompletionResponse, LlmError, ToolCall};
use crate::llm::types::ProviderMessage;

pub struct OllamaProvider {
    http: Client,
    base_url: String,
    model: String,
}

impl OllamaProvider {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
            model: model.into(),
        }
    }

    fn build_body(&self, request: &CompletionRequest) -> Value {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        messages.push(json!(ProviderMessage::system(request.system_prompt.as_str())));
        messages.extend(request.messages.iter().map(|m| json!(m)));

        let mut body = json!({
            "model": self.model,
            "messages": messages,
            "stream": false,
        });

        if !request.tools.is_empty() {
            body["tools"] = json!(request
                .tools
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.parameters,
                        }
                    })
                })
                .collect::<Vec<_>>());
        }

        body
    }
}

#[async_trait]
impl CompletionProvider for OllamaProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let url = format!("{}/api/chat", self.base_url);
        let body = self.build_body(&request);
        debug!(model = %self.model, messages = request.messages.len(), tools = request.tools.len(), "calling Ollama");

        let response = self.http.post(&url).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let api_response: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let message = api_response
            .message
            .ok_or_else(|| LlmError::InvalidResponse("response is missing 'message'".into()))?;

        let tool_calls = message
            .tool_calls
            .into_iter()
            .map(|call| ToolCall {
                name: call.function.name,
                arguments: call.function.arguments,
            })
            .collect();

        Ok(CompletionResponse {
            content: message.content.filter(|c| !c.is_empty()),
            tool_calls,
        })
    }
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: Option<OllamaMessage>,
}

#[derive(Debug, Deserialize)]
struct OllamaMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<OllamaToolCall>,
}

#[derive(Debug, Deserialize)]
struct OllamaToolCall {
    function: OllamaFunctionCall,
}

#[derive(Debug, Deserialize)]
struct OllamaFunctionCall {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::ToolDefinition;

    #[test]
    fn body_includes_system_prompt_first() {
        let provider = OllamaProvider::new("http://localhost:11434", "test-model");
        let request = CompletionRequest {
            system_prompt: "be helpful".into(),
            messages: vec![ProviderMessage::user("hello")],
            tools: vec![],
        };

        let body = provider.build_body(&request);
        assert_eq!(body["model"], "test-model");
        assert_eq!(body["stream"], false);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "be helpful");
        assert_eq!(body["messages"][1]["role"], "user");
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn body_wraps_tools_in_function_envelope() {
        let provider = OllamaProvider::new("http://localhost:11434", "test-model");
        let request = CompletionRequest {
            system_prompt: "be helpful".into(),
            messages: vec![],
            tools: vec![ToolDefinition {
                name: "getLeaveHistory".into(),
                description: "Recent leave entries".into(),
                parameters: serde_json::json!({
                    "type": "object",
                    "properties": { "employeeId": { "type": "string" } },
                    "required": ["employeeId"]
                }),
            }],
        };

        let body = provider.build_body(&request);
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "getLeaveHistory");
    }

    #[test]
    fn response_parses_tool_calls() {
        let raw = serde_json::json!({
            "model": "test-model",
            "message": {
                "role": "assistant",
                "content": "",
                "tool_calls": [
                    { "function": { "name": "getLeaveHistory", "arguments": { "employeeId": "emp1" } } }
                ]
            },
            "done": true
        });

        let parsed: OllamaChatResponse = serde_json::from_value(raw).unwrap();
        let message = parsed.message.unwrap();
        assert_eq!(message.tool_calls.len(), 1);
        assert_eq!(message.tool_calls[0].function.name, "getLeaveHistory");
    }
}
