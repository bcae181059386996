//! Conversation orchestration: one chat turn from raw user message to
//! persisted reply, including retrieval context and the tool-dispatch
//! loop against the completion provider.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    chat::{ChatMessage, ChatRequest, ChatResponse, ChatRole},
    error::{Result, ServiceError},
    llm::{CompletionProvider, CompletionRequest, ProviderMessage},
    retriever::Retriever,
    store::Store,
    tools::ToolRegistry,
};

const MAX_MESSAGE_CHARS: usize = 4000;

const DEFAULT_SYSTEM_PROMPT: &str = "\
You are the HR assistant. You provide information about leave hours, billable client hours \
and the employee manual.

You have access to tools that allow you to directly register hours and retrieve hour \
summaries for employees. When users ask to register hours or get information about their \
hours, use the available tools to help them.

Use today's date as reference when users say \"today\", \"yesterday\", etc.
Be helpful and guide users through the process step by step. Always use the tools to \
complete hour registration requests.";

/// Tunables for one orchestrator instance, fixed at construction.
#[derive(Debug, Clone)]
pub struct ChatOptions {
    pub rag_top_k: usize,
    pub history_window: usize,
    pub max_tool_rounds: usize,
    pub system_prompt: Option<String>,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            rag_top_k: 3,
            history_window: 10,
            max_tool_rounds: 8,
            system_prompt: None,
        }
    }
}

pub struct ChatService {
    store: Store,
    retriever: Arc<dyn Retriever>,
    provider: Arc<dyn CompletionProvider>,
    tools: Arc<ToolRegistry>,
    options: ChatOptions,
}

impl ChatService {
    pub fn new(
        store: Store,
        retriever: Arc<dyn Retriever>,
        provider: Arc<dyn CompletionProvider>,
        tools: Arc<ToolRegistry>,
        options: ChatOptions,
    ) -> Self {
        Self {
            store,
            retriever,
            provider,
            tools,
            options,
        }
    }

    /// Handle one chat turn. On success the session has grown by exactly
    /// two messages; on provider failure the assistant side is never
    /// persisted.
    pub async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        validate_message(&request.message)?;

        let session_id = request
            .session_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        info!(%session_id, message_len = request.message.len(), "processing chat turn");

        // History snapshot is taken before the incoming message is
        // persisted so the prompt does not carry the question twice.
        let prior = self
            .store
            .recent_history(&session_id, self.options.history_window)
            .await?;

        self.store
            .append_message(&session_id, ChatRole::User, &request.message)
            .await?;

        let context = self.retrieve_context(&request.message).await;
        let contextual_message = build_contextual_message(&request.message, &context);

        let reply = self.generate_reply(&session_id, prior, contextual_message).await?;

        self.store
            .append_message(&session_id, ChatRole::Assistant, &reply)
            .await?;

        info!(%session_id, "chat turn completed");

        Ok(ChatResponse {
            message: reply,
            session_id,
        })
    }

    /// Full message history of a session, oldest first.
    pub async fn history(&self, session_id: &str) -> Result<Vec<ChatMessage>> {
        debug!(%session_id, "retrieving chat history");
        self.store.session_history(session_id).await
    }

    /// Retrieval failures degrade to empty context; the turn goes on.
    async fn retrieve_context(&self, query: &str) -> Vec<String> {
        match self.retriever.search(query, self.options.rag_top_k).await {
            Ok(documents) => {
                debug!(found = documents.len(), "retrieval completed");
                documents.into_iter().map(|d| d.text).collect()
            }
            Err(e) => {
                warn!(error = %e, "retrieval failed, continuing without context");
                Vec::new()
            }
        }
    }

    /// Run the provider call, dispatching tool requests synchronously
    /// until a final answer arrives or the round budget runs out.
    async fn generate_reply(
        &self,
        session_id: &str,
        prior: Vec<ChatMessage>,
        contextual_message: String,
    ) -> Result<String> {
        let mut messages: Vec<ProviderMessage> = prior
            .into_iter()
            .map(|m| match m.role {
                ChatRole::User => ProviderMessage::user(m.content),
                ChatRole::Assistant => ProviderMessage::assistant(m.content),
            })
            .collect();
        messages.push(ProviderMessage::user(contextual_message));

        let system_prompt = self.system_prompt();
        let tools = self.tools.definitions();

        for round in 0..self.options.max_tool_rounds {
            let response = self
                .provider
                .complete(CompletionRequest {
                    system_prompt: system_prompt.clone(),
                    messages: messages.clone(),
                    tools: tools.clone(),
                })
                .await
                .map_err(|e| {
                    error!(%session_id, error = %e, "completion provider call failed");
                    ServiceError::Provider(e.to_string())
                })?;

            if response.tool_calls.is_empty() {
                return response
                    .content
                    .filter(|c| !c.trim().is_empty())
                    .ok_or_else(|| {
                        ServiceError::Provider("model returned an empty response".into())
                    });
            }

            debug!(
                %session_id,
                round,
                calls = response.tool_calls.len(),
                "model requested tool calls"
            );

            if let Some(content) = response.content.filter(|c| !c.is_empty()) {
                messages.push(ProviderMessage::assistant(content));
            }
            for call in &response.tool_calls {
                let result = self.tools.dispatch(call).await;
                messages.push(ProviderMessage::tool(result));
            }
        }

        error!(%session_id, rounds = self.options.max_tool_rounds, "tool round budget exhausted");
        Err(ServiceError::Provider(format!(
            "tool round budget exhausted after {} rounds",
            self.options.max_tool_rounds
        )))
    }

    fn system_prompt(&self) -> String {
        let base = self
            .options
            .system_prompt
            .as_deref()
            .unwrap_or(DEFAULT_SYSTEM_PROMPT);
        format!("{base}\n\nToday's date is {}.", Utc::now().date_naive())
    }
}

fn validate_message(message: &str) -> Result<()> {
    if message.trim().is_empty() {
        return Err(ServiceError::validation("Message is required"));
    }
    if message.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ServiceError::validation(format!(
            "Message exceeds the maximum length of {MAX_MESSAGE_CHARS} characters"
        )));
    }
    Ok(())
}

/// The model-facing user turn: retrieved snippets as labeled reference
/// material, then the literal question.
fn build_contextual_message(message: &str, context: &[String]) -> String {
    let mut out = String::new();
    if !context.is_empty() {
        out.push_str("Relevant information from the employee manual:\n");
        for snippet in context {
            out.push_str("Reference: ");
            out.push_str(snippet);
            out.push('\n');
        }
        out.push('\n');
    }
    out.push_str("User question: ");
    out.push_str(message);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{CompletionResponse, LlmError, ToolCall};
    use crate::retriever::RetrievedDocument;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Scripted provider: pops one canned response per call and records
    /// every request it sees.
    struct ScriptedProvider {
        responses: Mutex<VecDeque<std::result::Result<CompletionResponse, String>>>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedProvider {
        fn new(
            responses: Vec<std::result::Result<CompletionResponse, String>>,
        ) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn replying(text: &str) -> Arc<Self> {
            Self::new(vec![Ok(CompletionResponse::text(text))])
        }

        fn last_request(&self) -> CompletionRequest {
            self.requests.lock().unwrap().last().unwrap().clone()
        }
    }

    #[async_trait]
    impl CompletionProvider for ScriptedProvider {
        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> std::result::Result<CompletionResponse, LlmError> {
            self.requests.lock().unwrap().push(request);
            match self.responses.lock().unwrap().pop_front() {
                Some(Ok(response)) => Ok(response),
                Some(Err(message)) => Err(LlmError::InvalidResponse(message)),
                None => Err(LlmError::InvalidResponse("script exhausted".into())),
            }
        }
    }

    struct FixedRetriever(Vec<&'static str>);

    #[async_trait]
    impl Retriever for FixedRetriever {
        async fn search(
            &self,
            _query: &str,
            top_k: usize,
        ) -> anyhow::Result<Vec<RetrievedDocument>> {
            Ok(self
                .0
                .iter()
                .take(top_k)
                .map(|text| RetrievedDocument {
                    text: text.to_string(),
                    similarity_score: 0.9,
                })
                .collect())
        }

        async fn add_documents(&self, _texts: Vec<String>) -> anyhow::Result<()> {
            Ok(())
        }
    }

    struct FailingRetriever;

    #[async_trait]
    impl Retriever for FailingRetriever {
        async fn search(
            &self,
            _query: &str,
            _top_k: usize,
        ) -> anyhow::Result<Vec<RetrievedDocument>> {
            anyhow::bail!("vector store is down")
        }

        async fn add_documents(&self, _texts: Vec<String>) -> anyhow::Result<()> {
            anyhow::bail!("vector store is down")
        }
    }

    struct UppercaseTool;

    #[async_trait]
    impl crate::tools::Tool for UppercaseTool {
        fn name(&self) -> &'static str {
            "uppercase"
        }

        fn description(&self) -> &'static str {
            "Uppercase a string"
        }

        fn parameters(&self) -> serde_json::Value {
            serde_json::json!({ "type": "object", "properties": {} })
        }

        async fn execute(&self, arguments: serde_json::Value) -> String {
            arguments["text"].as_str().unwrap_or("").to_uppercase()
        }
    }

    async fn store() -> Store {
        let store = Store::in_memory().await.unwrap();
        store.init().await.unwrap();
        store
    }

    fn service(
        store: Store,
        retriever: Arc<dyn Retriever>,
        provider: Arc<dyn CompletionProvider>,
    ) -> ChatService {
        ChatService::new(
            store,
            retriever,
            provider,
            Arc::new(ToolRegistry::new()),
            ChatOptions::default(),
        )
    }

    fn request(message: &str, session_id: Option<&str>) -> ChatRequest {
        ChatRequest {
            message: message.to_string(),
            session_id: session_id.map(String::from),
        }
    }

    #[tokio::test]
    async fn successful_turn_appends_user_and_assistant() {
        let store = store().await;
        let provider = ScriptedProvider::replying("You have 25 days of annual leave.");
        let service = service(store.clone(), Arc::new(FixedRetriever(vec![])), provider);

        let response = service
            .chat(request("How much annual leave do I get?", None))
            .await
            .unwrap();

        assert!(!response.session_id.is_empty());
        let history = store.session_history(&response.session_id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, ChatRole::User);
        assert_eq!(history[0].content, "How much annual leave do I get?");
        assert_eq!(history[1].role, ChatRole::Assistant);
        assert_eq!(history[1].content, "You have 25 days of annual leave.");
    }

    #[tokio::test]
    async fn session_id_is_reused_and_history_grows_by_two() {
        let store = store().await;
        let provider = ScriptedProvider::new(vec![
            Ok(CompletionResponse::text("first answer")),
            Ok(CompletionResponse::text("second answer")),
        ]);
        let service = service(store.clone(), Arc::new(FixedRetriever(vec![])), provider);

        let first = service.chat(request("question one", None)).await.unwrap();
        let second = service
            .chat(request("question two", Some(&first.session_id)))
            .await
            .unwrap();

        assert_eq!(first.session_id, second.session_id);
        let history = store.session_history(&first.session_id).await.unwrap();
        assert_eq!(history.len(), 4);
    }

    #[tokio::test]
    async fn provider_failure_leaves_no_assistant_message() {
        let store = store().await;
        let provider = ScriptedProvider::new(vec![Err("model crashed".into())]);
        let service = service(store.clone(), Arc::new(FixedRetriever(vec![])), provider);

        let err = service
            .chat(request("hello", Some("s1")))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Provider(_)));

        let history = store.session_history("s1").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].role, ChatRole::User);
    }

    #[tokio::test]
    async fn empty_model_answer_is_a_provider_failure() {
        let store = store().await;
        let provider = ScriptedProvider::new(vec![Ok(CompletionResponse {
            content: Some("   ".into()),
            tool_calls: vec![],
        })]);
        let service = service(store.clone(), Arc::new(FixedRetriever(vec![])), provider);

        let err = service.chat(request("hello", Some("s1"))).await.unwrap_err();
        assert!(matches!(err, ServiceError::Provider(_)));
    }

    #[tokio::test]
    async fn retrieval_failure_degrades_to_empty_context() {
        let store = store().await;
        let provider = ScriptedProvider::replying("answer without context");
        let service = service(store.clone(), Arc::new(FailingRetriever), provider.clone());

        let response = service.chat(request("what is the policy?", None)).await.unwrap();
        assert_eq!(response.message, "answer without context");

        let sent = provider.last_request();
        let user_turn = &sent.messages.last().unwrap().content;
        assert_eq!(user_turn, "User question: what is the policy?");
    }

    #[tokio::test]
    async fn retrieved_snippets_are_labeled_reference_material() {
        let store = store().await;
        let provider = ScriptedProvider::replying("answer");
        let service = service(
            store.clone(),
            Arc::new(FixedRetriever(vec!["Annual leave is 25 days."])),
            provider.clone(),
        );

        service.chat(request("how much leave?", None)).await.unwrap();

        let sent = provider.last_request();
        let user_turn = &sent.messages.last().unwrap().content;
        assert!(user_turn.starts_with("Relevant information from the employee manual:\n"));
        assert!(user_turn.contains("Reference: Annual leave is 25 days.\n"));
        assert!(user_turn.ends_with("User question: how much leave?"));
    }

    #[tokio::test]
    async fn prior_history_is_injected_chronologically() {
        let store = store().await;
        store
            .append_message("s1", ChatRole::User, "older question")
            .await
            .unwrap();
        store
            .append_message("s1", ChatRole::Assistant, "older answer")
            .await
            .unwrap();

        let provider = ScriptedProvider::replying("newer answer");
        let service = service(store.clone(), Arc::new(FixedRetriever(vec![])), provider.clone());

        service
            .chat(request("newer question", Some("s1")))
            .await
            .unwrap();

        let sent = provider.last_request();
        assert_eq!(sent.messages.len(), 3);
        assert_eq!(sent.messages[0].content, "older question");
        assert_eq!(sent.messages[1].content, "older answer");
        assert!(sent.messages[2].content.contains("newer question"));
    }

    #[tokio::test]
    async fn history_injection_respects_window() {
        let store = store().await;
        for i in 0..15 {
            store
                .append_message("s1", ChatRole::User, &format!("old{i}"))
                .await
                .unwrap();
        }

        let provider = ScriptedProvider::replying("ok");
        let service = service(store.clone(), Arc::new(FixedRetriever(vec![])), provider.clone());

        service.chat(request("current", Some("s1"))).await.unwrap();

        let sent = provider.last_request();
        // 10 prior messages plus the current contextual turn.
        assert_eq!(sent.messages.len(), 11);
        assert_eq!(sent.messages[0].content, "old5");
    }

    #[tokio::test]
    async fn tool_calls_are_dispatched_and_fed_back() {
        let store = store().await;
        let provider = ScriptedProvider::new(vec![
            Ok(CompletionResponse {
                content: None,
                tool_calls: vec![ToolCall {
                    name: "uppercase".into(),
                    arguments: serde_json::json!({ "text": "done" }),
                }],
            }),
            Ok(CompletionResponse::text("the tool said DONE")),
        ]);

        let mut registry = ToolRegistry::new();
        registry.register(Box::new(UppercaseTool));
        let service = ChatService::new(
            store.clone(),
            Arc::new(FixedRetriever(vec![])),
            provider.clone(),
            Arc::new(registry),
            ChatOptions::default(),
        );

        let response = service.chat(request("shout done", Some("s1"))).await.unwrap();
        assert_eq!(response.message, "the tool said DONE");

        // The second provider call must carry the tool result.
        let sent = provider.last_request();
        let tool_msg = sent
            .messages
            .iter()
            .find(|m| m.role == crate::llm::ProviderRole::Tool)
            .expect("tool message present");
        assert_eq!(tool_msg.content, "DONE");

        // Tool round-trips are not persisted, only the final exchange.
        let history = store.session_history("s1").await.unwrap();
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn tool_budget_exhaustion_fails_the_turn() {
        let store = store().await;
        let looping: Vec<std::result::Result<CompletionResponse, String>> = (0..10)
            .map(|_| {
                Ok(CompletionResponse {
                    content: None,
                    tool_calls: vec![ToolCall {
                        name: "uppercase".into(),
                        arguments: serde_json::json!({ "text": "again" }),
                    }],
                })
            })
            .collect();
        let provider = ScriptedProvider::new(looping);

        let mut registry = ToolRegistry::new();
        registry.register(Box::new(UppercaseTool));
        let service = ChatService::new(
            store.clone(),
            Arc::new(FixedRetriever(vec![])),
            provider,
            Arc::new(registry),
            ChatOptions {
                max_tool_rounds: 3,
                ..ChatOptions::default()
            },
        );

        let err = service.chat(request("loop", Some("s1"))).await.unwrap_err();
        assert!(matches!(err, ServiceError::Provider(_)));

        let history = store.session_history("s1").await.unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn blank_and_oversized_messages_are_rejected() {
        let store = store().await;
        let provider = ScriptedProvider::replying("unused");
        let service = service(store.clone(), Arc::new(FixedRetriever(vec![])), provider);

        assert!(matches!(
            service.chat(request("  ", None)).await.unwrap_err(),
            ServiceError::Validation(_)
        ));

        let oversized = "x".repeat(4001);
        assert!(matches!(
            service.chat(request(&oversized, None)).await.unwrap_err(),
            ServiceError::Validation(_)
        ));
    }
}
