use crate::config::ChatSettings;
use crate::error::ChatError;
use crate::prompt::system_prompt;
use crate::retrieval::{DEFAULT_K, DEFAULT_SCORE_THRESHOLD};
use crate::service::RagService;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

/// Only the most recent turns are replayed to keep the model on the question.
pub const HISTORY_WINDOW: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
    #[serde(default = "default_use_rag")]
    pub use_rag: bool,
}

fn default_use_rag() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
    pub model: String,
    pub sources: Vec<String>,
}

/// "Given role-tagged messages, return the generated reply text."
#[async_trait]
pub trait CompletionClient: Send + Sync {
    fn model(&self) -> &str;

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ChatError>;
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible chat completions, OpenRouter by default.
pub struct OpenRouterClient {
    client: Client,
    endpoint: Url,
    settings: ChatSettings,
}

impl OpenRouterClient {
    pub fn new(settings: ChatSettings) -> Result<Self, ChatError> {
        let base = Url::parse(&format!("{}/", settings.base_url.trim_end_matches('/')))?;
        let client = Client::builder().timeout(settings.timeout).build()?;

        Ok(Self {
            client,
            endpoint: base.join("chat/completions")?,
            settings,
        })
    }
}

fn first_choice(response: CompletionResponse) -> Result<String, ChatError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or(ChatError::EmptyCompletion)
}

#[async_trait]
impl CompletionClient for OpenRouterClient {
    fn model(&self) -> &str {
        &self.settings.model
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ChatError> {
        let api_key = self.settings.api_key().ok_or(ChatError::MissingCredentials)?;

        info!(model = %self.settings.model, messages = messages.len(), "sending completion request");

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(api_key)
            .header("HTTP-Referer", &self.settings.referer)
            .header("X-Title", &self.settings.app_name)
            .json(&CompletionRequest {
                model: &self.settings.model,
                messages,
                max_tokens: self.settings.max_tokens,
                temperature: self.settings.temperature,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), %body, "completion request rejected");
            return Err(ChatError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        first_choice(response.json().await?)
    }
}

/// Grounds each user message in retrieved context before asking the model.
pub struct ChatService {
    rag: Arc<RagService>,
    completion: Arc<dyn CompletionClient>,
    company_name: String,
}

impl ChatService {
    pub fn new(
        rag: Arc<RagService>,
        completion: Arc<dyn CompletionClient>,
        company_name: impl Into<String>,
    ) -> Self {
        Self {
            rag,
            completion,
            company_name: company_name.into(),
        }
    }

    pub fn build_messages(&self, request: &ChatRequest, context: &str) -> Vec<ChatMessage> {
        let recent = request.history.len().saturating_sub(HISTORY_WINDOW);

        let mut messages = Vec::with_capacity(HISTORY_WINDOW + 2);
        messages.push(ChatMessage::system(system_prompt(&self.company_name, context)));
        messages.extend(request.history[recent..].iter().cloned());
        messages.push(ChatMessage::user(request.message.clone()));
        messages
    }

    pub async fn respond(&self, request: &ChatRequest) -> Result<ChatReply, ChatError> {
        let mut sources: Vec<String> = Vec::new();
        let mut context = String::new();

        if request.use_rag {
            let results = self
                .rag
                .search(&request.message, DEFAULT_K, DEFAULT_SCORE_THRESHOLD)
                .await;

            context = results
                .iter()
                .map(|result| format!("- {}", result.content))
                .collect::<Vec<_>>()
                .join("\n\n");

            for result in results {
                if !sources.contains(&result.source) {
                    sources.push(result.source);
                }
            }
        }

        let messages = self.build_messages(request, &context);
        let response = self.completion.complete(&messages).await?;

        Ok(ChatReply {
            response,
            model: self.completion.model().to_string(),
            sources,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RagSettings;
    use crate::models::{Chunk, FileType, IndexedEntry};
    use crate::testing::{FlatEmbedder, MemoryIndex, UnreachableIndex};
    use crate::traits::VectorIndex;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingCompletion {
        seen: Mutex<Vec<ChatMessage>>,
    }

    #[async_trait]
    impl CompletionClient for RecordingCompletion {
        fn model(&self) -> &str {
            "test-model"
        }

        async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ChatError> {
            if let Ok(mut seen) = self.seen.lock() {
                *seen = messages.to_vec();
            }
            Ok("Happy to help.".to_string())
        }
    }

    fn entry(source: &str, text: &str) -> IndexedEntry {
        IndexedEntry {
            vector: vec![1.0, 0.0],
            chunk: Chunk {
                chunk_id: text.to_string(),
                text: text.to_string(),
                source_name: source.to_string(),
                file_type: FileType::Markdown,
                page: None,
                chunk_index: 0,
            },
        }
    }

    async fn service_with(
        index: Arc<dyn VectorIndex>,
        completion: Arc<RecordingCompletion>,
    ) -> ChatService {
        let rag = RagService::new(RagSettings::default(), Arc::new(FlatEmbedder::default()), index);
        ChatService::new(Arc::new(rag), completion, "Luxivolt Engineering")
    }

    fn history(turns: usize) -> Vec<ChatMessage> {
        (0..turns)
            .map(|turn| ChatMessage::new(if turn % 2 == 0 { "user" } else { "assistant" }, format!("turn {turn}")))
            .collect()
    }

    #[tokio::test]
    async fn reply_is_grounded_and_sources_are_unique() -> Result<(), Box<dyn std::error::Error>> {
        let index = Arc::new(MemoryIndex::with_score(0.8));
        index
            .insert(&[
                entry("services.md", "Transformer maintenance."),
                entry("services.md", "Substation design."),
                entry("faq.txt", "Yearly inspections."),
            ])
            .await?;
        let completion = Arc::new(RecordingCompletion::default());
        let chat = service_with(index, completion.clone()).await;

        let reply = chat
            .respond(&ChatRequest {
                message: "Do you maintain transformers?".to_string(),
                history: Vec::new(),
                use_rag: true,
            })
            .await?;

        assert_eq!(reply.response, "Happy to help.");
        assert_eq!(reply.model, "test-model");
        assert_eq!(reply.sources, vec!["services.md".to_string(), "faq.txt".to_string()]);

        let seen = completion.seen.lock().map_err(|_| "poisoned")?;
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].role, "system");
        assert!(seen[0]
            .content
            .contains("- Transformer maintenance.\n\n- Substation design.\n\n- Yearly inspections."));
        assert_eq!(seen[1], ChatMessage::user("Do you maintain transformers?"));
        Ok(())
    }

    #[tokio::test]
    async fn only_recent_history_is_replayed() -> Result<(), Box<dyn std::error::Error>> {
        let completion = Arc::new(RecordingCompletion::default());
        let chat = service_with(Arc::new(MemoryIndex::default()), completion.clone()).await;

        chat.respond(&ChatRequest {
            message: "And pricing?".to_string(),
            history: history(7),
            use_rag: false,
        })
        .await?;

        let seen = completion.seen.lock().map_err(|_| "poisoned")?;
        assert_eq!(seen.len(), HISTORY_WINDOW + 2);
        assert_eq!(seen[1].content, "turn 3");
        assert_eq!(seen[HISTORY_WINDOW].content, "turn 6");
        assert!(seen[0].content.contains("WARNING: No reference information"));
        Ok(())
    }

    #[tokio::test]
    async fn retrieval_outage_still_answers() -> Result<(), Box<dyn std::error::Error>> {
        let completion = Arc::new(RecordingCompletion::default());
        let chat = service_with(Arc::new(UnreachableIndex), completion.clone()).await;

        let reply = chat
            .respond(&ChatRequest {
                message: "Hello".to_string(),
                history: Vec::new(),
                use_rag: true,
            })
            .await?;

        assert!(reply.sources.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn missing_api_key_is_reported_before_any_request() -> Result<(), Box<dyn std::error::Error>> {
        let client = OpenRouterClient::new(ChatSettings {
            base_url: "http://127.0.0.1:9/api/v1".to_string(),
            ..Default::default()
        })?;

        let result = client.complete(&[ChatMessage::user("hi")]).await;
        assert!(matches!(result, Err(ChatError::MissingCredentials)));
        assert_eq!(client.endpoint.as_str(), "http://127.0.0.1:9/api/v1/chat/completions");
        Ok(())
    }

    #[test]
    fn completion_without_choices_is_an_error() {
        let response: CompletionResponse =
            serde_json::from_value(serde_json::json!({ "choices": [] })).unwrap();
        assert!(matches!(first_choice(response), Err(ChatError::EmptyCompletion)));

        let response: CompletionResponse = serde_json::from_value(serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": "Hi" } }]
        }))
        .unwrap();
        assert_eq!(first_choice(response).unwrap(), "Hi");
    }

    #[test]
    fn request_defaults_to_grounded_mode() {
        let request: ChatRequest =
            serde_json::from_value(serde_json::json!({ "message": "hi" })).unwrap();
        assert!(request.use_rag);
        assert!(request.history.is_empty());
    }
}
