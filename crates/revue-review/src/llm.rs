use std::future::Future;
use std::time::Duration;

use revue_core::{LlmConfig, RevueError};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A message in a chat conversation with the LLM.
///
/// # Examples
///
/// ```
/// use revue_review::llm::{ChatMessage, Role};
///
/// let msg = ChatMessage::user("Review the changes in /repo");
/// assert!(matches!(msg.role, Role::User));
/// assert!(msg.tool_calls.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender.
    pub role: Role,
    /// Text content of the message.
    #[serde(default)]
    pub content: String,
    /// Tool invocations requested by the assistant.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// For `tool` messages, the call this message answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    fn text(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// System instructions.
    pub fn system(content: impl Into<String>) -> Self {
        Self::text(Role::System, content)
    }

    /// User input.
    pub fn user(content: impl Into<String>) -> Self {
        Self::text(Role::User, content)
    }

    /// Echo of an assistant turn, kept in the history so tool results can
    /// refer to its calls.
    pub fn assistant(turn: &AssistantTurn) -> Self {
        Self {
            tool_calls: turn.tool_calls.clone(),
            ..Self::text(Role::Assistant, turn.content.clone().unwrap_or_default())
        }
    }

    /// The result of one tool call.
    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            ..Self::text(Role::Tool, content)
        }
    }
}

/// Role in the chat conversation.
///
/// # Examples
///
/// ```
/// use revue_review::llm::Role;
///
/// let role = Role::Tool;
/// assert_eq!(serde_json::to_string(&role).unwrap(), "\"tool\"");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System-level instructions.
    System,
    /// User input.
    User,
    /// Assistant response.
    Assistant,
    /// Output of a tool call.
    Tool,
}

/// A function call requested by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Identifier echoed back in the matching `tool` message.
    pub id: String,
    #[serde(rename = "type", default = "function_kind")]
    pub kind: String,
    pub function: FunctionCall,
}

/// Name and raw JSON arguments of a requested call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded arguments, as sent by the model.
    #[serde(default)]
    pub arguments: String,
}

fn function_kind() -> String {
    "function".into()
}

impl ToolCall {
    /// Build a function call.
    ///
    /// # Examples
    ///
    /// ```
    /// use revue_review::llm::ToolCall;
    ///
    /// let call = ToolCall::function("call_1", "generate_commit_message", "{}");
    /// assert_eq!(call.kind, "function");
    /// assert_eq!(call.function.name, "generate_commit_message");
    /// ```
    pub fn function(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: function_kind(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

/// A function the model may call.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object.
    pub parameters: serde_json::Value,
}

impl ToolSpec {
    /// Wire form for the `tools` array of a chat completion request.
    ///
    /// # Examples
    ///
    /// ```
    /// use revue_review::llm::ToolSpec;
    ///
    /// let spec = ToolSpec {
    ///     name: "noop".into(),
    ///     description: "Does nothing".into(),
    ///     parameters: serde_json::json!({ "type": "object", "properties": {} }),
    /// };
    /// let wire = spec.to_openai();
    /// assert_eq!(wire["type"], "function");
    /// assert_eq!(wire["function"]["name"], "noop");
    /// ```
    pub fn to_openai(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters,
            },
        })
    }
}

/// One reply from the model: text, tool calls, or both.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssistantTurn {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

/// Something that can take one step of a tool-calling conversation.
pub trait ChatModel {
    /// Send the conversation so far and return the model's next turn.
    ///
    /// # Errors
    ///
    /// Returns [`RevueError::Llm`] if the model cannot be reached or its
    /// reply cannot be understood.
    fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
    ) -> impl Future<Output = Result<AssistantTurn, RevueError>> + Send;
}

/// OpenAI-compatible chat completions client.
///
/// Works with any provider that exposes the `/v1/chat/completions` endpoint
/// with function calling: OpenAI, Ollama, vLLM, LiteLLM, etc.
///
/// # Examples
///
/// ```
/// use revue_core::LlmConfig;
/// use revue_review::llm::LlmClient;
///
/// let config = LlmConfig {
///     api_key: Some("test-key".into()),
///     ..LlmConfig::default()
/// };
/// let client = LlmClient::new(&config).unwrap();
/// assert_eq!(client.model(), "gpt-4o");
/// ```
pub struct LlmClient {
    client: reqwest::Client,
    config: LlmConfig,
    api_key: Option<String>,
}

impl LlmClient {
    /// Create a new LLM client from configuration.
    ///
    /// The API key is taken from the configuration or, failing that, from
    /// the environment.
    ///
    /// # Errors
    ///
    /// Returns [`RevueError::Llm`] if the HTTP client cannot be built.
    pub fn new(config: &LlmConfig) -> Result<Self, RevueError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| RevueError::Llm(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key: config.resolved_api_key(),
            config: config.clone(),
        })
    }

    /// Return the model name from the configuration.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn endpoint(&self) -> String {
        let base_url = self
            .config
            .base_url
            .as_deref()
            .unwrap_or("https://api.openai.com")
            .trim_end_matches('/');
        format!("{base_url}/v1/chat/completions")
    }
}

impl ChatModel for LlmClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
    ) -> Result<AssistantTurn, RevueError> {
        let mut body = serde_json::json!({
            "model": self.config.model,
            "messages": messages,
            "temperature": 0.1,
        });
        if !tools.is_empty() {
            body["tools"] = tools.iter().map(ToolSpec::to_openai).collect();
            body["tool_choice"] = "auto".into();
        }

        let mut request = self.client.post(self.endpoint());
        if let Some(api_key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {api_key}"));
        }
        request = request.header("Content-Type", "application/json");

        debug!(model = %self.config.model, messages = messages.len(), "sending chat completion");
        let response = request
            .json(&body)
            .send()
            .await
            .map_err(|e| RevueError::Llm(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(RevueError::Llm(format!(
                "LLM API error {status}: {body_text}"
            )));
        }

        let response_body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| RevueError::Llm(format!("failed to parse response: {e}")))?;

        parse_turn(&response_body)
    }
}

/// Extract the first choice of a chat completion response.
///
/// # Errors
///
/// Returns [`RevueError::Llm`] if the response has no message or its tool
/// calls are malformed.
///
/// # Examples
///
/// ```
/// use revue_review::llm::parse_turn;
///
/// let body = serde_json::json!({
///     "choices": [{ "message": { "role": "assistant", "content": "LGTM" } }]
/// });
/// let turn = parse_turn(&body).unwrap();
/// assert_eq!(turn.content.as_deref(), Some("LGTM"));
/// assert!(turn.tool_calls.is_empty());
/// ```
pub fn parse_turn(response_body: &serde_json::Value) -> Result<AssistantTurn, RevueError> {
    let message = response_body
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .ok_or_else(|| {
            RevueError::Llm(format!("unexpected response structure: {response_body}"))
        })?;

    let content = message
        .get("content")
        .and_then(|c| c.as_str())
        .map(str::to_string);

    let tool_calls = match message.get("tool_calls") {
        Some(calls) if !calls.is_null() => serde_json::from_value(calls.clone())
            .map_err(|e| RevueError::Llm(format!("malformed tool calls: {e}")))?,
        _ => Vec::new(),
    };

    Ok(AssistantTurn {
        content,
        tool_calls,
    })
}
