use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;

use super::components::UiComponent;
use super::events::ToolCallUpdate;
use super::viewer::ViewerState;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn label(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A reference into a source document, as assigned by the backend.
///
/// Ids are unique within one message but not necessarily contiguous.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub id: u32,
    pub document: String,
    /// 1-based page number.
    pub page: u32,
    pub text_snippet: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Running,
    Completed,
    Error,
}

impl ToolStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCall {
    pub tool: String,
    pub status: ToolStatus,
    pub message: Option<String>,
    pub started_at_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub citations: Vec<Citation>,
    #[serde(default)]
    pub components: Vec<UiComponent>,
    pub created_at_ms: i64,
    #[serde(default)]
    pub streaming: bool,
}

impl Message {
    pub fn user(id: MessageId, content: impl Into<String>, created_at_ms: i64) -> Self {
        Self {
            id,
            role: Role::User,
            content: content.into(),
            citations: Vec::new(),
            components: Vec::new(),
            created_at_ms,
            streaming: false,
        }
    }

    pub fn assistant_placeholder(id: MessageId, created_at_ms: i64) -> Self {
        Self {
            id,
            role: Role::Assistant,
            content: String::new(),
            citations: Vec::new(),
            components: Vec::new(),
            created_at_ms,
            streaming: true,
        }
    }

    fn stamp(&mut self, content: FinalContent) {
        self.content = content.text;
        self.citations = content.citations;
        self.components = content.components;
        self.streaming = false;
    }
}

/// Everything a completed stream contributes to its assistant message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FinalContent {
    pub text: String,
    pub citations: Vec<Citation>,
    pub components: Vec<UiComponent>,
}

/// Ordered conversation history. Only finalized messages are appended.
#[derive(Debug, Clone, Default)]
pub struct MessageStore {
    messages: Vec<Message>,
}

impl MessageStore {
    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|message| &message.id == id)
    }

    pub fn first(&self) -> Option<&Message> {
        self.messages.first()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Stamps `content` onto the trailing assistant placeholder, appending one
    /// first when the last message is not a streaming assistant message.
    pub fn finalize_assistant(
        &mut self,
        placeholder_id: MessageId,
        created_at_ms: i64,
        content: FinalContent,
    ) -> MessageId {
        if let Some(last) = self
            .messages
            .last_mut()
            .filter(|message| message.role == Role::Assistant && message.streaming)
        {
            last.stamp(content);
            return last.id.clone();
        }

        let mut message = Message::assistant_placeholder(placeholder_id, created_at_ms);
        message.stamp(content);
        let id = message.id.clone();
        self.messages.push(message);
        id
    }
}

/// Transient state of the stream in flight; discarded on finalization.
#[derive(Debug, Clone, Default)]
pub struct StreamBuffers {
    pub text: String,
    pub citations: Vec<Citation>,
    pub components: Vec<UiComponent>,
    pub tool_calls: Vec<ToolCall>,
}

impl StreamBuffers {
    pub fn push_text(&mut self, chunk: &str) {
        self.text.push_str(chunk);
    }

    /// Returns false when a citation with the same id is already pending.
    pub fn add_citation(&mut self, citation: Citation) -> bool {
        if self.citations.iter().any(|pending| pending.id == citation.id) {
            return false;
        }
        self.citations.push(citation);
        true
    }

    pub fn upsert_tool_call(&mut self, update: ToolCallUpdate, at_ms: i64) {
        if let Some(existing) = self
            .tool_calls
            .iter_mut()
            .find(|call| call.tool == update.tool)
        {
            existing.status = update.status;
            if update.message.is_some() {
                existing.message = update.message;
            }
            return;
        }

        self.tool_calls.push(ToolCall {
            tool: update.tool,
            status: update.status,
            message: update.message,
            started_at_ms: at_ms,
        });
    }

    pub fn push_component(&mut self, component: UiComponent) {
        self.components.push(component);
    }

    pub fn take_final(&mut self) -> FinalContent {
        self.tool_calls.clear();
        FinalContent {
            text: std::mem::take(&mut self.text),
            citations: std::mem::take(&mut self.citations),
            components: std::mem::take(&mut self.components),
        }
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.citations.clear();
        self.components.clear();
        self.tool_calls.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
            && self.citations.is_empty()
            && self.components.is_empty()
            && self.tool_calls.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    Idle,
    Streaming { stream_id: u64 },
    Finalizing { stream_id: u64 },
}

impl StreamPhase {
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Streaming { .. } => "streaming",
            Self::Finalizing { .. } => "finalizing",
        }
    }

    pub fn streaming_id(self) -> Option<u64> {
        match self {
            Self::Streaming { stream_id } => Some(stream_id),
            Self::Idle | Self::Finalizing { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatError {
    pub message: Arc<str>,
    pub stream_id: u64,
}

impl ChatError {
    pub fn new(message: impl Into<Arc<str>>, stream_id: u64) -> Self {
        Self {
            message: message.into(),
            stream_id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatState {
    pub conversation: MessageStore,
    pub stream: StreamBuffers,
    pub phase: StreamPhase,
    pub error: Option<ChatError>,
    pub viewer: ViewerState,
    pub next_stream_id: u64,
    pub next_message_seq: u64,
}

impl Default for ChatState {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatState {
    pub fn new() -> Self {
        Self {
            conversation: MessageStore::default(),
            stream: StreamBuffers::default(),
            phase: StreamPhase::Idle,
            error: None,
            viewer: ViewerState::default(),
            next_stream_id: 1,
            next_message_seq: 1,
        }
    }

    pub fn with_history(messages: Vec<Message>) -> Self {
        let next_message_seq = (messages.len() as u64).saturating_add(1);
        Self {
            conversation: MessageStore::from_messages(messages),
            next_message_seq,
            ..Self::new()
        }
    }

    pub fn is_loading(&self) -> bool {
        self.phase.streaming_id().is_some()
    }

    pub fn active_stream_id(&self) -> Option<u64> {
        self.phase.streaming_id()
    }

    pub(crate) fn allocate_message_id(&mut self, at_ms: i64) -> MessageId {
        let seq = self.next_message_seq;
        self.next_message_seq = self.next_message_seq.saturating_add(1);
        MessageId(format!("msg-{at_ms}-{seq}"))
    }

    pub(crate) fn allocate_stream_id(&mut self) -> u64 {
        let stream_id = self.next_stream_id;
        self.next_stream_id = self.next_stream_id.saturating_add(1);
        stream_id
    }
}
