//! The tagged event union carried by the chat stream, one JSON object per frame.
//!
//! Decoding is lenient: an event missing the fields it needs is dropped as a
//! whole, optional fields that fail validation are dropped on their own.

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use super::components::UiComponent;
use super::state::Citation;
use super::state::ToolStatus;

pub const DEFAULT_STREAM_ERROR: &str = "An error occurred while streaming the response.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCallUpdate {
    pub tool: String,
    pub status: ToolStatus,
    pub message: Option<String>,
}

impl ToolCallUpdate {
    pub fn new(tool: impl Into<String>, status: ToolStatus, message: Option<String>) -> Self {
        Self {
            tool: tool.into(),
            status,
            message,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    TextChunk(String),
    Citation(Citation),
    ToolCall(ToolCallUpdate),
    UiComponent(UiComponent),
    Complete { content: Option<String> },
    Error { message: Option<String> },
}

impl StreamEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TextChunk(_) => "text_chunk",
            Self::Citation(_) => "citation",
            Self::ToolCall(_) => "tool_call",
            Self::UiComponent(_) => "ui_component",
            Self::Complete { .. } => "complete",
            Self::Error { .. } => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. } | Self::Error { .. })
    }

    /// Decodes one frame. Returns `None` for frames that are not JSON objects,
    /// carry an unknown `type`, or lack the fields their type requires.
    pub fn decode(data: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(data).ok()?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        let kind = value.get("type").and_then(Value::as_str)?;
        let content = value
            .get("content")
            .and_then(Value::as_str)
            .map(str::to_string);

        match kind {
            "text_chunk" => content.map(Self::TextChunk),
            "citation" => value.get("citation").and_then(citation_from_value).map(Self::Citation),
            "tool_call" => value
                .get("tool_call")
                .and_then(tool_call_from_value)
                .map(Self::ToolCall),
            "ui_component" => {
                let component_type = value.get("component_type").and_then(Value::as_str)?;
                let data = value
                    .get("component_data")
                    .cloned()
                    .unwrap_or_else(|| Value::Object(Map::new()));
                Some(Self::UiComponent(UiComponent::from_wire(component_type, data)))
            }
            "complete" => Some(Self::Complete { content }),
            "error" => Some(Self::Error { message: content }),
            _ => None,
        }
    }

    pub fn to_wire(&self) -> WireEvent {
        let mut wire = WireEvent {
            kind: self.kind().to_string(),
            ..WireEvent::default()
        };
        match self {
            Self::TextChunk(text) => wire.content = Some(text.clone()),
            Self::Citation(citation) => wire.citation = Some(citation.clone()),
            Self::ToolCall(update) => {
                wire.tool_call = Some(WireToolCall {
                    tool: update.tool.clone(),
                    status: update.status,
                    message: update.message.clone(),
                })
            }
            Self::UiComponent(component) => {
                let (component_type, data) = component.to_wire();
                wire.component_type = Some(component_type);
                wire.component_data = Some(data);
            }
            Self::Complete { content } => wire.content = content.clone(),
            Self::Error { message } => wire.content = message.clone(),
        }
        wire
    }

    pub fn encode(&self) -> String {
        serde_json::to_string(&self.to_wire()).unwrap_or_else(|_| {
            format!(r#"{{"type":"error","content":"{DEFAULT_STREAM_ERROR}"}}"#)
        })
    }
}

/// Serialized shape of a [`StreamEvent`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citation: Option<Citation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<WireToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_data: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireToolCall {
    pub tool: String,
    pub status: ToolStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

fn citation_from_value(value: &Value) -> Option<Citation> {
    let id = value.get("id").and_then(Value::as_u64)?;
    let page = value.get("page").and_then(Value::as_u64)?;
    let document = value.get("document").and_then(Value::as_str)?;
    let text_snippet = value
        .get("text_snippet")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let relevance_score = value
        .get("relevance_score")
        .and_then(Value::as_f64)
        .filter(|score| (0.0..=1.0).contains(score));

    Some(Citation {
        id: u32::try_from(id).ok().filter(|id| *id >= 1)?,
        document: document.to_string(),
        page: u32::try_from(page).ok().filter(|page| *page >= 1)?,
        text_snippet: text_snippet.to_string(),
        relevance_score,
    })
}

fn tool_call_from_value(value: &Value) -> Option<ToolCallUpdate> {
    let tool = value.get("tool").and_then(Value::as_str)?;
    let status = value
        .get("status")
        .and_then(Value::as_str)
        .and_then(ToolStatus::parse)?;
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string);
    Some(ToolCallUpdate::new(tool, status, message))
}
