use super::actions::ChatAction;
use super::actions::StreamAction;
use super::actions::UserAction;
use super::actions::ViewerAction;
use super::citations::CitationIndex;
use super::events::StreamEvent;
use super::events::DEFAULT_STREAM_ERROR;
use super::state::ChatError;
use super::state::ChatState;
use super::state::Citation;
use super::state::Message;
use super::state::MessageId;
use super::state::StreamPhase;
use super::viewer::DocumentRequest;

/// Work the reducer asks its driver to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEffect {
    OpenStream { stream_id: u64, query: String },
    AbortStream { stream_id: u64 },
    OpenDocument(DocumentRequest),
    PersistMessage(MessageId),
    RequestFrame,
}

pub fn reduce(state: &mut ChatState, action: ChatAction) -> Vec<ChatEffect> {
    match action {
        ChatAction::User(user) => reduce_user(state, user),
        ChatAction::Stream(stream) => reduce_stream(state, stream),
        ChatAction::Viewer(viewer) => reduce_viewer(state, viewer),
    }
}

fn reduce_user(state: &mut ChatState, action: UserAction) -> Vec<ChatEffect> {
    match action {
        UserAction::Submit { query, at_ms } => {
            if query.trim().is_empty() || state.is_loading() {
                return Vec::new();
            }

            let message_id = state.allocate_message_id(at_ms);
            state
                .conversation
                .push(Message::user(message_id.clone(), query.clone(), at_ms));
            state.stream.clear();
            state.error = None;

            let stream_id = state.allocate_stream_id();
            state.phase = StreamPhase::Streaming { stream_id };
            vec![
                ChatEffect::PersistMessage(message_id),
                ChatEffect::OpenStream { stream_id, query },
                ChatEffect::RequestFrame,
            ]
        }
        UserAction::Cancel => {
            let Some(stream_id) = state.active_stream_id() else {
                return Vec::new();
            };
            state.stream.clear();
            state.phase = StreamPhase::Idle;
            vec![
                ChatEffect::AbortStream { stream_id },
                ChatEffect::RequestFrame,
            ]
        }
        UserAction::ClickCitation {
            message_id,
            citation_id,
        } => {
            let Some(citation) = find_citation(state, message_id.as_ref(), citation_id) else {
                tracing::debug!(citation_id, "citation click did not resolve");
                return Vec::new();
            };
            let request = state.viewer.open(&citation);
            vec![ChatEffect::OpenDocument(request), ChatEffect::RequestFrame]
        }
        UserAction::CloseViewer => {
            if !state.viewer.is_open {
                return Vec::new();
            }
            state.viewer.close();
            vec![ChatEffect::RequestFrame]
        }
    }
}

fn find_citation(
    state: &ChatState,
    message_id: Option<&MessageId>,
    citation_id: u32,
) -> Option<Citation> {
    let citations = match message_id {
        Some(id) => &state.conversation.get(id)?.citations,
        None => &state.stream.citations,
    };
    CitationIndex::build(citations).get(citation_id).cloned()
}

fn reduce_stream(state: &mut ChatState, action: StreamAction) -> Vec<ChatEffect> {
    let Some(active) = state.active_stream_id() else {
        tracing::debug!(stream_id = action.stream_id(), "stream signal while idle");
        return Vec::new();
    };
    if action.stream_id() != active {
        tracing::debug!(
            stream_id = action.stream_id(),
            active,
            "ignoring signal from stale stream"
        );
        return Vec::new();
    }

    match action {
        StreamAction::Event { event, at_ms, .. } => apply_event(state, active, event, at_ms),
        StreamAction::Closed { at_ms, .. } => finalize(state, active, None, at_ms),
        StreamAction::Failed { message, .. } => fail(state, active, Some(message)),
    }
}

fn apply_event(
    state: &mut ChatState,
    stream_id: u64,
    event: StreamEvent,
    at_ms: i64,
) -> Vec<ChatEffect> {
    match event {
        StreamEvent::TextChunk(chunk) => {
            if chunk.is_empty() {
                return Vec::new();
            }
            state.stream.push_text(&chunk);
        }
        StreamEvent::Citation(citation) => {
            let id = citation.id;
            if !state.stream.add_citation(citation) {
                tracing::debug!(stream_id, citation_id = id, "duplicate citation dropped");
                return Vec::new();
            }
        }
        StreamEvent::ToolCall(update) => state.stream.upsert_tool_call(update, at_ms),
        StreamEvent::UiComponent(component) => state.stream.push_component(component),
        StreamEvent::Complete { content } => return finalize(state, stream_id, content, at_ms),
        StreamEvent::Error { message } => return fail(state, stream_id, message),
    }
    vec![ChatEffect::RequestFrame]
}

/// Moves the accumulated stream into the conversation. `fallback_text` only
/// applies when no text was streamed.
fn finalize(
    state: &mut ChatState,
    stream_id: u64,
    fallback_text: Option<String>,
    at_ms: i64,
) -> Vec<ChatEffect> {
    state.phase = StreamPhase::Finalizing { stream_id };

    let mut content = state.stream.take_final();
    if content.text.is_empty() {
        content.text = fallback_text.unwrap_or_default();
    }
    let placeholder_id = state.allocate_message_id(at_ms);
    let message_id = state
        .conversation
        .finalize_assistant(placeholder_id, at_ms, content);
    state.stream.clear();
    state.phase = StreamPhase::Idle;

    tracing::debug!(stream_id, message_id = %message_id, "stream finalized");
    vec![
        ChatEffect::PersistMessage(message_id),
        ChatEffect::RequestFrame,
    ]
}

fn fail(state: &mut ChatState, stream_id: u64, message: Option<String>) -> Vec<ChatEffect> {
    let message = message
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_STREAM_ERROR.to_string());
    tracing::debug!(stream_id, error = %message, "stream failed");

    state.error = Some(ChatError::new(message, stream_id));
    state.stream.clear();
    state.phase = StreamPhase::Idle;
    vec![
        ChatEffect::AbortStream { stream_id },
        ChatEffect::RequestFrame,
    ]
}

fn reduce_viewer(state: &mut ChatState, action: ViewerAction) -> Vec<ChatEffect> {
    if state.viewer.document.is_none() {
        return Vec::new();
    }
    match action {
        ViewerAction::DocumentLoaded { page_count } => state.viewer.document_loaded(page_count),
        ViewerAction::DocumentLoadFailed { message } => state.viewer.document_failed(message),
    }
    vec![ChatEffect::RequestFrame]
}

#[cfg(test)]
mod tests;
