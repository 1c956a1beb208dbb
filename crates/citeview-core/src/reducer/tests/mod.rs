use pretty_assertions::assert_eq;

pub(super) use super::reduce;
pub(super) use super::ChatEffect;
pub(super) use crate::actions::ChatAction;
pub(super) use crate::actions::StreamAction;
pub(super) use crate::actions::UserAction;
pub(super) use crate::actions::ViewerAction;
pub(super) use crate::components::StatCard;
pub(super) use crate::components::UiComponent;
pub(super) use crate::events::StreamEvent;
pub(super) use crate::events::ToolCallUpdate;
pub(super) use crate::events::DEFAULT_STREAM_ERROR;
pub(super) use crate::state::ChatState;
pub(super) use crate::state::Citation;
pub(super) use crate::state::Message;
pub(super) use crate::state::MessageId;
pub(super) use crate::state::Role;
pub(super) use crate::state::StreamPhase;
pub(super) use crate::state::ToolStatus;

mod cancellation;
mod finalization;
mod invariants;
mod scenarios;

const T0: i64 = 1_700_000_000_000;

fn state() -> ChatState {
    ChatState::new()
}

/// Submits `query` and returns the id of the stream it opened.
fn submit(state: &mut ChatState, query: &str) -> u64 {
    let effects = reduce(
        state,
        ChatAction::User(UserAction::Submit {
            query: query.to_string(),
            at_ms: T0,
        }),
    );
    let stream_id = effects.iter().find_map(|effect| match effect {
        ChatEffect::OpenStream { stream_id, .. } => Some(*stream_id),
        _ => None,
    });
    let Some(stream_id) = stream_id else {
        panic!("submit did not open a stream: {effects:?}");
    };
    assert_eq!(state.phase, StreamPhase::Streaming { stream_id });
    stream_id
}

fn send(state: &mut ChatState, stream_id: u64, event: StreamEvent) -> Vec<ChatEffect> {
    reduce(
        state,
        ChatAction::Stream(StreamAction::Event {
            stream_id,
            event,
            at_ms: T0 + 10,
        }),
    )
}

fn user(state: &mut ChatState, action: UserAction) -> Vec<ChatEffect> {
    reduce(state, ChatAction::User(action))
}

fn text(chunk: &str) -> StreamEvent {
    StreamEvent::TextChunk(chunk.to_string())
}

fn citation(id: u32, document: &str, page: u32, snippet: &str) -> Citation {
    Citation {
        id,
        document: document.to_string(),
        page,
        text_snippet: snippet.to_string(),
        relevance_score: None,
    }
}

fn tool(name: &str, status: ToolStatus, message: Option<&str>) -> StreamEvent {
    StreamEvent::ToolCall(ToolCallUpdate::new(
        name,
        status,
        message.map(str::to_string),
    ))
}

fn stat(label: &str) -> UiComponent {
    UiComponent::StatCard(StatCard {
        label: label.to_string(),
        value: serde_json::Value::from("12.5 GT"),
        change: None,
        icon: None,
    })
}

fn complete() -> StreamEvent {
    StreamEvent::Complete { content: None }
}

fn assistant_messages(state: &ChatState) -> Vec<&Message> {
    state
        .conversation
        .iter()
        .filter(|message| message.role == Role::Assistant)
        .collect()
}

fn assert_transient_cleared(state: &ChatState) {
    assert!(state.stream.is_empty(), "stream buffers: {:?}", state.stream);
    assert_eq!(state.phase, StreamPhase::Idle);
    assert!(!state.is_loading());
}
