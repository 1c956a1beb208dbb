use super::*;
use pretty_assertions::assert_eq;

#[test]
fn complete_moves_stream_into_assistant_message() {
    let mut state = state();
    let stream_id = submit(&mut state, "q");
    send(&mut state, stream_id, tool("thinking", ToolStatus::Running, None));
    send(&mut state, stream_id, StreamEvent::UiComponent(stat("emissions")));
    send(&mut state, stream_id, text("Answer [1]"));
    send(
        &mut state,
        stream_id,
        StreamEvent::Citation(citation(1, "a.pdf", 2, "snippet")),
    );

    let effects = send(&mut state, stream_id, complete());

    let assistants = assistant_messages(&state);
    assert_eq!(assistants.len(), 1);
    let message = assistants[0];
    assert_eq!(message.content, "Answer [1]");
    assert_eq!(message.citations, vec![citation(1, "a.pdf", 2, "snippet")]);
    assert_eq!(message.components, vec![stat("emissions")]);
    assert!(!message.streaming);
    assert_eq!(
        effects,
        vec![
            ChatEffect::PersistMessage(message.id.clone()),
            ChatEffect::RequestFrame,
        ]
    );
    assert_transient_cleared(&state);
}

#[test]
fn accumulated_text_wins_over_complete_payload() {
    let mut state = state();
    let stream_id = submit(&mut state, "q");
    send(&mut state, stream_id, text("streamed"));

    send(
        &mut state,
        stream_id,
        StreamEvent::Complete {
            content: Some("payload".to_string()),
        },
    );

    assert_eq!(assistant_messages(&state)[0].content, "streamed");
}

#[test]
fn complete_payload_fills_an_empty_stream() {
    let mut state = state();
    let stream_id = submit(&mut state, "q");

    send(
        &mut state,
        stream_id,
        StreamEvent::Complete {
            content: Some("payload only".to_string()),
        },
    );

    assert_eq!(assistant_messages(&state)[0].content, "payload only");
}

#[test]
fn transport_close_without_complete_still_finalizes() {
    let mut state = state();
    let stream_id = submit(&mut state, "q");
    send(&mut state, stream_id, text("partial but kept"));

    let effects = reduce(
        &mut state,
        ChatAction::Stream(StreamAction::Closed {
            stream_id,
            at_ms: T0 + 20,
        }),
    );

    assert!(matches!(
        effects.as_slice(),
        [ChatEffect::PersistMessage(_), ChatEffect::RequestFrame]
    ));
    assert_eq!(assistant_messages(&state)[0].content, "partial but kept");
    assert_eq!(state.error, None);
    assert_transient_cleared(&state);
}

#[test]
fn finalization_reuses_streaming_assistant_placeholder() {
    let placeholder = Message::assistant_placeholder(MessageId("msg-restored".to_string()), T0);
    let mut state = ChatState::with_history(vec![placeholder]);
    let stream_id = submit(&mut state, "q");
    // the user message now trails the placeholder, so a fresh one is appended
    send(&mut state, stream_id, text("a"));
    send(&mut state, stream_id, complete());
    assert_eq!(assistant_messages(&state).len(), 2);

    let mut store = crate::state::MessageStore::from_messages(vec![Message::assistant_placeholder(
        MessageId("msg-live".to_string()),
        T0,
    )]);
    let id = store.finalize_assistant(
        MessageId("unused".to_string()),
        T0 + 5,
        crate::state::FinalContent {
            text: "done".to_string(),
            ..Default::default()
        },
    );
    assert_eq!(id, MessageId("msg-live".to_string()));
    assert_eq!(store.len(), 1);
    assert!(store.last().is_some_and(|message| !message.streaming));
}

#[test]
fn error_event_sets_message_and_skips_finalization() {
    let mut state = state();
    let stream_id = submit(&mut state, "q");
    send(&mut state, stream_id, text("half"));

    let effects = send(
        &mut state,
        stream_id,
        StreamEvent::Error {
            message: Some("backend exploded".to_string()),
        },
    );

    assert_eq!(
        effects,
        vec![
            ChatEffect::AbortStream { stream_id },
            ChatEffect::RequestFrame,
        ]
    );
    let Some(error) = &state.error else {
        panic!("error missing");
    };
    assert_eq!(&*error.message, "backend exploded");
    assert_eq!(error.stream_id, stream_id);
    assert!(assistant_messages(&state).is_empty());
    assert_transient_cleared(&state);
}

#[test]
fn error_without_payload_uses_default_message() {
    let mut state = state();
    let stream_id = submit(&mut state, "q");

    send(&mut state, stream_id, StreamEvent::Error { message: None });

    assert_eq!(
        state.error.as_ref().map(|error| &*error.message),
        Some(DEFAULT_STREAM_ERROR)
    );
}

#[test]
fn transport_failure_reports_its_message() {
    let mut state = state();
    let stream_id = submit(&mut state, "q");

    reduce(
        &mut state,
        ChatAction::Stream(StreamAction::Failed {
            stream_id,
            message: "connection refused".to_string(),
        }),
    );

    assert_eq!(
        state.error.as_ref().map(|error| &*error.message),
        Some("connection refused")
    );
    assert!(assistant_messages(&state).is_empty());
}

#[test]
fn next_submit_clears_previous_error() {
    let mut state = state();
    let stream_id = submit(&mut state, "q");
    send(&mut state, stream_id, StreamEvent::Error { message: None });

    submit(&mut state, "again");

    assert_eq!(state.error, None);
}

#[test]
fn events_after_complete_are_ignored() {
    let mut state = state();
    let stream_id = submit(&mut state, "q");
    send(&mut state, stream_id, text("done"));
    send(&mut state, stream_id, complete());

    let effects = send(&mut state, stream_id, text(" trailing"));

    assert!(effects.is_empty());
    assert_eq!(assistant_messages(&state)[0].content, "done");
    assert!(state.stream.is_empty());
}
