use super::*;
use pretty_assertions::assert_eq;

#[test]
fn cancel_aborts_and_discards_partial_content() {
    let mut state = state();
    let stream_id = submit(&mut state, "q");
    send(&mut state, stream_id, text("par"));
    send(&mut state, stream_id, tool("thinking", ToolStatus::Running, None));

    let effects = user(&mut state, UserAction::Cancel);

    assert_eq!(
        effects,
        vec![
            ChatEffect::AbortStream { stream_id },
            ChatEffect::RequestFrame,
        ]
    );
    assert!(assistant_messages(&state).is_empty());
    assert_eq!(state.error, None);
    assert_transient_cleared(&state);
}

#[test]
fn cancel_while_idle_is_a_no_op() {
    let mut state = state();

    assert!(user(&mut state, UserAction::Cancel).is_empty());
    assert_eq!(state.phase, StreamPhase::Idle);
}

#[test]
fn queued_events_of_a_cancelled_stream_are_discarded() {
    let mut state = state();
    let stream_id = submit(&mut state, "q");
    user(&mut state, UserAction::Cancel);

    for event in [text("x"), complete()] {
        assert!(send(&mut state, stream_id, event).is_empty());
    }
    let effects = reduce(
        &mut state,
        ChatAction::Stream(StreamAction::Failed {
            stream_id,
            message: "aborted".to_string(),
        }),
    );

    assert!(effects.is_empty());
    assert_eq!(state.error, None);
    assert!(assistant_messages(&state).is_empty());
}

#[test]
fn resubmit_after_cancel_starts_a_fresh_stream() {
    let mut state = state();
    let first = submit(&mut state, "q");
    send(&mut state, first, text("old"));
    user(&mut state, UserAction::Cancel);

    let second = submit(&mut state, "q again");
    send(&mut state, second, text("new"));
    send(&mut state, second, complete());

    let assistants = assistant_messages(&state);
    assert_eq!(assistants.len(), 1);
    assert_eq!(assistants[0].content, "new");
    assert_eq!(state.conversation.len(), 3);
}
