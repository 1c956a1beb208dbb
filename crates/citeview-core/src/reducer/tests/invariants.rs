use std::collections::HashSet;

use super::*;
use pretty_assertions::assert_eq;

/// A fixed pseudo-random event mix exercising every event kind.
fn event_mix(seed: u64) -> Vec<StreamEvent> {
    let mut x = seed;
    let mut events = Vec::new();
    for _ in 0..40 {
        x = x.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let pick = (x >> 33) % 5;
        let n = ((x >> 40) % 4) as u32;
        events.push(match pick {
            0 | 1 => text(&format!("t{n} ")),
            2 => StreamEvent::Citation(citation(n, "doc.pdf", n + 1, "s")),
            3 => tool(
                &format!("tool{n}"),
                if n % 2 == 0 {
                    ToolStatus::Running
                } else {
                    ToolStatus::Completed
                },
                None,
            ),
            _ => StreamEvent::UiComponent(stat(&format!("c{n}"))),
        });
    }
    events
}

#[test]
fn completion_holds_exactly_what_was_accumulated() {
    for seed in 1..=8 {
        let mut state = state();
        let stream_id = submit(&mut state, "q");
        let events = event_mix(seed);

        let mut expected_text = String::new();
        let mut expected_citations: Vec<Citation> = Vec::new();
        let mut expected_components = Vec::new();
        for event in &events {
            match event {
                StreamEvent::TextChunk(chunk) => expected_text.push_str(chunk),
                StreamEvent::Citation(citation) => {
                    if expected_citations.iter().all(|seen| seen.id != citation.id) {
                        expected_citations.push(citation.clone());
                    }
                }
                StreamEvent::UiComponent(component) => expected_components.push(component.clone()),
                _ => {}
            }
        }
        for event in events {
            send(&mut state, stream_id, event);
        }
        send(&mut state, stream_id, complete());

        let answer = assistant_messages(&state)[0].clone();
        assert_eq!(answer.content, expected_text, "seed {seed}");
        assert_eq!(answer.citations, expected_citations, "seed {seed}");
        assert_eq!(answer.components, expected_components, "seed {seed}");
        assert_transient_cleared(&state);
    }
}

#[test]
fn tool_calls_stay_unique_per_tool() {
    for seed in 1..=8 {
        let mut state = state();
        let stream_id = submit(&mut state, "q");
        for event in event_mix(seed) {
            send(&mut state, stream_id, event);
        }

        let tools: HashSet<&str> = state
            .stream
            .tool_calls
            .iter()
            .map(|call| call.tool.as_str())
            .collect();
        assert_eq!(tools.len(), state.stream.tool_calls.len(), "seed {seed}");
    }
}

#[test]
fn cancellation_never_appends_assistant_message() {
    for seed in 1..=8 {
        let mut state = state();
        let stream_id = submit(&mut state, "q");
        for event in event_mix(seed).into_iter().take(seed as usize * 4) {
            send(&mut state, stream_id, event);
        }
        user(&mut state, UserAction::Cancel);
        send(&mut state, stream_id, complete());

        assert!(assistant_messages(&state).is_empty(), "seed {seed}");
        assert_transient_cleared(&state);
    }
}

#[test]
fn message_ids_are_unique() {
    let mut state = state();
    for _ in 0..3 {
        let stream_id = submit(&mut state, "q");
        send(&mut state, stream_id, complete());
    }

    let ids: HashSet<&MessageId> = state.conversation.iter().map(|message| &message.id).collect();
    assert_eq!(ids.len(), state.conversation.len());
}
