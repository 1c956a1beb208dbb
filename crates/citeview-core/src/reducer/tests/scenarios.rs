use super::*;
use crate::citations::CitationIndex;
use crate::citations::ResolvedSegment;
use crate::segment::segment_content;
use pretty_assertions::assert_eq;

#[test]
fn climate_query_produces_cited_answer() {
    let mut state = state();
    let stream_id = submit(&mut state, "What does the research say about climate change?");

    let cited = Citation {
        id: 1,
        document: "climate.pdf".to_string(),
        page: 4,
        text_snippet: "...".to_string(),
        relevance_score: Some(0.92),
    };
    let events = [
        tool("searching_documents", ToolStatus::Running, None),
        text("The research "),
        text("indicates..."),
        StreamEvent::Citation(cited.clone()),
        complete(),
    ];
    for event in events {
        send(&mut state, stream_id, event);
    }

    let assistants = assistant_messages(&state);
    assert_eq!(assistants.len(), 1);
    let answer = assistants[0];
    assert_eq!(answer.content, "The research indicates...");
    assert_eq!(answer.citations, vec![cited]);
    assert!(!answer.streaming);
    assert_eq!(
        state.conversation.first().map(|message| message.content.as_str()),
        Some("What does the research say about climate change?")
    );
    assert_transient_cleared(&state);
}

#[test]
fn click_on_report_citation_targets_page_seven() {
    let mut state = state();
    let stream_id = submit(&mut state, "q");
    send(&mut state, stream_id, text("Per the report [2]."));
    send(
        &mut state,
        stream_id,
        StreamEvent::Citation(citation(2, "report.pdf", 7, "snippet")),
    );
    send(&mut state, stream_id, complete());
    let Some(answer) = state.conversation.last().cloned() else {
        panic!("no answer");
    };

    let index = CitationIndex::build(&answer.citations);
    let clickable: Vec<u32> = index
        .resolve(&segment_content(&answer.content))
        .iter()
        .filter_map(|segment| match segment {
            ResolvedSegment::Marker {
                id,
                citation: Some(_),
                ..
            } => Some(*id),
            _ => None,
        })
        .collect();
    assert_eq!(clickable, vec![2]);

    user(
        &mut state,
        UserAction::ClickCitation {
            message_id: Some(answer.id),
            citation_id: 2,
        },
    );

    assert!(state.viewer.is_open);
    assert_eq!(state.viewer.document.as_deref(), Some("report.pdf"));
    assert_eq!(state.viewer.target_page, 7);
    assert_eq!(state.viewer.highlight_text.as_deref(), Some("snippet"));
}

#[test]
fn cancel_after_two_chunks_leaves_no_answer() {
    let mut state = state();
    let stream_id = submit(&mut state, "q");
    send(&mut state, stream_id, text("one "));
    send(&mut state, stream_id, text("two "));

    user(&mut state, UserAction::Cancel);

    assert!(assistant_messages(&state).is_empty());
    assert!(!state.is_loading());
    assert_eq!(state.conversation.len(), 1);
}

#[test]
fn conversation_keeps_order_across_turns() {
    let mut state = state();
    for (query, answer) in [("first", "one"), ("second", "two")] {
        let stream_id = submit(&mut state, query);
        send(&mut state, stream_id, text(answer));
        send(&mut state, stream_id, complete());
    }

    let transcript: Vec<(Role, &str)> = state
        .conversation
        .iter()
        .map(|message| (message.role, message.content.as_str()))
        .collect();
    assert_eq!(
        transcript,
        vec![
            (Role::User, "first"),
            (Role::Assistant, "one"),
            (Role::User, "second"),
            (Role::Assistant, "two"),
        ]
    );
}
