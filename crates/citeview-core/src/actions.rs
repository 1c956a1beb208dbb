use super::events::StreamEvent;
use super::state::MessageId;

#[derive(Debug, Clone)]
pub enum ChatAction {
    User(UserAction),
    Stream(StreamAction),
    Viewer(ViewerAction),
}

#[derive(Debug, Clone)]
pub enum UserAction {
    Submit {
        query: String,
        at_ms: i64,
    },
    Cancel,
    /// `message_id: None` resolves against the citations of the stream in flight.
    ClickCitation {
        message_id: Option<MessageId>,
        citation_id: u32,
    },
    CloseViewer,
}

/// Signals from the event source, tagged with the stream they belong to.
#[derive(Debug, Clone)]
pub enum StreamAction {
    Event {
        stream_id: u64,
        event: StreamEvent,
        at_ms: i64,
    },
    /// Transport ended without a terminal event.
    Closed {
        stream_id: u64,
        at_ms: i64,
    },
    Failed {
        stream_id: u64,
        message: String,
    },
}

impl StreamAction {
    pub fn stream_id(&self) -> u64 {
        match self {
            Self::Event { stream_id, .. }
            | Self::Closed { stream_id, .. }
            | Self::Failed { stream_id, .. } => *stream_id,
        }
    }
}

/// Reports from the document-rendering collaborator.
#[derive(Debug, Clone)]
pub enum ViewerAction {
    DocumentLoaded { page_count: u32 },
    DocumentLoadFailed { message: String },
}
