//! Owns the chat state and carries out the reducer's effects.

use std::future::Future;
use std::io::Write;
use std::sync::Arc;

use anyhow::Context;
use citeview_core::actions::ChatAction;
use citeview_core::actions::StreamAction;
use citeview_core::actions::UserAction;
use citeview_core::actions::ViewerAction;
use citeview_core::contracts::ChatRequest;
use citeview_core::reducer::reduce;
use citeview_core::reducer::ChatEffect;
use citeview_core::state::ChatState;
use citeview_core::state::MessageId;
use citeview_core::state::Role;
use citeview_core::state::ToolStatus;
use citeview_core::transcript::TranscriptStore;
use citeview_core::viewer::DocumentRequest;
use citeview_stream::DocumentLocator;
use citeview_stream::EventSource;
use citeview_stream::EventStream;
use citeview_stream::StreamSignal;

use crate::render;

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// How one `ask` ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AskOutcome {
    Answered(MessageId),
    Cancelled,
    Failed(String),
    /// The query was blank or a stream was already running.
    Ignored,
}

pub struct Session<W: Write> {
    state: ChatState,
    source: Arc<dyn EventSource>,
    locator: Option<DocumentLocator>,
    transcript: Option<TranscriptStore>,
    active: Option<EventStream>,
    out: W,
    printed: usize,
    tool_progress: Vec<(String, ToolStatus)>,
}

impl<W: Write> Session<W> {
    pub fn new(source: Arc<dyn EventSource>, out: W) -> Self {
        Self {
            state: ChatState::new(),
            source,
            locator: None,
            transcript: None,
            active: None,
            out,
            printed: 0,
            tool_progress: Vec::new(),
        }
    }

    pub fn with_locator(mut self, locator: DocumentLocator) -> Self {
        self.locator = Some(locator);
        self
    }

    /// Restores the stored conversation and appends new messages to it.
    pub fn with_transcript(mut self, transcript: TranscriptStore) -> anyhow::Result<Self> {
        let records = transcript
            .load()
            .with_context(|| format!("reading transcript {}", transcript.path().display()))?;
        let history = citeview_core::transcript::restore_messages(&records);
        tracing::debug!(messages = history.len(), "restored conversation");
        self.state = ChatState::with_history(history);
        self.transcript = Some(transcript);
        Ok(self)
    }

    /// Submits `query` and drives its stream until it finishes or `interrupt`
    /// resolves, which cancels it.
    pub async fn ask(
        &mut self,
        query: &str,
        interrupt: impl Future<Output = ()>,
    ) -> anyhow::Result<AskOutcome> {
        let before = self.state.conversation.len();
        self.dispatch(ChatAction::User(UserAction::Submit {
            query: query.to_string(),
            at_ms: now_ms(),
        }))
        .await?;
        if !self.state.is_loading() && self.state.conversation.len() == before {
            return Ok(AskOutcome::Ignored);
        }

        tokio::pin!(interrupt);
        let mut interrupted = false;
        while let Some(stream_id) = self.state.active_stream_id() {
            let Some(stream) = self.active.as_mut() else {
                break;
            };
            let action = tokio::select! {
                _ = &mut interrupt, if !interrupted => {
                    interrupted = true;
                    tracing::info!(stream_id, "cancelling stream");
                    ChatAction::User(UserAction::Cancel)
                }
                signal = stream.recv() => ChatAction::Stream(stream_action(stream_id, signal)),
            };
            self.dispatch(action).await?;
        }
        self.active = None;

        if interrupted {
            writeln!(self.out).context("writing output")?;
            return Ok(AskOutcome::Cancelled);
        }
        if let Some(error) = &self.state.error {
            return Ok(AskOutcome::Failed(error.message.to_string()));
        }
        match self.state.conversation.last() {
            Some(message) if message.role == Role::Assistant => {
                Ok(AskOutcome::Answered(message.id.clone()))
            }
            _ => Ok(AskOutcome::Ignored),
        }
    }

    /// Clicks citation `citation_id` of a finalized message.
    pub async fn open_citation(
        &mut self,
        message_id: &MessageId,
        citation_id: u32,
    ) -> anyhow::Result<bool> {
        let effects = reduce(
            &mut self.state,
            ChatAction::User(UserAction::ClickCitation {
                message_id: Some(message_id.clone()),
                citation_id,
            }),
        );
        let opened = effects
            .iter()
            .any(|effect| matches!(effect, ChatEffect::OpenDocument(_)));
        if let Some(follow_up) = self.execute(effects).await? {
            self.dispatch(follow_up).await?;
        }
        Ok(opened)
    }

    /// Prints the sources and cards of a finalized answer.
    pub fn print_summary(&mut self, id: &MessageId) -> anyhow::Result<()> {
        let Some(message) = self.state.conversation.get(id) else {
            return Ok(());
        };
        let sources = render::source_lines(message);
        let blocks: Vec<String> = message
            .components
            .iter()
            .filter_map(render::component_block)
            .collect();

        if !sources.is_empty() {
            writeln!(self.out, "\nSources:")?;
            for line in sources {
                writeln!(self.out, "{line}")?;
            }
        }
        for block in blocks {
            writeln!(self.out, "\n{block}")?;
        }
        Ok(())
    }

    async fn dispatch(&mut self, action: ChatAction) -> anyhow::Result<()> {
        let mut pending = vec![action];
        while let Some(action) = pending.pop() {
            let effects = reduce(&mut self.state, action);
            if let Some(follow_up) = self.execute(effects).await? {
                pending.push(follow_up);
            }
        }
        Ok(())
    }

    /// Runs effects in order. An effect that fails locally turns into an
    /// action fed back to the reducer.
    async fn execute(&mut self, effects: Vec<ChatEffect>) -> anyhow::Result<Option<ChatAction>> {
        let mut follow_up = None;
        for effect in effects {
            match effect {
                ChatEffect::OpenStream { stream_id, query } => {
                    if let Some(action) = self.open_stream(stream_id, query) {
                        follow_up = Some(action);
                    }
                }
                ChatEffect::AbortStream { stream_id } => self.abort_stream(stream_id),
                ChatEffect::PersistMessage(id) => self.persist(&id)?,
                ChatEffect::OpenDocument(request) => {
                    if let Some(action) = self.open_document(&request).await? {
                        follow_up = Some(action);
                    }
                }
                ChatEffect::RequestFrame => self.frame()?,
            }
        }
        Ok(follow_up)
    }

    fn open_stream(&mut self, stream_id: u64, query: String) -> Option<ChatAction> {
        self.printed = 0;
        self.tool_progress.clear();
        match self.source.open(stream_id, ChatRequest::new(query)) {
            Ok(handle) => {
                tracing::debug!(stream_id, source = self.source.name(), "stream opened");
                tokio::spawn(handle.worker);
                self.active = Some(handle.stream);
                None
            }
            Err(err) => Some(ChatAction::Stream(StreamAction::Failed {
                stream_id,
                message: err.to_string(),
            })),
        }
    }

    fn abort_stream(&mut self, stream_id: u64) {
        let Some(mut stream) = self.active.take() else {
            return;
        };
        if stream.stream_id() != stream_id {
            self.active = Some(stream);
            return;
        }
        stream.cancel();
    }

    fn persist(&mut self, id: &MessageId) -> anyhow::Result<()> {
        let is_answer = self
            .state
            .conversation
            .get(id)
            .is_some_and(|message| message.role == Role::Assistant);
        if is_answer {
            self.finish_answer(id)?;
        }
        let (Some(message), Some(transcript)) =
            (self.state.conversation.get(id), self.transcript.as_mut())
        else {
            return Ok(());
        };
        if let Err(err) = transcript.append(message) {
            tracing::warn!(
                path = %transcript.path().display(),
                message_id = %id,
                error = %err,
                "failed to append to transcript"
            );
        }
        Ok(())
    }

    /// Prints whatever of the final answer the stream did not already show.
    fn finish_answer(&mut self, id: &MessageId) -> anyhow::Result<()> {
        let Some(message) = self.state.conversation.get(id) else {
            return Ok(());
        };
        let rest = message.content.get(self.printed..).unwrap_or("");
        write!(self.out, "{rest}")?;
        writeln!(self.out)?;
        self.out.flush()?;
        self.printed = 0;
        Ok(())
    }

    async fn open_document(&mut self, request: &DocumentRequest) -> anyhow::Result<Option<ChatAction>> {
        let url = self
            .locator
            .as_ref()
            .and_then(|locator| locator.document_url(&request.document).ok())
            .map(|url| url.to_string());
        for line in render::document_lines(request, url.as_deref()) {
            writeln!(self.out, "{line}")?;
        }

        let Some(locator) = &self.locator else {
            return Ok(None);
        };
        let action = match locator.fetch_metadata(&request.document).await {
            Ok(metadata) => {
                writeln!(self.out, "{}", render::metadata_line(&metadata))?;
                let Some(page_count) = metadata.num_pages else {
                    return Ok(None);
                };
                let page = request.page.clamp(1, page_count.max(1));
                match locator.fetch_page(&request.document, page).await {
                    Ok(content) => {
                        for line in render::page_lines(&content, request.highlight.as_deref()) {
                            writeln!(self.out, "{line}")?;
                        }
                    }
                    Err(err) => {
                        tracing::warn!(document = %request.document, page, error = %err, "page text unavailable");
                        writeln!(self.out, "  page {page} text unavailable: {err}")?;
                    }
                }
                Some(ChatAction::Viewer(ViewerAction::DocumentLoaded { page_count }))
            }
            Err(err) => {
                tracing::warn!(document = %request.document, error = %err, "document unavailable");
                writeln!(self.out, "  unavailable: {err}")?;
                Some(ChatAction::Viewer(ViewerAction::DocumentLoadFailed {
                    message: err.to_string(),
                }))
            }
        };
        Ok(action)
    }

    /// Shows new tool transitions on stderr and new answer text on `out`.
    fn frame(&mut self) -> anyhow::Result<()> {
        for call in &self.state.stream.tool_calls {
            let seen = self
                .tool_progress
                .iter_mut()
                .find(|(tool, _)| *tool == call.tool);
            match seen {
                Some((_, status)) if *status == call.status => continue,
                Some((_, status)) => *status = call.status,
                None => self.tool_progress.push((call.tool.clone(), call.status)),
            }
            eprintln!("{}", render::tool_line(call));
        }

        if !self.state.is_loading() {
            return Ok(());
        }
        let text = &self.state.stream.text;
        if let Some(fresh) = text.get(self.printed..).filter(|fresh| !fresh.is_empty()) {
            write!(self.out, "{fresh}")?;
            self.out.flush()?;
            self.printed = text.len();
        }
        Ok(())
    }
}

fn stream_action(stream_id: u64, signal: Option<StreamSignal>) -> StreamAction {
    match signal {
        Some(StreamSignal::Event(event)) => StreamAction::Event {
            stream_id,
            event,
            at_ms: now_ms(),
        },
        Some(StreamSignal::Failed(message)) => StreamAction::Failed { stream_id, message },
        Some(StreamSignal::Closed) | None => StreamAction::Closed {
            stream_id,
            at_ms: now_ms(),
        },
    }
}
