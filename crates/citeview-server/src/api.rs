//! HTTP routes of the mock chat backend.

use std::convert::Infallible;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::http::header;
use axum::http::HeaderName;
use axum::http::HeaderValue;
use axum::http::StatusCode;
use axum::response::sse::Event;
use axum::response::sse::Sse;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use axum::Json;
use axum::Router;
use citeview_core::contracts::ChatRequest;
use citeview_core::contracts::DocumentMetadata;
use citeview_core::contracts::ErrorResponse;
use citeview_core::contracts::PageContent;
use citeview_core::contracts::SearchResponse;
use citeview_core::events::StreamEvent;
use citeview_stream::EventSource;
use citeview_stream::EventStream;
use citeview_stream::StreamSignal;
use serde::Deserialize;
use serde_json::json;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tower_http::cors::AllowOrigin;
use tower_http::cors::Any;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::documents::DocumentLibrary;
use crate::pdf::PdfError;

pub const SERVICE_NAME: &str = "CiteView Chat API";

#[derive(Clone)]
pub struct AppState {
    pub library: DocumentLibrary,
    pub source: Arc<dyn EventSource>,
    next_stream_id: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(library: DocumentLibrary, source: Arc<dyn EventSource>) -> Self {
        Self {
            library,
            source,
            next_stream_id: Arc::new(AtomicU64::new(1)),
        }
    }

    fn allocate_stream_id(&self) -> u64 {
        self.next_stream_id.fetch_add(1, Ordering::Relaxed)
    }
}

/// Request failure rendered as `{error, detail?, code?}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorResponse::new(error),
        }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        let mut error = Self::new(StatusCode::BAD_REQUEST, "invalid request");
        error.body = error.body.with_detail(detail).with_code("invalid_request");
        error
    }

    pub fn not_found(filename: &str) -> Self {
        Self::missing("document not found", format!("PDF file '{filename}' not found"))
    }

    pub fn page_not_found(filename: &str, page_number: i64) -> Self {
        Self::missing(
            "page not found",
            format!("Page {page_number} not found in '{filename}'"),
        )
    }

    fn missing(error: &str, detail: String) -> Self {
        let mut error = Self::new(StatusCode::NOT_FOUND, error);
        error.body = error.body.with_detail(detail).with_code("not_found");
        error
    }

    fn unreadable(filename: &str, err: &PdfError) -> Self {
        tracing::warn!(filename = %filename, error = %err, "failed to read pdf");
        Self::internal(format!("failed to read '{filename}': {err}"))
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        let mut error = Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal error");
        error.body = error.body.with_detail(detail).with_code("internal");
        error
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// `"*"` allows any origin; otherwise only the listed origins that parse as
/// header values.
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if allowed_origins.iter().any(|origin| origin == "*") {
        return base.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring unparseable cors origin");
                None
            }
        })
        .collect();
    base.allow_origin(AllowOrigin::list(origins))
}

pub fn router(state: AppState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(service_info))
        .route("/health", get(health))
        .route("/api/chat/stream", post(stream_chat))
        .route("/api/chat/health", get(chat_health))
        .route("/api/pdfs", get(list_documents))
        .route("/api/pdfs/{filename}", get(serve_document))
        .route("/api/pdfs/{filename}/metadata", get(document_metadata))
        .route("/api/pdfs/{filename}/page/{page_number}", get(document_page))
        .route("/api/pdfs/{filename}/search", get(search_document))
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn service_info() -> Json<Value> {
    Json(json!({
        "name": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "chat": "/api/chat/stream",
            "pdfs": "/api/pdfs",
            "health": "/health"
        }
    }))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "services": {
            "chat": "operational",
            "pdfs": "operational"
        }
    }))
}

async fn chat_health() -> Json<Value> {
    Json(json!({"status": "healthy", "service": "chat"}))
}

async fn stream_chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    request
        .validate()
        .map_err(|rejection| ApiError::bad_request(rejection.message()))?;

    let stream_id = state.allocate_stream_id();
    let handle = state
        .source
        .open(stream_id, request)
        .map_err(|err| ApiError::internal(err.to_string()))?;
    tracing::info!(stream_id, source = state.source.name(), "streaming chat answer");
    tokio::spawn(handle.worker);

    let (sse_tx, sse_rx) = mpsc::unbounded_channel::<Result<Event, Infallible>>();
    tokio::spawn(relay(handle.stream, sse_tx));

    let headers = [(HeaderName::from_static("x-accel-buffering"), "no")];
    Ok((headers, Sse::new(UnboundedReceiverStream::new(sse_rx))).into_response())
}

/// Copies stream signals into SSE frames until a terminal event or until the
/// client goes away. Dropping `stream` cancels its worker.
async fn relay(mut stream: EventStream, sse_tx: mpsc::UnboundedSender<Result<Event, Infallible>>) {
    let stream_id = stream.stream_id();
    loop {
        let signal = tokio::select! {
            _ = sse_tx.closed() => {
                tracing::debug!(stream_id, "client disconnected from chat stream");
                return;
            }
            signal = stream.recv() => signal,
        };
        let event = match signal {
            Some(StreamSignal::Event(event)) => event,
            Some(StreamSignal::Failed(message)) => StreamEvent::Error {
                message: Some(message),
            },
            Some(StreamSignal::Closed) | None => return,
        };
        let terminal = event.is_terminal();
        if sse_tx.send(Ok(Event::default().data(event.encode()))).is_err() || terminal {
            return;
        }
    }
}

async fn list_documents(State(state): State<AppState>) -> Result<Json<Vec<DocumentMetadata>>, ApiError> {
    state.library.list().await.map(Json).map_err(|err| {
        tracing::warn!(root = %state.library.root().display(), error = %err, "failed to list documents");
        ApiError::internal(format!("failed to list documents: {err}"))
    })
}

async fn serve_document(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let path = state
        .library
        .resolve(&filename)
        .await
        .ok_or_else(|| ApiError::not_found(&filename))?;
    let bytes = tokio::fs::read(&path).await.map_err(|err| {
        tracing::warn!(path = %path.display(), error = %err, "failed to read document");
        ApiError::internal(format!("failed to read document: {err}"))
    })?;
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("document.pdf")
        .replace('"', "");

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, format!("inline; filename=\"{name}\"")),
        ],
        bytes,
    )
        .into_response())
}

async fn document_metadata(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Json<DocumentMetadata>, ApiError> {
    state
        .library
        .metadata(&filename)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found(&filename))
}

async fn document_page(
    State(state): State<AppState>,
    Path((filename, page_number)): Path<(String, i64)>,
) -> Result<Json<PageContent>, ApiError> {
    if page_number < 1 {
        return Err(ApiError::bad_request("Page number must be at least 1"));
    }
    let path = state
        .library
        .resolve(&filename)
        .await
        .ok_or_else(|| ApiError::not_found(&filename))?;
    let content = match u32::try_from(page_number) {
        Ok(page) => state
            .library
            .page(&path, page)
            .await
            .map_err(|err| ApiError::unreadable(&filename, &err))?,
        Err(_) => None,
    };
    content
        .map(Json)
        .ok_or_else(|| ApiError::page_not_found(&filename, page_number))
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: Option<String>,
}

async fn search_document(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let query = params.q.unwrap_or_default();
    if query.trim().is_empty() {
        return Err(ApiError::bad_request("Search query cannot be empty"));
    }
    let path = state
        .library
        .resolve(&filename)
        .await
        .ok_or_else(|| ApiError::not_found(&filename))?;
    let results = state
        .library
        .search(&path, &query)
        .await
        .map_err(|err| ApiError::unreadable(&filename, &err))?;
    tracing::debug!(filename = %filename, hits = results.len(), "searched document");
    Ok(Json(SearchResponse {
        query,
        filename,
        total: results.len(),
        results,
    }))
}
