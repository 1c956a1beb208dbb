//! Mock chat backend: scripted SSE answers plus the cited PDF files.

pub mod api;
pub mod documents;
pub mod pdf;
pub mod samples;
pub mod script;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use citeview_core::config::ServerConfig;
use snafu::ResultExt;
use snafu::Snafu;

pub use crate::api::router;
pub use crate::api::AppState;
pub use crate::documents::DocumentLibrary;
pub use crate::samples::seed_documents;
pub use crate::samples::SeedError;
pub use crate::script::scripted_source;
pub use crate::script::Pacing;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ServeError {
    #[snafu(display("failed to prepare documents directory {path:?} on `{stage}`: {source}"))]
    DocumentsDir {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("failed to seed sample documents on `{stage}`: {source}"))]
    Seed {
        stage: &'static str,
        source: SeedError,
    },
    #[snafu(display("failed to bind {bind} on `{stage}`: {source}"))]
    Bind {
        stage: &'static str,
        bind: String,
        source: std::io::Error,
    },
    #[snafu(display("server stopped with an error on `{stage}`: {source}"))]
    Serve {
        stage: &'static str,
        source: std::io::Error,
    },
}

/// Builds the application for `config` without binding a socket.
pub fn app(config: &ServerConfig) -> axum::Router {
    let state = AppState::new(
        DocumentLibrary::new(&config.documents_dir),
        Arc::new(scripted_source(Pacing::from_config(config))),
    );
    router(state, &config.allowed_origins)
}

/// Serves until Ctrl-C.
pub async fn serve(config: ServerConfig) -> Result<(), ServeError> {
    tokio::fs::create_dir_all(&config.documents_dir)
        .await
        .context(DocumentsDirSnafu {
            stage: "create-documents-dir",
            path: config.documents_dir.clone(),
        })?;
    if config.seed_samples {
        seed_documents(&config.documents_dir)
            .await
            .context(SeedSnafu {
                stage: "seed-sample-documents",
            })?;
    }

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .context(BindSnafu {
            stage: "bind-listener",
            bind: config.bind.clone(),
        })?;
    let local: Option<SocketAddr> = listener.local_addr().ok();
    tracing::info!(
        addr = ?local,
        documents = %config.documents_dir.display(),
        "citeview backend listening"
    );

    axum::serve(listener, app(&config))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context(ServeSnafu {
            stage: "serve-http",
        })?;
    tracing::info!("citeview backend stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use citeview_core::config::ServerConfig;
    use citeview_core::contracts::ChatRequest;
    use citeview_core::events::StreamEvent;
    use citeview_stream::DocumentLocator;
    use citeview_stream::EventSource;
    use citeview_stream::HttpEventSource;
    use citeview_stream::StreamSignal;
    use pretty_assertions::assert_eq;

    use super::app;

    fn quiet_config(documents: &std::path::Path) -> ServerConfig {
        ServerConfig {
            documents_dir: documents.to_path_buf(),
            tool_delay_ms: 0,
            component_delay_ms: 0,
            char_delay_ms: 0,
            citation_delay_ms: 0,
            ..ServerConfig::default()
        }
    }

    async fn spawn_backend(config: &ServerConfig) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        let app = app(config);
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn http_source_reads_the_backend_stream() {
        let dir = tempfile::tempdir().expect("tempdir");
        let base = spawn_backend(&quiet_config(dir.path())).await;

        let source = HttpEventSource::new(&base).expect("source");
        let handle = source
            .open(9, ChatRequest::new("what is machine learning?"))
            .expect("open");
        let mut stream = handle.stream;
        tokio::spawn(handle.worker);

        let mut text = String::new();
        let mut last = None;
        while let Some(signal) = tokio::time::timeout(Duration::from_secs(10), stream.recv())
            .await
            .expect("signal in time")
        {
            if let StreamSignal::Event(StreamEvent::TextChunk(chunk)) = &signal {
                text.push_str(chunk);
            }
            last = Some(signal);
        }

        assert_eq!(text, crate::script::Topic::Technology.answer());
        assert!(matches!(
            last,
            Some(StreamSignal::Event(StreamEvent::Complete { .. }))
        ));
    }

    #[tokio::test]
    async fn http_source_reports_rejected_queries() {
        let dir = tempfile::tempdir().expect("tempdir");
        let base = spawn_backend(&quiet_config(dir.path())).await;

        let source = HttpEventSource::new(&base).expect("source");
        let handle = source.open(1, ChatRequest::new("  ")).expect("open");
        let mut stream = handle.stream;
        handle.worker.await;

        match stream.recv().await {
            Some(StreamSignal::Failed(message)) => assert!(message.contains("400"), "{message}"),
            other => panic!("unexpected signal {other:?}"),
        }
    }

    #[tokio::test]
    async fn locator_fetches_metadata_from_the_backend() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("notes.pdf"), b"%PDF-1.4").expect("write");
        crate::seed_documents(dir.path()).await.expect("seed");
        let base = spawn_backend(&quiet_config(dir.path())).await;

        let locator = DocumentLocator::new(&base).expect("locator");
        let metadata = locator
            .fetch_metadata("research_paper.pdf")
            .await
            .expect("metadata");
        assert_eq!(metadata.num_pages, Some(15));
        assert_eq!(metadata.title.as_deref(), Some("General Research Paper"));

        let unparsed = locator.fetch_metadata("notes.pdf").await.expect("metadata");
        assert_eq!(unparsed.file_size, 8);
        assert_eq!(unparsed.num_pages, None);

        let listed = locator.list_documents().await.expect("list");
        assert_eq!(listed.len(), 4);

        let page = locator
            .fetch_page("research_paper.pdf", 8)
            .await
            .expect("page");
        assert!(page.text.contains("Additional research supports"), "{}", page.text);

        let found = locator
            .search("research_paper.pdf", "peer-reviewed")
            .await
            .expect("search");
        assert_eq!(found.total, 1);
        assert_eq!(found.results[0].page, 14);
    }
}
