//! The sample PDFs the scripted answers cite.
//!
//! Each topic's document carries its citation snippets on the cited pages,
//! a title page, and filler chapters up to one page past the last citation.

use std::path::Path;
use std::path::PathBuf;

use snafu::ResultExt;
use snafu::Snafu;

use crate::pdf::render_pdf;
use crate::pdf::wrap;
use crate::pdf::DraftPage;
use crate::pdf::PdfDraft;
use crate::pdf::PdfError;
use crate::script::Topic;

pub const SAMPLE_AUTHOR: &str = "CiteView Research Library";

const LINE_WIDTH: usize = 84;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SeedError {
    #[snafu(display("failed to render sample {filename} on `{stage}`: {source}"))]
    Render {
        stage: &'static str,
        filename: String,
        source: PdfError,
    },
    #[snafu(display("failed to write sample {path:?} on `{stage}`: {source}"))]
    WriteSample {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
}

pub fn sample_draft(topic: Topic) -> PdfDraft {
    let citations = topic.citations();
    let last_cited = citations.iter().map(|citation| citation.page).max().unwrap_or(1);

    let mut pages = vec![DraftPage::new(
        topic.title(),
        vec![
            format!("Prepared by {SAMPLE_AUTHOR}."),
            "This document contains sample content for demonstration purposes.".to_string(),
        ],
    )];
    for page in 2..=last_cited + 1 {
        let draft = match citations.iter().find(|citation| citation.page == page) {
            Some(citation) => DraftPage::new(
                format!("Section {page}: Key Findings"),
                wrap(&citation.text_snippet, LINE_WIDTH),
            ),
            None => DraftPage::new(
                format!("Chapter {page}: Supporting Data"),
                wrap(
                    &format!(
                        "This page contains supporting data and analysis for the {}.",
                        topic.title()
                    ),
                    LINE_WIDTH,
                ),
            ),
        };
        pages.push(draft);
    }

    PdfDraft {
        title: topic.title().to_string(),
        author: SAMPLE_AUTHOR.to_string(),
        pages,
    }
}

/// Writes every sample missing from `dir` and returns the names written.
/// Files already present are left alone.
pub async fn seed_documents(dir: &Path) -> Result<Vec<String>, SeedError> {
    tokio::fs::create_dir_all(dir).await.context(WriteSampleSnafu {
        stage: "create-documents-dir",
        path: dir.to_path_buf(),
    })?;

    let mut written = Vec::new();
    for topic in Topic::ALL {
        let filename = topic.document();
        let path = dir.join(filename);
        let exists = tokio::fs::try_exists(&path).await.context(WriteSampleSnafu {
            stage: "check-sample",
            path: path.clone(),
        })?;
        if exists {
            tracing::debug!(path = %path.display(), "sample already present");
            continue;
        }

        let bytes = render_pdf(&sample_draft(topic)).context(RenderSnafu {
            stage: "render-sample",
            filename,
        })?;
        tokio::fs::write(&path, bytes).await.context(WriteSampleSnafu {
            stage: "write-sample",
            path: path.clone(),
        })?;
        tracing::info!(path = %path.display(), "wrote sample document");
        written.push(filename.to_string());
    }
    Ok(written)
}
