use std::path::Path;
use std::path::PathBuf;

use citeview_core::contracts::DocumentMetadata;
use citeview_core::contracts::PageContent;
use citeview_core::contracts::SearchHit;
use citeview_stream::document_file_name;
use snafu::ResultExt;

use crate::pdf::search_pages;
use crate::pdf::PdfError;
use crate::pdf::PdfFile;
use crate::pdf::PdfInfo;
use crate::pdf::TaskSnafu;

/// The directory of PDFs the backend serves.
#[derive(Debug, Clone)]
pub struct DocumentLibrary {
    root: PathBuf,
}

impl DocumentLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Metadata for every pdf directly under the root, sorted by name. A
    /// missing root lists as empty.
    pub async fn list(&self) -> std::io::Result<Vec<DocumentMetadata>> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(root = %self.root.display(), "documents directory missing");
                return Ok(Vec::new());
            }
            Err(err) => return Err(err),
        };

        let mut documents = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if document_file_name(name) != Some(name) {
                continue;
            }
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            documents.push(describe(name, metadata.len(), read_info(entry.path()).await));
        }
        documents.sort_by(|left, right| left.filename.cmp(&right.filename));
        Ok(documents)
    }

    /// The on-disk path for `filename`, if it names a pdf file in the root.
    /// Only the final path component is honored.
    pub async fn resolve(&self, filename: &str) -> Option<PathBuf> {
        let name = document_file_name(filename)?;
        if name == "." || name == ".." {
            return None;
        }
        let path = self.root.join(name);
        let metadata = tokio::fs::metadata(&path).await.ok()?;
        metadata.is_file().then_some(path)
    }

    /// Size plus whatever the pdf reports about itself. A file that does
    /// not parse still has metadata, just without title, author or pages.
    pub async fn metadata(&self, filename: &str) -> Option<DocumentMetadata> {
        let path = self.resolve(filename).await?;
        let metadata = tokio::fs::metadata(&path).await.ok()?;
        let name = path.file_name()?.to_str()?.to_string();
        Some(describe(&name, metadata.len(), read_info(path).await))
    }

    /// Text of the 1-based `page` of the pdf at `path`; `None` past the end.
    pub async fn page(&self, path: &Path, page: u32) -> Result<Option<PageContent>, PdfError> {
        let path = path.to_path_buf();
        let text = tokio::task::spawn_blocking(move || PdfFile::load(&path)?.page_text(page))
            .await
            .context(TaskSnafu {
                stage: "read-page-text",
            })??;
        Ok(text.map(|text| PageContent {
            page_number: page,
            text,
        }))
    }

    pub async fn search(&self, path: &Path, query: &str) -> Result<Vec<SearchHit>, PdfError> {
        let path = path.to_path_buf();
        let pages = tokio::task::spawn_blocking(move || {
            PdfFile::load(&path).map(|pdf| pdf.pages_text())
        })
        .await
        .context(TaskSnafu {
            stage: "read-document-text",
        })??;
        Ok(search_pages(&pages, query))
    }
}

async fn read_info(path: PathBuf) -> Option<PdfInfo> {
    let loaded = tokio::task::spawn_blocking({
        let path = path.clone();
        move || PdfFile::load(&path).map(|pdf| pdf.info())
    })
    .await;
    match loaded {
        Ok(Ok(info)) => Some(info),
        Ok(Err(err)) => {
            tracing::warn!(path = %path.display(), error = %err, "unreadable pdf, reporting size only");
            None
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "pdf metadata task failed");
            None
        }
    }
}

fn describe(filename: &str, file_size: u64, info: Option<PdfInfo>) -> DocumentMetadata {
    let (title, author, num_pages) = match info {
        Some(info) => (info.title, info.author, Some(info.num_pages)),
        None => (None, None, None),
    };
    DocumentMetadata {
        filename: filename.to_string(),
        title,
        author,
        num_pages,
        file_size,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use super::DocumentLibrary;
    use crate::pdf::render_pdf;
    use crate::pdf::DraftPage;
    use crate::pdf::PdfDraft;

    fn write_report(dir: &std::path::Path) {
        let draft = PdfDraft {
            title: "Field Notes".to_string(),
            author: "Survey Team".to_string(),
            pages: vec![
                DraftPage::new("Intro", vec!["Station readings begin here.".to_string()]),
                DraftPage::new("Results", vec!["Sea level rose at every station.".to_string()]),
            ],
        };
        std::fs::write(dir.join("report.pdf"), render_pdf(&draft).expect("render")).expect("write");
    }

    #[tokio::test]
    async fn lists_only_pdf_files_sorted() {
        let dir = tempdir().expect("tempdir");
        std::fs::write(dir.path().join("b.pdf"), b"%PDF-1.4 bb").expect("write");
        std::fs::write(dir.path().join("a.pdf"), b"%PDF").expect("write");
        std::fs::write(dir.path().join("notes.txt"), b"x").expect("write");
        std::fs::create_dir(dir.path().join("folder.pdf")).expect("mkdir");

        let library = DocumentLibrary::new(dir.path());
        let listed = library.list().await.expect("list");

        let names: Vec<(&str, u64)> = listed
            .iter()
            .map(|doc| (doc.filename.as_str(), doc.file_size))
            .collect();
        assert_eq!(names, vec![("a.pdf", 4), ("b.pdf", 11)]);
        assert_eq!(listed[0].num_pages, None);
    }

    #[tokio::test]
    async fn missing_root_lists_empty() {
        let dir = tempdir().expect("tempdir");
        let library = DocumentLibrary::new(dir.path().join("nope"));
        assert_eq!(library.list().await.expect("list"), Vec::new());
    }

    #[tokio::test]
    async fn resolve_ignores_directory_components() {
        let dir = tempdir().expect("tempdir");
        let root = dir.path().join("pdfs");
        std::fs::create_dir(&root).expect("mkdir");
        std::fs::write(root.join("paper.pdf"), b"%PDF").expect("write");
        std::fs::write(dir.path().join("secret.pdf"), b"%PDF").expect("write");

        let library = DocumentLibrary::new(&root);
        assert_eq!(library.resolve("paper.pdf").await, Some(root.join("paper.pdf")));
        assert_eq!(
            library.resolve("../pdfs/paper.pdf").await,
            Some(root.join("paper.pdf"))
        );
        assert_eq!(library.resolve("../secret.pdf").await, None);
        assert_eq!(library.resolve("paper.txt").await, None);
        assert_eq!(library.resolve("missing.pdf").await, None);
    }

    #[tokio::test]
    async fn metadata_reports_file_size() {
        let dir = tempdir().expect("tempdir");
        std::fs::write(dir.path().join("climate_research.pdf"), vec![0u8; 2048]).expect("write");

        let library = DocumentLibrary::new(dir.path());
        let metadata = library
            .metadata("climate_research.pdf")
            .await
            .expect("metadata");
        assert_eq!(metadata.filename, "climate_research.pdf");
        assert_eq!(metadata.file_size, 2048);
        assert_eq!(metadata.title, None);
        assert_eq!(metadata.num_pages, None);
    }

    #[tokio::test]
    async fn metadata_reads_pages_title_and_author() {
        let dir = tempdir().expect("tempdir");
        write_report(dir.path());

        let library = DocumentLibrary::new(dir.path());
        let metadata = library.metadata("report.pdf").await.expect("metadata");
        assert_eq!(metadata.num_pages, Some(2));
        assert_eq!(metadata.title.as_deref(), Some("Field Notes"));
        assert_eq!(metadata.author.as_deref(), Some("Survey Team"));

        let listed = library.list().await.expect("list");
        assert_eq!(listed, vec![metadata]);
    }

    #[tokio::test]
    async fn pages_and_search_read_the_text() {
        let dir = tempdir().expect("tempdir");
        write_report(dir.path());
        let library = DocumentLibrary::new(dir.path());
        let path = library.resolve("report.pdf").await.expect("resolve");

        let page = library.page(&path, 2).await.expect("page").expect("page 2");
        assert_eq!(page.page_number, 2);
        assert!(page.text.contains("Sea level rose"), "{}", page.text);
        assert_eq!(library.page(&path, 3).await.expect("page"), None);

        let hits = library.search(&path, "SEA LEVEL").await.expect("search");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].page, 2);
        assert!(hits[0].snippet.contains("Sea level rose at every station."));
    }
}
