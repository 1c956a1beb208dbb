//! Reading and writing the PDFs the backend serves.
//!
//! Parsing is delegated to `lopdf`; everything here is synchronous, so
//! callers on the runtime go through [`spawn_blocking`](tokio::task::spawn_blocking).

use std::path::Path;
use std::path::PathBuf;

use citeview_core::contracts::SearchHit;
use lopdf::content::Content;
use lopdf::content::Operation;
use lopdf::dictionary;
use lopdf::Dictionary;
use lopdf::Document;
use lopdf::Object;
use lopdf::Stream;
use snafu::ResultExt;
use snafu::Snafu;

/// Characters of context kept on each side of a search match.
pub const SNIPPET_CONTEXT: usize = 100;

const PAGE_WIDTH: i64 = 612;
const PAGE_HEIGHT: i64 = 792;
const MARGIN: i64 = 72;
const LINE_HEIGHT: i64 = 16;
const FONT_SIZE: i64 = 11;
const HEADING_SIZE: i64 = 16;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum PdfError {
    #[snafu(display("failed to load pdf {path:?} on `{stage}`: {source}"))]
    Load {
        stage: &'static str,
        path: PathBuf,
        source: lopdf::Error,
    },
    #[snafu(display("failed to extract text of page {page} on `{stage}`: {source}"))]
    Extract {
        stage: &'static str,
        page: u32,
        source: lopdf::Error,
    },
    #[snafu(display("failed to write pdf on `{stage}`: {message}"))]
    Write {
        stage: &'static str,
        message: String,
    },
    #[snafu(display("pdf task did not finish on `{stage}`: {source}"))]
    Task {
        stage: &'static str,
        source: tokio::task::JoinError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfInfo {
    pub title: Option<String>,
    pub author: Option<String>,
    pub num_pages: u32,
}

/// A parsed PDF on disk.
pub struct PdfFile {
    document: Document,
}

impl PdfFile {
    pub fn load(path: &Path) -> Result<Self, PdfError> {
        let document = Document::load(path).context(LoadSnafu {
            stage: "parse-pdf",
            path: path.to_path_buf(),
        })?;
        Ok(Self { document })
    }

    pub fn page_count(&self) -> u32 {
        u32::try_from(self.document.get_pages().len()).unwrap_or(u32::MAX)
    }

    pub fn info(&self) -> PdfInfo {
        let info = self.info_dictionary();
        let field = |key: &[u8]| {
            info.and_then(|dict| dict.get(key).ok())
                .and_then(|value| match value {
                    Object::String(bytes, _) => Some(decode_text_string(bytes)),
                    _ => None,
                })
                .map(|text| text.trim().to_string())
                .filter(|text| !text.is_empty())
        };
        PdfInfo {
            title: field(b"Title"),
            author: field(b"Author"),
            num_pages: self.page_count(),
        }
    }

    fn info_dictionary(&self) -> Option<&Dictionary> {
        match self.document.trailer.get(b"Info").ok()? {
            Object::Reference(id) => self.document.get_dictionary(*id).ok(),
            Object::Dictionary(dict) => Some(dict),
            _ => None,
        }
    }

    /// Text of the 1-based `page`, or `None` when the document has no such page.
    pub fn page_text(&self, page: u32) -> Result<Option<String>, PdfError> {
        if page == 0 || page > self.page_count() {
            return Ok(None);
        }
        let text = self.document.extract_text(&[page]).context(ExtractSnafu {
            stage: "extract-page-text",
            page,
        })?;
        Ok(Some(text))
    }

    /// Every page's text in order. A page whose text cannot be extracted
    /// reads as empty.
    pub fn pages_text(&self) -> Vec<(u32, String)> {
        (1..=self.page_count())
            .map(|page| match self.page_text(page) {
                Ok(text) => (page, text.unwrap_or_default()),
                Err(err) => {
                    tracing::debug!(page, error = %err, "page text unavailable");
                    (page, String::new())
                }
            })
            .collect()
    }
}

/// Decodes a PDF text string: UTF-16BE behind a byte order mark, otherwise
/// single-byte (PDFDocEncoding agrees with Latin-1 on printable text).
pub fn decode_text_string(bytes: &[u8]) -> String {
    match bytes {
        [0xFE, 0xFF, rest @ ..] => {
            let units: Vec<u16> = rest
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        _ => bytes.iter().map(|byte| char::from(*byte)).collect(),
    }
}

/// First case-insensitive match of `query` on each page, with
/// [`SNIPPET_CONTEXT`] characters around it. Cut ends are marked with `...`.
pub fn search_pages(pages: &[(u32, String)], query: &str) -> Vec<SearchHit> {
    let needle: Vec<char> = query.chars().map(fold).collect();
    if needle.is_empty() {
        return Vec::new();
    }

    let mut hits = Vec::new();
    for (page, text) in pages {
        let chars: Vec<char> = text.chars().collect();
        let folded: Vec<char> = chars.iter().copied().map(fold).collect();
        let Some(at) = folded
            .windows(needle.len())
            .position(|window| window == needle.as_slice())
        else {
            continue;
        };

        let start = at.saturating_sub(SNIPPET_CONTEXT);
        let end = (at + needle.len() + SNIPPET_CONTEXT).min(chars.len());
        let mut snippet = chars[start..end].iter().collect::<String>().trim().to_string();
        if start > 0 {
            snippet.insert_str(0, "...");
        }
        if end < chars.len() {
            snippet.push_str("...");
        }
        hits.push(SearchHit {
            page: *page,
            snippet,
        });
    }
    hits
}

fn fold(ch: char) -> char {
    ch.to_lowercase().next().unwrap_or(ch)
}

/// A document to render: a heading and body lines per page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfDraft {
    pub title: String,
    pub author: String,
    pub pages: Vec<DraftPage>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftPage {
    pub heading: String,
    pub lines: Vec<String>,
}

impl DraftPage {
    pub fn new(heading: impl Into<String>, lines: Vec<String>) -> Self {
        Self {
            heading: heading.into(),
            lines,
        }
    }
}

/// Renders `draft` with the standard Helvetica fonts. Each line is its own
/// text object so extracted text keeps the line breaks.
pub fn render_pdf(draft: &PdfDraft) -> Result<Vec<u8>, PdfError> {
    let mut document = Document::with_version("1.5");
    let pages_id = document.new_object_id();
    let body_font = document.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let heading_font = document.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = document.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => body_font,
            "F2" => heading_font,
        },
    });

    let mut kids = Vec::with_capacity(draft.pages.len());
    for page in &draft.pages {
        let mut operations = Vec::new();
        let mut y = PAGE_HEIGHT - MARGIN;
        push_line(&mut operations, "F2", HEADING_SIZE, y, &page.heading);
        y -= LINE_HEIGHT * 2;
        for line in &page.lines {
            push_line(&mut operations, "F1", FONT_SIZE, y, line);
            y -= LINE_HEIGHT;
        }

        let content = Content { operations }.encode().map_err(|err| PdfError::Write {
            stage: "encode-page-content",
            message: err.to_string(),
        })?;
        let content_id = document.add_object(Stream::new(dictionary! {}, content));
        let page_id = document.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(Object::from(page_id));
    }

    let count = i64::try_from(kids.len()).unwrap_or(i64::MAX);
    document.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(PAGE_WIDTH),
                Object::Integer(PAGE_HEIGHT),
            ],
        }),
    );
    let catalog_id = document.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = document.add_object(dictionary! {
        "Title" => Object::string_literal(win_ansi(&draft.title)),
        "Author" => Object::string_literal(win_ansi(&draft.author)),
        "Producer" => Object::string_literal("citeview"),
    });
    document.trailer.set("Root", catalog_id);
    document.trailer.set("Info", info_id);

    let mut bytes = Vec::new();
    document.save_to(&mut bytes).map_err(|err| PdfError::Write {
        stage: "save-pdf",
        message: err.to_string(),
    })?;
    Ok(bytes)
}

fn push_line(operations: &mut Vec<Operation>, font: &str, size: i64, y: i64, text: &str) {
    operations.push(Operation::new("BT", vec![]));
    operations.push(Operation::new("Tf", vec![font.into(), size.into()]));
    operations.push(Operation::new("Td", vec![MARGIN.into(), y.into()]));
    operations.push(Operation::new("Tj", vec![Object::string_literal(win_ansi(text))]));
    operations.push(Operation::new("ET", vec![]));
}

// WinAnsi matches Latin-1 above 0xA0; anything outside it becomes '?'.
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|ch| u8::try_from(u32::from(ch)).unwrap_or(b'?'))
        .collect()
}

/// Greedy word wrap at `width` characters.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        if !line.is_empty() && line.chars().count() + 1 + word.chars().count() > width {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}
