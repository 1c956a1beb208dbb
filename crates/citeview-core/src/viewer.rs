use super::state::Citation;

/// What the document-rendering collaborator is asked to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRequest {
    pub document: String,
    pub page: u32,
    pub highlight: Option<String>,
}

/// Single document viewer. A new open replaces the previous target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewerState {
    pub is_open: bool,
    pub document: Option<String>,
    pub target_page: u32,
    pub highlight_text: Option<String>,
    pub document_name: Option<String>,
    pub page_count: Option<u32>,
    pub load_error: Option<String>,
}

impl ViewerState {
    pub fn open(&mut self, citation: &Citation) -> DocumentRequest {
        let highlight = Some(citation.text_snippet.clone()).filter(|text| !text.is_empty());

        self.is_open = true;
        self.document = Some(citation.document.clone());
        self.document_name = Some(display_name(&citation.document));
        self.target_page = citation.page.max(1);
        self.highlight_text = highlight.clone();
        self.page_count = None;
        self.load_error = None;

        DocumentRequest {
            document: citation.document.clone(),
            page: self.target_page,
            highlight,
        }
    }

    /// Hides the viewer. The last target stays around for a re-open.
    pub fn close(&mut self) {
        self.is_open = false;
    }

    pub fn document_loaded(&mut self, page_count: u32) {
        self.page_count = Some(page_count);
        self.load_error = None;
        if page_count > 0 {
            self.target_page = self.target_page.clamp(1, page_count);
        }
    }

    pub fn document_failed(&mut self, message: impl Into<String>) {
        self.load_error = Some(message.into());
    }
}

/// The final path component of a document reference.
pub fn display_name(document: &str) -> String {
    document
        .rsplit(['/', '\\'])
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or(document)
        .to_string()
}
