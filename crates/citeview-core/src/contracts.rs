//! JSON bodies shared by the chat backend and its clients.

use serde::Deserialize;
use serde::Serialize;

pub const MAX_QUERY_CHARS: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryRejection {
    Blank,
    TooLong { chars: usize },
}

impl QueryRejection {
    pub fn message(self) -> String {
        match self {
            Self::Blank => "query must not be empty".to_string(),
            Self::TooLong { chars } => {
                format!("query is {chars} characters; the limit is {MAX_QUERY_CHARS}")
            }
        }
    }
}

impl ChatRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            conversation_id: None,
        }
    }

    pub fn validate(&self) -> Result<(), QueryRejection> {
        if self.query.trim().is_empty() {
            return Err(QueryRejection::Blank);
        }
        let chars = self.query.chars().count();
        if chars > MAX_QUERY_CHARS {
            return Err(QueryRejection::TooLong { chars });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub filename: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub num_pages: Option<u32>,
    pub file_size: u64,
}

/// Extracted text of one page, numbered from 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContent {
    pub page_number: u32,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub page: u32,
    pub snippet: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub filename: String,
    pub results: Vec<SearchHit>,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            detail: None,
            code: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn blank_and_oversized_queries_are_rejected() {
        assert_eq!(ChatRequest::new("  \n").validate(), Err(QueryRejection::Blank));
        assert_eq!(
            ChatRequest::new("x".repeat(MAX_QUERY_CHARS + 1)).validate(),
            Err(QueryRejection::TooLong {
                chars: MAX_QUERY_CHARS + 1
            })
        );
        assert_eq!(ChatRequest::new("é".repeat(MAX_QUERY_CHARS)).validate(), Ok(()));
    }

    #[test]
    fn request_omits_absent_conversation() {
        let body = serde_json::to_string(&ChatRequest::new("climate change")).unwrap();
        assert_eq!(body, r#"{"query":"climate change"}"#);
    }
}
