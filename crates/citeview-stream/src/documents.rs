//! Maps citation document references onto the backend's PDF endpoints.

use citeview_core::contracts::DocumentMetadata;
use citeview_core::contracts::PageContent;
use citeview_core::contracts::SearchResponse;
use snafu::OptionExt;
use snafu::ResultExt;
use url::Url;

use crate::error::HttpSnafu;
use crate::error::InvalidBaseUrlSnafu;
use crate::error::InvalidDocumentSnafu;
use crate::error::OpaqueBaseUrlSnafu;
use crate::error::StreamError;
use crate::error::StreamResult;

pub const DOCUMENTS_PATH: [&str; 2] = ["api", "pdfs"];

/// Parses `raw` as a base url, forcing a trailing slash so relative joins keep
/// any path prefix.
pub fn base_url(raw: &str) -> StreamResult<Url> {
    let mut url = Url::parse(raw).context(InvalidBaseUrlSnafu {
        stage: "parse-base-url",
        url: raw.to_string(),
    })?;
    if url.cannot_be_a_base() {
        return OpaqueBaseUrlSnafu {
            stage: "parse-base-url",
            url: raw.to_string(),
        }
        .fail();
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// The bare file name of a document reference, if it names a pdf.
pub fn document_file_name(document: &str) -> Option<&str> {
    let name = document.rsplit(['/', '\\']).next()?.trim();
    let is_pdf = name.len() > ".pdf".len() && name.to_ascii_lowercase().ends_with(".pdf");
    is_pdf.then_some(name)
}

#[derive(Debug, Clone)]
pub struct DocumentLocator {
    client: reqwest::Client,
    base: Url,
}

impl DocumentLocator {
    pub fn new(base_url: &str) -> StreamResult<Self> {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> StreamResult<Self> {
        Ok(Self {
            client,
            base: self::base_url(base_url)?,
        })
    }

    pub fn document_url(&self, document: &str) -> StreamResult<Url> {
        self.endpoint(document, &[])
    }

    pub fn metadata_url(&self, document: &str) -> StreamResult<Url> {
        self.endpoint(document, &["metadata"])
    }

    pub fn page_url(&self, document: &str, page: u32) -> StreamResult<Url> {
        self.endpoint(document, &["page", page.to_string().as_str()])
    }

    pub fn search_url(&self, document: &str, query: &str) -> StreamResult<Url> {
        let mut url = self.endpoint(document, &["search"])?;
        url.query_pairs_mut().append_pair("q", query);
        Ok(url)
    }

    pub fn listing_url(&self) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(DOCUMENTS_PATH);
        }
        url
    }

    pub async fn fetch_metadata(&self, document: &str) -> StreamResult<DocumentMetadata> {
        let url = self.metadata_url(document)?;
        tracing::debug!(url = %url, "fetching document metadata");
        self.get_json(url, "fetch-document-metadata").await
    }

    pub async fn fetch_page(&self, document: &str, page: u32) -> StreamResult<PageContent> {
        let url = self.page_url(document, page)?;
        tracing::debug!(url = %url, "fetching document page");
        self.get_json(url, "fetch-document-page").await
    }

    pub async fn search(&self, document: &str, query: &str) -> StreamResult<SearchResponse> {
        let url = self.search_url(document, query)?;
        self.get_json(url, "search-document").await
    }

    pub async fn list_documents(&self) -> StreamResult<Vec<DocumentMetadata>> {
        self.get_json(self.listing_url(), "list-documents").await
    }

    fn endpoint(&self, document: &str, suffix: &[&str]) -> StreamResult<Url> {
        let name = document_file_name(document).context(InvalidDocumentSnafu {
            stage: "resolve-document-url",
            document: document.to_string(),
        })?;
        let mut url = self.base.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| StreamError::OpaqueBaseUrl {
                stage: "resolve-document-url",
                url: self.base.to_string(),
            })?;
            segments
                .pop_if_empty()
                .extend(DOCUMENTS_PATH)
                .push(name)
                .extend(suffix);
        }
        Ok(url)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: Url,
        stage: &'static str,
    ) -> StreamResult<T> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context(HttpSnafu { stage })?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StreamError::Status {
                stage,
                status: status.as_u16(),
                body,
            });
        }
        response.json::<T>().await.context(HttpSnafu { stage })
    }
}
