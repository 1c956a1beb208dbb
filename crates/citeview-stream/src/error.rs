use snafu::Snafu;

pub type StreamResult<T> = Result<T, StreamError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum StreamError {
    #[snafu(display("invalid backend url '{url}' on `{stage}`: {source}"))]
    InvalidBaseUrl {
        stage: &'static str,
        url: String,
        source: url::ParseError,
    },
    #[snafu(display("backend url '{url}' cannot carry path segments"))]
    OpaqueBaseUrl { stage: &'static str, url: String },
    #[snafu(display("http request failed on `{stage}`, {source}"))]
    Http {
        stage: &'static str,
        source: reqwest::Error,
    },
    #[snafu(display("event stream broke on `{stage}`: {message}"))]
    EventStream { stage: &'static str, message: String },
    #[snafu(display("backend returned status {status} on `{stage}`: {body}"))]
    Status {
        stage: &'static str,
        status: u16,
        body: String,
    },
    #[snafu(display("document reference '{document}' is not a pdf file name"))]
    InvalidDocument {
        stage: &'static str,
        document: String,
    },
}
