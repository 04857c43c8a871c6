use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use snafu::Snafu;

use crate::wire::{ChatName, ChatSummary, HistoryEntry, ImageUpload, SendRequest, SendResponse};

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub base_url: String,
    pub request_timeout: Option<Duration>,
}

impl BackendConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim().to_string(),
            request_timeout: Some(DEFAULT_REQUEST_TIMEOUT),
        }
    }

    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BACKEND_URL)
    }
}

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
pub type BackendResult<T> = Result<T, BackendError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum BackendError {
    #[snafu(display("backend url '{url}' is invalid: {source}"))]
    InvalidBaseUrl {
        stage: &'static str,
        url: String,
        source: url::ParseError,
    },
    #[snafu(display("backend url '{url}' cannot carry endpoint paths"))]
    OpaqueBaseUrl { stage: &'static str, url: String },
    #[snafu(display("failed to build endpoint url for `{endpoint}`: {source}"))]
    EndpointUrl {
        stage: &'static str,
        endpoint: &'static str,
        source: url::ParseError,
    },
    #[snafu(display("failed to build http client on `{stage}`: {source}"))]
    BuildClient {
        stage: &'static str,
        source: reqwest::Error,
    },
    #[snafu(display("request to `{endpoint}` failed on `{stage}`: {source}"))]
    Request {
        stage: &'static str,
        endpoint: &'static str,
        source: reqwest::Error,
    },
    #[snafu(display("`{endpoint}` returned status {status}: {message}"))]
    Status {
        stage: &'static str,
        endpoint: &'static str,
        status: u16,
        message: String,
    },
    #[snafu(display("failed to decode `{endpoint}` response: {source}"))]
    Decode {
        stage: &'static str,
        endpoint: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("image mime type '{mime_type}' was rejected: {source}"))]
    ImagePart {
        stage: &'static str,
        mime_type: &'static str,
        source: reqwest::Error,
    },
}

impl BackendError {
    pub fn stage(&self) -> &'static str {
        match self {
            Self::InvalidBaseUrl { stage, .. }
            | Self::OpaqueBaseUrl { stage, .. }
            | Self::EndpointUrl { stage, .. }
            | Self::BuildClient { stage, .. }
            | Self::Request { stage, .. }
            | Self::Status { stage, .. }
            | Self::Decode { stage, .. }
            | Self::ImagePart { stage, .. } => stage,
        }
    }
}

/// The five endpoints the chat view consumes.
pub trait ChatBackend: Send + Sync {
    /// `GET /get_chats`
    fn list_chats(&self) -> BoxFuture<'_, BackendResult<Vec<ChatSummary>>>;

    /// `POST /load_chat`; a missing `history` field yields an empty list.
    fn load_chat<'a>(&'a self, chat: &'a ChatName)
    -> BoxFuture<'a, BackendResult<Vec<HistoryEntry>>>;

    /// `POST /new_chat`
    fn new_chat(&self) -> BoxFuture<'_, BackendResult<ChatName>>;

    /// `POST /upload_image`; `None` when the backend answered without an `image_url`.
    fn upload_image(&self, upload: ImageUpload) -> BoxFuture<'_, BackendResult<Option<String>>>;

    /// `POST /get`
    fn send_message(&self, request: SendRequest) -> BoxFuture<'_, BackendResult<SendResponse>>;
}
