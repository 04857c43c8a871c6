use std::sync::Arc;

mod backend;
mod http;
mod wire;

pub use backend::{
    BackendConfig, BackendError, BackendResult, BoxFuture, ChatBackend, DEFAULT_BACKEND_URL,
    DEFAULT_REQUEST_TIMEOUT,
};
pub use http::{
    GET_CHATS_ENDPOINT, HttpBackend, LOAD_CHAT_ENDPOINT, NEW_CHAT_ENDPOINT, SEND_MESSAGE_ENDPOINT,
    UPLOAD_FIELD_NAME, UPLOAD_IMAGE_ENDPOINT, parse_base_url, resolve_media_url,
};
pub use url::Url;
pub use wire::{
    ALLOWED_IMAGE_EXTENSIONS, ChatName, ChatSummary, HistoryEntry, ImageUpload, RemoteMedia,
    SendRequest, SendResponse, Sender, image_mime_type,
};

/// Builds the HTTP backend the app talks to.
pub fn create_backend(config: &BackendConfig) -> BackendResult<Arc<HttpBackend>> {
    let backend = HttpBackend::new(config)?;
    tracing::info!(base_url = %backend.base_url(), "created http chat backend");
    Ok(Arc::new(backend))
}
