use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use snafu::{ResultExt, ensure};
use url::Url;

use crate::backend::{
    BackendConfig, BackendResult, BoxFuture, BuildClientSnafu, ChatBackend, DecodeSnafu,
    EndpointUrlSnafu, ImagePartSnafu, InvalidBaseUrlSnafu, OpaqueBaseUrlSnafu, RequestSnafu,
    StatusSnafu,
};
use crate::wire::{
    ChatName, ChatSummary, ErrorResponse, HistoryEntry, ImageUpload, LoadChatRequest,
    LoadChatResponse, NewChatResponse, RemoteMedia, SendRequest, SendResponse,
    UploadImageResponse,
};

pub const GET_CHATS_ENDPOINT: &str = "/get_chats";
pub const LOAD_CHAT_ENDPOINT: &str = "/load_chat";
pub const NEW_CHAT_ENDPOINT: &str = "/new_chat";
pub const UPLOAD_IMAGE_ENDPOINT: &str = "/upload_image";
pub const SEND_MESSAGE_ENDPOINT: &str = "/get";
/// Label used in errors for image downloads, which have no fixed endpoint.
const MEDIA_ENDPOINT: &str = "media";

/// Multipart field name the upload endpoint reads.
pub const UPLOAD_FIELD_NAME: &str = "image";

/// `ChatBackend` over HTTP/JSON with reqwest.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> BackendResult<Self> {
        let base_url = parse_base_url(&config.base_url)?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context(BuildClientSnafu {
            stage: "http-backend-new",
        })?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, endpoint: &'static str) -> BackendResult<Url> {
        // Relative join keeps any path prefix of the configured base URL.
        self.base_url
            .join(endpoint.trim_start_matches('/'))
            .context(EndpointUrlSnafu {
                stage: "join-endpoint",
                endpoint,
            })
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        request: reqwest::RequestBuilder,
    ) -> BackendResult<T> {
        tracing::debug!(endpoint, "sending backend request");

        let response = request.send().await.context(RequestSnafu {
            stage: "send-request",
            endpoint,
        })?;
        let status = response.status();
        let body = response.text().await.context(RequestSnafu {
            stage: "read-response-body",
            endpoint,
        })?;

        if !status.is_success() {
            return StatusSnafu {
                stage: "check-response-status",
                endpoint,
                status: status.as_u16(),
                message: error_message(&body),
            }
            .fail();
        }

        serde_json::from_str(&body).context(DecodeSnafu {
            stage: "decode-response",
            endpoint,
        })
    }

    async fn fetch_chats(&self) -> BackendResult<Vec<ChatSummary>> {
        let url = self.endpoint(GET_CHATS_ENDPOINT)?;
        self.execute(GET_CHATS_ENDPOINT, self.client.get(url)).await
    }

    async fn fetch_history(&self, chat: &ChatName) -> BackendResult<Vec<HistoryEntry>> {
        let url = self.endpoint(LOAD_CHAT_ENDPOINT)?;
        let request = self.client.post(url).json(&LoadChatRequest { chat });
        let response: LoadChatResponse = self.execute(LOAD_CHAT_ENDPOINT, request).await?;
        Ok(response.history.unwrap_or_default())
    }

    async fn create_chat(&self) -> BackendResult<ChatName> {
        let url = self.endpoint(NEW_CHAT_ENDPOINT)?;
        let response: NewChatResponse = self
            .execute(NEW_CHAT_ENDPOINT, self.client.post(url))
            .await?;
        Ok(response.new_chat)
    }

    async fn post_image(&self, upload: ImageUpload) -> BackendResult<Option<String>> {
        let url = self.endpoint(UPLOAD_IMAGE_ENDPOINT)?;
        let part = Part::bytes(upload.bytes)
            .file_name(upload.file_name)
            .mime_str(upload.mime_type)
            .context(ImagePartSnafu {
                stage: "build-image-part",
                mime_type: upload.mime_type,
            })?;
        let form = Form::new().part(UPLOAD_FIELD_NAME, part);

        let response: UploadImageResponse = self
            .execute(UPLOAD_IMAGE_ENDPOINT, self.client.post(url).multipart(form))
            .await?;
        Ok(response
            .image_url
            .filter(|image_url| !image_url.trim().is_empty()))
    }

    async fn post_message(&self, request: SendRequest) -> BackendResult<SendResponse> {
        let url = self.endpoint(SEND_MESSAGE_ENDPOINT)?;
        self.execute(SEND_MESSAGE_ENDPOINT, self.client.post(url).json(&request))
            .await
    }

    /// Downloads an image referenced by a message, resolving server-relative paths first.
    pub async fn fetch_media(&self, raw: &str) -> BackendResult<RemoteMedia> {
        let url = resolve_media_url(&self.base_url, raw);
        tracing::debug!(%url, "fetching media");

        let response = self.client.get(&url).send().await.context(RequestSnafu {
            stage: "send-media-request",
            endpoint: MEDIA_ENDPOINT,
        })?;
        let status = response.status();
        ensure!(
            status.is_success(),
            StatusSnafu {
                stage: "check-media-status",
                endpoint: MEDIA_ENDPOINT,
                status: status.as_u16(),
                message: url,
            }
        );

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.split(';').next().unwrap_or(value).trim().to_string());
        let bytes = response.bytes().await.context(RequestSnafu {
            stage: "read-media-body",
            endpoint: MEDIA_ENDPOINT,
        })?;

        Ok(RemoteMedia {
            content_type,
            bytes: bytes.to_vec(),
        })
    }
}

impl ChatBackend for HttpBackend {
    fn list_chats(&self) -> BoxFuture<'_, BackendResult<Vec<ChatSummary>>> {
        Box::pin(self.fetch_chats())
    }

    fn load_chat<'a>(
        &'a self,
        chat: &'a ChatName,
    ) -> BoxFuture<'a, BackendResult<Vec<HistoryEntry>>> {
        Box::pin(self.fetch_history(chat))
    }

    fn new_chat(&self) -> BoxFuture<'_, BackendResult<ChatName>> {
        Box::pin(self.create_chat())
    }

    fn upload_image(&self, upload: ImageUpload) -> BoxFuture<'_, BackendResult<Option<String>>> {
        Box::pin(self.post_image(upload))
    }

    fn send_message(&self, request: SendRequest) -> BoxFuture<'_, BackendResult<SendResponse>> {
        Box::pin(self.post_message(request))
    }
}

/// Parses the configured base URL and makes it usable as a join base.
pub fn parse_base_url(raw: &str) -> BackendResult<Url> {
    let raw = raw.trim();
    let mut url = Url::parse(raw).context(InvalidBaseUrlSnafu {
        stage: "parse-base-url",
        url: raw.to_string(),
    })?;

    ensure!(
        !url.cannot_be_a_base(),
        OpaqueBaseUrlSnafu {
            stage: "parse-base-url",
            url: raw.to_string(),
        }
    );

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}

/// Resolves an image reference from the backend for display.
///
/// Server-relative paths such as `/uploads/a.png` are joined onto the base URL,
/// absolute and `data:` URLs pass through unchanged.
pub fn resolve_media_url(base_url: &Url, raw: &str) -> String {
    let raw = raw.trim();
    if raw.starts_with("data:") || Url::parse(raw).is_ok() {
        return raw.to_string();
    }

    match base_url.join(raw) {
        Ok(url) => url.to_string(),
        Err(error) => {
            tracing::warn!(raw, %error, "could not resolve media url against backend");
            raw.to_string()
        }
    }
}

fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(payload) => payload.error,
        Err(_) if body.trim().is_empty() => "empty response body".to_string(),
        Err(_) => body.trim().to_string(),
    }
}
