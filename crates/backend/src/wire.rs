use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque chat identifier assigned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatName(pub String);

impl ChatName {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChatName {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl From<&str> for ChatName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// One entry of `/get_chats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSummary {
    pub name: ChatName,
    #[serde(default)]
    pub title: Option<String>,
}

impl ChatSummary {
    pub fn new(name: impl Into<String>, title: Option<&str>) -> Self {
        Self {
            name: ChatName::new(name),
            title: title.map(str::to_string),
        }
    }

    /// Display label; untitled chats are shown by name.
    pub fn label(&self) -> &str {
        match self.title.as_deref() {
            Some(title) if !title.trim().is_empty() => title,
            _ => self.name.as_str(),
        }
    }
}

/// Author of a message. Anything the backend does not tag as `user` is the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Sender {
    User,
    Bot,
}

impl Sender {
    pub fn label(self) -> &'static str {
        match self {
            Self::User => "You",
            Self::Bot => "Bot",
        }
    }
}

impl From<String> for Sender {
    fn from(value: String) -> Self {
        if value == "user" { Self::User } else { Self::Bot }
    }
}

impl From<Sender> for String {
    fn from(value: Sender) -> Self {
        match value {
            Sender::User => "user".to_string(),
            Sender::Bot => "bot".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub sender: Sender,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl HistoryEntry {
    pub fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            sender,
            text: text.into(),
            image_url: None,
        }
    }

    pub fn with_image(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct LoadChatRequest<'a> {
    pub chat: &'a ChatName,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoadChatResponse {
    #[serde(default)]
    pub history: Option<Vec<HistoryEntry>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NewChatResponse {
    pub new_chat: ChatName,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UploadImageResponse {
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    pub error: String,
}

/// Body of `/get`. Absent values travel as JSON `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendRequest {
    pub msg: String,
    pub image_url: Option<String>,
    pub chat: Option<ChatName>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct SendResponse {
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub chat_name: Option<ChatName>,
}

/// Image bytes downloaded for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteMedia {
    /// Media type without parameters, when the server sent one.
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// A local image ready to be posted to `/upload_image`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Extensions the backend accepts for uploads.
pub const ALLOWED_IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "gif"];

/// MIME type for an accepted image extension, case-insensitive.
pub fn image_mime_type(extension: &str) -> Option<&'static str> {
    match extension.to_ascii_lowercase().as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}
