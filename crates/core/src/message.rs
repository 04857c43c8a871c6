use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use parlor_backend::{HistoryEntry, Sender};

/// Stable identifier for one rendered block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u64);

impl BlockId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// Confirmation state of a rendered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageStatus {
    /// Shown optimistically, the backend has not confirmed it yet.
    Pending,
    Done,
    Failed(String),
}

/// What a block represents in the message view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Message,
    /// Local image preview shown on file selection; it carries no label or text.
    Preview,
}

/// Image bytes read from disk for a local preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: &'static str,
    pub bytes: Arc<[u8]>,
}

impl InlineImage {
    pub fn new(mime_type: &'static str, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            mime_type,
            bytes: bytes.into(),
        }
    }

    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type,
            STANDARD.encode(&self.bytes)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRef {
    /// URL as returned by the backend, usually server-relative.
    Remote(String),
    Inline(InlineImage),
}

/// Block contents before the surface assigns an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBlock {
    pub kind: BlockKind,
    pub sender: Sender,
    pub text: String,
    pub image: Option<ImageRef>,
    pub status: MessageStatus,
}

impl NewBlock {
    pub fn message(sender: Sender, text: impl Into<String>, status: MessageStatus) -> Self {
        Self {
            kind: BlockKind::Message,
            sender,
            text: text.into(),
            image: None,
            status,
        }
    }

    pub fn preview(image: ImageRef) -> Self {
        Self {
            kind: BlockKind::Preview,
            sender: Sender::User,
            text: String::new(),
            image: Some(image),
            status: MessageStatus::Done,
        }
    }

    pub fn from_history(entry: &HistoryEntry) -> Self {
        let block = Self::message(entry.sender, entry.text.clone(), MessageStatus::Done);
        match entry.image_url.as_deref() {
            Some(image_url) if !image_url.is_empty() => {
                block.with_image(ImageRef::Remote(image_url.to_string()))
            }
            _ => block,
        }
    }

    pub fn with_image(mut self, image: ImageRef) -> Self {
        self.image = Some(image);
        self
    }
}

/// A rendered block in the message view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageBlock {
    pub id: BlockId,
    pub kind: BlockKind,
    pub sender: Sender,
    /// Text split at `\n`; the view draws a line break between segments.
    pub lines: Vec<String>,
    pub images: Vec<ImageRef>,
    pub status: MessageStatus,
}

impl MessageBlock {
    pub fn from_new(id: BlockId, block: NewBlock) -> Self {
        Self {
            id,
            kind: block.kind,
            sender: block.sender,
            lines: text_lines(&block.text),
            images: block.image.into_iter().collect(),
            status: block.status,
        }
    }

    /// Label shown before the text, absent for previews.
    pub fn label(&self) -> Option<&'static str> {
        match self.kind {
            BlockKind::Message => Some(self.sender.label()),
            BlockKind::Preview => None,
        }
    }
}

/// Splits message text into the segments separated by line breaks.
pub fn text_lines(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    text.split('\n').map(str::to_string).collect()
}
