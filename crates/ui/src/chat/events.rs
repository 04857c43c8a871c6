use std::path::PathBuf;

use parlor_backend::ChatName;

/// Emitted when a chat row in the sidebar is clicked.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChatSelected {
    pub chat: ChatName,
}

/// Emitted by the sidebar "New" button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NewChatRequested;

/// Emitted when the composer asks to send its current contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Submit;

/// Emitted when the user picked an image file in the composer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageChosen {
    pub path: PathBuf,
}

/// Emitted by the composer on every edit so the screen model mirrors the draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftChanged {
    pub text: String,
}

/// Failure the chat view wants shown as a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatError {
    pub message: String,
}
