//! Chat view state and the controller that keeps it in sync with the backend.
//!
//! Nothing in here depends on the windowing toolkit: the controller talks to a
//! [`ChatSurface`], and [`ScreenModel`] is the surface the desktop front-end draws from.

mod controller;
mod error;
pub mod message;
pub mod screen;
pub mod session;
pub mod settings;

pub use controller::{ChatController, NO_RESPONSE_PLACEHOLDER};
pub use error::{ControllerError, ControllerResult};
pub use message::{BlockId, BlockKind, ImageRef, InlineImage, MessageBlock, MessageStatus, NewBlock};
pub use screen::{
    ChatListEntry, ChatSurface, Composer, ScreenModel, ScreenSnapshot, is_submit_keystroke,
};
pub use session::{ChatSession, ListSeq, ViewTicket};
pub use settings::{ClientSettings, SettingsError, SettingsStore, ThemePreference};
