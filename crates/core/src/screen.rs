use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use parlor_backend::{ChatName, ChatSummary};
use tokio::sync::watch;

use crate::message::{BlockId, ImageRef, MessageBlock, MessageStatus, NewBlock};

/// The view operations the controller performs.
///
/// Implementations render the chat list, the message view and the composer
/// controls (text input and file input).
pub trait ChatSurface: Send + Sync {
    fn show_chat_list(&self, entries: Vec<ChatListEntry>);
    fn clear_messages(&self);
    fn append_block(&self, block: NewBlock) -> BlockId;
    /// Unknown ids are ignored; the block may have been cleared by a newer render.
    fn attach_image(&self, block: BlockId, image: ImageRef);
    fn set_block_status(&self, block: BlockId, status: MessageStatus);
    fn scroll_to_bottom(&self);

    fn text_input(&self) -> String;
    fn clear_text_input(&self);
    fn selected_file(&self) -> Option<PathBuf>;
    fn select_file(&self, path: PathBuf);
    fn clear_file_input(&self);

    fn report_error(&self, message: String);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatListEntry {
    pub name: ChatName,
    pub title: String,
    pub active: bool,
}

impl ChatListEntry {
    pub fn new(summary: &ChatSummary, current: Option<&ChatName>) -> Self {
        Self {
            name: summary.name.clone(),
            title: summary.label().to_string(),
            active: current == Some(&summary.name),
        }
    }
}

/// Text and file input state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Composer {
    pub text: String,
    /// Bumped whenever the text input is cleared so widgets can follow.
    pub text_clears: u64,
    pub attachment: Option<PathBuf>,
}

/// Cloneable view of everything the front-end draws.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScreenSnapshot {
    pub chat_list: Vec<ChatListEntry>,
    pub blocks: Vec<MessageBlock>,
    pub composer: Composer,
    pub scroll_requests: u64,
}

impl ScreenSnapshot {
    pub fn active_chat(&self) -> Option<&ChatListEntry> {
        self.chat_list.iter().find(|entry| entry.active)
    }
}

#[derive(Debug, Default)]
struct ScreenState {
    snapshot: ScreenSnapshot,
    errors: Vec<String>,
    next_block_id: u64,
}

/// In-memory `ChatSurface` the gpui front-end renders from.
///
/// Every visible mutation bumps a revision on a watch channel.
pub struct ScreenModel {
    state: Mutex<ScreenState>,
    revision: watch::Sender<u64>,
}

impl ScreenModel {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            state: Mutex::new(ScreenState::default()),
            revision,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn snapshot(&self) -> ScreenSnapshot {
        self.state().snapshot.clone()
    }

    /// Mirrors the text widget contents; no revision bump since the widget already shows it.
    pub fn set_draft_text(&self, text: impl Into<String>) {
        self.state().snapshot.composer.text = text.into();
    }

    pub fn take_errors(&self) -> Vec<String> {
        std::mem::take(&mut self.state().errors)
    }

    fn state(&self) -> MutexGuard<'_, ScreenState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn mutate<T>(&self, apply: impl FnOnce(&mut ScreenState) -> T) -> T {
        let result = {
            let mut state = self.state();
            apply(&mut state)
        };
        self.revision.send_modify(|revision| *revision += 1);
        result
    }
}

impl Default for ScreenModel {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatSurface for ScreenModel {
    fn show_chat_list(&self, entries: Vec<ChatListEntry>) {
        self.mutate(|state| state.snapshot.chat_list = entries);
    }

    fn clear_messages(&self) {
        self.mutate(|state| state.snapshot.blocks.clear());
    }

    fn append_block(&self, block: NewBlock) -> BlockId {
        self.mutate(|state| {
            state.next_block_id += 1;
            let id = BlockId::new(state.next_block_id);
            state
                .snapshot
                .blocks
                .push(MessageBlock::from_new(id, block));
            id
        })
    }

    fn attach_image(&self, block: BlockId, image: ImageRef) {
        self.mutate(|state| {
            if let Some(target) = state.snapshot.blocks.iter_mut().find(|b| b.id == block) {
                target.images.push(image);
            }
        });
    }

    fn set_block_status(&self, block: BlockId, status: MessageStatus) {
        self.mutate(|state| {
            if let Some(target) = state.snapshot.blocks.iter_mut().find(|b| b.id == block) {
                target.status = status;
            }
        });
    }

    fn scroll_to_bottom(&self) {
        self.mutate(|state| state.snapshot.scroll_requests += 1);
    }

    fn text_input(&self) -> String {
        self.state().snapshot.composer.text.clone()
    }

    fn clear_text_input(&self) {
        self.mutate(|state| {
            let composer = &mut state.snapshot.composer;
            composer.text.clear();
            composer.text_clears += 1;
        });
    }

    fn selected_file(&self) -> Option<PathBuf> {
        self.state().snapshot.composer.attachment.clone()
    }

    fn select_file(&self, path: PathBuf) {
        self.mutate(|state| state.snapshot.composer.attachment = Some(path));
    }

    fn clear_file_input(&self) {
        self.mutate(|state| state.snapshot.composer.attachment = None);
    }

    fn report_error(&self, message: String) {
        self.mutate(|state| state.errors.push(message));
    }
}

/// Enter submits, Shift+Enter inserts a newline.
pub fn is_submit_keystroke(key: &str, shift: bool) -> bool {
    key.eq_ignore_ascii_case("enter") && !shift
}
