use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwapOption;
use parlor_backend::ChatName;

/// Identifies one generation of the message view.
///
/// A new ticket is issued every time the view is replaced by another chat, so
/// responses that belong to an older generation can be rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewTicket(pub u64);

/// Sequence number of one chat-list request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListSeq(pub u64);

/// Application state shared by all controller operations.
#[derive(Debug, Default)]
pub struct ChatSession {
    current: ArcSwapOption<ChatName>,
    view_generation: AtomicU64,
    list_requested: AtomicU64,
    list_applied: AtomicU64,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<ChatName> {
        self.current.load_full().map(|name| (*name).clone())
    }

    pub fn set_current(&self, chat: Option<ChatName>) {
        self.current.store(chat.map(Arc::new));
    }

    /// Stores `chat` and returns the previous value for rollback.
    pub fn replace_current(&self, chat: ChatName) -> Option<ChatName> {
        self.current
            .swap(Some(Arc::new(chat)))
            .map(|previous| (*previous).clone())
    }

    pub fn begin_view(&self) -> ViewTicket {
        ViewTicket(self.view_generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn view_ticket(&self) -> ViewTicket {
        ViewTicket(self.view_generation.load(Ordering::SeqCst))
    }

    pub fn is_current_view(&self, ticket: ViewTicket) -> bool {
        self.view_ticket() == ticket
    }

    pub fn begin_list(&self) -> ListSeq {
        ListSeq(self.list_requested.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Claims the chat list for `seq`; false when a newer list was already shown.
    pub fn commit_list(&self, seq: ListSeq) -> bool {
        self.list_applied.fetch_max(seq.0, Ordering::SeqCst) < seq.0
    }
}
