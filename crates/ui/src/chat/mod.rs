/// Events exchanged between chat components.
pub mod events;
pub mod media;
pub mod message_input;
pub mod message_list;
pub mod scroll_manager;
pub mod sidebar;
pub mod view;

pub use events::{ChatError, ChatSelected, DraftChanged, ImageChosen, NewChatRequested, Submit};
pub use media::{MediaState, image_format};
pub use message_input::MessageInput;
pub use message_list::MessageList;
pub use scroll_manager::ScrollManager;
pub use sidebar::{ChatSidebar, SidebarToggleClicked};
pub use view::ChatView;
