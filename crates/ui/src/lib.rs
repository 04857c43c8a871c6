#![deny(unsafe_code)]

/// Desktop front-end for the chat backend.
///
/// The window renders a `parlor_core::ScreenModel`; user actions are forwarded
/// to a `parlor_core::ChatController` running on the tokio bridge.
pub mod app;
/// Sidebar, message list and composer views.
pub mod chat;
pub mod theme;
