use std::future::Future;
use std::sync::Arc;

use gpui::*;
use gpui_component::{ActiveTheme, v_flex};
use gpui_tokio_bridge::Tokio;
use parlor_backend::{HttpBackend, create_backend};
use parlor_core::{ChatController, ChatSurface, ClientSettings, ScreenModel};

use crate::chat::events::{
    ChatError, ChatSelected, DraftChanged, ImageChosen, NewChatRequested, Submit,
};
use crate::chat::media::{MediaState, remote_image};
use crate::chat::{ChatSidebar, MessageInput, MessageList, SidebarToggleClicked};

/// Parent coordinator for sidebar, message list and composer.
///
/// Controller operations run on the tokio bridge and write into the shared
/// `ScreenModel`; every model revision is copied into the child views.
pub struct ChatView {
    sidebar: Entity<ChatSidebar>,
    message_list: Entity<MessageList>,
    message_input: Entity<MessageInput>,
    screen: Arc<ScreenModel>,
    controller: Option<Arc<ChatController>>,
    backend: Option<Arc<HttpBackend>>,
    _screen_task: Task<()>,
}

impl EventEmitter<SidebarToggleClicked> for ChatView {}
impl EventEmitter<ChatError> for ChatView {}

impl ChatView {
    pub fn new(settings: &ClientSettings, window: &mut Window, cx: &mut Context<Self>) -> Self {
        let sidebar = cx.new(|cx| ChatSidebar::new(window, cx));
        let message_list = cx.new(MessageList::new);
        let message_input = cx.new(|cx| MessageInput::new(window, cx));
        let screen = Arc::new(ScreenModel::new());

        let (controller, backend) = match create_backend(&settings.backend_config()) {
            Ok(backend) => {
                let controller = ChatController::new(backend.clone(), screen.clone());
                (Some(Arc::new(controller)), Some(backend))
            }
            Err(error) => {
                tracing::error!(stage = error.stage(), "cannot create backend: {error}");
                screen.report_error(format!(
                    "Backend is not configured: {error}. Check backend_url in settings."
                ));
                (None, None)
            }
        };

        let mut revisions = screen.subscribe();
        let screen_task = cx.spawn_in(window, async move |this, cx| {
            while revisions.changed().await.is_ok() {
                let synced = this.update_in(cx, |this, window, cx| this.sync_screen(window, cx));
                if synced.is_err() {
                    break;
                }
            }
        });

        cx.subscribe(&sidebar, |this, _, event: &ChatSelected, cx| {
            let chat = event.chat.clone();
            this.run(move |controller| async move { controller.switch_chat(chat).await }, cx);
        })
        .detach();

        cx.subscribe(&sidebar, |this, _, _event: &NewChatRequested, cx| {
            this.new_chat(cx);
        })
        .detach();

        cx.subscribe(&sidebar, |_, _, _event: &SidebarToggleClicked, cx| {
            cx.emit(SidebarToggleClicked);
        })
        .detach();

        cx.subscribe(&message_input, |this, _, event: &DraftChanged, _cx| {
            this.screen.set_draft_text(event.text.clone());
        })
        .detach();

        cx.subscribe(&message_input, |this, _, _event: &Submit, cx| {
            this.run(|controller| async move { controller.send_message().await }, cx);
        })
        .detach();

        cx.subscribe(&message_input, |this, _, event: &ImageChosen, cx| {
            let path = event.path.clone();
            this.run(move |controller| async move { controller.choose_image(path).await }, cx);
        })
        .detach();

        // Deferred so the shell has subscribed before startup errors are emitted.
        cx.defer_in(window, |this, window, cx| {
            this.sync_screen(window, cx);
            this.run(|controller| async move { controller.start().await }, cx);
        });

        Self {
            sidebar,
            message_list,
            message_input,
            screen,
            controller,
            backend,
            _screen_task: screen_task,
        }
    }

    pub fn sidebar(&self) -> &Entity<ChatSidebar> {
        &self.sidebar
    }

    /// Base URL shown in the title bar.
    pub fn backend_label(&self) -> SharedString {
        match &self.backend {
            Some(backend) => backend.base_url().as_str().trim_end_matches('/').to_string().into(),
            None => "backend unavailable".into(),
        }
    }

    pub fn new_chat(&mut self, cx: &mut Context<Self>) {
        self.run(|controller| async move { controller.new_chat().await }, cx);
    }

    fn run<Fut>(
        &self,
        operation: impl FnOnce(Arc<ChatController>) -> Fut,
        cx: &mut Context<Self>,
    ) where
        Fut: Future<Output = ()> + Send + 'static,
    {
        let Some(controller) = self.controller.clone() else {
            tracing::warn!("ignoring chat action because the backend is unavailable");
            self.screen
                .report_error("Backend is not configured.".to_string());
            return;
        };

        Tokio::spawn(cx, operation(controller)).detach();
    }

    fn sync_screen(&mut self, window: &mut Window, cx: &mut Context<Self>) {
        let snapshot = self.screen.snapshot();

        self.sidebar.update(cx, |sidebar, cx| {
            sidebar.set_entries(snapshot.chat_list.clone(), cx);
        });

        let unrequested_media = self.message_list.update(cx, |list, cx| {
            list.set_blocks(snapshot.blocks.clone(), snapshot.scroll_requests, cx);
            list.take_unrequested_media()
        });
        for raw in unrequested_media {
            self.load_media(raw, cx);
        }

        self.message_input.update(cx, |input, cx| {
            input.sync_composer(&snapshot.composer, window, cx);
        });

        for message in self.screen.take_errors() {
            cx.emit(ChatError { message });
        }
    }

    fn load_media(&mut self, raw: String, cx: &mut Context<Self>) {
        let Some(backend) = self.backend.clone() else {
            return;
        };

        let fetch = Tokio::spawn(cx, {
            let raw = raw.clone();
            async move { backend.fetch_media(&raw).await }
        });
        let message_list = self.message_list.clone();

        cx.spawn(async move |_this, cx| {
            let state = match fetch.await {
                Ok(Ok(media)) => match remote_image(&raw, media) {
                    Some(image) => MediaState::Ready(image),
                    None => {
                        tracing::warn!(raw = %raw, "unsupported image format");
                        MediaState::Failed
                    }
                },
                Ok(Err(error)) => {
                    tracing::warn!(raw = %raw, stage = error.stage(), "failed to load image: {error}");
                    MediaState::Failed
                }
                Err(error) => {
                    tracing::warn!(raw = %raw, "image task failed: {error}");
                    MediaState::Failed
                }
            };

            let _ = message_list.update(cx, |list, cx| list.set_media(raw, state, cx));
        })
        .detach();
    }
}

impl Render for ChatView {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let theme = cx.theme();

        v_flex()
            .id("chat-view")
            .relative()
            .size_full()
            .min_h_0()
            .overflow_hidden()
            .bg(theme.background)
            .child(
                div()
                    .id("chat-view-message-list")
                    .flex_1()
                    .min_h_0()
                    .child(self.message_list.clone()),
            )
            .child(
                div()
                    .id("chat-view-message-input")
                    .flex_shrink_0()
                    .w_full()
                    .border_t_1()
                    .border_color(theme.border)
                    .child(self.message_input.clone()),
            )
    }
}
