use std::path::{Path, PathBuf};
use std::sync::Arc;

use parlor_backend::{
    ChatBackend, ChatName, ChatSummary, HistoryEntry, ImageUpload, SendRequest, Sender,
    image_mime_type,
};
use snafu::{OptionExt, ResultExt};

use crate::error::{
    BackendSnafu, ControllerError, ControllerResult, ReadImageSnafu, UnsupportedImageSnafu,
};
use crate::message::{ImageRef, InlineImage, MessageStatus, NewBlock};
use crate::screen::{ChatListEntry, ChatSurface};
use crate::session::{ChatSession, ListSeq, ViewTicket};

/// Bot text shown when `/get` answers without a response.
pub const NO_RESPONSE_PLACEHOLDER: &str = "(no response)";

/// Drives the chat view: every operation is a backend round trip followed by
/// a render on the surface.
///
/// Operations never return errors. Failures are logged and reported to the
/// surface, and optimistic changes are compensated where possible.
pub struct ChatController {
    backend: Arc<dyn ChatBackend>,
    surface: Arc<dyn ChatSurface>,
    session: ChatSession,
}

impl ChatController {
    pub fn new(backend: Arc<dyn ChatBackend>, surface: Arc<dyn ChatSurface>) -> Self {
        Self {
            backend,
            surface,
            session: ChatSession::new(),
        }
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    pub fn current_chat(&self) -> Option<ChatName> {
        self.session.current()
    }

    /// Fetches the chat list once, shows it and opens the first chat.
    pub async fn start(&self) {
        if let Err(error) = self.try_start().await {
            self.report("startup", error);
        }
    }

    async fn try_start(&self) -> ControllerResult<()> {
        let seq = self.session.begin_list();
        let chats = self.backend.list_chats().await.context(BackendSnafu {
            stage: "startup-list-chats",
            action: "loading chats",
        })?;

        let Some(first) = chats.first().map(|chat| chat.name.clone()) else {
            tracing::info!("backend has no chats yet");
            self.apply_chat_list(seq, chats);
            return Ok(());
        };

        let ticket = self.session.begin_view();
        self.session.set_current(Some(first.clone()));
        self.apply_chat_list(seq, chats);
        tracing::info!(chat = %first, "opening first chat");

        self.load_history(&first, ticket).await.map(|_| ())
    }

    pub async fn list_chats(&self) {
        let seq = self.session.begin_list();
        let result = self.backend.list_chats().await.context(BackendSnafu {
            stage: "list-chats",
            action: "loading chats",
        });

        match result {
            Ok(chats) => self.apply_chat_list(seq, chats),
            Err(error) => self.report("list chats", error),
        }
    }

    /// Makes `name` current right away, then loads and renders its history.
    ///
    /// On failure the previous chat is restored unless a newer switch has
    /// already replaced the view.
    pub async fn switch_chat(&self, name: ChatName) {
        let ticket = self.session.begin_view();
        let previous = self.session.replace_current(name.clone());
        tracing::info!(chat = %name, "switching chat");

        match self.load_history(&name, ticket).await {
            Ok(true) => self.list_chats().await,
            Ok(false) => {}
            Err(error) => {
                if self.session.is_current_view(ticket) {
                    self.session.set_current(previous);
                }
                self.report("switch chat", error);
            }
        }
    }

    /// Creates a chat and opens it, unless another switch has replaced the
    /// view while the request was in flight.
    pub async fn new_chat(&self) {
        let ticket = self.session.begin_view();
        let result = self.backend.new_chat().await.context(BackendSnafu {
            stage: "new-chat",
            action: "creating chat",
        });

        match result {
            Ok(name) => {
                if self.session.is_current_view(ticket) {
                    self.session.set_current(Some(name.clone()));
                    self.surface.clear_messages();
                    tracing::info!(chat = %name, "created chat");
                } else {
                    tracing::debug!(chat = %name, "created chat after the view moved on, not opening it");
                }
                self.list_chats().await;
            }
            Err(error) => self.report("new chat", error),
        }
    }

    /// Replaces the message view with `messages`, in order, and scrolls to the end.
    pub fn render_messages(&self, messages: &[HistoryEntry]) {
        self.surface.clear_messages();
        for entry in messages {
            self.surface.append_block(NewBlock::from_history(entry));
        }
        self.surface.scroll_to_bottom();
    }

    /// Sends the composer contents.
    ///
    /// The user block appears immediately as pending. An attached image is
    /// uploaded first; if that fails the text is still sent without it.
    pub async fn send_message(&self) {
        let text = self.surface.text_input().trim().to_string();
        let attachment = self.surface.selected_file();
        if text.is_empty() && attachment.is_none() {
            return;
        }

        let ticket = self.session.view_ticket();
        let chat = self.session.current();
        let user_block = self.surface.append_block(NewBlock::message(
            Sender::User,
            text.clone(),
            MessageStatus::Pending,
        ));
        self.surface.scroll_to_bottom();
        self.surface.clear_text_input();

        let mut image_url = None;
        if let Some(path) = attachment {
            match self.upload_attachment(&path).await {
                Ok(Some(url)) => {
                    self.surface
                        .attach_image(user_block, ImageRef::Remote(url.clone()));
                    image_url = Some(url);
                }
                Ok(None) => tracing::warn!(path = ?path, "upload answered without an image url"),
                Err(error) => self.report("image upload", error),
            }
            self.surface.clear_file_input();
        }

        let request = SendRequest {
            msg: text,
            image_url,
            chat,
        };
        let result = self
            .backend
            .send_message(request)
            .await
            .context(BackendSnafu {
                stage: "send-message",
                action: "sending message",
            });

        let response = match result {
            Ok(response) => response,
            Err(error) => {
                self.surface
                    .set_block_status(user_block, MessageStatus::Failed(error.to_string()));
                self.report("send message", error);
                return;
            }
        };

        self.surface.set_block_status(user_block, MessageStatus::Done);

        let view_unchanged = self.session.is_current_view(ticket);
        if view_unchanged {
            let reply = response
                .response
                .filter(|reply| !reply.is_empty())
                .unwrap_or_else(|| NO_RESPONSE_PLACEHOLDER.to_string());
            self.surface
                .append_block(NewBlock::message(Sender::Bot, reply, MessageStatus::Done));
            self.surface.scroll_to_bottom();
        } else {
            tracing::debug!("view changed while waiting for the reply, not rendering it");
        }

        if let Some(chat) = response.chat_name {
            if view_unchanged {
                self.session.set_current(Some(chat));
            }
            self.list_chats().await;
        }
    }

    /// Selects `path` for the next send and shows a local preview of it.
    pub async fn choose_image(&self, path: PathBuf) {
        self.surface.select_file(path.clone());

        match read_inline_image(&path).await {
            Ok(image) => {
                self.surface
                    .append_block(NewBlock::preview(ImageRef::Inline(image)));
                self.surface.scroll_to_bottom();
            }
            Err(error) => self.report("image preview", error),
        }
    }

    /// Loads history for `chat` and renders it if `ticket` is still current.
    async fn load_history(&self, chat: &ChatName, ticket: ViewTicket) -> ControllerResult<bool> {
        let history = self.backend.load_chat(chat).await.context(BackendSnafu {
            stage: "load-chat",
            action: "loading chat history",
        })?;

        if !self.session.is_current_view(ticket) {
            tracing::debug!(chat = %chat, "discarding history of a superseded switch");
            return Ok(false);
        }

        self.render_messages(&history);
        Ok(true)
    }

    async fn upload_attachment(&self, path: &Path) -> ControllerResult<Option<String>> {
        let upload = read_image_upload(path).await?;
        tracing::info!(file = %upload.file_name, size = upload.bytes.len(), "uploading image");

        self.backend
            .upload_image(upload)
            .await
            .context(BackendSnafu {
                stage: "upload-image",
                action: "uploading image",
            })
    }

    fn apply_chat_list(&self, seq: ListSeq, chats: Vec<ChatSummary>) {
        if !self.session.commit_list(seq) {
            tracing::debug!(seq = seq.0, "discarding stale chat list");
            return;
        }

        let current = self.session.current();
        let entries = chats
            .iter()
            .map(|chat| ChatListEntry::new(chat, current.as_ref()))
            .collect();
        self.surface.show_chat_list(entries);
    }

    fn report(&self, operation: &'static str, error: ControllerError) {
        tracing::error!(operation, stage = error.stage(), "{error}");
        self.surface.report_error(error.to_string());
    }
}

async fn read_image_upload(path: &Path) -> ControllerResult<ImageUpload> {
    let mime_type = path
        .extension()
        .and_then(|extension| extension.to_str())
        .and_then(image_mime_type)
        .context(UnsupportedImageSnafu {
            stage: "image-extension",
            path: path.to_path_buf(),
        })?;

    let bytes = tokio::fs::read(path).await.context(ReadImageSnafu {
        stage: "read-image",
        path: path.to_path_buf(),
    })?;

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());

    Ok(ImageUpload {
        file_name,
        mime_type,
        bytes,
    })
}

async fn read_inline_image(path: &Path) -> ControllerResult<InlineImage> {
    let upload = read_image_upload(path).await?;
    Ok(InlineImage::new(upload.mime_type, upload.bytes))
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    use parlor_backend::{BackendError, BackendResult, BoxFuture, SendResponse};
    use tokio::sync::oneshot;

    use super::*;
    use crate::message::BlockKind;
    use crate::screen::ScreenModel;

    #[derive(Default)]
    struct FakeBackend {
        chats: Mutex<Vec<ChatSummary>>,
        histories: Mutex<HashMap<ChatName, Vec<HistoryEntry>>>,
        failing_loads: Mutex<HashSet<ChatName>>,
        load_gates: Mutex<HashMap<ChatName, oneshot::Receiver<()>>>,
        send_gate: Mutex<Option<oneshot::Receiver<()>>>,
        upload_gate: Mutex<Option<oneshot::Receiver<()>>>,
        new_chat_gate: Mutex<Option<oneshot::Receiver<()>>>,
        next_chat: Mutex<Option<ChatName>>,
        upload: Mutex<Option<Result<Option<String>, String>>>,
        reply: Mutex<Option<Result<SendResponse, String>>>,
        calls: Mutex<Vec<String>>,
        sent: Mutex<Vec<SendRequest>>,
        uploads: Mutex<Vec<ImageUpload>>,
    }

    fn fake_error(endpoint: &'static str, message: &str) -> BackendError {
        BackendError::Status {
            stage: "fake-backend",
            endpoint,
            status: 500,
            message: message.to_string(),
        }
    }

    impl FakeBackend {
        fn with_chats(names: &[&str]) -> Self {
            let backend = Self::default();
            *backend.chats.lock().unwrap() = names
                .iter()
                .map(|name| ChatSummary::new(*name, None))
                .collect();
            backend
        }

        fn set_history(&self, chat: &str, history: Vec<HistoryEntry>) {
            self.histories
                .lock()
                .unwrap()
                .insert(chat.into(), history);
        }

        fn set_reply(&self, reply: Result<SendResponse, String>) {
            *self.reply.lock().unwrap() = Some(reply);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    impl ChatBackend for FakeBackend {
        fn list_chats(&self) -> BoxFuture<'_, BackendResult<Vec<ChatSummary>>> {
            Box::pin(async move {
                self.record("get_chats".to_string());
                Ok(self.chats.lock().unwrap().clone())
            })
        }

        fn load_chat<'a>(
            &'a self,
            chat: &'a ChatName,
        ) -> BoxFuture<'a, BackendResult<Vec<HistoryEntry>>> {
            Box::pin(async move {
                self.record(format!("load_chat {chat}"));
                let gate = self.load_gates.lock().unwrap().remove(chat);
                if let Some(gate) = gate {
                    let _ = gate.await;
                }
                if self.failing_loads.lock().unwrap().contains(chat) {
                    return Err(fake_error("/load_chat", "history unavailable"));
                }
                Ok(self
                    .histories
                    .lock()
                    .unwrap()
                    .get(chat)
                    .cloned()
                    .unwrap_or_default())
            })
        }

        fn new_chat(&self) -> BoxFuture<'_, BackendResult<ChatName>> {
            Box::pin(async move {
                self.record("new_chat".to_string());
                let gate = self.new_chat_gate.lock().unwrap().take();
                if let Some(gate) = gate {
                    let _ = gate.await;
                }
                let name = self
                    .next_chat
                    .lock()
                    .unwrap()
                    .clone()
                    .ok_or_else(|| fake_error("/new_chat", "cannot create chat"))?;
                self.chats
                    .lock()
                    .unwrap()
                    .insert(0, ChatSummary::new(name.as_str(), None));
                Ok(name)
            })
        }

        fn upload_image(
            &self,
            upload: ImageUpload,
        ) -> BoxFuture<'_, BackendResult<Option<String>>> {
            Box::pin(async move {
                self.record("upload_image".to_string());
                self.uploads.lock().unwrap().push(upload);
                let gate = self.upload_gate.lock().unwrap().take();
                if let Some(gate) = gate {
                    let _ = gate.await;
                }
                match self.upload.lock().unwrap().clone() {
                    Some(Ok(image_url)) => Ok(image_url),
                    Some(Err(message)) => Err(fake_error("/upload_image", &message)),
                    None => Ok(None),
                }
            })
        }

        fn send_message(
            &self,
            request: SendRequest,
        ) -> BoxFuture<'_, BackendResult<SendResponse>> {
            Box::pin(async move {
                self.record("get".to_string());
                self.sent.lock().unwrap().push(request);
                let gate = self.send_gate.lock().unwrap().take();
                if let Some(gate) = gate {
                    let _ = gate.await;
                }
                match self.reply.lock().unwrap().clone() {
                    Some(Ok(response)) => Ok(response),
                    Some(Err(message)) => Err(fake_error("/get", &message)),
                    None => Ok(SendResponse::default()),
                }
            })
        }
    }

    fn setup(backend: FakeBackend) -> (Arc<FakeBackend>, Arc<ScreenModel>, ChatController) {
        let backend = Arc::new(backend);
        let screen = Arc::new(ScreenModel::new());
        let controller = ChatController::new(backend.clone(), screen.clone());
        (backend, screen, controller)
    }

    fn reply(text: &str) -> SendResponse {
        SendResponse {
            response: Some(text.to_string()),
            chat_name: None,
        }
    }

    fn write_image(dir: &tempfile::TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, [0x89, b'P', b'N', b'G']).unwrap();
        path
    }

    #[tokio::test]
    async fn list_marks_only_the_current_chat_active() {
        let (_backend, screen, controller) =
            setup(FakeBackend::with_chats(&["chat_3", "chat_2", "chat_1"]));

        controller.list_chats().await;
        let snapshot = screen.snapshot();
        assert_eq!(snapshot.chat_list.len(), 3);
        assert!(snapshot.chat_list.iter().all(|entry| !entry.active));

        controller.session().set_current(Some("chat_2".into()));
        controller.list_chats().await;
        let snapshot = screen.snapshot();
        let active = snapshot
            .chat_list
            .iter()
            .filter(|entry| entry.active)
            .map(|entry| entry.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(active, vec!["chat_2"]);

        controller.session().set_current(Some("missing".into()));
        controller.list_chats().await;
        assert!(screen.snapshot().active_chat().is_none());
    }

    #[tokio::test]
    async fn startup_fetches_the_list_once_and_opens_first_chat() {
        let backend = FakeBackend::with_chats(&["chat_2", "chat_1"]);
        backend.set_history("chat_2", vec![HistoryEntry::new(Sender::User, "earlier")]);
        let (backend, screen, controller) = setup(backend);

        controller.start().await;

        assert_eq!(backend.calls(), vec!["get_chats", "load_chat chat_2"]);
        assert_eq!(controller.current_chat(), Some("chat_2".into()));
        let snapshot = screen.snapshot();
        assert_eq!(
            snapshot.active_chat().map(|entry| entry.name.as_str()),
            Some("chat_2")
        );
        assert_eq!(snapshot.blocks.len(), 1);
        assert_eq!(snapshot.blocks[0].lines, vec!["earlier"]);
    }

    #[tokio::test]
    async fn startup_with_no_chats_leaves_current_unset() {
        let (backend, screen, controller) = setup(FakeBackend::default());

        controller.start().await;

        assert_eq!(backend.calls(), vec!["get_chats"]);
        assert_eq!(controller.current_chat(), None);
        assert!(screen.snapshot().chat_list.is_empty());
    }

    #[tokio::test]
    async fn switch_renders_history_and_highlights_chat() {
        let backend = FakeBackend::with_chats(&["a", "b"]);
        backend.set_history(
            "b",
            vec![
                HistoryEntry::new(Sender::User, "question").with_image("/uploads/x.png"),
                HistoryEntry::new(Sender::Bot, "line one\nline two"),
            ],
        );
        let (backend, screen, controller) = setup(backend);

        controller.switch_chat("b".into()).await;

        assert_eq!(backend.calls(), vec!["load_chat b", "get_chats"]);
        let snapshot = screen.snapshot();
        assert_eq!(
            snapshot.active_chat().map(|entry| entry.name.as_str()),
            Some("b")
        );
        assert_eq!(snapshot.blocks.len(), 2);
        assert_eq!(
            snapshot.blocks[0].images,
            vec![ImageRef::Remote("/uploads/x.png".to_string())]
        );
        assert_eq!(snapshot.blocks[1].label(), Some("Bot"));
        assert_eq!(snapshot.blocks[1].lines, vec!["line one", "line two"]);
        assert!(snapshot.scroll_requests > 0);
    }

    #[tokio::test]
    async fn late_response_of_an_earlier_switch_is_discarded() {
        let backend = FakeBackend::with_chats(&["a", "b"]);
        backend.set_history("a", vec![HistoryEntry::new(Sender::User, "from a")]);
        backend.set_history("b", vec![HistoryEntry::new(Sender::User, "from b")]);
        let (release_a, gate_a) = oneshot::channel();
        backend
            .load_gates
            .lock()
            .unwrap()
            .insert("a".into(), gate_a);
        let (_backend, screen, controller) = setup(backend);

        let switch_a = controller.switch_chat("a".into());
        let switch_b = async {
            controller.switch_chat("b".into()).await;
            let _ = release_a.send(());
        };
        tokio::join!(switch_a, switch_b);

        assert_eq!(controller.current_chat(), Some("b".into()));
        let snapshot = screen.snapshot();
        assert_eq!(snapshot.blocks.len(), 1);
        assert_eq!(snapshot.blocks[0].lines, vec!["from b"]);
        assert_eq!(
            snapshot.active_chat().map(|entry| entry.name.as_str()),
            Some("b")
        );
    }

    #[tokio::test]
    async fn switch_during_upload_keeps_message_in_original_chat() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FakeBackend::with_chats(&["a", "b"]);
        backend.set_history("b", vec![HistoryEntry::new(Sender::User, "from b")]);
        *backend.upload.lock().unwrap() = Some(Ok(Some("/uploads/1_cat.png".to_string())));
        backend.set_reply(Ok(reply("for a")));
        let (release_upload, upload_gate) = oneshot::channel();
        *backend.upload_gate.lock().unwrap() = Some(upload_gate);
        let (backend, screen, controller) = setup(backend);

        controller.switch_chat("a".into()).await;
        screen.select_file(write_image(&dir, "cat.png"));
        screen.set_draft_text("look");

        let send = controller.send_message();
        let switch = async {
            controller.switch_chat("b".into()).await;
            let _ = release_upload.send(());
        };
        tokio::join!(send, switch);

        let sent = backend.sent.lock().unwrap().clone();
        assert_eq!(sent[0].chat, Some("a".into()));
        assert_eq!(sent[0].image_url.as_deref(), Some("/uploads/1_cat.png"));

        assert_eq!(controller.current_chat(), Some("b".into()));
        let snapshot = screen.snapshot();
        assert_eq!(snapshot.blocks.len(), 1);
        assert_eq!(snapshot.blocks[0].lines, vec!["from b"]);
    }

    #[tokio::test]
    async fn late_new_chat_does_not_replace_a_newer_switch() {
        let backend = FakeBackend::with_chats(&["a", "b"]);
        backend.set_history("b", vec![HistoryEntry::new(Sender::User, "from b")]);
        *backend.next_chat.lock().unwrap() = Some("fresh".into());
        let (release_create, create_gate) = oneshot::channel();
        *backend.new_chat_gate.lock().unwrap() = Some(create_gate);
        let (backend, screen, controller) = setup(backend);

        let create = controller.new_chat();
        let switch = async {
            controller.switch_chat("b".into()).await;
            let _ = release_create.send(());
        };
        tokio::join!(create, switch);

        assert_eq!(controller.current_chat(), Some("b".into()));
        let snapshot = screen.snapshot();
        assert_eq!(snapshot.blocks.len(), 1);
        assert_eq!(snapshot.blocks[0].lines, vec!["from b"]);
        assert_eq!(
            snapshot.active_chat().map(|entry| entry.name.as_str()),
            Some("b")
        );
        assert!(snapshot.chat_list.iter().any(|entry| entry.name.as_str() == "fresh"));
        assert!(backend.calls().contains(&"new_chat".to_string()));
    }

    #[tokio::test]
    async fn failed_switch_rolls_back_current_chat() {
        let backend = FakeBackend::with_chats(&["a", "b"]);
        backend.set_history("a", vec![HistoryEntry::new(Sender::Bot, "still here")]);
        backend.failing_loads.lock().unwrap().insert("b".into());
        let (_backend, screen, controller) = setup(backend);

        controller.switch_chat("a".into()).await;
        controller.switch_chat("b".into()).await;

        assert_eq!(controller.current_chat(), Some("a".into()));
        assert_eq!(screen.snapshot().blocks[0].lines, vec!["still here"]);
        let errors = screen.take_errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("history unavailable"));
    }

    #[tokio::test]
    async fn new_chat_adopts_server_name_and_clears_view() {
        let backend = FakeBackend::with_chats(&["old"]);
        backend.set_history("old", vec![HistoryEntry::new(Sender::User, "hi")]);
        *backend.next_chat.lock().unwrap() = Some("fresh".into());
        let (_backend, screen, controller) = setup(backend);

        controller.switch_chat("old".into()).await;
        controller.new_chat().await;

        assert_eq!(controller.current_chat(), Some("fresh".into()));
        let snapshot = screen.snapshot();
        assert!(snapshot.blocks.is_empty());
        assert_eq!(snapshot.chat_list.len(), 2);
        assert_eq!(
            snapshot.active_chat().map(|entry| entry.name.as_str()),
            Some("fresh")
        );
    }

    #[tokio::test]
    async fn failed_new_chat_keeps_state() {
        let (_backend, screen, controller) = setup(FakeBackend::with_chats(&["a"]));
        controller.session().set_current(Some("a".into()));

        controller.new_chat().await;

        assert_eq!(controller.current_chat(), Some("a".into()));
        assert_eq!(screen.take_errors().len(), 1);
    }

    #[tokio::test]
    async fn render_messages_with_empty_list_empties_view() {
        let (_backend, screen, controller) = setup(FakeBackend::default());
        screen.append_block(NewBlock::message(Sender::Bot, "old", MessageStatus::Done));

        controller.render_messages(&[]);

        assert!(screen.snapshot().blocks.is_empty());
    }

    #[tokio::test]
    async fn render_messages_breaks_lines_without_literal_newlines() {
        let (_backend, screen, controller) = setup(FakeBackend::default());

        controller.render_messages(&[HistoryEntry::new(Sender::User, "a\nb")]);

        let blocks = screen.snapshot().blocks;
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].lines, vec!["a", "b"]);
        assert!(blocks[0].lines.iter().all(|line| !line.contains('\n')));
    }

    #[tokio::test]
    async fn empty_send_is_a_no_op() {
        let (backend, screen, controller) = setup(FakeBackend::default());
        screen.set_draft_text("   \n ");
        let before = screen.snapshot();

        controller.send_message().await;

        assert!(backend.calls().is_empty());
        assert_eq!(screen.snapshot(), before);
    }

    #[tokio::test]
    async fn send_appends_user_then_bot_block() {
        let backend = FakeBackend::default();
        backend.set_reply(Ok(reply("hello")));
        let (backend, screen, controller) = setup(backend);
        screen.set_draft_text("  hi ");

        controller.send_message().await;

        let snapshot = screen.snapshot();
        assert_eq!(snapshot.blocks.len(), 2);
        assert_eq!(snapshot.blocks[0].sender, Sender::User);
        assert_eq!(snapshot.blocks[0].lines, vec!["hi"]);
        assert_eq!(snapshot.blocks[0].status, MessageStatus::Done);
        assert_eq!(snapshot.blocks[1].sender, Sender::Bot);
        assert_eq!(snapshot.blocks[1].lines, vec!["hello"]);
        assert_eq!(snapshot.composer.text, "");
        assert_eq!(snapshot.composer.text_clears, 1);

        let sent = backend.sent.lock().unwrap().clone();
        assert_eq!(
            sent,
            vec![SendRequest {
                msg: "hi".to_string(),
                image_url: None,
                chat: None,
            }]
        );
    }

    #[tokio::test]
    async fn missing_reply_uses_placeholder() {
        let (_backend, screen, controller) = setup(FakeBackend::default());
        screen.set_draft_text("anyone?");

        controller.send_message().await;

        let blocks = screen.snapshot().blocks;
        assert_eq!(blocks[1].lines, vec![NO_RESPONSE_PLACEHOLDER]);
    }

    #[tokio::test]
    async fn send_adopts_chat_named_by_backend() {
        let backend = FakeBackend::with_chats(&["chat_1"]);
        backend.set_reply(Ok(SendResponse {
            response: Some("welcome".to_string()),
            chat_name: Some("chat_1".into()),
        }));
        let (backend, screen, controller) = setup(backend);
        screen.set_draft_text("first message");

        controller.send_message().await;

        assert_eq!(controller.current_chat(), Some("chat_1".into()));
        assert_eq!(backend.calls(), vec!["get", "get_chats"]);
        assert_eq!(
            screen.snapshot().active_chat().map(|entry| entry.name.as_str()),
            Some("chat_1")
        );
    }

    #[tokio::test]
    async fn upload_failure_still_sends_text() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FakeBackend::default();
        *backend.upload.lock().unwrap() = Some(Err("disk full".to_string()));
        backend.set_reply(Ok(reply("got it")));
        let (backend, screen, controller) = setup(backend);
        screen.set_draft_text("with picture");
        screen.select_file(write_image(&dir, "cat.png"));

        controller.send_message().await;

        assert_eq!(backend.calls(), vec!["upload_image", "get"]);
        let sent = backend.sent.lock().unwrap().clone();
        assert_eq!(sent[0].msg, "with picture");
        assert_eq!(sent[0].image_url, None);

        let snapshot = screen.snapshot();
        assert_eq!(snapshot.composer.attachment, None);
        assert!(snapshot.blocks[0].images.is_empty());
        assert_eq!(snapshot.blocks[1].lines, vec!["got it"]);
        assert_eq!(screen.take_errors().len(), 1);
    }

    #[tokio::test]
    async fn uploaded_image_is_attached_and_forwarded() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FakeBackend::default();
        *backend.upload.lock().unwrap() = Some(Ok(Some("/uploads/1_cat.png".to_string())));
        backend.set_reply(Ok(reply("nice cat")));
        let (backend, screen, controller) = setup(backend);
        screen.select_file(write_image(&dir, "cat.PNG"));

        controller.send_message().await;

        let uploads = backend.uploads.lock().unwrap().clone();
        assert_eq!(uploads[0].file_name, "cat.PNG");
        assert_eq!(uploads[0].mime_type, "image/png");

        let sent = backend.sent.lock().unwrap().clone();
        assert_eq!(sent[0].msg, "");
        assert_eq!(sent[0].image_url.as_deref(), Some("/uploads/1_cat.png"));

        let blocks = screen.snapshot().blocks;
        assert!(blocks[0].lines.is_empty());
        assert_eq!(
            blocks[0].images,
            vec![ImageRef::Remote("/uploads/1_cat.png".to_string())]
        );
    }

    #[tokio::test]
    async fn unsupported_attachment_is_not_uploaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "plain text").unwrap();
        let backend = FakeBackend::default();
        backend.set_reply(Ok(reply("ok")));
        let (backend, screen, controller) = setup(backend);
        screen.set_draft_text("see attached");
        screen.select_file(path);

        controller.send_message().await;

        assert_eq!(backend.calls(), vec!["get"]);
        assert_eq!(screen.snapshot().composer.attachment, None);
        let errors = screen.take_errors();
        assert!(errors[0].contains("not a supported image"));
    }

    #[tokio::test]
    async fn failed_send_marks_user_block_failed() {
        let backend = FakeBackend::default();
        backend.set_reply(Err("gemini offline".to_string()));
        let (_backend, screen, controller) = setup(backend);
        screen.set_draft_text("hello?");

        controller.send_message().await;

        let blocks = screen.snapshot().blocks;
        assert_eq!(blocks.len(), 1);
        assert!(
            matches!(&blocks[0].status, MessageStatus::Failed(reason) if reason.contains("gemini offline"))
        );
        assert_eq!(screen.take_errors().len(), 1);
    }

    #[tokio::test]
    async fn reply_is_dropped_when_view_moved_on() {
        let backend = FakeBackend::with_chats(&["a", "b"]);
        backend.set_history("b", vec![HistoryEntry::new(Sender::Bot, "from b")]);
        backend.set_reply(Ok(SendResponse {
            response: Some("for a".to_string()),
            chat_name: Some("a".into()),
        }));
        let (release_send, send_gate) = oneshot::channel();
        *backend.send_gate.lock().unwrap() = Some(send_gate);
        let (backend, screen, controller) = setup(backend);
        controller.session().set_current(Some("a".into()));
        screen.set_draft_text("question for a");

        let send = controller.send_message();
        let switch = async {
            controller.switch_chat("b".into()).await;
            let _ = release_send.send(());
        };
        tokio::join!(send, switch);

        assert_eq!(controller.current_chat(), Some("b".into()));
        let sent = backend.sent.lock().unwrap().clone();
        assert_eq!(sent[0].chat, Some("a".into()));

        let snapshot = screen.snapshot();
        assert_eq!(snapshot.blocks.len(), 1);
        assert_eq!(snapshot.blocks[0].lines, vec!["from b"]);
        assert_eq!(
            snapshot.active_chat().map(|entry| entry.name.as_str()),
            Some("b")
        );
    }

    #[tokio::test]
    async fn choosing_an_image_selects_it_and_shows_preview() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_image(&dir, "cat.png");
        let (backend, screen, controller) = setup(FakeBackend::default());

        controller.choose_image(path.clone()).await;

        assert!(backend.calls().is_empty());
        let snapshot = screen.snapshot();
        assert_eq!(snapshot.composer.attachment, Some(path));
        assert_eq!(snapshot.blocks.len(), 1);
        assert_eq!(snapshot.blocks[0].kind, BlockKind::Preview);
        match &snapshot.blocks[0].images[0] {
            ImageRef::Inline(image) => {
                assert_eq!(image.mime_type, "image/png");
                assert!(image.to_data_url().starts_with("data:image/png;base64,"));
            }
            other => panic!("expected inline preview, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn failed_first_switch_restores_no_selection() {
        let backend = FakeBackend::with_chats(&["a"]);
        backend.failing_loads.lock().unwrap().insert("a".into());
        let (backend, screen, controller) = setup(backend);

        controller.switch_chat("a".into()).await;

        assert_eq!(backend.calls(), vec!["load_chat a"]);
        assert_eq!(controller.current_chat(), None);
        assert!(screen.snapshot().chat_list.is_empty());
        assert_eq!(screen.take_errors().len(), 1);
    }
}
