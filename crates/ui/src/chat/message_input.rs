use std::path::PathBuf;

use gpui::prelude::FluentBuilder;
use gpui::*;
use gpui_component::{
    ActiveTheme, IconName, Sizable,
    button::{Button, ButtonVariants},
    h_flex,
    input::{Input, InputEvent, InputState},
    v_flex,
};
use parlor_core::{Composer, is_submit_keystroke};

use crate::chat::events::{DraftChanged, ImageChosen, Submit};

/// Text input, attach button and send button.
///
/// The widget owns the editable text; the screen model gets a mirror of it
/// through `DraftChanged` and decides when it is cleared.
pub struct MessageInput {
    input_state: Entity<InputState>,
    attachment: Option<PathBuf>,
    seen_text_clears: u64,
    mirrored_text: String,
    pending_newline: bool,
}

impl EventEmitter<Submit> for MessageInput {}
impl EventEmitter<ImageChosen> for MessageInput {}
impl EventEmitter<DraftChanged> for MessageInput {}

impl MessageInput {
    pub fn new(window: &mut Window, cx: &mut Context<Self>) -> Self {
        let input_state = cx.new(|cx| {
            InputState::new(window, cx)
                .placeholder("Type your message...")
                .clean_on_escape()
                .auto_grow(3, 10)
        });

        cx.subscribe_in(
            &input_state,
            window,
            |this, _, event: &InputEvent, window, cx| match event {
                InputEvent::PressEnter { secondary } => {
                    if *secondary {
                        this.pending_newline = false;
                        return;
                    }

                    if this.pending_newline {
                        // Shift+Enter inserts a newline manually and then still emits PressEnter.
                        this.pending_newline = false;
                    } else {
                        this.trim_trailing_newline(window, cx);
                        this.mirror_draft(cx);
                        cx.emit(Submit);
                    }
                }
                _ => this.mirror_draft(cx),
            },
        )
        .detach();

        Self {
            input_state,
            attachment: None,
            seen_text_clears: 0,
            mirrored_text: String::new(),
            pending_newline: false,
        }
    }

    /// Follows composer changes made by the controller.
    pub fn sync_composer(&mut self, composer: &Composer, window: &mut Window, cx: &mut Context<Self>) {
        if composer.text_clears != self.seen_text_clears {
            self.seen_text_clears = composer.text_clears;
            self.clear(window, cx);
        }

        if self.attachment != composer.attachment {
            self.attachment = composer.attachment.clone();
            cx.notify();
        }
    }

    fn clear(&mut self, window: &mut Window, cx: &mut Context<Self>) {
        self.input_state.update(cx, |state, cx| {
            state.set_value("", window, cx);
        });
        self.mirrored_text.clear();
        self.pending_newline = false;
    }

    fn mirror_draft(&mut self, cx: &mut Context<Self>) {
        let text = self.input_state.read(cx).value().to_string();
        if text != self.mirrored_text {
            self.mirrored_text = text.clone();
            cx.emit(DraftChanged { text });
        }
    }

    fn handle_shift_enter(&mut self, window: &mut Window, cx: &mut Context<Self>) {
        self.pending_newline = true;
        self.input_state.update(cx, |state, cx| {
            state.insert("\n", window, cx);
        });
        cx.notify();
    }

    fn trim_trailing_newline(&mut self, window: &mut Window, cx: &mut Context<Self>) {
        self.input_state.update(cx, |state, cx| {
            let value = state.value().to_string();
            if let Some(trimmed) = value.strip_suffix('\n') {
                state.set_value(trimmed.to_string(), window, cx);
            }
        });
    }

    fn handle_submit(&mut self, cx: &mut Context<Self>) {
        self.mirror_draft(cx);
        cx.emit(Submit);
    }

    fn pick_image(&mut self, cx: &mut Context<Self>) {
        let paths = cx.prompt_for_paths(PathPromptOptions {
            files: true,
            directories: false,
            multiple: false,
            prompt: Some("Attach image".into()),
        });

        cx.spawn(async move |this, cx| {
            let path = match paths.await {
                Ok(Ok(Some(paths))) => paths.into_iter().next(),
                Ok(Ok(None)) | Err(_) => None,
                Ok(Err(error)) => {
                    tracing::warn!("file picker failed: {error}");
                    None
                }
            };

            if let Some(path) = path {
                let _ = this.update(cx, |_, cx| cx.emit(ImageChosen { path }));
            }
        })
        .detach();
    }
}

impl Render for MessageInput {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let theme = cx.theme();
        let attachment_name = self.attachment.as_ref().map(|path| {
            path.file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string())
        });

        v_flex()
            .bg(theme.background)
            .gap_2()
            .p_3()
            .child(
                div()
                    .w_full()
                    .px_3()
                    .py_2()
                    .rounded_lg()
                    .border_1()
                    .border_color(theme.border)
                    .bg(theme.background)
                    .on_key_down(cx.listener(|this, event: &KeyDownEvent, window, cx| {
                        let keystroke = &event.keystroke;
                        if keystroke.key == "enter"
                            && !is_submit_keystroke(&keystroke.key, keystroke.modifiers.shift)
                        {
                            this.handle_shift_enter(window, cx);
                        }
                    }))
                    .child(Input::new(&self.input_state).w_full()),
            )
            .child(
                h_flex()
                    .w_full()
                    .items_center()
                    .justify_between()
                    .child(
                        h_flex()
                            .gap_2()
                            .items_center()
                            .child(
                                Button::new("attach-image")
                                    .small()
                                    .ghost()
                                    .icon(IconName::Plus)
                                    .child("Image")
                                    .on_click(cx.listener(|this, _, _window, cx| {
                                        this.pick_image(cx);
                                    })),
                            )
                            .when_some(attachment_name, |el, name| {
                                el.child(
                                    div()
                                        .id("attachment-chip")
                                        .px_2()
                                        .py_1()
                                        .rounded_full()
                                        .bg(theme.muted)
                                        .border_1()
                                        .border_color(theme.border)
                                        .text_xs()
                                        .text_color(theme.muted_foreground)
                                        .child(name),
                                )
                            }),
                    )
                    .child(
                        Button::new("send")
                            .small()
                            .primary()
                            .icon(IconName::ArrowUp)
                            .child("Send")
                            .on_click(cx.listener(|this, _, _window, cx| {
                                this.handle_submit(cx);
                            })),
                    ),
            )
    }
}
