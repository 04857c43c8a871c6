use std::collections::HashMap;
use std::sync::Arc;

use gpui::prelude::FluentBuilder;
use gpui::*;
use gpui_component::{ActiveTheme, h_flex, v_flex};
use parlor_backend::Sender;
use parlor_core::{BlockId, BlockKind, ImageRef, MessageBlock, MessageStatus};

use crate::chat::media::{MediaState, inline_image};
use crate::chat::scroll_manager::ScrollManager;

const MAX_IMAGE_WIDTH: f32 = 280.0;

/// Renders the message blocks of the current chat.
pub struct MessageList {
    blocks: Vec<MessageBlock>,
    /// Decoded previews keyed by block and image index.
    inline_images: HashMap<(BlockId, usize), Arc<Image>>,
    /// Remote images keyed by the raw URL the backend returned.
    remote_images: HashMap<String, MediaState>,
    scroll_manager: ScrollManager,
    seen_scroll_requests: u64,
}

impl MessageList {
    pub fn new(_cx: &mut Context<Self>) -> Self {
        Self {
            blocks: Vec::new(),
            inline_images: HashMap::new(),
            remote_images: HashMap::new(),
            scroll_manager: ScrollManager::new(),
            seen_scroll_requests: 0,
        }
    }

    pub fn set_blocks(
        &mut self,
        blocks: Vec<MessageBlock>,
        scroll_requests: u64,
        cx: &mut Context<Self>,
    ) {
        let view_replaced = blocks
            .first()
            .zip(self.blocks.first())
            .is_none_or(|(new, old)| new.id != old.id);

        self.inline_images
            .retain(|(id, _), _| blocks.iter().any(|block| block.id == *id));
        for block in &blocks {
            for (index, image) in block.images.iter().enumerate() {
                let ImageRef::Inline(inline) = image else {
                    continue;
                };
                if self.inline_images.contains_key(&(block.id, index)) {
                    continue;
                }
                match inline_image(inline) {
                    Some(decoded) => {
                        self.inline_images.insert((block.id, index), decoded);
                    }
                    None => tracing::warn!(mime_type = inline.mime_type, "cannot display preview"),
                }
            }
        }
        self.blocks = blocks;

        if scroll_requests != self.seen_scroll_requests {
            self.seen_scroll_requests = scroll_requests;
            if view_replaced {
                self.scroll_manager.reset();
            } else {
                self.scroll_manager.request_scroll_to_bottom();
            }
        }
        cx.notify();
    }

    /// Remote image URLs that have not been requested yet; they are marked loading.
    pub fn take_unrequested_media(&mut self) -> Vec<String> {
        let mut requested = Vec::new();
        for block in &self.blocks {
            for image in &block.images {
                let ImageRef::Remote(raw) = image else {
                    continue;
                };
                if !self.remote_images.contains_key(raw) {
                    self.remote_images.insert(raw.clone(), MediaState::Loading);
                    requested.push(raw.clone());
                }
            }
        }
        requested
    }

    pub fn set_media(&mut self, raw: String, state: MediaState, cx: &mut Context<Self>) {
        self.remote_images.insert(raw, state);
        self.scroll_manager.follow_new_content();
        cx.notify();
    }

    fn render_block(&self, block: &MessageBlock, cx: &Context<Self>) -> AnyElement {
        let theme = cx.theme();
        let is_user = block.sender == Sender::User;

        let status = match &block.status {
            MessageStatus::Pending => Some(
                div()
                    .text_xs()
                    .text_color(theme.muted_foreground)
                    .child("Sending...")
                    .into_any_element(),
            ),
            MessageStatus::Failed(reason) => Some(
                div()
                    .text_xs()
                    .text_color(theme.danger)
                    .child(format!("Not sent: {reason}"))
                    .into_any_element(),
            ),
            MessageStatus::Done => None,
        };

        let bubble = v_flex()
            .id(("message-block", block.id.0 as usize))
            .max_w(relative(0.8))
            .gap_1()
            .px_3()
            .py_2()
            .rounded_lg()
            .when(block.kind == BlockKind::Message, |el| {
                el.bg(if is_user { theme.secondary } else { theme.muted })
            })
            .when_some(block.label(), |el, label| {
                el.child(
                    div()
                        .text_xs()
                        .font_weight(FontWeight::SEMIBOLD)
                        .text_color(theme.muted_foreground)
                        .child(label),
                )
            })
            .children(block.lines.iter().map(|line| {
                div()
                    .text_sm()
                    .text_color(theme.foreground)
                    .child(SharedString::from(line.clone()))
            }))
            .children(
                block
                    .images
                    .iter()
                    .enumerate()
                    .map(|(index, image)| self.render_image(block.id, index, image, cx)),
            )
            .children(status);

        h_flex()
            .w_full()
            .when(is_user, |el| el.justify_end())
            .when(!is_user, |el| el.justify_start())
            .child(bubble)
            .into_any_element()
    }

    fn render_image(
        &self,
        block: BlockId,
        index: usize,
        image: &ImageRef,
        cx: &Context<Self>,
    ) -> AnyElement {
        let theme = cx.theme();
        let placeholder = |text: &'static str| {
            div()
                .text_xs()
                .text_color(theme.muted_foreground)
                .child(text)
                .into_any_element()
        };

        let decoded = match image {
            ImageRef::Inline(_) => self.inline_images.get(&(block, index)).cloned(),
            ImageRef::Remote(raw) => match self.remote_images.get(raw) {
                Some(MediaState::Ready(decoded)) => Some(decoded.clone()),
                Some(MediaState::Failed) => return placeholder("[image unavailable]"),
                Some(MediaState::Loading) | None => return placeholder("Loading image..."),
            },
        };

        match decoded {
            Some(decoded) => img(decoded)
                .max_w(px(MAX_IMAGE_WIDTH))
                .rounded_md()
                .into_any_element(),
            None => placeholder("[image unavailable]"),
        }
    }
}

impl Render for MessageList {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        self.scroll_manager.update_follow_state();
        self.scroll_manager.apply_pending_scroll();

        let theme = cx.theme();
        let content = if self.blocks.is_empty() {
            div()
                .size_full()
                .flex()
                .items_center()
                .justify_center()
                .text_sm()
                .text_color(theme.muted_foreground)
                .child("No messages yet")
                .into_any_element()
        } else {
            v_flex()
                .w_full()
                .gap_3()
                .p_4()
                .children(self.blocks.iter().map(|block| self.render_block(block, cx)))
                .into_any_element()
        };

        div()
            .id("message-list")
            .size_full()
            .overflow_y_scroll()
            .track_scroll(self.scroll_manager.handle())
            .child(content)
    }
}
