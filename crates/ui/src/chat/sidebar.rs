use std::rc::Rc;

use gpui::*;
use gpui_component::{
    ActiveTheme, IconName, Sizable, VirtualListScrollHandle,
    button::{Button, ButtonVariants},
    h_flex,
    input::{Input, InputEvent, InputState},
    label::Label,
    list::ListItem,
    v_flex, v_virtual_list,
};
use parlor_core::ChatListEntry;

use crate::chat::events::{ChatSelected, NewChatRequested};

const CHAT_ROW_HEIGHT: f32 = 40.0;

/// Chat list with a local title filter.
pub struct ChatSidebar {
    search_input: Entity<InputState>,
    search_query: String,
    entries: Vec<ChatListEntry>,
    visible: Vec<ChatListEntry>,
    item_sizes: Rc<Vec<Size<Pixels>>>,
    scroll_handle: VirtualListScrollHandle,
}

impl EventEmitter<ChatSelected> for ChatSidebar {}
impl EventEmitter<NewChatRequested> for ChatSidebar {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SidebarToggleClicked;

impl EventEmitter<SidebarToggleClicked> for ChatSidebar {}

impl ChatSidebar {
    pub fn new(window: &mut Window, cx: &mut Context<Self>) -> Self {
        let search_input = cx.new(|cx| InputState::new(window, cx).placeholder("Search chats..."));

        cx.subscribe_in(
            &search_input,
            window,
            |this, _, _event: &InputEvent, _window, cx| {
                this.search_query = this.search_input.read(cx).value().to_string();
                this.rebuild_visible();
                cx.notify();
            },
        )
        .detach();

        Self {
            search_input,
            search_query: String::new(),
            entries: Vec::new(),
            visible: Vec::new(),
            item_sizes: Rc::new(Vec::new()),
            scroll_handle: VirtualListScrollHandle::new(),
        }
    }

    pub fn set_entries(&mut self, entries: Vec<ChatListEntry>, cx: &mut Context<Self>) {
        if self.entries == entries {
            return;
        }

        self.entries = entries;
        self.rebuild_visible();
        cx.notify();
    }

    fn rebuild_visible(&mut self) {
        self.visible = filter_entries(&self.entries, &self.search_query);
        self.item_sizes = Rc::new(
            self.visible
                .iter()
                .map(|_| size(px(0.), px(CHAT_ROW_HEIGHT)))
                .collect(),
        );
    }

    fn render_toolbar(&mut self, cx: &mut Context<Self>) -> impl IntoElement {
        h_flex()
            .w_full()
            .min_w_0()
            .gap_2()
            .px_3()
            .pt(px(8.))
            .pb_2()
            .child(Input::new(&self.search_input).w_full().small())
            .child(
                Button::new("new")
                    .small()
                    .primary()
                    .icon(IconName::Plus)
                    .child("New")
                    .on_click(cx.listener(|_, _, _window, cx| {
                        cx.emit(NewChatRequested);
                    })),
            )
    }

    fn render_empty_state(&mut self, cx: &mut Context<Self>) -> AnyElement {
        let theme = cx.theme();
        let message = if self.entries.is_empty() {
            "No chats yet"
        } else {
            "No chats match your search"
        };

        v_flex()
            .flex_1()
            .items_center()
            .justify_center()
            .px_4()
            .child(
                Label::new(message)
                    .text_sm()
                    .text_color(theme.foreground.opacity(0.55)),
            )
            .into_any_element()
    }

    fn render_chat_list(&mut self, cx: &mut Context<Self>) -> AnyElement {
        if self.visible.is_empty() {
            return self.render_empty_state(cx);
        }

        let item_sizes = self.item_sizes.clone();
        let items = self.visible.clone();

        v_flex()
            .flex_1()
            .min_h_0()
            .child(
                v_virtual_list(
                    cx.entity().clone(),
                    "chat-list",
                    item_sizes,
                    move |_this, visible_range, _scroll_handle, cx| {
                        visible_range
                            .map(|index| {
                                let entry = &items[index];
                                let chat = entry.name.clone();

                                div()
                                    .w_full()
                                    .h(px(CHAT_ROW_HEIGHT))
                                    .px_2()
                                    .child(
                                        ListItem::new(("chat", index))
                                            .w_full()
                                            .h_full()
                                            .px_3()
                                            .py_2()
                                            .rounded_md()
                                            .selected(entry.active)
                                            .on_click(cx.listener(
                                                move |_this, _event: &ClickEvent, _window, cx| {
                                                    cx.emit(ChatSelected { chat: chat.clone() });
                                                },
                                            ))
                                            .child(
                                                h_flex().w_full().items_center().child(
                                                    div().flex_1().min_w_0().truncate().child(
                                                        Label::new(entry.title.clone()).text_sm(),
                                                    ),
                                                ),
                                            ),
                                    )
                                    .into_any_element()
                            })
                            .collect()
                    },
                )
                .w_full()
                .flex_1()
                .track_scroll(&self.scroll_handle),
            )
            .into_any_element()
    }

    fn render_footer(&mut self, cx: &mut Context<Self>) -> impl IntoElement {
        let theme = cx.theme();

        h_flex()
            .w_full()
            .min_w_0()
            .items_center()
            .justify_end()
            .px_3()
            .py_2()
            .border_t_1()
            .border_color(theme.border)
            .child(
                Button::new("sidebar-toggle")
                    .ghost()
                    .small()
                    .icon(IconName::PanelLeftClose)
                    .on_click(cx.listener(|_, _, _, cx| {
                        cx.emit(SidebarToggleClicked);
                    })),
            )
    }
}

impl Render for ChatSidebar {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let theme = cx.theme();

        v_flex()
            .size_full()
            .min_w_0()
            .overflow_hidden()
            .bg(theme.background)
            .child(self.render_toolbar(cx))
            .child(self.render_chat_list(cx))
            .child(self.render_footer(cx))
    }
}

/// Entries whose title or name contains `query`, ignoring case.
fn filter_entries(entries: &[ChatListEntry], query: &str) -> Vec<ChatListEntry> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return entries.to_vec();
    }

    entries
        .iter()
        .filter(|entry| {
            entry.title.to_lowercase().contains(&query)
                || entry.name.as_str().to_lowercase().contains(&query)
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use parlor_backend::ChatSummary;

    use super::*;

    fn entries() -> Vec<ChatListEntry> {
        vec![
            ChatListEntry::new(&ChatSummary::new("chat_2.txt", Some("Trip to Lisbon")), None),
            ChatListEntry::new(&ChatSummary::new("chat_1.txt", None), None),
            ChatListEntry::new(&ChatSummary::new("chat_3.txt", Some("Погода на завтра")), None),
        ]
    }

    #[test]
    fn blank_query_keeps_everything_in_order() {
        assert_eq!(filter_entries(&entries(), "  "), entries());
    }

    #[test]
    fn query_matches_title_or_name() {
        let by_title = filter_entries(&entries(), "lisbon");
        assert_eq!(by_title.len(), 1);
        assert_eq!(by_title[0].name.as_str(), "chat_2.txt");

        let by_name = filter_entries(&entries(), "CHAT_1");
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].title, "chat_1.txt");

        let by_cyrillic_title = filter_entries(&entries(), "ПОГОДА");
        assert_eq!(by_cyrillic_title.len(), 1);
        assert_eq!(by_cyrillic_title[0].name.as_str(), "chat_3.txt");
    }
}
