//! Chat widget fragment.
//!
//! The fragment is the HTMX swap target for every widget action, so each
//! form inside it targets `#chat-widget` and replaces it whole.

use crate::config::WidgetConfig;
use crate::markdown::{escape_html, render};
use crate::widget::{ChatWidget, Message, Role};

use super::icons::Icon;

/// Element id of the swap target.
pub const WIDGET_ID: &str = "chat-widget";

const CONTAINER_CLASS: &str = "fixed bottom-4 right-4 z-50";

/// Render the widget. A closed widget renders as an empty container so it can
/// be swapped back in when opened.
#[must_use]
pub fn widget(state: &ChatWidget, config: &WidgetConfig) -> String {
    widget_with_notice(state, config, None)
}

/// Render the widget with a one-off notice above the composer, e.g. a
/// rejected upload.
#[must_use]
pub fn widget_with_notice(
    state: &ChatWidget,
    config: &WidgetConfig,
    notice: Option<&str>,
) -> String {
    if !state.is_open() {
        return format!(r#"<div id="{WIDGET_ID}" class="{CONTAINER_CLASS}"></div>"#);
    }

    format!(
        r#"<div id="{WIDGET_ID}" class="{CONTAINER_CLASS}">
    <div class="bg-white rounded-lg shadow-xl w-96 h-[500px] flex flex-col">
        {header}
        {messages}
        {composer}
    </div>
</div>"#,
        header = header(&config.title),
        messages = message_list(state, &config.greeting),
        composer = composer(state, notice),
    )
}

fn header(title: &str) -> String {
    format!(
        r##"<div class="p-4 border-b flex justify-between items-center">
            <h3 class="font-semibold">{title}</h3>
            <form method="post" action="/widget/close" hx-post="/widget/close" hx-target="#{WIDGET_ID}" hx-swap="outerHTML">
                <button type="submit" class="p-1 hover:bg-gray-100 rounded" aria-label="Close chat">{close}</button>
            </form>
        </div>"##,
        title = escape_html(title),
        close = Icon::Close.svg("h-5 w-5"),
    )
}

fn message_list(state: &ChatWidget, greeting: &str) -> String {
    let body = if state.messages().is_empty() {
        format!(
            r#"<div class="text-center text-gray-500">{}</div>"#,
            escape_html(greeting)
        )
    } else {
        state.messages().iter().map(bubble).collect()
    };

    format!(
        r#"<div class="flex-1 overflow-y-auto p-4 space-y-4" aria-live="polite">
            {body}
            {thinking}
            <div id="chat-end"></div>
        </div>"#,
        thinking = thinking(state.is_loading()),
    )
}

fn bubble(message: &Message) -> String {
    let tone = match message.role() {
        Role::User => "ml-auto bg-blue-500 text-white",
        Role::Assistant => "mr-auto bg-gray-200",
    };
    format!(
        r#"<div class="{tone} rounded-lg p-3 max-w-[80%] break-words" data-role="{role}">{content}</div>"#,
        role = message.role().as_str(),
        content = render(message.content()),
    )
}

/// Loading indicator.
///
/// While a request is in flight server-side the bubble is visible and polls
/// for the finished widget. Otherwise it is an HTMX indicator that only shows
/// during a send.
fn thinking(loading: bool) -> String {
    if loading {
        format!(
            r##"<div class="mr-auto bg-gray-200 rounded-lg p-3" hx-get="/widget" hx-trigger="every 1s" hx-target="#{WIDGET_ID}" hx-swap="outerHTML">Thinking...</div>"##
        )
    } else {
        r#"<div id="chat-thinking" class="mr-auto bg-gray-200 rounded-lg p-3 w-fit">Thinking...</div>"#
            .to_string()
    }
}

fn composer(state: &ChatWidget, notice: Option<&str>) -> String {
    let notice = notice.map_or_else(String::new, |text| {
        format!(
            r#"<div class="mb-2 text-sm text-red-600" role="alert">{}</div>"#,
            escape_html(text)
        )
    });

    let attached = state.attached_image().map_or_else(String::new, |image| {
        format!(
            r##"<div class="mb-2 flex items-center justify-between text-sm text-gray-600">
                <span class="truncate">{name}</span>
                <form method="post" action="/widget/image/remove" hx-post="/widget/image/remove" hx-target="#{WIDGET_ID}" hx-swap="outerHTML">
                    <button type="submit" class="p-1 hover:bg-gray-100 rounded" aria-label="Remove image">{close}</button>
                </form>
            </div>"##,
            name = escape_html(image.name()),
            close = Icon::Close.svg("h-4 w-4"),
        )
    });

    let picker_tone = if state.attached_image().is_some() {
        "text-blue-500"
    } else {
        "text-gray-500"
    };

    let loading = state.is_loading();
    let disabled = if loading { " disabled" } else { "" };
    let send_tone = if loading {
        "text-gray-400 cursor-not-allowed"
    } else {
        "text-blue-500 hover:bg-gray-100"
    };

    format!(
        r##"<div class="p-4 border-t">
            {notice}
            {attached}
            <div class="flex items-center gap-2">
                <form method="post" action="/widget/image" enctype="multipart/form-data" hx-post="/widget/image" hx-encoding="multipart/form-data" hx-trigger="change" hx-target="#{WIDGET_ID}" hx-swap="outerHTML">
                    <label class="p-2 hover:bg-gray-100 rounded cursor-pointer block {picker_tone}" title="Attach image">
                        {image_icon}
                        <input type="file" name="image" accept="image/*" class="hidden">
                    </label>
                    <noscript><button type="submit" class="text-xs text-gray-500">Attach</button></noscript>
                </form>
                <form method="post" action="/widget/send" hx-post="/widget/send" hx-target="#{WIDGET_ID}" hx-swap="outerHTML" hx-indicator="#chat-thinking" hx-disabled-elt="find input, find button" class="flex flex-1 items-center gap-2">
                    <input type="text" name="message" value="{draft}" placeholder="Type your message..." autocomplete="off" class="flex-1 border rounded-lg px-4 py-2 focus:outline-none focus:border-blue-500"{disabled}>
                    <button type="submit" class="p-2 rounded {send_tone}" aria-label="Send message"{disabled}>{send_icon}</button>
                </form>
            </div>
        </div>"##,
        image_icon = Icon::Image.svg("h-5 w-5"),
        draft = escape_html(state.draft()),
        send_icon = Icon::Send.svg("h-5 w-5"),
    )
}
