//! Markup rendering.
//!
//! Every function here is a pure mapping from widget state to an HTML
//! string. The page is HTMX-driven: the thread and the composer state are
//! separate fragments so the server can push either one over SSE without
//! touching the text area the user is typing in.

use std::fmt::Write as _;

use crate::config::UiConfig;
use crate::widget::{ChatWidget, ConversationStore, Message};

/// SSE event name carrying the thread fragment.
pub const THREAD_EVENT: &str = "thread";

/// SSE event name carrying the composer fragment.
pub const COMPOSER_EVENT: &str = "composer";

/// Escape text for use in element content and double-quoted attributes.
#[must_use]
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render one message bubble: text, then images, then attachment names.
#[must_use]
pub fn render_message(message: &Message) -> String {
    render_bubble(message, false)
}

fn render_bubble(message: &Message, loading: bool) -> String {
    let mut html = String::new();
    let sender = message.sender.as_str();

    if loading {
        let _ = write!(
            html,
            r#"<div class="msg msg-{sender} msg-loading" aria-busy="true">"#
        );
    } else {
        let _ = write!(html, r#"<div class="msg msg-{sender}">"#);
    }

    if !message.text.is_empty() {
        let _ = write!(
            html,
            r#"<p class="msg-text">{}</p>"#,
            escape_html(&message.text)
        );
    }

    if !message.images.is_empty() {
        html.push_str(r#"<div class="msg-images">"#);
        for (i, uri) in message.images.iter().enumerate() {
            let _ = write!(
                html,
                r#"<img src="{}" alt="Generated image {}" loading="lazy">"#,
                escape_html(uri),
                i + 1
            );
        }
        html.push_str("</div>");
    }

    if !message.files.is_empty() {
        html.push_str(r#"<ul class="msg-files">"#);
        for file in &message.files {
            let _ = write!(html, "<li>{}</li>", escape_html(file.name()));
        }
        html.push_str("</ul>");
    }

    html.push_str("</div>");
    html
}

/// Render the thread, placeholder last.
#[must_use]
pub fn render_thread(conversation: &ConversationStore) -> String {
    let mut html: String = conversation
        .messages()
        .iter()
        .map(render_message)
        .collect();

    if let Some(placeholder) = conversation.pending_placeholder() {
        html.push_str(&render_bubble(placeholder, true));
    }

    html
}

/// Render the drop target, attachment list and send button.
///
/// Inline handlers read the session path from `data-chat`; the id is never
/// spliced into script text.
#[must_use]
pub fn render_composer(session_id: &str, widget: &ChatWidget) -> String {
    let id = escape_html(session_id);
    let mut html = String::new();

    let drop_class = if widget.is_dragging() {
        "drop-zone is-dragging"
    } else {
        "drop-zone"
    };

    let _ = write!(
        html,
        r#"<div class="{drop_class}" data-chat="/chat/{id}" hx-on:dragenter="event.preventDefault(); fetch(this.dataset.chat + '/drag/enter', {{method: 'POST'}})" hx-on:dragover="event.preventDefault()" hx-on:dragleave="fetch(this.dataset.chat + '/drag/leave', {{method: 'POST'}})" hx-on:drop="event.preventDefault(); const data = new FormData(); for (const f of event.dataTransfer.files) {{ data.append('files', f, f.name); }} fetch(this.dataset.chat + '/drop', {{method: 'POST', body: data}})"><label class="file-picker">Attach files<input type="file" name="files" multiple hx-post="/chat/{id}/files" hx-encoding="multipart/form-data" hx-trigger="change" hx-swap="none" hx-on::after-request="this.value = ''"></label><span class="drop-hint">or drop files here</span></div>"#
    );

    let files = widget.composer().files();
    if !files.is_empty() {
        html.push_str(r#"<ul class="attachments">"#);
        for (index, file) in files.iter().enumerate() {
            let _ = write!(
                html,
                r#"<li><span>{}</span><button type="button" class="remove" aria-label="Remove {}" hx-post="/chat/{id}/files/{index}/remove" hx-swap="none">&times;</button></li>"#,
                escape_html(file.name()),
                escape_html(file.name()),
            );
        }
        html.push_str("</ul>");
    }

    if widget.is_busy() {
        html.push_str(r#"<button type="submit" class="send" disabled>Sending&hellip;</button>"#);
    } else {
        html.push_str(r#"<button type="submit" class="send">Send</button>"#);
    }

    html
}

/// Render the whole widget for first page load.
#[must_use]
pub fn render_widget(session_id: &str, widget: &ChatWidget) -> String {
    let id = escape_html(session_id);
    format!(
        r#"<div id="chat-widget" class="chat-widget" hx-ext="sse" sse-connect="/chat/{id}/events">
    <div id="thread" class="thread" sse-swap="{THREAD_EVENT}" aria-live="polite">{thread}</div>
    <form class="composer" hx-post="/chat/{id}/send" hx-swap="none" hx-on::after-request="if (event.detail.elt === this && event.detail.successful) {{ this.querySelector('textarea').value = ''; }}">
        <textarea name="input" rows="2" placeholder="Type your message..." hx-post="/chat/{id}/text" hx-trigger="input changed delay:300ms" hx-swap="none">{text}</textarea>
        <div id="composer-state" class="composer-state" sse-swap="{COMPOSER_EVENT}">{composer}</div>
    </form>
</div>"#,
        thread = render_thread(widget.conversation()),
        text = escape_html(widget.composer().text()),
        composer = render_composer(session_id, widget),
    )
}

/// Wrap content in the HTML document.
#[must_use]
pub fn html_shell(ui: &UiConfig, content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{title}</title>
    <script src="{htmx}"></script>
    <script src="{sse}"></script>
    <style>
        body {{ margin: 0; font-family: system-ui, sans-serif; background: #f5f5f7; }}
        .chat-widget {{ display: flex; flex-direction: column; height: 100vh; max-width: 48rem; margin: 0 auto; }}
        .thread {{ flex: 1; overflow-y: auto; padding: 1rem; display: flex; flex-direction: column; gap: .5rem; }}
        .msg {{ max-width: 80%; padding: .6rem .9rem; border-radius: .8rem; }}
        .msg-user {{ align-self: flex-end; background: #0b5cff; color: #fff; }}
        .msg-agent {{ align-self: flex-start; background: #fff; color: #111; }}
        .msg-loading {{ opacity: .6; font-style: italic; }}
        .msg-text {{ margin: 0; white-space: pre-wrap; }}
        .msg-images img {{ max-width: 100%; margin-top: .5rem; display: block; }}
        .msg-files {{ margin: .4rem 0 0; padding-left: 1rem; font-size: .85em; }}
        .composer {{ padding: 1rem; background: #fff; display: flex; flex-direction: column; gap: .5rem; }}
        .composer textarea {{ resize: vertical; padding: .5rem; font: inherit; }}
        .drop-zone {{ border: 2px dashed #ccc; border-radius: .5rem; padding: .5rem; display: flex; gap: .5rem; align-items: center; }}
        .drop-zone.is-dragging {{ border-color: #0b5cff; background: #eef3ff; }}
        .file-picker input {{ display: none; }}
        .file-picker {{ cursor: pointer; color: #0b5cff; }}
        .attachments {{ list-style: none; margin: 0; padding: 0; display: flex; flex-wrap: wrap; gap: .4rem; }}
        .attachments li {{ background: #eee; border-radius: .4rem; padding: .2rem .5rem; }}
        .remove {{ border: none; background: none; cursor: pointer; }}
        .send {{ align-self: flex-end; padding: .5rem 1.2rem; }}
    </style>
</head>
<body>
{content}
</body>
</html>"#,
        title = escape_html(&ui.title),
        htmx = escape_html(&ui.htmx_src),
        sse = escape_html(&ui.htmx_sse_src),
    )
}
