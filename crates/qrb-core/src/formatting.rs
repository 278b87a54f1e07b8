//! HTML formatting helpers for Telegram replies.

/// Escape HTML special characters for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Wrap text in `<code>` with its content escaped.
pub fn code(text: &str) -> String {
    format!("<code>{}</code>", escape_html(text))
}
