//! HTML pages served to whoever opens a link.

use crate::utils::escape_html;

const STYLE: &str = r#"<style>
body { font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", sans-serif; background: #f4f5f7; color: #222; display: flex; align-items: center; justify-content: center; min-height: 100vh; margin: 0; }
.card { background: #fff; border-radius: 12px; box-shadow: 0 4px 24px rgba(0, 0, 0, .08); padding: 2.5rem 3rem; max-width: 32rem; text-align: center; }
.title { font-size: 1.6rem; font-weight: 600; margin-bottom: .75rem; }
.ok .title { color: #1f9d55; }
.err .title { color: #cc1f1a; }
.message { line-height: 1.5; word-break: break-word; }
</style>"#;

fn layout(title: &str, class: &str, heading: &str, message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>TestFlight Watcher | {title}</title>
    {STYLE}
</head>
<body>
    <div class="card {class}">
        <div class="title">{heading}</div>
        <div class="message">{message}</div>
    </div>
</body>
</html>"#
    )
}

pub fn home() -> String {
    layout(
        "Home",
        "",
        "TestFlight Watcher",
        "This service watches TestFlight beta pages and sends a notification when a slot opens up.",
    )
}

pub fn removed(name: &str, url: &str) -> String {
    let name = escape_html(name);
    let url = escape_html(url);
    layout(
        "Removed",
        "ok",
        "Removed",
        &format!("<b>{name}</b> ({url}) is no longer being watched."),
    )
}

pub fn invalid_token() -> String {
    layout(
        "Invalid token",
        "err",
        "Invalid",
        "This link is <b>invalid</b> or has expired.<br>Wait for the next notification to get a fresh one.",
    )
}

pub fn internal_error() -> String {
    layout(
        "Error",
        "err",
        "Something went wrong",
        "The watch list could not be saved. Nothing was removed; please check the server logs.",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removed_page_escapes_input() {
        let page = removed("<script>", "https://x/?a=1&b=\"2\"");
        assert!(page.contains("&lt;script&gt;"));
        assert!(page.contains("a=1&amp;b=&quot;2&quot;"));
        assert!(!page.contains("<script>"));
    }
}
