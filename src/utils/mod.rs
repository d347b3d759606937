//! Utility functions and helpers.

pub mod http;

use url::Url;

use crate::error::Result;

/// Build the one-click removal link sent inside a notification.
pub fn revocation_link(public_url: &str, token: &str, target_url: &str) -> Result<String> {
    let mut base = Url::parse(public_url)?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    let mut link = base.join("delete")?;
    link.query_pairs_mut()
        .append_pair("otp", token)
        .append_pair("url", target_url);
    Ok(link.to_string())
}

/// Escape text for interpolation into an HTML page.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revocation_link_encodes_target() {
        let link = revocation_link(
            "http://localhost:3000",
            "a1b2c3",
            "https://testflight.apple.com/join/AbC?x=1&y=2",
        )
        .unwrap();

        assert_eq!(
            link,
            "http://localhost:3000/delete?otp=a1b2c3&url=https%3A%2F%2Ftestflight.apple.com%2Fjoin%2FAbC%3Fx%3D1%26y%3D2"
        );
    }

    #[test]
    fn test_revocation_link_round_trips_through_query() {
        let target = "https://testflight.apple.com/join/AbC123";
        let link = revocation_link("https://watch.example.com/", "ffffff", target).unwrap();
        let parsed = Url::parse(&link).unwrap();

        let url = parsed
            .query_pairs()
            .find(|(k, _)| k == "url")
            .map(|(_, v)| v.into_owned());
        assert_eq!(url.as_deref(), Some(target));
    }

    #[test]
    fn test_revocation_link_keeps_base_path() {
        let link = revocation_link("https://example.com/watcher", "abcdef", "https://a").unwrap();
        assert!(link.starts_with("https://example.com/watcher/delete?otp=abcdef&"));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("<a href=\"x\">'&'</a>"),
            "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;"
        );
    }
}
