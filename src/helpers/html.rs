//! HTML helper functions

/// Generate Open Graph meta tags for an article
pub fn open_graph(title: &str, description: &str, url: &str, image: Option<&str>) -> String {
    let mut tags = vec![
        meta_property("og:title", title),
        meta_property("og:description", description),
    ];

    if let Some(img) = image {
        tags.push(meta_property("og:image", img));
    }

    tags.push(meta_property("og:type", "article"));

    if !url.is_empty() {
        tags.push(meta_property("og:url", url));
    }

    tags.join("\n")
}

/// Generate Twitter card meta tags
pub fn twitter_card(title: &str, description: &str, image: Option<&str>) -> String {
    let mut tags = vec![
        meta_name("twitter:card", "summary_large_image"),
        meta_name("twitter:title", title),
        meta_name("twitter:description", description),
    ];

    if let Some(img) = image {
        tags.push(meta_name("twitter:image", img));
    }

    tags.join("\n")
}

/// `<meta name=... content=...>`
pub fn meta_name(name: &str, content: &str) -> String {
    format!(
        r#"<meta name="{}" content="{}">"#,
        html_escape(name),
        html_escape(content)
    )
}

/// `<meta property=... content=...>`
pub fn meta_property(property: &str, content: &str) -> String {
    format!(
        r#"<meta property="{}" content="{}">"#,
        html_escape(property),
        html_escape(content)
    )
}

/// Escape HTML special characters
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_graph_without_image() {
        let tags = open_graph("Title", "Desc", "", None);
        assert!(tags.contains(r#"<meta property="og:title" content="Title">"#));
        assert!(tags.contains(r#"<meta property="og:type" content="article">"#));
        assert!(!tags.contains("og:image"));
        assert!(!tags.contains("og:url"));
    }

    #[test]
    fn test_twitter_card_with_image() {
        let tags = twitter_card("T", "D", Some("https://img/x.jpg?w=1&h=2"));
        assert!(tags.contains(r#"<meta name="twitter:card" content="summary_large_image">"#));
        assert!(tags.contains(r#"content="https://img/x.jpg?w=1&amp;h=2""#));
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape(r#"<a href="x">'</a>"#), "&lt;a href=&quot;x&quot;&gt;&#39;&lt;/a&gt;");
    }
}
