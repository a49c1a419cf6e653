use std::collections::{HashMap, HashSet};

/// Render lesson Markdown to sanitized HTML.
#[must_use]
pub fn markdown_to_html(input: &str) -> String {
    let mut options = pulldown_cmark::Options::empty();
    options.insert(pulldown_cmark::Options::ENABLE_STRIKETHROUGH);
    options.insert(pulldown_cmark::Options::ENABLE_TABLES);

    let parser = pulldown_cmark::Parser::new_ext(input, options);
    let mut html = String::new();
    pulldown_cmark::html::push_html(&mut html, parser);
    sanitize_html(&html)
}

/// Render a single Markdown line without the wrapping paragraph, for labels
/// such as "Key Takeaway: ...".
#[must_use]
pub fn inline_markdown_to_html(input: &str) -> String {
    let html = markdown_to_html(input.trim());
    let trimmed = html.trim();
    match trimmed
        .strip_prefix("<p>")
        .and_then(|rest| rest.strip_suffix("</p>"))
    {
        Some(inner) if !inner.contains("<p>") => inner.to_string(),
        _ => trimmed.to_string(),
    }
}

#[must_use]
pub fn sanitize_html(html: &str) -> String {
    let tags: HashSet<&str> = [
        "p", "div", "span", "br", "em", "strong", "b", "i", "del", "code", "pre", "blockquote",
        "ul", "ol", "li", "a", "h3", "h4", "table", "thead", "tbody", "tr", "th", "td",
    ]
    .into_iter()
    .collect();

    let mut attributes: HashMap<&str, HashSet<&str>> = HashMap::new();
    attributes.insert("a", ["href"].into_iter().collect());

    ammonia::Builder::new()
        .tags(tags)
        .tag_attributes(attributes)
        .clean(html)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::{inline_markdown_to_html, markdown_to_html, sanitize_html};

    #[test]
    fn markdown_to_html_renders_lists_and_code() {
        let html = markdown_to_html("Use `print()`:\n\n- one\n- two\n");
        assert!(html.contains("<code>print()</code>"), "{html}");
        assert!(html.contains("<li>one</li>"), "{html}");
    }

    #[test]
    fn markdown_to_html_sanitizes_links() {
        let html = markdown_to_html("[Link](javascript:alert(1))");
        assert!(html.contains("Link"));
        assert!(!html.contains("javascript:"));
    }

    #[test]
    fn sanitize_html_drops_scripts_and_headings_above_h3() {
        let html = sanitize_html("<h1>Big</h1><script>alert(1)</script><h3>Ok</h3>");
        assert!(!html.contains("<script"), "{html}");
        assert!(!html.contains("<h1>"), "{html}");
        assert!(html.contains("<h3>Ok</h3>"), "{html}");
    }

    #[test]
    fn inline_markdown_strips_the_paragraph() {
        assert_eq!(
            inline_markdown_to_html("Call **`input()`** once."),
            "Call <strong><code>input()</code></strong> once."
        );
        let block = inline_markdown_to_html("one\n\ntwo");
        assert!(block.starts_with("<p>one</p>"), "{block}");
    }
}
