use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag};

const SAFE_SCHEMES: &[&str] = &["http", "https", "mailto"];

/// Renders a model reply to HTML that can be injected into the chat view.
///
/// Raw HTML in the markdown is emitted as escaped text and links/images with
/// a scheme other than http(s)/mailto are neutralised.
pub fn to_safe_html(input: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let events = Parser::new_ext(input, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Link {
            link_type,
            dest_url: safe_url(dest_url),
            title,
            id,
        }),
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Image {
            link_type,
            dest_url: safe_url(dest_url),
            title,
            id,
        }),
        other => other,
    });

    let mut output = String::new();
    html::push_html(&mut output, events);
    output
}

fn safe_url(url: CowStr<'_>) -> CowStr<'_> {
    let trimmed = url.trim();
    let scheme_end = trimmed.find(':');
    let path_start = trimmed.find(['/', '?', '#']);

    let has_scheme = match (scheme_end, path_start) {
        (Some(colon), Some(slash)) => colon < slash,
        (Some(_), None) => true,
        _ => false,
    };
    if !has_scheme {
        return url;
    }

    let scheme = trimmed[..scheme_end.unwrap_or(0)].to_ascii_lowercase();
    if SAFE_SCHEMES.contains(&scheme.as_str()) {
        url
    } else {
        CowStr::Borrowed("#")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renders_basic_markdown() {
        let html = to_safe_html("Total is **450** units\n\n- North\n- South");
        assert!(html.contains("<strong>450</strong>"));
        assert!(html.contains("<li>North</li>"));
    }

    #[test]
    fn test_tables_enabled() {
        let html = to_safe_html("| Product | Sales |\n|---|---|\n| A | 100 |");
        assert!(html.contains("<table>"));
        assert!(html.contains("<td>100</td>"));
    }

    #[test]
    fn test_raw_html_is_escaped() {
        let html = to_safe_html("hello <script>alert(1)</script>\n\n<div onclick=\"x()\">block</div>");
        assert!(!html.contains("<script>"));
        assert!(!html.contains("<div onclick"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_unsafe_link_schemes_are_neutralised() {
        let html = to_safe_html("[click](javascript:alert(1)) [docs](https://example.com/a) [rel](reports/q1.html)");
        assert!(html.contains(r##"<a href="#">click</a>"##));
        assert!(html.contains(r#"href="https://example.com/a""#));
        assert!(html.contains(r#"href="reports/q1.html""#));
        assert!(!html.contains("javascript"));
    }
}
