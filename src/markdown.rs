//! Restricted markdown rendering for chat bubbles.
//!
//! Assistant replies use `**bold**`; the renderer expects `__bold__`, so
//! content is normalized first. Only paragraphs, bold spans and unordered
//! lists are produced. Everything else is escaped and shown literally.

const PARAGRAPH_OPEN: &str = r#"<p class="m-0">"#;
const STRONG_OPEN: &str = r#"<strong class="font-bold">"#;
const LIST_OPEN: &str = r#"<ul class="list-disc ml-4">"#;
const ITEM_OPEN: &str = r#"<li class="my-1">"#;

/// Convert `**` bold delimiters into `__`.
#[must_use]
pub fn normalize_bold(text: &str) -> String {
    text.replace("**", "__")
}

/// Render message content to an HTML fragment.
#[must_use]
pub fn render(text: &str) -> String {
    let normalized = normalize_bold(text);
    let mut html = String::new();
    let mut paragraph: Vec<&str> = Vec::new();
    let mut items: Vec<String> = Vec::new();

    for line in normalized.lines() {
        if line.trim().is_empty() {
            flush_paragraph(&mut html, &mut paragraph);
            flush_list(&mut html, &mut items);
            continue;
        }

        if let Some(item) = list_item(line) {
            flush_paragraph(&mut html, &mut paragraph);
            items.push(item.to_string());
            continue;
        }

        // Indented text directly under an item continues that item.
        if line.starts_with([' ', '\t']) {
            if let Some(last) = items.last_mut() {
                last.push(' ');
                last.push_str(line.trim());
                continue;
            }
        }

        flush_list(&mut html, &mut items);
        paragraph.push(line.trim());
    }

    flush_paragraph(&mut html, &mut paragraph);
    flush_list(&mut html, &mut items);
    html
}

/// Escape text for inclusion in HTML element content or attribute values.
#[must_use]
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

fn flush_paragraph(html: &mut String, lines: &mut Vec<&str>) {
    if lines.is_empty() {
        return;
    }
    html.push_str(PARAGRAPH_OPEN);
    html.push_str(&render_inline(&lines.join("\n")));
    html.push_str("</p>");
    lines.clear();
}

fn flush_list(html: &mut String, items: &mut Vec<String>) {
    if items.is_empty() {
        return;
    }
    html.push_str(LIST_OPEN);
    for item in items.drain(..) {
        html.push_str(ITEM_OPEN);
        html.push_str(&render_inline(&item));
        html.push_str("</li>");
    }
    html.push_str("</ul>");
}

/// Text of an unordered list item, or `None` if the line is not one.
fn list_item(line: &str) -> Option<&str> {
    let indent = line.len() - line.trim_start().len();
    if indent > 3 {
        return None;
    }
    let rest = line.trim_start();
    let mut chars = rest.chars();
    match (chars.next(), chars.next()) {
        (Some('-' | '*' | '+'), Some(' ' | '\t')) => Some(rest[2..].trim()),
        _ => None,
    }
}

/// Render `__bold__` spans; unmatched delimiters stay literal.
fn render_inline(text: &str) -> String {
    let mut out = String::new();
    let mut rest = text;

    while let Some(start) = rest.find("__") {
        let after = &rest[start + 2..];
        match after.find("__") {
            Some(end) if is_strong_content(&after[..end]) => {
                out.push_str(&escape_html(&rest[..start]));
                out.push_str(STRONG_OPEN);
                out.push_str(&escape_html(&after[..end]));
                out.push_str("</strong>");
                rest = &after[end + 2..];
            }
            _ => {
                out.push_str(&escape_html(&rest[..start + 2]));
                rest = after;
            }
        }
    }

    out.push_str(&escape_html(rest));
    out
}

fn is_strong_content(content: &str) -> bool {
    !content.is_empty()
        && !content.starts_with(char::is_whitespace)
        && !content.ends_with(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_bold() {
        assert_eq!(normalize_bold("**a** and **b**"), "__a__ and __b__");
    }

    #[test]
    fn test_double_asterisk_renders_bold() {
        assert_eq!(
            render("**Hello!**"),
            r#"<p class="m-0"><strong class="font-bold">Hello!</strong></p>"#
        );
    }

    #[test]
    fn test_paragraphs_split_on_blank_lines() {
        assert_eq!(
            render("First line\nsame paragraph\n\nSecond"),
            "<p class=\"m-0\">First line\nsame paragraph</p><p class=\"m-0\">Second</p>"
        );
    }

    #[test]
    fn test_unordered_list() {
        let html = render("Checklist:\n- **Deposit** protected\n* Gas safety\n+ EPC");
        assert_eq!(
            html,
            concat!(
                r#"<p class="m-0">Checklist:</p>"#,
                r#"<ul class="list-disc ml-4">"#,
                r#"<li class="my-1"><strong class="font-bold">Deposit</strong> protected</li>"#,
                r#"<li class="my-1">Gas safety</li>"#,
                r#"<li class="my-1">EPC</li>"#,
                "</ul>"
            )
        );
    }

    #[test]
    fn test_list_item_continuation() {
        assert_eq!(
            render("- first\n  continued\nafter"),
            concat!(
                r#"<ul class="list-disc ml-4"><li class="my-1">first continued</li></ul>"#,
                r#"<p class="m-0">after</p>"#
            )
        );
    }

    #[test]
    fn test_unmatched_delimiter_is_literal() {
        assert_eq!(render("**open"), r#"<p class="m-0">__open</p>"#);
        assert_eq!(render("a __ b __ c"), r#"<p class="m-0">a __ b __ c</p>"#);
    }

    #[test]
    fn test_html_is_escaped() {
        assert_eq!(
            render("<script>alert('x')</script> & **<b>**"),
            concat!(
                r#"<p class="m-0">&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt; &amp; "#,
                r#"<strong class="font-bold">&lt;b&gt;</strong></p>"#
            )
        );
    }

    #[test]
    fn test_other_markdown_is_literal() {
        assert_eq!(render("# Title"), r#"<p class="m-0"># Title</p>"#);
        assert_eq!(render("1. one"), r#"<p class="m-0">1. one</p>"#);
    }

    #[test]
    fn test_empty_content() {
        assert_eq!(render(""), "");
        assert_eq!(render("\n\n"), "");
    }
}
