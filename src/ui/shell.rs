//! HTML document shell.

use crate::markdown::escape_html;

/// Wrap page content in a complete HTML document.
///
/// Tailwind and HTMX are loaded as progressive enhancements: every widget
/// action is a plain form post, so the page keeps working without scripts.
#[must_use]
pub fn document(title: &str, body: &str) -> String {
    let title = escape_html(title);
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <meta name="description" content="Home of The Best Local Estate Agents">
    <title>{title}</title>
    <script src="https://cdn.tailwindcss.com"></script>
    <script src="https://unpkg.com/htmx.org@2.0.8"></script>
    <style>
        #chat-thinking {{ display: none; }}
        #chat-thinking.htmx-request {{ display: block; }}
    </style>
    <script>
        function scrollChatToEnd() {{
            var end = document.getElementById('chat-end');
            if (end) {{ end.scrollIntoView({{ behavior: 'smooth' }}); }}
        }}
        document.addEventListener('DOMContentLoaded', scrollChatToEnd);
        document.addEventListener('htmx:afterSwap', scrollChatToEnd);
        document.addEventListener('htmx:beforeRequest', function () {{
            setTimeout(scrollChatToEnd, 0);
        }});
    </script>
</head>
<body class="min-h-screen bg-white">
{body}
</body>
</html>"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_escapes_title() {
        let html = document("A & B", "<main></main>");
        assert!(html.contains("<title>A &amp; B</title>"));
        assert!(html.contains("<main></main>"));
        assert!(html.contains("htmx.org"));
    }
}
