//! Enforce a single viewport `<meta>` tag

use crate::dom::{self, Document};
use crate::error::{ParseError, Result};
use crate::selector::Selector;
use std::sync::LazyLock;

static NAMED_META: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("meta[name]").expect("valid meta selector"));

static META_CONTENT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("meta[content]").expect("valid meta selector"));

/// Replace every viewport declaration with one carrying `content`
pub fn enforce_viewport(document: &Document, content: &str) {
    for meta in document.select(&NAMED_META) {
        if dom::attr(&meta, "name")
            .is_some_and(|name| name.trim().eq_ignore_ascii_case("viewport"))
        {
            dom::detach(&meta);
        }
    }

    let meta = dom::create_element("meta", &[("name", "viewport"), ("content", content)]);
    if let Some(head) = document.head().or_else(|| document.html_element()) {
        dom::prepend(&head, meta);
    }
}

/// Viewport content from an option value
///
/// Accepts either the bare content (`width=device-width`) or a whole tag
/// (`<meta name="viewport" content="width=device-width">`).
pub(crate) fn viewport_content(value: &str) -> Result<String> {
    let value = value.trim();
    let content = if value.starts_with('<') {
        let fragment = Document::parse(value);
        fragment
            .select(&META_CONTENT)
            .first()
            .and_then(|meta| dom::attr(meta, "content"))
            .unwrap_or_default()
    } else {
        value.to_string()
    };

    let content = content.trim();
    if content.is_empty() {
        return Err(ParseError::option("forceViewport", "viewport content is empty"));
    }
    Ok(content.to_string())
}
