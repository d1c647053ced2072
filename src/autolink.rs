//! Turn bare URLs and e-mail addresses in text into anchors

use crate::dom::{self, Document, Handle};
use regex::Regex;
use std::sync::LazyLock;
use tracing::trace;

static LINKABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:https?://|www\.)[^\s<>\[\]{}|\\^]+|[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}",
    )
    .unwrap()
});

/// Text below these elements is never linked
const SKIPPED: [&str; 8] = [
    "a", "script", "style", "textarea", "title", "head", "button", "option",
];

/// Wrap every bare URL or address found in text nodes in an `<a>`
///
/// Returns the number of anchors created.
pub fn autolink(document: &Document) -> usize {
    let texts: Vec<Handle> = dom::descendants(document.root())
        .into_iter()
        .filter(|node| dom::text_of(node).is_some())
        .filter(|node| {
            !dom::ancestors(node)
                .any(|ancestor| SKIPPED.iter().any(|tag| dom::is_element(&ancestor, tag)))
        })
        .collect();

    let created: usize = texts.iter().map(link_text_node).sum();
    trace!(created, "Autolinked text");
    created
}

fn link_text_node(node: &Handle) -> usize {
    let Some(text) = dom::text_of(node) else {
        return 0;
    };

    let mut pieces = Vec::new();
    let mut cursor = 0;
    for found in LINKABLE.find_iter(&text) {
        let link = trim_trailing(found.as_str());
        if link.is_empty() {
            continue;
        }
        if found.start() > cursor {
            pieces.push(dom::create_text(&text[cursor..found.start()]));
        }
        let anchor = dom::create_element("a", &[("href", &href_for(link))]);
        dom::append(&anchor, dom::create_text(link));
        pieces.push(anchor);
        cursor = found.start() + link.len();
    }

    let created = pieces
        .iter()
        .filter(|piece| dom::is_element(piece, "a"))
        .count();
    if created == 0 {
        return 0;
    }
    if cursor < text.len() {
        pieces.push(dom::create_text(&text[cursor..]));
    }
    for piece in pieces {
        dom::insert_before(node, piece);
    }
    dom::detach(node);
    created
}

/// Strip sentence punctuation and an unbalanced closing parenthesis
fn trim_trailing(candidate: &str) -> &str {
    let mut link = candidate;
    loop {
        let trimmed = link.trim_end_matches(['.', ',', ';', ':', '!', '?', '\'', '"']);
        let unbalanced = trimmed.matches('(').count() < trimmed.matches(')').count();
        let trimmed = if trimmed.ends_with(')') && unbalanced {
            &trimmed[..trimmed.len() - 1]
        } else {
            trimmed
        };
        if trimmed.len() == link.len() {
            return link;
        }
        link = trimmed;
    }
}

fn href_for(link: &str) -> String {
    if link.contains("://") {
        link.to_string()
    } else if link.get(..4).is_some_and(|prefix| prefix.eq_ignore_ascii_case("www.")) {
        format!("http://{link}")
    } else {
        format!("mailto:{link}")
    }
}
