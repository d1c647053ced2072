//! Quoted-reply detection and removal
//!
//! Each mail client wraps the previous message differently. The rules below
//! are tried in order and the first family that matches anything wins;
//! matches from different families are never merged.

use crate::dom::{self, Document, Handle};
use crate::error::Result;
use crate::selector::Selector;
use crate::types::ExtractionResult;
use regex::Regex;
use std::rc::Rc;
use std::sync::LazyLock;
use tracing::debug;

/// How much of the document a rule hit covers
#[derive(Debug, Clone, Copy)]
enum Extent {
    /// The matched element only
    Matched,
    /// The matched marker plus every following sibling, and a directly
    /// preceding `<hr>` separator
    ThroughEnd,
    /// Like `ThroughEnd`, but only for headers naming the original sender,
    /// climbing out of single-child wrappers first
    ReplyHeader,
    /// The matched element together with the attribution line before it;
    /// hits without an attribution are ignored
    Attributed,
}

struct QuoteRule {
    client: &'static str,
    selector: &'static str,
    extent: Extent,
}

static RULES: [QuoteRule; 7] = [
    QuoteRule {
        client: "gmail",
        selector: ".gmail_quote_container, .gmail_quote",
        extent: Extent::Matched,
    },
    QuoteRule {
        client: "protonmail",
        selector: ".protonmail_quote",
        extent: Extent::Matched,
    },
    QuoteRule {
        client: "yahoo",
        selector: r#".yahoo_quoted, [id*="yahoo_quoted"]"#,
        extent: Extent::Matched,
    },
    QuoteRule {
        client: "apple-thunderbird",
        selector: r#".moz-cite-prefix, blockquote[type="cite"]"#,
        extent: Extent::Matched,
    },
    QuoteRule {
        client: "outlook-web",
        selector: "#appendonsend, #divRplyFwdMsg, #mail-editor-reference-message-container",
        extent: Extent::ThroughEnd,
    },
    QuoteRule {
        client: "outlook-desktop",
        selector: concat!(
            r#"div[style*="border-top:solid #E1E1E1"], "#,
            r#"div[style*="border-top:solid #B5C4DF"]"#,
        ),
        extent: Extent::ReplyHeader,
    },
    QuoteRule {
        client: "generic",
        selector: "blockquote",
        extent: Extent::Attributed,
    },
];

static COMPILED: LazyLock<Vec<(&'static QuoteRule, Selector)>> = LazyLock::new(|| {
    RULES
        .iter()
        .map(|rule| {
            let selector = Selector::parse(rule.selector).expect("valid quotation selector");
            (rule, selector)
        })
        .collect()
});

static ATTRIBUTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?is)^\s*(on\b.{0,300}\bwrote|le\b.{0,300}\ba écrit",
        r"|am\b.{0,300}\bschrieb|el\b.{0,300}\bescribió)\s*:?\s*$",
    ))
    .unwrap()
});

static SENDER_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(from|von|de|van|da)\s*:").unwrap());

/// Tag of the placeholder [`cut_quotations`] leaves behind
const MARK_TAG: &str = "quote-mark";

/// Remove the quoted previous message(s) from `document`
///
/// Returns what was removed; the document is left untouched when nothing
/// matches.
pub fn remove_quotations(document: &Document) -> Result<ExtractionResult> {
    let (result, marks) = cut_quotations(document)?;
    for mark in &marks {
        dom::detach(mark);
    }
    Ok(result)
}

/// Like [`remove_quotations`], but every removed node is replaced by an empty
/// mark element so later passes still see where the quote sat. The caller
/// detaches the returned marks.
pub(crate) fn cut_quotations(document: &Document) -> Result<(ExtractionResult, Vec<Handle>)> {
    let nodes = find_quotations(document);
    if nodes.is_empty() {
        return Ok((ExtractionResult::not_found(), Vec::new()));
    }

    let mut html = String::new();
    for node in &nodes {
        html.push_str(&dom::outer_html(node)?);
    }
    let holder = dom::wrap_all(
        &nodes.iter().map(dom::deep_clone).collect::<Vec<_>>(),
        dom::create_element("div", &[]),
    );
    let plain_text = dom::block_text(&holder);

    let marks = nodes
        .iter()
        .map(|node| {
            let mark = dom::create_element(MARK_TAG, &[]);
            dom::replace_with(node, mark.clone());
            mark
        })
        .collect();
    Ok((ExtractionResult::found(plain_text, html), marks))
}

/// Whether `node` is a placeholder left by [`cut_quotations`]
pub(crate) fn is_mark(node: &Handle) -> bool {
    dom::is_element(node, MARK_TAG)
}

/// Top-level nodes making up the quoted message(s), in document order
#[must_use]
pub fn find_quotations(document: &Document) -> Vec<Handle> {
    for (rule, selector) in COMPILED.iter() {
        let hits = top_level(document.select(selector));
        let nodes = match rule.extent {
            Extent::Matched => hits,
            Extent::ThroughEnd => through_end(&hits),
            Extent::ReplyHeader => reply_header(&hits),
            Extent::Attributed => attributed(&hits),
        };
        if !nodes.is_empty() {
            debug!(client = rule.client, count = nodes.len(), "Quotation rule matched");
            return nodes;
        }
    }
    Vec::new()
}

fn contains(nodes: &[Handle], node: &Handle) -> bool {
    nodes.iter().any(|other| Rc::ptr_eq(other, node))
}

fn push_unique(nodes: &mut Vec<Handle>, node: Handle) {
    if !contains(nodes, &node) {
        nodes.push(node);
    }
}

/// Drop hits nested inside other hits
fn top_level(hits: Vec<Handle>) -> Vec<Handle> {
    hits.iter()
        .filter(|hit| !dom::ancestors(hit).any(|ancestor| contains(&hits, &ancestor)))
        .cloned()
        .collect()
}

/// Nearest preceding sibling that is neither blank text nor a `<br>`
fn previous_significant(node: &Handle) -> Option<Handle> {
    dom::preceding_siblings(node)
        .into_iter()
        .find(|sibling| !dom::is_blank_text(sibling) && !dom::is_element(sibling, "br"))
}

fn through_end(hits: &[Handle]) -> Vec<Handle> {
    let mut nodes = Vec::new();
    for hit in hits {
        // already taken along with an earlier marker or its container
        if contains(&nodes, hit)
            || dom::ancestors(hit).any(|ancestor| contains(&nodes, &ancestor))
        {
            continue;
        }
        if let Some(separator) =
            previous_significant(hit).filter(|node| dom::is_element(node, "hr"))
        {
            push_unique(&mut nodes, separator);
        }
        push_unique(&mut nodes, hit.clone());
        for sibling in dom::following_siblings(hit) {
            push_unique(&mut nodes, sibling);
        }
    }
    nodes
}

fn reply_header(hits: &[Handle]) -> Vec<Handle> {
    let Some(header) = hits
        .iter()
        .find(|hit| SENDER_HEADER.is_match(&dom::text_content(hit)))
    else {
        return Vec::new();
    };
    let mut anchor = header.clone();
    while let Some(parent) = dom::parent(&anchor) {
        let lone_child = dom::children(&parent)
            .iter()
            .filter(|child| !dom::is_blank_text(child))
            .count()
            == 1;
        if !lone_child || dom::tag_name(&parent).is_none() || dom::is_element(&parent, "body") {
            break;
        }
        anchor = parent;
    }
    through_end(&[anchor])
}

fn attributed(hits: &[Handle]) -> Vec<Handle> {
    let mut nodes = Vec::new();
    for hit in hits {
        let Some(attribution) = previous_significant(hit) else {
            continue;
        };
        if ATTRIBUTION.is_match(&dom::text_content(&attribution)) {
            push_unique(&mut nodes, attribution);
            push_unique(&mut nodes, hit.clone());
        }
    }
    nodes
}
