//! Style injection and host-hostile style stripping

use crate::dom::{self, Document};
use crate::selector::Selector;
use regex::{Captures, Regex};
use std::sync::LazyLock;
use tracing::trace;

static STYLESHEET_LINKS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("link[rel]").expect("valid link selector"));

static STYLE_ELEMENTS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("style").expect("valid style selector"));

static STYLED: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("[style]").expect("valid style attribute selector"));

static CSS_RULE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"([^{}]+)\{([^{}]*)\}").unwrap());

/// Elements whose styling belongs to the page hosting the message
const HOST_TAGS: [&str; 2] = ["html", "body"];

/// Append `css` to the document head as a `<style>` element
pub fn inject_style(document: &Document, css: &str) {
    let Some(head) = document.head().or_else(|| document.html_element()) else {
        return;
    };
    let style = dom::create_element("style", &[("type", "text/css")]);
    dom::append(&style, dom::create_text(css));
    dom::append(&head, style);
}

/// Remove styling that would leak out of the message into the host page
///
/// Returns the number of stylesheets, rules and declarations removed.
pub fn strip_styles(document: &Document) -> usize {
    let mut removed = 0;

    for link in document.select(&STYLESHEET_LINKS) {
        let is_stylesheet = dom::attr(&link, "rel").is_some_and(|rel| {
            rel.split_whitespace()
                .any(|kind| kind.eq_ignore_ascii_case("stylesheet"))
        });
        if is_stylesheet {
            dom::detach(&link);
            removed += 1;
        }
    }

    for style in document.select(&STYLE_ELEMENTS) {
        let css = dom::text_content(&style);
        let (rewritten, dropped) = strip_host_rules(&css);
        if dropped == 0 {
            continue;
        }
        removed += dropped;
        if rewritten.trim().is_empty() {
            dom::detach(&style);
        } else {
            for child in dom::children(&style) {
                dom::detach(&child);
            }
            dom::append(&style, dom::create_text(&rewritten));
        }
    }

    for element in document.select(&STYLED) {
        let Some(style) = dom::attr(&element, "style") else {
            continue;
        };
        let (kept, dropped) = strip_declarations(&style);
        if dropped == 0 {
            continue;
        }
        removed += dropped;
        if kept.is_empty() {
            dom::remove_attr(&element, "style");
        } else {
            dom::set_attr(&element, "style", &kept);
        }
    }

    trace!(removed, "Stripped styles");
    removed
}

/// Drop selectors aimed at the host page from a stylesheet
fn strip_host_rules(css: &str) -> (String, usize) {
    let mut dropped = 0;
    let rewritten = CSS_RULE.replace_all(css, |caps: &Captures<'_>| {
        let prelude = &caps[1];
        // at-rule statements (`@import ...;`) can precede the selector list
        let (prefix, selectors) = prelude
            .rfind(';')
            .map_or(("", prelude), |end| prelude.split_at(end + 1));

        let all: Vec<&str> = selectors.split(',').map(str::trim).collect();
        let kept: Vec<&str> = all
            .iter()
            .copied()
            .filter(|selector| !targets_host(selector))
            .collect();
        if kept.len() == all.len() {
            return caps[0].to_string();
        }
        dropped += all.len() - kept.len();
        if kept.is_empty() {
            prefix.to_string()
        } else {
            format!("{prefix}{} {{{}}}", kept.join(", "), &caps[2])
        }
    });
    (rewritten.into_owned(), dropped)
}

fn targets_host(selector: &str) -> bool {
    let leading = selector
        .split(|c: char| c.is_whitespace() || matches!(c, '>' | '+' | '~'))
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    if leading == "*" || leading.starts_with(":root") {
        return true;
    }
    let tag = leading
        .split(['.', '#', '[', ':'])
        .next()
        .unwrap_or_default();
    HOST_TAGS.contains(&tag)
}

/// Drop `z-index` and fixed/sticky positioning from an inline style
fn strip_declarations(style: &str) -> (String, usize) {
    let declarations = split_declarations(style);
    let total = declarations.len();
    let kept: Vec<&str> = declarations
        .into_iter()
        .filter(|declaration| !escapes_layout(declaration))
        .collect();
    let dropped = total - kept.len();
    (kept.join("; "), dropped)
}

fn escapes_layout(declaration: &str) -> bool {
    let Some((property, value)) = declaration.split_once(':') else {
        return false;
    };
    let property = property.trim().to_ascii_lowercase();
    let value = value.trim().to_ascii_lowercase();
    let value = value.trim_end_matches("!important").trim();
    property == "z-index" || (property == "position" && matches!(value, "fixed" | "sticky"))
}

/// Split on `;` outside parentheses and quotes, dropping empty declarations
fn split_declarations(style: &str) -> Vec<&str> {
    let mut declarations = Vec::new();
    let mut depth = 0usize;
    let mut quote = None;
    let mut start = 0;
    for (index, c) in style.char_indices() {
        match (quote, c) {
            (Some(open), _) if c == open => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, ';') if depth == 0 => {
                declarations.push(&style[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    declarations.push(&style[start..]);
    declarations
        .into_iter()
        .map(str::trim)
        .filter(|declaration| !declaration.is_empty())
        .collect()
}
