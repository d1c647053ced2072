//! Repair anchor hrefs and expose their destination as a title

use crate::dom::{self, Document};
use crate::selector::Selector;
use regex::Regex;
use std::sync::LazyLock;
use tracing::trace;
use url::Url;

static ANCHORS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a").expect("valid anchor selector"));

static BARE_DOMAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+([a-z]{2,24})(?::\d+)?(?:[/?#].*)?$")
        .unwrap()
});

/// Last labels that name a file rather than a host (`index.html`)
const FILE_EXTENSIONS: [&str; 12] = [
    "html", "htm", "php", "asp", "aspx", "jsp", "cgi", "png", "jpg", "jpeg", "gif", "pdf",
];

/// Fix missing, relative and malformed hrefs and add `title` attributes
///
/// Returns the number of anchors that were changed.
pub fn enhance_links(document: &Document) -> usize {
    let mut changed = 0;
    for anchor in document.select(&ANCHORS) {
        let raw = dom::attr(&anchor, "href");
        let source = match &raw {
            Some(href) => href.trim().to_string(),
            None => dom::text_content(&anchor).trim().to_string(),
        };
        if source.is_empty() {
            if raw.is_some() {
                dom::remove_attr(&anchor, "href");
                changed += 1;
            }
            continue;
        }

        let repaired = if raw.is_some() {
            repair_href(&source)
        } else {
            href_from_text(&source)
        };
        match repaired {
            Some(href) if raw.as_deref() != Some(href.as_str()) => {
                dom::set_attr(&anchor, "href", &href);
                changed += 1;
            }
            Some(_) => {}
            None if raw.is_some() => {
                trace!(href = %source, "Dropping unusable href");
                dom::remove_attr(&anchor, "href");
                changed += 1;
            }
            None => continue,
        }

        if !dom::has_attr(&anchor, "title") {
            dom::set_attr(&anchor, "title", &source);
            changed += 1;
        }
    }
    changed
}

/// Repaired form of an href, or `None` when it cannot point anywhere
#[must_use]
pub fn repair_href(href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    if href.starts_with('#') {
        return Some(href.to_string());
    }
    if let Some(rest) = href.strip_prefix("//") {
        return normalized(&format!("https://{rest}"));
    }
    if starts_with_www(href) {
        return normalized(&format!("http://{href}"));
    }
    match Url::parse(href) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {
            url.host_str().is_some().then(|| href.to_string())
        }
        Ok(_) => Some(href.to_string()),
        Err(url::ParseError::RelativeUrlWithoutBase) if looks_like_domain(href) => {
            normalized(&format!("http://{href}"))
        }
        Err(_) => None,
    }
}

/// An href for an anchor whose text is itself a web address
fn href_from_text(text: &str) -> Option<String> {
    if text.contains(char::is_whitespace) {
        return None;
    }
    let lower = text.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") || starts_with_www(text) {
        repair_href(text)
    } else {
        None
    }
}

fn starts_with_www(href: &str) -> bool {
    href.get(..4)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("www."))
}

fn looks_like_domain(href: &str) -> bool {
    BARE_DOMAIN.captures(href).is_some_and(|caps| {
        let tld = caps[1].to_ascii_lowercase();
        !FILE_EXTENSIONS.contains(&tld.as_str())
    })
}

fn normalized(candidate: &str) -> Option<String> {
    Url::parse(candidate)
        .ok()
        .filter(|url| url.host_str().is_some_and(|host| !host.is_empty()))
        .map(String::from)
}
