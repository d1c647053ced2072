//! Neutralize or redirect remote content (tracking pixels, remote frames,
//! stylesheets and CSS backgrounds)

use crate::dom::{self, Document, Handle};
use crate::error::{ParseError, Result};
use crate::types::RemoteRewrite;
use regex::{Captures, Regex};
use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;
use tracing::debug;

/// 1x1 transparent GIF used in place of remote images
pub const TRANSPARENT_PIXEL: &str =
    "data:image/gif;base64,R0lGODlhAQABAIAAAAAAAP///yH5BAEAAAAALAAAAAABAAEAAAIBRAA7";

/// Value used in place of any other remote URL
const NEUTRAL_URL: &str = "#";

static CSS_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)url\(\s*['"]?([^'")\s]+)['"]?\s*\)"#).unwrap());

/// Attributes that load something when the message is displayed
const URL_ATTRIBUTES: [&str; 4] = ["src", "background", "poster", "data"];

/// Compiled `remoteContentReplacements`
///
/// Keys are exact URLs, or regular expressions written as `/pattern/`.
#[derive(Debug, Clone, Default)]
pub struct RemoteReplacements {
    exact: HashMap<String, String>,
    patterns: Vec<(Regex, String)>,
}

impl RemoteReplacements {
    /// Compile replacement rules, rejecting patterns that do not compile
    pub fn compile(rules: &BTreeMap<String, String>) -> Result<Self> {
        let mut replacements = Self::default();
        for (key, replacement) in rules {
            match key.strip_prefix('/').and_then(|rest| rest.strip_suffix('/')) {
                Some(pattern) => {
                    let regex = Regex::new(pattern).map_err(|e| {
                        ParseError::option("remoteContentReplacements", format!("{key}: {e}"))
                    })?;
                    replacements.patterns.push((regex, replacement.clone()));
                }
                None => {
                    replacements.exact.insert(key.clone(), replacement.clone());
                }
            }
        }
        Ok(replacements)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.patterns.is_empty()
    }

    /// Configured replacement for `url`: an exact key first, then the first
    /// matching pattern in key order
    #[must_use]
    pub fn lookup(&self, url: &str) -> Option<String> {
        if let Some(replacement) = self.exact.get(url) {
            return Some(replacement.clone());
        }
        self.patterns
            .iter()
            .find(|(pattern, _)| pattern.is_match(url))
            .map(|(pattern, replacement)| pattern.replace(url, replacement.as_str()).into_owned())
    }
}

/// Whether a URL is fetched from the network
#[must_use]
pub fn is_remote(url: &str) -> bool {
    let url = url.trim().to_ascii_lowercase();
    url.starts_with("http://") || url.starts_with("https://") || url.starts_with("//")
}

struct Rewriter<'a> {
    replacements: &'a RemoteReplacements,
    neutralize: bool,
    rewrites: Vec<RemoteRewrite>,
}

impl Rewriter<'_> {
    fn rewrite(&mut self, url: &str, image: bool) -> Option<String> {
        let url = url.trim();
        if !is_remote(url) {
            return None;
        }
        let replacement = self.replacements.lookup(url).or_else(|| {
            self.neutralize
                .then(|| (if image { TRANSPARENT_PIXEL } else { NEUTRAL_URL }).to_string())
        })?;
        self.rewrites.push(RemoteRewrite {
            url: url.to_string(),
            replacement: replacement.clone(),
        });
        Some(replacement)
    }

    fn rewrite_css(&mut self, css: &str) -> Option<String> {
        let mut changed = false;
        let rewritten = CSS_URL.replace_all(css, |caps: &Captures<'_>| {
            match self.rewrite(&caps[1], true) {
                Some(replacement) => {
                    changed = true;
                    format!("url('{replacement}')")
                }
                None => caps[0].to_string(),
            }
        });
        let rewritten = rewritten.into_owned();
        changed.then_some(rewritten)
    }

    fn rewrite_srcset(&mut self, srcset: &str) -> Option<String> {
        let mut changed = false;
        let mut candidates = Vec::new();
        for candidate in srcset.split(',').map(str::trim).filter(|c| !c.is_empty()) {
            let (url, descriptor) = candidate
                .split_once(char::is_whitespace)
                .unwrap_or((candidate, ""));
            match self.rewrite(url, true) {
                Some(replacement) => {
                    changed = true;
                    let descriptor = descriptor.trim();
                    candidates.push(if descriptor.is_empty() {
                        replacement
                    } else {
                        format!("{replacement} {descriptor}")
                    });
                }
                None => candidates.push(candidate.to_string()),
            }
        }
        changed.then(|| candidates.join(", "))
    }

    fn visit(&mut self, element: &Handle) {
        let Some(tag) = dom::tag_name(element).map(str::to_string) else {
            return;
        };

        for name in URL_ATTRIBUTES {
            if let Some(value) = dom::attr(element, name)
                && let Some(replacement) = self.rewrite(&value, is_image_slot(&tag, name))
            {
                dom::set_attr(element, name, &replacement);
            }
        }
        if tag == "link"
            && let Some(href) = dom::attr(element, "href")
            && let Some(replacement) = self.rewrite(&href, false)
        {
            dom::set_attr(element, "href", &replacement);
        }
        if let Some(srcset) = dom::attr(element, "srcset")
            && let Some(rewritten) = self.rewrite_srcset(&srcset)
        {
            dom::set_attr(element, "srcset", &rewritten);
        }
        if let Some(style) = dom::attr(element, "style")
            && let Some(rewritten) = self.rewrite_css(&style)
        {
            dom::set_attr(element, "style", &rewritten);
        }
        if tag == "style" {
            for child in dom::children(element) {
                if let Some(css) = dom::text_of(&child)
                    && let Some(rewritten) = self.rewrite_css(&css)
                {
                    dom::set_text(&child, &rewritten);
                }
            }
        }
    }
}

fn is_image_slot(tag: &str, attribute: &str) -> bool {
    matches!(
        (tag, attribute),
        ("img" | "input", "src") | (_, "background" | "poster")
    )
}

/// Rewrite remote URLs in `document`
///
/// Configured replacements always apply; other remote URLs are replaced by
/// a transparent pixel (images) or `#` only when `neutralize` is set.
/// Anchor targets are links, not content, and are left alone.
pub fn rewrite_remote_content(
    document: &Document,
    replacements: &RemoteReplacements,
    neutralize: bool,
) -> Vec<RemoteRewrite> {
    let mut rewriter = Rewriter {
        replacements,
        neutralize,
        rewrites: Vec::new(),
    };
    for node in dom::descendants(document.root()) {
        rewriter.visit(&node);
    }
    debug!(count = rewriter.rewrites.len(), "Rewrote remote content");
    rewriter.rewrites
}
