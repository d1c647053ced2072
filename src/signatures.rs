//! Signature detection, extraction and removal

use crate::dom::{self, Document, Handle};
use crate::error::Result;
use crate::quotations::{cut_quotations, is_mark};
use crate::selector::{Selector, siblings_until};
use crate::types::ExtractionResult;
use std::sync::LazyLock;
use tracing::debug;

/// Known client markers, then the generic "signature" substring matchers
static SIGNATURE_MARKERS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(concat!(
        "signature, ",
        ".gmail_signature, ",
        ".protonmail_signature_block, ",
        "#ms-outlook-mobile-signature, ",
        "#Signature, ",
        r#"[class*="signature"], "#,
        r#"[id*="signature"]"#,
    ))
    .expect("valid signature selector")
});

/// Parent of the first run styled by Outlook's signature editor
static OUTLOOK_ANCHOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#":has(> [style*="mso-ligatures"], > [style*="mso-fareast"])"#)
        .expect("valid outlook anchor selector")
});

/// Outlook ends a native signature where the reply header starts
static OUTLOOK_BOUND: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"div[style*="border-top"]"#).expect("valid outlook bound selector")
});

/// One detected signature
pub enum SignatureRegion {
    /// An element carrying a known signature marker
    Element(Handle),
    /// A run of siblings recognised structurally (Outlook desktop)
    Run(Vec<Handle>),
}

impl SignatureRegion {
    /// The nodes this region occupies in its document
    #[must_use]
    pub fn nodes(&self) -> &[Handle] {
        match self {
            Self::Element(node) => std::slice::from_ref(node),
            Self::Run(nodes) => nodes,
        }
    }

    /// Detached copy of the region; runs are wrapped in a synthetic `<div>`
    fn container(&self) -> Handle {
        let container = match self {
            Self::Element(node) => dom::deep_clone(node),
            Self::Run(nodes) => dom::wrap_all(
                &nodes.iter().map(dom::deep_clone).collect::<Vec<_>>(),
                dom::create_element("div", &[]),
            ),
        };
        for mark in dom::descendants(&container).iter().filter(|node| is_mark(node)) {
            dom::detach(mark);
        }
        container
    }

    /// Inner HTML of the region with `div`-in-`div` wrappers collapsed
    pub fn html(&self) -> Result<String> {
        let container = self.container();
        collapse_wrappers(&container);
        dom::inner_html(&container)
    }

    /// Plain text of the region, one line per block
    #[must_use]
    pub fn plain_text(&self) -> String {
        dom::block_text(&self.container())
    }

    fn remove(&self) {
        for node in self.nodes() {
            dom::detach(node);
        }
    }
}

struct Strategy {
    name: &'static str,
    applies: fn(&Document) -> bool,
    find: fn(&Document) -> Vec<SignatureRegion>,
}

/// Tried in order; the first strategy that applies and finds anything wins
static STRATEGIES: [Strategy; 2] = [
    Strategy {
        name: "markers",
        applies: always,
        find: find_marked,
    },
    Strategy {
        name: "outlook-native",
        applies: is_outlook_document,
        find: find_outlook_native,
    },
];

const fn always(_: &Document) -> bool {
    true
}

/// Outlook desktop stamps the Office math namespace on the root element
fn is_outlook_document(document: &Document) -> bool {
    document
        .html_element()
        .and_then(|html| dom::attr(&html, "xmlns:m"))
        .is_some_and(|namespace| namespace.contains("microsoft"))
}

fn find_marked(document: &Document) -> Vec<SignatureRegion> {
    document
        .select(&SIGNATURE_MARKERS)
        .into_iter()
        .map(SignatureRegion::Element)
        .collect()
}

fn find_outlook_native(document: &Document) -> Vec<SignatureRegion> {
    // only the first anchor is considered
    let Some(anchor) = document.select(&OUTLOOK_ANCHOR).into_iter().next() else {
        debug!("No Outlook signature anchor");
        return Vec::new();
    };
    let run = siblings_until(&anchor, &OUTLOOK_BOUND);
    // a cut quotation ends the run like the reply header it replaced
    let cut = run.nodes.iter().position(is_mark);
    let (nodes, bounded) = match cut {
        Some(cut) => (run.nodes[..cut].to_vec(), true),
        None => (run.nodes, run.bound.is_some()),
    };
    if !bounded || nodes.is_empty() {
        debug!("Outlook signature anchor has no border-top bound");
        return Vec::new();
    }
    vec![SignatureRegion::Run(nodes)]
}

/// Every signature region in `document`, in document order
#[must_use]
pub fn find_all_signatures(document: &Document) -> Vec<SignatureRegion> {
    for strategy in &STRATEGIES {
        if !(strategy.applies)(document) {
            continue;
        }
        let regions = (strategy.find)(document);
        if !regions.is_empty() {
            debug!(
                strategy = strategy.name,
                count = regions.len(),
                "Signature strategy matched"
            );
            return regions;
        }
    }
    Vec::new()
}

/// Replace every `div` whose only content is another `div` by that child
fn collapse_wrappers(container: &Handle) {
    for wrapper in dom::descendants(container)
        .into_iter()
        .filter(|node| dom::is_element(node, "div"))
    {
        if dom::parent(&wrapper).is_none() {
            continue;
        }
        let content: Vec<Handle> = dom::children(&wrapper)
            .into_iter()
            .filter(|child| !dom::is_blank_text(child))
            .collect();
        if let [only] = content.as_slice()
            && dom::is_element(only, "div")
        {
            dom::replace_with(&wrapper, only.clone());
        }
    }
}

/// Extract the primary signature and strip every signature from `document`
///
/// When `quotations_removed` is false the search runs on a quote-free copy,
/// so a signature inside a quoted message is never reported as the sender's
/// own. Exactly the regions found on the copy are then removed from
/// `document`; the quoted message itself is left as is.
pub fn remove_signatures(
    document: &Document,
    quotations_removed: bool,
) -> Result<ExtractionResult> {
    if quotations_removed {
        let found = find_all_signatures(document);
        let result = primary(&found)?;
        for region in &found {
            region.remove();
        }
        return Ok(result);
    }

    let (scratch, origins) = document.deep_clone_mapped();
    cut_quotations(&scratch)?;
    let found = find_all_signatures(&scratch);
    let result = primary(&found)?;
    for node in found.iter().flat_map(SignatureRegion::nodes) {
        if let Some(live) = origins.original(node) {
            dom::detach(live);
        }
    }
    Ok(result)
}

fn primary(found: &[SignatureRegion]) -> Result<ExtractionResult> {
    Ok(match found.first() {
        Some(region) => ExtractionResult::found(region.plain_text(), region.html()?),
        None => ExtractionResult::not_found(),
    })
}
