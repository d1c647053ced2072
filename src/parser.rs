//! Message normalization pipeline

use crate::autolink::autolink;
use crate::dom::{self, Document};
use crate::error::Result;
use crate::links::enhance_links;
use crate::options::ParseOptions;
use crate::quotations::cut_quotations;
use crate::remote::rewrite_remote_content;
use crate::signatures::remove_signatures;
use crate::styles::{inject_style, strip_styles};
use crate::types::{ExtractionResult, ParseResult};
use crate::viewport::enforce_viewport;
use tracing::debug;

/// Normalize the HTML body of a message
///
/// Options are validated before anything is parsed, so a bad option never
/// yields a partially processed message. Blank input produces an empty
/// result. Passes run in a fixed order: quotations, signatures, style
/// stripping, autolink, link repair, remote content, viewport, then style
/// injection.
pub fn parse_message(html: &str, options: &ParseOptions) -> Result<ParseResult> {
    let plan = options.plan()?;

    if html.trim().is_empty() {
        debug!("Empty message body");
        return Ok(ParseResult::default());
    }

    let document = Document::parse(html);

    // marks keep the quote's position visible to the signature pass
    let (quotation, quote_marks) = if options.clean_quotations {
        cut_quotations(&document)?
    } else {
        (ExtractionResult::not_found(), Vec::new())
    };

    let signature = if options.clean_signatures {
        remove_signatures(&document, options.clean_quotations)?
    } else {
        ExtractionResult::not_found()
    };
    for mark in &quote_marks {
        dom::detach(mark);
    }

    if options.clean_styles {
        strip_styles(&document);
    }
    if options.autolink {
        autolink(&document);
    }
    if options.enhance_links {
        enhance_links(&document);
    }

    let remote_content = if options.no_remote_content || !plan.replacements.is_empty() {
        rewrite_remote_content(&document, &plan.replacements, options.no_remote_content)
    } else {
        Vec::new()
    };

    if let Some(content) = &plan.viewport {
        enforce_viewport(&document, content);
    }
    if let Some(css) = &plan.style {
        inject_style(&document, css);
    }

    let html = document.to_html()?;

    debug!(
        "Normalized message: quotation={} signature={} remote={}",
        quotation.did_find(),
        signature.did_find(),
        remote_content.len()
    );

    Ok(ParseResult {
        html,
        signature,
        quotation,
        remote_content,
    })
}
