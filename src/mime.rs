//! Raw message boundary: pick the displayable body out of a MIME message

use crate::dom::{self, Handle};
use crate::error::{ParseError, Result};
use crate::options::ParseOptions;
use crate::parser::parse_message;
use crate::types::ParseResult;
use mailparse::{DispositionType, ParsedMail};
use tracing::debug;

/// HTML body of a raw message
///
/// The first `text/html` part wins; otherwise the first `text/plain` part is
/// rendered as HTML paragraphs. Attachments are never considered.
pub fn html_body(raw: &[u8]) -> Result<String> {
    let parsed = mailparse::parse_mail(raw).map_err(|e| ParseError::Decode(e.to_string()))?;

    let mut text = None;
    let mut html = None;
    collect_bodies(&parsed, &mut text, &mut html);

    match (html, text) {
        (Some(html), _) => Ok(html),
        (None, Some(text)) => {
            debug!("No HTML part, rendering text body");
            text_to_html(&text)
        }
        (None, None) => Err(ParseError::MissingBody),
    }
}

/// Normalize the body of a raw message
pub fn parse_raw_email(raw: &[u8], options: &ParseOptions) -> Result<ParseResult> {
    options.validate()?;
    let html = html_body(raw)?;
    parse_message(&html, options)
}

fn collect_bodies(part: &ParsedMail, text: &mut Option<String>, html: &mut Option<String>) {
    if !part.subparts.is_empty() {
        for subpart in &part.subparts {
            collect_bodies(subpart, text, html);
        }
        return;
    }
    if part.get_content_disposition().disposition == DispositionType::Attachment {
        return;
    }

    let content_type = part.ctype.mimetype.to_lowercase();
    let Ok(body) = part.get_body() else {
        debug!("Skipping undecodable {} part", content_type);
        return;
    };
    if content_type == "text/html" && html.is_none() {
        *html = Some(body);
    } else if content_type == "text/plain" && text.is_none() {
        *text = Some(body);
    }
}

/// Render plain text as HTML: one `<p>` per paragraph, `<br>` per line break
pub fn text_to_html(text: &str) -> Result<String> {
    let normalized = text.replace("\r\n", "\n");
    let holder = dom::create_element("div", &[]);
    let mut paragraph: Option<Handle> = None;

    for line in normalized.lines() {
        if line.trim().is_empty() {
            paragraph = None;
            continue;
        }
        let open = if let Some(open) = paragraph.take() {
            dom::append(&open, dom::create_element("br", &[]));
            open
        } else {
            let open = dom::create_element("p", &[]);
            dom::append(&holder, open.clone());
            open
        };
        dom::append(&open, dom::create_text(line));
        paragraph = Some(open);
    }
    dom::inner_html(&holder)
}
