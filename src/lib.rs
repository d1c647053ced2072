// Enforce at crate level
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]
#![allow(clippy::significant_drop_tightening)]

//! HTML Email Normalizer
//!
//! Cleans the HTML body of an email message for display: strips quoted
//! replies and the sender's signature, and optionally rewrites links,
//! remote content, the viewport and styles.
//!
//! # Features
//!
//! - Quoted-reply removal for Gmail, Outlook, Apple Mail, Yahoo and others
//! - Signature extraction (text and HTML) including Outlook-native signatures
//! - Autolinking and href repair
//! - Remote content neutralization with configurable replacements
//! - Viewport enforcement and style injection/stripping
//!
//! # Example
//!
//! ```rust
//! use email_normalize::{ParseOptions, parse_message};
//!
//! let html = r#"<p>Hi there</p><div class="gmail_signature">John Doe</div>"#;
//! let options = ParseOptions {
//!     clean_signatures: true,
//!     ..ParseOptions::default()
//! };
//! let result = parse_message(html, &options).unwrap();
//!
//! assert!(result.signature.did_find());
//! assert_eq!(result.signature.plain_text(), Some("John Doe"));
//! assert!(!result.html.contains("John Doe"));
//! ```

mod autolink;
pub mod dom;
mod error;
mod links;
mod mime;
mod options;
mod parser;
mod quotations;
mod remote;
pub mod selector;
mod signatures;
mod styles;
mod types;
mod viewport;

pub use autolink::autolink;
pub use dom::Document;
pub use error::{ParseError, Result};
pub use links::{enhance_links, repair_href};
pub use mime::{html_body, parse_raw_email, text_to_html};
pub use options::ParseOptions;
pub use parser::parse_message;
pub use quotations::{find_quotations, remove_quotations};
pub use remote::{RemoteReplacements, TRANSPARENT_PIXEL, is_remote, rewrite_remote_content};
pub use selector::{Selector, SiblingRun, siblings_until};
pub use signatures::{SignatureRegion, find_all_signatures, remove_signatures};
pub use styles::{inject_style, strip_styles};
pub use types::*;
pub use viewport::enforce_viewport;
