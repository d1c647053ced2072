//! Result types produced by the normalization pipeline

use serde::Serialize;

/// Outcome of one extraction pass (quotations or signatures)
///
/// `did_find == false` always comes with empty text and HTML; the fields are
/// private so the triple cannot drift out of sync.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    did_find: bool,
    plain_text: Option<String>,
    html: Option<String>,
}

impl ExtractionResult {
    #[must_use]
    pub const fn not_found() -> Self {
        Self {
            did_find: false,
            plain_text: None,
            html: None,
        }
    }

    #[must_use]
    pub const fn found(plain_text: String, html: String) -> Self {
        Self {
            did_find: true,
            plain_text: Some(plain_text),
            html: Some(html),
        }
    }

    #[must_use]
    pub const fn did_find(&self) -> bool {
        self.did_find
    }

    /// Extracted content as plain text
    #[must_use]
    pub fn plain_text(&self) -> Option<&str> {
        self.plain_text.as_deref()
    }

    /// Extracted content as HTML
    #[must_use]
    pub fn html(&self) -> Option<&str> {
        self.html.as_deref()
    }
}

/// A remote URL that was rewritten
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteRewrite {
    /// URL as found in the message
    pub url: String,

    /// Value written in its place
    pub replacement: String,
}

/// The normalized message
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseResult {
    /// Cleaned HTML document
    pub html: String,

    /// Signature removed from the message
    pub signature: ExtractionResult,

    /// Quoted previous message(s) removed from the message
    pub quotation: ExtractionResult,

    /// Remote URLs rewritten by the remote-content pass
    pub remote_content: Vec<RemoteRewrite>,
}
