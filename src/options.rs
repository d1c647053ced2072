//! Parse options and their validation

use crate::error::{ParseError, Result};
use crate::remote::RemoteReplacements;
use crate::viewport::viewport_content;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Options controlling which passes [`crate::parse_message`] runs
///
/// Deserializes from the camelCase JSON shape used by callers:
///
/// ```
/// use email_normalize::ParseOptions;
///
/// let options = ParseOptions::from_json(concat!(
///     r#"{"cleanSignatures": true, "forceViewport": "width=device-width", "#,
///     r#""includeStyle": false}"#,
/// ))
/// .unwrap();
/// assert!(options.clean_signatures);
/// assert_eq!(options.force_viewport.as_deref(), Some("width=device-width"));
/// assert_eq!(options.include_style, None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParseOptions {
    /// Strip quoted replies
    pub clean_quotations: bool,
    /// Extract and strip the sender's signature
    pub clean_signatures: bool,
    /// Turn bare URLs and addresses into links
    pub autolink: bool,
    /// Repair hrefs and add titles
    pub enhance_links: bool,
    /// Viewport content to enforce, or a whole `<meta>` tag
    #[serde(with = "string_or_false")]
    pub force_viewport: Option<String>,
    /// Neutralize remote URLs
    pub no_remote_content: bool,
    /// Exact URL or `/regex/` to replacement
    pub remote_content_replacements: BTreeMap<String, String>,
    /// Stylesheet appended to the head
    #[serde(with = "string_or_false")]
    pub include_style: Option<String>,
    /// Strip styles that would affect the host page
    pub clean_styles: bool,
}

/// What the option values compile to
#[derive(Debug)]
pub(crate) struct Plan {
    pub viewport: Option<String>,
    pub style: Option<String>,
    pub replacements: RemoteReplacements,
}

impl ParseOptions {
    /// Options from their JSON form
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| ParseError::option("options", e.to_string()))
    }

    /// Check every option value without parsing anything
    pub fn validate(&self) -> Result<()> {
        self.plan().map(|_| ())
    }

    pub(crate) fn plan(&self) -> Result<Plan> {
        let viewport = self
            .force_viewport
            .as_deref()
            .map(viewport_content)
            .transpose()?;

        let style = match self.include_style.as_deref() {
            Some(css) if css.to_ascii_lowercase().contains("</style") => {
                return Err(ParseError::option(
                    "includeStyle",
                    "stylesheet must not close the <style> element",
                ));
            }
            Some(css) if css.trim().is_empty() => None,
            Some(css) => Some(css.to_string()),
            None => None,
        };

        let replacements = RemoteReplacements::compile(&self.remote_content_replacements)?;

        Ok(Plan {
            viewport,
            style,
            replacements,
        })
    }
}

/// `string | false` in JSON, `Option<String>` in Rust
mod string_or_false {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Flag(bool),
        Text(String),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Raw>::deserialize(deserializer)? {
            None | Some(Raw::Flag(false)) => Ok(None),
            Some(Raw::Flag(true)) => Err(D::Error::custom("expected a string or false, got true")),
            Some(Raw::Text(text)) => Ok(Some(text)),
        }
    }

    #[allow(clippy::ref_option)]
    pub fn serialize<S>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(text) => serializer.serialize_str(text),
            None => serializer.serialize_bool(false),
        }
    }
}
