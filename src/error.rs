//! Error types for message normalization

use thiserror::Error;

/// Errors that can occur while normalizing a message
#[derive(Error, Debug)]
pub enum ParseError {
    /// A configuration value was rejected before any processing started
    #[error("Invalid option {option}: {details}")]
    InvalidOption { option: String, details: String },

    /// A selector could not be parsed
    #[error("Invalid selector `{selector}`: {details}")]
    InvalidSelector { selector: String, details: String },

    /// The cleaned document could not be serialized
    #[error("Failed to serialize document: {0}")]
    Serialize(String),

    /// Failed to decode a raw message
    #[error("Failed to decode message: {0}")]
    Decode(String),

    /// The raw message had neither an HTML nor a text body
    #[error("Message has no body")]
    MissingBody,
}

impl ParseError {
    pub(crate) fn option(option: &str, details: impl Into<String>) -> Self {
        Self::InvalidOption {
            option: option.to_string(),
            details: details.into(),
        }
    }
}

/// Result type for normalization operations
pub type Result<T> = std::result::Result<T, ParseError>;
