use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid locator '{locator}': {reason}")]
    InvalidLocator { locator: String, reason: String },

    #[error("locator '{0}' has no object name")]
    MissingName(String),

    #[error("no content type exists for '{0}'")]
    UnknownContentType(String),

    #[error("content type token is not valid UTF-8: {0}")]
    InvalidEncoding(String),

    #[error("'{0}' is not a Dublin Core element")]
    UnknownElement(String),

    #[error("'{value}' is not a Dublin Core date: {reason}")]
    InvalidDate { value: String, reason: String },
}
