//! Localization errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum L10nError {
    #[error("Malformed translation bundle: {0}")]
    MalformedBundle(String),

    #[error("Invalid translation catalog: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported plural forms: {0}")]
    UnsupportedPluralRule(String),

    #[error("Invalid locale: {0}")]
    InvalidLocale(String),
}

pub type L10nResult<T> = Result<T, L10nError>;
