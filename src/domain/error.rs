//! Domain error types.

use crate::domain::listing::OfferType;

/// Top-level error type for priceband.
#[derive(Debug, thiserror::Error)]
pub enum PricebandError {
    #[error("invalid {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("listing store unavailable: {reason}")]
    StoreUnavailable { reason: String },

    #[error("listing store query error: {reason}")]
    StoreQuery { reason: String },

    #[error("band export failed: {reason}")]
    Export { reason: String },

    #[error("no {offer} band at rank {rank} ({available} available)")]
    BandNotFound {
        offer: OfferType,
        rank: usize,
        available: usize,
    },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PricebandError {
    pub fn invalid_input(field: &str, reason: impl Into<String>) -> Self {
        PricebandError::InvalidInput {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// Store failures are transient from the caller's point of view; the
    /// pipeline itself never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PricebandError::StoreUnavailable { .. } | PricebandError::StoreQuery { .. }
        )
    }
}

impl From<&PricebandError> for std::process::ExitCode {
    fn from(err: &PricebandError) -> Self {
        let code: u8 = match err {
            PricebandError::Io(_) | PricebandError::Export { .. } => 1,
            PricebandError::ConfigParse { .. }
            | PricebandError::ConfigMissing { .. }
            | PricebandError::ConfigInvalid { .. } => 2,
            PricebandError::StoreUnavailable { .. } | PricebandError::StoreQuery { .. } => 3,
            PricebandError::InvalidInput { .. } => 4,
            PricebandError::BandNotFound { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
