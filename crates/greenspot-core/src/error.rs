//! Error types for greenspot

use thiserror::Error;

/// Main error type for greenspot
#[derive(Error, Debug)]
pub enum GreenspotError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Missing or malformed request field
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// No offer satisfies the job constraints in any scanned region
    #[error("No suitable offer found: {0}")]
    NoSuitableOfferFound(String),

    /// A price, weather or carbon collaborator failed or timed out
    #[error("Upstream {signal} signal unavailable for {region}: {reason}")]
    UpstreamSignalUnavailable {
        signal: String,
        region: String,
        reason: String,
    },

    /// Region is not part of the catalog
    #[error("Unknown region: {0}")]
    UnknownRegion(String),

    /// Availability zone is not part of the catalog
    #[error("Unknown availability zone: {0}")]
    UnknownZone(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GreenspotError {
    /// Short machine-readable kind, used in API error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            GreenspotError::Config(_) => "config",
            GreenspotError::InvalidRequest(_) => "invalid_request",
            GreenspotError::NoSuitableOfferFound(_) => "no_suitable_offer_found",
            GreenspotError::UpstreamSignalUnavailable { .. } => "upstream_signal_unavailable",
            GreenspotError::UnknownRegion(_) => "unknown_region",
            GreenspotError::UnknownZone(_) => "unknown_zone",
            GreenspotError::Io(_) => "io",
            GreenspotError::Serialization(_) => "serialization",
            GreenspotError::Internal(_) => "internal",
        }
    }

    /// Whether the error was caused by the caller's input
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            GreenspotError::InvalidRequest(_)
                | GreenspotError::UnknownRegion(_)
                | GreenspotError::UnknownZone(_)
                | GreenspotError::NoSuitableOfferFound(_)
        )
    }
}

/// Result type for greenspot operations
pub type GreenspotResult<T> = Result<T, GreenspotError>;

impl From<serde_json::Error> for GreenspotError {
    fn from(err: serde_json::Error) -> Self {
        GreenspotError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for GreenspotError {
    fn from(err: toml::de::Error) -> Self {
        GreenspotError::Config(err.to_string())
    }
}
