//! Metadata refinement against an external citation database.
//!
//! A [`MetadataService`] looks every document of a collection up and returns
//! the refined records it found together with the documents it could not find.
//! Refinement is best-effort: callers treat any [`RefineError`] as a reason to
//! continue with the unrefined collection.

#[cfg(feature = "scopus")]
mod scopus;

#[cfg(feature = "scopus")]
pub use scopus::{ScopusClient, ScopusConfig};

use crate::{Document, DocumentCollection};
use thiserror::Error;

/// Error types for metadata refinement
#[derive(Debug, Error)]
pub enum RefineError {
    #[error("No API key configured for {0}")]
    MissingCredentials(String),

    #[error("Authentication rejected by {service} (HTTP {status})")]
    Unauthorized { service: String, status: u16 },

    #[error("Rate limited by {0}")]
    RateLimited(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Unexpected response: {0}")]
    InvalidResponse(String),

    #[error("Refinement unavailable: {0}")]
    Unavailable(String),
}

/// Outcome of a successful refinement.
#[derive(Debug, Clone, Default)]
pub struct Refinement {
    /// One slot per looked-up document; `None` marks a slot the service
    /// could not fill with a record.
    pub found: Vec<Option<Document>>,
    /// Documents the service has no record of, unchanged.
    pub not_found: Vec<Document>,
}

impl Refinement {
    /// The refined documents, with empty slots dropped.
    pub fn into_found(self) -> DocumentCollection {
        self.found.into_iter().flatten().collect()
    }
}

/// A service that enriches documents with authoritative metadata.
pub trait MetadataService {
    /// Name used in log messages.
    fn name(&self) -> &str;

    /// Looks up every document of `documents`.
    ///
    /// # Errors
    ///
    /// Any error means the refinement as a whole failed.
    fn refine(&self, documents: &DocumentCollection) -> Result<Refinement, RefineError>;
}

/// Stand-in service for builds without an HTTP client; always fails.
#[derive(Debug, Clone, Default)]
pub struct UnavailableService;

impl MetadataService for UnavailableService {
    fn name(&self) -> &str {
        "unavailable"
    }

    fn refine(&self, _documents: &DocumentCollection) -> Result<Refinement, RefineError> {
        Err(RefineError::Unavailable(
            "built without scopus support".to_string(),
        ))
    }
}

/// The metadata service used by the binary for a given API key.
#[cfg(feature = "scopus")]
pub fn default_service(api_key: Option<String>) -> Box<dyn MetadataService> {
    Box::new(ScopusClient::new(ScopusConfig {
        api_key,
        ..Default::default()
    }))
}

/// The metadata service used by the binary for a given API key.
#[cfg(not(feature = "scopus"))]
pub fn default_service(_api_key: Option<String>) -> Box<dyn MetadataService> {
    Box::new(UnavailableService)
}
