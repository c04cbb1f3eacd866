//! Provider-side contract: query validation, rate-limiter signals and the
//! storage-object factory.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One class of remote-facing operation, passed alongside the query when
/// the engine asks for a rate-limiter key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Exists,
    Mtime,
    Size,
    Retrieve,
    Store,
    Remove,
    Glob,
}

/// An example query with a one-line description, surfaced in the engine's
/// backend listing.
#[derive(Debug, Clone)]
pub struct ExampleQuery {
    pub query: &'static str,
    pub description: &'static str,
}

/// Outcome of syntactic query validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryValidation {
    pub valid: bool,
    /// Human-readable cause, present iff `valid` is false.
    pub reason: Option<String>,
}

impl QueryValidation {
    pub fn valid() -> Self {
        Self {
            valid: true,
            reason: None,
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: Some(reason.into()),
        }
    }
}

/// A storage backend as seen by the engine.
///
/// One provider instance lives for the whole workflow run and owns the
/// backend's shared state (e.g. a connection pool); objects it hands out
/// borrow that state.
pub trait StorageProvider {
    type Object;

    /// Example query with description for documentation and discovery.
    fn example_query() -> ExampleQuery
    where
        Self: Sized;

    /// Purely syntactic validation. Queries still carrying unresolved
    /// `{wildcard}` placeholders must be accepted.
    fn is_valid_query(query: &str) -> QueryValidation
    where
        Self: Sized;

    /// Whether operations through this provider are rate limited.
    fn use_rate_limiter(&self) -> bool {
        true
    }

    /// Conservative request rate applied when the user configures none.
    fn default_max_requests_per_second(&self) -> f64;

    /// Bucket key for the engine's rate limiter, e.g. the remote authority.
    fn rate_limiter_key(&self, query: &str, operation: Operation) -> String;

    /// Enumerate all objects reachable under a bare query. Backends with
    /// no cheap listing primitive return [`StorageError::Unsupported`].
    ///
    /// [`StorageError::Unsupported`]: crate::error::StorageError::Unsupported
    fn list_objects(&self, query: &str) -> Result<Vec<String>>;

    /// Bind a storage object to a resolved (placeholder-free) query.
    fn storage_object(&self, query: &str) -> Result<Self::Object>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_constructors() {
        let ok = QueryValidation::valid();
        assert!(ok.valid);
        assert!(ok.reason.is_none());

        let bad = QueryValidation::invalid("missing remote path");
        assert!(!bad.valid);
        assert_eq!(bad.reason.as_deref(), Some("missing remote path"));
    }

    #[test]
    fn test_validation_serialises_camel_case() {
        let json = serde_json::to_string(&QueryValidation::invalid("no scheme")).unwrap();
        assert!(json.contains("\"valid\":false"));
        assert!(json.contains("\"reason\":\"no scheme\""));
    }
}
