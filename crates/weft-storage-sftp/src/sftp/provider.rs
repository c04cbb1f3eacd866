// ── Storage provider — validation, rate-limit keys, object factory ───────────

use std::sync::Arc;

use weft_storage_core::error::{Result, StorageError};
use weft_storage_core::provider::{ExampleQuery, Operation, QueryValidation, StorageProvider};

use crate::sftp::object::SftpObject;
use crate::sftp::pool::ConnectionPool;
use crate::sftp::query::{self, SftpQuery};
use crate::sftp::types::SftpSettings;

/// SFTP storage backend. One instance lives for the whole workflow run
/// and owns the connection pool its objects share.
pub struct SftpStorageProvider {
    settings: Arc<SftpSettings>,
    pool: ConnectionPool,
}

impl SftpStorageProvider {
    pub fn new(settings: SftpSettings) -> Self {
        let settings = Arc::new(settings.with_env_credentials());
        Self {
            pool: ConnectionPool::new(settings.clone()),
            settings,
        }
    }

    pub fn settings(&self) -> &SftpSettings {
        &self.settings
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }
}

impl StorageProvider for SftpStorageProvider {
    type Object = SftpObject;

    fn example_query() -> ExampleQuery {
        ExampleQuery {
            query: "sftp://ftpserver.com:22/myfile.txt",
            description: "A file on an sftp server. The port is optional and defaults to 22.",
        }
    }

    fn is_valid_query(query: &str) -> QueryValidation {
        query::validate(query)
    }

    fn default_max_requests_per_second(&self) -> f64 {
        // sftp servers commonly throttle; stay conservative by default
        1.0
    }

    fn rate_limiter_key(&self, query: &str, _operation: Operation) -> String {
        // all operations against one host share one bucket
        SftpQuery::parse(query)
            .map(|q| q.authority())
            .unwrap_or_default()
    }

    fn list_objects(&self, _query: &str) -> Result<Vec<String>> {
        Err(StorageError::Unsupported(
            "sftp cannot enumerate objects without a concrete path prefix".to_string(),
        ))
    }

    fn storage_object(&self, query: &str) -> Result<SftpObject> {
        let parsed = SftpQuery::parse(query)?;
        let conn = self.pool.get(&parsed.host, parsed.port_or_default())?;
        Ok(SftpObject::new(
            query.to_string(),
            parsed,
            conn,
            self.settings.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limiter_key_is_the_authority() {
        let provider = SftpStorageProvider::new(SftpSettings::default());
        assert_eq!(
            provider.rate_limiter_key("sftp://example.com:2222/data/a.txt", Operation::Exists),
            "example.com:2222"
        );
        assert_eq!(
            provider.rate_limiter_key("sftp://example.com/data/a.txt", Operation::Store),
            "example.com"
        );
    }

    #[test]
    fn test_operations_share_one_bucket_per_host() {
        let provider = SftpStorageProvider::new(SftpSettings::default());
        let key = |op| provider.rate_limiter_key("sftp://h:2200/x", op);
        assert_eq!(key(Operation::Exists), key(Operation::Retrieve));
        assert_eq!(key(Operation::Store), key(Operation::Glob));
    }

    #[test]
    fn test_listing_is_unsupported() {
        let provider = SftpStorageProvider::new(SftpSettings::default());
        let err = provider.list_objects("sftp://h/").unwrap_err();
        assert!(matches!(err, StorageError::Unsupported(_)));
    }

    #[test]
    fn test_rate_limiting_enabled_with_conservative_default() {
        let provider = SftpStorageProvider::new(SftpSettings::default());
        assert!(provider.use_rate_limiter());
        assert_eq!(provider.default_max_requests_per_second(), 1.0);
    }

    #[test]
    fn test_example_query_validates() {
        let example = SftpStorageProvider::example_query();
        assert!(SftpStorageProvider::is_valid_query(example.query).valid);
        assert!(!example.description.is_empty());
    }

    #[test]
    fn test_wildcard_queries_validate() {
        assert!(SftpStorageProvider::is_valid_query("sftp://h/data/{sample}.txt").valid);
    }
}
