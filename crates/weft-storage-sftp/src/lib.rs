//! weft-storage-sftp — remote storage for workflow runs over SFTP.
//!
//! Lets the engine treat `sftp://host[:port]/path` locations as storage:
//!   • Pooled authenticated sessions keyed by host:port
//!   • Existence / mtime / size queries, retrieval, upload, removal
//!   • Wildcard candidate discovery under the constant query prefix
//!   • Bounded retry with backoff around every remote round-trip

pub mod sftp;

pub use sftp::object::SftpObject;
pub use sftp::provider::SftpStorageProvider;
pub use sftp::query::SftpQuery;
pub use sftp::types::SftpSettings;
