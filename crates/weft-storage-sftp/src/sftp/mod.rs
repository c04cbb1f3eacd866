// ── weft-storage-sftp / sftp module ──────────────────────────────────────────
//
// SFTP storage backend providing:
//   • Query parsing / validation for sftp://host[:port]/path
//   • A (host, port)-keyed pool of authenticated ssh2 sessions
//   • Known-hosts lookup aware of non-default ports ([host]:port entries)
//   • Storage objects: exists / mtime / size / retrieve / store / remove
//   • Recursive tree transfer with mtime preservation & confirmed uploads
//   • Wildcard candidate discovery under the constant query prefix

pub mod hostkey;
pub mod object;
pub mod pool;
pub mod provider;
pub mod query;
pub mod transfer;
pub mod types;
pub mod walk;

pub use object::SftpObject;
pub use pool::{ConnectionPool, SftpConnection};
pub use provider::SftpStorageProvider;
pub use query::SftpQuery;
pub use types::{SessionInfo, SftpSettings};
