// ── Storage object bound to one resolved query ───────────────────────────────

use std::path::Path;
use std::sync::Arc;

use weft_storage_core::error::Result;
use weft_storage_core::inventory::InventoryCache;
use weft_storage_core::object::{
    StorageObject, StorageObjectGlob, StorageObjectRead, StorageObjectWrite,
};
use weft_storage_core::retry::RetryPolicy;

use crate::sftp::pool::{remote_error, SftpConnection};
use crate::sftp::query::SftpQuery;
use crate::sftp::types::SftpSettings;

/// One remote file or directory, addressed by a resolved sftp query and
/// served through a pooled session.
pub struct SftpObject {
    raw_query: String,
    pub(crate) query: SftpQuery,
    pub(crate) conn: Arc<SftpConnection>,
    pub(crate) settings: Arc<SftpSettings>,
    retry: RetryPolicy,
}

impl SftpObject {
    pub(crate) fn new(
        raw_query: String,
        query: SftpQuery,
        conn: Arc<SftpConnection>,
        settings: Arc<SftpSettings>,
    ) -> Self {
        let retry = settings.retry_policy();
        Self {
            raw_query,
            query,
            conn,
            settings,
            retry,
        }
    }

    /// The pooled connection backing this object.
    pub fn connection(&self) -> &Arc<SftpConnection> {
        &self.conn
    }

    pub(crate) fn remote_path(&self) -> &Path {
        Path::new(&self.query.path)
    }

    fn stat(&self) -> Result<ssh2::FileStat> {
        self.conn.with_sftp(|sftp| {
            sftp.stat(self.remote_path())
                .map_err(|e| remote_error("stat", &self.query.path, &e))
        })
    }

    fn is_dir(&self) -> Result<bool> {
        match self.stat() {
            Ok(stat) => Ok(stat.is_dir()),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}

impl StorageObject for SftpObject {
    fn query(&self) -> &str {
        &self.raw_query
    }

    fn local_suffix(&self) -> String {
        self.query.local_suffix()
    }

    fn inventory(&self, _cache: &mut dyn InventoryCache) -> Result<()> {
        // nothing is known without a round-trip, which is exactly what the
        // inventory is trying to avoid; record nothing
        Ok(())
    }

    fn inventory_parent(&self) -> Option<String> {
        None
    }

    fn cleanup(&self) {}
}

impl StorageObjectRead for SftpObject {
    fn exists(&self) -> Result<bool> {
        self.retry.run("exists", || match self.stat() {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        })
    }

    fn mtime(&self) -> Result<f64> {
        self.retry.run("mtime", || {
            let stat = self.conn.with_sftp(|sftp| {
                sftp.lstat(self.remote_path())
                    .map_err(|e| remote_error("lstat", &self.query.path, &e))
            })?;
            Ok(stat.mtime.unwrap_or(0) as f64)
        })
    }

    fn size(&self) -> Result<u64> {
        self.retry.run("size", || {
            let stat = self.stat()?;
            Ok(stat.size.unwrap_or(0))
        })
    }

    fn retrieve(&self, local_path: &Path) -> Result<()> {
        self.retry.run("retrieve", || {
            if self.is_dir()? {
                self.retrieve_tree(local_path)
            } else {
                self.retrieve_file(local_path)
            }
        })
    }
}

impl StorageObjectWrite for SftpObject {
    fn store(&self, local_path: &Path) -> Result<()> {
        self.retry.run("store", || {
            if local_path.is_dir() {
                self.store_tree(local_path)
            } else {
                self.store_file(local_path)
            }
        })
    }

    fn remove(&self) -> Result<()> {
        self.retry.run("remove", || {
            let is_dir = self.is_dir()?;
            self.conn.with_sftp(|sftp| {
                if is_dir {
                    // standard rmdir semantics: fails if the directory is
                    // not empty
                    sftp.rmdir(self.remote_path())
                        .map_err(|e| remote_error("rmdir", &self.query.path, &e))
                } else {
                    sftp.unlink(self.remote_path())
                        .map_err(|e| remote_error("unlink", &self.query.path, &e))
                }
            })
        })
    }
}

impl StorageObjectGlob for SftpObject {
    fn list_candidate_matches(&self) -> Result<Vec<String>> {
        self.retry.run("glob", || self.candidate_matches())
    }
}
