//! Capability traits for storage objects.
//!
//! Split by ability so a backend implements only what its protocol can
//! honour: a read-only archive skips [`StorageObjectWrite`], a backend
//! without server-side discovery skips [`StorageObjectGlob`].

use std::path::Path;

use crate::error::Result;
use crate::inventory::InventoryCache;

/// Behaviour common to every storage object, independent of direction.
pub trait StorageObject {
    /// The resolved query this object is bound to.
    fn query(&self) -> &str;

    /// Deterministic relative path under the engine's staging area.
    /// Must not collide across different remote locations serving the
    /// same path.
    fn local_suffix(&self) -> String;

    /// Opportunistically record existence/mtime facts that are already
    /// known, without extra remote round-trips. The default records
    /// nothing, which is always safe.
    fn inventory(&self, cache: &mut dyn InventoryCache) -> Result<()> {
        let _ = cache;
        Ok(())
    }

    /// Logical parent grouping key for inventory purposes, if cheaply
    /// determinable.
    fn inventory_parent(&self) -> Option<String> {
        None
    }

    /// Release local scratch resources. Must not delete the materialised
    /// object itself; the engine owns that.
    fn cleanup(&self) {}
}

/// Objects that can be queried and fetched.
pub trait StorageObjectRead: StorageObject {
    /// True iff the remote path is present, as file or directory.
    fn exists(&self) -> Result<bool>;

    /// Remote modification time, seconds since the epoch. Fails with
    /// `NotFound` if the path is absent.
    fn mtime(&self) -> Result<f64>;

    /// Remote size in bytes. Fails with `NotFound` if the path is absent.
    fn size(&self) -> Result<u64>;

    /// Materialise the object at `local_path`, recursively for
    /// directories. Modification times are preserved on retrieval.
    fn retrieve(&self, local_path: &Path) -> Result<()>;
}

/// Objects that can be stored and removed.
pub trait StorageObjectWrite: StorageObjectRead {
    /// Upload the materialisation at `local_path` to the remote path,
    /// recursively for directories.
    fn store(&self, local_path: &Path) -> Result<()>;

    /// Delete the remote path. Directories are removed non-recursively.
    fn remove(&self) -> Result<()>;
}

/// Objects whose query may contain `{wildcard}` placeholders that can be
/// resolved against the remote side.
pub trait StorageObjectGlob: StorageObject {
    /// Concrete, placeholder-free remote paths found under the constant
    /// prefix of the query. Callers back-resolve wildcard bindings from
    /// the returned strings.
    fn list_candidate_matches(&self) -> Result<Vec<String>>;
}
