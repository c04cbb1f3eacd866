// ── Known-hosts lookup aware of non-default ports ────────────────────────────
//
// OpenSSH known_hosts files record a server listening on a non-default
// port under `[host]:port`; only port-22 entries use the bare host name.
// The lookup key is reformatted here before delegating to the unmodified
// ssh2 known-hosts store.

use std::path::{Path, PathBuf};

use log::warn;
use ssh2::{CheckResult, KnownHostFileKind, Session};
use weft_storage_core::error::{Result, StorageError};

use crate::sftp::types::DEFAULT_PORT;

/// Key under which `host:port` appears in a known_hosts file.
pub fn lookup_name(host: &str, port: u16) -> String {
    if port == DEFAULT_PORT {
        host.to_string()
    } else {
        format!("[{}]:{}", host, port)
    }
}

fn default_known_hosts() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".ssh").join("known_hosts"))
}

/// Verify the server's host key against the known-hosts store.
///
/// A missing store file disables verification (logged); a mismatching or
/// unknown key fails the connection attempt.
pub(crate) fn verify_host_key(
    session: &Session,
    host: &str,
    port: u16,
    known_hosts_path: Option<&Path>,
) -> Result<()> {
    let path = match known_hosts_path
        .map(PathBuf::from)
        .or_else(default_known_hosts)
    {
        Some(path) if path.exists() => path,
        _ => {
            warn!(
                "sftp: no known_hosts file found, skipping host key verification for {}",
                lookup_name(host, port)
            );
            return Ok(());
        }
    };

    let mut store = session
        .known_hosts()
        .map_err(|e| StorageError::HostKey(format!("cannot open known-hosts store: {}", e)))?;
    store
        .read_file(&path, KnownHostFileKind::OpenSSH)
        .map_err(|e| {
            StorageError::HostKey(format!("cannot read {}: {}", path.display(), e))
        })?;

    let (key, _key_type) = session.host_key().ok_or_else(|| {
        StorageError::HostKey(format!("server {} sent no host key", lookup_name(host, port)))
    })?;

    let name = lookup_name(host, port);
    match store.check(&name, key) {
        CheckResult::Match => Ok(()),
        CheckResult::Mismatch => Err(StorageError::HostKey(format!(
            "host key for {} does not match the known_hosts entry",
            name
        ))),
        CheckResult::NotFound => Err(StorageError::HostKey(format!(
            "no known_hosts entry for {}",
            name
        ))),
        CheckResult::Failure => Err(StorageError::HostKey(format!(
            "known-hosts check failed for {}",
            name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_port_uses_bare_host() {
        assert_eq!(lookup_name("example.com", 22), "example.com");
    }

    #[test]
    fn test_non_default_port_uses_bracketed_form() {
        assert_eq!(lookup_name("example.com", 2222), "[example.com]:2222");
    }
}
