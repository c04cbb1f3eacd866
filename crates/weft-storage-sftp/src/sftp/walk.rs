// ── Wildcard candidate discovery under the constant query prefix ─────────────

use std::path::{Path, PathBuf};

use ssh2::{FileStat, Sftp};
use weft_storage_core::error::Result;
use weft_storage_core::wildcard::constant_prefix;

use crate::sftp::object::SftpObject;
use crate::sftp::pool::remote_error;

impl SftpObject {
    /// Concrete remote paths matching the wildcarded query: every file
    /// below the constant prefix plus every empty subdirectory. A prefix
    /// naming a plain file yields just that path; a missing prefix yields
    /// nothing.
    pub(crate) fn candidate_matches(&self) -> Result<Vec<String>> {
        let prefix = constant_prefix(&self.query.path);
        if prefix.is_empty() {
            return Ok(Vec::new());
        }

        self.conn.with_sftp(|sftp| {
            let stat = match sftp.stat(Path::new(prefix)) {
                Ok(stat) => stat,
                Err(e) => {
                    let mapped = remote_error("stat", prefix, &e);
                    if mapped.is_not_found() {
                        return Ok(Vec::new());
                    }
                    return Err(mapped);
                }
            };

            let mut items = Vec::new();
            if stat.is_dir() {
                let entries = readdir_entries(sftp, Path::new(prefix))?;
                collect_candidates(sftp, entries, &mut items)?;
            } else {
                items.push(prefix.to_string());
            }
            Ok(items)
        })
    }
}

/// Directory listing with `.`/`..` filtered out.
pub(crate) fn readdir_entries(sftp: &Sftp, dir: &Path) -> Result<Vec<(PathBuf, FileStat)>> {
    let entries = sftp
        .readdir(dir)
        .map_err(|e| remote_error("readdir", &dir.to_string_lossy(), &e))?;
    Ok(entries
        .into_iter()
        .filter(|(path, _)| {
            !matches!(
                path.file_name().and_then(|name| name.to_str()),
                Some(".") | Some("..")
            )
        })
        .collect())
}

/// Depth-first walk over a directory listing. Every file is a candidate;
/// a directory is a candidate only when empty — otherwise its contents
/// stand in for it.
fn collect_candidates(
    sftp: &Sftp,
    entries: Vec<(PathBuf, FileStat)>,
    out: &mut Vec<String>,
) -> Result<()> {
    for (path, stat) in entries {
        if stat.is_dir() {
            let children = readdir_entries(sftp, &path)?;
            if children.is_empty() {
                out.push(path.to_string_lossy().into_owned());
            } else {
                collect_candidates(sftp, children, out)?;
            }
        } else {
            out.push(path.to_string_lossy().into_owned());
        }
    }
    Ok(())
}
