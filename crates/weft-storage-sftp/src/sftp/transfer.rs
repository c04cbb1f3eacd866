// ── Transfers — chunked file copies and recursive tree retrieve/store ────────

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use filetime::FileTime;
use log::debug;
use ssh2::{OpenFlags, OpenType, Sftp};
use weft_storage_core::error::{Result, StorageError};

use crate::sftp::object::SftpObject;
use crate::sftp::pool::remote_error;
use crate::sftp::walk::readdir_entries;

const CHUNK_SIZE: usize = 1_048_576; // 1 MiB

impl SftpObject {
    pub(crate) fn retrieve_file(&self, local: &Path) -> Result<()> {
        self.conn
            .with_sftp(|sftp| download_file(sftp, self.remote_path(), local))
    }

    /// Fetch the whole remote tree below the query path into `local_root`,
    /// preserving file mtimes.
    pub(crate) fn retrieve_tree(&self, local_root: &Path) -> Result<()> {
        self.conn.with_sftp(|sftp| {
            let remote_root = self.remote_path();
            fs::create_dir_all(local_root)?;

            let mut stack: Vec<PathBuf> = vec![remote_root.to_path_buf()];
            while let Some(dir) = stack.pop() {
                let local_dir = local_root.join(rel_to(remote_root, &dir));
                fs::create_dir_all(&local_dir)?;

                for (path, stat) in readdir_entries(sftp, &dir)? {
                    if stat.is_dir() {
                        stack.push(path);
                    } else {
                        let target = local_root.join(rel_to(remote_root, &path));
                        download_file(sftp, &path, &target)?;
                    }
                }
            }
            Ok(())
        })
    }

    pub(crate) fn store_file(&self, local: &Path) -> Result<()> {
        let sync_mtime = !self.settings.not_sync_mtime;
        self.conn.with_sftp(|sftp| {
            if let Some(parent) = self.remote_path().parent() {
                mkdir_p(sftp, &parent.to_string_lossy())?;
            }
            upload_file(sftp, local, self.remote_path(), sync_mtime)
        })
    }

    /// Upload the whole local tree below `local_root` to the query path,
    /// creating remote directories as needed.
    pub(crate) fn store_tree(&self, local_root: &Path) -> Result<()> {
        let sync_mtime = !self.settings.not_sync_mtime;
        self.conn.with_sftp(|sftp| {
            let remote_root = self.remote_path();
            mkdir_p(sftp, &remote_root.to_string_lossy())?;

            let mut stack: Vec<PathBuf> = vec![local_root.to_path_buf()];
            while let Some(dir) = stack.pop() {
                for entry in fs::read_dir(&dir)? {
                    let entry = entry?;
                    let path = entry.path();
                    let remote = remote_root.join(rel_to(local_root, &path));
                    if entry.file_type()?.is_dir() {
                        mkdir_p(sftp, &remote.to_string_lossy())?;
                        stack.push(path);
                    } else {
                        upload_file(sftp, &path, &remote, sync_mtime)?;
                    }
                }
            }
            Ok(())
        })
    }
}

fn rel_to<'a>(root: &Path, path: &'a Path) -> &'a Path {
    path.strip_prefix(root).unwrap_or(path)
}

/// Treat a mid-transfer I/O failure as transport trouble, not local I/O:
/// reads and writes on an sftp channel fail through std::io.
fn transfer_io(context: String, err: std::io::Error) -> StorageError {
    if err.kind() == std::io::ErrorKind::TimedOut {
        StorageError::Timeout(format!("{}: {}", context, err))
    } else {
        StorageError::Connection(format!("{}: {}", context, err))
    }
}

fn download_file(sftp: &Sftp, remote: &Path, local: &Path) -> Result<()> {
    debug!("sftp: fetching {} -> {}", remote.display(), local.display());

    let mut remote_file = sftp
        .open(remote)
        .map_err(|e| remote_error("open", &remote.to_string_lossy(), &e))?;
    if let Some(parent) = local.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut local_file = fs::File::create(local)?;

    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = remote_file
            .read(&mut buf)
            .map_err(|e| transfer_io(format!("read {}", remote.display()), e))?;
        if n == 0 {
            break;
        }
        local_file.write_all(&buf[..n])?;
    }
    local_file.flush()?;
    drop(local_file);

    // retrieval always preserves the remote mtime
    let stat = sftp
        .stat(remote)
        .map_err(|e| remote_error("stat", &remote.to_string_lossy(), &e))?;
    if let Some(mtime) = stat.mtime {
        filetime::set_file_mtime(local, FileTime::from_unix_time(mtime as i64, 0))?;
    }
    Ok(())
}

fn upload_file(sftp: &Sftp, local: &Path, remote: &Path, sync_mtime: bool) -> Result<()> {
    debug!("sftp: storing {} -> {}", local.display(), remote.display());

    let metadata = fs::metadata(local)?;
    let mut local_file = fs::File::open(local)?;
    let mut remote_file = sftp
        .open_mode(
            remote,
            OpenFlags::WRITE | OpenFlags::CREATE | OpenFlags::TRUNCATE,
            0o644,
            OpenType::File,
        )
        .map_err(|e| remote_error("open", &remote.to_string_lossy(), &e))?;

    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut written: u64 = 0;
    loop {
        let n = local_file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        remote_file
            .write_all(&buf[..n])
            .map_err(|e| transfer_io(format!("write {}", remote.display()), e))?;
        written += n as u64;
    }
    // close the handle before confirming
    drop(remote_file);

    // confirmed transfer: a short write must not pass for a stored object
    let stat = sftp
        .stat(remote)
        .map_err(|e| remote_error("stat", &remote.to_string_lossy(), &e))?;
    let arrived = stat.size.unwrap_or(0);
    if arrived != written {
        return Err(StorageError::Remote(format!(
            "upload of {} truncated: {} of {} bytes arrived",
            remote.display(),
            arrived,
            written
        )));
    }

    if sync_mtime {
        if let Ok(modified) = metadata.modified() {
            let secs = modified
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0);
            set_remote_mtime(sftp, remote, secs)?;
        }
    }
    Ok(())
}

fn set_remote_mtime(sftp: &Sftp, remote: &Path, mtime: u64) -> Result<()> {
    // re-stat so atime stays populated; libssh2 transmits both times
    let mut stat = sftp
        .stat(remote)
        .map_err(|e| remote_error("stat", &remote.to_string_lossy(), &e))?;
    stat.mtime = Some(mtime);
    sftp.setstat(remote, stat)
        .map_err(|e| remote_error("setstat", &remote.to_string_lossy(), &e))
}

/// Create `path` and any missing parents, like `mkdir -p`.
fn mkdir_p(sftp: &Sftp, path: &str) -> Result<()> {
    let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let mut current = String::new();

    for part in parts {
        current.push('/');
        current.push_str(part);

        if sftp.stat(Path::new(&current)).is_ok() {
            continue;
        }
        if let Err(e) = sftp.mkdir(Path::new(&current), 0o755) {
            // another worker may have created it first
            if sftp.stat(Path::new(&current)).is_err() {
                return Err(remote_error("mkdir", &current, &e));
            }
        }
    }
    Ok(())
}
