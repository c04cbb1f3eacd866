// ── Connection pool — authenticated sessions keyed by (host, port) ───────────

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use log::{debug, info};
use ssh2::{ErrorCode, Session, Sftp};
use weft_storage_core::error::{Result, StorageError};

use crate::sftp::hostkey;
use crate::sftp::types::{SessionInfo, SftpSettings};

pub(crate) type ConnectionKey = (String, u16);

// ── ssh2 error classification ────────────────────────────────────────────────

// SFTP status codes (draft-ietf-secsh-filexfer-02 §7, as used by libssh2)
const FX_NO_SUCH_FILE: i32 = 2;
const FX_PERMISSION_DENIED: i32 = 3;
const FX_NO_CONNECTION: i32 = 6;
const FX_CONNECTION_LOST: i32 = 7;
const FX_NO_SUCH_PATH: i32 = 10;

/// Map an ssh2 failure onto the shared taxonomy. Session-level codes are
/// transport trouble and retryable; SFTP status codes are server verdicts
/// and mostly final.
pub(crate) fn remote_error(context: &str, path: &str, err: &ssh2::Error) -> StorageError {
    match err.code() {
        ErrorCode::SFTP(code) => match code {
            FX_NO_SUCH_FILE | FX_NO_SUCH_PATH => {
                StorageError::NotFound(format!("{}: {}", path, err))
            }
            FX_PERMISSION_DENIED => {
                StorageError::Remote(format!("{} '{}': permission denied", context, path))
            }
            FX_NO_CONNECTION | FX_CONNECTION_LOST => {
                StorageError::Connection(format!("{} '{}': {}", context, path, err))
            }
            _ => StorageError::Remote(format!("{} '{}': {}", context, path, err)),
        },
        ErrorCode::Session(_) => StorageError::Connection(format!("{} '{}': {}", context, path, err)),
    }
}

// ── One pooled session ───────────────────────────────────────────────────────

struct SessionState {
    session: Session,
    #[allow(dead_code)] // held to keep the TCP connection alive
    tcp: TcpStream,
    info: SessionInfo,
}

/// One live authenticated session to a remote host.
///
/// All use of the session funnels through the inner lock: libssh2
/// sessions are not safe for concurrent operations, so storage objects
/// sharing a connection serialise here.
pub struct SftpConnection {
    host: String,
    port: u16,
    state: Mutex<SessionState>,
}

impl SftpConnection {
    pub(crate) fn connect(host: &str, port: u16, settings: &SftpSettings) -> Result<Self> {
        let addr = format!("{}:{}", host, port);
        info!("sftp: connecting to {}", addr);

        let timeout = Duration::from_secs(settings.connect_timeout_secs);
        let tcp = connect_tcp(&addr, timeout)?;
        tcp.set_read_timeout(Some(timeout * 2)).ok();
        tcp.set_write_timeout(Some(timeout)).ok();

        let mut session = Session::new()
            .map_err(|e| StorageError::Connection(format!("cannot create ssh session: {}", e)))?;
        session.set_tcp_stream(
            tcp.try_clone()
                .map_err(|e| StorageError::Connection(format!("cannot clone socket: {}", e)))?,
        );
        session
            .handshake()
            .map_err(|e| StorageError::Connection(format!("ssh handshake with {} failed: {}", addr, e)))?;

        hostkey::verify_host_key(
            &session,
            host,
            port,
            settings.known_hosts_path.as_deref().map(Path::new),
        )?;

        let auth_method = authenticate(&mut session, settings, &addr)?;
        info!("sftp: authenticated to {} via {}", addr, auth_method);

        if settings.keepalive_interval_secs > 0 {
            session.set_keepalive(true, settings.keepalive_interval_secs as u32);
        }

        let now = Utc::now();
        Ok(Self {
            host: host.to_string(),
            port,
            state: Mutex::new(SessionState {
                session,
                tcp,
                info: SessionInfo {
                    host: host.to_string(),
                    port,
                    auth_method,
                    connected_at: now,
                    last_activity: now,
                    operations_count: 0,
                },
            }),
        })
    }

    /// Run `f` against a fresh SFTP channel on this session. The session
    /// lock is held for the whole call, serialising concurrent objects.
    pub(crate) fn with_sftp<T>(&self, f: impl FnOnce(&Sftp) -> Result<T>) -> Result<T> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| StorageError::Connection(format!("session lock for {} poisoned", self.host)))?;
        let sftp = state.session.sftp().map_err(|e| {
            StorageError::Connection(format!(
                "cannot open sftp channel to {}:{}: {}",
                self.host, self.port, e
            ))
        })?;
        state.info.last_activity = Utc::now();
        state.info.operations_count += 1;
        f(&sftp)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn info(&self) -> Option<SessionInfo> {
        self.state.lock().ok().map(|state| state.info.clone())
    }
}

fn connect_tcp(addr: &str, timeout: Duration) -> Result<TcpStream> {
    let addrs = addr
        .to_socket_addrs()
        .map_err(|e| StorageError::Connection(format!("cannot resolve {}: {}", addr, e)))?;
    let mut last_err = None;
    for sock_addr in addrs {
        match TcpStream::connect_timeout(&sock_addr, timeout) {
            Ok(tcp) => return Ok(tcp),
            Err(e) => last_err = Some(e),
        }
    }
    Err(match last_err {
        Some(e) if e.kind() == std::io::ErrorKind::TimedOut => {
            StorageError::Timeout(format!("tcp connect to {}: {}", addr, e))
        }
        Some(e) => StorageError::Connection(format!("tcp connect to {} failed: {}", addr, e)),
        None => StorageError::Connection(format!("{} resolved to no addresses", addr)),
    })
}

// ── Authentication ───────────────────────────────────────────────────────────

fn authenticate(session: &mut Session, settings: &SftpSettings, addr: &str) -> Result<String> {
    let username = settings
        .username
        .clone()
        .or_else(|| std::env::var("USER").ok())
        .ok_or_else(|| {
            StorageError::Remote(format!("no username configured for {}", addr))
        })?;

    // Agent and default key files only when no password was configured.
    if settings.password.is_none() {
        if let Ok(mut agent) = session.agent() {
            if agent.connect().is_ok() {
                let _ = agent.list_identities();
                for identity in agent.identities().unwrap_or_default() {
                    if agent.userauth(&username, &identity).is_ok() && session.authenticated() {
                        return Ok("agent".to_string());
                    }
                }
            }
        }

        if let Some(ssh_dir) = dirs::home_dir().map(|home| home.join(".ssh")) {
            for name in &["id_ed25519", "id_rsa", "id_ecdsa"] {
                let key = ssh_dir.join(name);
                if key.exists() {
                    debug!("sftp: trying key file {}", key.display());
                    if session
                        .userauth_pubkey_file(&username, None, &key, None)
                        .is_ok()
                        && session.authenticated()
                    {
                        return Ok(format!("publickey({})", name));
                    }
                }
            }
        }
    }

    // Password, with keyboard-interactive fallback.
    if let Some(ref password) = settings.password {
        if session.userauth_password(&username, password).is_ok() && session.authenticated() {
            return Ok("password".to_string());
        }

        struct PasswordPrompt {
            password: String,
        }

        impl ssh2::KeyboardInteractivePrompt for PasswordPrompt {
            fn prompt(
                &mut self,
                _username: &str,
                _instructions: &str,
                prompts: &[ssh2::Prompt],
            ) -> Vec<String> {
                prompts.iter().map(|_| self.password.clone()).collect()
            }
        }

        let mut prompt = PasswordPrompt {
            password: password.clone(),
        };
        if session
            .userauth_keyboard_interactive(&username, &mut prompt)
            .is_ok()
            && session.authenticated()
        {
            return Ok("keyboard-interactive".to_string());
        }
    }

    Err(StorageError::Remote(format!(
        "authentication failed for {}@{}: no method succeeded",
        username, addr
    )))
}

// ── Pool ─────────────────────────────────────────────────────────────────────

/// Keyed cache of live sessions, shared by every storage object one
/// provider hands out.
///
/// The map lock is held across the miss-path connect, so two objects
/// racing for the same key cannot create duplicate sessions. Cache hits
/// are returned unchanged: a stale session surfaces as a failure on the
/// next remote call and is handled by that operation's retry wrapper,
/// not by the pool.
pub struct ConnectionPool {
    settings: Arc<SftpSettings>,
    connections: Mutex<HashMap<ConnectionKey, Arc<SftpConnection>>>,
}

impl ConnectionPool {
    pub(crate) fn new(settings: Arc<SftpSettings>) -> Self {
        Self {
            settings,
            connections: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, host: &str, port: u16) -> Result<Arc<SftpConnection>> {
        let mut connections = self
            .connections
            .lock()
            .map_err(|_| StorageError::Connection("connection pool lock poisoned".to_string()))?;
        match connections.entry((host.to_string(), port)) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(slot) => {
                let conn = Arc::new(SftpConnection::connect(host, port, &self.settings)?);
                Ok(slot.insert(conn).clone())
            }
        }
    }

    /// Diagnostics for every pooled session.
    pub fn sessions(&self) -> Vec<SessionInfo> {
        self.connections
            .lock()
            .map(|map| map.values().filter_map(|conn| conn.info()).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sftp_not_found_codes_classify_as_not_found() {
        for code in [FX_NO_SUCH_FILE, FX_NO_SUCH_PATH] {
            let err = ssh2::Error::new(ErrorCode::SFTP(code), "no such file");
            assert!(remote_error("stat", "/x", &err).is_not_found());
        }
    }

    #[test]
    fn test_permission_denied_is_fatal() {
        let err = ssh2::Error::new(ErrorCode::SFTP(FX_PERMISSION_DENIED), "permission denied");
        let mapped = remote_error("unlink", "/x", &err);
        assert!(!mapped.is_transient());
        assert!(matches!(mapped, StorageError::Remote(_)));
    }

    #[test]
    fn test_connection_level_codes_are_transient() {
        let lost = ssh2::Error::new(ErrorCode::SFTP(FX_CONNECTION_LOST), "connection lost");
        assert!(remote_error("stat", "/x", &lost).is_transient());

        let session = ssh2::Error::new(ErrorCode::Session(-7), "socket send");
        assert!(remote_error("stat", "/x", &session).is_transient());
    }

    #[test]
    fn test_other_sftp_codes_are_remote_rejections() {
        // FX_FAILURE (4): e.g. rmdir on a non-empty directory
        let err = ssh2::Error::new(ErrorCode::SFTP(4), "failure");
        let mapped = remote_error("rmdir", "/dir", &err);
        assert!(matches!(mapped, StorageError::Remote(_)));
        assert!(!mapped.is_transient());
    }
}
