//! Authentication session lifecycle.
//!
//! A session moves from anonymous to authenticated on login and back on
//! logout or on any 401/403 from a protected call. The token and student id
//! are persisted through a `TokenStore` under the `access_token` and
//! `student_id` keys.

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::ApiError;

pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const STUDENT_ID_KEY: &str = "student_id";

/// Key-value store holding the persisted session.
pub trait TokenStore {
    fn get(&self, key: &str) -> Result<Option<String>, ApiError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), ApiError>;
    fn remove(&mut self, key: &str) -> Result<(), ApiError>;
}

/// In-process store; nothing survives the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryTokenStore {
    entries: HashMap<String, String>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, key: &str) -> Result<Option<String>, ApiError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), ApiError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), ApiError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// JSON object on disk, one entry per key. The file is created with mode
/// 0600 on unix. `get` reports a corrupt file; `set` and `remove` replace it.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<BTreeMap<String, String>, ApiError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let raw = fs::read_to_string(&self.path).map_err(|e| {
            ApiError::TokenStore(format!("read {}: {e}", self.path.display()))
        })?;
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&raw)
            .map_err(|e| ApiError::TokenStore(format!("parse {}: {e}", self.path.display())))
    }

    /// Entries to update; an unreadable file starts over empty.
    fn read_for_update(&self) -> BTreeMap<String, String> {
        self.read().unwrap_or_else(|e| {
            warn!(error = %e, "discarding unreadable session file");
            BTreeMap::new()
        })
    }

    fn write(&self, entries: &BTreeMap<String, String>) -> Result<(), ApiError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                ApiError::TokenStore(format!("mkdir {}: {e}", parent.display()))
            })?;
        }
        let raw = serde_json::to_string_pretty(entries)
            .map_err(|e| ApiError::TokenStore(e.to_string()))?;

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options
            .open(&self.path)
            .map_err(|e| ApiError::TokenStore(format!("open {}: {e}", self.path.display())))?;

        // `mode` only applies on creation; tighten a pre-existing file before
        // the token lands in it.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(fs::Permissions::from_mode(0o600))
                .map_err(|e| {
                    ApiError::TokenStore(format!("chmod {}: {e}", self.path.display()))
                })?;
        }

        file.write_all(raw.as_bytes())
            .map_err(|e| ApiError::TokenStore(format!("write {}: {e}", self.path.display())))
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self, key: &str) -> Result<Option<String>, ApiError> {
        Ok(self.read()?.remove(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), ApiError> {
        let mut entries = self.read_for_update();
        entries.insert(key.to_string(), value.to_string());
        self.write(&entries)
    }

    fn remove(&mut self, key: &str) -> Result<(), ApiError> {
        let (mut entries, corrupt) = match self.read() {
            Ok(entries) => (entries, false),
            Err(e) => {
                warn!(error = %e, "discarding unreadable session file");
                (BTreeMap::new(), true)
            }
        };
        if entries.remove(key).is_some() || corrupt {
            self.write(&entries)?;
        }
        Ok(())
    }
}

/// Bearer token plus the student it was issued to.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub token: String,
    pub student_id: String,
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("token", &"<redacted>")
            .field("student_id", &self.student_id)
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Anonymous,
    Authenticated(AuthSession),
}

/// Owns the session state and keeps it in sync with the store.
#[derive(Debug)]
pub struct SessionManager<S> {
    store: S,
    state: SessionState,
}

impl<S: TokenStore> SessionManager<S> {
    /// Starts anonymous; call `restore` to pick up a persisted session.
    pub fn new(store: S) -> Self {
        Self {
            store,
            state: SessionState::Anonymous,
        }
    }

    /// Load the persisted session. Both keys must be present and non-empty.
    /// An unreadable store leaves the session anonymous.
    pub fn restore(&mut self) -> &SessionState {
        let persisted = self
            .store
            .get(ACCESS_TOKEN_KEY)
            .and_then(|token| Ok((token, self.store.get(STUDENT_ID_KEY)?)));
        self.state = match persisted {
            Ok((Some(token), Some(student_id))) if !token.is_empty() && !student_id.is_empty() => {
                info!(%student_id, "restored persisted session");
                SessionState::Authenticated(AuthSession { token, student_id })
            }
            Ok(_) => SessionState::Anonymous,
            Err(e) => {
                warn!(error = %e, "persisted session is unreadable, starting anonymous");
                SessionState::Anonymous
            }
        };
        &self.state
    }

    /// Anonymous -> authenticated.
    pub fn begin(&mut self, session: AuthSession) -> Result<(), ApiError> {
        self.store.set(ACCESS_TOKEN_KEY, &session.token)?;
        self.store.set(STUDENT_ID_KEY, &session.student_id)?;
        info!(student_id = %session.student_id, "session started");
        self.state = SessionState::Authenticated(session);
        Ok(())
    }

    /// Authenticated -> anonymous. Clears both persisted keys.
    pub fn end(&mut self) -> Result<(), ApiError> {
        self.state = SessionState::Anonymous;
        self.store.remove(ACCESS_TOKEN_KEY)?;
        self.store.remove(STUDENT_ID_KEY)?;
        info!("session ended");
        Ok(())
    }

    pub fn require_token(&self) -> Result<&str, ApiError> {
        match &self.state {
            SessionState::Authenticated(session) => Ok(&session.token),
            SessionState::Anonymous => Err(ApiError::NotAuthenticated),
        }
    }

    /// Apply the forced logout policy to a failed protected call.
    ///
    /// Returns true if the session was ended.
    pub fn observe(&mut self, error: &ApiError) -> bool {
        if !matches!(error, ApiError::Api { status: 401 | 403, .. }) || !self.is_authenticated() {
            return false;
        }
        warn!(status = ?error.status(), "protected call rejected, ending session");
        if let Err(e) = self.end() {
            warn!(error = %e, "failed to clear persisted session");
        }
        true
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, SessionState::Authenticated(_))
    }

    pub fn student_id(&self) -> Option<&str> {
        match &self.state {
            SessionState::Authenticated(session) => Some(&session.student_id),
            SessionState::Anonymous => None,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> AuthSession {
        AuthSession {
            token: "abc123".to_string(),
            student_id: "2022-1-60-001".to_string(),
        }
    }

    #[test]
    fn begin_persists_both_keys() {
        let mut manager = SessionManager::new(MemoryTokenStore::new());
        manager.begin(session()).unwrap();
        assert!(manager.is_authenticated());
        assert_eq!(manager.require_token().unwrap(), "abc123");
        assert_eq!(
            manager.store().get(ACCESS_TOKEN_KEY).unwrap().as_deref(),
            Some("abc123")
        );
        assert_eq!(
            manager.store().get(STUDENT_ID_KEY).unwrap().as_deref(),
            Some("2022-1-60-001")
        );
    }

    #[test]
    fn end_clears_store() {
        let mut manager = SessionManager::new(MemoryTokenStore::new());
        manager.begin(session()).unwrap();
        manager.end().unwrap();
        assert_eq!(manager.state(), &SessionState::Anonymous);
        assert_eq!(manager.store().get(ACCESS_TOKEN_KEY).unwrap(), None);
        assert_eq!(manager.store().get(STUDENT_ID_KEY).unwrap(), None);
        assert_eq!(manager.require_token(), Err(ApiError::NotAuthenticated));
    }

    #[test]
    fn restore_needs_token_and_student_id() {
        let mut store = MemoryTokenStore::new();
        store.set(ACCESS_TOKEN_KEY, "abc123").unwrap();
        let mut manager = SessionManager::new(store);
        assert_eq!(manager.restore(), &SessionState::Anonymous);

        let mut store = MemoryTokenStore::new();
        store.set(ACCESS_TOKEN_KEY, "abc123").unwrap();
        store.set(STUDENT_ID_KEY, "2022-1-60-001").unwrap();
        let mut manager = SessionManager::new(store);
        assert_eq!(
            manager.restore(),
            &SessionState::Authenticated(session())
        );
    }

    #[test]
    fn observe_logs_out_on_unauthorized_and_forbidden() {
        for status in [401, 403] {
            let mut manager = SessionManager::new(MemoryTokenStore::new());
            manager.begin(session()).unwrap();
            let err = ApiError::Api {
                message: "token expired".to_string(),
                status,
            };
            assert!(manager.observe(&err));
            assert!(!manager.is_authenticated());
            assert_eq!(manager.store().get(ACCESS_TOKEN_KEY).unwrap(), None);
        }
    }

    #[test]
    fn observe_keeps_session_on_other_errors() {
        let mut manager = SessionManager::new(MemoryTokenStore::new());
        manager.begin(session()).unwrap();
        let errors = [
            ApiError::Api {
                message: "not found".to_string(),
                status: 404,
            },
            ApiError::Transport {
                message: "timed out".to_string(),
            },
        ];
        for err in &errors {
            assert!(!manager.observe(err));
        }
        assert!(manager.is_authenticated());
    }

    #[test]
    fn debug_output_hides_the_token() {
        let rendered = format!("{:?}", session());
        assert!(!rendered.contains("abc123"));
        assert!(rendered.contains("2022-1-60-001"));
    }

    #[test]
    fn file_store_round_trips_and_removes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");
        let mut store = FileTokenStore::new(&path);
        assert_eq!(store.get(ACCESS_TOKEN_KEY).unwrap(), None);

        store.set(ACCESS_TOKEN_KEY, "abc123").unwrap();
        store.set(STUDENT_ID_KEY, "2022-1-60-001").unwrap();
        let reopened = FileTokenStore::new(&path);
        assert_eq!(reopened.get(ACCESS_TOKEN_KEY).unwrap().as_deref(), Some("abc123"));

        store.remove(ACCESS_TOKEN_KEY).unwrap();
        assert_eq!(reopened.get(ACCESS_TOKEN_KEY).unwrap(), None);
        assert_eq!(
            reopened.get(STUDENT_ID_KEY).unwrap().as_deref(),
            Some("2022-1-60-001")
        );
    }

    #[cfg(unix)]
    #[test]
    fn file_store_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let mut store = FileTokenStore::new(&path);
        store.set(ACCESS_TOKEN_KEY, "abc123").unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn corrupt_file_is_a_store_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{not json").unwrap();
        let store = FileTokenStore::new(&path);
        assert!(matches!(store.get(ACCESS_TOKEN_KEY), Err(ApiError::TokenStore(_))));
    }

    #[test]
    fn corrupt_file_restores_anonymous_and_end_rewrites_it() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{not json").unwrap();

        let mut manager = SessionManager::new(FileTokenStore::new(&path));
        assert_eq!(manager.restore(), &SessionState::Anonymous);

        manager.end().unwrap();
        assert_eq!(manager.store().get(ACCESS_TOKEN_KEY).unwrap(), None);

        manager.begin(session()).unwrap();
        let mut reopened = SessionManager::new(FileTokenStore::new(&path));
        assert_eq!(
            reopened.restore(),
            &SessionState::Authenticated(session())
        );
    }

    #[test]
    fn set_replaces_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "[1, 2").unwrap();
        let mut store = FileTokenStore::new(&path);
        store.set(ACCESS_TOKEN_KEY, "abc123").unwrap();
        assert_eq!(store.get(ACCESS_TOKEN_KEY).unwrap().as_deref(), Some("abc123"));
    }

    #[cfg(unix)]
    #[test]
    fn pre_existing_readable_file_is_made_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{}").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        let mut store = FileTokenStore::new(&path);
        store.set(ACCESS_TOKEN_KEY, "abc123").unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
