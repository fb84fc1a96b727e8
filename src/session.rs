//! Persisted login session.
//!
//! The backend hands out a bearer token and a role on login. Both live in a
//! small JSON file under the `token` and `role` keys so a restart does not
//! force a new login. The store is created at startup and handed to the
//! gateway; nothing else reads the file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::Role;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("failed to access session file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to encode session for {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

#[derive(Debug)]
pub struct SessionStore {
    path: Option<PathBuf>,
    session: Session,
}

impl SessionStore {
    /// Load the session saved at `path`. A missing file, or one that is not
    /// valid JSON, is an empty session.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SessionError> {
        let path = path.into();
        let session = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "ignoring malformed session file");
                Session::default()
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Session::default(),
            Err(source) => return Err(SessionError::Io { path, source }),
        };

        debug!(path = %path.display(), authenticated = session.is_authenticated(), "session loaded");

        Ok(Self {
            path: Some(path),
            session,
        })
    }

    /// A store that never touches the filesystem.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            session: Session::default(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn token(&self) -> Option<&str> {
        self.session.token.as_deref().filter(|t| !t.is_empty())
    }

    pub fn role(&self) -> Option<Role> {
        self.session.role
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn set(&mut self, token: impl Into<String>, role: Role) -> Result<(), SessionError> {
        self.session = Session {
            token: Some(token.into()),
            role: Some(role),
        };
        info!(%role, "session started");
        self.persist()
    }

    pub fn clear(&mut self) -> Result<(), SessionError> {
        self.session = Session::default();
        info!("session cleared");
        match &self.path {
            Some(path) => match fs::remove_file(path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                Err(source) => Err(SessionError::Io {
                    path: path.clone(),
                    source,
                }),
            },
            None => Ok(()),
        }
    }

    fn persist(&self) -> Result<(), SessionError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let io_err = |source| SessionError::Io {
            path: path.clone(),
            source,
        };

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(io_err)?;
        }
        let contents = serde_json::to_string_pretty(&self.session).map_err(|source| {
            SessionError::Encode {
                path: path.clone(),
                source,
            }
        })?;

        // Replace atomically.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, contents).map_err(io_err)?;
        fs::rename(&tmp, path).map_err(io_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_an_empty_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::open(dir.path().join("session.json")).unwrap();
        assert!(!store.session().is_authenticated());
        assert!(store.token().is_none());
    }

    #[test]
    fn set_persists_token_and_role_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let mut store = SessionStore::open(&path).unwrap();
        store.set("tok-123", Role::Admin).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["token"], "tok-123");
        assert_eq!(raw["role"], "admin");

        let reopened = SessionStore::open(&path).unwrap();
        assert_eq!(reopened.token(), Some("tok-123"));
        assert_eq!(reopened.role(), Some(Role::Admin));
    }

    #[test]
    fn clear_removes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let mut store = SessionStore::open(&path).unwrap();
        store.set("tok", Role::Client).unwrap();
        store.clear().unwrap();

        assert!(!path.exists());
        assert!(!store.session().is_authenticated());
        // Clearing twice is fine.
        store.clear().unwrap();
    }

    #[test]
    fn malformed_file_opens_as_signed_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{\"token\": \"tru").unwrap();

        let mut store = SessionStore::open(&path).unwrap();
        assert!(!store.session().is_authenticated());

        // Logging out still works and removes the broken file.
        store.clear().unwrap();
        assert!(!path.exists());

        fs::write(&path, "not json").unwrap();
        let mut store = SessionStore::open(&path).unwrap();
        store.set("fresh", Role::Admin).unwrap();
        assert_eq!(SessionStore::open(&path).unwrap().token(), Some("fresh"));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn empty_token_does_not_count() {
        let mut store = SessionStore::in_memory();
        store.set("", Role::Admin).unwrap();
        assert!(store.token().is_none());
        assert!(!store.session().is_authenticated());
    }
}
