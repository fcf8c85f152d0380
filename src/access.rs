//! Caller identity and the recipient's unlock gate.
//!
//! A caller becomes authenticated by giving an email in the organisation's
//! domain. The fixed recipient is additionally elevated after presenting the
//! shared secret. Both facts live in an explicit `Session` that is persisted
//! between invocations in `sessions.json`, keyed by session id.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::AccessConfig;
use crate::store::write_json_atomic;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccessError {
    #[error("Only {0} emails allowed")]
    WrongDomain(String),
    #[error("Not logged in; run `assign-task login <email>` first")]
    NotAuthenticated,
    #[error("This view is only accessible to {0}")]
    NotRecipient(String),
    #[error("Locked; run `assign-task unlock` first")]
    Locked,
    #[error("Incorrect password")]
    BadSecret,
}

/// A verified caller email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity(String);

impl Identity {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Accept `email` when it ends with the organisation's domain suffix.
pub fn verify_email(email: &str, domain: &str) -> Result<Identity, AccessError> {
    let email = email.trim();
    let local_part = email.strip_suffix(domain).unwrap_or_default();
    if domain.is_empty() || local_part.is_empty() {
        return Err(AccessError::WrongDomain(domain.to_string()));
    }
    Ok(Identity(email.to_string()))
}

/// Per-session state that the views consult instead of global flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(default)]
    pub authenticated: bool,
    #[serde(default)]
    pub elevated: bool,
    /// Task whose edit form is open in the TUI.
    #[serde(default)]
    pub editing: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            ..Self::default()
        }
    }

    /// Authenticate with an email. A rejected email clears any previous login.
    pub fn login(&mut self, email: &str, cfg: &AccessConfig) -> Result<Identity, AccessError> {
        self.elevated = false;
        self.editing = None;
        match verify_email(email, &cfg.domain) {
            Ok(identity) => {
                self.user_email = Some(identity.as_str().to_string());
                self.authenticated = true;
                info!("event=login status=ok session={}", self.id);
                Ok(identity)
            }
            Err(e) => {
                self.user_email = None;
                self.authenticated = false;
                warn!("event=login status=rejected session={}", self.id);
                Err(e)
            }
        }
    }

    /// Elevate the recipient after checking the shared secret.
    pub fn unlock(&mut self, secret: &str, cfg: &AccessConfig) -> Result<(), AccessError> {
        let caller = self.caller()?;
        if caller.as_str() != cfg.recipient {
            return Err(AccessError::NotRecipient(cfg.recipient.clone()));
        }
        if cfg.recipient_secret.is_empty() || secret != cfg.recipient_secret {
            warn!("event=unlock status=rejected session={}", self.id);
            return Err(AccessError::BadSecret);
        }
        self.elevated = true;
        info!("event=unlock status=ok session={}", self.id);
        Ok(())
    }

    /// The authenticated caller.
    pub fn caller(&self) -> Result<Identity, AccessError> {
        match (&self.user_email, self.authenticated) {
            (Some(email), true) => Ok(Identity(email.clone())),
            _ => Err(AccessError::NotAuthenticated),
        }
    }

    /// The caller, provided it is the recipient and the session is unlocked.
    pub fn require_recipient(&self, cfg: &AccessConfig) -> Result<Identity, AccessError> {
        let caller = self.caller()?;
        if caller.as_str() != cfg.recipient {
            return Err(AccessError::NotRecipient(cfg.recipient.clone()));
        }
        if !self.elevated {
            return Err(AccessError::Locked);
        }
        Ok(caller)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionFile {
    #[serde(default)]
    current: Option<String>,
    #[serde(default)]
    sessions: BTreeMap<String, Session>,
}

/// Sessions persisted as JSON, with one marked current.
pub struct SessionStore {
    path: PathBuf,
    file: SessionFile,
}

impl SessionStore {
    /// Load the session file; a missing or unreadable file starts fresh.
    pub fn load(path: &Path) -> Self {
        let file = Self::read(path).unwrap_or_else(|e| {
            if path.exists() {
                warn!("event=session_load status=degraded error={e}");
            }
            SessionFile::default()
        });
        Self {
            path: path.to_path_buf(),
            file,
        }
    }

    fn read(path: &Path) -> std::io::Result<SessionFile> {
        let mut buf = String::new();
        File::open(path)?.read_to_string(&mut buf)?;
        Ok(serde_json::from_str(&buf)?)
    }

    pub fn save(&self) -> std::io::Result<()> {
        write_json_atomic(&self.path, &serde_json::to_string_pretty(&self.file)?)
    }

    /// The current session, created on first use.
    pub fn current(&mut self) -> &mut Session {
        let existing = self
            .file
            .current
            .clone()
            .filter(|id| self.file.sessions.contains_key(id));
        let id = match existing {
            Some(id) => id,
            None => {
                let session = Session::new();
                let id = session.id.clone();
                self.file.sessions.insert(id.clone(), session);
                self.file.current = Some(id.clone());
                id
            }
        };
        self.file.sessions.entry(id.clone()).or_insert_with(|| Session {
            id,
            ..Session::default()
        })
    }

    #[cfg(test)]
    pub fn get(&self, id: &str) -> Option<&Session> {
        self.file.sessions.get(id)
    }

    /// Drop the current session.
    pub fn end_current(&mut self) -> Option<Session> {
        let id = self.file.current.take()?;
        self.file.sessions.remove(&id)
    }
}
