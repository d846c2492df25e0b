//! JSON file user store
//!
//! The file holds a JSON array of users. It is read once on open; every save
//! rewrites it through a sibling temp file and a rename, so readers never see
//! a half-written file. The in-memory copy only changes once the rename has
//! succeeded, so a failed save leaves both disk and memory untouched.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::persona::PersonaRoleResolver;

use super::memory::InMemoryUserStore;
use super::traits::{User, UserId, UserStore};

/// User store persisted as a JSON array on disk.
pub struct JsonFileUserStore {
    path: PathBuf,
    inner: InMemoryUserStore,
    write_lock: Mutex<()>,
}

impl JsonFileUserStore {
    /// Open the store at `path`. A missing file is an error.
    pub fn open(path: impl Into<PathBuf>, resolver: Option<PersonaRoleResolver>) -> Result<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| Error::IoRead {
            path: path.clone(),
            source: e,
        })?;
        let users: Vec<User> = serde_json::from_str(&content)?;
        info!(path = %path.display(), count = users.len(), "User store opened");

        let mut inner = InMemoryUserStore::with_users(users);
        if let Some(resolver) = resolver {
            inner = inner.with_role_sync(resolver);
        }

        Ok(Self {
            path,
            inner,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, uid: UserId) -> Option<User> {
        self.inner.get(uid)
    }

    pub fn users(&self) -> Vec<User> {
        self.inner.users()
    }

    /// Write `users` to disk. Callers hold `write_lock`.
    async fn persist(&self, users: &[User]) -> Result<()> {
        let content = serde_json::to_string_pretty(users)?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content)
            .await
            .map_err(|e| Error::IoWrite {
                path: tmp.clone(),
                source: e,
            })?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(Error::IoWrite {
                path: self.path.clone(),
                source: e,
            });
        }

        debug!(path = %self.path.display(), count = users.len(), "User store written");
        Ok(())
    }

    /// Number of saves that reached disk.
    pub fn save_count(&self) -> u64 {
        self.inner.save_count()
    }
}

#[async_trait]
impl UserStore for JsonFileUserStore {
    async fn query_user_ids_by_persona(&self, persona_id: &str) -> Result<Vec<UserId>> {
        self.inner.query_user_ids_by_persona(persona_id).await
    }

    async fn load_users(&self, ids: &[UserId]) -> Result<BTreeMap<UserId, User>> {
        self.inner.load_users(ids).await
    }

    async fn save_user(&self, user: &User) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let record = self.inner.prepare(user);
        let snapshot = self.inner.users_with(&record);

        self.persist(&snapshot)
            .await
            .map_err(|e| Error::persistence(user.uid, e.to_string()))?;
        self.inner.commit(record);
        Ok(())
    }
}
