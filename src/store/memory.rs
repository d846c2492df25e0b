//! In-memory user store
//!
//! Backs the JSON file store and the tests. When constructed with a role
//! resolver, every save recomputes the user's roles from their personas, the
//! way the host system applies persona roles on save.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::trace;

use crate::error::Result;
use crate::persona::PersonaRoleResolver;

use super::traits::{User, UserId, UserStore};

/// User store held in a `BTreeMap`, so queries return ids in ascending order.
#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<BTreeMap<UserId, User>>,
    resolver: Option<PersonaRoleResolver>,
    save_count: RwLock<u64>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `users`.
    pub fn with_users(users: impl IntoIterator<Item = User>) -> Self {
        let store = Self::new();
        {
            let mut map = store.users.write();
            for user in users {
                map.insert(user.uid, user);
            }
        }
        store
    }

    /// Recompute roles through `resolver` on every save.
    pub fn with_role_sync(mut self, resolver: PersonaRoleResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Insert or replace a user without counting it as a save.
    pub fn insert(&self, user: User) {
        self.users.write().insert(user.uid, user);
    }

    pub fn get(&self, uid: UserId) -> Option<User> {
        self.users.read().get(&uid).cloned()
    }

    /// Snapshot of every user in uid order.
    pub fn users(&self) -> Vec<User> {
        self.users.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }

    /// Number of successful saves since creation.
    pub fn save_count(&self) -> u64 {
        *self.save_count.read()
    }

    /// The record a save of `user` would store, with roles recomputed.
    pub(crate) fn prepare(&self, user: &User) -> User {
        let mut user = user.clone();
        if let Some(ref resolver) = self.resolver {
            resolver.sync_roles(&mut user);
        }
        user
    }

    /// Snapshot of every user in uid order with `user` in place.
    pub(crate) fn users_with(&self, user: &User) -> Vec<User> {
        let mut users = self.users.read().clone();
        users.insert(user.uid, user.clone());
        users.into_values().collect()
    }

    /// Store a prepared record and count it as a save.
    pub(crate) fn commit(&self, user: User) {
        trace!(uid = user.uid, "User stored");
        self.users.write().insert(user.uid, user);
        *self.save_count.write() += 1;
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn query_user_ids_by_persona(&self, persona_id: &str) -> Result<Vec<UserId>> {
        Ok(self
            .users
            .read()
            .values()
            .filter(|u| u.references(persona_id))
            .map(|u| u.uid)
            .collect())
    }

    async fn load_users(&self, ids: &[UserId]) -> Result<BTreeMap<UserId, User>> {
        let users = self.users.read();
        Ok(ids
            .iter()
            .filter_map(|id| users.get(id).map(|u| (*id, u.clone())))
            .collect())
    }

    async fn save_user(&self, user: &User) -> Result<()> {
        self.commit(self.prepare(user));
        Ok(())
    }
}
