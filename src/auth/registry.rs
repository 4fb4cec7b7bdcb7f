//! In-memory user directory, mirrored to the store. Registration and
//! credential issuance are external-collaborator concerns the matching core
//! never touches directly; this is the thin layer that implements them.

use crate::auth::api_key::generate_api_key;
use crate::models::{Role, User};
use crate::store::Store;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

pub struct UserRegistry {
    by_id: DashMap<Uuid, User>,
    by_api_key: DashMap<String, Uuid>,
    store: Arc<dyn Store>,
}

impl UserRegistry {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            by_id: DashMap::new(),
            by_api_key: DashMap::new(),
            store,
        }
    }

    /// Users are looked up lazily (see `find_by_api_key`/`get`) rather than
    /// paged in bulk at startup, so there's nothing to preload here. The
    /// hook exists so callers don't need to know that and the lazy-load
    /// policy can change without touching `main.rs`.
    pub async fn recover_from_store(&self) -> Result<(), crate::store::StoreError> {
        Ok(())
    }

    pub fn register(&self, name: String, role: Role) -> User {
        let user = User {
            id: Uuid::new_v4(),
            name,
            role,
            api_key: generate_api_key(),
            created_at: Utc::now(),
        };
        self.by_id.insert(user.id, user.clone());
        self.by_api_key.insert(user.api_key.clone(), user.id);

        let store = self.store.clone();
        let to_persist = user.clone();
        tokio::spawn(async move {
            if let Err(e) = store.save_user(&to_persist).await {
                error!("failed to persist user {}: {}", to_persist.id, e);
            }
        });

        user
    }

    /// Checks the in-memory cache first; on a miss, falls back to the store
    /// so a user registered before the last restart can still authenticate.
    pub async fn find_by_api_key(&self, api_key: &str) -> Result<Option<User>, crate::store::StoreError> {
        if let Some(id) = self.by_api_key.get(api_key).map(|id| *id) {
            if let Some(user) = self.by_id.get(&id) {
                return Ok(Some(user.clone()));
            }
        }
        match self.store.find_user_by_api_key(api_key).await? {
            Some(user) => {
                self.cache(&user);
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<User>, crate::store::StoreError> {
        if let Some(user) = self.by_id.get(&id) {
            return Ok(Some(user.clone()));
        }
        match self.store.get_user(id).await? {
            Some(user) => {
                self.cache(&user);
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    fn cache(&self, user: &User) {
        self.by_id.insert(user.id, user.clone());
        self.by_api_key.insert(user.api_key.clone(), user.id);
    }

    pub fn delete(&self, id: Uuid) -> bool {
        if let Some((_, user)) = self.by_id.remove(&id) {
            self.by_api_key.remove(&user.api_key);
            let store = self.store.clone();
            tokio::spawn(async move {
                if let Err(e) = store.delete_user(id).await {
                    error!("failed to persist user deletion {}: {}", id, e);
                }
            });
            true
        } else {
            false
        }
    }
}
