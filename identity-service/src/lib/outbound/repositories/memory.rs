use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::identity::errors::AuthError;
use crate::domain::identity::errors::UniqueField;
use crate::domain::identity::models::EmailAddress;
use crate::domain::identity::models::Identity;
use crate::domain::identity::models::IdentityId;
use crate::domain::identity::models::Username;
use crate::domain::identity::ports::IdentityRepository;

#[derive(Default)]
struct Store {
    identities: HashMap<IdentityId, Identity>,
    by_username: HashMap<String, IdentityId>,
    by_email: HashMap<String, IdentityId>,
}

impl Store {
    fn lookup(&self, index: &HashMap<String, IdentityId>, key: &str) -> Option<Identity> {
        index
            .get(key)
            .and_then(|id| self.identities.get(id))
            .cloned()
    }
}

/// Process-local identity store.
///
/// Uniqueness is checked and the row inserted under the same write lock, so
/// two concurrent registrations for one username cannot both succeed.
#[derive(Default)]
pub struct InMemoryIdentityRepository {
    store: RwLock<Store>,
}

impl InMemoryIdentityRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.store.read().await.identities.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl IdentityRepository for InMemoryIdentityRepository {
    async fn create(&self, identity: Identity) -> Result<Identity, AuthError> {
        let mut store = self.store.write().await;

        if store.by_username.contains_key(identity.username.as_str()) {
            return Err(AuthError::UniquenessViolation(UniqueField::Username));
        }
        if store.by_email.contains_key(identity.email.as_str()) {
            return Err(AuthError::UniquenessViolation(UniqueField::Email));
        }

        store
            .by_username
            .insert(identity.username.as_str().to_string(), identity.id);
        store
            .by_email
            .insert(identity.email.as_str().to_string(), identity.id);
        store.identities.insert(identity.id, identity.clone());

        Ok(identity)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Identity>, AuthError> {
        let store = self.store.read().await;
        Ok(store.lookup(&store.by_username, username))
    }

    async fn find_by_username_or_email(
        &self,
        identifier: &str,
    ) -> Result<Option<Identity>, AuthError> {
        let store = self.store.read().await;
        Ok(store
            .lookup(&store.by_username, identifier)
            .or_else(|| store.lookup(&store.by_email, identifier)))
    }

    async fn exists_by_username(&self, username: &Username) -> Result<bool, AuthError> {
        Ok(self
            .store
            .read()
            .await
            .by_username
            .contains_key(username.as_str()))
    }

    async fn exists_by_email(&self, email: &EmailAddress) -> Result<bool, AuthError> {
        Ok(self
            .store
            .read()
            .await
            .by_email
            .contains_key(email.as_str()))
    }
}
