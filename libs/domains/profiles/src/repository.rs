use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::models::{Profile, ProfileFilter};

/// Keyed document store for profiles.
///
/// Insert and save enforce the unique-e-mail constraint and required-field
/// validation, with the two failure modes distinguishable through
/// [`StoreError`]. A failed write must leave the stored document untouched.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Insert a new profile.
    async fn insert(&self, profile: Profile) -> StoreResult<Profile>;

    /// Fetch a profile by id.
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Profile>>;

    /// Fetch the first profile matching the filter exactly.
    async fn find_one(&self, filter: ProfileFilter) -> StoreResult<Option<Profile>>;

    /// Replace an existing stored profile, under the same constraints as
    /// insert.
    async fn save(&self, profile: Profile) -> StoreResult<Profile>;
}

/// Schema-level validation applied before any write.
fn validate_required(profile: &Profile) -> StoreResult<()> {
    if profile.email.is_empty() {
        return Err(StoreError::MissingField("email"));
    }
    if profile.credential.is_empty() {
        return Err(StoreError::MissingField("credential"));
    }
    if profile.full_name.is_empty() {
        return Err(StoreError::MissingField("full_name"));
    }
    if profile.birthday.is_none() {
        return Err(StoreError::MissingField("birthday"));
    }
    if profile.time_zone.is_empty() {
        return Err(StoreError::MissingField("time_zone"));
    }
    Ok(())
}

/// In-memory implementation of [`ProfileRepository`] (development/testing).
///
/// E-mail uniqueness compares exactly, matching the unique-index semantics
/// of the document store this stands in for.
#[derive(Debug, Default, Clone)]
pub struct InMemoryProfileRepository {
    profiles: Arc<RwLock<HashMap<Uuid, Profile>>>,
}

impl InMemoryProfileRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProfileRepository for InMemoryProfileRepository {
    async fn insert(&self, profile: Profile) -> StoreResult<Profile> {
        validate_required(&profile)?;

        let mut profiles = self.profiles.write().await;
        if profiles.values().any(|p| p.email == profile.email) {
            return Err(StoreError::DuplicateEmail(profile.email));
        }

        profiles.insert(profile.id, profile.clone());

        tracing::info!(profile_id = %profile.id, email = %profile.email, "Created profile");
        Ok(profile)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Profile>> {
        let profiles = self.profiles.read().await;
        Ok(profiles.get(&id).cloned())
    }

    async fn find_one(&self, filter: ProfileFilter) -> StoreResult<Option<Profile>> {
        let profiles = self.profiles.read().await;
        Ok(profiles.values().find(|p| filter.matches(p)).cloned())
    }

    async fn save(&self, profile: Profile) -> StoreResult<Profile> {
        validate_required(&profile)?;

        let mut profiles = self.profiles.write().await;
        if !profiles.contains_key(&profile.id) {
            return Err(StoreError::Backend(format!(
                "profile {} does not exist",
                profile.id
            )));
        }
        if profiles
            .values()
            .any(|p| p.id != profile.id && p.email == profile.email)
        {
            return Err(StoreError::DuplicateEmail(profile.email));
        }

        profiles.insert(profile.id, profile.clone());

        tracing::info!(profile_id = %profile.id, "Saved profile");
        Ok(profile)
    }
}
