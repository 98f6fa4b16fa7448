use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::credential::{self, CredentialParams};
use crate::error::StoreError;
use crate::models::{NewProfile, Profile, ProfileChanges, ProfileFilter, ProfileView};
use crate::outcome::{FailureReason, OperationReport, ReasonEmitter};
use crate::repository::ProfileRepository;

/// Service layer for the profile lifecycle.
///
/// Operations do not stop at the first failure: every reason that applies
/// is reported, in a fixed emission order, through an [`OperationReport`].
/// Construct one instance at process start and pass it by handle.
#[derive(Clone)]
pub struct ProfileLifecycleService<R: ProfileRepository> {
    repository: Arc<R>,
    params: CredentialParams,
}

impl<R: ProfileRepository> ProfileLifecycleService<R> {
    pub fn new(repository: R, params: CredentialParams) -> Self {
        Self {
            repository: Arc::new(repository),
            params,
        }
    }

    /// Create a new profile.
    ///
    /// On a duplicate e-mail the conflicting record is re-read so its state
    /// can be reported alongside: `DuplicateEmail` first, then
    /// `InactiveProfile` and/or `UnconfirmedEmail` as they apply.
    pub async fn create_new_profile(&self, input: NewProfile) -> OperationReport {
        let mut emitter = ReasonEmitter::new();

        let encoded = match self.encode_credential(input.password.clone()).await {
            Ok(encoded) => encoded,
            Err(error) => {
                tracing::error!(error = %error, "Credential encoding failed");
                emitter.emit(FailureReason::Unknown);
                emitter.fail(error);
                return emitter.complete();
            }
        };

        let profile = Profile::new(input, encoded);
        let email = profile.email.clone();

        match self.repository.insert(profile).await {
            Ok(created) => {
                emitter.emit(FailureReason::None);
                emitter.created(created.id);
            }
            Err(StoreError::DuplicateEmail(_)) => {
                emitter.emit(FailureReason::DuplicateEmail);
                self.report_conflicting_profile(&email, &mut emitter).await;
            }
            Err(StoreError::MissingField(field)) => {
                tracing::warn!(email = %email, field, "Profile creation missing required field");
                emitter.emit(FailureReason::MissingRequired);
            }
            Err(error) => {
                tracing::error!(error = %error, email = %email, "Profile insert failed");
                emitter.emit(FailureReason::Unknown);
                emitter.fail(error);
            }
        }

        emitter.complete()
    }

    /// Update an existing profile from a partial change set.
    ///
    /// Applies a field-by-field diff against the stored document; a changed
    /// e-mail resets confirmation, a changed password is re-encoded with a
    /// fresh salt.
    pub async fn update_profile(
        &self,
        profile_id: Uuid,
        changes: ProfileChanges,
    ) -> OperationReport {
        let mut emitter = ReasonEmitter::new();

        let existing = match self.repository.find_by_id(profile_id).await {
            Ok(existing) => existing,
            Err(error) => {
                tracing::error!(error = %error, profile_id = %profile_id, "Profile lookup failed");
                emitter.emit(FailureReason::Unknown);
                emitter.fail(error);
                return emitter.complete();
            }
        };
        let Some(mut profile) = existing else {
            emitter.emit(FailureReason::NonExistentProfile);
            return emitter.complete();
        };

        let new_credential = match &changes.password {
            Some(plaintext) => match self.encode_credential(plaintext.clone()).await {
                Ok(encoded) => Some(encoded),
                Err(error) => {
                    tracing::error!(error = %error, profile_id = %profile_id, "Credential encoding failed");
                    emitter.emit(FailureReason::Unknown);
                    emitter.fail(error);
                    return emitter.complete();
                }
            },
            None => None,
        };

        // The conflicting record, if any, holds the e-mail this update
        // asked for.
        let requested_email = changes
            .email
            .clone()
            .unwrap_or_else(|| profile.email.clone());

        profile.apply_changes(&changes, new_credential);

        match self.repository.save(profile).await {
            Ok(_) => emitter.emit(FailureReason::None),
            Err(StoreError::DuplicateEmail(_)) => {
                emitter.emit(FailureReason::DuplicateEmail);
                self.report_conflicting_profile(&requested_email, &mut emitter)
                    .await;
            }
            Err(StoreError::MissingField(field)) => {
                tracing::warn!(profile_id = %profile_id, field, "Profile update missing required field");
                emitter.emit(FailureReason::MissingRequired);
            }
            Err(error) => {
                tracing::error!(error = %error, profile_id = %profile_id, "Profile save failed");
                emitter.emit(FailureReason::Unknown);
                emitter.fail(error);
            }
        }

        emitter.complete()
    }

    /// Deactivate a profile. Deactivation is one-way and not idempotent:
    /// repeating it reports `InactiveProfile` rather than success.
    pub async fn deactivate_profile(&self, profile_id: Uuid) -> OperationReport {
        let mut emitter = ReasonEmitter::new();

        let existing = match self.repository.find_by_id(profile_id).await {
            Ok(existing) => existing,
            Err(error) => {
                tracing::error!(error = %error, profile_id = %profile_id, "Profile lookup failed");
                emitter.emit(FailureReason::Unknown);
                emitter.fail(error);
                return emitter.complete();
            }
        };
        let Some(mut profile) = existing else {
            emitter.emit(FailureReason::NonExistentProfile);
            return emitter.complete();
        };

        if profile.is_deactivated {
            emitter.emit(FailureReason::InactiveProfile);
            return emitter.complete();
        }

        profile.is_deactivated = true;
        profile.modified_at = Some(Utc::now());

        match self.repository.save(profile).await {
            Ok(_) => {
                tracing::info!(profile_id = %profile_id, "Profile deactivated");
                emitter.emit(FailureReason::None);
            }
            Err(error) => {
                tracing::error!(error = %error, profile_id = %profile_id, "Profile deactivation failed");
                emitter.emit(FailureReason::Unknown);
                emitter.fail(error);
            }
        }

        emitter.complete()
    }

    /// Confirm a profile's e-mail address with its confirmation token.
    ///
    /// The lookup pairs the e-mail with the token, so a wrong token is
    /// indistinguishable from an unknown e-mail.
    pub async fn confirm_profile_email_address(
        &self,
        email_address: &str,
        confirmation_token: &str,
    ) -> OperationReport {
        let mut emitter = ReasonEmitter::new();

        let filter = ProfileFilter::by_email_and_token(email_address, confirmation_token);
        let found = match self.repository.find_one(filter).await {
            Ok(found) => found,
            Err(error) => {
                tracing::error!(error = %error, email = %email_address, "Profile lookup failed");
                emitter.emit(FailureReason::Unknown);
                emitter.fail(error);
                return emitter.complete();
            }
        };

        match found {
            None => emitter.emit(FailureReason::NonExistentProfile),
            Some(profile) if profile.is_email_confirmed => {
                // Nothing left to confirm.
                emitter.emit(FailureReason::DuplicateEmail);
            }
            Some(profile) if profile.is_deactivated => {
                emitter.emit(FailureReason::InactiveProfile);
            }
            Some(mut profile) => {
                profile.is_email_confirmed = true;
                profile.modified_at = Some(Utc::now());

                match self.repository.save(profile).await {
                    Ok(saved) => {
                        tracing::info!(profile_id = %saved.id, "Profile e-mail confirmed");
                        emitter.emit(FailureReason::None);
                    }
                    Err(error) => {
                        tracing::error!(error = %error, email = %email_address, "E-mail confirmation failed");
                        emitter.emit(FailureReason::Unknown);
                        emitter.fail(error);
                    }
                }
            }
        }

        emitter.complete()
    }

    /// Strip credential material for client presentation.
    ///
    /// Returns a sanitized copy; callers holding the original keep an
    /// unmodified entity.
    pub fn clean_profile_for_client(&self, profile: &Profile) -> ProfileView {
        ProfileView::from(profile)
    }

    /// Best-effort follow-up on a duplicate conflict: re-read the
    /// conflicting record and report its state. If the record has vanished
    /// (a racing delete) or the read fails, the duplicate reason stands
    /// alone.
    async fn report_conflicting_profile(&self, email: &str, emitter: &mut ReasonEmitter) {
        match self.repository.find_one(ProfileFilter::by_email(email)).await {
            Ok(Some(existing)) => {
                if existing.is_deactivated {
                    emitter.emit(FailureReason::InactiveProfile);
                }
                if !existing.is_email_confirmed {
                    emitter.emit(FailureReason::UnconfirmedEmail);
                }
            }
            Ok(None) => {}
            Err(error) => {
                tracing::warn!(error = %error, email = %email, "Conflict follow-up lookup failed");
            }
        }
    }

    /// Run the CPU-bound derivation off the async scheduling path.
    async fn encode_credential(&self, plaintext: String) -> Result<String, String> {
        let params = self.params;
        match tokio::task::spawn_blocking(move || credential::hash_password(&plaintext, &params))
            .await
        {
            Ok(Ok(encoded)) => Ok(encoded),
            Ok(Err(error)) => Err(error.to_string()),
            Err(error) => Err(format!("hashing task failed: {error}")),
        }
    }
}
