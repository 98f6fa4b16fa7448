use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::credential;
use crate::error::AuthError;
use crate::models::{LogOnInfo, Profile, ProfileFilter};
use crate::repository::ProfileRepository;

/// An opaque session token handed back by a [`TokenIssuer`].
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// The token material given to the client.
    pub token: String,
    /// Issuer-assigned token id; log-off blacklists this id.
    pub token_id: String,
}

/// Collaborator that turns an eligible profile into a session token.
///
/// Only confirmed, non-deactivated profiles are ever passed in; the token
/// format is entirely the issuer's concern.
pub trait TokenIssuer: Send + Sync {
    fn issue(&self, profile: &Profile) -> Result<IssuedToken, AuthError>;
}

/// Decides log-on eligibility and maintains the per-profile token
/// blacklist. Construct once at process start and pass by handle.
#[derive(Clone)]
pub struct AuthenticationService<R: ProfileRepository, T: TokenIssuer> {
    repository: Arc<R>,
    issuer: Arc<T>,
}

impl<R: ProfileRepository, T: TokenIssuer> AuthenticationService<R, T> {
    pub fn new(repository: R, issuer: T) -> Self {
        Self {
            repository: Arc::new(repository),
            issuer: Arc::new(issuer),
        }
    }

    /// Log a user on.
    ///
    /// The log-on information must validate before any lookup happens.
    /// Eligibility requires a known e-mail address, a matching password, a
    /// confirmed e-mail, and an active profile; every ineligible outcome
    /// looks the same to the caller (`Ok(None)`).
    pub async fn log_on(&self, info: &LogOnInfo) -> Result<Option<IssuedToken>, AuthError> {
        if !info.is_valid() {
            return Err(AuthError::InvalidLogOnInfo);
        }
        let Some(password) = info.password.clone() else {
            return Err(AuthError::InvalidLogOnInfo);
        };

        let Some(profile) = self
            .repository
            .find_one(ProfileFilter::by_email(&info.email_address))
            .await?
        else {
            return Ok(None);
        };

        let encoded = profile.credential.clone();
        let is_match =
            tokio::task::spawn_blocking(move || credential::verify_password(&password, &encoded))
                .await
                .map_err(|e| AuthError::Runtime(e.to_string()))??;

        if is_match && profile.is_email_confirmed && !profile.is_deactivated {
            let issued = self.issuer.issue(&profile)?;
            tracing::info!(profile_id = %profile.id, "Profile logged on");
            Ok(Some(issued))
        } else {
            tracing::debug!(profile_id = %profile.id, "Log-on refused");
            Ok(None)
        }
    }

    /// Log a user off by blacklisting the given token id.
    ///
    /// Returns `false` when the profile is unknown or the id was already
    /// blacklisted.
    pub async fn log_off(&self, profile_id: Uuid, token_id: &str) -> Result<bool, AuthError> {
        let Some(mut profile) = self.repository.find_by_id(profile_id).await? else {
            return Ok(false);
        };

        if profile.has_blacklisted_token(token_id) {
            return Ok(false);
        }

        profile.blacklisted_tokens.push(token_id.to_string());
        profile.modified_at = Some(Utc::now());
        self.repository.save(profile).await?;

        tracing::info!(profile_id = %profile_id, "Profile logged off");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::CredentialParams;
    use crate::models::NewProfile;
    use crate::outcome::FailureReason;
    use crate::repository::InMemoryProfileRepository;
    use crate::service::ProfileLifecycleService;
    use chrono::NaiveDate;

    struct StaticIssuer;

    impl TokenIssuer for StaticIssuer {
        fn issue(&self, profile: &Profile) -> Result<IssuedToken, AuthError> {
            let token_id: Vec<u8> = (0..16).map(|_| rand::random::<u8>()).collect();
            Ok(IssuedToken {
                token: format!("session-{}", profile.id),
                token_id: const_hex::encode(token_id),
            })
        }
    }

    fn test_params() -> CredentialParams {
        CredentialParams {
            salt_length: 16,
            iterations: 3,
        }
    }

    fn new_input(email: &str) -> NewProfile {
        NewProfile {
            email: email.to_string(),
            password: "P@ssw0rd".to_string(),
            full_name: "Test Person".to_string(),
            nickname: None,
            birthday: NaiveDate::from_ymd_opt(2000, 1, 1),
            about_me: None,
            time_zone: None,
        }
    }

    /// Create a profile and confirm its e-mail, returning the shared repo
    /// and the profile id.
    async fn confirmed_profile(email: &str) -> (InMemoryProfileRepository, Uuid) {
        let repo = InMemoryProfileRepository::new();
        let service = ProfileLifecycleService::new(repo.clone(), test_params());

        let report = service.create_new_profile(new_input(email)).await;
        assert_eq!(report.reasons(), [FailureReason::None]);
        let id = report.profile_id().unwrap();

        let token = repo
            .find_by_id(id)
            .await
            .unwrap()
            .unwrap()
            .email_confirmation_token
            .unwrap();
        let report = service.confirm_profile_email_address(email, &token).await;
        assert!(report.succeeded());

        (repo, id)
    }

    #[tokio::test]
    async fn test_log_on_confirmed_profile() {
        let (repo, _) = confirmed_profile("a@b.com").await;
        let auth = AuthenticationService::new(repo, StaticIssuer);

        let issued = auth
            .log_on(&LogOnInfo::new("a@b.com", "P@ssw0rd"))
            .await
            .unwrap();

        assert!(issued.is_some());
    }

    #[tokio::test]
    async fn test_log_on_wrong_password_is_refused() {
        let (repo, _) = confirmed_profile("a@b.com").await;
        let auth = AuthenticationService::new(repo, StaticIssuer);

        let issued = auth
            .log_on(&LogOnInfo::new("a@b.com", "wrong"))
            .await
            .unwrap();

        assert!(issued.is_none());
    }

    #[tokio::test]
    async fn test_log_on_unconfirmed_profile_is_refused() {
        let repo = InMemoryProfileRepository::new();
        let service = ProfileLifecycleService::new(repo.clone(), test_params());
        service.create_new_profile(new_input("a@b.com")).await;

        let auth = AuthenticationService::new(repo, StaticIssuer);
        let issued = auth
            .log_on(&LogOnInfo::new("a@b.com", "P@ssw0rd"))
            .await
            .unwrap();

        assert!(issued.is_none());
    }

    #[tokio::test]
    async fn test_log_on_deactivated_profile_is_refused() {
        let (repo, id) = confirmed_profile("a@b.com").await;
        let service = ProfileLifecycleService::new(repo.clone(), test_params());
        assert!(service.deactivate_profile(id).await.succeeded());

        let auth = AuthenticationService::new(repo, StaticIssuer);
        let issued = auth
            .log_on(&LogOnInfo::new("a@b.com", "P@ssw0rd"))
            .await
            .unwrap();

        assert!(issued.is_none());
    }

    #[tokio::test]
    async fn test_log_on_unknown_email_is_refused() {
        let repo = InMemoryProfileRepository::new();
        let auth = AuthenticationService::new(repo, StaticIssuer);

        let issued = auth
            .log_on(&LogOnInfo::new("nobody@b.com", "P@ssw0rd"))
            .await
            .unwrap();

        assert!(issued.is_none());
    }

    #[tokio::test]
    async fn test_log_on_rejects_invalid_info_before_lookup() {
        let repo = InMemoryProfileRepository::new();
        let auth = AuthenticationService::new(repo, StaticIssuer);

        let result = auth.log_on(&LogOnInfo::new("not-an-email", "x")).await;
        assert!(matches!(result, Err(AuthError::InvalidLogOnInfo)));

        let missing_password = LogOnInfo {
            email_address: "a@b.com".to_string(),
            password: None,
        };
        let result = auth.log_on(&missing_password).await;
        assert!(matches!(result, Err(AuthError::InvalidLogOnInfo)));
    }

    #[tokio::test]
    async fn test_log_off_blacklists_token_once() {
        let (repo, id) = confirmed_profile("a@b.com").await;
        let auth = AuthenticationService::new(repo.clone(), StaticIssuer);

        let issued = auth
            .log_on(&LogOnInfo::new("a@b.com", "P@ssw0rd"))
            .await
            .unwrap()
            .unwrap();

        assert!(auth.log_off(id, &issued.token_id).await.unwrap());
        // Replaying the same token id changes nothing.
        assert!(!auth.log_off(id, &issued.token_id).await.unwrap());

        let stored = repo.find_by_id(id).await.unwrap().unwrap();
        assert!(stored.has_blacklisted_token(&issued.token_id));
    }

    #[tokio::test]
    async fn test_log_off_unknown_profile() {
        let repo = InMemoryProfileRepository::new();
        let auth = AuthenticationService::new(repo, StaticIssuer);

        assert!(!auth.log_off(Uuid::now_v7(), "token").await.unwrap());
    }
}
