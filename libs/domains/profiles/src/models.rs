use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::email;

/// Time zone assigned to profiles that do not pick one.
pub const DEFAULT_TIME_ZONE: &str = "Europe/London";

/// A stored user profile document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    /// Unique across all stored profiles.
    pub email: String,
    /// Encoded credential record (never serialized outward).
    #[serde(skip_serializing)]
    pub credential: String,
    pub full_name: String,
    pub nickname: Option<String>,
    /// Required by store validation.
    pub birthday: Option<NaiveDate>,
    pub about_me: Option<String>,
    pub time_zone: String,
    pub is_email_confirmed: bool,
    /// Present whenever the e-mail was set or changed and not yet confirmed.
    #[serde(skip_serializing)]
    pub email_confirmation_token: Option<String>,
    #[serde(skip_serializing)]
    pub blacklisted_tokens: Vec<String>,
    pub is_deactivated: bool,
    /// Immutable after creation.
    pub created_at: DateTime<Utc>,
    pub modified_at: Option<DateTime<Utc>>,
}

impl Profile {
    /// Build a new profile from creation input and an already-encoded
    /// credential. Mints the initial confirmation token; the e-mail starts
    /// unconfirmed.
    pub fn new(input: NewProfile, credential: String) -> Self {
        Self {
            id: Uuid::now_v7(),
            email: input.email,
            credential,
            full_name: input.full_name,
            nickname: input.nickname,
            birthday: input.birthday,
            about_me: input.about_me,
            time_zone: input
                .time_zone
                .unwrap_or_else(|| DEFAULT_TIME_ZONE.to_string()),
            is_email_confirmed: false,
            email_confirmation_token: Some(mint_confirmation_token()),
            blacklisted_tokens: Vec::new(),
            is_deactivated: false,
            created_at: Utc::now(),
            modified_at: None,
        }
    }

    /// Apply a field-by-field diff over the full schema.
    ///
    /// Only fields present in `changes` that differ from the stored value
    /// are written; `created_at` is never applied. Changing the e-mail
    /// resets confirmation and mints a fresh token, overriding any
    /// `is_email_confirmed` carried in the same change set.
    pub fn apply_changes(&mut self, changes: &ProfileChanges, new_credential: Option<String>) {
        let email_changed = changes
            .email
            .as_ref()
            .is_some_and(|email| *email != self.email);

        if let Some(ref email) = changes.email {
            if *email != self.email {
                self.email = email.clone();
            }
        }
        if let Some(credential) = new_credential {
            self.credential = credential;
        }
        if let Some(ref full_name) = changes.full_name {
            if *full_name != self.full_name {
                self.full_name = full_name.clone();
            }
        }
        if let Some(ref nickname) = changes.nickname {
            if self.nickname.as_deref() != Some(nickname.as_str()) {
                self.nickname = Some(nickname.clone());
            }
        }
        if let Some(birthday) = changes.birthday {
            if self.birthday != Some(birthday) {
                self.birthday = Some(birthday);
            }
        }
        if let Some(ref about_me) = changes.about_me {
            if self.about_me.as_deref() != Some(about_me.as_str()) {
                self.about_me = Some(about_me.clone());
            }
        }
        if let Some(ref time_zone) = changes.time_zone {
            if *time_zone != self.time_zone {
                self.time_zone = time_zone.clone();
            }
        }
        if let Some(confirmed) = changes.is_email_confirmed {
            self.is_email_confirmed = confirmed;
        }
        if let Some(deactivated) = changes.is_deactivated {
            self.is_deactivated = deactivated;
        }

        if email_changed {
            self.refresh_confirmation_token();
        }

        self.modified_at = Some(Utc::now());
    }

    /// Reset e-mail confirmation after the address was set or changed: the
    /// profile stays unconfirmed until the new token comes back.
    pub fn refresh_confirmation_token(&mut self) {
        self.is_email_confirmed = false;
        self.email_confirmation_token = Some(mint_confirmation_token());
    }

    /// Whether a session token id has been blacklisted for this profile.
    pub fn has_blacklisted_token(&self, token_id: &str) -> bool {
        self.blacklisted_tokens.iter().any(|t| t == token_id)
    }
}

/// 32 random bytes, hex-encoded; bound to the profile's current e-mail.
fn mint_confirmation_token() -> String {
    let random_bytes: Vec<u8> = (0..32).map(|_| rand::random::<u8>()).collect();
    const_hex::encode(random_bytes)
}

/// Input for profile creation. The password arrives in plaintext and is
/// encoded by the service before anything is stored.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProfile {
    pub email: String,
    pub password: String,
    pub full_name: String,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub birthday: Option<NaiveDate>,
    #[serde(default)]
    pub about_me: Option<String>,
    #[serde(default)]
    pub time_zone: Option<String>,
}

/// Input for profile updates: a partial change set over the full schema.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileChanges {
    pub email: Option<String>,
    pub password: Option<String>,
    pub full_name: Option<String>,
    pub nickname: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub about_me: Option<String>,
    pub time_zone: Option<String>,
    pub is_email_confirmed: Option<bool>,
    pub is_deactivated: Option<bool>,
    /// Accepted for schema completeness; creation time is immutable and
    /// this field is never applied.
    pub created_at: Option<DateTime<Utc>>,
}

/// Exact-match lookup filter over the document store.
#[derive(Debug, Clone, Default)]
pub struct ProfileFilter {
    pub email: Option<String>,
    pub email_confirmation_token: Option<String>,
}

impl ProfileFilter {
    pub fn by_email(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            email_confirmation_token: None,
        }
    }

    pub fn by_email_and_token(email: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            email_confirmation_token: Some(token.into()),
        }
    }

    /// Every set field must match the stored document exactly.
    pub fn matches(&self, profile: &Profile) -> bool {
        if let Some(ref email) = self.email {
            if profile.email != *email {
                return false;
            }
        }
        if let Some(ref token) = self.email_confirmation_token {
            if profile.email_confirmation_token.as_deref() != Some(token.as_str()) {
                return false;
            }
        }
        true
    }
}

/// Client-facing view of a profile with credential material removed.
///
/// Built as a copy; the source entity is left untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileView {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub nickname: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub about_me: Option<String>,
    pub time_zone: String,
    pub is_email_confirmed: bool,
    pub is_deactivated: bool,
    pub created_at: DateTime<Utc>,
    pub modified_at: Option<DateTime<Utc>>,
}

impl From<&Profile> for ProfileView {
    fn from(profile: &Profile) -> Self {
        Self {
            id: profile.id,
            email: profile.email.clone(),
            full_name: profile.full_name.clone(),
            nickname: profile.nickname.clone(),
            birthday: profile.birthday,
            about_me: profile.about_me.clone(),
            time_zone: profile.time_zone.clone(),
            is_email_confirmed: profile.is_email_confirmed,
            is_deactivated: profile.is_deactivated,
            created_at: profile.created_at,
            modified_at: profile.modified_at,
        }
    }
}

/// Log-on input; validates itself before any store lookup happens.
#[derive(Debug, Clone, Deserialize)]
pub struct LogOnInfo {
    pub email_address: String,
    /// Absent (not merely empty) passwords fail validation.
    pub password: Option<String>,
}

impl LogOnInfo {
    pub fn new(email_address: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email_address: email_address.into(),
            password: Some(password.into()),
        }
    }

    /// A present password and a syntactically valid e-mail address.
    pub fn is_valid(&self) -> bool {
        self.password.is_some() && email::is_valid(&self.email_address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn test_new_profile_starts_unconfirmed_with_token() {
        let profile = Profile::new(new_input("a@b.com"), "encoded".to_string());

        assert!(!profile.is_email_confirmed);
        assert!(profile.email_confirmation_token.is_some());
        assert!(!profile.is_deactivated);
        assert!(profile.blacklisted_tokens.is_empty());
        assert_eq!(profile.time_zone, DEFAULT_TIME_ZONE);
        assert!(profile.modified_at.is_none());
    }

    #[test]
    fn test_confirmation_tokens_are_unique() {
        let first = Profile::new(new_input("a@b.com"), "encoded".to_string());
        let second = Profile::new(new_input("c@d.com"), "encoded".to_string());

        assert_ne!(
            first.email_confirmation_token,
            second.email_confirmation_token
        );
    }

    #[test]
    fn test_apply_changes_diffs_fields() {
        let mut profile = Profile::new(new_input("a@b.com"), "encoded".to_string());

        let changes = ProfileChanges {
            full_name: Some("Renamed".to_string()),
            nickname: Some("nick".to_string()),
            ..Default::default()
        };
        profile.apply_changes(&changes, None);

        assert_eq!(profile.full_name, "Renamed");
        assert_eq!(profile.nickname.as_deref(), Some("nick"));
        assert_eq!(profile.email, "a@b.com");
        assert!(profile.modified_at.is_some());
    }

    #[test]
    fn test_apply_changes_never_touches_created_at() {
        let mut profile = Profile::new(new_input("a@b.com"), "encoded".to_string());
        let original_created_at = profile.created_at;

        let changes = ProfileChanges {
            created_at: Some(Utc::now() + chrono::Duration::days(30)),
            ..Default::default()
        };
        profile.apply_changes(&changes, None);

        assert_eq!(profile.created_at, original_created_at);
    }

    #[test]
    fn test_email_change_resets_confirmation() {
        let mut profile = Profile::new(new_input("a@b.com"), "encoded".to_string());
        profile.is_email_confirmed = true;
        let original_token = profile.email_confirmation_token.clone();

        let changes = ProfileChanges {
            email: Some("new@b.com".to_string()),
            // An explicit confirmation flag in the same change set loses to
            // the e-mail change invariant.
            is_email_confirmed: Some(true),
            ..Default::default()
        };
        profile.apply_changes(&changes, None);

        assert_eq!(profile.email, "new@b.com");
        assert!(!profile.is_email_confirmed);
        assert_ne!(profile.email_confirmation_token, original_token);
    }

    #[test]
    fn test_same_email_does_not_reset_confirmation() {
        let mut profile = Profile::new(new_input("a@b.com"), "encoded".to_string());
        profile.is_email_confirmed = true;
        let original_token = profile.email_confirmation_token.clone();

        let changes = ProfileChanges {
            email: Some("a@b.com".to_string()),
            ..Default::default()
        };
        profile.apply_changes(&changes, None);

        assert!(profile.is_email_confirmed);
        assert_eq!(profile.email_confirmation_token, original_token);
    }

    #[test]
    fn test_filter_matches_email_and_token() {
        let profile = Profile::new(new_input("a@b.com"), "encoded".to_string());
        let token = profile.email_confirmation_token.clone().unwrap();

        assert!(ProfileFilter::by_email("a@b.com").matches(&profile));
        assert!(!ProfileFilter::by_email("other@b.com").matches(&profile));
        assert!(ProfileFilter::by_email_and_token("a@b.com", token).matches(&profile));
        assert!(!ProfileFilter::by_email_and_token("a@b.com", "wrong").matches(&profile));
    }

    #[test]
    fn test_view_copies_without_mutating_source() {
        let profile = Profile::new(new_input("a@b.com"), "encoded".to_string());
        let before = profile.clone();

        let view = ProfileView::from(&profile);

        assert_eq!(view.email, profile.email);
        assert_eq!(view.id, profile.id);
        assert_eq!(profile.credential, before.credential);
        assert_eq!(
            profile.email_confirmation_token,
            before.email_confirmation_token
        );
        assert_eq!(profile.blacklisted_tokens, before.blacklisted_tokens);
    }

    #[test]
    fn test_log_on_info_validity() {
        assert!(LogOnInfo::new("a@b.com", "secret").is_valid());
        let missing_password = LogOnInfo {
            email_address: "a@b.com".to_string(),
            password: None,
        };
        assert!(!missing_password.is_valid());
        assert!(!LogOnInfo::new("not-an-email", "secret").is_valid());
    }
}
