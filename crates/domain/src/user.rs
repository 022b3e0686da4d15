//! User accounts and email verification.

use chrono::{DateTime, Duration, Utc};
use common::UserId;
use serde::{Deserialize, Serialize};

use crate::{DomainError, validate};

/// How long a verification code stays valid.
pub const VERIFICATION_CODE_TTL_MINUTES: i64 = 15;

/// Access role of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "user" => Some(Role::User),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A registered user.
///
/// The password is only ever stored as a salted hash; hashing itself
/// happens at the API boundary. Verification code and expiry are both
/// cleared once the email is confirmed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub street: Option<String>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
    pub country: String,
    pub email_verified: bool,
    #[serde(skip_serializing)]
    pub verification_code: Option<String>,
    #[serde(skip_serializing)]
    pub verification_expires_at: Option<DateTime<Utc>>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Creates a new unverified user with a validated email.
    pub fn new(email: impl Into<String>, password_hash: impl Into<String>) -> Result<Self, DomainError> {
        let email = email.into();
        validate::email(&email)?;
        let now = Utc::now();
        Ok(Self {
            id: UserId::new(),
            email,
            password_hash: password_hash.into(),
            first_name: None,
            last_name: None,
            phone: None,
            street: None,
            postal_code: None,
            city: None,
            country: "France".to_string(),
            email_verified: false,
            verification_code: None,
            verification_expires_at: None,
            role: Role::User,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Stores a fresh verification code with its expiry.
    ///
    /// Replaces any pending code, so a resend invalidates the old one.
    pub fn issue_verification_code(&mut self, code: String, now: DateTime<Utc>) {
        self.verification_code = Some(code);
        self.verification_expires_at =
            Some(now + Duration::minutes(VERIFICATION_CODE_TTL_MINUTES));
        self.updated_at = now;
    }

    /// Consumes a verification code.
    ///
    /// On success marks the email verified and clears both the code and
    /// its expiry. Wrong, missing, or expired codes leave the user
    /// untouched.
    pub fn verify_code(&mut self, code: &str, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.email_verified {
            return Err(DomainError::validation("email is already verified"));
        }
        let (Some(expected), Some(expires_at)) =
            (&self.verification_code, self.verification_expires_at)
        else {
            return Err(DomainError::validation("no verification code pending"));
        };
        if now > expires_at {
            return Err(DomainError::validation("verification code has expired"));
        }
        if code != expected {
            return Err(DomainError::validation("invalid verification code"));
        }

        self.email_verified = true;
        self.verification_code = None;
        self.verification_expires_at = None;
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User::new("alice@example.com", "argon2-hash").unwrap()
    }

    #[test]
    fn new_user_is_unverified_with_defaults() {
        let user = user();
        assert!(!user.email_verified);
        assert!(user.verification_code.is_none());
        assert_eq!(user.role, Role::User);
        assert_eq!(user.country, "France");
    }

    #[test]
    fn new_user_rejects_bad_email() {
        assert!(User::new("not-an-email", "hash").is_err());
    }

    #[test]
    fn verify_code_happy_path_clears_code() {
        let mut user = user();
        let now = Utc::now();
        user.issue_verification_code("123456".into(), now);

        user.verify_code("123456", now + Duration::minutes(5)).unwrap();
        assert!(user.email_verified);
        assert!(user.verification_code.is_none());
        assert!(user.verification_expires_at.is_none());
    }

    #[test]
    fn verify_code_rejects_mismatch() {
        let mut user = user();
        let now = Utc::now();
        user.issue_verification_code("123456".into(), now);

        assert!(user.verify_code("654321", now).is_err());
        assert!(!user.email_verified);
        assert!(user.verification_code.is_some());
    }

    #[test]
    fn verify_code_rejects_expired() {
        let mut user = user();
        let now = Utc::now();
        user.issue_verification_code("123456".into(), now);

        let late = now + Duration::minutes(VERIFICATION_CODE_TTL_MINUTES + 1);
        assert!(user.verify_code("123456", late).is_err());
        assert!(!user.email_verified);
    }

    #[test]
    fn verify_code_rejects_when_none_pending() {
        let mut user = user();
        assert!(user.verify_code("123456", Utc::now()).is_err());
    }

    #[test]
    fn reissue_replaces_previous_code() {
        let mut user = user();
        let now = Utc::now();
        user.issue_verification_code("111111".into(), now);
        user.issue_verification_code("222222".into(), now);

        assert!(user.verify_code("111111", now).is_err());
        user.verify_code("222222", now).unwrap();
    }

    #[test]
    fn verify_twice_fails() {
        let mut user = user();
        let now = Utc::now();
        user.issue_verification_code("123456".into(), now);
        user.verify_code("123456", now).unwrap();
        assert!(user.verify_code("123456", now).is_err());
    }

    #[test]
    fn role_wire_strings() {
        assert_eq!(Role::Admin.as_str(), "admin");
        assert_eq!(Role::parse("user"), Some(Role::User));
        assert_eq!(Role::parse("root"), None);
    }

    #[test]
    fn password_hash_never_serialized() {
        let json = serde_json::to_string(&user()).unwrap();
        assert!(!json.contains("argon2-hash"));
        assert!(!json.contains("password_hash"));
    }
}
