//! Authentication service.
//!
//! Password registration and login, profile edits and password changes.
//! Token issuing lives in [`crate::services::token`]; this service only
//! deals with users and credentials.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use joestar_core::affiliate::AffiliateProfile;
use joestar_core::{Email, UserId};

use crate::db::{DUPLICATE_EMAIL, RepositoryError, Store};
use crate::models::{NewUser, User};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Registration input as received from the client.
#[derive(Debug, Default)]
pub struct Registration<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub referral_code: Option<&'a str>,
}

/// Authentication service.
pub struct AuthService<'a> {
    store: &'a dyn Store,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Register a new user with email and password.
    ///
    /// The user and their affiliate profile are created together. A referral
    /// code, if given, must belong to an existing affiliate.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingFields` if name, email or password is blank.
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::InvalidReferralCode` if the referral code is unknown.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn register(
        &self,
        registration: Registration<'_>,
    ) -> Result<(User, AffiliateProfile), AuthError> {
        let name = registration.name.trim();
        if name.is_empty()
            || registration.email.trim().is_empty()
            || registration.password.is_empty()
        {
            return Err(AuthError::MissingFields("All fields are required"));
        }

        let email = Email::parse(registration.email)?;
        validate_password(registration.password)?;

        let referred_by = match registration
            .referral_code
            .map(str::trim)
            .filter(|c| !c.is_empty())
        {
            Some(code) => Some(
                self.store
                    .find_affiliate_by_code(code)
                    .await?
                    .ok_or(AuthError::InvalidReferralCode)?
                    .user_id,
            ),
            None => None,
        };

        // Fail fast before paying for a hash
        if self.store.get_user_by_email(&email).await?.is_some() {
            return Err(AuthError::UserAlreadyExists);
        }

        let password_hash = hash_password(registration.password)?;

        self.store
            .create_user(NewUser {
                name: name.to_owned(),
                email,
                password_hash,
                referred_by,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(msg) if msg == DUPLICATE_EMAIL => {
                    AuthError::UserAlreadyExists
                }
                RepositoryError::Conflict(_) => AuthError::RedeemCodeUnavailable,
                other => AuthError::Repository(other),
            })
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingFields` if either field is blank.
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::MissingFields("Email and password are required"));
        }

        // A malformed email can't belong to anyone
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .store
            .get_credentials(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        Ok(user)
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn get_user(&self, user_id: UserId) -> Result<User, AuthError> {
        self.store
            .get_user(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Update name and/or email. Omitted fields keep their current value.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    /// Returns `AuthError::InvalidEmail` if the new email is malformed.
    /// Returns `AuthError::EmailTaken` if another user has the new email.
    pub async fn update_profile(
        &self,
        user_id: UserId,
        name: Option<&str>,
        email: Option<&str>,
    ) -> Result<User, AuthError> {
        let current = self.get_user(user_id).await?;

        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(&current.name)
            .to_owned();

        let email = match email.map(str::trim).filter(|e| !e.is_empty()) {
            Some(raw) => Email::parse(raw)?,
            None => current.email.clone(),
        };

        if email != current.email
            && let Some(other) = self.store.get_user_by_email(&email).await?
            && other.id != user_id
        {
            return Err(AuthError::EmailTaken);
        }

        self.store
            .update_profile(user_id, &name, &email)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::EmailTaken,
                RepositoryError::NotFound => AuthError::UserNotFound,
                other => AuthError::Repository(other),
            })
    }

    /// Change a user's password after verifying the current one.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingFields` if either password is blank.
    /// Returns `AuthError::IncorrectPassword` if the current password is wrong.
    /// Returns `AuthError::WeakPassword` if the new password is too short.
    pub async fn change_password(
        &self,
        user_id: UserId,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        if current_password.is_empty() || new_password.is_empty() {
            return Err(AuthError::MissingFields(
                "Current password and new password are required",
            ));
        }

        let password_hash = self
            .store
            .get_password_hash(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        verify_password(current_password, &password_hash)
            .map_err(|_| AuthError::IncorrectPassword)?;

        validate_password(new_password)?;
        let new_hash = hash_password(new_password)?;

        self.store
            .update_password(user_id, &new_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AuthError::UserNotFound,
                other => AuthError::Repository(other),
            })
    }
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::{MemoryStore, UserStore};

    fn registration<'a>(email: &'a str, referral_code: Option<&'a str>) -> Registration<'a> {
        Registration {
            name: "Jonathan",
            email,
            password: "hamon-breathing",
            referral_code,
        }
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong horse", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_validate_password_length() {
        assert!(validate_password("1234567").is_err());
        assert!(validate_password("12345678").is_ok());
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);

        let (user, profile) = auth
            .register(registration("Jojo@Example.com", None))
            .await
            .unwrap();
        assert_eq!(user.email.as_str(), "jojo@example.com");
        assert_eq!(profile.user_id, user.id);

        let logged_in = auth.login("jojo@example.com", "hamon-breathing").await.unwrap();
        assert_eq!(logged_in.id, user.id);

        assert!(matches!(
            auth.login("jojo@example.com", "wrong-password").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login("nobody@example.com", "hamon-breathing").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_register_rejects_duplicates_and_blank_fields() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);
        auth.register(registration("a@example.com", None)).await.unwrap();

        assert!(matches!(
            auth.register(registration("A@example.com", None)).await,
            Err(AuthError::UserAlreadyExists)
        ));
        assert!(matches!(
            auth.register(Registration::default()).await,
            Err(AuthError::MissingFields(_))
        ));
    }

    #[tokio::test]
    async fn test_register_with_referral_code() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);
        let (referrer, profile) = auth.register(registration("a@example.com", None)).await.unwrap();

        let (referred, _) = auth
            .register(registration("b@example.com", Some(&profile.redeem_code)))
            .await
            .unwrap();
        assert_eq!(referred.referred_by, Some(referrer.id));

        assert!(matches!(
            auth.register(registration("c@example.com", Some("JOESTAR9999"))).await,
            Err(AuthError::InvalidReferralCode)
        ));
    }

    #[tokio::test]
    async fn test_change_password() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);
        let (user, _) = auth.register(registration("a@example.com", None)).await.unwrap();

        assert!(matches!(
            auth.change_password(user.id, "not-it-at-all", "new-password").await,
            Err(AuthError::IncorrectPassword)
        ));

        auth.change_password(user.id, "hamon-breathing", "ripple-overdrive")
            .await
            .unwrap();
        assert!(auth.login("a@example.com", "ripple-overdrive").await.is_ok());
    }

    #[tokio::test]
    async fn test_register_after_ten_thousand_users() {
        let store = MemoryStore::new();
        for n in 1..=10_000 {
            store
                .create_user(NewUser {
                    name: format!("User {n}"),
                    email: Email::parse(&format!("user{n}@example.com")).unwrap(),
                    password_hash: "hash".to_owned(),
                    referred_by: None,
                })
                .await
                .unwrap();
        }

        let auth = AuthService::new(&store);
        let (user, profile) = auth
            .register(registration("brand-new@example.com", Some("JOESTAR0001")))
            .await
            .unwrap();
        assert_eq!(user.id, UserId::new(10_001));
        assert_eq!(user.referred_by, Some(UserId::new(1)));
        assert_eq!(profile.redeem_code, "JOESTAR10001");
    }

    #[tokio::test]
    async fn test_update_profile_email_taken() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);
        let (a, _) = auth.register(registration("a@example.com", None)).await.unwrap();
        auth.register(registration("b@example.com", None)).await.unwrap();

        assert!(matches!(
            auth.update_profile(a.id, None, Some("b@example.com")).await,
            Err(AuthError::EmailTaken)
        ));

        let updated = auth
            .update_profile(a.id, Some("Joseph"), None)
            .await
            .unwrap();
        assert_eq!(updated.name, "Joseph");
        assert_eq!(updated.email.as_str(), "a@example.com");
    }
}
