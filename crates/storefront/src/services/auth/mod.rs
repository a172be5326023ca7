//! Authentication service.
//!
//! Local email/password accounts with Argon2id hashes. A successful login or
//! registration yields the [`CurrentUser`] stored in the session, merging the
//! identity record with the user's profile.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::PgPool;
use tracing::{info, instrument};

use clothify_core::{Email, UserRole};

use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::models::CurrentUser;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Verified against when no account matches, so unknown and known emails
/// take the same time to reject. Same parameters as [`hash_password`].
const DUMMY_PASSWORD_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$49yiGbbS9AYHVAgYK0i+oQ$vvew5J2Z45TThO9ofd0RlRKCF9mxo8hv1RjVvlEVZvo";

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// Register a new account and its `user`-role profile.
    ///
    /// A blank display name falls back to the email's local part.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::PasswordMismatch` if the confirmation differs.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    #[instrument(skip_all)]
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        password_confirm: &str,
        display_name: &str,
    ) -> Result<CurrentUser, AuthError> {
        let email = Email::parse(email)?;

        if password != password_confirm {
            return Err(AuthError::PasswordMismatch);
        }
        validate_password(password)?;

        let display_name = match display_name.trim() {
            "" => email.local_part().to_string(),
            name => name.to_string(),
        };

        let password_hash = hash_password(password)?;

        let (user, profile) = self
            .users
            .create_with_password(&email, &password_hash, &display_name)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        info!(user_id = %user.id, "User registered");

        Ok(CurrentUser {
            id: user.id,
            email: user.email,
            display_name: profile.display_name,
            role: profile.role,
        })
    }

    /// Login with email and password.
    ///
    /// A missing profile is treated as role `user`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for any failure to match an
    /// account, including a malformed email.
    #[instrument(skip_all)]
    pub async fn login(&self, email: &str, password: &str) -> Result<CurrentUser, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let Some((user, password_hash)) = self.users.get_password_hash(&email).await? else {
            let _ = verify_password(password, DUMMY_PASSWORD_HASH);
            return Err(AuthError::InvalidCredentials);
        };

        verify_password(password, &password_hash)?;

        let profile = self.users.get_profile(user.id).await?;

        let (display_name, role) = profile.map_or_else(
            || (user.email.local_part().to_string(), UserRole::User),
            |p| (p.display_name, p.role),
        );

        Ok(CurrentUser {
            id: user.id,
            email: user.email,
            display_name,
            role,
        })
    }
}

/// Validate password meets requirements: minimum length plus at least one
/// upper-case letter, one digit and one symbol.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    if !password.chars().any(char::is_uppercase) {
        return Err(AuthError::WeakPassword(
            "Password must contain an upper-case letter".to_string(),
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(AuthError::WeakPassword(
            "Password must contain a number".to_string(),
        ));
    }
    if !password
        .chars()
        .any(|c| !c.is_alphanumeric() && !c.is_whitespace())
    {
        return Err(AuthError::WeakPassword(
            "Password must contain a symbol".to_string(),
        ));
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

    #[test]
    fn test_password_rules() {
        assert!(validate_password("Sh0rt!").is_err());
        assert!(validate_password("alllower1!").is_err());
        assert!(validate_password("NoDigits!!").is_err());
        assert!(validate_password("NoSymbol12").is_err());
        assert!(validate_password("Str0ng!Pass").is_ok());
    }

    #[test]
    fn test_dummy_hash_is_well_formed() {
        let parsed = PasswordHash::new(DUMMY_PASSWORD_HASH).unwrap();
        let real = hash_password("Str0ng!Pass").unwrap();
        let real = PasswordHash::new(&real).unwrap();

        assert_eq!(parsed.algorithm.to_string(), real.algorithm.to_string());
        assert_eq!(parsed.params.to_string(), real.params.to_string());
        assert!(matches!(
            verify_password("Str0ng!Pass", DUMMY_PASSWORD_HASH),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_hash_then_verify() {
        let hash = hash_password("Str0ng!Pass").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("Str0ng!Pass", &hash).is_ok());
        assert!(matches!(
            verify_password("Wr0ng!Pass", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_garbage_hash_is_invalid_credentials() {
        assert!(matches!(
            verify_password("Str0ng!Pass", "not-a-hash"),
            Err(AuthError::InvalidCredentials)
        ));
    }
}
