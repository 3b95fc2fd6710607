//! Authentication service.
//!
//! Password registration and login, profile updates, and the bearer tokens
//! that identify a caller on later requests.

mod error;
pub mod token;

pub use error::AuthError;
pub use token::{Claims, TokenError, TokenManager, extract_bearer};

use std::sync::LazyLock;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use sqlx::PgPool;

use bookstore_core::{Email, Role, UserId};

use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::models::user::User;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 6;

/// Maximum username length, in characters.
const MAX_USERNAME_LENGTH: usize = 50;

/// Hash verified against when the email is unknown, so both login failures
/// take the same time.
static DUMMY_HASH: LazyLock<String> =
    LazyLock::new(|| hash_password("timing-equalizer").unwrap_or_default());

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    tokens: &'a TokenManager,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, tokens: &'a TokenManager) -> Self {
        Self {
            users: UserRepository::new(pool),
            tokens,
        }
    }

    /// Register a new customer.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidUsername`, `AuthError::InvalidEmail` or
    /// `AuthError::WeakPassword` for bad input, and
    /// `AuthError::UserAlreadyExists` if the username or email is taken.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        self.create_user(username, email, password, Role::Customer)
            .await
    }

    /// Create a user with an explicit role.
    ///
    /// # Errors
    ///
    /// Same as [`register`](Self::register).
    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<User, AuthError> {
        let account = NewAccount::new(username, email, password)?;
        store_account(&self.users, &account, role).await
    }

    /// Check credentials and issue a token.
    ///
    /// Unknown email and wrong password both yield
    /// `AuthError::InvalidCredentials`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` on a failed check and
    /// `AuthError::AccountDisabled` for a deactivated account.
    pub async fn login(&self, email: &str, password: &str) -> Result<(String, User), AuthError> {
        let Ok(email) = Email::parse(email) else {
            return Err(AuthError::InvalidCredentials);
        };

        let Some(row) = self.users.get_with_password(&email).await? else {
            let _ = verify_password(password, &DUMMY_HASH);
            return Err(AuthError::InvalidCredentials);
        };

        verify_password(password, &row.password_hash)?;

        let user = row.user;
        if !user.is_active {
            return Err(AuthError::AccountDisabled);
        }

        let now = Utc::now();
        let token = self.tokens.issue(
            user.id,
            user.email.as_str(),
            user.role,
            user.premium_active(now),
            now,
        )?;

        tracing::info!(user_id = %user.id, "User logged in");
        Ok((token, user))
    }

    /// Load the caller's user row.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the account no longer exists.
    pub async fn profile(&self, user_id: UserId) -> Result<User, AuthError> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Change username and/or email. Blank or absent values are ignored.
    ///
    /// # Errors
    ///
    /// Returns validation errors for malformed values,
    /// `AuthError::UserAlreadyExists` if either value belongs to another
    /// user, and `AuthError::UserNotFound` if the account is gone.
    pub async fn update_profile(
        &self,
        user_id: UserId,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<User, AuthError> {
        let username = username
            .filter(|u| !u.trim().is_empty())
            .map(validate_username)
            .transpose()?;
        let email = email
            .filter(|e| !e.trim().is_empty())
            .map(Email::parse)
            .transpose()?;

        self.users
            .update_profile(user_id, username, email.as_ref())
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AuthError::UserNotFound,
                other => conflict_to_exists(other),
            })
    }
}

/// Registration input that passed validation, with the password already
/// hashed.
#[derive(Debug)]
pub struct NewAccount {
    pub username: String,
    pub email: Email,
    password_hash: String,
}

impl NewAccount {
    /// Validate the username, email and password and hash the password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidUsername`, `AuthError::InvalidEmail` or
    /// `AuthError::WeakPassword` for bad input.
    pub fn new(username: &str, email: &str, password: &str) -> Result<Self, AuthError> {
        let username = validate_username(username)?.to_owned();
        let email = Email::parse(email)?;
        validate_password(password)?;

        Ok(Self {
            username,
            email,
            password_hash: hash_password(password)?,
        })
    }
}

/// Store a validated account with `role`.
///
/// Needs only the database, so tooling can create accounts without the
/// token signing configuration.
///
/// # Errors
///
/// Returns `AuthError::UserAlreadyExists` if the username or email is taken.
pub async fn create_account(
    pool: &PgPool,
    account: &NewAccount,
    role: Role,
) -> Result<User, AuthError> {
    store_account(&UserRepository::new(pool), account, role).await
}

async fn store_account(
    users: &UserRepository<'_>,
    account: &NewAccount,
    role: Role,
) -> Result<User, AuthError> {
    let user = users
        .create(&account.username, &account.email, &account.password_hash, role)
        .await
        .map_err(conflict_to_exists)?;

    tracing::info!(user_id = %user.id, role = %user.role, "User registered");
    Ok(user)
}

fn conflict_to_exists(e: RepositoryError) -> AuthError {
    match e {
        RepositoryError::Conflict(msg) => AuthError::UserAlreadyExists(msg),
        other => AuthError::Repository(other),
    }
}

/// Validate and trim a username.
fn validate_username(username: &str) -> Result<&str, AuthError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(AuthError::InvalidUsername("username is required".to_owned()));
    }
    if username.chars().count() > MAX_USERNAME_LENGTH {
        return Err(AuthError::InvalidUsername(format!(
            "username must be at most {MAX_USERNAME_LENGTH} characters"
        )));
    }
    if username.chars().any(char::is_control) {
        return Err(AuthError::InvalidUsername(
            "username cannot contain control characters".to_owned(),
        ));
    }
    Ok(username)
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    if password.chars().any(char::is_whitespace) {
        return Err(AuthError::WeakPassword(
            "password cannot contain whitespace".to_owned(),
        ));
    }
    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::EmptyPassword` for empty input and
/// `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    if password.is_empty() {
        return Err(AuthError::EmptyPassword);
    }
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredentials` if the password doesn't match or
/// the stored hash is unreadable.
pub fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
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
    fn test_hash_and_verify() {
        let hash = hash_password("s3cret!").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("s3cret!", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("same-password").unwrap();
        let b = hash_password("same-password").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_empty_password_cannot_be_hashed() {
        assert!(matches!(hash_password(""), Err(AuthError::EmptyPassword)));
    }

    #[test]
    fn test_garbage_hash_is_invalid_credentials() {
        assert!(matches!(
            verify_password("anything", "not-a-phc-string"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_password_rules() {
        assert!(validate_password("abcdef").is_ok());
        assert!(matches!(
            validate_password("abcde"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(matches!(
            validate_password("abc def"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(matches!(
            validate_password("abcdef\t"),
            Err(AuthError::WeakPassword(_))
        ));
    }

    #[test]
    fn test_username_rules() {
        assert_eq!(validate_username("  reader ").unwrap(), "reader");
        assert!(validate_username("   ").is_err());
        assert!(validate_username(&"x".repeat(MAX_USERNAME_LENGTH)).is_ok());
        assert!(validate_username(&"x".repeat(MAX_USERNAME_LENGTH + 1)).is_err());
        assert!(validate_username("bad\nname").is_err());
    }

    #[test]
    fn test_new_account_normalizes_and_hashes() {
        let account = NewAccount::new("  reader ", "Reader@Example.COM", "s3cret!").unwrap();
        assert_eq!(account.username, "reader");
        assert_eq!(account.email.as_str(), "reader@example.com");
        assert!(verify_password("s3cret!", &account.password_hash).is_ok());

        assert!(matches!(
            NewAccount::new("reader", "not-an-email", "s3cret!"),
            Err(AuthError::InvalidEmail(_))
        ));
        assert!(matches!(
            NewAccount::new("reader", "reader@example.com", "short"),
            Err(AuthError::WeakPassword(_))
        ));
    }

    #[test]
    fn test_dummy_hash_is_usable() {
        assert!(DUMMY_HASH.starts_with("$argon2id$"));
        assert!(verify_password("other", &DUMMY_HASH).is_err());
    }
}
