//! Authentication: local password accounts and the persisted session slot.

mod password;
mod session;

pub use password::{hash_password, verify_password};
pub use session::SessionHolder;

use crate::db::RecordStore;
use crate::error::{AppError, Result};
use crate::models::PublicAccount;

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Sign-up, sign-in and sign-out on top of a record store and session slot.
pub struct AuthService<'a> {
    store: &'a dyn RecordStore,
    sessions: &'a SessionHolder,
}

impl<'a> AuthService<'a> {
    pub fn new(store: &'a dyn RecordStore, sessions: &'a SessionHolder) -> Self {
        Self { store, sessions }
    }

    /// Register a new account and sign it in.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<PublicAccount> {
        validate_email(email)?;
        validate_password(password)?;

        if self.store.find_account_by_email(email).await?.is_some() {
            return Err(AppError::EmailTaken);
        }

        let password_hash = hash_password(password)?;
        let account = self.store.create_account(email, &password_hash).await?;
        self.sessions.start(&account)?;

        tracing::info!(account = %account.id, "signed up");
        Ok(PublicAccount::from(&account))
    }

    /// Sign in with email and password.
    ///
    /// An unknown email and a wrong password fail with the same
    /// [`AppError::InvalidCredentials`].
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<PublicAccount> {
        let Some(account) = self.store.find_account_by_email(email).await? else {
            return Err(AppError::InvalidCredentials);
        };
        if !verify_password(password, &account.password_hash) {
            return Err(AppError::InvalidCredentials);
        }

        self.sessions.start(&account)?;
        tracing::info!(account = %account.id, "signed in");
        Ok(PublicAccount::from(&account))
    }

    pub fn sign_out(&self) -> Result<()> {
        self.sessions.end()?;
        tracing::info!("signed out");
        Ok(())
    }
}

fn validate_email(email: &str) -> Result<()> {
    if email.trim().is_empty() || !email.contains('@') {
        return Err(AppError::InvalidInput(format!("not an email address: {:?}", email)));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::WeakPassword {
            min: MIN_PASSWORD_LENGTH,
        });
    }
    Ok(())
}
