use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Account, PublicAccount};

/// Pointer to the signed-in account, persisted apart from the record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub account_id: Uuid,
    pub email: String,
    /// When the account was created, not when the session started.
    pub created_at: DateTime<Utc>,
}

impl From<&Account> for Session {
    fn from(account: &Account) -> Self {
        Self {
            account_id: account.id,
            email: account.email.clone(),
            created_at: account.created_at,
        }
    }
}

impl From<&Session> for PublicAccount {
    fn from(session: &Session) -> Self {
        Self {
            id: session.account_id,
            email: session.email.clone(),
            created_at: session.created_at,
        }
    }
}
