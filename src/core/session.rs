use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// The authenticated user. `id` is the scoping key for every query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Unix seconds.
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: User,
}

impl Session {
    /// True once the access token is within `leeway` seconds of expiring.
    pub fn is_expired(&self, now: i64, leeway: i64) -> bool {
        self.expires_at.is_some_and(|exp| exp - leeway <= now)
    }
}

/// Supplies the current session. `None` means no access.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    fn current(&self) -> Option<Session>;

    async fn sign_out(&self) -> Result<(), AuthError>;

    fn user_id(&self) -> Option<String> {
        self.current().map(|s| s.user.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_with_leeway() {
        let session = Session {
            access_token: "t".into(),
            refresh_token: None,
            expires_at: Some(1_000),
            user: User {
                id: "u1".into(),
                email: None,
            },
        };
        assert!(!session.is_expired(900, 60));
        assert!(session.is_expired(950, 60));
        assert!(session.is_expired(1_001, 0));
    }
}
