use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::core::session::Session;
use crate::error::AuthError;

pub(crate) const SERVICE_NAME: &str = "tareas-session";

/// Where a signed-in session survives between runs.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn save(&self, session: &Session) -> Result<(), AuthError>;
    async fn load(&self) -> Result<Option<Session>, AuthError>;
    async fn clear(&self) -> Result<(), AuthError>;
}

/// Sessions kept in the desktop keyring via Secret Service, one per backend.
pub struct KeyringSessionStore {
    server: String,
}

impl KeyringSessionStore {
    pub fn new(server: &str) -> Self {
        Self {
            server: server.to_string(),
        }
    }

    async fn keyring() -> Result<oo7::Keyring, AuthError> {
        oo7::Keyring::new()
            .await
            .map_err(|e| AuthError::Keyring(format!("Failed to connect to keyring: {}", e)))
    }

    fn attributes(&self) -> HashMap<&str, &str> {
        let mut attrs = HashMap::new();
        attrs.insert("service", SERVICE_NAME);
        attrs.insert("server", self.server.as_str());
        attrs
    }
}

#[async_trait]
impl SessionStore for KeyringSessionStore {
    async fn save(&self, session: &Session) -> Result<(), AuthError> {
        let keyring = Self::keyring().await?;
        let secret = serde_json::to_vec(session)
            .map_err(|e| AuthError::Keyring(format!("Failed to encode session: {}", e)))?;

        keyring
            .create_item(
                &format!("Tareas session ({})", self.server),
                &self.attributes(),
                secret.as_slice(),
                true, // replace existing
            )
            .await
            .map_err(|e| AuthError::Keyring(format!("Failed to store session: {}", e)))?;

        Ok(())
    }

    async fn load(&self) -> Result<Option<Session>, AuthError> {
        let keyring = Self::keyring().await?;
        let items = keyring
            .search_items(&self.attributes())
            .await
            .map_err(|e| AuthError::Keyring(format!("Failed to search keyring: {}", e)))?;

        if let Some(item) = items.first() {
            let secret = item
                .secret()
                .await
                .map_err(|e| AuthError::Keyring(format!("Failed to read secret: {}", e)))?;
            match serde_json::from_slice::<Session>(&secret.to_vec()) {
                Ok(session) => return Ok(Some(session)),
                Err(e) => log::warn!("Discarding unreadable stored session: {}", e),
            }
        }

        Ok(None)
    }

    async fn clear(&self) -> Result<(), AuthError> {
        let keyring = Self::keyring().await?;
        let items = keyring
            .search_items(&self.attributes())
            .await
            .map_err(|e| AuthError::Keyring(format!("Failed to search keyring: {}", e)))?;

        for item in items {
            item.delete()
                .await
                .map_err(|e| AuthError::Keyring(format!("Failed to delete session: {}", e)))?;
        }

        Ok(())
    }
}

/// Process-local session storage; nothing outlives the process.
#[derive(Default)]
pub struct EphemeralSessionStore {
    session: Mutex<Option<Session>>,
}

#[async_trait]
impl SessionStore for EphemeralSessionStore {
    async fn save(&self, session: &Session) -> Result<(), AuthError> {
        *self.session.lock().unwrap_or_else(|e| e.into_inner()) = Some(session.clone());
        Ok(())
    }

    async fn load(&self) -> Result<Option<Session>, AuthError> {
        Ok(self.session.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    async fn clear(&self) -> Result<(), AuthError> {
        *self.session.lock().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}
