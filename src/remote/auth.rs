use std::sync::RwLock;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;

use super::keyring::SessionStore;
use crate::config::AppConfig;
use crate::core::session::{Session, SessionProvider, User};
use crate::error::{AuthError, ConfigError};

/// Seconds before expiry at which a stored session is refreshed.
const REFRESH_LEEWAY: i64 = 60;

/// What a sign-up produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    /// The account exists but the email address must be verified first.
    ConfirmationRequired { email: String },
    /// Email confirmation is off; the user is signed in right away.
    SignedIn(Session),
}

/// The identity provider's password flow.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, AuthError>;
    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, AuthError>;
    async fn refresh(&self, refresh_token: &str) -> Result<Session, AuthError>;
    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: User,
}

impl TokenResponse {
    fn into_session(self, now: i64) -> Session {
        let expires_at = self
            .expires_at
            .or_else(|| self.expires_in.map(|secs| now + secs));
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
    error: Option<String>,
}

/// Client for the GoTrue auth API.
#[derive(Clone)]
pub struct AuthClient {
    auth_url: String,
    anon_key: String,
    http: Client,
}

impl AuthClient {
    pub fn new(config: &AppConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let http = Client::builder()
            .build()
            .map_err(|e| ConfigError::Client(e.to_string()))?;
        Ok(Self {
            auth_url: config.auth_url(),
            anon_key: config.supabase_anon_key.trim().to_string(),
            http,
        })
    }

    async fn post(
        &self,
        path: &str,
        bearer: Option<&str>,
        body: serde_json::Value,
    ) -> Result<(StatusCode, String), AuthError> {
        let url = format!("{}/{}", self.auth_url, path);
        let resp = self
            .http
            .post(&url)
            .header("apikey", &self.anon_key)
            .header(
                AUTHORIZATION,
                format!("Bearer {}", bearer.unwrap_or(&self.anon_key)),
            )
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(parse_auth_error(status, &text));
        }
        Ok((status, text))
    }

    async fn token(&self, grant_type: &str, body: serde_json::Value) -> Result<Session, AuthError> {
        let (_, text) = self
            .post(&format!("token?grant_type={}", grant_type), None, body)
            .await?;
        let token: TokenResponse = serde_json::from_str(&text)
            .map_err(|e| AuthError::Transport(format!("Failed to parse token response: {}", e)))?;
        Ok(token.into_session(now()))
    }
}

#[async_trait]
impl Authenticator for AuthClient {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let session = self
            .token("password", json!({ "email": email, "password": password }))
            .await?;
        log::info!("Signed in as {}", session.user.id);
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, AuthError> {
        let (_, text) = self
            .post("signup", None, json!({ "email": email, "password": password }))
            .await?;
        // With confirmation on, the body is the bare user without tokens.
        if let Ok(token) = serde_json::from_str::<TokenResponse>(&text) {
            return Ok(SignUpOutcome::SignedIn(token.into_session(now())));
        }
        log::info!("Sign-up for {} awaits email confirmation", email);
        Ok(SignUpOutcome::ConfirmationRequired {
            email: email.to_string(),
        })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, AuthError> {
        self.token("refresh_token", json!({ "refresh_token": refresh_token }))
            .await
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        self.post("logout", Some(access_token), json!({})).await?;
        Ok(())
    }
}

fn parse_auth_error(status: StatusCode, body: &str) -> AuthError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error_description.or(b.msg).or(b.message).or(b.error))
        .unwrap_or_else(|| format!("Auth server returned {}", status));
    AuthError::Rejected(message)
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Owns the current session: signs in, persists, refreshes and signs out.
pub struct SessionManager {
    auth: Box<dyn Authenticator>,
    store: Box<dyn SessionStore>,
    current: RwLock<Option<Session>>,
}

impl SessionManager {
    pub fn new(auth: Box<dyn Authenticator>, store: Box<dyn SessionStore>) -> Self {
        Self {
            auth,
            store,
            current: RwLock::new(None),
        }
    }

    fn set(&self, session: Option<Session>) {
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = session;
    }

    /// Pick up a session saved by an earlier run, refreshing it if expired.
    /// A session that can no longer be refreshed is forgotten.
    pub async fn restore(&self) -> Result<Option<Session>, AuthError> {
        let Some(stored) = self.store.load().await? else {
            return Ok(None);
        };

        if !stored.is_expired(now(), REFRESH_LEEWAY) {
            self.set(Some(stored.clone()));
            return Ok(Some(stored));
        }

        let refreshed = match stored.refresh_token.as_deref() {
            Some(token) => self.auth.refresh(token).await,
            None => Err(AuthError::Rejected("Session expired".to_string())),
        };
        match refreshed {
            Ok(session) => {
                log::debug!("Refreshed session for {}", session.user.id);
                self.store.save(&session).await?;
                self.set(Some(session.clone()));
                Ok(Some(session))
            }
            Err(e) => {
                log::warn!("Stored session could not be refreshed: {}", e);
                self.store.clear().await?;
                self.set(None);
                Ok(None)
            }
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let session = self.auth.sign_in_with_password(email, password).await?;
        self.store.save(&session).await?;
        self.set(Some(session.clone()));
        Ok(session)
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, AuthError> {
        let outcome = self.auth.sign_up(email, password).await?;
        if let SignUpOutcome::SignedIn(session) = &outcome {
            self.store.save(session).await?;
            self.set(Some(session.clone()));
        }
        Ok(outcome)
    }
}

#[async_trait]
impl SessionProvider for SessionManager {
    fn current(&self) -> Option<Session> {
        self.current.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// The local session is dropped even when the server call fails.
    async fn sign_out(&self) -> Result<(), AuthError> {
        if let Some(session) = self.current() {
            if let Err(e) = self.auth.sign_out(&session.access_token).await {
                log::warn!("Server-side sign-out failed: {}", e);
            }
        }
        self.set(None);
        self.store.clear().await
    }
}
