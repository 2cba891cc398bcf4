use crate::core::session::Session;
use crate::error::ValidationError;
use crate::remote::auth::{SessionManager, SignUpOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    #[default]
    Login,
    Register,
}

/// Login / register form state.
#[derive(Debug, Clone, Default)]
pub struct AuthPage {
    pub mode: AuthMode,
    pub email: String,
    pub password: String,
    pub loading: bool,
    pub error: Option<String>,
    /// Informational message, e.g. after registering.
    pub notice: Option<String>,
}

impl AuthPage {
    pub fn new(mode: AuthMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err(ValidationError::MissingCredentials);
        }
        Ok(())
    }

    /// Submit the form. Yields a session when the user ends up signed in.
    ///
    /// A registration that needs email confirmation switches the form to
    /// login mode and leaves a notice instead.
    pub async fn submit(&mut self, sessions: &SessionManager) -> Option<Session> {
        self.error = None;
        self.notice = None;
        if let Err(e) = self.validate() {
            self.error = Some(e.to_string());
            return None;
        }

        self.loading = true;
        let email = self.email.trim().to_string();
        let result = match self.mode {
            AuthMode::Login => sessions.sign_in(&email, &self.password).await.map(Some),
            AuthMode::Register => match sessions.sign_up(&email, &self.password).await {
                Ok(SignUpOutcome::SignedIn(session)) => Ok(Some(session)),
                Ok(SignUpOutcome::ConfirmationRequired { email }) => {
                    self.notice = Some(format!(
                        "Registration successful! Check {} to verify your account.",
                        email
                    ));
                    self.mode = AuthMode::Login;
                    Ok(None)
                }
                Err(e) => Err(e),
            },
        };
        self.loading = false;

        match result {
            Ok(session) => {
                self.password.clear();
                session
            }
            Err(e) => {
                log::warn!("Authentication failed for {}: {}", email, e);
                self.error = Some(e.to_string());
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::session::User;
    use crate::error::AuthError;
    use crate::remote::auth::Authenticator;
    use crate::remote::keyring::EphemeralSessionStore;
    use async_trait::async_trait;

    struct Fixed;

    #[async_trait]
    impl Authenticator for Fixed {
        async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, AuthError> {
            if password != "pw" {
                return Err(AuthError::Rejected("Invalid login credentials".into()));
            }
            Ok(Session {
                access_token: "jwt".into(),
                refresh_token: None,
                expires_at: None,
                user: User {
                    id: "u1".into(),
                    email: Some(email.into()),
                },
            })
        }

        async fn sign_up(&self, email: &str, _password: &str) -> Result<SignUpOutcome, AuthError> {
            Ok(SignUpOutcome::ConfirmationRequired { email: email.into() })
        }

        async fn refresh(&self, _refresh_token: &str) -> Result<Session, AuthError> {
            Err(AuthError::Rejected("unsupported".into()))
        }

        async fn sign_out(&self, _access_token: &str) -> Result<(), AuthError> {
            Ok(())
        }
    }

    fn manager() -> SessionManager {
        SessionManager::new(Box::new(Fixed), Box::new(EphemeralSessionStore::default()))
    }

    #[tokio::test]
    async fn empty_credentials_are_rejected_locally() {
        let mut page = AuthPage::new(AuthMode::Login);
        assert!(page.submit(&manager()).await.is_none());
        assert_eq!(page.error.as_deref(), Some("Email and password are required"));
    }

    #[tokio::test]
    async fn login_success_and_failure() {
        let sessions = manager();
        let mut page = AuthPage::new(AuthMode::Login);
        page.email = "a@b.c".into();
        page.password = "bad".into();
        assert!(page.submit(&sessions).await.is_none());
        assert_eq!(page.error.as_deref(), Some("Invalid login credentials"));
        assert!(!page.loading);

        page.password = "pw".into();
        let session = page.submit(&sessions).await.unwrap();
        assert_eq!(session.user.id, "u1");
        assert!(page.error.is_none());
        assert!(page.password.is_empty());
    }

    #[tokio::test]
    async fn register_asks_for_confirmation() {
        let mut page = AuthPage::new(AuthMode::Register);
        page.email = "new@b.c".into();
        page.password = "pw".into();
        assert!(page.submit(&manager()).await.is_none());
        assert_eq!(page.mode, AuthMode::Login);
        assert!(page.notice.as_deref().unwrap().contains("new@b.c"));
    }
}
