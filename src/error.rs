use thiserror::Error;

/// Any failure reported by, or on the way to, the remote store.
///
/// Auth failures, constraint violations, missing rows and transport errors
/// all collapse into this one kind. `message` is what the user sees.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct StoreError {
    pub message: String,
    /// PostgREST / Postgres error code, when the server sent one.
    pub code: Option<String>,
    /// HTTP status, when the failure came back as a response.
    pub status: Option<u16>,
}

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            status: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Raised when a write filtered by id touched nothing.
    pub fn no_rows(table: &str, id: i64) -> Self {
        Self::new(format!("No row in {} with id {}", table, id)).with_code("PGRST116")
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        let status = e.status().map(|s| s.as_u16());
        Self {
            message: format!("Request to store failed: {}", e),
            code: None,
            status,
        }
    }
}

/// Input rejected before any request is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Title is required")]
    MissingTitle,
    #[error("Category is required")]
    MissingCategory,
    #[error("Category name is required")]
    EmptyCategoryName,
    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("Email and password are required")]
    MissingCredentials,
}

/// Failure reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("{0}")]
    Rejected(String),
    #[error("Auth request failed: {0}")]
    Transport(String),
    #[error("Keyring error: {0}")]
    Keyring(String),
}

impl From<reqwest::Error> for AuthError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Missing required configuration value {0}")]
    Missing(&'static str),
    #[error("Invalid store URL '{0}'")]
    InvalidUrl(String),
    #[error("Failed to read config file {path}: {reason}")]
    File { path: String, reason: String },
    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Not signed in")]
    NotSignedIn,
    #[error("{0}")]
    Page(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_displays_raw_message() {
        let err = StoreError::new("duplicate key value violates unique constraint")
            .with_code("23505")
            .with_status(409);
        assert_eq!(err.to_string(), "duplicate key value violates unique constraint");
        assert_eq!(err.code.as_deref(), Some("23505"));
    }

    #[test]
    fn crate_error_is_transparent_for_store() {
        let err: Error = StoreError::new("JWT expired").into();
        assert_eq!(err.to_string(), "JWT expired");
    }
}
