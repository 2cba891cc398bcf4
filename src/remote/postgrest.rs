use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder};
use serde::Deserialize;
use serde_json::Value;

use super::{Query, RemoteStore};
use crate::config::AppConfig;
use crate::error::{ConfigError, StoreError};

/// Error body PostgREST sends on failure.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    code: Option<String>,
    details: Option<String>,
    hint: Option<String>,
}

/// HTTP client for the PostgREST data API.
///
/// Built once at startup and handed to whoever needs the store. Cloning is
/// cheap and shares the underlying connection handling.
#[derive(Clone)]
pub struct StoreClient {
    rest_url: String,
    anon_key: String,
    access_token: Option<String>,
    http: Client,
}

impl StoreClient {
    pub fn new(config: &AppConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let http = Client::builder()
            .build()
            .map_err(|e| ConfigError::Client(e.to_string()))?;
        Ok(Self {
            rest_url: config.rest_url(),
            anon_key: config.supabase_anon_key.trim().to_string(),
            access_token: None,
            http,
        })
    }

    /// A copy of this client that acts as the signed-in user, so the
    /// store's row-level policies see their identity.
    pub fn authenticated(&self, access_token: &str) -> Self {
        Self {
            access_token: Some(access_token.to_string()),
            ..self.clone()
        }
    }

    fn request(&self, method: Method, query: &Query) -> RequestBuilder {
        let url = format!("{}/{}", self.rest_url, query.table);
        let bearer = self.access_token.as_deref().unwrap_or(&self.anon_key);
        self.http
            .request(method, url)
            .header("apikey", &self.anon_key)
            .header(AUTHORIZATION, format!("Bearer {}", bearer))
            .query(&query.to_params())
    }

    fn write(&self, method: Method, query: &Query) -> RequestBuilder {
        self.request(method, query)
            .header(CONTENT_TYPE, "application/json")
            .header("Prefer", "return=representation")
    }

    async fn execute(&self, req: RequestBuilder, what: &str) -> Result<Vec<Value>, StoreError> {
        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            let err = parse_error(status.as_u16(), &text);
            log::warn!("Store {} failed ({}): {}", what, status, err.message);
            return Err(err);
        }

        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Array(rows)) => Ok(rows),
            Ok(Value::Null) => Ok(Vec::new()),
            Ok(row) => Ok(vec![row]),
            Err(e) => Err(StoreError::new(format!("Failed to parse store response: {}", e))
                .with_status(status.as_u16())),
        }
    }
}

#[async_trait]
impl RemoteStore for StoreClient {
    async fn select(&self, query: &Query) -> Result<Vec<Value>, StoreError> {
        log::debug!("GET {} {:?}", query.table, query.to_params());
        self.execute(self.request(Method::GET, query), "select").await
    }

    async fn insert(&self, query: &Query, rows: Vec<Value>) -> Result<Vec<Value>, StoreError> {
        log::debug!("POST {} ({} rows)", query.table, rows.len());
        // Inserts carry no filters; only the returned representation matters.
        let req = self
            .write(Method::POST, query)
            .json(&Value::Array(rows));
        self.execute(req, "insert").await
    }

    async fn update(&self, query: &Query, patch: Value) -> Result<Vec<Value>, StoreError> {
        log::debug!("PATCH {} {:?}", query.table, query.filters);
        let req = self.write(Method::PATCH, query).json(&patch);
        self.execute(req, "update").await
    }

    async fn delete(&self, query: &Query) -> Result<Vec<Value>, StoreError> {
        log::debug!("DELETE {} {:?}", query.table, query.filters);
        self.execute(self.write(Method::DELETE, query), "delete").await
    }
}

/// Turn an error response into a [`StoreError`], keeping the server's message.
fn parse_error(status: u16, body: &str) -> StoreError {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            message: Some(message),
            code,
            details,
            hint,
        }) => {
            if let Some(d) = details.as_deref().filter(|d| !d.is_empty()) {
                log::debug!("Store error details: {}", d);
            }
            if let Some(h) = hint.as_deref().filter(|h| !h.is_empty()) {
                log::debug!("Store error hint: {}", h);
            }
            StoreError {
                message,
                code,
                status: Some(status),
            }
        }
        _ => {
            let body = body.trim();
            let message = if body.is_empty() {
                format!("Store returned status {}", status)
            } else {
                format!("Store returned status {}: {}", status, body)
            };
            StoreError::new(message).with_status(status)
        }
    }
}
