//! Remote record source.
//!
//! The server speaks plain JSON over HTTP. Any response object with a truthy
//! `error` field is a failure, whatever the status code.

use crate::error::{Error, Result, UNKNOWN_ERROR_MESSAGE};
use crate::Config;
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Method, StatusCode};
use serde_json::{Map, Value};
use std::time::Duration;
use waitlist_engine::{coerce_to_string, Record, RecordId, ScopeId};

/// Read and write access to the authoritative copy of the records.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Fetch every record of a collection within one scope.
    async fn fetch_collection(&self, collection: &str, scope: ScopeId) -> Result<Vec<Record>>;

    /// Fetch the record stored under `id`.
    async fn get(&self, record_type: &str, id: RecordId) -> Result<Record>;

    /// Create a record. The returned copy carries the server-assigned id.
    async fn create(&self, record_type: &str, record: &Record) -> Result<Record>;

    /// Overwrite the record stored under `id`.
    async fn update(&self, record_type: &str, id: RecordId, record: &Record) -> Result<Record>;
}

/// [`RemoteSource`] backed by the waitlist HTTP API.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpRemote {
    /// Create a remote for `base_url` with a per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth_token: None,
        })
    }

    /// Create a remote from client configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let remote = Self::new(&config.server_url, config.request_timeout)?;
        Ok(match &config.auth_token {
            Some(token) => remote.with_auth_token(token.clone()),
            None => remote,
        })
    }

    /// Send `Authorization: Bearer <token>` with every request.
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, segments: &[&str]) -> String {
        let mut url = self.base_url.clone();
        for segment in segments {
            url.push('/');
            url.push_str(segment);
        }
        url
    }

    /// Ask the server for its status document.
    pub async fn status(&self) -> Result<Value> {
        let body = self.send(Method::GET, self.url(&["status"]), None).await?;
        Ok(body.unwrap_or(Value::Null))
    }

    /// True if the server answers its status endpoint.
    pub async fn is_alive(&self) -> bool {
        self.status().await.is_ok()
    }

    /// Look up a server record equal to `record` on the given fields.
    ///
    /// Returns `None` when the server has no such record.
    pub async fn find_match(
        &self,
        record_type: &str,
        record: &Record,
        fields: &[String],
    ) -> Result<Option<Record>> {
        let example: Map<String, Value> = fields
            .iter()
            .filter_map(|field| {
                record
                    .attribute(field)
                    .map(|value| (field.clone(), value.into_owned()))
            })
            .collect();

        let url = self.url(&[&format!("{}match", record_type)]);
        match self.send(Method::POST, url, Some(&Value::Object(example))).await {
            Ok(Some(body)) => parse_record(body).map(Some),
            Ok(None) => Ok(None),
            Err(Error::Remote { code, .. }) if code == Value::from(404) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Send one request and apply the response conventions.
    ///
    /// `Ok(None)` means a 204 with no body.
    async fn send(&self, method: Method, url: String, body: Option<&Value>) -> Result<Option<Value>> {
        tracing::debug!(%method, %url, "remote request");

        let mut request = self
            .client
            .request(method, &url)
            .header(CONTENT_TYPE, "application/json");
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let text = response.text().await?;
        interpret(status, &text)
    }
}

#[async_trait]
impl RemoteSource for HttpRemote {
    async fn fetch_collection(&self, collection: &str, scope: ScopeId) -> Result<Vec<Record>> {
        let url = self.url(&[collection, &scope.to_string()]);
        parse_collection(self.send(Method::GET, url, None).await?)
    }

    async fn get(&self, record_type: &str, id: RecordId) -> Result<Record> {
        let url = self.url(&[record_type, &id.to_string()]);
        let response = self.send(Method::GET, url, None).await?;
        response.ok_or(Error::InvalidJson).and_then(parse_record)
    }

    async fn create(&self, record_type: &str, record: &Record) -> Result<Record> {
        let body = serde_json::to_value(record).map_err(|_| Error::InvalidJson)?;
        let response = self.send(Method::POST, self.url(&[record_type]), Some(&body)).await?;
        response.ok_or(Error::MissingId).and_then(parse_record)
    }

    async fn update(&self, record_type: &str, id: RecordId, record: &Record) -> Result<Record> {
        let body = serde_json::to_value(record).map_err(|_| Error::InvalidJson)?;
        let url = self.url(&[record_type, &id.to_string()]);
        let response = self.send(Method::PUT, url, Some(&body)).await?;
        response.ok_or(Error::MissingId).and_then(parse_record)
    }
}

/// A collection read must carry an array; an empty response is malformed.
fn parse_collection(response: Option<Value>) -> Result<Vec<Record>> {
    match response {
        Some(body @ Value::Array(_)) => serde_json::from_value(body).map_err(|_| Error::InvalidJson),
        _ => Err(Error::InvalidJson),
    }
}

fn parse_record(body: Value) -> Result<Record> {
    if !body.is_object() {
        return Err(Error::InvalidJson);
    }
    serde_json::from_value(body).map_err(|_| Error::InvalidJson)
}

/// Map a status and body text onto the response conventions.
fn interpret(status: StatusCode, text: &str) -> Result<Option<Value>> {
    let parsed: Option<Value> = serde_json::from_str(text).ok();

    if status.is_success() {
        let body = parsed.ok_or(Error::InvalidJson)?;
        return match application_error(&body) {
            Some(err) => Err(err),
            None => Ok(Some(body)),
        };
    }

    let mut code = Value::from(status.as_u16());
    let mut message = status.canonical_reason().unwrap_or_default().to_string();
    if let Some(body) = parsed.as_ref().and_then(Value::as_object) {
        if let Some(error) = body.get("error").filter(|v| is_truthy(v)) {
            code = error.clone();
        }
        if let Some(msg) = body.get("message").filter(|v| is_truthy(v)) {
            message = coerce_to_string(Some(msg));
        }
    }
    if message.is_empty() {
        message = UNKNOWN_ERROR_MESSAGE.to_string();
    }
    Err(Error::Remote { code, message })
}

fn application_error(body: &Value) -> Option<Error> {
    let object = body.as_object()?;
    let code = object.get("error").filter(|v| is_truthy(v))?;
    let message = object
        .get("message")
        .filter(|v| is_truthy(v))
        .map(|m| coerce_to_string(Some(m)))
        .unwrap_or_else(|| UNKNOWN_ERROR_MESSAGE.to_string());
    Some(Error::Remote {
        code: code.clone(),
        message,
    })
}

/// JavaScript truthiness of a JSON value.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
