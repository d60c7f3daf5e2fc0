//! Backend REST client
//!
//! Thin blocking client for the stamping service: document listing,
//! multipart upload and serial-number verification. Authentication is
//! token based; the token lives behind the [`TokenStore`] trait so hosts
//! decide where it is persisted.

use reqwest::blocking::multipart;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned status {0}")]
    Status(u16),
}

/// A document known to the backend
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RemoteDocument {
    pub id: u64,
    pub file: String,
    #[serde(default)]
    pub uploaded_at: Option<String>,
}

/// Response to a document upload
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub qr_code: Option<String>,
}

/// Verification result for a serial number
///
/// Always well formed for display: lookup failures are folded into
/// `valid: false` with a message rather than surfaced as errors.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SerialVerification {
    #[serde(default)]
    pub valid: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
}

impl SerialVerification {
    fn invalid() -> Self {
        Self {
            valid: false,
            message: Some("Invalid or unverified serial number.".to_owned()),
            serial_number: None,
            created_at: None,
            owner: None,
        }
    }
}

/// Where the auth token comes from
pub trait TokenStore {
    fn token(&self) -> Option<String>;
    fn set_token(&mut self, token: Option<String>);
}

/// Token held in process memory only
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Option<String>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self { token: Some(token.into()) }
    }
}

impl TokenStore for MemoryTokenStore {
    fn token(&self) -> Option<String> {
        self.token.clone()
    }

    fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }
}

/// Blocking client for the stamping backend
pub struct StampingClient<T: TokenStore> {
    base_url: String,
    http: Client,
    tokens: T,
}

impl<T: TokenStore> StampingClient<T> {
    pub fn new(base_url: impl Into<String>, tokens: T) -> Result<Self, ApiError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Ok(Self { base_url, http, tokens })
    }

    pub fn tokens(&self) -> &T {
        &self.tokens
    }

    pub fn tokens_mut(&mut self) -> &mut T {
        &mut self.tokens
    }

    /// List the caller's documents.
    pub fn list_documents(&self) -> Result<Vec<RemoteDocument>, ApiError> {
        let mut request = self.http.get(format!("{}/documents/", self.base_url));
        if let Some(token) = self.tokens.token() {
            request = request.header("Authorization", format!("Bearer {token}"));
        }

        let response = request.send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }
        Ok(response.json()?)
    }

    /// Upload a stamped document as multipart form data.
    pub fn upload(
        &self,
        file_name: impl Into<String>,
        bytes: Vec<u8>,
        mime: &str,
    ) -> Result<UploadResponse, ApiError> {
        let part = multipart::Part::bytes(bytes)
            .file_name(file_name.into())
            .mime_str(mime)?;
        let form = multipart::Form::new().part("files", part);

        let mut request = self
            .http
            .post(format!("{}/upload/", self.base_url))
            .multipart(form);
        if let Some(token) = self.tokens.token() {
            request = request.header("Authorization", format!("Bearer {token}"));
        }

        let response = request.send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }
        Ok(response.json()?)
    }

    /// Look up a serial number.
    ///
    /// Infallible by contract: network failures, non-success statuses and
    /// malformed bodies all come back as an invalid verification with a
    /// displayable message, so the caller never shows a raw error.
    pub fn verify_serial(&self, serial: &str) -> SerialVerification {
        let url = format!("{}/verify-serial/{serial}/", self.base_url);
        let response = match self.http.get(&url).send() {
            Ok(response) => response,
            Err(err) => {
                log::warn!("serial verification request failed: {err}");
                return SerialVerification::invalid();
            }
        };

        if response.status() == StatusCode::NOT_FOUND || !response.status().is_success() {
            return SerialVerification::invalid();
        }

        match response.json() {
            Ok(verification) => verification,
            Err(err) => {
                log::warn!("serial verification body was malformed: {err}");
                SerialVerification::invalid()
            }
        }
    }
}
