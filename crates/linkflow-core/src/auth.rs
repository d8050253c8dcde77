use anyhow::{anyhow, Result};
use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use std::time::Duration;

/// Secure string that clears memory on drop
#[derive(Clone)]
pub struct SecureString {
    data: Vec<u8>,
}

impl SecureString {
    pub fn new(s: String) -> Self {
        Self {
            data: s.into_bytes(),
        }
    }

    pub fn as_str(&self) -> Result<&str> {
        std::str::from_utf8(&self.data)
            .map_err(|e| anyhow!("Invalid UTF-8 in secure string: {}", e))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Drop for SecureString {
    fn drop(&mut self) {
        for byte in &mut self.data {
            *byte = 0;
        }
    }
}

impl std::fmt::Debug for SecureString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecureString([REDACTED] {} bytes)", self.len())
    }
}

impl std::fmt::Display for SecureString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

/// Authorization schemes understood by the resource-management API
#[derive(Debug, Clone, PartialEq)]
pub enum AuthScheme {
    /// `Authorization: Token <value>`
    Token,
    /// `Authorization: Bearer <value>`
    Bearer,
}

impl AuthScheme {
    fn prefix(&self) -> &'static str {
        match self {
            AuthScheme::Token => "Token",
            AuthScheme::Bearer => "Bearer",
        }
    }
}

/// Holds the API credential and turns it into request headers
pub struct AuthManager {
    scheme: AuthScheme,
    token: SecureString,
}

impl AuthManager {
    /// Creates a new authentication manager after validating the token
    pub fn new(token: &str, scheme: AuthScheme) -> Result<Self> {
        let token = token.trim();
        Self::validate_token(token)?;

        Ok(Self {
            scheme,
            token: SecureString::new(token.to_string()),
        })
    }

    /// Creates an authentication manager using the `Token` scheme
    pub fn api_token(token: &str) -> Result<Self> {
        Self::new(token, AuthScheme::Token)
    }

    /// Validates token format
    fn validate_token(token: &str) -> Result<()> {
        if token.is_empty() {
            return Err(anyhow!("Authentication token cannot be empty"));
        }

        if token.len() < 8 {
            return Err(anyhow!(
                "Authentication token too short (minimum 8 characters)"
            ));
        }

        if token.len() > 2048 {
            return Err(anyhow!(
                "Authentication token too long (maximum 2048 characters)"
            ));
        }

        if token.chars().any(char::is_whitespace) {
            return Err(anyhow!("Authentication token contains invalid characters"));
        }

        if token.starts_with("test") || token.starts_with("demo") || token == "placeholder" {
            warn!("Authentication token appears to be a test/demo token");
        }

        Ok(())
    }

    /// Adds the authorization header to a header map
    pub fn add_auth_headers(&self, headers: &mut HeaderMap) -> Result<()> {
        let auth_value = format!("{} {}", self.scheme.prefix(), self.token.as_str()?);
        let mut header_value = HeaderValue::from_str(&auth_value)
            .map_err(|e| anyhow!("Invalid authorization token format: {}", e))?;
        header_value.set_sensitive(true);
        headers.insert(AUTHORIZATION, header_value);

        debug!("Added authorization header using scheme {}", self.scheme.prefix());
        Ok(())
    }

    /// Creates a reqwest client that sends the authorization header on every call
    pub fn create_authenticated_client(&self, timeout: Duration) -> Result<reqwest::Client> {
        let mut headers = HeaderMap::new();
        self.add_auth_headers(&mut headers)?;

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(client)
    }

    pub fn scheme(&self) -> &AuthScheme {
        &self.scheme
    }
}
