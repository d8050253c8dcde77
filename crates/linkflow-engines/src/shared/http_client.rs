use anyhow::Result;
use linkflow_core::auth::AuthManager;
use linkflow_core::config::{EnvironmentConfig, HttpSettings};
use linkflow_core::error::{LinkflowError, LinkflowResult, TransportFailure};
use log::{debug, info};
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;

use crate::shared::url_builder::UrlBuilder;

/// Statuses the object-storage endpoint may answer a pre-signed POST with
pub const UPLOAD_SUCCESS_STATUSES: [u16; 3] = [200, 201, 204];

/// Query string pairs appended to an API call
pub type Query<'a> = [(&'a str, String)];

/// HTTP client for the resource-management API and the object-storage endpoint
pub struct ApiHttpClient {
    client: Client,
    upload_client: Client,
    base_url: String,
    org_id: u64,
}

impl ApiHttpClient {
    /// Create a new client bound to one environment and organization
    pub fn new(
        auth: &AuthManager,
        environment: &EnvironmentConfig,
        org_id: u64,
        settings: HttpSettings,
    ) -> Result<Self> {
        let client = auth.create_authenticated_client(settings.timeout)?;

        // The pre-signed POST carries its own credentials; the API token must not leak to it.
        let upload_client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create upload client: {}", e))?;

        Ok(Self {
            client,
            upload_client,
            base_url: environment.api_base_url.clone(),
            org_id,
        })
    }

    /// `organization=<id>` query pair
    pub fn org_query(&self) -> (&'static str, String) {
        ("organization", self.org_id.to_string())
    }

    /// Send a POST request with JSON payload
    pub async fn post_json(
        &self,
        step: &str,
        path: &str,
        query: &Query<'_>,
        payload: &Value,
    ) -> LinkflowResult<Value> {
        let url = UrlBuilder::build_url(&self.base_url, path);
        let request = self.client.post(&url).query(query).json(payload);
        let response = self.dispatch(step, request).await?;
        Self::read_json(step, response).await
    }

    /// Send a PUT request with JSON payload
    pub async fn put_json(
        &self,
        step: &str,
        path: &str,
        query: &Query<'_>,
        payload: &Value,
    ) -> LinkflowResult<Value> {
        let url = UrlBuilder::build_url(&self.base_url, path);
        let request = self.client.put(&url).query(query).json(payload);
        let response = self.dispatch(step, request).await?;
        Self::read_json(step, response).await
    }

    /// Send a GET request and decode the JSON body
    pub async fn get_json(&self, step: &str, path: &str, query: &Query<'_>) -> LinkflowResult<Value> {
        let url = UrlBuilder::build_url(&self.base_url, path);
        let request = self.client.get(&url).query(query);
        let response = self.dispatch(step, request).await?;
        Self::read_json(step, response).await
    }

    /// Send a GET request and return the body verbatim
    pub async fn get_bytes(&self, step: &str, path: &str, query: &Query<'_>) -> LinkflowResult<Vec<u8>> {
        let url = UrlBuilder::build_url(&self.base_url, path);
        let request = self.client.get(&url).query(query);
        let response = self.dispatch(step, request).await?;
        let bytes = response.bytes().await.map_err(|e| {
            LinkflowError::invalid_response(step, format!("failed to read body: {}", e))
        })?;
        Ok(bytes.to_vec())
    }

    /// POST a multipart form to an absolute object-storage URL; returns the status
    pub async fn post_multipart(
        &self,
        step: &str,
        url: &str,
        form: reqwest::multipart::Form,
    ) -> LinkflowResult<u16> {
        let request = self
            .upload_client
            .post(url)
            .multipart(form)
            .build()
            .map_err(|e| TransportFailure::new(step, "POST", url, None, &e.to_string()))?;
        let method = request.method().to_string();
        let url = request.url().to_string();

        debug!("Step [{}] {} {}", step, method, url);
        let response = self
            .upload_client
            .execute(request)
            .await
            .map_err(|e| TransportFailure::new(step, &method, &url, None, &e.to_string()))?;

        let status = response.status().as_u16();
        if !UPLOAD_SUCCESS_STATUSES.contains(&status) {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportFailure::new(step, &method, &url, Some(status), &body).into());
        }

        info!("Step [{}] ok ({})", step, status);
        Ok(status)
    }

    async fn dispatch(&self, step: &str, request: RequestBuilder) -> LinkflowResult<Response> {
        let request = request.build().map_err(|e| {
            LinkflowError::Config(format!("invalid request for step [{}]: {}", step, e))
        })?;
        let method = request.method().to_string();
        let url = request.url().to_string();

        debug!("Step [{}] {} {}", step, method, url);
        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| TransportFailure::new(step, &method, &url, None, &e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(
                TransportFailure::new(step, &method, &url, Some(status.as_u16()), &body).into(),
            );
        }

        info!("Step [{}] ok ({})", step, status.as_u16());
        Ok(response)
    }

    async fn read_json(step: &str, response: Response) -> LinkflowResult<Value> {
        let text = response.text().await.map_err(|e| {
            LinkflowError::invalid_response(step, format!("failed to read body: {}", e))
        })?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| {
            LinkflowError::invalid_response(step, format!("body is not valid JSON: {}", e))
        })
    }
}
