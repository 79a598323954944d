//! Base HTTP client for the platform API

use reqwest::{Client, Method};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;

use crate::error::{HearthError, Result};

/// API response envelope used by every platform endpoint
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub message: Option<String>,
}

/// Base HTTP client for API operations
#[derive(Debug, Clone)]
pub struct BaseClient {
    client: Client,
    base_url: String,
}

impl BaseClient {
    pub fn new(base_url: String, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self { client, base_url })
    }

    fn endpoint_url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }

    pub async fn request<T, R>(
        &self,
        method: Method,
        endpoint: &str,
        payload: Option<&T>,
    ) -> Result<ApiResponse<R>>
    where
        T: Serialize,
        R: DeserializeOwned,
    {
        self.execute(method, endpoint, payload, None).await
    }

    pub async fn request_with_bearer<T, R>(
        &self,
        method: Method,
        endpoint: &str,
        payload: Option<&T>,
        bearer_token: &str,
    ) -> Result<ApiResponse<R>>
    where
        T: Serialize,
        R: DeserializeOwned,
    {
        self.execute(method, endpoint, payload, Some(bearer_token))
            .await
    }

    async fn execute<T, R>(
        &self,
        method: Method,
        endpoint: &str,
        payload: Option<&T>,
        bearer_token: Option<&str>,
    ) -> Result<ApiResponse<R>>
    where
        T: Serialize,
        R: DeserializeOwned,
    {
        let url = self.endpoint_url(endpoint);

        let mut request_builder = self
            .client
            .request(method, &url)
            .header("Content-Type", "application/json");

        if let Some(token) = bearer_token {
            request_builder = request_builder.header("Authorization", format!("Bearer {}", token));
        }

        if let Some(data) = payload {
            request_builder = request_builder.json(data);
        }

        let response = request_builder.send().await?;
        let status = response.status();
        let response_text = response.text().await?;

        if status.as_u16() == 401 {
            let detail = serde_json::from_str::<ApiResponse<R>>(&response_text)
                .ok()
                .and_then(|r| r.error.or(r.message))
                .unwrap_or_else(|| "Authentication failed".to_string());
            return Err(HearthError::authentication(detail));
        }

        match serde_json::from_str::<ApiResponse<R>>(&response_text) {
            Ok(api_response) => {
                if !api_response.success {
                    let error_message = api_response
                        .error
                        .or(api_response.message)
                        .unwrap_or_else(|| "Unknown API error".to_string());
                    return Err(HearthError::api(status.as_u16(), error_message));
                }
                Ok(api_response)
            }
            Err(_) => Err(HearthError::invalid_response(format!(
                "Invalid API response ({}): {}",
                status.as_u16(),
                response_text
            ))),
        }
    }
}
