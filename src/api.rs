//! HTTP client for the remote punch API.
//!
//! Failures are classified at the boundary: no response at all is a
//! [`ApiError::Network`], any non-2xx response is an [`ApiError::Server`]
//! carrying the body's optional `message`, and a request that could not be
//! built is an [`ApiError::Client`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{error, info};

use crate::config::ApiConfig;
use crate::contract::PunchApi;
use crate::draft::{PunchPayload, PunchRecord};
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[derive(Clone, Debug)]
pub struct HttpPunchApi {
    client: Client,
    base_url: String,
}

impl HttpPunchApi {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ApiError::Client {
                message: format!("Failed to create HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str, token: &str) -> RequestBuilder {
        self.client
            .request(method, self.build_url(path))
            .bearer_auth(token)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        method: &str,
        path: &str,
    ) -> Result<T, ApiError> {
        let response = request.send().await.map_err(|e| {
            if e.is_builder() {
                error!(method, path, error = %e, "Punch API request could not be built");
                ApiError::Client {
                    message: e.to_string(),
                }
            } else {
                error!(method, path, error = %e, "Punch API request got no response");
                ApiError::Network { source: e }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&text)
                .ok()
                .and_then(|b| b.message);
            error!(method, path, status = status.as_u16(), message = ?message, "Punch API returned an error");
            return Err(ApiError::Server {
                status: status.as_u16(),
                message,
            });
        }

        info!(method, path, status = status.as_u16(), "Punch API call succeeded");
        response.json::<T>().await.map_err(|e| ApiError::Server {
            status: status.as_u16(),
            message: Some(format!("Failed to parse response as JSON: {e}")),
        })
    }
}

#[async_trait]
impl PunchApi for HttpPunchApi {
    async fn create_punch(&self, body: &PunchPayload, token: &str) -> Result<PunchRecord, ApiError> {
        let path = "/punches";
        let request = self.request(Method::POST, path, token).json(body);
        self.send(request, "POST", path).await
    }

    async fn update_punch(
        &self,
        id: &str,
        body: &PunchPayload,
        token: &str,
    ) -> Result<PunchRecord, ApiError> {
        let path = format!("/punches/{id}");
        let request = self.request(Method::PUT, &path, token).json(body);
        self.send(request, "PUT", &path).await
    }

    async fn get_punch(&self, id: &str, token: &str) -> Result<PunchRecord, ApiError> {
        let path = format!("/punches/{id}");
        let request = self.request(Method::GET, &path, token);
        self.send(request, "GET", &path).await
    }
}
