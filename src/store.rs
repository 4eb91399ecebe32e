//! Object store clients: a bucket REST client and an in-memory upsert store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, error, info};

use crate::config::StoreConfig;
use crate::contract::{CredentialProvider, ObjectStore, PutAck};
use crate::error::StoreError;
use crate::media::{Encoding, Payload, UploadCandidate};
use crate::object_name::{RemoteImageReference, StoredObjectName};

const STREAM_CHUNK_BYTES: usize = 64 * 1024;

#[derive(Debug, Deserialize)]
struct PutResponse {
    #[serde(rename = "Key", alias = "key")]
    key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StoreErrorBody {
    #[serde(alias = "error")]
    message: Option<String>,
}

/// Client for a bucket REST API (`POST {endpoint}/object/{bucket}/{name}`, upsert).
pub struct HttpObjectStore {
    client: Client,
    config: StoreConfig,
    credentials: Option<Arc<dyn CredentialProvider>>,
}

impl HttpObjectStore {
    pub fn new(
        config: StoreConfig,
        credentials: Option<Arc<dyn CredentialProvider>>,
    ) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(StoreError::transport)?;
        Ok(Self {
            client,
            config,
            credentials,
        })
    }

    fn object_url(&self, name: &StoredObjectName) -> String {
        format!(
            "{}/object/{}/{}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.bucket,
            name
        )
    }

    async fn bearer(&self) -> Result<Option<String>, StoreError> {
        let token = match &self.credentials {
            Some(provider) => provider.token().await,
            None => None,
        };
        match token {
            Some(token) => Ok(Some(token)),
            None if self.config.require_token => Err(StoreError::Unauthenticated),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn put_object(
        &self,
        name: &StoredObjectName,
        candidate: UploadCandidate,
    ) -> Result<PutAck, StoreError> {
        let token = self.bearer().await?;
        let url = self.object_url(name);
        let size = candidate.len() as u64;
        let content_type = candidate.content_type;

        let mut request = self.client.post(&url).header("x-upsert", "true");
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        request = match candidate.payload {
            Payload::Multipart { file_name, bytes } => {
                let part = Part::bytes(bytes.to_vec())
                    .file_name(file_name)
                    .mime_str(&content_type)
                    .map_err(StoreError::transport)?;
                request.multipart(Form::new().part("file", part))
            }
            Payload::Blob(bytes) => {
                let chunks: Vec<Result<Bytes, std::io::Error>> = (0..bytes.len())
                    .step_by(STREAM_CHUNK_BYTES)
                    .map(|start| Ok(bytes.slice(start..(start + STREAM_CHUNK_BYTES).min(bytes.len()))))
                    .collect();
                request
                    .header(CONTENT_TYPE, content_type.as_str())
                    .body(Body::wrap_stream(futures::stream::iter(chunks)))
            }
            Payload::Raw(buffer) => request
                .header(CONTENT_TYPE, content_type.as_str())
                .header(CONTENT_LENGTH, buffer.len())
                .body(buffer),
        };

        debug!(url = %url, bytes = size, encoding = %candidate.encoding, "Sending object to store");
        let response = request.send().await.map_err(|e| {
            error!(error = ?e, object = %name, "Store request failed before a response");
            StoreError::transport(e)
        })?;

        let status = response.status();
        if status == StatusCode::UNSUPPORTED_MEDIA_TYPE || status == StatusCode::NOT_IMPLEMENTED {
            return Err(StoreError::Unsupported);
        }
        if status == StatusCode::UNAUTHORIZED {
            return Err(StoreError::Unauthenticated);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<StoreErrorBody>(&text)
                .ok()
                .and_then(|b| b.message)
                .unwrap_or(text);
            error!(status = status.as_u16(), message = %message, object = %name, "Store rejected object");
            return Err(StoreError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let key = response
            .json::<PutResponse>()
            .await
            .ok()
            .and_then(|r| r.key)
            .unwrap_or_else(|| format!("{}/{}", self.config.bucket, name));
        info!(key = %key, bytes = size, "Object stored");
        Ok(PutAck {
            key,
            size_bytes: size,
        })
    }

    fn public_url_for(&self, name: &StoredObjectName) -> RemoteImageReference {
        RemoteImageReference::new(format!(
            "{}/{}/{}",
            self.config.public_base.trim_end_matches('/'),
            self.config.bucket,
            name
        ))
    }
}

/// Object held by [`InMemoryObjectStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Bytes,
    pub content_type: String,
    pub encoding: Encoding,
}

/// Process-local store with upsert semantics.
#[derive(Debug)]
pub struct InMemoryObjectStore {
    public_base: String,
    bucket: String,
    objects: Mutex<HashMap<String, StoredObject>>,
}

impl InMemoryObjectStore {
    pub fn new(public_base: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            public_base: public_base.into(),
            bucket: bucket.into(),
            objects: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, name: &StoredObjectName) -> Option<StoredObject> {
        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name.as_str())
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put_object(
        &self,
        name: &StoredObjectName,
        candidate: UploadCandidate,
    ) -> Result<PutAck, StoreError> {
        let object = StoredObject {
            bytes: candidate.bytes(),
            content_type: candidate.content_type.clone(),
            encoding: candidate.encoding,
        };
        let size_bytes = object.bytes.len() as u64;
        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.as_str().to_string(), object);
        Ok(PutAck {
            key: format!("{}/{}", self.bucket, name),
            size_bytes,
        })
    }

    fn public_url_for(&self, name: &StoredObjectName) -> RemoteImageReference {
        RemoteImageReference::new(format!(
            "{}/{}/{}",
            self.public_base.trim_end_matches('/'),
            self.bucket,
            name
        ))
    }
}
