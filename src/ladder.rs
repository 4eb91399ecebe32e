//! # ladder: ordered transport-encoding fallback over one object name
//!
//! The ladder turns a [`MediaHandle`] into a [`RemoteImageReference`] by trying,
//! strictly in order, a multipart form, a binary blob, and a raw byte buffer
//! against the same [`StoredObjectName`]. The first step whose put is acknowledged
//! wins and the public URL is derived for that name; later steps are not tried.
//!
//! Step failures are absorbed and recorded in the [`UploadReport`]. Only the
//! exhaustion of every step (or a missing credential, which no encoding can fix)
//! surfaces, as [`UploadFailed`].
//!
//! Steps never run in parallel: each step's partial object at the shared name
//! must settle before the next overwrite is issued.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::contract::{MediaReader, ObjectStore};
use crate::error::{StepFailure, StoreError, UploadFailed};
use crate::media::{mime_for_uri, Encoding, MediaHandle, Payload, UploadCandidate};
use crate::object_name::{RemoteImageReference, StoredObjectName};

/// One rung of the ladder: turns a handle into a wire candidate.
#[async_trait]
pub trait EncodingStep: Send + Sync {
    fn encoding(&self) -> Encoding;

    async fn encode(
        &self,
        handle: &MediaHandle,
        name: &StoredObjectName,
        reader: &dyn MediaReader,
    ) -> Result<UploadCandidate, StepFailure>;
}

/// Wraps the file as a named multipart part; keeps file name and content type.
pub struct MultipartStep;

#[async_trait]
impl EncodingStep for MultipartStep {
    fn encoding(&self) -> Encoding {
        Encoding::FormMultipart
    }

    async fn encode(
        &self,
        handle: &MediaHandle,
        name: &StoredObjectName,
        reader: &dyn MediaReader,
    ) -> Result<UploadCandidate, StepFailure> {
        let encoding = self.encoding();
        let bytes = reader
            .read_file(handle)
            .await
            .map_err(|source| StepFailure::Read { encoding, source })?;
        if bytes.is_empty() {
            return Err(StepFailure::EmptyPayload { encoding });
        }
        Ok(UploadCandidate {
            encoding,
            payload: Payload::Multipart {
                file_name: name.as_str().to_string(),
                bytes,
            },
            content_type: mime_for_uri(&handle.local_uri).to_string(),
        })
    }
}

/// Re-fetches the bytes through a generic stream read and sends them unframed.
pub struct BlobStep;

#[async_trait]
impl EncodingStep for BlobStep {
    fn encoding(&self) -> Encoding {
        Encoding::BinaryBlob
    }

    async fn encode(
        &self,
        handle: &MediaHandle,
        _name: &StoredObjectName,
        reader: &dyn MediaReader,
    ) -> Result<UploadCandidate, StepFailure> {
        let encoding = self.encoding();
        let blob = reader
            .fetch_blob(handle)
            .await
            .map_err(|source| StepFailure::Read { encoding, source })?;
        // Zero-length blob is a corrupt read: escalate, never retry here.
        if blob.bytes.is_empty() {
            return Err(StepFailure::EmptyPayload { encoding });
        }
        Ok(UploadCandidate {
            encoding,
            payload: Payload::Blob(blob.bytes),
            content_type: blob
                .content_type
                .unwrap_or_else(|| handle.mime_type.clone()),
        })
    }
}

/// Last resort: raw buffer with an explicit content type.
pub struct RawBufferStep;

#[async_trait]
impl EncodingStep for RawBufferStep {
    fn encoding(&self) -> Encoding {
        Encoding::RawByteBuffer
    }

    async fn encode(
        &self,
        handle: &MediaHandle,
        _name: &StoredObjectName,
        reader: &dyn MediaReader,
    ) -> Result<UploadCandidate, StepFailure> {
        let encoding = self.encoding();
        let buffer = reader
            .fetch_buffer(handle)
            .await
            .map_err(|source| StepFailure::Read { encoding, source })?;
        if buffer.is_empty() {
            return Err(StepFailure::EmptyPayload { encoding });
        }
        Ok(UploadCandidate {
            encoding,
            payload: Payload::Raw(buffer),
            content_type: handle.mime_type.clone(),
        })
    }
}

/// Record of a single step attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    pub encoding: Encoding,
    /// `None` when the step succeeded.
    pub failure: Option<String>,
}

/// Successful ladder run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReport {
    pub name: StoredObjectName,
    pub reference: RemoteImageReference,
    pub attempts: Vec<AttemptRecord>,
}

impl UploadReport {
    /// Encoding of the step that got the object stored.
    pub fn winning_encoding(&self) -> Option<Encoding> {
        self.attempts
            .iter()
            .find(|a| a.failure.is_none())
            .map(|a| a.encoding)
    }
}

pub struct EncoderLadder {
    steps: Vec<Box<dyn EncodingStep>>,
    reader: Arc<dyn MediaReader>,
    store: Arc<dyn ObjectStore>,
}

impl EncoderLadder {
    /// The standard three-step ladder: multipart, blob, raw buffer.
    pub fn new(reader: Arc<dyn MediaReader>, store: Arc<dyn ObjectStore>) -> Self {
        Self::with_steps(
            vec![
                Box::new(MultipartStep),
                Box::new(BlobStep),
                Box::new(RawBufferStep),
            ],
            reader,
            store,
        )
    }

    pub fn with_steps(
        steps: Vec<Box<dyn EncodingStep>>,
        reader: Arc<dyn MediaReader>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            steps,
            reader,
            store,
        }
    }

    /// Encodes with `step`, puts under `name`, and derives the reference on success.
    pub async fn attempt(
        &self,
        step: &dyn EncodingStep,
        handle: &MediaHandle,
        name: &StoredObjectName,
    ) -> Result<RemoteImageReference, StepFailure> {
        let encoding = step.encoding();
        let candidate = step.encode(handle, name, self.reader.as_ref()).await?;
        let size = candidate.len();
        info!(
            step = encoding.step(),
            %encoding,
            object = %name,
            bytes = size,
            content_type = %candidate.content_type,
            "[LADDER] Putting candidate"
        );
        self.store
            .put_object(name, candidate)
            .await
            .map_err(|source| StepFailure::Store { encoding, source })?;
        Ok(self.store.public_url_for(name))
    }

    pub async fn upload(
        &self,
        handle: &MediaHandle,
        name: &StoredObjectName,
    ) -> Result<UploadReport, UploadFailed> {
        self.upload_with_progress(handle, name, &|_: Encoding| {}).await
    }

    /// Runs the ladder, calling `on_step` as each step starts.
    pub async fn upload_with_progress(
        &self,
        handle: &MediaHandle,
        name: &StoredObjectName,
        on_step: &(dyn Fn(Encoding) + Send + Sync),
    ) -> Result<UploadReport, UploadFailed> {
        let mut attempts = Vec::with_capacity(self.steps.len());
        let mut last_failure: Option<StepFailure> = None;

        for step in &self.steps {
            let encoding = step.encoding();
            on_step(encoding);

            match self.attempt(step.as_ref(), handle, name).await {
                Ok(reference) => {
                    info!(%encoding, object = %name, url = %reference, "[LADDER] Upload resolved");
                    attempts.push(AttemptRecord {
                        encoding,
                        failure: None,
                    });
                    return Ok(UploadReport {
                        name: name.clone(),
                        reference,
                        attempts,
                    });
                }
                Err(failure) => {
                    warn!(%encoding, object = %name, error = %failure, "[LADDER] Step failed");
                    attempts.push(AttemptRecord {
                        encoding,
                        failure: Some(failure.to_string()),
                    });
                    if failure.is_terminal() {
                        error!(object = %name, "[LADDER][ERROR] No credential for store, aborting ladder");
                        return Err(UploadFailed {
                            reason: StoreError::Unauthenticated.to_string(),
                        });
                    }
                    last_failure = Some(failure);
                }
            }
        }

        let reason = last_failure
            .map(|f| f.to_string())
            .unwrap_or_else(|| "no encodings configured".to_string());
        error!(object = %name, reason = %reason, attempts = attempts.len(), "[LADDER][ERROR] All encodings exhausted");
        Err(UploadFailed { reason })
    }
}
