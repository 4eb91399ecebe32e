#![allow(unused)]

//! # contract: collaborator interfaces of the capture pipeline
//!
//! Every boundary the pipeline crosses is a trait here, so the orchestrator can
//! be driven by real device/network clients or by deterministic mocks.
//!
//! ## Interface & Extensibility
//! - [`CredentialProvider`] hands out short-lived bearer tokens.
//! - [`PermissionGate`] and [`CaptureBackend`] stand in for the device runtime.
//! - [`MediaAcquirer`] turns a capture request into a [`MediaHandle`].
//! - [`MediaReader`] re-reads the bytes behind a handle, one method per access path.
//! - [`ObjectStore`] uploads named payloads and derives their public URL.
//! - [`PunchApi`] is the remote punch record API.
//!
//! ## Mocking & Testing
//! - All traits are annotated for `mockall`; mocks are exported with the
//!   `test-export-mocks` feature (on by default) for the integration tests.

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use mockall::{automock, predicate::*};

use crate::draft::{PunchPayload, PunchRecord};
use crate::error::{AcquireError, ApiError, MediaReadError, StoreError};
use crate::media::{Blob, CaptureSource, MediaHandle, UploadCandidate};
use crate::object_name::{RemoteImageReference, StoredObjectName};

/// Runtime permission guarding a capture source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Camera,
    MediaLibrary,
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Permission::Camera => f.write_str("camera"),
            Permission::MediaLibrary => f.write_str("photo library"),
        }
    }
}

impl CaptureSource {
    /// The narrowest permission needed to use this source.
    pub fn required_permission(self) -> Permission {
        match self {
            CaptureSource::Camera => Permission::Camera,
            CaptureSource::Gallery => Permission::MediaLibrary,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

/// Options handed to the device when launching capture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureOptions {
    /// Compression quality in (0, 1].
    pub quality: f32,
}

/// What the device returned for a completed capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedAsset {
    pub uri: String,
    pub mime_type: Option<String>,
    pub file_size: Option<u64>,
}

/// Outcome of [`MediaAcquirer::acquire`]. Cancellation is not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acquisition {
    Captured(MediaHandle),
    PermissionDenied(Permission),
    UserCancelled,
}

/// Store acknowledgement for a put.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutAck {
    pub key: String,
    pub size_bytes: u64,
}

/// Yields a bearer token valid for a bounded lifetime, or `None` when unavailable.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn token(&self) -> Option<String>;
}

/// Runtime permission prompt of the device.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait PermissionGate: Send + Sync {
    async fn request(&self, permission: Permission) -> PermissionStatus;
}

/// Capture/selection UI of the device. `Ok(None)` means the user cancelled.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait CaptureBackend: Send + Sync {
    async fn launch(
        &self,
        source: CaptureSource,
        options: CaptureOptions,
    ) -> Result<Option<CapturedAsset>, AcquireError>;
}

/// Produces a local media handle for a capture source.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait MediaAcquirer: Send + Sync {
    async fn acquire(&self, source: CaptureSource) -> Result<Acquisition, AcquireError>;
}

/// Re-reads the bytes behind a handle.
///
/// Each method is an independent access path so one failing path does not
/// poison the others.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait MediaReader: Send + Sync {
    /// Reads the handle as a file for a multipart part.
    async fn read_file(&self, handle: &MediaHandle) -> Result<Bytes, MediaReadError>;

    /// Reads the handle through a generic byte stream.
    async fn fetch_blob(&self, handle: &MediaHandle) -> Result<Blob, MediaReadError>;

    /// Reads the handle into a raw buffer.
    async fn fetch_buffer(&self, handle: &MediaHandle) -> Result<Vec<u8>, MediaReadError>;
}

/// Named object storage with upsert semantics.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Creates or overwrites the object under `name`.
    async fn put_object(
        &self,
        name: &StoredObjectName,
        candidate: UploadCandidate,
    ) -> Result<PutAck, StoreError>;

    /// Public URL for `name`. Pure derivation, no network round-trip.
    fn public_url_for(&self, name: &StoredObjectName) -> RemoteImageReference;
}

/// Remote punch record API. Every call carries the caller's bearer token.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait PunchApi: Send + Sync {
    /// `POST /punches`
    async fn create_punch(&self, body: &PunchPayload, token: &str) -> Result<PunchRecord, ApiError>;

    /// `PUT /punches/{id}`
    async fn update_punch(
        &self,
        id: &str,
        body: &PunchPayload,
        token: &str,
    ) -> Result<PunchRecord, ApiError>;

    /// `GET /punches/{id}`
    async fn get_punch(&self, id: &str, token: &str) -> Result<PunchRecord, ApiError>;
}
