//! Local media handles, wire candidates, and the host reader for captured files.

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tokio::io::AsyncReadExt;
use tracing::debug;

use crate::contract::MediaReader;
use crate::error::MediaReadError;

pub const DEFAULT_MIME_TYPE: &str = "image/jpeg";

const BLOB_CHUNK_BYTES: usize = 64 * 1024;

/// Upper bound on the up-front blob buffer; larger files grow it while reading.
const BLOB_PREALLOC_LIMIT: u64 = 32 * 1024 * 1024;

/// Where a capture comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureSource {
    Camera,
    Gallery,
}

/// Local-only reference to newly captured bytes. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaHandle {
    pub local_uri: String,
    pub mime_type: String,
    pub size_hint: Option<u64>,
}

impl MediaHandle {
    /// Builds a handle, inferring the MIME type from the locator when none is given.
    pub fn new(local_uri: impl Into<String>, mime_type: Option<String>, size_hint: Option<u64>) -> Self {
        let local_uri = local_uri.into();
        let mime_type = mime_type
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| mime_for_uri(&local_uri).to_string());
        Self {
            local_uri,
            mime_type,
            size_hint,
        }
    }

    /// Last path segment of the locator, if any.
    pub fn file_name(&self) -> Option<&str> {
        self.local_uri
            .rsplit('/')
            .next()
            .filter(|segment| !segment.is_empty())
    }

    /// Extension used for the stored object, normalised to lowercase.
    pub fn extension(&self) -> Option<String> {
        match extension_of(&self.local_uri).as_deref() {
            Some("jpeg") => Some("jpg".to_string()),
            Some(ext) => Some(ext.to_string()),
            None => extension_for_mime(&self.mime_type).map(str::to_string),
        }
    }
}

/// Wire representation tried by one ladder step, in ladder order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    FormMultipart,
    BinaryBlob,
    RawByteBuffer,
}

impl Encoding {
    /// 1-based position in the ladder.
    pub fn step(self) -> u8 {
        match self {
            Encoding::FormMultipart => 1,
            Encoding::BinaryBlob => 2,
            Encoding::RawByteBuffer => 3,
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Encoding::FormMultipart => "form-multipart",
            Encoding::BinaryBlob => "binary-blob",
            Encoding::RawByteBuffer => "raw-byte-buffer",
        };
        f.write_str(tag)
    }
}

/// Bytes read through the generic stream path, with whatever type the read reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Multipart { file_name: String, bytes: Bytes },
    Blob(Bytes),
    Raw(Vec<u8>),
}

/// One attempted wire representation of a handle's bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadCandidate {
    pub encoding: Encoding,
    pub payload: Payload,
    pub content_type: String,
}

impl UploadCandidate {
    pub fn len(&self) -> usize {
        match &self.payload {
            Payload::Multipart { bytes, .. } => bytes.len(),
            Payload::Blob(bytes) => bytes.len(),
            Payload::Raw(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Payload bytes regardless of framing.
    pub fn bytes(&self) -> Bytes {
        match &self.payload {
            Payload::Multipart { bytes, .. } => bytes.clone(),
            Payload::Blob(bytes) => bytes.clone(),
            Payload::Raw(bytes) => Bytes::copy_from_slice(bytes),
        }
    }
}

/// MIME type inferred from a locator's extension, `image/jpeg` when unknown.
pub fn mime_for_uri(uri: &str) -> &'static str {
    match extension_of(uri).as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("heic") => "image/heic",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => DEFAULT_MIME_TYPE,
    }
}

pub fn extension_for_mime(mime: &str) -> Option<&'static str> {
    match mime {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/heic" => Some("heic"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

fn extension_of(uri: &str) -> Option<String> {
    let last = uri.rsplit('/').next()?;
    let last = last.split(['?', '#']).next()?;
    let (stem, ext) = last.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Reads captured media from the host filesystem (`file://` URIs or plain paths).
#[derive(Debug, Default, Clone)]
pub struct LocalMediaReader;

impl LocalMediaReader {
    pub fn new() -> Self {
        Self
    }

    fn resolve(uri: &str) -> Result<PathBuf, MediaReadError> {
        let path = match uri.strip_prefix("file://") {
            Some(rest) => rest,
            None if uri.contains("://") => {
                return Err(MediaReadError::UnsupportedUri {
                    uri: uri.to_string(),
                })
            }
            None => uri,
        };
        Ok(Path::new(path).to_path_buf())
    }

    async fn read_all(uri: &str) -> Result<Vec<u8>, MediaReadError> {
        let path = Self::resolve(uri)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(MediaReadError::NotFound {
                uri: uri.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl MediaReader for LocalMediaReader {
    async fn read_file(&self, handle: &MediaHandle) -> Result<Bytes, MediaReadError> {
        Self::read_all(&handle.local_uri).await.map(Bytes::from)
    }

    async fn fetch_blob(&self, handle: &MediaHandle) -> Result<Blob, MediaReadError> {
        let path = Self::resolve(&handle.local_uri)?;
        let mut file = match tokio::fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(MediaReadError::NotFound {
                    uri: handle.local_uri.clone(),
                })
            }
            Err(e) => return Err(e.into()),
        };

        // The device's size hint is advisory only; size the buffer from the file.
        let on_disk = file.metadata().await.map(|m| m.len()).unwrap_or(0);
        let mut buffer = BytesMut::with_capacity(on_disk.min(BLOB_PREALLOC_LIMIT) as usize);
        let mut chunk = vec![0u8; BLOB_CHUNK_BYTES];
        loop {
            let read = file.read(&mut chunk).await?;
            if read == 0 {
                break;
            }
            buffer.extend_from_slice(&chunk[..read]);
        }
        debug!(
            uri = %handle.local_uri,
            bytes = buffer.len(),
            size_hint = ?handle.size_hint,
            "Fetched media as blob"
        );

        Ok(Blob {
            bytes: buffer.freeze(),
            content_type: Some(mime_for_uri(&handle.local_uri).to_string()),
        })
    }

    async fn fetch_buffer(&self, handle: &MediaHandle) -> Result<Vec<u8>, MediaReadError> {
        Self::read_all(&handle.local_uri).await
    }
}
