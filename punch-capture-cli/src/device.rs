//! Host stand-ins for the device runtime: permission prompt, capture UI, and
//! the session credential.
//!
//! The host has no camera. "Gallery" selection is the image path given on the
//! command line, re-encoded as JPEG at the capture quality the way a device
//! picker hands back a compressed copy in its cache directory.

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use punch_capture::contract::{
    CaptureBackend, CaptureOptions, CapturedAsset, CredentialProvider, Permission,
    PermissionGate, PermissionStatus,
};
use punch_capture::error::AcquireError;
use punch_capture::media::CaptureSource;
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// Grants photo library access, denies the camera.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostPermissions;

#[async_trait]
impl PermissionGate for HostPermissions {
    async fn request(&self, permission: Permission) -> PermissionStatus {
        match permission {
            Permission::Camera => {
                warn!(%permission, "No camera on this host");
                PermissionStatus::Denied
            }
            Permission::MediaLibrary => PermissionStatus::Granted,
        }
    }
}

/// Capture backend backed by a file chosen up front.
///
/// `None` as selection behaves like a dismissed picker.
pub struct FileCaptureBackend {
    selection: Option<PathBuf>,
    cache: TempDir,
}

impl FileCaptureBackend {
    pub fn new(selection: Option<PathBuf>) -> std::io::Result<Self> {
        Ok(Self {
            selection,
            cache: tempfile::tempdir()?,
        })
    }

    pub fn cache_dir(&self) -> &Path {
        self.cache.path()
    }
}

#[async_trait]
impl CaptureBackend for FileCaptureBackend {
    async fn launch(
        &self,
        source: CaptureSource,
        options: CaptureOptions,
    ) -> Result<Option<CapturedAsset>, AcquireError> {
        if source == CaptureSource::Camera {
            return Err(AcquireError::Unavailable {
                message: "camera capture is not available on this host".to_string(),
            });
        }
        let Some(selected) = self.selection.clone() else {
            info!("No image selected");
            return Ok(None);
        };

        let stem = selected
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("capture")
            .to_string();
        let target = self.cache.path().join(format!("{stem}.jpg"));
        let quality = jpeg_quality(options.quality);
        debug!(source = ?selected, target = ?target, quality, "Re-encoding selection");

        let written = target.clone();
        let file_size = tokio::task::spawn_blocking(move || reencode_jpeg(&selected, &written, quality))
            .await
            .map_err(|e| AcquireError::Device {
                message: format!("Re-encoding task failed: {e}"),
            })??;

        Ok(Some(CapturedAsset {
            uri: format!("file://{}", target.display()),
            mime_type: Some("image/jpeg".to_string()),
            file_size: Some(file_size),
        }))
    }
}

/// Maps a (0, 1] quality to the JPEG encoder's 1-100 scale.
pub fn jpeg_quality(quality: f32) -> u8 {
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}

fn reencode_jpeg(source: &Path, target: &Path, quality: u8) -> Result<u64, AcquireError> {
    let device = |message: String| AcquireError::Device { message };

    let img = image::open(source)
        .map_err(|e| device(format!("Failed to decode {}: {e}", source.display())))?;
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());

    let file = std::fs::File::create(target)
        .map_err(|e| device(format!("Failed to create {}: {e}", target.display())))?;
    let mut writer = BufWriter::new(file);
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut writer, quality))
        .map_err(|e| device(format!("Failed to encode JPEG: {e}")))?;
    writer
        .flush()
        .map_err(|e| device(format!("Failed to write {}: {e}", target.display())))?;

    let size = std::fs::metadata(target)
        .map_err(|e| device(format!("Failed to stat {}: {e}", target.display())))?
        .len();
    Ok(size)
}

/// Session token read once from the environment at startup.
#[derive(Clone, Default)]
pub struct StaticCredentials {
    token: Option<String>,
}

impl StaticCredentials {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }
}

impl std::fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("token_set", &self.token.is_some())
            .finish()
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn token(&self) -> Option<String> {
        self.token.clone()
    }
}
