//! Permission-first media acquisition.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::contract::{
    Acquisition, CaptureBackend, CaptureOptions, MediaAcquirer, PermissionGate, PermissionStatus,
};
use crate::error::AcquireError;
use crate::media::{CaptureSource, MediaHandle};

/// Requests the source's permission, then launches capture at a fixed quality.
///
/// Capture is never launched when the permission is denied.
pub struct GatedAcquirer {
    permissions: Arc<dyn PermissionGate>,
    backend: Arc<dyn CaptureBackend>,
    quality: f32,
}

impl GatedAcquirer {
    pub fn new(
        permissions: Arc<dyn PermissionGate>,
        backend: Arc<dyn CaptureBackend>,
        quality: f32,
    ) -> Self {
        Self {
            permissions,
            backend,
            quality,
        }
    }
}

#[async_trait]
impl MediaAcquirer for GatedAcquirer {
    async fn acquire(&self, source: CaptureSource) -> Result<Acquisition, AcquireError> {
        let permission = source.required_permission();
        if self.permissions.request(permission).await == PermissionStatus::Denied {
            warn!(?source, %permission, "Capture permission denied");
            return Ok(Acquisition::PermissionDenied(permission));
        }

        let options = CaptureOptions {
            quality: self.quality,
        };
        match self.backend.launch(source, options).await? {
            Some(asset) => {
                let handle = MediaHandle::new(asset.uri, asset.mime_type, asset.file_size);
                info!(?source, uri = %handle.local_uri, mime = %handle.mime_type, "Media captured");
                Ok(Acquisition::Captured(handle))
            }
            None => {
                info!(?source, "Capture cancelled by user");
                Ok(Acquisition::UserCancelled)
            }
        }
    }
}
