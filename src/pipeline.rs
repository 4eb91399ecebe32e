//! # pipeline: capture → encode → upload → associate orchestration
//!
//! A [`PunchSession`] owns all ephemeral state of one punch form: the draft,
//! the held media handle and object name of a pending upload, the last
//! resolved reference, and the id of the persisted record. The UI layer holds
//! the session by reference and watches [`PipelineState`] transitions.
//!
//! # State machine
//! `Idle → Capturing → Encoding(1|2|3) → Resolved → Associating → Done`, with
//! failure exits `PermissionFailed`, `UploadFailed` and `AssociationFailed`.
//! Cancelling capture returns to `Idle`. Nothing transitions out of a failure
//! state on its own; the user re-triggers capture, upload retry or submission.
//!
//! # Concurrency
//! Only one capture/upload/associate sequence runs per session. Later calls
//! wait on the in-flight sequence and then run; they are never interleaved.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::associate::AssociationMutator;
use crate::config::PipelineConfig;
use crate::contract::{Acquisition, CredentialProvider, MediaAcquirer, Permission, PunchApi};
use crate::draft::{PunchDraft, PunchRecord};
use crate::error::{ApiError, PipelineError};
use crate::ladder::{EncoderLadder, UploadReport};
use crate::media::{CaptureSource, Encoding, MediaHandle};
use crate::object_name::{RemoteImageReference, StoredObjectName};

/// Observable pipeline state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Capturing(CaptureSource),
    Encoding(Encoding),
    Resolved(RemoteImageReference),
    Associating,
    Done { punch_id: Uuid },
    PermissionFailed(Permission),
    UploadFailed { reason: String },
    AssociationFailed { message: String },
}

#[derive(Debug)]
pub enum CaptureOutcome {
    Uploaded(UploadReport),
    Cancelled,
}

/// Result of [`PunchSession::capture_and_submit`].
///
/// The record is submitted without an image when the upload failed; the
/// failure is reported here rather than dropped.
#[derive(Debug)]
pub struct SubmissionReport {
    pub record: PunchRecord,
    pub upload_error: Option<PipelineError>,
}

struct PendingUpload {
    handle: MediaHandle,
    name: StoredObjectName,
}

/// Guarded by the single-flight lock.
#[derive(Default)]
struct Flight {
    pending: Option<PendingUpload>,
}

#[derive(Default)]
struct View {
    preview: Option<String>,
    record_id: Option<String>,
}

pub struct PunchSession {
    config: PipelineConfig,
    acquirer: Arc<dyn MediaAcquirer>,
    ladder: EncoderLadder,
    mutator: AssociationMutator,
    credentials: Arc<dyn CredentialProvider>,
    flight: tokio::sync::Mutex<Flight>,
    draft: Mutex<PunchDraft>,
    view: Mutex<View>,
    state: watch::Sender<PipelineState>,
}

impl PunchSession {
    pub fn new(
        config: PipelineConfig,
        acquirer: Arc<dyn MediaAcquirer>,
        ladder: EncoderLadder,
        api: Arc<dyn PunchApi>,
        credentials: Arc<dyn CredentialProvider>,
        draft: PunchDraft,
    ) -> Self {
        let (state, _) = watch::channel(PipelineState::Idle);
        Self {
            config,
            acquirer,
            ladder,
            mutator: AssociationMutator::new(api),
            credentials,
            flight: tokio::sync::Mutex::new(Flight::default()),
            draft: Mutex::new(draft),
            view: Mutex::new(View::default()),
            state,
        }
    }

    /// Session editing an existing punch: submissions update instead of create.
    pub fn with_record_id(self, id: impl Into<String>) -> Self {
        self.view_mut().record_id = Some(id.into());
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<PipelineState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> PipelineState {
        self.state.borrow().clone()
    }

    pub fn draft(&self) -> PunchDraft {
        self.draft_mut().clone()
    }

    /// Applies a UI edit to the draft.
    pub fn update_draft(&self, edit: impl FnOnce(&mut PunchDraft)) {
        let mut draft = self.draft_mut();
        edit(&mut *draft);
    }

    /// Local URI of the last captured media.
    pub fn preview(&self) -> Option<String> {
        self.view_mut().preview.clone()
    }

    pub fn reference(&self) -> Option<RemoteImageReference> {
        self.draft_mut().image_url.clone()
    }

    pub fn record_id(&self) -> Option<String> {
        self.view_mut().record_id.clone()
    }

    /// Captures from `source` and uploads it, writing the reference into the draft.
    pub async fn capture(&self, source: CaptureSource) -> Result<CaptureOutcome, PipelineError> {
        let mut flight = self.flight.lock().await;
        self.capture_locked(&mut flight, source).await
    }

    /// Re-runs the ladder for the held capture under its original object name.
    pub async fn retry_upload(&self) -> Result<UploadReport, PipelineError> {
        let mut flight = self.flight.lock().await;
        self.upload_locked(&mut flight).await
    }

    /// Sends the draft to the API. Re-entrant after a failure without re-capturing.
    pub async fn submit(&self) -> Result<PunchRecord, PipelineError> {
        let _flight = self.flight.lock().await;
        self.submit_locked().await
    }

    /// Validates, captures, uploads and submits as one sequence.
    ///
    /// Returns `Ok(None)` when the user cancelled capture.
    pub async fn capture_and_submit(
        &self,
        source: CaptureSource,
    ) -> Result<Option<SubmissionReport>, PipelineError> {
        let mut flight = self.flight.lock().await;
        self.draft().validate()?;

        let upload_error = match self.capture_locked(&mut flight, source).await {
            Ok(CaptureOutcome::Cancelled) => return Ok(None),
            Ok(CaptureOutcome::Uploaded(_)) => None,
            Err(e @ PipelineError::UploadFailed(_)) => {
                warn!(error = %e, "Submitting punch without image after upload failure");
                Some(e)
            }
            Err(e) => return Err(e),
        };

        let record = self.submit_locked().await?;
        Ok(Some(SubmissionReport {
            record,
            upload_error,
        }))
    }

    async fn capture_locked(
        &self,
        flight: &mut Flight,
        source: CaptureSource,
    ) -> Result<CaptureOutcome, PipelineError> {
        self.transition(PipelineState::Capturing(source));

        let acquisition = match self.acquirer.acquire(source).await {
            Ok(acquisition) => acquisition,
            Err(e) => {
                error!(error = %e, ?source, "Capture failed");
                self.transition(PipelineState::Idle);
                return Err(e.into());
            }
        };

        match acquisition {
            Acquisition::UserCancelled => {
                self.transition(PipelineState::Idle);
                Ok(CaptureOutcome::Cancelled)
            }
            Acquisition::PermissionDenied(permission) => {
                self.transition(PipelineState::PermissionFailed(permission));
                Err(PipelineError::PermissionDenied { permission })
            }
            Acquisition::Captured(handle) => {
                let name = StoredObjectName::for_handle(
                    &handle,
                    &self.config.object_prefix,
                    &self.config.default_extension,
                );
                info!(uri = %handle.local_uri, object = %name, "New capture, starting upload");
                self.view_mut().preview = Some(handle.local_uri.clone());
                // The held reference belonged to the previous capture.
                self.draft_mut().image_url = None;
                flight.pending = Some(PendingUpload { handle, name });
                self.upload_locked(flight).await.map(CaptureOutcome::Uploaded)
            }
        }
    }

    async fn upload_locked(&self, flight: &mut Flight) -> Result<UploadReport, PipelineError> {
        let Some(pending) = flight.pending.as_ref() else {
            return Err(PipelineError::NothingToRetry);
        };

        let on_step = |encoding: Encoding| self.transition(PipelineState::Encoding(encoding));

        let outcome = self
            .ladder
            .upload_with_progress(&pending.handle, &pending.name, &on_step)
            .await;
        match outcome {
            Ok(report) => {
                flight.pending = None;
                self.draft_mut().image_url = Some(report.reference.clone());
                self.transition(PipelineState::Resolved(report.reference.clone()));
                Ok(report)
            }
            Err(failed) => {
                self.transition(PipelineState::UploadFailed {
                    reason: failed.reason.clone(),
                });
                Err(failed.into())
            }
        }
    }

    async fn submit_locked(&self) -> Result<PunchRecord, PipelineError> {
        let draft = self.draft();
        draft.validate()?;

        self.transition(PipelineState::Associating);
        let Some(token) = self.credentials.token().await else {
            let err = PipelineError::Association(ApiError::Unauthenticated);
            self.transition(PipelineState::AssociationFailed {
                message: err.user_message(),
            });
            return Err(err);
        };

        let record_id = self.record_id();
        match self
            .mutator
            .create_or_update(record_id.as_deref(), &draft, &token)
            .await
        {
            Ok(record) => {
                self.view_mut().record_id = Some(record.uuid.to_string());
                self.transition(PipelineState::Done {
                    punch_id: record.uuid,
                });
                Ok(record)
            }
            Err(e) => {
                let err = PipelineError::Association(e);
                self.transition(PipelineState::AssociationFailed {
                    message: err.user_message(),
                });
                Err(err)
            }
        }
    }

    fn transition(&self, next: PipelineState) {
        info!(state = ?next, "[PIPELINE] State transition");
        self.state.send_replace(next);
    }

    fn draft_mut(&self) -> MutexGuard<'_, PunchDraft> {
        self.draft.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn view_mut(&self) -> MutexGuard<'_, View> {
        self.view.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
