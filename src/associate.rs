//! Attaches a draft (and its optional image reference) to a punch record.

use std::sync::Arc;

use tracing::{info, warn};

use crate::contract::PunchApi;
use crate::draft::{PunchDraft, PunchRecord};
use crate::error::ApiError;

/// Sends a validated draft as a create (`POST`) or update (`PUT`).
pub struct AssociationMutator {
    api: Arc<dyn PunchApi>,
}

impl AssociationMutator {
    pub fn new(api: Arc<dyn PunchApi>) -> Self {
        Self { api }
    }

    /// Creates the record when `record_id` is `None`, otherwise updates it.
    ///
    /// The image reference is sent as-is; it is not checked against the store.
    pub async fn create_or_update(
        &self,
        record_id: Option<&str>,
        draft: &PunchDraft,
        token: &str,
    ) -> Result<PunchRecord, ApiError> {
        if let Err(missing) = draft.validate() {
            warn!(missing = ?missing.missing, "Refusing to send incomplete punch draft");
            return Err(missing.into());
        }

        let body = draft.to_payload();
        let record = match record_id {
            Some(id) => {
                info!(punch_id = %id, has_image = body.image_url.is_some(), "Updating punch");
                self.api.update_punch(id, &body, token).await?
            }
            None => {
                info!(project_id = %body.project_id, has_image = body.image_url.is_some(), "Creating punch");
                self.api.create_punch(&body, token).await?
            }
        };
        info!(punch_id = %record.uuid, "Punch persisted");
        Ok(record)
    }
}
