//! Punch form state, the wire body sent to the API, and the persisted record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::object_name::RemoteImageReference;

/// In-progress punch form. The pipeline only ever writes `image_url`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PunchDraft {
    pub title: String,
    pub description: String,
    pub category: String,
    pub status: String,
    pub system_id: String,
    pub project_id: String,
    pub image_url: Option<RemoteImageReference>,
}

impl PunchDraft {
    /// Checks every mandatory field is non-blank, listing all that are not.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let fields: [(&'static str, &str); 6] = [
            ("title", &self.title),
            ("description", &self.description),
            ("category", &self.category),
            ("status", &self.status),
            ("system", &self.system_id),
            ("project", &self.project_id),
        ];
        let missing: Vec<&'static str> = fields
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { missing })
        }
    }

    pub fn to_payload(&self) -> PunchPayload {
        PunchPayload {
            project_id: self.project_id.trim().to_string(),
            system_id: self.system_id.trim().to_string(),
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            category: self.category.trim().to_string(),
            status: self.status.trim().to_string(),
            image_url: self.image_url.as_ref().map(|r| r.as_str().to_string()),
        }
    }
}

/// JSON body of `POST /punches` and `PUT /punches/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PunchPayload {
    pub project_id: String,
    pub system_id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRef {
    pub uuid: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub uuid: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
}

/// A punch as persisted by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PunchRecord {
    pub uuid: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub project: ProjectRef,
    #[serde(default)]
    pub system: Option<SystemRef>,
    #[serde(default)]
    pub created_by: Option<UserRef>,
    #[serde(default)]
    pub modified_by: Option<UserRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
