use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::common::{Priority, Status};

/// An implementation-level unit of work under a user story.
///
/// `module_id` is derived: it always equals the `module_id` of the story
/// named by `user_story_id`, and is recomputed whenever the feature or its
/// story is saved. Inputs never carry it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    pub id: Uuid,
    pub user_story_id: Uuid,
    pub module_id: Uuid,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub status: Status,
    pub estimated_hours: Option<f64>,
    pub assignee: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a feature.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateFeatureInput {
    pub user_story_id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub status: Status,
    /// Must be finite and non-negative when present.
    pub estimated_hours: Option<f64>,
    pub assignee: Option<String>,
}

/// Input for updating a feature. `None` keeps the existing value; for the
/// optional fields `Some(None)` clears them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateFeatureInput {
    /// Re-parent the feature under another story (possibly in another module).
    pub user_story_id: Option<Uuid>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub status: Option<Status>,
    pub estimated_hours: Option<Option<f64>>,
    pub assignee: Option<Option<String>>,
}
