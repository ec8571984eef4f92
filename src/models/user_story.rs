use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::common::{Priority, Status};

/// A role-scoped requirement belonging to exactly one [`Module`](super::Module).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStory {
    pub id: Uuid,
    pub module_id: Uuid,
    pub title: String,
    /// The persona in "As a <role>, I want ...".
    pub user_role: String,
    pub description: String,
    /// Bullet-style free text.
    pub acceptance_criteria: String,
    pub priority: Priority,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a user story.
///
/// `module_id` is optional here only so that an unfilled form can be
/// reported as a validation error rather than failing to deserialize.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateUserStoryInput {
    pub module_id: Option<Uuid>,
    pub title: String,
    pub user_role: String,
    pub description: String,
    pub acceptance_criteria: String,
    pub priority: Priority,
    pub status: Status,
}

/// Input for updating a user story. `None` keeps the existing value.
///
/// Changing `module_id` moves the story, and every feature under it, to the
/// new module.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateUserStoryInput {
    pub module_id: Option<Uuid>,
    pub title: Option<String>,
    pub user_role: Option<String>,
    pub description: Option<String>,
    pub acceptance_criteria: Option<String>,
    pub priority: Option<Priority>,
    pub status: Option<Status>,
}
