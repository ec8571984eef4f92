use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::common::{Priority, Status};

/// A top-level functional area of the application being scoped.
///
/// Modules own user stories, which in turn own features. The module `name`
/// doubles as the lookup key into the recommendation knowledge base, so
/// "Login & Authentication" and "login & authentication" are different keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub priority: Priority,
    pub business_impact: String,
    /// Free-text list of other modules or systems this one depends on.
    pub dependencies: String,
    pub status: Status,
    /// Legacy single-story tag. Not a hierarchy edge: stories point at
    /// modules, never the other way round.
    pub user_story_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a module. `Default` yields the values an empty
/// "add module" form starts with.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateModuleInput {
    pub name: String,
    pub description: String,
    pub priority: Priority,
    pub business_impact: String,
    pub dependencies: String,
    pub status: Status,
    pub user_story_id: Option<Uuid>,
}

/// Input for updating a module. `None` keeps the existing value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateModuleInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub business_impact: Option<String>,
    pub dependencies: Option<String>,
    pub status: Option<Status>,
    /// `Some(None)` clears the legacy story tag.
    pub user_story_id: Option<Option<Uuid>>,
}
