use std::fmt;

use serde::{Deserialize, Serialize};

/// How urgent a module, story, or feature is relative to its siblings.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match normalize_label(s).as_str() {
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress of a module, story, or feature.
///
/// - `NotStarted`: Scoped but no work begun
/// - `InProgress`: Work underway
/// - `Completed`: Done; counts towards progress rollups
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Status {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "NotStarted",
            Self::InProgress => "InProgress",
            Self::Completed => "Completed",
        }
    }

    /// Accepts the canonical label as well as `not_started`, `in-progress`
    /// and `In Progress` style spellings.
    pub fn from_str(s: &str) -> Option<Self> {
        match normalize_label(s).as_str() {
            "notstarted" => Some(Self::NotStarted),
            "inprogress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three levels of the project hierarchy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Module,
    UserStory,
    Feature,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Module => "module",
            Self::UserStory => "user story",
            Self::Feature => "feature",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn normalize_label(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_loose_spellings() {
        assert_eq!(Status::from_str("In Progress"), Some(Status::InProgress));
        assert_eq!(Status::from_str("not_started"), Some(Status::NotStarted));
        assert_eq!(Status::from_str("completed"), Some(Status::Completed));
        assert_eq!(Status::from_str("done"), None);
    }

    #[test]
    fn labels_round_trip() {
        for p in [Priority::High, Priority::Medium, Priority::Low] {
            assert_eq!(Priority::from_str(p.as_str()), Some(p));
        }
        for s in [Status::NotStarted, Status::InProgress, Status::Completed] {
            assert_eq!(Status::from_str(s.as_str()), Some(s));
        }
    }

    #[test]
    fn defaults_match_add_form() {
        assert_eq!(Priority::default(), Priority::Medium);
        assert_eq!(Status::default(), Status::NotStarted);
    }
}
