//! Rule-based recommendations of features and business rules per module.
//!
//! - [`KnowledgeBase`]: static table keyed by exact module name.
//! - [`Selections`]: what the user picked, per module and per kind.
//! - [`fetch_recommendations`]: optional remote suggestions that fall back
//!   to the static table, with [`SuggestionTracker`] discarding late results.
//!
//! Nothing in this module touches the entity collections; accepting a
//! recommendation is the caller's business.

mod dynamic;
mod http;
mod knowledge;
mod selection;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use dynamic::*;
pub use http::*;
pub use knowledge::*;
pub use selection::*;

/// The two recommendation lists kept per module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    Feature,
    BusinessRule,
}

impl RecommendationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Feature => "feature",
            Self::BusinessRule => "business_rule",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "feature" => Some(Self::Feature),
            "business_rule" => Some(Self::BusinessRule),
            _ => None,
        }
    }
}

impl fmt::Display for RecommendationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
