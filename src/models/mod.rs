//! Domain models for scopeforge.
//!
//! # Hierarchy
//!
//! - [`Module`]: Top-level functional area. Its name keys the recommendation
//!   knowledge base.
//! - [`UserStory`]: Role-scoped requirement; belongs to exactly one module.
//! - [`Feature`]: Implementation-level task; belongs to exactly one story and,
//!   transitively, to that story's module.
//!
//! [`Project`] is the persistence unit grouping one hierarchy.
//!
//! These shapes (camelCase on the wire) are also the canonical schema for
//! spreadsheet import/export collaborators.

mod common;
mod feature;
mod module;
mod project;
mod user_story;

pub use common::*;
pub use feature::*;
pub use module::*;
pub use project::*;
pub use user_story::*;
