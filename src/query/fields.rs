//! Field access for the three entity types.
//!
//! Fields are addressed by name so one query descriptor shape serves the
//! module, story, and feature tables alike.

use std::cmp::Ordering;

use crate::models::{EntityKind, Feature, Module, UserStory};

/// The value of one field, as seen by filters and sorts.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Missing,
}

impl FieldValue {
    fn text(s: &str) -> Self {
        Self::Text(s.to_string())
    }

    fn optional_text(s: Option<&str>) -> Self {
        s.map(Self::text).unwrap_or(Self::Missing)
    }

    /// The exact string a filter value is compared against.
    pub fn as_filter_string(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Number(n) => n.to_string(),
            Self::Missing => String::new(),
        }
    }

    /// Plain ordering: byte-wise for text, numeric for numbers, missing first.
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Missing, Self::Missing) => Ordering::Equal,
            (Self::Missing, _) => Ordering::Less,
            (_, Self::Missing) => Ordering::Greater,
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Number(a), Self::Number(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (Self::Number(_), Self::Text(_)) => Ordering::Less,
            (Self::Text(_), Self::Number(_)) => Ordering::Greater,
        }
    }
}

/// An entity that can be pushed through the query engine.
pub trait Queryable {
    const KIND: EntityKind;

    /// Canonical (snake_case) names of every filterable/sortable field.
    const FIELDS: &'static [&'static str];

    /// Value of a canonical field. Unknown names yield `Missing`.
    fn field(&self, name: &str) -> FieldValue;

    /// The text fields free-text search looks at.
    fn search_fields(&self) -> Vec<&str>;

    /// Whether `needle` (already lower-cased) occurs in any search field.
    fn matches_search(&self, needle: &str) -> bool {
        self.search_fields()
            .iter()
            .any(|text| text.to_lowercase().contains(needle))
    }
}

/// Map `moduleId` or `module_id` to the canonical name, if the entity has it.
pub fn canonical_field<T: Queryable>(name: &str) -> Option<&'static str> {
    let mut snake = String::with_capacity(name.len() + 4);
    for c in name.trim().chars() {
        if c.is_ascii_uppercase() {
            if !snake.is_empty() {
                snake.push('_');
            }
            snake.push(c.to_ascii_lowercase());
        } else {
            snake.push(c);
        }
    }
    T::FIELDS.iter().copied().find(|f| *f == snake)
}

impl Queryable for Module {
    const KIND: EntityKind = EntityKind::Module;
    const FIELDS: &'static [&'static str] = &[
        "id",
        "name",
        "description",
        "priority",
        "business_impact",
        "dependencies",
        "status",
        "user_story_id",
        "created_at",
        "updated_at",
    ];

    fn field(&self, name: &str) -> FieldValue {
        match name {
            "id" => FieldValue::Text(self.id.to_string()),
            "name" => FieldValue::text(&self.name),
            "description" => FieldValue::text(&self.description),
            "priority" => FieldValue::text(self.priority.as_str()),
            "business_impact" => FieldValue::text(&self.business_impact),
            "dependencies" => FieldValue::text(&self.dependencies),
            "status" => FieldValue::text(self.status.as_str()),
            "user_story_id" => self
                .user_story_id
                .map(|id| FieldValue::Text(id.to_string()))
                .unwrap_or(FieldValue::Missing),
            "created_at" => FieldValue::Text(self.created_at.to_rfc3339()),
            "updated_at" => FieldValue::Text(self.updated_at.to_rfc3339()),
            _ => FieldValue::Missing,
        }
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![
            self.name.as_str(),
            self.description.as_str(),
            self.business_impact.as_str(),
            self.dependencies.as_str(),
        ]
    }
}

impl Queryable for UserStory {
    const KIND: EntityKind = EntityKind::UserStory;
    const FIELDS: &'static [&'static str] = &[
        "id",
        "module_id",
        "title",
        "user_role",
        "description",
        "acceptance_criteria",
        "priority",
        "status",
        "created_at",
        "updated_at",
    ];

    fn field(&self, name: &str) -> FieldValue {
        match name {
            "id" => FieldValue::Text(self.id.to_string()),
            "module_id" => FieldValue::Text(self.module_id.to_string()),
            "title" => FieldValue::text(&self.title),
            "user_role" => FieldValue::text(&self.user_role),
            "description" => FieldValue::text(&self.description),
            "acceptance_criteria" => FieldValue::text(&self.acceptance_criteria),
            "priority" => FieldValue::text(self.priority.as_str()),
            "status" => FieldValue::text(self.status.as_str()),
            "created_at" => FieldValue::Text(self.created_at.to_rfc3339()),
            "updated_at" => FieldValue::Text(self.updated_at.to_rfc3339()),
            _ => FieldValue::Missing,
        }
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![
            self.title.as_str(),
            self.user_role.as_str(),
            self.description.as_str(),
            self.acceptance_criteria.as_str(),
        ]
    }
}

impl Queryable for Feature {
    const KIND: EntityKind = EntityKind::Feature;
    const FIELDS: &'static [&'static str] = &[
        "id",
        "user_story_id",
        "module_id",
        "title",
        "description",
        "priority",
        "status",
        "estimated_hours",
        "assignee",
        "created_at",
        "updated_at",
    ];

    fn field(&self, name: &str) -> FieldValue {
        match name {
            "id" => FieldValue::Text(self.id.to_string()),
            "user_story_id" => FieldValue::Text(self.user_story_id.to_string()),
            "module_id" => FieldValue::Text(self.module_id.to_string()),
            "title" => FieldValue::text(&self.title),
            "description" => FieldValue::text(&self.description),
            "priority" => FieldValue::text(self.priority.as_str()),
            "status" => FieldValue::text(self.status.as_str()),
            "estimated_hours" => self
                .estimated_hours
                .map(FieldValue::Number)
                .unwrap_or(FieldValue::Missing),
            "assignee" => FieldValue::optional_text(self.assignee.as_deref()),
            "created_at" => FieldValue::Text(self.created_at.to_rfc3339()),
            "updated_at" => FieldValue::Text(self.updated_at.to_rfc3339()),
            _ => FieldValue::Missing,
        }
    }

    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.title.as_str(), self.description.as_str()];
        if let Some(assignee) = &self.assignee {
            fields.push(assignee);
        }
        fields
    }
}
