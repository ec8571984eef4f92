use std::fmt;

use thiserror::Error;
use uuid::Uuid;

use crate::models::EntityKind;

/// Why an integrity-checked operation was rejected.
///
/// A rejected operation never changes the snapshot it was applied to, so
/// callers can render the message inline and keep showing the previous list.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IntegrityError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{field} is invalid: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("{entity} cannot reference {target} {id}: it does not exist")]
    DanglingReference {
        entity: EntityKind,
        target: EntityKind,
        id: Uuid,
    },

    #[error("{entity} {id} not found")]
    NotFound { entity: EntityKind, id: Uuid },

    #[error("{entity} id {id} is already in use or was previously deleted")]
    DuplicateId { entity: EntityKind, id: Uuid },
}

impl IntegrityError {
    /// Whether the error is the benign "already gone" case, which hosts
    /// surface as a notice rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// One or more required fields were empty on create or update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub entity: EntityKind,
    /// Missing fields, in form order, using their wire (camelCase) names.
    pub missing: Vec<&'static str>,
}

impl ValidationError {
    pub fn new(entity: EntityKind) -> Self {
        Self {
            entity,
            missing: Vec::new(),
        }
    }

    pub(crate) fn require_text(&mut self, field: &'static str, value: &str) {
        if value.trim().is_empty() {
            self.missing.push(field);
        }
    }

    pub(crate) fn require<T>(&mut self, field: &'static str, value: Option<&T>) {
        if value.is_none() {
            self.missing.push(field);
        }
    }

    pub(crate) fn into_result(self) -> Result<(), ValidationError> {
        if self.missing.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let noun = if self.missing.len() == 1 {
            "field"
        } else {
            "fields"
        };
        write!(
            f,
            "{} is missing required {}: {}",
            self.entity,
            noun,
            self.missing.join(", ")
        )
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_lists_every_missing_field() {
        let mut err = ValidationError::new(EntityKind::UserStory);
        err.require_text("title", "  ");
        err.require_text("userRole", "");
        err.require_text("description", "ok");

        let err = err.into_result().unwrap_err();
        assert_eq!(
            err.to_string(),
            "user story is missing required fields: title, userRole"
        );
    }

    #[test]
    fn no_missing_fields_is_ok() {
        let mut err = ValidationError::new(EntityKind::Module);
        err.require_text("name", "Checkout");
        assert!(err.into_result().is_ok());
    }
}
