//! Referential integrity for the module → story → feature hierarchy.
//!
//! [`ProjectSnapshot`] owns the three collections and is the only way to
//! change them. Every operation validates against the current state first
//! and only then commits, so a rejected operation leaves the snapshot exactly
//! as it was.

mod error;

use std::collections::HashSet;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use error::*;

use crate::models::*;

/// Ids removed by a cascading delete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeReport {
    pub modules: Vec<Uuid>,
    pub user_stories: Vec<Uuid>,
    pub features: Vec<Uuid>,
}

impl CascadeReport {
    pub fn total(&self) -> usize {
        self.modules.len() + self.user_stories.len() + self.features.len()
    }
}

/// The committed state of one project's hierarchy.
///
/// Deserializing goes through [`ProjectSnapshot::from_parts`], so a
/// document that breaks the hierarchy is rejected instead of loaded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "SnapshotParts")]
pub struct ProjectSnapshot {
    modules: Vec<Module>,
    user_stories: Vec<UserStory>,
    features: Vec<Feature>,
    /// Ids of deleted entities. Never handed out again.
    #[serde(default)]
    retired_ids: HashSet<Uuid>,
}

/// Unchecked wire shape of a snapshot.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotParts {
    #[serde(default)]
    modules: Vec<Module>,
    #[serde(default)]
    user_stories: Vec<UserStory>,
    #[serde(default)]
    features: Vec<Feature>,
    #[serde(default)]
    retired_ids: HashSet<Uuid>,
}

impl TryFrom<SnapshotParts> for ProjectSnapshot {
    type Error = IntegrityError;

    fn try_from(parts: SnapshotParts) -> Result<Self, Self::Error> {
        Self::from_parts(
            parts.modules,
            parts.user_stories,
            parts.features,
            parts.retired_ids,
        )
    }
}

impl ProjectSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot from loaded collections.
    ///
    /// Rejects dangling references and ids that repeat anywhere in the
    /// hierarchy or were retired. Feature `module_id`s are recomputed from
    /// their stories rather than trusted.
    pub fn from_parts(
        modules: Vec<Module>,
        user_stories: Vec<UserStory>,
        mut features: Vec<Feature>,
        retired_ids: HashSet<Uuid>,
    ) -> Result<Self, IntegrityError> {
        // One id space across all three collections, as handed out by `fresh_id`.
        let mut seen = HashSet::new();
        for m in &modules {
            if !seen.insert(m.id) || retired_ids.contains(&m.id) {
                return Err(IntegrityError::DuplicateId {
                    entity: EntityKind::Module,
                    id: m.id,
                });
            }
        }
        let module_ids: HashSet<Uuid> = modules.iter().map(|m| m.id).collect();

        for s in &user_stories {
            if !seen.insert(s.id) || retired_ids.contains(&s.id) {
                return Err(IntegrityError::DuplicateId {
                    entity: EntityKind::UserStory,
                    id: s.id,
                });
            }
            if !module_ids.contains(&s.module_id) {
                return Err(IntegrityError::DanglingReference {
                    entity: EntityKind::UserStory,
                    target: EntityKind::Module,
                    id: s.module_id,
                });
            }
        }

        for f in &mut features {
            if !seen.insert(f.id) || retired_ids.contains(&f.id) {
                return Err(IntegrityError::DuplicateId {
                    entity: EntityKind::Feature,
                    id: f.id,
                });
            }
            let story = user_stories
                .iter()
                .find(|s| s.id == f.user_story_id)
                .ok_or(IntegrityError::DanglingReference {
                    entity: EntityKind::Feature,
                    target: EntityKind::UserStory,
                    id: f.user_story_id,
                })?;
            f.module_id = story.module_id;
        }

        Ok(Self {
            modules,
            user_stories,
            features,
            retired_ids,
        })
    }

    /// Verify every hierarchy invariant. Committed snapshots always pass;
    /// this exists for loaders and tests.
    pub fn check_invariants(&self) -> Result<(), IntegrityError> {
        let mut ids = HashSet::new();
        let all_ids = self
            .modules
            .iter()
            .map(|m| (EntityKind::Module, m.id))
            .chain(self.user_stories.iter().map(|s| (EntityKind::UserStory, s.id)))
            .chain(self.features.iter().map(|f| (EntityKind::Feature, f.id)));
        for (entity, id) in all_ids {
            if !ids.insert(id) || self.retired_ids.contains(&id) {
                return Err(IntegrityError::DuplicateId { entity, id });
            }
        }

        for story in &self.user_stories {
            if self.module(story.module_id).is_none() {
                return Err(IntegrityError::DanglingReference {
                    entity: EntityKind::UserStory,
                    target: EntityKind::Module,
                    id: story.module_id,
                });
            }
        }

        for feature in &self.features {
            let story = self.user_story(feature.user_story_id).ok_or(
                IntegrityError::DanglingReference {
                    entity: EntityKind::Feature,
                    target: EntityKind::UserStory,
                    id: feature.user_story_id,
                },
            )?;
            if feature.module_id != story.module_id {
                return Err(IntegrityError::InvalidValue {
                    field: "moduleId",
                    reason: format!(
                        "feature {} records module {} but its story belongs to {}",
                        feature.id, feature.module_id, story.module_id
                    ),
                });
            }
        }

        Ok(())
    }

    // ============================================================
    // Read access
    // ============================================================

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn user_stories(&self) -> &[UserStory] {
        &self.user_stories
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn retired_ids(&self) -> &HashSet<Uuid> {
        &self.retired_ids
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty() && self.user_stories.is_empty() && self.features.is_empty()
    }

    pub fn module(&self, id: Uuid) -> Option<&Module> {
        self.modules.iter().find(|m| m.id == id)
    }

    pub fn user_story(&self, id: Uuid) -> Option<&UserStory> {
        self.user_stories.iter().find(|s| s.id == id)
    }

    pub fn feature(&self, id: Uuid) -> Option<&Feature> {
        self.features.iter().find(|f| f.id == id)
    }

    pub fn stories_in_module(&self, module_id: Uuid) -> impl Iterator<Item = &UserStory> {
        self.user_stories
            .iter()
            .filter(move |s| s.module_id == module_id)
    }

    pub fn features_in_story(&self, story_id: Uuid) -> impl Iterator<Item = &Feature> {
        self.features
            .iter()
            .filter(move |f| f.user_story_id == story_id)
    }

    pub fn features_in_module(&self, module_id: Uuid) -> impl Iterator<Item = &Feature> {
        self.features
            .iter()
            .filter(move |f| f.module_id == module_id)
    }

    fn fresh_id(&self) -> Uuid {
        loop {
            let id = Uuid::new_v4();
            let taken = self.retired_ids.contains(&id)
                || self.module(id).is_some()
                || self.user_story(id).is_some()
                || self.feature(id).is_some();
            if !taken {
                return id;
            }
        }
    }

    // ============================================================
    // Module operations
    // ============================================================

    pub fn add_module(&mut self, input: CreateModuleInput) -> Result<Module, IntegrityError> {
        let mut check = ValidationError::new(EntityKind::Module);
        check.require_text("name", &input.name);
        check.into_result()?;

        let now = Utc::now();
        let module = Module {
            id: self.fresh_id(),
            name: input.name.trim().to_string(),
            description: input.description,
            priority: input.priority,
            business_impact: input.business_impact,
            dependencies: input.dependencies,
            status: input.status,
            user_story_id: input.user_story_id,
            created_at: now,
            updated_at: now,
        };

        tracing::debug!(module_id = %module.id, name = %module.name, "module added");
        self.modules.push(module.clone());
        Ok(module)
    }

    pub fn update_module(
        &mut self,
        id: Uuid,
        input: UpdateModuleInput,
    ) -> Result<Module, IntegrityError> {
        let index = self
            .modules
            .iter()
            .position(|m| m.id == id)
            .ok_or(IntegrityError::NotFound {
                entity: EntityKind::Module,
                id,
            })?;
        let existing = &self.modules[index];

        let name = input.name.unwrap_or_else(|| existing.name.clone());
        let mut check = ValidationError::new(EntityKind::Module);
        check.require_text("name", &name);
        check.into_result()?;

        let updated = Module {
            id,
            name: name.trim().to_string(),
            description: input
                .description
                .unwrap_or_else(|| existing.description.clone()),
            priority: input.priority.unwrap_or(existing.priority),
            business_impact: input
                .business_impact
                .unwrap_or_else(|| existing.business_impact.clone()),
            dependencies: input
                .dependencies
                .unwrap_or_else(|| existing.dependencies.clone()),
            status: input.status.unwrap_or(existing.status),
            user_story_id: input.user_story_id.unwrap_or(existing.user_story_id),
            created_at: existing.created_at,
            updated_at: Utc::now(),
        };

        tracing::debug!(module_id = %id, "module updated");
        self.modules[index] = updated.clone();
        Ok(updated)
    }

    /// Delete a module together with its stories and their features.
    pub fn delete_module(&mut self, id: Uuid) -> Result<CascadeReport, IntegrityError> {
        if self.module(id).is_none() {
            return Err(IntegrityError::NotFound {
                entity: EntityKind::Module,
                id,
            });
        }

        let story_ids: HashSet<Uuid> = self.stories_in_module(id).map(|s| s.id).collect();
        let report = CascadeReport {
            modules: vec![id],
            user_stories: self.stories_in_module(id).map(|s| s.id).collect(),
            features: self
                .features
                .iter()
                .filter(|f| story_ids.contains(&f.user_story_id))
                .map(|f| f.id)
                .collect(),
        };

        self.features.retain(|f| !story_ids.contains(&f.user_story_id));
        self.user_stories.retain(|s| s.module_id != id);
        self.modules.retain(|m| m.id != id);
        self.clear_story_tags(&story_ids);
        self.retire(&report);

        tracing::info!(
            module_id = %id,
            stories = report.user_stories.len(),
            features = report.features.len(),
            "module deleted with cascade"
        );
        Ok(report)
    }

    // ============================================================
    // User story operations
    // ============================================================

    pub fn add_user_story(
        &mut self,
        input: CreateUserStoryInput,
    ) -> Result<UserStory, IntegrityError> {
        let mut check = ValidationError::new(EntityKind::UserStory);
        check.require("moduleId", input.module_id.as_ref());
        check.require_text("title", &input.title);
        check.require_text("userRole", &input.user_role);
        check.require_text("description", &input.description);
        check.into_result()?;

        let module_id = input.module_id.unwrap_or_default();
        self.require_module(module_id, EntityKind::UserStory)?;

        let now = Utc::now();
        let story = UserStory {
            id: self.fresh_id(),
            module_id,
            title: input.title.trim().to_string(),
            user_role: input.user_role.trim().to_string(),
            description: input.description,
            acceptance_criteria: input.acceptance_criteria,
            priority: input.priority,
            status: input.status,
            created_at: now,
            updated_at: now,
        };

        tracing::debug!(story_id = %story.id, module_id = %module_id, "user story added");
        self.user_stories.push(story.clone());
        Ok(story)
    }

    pub fn update_user_story(
        &mut self,
        id: Uuid,
        input: UpdateUserStoryInput,
    ) -> Result<UserStory, IntegrityError> {
        let index = self
            .user_stories
            .iter()
            .position(|s| s.id == id)
            .ok_or(IntegrityError::NotFound {
                entity: EntityKind::UserStory,
                id,
            })?;
        let existing = &self.user_stories[index];

        let title = input.title.unwrap_or_else(|| existing.title.clone());
        let user_role = input.user_role.unwrap_or_else(|| existing.user_role.clone());
        let description = input
            .description
            .unwrap_or_else(|| existing.description.clone());

        let mut check = ValidationError::new(EntityKind::UserStory);
        check.require_text("title", &title);
        check.require_text("userRole", &user_role);
        check.require_text("description", &description);
        check.into_result()?;

        let module_id = input.module_id.unwrap_or(existing.module_id);
        self.require_module(module_id, EntityKind::UserStory)?;

        let updated = UserStory {
            id,
            module_id,
            title: title.trim().to_string(),
            user_role: user_role.trim().to_string(),
            description,
            acceptance_criteria: input
                .acceptance_criteria
                .unwrap_or_else(|| existing.acceptance_criteria.clone()),
            priority: input.priority.unwrap_or(existing.priority),
            status: input.status.unwrap_or(existing.status),
            created_at: existing.created_at,
            updated_at: Utc::now(),
        };

        if updated.module_id != existing.module_id {
            tracing::info!(
                story_id = %id,
                from = %existing.module_id,
                to = %module_id,
                "user story moved to another module"
            );
        }
        self.user_stories[index] = updated.clone();
        for feature in self.features.iter_mut().filter(|f| f.user_story_id == id) {
            feature.module_id = module_id;
        }
        Ok(updated)
    }

    /// Delete a story and every feature under it.
    pub fn delete_user_story(&mut self, id: Uuid) -> Result<CascadeReport, IntegrityError> {
        if self.user_story(id).is_none() {
            return Err(IntegrityError::NotFound {
                entity: EntityKind::UserStory,
                id,
            });
        }

        let report = CascadeReport {
            modules: Vec::new(),
            user_stories: vec![id],
            features: self.features_in_story(id).map(|f| f.id).collect(),
        };

        self.features.retain(|f| f.user_story_id != id);
        self.user_stories.retain(|s| s.id != id);
        self.clear_story_tags(&HashSet::from([id]));
        self.retire(&report);

        tracing::info!(
            story_id = %id,
            features = report.features.len(),
            "user story deleted with cascade"
        );
        Ok(report)
    }

    // ============================================================
    // Feature operations
    // ============================================================

    pub fn add_feature(&mut self, input: CreateFeatureInput) -> Result<Feature, IntegrityError> {
        let mut check = ValidationError::new(EntityKind::Feature);
        check.require_text("title", &input.title);
        check.require_text("description", &input.description);
        check.require("userStoryId", input.user_story_id.as_ref());
        check.into_result()?;
        validate_hours(input.estimated_hours)?;

        let user_story_id = input.user_story_id.unwrap_or_default();
        let module_id = self.resolve_story_module(user_story_id)?;

        let now = Utc::now();
        let feature = Feature {
            id: self.fresh_id(),
            user_story_id,
            module_id,
            title: input.title.trim().to_string(),
            description: input.description,
            priority: input.priority,
            status: input.status,
            estimated_hours: input.estimated_hours,
            assignee: normalize_assignee(input.assignee),
            created_at: now,
            updated_at: now,
        };

        tracing::debug!(feature_id = %feature.id, story_id = %user_story_id, "feature added");
        self.features.push(feature.clone());
        Ok(feature)
    }

    pub fn update_feature(
        &mut self,
        id: Uuid,
        input: UpdateFeatureInput,
    ) -> Result<Feature, IntegrityError> {
        let index = self
            .features
            .iter()
            .position(|f| f.id == id)
            .ok_or(IntegrityError::NotFound {
                entity: EntityKind::Feature,
                id,
            })?;
        let existing = &self.features[index];

        let title = input.title.unwrap_or_else(|| existing.title.clone());
        let description = input
            .description
            .unwrap_or_else(|| existing.description.clone());

        let mut check = ValidationError::new(EntityKind::Feature);
        check.require_text("title", &title);
        check.require_text("description", &description);
        check.into_result()?;

        let estimated_hours = input.estimated_hours.unwrap_or(existing.estimated_hours);
        validate_hours(estimated_hours)?;

        let user_story_id = input.user_story_id.unwrap_or(existing.user_story_id);
        let module_id = self.resolve_story_module(user_story_id)?;

        let updated = Feature {
            id,
            user_story_id,
            module_id,
            title: title.trim().to_string(),
            description,
            priority: input.priority.unwrap_or(existing.priority),
            status: input.status.unwrap_or(existing.status),
            estimated_hours,
            assignee: match input.assignee {
                Some(assignee) => normalize_assignee(assignee),
                None => existing.assignee.clone(),
            },
            created_at: existing.created_at,
            updated_at: Utc::now(),
        };

        tracing::debug!(feature_id = %id, "feature updated");
        self.features[index] = updated.clone();
        Ok(updated)
    }

    pub fn delete_feature(&mut self, id: Uuid) -> Result<Feature, IntegrityError> {
        let index = self
            .features
            .iter()
            .position(|f| f.id == id)
            .ok_or(IntegrityError::NotFound {
                entity: EntityKind::Feature,
                id,
            })?;

        let removed = self.features.remove(index);
        self.retired_ids.insert(id);
        tracing::debug!(feature_id = %id, "feature deleted");
        Ok(removed)
    }

    // ============================================================
    // Helpers
    // ============================================================

    fn require_module(&self, module_id: Uuid, entity: EntityKind) -> Result<(), IntegrityError> {
        if self.module(module_id).is_none() {
            tracing::warn!(%module_id, "rejected reference to missing module");
            return Err(IntegrityError::DanglingReference {
                entity,
                target: EntityKind::Module,
                id: module_id,
            });
        }
        Ok(())
    }

    fn resolve_story_module(&self, story_id: Uuid) -> Result<Uuid, IntegrityError> {
        match self.user_story(story_id) {
            Some(story) => Ok(story.module_id),
            None => {
                tracing::warn!(%story_id, "rejected reference to missing user story");
                Err(IntegrityError::DanglingReference {
                    entity: EntityKind::Feature,
                    target: EntityKind::UserStory,
                    id: story_id,
                })
            }
        }
    }

    fn clear_story_tags(&mut self, story_ids: &HashSet<Uuid>) {
        for module in &mut self.modules {
            if module
                .user_story_id
                .is_some_and(|sid| story_ids.contains(&sid))
            {
                module.user_story_id = None;
            }
        }
    }

    fn retire(&mut self, report: &CascadeReport) {
        self.retired_ids.extend(
            report
                .modules
                .iter()
                .chain(&report.user_stories)
                .chain(&report.features)
                .copied(),
        );
    }
}

fn validate_hours(hours: Option<f64>) -> Result<(), IntegrityError> {
    match hours {
        Some(h) if !h.is_finite() || h < 0.0 => Err(IntegrityError::InvalidValue {
            field: "estimatedHours",
            reason: format!("expected a non-negative number, got {h}"),
        }),
        _ => Ok(()),
    }
}

fn normalize_assignee(assignee: Option<String>) -> Option<String> {
    assignee
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot_with_story() -> (ProjectSnapshot, Module, UserStory) {
        let mut snap = ProjectSnapshot::new();
        let module = snap
            .add_module(CreateModuleInput {
                name: "Checkout Module".into(),
                ..Default::default()
            })
            .unwrap();
        let story = snap
            .add_user_story(CreateUserStoryInput {
                module_id: Some(module.id),
                title: "Pay with card".into(),
                user_role: "Shopper".into(),
                description: "Pay at checkout".into(),
                ..Default::default()
            })
            .unwrap();
        (snap, module, story)
    }

    #[test]
    fn deleted_ids_are_retired() {
        let (mut snap, module, story) = snapshot_with_story();
        snap.delete_module(module.id).unwrap();

        assert!(snap.retired_ids().contains(&module.id));
        assert!(snap.retired_ids().contains(&story.id));
        assert!(snap.is_empty());
    }

    #[test]
    fn rejected_update_leaves_state_untouched() {
        let (mut snap, _module, story) = snapshot_with_story();
        let before = snap.clone();

        let err = snap
            .update_user_story(
                story.id,
                UpdateUserStoryInput {
                    title: Some("   ".into()),
                    ..Default::default()
                },
            )
            .unwrap_err();

        assert!(matches!(err, IntegrityError::Validation(_)));
        assert_eq!(snap, before);
    }

    #[test]
    fn deleting_story_clears_legacy_module_tag() {
        let (mut snap, module, story) = snapshot_with_story();
        snap.update_module(
            module.id,
            UpdateModuleInput {
                user_story_id: Some(Some(story.id)),
                ..Default::default()
            },
        )
        .unwrap();

        snap.delete_user_story(story.id).unwrap();

        assert_eq!(snap.module(module.id).unwrap().user_story_id, None);
    }

    #[test]
    fn negative_hours_are_rejected() {
        let (mut snap, _module, story) = snapshot_with_story();
        let err = snap
            .add_feature(CreateFeatureInput {
                user_story_id: Some(story.id),
                title: "Card form".into(),
                description: "Collect card details".into(),
                estimated_hours: Some(-2.0),
                ..Default::default()
            })
            .unwrap_err();

        assert!(matches!(
            err,
            IntegrityError::InvalidValue {
                field: "estimatedHours",
                ..
            }
        ));
        assert!(snap.features().is_empty());
    }

    #[test]
    fn from_parts_recomputes_feature_module() {
        let (mut snap, module, story) = snapshot_with_story();
        let mut feature = snap
            .add_feature(CreateFeatureInput {
                user_story_id: Some(story.id),
                title: "Card form".into(),
                description: "Collect card details".into(),
                ..Default::default()
            })
            .unwrap();
        feature.module_id = Uuid::new_v4();

        let rebuilt = ProjectSnapshot::from_parts(
            snap.modules().to_vec(),
            snap.user_stories().to_vec(),
            vec![feature],
            HashSet::new(),
        )
        .unwrap();

        assert_eq!(rebuilt.features()[0].module_id, module.id);
        rebuilt.check_invariants().unwrap();
    }

    #[test]
    fn from_parts_rejects_orphaned_story() {
        let (_snap, _module, story) = snapshot_with_story();
        let err = ProjectSnapshot::from_parts(
            Vec::new(),
            vec![story],
            Vec::new(),
            HashSet::new(),
        )
        .unwrap_err();

        assert!(matches!(err, IntegrityError::DanglingReference { .. }));
    }
}
