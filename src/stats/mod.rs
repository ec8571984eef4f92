//! Progress rollups over a snapshot.
//!
//! Computed on every call and never cached, since the collections change
//! independently of any one view.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::integrity::ProjectSnapshot;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleStats {
    pub total_stories: usize,
    pub completed_stories: usize,
    pub total_features: usize,
    pub completed_features: usize,
}

impl ModuleStats {
    /// Share of completed features, 0-100. Zero when there are no features.
    pub fn percent_complete(&self) -> u8 {
        percent(self.completed_features, self.total_features)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryStats {
    pub total_features: usize,
    pub completed_features: usize,
}

impl StoryStats {
    pub fn percent_complete(&self) -> u8 {
        percent(self.completed_features, self.total_features)
    }
}

/// Per-module rollups plus whole-project totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStats {
    pub modules: Vec<(Uuid, ModuleStats)>,
    pub total_modules: usize,
    pub completed_modules: usize,
    pub totals: ModuleStats,
}

/// Rollup for one module. Unknown ids get all-zero stats.
pub fn module_stats(snapshot: &ProjectSnapshot, module_id: Uuid) -> ModuleStats {
    let mut stats = ModuleStats::default();
    for story in snapshot.stories_in_module(module_id) {
        stats.total_stories += 1;
        if story.status.is_completed() {
            stats.completed_stories += 1;
        }
    }
    for feature in snapshot.features_in_module(module_id) {
        stats.total_features += 1;
        if feature.status.is_completed() {
            stats.completed_features += 1;
        }
    }
    stats
}

/// Rollup for one story. Unknown ids get all-zero stats.
pub fn story_stats(snapshot: &ProjectSnapshot, story_id: Uuid) -> StoryStats {
    snapshot
        .features_in_story(story_id)
        .fold(StoryStats::default(), |mut stats, feature| {
            stats.total_features += 1;
            if feature.status.is_completed() {
                stats.completed_features += 1;
            }
            stats
        })
}

pub fn project_stats(snapshot: &ProjectSnapshot) -> ProjectStats {
    let modules: Vec<(Uuid, ModuleStats)> = snapshot
        .modules()
        .iter()
        .map(|m| (m.id, module_stats(snapshot, m.id)))
        .collect();

    let totals = modules
        .iter()
        .fold(ModuleStats::default(), |mut acc, (_, s)| {
            acc.total_stories += s.total_stories;
            acc.completed_stories += s.completed_stories;
            acc.total_features += s.total_features;
            acc.completed_features += s.completed_features;
            acc
        });

    ProjectStats {
        total_modules: snapshot.modules().len(),
        completed_modules: snapshot
            .modules()
            .iter()
            .filter(|m| m.status.is_completed())
            .count(),
        modules,
        totals,
    }
}

fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((done * 100) / total) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_rounds_down_and_handles_zero() {
        assert_eq!(percent(0, 0), 0);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(3, 3), 100);
    }

    #[test]
    fn unknown_ids_are_zero() {
        let snap = ProjectSnapshot::new();
        assert_eq!(module_stats(&snap, Uuid::new_v4()), ModuleStats::default());
        assert_eq!(story_stats(&snap, Uuid::new_v4()), StoryStats::default());
    }
}
