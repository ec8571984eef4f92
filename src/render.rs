//! ASCII tree rendering for the module → story → feature hierarchy.

use crate::integrity::ProjectSnapshot;
use crate::models::{Module, Status, UserStory};
use crate::stats::{module_stats, story_stats};

const NOT_STARTED: char = '○';
const IN_PROGRESS: char = '◐';
const COMPLETED: char = '●';

fn status_symbol(status: Status) -> char {
    match status {
        Status::NotStarted => NOT_STARTED,
        Status::InProgress => IN_PROGRESS,
        Status::Completed => COMPLETED,
    }
}

/// Render every module in the snapshot as a tree with status symbols and
/// completed/total feature counts.
///
/// Example output:
/// ```text
/// ◐ Login & Authentication [1/2]
/// ├── ◐ Sign in as a returning customer [1/2]
/// │   ├── ● Email and password login
/// │   └── ○ Remember me option
/// └── ○ Recover a forgotten password [0/0]
/// ```
pub fn render_tree(snapshot: &ProjectSnapshot) -> String {
    let mut output = String::new();
    for module in snapshot.modules() {
        render_module(&mut output, snapshot, module);
    }
    output
}

fn render_module(output: &mut String, snapshot: &ProjectSnapshot, module: &Module) {
    let stats = module_stats(snapshot, module.id);
    output.push_str(&format!(
        "{} {} [{}/{}]\n",
        status_symbol(module.status),
        module.name,
        stats.completed_features,
        stats.total_features
    ));

    let stories: Vec<&UserStory> = snapshot.stories_in_module(module.id).collect();
    for (i, story) in stories.iter().enumerate() {
        let is_last = i == stories.len() - 1;
        render_story(output, snapshot, story, is_last);
    }
}

fn render_story(output: &mut String, snapshot: &ProjectSnapshot, story: &UserStory, is_last: bool) {
    let stats = story_stats(snapshot, story.id);
    let branch = if is_last { "└── " } else { "├── " };
    output.push_str(&format!(
        "{}{} {} [{}/{}]\n",
        branch,
        status_symbol(story.status),
        story.title,
        stats.completed_features,
        stats.total_features
    ));

    let prefix = if is_last { "    " } else { "│   " };
    let features: Vec<_> = snapshot.features_in_story(story.id).collect();
    for (i, feature) in features.iter().enumerate() {
        let branch = if i == features.len() - 1 { "└── " } else { "├── " };
        output.push_str(prefix);
        output.push_str(branch);
        output.push(status_symbol(feature.status));
        output.push(' ');
        output.push_str(&feature.title);
        output.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CreateFeatureInput, CreateModuleInput, CreateUserStoryInput, UpdateFeatureInput};
    use uuid::Uuid;

    fn story_input(module_id: Uuid, title: &str) -> CreateUserStoryInput {
        CreateUserStoryInput {
            module_id: Some(module_id),
            title: title.to_string(),
            user_role: "customer".to_string(),
            description: "so that I can shop".to_string(),
            ..Default::default()
        }
    }

    fn feature_input(story_id: Uuid, title: &str) -> CreateFeatureInput {
        CreateFeatureInput {
            user_story_id: Some(story_id),
            title: title.to_string(),
            description: "details".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_snapshot() {
        assert_eq!(render_tree(&ProjectSnapshot::new()), "");
    }

    #[test]
    fn test_module_without_stories() {
        let mut snap = ProjectSnapshot::new();
        snap.add_module(CreateModuleInput {
            name: "Search".to_string(),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(render_tree(&snap), "○ Search [0/0]\n");
    }

    #[test]
    fn test_nested_stories_and_features() {
        let mut snap = ProjectSnapshot::new();
        let module = snap
            .add_module(CreateModuleInput {
                name: "Login & Authentication".to_string(),
                ..Default::default()
            })
            .unwrap();
        let sign_in = snap
            .add_user_story(story_input(module.id, "Sign in"))
            .unwrap();
        snap.add_user_story(story_input(module.id, "Recover password"))
            .unwrap();
        let login = snap
            .add_feature(feature_input(sign_in.id, "Email and password login"))
            .unwrap();
        snap.add_feature(feature_input(sign_in.id, "Remember me option"))
            .unwrap();
        snap.update_feature(
            login.id,
            UpdateFeatureInput {
                status: Some(Status::Completed),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(
            render_tree(&snap),
            "○ Login & Authentication [1/2]\n\
             ├── ○ Sign in [1/2]\n\
             │   ├── ● Email and password login\n\
             │   └── ○ Remember me option\n\
             └── ○ Recover password [0/0]\n"
        );
    }
}
