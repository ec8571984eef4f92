use scopeforge::db::{Database, ProjectStore};
use scopeforge::integrity::ProjectSnapshot;
use scopeforge::models::*;
use scopeforge::recommend::{KnowledgeBase, RecommendationKind, Selections};
use speculate2::speculate;
use uuid::Uuid;

fn create_test_project(db: &Database) -> Project {
    db.create_project(CreateProjectInput {
        name: "Test Project".to_string(),
        description: None,
    })
    .expect("Failed to create project")
}

/// One module with one story holding two features.
fn populated_snapshot() -> ProjectSnapshot {
    let mut snap = ProjectSnapshot::new();
    let module = snap
        .add_module(CreateModuleInput {
            name: "Login & Authentication".to_string(),
            description: "Sign-in flows".to_string(),
            priority: Priority::High,
            ..Default::default()
        })
        .expect("Failed to add module");
    let story = snap
        .add_user_story(CreateUserStoryInput {
            module_id: Some(module.id),
            title: "Sign in".to_string(),
            user_role: "customer".to_string(),
            description: "I want to sign in to see my orders".to_string(),
            ..Default::default()
        })
        .expect("Failed to add story");
    snap.add_feature(CreateFeatureInput {
        user_story_id: Some(story.id),
        title: "Email and password login".to_string(),
        description: "Classic form".to_string(),
        estimated_hours: Some(6.5),
        assignee: Some("dana".to_string()),
        ..Default::default()
    })
    .expect("Failed to add feature");
    snap.add_feature(CreateFeatureInput {
        user_story_id: Some(story.id),
        title: "Remember me option".to_string(),
        description: "Long-lived cookie".to_string(),
        status: Status::Completed,
        ..Default::default()
    })
    .expect("Failed to add feature");
    snap
}

speculate! {
    before {
        let db = Database::open_memory().expect("Failed to create in-memory database");
        db.migrate().expect("Failed to run migrations");
    }

    describe "projects" {
        it "creates a project with required fields" {
            let project = db.create_project(CreateProjectInput {
                name: "My Project".to_string(),
                description: None,
            }).expect("Failed to create project");

            assert_eq!(project.name, "My Project");
            assert!(project.description.is_none());
        }

        it "rejects a blank project name" {
            let result = db.create_project(CreateProjectInput {
                name: "   ".to_string(),
                description: None,
            });
            assert!(result.is_err());
        }

        it "returns None for non-existent project" {
            let result = db.get_project(Uuid::new_v4()).expect("Query failed");
            assert!(result.is_none());
        }

        it "returns all projects ordered by name" {
            for name in ["Zebra", "Alpha"] {
                db.create_project(CreateProjectInput {
                    name: name.to_string(),
                    description: None,
                }).expect("Failed to create");
            }

            let projects = db.get_all_projects().expect("Query failed");
            let names: Vec<_> = projects.iter().map(|p| p.name.as_str()).collect();
            assert_eq!(names, vec!["Alpha", "Zebra"]);
        }

        it "deletes a project and reports whether it existed" {
            let project = create_test_project(&db);
            assert!(db.delete_project(project.id).expect("Delete failed"));
            assert!(!db.delete_project(project.id).expect("Delete failed"));
            assert!(db.get_project(project.id).expect("Query failed").is_none());
        }
    }

    describe "project store" {
        it "loads an empty snapshot for a new project" {
            let project = create_test_project(&db);
            let snapshot = db.load(project.id).expect("Load failed");
            assert!(snapshot.is_empty());
        }

        it "fails to load an unknown project" {
            assert!(db.load(Uuid::new_v4()).is_err());
        }

        it "round-trips a populated snapshot" {
            let project = create_test_project(&db);
            let snapshot = populated_snapshot();

            db.save(project.id, &snapshot).expect("Save failed");
            let loaded = db.load(project.id).expect("Load failed");

            assert_eq!(loaded.modules().len(), 1);
            assert_eq!(loaded.user_stories().len(), 1);
            assert_eq!(loaded.features().len(), 2);

            let titles: Vec<_> = loaded.features().iter().map(|f| f.title.as_str()).collect();
            assert_eq!(titles, vec!["Email and password login", "Remember me option"]);

            let first = &loaded.features()[0];
            assert_eq!(first.estimated_hours, Some(6.5));
            assert_eq!(first.assignee.as_deref(), Some("dana"));
            assert_eq!(first.module_id, loaded.modules()[0].id);
            assert_eq!(loaded.features()[1].status, Status::Completed);
            assert_eq!(loaded.modules()[0].priority, Priority::High);
            loaded.check_invariants().expect("Loaded snapshot is inconsistent");
        }

        it "replaces previous contents on save" {
            let project = create_test_project(&db);
            let mut snapshot = populated_snapshot();
            db.save(project.id, &snapshot).expect("Save failed");

            let module_id = snapshot.modules()[0].id;
            snapshot.delete_module(module_id).expect("Delete failed");
            db.save(project.id, &snapshot).expect("Save failed");

            let loaded = db.load(project.id).expect("Load failed");
            assert!(loaded.is_empty());
            assert!(loaded.retired_ids().contains(&module_id));
        }

        it "keeps projects isolated from each other" {
            let first = create_test_project(&db);
            let second = create_test_project(&db);
            db.save(first.id, &populated_snapshot()).expect("Save failed");

            assert!(db.load(second.id).expect("Load failed").is_empty());
            assert_eq!(db.load(first.id).expect("Load failed").features().len(), 2);
        }

        it "removes stored rows when the project is deleted" {
            let project = create_test_project(&db);
            db.save(project.id, &populated_snapshot()).expect("Save failed");

            db.delete_project(project.id).expect("Delete failed");
            assert!(db.load(project.id).is_err());
        }
    }

    describe "selections" {
        it "round-trips selections in order" {
            let project = create_test_project(&db);
            let snapshot = populated_snapshot();
            let module = snapshot.modules()[0].clone();
            db.save(project.id, &snapshot).expect("Save failed");

            let mut selections = Selections::new();
            assert!(selections
                .select_all(KnowledgeBase::builtin(), &module, RecommendationKind::Feature)
                .is_none());
            assert!(selections
                .add_custom(module.id, RecommendationKind::BusinessRule, "Passwords expire yearly")
                .is_none());

            db.save_selections(project.id, &selections).expect("Save failed");
            let loaded = db.load_selections(project.id).expect("Load failed");

            assert_eq!(loaded, selections);
            assert_eq!(loaded.get(module.id, RecommendationKind::Feature).len(), 8);
            assert_eq!(
                loaded.get(module.id, RecommendationKind::BusinessRule),
                ["Passwords expire yearly".to_string()]
            );
        }

        it "starts empty" {
            let project = create_test_project(&db);
            let loaded = db.load_selections(project.id).expect("Load failed");
            assert_eq!(loaded, Selections::new());
        }
    }
}

#[test]
fn file_backed_database_persists_across_opens() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("data").join("scopeforge.db");

    let project_id = {
        let db = Database::open(path.clone()).expect("Failed to open database");
        db.migrate().expect("Failed to run migrations");
        let project = create_test_project(&db);
        db.save(project.id, &populated_snapshot()).expect("Save failed");
        project.id
    };

    let db = Database::open(path).expect("Failed to reopen database");
    db.migrate().expect("Failed to run migrations");
    let loaded = db.load(project_id).expect("Load failed");
    assert_eq!(loaded.features().len(), 2);
}
