use std::time::Duration;

use chrono::Utc;
use scopeforge::models::*;
use scopeforge::recommend::{self, *};
use speculate2::speculate;
use uuid::Uuid;

const LOGIN: &str = "Login & Authentication";

fn module(name: &str) -> Module {
    let now = Utc::now();
    Module {
        id: Uuid::new_v4(),
        name: name.to_string(),
        description: String::new(),
        priority: Priority::Medium,
        business_impact: String::new(),
        dependencies: String::new(),
        status: Status::NotStarted,
        user_story_id: None,
        created_at: now,
        updated_at: now,
    }
}

fn list(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Provider that answers after a delay, or fails.
struct StubProvider {
    delay: Duration,
    answer: Option<Recommendations>,
}

impl StubProvider {
    fn answering(features: &[&str]) -> Self {
        Self {
            delay: Duration::ZERO,
            answer: Some(Recommendations {
                features: list(features),
                rules: Vec::new(),
            }),
        }
    }

    fn failing() -> Self {
        Self {
            delay: Duration::ZERO,
            answer: None,
        }
    }

    fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl SuggestionProvider for StubProvider {
    async fn suggest(
        &self,
        _module: &Module,
        _credential: &Credential,
    ) -> Result<Recommendations, ProviderError> {
        tokio::time::sleep(self.delay).await;
        self.answer.clone().ok_or(ProviderError::Unauthorized)
    }
}

speculate! {
    before {
        let kb = KnowledgeBase::builtin();
        let candidates = kb.candidates(LOGIN, RecommendationKind::Feature);
    }

    describe "knowledge base" {
        it "has eight feature suggestions for login" {
            assert_eq!(candidates.len(), 8);
            assert!(candidates.contains(&"JWT token management".to_string()));
        }

        it "falls back to empty lists for unknown or differently cased names" {
            assert!(kb.lookup("Checkout Module").is_empty());
            assert!(kb.lookup("login & authentication").is_empty());
        }

        it "loads a replacement table from JSON" {
            let custom = KnowledgeBase::from_json(
                r#"{"Checkout Module": {"features": ["Card form", " Card form ", ""]}}"#,
            ).unwrap();
            assert_eq!(custom.candidates("Checkout Module", RecommendationKind::Feature), ["Card form".to_string()]);
            assert!(custom.candidates("Checkout Module", RecommendationKind::BusinessRule).is_empty());
        }
    }

    describe "available" {
        it "returns the seven remaining login features" {
            let selected = list(&["JWT token management"]);
            let remaining = recommend::available(candidates, &selected);

            assert_eq!(remaining.len(), 7);
            assert!(!remaining.contains(&"JWT token management".to_string()));
        }

        it "never contains a selected entry" {
            let selected = list(&["Remember me option", "Two-factor authentication", "Custom thing"]);
            let remaining = recommend::available(candidates, &selected);
            assert!(remaining.iter().all(|r| !selected.contains(r)));
            assert_eq!(remaining.len(), 6);
        }

        it "is empty after select all" {
            let edit = recommend::select_all(candidates, &list(&["Custom thing"]));
            assert!(edit.is_changed());
            assert_eq!(edit.items[0], "Custom thing");
            assert!(recommend::available(candidates, &edit.items).is_empty());

            let again = recommend::select_all(candidates, &edit.items);
            assert_eq!(again.notice, Some(Notice::NothingNewToSelect));
            assert_eq!(again.items, edit.items);
        }
    }

    describe "custom entries" {
        it "adding twice equals adding once" {
            let once = recommend::add_custom(&[], "Audit log");
            let twice = recommend::add_custom(&once.items, "Audit log");
            assert_eq!(once.items, twice.items);
            assert_eq!(twice.notice, Some(Notice::AlreadySelected("Audit log".to_string())));
        }

        it "ignores blank text" {
            let edit = recommend::add_custom(&list(&["a"]), "   ");
            assert_eq!(edit.notice, Some(Notice::EmptyText));
        }

        it "renames in place and refuses collisions" {
            let selected = list(&["a", "b"]);
            assert_eq!(recommend::rename(&selected, "a", "c").items, list(&["c", "b"]));
            assert!(!recommend::rename(&selected, "a", "b").is_changed());
            assert!(!recommend::rename(&selected, "z", "c").is_changed());
        }
    }

    describe "selections per module" {
        it "keeps features and rules separate" {
            let login = module(LOGIN);
            let mut selections = Selections::new();
            assert!(selections.select_all(kb, &login, RecommendationKind::Feature).is_none());

            assert_eq!(selections.get(login.id, RecommendationKind::Feature).len(), 8);
            assert!(selections.get(login.id, RecommendationKind::BusinessRule).is_empty());
            assert!(selections.available(kb, &login, RecommendationKind::Feature).is_empty());
            assert_eq!(
                selections.available(kb, &login, RecommendationKind::BusinessRule),
                kb.candidates(LOGIN, RecommendationKind::BusinessRule)
            );
        }

        it "prunes modules that were deleted" {
            let mut snap = scopeforge::integrity::ProjectSnapshot::new();
            let kept = snap.add_module(CreateModuleInput { name: LOGIN.to_string(), ..Default::default() }).unwrap();
            let gone = snap.add_module(CreateModuleInput { name: "Search".to_string(), ..Default::default() }).unwrap();

            let mut selections = Selections::new();
            assert!(selections.add_custom(kept.id, RecommendationKind::Feature, "x").is_none());
            assert!(selections.add_custom(gone.id, RecommendationKind::BusinessRule, "y").is_none());
            snap.delete_module(gone.id).unwrap();

            assert_eq!(selections.prune(&snap), 1);
            assert_eq!(selections.module_ids(RecommendationKind::BusinessRule).count(), 0);
            assert_eq!(selections.get(kept.id, RecommendationKind::Feature), ["x".to_string()]);
        }
    }
}

#[tokio::test]
async fn without_credential_uses_static_table_and_skips_provider() {
    let login = module(LOGIN);
    let provider = StubProvider::answering(&["Passkeys"]);

    let result = fetch_recommendations(KnowledgeBase::builtin(), &login, Some(&provider), None).await;

    assert_eq!(result.source, RecommendationSource::Static);
    assert!(result.degradation.is_none());
    assert_eq!(result.recommendations.features.len(), 8);
}

#[tokio::test]
async fn dynamic_results_follow_static_ones_without_duplicates() {
    let login = module(LOGIN);
    let provider = StubProvider::answering(&["Passkeys", "Remember me option"]);
    let credential = Credential::new("token").unwrap();

    let result = fetch_recommendations(
        KnowledgeBase::builtin(),
        &login,
        Some(&provider),
        Some(&credential),
    )
    .await;

    assert_eq!(result.source, RecommendationSource::Dynamic);
    let features = &result.recommendations.features;
    assert_eq!(features.len(), 9);
    assert_eq!(features.last().map(String::as_str), Some("Passkeys"));
}

#[tokio::test]
async fn only_known_suggestions_keep_static_source() {
    let login = module(LOGIN);
    let provider = StubProvider::answering(&["Remember me option", "  Email and password login "]);
    let credential = Credential::new("token").unwrap();

    let result = fetch_recommendations(
        KnowledgeBase::builtin(),
        &login,
        Some(&provider),
        Some(&credential),
    )
    .await;

    assert_eq!(result.source, RecommendationSource::Static);
    assert!(result.degradation.is_none());
    assert_eq!(
        result.recommendations,
        KnowledgeBase::builtin().lookup(LOGIN).clone()
    );
}

#[tokio::test]
async fn provider_failure_degrades_to_static() {
    let login = module(LOGIN);
    let credential = Credential::new("token").unwrap();

    let result = fetch_recommendations(
        KnowledgeBase::builtin(),
        &login,
        Some(&StubProvider::failing()),
        Some(&credential),
    )
    .await;

    assert_eq!(result.source, RecommendationSource::Static);
    assert_eq!(
        result.recommendations,
        KnowledgeBase::builtin().lookup(LOGIN).clone()
    );
    let degradation = result.degradation.expect("degradation reported");
    assert_eq!(degradation.module_name, LOGIN);
}

#[tokio::test]
async fn late_results_for_a_module_left_behind_are_discarded() {
    let login = module(LOGIN);
    let search = module("Search");
    let credential = Credential::new("token").unwrap();
    let kb = KnowledgeBase::builtin();
    let slow = StubProvider::answering(&["Passkeys"]).after(Duration::from_millis(50));
    let fast = StubProvider::answering(&["Fuzzy matching"]);

    let mut tracker = SuggestionTracker::new();
    let login_ticket = tracker.focus(login.id);
    let login_fetch = fetch_recommendations(kb, &login, Some(&slow), Some(&credential));

    let search_ticket = tracker.focus(search.id);
    let search_fetch = fetch_recommendations(kb, &search, Some(&fast), Some(&credential));

    let (login_result, search_result) = tokio::join!(login_fetch, search_fetch);

    assert!(tracker.accept(login_ticket, login_result).is_none());
    let accepted = tracker
        .accept(search_ticket, search_result)
        .expect("current module result accepted");
    assert_eq!(accepted.module_id, search.id);
    assert_eq!(accepted.recommendations.features.last().map(String::as_str), Some("Fuzzy matching"));
}

#[test]
fn blank_credentials_are_treated_as_missing() {
    assert!(Credential::new("  ").is_none());
    assert_eq!(format!("{:?}", Credential::new("secret").unwrap()), "Credential(***)");
}
