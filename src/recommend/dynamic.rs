//! Dynamic (remote) suggestions layered over the static knowledge base.
//!
//! The static table is always available. When a credential and a provider
//! are both present, the provider is asked for more suggestions; any failure
//! degrades to the static lists and reports why. Results are matched to the
//! module that was focused when the fetch started, and late arrivals for a
//! module the user has since left are dropped.

use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::{KnowledgeBase, Recommendations};
use crate::models::Module;

/// Bearer credential for the suggestion service.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Blank tokens are treated as "no credential".
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            None
        } else {
            Some(Self(token))
        }
    }

    pub fn token(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unauthorized: credential missing or rejected")]
    Unauthorized,

    #[error("Server error: {0}")]
    Server(String),

    #[error("Provider returned no suggestions")]
    Empty,
}

/// Source of dynamic suggestions for a module.
pub trait SuggestionProvider {
    fn suggest(
        &self,
        module: &Module,
        credential: &Credential,
    ) -> impl Future<Output = Result<Recommendations, ProviderError>> + Send;
}

/// The dynamic path failed; static recommendations were used instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("dynamic recommendations for '{module_name}' unavailable ({reason}); showing built-in suggestions")]
pub struct RecommendationUnavailable {
    pub module_name: String,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationSource {
    Static,
    Dynamic,
}

/// Recommendations for one module, with where they came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Recommended {
    pub module_id: Uuid,
    pub recommendations: Recommendations,
    pub source: RecommendationSource,
    pub degradation: Option<RecommendationUnavailable>,
}

/// Static recommendations, with dynamic ones appended when available.
///
/// Without a credential or provider no request is made. Dynamic entries
/// that duplicate static ones are dropped.
pub async fn fetch_recommendations<P: SuggestionProvider>(
    kb: &KnowledgeBase,
    module: &Module,
    provider: Option<&P>,
    credential: Option<&Credential>,
) -> Recommended {
    let base = kb.lookup(&module.name).clone();

    let (Some(provider), Some(credential)) = (provider, credential) else {
        tracing::debug!(module = %module.name, "using static recommendations");
        return Recommended {
            module_id: module.id,
            recommendations: base,
            source: RecommendationSource::Static,
            degradation: None,
        };
    };

    let outcome = match provider.suggest(module, credential).await {
        Ok(fetched) if fetched.is_empty() => Err(ProviderError::Empty),
        other => other,
    };

    match outcome {
        Ok(fetched) => {
            let unchanged = base.clone().normalized();
            let merged = Recommendations {
                features: base.features.into_iter().chain(fetched.features).collect(),
                rules: base.rules.into_iter().chain(fetched.rules).collect(),
            }
            .normalized();
            // Nothing new came back, so every entry is still a static one.
            let source = if merged == unchanged {
                RecommendationSource::Static
            } else {
                RecommendationSource::Dynamic
            };
            Recommended {
                module_id: module.id,
                recommendations: merged,
                source,
                degradation: None,
            }
        }
        Err(e) => {
            tracing::warn!(module = %module.name, error = %e, "dynamic recommendations failed, falling back");
            Recommended {
                module_id: module.id,
                recommendations: base,
                source: RecommendationSource::Static,
                degradation: Some(RecommendationUnavailable {
                    module_name: module.name.clone(),
                    reason: e.to_string(),
                }),
            }
        }
    }
}

/// Identifies one fetch started for one focused module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    pub module_id: Uuid,
    generation: u64,
}

/// Tracks which module is focused so late fetch results can be ignored.
#[derive(Debug, Default)]
pub struct SuggestionTracker {
    current: Option<FetchTicket>,
    generation: u64,
}

impl SuggestionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Focus a module and issue the ticket its fetch must present. Any
    /// earlier ticket becomes stale, even one for the same module.
    pub fn focus(&mut self, module_id: Uuid) -> FetchTicket {
        self.generation += 1;
        let ticket = FetchTicket {
            module_id,
            generation: self.generation,
        };
        self.current = Some(ticket);
        ticket
    }

    /// Nothing focused; every outstanding ticket is stale.
    pub fn clear(&mut self) {
        self.current = None;
    }

    pub fn is_current(&self, ticket: FetchTicket) -> bool {
        self.current == Some(ticket)
    }

    /// Hand back `result` only if its ticket is still current.
    pub fn accept<T>(&self, ticket: FetchTicket, result: T) -> Option<T> {
        if self.is_current(ticket) {
            Some(result)
        } else {
            tracing::debug!(module_id = %ticket.module_id, "discarding stale recommendation result");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_credential_is_none() {
        assert!(Credential::new("  ").is_none());
        assert_eq!(Credential::new("abc").unwrap().token(), "abc");
    }

    #[test]
    fn credential_debug_hides_token() {
        let cred = Credential::new("secret-token").unwrap();
        assert!(!format!("{cred:?}").contains("secret"));
    }

    #[test]
    fn refocusing_same_module_supersedes_ticket() {
        let mut tracker = SuggestionTracker::new();
        let id = Uuid::new_v4();
        let first = tracker.focus(id);
        let second = tracker.focus(id);

        assert_eq!(tracker.accept(first, 1), None);
        assert_eq!(tracker.accept(second, 2), Some(2));
    }

    #[test]
    fn clear_makes_everything_stale() {
        let mut tracker = SuggestionTracker::new();
        let ticket = tracker.focus(Uuid::new_v4());
        tracker.clear();
        assert!(!tracker.is_current(ticket));
    }
}
