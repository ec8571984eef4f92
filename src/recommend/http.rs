//! HTTP suggestion provider.
//!
//! Posts the module name and description to a configured endpoint and
//! expects `{"features": [...], "rules": [...]}` back. Configuration:
//! - `SCOPEFORGE_SUGGEST_URL` - endpoint URL (no dynamic suggestions if unset)
//! - `SCOPEFORGE_API_TOKEN` - bearer credential

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Serialize;

use super::dynamic::{Credential, ProviderError, SuggestionProvider};
use super::Recommendations;
use crate::models::Module;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SuggestRequest<'a> {
    module_name: &'a str,
    description: &'a str,
    business_impact: &'a str,
}

#[derive(Debug, Clone)]
pub struct HttpSuggestionProvider {
    url: String,
    client: Client,
}

impl HttpSuggestionProvider {
    pub fn new(url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(timeout.unwrap_or(DEFAULT_TIMEOUT))
            .build()?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl SuggestionProvider for HttpSuggestionProvider {
    async fn suggest(
        &self,
        module: &Module,
        credential: &Credential,
    ) -> Result<Recommendations, ProviderError> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(credential.token())
            .json(&SuggestRequest {
                module_name: &module.name,
                description: &module.description,
                business_impact: &module.business_impact,
            })
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(response.json().await?)
        } else {
            let body = response.text().await.unwrap_or_default();
            match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ProviderError::Unauthorized),
                _ => Err(ProviderError::Server(format!("{}: {}", status, body))),
            }
        }
    }
}
