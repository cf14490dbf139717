//! HTTP-backed generator collaborator.
//!
//! Delegates source generation to a generator service:
//!
//! ```text
//! POST {base}/style-sheet   { "description": <root>,      "options": {...} }
//! POST {base}/component     { "description": <component>, "options": {...} }
//!   -> 200 { "files": [...], "dependencies": { "<package>": <version> } }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::description::NormalizedDescription;
use crate::generator::{
    ComponentGenerator, GenerateError, GenerationOptions, GeneratorOutput, StyleSheetGenerator,
};

#[derive(Serialize)]
struct GenerateBody<'a> {
    description: &'a NormalizedDescription,
    options: &'a GenerationOptions,
}

/// Client for a remote generator service.
#[derive(Debug, Clone)]
pub struct RemoteGenerator {
    client: reqwest::Client,
    base_url: String,
}

impl RemoteGenerator {
    /// Create a client for the service at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, GenerateError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post(
        &self,
        route: &str,
        description: &NormalizedDescription,
        options: &GenerationOptions,
    ) -> Result<GeneratorOutput, GenerateError> {
        let url = format!("{}/{}", self.base_url, route);
        tracing::debug!(%url, component = description.name(), "calling generator");

        let response = self
            .client
            .post(&url)
            .json(&GenerateBody {
                description,
                options,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerateError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<GeneratorOutput>().await?)
    }
}

#[async_trait]
impl StyleSheetGenerator for RemoteGenerator {
    async fn generate_style_sheet(
        &self,
        root: &NormalizedDescription,
        options: &GenerationOptions,
    ) -> Result<GeneratorOutput, GenerateError> {
        self.post("style-sheet", root, options).await
    }
}

#[async_trait]
impl ComponentGenerator for RemoteGenerator {
    async fn generate_component(
        &self,
        component: &NormalizedDescription,
        options: &GenerationOptions,
    ) -> Result<GeneratorOutput, GenerateError> {
        self.post("component", component, options).await
    }
}
