pub mod anthropic;
pub mod gemini;
pub mod openai;
pub mod sse;
pub mod stream;
mod template;

use common::catalog::Provider;
use common::config::AppConfig;
use common::models::ModelEntry;
use serde::Serialize;
use serde_json::Value;

pub use stream::DeltaReceiver;
pub use template::render_template;

/// A single-prompt completion request.
#[derive(Debug, Clone)]
pub struct GenerateParams {
    pub prompt: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

/// Result of one provider call. Vendor failures are values, not errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerateOutcome {
    pub success: bool,
    pub response: Option<String>,
    pub usage: Option<Value>,
    pub error: Option<String>,
}

impl GenerateOutcome {
    pub fn ok(response: String, usage: Option<Value>) -> Self {
        Self {
            success: true,
            response: Some(response),
            usage,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            response: None,
            usage: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub success: bool,
    pub available: bool,
    pub error: Option<String>,
}

impl HealthReport {
    pub fn unavailable(error: impl Into<String>) -> Self {
        Self {
            success: false,
            available: false,
            error: Some(error.into()),
        }
    }
}

/// Client for one vendor, bound to a decrypted API key.
#[derive(Clone)]
pub struct ProviderClient {
    pub(crate) provider: Provider,
    pub(crate) api_key: String,
    pub(crate) config: AppConfig,
    pub(crate) http: reqwest::Client,
}

impl ProviderClient {
    pub fn new(
        provider: Provider,
        api_key: impl Into<String>,
        config: &AppConfig,
        http: &reqwest::Client,
    ) -> Self {
        Self {
            provider,
            api_key: api_key.into(),
            config: config.clone(),
            http: http.clone(),
        }
    }

    pub async fn generate(&self, params: &GenerateParams) -> GenerateOutcome {
        let result = match self.provider {
            Provider::OpenAi => openai::generate(self, params).await,
            Provider::Anthropic => anthropic::generate(self, params).await,
            Provider::Gemini => gemini::generate(self, params).await,
        };
        match result {
            Ok(outcome) => {
                if let Some(ref err) = outcome.error {
                    log::warn!("{} {} failed: {}", self.provider, params.model, err);
                }
                outcome
            }
            Err(e) => {
                log::warn!("{} {} transport error: {}", self.provider, params.model, e);
                GenerateOutcome::failed(format!("Error calling {}: {}", self.provider.label(), e))
            }
        }
    }

    /// Open a streaming completion. Errors cover both transport failures and
    /// non-2xx vendor responses.
    pub async fn stream(&self, params: &GenerateParams) -> anyhow::Result<DeltaReceiver> {
        stream::open(self, params).await
    }

    /// Check `model` with a tiny, low-temperature prompt.
    pub async fn health_check(&self, model: &str) -> HealthReport {
        let params = GenerateParams {
            prompt: self.config.health_prompt.clone(),
            model: model.to_string(),
            temperature: 0.1,
            max_tokens: self.config.health_max_tokens,
        };
        let outcome = self.generate(&params).await;
        HealthReport {
            success: outcome.success,
            available: outcome.success,
            error: outcome.error,
        }
    }

    pub(crate) fn post_json(&self, url: &str, body: &Value) -> anyhow::Result<reqwest::RequestBuilder> {
        Ok(self
            .http
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(serde_json::to_vec(body)?))
    }
}

/// Loose sanity check on a key's shape. Only used to warn; never rejects.
pub fn validate_key_format(provider: Provider, key: &str) -> bool {
    match provider {
        Provider::OpenAi => key.starts_with("sk-"),
        Provider::Anthropic | Provider::Gemini => key.len() > 20,
    }
}

/// Work out which provider and vendor model a generate request targets.
///
/// A registered model supplies both; otherwise `model_id` is read as
/// `<provider>-<identifier>` split on the first dash. Returns `None` when
/// neither yields a provider name.
pub fn resolve_target(model: Option<&ModelEntry>, model_id: &str) -> Option<(String, String)> {
    match model {
        Some(m) => {
            let provider = m.provider.clone()?;
            let identifier = m.model_identifier.clone().unwrap_or_else(|| {
                Provider::parse(&provider)
                    .map(|p| p.default_model().to_string())
                    .unwrap_or_default()
            });
            Some((provider, identifier))
        }
        None => model_id
            .split_once('-')
            .map(|(p, id)| (p.to_string(), id.to_string())),
    }
}

/// The canned reply for uploaded custom models.
pub fn custom_model_reply(config: &AppConfig, model_name: &str, prompt: &str) -> String {
    let head: String = prompt.chars().take(50).collect();
    render_template(
        &config.custom_model_reply,
        &serde_json::json!({ "name": model_name, "prompt": head }),
    )
}

/// Pull `error.message` out of a JSON error body, falling back to the raw text.
pub(crate) fn vendor_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(|s| s.to_string()))
        .unwrap_or_else(|| body.to_string())
}

#[cfg(test)]
pub(crate) fn test_config(base: &str) -> AppConfig {
    AppConfig {
        openai_base_url: base.to_string(),
        anthropic_base_url: base.to_string(),
        gemini_base_url: base.to_string(),
        ..AppConfig::default()
    }
}
