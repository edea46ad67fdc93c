use serde::Serialize;

/// A supported LLM vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAi,
    Anthropic,
    Gemini,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::OpenAi, Provider::Anthropic, Provider::Gemini];

    /// Parse the lowercase provider name used on the wire and in the DB.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "openai" => Some(Provider::OpenAi),
            "anthropic" => Some(Provider::Anthropic),
            "gemini" => Some(Provider::Gemini),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Anthropic => "anthropic",
            Provider::Gemini => "gemini",
        }
    }

    /// Human-readable vendor name used in error messages.
    pub fn label(&self) -> &'static str {
        match self {
            Provider::OpenAi => "OpenAI",
            Provider::Anthropic => "Anthropic",
            Provider::Gemini => "Gemini",
        }
    }

    /// Model used when a request does not name one.
    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::OpenAi => "gpt-4o-mini",
            Provider::Anthropic => "claude-3-5-sonnet-20241022",
            Provider::Gemini => "gemini-1.5-flash",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A model a provider offers once its API key is configured.
#[derive(Debug, Serialize)]
pub struct CatalogModel {
    #[serde(skip)]
    pub provider: Provider,
    /// Vendor model identifier (e.g. "gpt-4o").
    pub id: &'static str,
    /// Display name for the UI (e.g. "GPT-4o").
    pub name: &'static str,
    /// Context window in tokens.
    pub context: u32,
    pub vision: bool,
}

const fn entry(
    provider: Provider,
    id: &'static str,
    name: &'static str,
    context: u32,
    vision: bool,
) -> CatalogModel {
    CatalogModel {
        provider,
        id,
        name,
        context,
        vision,
    }
}

/// Every model that is auto-registered when a provider key is added.
pub const CATALOG: &[CatalogModel] = &[
    entry(Provider::OpenAi, "gpt-4o", "GPT-4o", 128_000, true),
    entry(Provider::OpenAi, "gpt-4o-mini", "GPT-4o Mini", 128_000, true),
    entry(Provider::OpenAi, "gpt-4-turbo", "GPT-4 Turbo", 128_000, true),
    entry(Provider::OpenAi, "gpt-4", "GPT-4", 8_192, false),
    entry(Provider::OpenAi, "gpt-3.5-turbo", "GPT-3.5 Turbo", 16_384, false),
    entry(Provider::OpenAi, "o1", "GPT o1", 200_000, false),
    entry(Provider::OpenAi, "o1-mini", "GPT o1-mini", 128_000, false),
    entry(
        Provider::Anthropic,
        "claude-3-5-sonnet-20241022",
        "Claude 3.5 Sonnet (New)",
        200_000,
        true,
    ),
    entry(
        Provider::Anthropic,
        "claude-3-5-sonnet-20240620",
        "Claude 3.5 Sonnet",
        200_000,
        true,
    ),
    entry(
        Provider::Anthropic,
        "claude-3-opus-20240229",
        "Claude 3 Opus",
        200_000,
        true,
    ),
    entry(
        Provider::Anthropic,
        "claude-3-sonnet-20240229",
        "Claude 3 Sonnet",
        200_000,
        true,
    ),
    entry(
        Provider::Anthropic,
        "claude-3-haiku-20240307",
        "Claude 3 Haiku",
        200_000,
        true,
    ),
    entry(
        Provider::Gemini,
        "gemini-2.0-flash-exp",
        "Gemini 2.0 Flash Exp",
        1_000_000,
        true,
    ),
];

/// All catalog models for one provider, in catalog order.
pub fn models_for(provider: Provider) -> impl Iterator<Item = &'static CatalogModel> {
    CATALOG.iter().filter(move |m| m.provider == provider)
}

/// The catalog grouped by provider name, as served by `/llm/available-models`.
pub fn grouped() -> serde_json::Value {
    let mut out = serde_json::Map::new();
    for provider in Provider::ALL {
        let models: Vec<serde_json::Value> = models_for(provider)
            .filter_map(|m| serde_json::to_value(m).ok())
            .collect();
        out.insert(provider.as_str().to_string(), serde_json::Value::Array(models));
    }
    serde_json::Value::Object(out)
}
