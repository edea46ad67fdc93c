use serde::Deserialize;

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_anthropic_base_url() -> String {
    "https://api.anthropic.com/v1".to_string()
}

fn default_anthropic_version() -> String {
    "2023-06-01".to_string()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_health_prompt() -> String {
    "Hello".to_string()
}

fn default_health_max_tokens() -> u32 {
    10
}

fn default_python_bin() -> String {
    "python3".to_string()
}

fn default_exec_timeout_secs() -> u64 {
    10
}

fn default_test_timeout_secs() -> u64 {
    30
}

fn default_optimize_prompt() -> String {
    "\
Analyze and optimize the following {{language}} code. Provide:
1. Improved version with better performance and readability
2. Explanation of optimizations made

Code:
```{{language}}
{{code}}
```

Return the optimized code wrapped in ```{{language}} blocks."
        .to_string()
}

fn default_custom_model_reply() -> String {
    "Response from custom model '{{name}}': {{prompt}}...".to_string()
}

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,
    #[serde(default = "default_anthropic_base_url")]
    pub anthropic_base_url: String,
    #[serde(default = "default_anthropic_version")]
    pub anthropic_version: String,
    #[serde(default = "default_gemini_base_url")]
    pub gemini_base_url: String,
    #[serde(default = "default_temperature")]
    pub default_temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,
    #[serde(default = "default_health_prompt")]
    pub health_prompt: String,
    #[serde(default = "default_health_max_tokens")]
    pub health_max_tokens: u32,
    /// Remote sandbox service. When unset, code runs through the local interpreter.
    #[serde(default)]
    pub sandbox_url: Option<String>,
    #[serde(default = "default_python_bin")]
    pub python_bin: String,
    #[serde(default = "default_exec_timeout_secs")]
    pub exec_timeout_secs: u64,
    #[serde(default = "default_test_timeout_secs")]
    pub test_timeout_secs: u64,
    #[serde(default = "default_optimize_prompt")]
    pub optimize_prompt: String,
    #[serde(default = "default_custom_model_reply")]
    pub custom_model_reply: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            openai_base_url: default_openai_base_url(),
            anthropic_base_url: default_anthropic_base_url(),
            anthropic_version: default_anthropic_version(),
            gemini_base_url: default_gemini_base_url(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            health_prompt: default_health_prompt(),
            health_max_tokens: default_health_max_tokens(),
            sandbox_url: None,
            python_bin: default_python_bin(),
            exec_timeout_secs: default_exec_timeout_secs(),
            test_timeout_secs: default_test_timeout_secs(),
            optimize_prompt: default_optimize_prompt(),
            custom_model_reply: default_custom_model_reply(),
        }
    }
}

impl AppConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Ok(toml::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let cfg = AppConfig::load("/nonexistent/playground.toml").unwrap();
        assert_eq!(cfg.openai_base_url, "https://api.openai.com/v1");
        assert_eq!(cfg.exec_timeout_secs, 10);
        assert!(cfg.sandbox_url.is_none());
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let cfg: AppConfig = toml::from_str(
            r#"
            sandbox_url = "http://sandbox:8001"
            test_timeout_secs = 5
            "#,
        )
        .unwrap();
        assert_eq!(cfg.sandbox_url.as_deref(), Some("http://sandbox:8001"));
        assert_eq!(cfg.test_timeout_secs, 5);
        assert_eq!(cfg.anthropic_version, "2023-06-01");
        assert!(cfg.optimize_prompt.contains("{{code}}"));
    }
}
