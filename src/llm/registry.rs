//! Provider registry specifications.
//!
//! Providers are declared explicitly in the run configuration and matched to
//! models by exact identifier. Nothing is inferred from the shape of a model
//! name.

use serde::{Deserialize, Serialize};

use super::client::ChatCompletionsClient;
use crate::error::LlmError;

/// Vendor family behind a provider entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
    Gemini,
    Xai,
    Groq,
    OpenRouter,
    LiteLlm,
}

impl ProviderKind {
    /// Built-in OpenAI-compatible endpoint for this vendor.
    ///
    /// `LiteLlm` has none: a proxy address must come from configuration or
    /// `LITELLM_API_BASE`.
    pub fn default_api_base(&self) -> Option<&'static str> {
        match self {
            ProviderKind::OpenAi => Some("https://api.openai.com/v1"),
            ProviderKind::Anthropic => Some("https://api.anthropic.com/v1"),
            ProviderKind::Gemini => {
                Some("https://generativelanguage.googleapis.com/v1beta/openai")
            }
            ProviderKind::Xai => Some("https://api.x.ai/v1"),
            ProviderKind::Groq => Some("https://api.groq.com/openai/v1"),
            ProviderKind::OpenRouter => Some("https://openrouter.ai/api/v1"),
            ProviderKind::LiteLlm => None,
        }
    }

    /// Environment variable that may override the endpoint.
    pub fn api_base_env(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OPENAI_API_BASE",
            ProviderKind::Anthropic => "ANTHROPIC_API_BASE",
            ProviderKind::Gemini => "GEMINI_API_BASE",
            ProviderKind::Xai => "XAI_API_BASE",
            ProviderKind::Groq => "GROQ_API_BASE",
            ProviderKind::OpenRouter => "OPENROUTER_API_BASE",
            ProviderKind::LiteLlm => "LITELLM_API_BASE",
        }
    }

    /// Environment variable holding the API key when none is configured.
    pub fn default_api_key_env(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OPENAI_API_KEY",
            ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
            ProviderKind::Gemini => "GEMINI_API_KEY",
            ProviderKind::Xai => "XAI_API_KEY",
            ProviderKind::Groq => "GROQ_API_KEY",
            ProviderKind::OpenRouter => "OPENROUTER_API_KEY",
            ProviderKind::LiteLlm => "LITELLM_API_KEY",
        }
    }

    /// Whether requests without a key are acceptable.
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, ProviderKind::LiteLlm)
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Gemini => "gemini",
            ProviderKind::Xai => "xai",
            ProviderKind::Groq => "groq",
            ProviderKind::OpenRouter => "openrouter",
            ProviderKind::LiteLlm => "litellm",
        };
        write!(f, "{}", name)
    }
}

/// One provider entry of the registry, as written in the run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSpec {
    /// Registry name, referenced by `default_provider`.
    pub name: String,
    /// Vendor family.
    pub kind: ProviderKind,
    /// Endpoint override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    /// Name of the environment variable holding the key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    /// Model identifiers served by this provider.
    #[serde(default)]
    pub models: Vec<String>,
}

impl ProviderSpec {
    /// Creates a spec with the vendor defaults and no explicit models.
    pub fn new(name: impl Into<String>, kind: ProviderKind) -> Self {
        Self {
            name: name.into(),
            kind,
            api_base: None,
            api_key_env: None,
            models: Vec::new(),
        }
    }

    /// Adds model identifiers routed to this provider.
    pub fn with_models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.models.extend(models.into_iter().map(Into::into));
        self
    }

    /// Sets an explicit endpoint.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = Some(api_base.into());
        self
    }

    /// Environment variable consulted for the key.
    pub fn key_env(&self) -> &str {
        self.api_key_env
            .as_deref()
            .unwrap_or_else(|| self.kind.default_api_key_env())
    }

    /// Resolves the endpoint: explicit config, then environment, then vendor default.
    pub fn resolve_api_base(
        &self,
        env: &dyn Fn(&str) -> Option<String>,
    ) -> Result<String, LlmError> {
        if let Some(base) = &self.api_base {
            return Ok(base.clone());
        }
        if let Some(base) = env(self.kind.api_base_env()) {
            return Ok(base);
        }
        self.kind
            .default_api_base()
            .map(str::to_string)
            .ok_or_else(|| LlmError::MissingApiBase(self.kind.api_base_env().to_string()))
    }

    /// Builds the HTTP client for this entry.
    ///
    /// `env` is the environment lookup, injectable so callers can resolve
    /// credentials from somewhere other than the process environment.
    pub fn build_client(
        &self,
        env: &dyn Fn(&str) -> Option<String>,
    ) -> Result<ChatCompletionsClient, LlmError> {
        let api_base = self.resolve_api_base(env)?;
        let api_key = env(self.key_env()).filter(|k| !k.trim().is_empty());

        if api_key.is_none() && self.kind.requires_api_key() {
            return Err(LlmError::MissingApiKey(self.key_env().to_string()));
        }

        ChatCompletionsClient::new(api_base, api_key)
    }
}

/// Registry used when the configuration declares no providers: one OpenAI
/// entry serving every model through the default route.
pub fn default_provider_specs() -> Vec<ProviderSpec> {
    vec![ProviderSpec::new("openai", ProviderKind::OpenAi)]
}

/// Process-environment lookup for [`ProviderSpec::build_client`].
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_provider_kind_serde_lowercase() {
        let kind: ProviderKind = serde_yaml::from_str("openrouter").expect("should parse");
        assert_eq!(kind, ProviderKind::OpenRouter);
        assert_eq!(ProviderKind::LiteLlm.to_string(), "litellm");
    }

    #[test]
    fn test_resolve_api_base_precedence() {
        let env = env_from(&[("GROQ_API_BASE", "http://proxy.local/v1")]);

        let spec = ProviderSpec::new("groq", ProviderKind::Groq);
        assert_eq!(
            spec.resolve_api_base(&env).expect("should resolve"),
            "http://proxy.local/v1"
        );

        let explicit = spec.clone().with_api_base("http://explicit/v1");
        assert_eq!(
            explicit.resolve_api_base(&env).expect("should resolve"),
            "http://explicit/v1"
        );

        let no_env = env_from(&[]);
        assert_eq!(
            spec.resolve_api_base(&no_env).expect("should resolve"),
            "https://api.groq.com/openai/v1"
        );
    }

    #[test]
    fn test_litellm_requires_base_but_not_key() {
        let spec = ProviderSpec::new("proxy", ProviderKind::LiteLlm);

        let err = spec.build_client(&env_from(&[])).expect_err("base is required");
        assert!(matches!(err, LlmError::MissingApiBase(ref var) if var == "LITELLM_API_BASE"));

        let client = spec
            .build_client(&env_from(&[("LITELLM_API_BASE", "http://localhost:4000")]))
            .expect("should build without key");
        assert!(!client.has_api_key());
    }

    #[test]
    fn test_missing_key_is_reported_with_variable_name() {
        let mut spec = ProviderSpec::new("claude", ProviderKind::Anthropic);
        spec.api_key_env = Some("MY_CLAUDE_KEY".to_string());

        let err = spec.build_client(&env_from(&[])).expect_err("key is required");
        assert!(matches!(err, LlmError::MissingApiKey(ref var) if var == "MY_CLAUDE_KEY"));

        let client = spec
            .build_client(&env_from(&[("MY_CLAUDE_KEY", "secret-key-value")]))
            .expect("should build");
        assert!(client.has_api_key());
        assert_eq!(client.api_base(), "https://api.anthropic.com/v1");
    }

    #[test]
    fn test_spec_yaml_roundtrip_fields() {
        let yaml = r#"
name: fast
kind: groq
models: [llama-3.3-70b-versatile]
"#;
        let spec: ProviderSpec = serde_yaml::from_str(yaml).expect("should parse");
        assert_eq!(spec.name, "fast");
        assert_eq!(spec.kind, ProviderKind::Groq);
        assert_eq!(spec.models, vec!["llama-3.3-70b-versatile".to_string()]);
        assert!(spec.api_base.is_none());
        assert_eq!(spec.key_env(), "GROQ_API_KEY");
    }
}
