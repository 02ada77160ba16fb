//! Model gateway: one call surface over every configured provider.
//!
//! The gateway owns the provider registry, routes a request by its exact
//! model identifier, and surfaces every provider failure as
//! [`LlmError::GenerationFailed`]. It never retries; regenerating a whole
//! problem is the escalation controller's job.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use super::client::{GenerationRequest, GenerationResponse, LlmProvider, Message};
use super::registry::ProviderSpec;
use crate::error::LlmError;

/// Sampling temperature used for generative calls unless the caller says otherwise.
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Provider name reported when no provider serves a model.
pub const UNROUTED_PROVIDER: &str = "unrouted";

const NO_CONTENT: &str = "no content in LLM response";

/// Routes requests to registered providers by model identifier.
#[derive(Default)]
pub struct ModelGateway {
    providers: HashMap<String, Arc<dyn LlmProvider>>,
    routes: HashMap<String, String>,
    default_provider: Option<String>,
}

impl std::fmt::Debug for ModelGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.providers.keys().collect();
        names.sort();
        f.debug_struct("ModelGateway")
            .field("providers", &names)
            .field("routes", &self.routes.len())
            .field("default_provider", &self.default_provider)
            .finish()
    }
}

impl ModelGateway {
    /// Creates an empty gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a gateway from registry specs.
    ///
    /// Each spec becomes one HTTP client. `default_provider` receives every
    /// model not listed explicitly; when `None` and exactly one provider is
    /// declared, that provider becomes the default.
    pub fn from_specs(
        specs: &[ProviderSpec],
        default_provider: Option<&str>,
        env: &dyn Fn(&str) -> Option<String>,
    ) -> Result<Self, LlmError> {
        let mut gateway = Self::new();

        for spec in specs {
            let client = spec.build_client(env)?;
            tracing::debug!(
                provider = %spec.name,
                kind = %spec.kind,
                api_base = %client.api_base(),
                models = spec.models.len(),
                "Registered LLM provider"
            );
            gateway.register(spec.name.clone(), Arc::new(client), spec.models.iter().cloned());
        }

        match default_provider {
            Some(name) => gateway.set_default_provider(name)?,
            None if specs.len() == 1 => gateway.set_default_provider(&specs[0].name)?,
            None => {}
        }

        Ok(gateway)
    }

    /// Registers a provider under `name`, routing the given models to it.
    pub fn register<I, S>(&mut self, name: impl Into<String>, provider: Arc<dyn LlmProvider>, models: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        for model in models {
            let model = model.into();
            if let Some(previous) = self.routes.insert(model.clone(), name.clone()) {
                if previous != name {
                    tracing::warn!(
                        model = %model,
                        previous = %previous,
                        provider = %name,
                        "Model re-registered to a different provider"
                    );
                }
            }
        }
        self.providers.insert(name, provider);
    }

    /// Selects the provider that receives unlisted models.
    pub fn set_default_provider(&mut self, name: &str) -> Result<(), LlmError> {
        if !self.providers.contains_key(name) {
            return Err(LlmError::UnroutableModel(format!(
                "default provider '{}' is not registered",
                name
            )));
        }
        self.default_provider = Some(name.to_string());
        Ok(())
    }

    /// Name of the provider that would serve `model`, if any.
    pub fn provider_for(&self, model: &str) -> Option<&str> {
        self.routes
            .get(model)
            .or(self.default_provider.as_ref())
            .map(String::as_str)
    }

    fn resolve(&self, model: &str) -> Result<(&str, &Arc<dyn LlmProvider>), LlmError> {
        let name = self
            .provider_for(model)
            .ok_or_else(|| LlmError::UnroutableModel(model.to_string()))?;
        let provider = self
            .providers
            .get(name)
            .ok_or_else(|| LlmError::UnroutableModel(model.to_string()))?;
        Ok((name, provider))
    }

    /// Sends `prompt` as a single user turn and returns the trimmed reply.
    pub async fn call(&self, prompt: &str, model: &str, temperature: f64) -> Result<String, LlmError> {
        complete_prompt(self, prompt, model, temperature).await
    }
}

#[async_trait]
impl LlmProvider for ModelGateway {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, LlmError> {
        let model = request.model.clone();
        let (name, provider) = self.resolve(&model).map_err(|err| LlmError::GenerationFailed {
            provider: UNROUTED_PROVIDER.to_string(),
            model: model.clone(),
            reason: err.to_string(),
        })?;

        tracing::debug!(provider = %name, model = %model, "Dispatching generation request");

        let failed = |reason: String| LlmError::GenerationFailed {
            provider: name.to_string(),
            model: model.clone(),
            reason,
        };
        let response = provider.generate(request).await.map_err(|err| match err {
            LlmError::GenerationFailed { .. } => err,
            other => failed(other.to_string()),
        })?;
        if response.first_content().is_none() {
            return Err(failed(NO_CONTENT.to_string()));
        }
        Ok(response)
    }
}

/// Single-turn completion against any provider.
///
/// Builds a one-message request at the given temperature and returns the
/// first choice, trimmed. A reply without content is a
/// [`LlmError::GenerationFailed`]; behind a [`ModelGateway`] it names the
/// serving provider.
pub async fn complete_prompt(
    provider: &dyn LlmProvider,
    prompt: &str,
    model: &str,
    temperature: f64,
) -> Result<String, LlmError> {
    let request = GenerationRequest::new(model, vec![Message::user(prompt)])
        .with_temperature(temperature);

    let response = provider.generate(request).await?;
    response
        .first_content()
        .map(|content| content.trim().to_string())
        .ok_or_else(|| LlmError::GenerationFailed {
            provider: "direct".to_string(),
            model: model.to_string(),
            reason: NO_CONTENT.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::registry::ProviderKind;
    use std::sync::Mutex;

    /// Records the requests it receives and answers with a fixed text.
    struct RecordingProvider {
        reply: Option<String>,
        fail: bool,
        seen: Mutex<Vec<GenerationRequest>>,
    }

    impl RecordingProvider {
        fn new(reply: &str) -> Self {
            Self {
                reply: Some(reply.to_string()),
                fail: false,
                seen: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                reply: None,
                fail: true,
                seen: Mutex::new(Vec::new()),
            }
        }

        /// Succeeds with an empty choice list.
        fn silent() -> Self {
            Self {
                reply: None,
                fail: false,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for RecordingProvider {
        async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, LlmError> {
            self.seen.lock().expect("lock not poisoned").push(request.clone());
            if self.fail {
                return Err(LlmError::RateLimited("slow down".to_string()));
            }
            Ok(GenerationResponse {
                model: request.model,
                choices: self.reply.iter().map(Message::assistant).collect(),
                total_tokens: 0,
            })
        }
    }

    #[tokio::test]
    async fn test_routes_by_exact_model_and_falls_back_to_default() {
        let openai = Arc::new(RecordingProvider::new("  from openai \n"));
        let groq = Arc::new(RecordingProvider::new("from groq"));

        let mut gateway = ModelGateway::new();
        gateway.register("openai", openai.clone(), Vec::<String>::new());
        gateway.register("groq", groq.clone(), ["llama-3.3-70b-versatile"]);
        gateway.set_default_provider("openai").expect("registered");

        let text = gateway
            .call("hi", "llama-3.3-70b-versatile", 0.7)
            .await
            .expect("should route");
        assert_eq!(text, "from groq");

        // A llama-looking name that is not registered goes to the default.
        let text = gateway.call("hi", "llama-other", 0.7).await.expect("should route");
        assert_eq!(text, "from openai");

        let seen = groq.seen.lock().expect("lock not poisoned");
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].temperature, Some(0.7));
        assert_eq!(seen[0].messages, vec![Message::user("hi")]);
    }

    #[tokio::test]
    async fn test_unroutable_model_without_default() {
        let mut gateway = ModelGateway::new();
        gateway.register("groq", Arc::new(RecordingProvider::new("x")), ["llama"]);

        let err = gateway.call("hi", "gpt-4o", 0.7).await.expect_err("no route");
        match err {
            LlmError::GenerationFailed {
                provider,
                model,
                reason,
            } => {
                assert_eq!(provider, UNROUTED_PROVIDER);
                assert_eq!(model, "gpt-4o");
                assert!(reason.contains("gpt-4o"));
            }
            other => panic!("Expected GenerationFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_reply_becomes_generation_failed() {
        let mut gateway = ModelGateway::new();
        gateway.register("openai", Arc::new(RecordingProvider::silent()), ["gpt-4o"]);

        let err = gateway.call("hi", "gpt-4o", 0.0).await.expect_err("no content");
        assert!(matches!(
            err,
            LlmError::GenerationFailed { ref provider, ref reason, .. }
                if provider == "openai" && reason.contains("no content")
        ));

        // Without a gateway the failure is still the uniform kind.
        let err = complete_prompt(&RecordingProvider::silent(), "hi", "gpt-4o", 0.0)
            .await
            .expect_err("no content");
        assert!(matches!(err, LlmError::GenerationFailed { ref model, .. } if model == "gpt-4o"));
    }

    #[tokio::test]
    async fn test_provider_failure_becomes_generation_failed_without_retry() {
        let failing = Arc::new(RecordingProvider::failing());
        let mut gateway = ModelGateway::new();
        gateway.register("openai", failing.clone(), ["gpt-4o"]);

        let err = gateway.call("hi", "gpt-4o", 0.0).await.expect_err("should fail");
        match err {
            LlmError::GenerationFailed {
                provider,
                model,
                reason,
            } => {
                assert_eq!(provider, "openai");
                assert_eq!(model, "gpt-4o");
                assert!(reason.contains("slow down"));
            }
            other => panic!("Expected GenerationFailed, got {:?}", other),
        }
        assert_eq!(failing.seen.lock().expect("lock not poisoned").len(), 1);
    }

    #[test]
    fn test_set_default_provider_rejects_unknown() {
        let mut gateway = ModelGateway::new();
        assert!(gateway.set_default_provider("missing").is_err());
    }

    #[test]
    fn test_from_specs_single_provider_becomes_default() {
        let env = |key: &str| match key {
            "OPENAI_API_KEY" => Some("sk-test-key-123456".to_string()),
            _ => None,
        };
        let specs = vec![ProviderSpec::new("openai", ProviderKind::OpenAi)];
        let gateway = ModelGateway::from_specs(&specs, None, &env).expect("should build");
        assert_eq!(gateway.provider_for("gpt-4o"), Some("openai"));
        assert_eq!(gateway.provider_for("anything"), Some("openai"));
    }
}
