//! LLM integration for anomaly-forge.
//!
//! Every role in the pipeline reaches a model through the [`ModelGateway`].
//! Providers are declared in the run configuration ([`ProviderSpec`]) and
//! all of them speak the OpenAI-compatible chat-completions protocol, so a
//! single [`ChatCompletionsClient`] type serves every vendor.
//!
//! ```ignore
//! use anomaly_forge::llm::{ModelGateway, ProviderKind, ProviderSpec, process_env};
//!
//! let specs = vec![
//!     ProviderSpec::new("openai", ProviderKind::OpenAi),
//!     ProviderSpec::new("groq", ProviderKind::Groq).with_models(["llama-3.3-70b-versatile"]),
//! ];
//! let gateway = ModelGateway::from_specs(&specs, Some("openai"), &process_env)?;
//! let reply = gateway.call("Say hi", "gpt-4o", 0.7).await?;
//! ```

mod client;
mod gateway;
mod registry;

pub use client::{
    ChatCompletionsClient, GenerationRequest, GenerationResponse, LlmProvider, Message,
};
pub use gateway::{complete_prompt, ModelGateway, DEFAULT_TEMPERATURE, UNROUTED_PROVIDER};
pub use registry::{default_provider_specs, process_env, ProviderKind, ProviderSpec};

pub use crate::error::LlmError;
