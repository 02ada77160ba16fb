//! Run configuration.
//!
//! A run is described by a YAML file deserialized into [`RunConfig`]. Every
//! field is optional; missing fields take the defaults below. Selected
//! fields can be overridden from the command line through
//! [`ConfigOverrides`].
//!
//! ```yaml
//! teacher_model: gpt-4o
//! student_model: llama-3.1-8b-instant
//! orchestrator_model: gpt-4o
//! tasks: [T1, T2]
//! samples_per_task: 10
//! escalation_thresholds: { hard: 1, extreme: 2, impossible: 4 }
//! providers:
//!   - name: openai
//!     kind: openai
//!     models: [gpt-4o]
//!   - name: groq
//!     kind: groq
//!     models: [llama-3.1-8b-instant]
//! default_provider: openai
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::agents::{
    BinaryAnswerPolicy, QualityGate, QualityGateConfig, StudentAgent, StudentConfig, TeacherAgent,
    TeacherConfig,
};
use crate::difficulty::{EscalationThresholds, ThresholdError};
use crate::generation::{ControllerSettings, EscalationController};
use crate::llm::{default_provider_specs, LlmError, LlmProvider, ModelGateway, ProviderSpec};
use crate::prompts::DEFAULT_DETAIL_WINDOW;
use crate::tasks::TaskId;

/// Errors that can occur while loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Unknown task: {0}")]
    UnknownTask(String),

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Invalid escalation_thresholds: {0}")]
    Thresholds(#[from] ThresholdError),

    #[error("Provider setup failed: {0}")]
    Provider(#[from] LlmError),
}

fn invalid(key: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.into(),
    }
}

/// Sampling temperature per role.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleTemperatures {
    pub teacher: f64,
    pub student: f64,
    pub orchestrator: f64,
}

impl Default for RoleTemperatures {
    fn default() -> Self {
        Self {
            teacher: 0.7,
            student: 0.7,
            orchestrator: 0.0,
        }
    }
}

/// Complete configuration of a generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub teacher_model: String,
    pub student_model: String,
    pub orchestrator_model: String,
    /// Task identifiers, `T1` through `T7`.
    pub tasks: Vec<String>,
    pub samples_per_task: usize,
    pub output_dir: PathBuf,
    pub output_prefix: String,
    pub example_prob: f64,
    pub factor_prob: f64,
    pub max_init_loops: u32,
    pub max_diff_loops: u32,
    pub max_student_loops: u32,
    /// Seed for topic/factor choice and the Bernoulli rolls.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub escalation_thresholds: EscalationThresholds,
    /// Most recent Student attempts shown in full in the Student prompt.
    pub history_detail_window: usize,
    pub binary_answer_policy: BinaryAnswerPolicy,
    pub temperatures: RoleTemperatures,
    /// Explicit provider registry. Empty means a single OpenAI-compatible provider.
    pub providers: Vec<ProviderSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_provider: Option<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            teacher_model: "gpt-4o".to_string(),
            student_model: "gpt-4o".to_string(),
            orchestrator_model: "gpt-4o".to_string(),
            tasks: vec!["T1".to_string()],
            samples_per_task: 10,
            output_dir: PathBuf::from("."),
            output_prefix: "agentic".to_string(),
            example_prob: 0.5,
            factor_prob: 0.5,
            max_init_loops: 3,
            max_diff_loops: 5,
            max_student_loops: 3,
            seed: None,
            escalation_thresholds: EscalationThresholds::default(),
            history_detail_window: DEFAULT_DETAIL_WINDOW,
            binary_answer_policy: BinaryAnswerPolicy::default(),
            temperatures: RoleTemperatures::default(),
            providers: Vec::new(),
            default_provider: None,
        }
    }
}

/// Command-line overrides applied on top of a loaded file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub samples_per_task: Option<usize>,
    pub tasks: Option<Vec<String>>,
    pub output_dir: Option<PathBuf>,
    pub output_prefix: Option<String>,
    pub seed: Option<u64>,
}

/// Which provider serves each role's model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleRoute {
    pub role: &'static str,
    pub model: String,
    /// `None` when no provider would accept the model.
    pub provider: Option<String>,
}

impl RunConfig {
    /// Reads and parses a YAML file. Does not validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        // An empty document means "all defaults".
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(samples) = overrides.samples_per_task {
            self.samples_per_task = samples;
        }
        if let Some(tasks) = overrides.tasks {
            self.tasks = tasks;
        }
        if let Some(dir) = overrides.output_dir {
            self.output_dir = dir;
        }
        if let Some(prefix) = overrides.output_prefix {
            self.output_prefix = prefix;
        }
        if let Some(seed) = overrides.seed {
            self.seed = Some(seed);
        }
    }

    /// Parsed task identifiers, in configured order.
    pub fn task_ids(&self) -> Result<Vec<TaskId>, ConfigError> {
        self.tasks
            .iter()
            .map(|t| t.parse::<TaskId>().map_err(ConfigError::UnknownTask))
            .collect()
    }

    /// Checks budgets, probabilities, tasks, thresholds and the provider registry.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("max_init_loops", self.max_init_loops),
            ("max_diff_loops", self.max_diff_loops),
            ("max_student_loops", self.max_student_loops),
        ] {
            if value == 0 {
                return Err(invalid(key, "must be at least 1"));
            }
        }
        for (key, value) in [
            ("example_prob", self.example_prob),
            ("factor_prob", self.factor_prob),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid(key, format!("must be within [0, 1], got {}", value)));
            }
        }
        if self.tasks.is_empty() {
            return Err(invalid("tasks", "at least one task is required"));
        }
        self.task_ids()?;

        self.escalation_thresholds.validate()?;

        for (key, value) in [
            ("temperatures.teacher", self.temperatures.teacher),
            ("temperatures.student", self.temperatures.student),
            ("temperatures.orchestrator", self.temperatures.orchestrator),
        ] {
            if !(0.0..=2.0).contains(&value) {
                return Err(invalid(key, format!("must be within [0, 2], got {}", value)));
            }
        }

        let mut names: Vec<&str> = Vec::new();
        for spec in &self.providers {
            if names.contains(&spec.name.as_str()) {
                return Err(invalid(
                    "providers",
                    format!("duplicate provider name '{}'", spec.name),
                ));
            }
            names.push(&spec.name);
        }
        if let Some(default) = &self.default_provider {
            if !names.contains(&default.as_str()) {
                return Err(invalid(
                    "default_provider",
                    format!("'{}' is not declared in providers", default),
                ));
            }
        }
        Ok(())
    }

    /// Provider registry, falling back to the built-in default.
    pub fn provider_specs(&self) -> Vec<ProviderSpec> {
        if self.providers.is_empty() {
            default_provider_specs()
        } else {
            self.providers.clone()
        }
    }

    fn default_provider_name(&self, specs: &[ProviderSpec]) -> Option<String> {
        match &self.default_provider {
            Some(name) => Some(name.clone()),
            None if specs.len() == 1 => Some(specs[0].name.clone()),
            None => None,
        }
    }

    /// Provider name for `model`: exact registry membership, then the default.
    pub fn provider_for(&self, model: &str) -> Option<String> {
        let specs = self.provider_specs();
        specs
            .iter()
            .find(|spec| spec.models.iter().any(|m| m == model))
            .map(|spec| spec.name.clone())
            .or_else(|| self.default_provider_name(&specs))
    }

    /// Route of every role's model.
    pub fn role_routes(&self) -> Vec<RoleRoute> {
        [
            ("teacher", &self.teacher_model),
            ("student", &self.student_model),
            ("orchestrator", &self.orchestrator_model),
        ]
        .into_iter()
        .map(|(role, model)| RoleRoute {
            role,
            model: model.clone(),
            provider: self.provider_for(model),
        })
        .collect()
    }

    /// Builds the gateway, resolving endpoints and keys through `env`.
    pub fn build_gateway(
        &self,
        env: &dyn Fn(&str) -> Option<String>,
    ) -> Result<ModelGateway, ConfigError> {
        let specs = self.provider_specs();
        let default = self.default_provider_name(&specs);
        Ok(ModelGateway::from_specs(&specs, default.as_deref(), env)?)
    }

    pub fn controller_settings(&self) -> ControllerSettings {
        let settings = ControllerSettings::default()
            .with_max_init_loops(self.max_init_loops)
            .with_max_diff_loops(self.max_diff_loops)
            .with_max_student_loops(self.max_student_loops)
            .with_example_prob(self.example_prob)
            .with_factor_prob(self.factor_prob)
            .with_thresholds(self.escalation_thresholds);
        match self.seed {
            Some(seed) => settings.with_seed(seed),
            None => settings,
        }
    }

    /// Wires the three roles to `llm` with this configuration's models.
    pub fn build_controller(&self, llm: Arc<dyn LlmProvider>) -> EscalationController {
        let teacher = TeacherAgent::new(
            Arc::clone(&llm),
            TeacherConfig::default()
                .with_model(&self.teacher_model)
                .with_temperature(self.temperatures.teacher),
        );
        let gate = QualityGate::new(
            Arc::clone(&llm),
            QualityGateConfig::default()
                .with_model(&self.orchestrator_model)
                .with_temperature(self.temperatures.orchestrator),
        );
        let student = StudentAgent::new(
            llm,
            StudentConfig::default()
                .with_model(&self.student_model)
                .with_temperature(self.temperatures.student)
                .with_binary_policy(self.binary_answer_policy)
                .with_detail_window(self.history_detail_window),
        );
        EscalationController::new(teacher, gate, student, self.controller_settings())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ProviderKind;

    #[test]
    fn test_defaults() {
        let config = RunConfig::from_yaml_str("").expect("empty is default");
        assert_eq!(config, RunConfig::default());
        assert_eq!(config.tasks, vec!["T1".to_string()]);
        assert_eq!(config.samples_per_task, 10);
        assert_eq!(config.output_prefix, "agentic");
        assert_eq!(config.max_diff_loops, 5);
        assert_eq!(config.temperatures.orchestrator, 0.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml() {
        let yaml = r#"
student_model: llama-3.1-8b-instant
tasks: [T2, t5]
binary_answer_policy: strict
escalation_thresholds:
  impossible: 6
providers:
  - name: groq
    kind: groq
    models: [llama-3.1-8b-instant]
  - name: openai
    kind: openai
default_provider: openai
"#;
        let config = RunConfig::from_yaml_str(yaml).expect("parses");
        assert!(config.validate().is_ok());
        assert_eq!(config.task_ids().expect("tasks"), vec![TaskId::T2, TaskId::T5]);
        assert_eq!(config.binary_answer_policy, BinaryAnswerPolicy::Strict);
        assert_eq!(config.escalation_thresholds, EscalationThresholds::new(1, 2, 6));
        assert_eq!(config.providers[0].kind, ProviderKind::Groq);
        assert_eq!(config.max_init_loops, 3);

        let routes = config.role_routes();
        assert_eq!(routes[0].provider.as_deref(), Some("openai"));
        assert_eq!(routes[1].provider.as_deref(), Some("groq"));
    }

    #[test]
    fn test_validation_failures() {
        let zero_budget = RunConfig {
            max_diff_loops: 0,
            ..Default::default()
        };
        assert!(matches!(
            zero_budget.validate(),
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "max_diff_loops"
        ));

        let bad_prob = RunConfig {
            factor_prob: 1.5,
            ..Default::default()
        };
        assert!(bad_prob.validate().is_err());

        let bad_task = RunConfig {
            tasks: vec!["T9".to_string()],
            ..Default::default()
        };
        assert!(matches!(bad_task.validate(), Err(ConfigError::UnknownTask(_))));

        let bad_thresholds = RunConfig {
            escalation_thresholds: EscalationThresholds::new(3, 2, 4),
            ..Default::default()
        };
        assert!(matches!(
            bad_thresholds.validate(),
            Err(ConfigError::Thresholds(ThresholdError::Decreasing { hard: 3, .. }))
        ));

        let missing_default = RunConfig {
            providers: vec![ProviderSpec::new("groq", ProviderKind::Groq)],
            default_provider: Some("openai".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            missing_default.validate(),
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "default_provider"
        ));
    }

    #[test]
    fn test_overrides() {
        let mut config = RunConfig::default();
        config.apply_overrides(ConfigOverrides {
            samples_per_task: Some(2),
            tasks: Some(vec!["T3".to_string()]),
            output_dir: Some(PathBuf::from("out")),
            output_prefix: None,
            seed: Some(9),
        });
        assert_eq!(config.samples_per_task, 2);
        assert_eq!(config.tasks, vec!["T3".to_string()]);
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.output_prefix, "agentic");
        assert_eq!(config.controller_settings().seed, Some(9));
    }

    #[test]
    fn test_default_registry_routes_everything() {
        let config = RunConfig::default();
        assert!(config
            .role_routes()
            .iter()
            .all(|r| r.provider.as_deref() == Some("openai")));

        let gateway = config
            .build_gateway(&|key| (key == "OPENAI_API_KEY").then(|| "sk-test".to_string()))
            .expect("gateway builds");
        assert_eq!(gateway.provider_for("anything"), Some("openai"));
    }

    #[test]
    fn test_missing_file() {
        let err = RunConfig::load(Path::new("/nonexistent/run.yaml")).expect_err("missing");
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
