//! CLI command definitions for anomaly-forge.
//!
//! Three commands: `generate` runs the generation loop and writes the run
//! artifacts, `tasks` lists the task catalog, and `check-config` validates a
//! configuration file and shows where each role's model is routed.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use tracing::info;

use crate::config::{ConfigOverrides, RoleRoute, RunConfig};
use crate::export::{ArtifactPaths, ArtifactWriter};
use crate::generation::RunSummary;
use crate::llm::process_env;
use crate::tasks::{TaskId, TaskKind};

/// Agentic generator for anomaly-detection reading benchmarks.
#[derive(Parser)]
#[command(name = "anomaly-forge")]
#[command(about = "Generate anomaly-detection benchmark items with a Teacher/Orchestrator/Student loop")]
#[command(version)]
#[command(
    long_about = "anomaly-forge drafts benchmark problems with a Teacher model, gates them with an Orchestrator model, and hardens every problem a Student model solves until the Student fails or a budget runs out.\n\nExample usage:\n  anomaly-forge generate --config run.yaml --tasks T1,T2 --samples-per-task 5"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Run the generation loop and write the dataset and logs.
    #[command(alias = "gen")]
    Generate(GenerateArgs),

    /// List the built-in tasks.
    Tasks(TasksArgs),

    /// Validate a configuration file and show the provider of each role.
    CheckConfig(CheckConfigArgs),
}

/// Arguments for `anomaly-forge generate`.
#[derive(Parser, Debug)]
pub struct GenerateArgs {
    /// YAML run configuration. Defaults apply when omitted.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Samples to generate per task.
    #[arg(short = 'n', long)]
    pub samples_per_task: Option<usize>,

    /// Comma-separated task ids (e.g. T1,T2).
    #[arg(short, long, value_delimiter = ',')]
    pub tasks: Option<Vec<String>>,

    /// Directory receiving the run artifacts.
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// File name prefix of the run artifacts.
    #[arg(short = 'p', long)]
    pub output_prefix: Option<String>,

    /// Seed for topic, factor and example sampling.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Print the summary as JSON.
    #[arg(short, long)]
    pub json: bool,
}

impl GenerateArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            samples_per_task: self.samples_per_task,
            tasks: self.tasks.clone(),
            output_dir: self.output_dir.clone(),
            output_prefix: self.output_prefix.clone(),
            seed: self.seed,
        }
    }
}

/// Arguments for `anomaly-forge tasks`.
#[derive(Parser, Debug)]
pub struct TasksArgs {
    /// Print the catalog as JSON.
    #[arg(short, long)]
    pub json: bool,
}

/// Arguments for `anomaly-forge check-config`.
#[derive(Parser, Debug)]
pub struct CheckConfigArgs {
    /// YAML run configuration to check.
    #[arg(short, long)]
    pub config: PathBuf,

    /// Print the resolved configuration as JSON.
    #[arg(short, long)]
    pub json: bool,
}

/// Parse CLI arguments and return the Cli struct.
///
/// This allows main.rs to access CLI arguments (like log_level) before running commands.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI by parsing arguments and executing the command.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with the parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Generate(args) => run_generate_command(args).await,
        Commands::Tasks(args) => run_tasks_command(&args),
        Commands::CheckConfig(args) => run_check_config_command(&args),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<RunConfig> {
    match path {
        Some(path) => RunConfig::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => Ok(RunConfig::default()),
    }
}

#[derive(Serialize)]
struct GenerateReport<'a> {
    run_id: uuid::Uuid,
    summary: &'a RunSummary,
    artifacts: &'a ArtifactPaths,
}

async fn run_generate_command(args: GenerateArgs) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    config.apply_overrides(args.overrides());
    config.validate().context("Invalid configuration")?;
    let tasks = config.task_ids()?;

    let gateway = config
        .build_gateway(&process_env)
        .context("Failed to set up model providers")?;
    info!(
        teacher = %config.teacher_model,
        student = %config.student_model,
        orchestrator = %config.orchestrator_model,
        ?gateway,
        "Model gateway ready"
    );

    let controller = config.build_controller(Arc::new(gateway));
    let start = std::time::Instant::now();
    let output = controller.run(&tasks, config.samples_per_task).await;
    info!(
        elapsed_secs = start.elapsed().as_secs(),
        accepted = output.summary.accepted,
        requested = output.summary.requested,
        "Generation finished"
    );

    let writer = ArtifactWriter::new(&config.output_dir, &config.output_prefix);
    let paths = writer.write_run(&output).await.with_context(|| {
        format!(
            "Failed to write run artifacts to {}",
            config.output_dir.display()
        )
    })?;

    if args.json {
        let report = GenerateReport {
            run_id: output.run_id,
            summary: &output.summary,
            artifacts: &paths,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", output.summary.render());
        println!("\nArtifacts:");
        for path in paths.all() {
            println!("  {}", path.display());
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct TaskListing {
    id: TaskId,
    name: &'static str,
    kind: TaskKind,
    topics: usize,
    styles: usize,
    factors: usize,
    has_example: bool,
}

fn task_listing() -> Vec<TaskListing> {
    TaskId::all()
        .into_iter()
        .map(|id| {
            let spec = id.spec();
            TaskListing {
                id,
                name: spec.name,
                kind: spec.kind,
                topics: spec.topics.len(),
                styles: spec.styles.len(),
                factors: spec.factors.len(),
                has_example: spec.example.is_some(),
            }
        })
        .collect()
}

fn run_tasks_command(args: &TasksArgs) -> anyhow::Result<()> {
    let listing = task_listing();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }
    for task in listing {
        println!(
            "{}  {:<30} {:?}  topics={} styles={} factors={}{}",
            task.id,
            task.name,
            task.kind,
            task.topics,
            task.styles,
            task.factors,
            if task.has_example { " (example)" } else { "" }
        );
    }
    Ok(())
}

#[derive(Serialize)]
struct ConfigCheck<'a> {
    config: &'a RunConfig,
    routes: Vec<RoleRoute>,
}

fn run_check_config_command(args: &CheckConfigArgs) -> anyhow::Result<()> {
    let config = load_config(Some(&args.config))?;
    config.validate().context("Invalid configuration")?;

    let routes = config.role_routes();
    if let Some(unroutable) = routes.iter().find(|r| r.provider.is_none()) {
        anyhow::bail!(
            "No provider serves the {} model '{}' and no default provider is set",
            unroutable.role,
            unroutable.model
        );
    }

    if args.json {
        let check = ConfigCheck {
            config: &config,
            routes,
        };
        println!("{}", serde_json::to_string_pretty(&check)?);
        return Ok(());
    }

    println!("Configuration OK: {}", args.config.display());
    println!(
        "Tasks: {} x {} samples",
        config.tasks.join(","),
        config.samples_per_task
    );
    for route in routes {
        println!(
            "  {:<12} {} -> {}",
            route.role,
            route.model,
            route.provider.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::io::Write;

    #[test]
    fn test_cli_parses() {
        // Verify CLI definition is valid
        Cli::command().debug_assert();
    }

    #[test]
    fn test_generate_command_defaults() {
        let cli = Cli::try_parse_from(["anomaly-forge", "generate"]).expect("should parse");

        match cli.command {
            Commands::Generate(args) => {
                assert!(args.config.is_none());
                assert!(args.samples_per_task.is_none());
                assert!(args.tasks.is_none());
                assert!(args.seed.is_none());
                assert!(!args.json);
            }
            _ => panic!("Expected Generate command"),
        }
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn test_generate_command_with_all_options() {
        let args = vec![
            "anomaly-forge",
            "gen",
            "--config",
            "run.yaml",
            "-n",
            "5",
            "--tasks",
            "T1,T2",
            "-o",
            "./out",
            "-p",
            "trial",
            "--seed",
            "42",
            "-j",
            "--log-level",
            "debug",
        ];
        let cli = Cli::try_parse_from(args).expect("should parse");
        assert_eq!(cli.log_level, "debug");

        match cli.command {
            Commands::Generate(args) => {
                assert_eq!(args.config, Some(PathBuf::from("run.yaml")));
                assert_eq!(args.samples_per_task, Some(5));
                assert_eq!(
                    args.tasks,
                    Some(vec!["T1".to_string(), "T2".to_string()])
                );
                assert_eq!(args.output_dir, Some(PathBuf::from("./out")));
                assert_eq!(args.output_prefix.as_deref(), Some("trial"));
                assert_eq!(args.seed, Some(42));
                assert!(args.json);

                let overrides = args.overrides();
                assert_eq!(overrides.samples_per_task, Some(5));
                assert_eq!(overrides.seed, Some(42));
            }
            _ => panic!("Expected Generate command"),
        }
    }

    #[test]
    fn test_check_config_requires_path() {
        assert!(Cli::try_parse_from(["anomaly-forge", "check-config"]).is_err());
        let cli = Cli::try_parse_from(["anomaly-forge", "check-config", "-c", "run.yaml"])
            .expect("should parse");
        assert!(matches!(cli.command, Commands::CheckConfig(_)));
    }

    #[test]
    fn test_task_listing_covers_catalog() {
        let listing = task_listing();
        assert_eq!(listing.len(), 7);
        assert_eq!(listing[1].id, TaskId::T2);
        assert_eq!(listing[1].kind, TaskKind::Binary);
    }

    #[test]
    fn test_check_config_command() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "tasks: [T1, T3]\nsamples_per_task: 2").expect("write");
        let args = CheckConfigArgs {
            config: file.path().to_path_buf(),
            json: true,
        };
        assert!(run_check_config_command(&args).is_ok());

        let mut bad = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(bad, "max_init_loops: 0").expect("write");
        let args = CheckConfigArgs {
            config: bad.path().to_path_buf(),
            json: false,
        };
        assert!(run_check_config_command(&args).is_err());
    }
}
