//! Writes the files produced by a generation run.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::ExportError;
use crate::generation::RunOutput;
use crate::ledger::render_transcript;

/// Locations of a run's artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactPaths {
    /// Accepted problems.
    pub final_dataset: PathBuf,
    /// Approved base problems.
    pub raw: PathBuf,
    /// Every escalated draft.
    pub fixes: PathBuf,
    pub init_validation_logs: PathBuf,
    pub difficulty_validation_logs: PathBuf,
    /// Full process log as a pretty JSON array.
    pub process_log: PathBuf,
    /// Human-readable process transcript.
    pub transcript: PathBuf,
}

impl ArtifactPaths {
    /// Paths for `prefix` inside `dir`.
    pub fn new(dir: &Path, prefix: &str) -> Self {
        let file = |suffix: &str| dir.join(format!("{}_{}", prefix, suffix));
        Self {
            final_dataset: file("final.jsonl"),
            raw: file("raw.jsonl"),
            fixes: file("fixes.jsonl"),
            init_validation_logs: file("init_validation_logs.jsonl"),
            difficulty_validation_logs: file("difficulty_validation_logs.jsonl"),
            process_log: file("full_process_logs.json"),
            transcript: file("readable_process.txt"),
        }
    }

    /// All paths in write order.
    pub fn all(&self) -> [&Path; 7] {
        [
            self.final_dataset.as_path(),
            self.raw.as_path(),
            self.fixes.as_path(),
            self.init_validation_logs.as_path(),
            self.difficulty_validation_logs.as_path(),
            self.process_log.as_path(),
            self.transcript.as_path(),
        ]
    }
}

/// Persists [`RunOutput`]s under one directory and file prefix.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    output_dir: PathBuf,
    prefix: String,
}

impl ArtifactWriter {
    pub fn new(output_dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            prefix: prefix.into(),
        }
    }

    pub fn paths(&self) -> ArtifactPaths {
        ArtifactPaths::new(&self.output_dir, &self.prefix)
    }

    async fn ensure_directory(&self) -> Result<(), ExportError> {
        if !self.output_dir.exists() {
            fs::create_dir_all(&self.output_dir).await.map_err(|e| {
                ExportError::DirectoryCreationFailed {
                    path: self.output_dir.display().to_string(),
                    reason: e.to_string(),
                }
            })?;
        }
        Ok(())
    }

    /// Writes all seven artifacts, replacing existing files.
    pub async fn write_run(&self, output: &RunOutput) -> Result<ArtifactPaths, ExportError> {
        self.ensure_directory().await?;
        let paths = self.paths();

        write_jsonl(&paths.final_dataset, &output.accepted).await?;
        write_jsonl(&paths.raw, &output.raw).await?;
        write_jsonl(&paths.fixes, &output.fixes).await?;
        write_jsonl(&paths.init_validation_logs, &output.init_validation_logs).await?;
        write_jsonl(
            &paths.difficulty_validation_logs,
            &output.escalation_validation_logs,
        )
        .await?;

        let process_log = serde_json::to_string_pretty(&output.process_log)?;
        write_file(&paths.process_log, process_log.as_bytes()).await?;
        write_file(
            &paths.transcript,
            render_transcript(&output.process_log).as_bytes(),
        )
        .await?;

        tracing::info!(
            run_id = %output.run_id,
            output_dir = %self.output_dir.display(),
            prefix = %self.prefix,
            accepted = output.accepted.len(),
            log_entries = output.process_log.len(),
            "Wrote run artifacts"
        );
        Ok(paths)
    }
}

/// One JSON document per line.
pub async fn write_jsonl<T: Serialize>(path: &Path, items: &[T]) -> Result<(), ExportError> {
    let mut buffer = String::new();
    for item in items {
        buffer.push_str(&serde_json::to_string(item)?);
        buffer.push('\n');
    }
    write_file(path, buffer.as_bytes()).await
}

async fn write_file(path: &Path, bytes: &[u8]) -> Result<(), ExportError> {
    let mut file = fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::difficulty::DifficultyLevel;
    use crate::ledger::{AgentRole, Phase, ProcessLog, SampleScope};
    use crate::tasks::{Problem, ProblemContent, ProblemMeta, TaskId};
    use tempfile::TempDir;

    fn problem() -> Problem {
        Problem::new(
            TaskId::T1,
            0,
            ProblemContent::Context {
                context: vec!["A.".to_string(), "B.".to_string()],
                anomaly_index: 1,
            },
            ProblemMeta {
                topic: "Science".to_string(),
                style: "TOEFL".to_string(),
                anomaly_type: "none".to_string(),
                difficulty_level: DifficultyLevel::Easy,
                fix_count: 0,
                phase: None,
                student_correct: Some(false),
                student_explanation: Some("1".to_string()),
            },
        )
    }

    #[test]
    fn test_artifact_names() {
        let paths = ArtifactPaths::new(Path::new("/out"), "agentic");
        assert_eq!(paths.final_dataset, PathBuf::from("/out/agentic_final.jsonl"));
        assert_eq!(
            paths.difficulty_validation_logs,
            PathBuf::from("/out/agentic_difficulty_validation_logs.jsonl")
        );
        assert_eq!(paths.process_log, PathBuf::from("/out/agentic_full_process_logs.json"));
        assert_eq!(paths.transcript, PathBuf::from("/out/agentic_readable_process.txt"));
    }

    #[tokio::test]
    async fn test_write_run_creates_all_files() {
        let temp = TempDir::new().expect("temp dir");
        let dir = temp.path().join("nested");

        let log = ProcessLog::open();
        SampleScope::new(log.clone(), TaskId::T1, 0)
            .step(Phase::Init, AgentRole::System, "config")
            .record();

        let output = RunOutput {
            accepted: vec![problem()],
            raw: vec![problem()],
            process_log: log.close(),
            ..Default::default()
        };

        let writer = ArtifactWriter::new(&dir, "run");
        let paths = writer.write_run(&output).await.expect("write succeeds");

        for path in paths.all() {
            assert!(path.exists(), "missing {}", path.display());
        }

        let final_text = std::fs::read_to_string(&paths.final_dataset).expect("read");
        assert_eq!(final_text.lines().count(), 1);
        let record: serde_json::Value =
            serde_json::from_str(final_text.trim()).expect("valid json line");
        assert_eq!(record["sample_id"], "T1_000_v0");
        assert_eq!(record["anomaly_index"], 1);

        let fixes = std::fs::read_to_string(&paths.fixes).expect("read");
        assert!(fixes.is_empty());

        let log_json: Vec<serde_json::Value> = serde_json::from_str(
            &std::fs::read_to_string(&paths.process_log).expect("read"),
        )
        .expect("json array");
        assert_eq!(log_json.len(), 1);

        let transcript = std::fs::read_to_string(&paths.transcript).expect("read");
        assert!(transcript.contains("init - system config"));
    }
}
