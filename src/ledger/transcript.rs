//! Human-readable rendering of the process log.

use serde_json::Value;

use super::log::LogEntry;

fn block(label: &str, value: &Value) -> String {
    let body = match value {
        Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    };
    let dashes = "-".repeat(80);
    format!("{}:\n{}\n{}\n{}\n\n", label, dashes, body, dashes)
}

/// Renders one entry, including its trailing separator.
pub fn render_entry(entry: &LogEntry) -> String {
    let mut text = format!(
        "[{}] {} - {} {}\n",
        entry.timestamp.to_rfc3339(),
        entry.phase,
        entry.agent,
        entry.action
    );
    let metadata = serde_json::to_string(&entry.metadata).unwrap_or_else(|_| "{}".to_string());
    text.push_str(&format!(
        "Task: {} | Sample: {} | Metadata: {}\n",
        entry.task_id, entry.sample_index, metadata
    ));
    if let Some(input) = &entry.input {
        if !input.is_null() {
            text.push_str(&block("INPUT", input));
        }
    }
    if let Some(output) = &entry.output {
        if !output.is_null() {
            text.push_str(&block("OUTPUT", output));
        }
    }
    text.push('\n');
    text.push_str(&"=".repeat(100));
    text.push_str("\n\n");
    text
}

/// Renders all entries in timestamp order. Ties keep insertion order.
pub fn render_transcript(entries: &[LogEntry]) -> String {
    let mut ordered: Vec<&LogEntry> = entries.iter().collect();
    ordered.sort_by_key(|entry| entry.timestamp);
    ordered.into_iter().map(render_entry).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{AgentRole, Phase};
    use crate::tasks::TaskId;
    use chrono::{TimeZone, Utc};
    use serde_json::{json, Map};

    fn entry(secs: i64, action: &str, input: Option<Value>, output: Option<Value>) -> LogEntry {
        let mut metadata = Map::new();
        metadata.insert("attempt".to_string(), json!(1));
        LogEntry {
            timestamp: Utc.timestamp_opt(1_700_000_000 + secs, 0).single().expect("valid"),
            task_id: TaskId::T1,
            sample_index: 0,
            phase: Phase::Init,
            agent: AgentRole::Teacher,
            action: action.to_string(),
            input,
            output,
            metadata,
        }
    }

    #[test]
    fn test_entry_layout() {
        let text = render_entry(&entry(
            0,
            "prompt",
            Some(json!("Draft a problem")),
            Some(json!({"approved": true})),
        ));
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with('['));
        assert!(lines[0].ends_with("] init - teacher prompt"));
        assert_eq!(lines[1], "Task: T1 | Sample: 0 | Metadata: {\"attempt\":1}");
        assert_eq!(lines[2], "INPUT:");
        assert_eq!(lines[3], "-".repeat(80));
        assert_eq!(lines[4], "Draft a problem");
        assert!(text.contains("OUTPUT:\n"));
        assert!(text.contains("\"approved\": true"));
        assert!(text.ends_with(&format!("\n{}\n\n", "=".repeat(100))));
    }

    #[test]
    fn test_missing_payloads_are_omitted() {
        let text = render_entry(&entry(0, "config", None, None));
        assert!(!text.contains("INPUT:"));
        assert!(!text.contains("OUTPUT:"));
    }

    #[test]
    fn test_transcript_sorted_by_timestamp_stably() {
        let entries = vec![
            entry(5, "late", None, None),
            entry(1, "first", None, None),
            entry(1, "second", None, None),
        ];
        let text = render_transcript(&entries);
        let first = text.find("teacher first").expect("present");
        let second = text.find("teacher second").expect("present");
        let late = text.find("teacher late").expect("present");
        assert!(first < second && second < late);
    }
}
