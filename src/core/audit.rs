//! Append-only audit log of resolution attempts.
//!
//! Format matches the offline-analysis tooling: pipe-delimited rows, header
//! `command|action_dict|source|agent|time` written once at initialization,
//! then one data row per resolution attempt with the logical form serialized
//! as a single JSON field. Rows are never mutated or deleted here.

use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::core::error::ParleyError;
use crate::core::logical_form::LogicalForm;

pub const AUDIT_HEADERS: [&str; 5] = ["command", "action_dict", "source", "agent", "time"];

/// Where a resolution came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseSource {
    GroundTruth,
    Model,
}

impl ParseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseSource::GroundTruth => "ground_truth",
            ParseSource::Model => "model",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuditRecord {
    pub command: String,
    pub logical_form: LogicalForm,
    pub source: ParseSource,
    pub agent_id: String,
    /// Unix-epoch seconds.
    pub timestamp: u64,
}

/// Append-only writer over one log destination. Appends are serialized by an
/// internal lock so agent instances sharing a destination never interleave
/// records.
pub struct AuditLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl AuditLog {
    /// Creates (or truncates) the log and writes the header row.
    pub fn create(path: &Path) -> Result<Self, ParleyError> {
        let file = std::fs::File::create(path)?;
        let mut writer = csv::WriterBuilder::new().delimiter(b'|').from_writer(file);
        writer
            .write_record(AUDIT_HEADERS)
            .map_err(csv_io_error)?;
        writer.flush()?;
        Ok(Self {
            path: path.to_path_buf(),
            lock: Mutex::new(()),
        })
    }

    /// Appends one record. Exactly one physical row per call.
    pub fn append(&self, record: &AuditRecord) -> Result<(), ParleyError> {
        let _guard = self.lock.lock().unwrap_or_else(|poison| poison.into_inner());
        let file = OpenOptions::new().append(true).open(&self.path)?;
        let mut writer = csv::WriterBuilder::new().delimiter(b'|').from_writer(file);
        let form_field = record.logical_form.to_json_string();
        let time_field = record.timestamp.to_string();
        writer
            .write_record([
                record.command.as_str(),
                form_field.as_str(),
                record.source.as_str(),
                record.agent_id.as_str(),
                time_field.as_str(),
            ])
            .map_err(csv_io_error)?;
        writer.flush()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn csv_io_error(err: csv::Error) -> ParleyError {
    ParleyError::IoError(std::io::Error::other(err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::time;
    use serde_json::json;
    use tempfile::tempdir;

    fn record(command: &str, source: ParseSource) -> AuditRecord {
        AuditRecord {
            command: command.to_string(),
            logical_form: LogicalForm::noop(),
            source,
            agent_id: "test_agent".to_string(),
            timestamp: time::now_epoch_secs(),
        }
    }

    #[test]
    fn test_header_written_once() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("nsp_outputs.csv");
        let log = AuditLog::create(&path).unwrap();
        log.append(&record("destroy this", ParseSource::Model)).unwrap();
        log.append(&record("come here", ParseSource::GroundTruth))
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "command|action_dict|source|agent|time");
        assert!(lines[1].starts_with("destroy this|"));
        assert!(lines[1].contains("|model|test_agent|"));
        assert!(lines[2].contains("|ground_truth|"));
    }

    #[test]
    fn test_form_is_one_quoted_field() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("nsp_outputs.csv");
        let log = AuditLog::create(&path).unwrap();

        let form = LogicalForm::from_value(json!({
            "dialogue_type": "HUMAN_GIVE_COMMAND",
            "action_sequence": [{"action_type": "BUILD", "note": "a|b"}]
        }))
        .unwrap();
        log.append(&AuditRecord {
            command: "build".to_string(),
            logical_form: form.clone(),
            source: ParseSource::Model,
            agent_id: "test_agent".to_string(),
            timestamp: 1_700_000_000,
        })
        .unwrap();

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'|')
            .from_path(&path)
            .unwrap();
        let row = reader.records().next().unwrap().unwrap();
        assert_eq!(row.len(), 5);
        assert_eq!(&row[0], "build");
        let parsed = LogicalForm::from_json_str(&row[1]).unwrap();
        assert_eq!(parsed, form);
        assert_eq!(&row[4], "1700000000");
    }

    #[test]
    fn test_create_truncates_previous_log() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("nsp_outputs.csv");
        {
            let log = AuditLog::create(&path).unwrap();
            log.append(&record("old", ParseSource::Model)).unwrap();
        }
        let _log = AuditLog::create(&path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
    }
}
