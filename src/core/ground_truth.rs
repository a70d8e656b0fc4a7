//! Ground-truth index: curated command -> logical form overrides.
//!
//! Datasets are plain text, one record per line:
//!
//! ```text
//! "destroy this"|{"dialogue_type": "HUMAN_GIVE_COMMAND", ...}
//! ```
//!
//! The index is built once at startup and never mutated. Lookup is exact
//! string equality on the raw command text; no normalization, no fuzzy
//! matching. A malformed line is a load-time failure, not a runtime one.

use rustc_hash::FxHashMap;
use std::path::Path;
use tracing::info;

use crate::core::error::ParleyError;
use crate::core::logical_form::LogicalForm;

pub const DATASETS_SUBDIR: &str = "datasets";

#[derive(Debug, Default)]
pub struct GroundTruthIndex {
    entries: FxHashMap<String, LogicalForm>,
}

impl GroundTruthIndex {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Loads every `datasets/*.txt` file under `data_dir`. A missing
    /// datasets directory yields an empty index; a malformed line anywhere
    /// is fatal.
    pub fn load_dir(data_dir: &Path) -> Result<Self, ParleyError> {
        let mut index = Self::empty();
        let datasets = data_dir.join(DATASETS_SUBDIR);
        if !datasets.is_dir() {
            return Ok(index);
        }

        let mut paths: Vec<_> = std::fs::read_dir(&datasets)?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|entry| entry.path())
            .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("txt"))
            .collect();
        paths.sort();

        for path in paths {
            index.load_file(&path)?;
        }
        info!(entries = index.len(), "ground truth index loaded");
        Ok(index)
    }

    pub fn load_file(&mut self, path: &Path) -> Result<(), ParleyError> {
        let content = std::fs::read_to_string(path)?;
        for (lineno, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (text, form) = parse_line(line).map_err(|reason| {
                ParleyError::GroundTruthError(format!(
                    "{}:{}: {}",
                    path.display(),
                    lineno + 1,
                    reason
                ))
            })?;
            self.entries.insert(text, form);
        }
        Ok(())
    }

    pub fn lookup(&self, command_text: &str) -> Option<&LogicalForm> {
        self.entries.get(command_text)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&String, &LogicalForm)> {
        self.entries.iter()
    }
}

fn parse_line(line: &str) -> Result<(String, LogicalForm), String> {
    let (raw_text, raw_form) = line
        .split_once('|')
        .ok_or_else(|| "missing '|' delimiter".to_string())?;
    let text = raw_text.trim().trim_matches('"').to_string();
    if text.is_empty() {
        return Err("empty command text".to_string());
    }
    let form = LogicalForm::from_json_str(raw_form.trim())
        .map_err(|e| format!("bad logical form: {}", e))?;
    Ok((text, form))
}
