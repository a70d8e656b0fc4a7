//! Runtime configuration: safety blacklist and scripted greetings.
//!
//! Both files are optional. A missing `safety.txt` means no filtering; a
//! missing `greetings.json` falls back to the stock greeting table.

use std::collections::BTreeMap;
use std::path::Path;

use crate::core::error::ParleyError;

pub const SAFETY_FILE: &str = "safety.txt";
pub const GREETINGS_FILE: &str = "greetings.json";

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Blacklisted phrases; a chat containing any of them is filtered out.
    safety_words: Vec<String>,
    /// Greeting category -> trigger phrases.
    greetings: BTreeMap<String, Vec<String>>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            safety_words: Vec::new(),
            greetings: default_greetings(),
        }
    }
}

fn default_greetings() -> BTreeMap<String, Vec<String>> {
    let mut greetings = BTreeMap::new();
    greetings.insert(
        "hello".to_string(),
        vec!["hi".to_string(), "hello".to_string(), "hey".to_string()],
    );
    greetings.insert("goodbye".to_string(), vec!["bye".to_string()]);
    greetings
}

impl RuntimeConfig {
    /// Loads configuration from a data directory. Absent files fall back to
    /// defaults; present-but-unreadable files are configuration errors.
    pub fn load(data_dir: &Path) -> Result<Self, ParleyError> {
        let mut config = Self::default();

        let safety_path = data_dir.join(SAFETY_FILE);
        if safety_path.is_file() {
            let content = std::fs::read_to_string(&safety_path)?;
            config.safety_words = content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(|line| line.to_lowercase())
                .collect();
        }

        let greetings_path = data_dir.join(GREETINGS_FILE);
        if greetings_path.is_file() {
            let content = std::fs::read_to_string(&greetings_path)?;
            config.greetings = serde_json::from_str(&content).map_err(|e| {
                ParleyError::ConfigError(format!("{}: {}", greetings_path.display(), e))
            })?;
        }

        Ok(config)
    }

    /// True when the (preprocessed) chat contains none of the blacklisted
    /// phrases as whole words.
    pub fn is_safe(&self, sentence: &str) -> bool {
        if self.safety_words.is_empty() {
            return true;
        }
        let padded = format!(" {} ", sentence);
        !self
            .safety_words
            .iter()
            .any(|phrase| padded.contains(&format!(" {} ", phrase)))
    }

    /// Matches a preprocessed sentence against the greeting table. A sentence
    /// matches a category when it equals a trigger phrase or opens with the
    /// phrase followed by more words ("hi bot" matches "hello" via "hi").
    pub fn greeting_match(&self, sentence: &str) -> Option<&str> {
        for (category, phrases) in &self.greetings {
            for phrase in phrases {
                if sentence == phrase
                    || (sentence.starts_with(phrase)
                        && sentence[phrase.len()..].starts_with(' '))
                {
                    return Some(category);
                }
            }
        }
        None
    }

    pub fn safety_words(&self) -> &[String] {
        &self.safety_words
    }

    pub fn greetings(&self) -> &BTreeMap<String, Vec<String>> {
        &self.greetings
    }
}
