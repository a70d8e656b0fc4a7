//! Shared timestamp/identity helpers for audit and memory records.

use sha2::{Digest, Sha256};
use ulid::Ulid;

/// Returns unix-epoch seconds (UTC).
pub fn now_epoch_secs() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

pub fn new_event_id() -> String {
    Ulid::new().to_string()
}

/// Stable, non-reversible token for a speaker identity. Log lines carry this
/// instead of the raw speaker name.
pub fn hash_speaker(speaker: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(speaker.as_bytes());
    let digest = hasher.finalize();
    // 16 hex chars is plenty for log correlation.
    format!("{:x}", digest)[..16].to_string()
}
