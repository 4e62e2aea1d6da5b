use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Kinds of steps recorded in the run journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Command,
    Directive,
    AuthorizedKeys,
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StepKind::Command => "command",
            StepKind::Directive => "directive",
            StepKind::AuthorizedKeys => "authorized_keys",
        };
        write!(f, "{s}")
    }
}

/// Outcome of a step as recorded in the journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    Changed,
    Unchanged,
    Ran,
    /// Dry run: the step would have executed.
    Planned,
    Failed,
}

impl std::fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StepOutcome::Changed => "changed",
            StepOutcome::Unchanged => "unchanged",
            StepOutcome::Ran => "ran",
            StepOutcome::Planned => "planned",
            StepOutcome::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// A single entry in the run journal (JSON lines format).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub step: String,
    pub kind: StepKind,
    /// File path, argv, or `identity -> path` depending on the kind.
    pub target: String,
    pub outcome: StepOutcome,
    pub detail: Option<String>,
    /// SHA-256 of the target file after the step, when there is one.
    pub state_hash: Option<String>,
}

/// Hex SHA-256 of a file's current contents, `None` if unreadable.
pub fn file_state_hash(path: &Path) -> Option<String> {
    let bytes = std::fs::read(path).ok()?;
    let digest = Sha256::digest(&bytes);
    Some(digest.iter().map(|b| format!("{b:02x}")).collect())
}
