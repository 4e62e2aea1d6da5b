use std::path::Path;

use chrono::Utc;

use crate::adapters::journal::json_journal::JsonJournal;
use crate::cli::{context, output};
use crate::core::models::journal_entry::{JournalEntry, StepKind, StepOutcome, file_state_hash};
use crate::core::traits::journal::RunJournal;

/// The journal under the configured state directory.
pub fn open_journal() -> JsonJournal {
    JsonJournal::new(context::state_dir())
}

/// Record a one-off step run from the command line. Warns on failure
/// instead of propagating the error, since the journal should not undo
/// a change that already happened.
pub fn record_step(
    step: String,
    kind: StepKind,
    target: String,
    outcome: StepOutcome,
    detail: Option<String>,
    state_path: Option<&Path>,
) {
    let entry = JournalEntry {
        timestamp: Utc::now(),
        step,
        kind,
        target,
        outcome,
        detail,
        state_hash: state_path.and_then(file_state_hash),
    };

    if let Err(e) = open_journal().record(&entry) {
        output::warning(&format!("Could not write journal: {e}"));
    }
}
