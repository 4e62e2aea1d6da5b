use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::core::errors::{HostwardError, Result};
use crate::core::models::journal_entry::JournalEntry;
use crate::core::traits::journal::RunJournal;

/// File name of the journal inside the state directory.
pub const JOURNAL_FILE: &str = "journal.log";

/// Journal that appends entries as JSON lines to a file.
///
/// Each line is a self-contained JSON object representing one
/// `JournalEntry`, so appends are cheap and reads can stream.
pub struct JsonJournal {
    log_path: PathBuf,
}

impl JsonJournal {
    /// Journal stored at `{state_dir}/journal.log`.
    pub fn new(state_dir: &Path) -> Self {
        Self {
            log_path: state_dir.join(JOURNAL_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.log_path
    }
}

impl RunJournal for JsonJournal {
    fn record(&self, entry: &JournalEntry) -> Result<()> {
        let line = serde_json::to_string(entry).map_err(|e| HostwardError::JournalError {
            detail: format!("Failed to serialize journal entry: {e}"),
        })?;

        if let Some(parent) = self.log_path.parent()
            && !parent.exists()
        {
            fs::create_dir_all(parent).map_err(|e| HostwardError::JournalError {
                detail: format!("Cannot create {}: {e}", parent.display()),
            })?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .map_err(|e| HostwardError::JournalError {
                detail: format!("Cannot open journal at {}: {e}", self.log_path.display()),
            })?;

        writeln!(file, "{line}").map_err(|e| HostwardError::JournalError {
            detail: format!("Failed to write journal entry: {e}"),
        })?;

        Ok(())
    }

    fn query(&self, since: Option<DateTime<Utc>>) -> Result<Vec<JournalEntry>> {
        if !self.log_path.exists() {
            return Ok(Vec::new());
        }

        let file = fs::File::open(&self.log_path).map_err(|e| HostwardError::JournalError {
            detail: format!("Cannot read journal: {e}"),
        })?;

        let reader = BufReader::new(file);
        let mut entries = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| HostwardError::JournalError {
                detail: format!("Error reading journal line {}: {e}", line_num + 1),
            })?;

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let entry: JournalEntry =
                serde_json::from_str(trimmed).map_err(|e| HostwardError::JournalError {
                    detail: format!("Malformed journal entry at line {}: {e}", line_num + 1),
                })?;

            if let Some(since_date) = since
                && entry.timestamp < since_date
            {
                continue;
            }

            entries.push(entry);
        }

        Ok(entries)
    }
}
