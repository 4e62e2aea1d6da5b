use chrono::{NaiveDate, TimeZone, Utc};
use colored::Colorize;

use crate::cli::output;
use crate::core::errors::{HostwardError, Result};
use crate::core::models::journal_entry::{JournalEntry, StepOutcome};
use crate::core::traits::journal::RunJournal;

use super::journal_helpers;

/// Execute the `hostward log` command.
///
/// Displays the run journal with optional date and count filters.
pub fn execute(since: Option<&str>, last: Option<usize>) -> Result<()> {
    let journal = journal_helpers::open_journal();

    let since_dt = since.map(parse_since).transpose()?;
    let entries = journal.query(since_dt)?;

    if entries.is_empty() {
        output::header("hostward log");
        output::warning("No journal entries found");
        output::info(&format!("Journal: {}", journal.path().display()));
        if since.is_some() {
            output::info("Try removing --since to see all entries.");
        }
        return Ok(());
    }

    // --last N takes from the end
    let skip = last.map_or(0, |n| entries.len().saturating_sub(n));
    let display = &entries[skip..];

    output::header(&format!("hostward log ({} entries)", display.len()));
    output::info("");

    for entry in display {
        print_entry(entry);
    }

    Ok(())
}

/// Parse a date string (ISO 8601: `YYYY-MM-DD`) into a UTC DateTime.
fn parse_since(s: &str) -> Result<chrono::DateTime<Utc>> {
    let invalid = || HostwardError::InvalidPlan {
        detail: format!(
            "Invalid date format: '{s}'. Expected ISO 8601 (YYYY-MM-DD), e.g. 2026-01-15"
        ),
    };
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| invalid())?;
    let midnight = date.and_hms_opt(0, 0, 0).ok_or_else(invalid)?;
    Ok(Utc.from_utc_datetime(&midnight))
}

/// Print a single journal entry as a formatted row.
fn print_entry(entry: &JournalEntry) {
    let date = entry.timestamp.format("%Y-%m-%d %H:%M:%S");
    let outcome = format_outcome(entry.outcome);
    let detail = entry.detail.as_deref().unwrap_or("").dimmed().to_string();

    output::info(&format!(
        "{} {} {} {} {} {}",
        date.to_string().dimmed(),
        "│".dimmed(),
        outcome,
        entry.step,
        entry.target.dimmed(),
        detail,
    ));
}

/// Format an outcome as a colored, fixed-width string.
fn format_outcome(outcome: StepOutcome) -> String {
    let label = format!("{:<9}", outcome.to_string());
    match outcome {
        StepOutcome::Changed => label.yellow().to_string(),
        StepOutcome::Unchanged => label.green().to_string(),
        StepOutcome::Ran | StepOutcome::Planned => label.cyan().to_string(),
        StepOutcome::Failed => label.red().to_string(),
    }
}
