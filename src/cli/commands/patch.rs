use std::path::Path;

use crate::adapters::files::local_config_files::LocalConfigFiles;
use crate::cli::output;
use crate::core::errors::{HostwardError, Result};
use crate::core::models::directive::{ConfigDirective, PatchOutcome};
use crate::core::models::journal_entry::{StepKind, StepOutcome};
use crate::core::services::config_patcher::ConfigPatcher;

use super::journal_helpers;

/// Execute the `hostward patch` command: make `file` carry exactly one
/// active `key<separator>value` line.
pub fn execute(file: &Path, key: &str, value: &str, separator: &str, dry_run: bool) -> Result<()> {
    if !file.is_absolute() {
        return Err(HostwardError::InvalidPlan {
            detail: format!("file must be an absolute path, got {}", file.display()),
        });
    }

    let directive = ConfigDirective::with_separator(file, key, value, separator)?;
    let patcher = ConfigPatcher::new(LocalConfigFiles::new());
    let line = directive.canonical_line();

    if dry_run {
        match patcher.preview(&directive)? {
            PatchOutcome::Changed => {
                output::warning(&format!("{} would be set to `{line}`", file.display()))
            }
            PatchOutcome::Unchanged => {
                output::success(&format!("{} already has `{line}`", file.display()))
            }
        }
        return Ok(());
    }

    let outcome = patcher.apply_directive(&directive)?;
    match outcome {
        PatchOutcome::Changed => output::success(&format!("Set `{line}` in {}", file.display())),
        PatchOutcome::Unchanged => {
            output::success(&format!("{} already has `{line}`", file.display()))
        }
    }

    journal_helpers::record_step(
        format!("patch {key}"),
        StepKind::Directive,
        file.display().to_string(),
        match outcome {
            PatchOutcome::Changed => StepOutcome::Changed,
            PatchOutcome::Unchanged => StepOutcome::Unchanged,
        },
        Some(line),
        Some(file),
    );

    Ok(())
}
