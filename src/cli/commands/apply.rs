use std::time::Duration;

use colored::Colorize;
use indicatif::ProgressBar;

use crate::adapters::files::local_config_files::LocalConfigFiles;
use crate::adapters::key_sources::github_key_source::GitHubKeySource;
use crate::adapters::key_stores::authorized_keys_file::AuthorizedKeysFile;
use crate::adapters::system::accounts::SystemAccounts;
use crate::adapters::system::command_runner::SystemRunner;
use crate::cli::{context, output};
use crate::config::plan::{HostPlan, PlanStep};
use crate::core::errors::Result;
use crate::core::models::journal_entry::StepOutcome;
use crate::core::services::orchestrator::{Orchestrator, RunSummary, StepEvent, StepReport};
use crate::core::traits::key_store::KeyStore;

use super::journal_helpers;

/// Execute the `hostward apply` command.
///
/// Runs every step of the plan in order. The first failing step stops the
/// run and its error decides the exit code.
pub fn execute(dry_run: bool) -> Result<()> {
    let path = context::resolve_plan()?;
    let plan = HostPlan::load(&path)?;

    let endpoint = context::key_endpoint_override().unwrap_or(&plan.hostward.key_endpoint);
    let source = GitHubKeySource::new(
        endpoint,
        Duration::from_secs(plan.hostward.fetch_timeout_secs),
    );

    let mut orchestrator = Orchestrator::new(
        SystemRunner,
        LocalConfigFiles::new(),
        source,
        SystemAccounts,
        Box::new(|store| Box::new(AuthorizedKeysFile::new(store)) as Box<dyn KeyStore>),
    )
    .dry_run(dry_run);
    if !dry_run {
        orchestrator = orchestrator.with_journal(Box::new(journal_helpers::open_journal()));
    }

    if dry_run {
        output::header(&format!("hostward apply --dry-run ({})", path.display()));
    } else {
        output::header(&format!("hostward apply ({})", path.display()));
    }

    let mut fetching: Option<ProgressBar> = None;
    let result = orchestrator.run(&plan, |event| match event {
        StepEvent::Started { index, total, step } => {
            let line = format!("[{}/{}] {}", index + 1, total, step.describe());
            if let PlanStep::AuthorizedKeys(k) = step {
                fetching = Some(output::spinner(&format!(
                    "{line}: fetching keys of {}...",
                    k.identity
                )));
            } else if !output::is_quiet() {
                println!("  {}", line.dimmed());
            }
        }
        StepEvent::Finished(report) => {
            if let Some(pb) = fetching.take() {
                output::abandon_spinner(pb);
            }
            print_report(report, dry_run);
        }
    });
    if let Some(pb) = fetching.take() {
        output::abandon_spinner(pb);
    }

    let summary = result?;
    print_summary(&summary, dry_run);
    Ok(())
}

fn print_report(report: &StepReport, dry_run: bool) {
    let label = match (report.outcome, dry_run) {
        (StepOutcome::Changed, true) => "would change".to_string(),
        (StepOutcome::Unchanged, _) => "ok".to_string(),
        (StepOutcome::Planned, _) => "would run".to_string(),
        (outcome, _) => outcome.to_string(),
    };
    let label = format!("{label:<12}");
    let label = match report.outcome {
        StepOutcome::Changed => label.yellow(),
        StepOutcome::Unchanged => label.green(),
        StepOutcome::Ran | StepOutcome::Planned => label.cyan(),
        StepOutcome::Failed => label.red(),
    };
    let detail = report.detail.as_deref().unwrap_or("");
    output::info(&format!(
        "{label} {} {}",
        report.description,
        detail.dimmed()
    ));
}

fn print_summary(summary: &RunSummary, dry_run: bool) {
    output::info("");
    if dry_run {
        output::success(&format!(
            "Dry run: {} to change, {} already in place, {} command(s) to run",
            summary.changed, summary.unchanged, summary.planned
        ));
    } else {
        output::success(&format!(
            "Done: {} changed, {} unchanged, {} command(s) run",
            summary.changed, summary.unchanged, summary.ran
        ));
    }
}
