use colored::Colorize;

use crate::cli::{context, output};
use crate::config::plan::HostPlan;
use crate::core::errors::Result;

/// Execute the `hostward plan` command: validate and list the steps.
pub fn execute() -> Result<()> {
    let path = context::resolve_plan()?;
    let plan = HostPlan::load(&path)?;

    output::header(&format!("hostward plan ({} steps)", plan.steps.len()));
    output::info(&format!("{} {}", "File:".dimmed(), path.display()));
    let endpoint = context::key_endpoint_override().unwrap_or(&plan.hostward.key_endpoint);
    output::info(&format!("{} {}", "Keys from:".dimmed(), endpoint));
    output::info("");

    for (index, step) in plan.steps.iter().enumerate() {
        let kind = format!("{:<16}", step.kind().to_string());
        output::info(&format!(
            "{:>3}. {} {}  {}",
            index + 1,
            kind.cyan(),
            step.describe(),
            step.target().dimmed()
        ));
    }

    output::info("");
    output::success("Plan is valid");
    Ok(())
}
