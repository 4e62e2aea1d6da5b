use crate::cli::{context, output};
use crate::config::plan::{HostPlan, default_plan};
use crate::core::errors::{HostwardError, ProvisionError, Result};
use crate::core::models::account::validate_account_name;
use crate::core::models::key_record::is_valid_identity;

/// Execute the `hostward init` command.
///
/// Writes the default hardening plan for `user`, with keys pulled from the
/// GitHub account `github`. Refuses to overwrite an existing plan unless
/// `force` is set.
pub fn execute(user: &str, github: &str, force: bool, verbose: bool) -> Result<()> {
    validate_account_name(user)?;
    if !is_valid_identity(github) {
        return Err(ProvisionError::InvalidIdentity {
            identity: github.to_string(),
        }
        .into());
    }

    let target = context::plan_target();
    if target.exists() && !force {
        return Err(HostwardError::InvalidPlan {
            detail: format!(
                "{} already exists\n\n  \
                 Edit it directly, or pass --force to replace it with the defaults.",
                target.display()
            ),
        });
    }

    output::header("hostward — Writing plan");

    let content = default_plan(user, github);
    let plan = HostPlan::parse(&content)?;

    if let Some(parent) = target.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&target, content)?;
    output::success(&format!(
        "Wrote {} ({} steps)",
        target.display(),
        plan.steps.len()
    ));

    print_next_steps(verbose);
    Ok(())
}

fn print_next_steps(verbose: bool) {
    output::info("");
    output::info("Next steps:");
    output::info("   1. Review the plan and adjust it to this host");
    output::info("   2. Run 'hostward apply --dry-run' to preview");
    output::info("   3. Run 'sudo hostward apply'");

    if verbose {
        output::info("");
        output::info("The reboot step at the end is commented out; uncomment it");
        output::info("once the plan has been tested on this host.");
    }
}
