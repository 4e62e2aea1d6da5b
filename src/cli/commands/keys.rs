use std::path::Path;
use std::time::Duration;

use crate::adapters::key_sources::github_key_source::GitHubKeySource;
use crate::adapters::key_stores::authorized_keys_file::AuthorizedKeysFile;
use crate::adapters::system::accounts::SystemAccounts;
use crate::cli::{context, output};
use crate::config::plan::DEFAULT_KEY_ENDPOINT;
use crate::core::errors::{HostwardError, Result};
use crate::core::models::authorized_key_store::AuthorizedKeyStore;
use crate::core::models::journal_entry::{StepKind, StepOutcome};
use crate::core::services::key_provisioner::KeyProvisioner;
use crate::core::traits::account_directory::AccountDirectory;
use crate::core::traits::key_store::KeyStore;

use super::journal_helpers;

/// Execute the `hostward keys` command.
///
/// Replaces the account's authorized_keys with the keys `identity`
/// publishes. Nothing is written when the fetch fails or returns no keys.
pub fn execute(
    identity: &str,
    account: &str,
    path: Option<&Path>,
    timeout: u64,
    dry_run: bool,
) -> Result<()> {
    if timeout == 0 {
        return Err(HostwardError::InvalidPlan {
            detail: "--timeout must be greater than zero".into(),
        });
    }
    if let Some(p) = path
        && !p.is_absolute()
    {
        return Err(HostwardError::InvalidPlan {
            detail: format!("--path must be absolute, got {}", p.display()),
        });
    }

    let owner = SystemAccounts.lookup(account)?;
    let store = AuthorizedKeysFile::new(AuthorizedKeyStore::for_account(
        owner,
        path.map(Path::to_path_buf),
    ));

    let endpoint = context::key_endpoint_override().unwrap_or(DEFAULT_KEY_ENDPOINT);
    let provisioner =
        KeyProvisioner::new(GitHubKeySource::new(endpoint, Duration::from_secs(timeout)));

    output::header(&format!("hostward — Authorized keys for {account}"));

    let sp = output::spinner(&format!("Fetching keys of {identity}..."));
    let result = if dry_run {
        provisioner.preview(identity, &store)
    } else {
        provisioner.provision(identity, &store)
    };
    let report = match result {
        Ok(report) => report,
        Err(e) => {
            output::abandon_spinner(sp);
            return Err(e.into());
        }
    };

    let location = store.location().display().to_string();
    if dry_run {
        output::finish_spinner(
            sp,
            &format!(
                "{} key(s) would be installed into {location} (+{} -{})",
                report.installed, report.added, report.removed
            ),
        );
        return Ok(());
    }

    if report.is_change() {
        output::finish_spinner(
            sp,
            &format!(
                "Installed {} key(s) into {location} (+{} -{})",
                report.installed, report.added, report.removed
            ),
        );
    } else {
        output::finish_spinner(
            sp,
            &format!("{location} already holds the {} published key(s)", report.installed),
        );
    }

    journal_helpers::record_step(
        format!("install keys of {identity} for {account}"),
        StepKind::AuthorizedKeys,
        format!("{identity} -> {account}"),
        if report.is_change() {
            StepOutcome::Changed
        } else {
            StepOutcome::Unchanged
        },
        Some(format!(
            "{} key(s), +{} -{}",
            report.installed, report.added, report.removed
        )),
        Some(store.location()),
    );

    Ok(())
}
