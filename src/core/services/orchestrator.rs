use std::path::PathBuf;

use crate::config::plan::{CommandStep, DirectiveStep, HostPlan, KeysStep, PlanStep};
use crate::core::errors::{HostwardError, Result};
use crate::core::models::authorized_key_store::AuthorizedKeyStore;
use crate::core::models::directive::PatchOutcome;
use crate::core::models::journal_entry::{JournalEntry, StepOutcome, file_state_hash};
use crate::core::services::config_patcher::ConfigPatcher;
use crate::core::services::key_provisioner::KeyProvisioner;
use crate::core::traits::account_directory::AccountDirectory;
use crate::core::traits::command_runner::CommandRunner;
use crate::core::traits::config_files::ConfigFiles;
use crate::core::traits::journal::RunJournal;
use crate::core::traits::key_source::KeySource;
use crate::core::traits::key_store::KeyStore;

/// Builds the key store for a resolved account.
pub type StoreOpener = Box<dyn Fn(AuthorizedKeyStore) -> Box<dyn KeyStore>>;

/// What one step did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub description: String,
    pub outcome: StepOutcome,
    pub detail: Option<String>,
    /// File whose resulting state is hashed into the journal.
    pub state_path: Option<PathBuf>,
}

/// Progress notifications emitted while a plan runs.
#[derive(Debug)]
pub enum StepEvent<'a> {
    Started {
        index: usize,
        total: usize,
        step: &'a PlanStep,
    },
    Finished(&'a StepReport),
}

/// Per-outcome counts for a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub changed: usize,
    pub unchanged: usize,
    pub ran: usize,
    pub planned: usize,
}

impl RunSummary {
    fn count(&mut self, outcome: StepOutcome) {
        match outcome {
            StepOutcome::Changed => self.changed += 1,
            StepOutcome::Unchanged => self.unchanged += 1,
            StepOutcome::Ran => self.ran += 1,
            StepOutcome::Planned => self.planned += 1,
            StepOutcome::Failed => {}
        }
    }
}

/// Runs a plan's steps in order and stops at the first failure.
///
/// Commands go through the [`CommandRunner`], directives through the
/// [`ConfigPatcher`], key steps through the [`KeyProvisioner`]. The two
/// services never see each other.
pub struct Orchestrator<R, F, S, A>
where
    R: CommandRunner,
    F: ConfigFiles,
    S: KeySource,
    A: AccountDirectory,
{
    runner: R,
    patcher: ConfigPatcher<F>,
    provisioner: KeyProvisioner<S>,
    accounts: A,
    open_store: StoreOpener,
    journal: Option<Box<dyn RunJournal>>,
    dry_run: bool,
}

impl<R, F, S, A> Orchestrator<R, F, S, A>
where
    R: CommandRunner,
    F: ConfigFiles,
    S: KeySource,
    A: AccountDirectory,
{
    pub fn new(runner: R, files: F, source: S, accounts: A, open_store: StoreOpener) -> Self {
        Self {
            runner,
            patcher: ConfigPatcher::new(files),
            provisioner: KeyProvisioner::new(source),
            accounts,
            open_store,
            journal: None,
            dry_run: false,
        }
    }

    /// Record every executed step in `journal`.
    pub fn with_journal(mut self, journal: Box<dyn RunJournal>) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Report what each step would do without writing or executing anything.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Run every step of `plan`, calling `observe` before and after each.
    pub fn run(&self, plan: &HostPlan, mut observe: impl FnMut(StepEvent<'_>)) -> Result<RunSummary> {
        let total = plan.steps.len();
        let mut summary = RunSummary::default();

        for (index, step) in plan.steps.iter().enumerate() {
            observe(StepEvent::Started { index, total, step });

            let report = match self.run_step(index, step) {
                Ok(report) => report,
                Err(e) => {
                    let reason = e.to_string();
                    let first = reason.lines().next().unwrap_or_default().to_string();
                    self.record(step, StepOutcome::Failed, Some(first), None);
                    return Err(e);
                }
            };

            self.record(
                step,
                report.outcome,
                report.detail.clone(),
                report.state_path.as_deref().and_then(file_state_hash),
            );
            summary.count(report.outcome);
            observe(StepEvent::Finished(&report));
        }

        Ok(summary)
    }

    fn run_step(&self, index: usize, step: &PlanStep) -> Result<StepReport> {
        let description = step.describe();
        log::debug!("step {}: {description}", index + 1);

        let (outcome, detail, state_path) = match step {
            PlanStep::Command(c) => self.run_command(&description, c)?,
            PlanStep::Directive(d) => self.run_directive(d)?,
            PlanStep::AuthorizedKeys(k) => self.run_keys(k)?,
        };

        Ok(StepReport {
            description,
            outcome,
            detail,
            state_path,
        })
    }

    fn run_command(
        &self,
        description: &str,
        step: &CommandStep,
    ) -> Result<(StepOutcome, Option<String>, Option<PathBuf>)> {
        let command = step.argv.join(" ");
        if self.dry_run {
            return Ok((StepOutcome::Planned, Some(format!("would run: {command}")), None));
        }

        let failed = |status: String| HostwardError::CommandFailed {
            step: description.to_string(),
            command: command.clone(),
            status,
        };

        let status = self
            .runner
            .run(&step.argv)
            .map_err(|e| failed(format!("could not be started: {e}")))?;

        if !status.success() {
            return Err(failed(match status.code() {
                Some(code) => format!("exited with status {code}"),
                None => "was terminated by a signal".to_string(),
            }));
        }
        Ok((StepOutcome::Ran, None, None))
    }

    fn run_directive(
        &self,
        step: &DirectiveStep,
    ) -> Result<(StepOutcome, Option<String>, Option<PathBuf>)> {
        let directive = step.to_directive()?;
        let outcome = if self.dry_run {
            self.patcher.preview(&directive)?
        } else {
            self.patcher.apply_directive(&directive)?
        };
        let outcome = match outcome {
            PatchOutcome::Changed => StepOutcome::Changed,
            PatchOutcome::Unchanged => StepOutcome::Unchanged,
        };
        Ok((
            outcome,
            Some(directive.canonical_line()),
            Some(step.file.clone()),
        ))
    }

    fn run_keys(&self, step: &KeysStep) -> Result<(StepOutcome, Option<String>, Option<PathBuf>)> {
        let account = self.accounts.lookup(&step.account)?;
        let store = (self.open_store)(AuthorizedKeyStore::for_account(account, step.path.clone()));

        let report = if self.dry_run {
            self.provisioner.preview(&step.identity, store.as_ref())?
        } else {
            self.provisioner.provision(&step.identity, store.as_ref())?
        };

        let outcome = if report.is_change() {
            StepOutcome::Changed
        } else {
            StepOutcome::Unchanged
        };
        let detail = format!(
            "{} key(s), +{} -{}",
            report.installed, report.added, report.removed
        );
        Ok((outcome, Some(detail), Some(store.location().to_path_buf())))
    }

    fn record(
        &self,
        step: &PlanStep,
        outcome: StepOutcome,
        detail: Option<String>,
        state_hash: Option<String>,
    ) {
        if self.dry_run {
            return;
        }
        let Some(journal) = &self.journal else {
            return;
        };

        let entry = JournalEntry {
            timestamp: chrono::Utc::now(),
            step: step.describe(),
            kind: step.kind(),
            target: step.target(),
            outcome,
            detail,
            state_hash,
        };
        if let Err(e) = journal.record(&entry) {
            log::warn!("could not record step in journal: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::process::ExitStatusExt;
    use std::path::Path;
    use std::process::ExitStatus;
    use std::sync::{Arc, Mutex};

    use crate::adapters::files::local_config_files::LocalConfigFiles;
    use crate::core::errors::{PatchError, ProvisionError};
    use crate::core::models::account::Account;
    use crate::core::models::journal_entry::StepKind;
    use crate::core::models::key_record::KeyRecord;

    #[derive(Clone, Default)]
    struct FakeRunner {
        calls: Arc<Mutex<Vec<Vec<String>>>>,
        fail: Option<String>,
    }

    impl CommandRunner for FakeRunner {
        fn run(&self, argv: &[String]) -> std::io::Result<ExitStatus> {
            self.calls.lock().unwrap().push(argv.to_vec());
            let failing = self.fail.as_deref() == argv.first().map(String::as_str);
            Ok(ExitStatus::from_raw(if failing { 1 << 8 } else { 0 }))
        }
    }

    struct StaticSource(Vec<String>);

    impl KeySource for StaticSource {
        fn fetch(&self, _identity: &str) -> std::result::Result<Vec<String>, ProvisionError> {
            Ok(self.0.clone())
        }

        fn name(&self) -> &str {
            "static"
        }
    }

    struct FakeAccounts(PathBuf);

    impl AccountDirectory for FakeAccounts {
        fn lookup(&self, name: &str) -> std::result::Result<Account, ProvisionError> {
            if name != "deploy" {
                return Err(ProvisionError::UnknownAccount {
                    account: name.to_string(),
                });
            }
            Ok(Account {
                name: name.to_string(),
                uid: 1000,
                gid: 1000,
                home: self.0.clone(),
            })
        }
    }

    struct SharedStore {
        keys: Arc<Mutex<Vec<KeyRecord>>>,
        path: PathBuf,
    }

    impl KeyStore for SharedStore {
        fn list(&self) -> std::result::Result<Vec<KeyRecord>, ProvisionError> {
            Ok(self.keys.lock().unwrap().clone())
        }

        fn replace_all(&self, keys: &[KeyRecord]) -> std::result::Result<(), ProvisionError> {
            *self.keys.lock().unwrap() = keys.to_vec();
            Ok(())
        }

        fn location(&self) -> &Path {
            &self.path
        }
    }

    #[derive(Clone, Default)]
    struct MemoryJournal(Arc<Mutex<Vec<JournalEntry>>>);

    impl RunJournal for MemoryJournal {
        fn record(&self, entry: &JournalEntry) -> Result<()> {
            self.0.lock().unwrap().push(entry.clone());
            Ok(())
        }

        fn query(&self, _since: Option<chrono::DateTime<chrono::Utc>>) -> Result<Vec<JournalEntry>> {
            Ok(self.0.lock().unwrap().clone())
        }
    }

    struct Fixture {
        tmp: tempfile::TempDir,
        sshd: PathBuf,
        runner: FakeRunner,
        keys: Arc<Mutex<Vec<KeyRecord>>>,
        journal: MemoryJournal,
        home: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let tmp = tempfile::TempDir::new().unwrap();
            let sshd = tmp.path().join("sshd_config");
            std::fs::write(&sshd, "#PermitRootLogin yes\nUsePAM yes\n").unwrap();
            let home = tmp.path().join("home");
            Self {
                sshd,
                home,
                tmp,
                runner: FakeRunner::default(),
                keys: Arc::default(),
                journal: MemoryJournal::default(),
            }
        }

        fn orchestrator(
            &self,
        ) -> Orchestrator<FakeRunner, LocalConfigFiles, StaticSource, FakeAccounts> {
            let keys = self.keys.clone();
            Orchestrator::new(
                self.runner.clone(),
                LocalConfigFiles::new(),
                StaticSource(vec!["ssh-ed25519 AAAAK1".into()]),
                FakeAccounts(self.home.clone()),
                Box::new(move |store: AuthorizedKeyStore| {
                    Box::new(SharedStore {
                        keys: keys.clone(),
                        path: store.path,
                    }) as Box<dyn KeyStore>
                }),
            )
            .with_journal(Box::new(self.journal.clone()))
        }

        fn plan(&self, extra: &str) -> HostPlan {
            HostPlan::parse(&format!(
                r#"
[[step]]
kind = "command"
argv = ["apt-get", "update"]

[[step]]
kind = "directive"
file = "{}"
key = "PermitRootLogin"
value = "no"

[[step]]
kind = "authorized_keys"
identity = "octocat"
account = "deploy"
{extra}
"#,
                self.sshd.display()
            ))
            .unwrap()
        }
    }

    #[test]
    fn runs_every_step_in_order() {
        let fx = Fixture::new();
        let mut started = Vec::new();

        let summary = fx
            .orchestrator()
            .run(&fx.plan(""), |event| {
                if let StepEvent::Started { index, .. } = event {
                    started.push(index);
                }
            })
            .unwrap();

        assert_eq!(started, vec![0, 1, 2]);
        assert_eq!(
            summary,
            RunSummary {
                changed: 2,
                unchanged: 0,
                ran: 1,
                planned: 0
            }
        );
        assert_eq!(
            fx.runner.calls.lock().unwrap().clone(),
            vec![vec!["apt-get".to_string(), "update".to_string()]]
        );
        assert_eq!(
            std::fs::read_to_string(&fx.sshd).unwrap(),
            "PermitRootLogin no\nUsePAM yes\n"
        );
        assert_eq!(fx.keys.lock().unwrap().len(), 1);
    }

    #[test]
    fn second_run_reports_unchanged() {
        let fx = Fixture::new();
        let plan = fx.plan("");
        fx.orchestrator().run(&plan, |_| {}).unwrap();
        let summary = fx.orchestrator().run(&plan, |_| {}).unwrap();
        assert_eq!(summary.changed, 0);
        assert_eq!(summary.unchanged, 2);
    }

    #[test]
    fn default_store_path_is_under_account_home() {
        let fx = Fixture::new();
        let mut reports = Vec::new();
        fx.orchestrator()
            .run(&fx.plan(""), |event| {
                if let StepEvent::Finished(r) = event {
                    reports.push(r.clone());
                }
            })
            .unwrap();
        assert_eq!(
            reports[2].state_path,
            Some(fx.home.join(".ssh").join("authorized_keys"))
        );
    }

    #[test]
    fn failing_command_stops_the_run() {
        let mut fx = Fixture::new();
        fx.runner.fail = Some("apt-get".into());

        let err = fx.orchestrator().run(&fx.plan(""), |_| {}).unwrap_err();

        assert_eq!(err.exit_code(), 30);
        assert!(err.to_string().contains("exited with status 1"));
        assert_eq!(
            std::fs::read_to_string(&fx.sshd).unwrap(),
            "#PermitRootLogin yes\nUsePAM yes\n"
        );
        let entries = fx.journal.0.lock().unwrap().clone();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].outcome, StepOutcome::Failed);
    }

    #[test]
    fn missing_file_aborts_with_patch_error() {
        let fx = Fixture::new();
        std::fs::remove_file(&fx.sshd).unwrap();

        let err = fx.orchestrator().run(&fx.plan(""), |_| {}).unwrap_err();

        assert!(matches!(
            err,
            HostwardError::Patch(PatchError::NotFound { .. })
        ));
        assert!(fx.keys.lock().unwrap().is_empty());
    }

    #[test]
    fn unknown_account_aborts() {
        let fx = Fixture::new();
        let plan = HostPlan::parse(
            r#"
[[step]]
kind = "authorized_keys"
identity = "octocat"
account = "nobody-here"
"#,
        )
        .unwrap();
        let err = fx.orchestrator().run(&plan, |_| {}).unwrap_err();
        assert_eq!(err.exit_code(), 24);
    }

    #[test]
    fn dry_run_writes_and_runs_nothing() {
        let fx = Fixture::new();

        let summary = fx
            .orchestrator()
            .dry_run(true)
            .run(&fx.plan(""), |_| {})
            .unwrap();

        assert_eq!(summary.planned, 1);
        assert_eq!(summary.changed, 2);
        assert!(fx.runner.calls.lock().unwrap().is_empty());
        assert!(fx.keys.lock().unwrap().is_empty());
        assert!(fx.journal.0.lock().unwrap().is_empty());
        assert_eq!(
            std::fs::read_to_string(&fx.sshd).unwrap(),
            "#PermitRootLogin yes\nUsePAM yes\n"
        );
    }

    #[test]
    fn journal_records_state_hash_of_patched_file() {
        let fx = Fixture::new();
        fx.orchestrator().run(&fx.plan(""), |_| {}).unwrap();

        let entries = fx.journal.0.lock().unwrap().clone();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].kind, StepKind::Command);
        assert_eq!(entries[0].outcome, StepOutcome::Ran);
        assert!(entries[0].state_hash.is_none());
        assert_eq!(entries[1].detail.as_deref(), Some("PermitRootLogin no"));
        assert_eq!(entries[1].state_hash, file_state_hash(&fx.sshd));
        assert!(entries[1].state_hash.is_some());
    }

    #[test]
    fn explicit_key_path_overrides_home() {
        let fx = Fixture::new();
        let custom = fx.tmp.path().join("custom_keys");
        let plan = fx.plan(&format!("path = \"{}\"", custom.display()));
        let mut last = None;
        fx.orchestrator()
            .run(&plan, |event| {
                if let StepEvent::Finished(r) = event {
                    last = r.state_path.clone();
                }
            })
            .unwrap();
        assert_eq!(last, Some(custom));
    }
}
