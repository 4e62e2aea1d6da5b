use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::errors::{HostwardError, Result};
use crate::core::models::account::validate_account_name;
use crate::core::models::directive::ConfigDirective;
use crate::core::models::journal_entry::StepKind;
use crate::core::models::key_record::is_valid_identity;

/// Current plan format version supported by this build of hostward.
pub const CURRENT_FORMAT_VERSION: u32 = 1;

/// Default identity-provider API base.
pub const DEFAULT_KEY_ENDPOINT: &str = "https://api.github.com";

/// Default bound on the key fetch.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;

/// A hardening plan read from `hostward.toml`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HostPlan {
    #[serde(default)]
    pub hostward: HostwardSection,
    #[serde(default, rename = "step")]
    pub steps: Vec<PlanStep>,
}

/// The `[hostward]` section.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HostwardSection {
    /// Format version for backward compatibility. Defaults to 1 if missing.
    #[serde(default = "default_format_version")]
    pub format_version: u32,
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_key_endpoint")]
    pub key_endpoint: String,
}

impl Default for HostwardSection {
    fn default() -> Self {
        Self {
            format_version: default_format_version(),
            fetch_timeout_secs: default_fetch_timeout(),
            key_endpoint: default_key_endpoint(),
        }
    }
}

fn default_format_version() -> u32 {
    1
}

fn default_fetch_timeout() -> u64 {
    DEFAULT_FETCH_TIMEOUT_SECS
}

fn default_key_endpoint() -> String {
    DEFAULT_KEY_ENDPOINT.to_string()
}

fn default_separator() -> String {
    " ".to_string()
}

/// One `[[step]]` entry, tagged by `kind`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlanStep {
    Command(CommandStep),
    Directive(DirectiveStep),
    AuthorizedKeys(KeysStep),
}

/// Run an external command.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CommandStep {
    pub name: Option<String>,
    pub argv: Vec<String>,
}

/// Make a configuration file carry one directive.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DirectiveStep {
    pub name: Option<String>,
    pub file: PathBuf,
    pub key: String,
    pub value: String,
    #[serde(default = "default_separator")]
    pub separator: String,
}

impl DirectiveStep {
    pub fn to_directive(&self) -> Result<ConfigDirective> {
        ConfigDirective::with_separator(&self.file, &self.key, &self.value, &self.separator)
    }
}

/// Install an identity's published keys for a local account.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KeysStep {
    pub name: Option<String>,
    pub identity: String,
    pub account: String,
    pub path: Option<PathBuf>,
}

impl PlanStep {
    pub fn kind(&self) -> StepKind {
        match self {
            PlanStep::Command(_) => StepKind::Command,
            PlanStep::Directive(_) => StepKind::Directive,
            PlanStep::AuthorizedKeys(_) => StepKind::AuthorizedKeys,
        }
    }

    /// The step's name, or a generated description.
    pub fn describe(&self) -> String {
        match self {
            PlanStep::Command(c) => c
                .name
                .clone()
                .unwrap_or_else(|| format!("run {}", c.argv.join(" "))),
            PlanStep::Directive(d) => d.name.clone().unwrap_or_else(|| {
                format!("set {} in {}", d.key, d.file.display())
            }),
            PlanStep::AuthorizedKeys(k) => k.name.clone().unwrap_or_else(|| {
                format!("install keys of {} for {}", k.identity, k.account)
            }),
        }
    }

    /// What the step acts on, as recorded in the journal.
    pub fn target(&self) -> String {
        match self {
            PlanStep::Command(c) => c.argv.join(" "),
            PlanStep::Directive(d) => d.file.display().to_string(),
            PlanStep::AuthorizedKeys(k) => format!("{} -> {}", k.identity, k.account),
        }
    }

    fn validate(&self, index: usize) -> Result<()> {
        let invalid = |detail: String| HostwardError::InvalidPlan {
            detail: format!("step {} ({}): {detail}", index + 1, self.kind()),
        };

        match self {
            PlanStep::Command(c) => {
                if c.argv.first().is_none_or(|p| p.trim().is_empty()) {
                    return Err(invalid("argv must name a program".into()));
                }
            }
            PlanStep::Directive(d) => {
                if !d.file.is_absolute() {
                    return Err(invalid(format!(
                        "file must be an absolute path, got {}",
                        d.file.display()
                    )));
                }
                d.to_directive().map_err(|e| invalid(e.to_string()))?;
            }
            PlanStep::AuthorizedKeys(k) => {
                if !is_valid_identity(&k.identity) {
                    return Err(invalid(format!("invalid identity '{}'", k.identity)));
                }
                validate_account_name(&k.account).map_err(|e| invalid(e.to_string()))?;
                if let Some(path) = &k.path
                    && !path.is_absolute()
                {
                    return Err(invalid(format!(
                        "path must be absolute, got {}",
                        path.display()
                    )));
                }
            }
        }
        Ok(())
    }
}

impl HostPlan {
    /// Load and validate a plan file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(HostwardError::InvalidPlan {
                detail: format!(
                    "{} not found. Run 'hostward init' to generate one.",
                    path.display()
                ),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content).map_err(|e| match e {
            HostwardError::InvalidPlan { detail } => HostwardError::InvalidPlan {
                detail: format!("{}: {detail}", path.display()),
            },
            other => other,
        })
    }

    /// Parse and validate plan text.
    pub fn parse(content: &str) -> Result<Self> {
        let plan: Self = toml::from_str(content).map_err(|e| HostwardError::InvalidPlan {
            detail: format!("failed to parse TOML: {e}"),
        })?;
        plan.validate()?;
        Ok(plan)
    }

    fn validate(&self) -> Result<()> {
        if self.hostward.format_version > CURRENT_FORMAT_VERSION {
            return Err(HostwardError::FormatVersionTooNew {
                plan_version: self.hostward.format_version,
                supported_version: CURRENT_FORMAT_VERSION,
            });
        }
        if self.hostward.fetch_timeout_secs == 0 {
            return Err(HostwardError::InvalidPlan {
                detail: "fetch_timeout_secs must be greater than zero".into(),
            });
        }
        let endpoint = &self.hostward.key_endpoint;
        if !endpoint.starts_with("https://") && !endpoint.starts_with("http://") {
            return Err(HostwardError::InvalidPlan {
                detail: format!("key_endpoint must be an http(s) URL, got '{endpoint}'"),
            });
        }
        for (index, step) in self.steps.iter().enumerate() {
            step.validate(index)?;
        }
        Ok(())
    }
}

const DEFAULT_PLAN_TEMPLATE: &str = r#"# hostward plan: one-time hardening of a fresh Ubuntu host.
# Steps run top to bottom; the first failure stops the run.

[hostward]
format_version = 1
fetch_timeout_secs = 10
key_endpoint = "https://api.github.com"

# ─── Packages ────────────────────────────────────────────────────

[[step]]
kind = "directive"
name = "Restart services automatically after upgrades"
file = "/etc/needrestart/needrestart.conf"
key = "$nrconf{restart}"
value = "'a';"
separator = " = "

[[step]]
kind = "command"
name = "Refresh package lists"
argv = ["apt-get", "update"]

[[step]]
kind = "command"
name = "Upgrade installed packages"
argv = ["env", "DEBIAN_FRONTEND=noninteractive", "apt-get", "-y", "upgrade"]

# ─── Docker ──────────────────────────────────────────────────────

[[step]]
kind = "command"
name = "Install Docker"
argv = ["sh", "-c", "command -v docker >/dev/null 2>&1 || curl -fsSL https://get.docker.com | sh"]

# ─── Firewall ────────────────────────────────────────────────────

[[step]]
kind = "command"
argv = ["ufw", "allow", "OpenSSH"]

[[step]]
kind = "command"
argv = ["ufw", "allow", "80/tcp"]

[[step]]
kind = "command"
argv = ["ufw", "allow", "443/tcp"]

[[step]]
kind = "command"
name = "Enable the firewall"
argv = ["ufw", "--force", "enable"]

# ─── Non-root user ───────────────────────────────────────────────

[[step]]
kind = "command"
name = "Create @ACCOUNT@"
argv = ["sh", "-c", "id -u @ACCOUNT@ >/dev/null 2>&1 || useradd --create-home --shell /bin/bash @ACCOUNT@"]

[[step]]
kind = "command"
name = "Grant sudo and docker to @ACCOUNT@"
argv = ["usermod", "-aG", "sudo,docker", "@ACCOUNT@"]

[[step]]
kind = "authorized_keys"
name = "Install @IDENTITY@'s public keys for @ACCOUNT@"
identity = "@IDENTITY@"
account = "@ACCOUNT@"

# ─── SSH daemon ──────────────────────────────────────────────────
# Keys are installed above, so disabling passwords cannot lock you out.

[[step]]
kind = "directive"
file = "/etc/ssh/sshd_config"
key = "PermitRootLogin"
value = "no"

[[step]]
kind = "directive"
file = "/etc/ssh/sshd_config"
key = "PasswordAuthentication"
value = "no"

[[step]]
kind = "directive"
file = "/etc/ssh/sshd_config"
key = "PubkeyAuthentication"
value = "yes"

[[step]]
kind = "directive"
file = "/etc/ssh/sshd_config"
key = "KbdInteractiveAuthentication"
value = "no"

[[step]]
kind = "directive"
file = "/etc/ssh/sshd_config"
key = "X11Forwarding"
value = "no"

[[step]]
kind = "directive"
file = "/etc/ssh/sshd_config"
key = "MaxAuthTries"
value = "3"

[[step]]
kind = "command"
name = "Restart the SSH daemon"
argv = ["systemctl", "restart", "ssh"]

# ─── fail2ban ────────────────────────────────────────────────────

[[step]]
kind = "command"
name = "Install fail2ban"
argv = ["env", "DEBIAN_FRONTEND=noninteractive", "apt-get", "-y", "install", "fail2ban"]

[[step]]
kind = "command"
name = "Enable fail2ban"
argv = ["systemctl", "enable", "--now", "fail2ban"]

# ─── Shared memory ───────────────────────────────────────────────

[[step]]
kind = "directive"
name = "Mount /run/shm noexec,nosuid"
file = "/etc/fstab"
key = "tmpfs /run/shm"
value = "tmpfs defaults,noexec,nosuid 0 0"

# ─── Reboot ──────────────────────────────────────────────────────
# Uncomment to reboot at the end of the run.
#
# [[step]]
# kind = "command"
# name = "Reboot"
# argv = ["systemctl", "reboot"]
"#;

/// Render the default plan for `account`, pulling keys from `identity`.
pub fn default_plan(account: &str, identity: &str) -> String {
    DEFAULT_PLAN_TEMPLATE
        .replace("@ACCOUNT@", account)
        .replace("@IDENTITY@", identity)
}
