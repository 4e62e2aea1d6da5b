use std::path::PathBuf;

/// Failures while applying a directive to a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    #[error(
        "Configuration file not found: {path}\n\n  \
         The directive '{key}' targets a file that does not exist.\n  \
         Check the path in your plan, or install the package that ships it first."
    )]
    NotFound { path: PathBuf, key: String },

    #[error(
        "Permission denied on {path}: {reason}\n\n  \
         hostward needs to read and rewrite this file.\n  \
         Run as root (sudo hostward ...) or fix the file permissions."
    )]
    PermissionDenied { path: PathBuf, reason: String },

    #[error(
        "Ambiguous directive '{key}' in {path}\n\n  \
         Found {count} active lines with conflicting values: {values}\n  \
         hostward will not guess which one is authoritative.\n\n  \
         Fix: remove or comment out the duplicates by hand, then re-run."
    )]
    AmbiguousMatch {
        path: PathBuf,
        key: String,
        count: usize,
        values: String,
    },

    #[error("Failed to update {path}: {reason}")]
    WriteFailed { path: PathBuf, reason: String },
}

/// Failures while provisioning an authorized-keys store.
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error(
        "Could not fetch keys for '{identity}': {reason}\n\n  \
         The existing authorized_keys file was left untouched.\n  \
         Check network access to the key provider and try again."
    )]
    FetchFailed { identity: String, reason: String },

    #[error(
        "No public keys found for '{identity}'\n\n  \
         Refusing to install an empty authorized_keys file: it would lock\n  \
         every key-based login out of this account.\n\n  \
         Solutions:\n    \
         → Add an SSH key to the account at the identity provider\n    \
         → Check the identity name for typos"
    )]
    NoKeysFound { identity: String },

    #[error("Failed to write authorized keys to {path}: {reason}")]
    WriteFailed { path: PathBuf, reason: String },

    #[error(
        "Invalid identity '{identity}'\n\n  \
         Expected a provider user name (letters, digits and single hyphens, max 39 chars)."
    )]
    InvalidIdentity { identity: String },

    #[error(
        "Local account '{account}' does not exist\n\n  \
         Create it first (e.g. a `useradd` command step before this one)."
    )]
    UnknownAccount { account: String },
}

/// All errors surfaced by hostward.
///
/// Each variant maps to its own process exit code so that provisioning
/// automation can branch on the outcome.
#[derive(Debug, thiserror::Error)]
pub enum HostwardError {
    #[error(transparent)]
    Patch(#[from] PatchError),

    #[error(transparent)]
    Provision(#[from] ProvisionError),

    #[error(
        "Step '{step}' failed: `{command}` {status}\n\n  \
         The run was stopped. Steps before this one have already been applied."
    )]
    CommandFailed {
        step: String,
        command: String,
        status: String,
    },

    #[error("Invalid plan: {detail}")]
    InvalidPlan { detail: String },

    #[error(
        "This plan uses format version {plan_version}, but this hostward \
         only supports up to version {supported_version}.\n\n  \
         Upgrade hostward or rewrite the plan with 'hostward init --force'."
    )]
    FormatVersionTooNew {
        plan_version: u32,
        supported_version: u32,
    },

    #[error("Journal error: {detail}")]
    JournalError { detail: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl HostwardError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            HostwardError::Io(_) => 1,
            HostwardError::InvalidPlan { .. } | HostwardError::FormatVersionTooNew { .. } => 3,
            HostwardError::JournalError { .. } => 4,
            HostwardError::Patch(e) => match e {
                PatchError::NotFound { .. } => 10,
                PatchError::PermissionDenied { .. } => 11,
                PatchError::AmbiguousMatch { .. } => 12,
                PatchError::WriteFailed { .. } => 13,
            },
            HostwardError::Provision(e) => match e {
                ProvisionError::FetchFailed { .. } => 20,
                ProvisionError::NoKeysFound { .. } => 21,
                ProvisionError::WriteFailed { .. } => 22,
                ProvisionError::InvalidIdentity { .. } => 23,
                ProvisionError::UnknownAccount { .. } => 24,
            },
            HostwardError::CommandFailed { .. } => 30,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, HostwardError>;
