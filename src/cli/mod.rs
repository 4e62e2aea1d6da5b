pub mod commands;
pub mod context;
pub mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Harden a fresh host: patch configs, provision keys, run the checklist once.
#[derive(Parser, Debug)]
#[command(name = "hostward", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Plan file (default: ./hostward.toml, then the per-user plan)
    #[arg(long, global = true, env = "HOSTWARD_PLAN")]
    pub plan: Option<PathBuf>,

    /// Directory holding the run journal
    #[arg(long, global = true, env = "HOSTWARD_STATE_DIR")]
    pub state_dir: Option<PathBuf>,

    /// Identity-provider API base, overrides the plan
    #[arg(long, global = true, env = "HOSTWARD_KEY_ENDPOINT")]
    pub key_endpoint: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet mode: only show errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a default hardening plan
    Init {
        /// Non-root account to create and provision
        #[arg(long, default_value = "deploy")]
        user: String,
        /// GitHub login whose published keys are installed
        #[arg(long)]
        github: String,
        /// Overwrite an existing plan
        #[arg(long)]
        force: bool,
    },

    /// Validate the plan and list its steps
    Plan,

    /// Run the plan end-to-end
    Apply {
        /// Report what each step would do without changing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Set one directive in one configuration file
    Patch {
        /// Absolute path of the configuration file
        file: PathBuf,
        /// Directive name, e.g. PermitRootLogin
        key: String,
        /// Desired value
        value: String,
        /// Text between key and value
        #[arg(long, default_value = " ")]
        separator: String,
        /// Show whether the file would change, without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Install an identity's published keys for a local account
    Keys {
        /// Identity at the key provider (GitHub login)
        identity: String,
        /// Local account that receives the keys
        #[arg(long)]
        account: String,
        /// authorized_keys path (default: ~account/.ssh/authorized_keys)
        #[arg(long)]
        path: Option<PathBuf>,
        /// Fetch timeout in seconds
        #[arg(long, default_value_t = crate::config::plan::DEFAULT_FETCH_TIMEOUT_SECS)]
        timeout: u64,
        /// Fetch and compare only, without installing
        #[arg(long)]
        dry_run: bool,
    },

    /// Show the run journal
    Log {
        /// Filter entries since this date (ISO 8601)
        #[arg(long)]
        since: Option<String>,
        /// Show last N entries
        #[arg(long)]
        last: Option<usize>,
    },
}
