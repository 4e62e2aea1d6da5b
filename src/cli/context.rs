use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::core::errors::{HostwardError, Result};

/// Default location of the run journal.
pub const DEFAULT_STATE_DIR: &str = "/var/lib/hostward";

/// Plan file looked up in the working directory.
pub const LOCAL_PLAN_FILE: &str = "hostward.toml";

static STATE_DIR: OnceLock<PathBuf> = OnceLock::new();
static PLAN_PATH: OnceLock<Option<PathBuf>> = OnceLock::new();
static KEY_ENDPOINT: OnceLock<Option<String>> = OnceLock::new();

/// Initialize the global paths from the command line.
pub fn init(plan: Option<&Path>, state_dir: Option<&Path>, key_endpoint: Option<&str>) {
    let _ = PLAN_PATH.set(plan.map(Path::to_path_buf));
    let _ = STATE_DIR.set(
        state_dir
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR)),
    );
    let _ = KEY_ENDPOINT.set(key_endpoint.map(str::to_string));
}

/// Directory holding the run journal.
pub fn state_dir() -> &'static Path {
    STATE_DIR
        .get()
        .map(|p| p.as_path())
        .unwrap_or(Path::new(DEFAULT_STATE_DIR))
}

/// Key endpoint override from `--key-endpoint` / `HOSTWARD_KEY_ENDPOINT`.
pub fn key_endpoint_override() -> Option<&'static str> {
    KEY_ENDPOINT.get().and_then(|e| e.as_deref())
}

/// Per-user fallback plan location: `<config_dir>/hostward/plan.toml`.
pub fn user_plan_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("hostward").join("plan.toml"))
}

/// Where a new plan is written: the explicit `--plan`, else `./hostward.toml`.
pub fn plan_target() -> PathBuf {
    PLAN_PATH
        .get()
        .and_then(|p| p.clone())
        .unwrap_or_else(|| PathBuf::from(LOCAL_PLAN_FILE))
}

/// Locate an existing plan: `--plan`, else `./hostward.toml`, else the
/// per-user plan.
pub fn resolve_plan() -> Result<PathBuf> {
    if let Some(Some(explicit)) = PLAN_PATH.get() {
        return Ok(explicit.clone());
    }

    let local = PathBuf::from(LOCAL_PLAN_FILE);
    if local.exists() {
        return Ok(local);
    }

    if let Some(user) = user_plan_path()
        && user.exists()
    {
        return Ok(user);
    }

    Err(HostwardError::InvalidPlan {
        detail: format!(
            "no plan found (looked for ./{LOCAL_PLAN_FILE} and the per-user plan)\n\n  \
             Run 'hostward init --user <name> --github <login>' to create one,\n  \
             or pass --plan <path>."
        ),
    })
}
