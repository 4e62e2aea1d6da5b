use std::process::ExitStatus;

/// Capability to run external privileged commands (`apt`, `ufw`, `systemctl`).
///
/// The core never shells out itself; the orchestrator goes through this port.
pub trait CommandRunner: Send + Sync {
    /// Run `argv[0]` with the remaining arguments and wait for it.
    fn run(&self, argv: &[String]) -> std::io::Result<ExitStatus>;
}
