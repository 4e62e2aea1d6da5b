use std::io;
use std::process::{Command, ExitStatus};

use crate::core::traits::command_runner::CommandRunner;

/// Runs commands directly (no shell), inheriting stdio so package manager
/// output streams to the terminal.
#[derive(Clone, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, argv: &[String]) -> io::Result<ExitStatus> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty argv"))?;
        log::debug!("exec {}", argv.join(" "));
        Command::new(program).args(args).status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn reports_exit_status() {
        assert!(SystemRunner.run(&argv(&["true"])).unwrap().success());
        assert!(!SystemRunner.run(&argv(&["false"])).unwrap().success());
    }

    #[test]
    fn empty_argv_is_invalid_input() {
        let err = SystemRunner.run(&[]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn missing_program_is_an_error() {
        assert!(SystemRunner.run(&argv(&["hostward-no-such-program"])).is_err());
    }
}
