use log::debug;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{Result, StampError};

/// Runs an external command and hands back its standard output.
///
/// Backends only ever talk to the VCS through this trait, so their parsing
/// can be exercised with canned output instead of a live repository.
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<String>;
}

/// Spawns real child processes inside a working directory.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    dir: PathBuf,
}

impl SystemRunner {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<String> {
        let command = render_command(program, args);
        debug!("Running `{}` in {}", command, self.dir.display());

        let output = Command::new(program)
            .args(args)
            .current_dir(&self.dir)
            .output()
            .map_err(|source| StampError::Spawn {
                program: program.to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(StampError::CommandFailed {
                command,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        String::from_utf8(output.stdout).map_err(|_| StampError::parse(&command, "output is not valid UTF-8"))
    }
}

pub fn render_command(program: &str, args: &[&str]) -> String {
    std::iter::once(program).chain(args.iter().copied()).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_render_command_joins_program_and_args() {
        assert_eq!(render_command("git", &["status", "--porcelain"]), "git status --porcelain");
        assert_eq!(render_command("hg", &[]), "hg");
    }

    #[test]
    fn test_missing_executable_is_spawn_error() {
        let temp_dir = TempDir::new().unwrap();
        let runner = SystemRunner::new(temp_dir.path());

        let err = runner.run("definitely-not-a-vcs-binary", &["id"]).unwrap_err();
        assert!(matches!(err, StampError::Spawn { .. }));
        assert!(err.to_string().contains("definitely-not-a-vcs-binary"));
    }

    #[test]
    fn test_missing_working_directory_is_spawn_error() {
        let temp_dir = TempDir::new().unwrap();
        let runner = SystemRunner::new(temp_dir.path().join("missing"));

        let err = runner.run("git", &["status"]).unwrap_err();
        assert!(matches!(err, StampError::Spawn { .. }));
    }
}
