use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StampError {
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("No git or hg repository found at or above {}", .0.display())]
    NoRepository(PathBuf),

    #[error("Unexpected output from {command}: {reason}")]
    Parse { command: String, reason: String },

    #[error("Commit timestamp {0} is out of range")]
    Timestamp(i64),

    #[error("Failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StampError {
    pub fn parse(command: &str, reason: impl Into<String>) -> Self {
        StampError::Parse {
            command: command.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StampError>;
