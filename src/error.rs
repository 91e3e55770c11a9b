use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to start gdb: {0}")]
    Spawn(#[source] io::Error),

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    /// GDB rejected a command. `message` is GDB's own diagnostic.
    #[error("`{command}` failed: {message}")]
    Command { command: String, message: String },

    #[error("gdb session closed")]
    SessionClosed,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to parse config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("gdb not found: {0}")]
    GdbNotFound(#[from] which::Error),

    #[error("failed to serialize report: {0}")]
    Report(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
