//! Error types for the etcgen configuration-generation daemon.

use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Errors raised by a renderer backend or the registry lookup in front of it.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no renderer registered for extension `{extension}`")]
    UnknownRenderer { extension: String },

    #[error("template error: {0}")]
    Template(String),

    #[error("renderer produced non-UTF-8 output")]
    NonUtf8Output,

    #[error("renderer command exited with {status}: {stderr}")]
    CommandFailed { status: ExitStatus, stderr: String },

    #[error("renderer I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while executing a plugin as a supervised child process.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("failed to launch plugin: {0}")]
    Launch(#[from] std::io::Error),

    #[error("plugin exited with {status}: {stderr}")]
    Runtime { status: ExitStatus, stderr: String },
}

/// Errors surfaced by the generation engine and the group table.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("group not found: {0}")]
    GroupNotFound(String),

    #[error("cyclic group reference involving `{0}`")]
    CyclicDependency(String),

    #[error("invalid dependency spec `{0}` (expected `file:`, `plugin:` or `group:` prefix)")]
    InvalidDependencySpec(String),

    #[error("group store error: {0}")]
    Store(String),
}

/// Transport-level failures of the control-plane session.
///
/// These drive the connection supervisor's state machine and are never
/// surfaced to generation logic.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection closed by peer")]
    ConnectionClosed,

    #[error("logout requested by control plane")]
    Logout,

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("config file has unreadable format: {0}")]
    Parse(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
