//! Error taxonomy for agentic-crew.
//!
//! Every failure the core can produce falls into one [`ErrorKind`], and the
//! kind alone decides the process exit code. Engine- and process-specific
//! detail never crosses the external contract except as text.

use serde::Serialize;

use super::engine::EngineKind;

/// Coarse failure category, stable across releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Configuration,
    FrameworkNotAvailable,
    EngineBuild,
    Execution,
}

impl ErrorKind {
    /// Process exit code for this category.
    ///
    /// `1` execution failed, `2` configuration error, `3` engine not installed.
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorKind::EngineBuild | ErrorKind::Execution => 1,
            ErrorKind::NotFound | ErrorKind::Configuration => 2,
            ErrorKind::FrameworkNotAvailable => 3,
        }
    }
}

/// Failures of an engine run or a command-line tool run.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error("command `{command}` timed out after {limit_ms}ms{}", partial_suffix(.partial_output))]
    Timeout {
        command: String,
        limit_ms: u64,
        partial_output: String,
    },

    #[error("command `{command}` failed with exit code {code}\nstdout: {stdout}\nstderr: {stderr}")]
    NonZeroExit {
        command: String,
        code: i32,
        stdout: String,
        stderr: String,
    },

    #[error("failed to launch `{command}`: {reason}")]
    LaunchFailed { command: String, reason: String },

    #[error("missing required environment variables for {command}: {}", .vars.join(", "))]
    MissingCredentials { command: String, vars: Vec<String> },

    #[error("{engine} run failed: {message}{}", detail_suffix(.detail))]
    EngineFailed {
        engine: EngineKind,
        message: String,
        detail: Option<serde_json::Value>,
    },

    #[error("{engine} returned unreadable output: {reason}")]
    InvalidOutput { engine: EngineKind, reason: String },
}

/// Errors produced by the decomposition layer.
#[derive(Debug, thiserror::Error)]
pub enum CrewError {
    #[error("Package '{name}' not found")]
    PackageNotFound { name: String, available: Vec<String> },

    #[error("Crew '{crew}' not found in package '{package}'. Available: {available:?}")]
    CrewNotFound {
        package: String,
        crew: String,
        available: Vec<String>,
    },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("framework not available: {0}")]
    FrameworkNotAvailable(String),

    #[error("{engine} could not build crew '{crew}': {reason}")]
    EngineBuild {
        engine: String,
        crew: String,
        reason: String,
    },

    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

impl CrewError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CrewError::PackageNotFound { .. } => ErrorKind::NotFound,
            CrewError::CrewNotFound { .. } | CrewError::Configuration(_) => {
                ErrorKind::Configuration
            }
            CrewError::FrameworkNotAvailable(_) => ErrorKind::FrameworkNotAvailable,
            CrewError::EngineBuild { .. } => ErrorKind::EngineBuild,
            CrewError::Execution(_) => ErrorKind::Execution,
        }
    }

    /// Package names to show the caller, only for a missing package.
    pub fn available_packages(&self) -> Option<&[String]> {
        match self {
            CrewError::PackageNotFound { available, .. } => Some(available),
            _ => None,
        }
    }
}

fn partial_suffix(partial: &str) -> String {
    if partial.trim().is_empty() {
        String::new()
    } else {
        format!("\npartial output: {partial}")
    }
}

fn detail_suffix(detail: &Option<serde_json::Value>) -> String {
    match detail {
        Some(value) if !value.is_null() => format!("\ndetail: {value}"),
        _ => String::new(),
    }
}

/// Result type for decomposition-layer operations.
pub type Result<T> = std::result::Result<T, CrewError>;
