//! Normalized outcomes and the JSON shapes of the external contract.

use serde::ser::{Serialize, SerializeMap, Serializer};

use super::engine::EngineKind;
use super::error::{CrewError, ErrorKind};

#[derive(Debug, Clone, PartialEq)]
enum Outcome {
    Success {
        output: String,
        engine_used: Option<String>,
    },
    Failure {
        error: String,
        kind: ErrorKind,
        available_packages: Option<Vec<String>>,
    },
}

/// Normalized outcome of one execution.
///
/// Exactly one of output/error exists, matching `success`. Produced once by
/// the facade and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    outcome: Outcome,
    duration_ms: u64,
    runner: Option<String>,
}

impl RunResult {
    /// Successful multi-agent run on `engine`.
    pub fn success(output: String, engine: EngineKind, duration_ms: u64) -> Self {
        Self {
            outcome: Outcome::Success {
                output,
                engine_used: Some(engine.as_str().to_string()),
            },
            duration_ms,
            runner: None,
        }
    }

    /// Successful single-agent run through command-line profile `runner`.
    pub fn runner_success(output: String, runner: &str, duration_ms: u64) -> Self {
        Self {
            outcome: Outcome::Success {
                output,
                engine_used: None,
            },
            duration_ms,
            runner: Some(runner.to_string()),
        }
    }

    /// Failed run, classified by the error's kind.
    pub fn failure(err: &CrewError, duration_ms: u64) -> Self {
        Self {
            outcome: Outcome::Failure {
                error: err.to_string(),
                kind: err.kind(),
                available_packages: err.available_packages().map(<[String]>::to_vec),
            },
            duration_ms,
            runner: None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success { .. })
    }

    pub fn output(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Success { output, .. } => Some(output),
            Outcome::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Failure { error, .. } => Some(error),
            Outcome::Success { .. } => None,
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match &self.outcome {
            Outcome::Failure { kind, .. } => Some(*kind),
            Outcome::Success { .. } => None,
        }
    }

    pub fn engine_used(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Success { engine_used, .. } => engine_used.as_deref(),
            Outcome::Failure { .. } => None,
        }
    }

    pub fn runner(&self) -> Option<&str> {
        self.runner.as_deref()
    }

    pub fn available_packages(&self) -> Option<&[String]> {
        match &self.outcome {
            Outcome::Failure {
                available_packages, ..
            } => available_packages.as_deref(),
            Outcome::Success { .. } => None,
        }
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    /// Process exit code: `0` iff the run succeeded.
    pub fn exit_code(&self) -> u8 {
        self.error_kind().map(ErrorKind::exit_code).unwrap_or(0)
    }
}

impl Serialize for RunResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        match &self.outcome {
            Outcome::Success {
                output,
                engine_used,
            } => {
                map.serialize_entry("success", &true)?;
                map.serialize_entry("output", output)?;
                if let Some(engine) = engine_used {
                    map.serialize_entry("framework_used", engine)?;
                }
                if let Some(runner) = &self.runner {
                    map.serialize_entry("runner", runner)?;
                }
                map.serialize_entry("duration_ms", &self.duration_ms)?;
            }
            Outcome::Failure {
                error,
                available_packages,
                ..
            } => {
                map.serialize_entry("success", &false)?;
                map.serialize_entry("error", error)?;
                map.serialize_entry("duration_ms", &self.duration_ms)?;
                if let Some(packages) = available_packages {
                    map.serialize_entry("available_packages", packages)?;
                }
            }
        }
        map.end()
    }
}

/// One row of `list --json`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CrewSummary {
    pub package: String,
    pub name: String,
    pub description: String,
    pub required_framework: Option<EngineKind>,
}

/// Agent row of `info --json`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct AgentSummary {
    pub name: String,
    pub role: String,
}

/// Task row of `info --json`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct TaskSummary {
    pub name: String,
    pub description: String,
}

/// Body of `info --json`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CrewInfo {
    pub package: String,
    pub name: String,
    pub description: String,
    pub required_framework: Option<EngineKind>,
    pub agents: Vec<AgentSummary>,
    pub tasks: Vec<TaskSummary>,
    pub knowledge_paths: Vec<String>,
}

/// One row of `list-runners --json`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RunnerInfo {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub available: bool,
    pub install_cmd: String,
    pub docs_url: String,
    pub required_env: Vec<String>,
    /// Free-form profile notes; omitted when empty.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub notes: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_shape() {
        let result = RunResult::success("done".to_string(), EngineKind::CrewAi, 42);
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(
            value,
            json!({
                "success": true,
                "output": "done",
                "framework_used": "crewai",
                "duration_ms": 42
            })
        );
        assert_eq!(result.exit_code(), 0);
        assert!(result.error().is_none());
    }

    #[test]
    fn test_package_not_found_shape_includes_available_packages() {
        let err = CrewError::PackageNotFound {
            name: "missingpkg".to_string(),
            available: vec!["otterfall".to_string()],
        };
        let result = RunResult::failure(&err, 0);
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["success"], json!(false));
        assert_eq!(value["available_packages"], json!(["otterfall"]));
        assert!(value["error"].as_str().unwrap().contains("missingpkg"));
        assert!(value.get("output").is_none());
        assert_eq!(result.exit_code(), 2);
    }

    #[test]
    fn test_other_failures_omit_available_packages() {
        let err = CrewError::FrameworkNotAvailable("strands is not installed".to_string());
        let result = RunResult::failure(&err, 7);
        let value = serde_json::to_value(&result).unwrap();
        assert!(value.get("available_packages").is_none());
        assert_eq!(value["duration_ms"], json!(7));
        assert_eq!(result.exit_code(), 3);
        assert!(result.output().is_none());
    }

    #[test]
    fn test_runner_success_shape() {
        let result = RunResult::runner_success("patched".to_string(), "aider", 5);
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["runner"], json!("aider"));
        assert!(value.get("framework_used").is_none());
    }
}
