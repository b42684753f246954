//! Catalogue of named command-line runner profiles.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use super::cli::{CliRunner, CliRunnerConfig};
use crate::domain::{CrewError, Result, RunnerInfo};

const BUILTIN_PROFILES: &str = include_str!("../../profiles/local_cli_profiles.yaml");

#[derive(Debug, Deserialize)]
struct ProfileFile {
    #[serde(default)]
    profiles: BTreeMap<String, CliRunnerConfig>,
}

/// Named [`CliRunnerConfig`]s, ordered by name.
#[derive(Debug, Clone, Default)]
pub struct ProfileCatalogue {
    profiles: BTreeMap<String, CliRunnerConfig>,
}

impl ProfileCatalogue {
    /// Profiles shipped with the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_yaml(BUILTIN_PROFILES)
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        let file: ProfileFile = serde_yaml::from_str(text)
            .map_err(|e| CrewError::Configuration(format!("malformed runner profiles: {e}")))?;
        if let Some(name) = file
            .profiles
            .iter()
            .find_map(|(name, config)| config.validate().err().map(|_| name))
        {
            return Err(CrewError::Configuration(format!(
                "runner profile '{name}' has an empty command"
            )));
        }
        Ok(Self {
            profiles: file.profiles,
        })
    }

    pub fn load_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            CrewError::Configuration(format!("cannot read profiles {}: {e}", path.display()))
        })?;
        Self::from_yaml(&text)
    }

    /// Overlay `other`; its entries replace same-named ones.
    pub fn merge(mut self, other: ProfileCatalogue) -> Self {
        self.profiles.extend(other.profiles);
        self
    }

    pub fn get(&self, name: &str) -> Option<&CliRunnerConfig> {
        self.profiles.get(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.profiles.keys().cloned().collect()
    }

    /// Runner for profile `name`, with an optional model override.
    pub fn resolve(&self, name: &str, model: Option<String>) -> Result<CliRunner> {
        let config = self.get(name).cloned().ok_or_else(|| {
            CrewError::Configuration(format!(
                "Unknown runner '{name}'. Available: {:?}",
                self.names()
            ))
        })?;
        Ok(CliRunner::new(name, config)?.with_model(model))
    }

    /// Listing rows with installation status probed now.
    pub fn runner_infos(&self) -> Vec<RunnerInfo> {
        self.profiles
            .iter()
            .filter_map(|(name, config)| {
                CliRunner::new(name.as_str(), config.clone())
                    .ok()
                    .map(|runner| (name, runner))
            })
            .map(|(name, runner)| RunnerInfo {
                name: name.clone(),
                display_name: runner.display_name().to_string(),
                description: runner.config().description.clone(),
                available: runner.is_available(),
                install_cmd: runner.config().install_cmd.clone(),
                docs_url: runner.config().docs_url.clone(),
                required_env: runner.required_env_vars().to_vec(),
                notes: runner.config().notes.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_profiles_parse() {
        let catalogue = ProfileCatalogue::builtin().unwrap();
        assert_eq!(
            catalogue.names(),
            vec!["aider", "claude-code", "codex", "ollama"]
        );
        let ollama = catalogue.get("ollama").unwrap();
        assert_eq!(ollama.subcommand.as_deref(), Some("run"));
        assert!(ollama.task_flag.is_empty());
    }

    #[test]
    fn test_runner_infos_carry_notes() {
        let infos = ProfileCatalogue::builtin().unwrap().runner_infos();
        let ollama = infos.iter().find(|info| info.name == "ollama").unwrap();
        assert!(ollama.notes.contains("No API key needed"));
    }

    #[test]
    fn test_merge_overrides_and_extends() {
        let extra = ProfileCatalogue::from_yaml(
            "profiles:\n  aider:\n    command: aider-nightly\n    task_flag: --message\n  mytool:\n    command: mytool\n",
        )
        .unwrap();
        let catalogue = ProfileCatalogue::builtin().unwrap().merge(extra);
        assert_eq!(catalogue.get("aider").unwrap().command, "aider-nightly");
        assert!(catalogue.get("mytool").is_some());
        assert!(catalogue.get("codex").is_some());
    }

    #[test]
    fn test_unknown_profile_lists_available() {
        let catalogue = ProfileCatalogue::builtin().unwrap();
        let err = catalogue.resolve("emacs", None).unwrap_err();
        assert!(err.to_string().contains("ollama"));
    }

    #[test]
    fn test_profile_with_empty_command_is_rejected() {
        assert!(ProfileCatalogue::from_yaml("profiles:\n  bad:\n    command: \"\"\n").is_err());
    }
}
