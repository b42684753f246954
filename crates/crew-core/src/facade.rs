//! Execution facade.
//!
//! The one orchestration path behind the library and the command surface:
//! discovery, then loading, then engine resolution, then build and run. Every
//! failure along the way is folded into a [`RunResult`]; no internal error
//! escapes `run_crew` or `run_single_agent`. Their workspace reads happen on
//! tokio's blocking pool.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, Instrument};

use crate::config::Settings;
use crate::decomposer::Decomposer;
use crate::discovery::Discovery;
use crate::domain::{
    AgentSummary, CrewDef, CrewError, CrewInfo, CrewSummary, EngineKind, ExecutionError, Result,
    RunResult, RunnerInfo, TaskSummary,
};
use crate::loader;
use crate::obs::{self, RunSpan};
use crate::runner::{CliRunner, ProfileCatalogue, RunInputs, RunOptions};

/// Entry point tying discovery, loading and the decomposer together.
#[derive(Clone)]
pub struct CrewService {
    discovery: Discovery,
    decomposer: Decomposer,
    run_timeout: Option<Duration>,
}

impl CrewService {
    pub fn new(discovery: Discovery, decomposer: Decomposer) -> Self {
        Self {
            discovery,
            decomposer,
            run_timeout: None,
        }
    }

    /// Default limit for crew runs that do not pass their own.
    pub fn with_run_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.run_timeout = timeout;
        self
    }

    /// Service wired to the real probe, bridge host and profile catalogue.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let mut profiles = ProfileCatalogue::builtin()?;
        if let Some(path) = &settings.profiles_file {
            profiles = profiles.merge(ProfileCatalogue::load_file(path)?);
        }
        let decomposer = Decomposer::new(settings.probe(), Arc::new(settings.engine_host()))
            .with_profiles(profiles);
        Ok(Self::new(Discovery::new(&settings.workspace_root), decomposer)
            .with_run_timeout(settings.run_timeout))
    }

    pub fn discovery(&self) -> &Discovery {
        &self.discovery
    }

    pub fn decomposer(&self) -> &Decomposer {
        &self.decomposer
    }

    /// Crew summaries, optionally narrowed to one package and/or engine.
    ///
    /// Synchronous: reads the workspace on the calling thread.
    ///
    /// When listing everything, a package that fails to load is skipped with
    /// a warning; a package named explicitly propagates its error.
    pub fn list_crews(
        &self,
        package: Option<&str>,
        framework: Option<EngineKind>,
    ) -> Result<Vec<CrewSummary>> {
        let packages = match package {
            Some(name) => vec![self.discovery.find_package(name)?],
            None => self.discovery.list_packages().collect(),
        };

        let mut summaries = Vec::new();
        for pkg in packages {
            let manifest = match loader::load(&pkg) {
                Ok(manifest) => manifest,
                Err(e) if package.is_some() => return Err(e),
                Err(e) => {
                    obs::emit_package_skipped(&pkg.name, &e);
                    continue;
                }
            };
            summaries.extend(
                manifest
                    .crews()
                    .iter()
                    .filter(|crew| framework.map_or(true, |f| crew.required_engine == Some(f)))
                    .map(|crew| CrewSummary {
                        package: pkg.name.clone(),
                        name: crew.name.clone(),
                        description: crew.description.clone(),
                        required_framework: crew.required_engine,
                    }),
            );
        }
        Ok(summaries)
    }

    /// Agents, tasks and knowledge of one crew.
    pub fn crew_info(&self, package: &str, crew: &str) -> Result<CrewInfo> {
        let def = self.locate(package, crew)?;
        Ok(CrewInfo {
            package: package.to_string(),
            name: def.name.clone(),
            description: def.description.clone(),
            required_framework: def.required_engine,
            agents: def
                .agents
                .iter()
                .map(|agent| AgentSummary {
                    name: agent.name.clone(),
                    role: agent.role.clone(),
                })
                .collect(),
            tasks: def
                .tasks
                .iter()
                .map(|task| TaskSummary {
                    name: task.name.clone(),
                    description: task.description.clone(),
                })
                .collect(),
            knowledge_paths: def
                .knowledge
                .iter()
                .map(|source| source.path.display().to_string())
                .collect(),
        })
    }

    fn locate(&self, package: &str, crew: &str) -> Result<CrewDef> {
        locate_in(&self.discovery, package, crew)
    }

    /// [`CrewService::locate`] on the blocking pool.
    async fn locate_blocking(&self, package: &str, crew: &str) -> Result<CrewDef> {
        let discovery = self.discovery.clone();
        let (package, crew) = (package.to_string(), crew.to_string());
        tokio::task::spawn_blocking(move || locate_in(&discovery, &package, &crew))
            .await
            .map_err(|e| CrewError::Configuration(format!("crew loading was interrupted: {e}")))?
    }

    /// Root directory of `package`, looked up on the blocking pool.
    async fn package_root(&self, package: &str) -> Result<PathBuf> {
        let discovery = self.discovery.clone();
        let package = package.to_string();
        tokio::task::spawn_blocking(move || {
            discovery
                .find_package(&package)
                .map(|pkg| pkg.root().to_path_buf())
        })
        .await
        .map_err(|e| CrewError::Configuration(format!("package lookup was interrupted: {e}")))?
    }

    /// Run one crew end to end.
    ///
    /// `forced` overrides both the crew's required engine and the priority
    /// order. `timeout` (or the service default) bounds build plus run.
    /// `duration_ms` covers build and run only and is `0` when the run failed
    /// before reaching them.
    pub async fn run_crew(
        &self,
        package: &str,
        crew: &str,
        inputs: &RunInputs,
        forced: Option<EngineKind>,
        timeout: Option<Duration>,
    ) -> RunResult {
        let run = RunSpan::start();
        let run_id = run.run_id().to_string();

        run.in_scope(|| obs::emit_run_started(&run_id, package, crew));
        let located = self
            .locate_blocking(package, crew)
            .instrument(run.span())
            .await;
        let def = match located {
            Ok(def) => def,
            Err(e) => return finish(&run_id, RunResult::failure(&e, 0)),
        };

        let limit = timeout.or(self.run_timeout);
        let result = self
            .execute(&run_id, &def, inputs, forced, limit)
            .instrument(run.span())
            .await;
        finish(&run_id, result)
    }

    async fn execute(
        &self,
        run_id: &str,
        def: &CrewDef,
        inputs: &RunInputs,
        forced: Option<EngineKind>,
        limit: Option<Duration>,
    ) -> RunResult {
        let (engine, selection) = match self.decomposer.resolve_with_reason(def, forced).await {
            Ok(resolved) => resolved,
            Err(e) => return RunResult::failure(&e, 0),
        };
        obs::emit_engine_resolved(run_id, engine, selection.as_str());

        let runner = self.decomposer.get_runner(engine);
        let start = Instant::now();
        let outcome = match limit {
            Some(limit) => tokio::time::timeout(limit, runner.build_and_run(def, inputs))
                .await
                .unwrap_or_else(|_| {
                    Err(ExecutionError::Timeout {
                        command: format!("{engine} crew '{}'", def.name),
                        limit_ms: limit.as_millis() as u64,
                        partial_output: String::new(),
                    }
                    .into())
                }),
            None => runner.build_and_run(def, inputs).await,
        };
        let duration_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(output) => RunResult::success(output, engine, duration_ms),
            Err(e) => {
                debug!(run_id = %run_id, error = %e, "crew run failed");
                RunResult::failure(&e, duration_ms)
            }
        }
    }

    /// Run one task through a single-agent command-line tool.
    ///
    /// `package`, when given, supplies the working directory. Unknown or
    /// uninstalled runners and empty input are configuration errors.
    pub async fn run_single_agent(
        &self,
        runner_name: &str,
        model: Option<String>,
        task: &str,
        package: Option<&str>,
        mut options: RunOptions,
    ) -> RunResult {
        let prepared: Result<CliRunner> = async {
            if task.trim().is_empty() {
                return Err(CrewError::Configuration(
                    "No input provided. Use --input or --file".to_string(),
                ));
            }
            if let Some(name) = package {
                options.working_dir = Some(self.package_root(name).await?);
            }
            self.available_cli(runner_name, model)
        }
        .await;

        let runner = match prepared {
            Ok(runner) => runner,
            Err(e) => return RunResult::failure(&e, 0),
        };

        let start = Instant::now();
        let outcome = runner.run_task(task, &options).await;
        let duration_ms = start.elapsed().as_millis() as u64;
        match outcome {
            Ok(output) => RunResult::runner_success(output, runner_name, duration_ms),
            Err(e) => RunResult::failure(&CrewError::from(e), duration_ms),
        }
    }

    fn available_cli(&self, runner_name: &str, model: Option<String>) -> Result<CliRunner> {
        let runner = self.decomposer.get_cli_runner(runner_name, model)?;
        if !runner.is_available() {
            let install = &runner.config().install_cmd;
            let hint = if install.is_empty() {
                String::new()
            } else {
                format!(". Install with: {install}")
            };
            return Err(CrewError::Configuration(format!(
                "Runner '{runner_name}' not available (tool not installed){hint}"
            )));
        }
        Ok(runner)
    }

    /// Every configured command-line runner with its installation status.
    pub fn list_runners(&self) -> Vec<RunnerInfo> {
        self.decomposer.profiles().runner_infos()
    }
}

fn locate_in(discovery: &Discovery, package: &str, crew: &str) -> Result<CrewDef> {
    let pkg = discovery.find_package(package)?;
    let manifest = loader::load(&pkg)?;
    manifest
        .crew(crew)
        .cloned()
        .ok_or_else(|| CrewError::CrewNotFound {
            package: package.to_string(),
            crew: crew.to_string(),
            available: manifest.crew_names(),
        })
}

fn finish(run_id: &str, result: RunResult) -> RunResult {
    obs::emit_run_finished(run_id, result.duration_ms(), result.is_success());
    result
}
