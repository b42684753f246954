//! agentic-crew command-line interface
//!
//! Run declared crews on whichever multi-agent engine is installed, or hand a
//! task to a single-agent coding tool.
//!
//! ## Commands
//!
//! - `list`: Crews across packages, filterable by package and engine
//! - `info`: Agents, tasks and knowledge of one crew
//! - `run`: Execute a crew, or one task through `--runner`
//! - `list-runners`: Single-agent tools and whether they are installed
//!
//! Exit codes: `0` success, `1` run failed, `2` configuration error,
//! `3` engine not installed.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use tracing::{debug, Level};

use crew_core::{CrewError, CrewService, EngineKind, RunInputs, RunOptions, RunResult, Settings};

#[derive(Parser)]
#[command(name = "agentic-crew")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Declare a crew once, run it on any installed multi-agent framework", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    /// Workspace root holding `packages/` (default: nearest ancestor with one)
    #[arg(long, global = true, env = "AGENTIC_CREW_WORKSPACE")]
    workspace: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List crews
    List {
        /// Only crews of this package
        package: Option<String>,

        /// Only crews that require this framework
        #[arg(long)]
        framework: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Show one crew's agents, tasks and knowledge
    Info {
        package: String,
        crew: String,

        #[arg(long)]
        json: bool,
    },

    /// Run a crew, or a single task with --runner
    Run(RunArgs),

    /// List single-agent command-line runners
    ListRunners {
        #[arg(long)]
        json: bool,
    },
}

impl Commands {
    fn json(&self) -> bool {
        match self {
            Commands::List { json, .. }
            | Commands::Info { json, .. }
            | Commands::ListRunners { json } => *json,
            Commands::Run(args) => args.json,
        }
    }
}

#[derive(Args, Debug, Default)]
struct RunArgs {
    /// Package holding the crew (with --runner: working directory)
    package: Option<String>,

    /// Crew to run
    crew: Option<String>,

    /// Input text
    #[arg(short, long, conflicts_with = "file")]
    input: Option<String>,

    /// Read the input text from a file
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// auto, crewai, langgraph or strands
    #[arg(long, default_value = "auto")]
    framework: String,

    /// Single-agent runner profile (aider, claude-code, codex, ollama, ...)
    #[arg(long)]
    runner: Option<String>,

    /// Model for the runner
    #[arg(long, requires = "runner")]
    model: Option<String>,

    /// Do not pass the runner's auto-approve flag
    #[arg(long, requires = "runner")]
    no_auto_approve: bool,

    /// Seconds before a crew run is abandoned
    #[arg(long)]
    timeout: Option<u64>,

    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    crew_core::init_tracing(cli.log_json, level);

    let mut stdout = std::io::stdout();
    match dispatch(cli, &mut stdout).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(cli: Cli, out: &mut impl Write) -> Result<u8> {
    let service = build_service(cli.workspace);
    execute(cli.command, service, out).await
}

/// Run `command` once the service is built; a setup failure is reported in
/// the shape of the command's own failures.
async fn execute(
    command: Commands,
    service: crew_core::Result<CrewService>,
    out: &mut impl Write,
) -> Result<u8> {
    let json = command.json();
    let service = match service {
        Ok(service) => service,
        Err(e) if matches!(command, Commands::Run(_)) => {
            return report_result(out, &RunResult::failure(&e, 0), json)
        }
        Err(e) => return report_error(out, &e, json),
    };

    match command {
        Commands::List {
            package,
            framework,
            json,
        } => cmd_list(&service, package.as_deref(), framework.as_deref(), json, out),
        Commands::Info {
            package,
            crew,
            json,
        } => cmd_info(&service, &package, &crew, json, out),
        Commands::Run(args) => cmd_run(&service, &args, out).await,
        Commands::ListRunners { json } => cmd_list_runners(&service, json, out),
    }
}

fn build_service(workspace: Option<PathBuf>) -> crew_core::Result<CrewService> {
    let cwd = std::env::current_dir()
        .map_err(|e| CrewError::Configuration(format!("cannot read current directory: {e}")))?;
    let mut settings = Settings::from_env(&cwd)?;
    if let Some(root) = workspace {
        settings.workspace_root = root;
    }
    debug!(workspace = %settings.workspace_root.display(), "settings loaded");
    CrewService::from_settings(&settings)
}

/// `{error, available_packages?}` with `--json`, a plain message otherwise.
fn report_error(out: &mut impl Write, err: &CrewError, json: bool) -> Result<u8> {
    if json {
        let mut body = json!({ "error": err.to_string() });
        if let Some(packages) = err.available_packages() {
            body["available_packages"] = json!(packages);
        }
        write_json(out, &body)?;
    } else {
        eprintln!("Error: {err}");
        if let Some(packages) = err.available_packages() {
            eprintln!("Available packages: {}", packages.join(", "));
        }
    }
    Ok(err.kind().exit_code())
}

fn write_json(out: &mut impl Write, value: &impl serde::Serialize) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

/// `auto` means no preference.
fn parse_framework(name: &str) -> crew_core::Result<Option<EngineKind>> {
    if name.eq_ignore_ascii_case("auto") {
        Ok(None)
    } else {
        name.parse().map(Some)
    }
}

fn cmd_list(
    service: &CrewService,
    package: Option<&str>,
    framework: Option<&str>,
    json: bool,
    out: &mut impl Write,
) -> Result<u8> {
    let listed = framework
        .map(str::parse::<EngineKind>)
        .transpose()
        .and_then(|framework| service.list_crews(package, framework));
    let crews = match listed {
        Ok(crews) => crews,
        Err(e) => return report_error(out, &e, json),
    };

    if json {
        write_json(out, &json!({ "crews": crews }))?;
        return Ok(0);
    }

    if crews.is_empty() {
        writeln!(out, "No crews found")?;
        return Ok(0);
    }

    let mut current: Option<&str> = None;
    for crew in &crews {
        if current != Some(crew.package.as_str()) {
            writeln!(out, "{}", crew.package)?;
            current = Some(crew.package.as_str());
        }
        let framework = crew
            .required_framework
            .map(|engine| format!(" [{engine}]"))
            .unwrap_or_default();
        writeln!(out, "  {}{} - {}", crew.name, framework, crew.description)?;
    }
    Ok(0)
}

fn cmd_info(
    service: &CrewService,
    package: &str,
    crew: &str,
    json: bool,
    out: &mut impl Write,
) -> Result<u8> {
    let info = match service.crew_info(package, crew) {
        Ok(info) => info,
        Err(e) => return report_error(out, &e, json),
    };

    if json {
        write_json(out, &info)?;
        return Ok(0);
    }

    writeln!(out, "Crew: {}/{}", info.package, info.name)?;
    writeln!(out, "Description: {}", info.description)?;
    let framework = info
        .required_framework
        .map(|engine| engine.to_string())
        .unwrap_or_else(|| "any".to_string());
    writeln!(out, "Framework: {framework}")?;

    writeln!(out, "\nAgents:")?;
    for agent in &info.agents {
        writeln!(out, "  - {}: {}", agent.name, agent.role)?;
    }
    writeln!(out, "\nTasks:")?;
    for task in &info.tasks {
        writeln!(out, "  - {}: {}", task.name, task.description)?;
    }
    if !info.knowledge_paths.is_empty() {
        writeln!(out, "\nKnowledge:")?;
        for path in &info.knowledge_paths {
            writeln!(out, "  - {path}")?;
        }
    }
    Ok(0)
}

fn read_input(args: &RunArgs) -> Result<String> {
    match (&args.input, &args.file) {
        (Some(text), _) => Ok(text.clone()),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file {}", path.display())),
        (None, None) => Ok(String::new()),
    }
}

async fn cmd_run(service: &CrewService, args: &RunArgs, out: &mut impl Write) -> Result<u8> {
    let input = match read_input(args) {
        Ok(input) => input,
        Err(e) => {
            let err = CrewError::Configuration(format!("{e:#}"));
            return report_result(out, &RunResult::failure(&err, 0), args.json);
        }
    };

    let result = match (&args.runner, &args.package, &args.crew) {
        (Some(runner), package, _) => {
            let options = RunOptions {
                auto_approve: !args.no_auto_approve,
                ..RunOptions::default()
            };
            service
                .run_single_agent(runner, args.model.clone(), &input, package.as_deref(), options)
                .await
        }
        (None, Some(package), Some(crew)) => match parse_framework(&args.framework) {
            Ok(forced) => {
                let inputs = RunInputs::from_text(&input);
                let timeout = args.timeout.map(Duration::from_secs);
                service
                    .run_crew(package, crew, &inputs, forced, timeout)
                    .await
            }
            Err(e) => RunResult::failure(&e, 0),
        },
        (None, _, _) => RunResult::failure(
            &CrewError::Configuration("run needs <package> <crew>, or --runner".to_string()),
            0,
        ),
    };
    report_result(out, &result, args.json)
}

fn report_result(out: &mut impl Write, result: &RunResult, json: bool) -> Result<u8> {
    if json {
        write_json(out, result)?;
    } else if let Some(output) = result.output() {
        writeln!(out, "{output}")?;
        let used = result.engine_used().or(result.runner()).unwrap_or("unknown");
        eprintln!("Completed with {used} in {}ms", result.duration_ms());
    } else if let Some(error) = result.error() {
        eprintln!("Error: {error}");
        if let Some(packages) = result.available_packages() {
            eprintln!("Available packages: {}", packages.join(", "));
        }
    }
    Ok(result.exit_code())
}

fn cmd_list_runners(service: &CrewService, json: bool, out: &mut impl Write) -> Result<u8> {
    let runners = service.list_runners();

    if json {
        write_json(out, &json!({ "runners": runners }))?;
        return Ok(0);
    }

    for runner in &runners {
        let status = if runner.available {
            "installed"
        } else {
            "not installed"
        };
        writeln!(
            out,
            "{} ({}) [{}] - {}",
            runner.name, runner.display_name, status, runner.description
        )?;
        if !runner.available && !runner.install_cmd.is_empty() {
            writeln!(out, "    install: {}", runner.install_cmd)?;
        }
        if !runner.required_env.is_empty() {
            writeln!(out, "    requires: {}", runner.required_env.join(", "))?;
        }
        if !runner.notes.is_empty() {
            writeln!(out, "    note: {}", runner.notes)?;
        }
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crew_core::HostOverrides;
    use serde_json::Value;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn workspace() -> TempDir {
        let tmp = TempDir::new().unwrap();
        let config_dir = tmp.path().join("packages/otterfall/.crew");
        fs::create_dir_all(config_dir.join("crews/game_builder")).unwrap();
        fs::write(
            config_dir.join("manifest.yaml"),
            "crews:\n  game_builder:\n    description: Builds ECS components\n",
        )
        .unwrap();
        fs::write(
            config_dir.join("crews/game_builder/agents.yaml"),
            "coder:\n  role: Rust Engineer\n  goal: Write code\n  backstory: Writes Rust\n",
        )
        .unwrap();
        fs::write(
            config_dir.join("crews/game_builder/tasks.yaml"),
            "build:\n  description: Build {input}\n  expected_output: Code\n  agent: coder\n",
        )
        .unwrap();
        tmp
    }

    /// Service with a fixed engine set whose hosts are shell one-liners.
    fn service(root: &Path, installed: Vec<EngineKind>) -> CrewService {
        let mut settings = Settings::new(root);
        settings.engines_override = Some(installed);
        let mut overrides = HostOverrides::new();
        for engine in EngineKind::ALL {
            overrides.insert(
                engine,
                vec![
                    "sh".to_string(),
                    "-c".to_string(),
                    format!("cat > /dev/null; echo '{{\"output\": \"{engine} finished\"}}'"),
                ],
            );
        }
        settings.host_overrides = overrides;
        CrewService::from_settings(&settings).unwrap()
    }

    fn run_args(package: &str, crew: &str) -> RunArgs {
        RunArgs {
            package: Some(package.to_string()),
            crew: Some(crew.to_string()),
            input: Some("a HealthComponent".to_string()),
            framework: "auto".to_string(),
            json: true,
            ..RunArgs::default()
        }
    }

    fn parse(buf: &[u8]) -> Value {
        serde_json::from_slice(buf).unwrap()
    }

    #[test]
    fn test_list_json() {
        let tmp = workspace();
        let svc = service(tmp.path(), vec![]);
        let mut buf = Vec::new();

        let code = cmd_list(&svc, None, None, true, &mut buf).unwrap();
        assert_eq!(code, 0);
        assert_eq!(
            parse(&buf),
            json!({"crews": [{
                "package": "otterfall",
                "name": "game_builder",
                "description": "Builds ECS components",
                "required_framework": null,
            }]})
        );
    }

    #[test]
    fn test_list_empty_workspace() {
        let tmp = TempDir::new().unwrap();
        let svc = service(tmp.path(), vec![]);
        let mut buf = Vec::new();

        assert_eq!(cmd_list(&svc, None, None, true, &mut buf).unwrap(), 0);
        assert_eq!(parse(&buf), json!({"crews": []}));
    }

    #[test]
    fn test_list_unknown_framework_is_configuration_error() {
        let tmp = workspace();
        let svc = service(tmp.path(), vec![]);
        let mut buf = Vec::new();
        assert_eq!(cmd_list(&svc, None, Some("autogen"), true, &mut buf).unwrap(), 2);
        assert!(parse(&buf)["error"].is_string());
    }

    #[test]
    fn test_info_human_output() {
        let tmp = workspace();
        let svc = service(tmp.path(), vec![]);
        let mut buf = Vec::new();

        assert_eq!(cmd_info(&svc, "otterfall", "game_builder", false, &mut buf).unwrap(), 0);
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("Crew: otterfall/game_builder"));
        assert!(text.contains("Framework: any"));
        assert!(text.contains("  - coder: Rust Engineer"));
    }

    #[test]
    fn test_info_missing_package() {
        let tmp = workspace();
        let svc = service(tmp.path(), vec![]);
        let mut buf = Vec::new();

        assert_eq!(cmd_info(&svc, "ghost", "game_builder", true, &mut buf).unwrap(), 2);
        assert_eq!(
            parse(&buf),
            json!({"error": "Package 'ghost' not found", "available_packages": ["otterfall"]})
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_success_json() {
        let tmp = workspace();
        let svc = service(tmp.path(), vec![EngineKind::LangGraph]);
        let mut buf = Vec::new();

        let code = cmd_run(&svc, &run_args("otterfall", "game_builder"), &mut buf)
            .await
            .unwrap();
        assert_eq!(code, 0);
        let body = parse(&buf);
        assert_eq!(body["success"], true);
        assert_eq!(body["output"], "langgraph finished");
        assert_eq!(body["framework_used"], "langgraph");
    }

    #[tokio::test]
    async fn test_run_missing_package() {
        let tmp = workspace();
        let svc = service(tmp.path(), vec![EngineKind::CrewAi]);
        let mut buf = Vec::new();

        let code = cmd_run(&svc, &run_args("ghost", "game_builder"), &mut buf)
            .await
            .unwrap();
        assert_eq!(code, 2);
        let body = parse(&buf);
        assert_eq!(body["success"], false);
        assert_eq!(body["available_packages"], json!(["otterfall"]));
        assert_eq!(body["duration_ms"], 0);
    }

    #[tokio::test]
    async fn test_run_forced_framework_not_installed() {
        let tmp = workspace();
        let svc = service(tmp.path(), vec![EngineKind::CrewAi]);
        let mut buf = Vec::new();
        let args = RunArgs {
            framework: "strands".to_string(),
            ..run_args("otterfall", "game_builder")
        };

        assert_eq!(cmd_run(&svc, &args, &mut buf).await.unwrap(), 3);
        assert_eq!(parse(&buf)["success"], false);
    }

    #[tokio::test]
    async fn test_run_without_crew_or_runner() {
        let tmp = workspace();
        let svc = service(tmp.path(), vec![]);
        let mut buf = Vec::new();
        let args = RunArgs {
            crew: None,
            ..run_args("otterfall", "unused")
        };

        assert_eq!(cmd_run(&svc, &args, &mut buf).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_run_unreadable_input_file() {
        let tmp = workspace();
        let svc = service(tmp.path(), vec![EngineKind::CrewAi]);
        let mut buf = Vec::new();
        let args = RunArgs {
            input: None,
            file: Some(tmp.path().join("missing.md")),
            ..run_args("otterfall", "game_builder")
        };

        assert_eq!(cmd_run(&svc, &args, &mut buf).await.unwrap(), 2);
        assert!(parse(&buf)["error"]
            .as_str()
            .unwrap()
            .contains("missing.md"));
    }

    #[tokio::test]
    async fn test_run_unknown_runner() {
        let tmp = workspace();
        let svc = service(tmp.path(), vec![]);
        let mut buf = Vec::new();
        let args = RunArgs {
            runner: Some("cursor".to_string()),
            ..run_args("otterfall", "game_builder")
        };

        assert_eq!(cmd_run(&svc, &args, &mut buf).await.unwrap(), 2);
        assert!(parse(&buf)["error"]
            .as_str()
            .unwrap()
            .contains("Unknown runner"));
    }

    #[tokio::test]
    async fn test_run_setup_failure_keeps_run_shape() {
        let tmp = workspace();
        let mut settings = Settings::new(tmp.path());
        settings.profiles_file = Some(tmp.path().join("missing-profiles.yaml"));
        let broken = CrewService::from_settings(&settings);
        assert!(broken.is_err());

        let mut buf = Vec::new();
        let command = Commands::Run(run_args("otterfall", "game_builder"));
        assert_eq!(execute(command, broken, &mut buf).await.unwrap(), 2);
        let body = parse(&buf);
        assert_eq!(body["success"], false);
        assert_eq!(body["duration_ms"], 0);
        assert!(body["error"]
            .as_str()
            .unwrap()
            .contains("missing-profiles.yaml"));
    }

    #[tokio::test]
    async fn test_list_setup_failure_is_plain_error() {
        let tmp = workspace();
        let broken = Settings::from_lookup(tmp.path(), |key: &str| {
            (key == "AGENTIC_CREW_TIMEOUT_SECS").then(|| "soon".to_string())
        })
        .and_then(|settings| CrewService::from_settings(&settings));

        let mut buf = Vec::new();
        let command = Commands::List {
            package: None,
            framework: None,
            json: true,
        };
        assert_eq!(execute(command, broken, &mut buf).await.unwrap(), 2);
        let body = parse(&buf);
        assert!(body.get("success").is_none());
        assert!(body["error"].as_str().unwrap().contains("whole seconds"));
    }

    #[test]
    fn test_list_runners_json() {
        let tmp = TempDir::new().unwrap();
        let svc = service(tmp.path(), vec![]);
        let mut buf = Vec::new();

        assert_eq!(cmd_list_runners(&svc, true, &mut buf).unwrap(), 0);
        let body = parse(&buf);
        let runners = body["runners"].as_array().unwrap();
        assert_eq!(runners.len(), 4);
        assert_eq!(runners[0]["name"], "aider");
        assert!(runners[0]["available"].is_boolean());
        assert_eq!(runners[0]["required_env"], json!(["ANTHROPIC_API_KEY"]));
        let ollama = runners.iter().find(|r| r["name"] == "ollama").unwrap();
        assert!(ollama["notes"].as_str().unwrap().contains("No API key needed"));
    }

    #[test]
    fn test_parse_framework() {
        assert_eq!(parse_framework("auto").unwrap(), None);
        assert_eq!(parse_framework("crewai").unwrap(), Some(EngineKind::CrewAi));
        assert!(parse_framework("autogen").is_err());
    }

    #[test]
    fn test_cli_parses_run_flags() {
        let cli = Cli::try_parse_from([
            "agentic-crew",
            "run",
            "otterfall",
            "game_builder",
            "--input",
            "x",
            "--framework",
            "strands",
            "--json",
        ])
        .unwrap();
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.framework, "strands");
                assert!(args.json);
            }
            _ => panic!("expected run"),
        }
        assert!(Cli::try_parse_from(["agentic-crew", "run", "--input", "a", "--file", "b"]).is_err());
    }
}
