// crates/repack-harness-cli/src/main.rs
// ============================================================================
// Module: Repack Harness CLI Entry Point
// Description: Command dispatcher for regression runs and workspace utilities.
// Purpose: Run suites, list scenarios, hash artifacts, and reset workspaces.
// Dependencies: clap, repack-harness-config, repack-harness-core, serde_jcs, thiserror.
// ============================================================================

//! ## Overview
//! The `repack-harness` binary loads configuration, resolves a suite, and
//! drives it through the core [`SuiteDriver`]. Structured events go to stderr
//! (and optionally a log file); human summaries go to stdout. The exit code
//! is success only when every selected scenario passed.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use repack_harness_cli::t;
use repack_harness_config::HarnessConfig;
use repack_harness_core::CheckStatus;
use repack_harness_core::DigestAlgorithm;
use repack_harness_core::EventSink;
use repack_harness_core::FailurePolicy;
use repack_harness_core::FileEventSink;
use repack_harness_core::NoopEventSink;
use repack_harness_core::OutputMode;
use repack_harness_core::ScenarioOutcome;
use repack_harness_core::ScenarioStatus;
use repack_harness_core::StderrEventSink;
use repack_harness_core::SuiteDriver;
use repack_harness_core::SuiteReport;
use repack_harness_core::SuiteSpec;
use repack_harness_core::TeeEventSink;
use repack_harness_core::VerifyMode;
use repack_harness_core::digest_file;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "repack-harness", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a regression suite against the configured tool.
    Run(RunCommand),
    /// List the scenarios and steps of a suite.
    List(ListCommand),
    /// Print artifact digests.
    Digest(DigestCommand),
    /// Delete generated artifacts and the build tree.
    Reset(ResetCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a harness configuration file.
    Validate(ConfigArgs),
}

/// Shared `--config` argument.
#[derive(Args, Debug, Clone)]
struct ConfigArgs {
    /// Optional config file path (defaults to repack-harness.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Arguments for `run`.
#[derive(Args, Debug)]
struct RunCommand {
    /// Config selection.
    #[command(flatten)]
    config: ConfigArgs,
    /// Suite to run (overrides `suite.name`).
    #[arg(long, value_name = "NAME")]
    suite: Option<String>,
    /// Run only the named scenario (repeatable).
    #[arg(long = "scenario", value_name = "NAME")]
    scenarios: Vec<String>,
    /// Stop after the first failing scenario.
    #[arg(long, action = ArgAction::SetTrue)]
    fail_fast: bool,
    /// Record digest mismatches instead of failing.
    #[arg(long, action = ArgAction::SetTrue)]
    record: bool,
    /// Write a canonical JSON report to this path.
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,
    /// Append JSON-line events to this file.
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
    /// Suppress the stderr event stream and tool output.
    #[arg(long, action = ArgAction::SetTrue)]
    quiet: bool,
}

/// Arguments for `list`.
#[derive(Args, Debug)]
struct ListCommand {
    /// Config selection.
    #[command(flatten)]
    config: ConfigArgs,
    /// Suite to list (overrides `suite.name`).
    #[arg(long, value_name = "NAME")]
    suite: Option<String>,
}

/// Arguments for `digest`.
#[derive(Args, Debug)]
struct DigestCommand {
    /// Files to hash.
    #[arg(value_name = "PATH", required = true)]
    paths: Vec<PathBuf>,
    /// Digest algorithm.
    #[arg(long, value_enum, default_value_t = DigestAlgorithmArg::Md5)]
    algorithm: DigestAlgorithmArg,
}

/// Arguments for `reset`.
#[derive(Args, Debug)]
struct ResetCommand {
    /// Config selection.
    #[command(flatten)]
    config: ConfigArgs,
}

/// Digest algorithm selector.
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum DigestAlgorithmArg {
    /// MD5.
    Md5,
    /// SHA-256.
    Sha256,
}

impl From<DigestAlgorithmArg> for DigestAlgorithm {
    fn from(value: DigestAlgorithmArg) -> Self {
        match value {
            DigestAlgorithmArg::Md5 => Self::Md5,
            DigestAlgorithmArg::Sha256 => Self::Sha256,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for catalog-formatted messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`] from a formatted message.
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();

    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        stdout_line(&t!("main.version", version = version))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    match command {
        Commands::Run(command) => command_run(&command),
        Commands::List(command) => command_list(&command),
        Commands::Digest(command) => command_digest(&command),
        Commands::Reset(command) => command_reset(&command),
        Commands::Config {
            command,
        } => match command {
            ConfigCommand::Validate(command) => command_config_validate(&command),
        },
    }
}

/// Prints top-level help.
fn show_help() -> CliResult<()> {
    let help = Cli::command().render_help().to_string();
    stdout_line(help.trim_end())
}

// ============================================================================
// SECTION: Run Command
// ============================================================================

/// Executes the `run` command.
fn command_run(command: &RunCommand) -> CliResult<ExitCode> {
    let mut config = load_config(&command.config)?;
    if command.record {
        config.verify.mode = VerifyMode::Record;
    }
    if command.fail_fast {
        config.suite.policy = FailurePolicy::Halt;
    }
    if command.quiet {
        config.tool.output = OutputMode::Quiet;
    }
    let suite = resolve_suite(&config, command.suite.as_deref())?;
    let events = build_event_sink(command.quiet, command.log_file.as_deref())?;

    let mut driver =
        SuiteDriver::new(config.context(), events).with_policy(config.suite.policy);
    let report = driver
        .run(&suite, &command.scenarios)
        .map_err(|err| CliError::new(t!("run.failed", error = err)))?;

    for line in summary_lines(&report) {
        stdout_line(&line)?;
    }
    if let Some(path) = &command.report {
        write_report(&report, path)?;
        stdout_line(&t!("run.report.written", path = path.display()))?;
    }
    Ok(if report.passed() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Builds the event sink for a run.
fn build_event_sink(quiet: bool, log_file: Option<&Path>) -> CliResult<Arc<dyn EventSink>> {
    let console: Arc<dyn EventSink> =
        if quiet { Arc::new(NoopEventSink) } else { Arc::new(StderrEventSink) };
    let Some(path) = log_file else {
        return Ok(console);
    };
    let file = FileEventSink::new(path).map_err(|err| {
        CliError::new(t!("run.log_open_failed", path = path.display(), error = err))
    })?;
    Ok(Arc::new(TeeEventSink::new(vec![console, Arc::new(file)])))
}

/// Formats the human summary of a suite report.
fn summary_lines(report: &SuiteReport) -> Vec<String> {
    let mut lines = Vec::with_capacity(report.outcomes.len() + 1);
    for outcome in &report.outcomes {
        lines.push(outcome_line(outcome));
        lines.extend(recorded_lines(outcome));
    }
    lines.push(t!(
        "run.summary",
        suite = report.suite,
        passed = report.counts.passed,
        failed = report.counts.failed,
        not_run = report.counts.not_run
    ));
    lines
}

/// Formats one scenario outcome.
fn outcome_line(outcome: &ScenarioOutcome) -> String {
    match (outcome.status, &outcome.failure) {
        (ScenarioStatus::Failed, Some(failure)) => {
            let location = failure.step.map_or_else(
                || t!("run.location.setup"),
                |step| t!("run.location.step", step = step),
            );
            t!(
                "run.scenario.failed",
                name = outcome.name,
                location = location,
                kind = failure.kind,
                message = failure.message
            )
        }
        (ScenarioStatus::NotRun, _) => t!("run.scenario.not_run", name = outcome.name),
        _ => t!(
            "run.scenario.passed",
            name = outcome.name,
            steps = outcome.steps_completed,
            duration_ms = outcome.duration_ms
        ),
    }
}

/// Formats digests recorded instead of enforced.
fn recorded_lines(outcome: &ScenarioOutcome) -> Vec<String> {
    outcome
        .observations
        .iter()
        .filter(|observed| observed.status == CheckStatus::Recorded)
        .map(|observed| {
            t!(
                "run.recorded",
                artifact = observed.artifact,
                step = observed.step,
                digest = observed.digest.as_deref().unwrap_or("-"),
                expected = observed.expected.as_deref().unwrap_or("-")
            )
        })
        .collect()
}

/// Writes the canonical JSON report.
fn write_report(report: &SuiteReport, path: &Path) -> CliResult<()> {
    let mut bytes = serde_jcs::to_vec(report)
        .map_err(|err| CliError::new(t!("run.report.serialize_failed", error = err)))?;
    bytes.push(b'\n');
    fs::write(path, bytes).map_err(|err| {
        CliError::new(t!("run.report.write_failed", path = path.display(), error = err))
    })
}

// ============================================================================
// SECTION: List Command
// ============================================================================

/// Executes the `list` command.
fn command_list(command: &ListCommand) -> CliResult<ExitCode> {
    let config = load_config(&command.config)?;
    let suite = resolve_suite(&config, command.suite.as_deref())?;
    for line in listing_lines(&suite) {
        stdout_line(&line)?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Formats the scenarios and steps of a suite.
fn listing_lines(suite: &SuiteSpec) -> Vec<String> {
    let mut lines = vec![t!("list.suite", suite = suite.name, count = suite.scenarios.len())];
    for scenario in &suite.scenarios {
        lines.push(t!(
            "list.scenario",
            name = scenario.name,
            case = scenario.case,
            finish = scenario.finish.as_str()
        ));
        for fixture in &scenario.fixtures {
            lines.push(t!(
                "list.fixture",
                source = fixture.source,
                destination = fixture.destination
            ));
        }
        for (index, step) in scenario.steps.iter().enumerate() {
            lines.push(t!("list.step", index = index, step = step.label()));
        }
    }
    lines
}

// ============================================================================
// SECTION: Digest Command
// ============================================================================

/// Executes the `digest` command.
fn command_digest(command: &DigestCommand) -> CliResult<ExitCode> {
    let algorithm = DigestAlgorithm::from(command.algorithm);
    for path in &command.paths {
        let digest = digest_file(algorithm, path).map_err(|err| {
            CliError::new(t!("digest.failed", path = path.display(), error = err))
        })?;
        stdout_line(&t!("digest.line", digest = digest.value, path = path.display()))?;
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Reset Command
// ============================================================================

/// Executes the `reset` command.
fn command_reset(command: &ResetCommand) -> CliResult<ExitCode> {
    let config = load_config(&command.config)?;
    let workspace = config.workspace();
    let report =
        workspace.reset().map_err(|err| CliError::new(t!("reset.failed", error = err)))?;
    if report.is_empty() {
        stdout_line(&t!("reset.clean", root = workspace.root().display()))?;
        return Ok(ExitCode::SUCCESS);
    }
    if report.build_tree_removed {
        stdout_line(&t!("reset.removed", entry = format!("{}/", config.workspace.build_dir)))?;
    }
    for entry in &report.removed {
        stdout_line(&t!("reset.removed", entry = entry))?;
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Config Command
// ============================================================================

/// Executes the config validation command.
fn command_config_validate(command: &ConfigArgs) -> CliResult<ExitCode> {
    let config = load_config(command)?;
    let suite = resolve_suite(&config, None)?;
    stdout_line(&t!("config.validate.ok", suite = suite.name, count = suite.scenarios.len()))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Loads and validates configuration.
fn load_config(args: &ConfigArgs) -> CliResult<HarnessConfig> {
    HarnessConfig::load(args.config.as_deref())
        .map_err(|err| CliError::new(t!("config.load_failed", error = err)))
}

/// Resolves and validates the suite to run or list.
fn resolve_suite(config: &HarnessConfig, name: Option<&str>) -> CliResult<SuiteSpec> {
    let suite = config
        .suite_spec(name)
        .map_err(|err| CliError::new(t!("suite.resolve_failed", error = err)))?;
    config
        .validate_suite(&suite)
        .map_err(|err| CliError::new(t!("suite.resolve_failed", error = err)))?;
    Ok(suite)
}

/// Writes a line to stdout, mapping failures to [`CliError`].
fn stdout_line(message: &str) -> CliResult<()> {
    write_stdout_line(message).map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    let stream_label = match stream {
        "stderr" => t!("output.stream.stderr"),
        _ => t!("output.stream.stdout"),
    };
    t!("output.write_failed", stream = stream_label, error = error)
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
