//! manifest-diff CLI entrypoint.
//!
//! This is the main entrypoint for the manifest-diff command-line tool.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use manifest_diff::cli::{Cli, Commands, LogFormat, OutputFormatter};
use manifest_diff::config::{ConfigParser, ConfigValidator, ToolConfig};
use manifest_diff::error::{ConfigError, ManifestDiffError, Result};
use manifest_diff::exec::{
    CancellationReason, CancellationSource, CancellationToken, LineExecutor,
};
use manifest_diff::manifest::ResourceCollection;
use manifest_diff::vcs::GitCli;
use manifest_diff::workflow::Workflow;

use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Exit status when resources changed and `--exit-code` was given.
const EXIT_CHANGES: u8 = 2;

/// How a successful command ended.
enum Outcome {
    /// Nothing to report.
    Done,
    /// A diff ran; `true` when it found changes that should fail the process.
    Diffed(bool),
}

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose, cli.log_format);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(Outcome::Diffed(true)) => ExitCode::from(EXIT_CHANGES),
        Ok(Outcome::Done | Outcome::Diffed(false)) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system on stderr.
fn init_logging(verbose: bool, format: LogFormat) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<Outcome> {
    let formatter = OutputFormatter::new(cli.output);
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Diff {
            base_ref,
            head_ref,
            dir,
            exit_code,
        } => {
            cmd_diff(config_path, base_ref, head_ref, dir, exit_code, &formatter).await
        }
        Commands::Compare {
            base,
            head,
            exit_code,
        } => cmd_compare(config_path, &base, &head, exit_code, &formatter),
        Commands::Parse { file } => cmd_parse(config_path, &file, &formatter),
        Commands::Render { dir } => cmd_render(config_path, dir).await,
        Commands::Validate { warnings, strict } => {
            cmd_validate(config_path, warnings, strict, &formatter)
        }
        Commands::Init { path, force } => cmd_init(&path, force),
    }
}

/// Render both revisions and diff them.
async fn cmd_diff(
    config_path: Option<&Path>,
    base_ref: Option<String>,
    head_ref: Option<String>,
    dir: Option<PathBuf>,
    exit_code: bool,
    formatter: &OutputFormatter,
) -> Result<Outcome> {
    let base_ref = required_ref(base_ref, "GITHUB_BASE_REF")?;
    let head_ref = required_ref(head_ref, "GITHUB_HEAD_REF")?;
    let config = load_config(config_path)?;

    let token = cancel_on_ctrl_c();
    let mut git = GitCli::new(&config.vcs)
        .with_executor(LineExecutor::new().with_cancellation(token.clone()));
    if let Some(dir) = &dir {
        git = git.with_work_dir(dir);
    }

    let mut workflow = Workflow::new(&git, &config)?.with_cancellation(token);
    if let Some(dir) = dir {
        workflow = workflow.with_render_dir(dir);
    }

    let report = workflow.run(&base_ref, &head_ref).await?;
    emit(&formatter.format_report(&report)?)?;

    Ok(Outcome::Diffed(exit_code && !report.summary.is_empty()))
}

/// Diff two rendered files.
fn cmd_compare(
    config_path: Option<&Path>,
    base: &Path,
    head: &Path,
    exit_code: bool,
    formatter: &OutputFormatter,
) -> Result<Outcome> {
    let config = load_config(config_path)?;
    let parser = config.registry.parser()?;

    let load = |path: &Path| -> Result<ResourceCollection> {
        debug!("Reading manifests from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Ok(parser.parse(&content)?)
    };

    let summary = config.diff.engine().compute_from(load(base), load(head))?;
    info!("{summary}");
    emit(&formatter.format_summary(&summary)?)?;

    Ok(Outcome::Diffed(exit_code && !summary.is_empty()))
}

/// List the resources decoded from a file.
fn cmd_parse(
    config_path: Option<&Path>,
    file: &Path,
    formatter: &OutputFormatter,
) -> Result<Outcome> {
    let config = load_config(config_path)?;
    let parser = config.registry.parser()?;

    let content = std::fs::read_to_string(file)?;
    let report = parser.parse_report(&content)?;
    if report.skipped > 0 {
        warn!("{} document(s) in {} were skipped", report.skipped, file.display());
    }

    emit(&formatter.format_resources(&report)?)?;
    Ok(Outcome::Done)
}

/// Run the render command, streaming its output.
async fn cmd_render(config_path: Option<&Path>, dir: Option<PathBuf>) -> Result<Outcome> {
    let config = load_config(config_path)?;
    let executor = config.render.executor().with_cancellation(cancel_on_ctrl_c());

    let mut invocation = config.render.template().invocation();
    if let Some(dir) = dir {
        invocation = invocation.current_dir(dir);
    }
    info!("Rendering with: {invocation}");

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut write_error = None;
    executor
        .run(&invocation, |line| {
            if write_error.is_none() {
                if let Err(e) = writeln!(out, "{line}") {
                    write_error = Some(e);
                }
            }
        })
        .await?;

    match write_error {
        Some(e) => Err(e.into()),
        None => Ok(Outcome::Done),
    }
}

/// Validate configuration.
fn cmd_validate(
    config_path: Option<&Path>,
    show_warnings: bool,
    strict: bool,
    formatter: &OutputFormatter,
) -> Result<Outcome> {
    let config = read_config(config_path)?;

    let validator = ConfigValidator::new().strict(strict);
    let result = validator.check(&config);
    emit(&formatter.format_validation(&result, show_warnings || strict)?)?;

    validator.validate(&config)?;
    Ok(Outcome::Done)
}

/// Write a default configuration file.
fn cmd_init(path: &Path, force: bool) -> Result<Outcome> {
    info!("Initializing manifest-diff configuration in: {}", path.display());

    let config_path = path.join("manifest-diff.yaml");
    let env_path = path.join(".env.example");

    if !force && config_path.exists() {
        eprintln!("Configuration file already exists: {}", config_path.display());
        eprintln!("Use --force to overwrite.");
        return Ok(Outcome::Done);
    }

    // Create directory if needed
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }

    let config_template = include_str!("../templates/manifest-diff.yaml");
    std::fs::write(&config_path, config_template)?;
    eprintln!("Created: {}", config_path.display());

    let env_template = include_str!("../templates/.env.example");
    std::fs::write(&env_path, env_template)?;
    eprintln!("Created: {}", env_path.display());

    eprintln!("\nNext steps:");
    eprintln!("  1. Set render.program and render.args to your build command");
    eprintln!("  2. Run 'manifest-diff validate' to check the configuration");
    eprintln!("  3. Run 'manifest-diff diff --base-ref main --head-ref <branch>'");

    Ok(Outcome::Done)
}

// Helper functions

/// Reads the configuration file (if any) and environment overrides.
fn read_config(config_path: Option<&Path>) -> Result<ToolConfig> {
    let base = config_path
        .and_then(Path::parent)
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

    let parser = ConfigParser::new().with_base_path(base);
    parser.load_dotenv()?;
    parser.load_with_env(config_path)
}

/// Reads and validates the configuration.
fn load_config(config_path: Option<&Path>) -> Result<ToolConfig> {
    let config = read_config(config_path)?;
    let result = ConfigValidator::new().validate(&config)?;
    for warning in &result.warnings {
        warn!("{warning}");
    }
    Ok(config)
}

fn required_ref(value: Option<String>, env_name: &str) -> Result<String> {
    value.filter(|v| !v.trim().is_empty()).ok_or_else(|| {
        ManifestDiffError::Config(ConfigError::MissingEnvVar {
            name: env_name.to_string(),
        })
    })
}

/// Returns a token cancelled when Ctrl-C is received.
fn cancel_on_ctrl_c() -> CancellationToken {
    let source = CancellationSource::new();
    let token = source.token();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping running commands");
            source.cancel(CancellationReason::UserCancel);
        }
    });

    token
}

/// Writes command output to stdout.
fn emit(text: &str) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    out.write_all(text.as_bytes())?;
    if !text.ends_with('\n') {
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}
