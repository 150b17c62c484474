use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use hpmdl::error::{CompileError, ErrorCode};
use hpmdl::packager::{ArtifactManifest, MANIFEST_FILE, verify_manifest};
use hpmdl::pipeline::{DEFAULT_MAX_STEPS, DEFAULT_TIME_STEP, DEFAULT_TOLERANCE};
use hpmdl::{ArtifactPackager, AxiomGraph, CompilerOptions};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{code}: {source}")]
    Compile {
        code: &'static str,
        #[source]
        source: CompileError,
    },
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {message}")]
    ServerError { status: String, message: String },
    #[error("artifacts changed since packaging: {}", .0.join(", "))]
    ManifestMismatch(Vec<String>),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

impl From<CompileError> for CliError {
    fn from(source: CompileError) -> Self {
        Self::Compile { code: source.error_code(), source }
    }
}

#[derive(Parser, Debug)]
#[command(name = "apeiron", about = "HPM-DL compiler and APEIRON-X API CLI")]
struct Cli {
    #[arg(long, env = "APEIRON_BASE_URL", default_value = "http://127.0.0.1:3000")]
    base_url: String,

    #[arg(long, env = "APEIRON_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Typecheck and safety-check a source file.
    Check { file: PathBuf },
    /// Compile a source file and package the artifacts into a directory.
    Compile(CompileArgs),
    /// Re-hash a packaged artifact directory against its manifest.
    Verify { dir: PathBuf },
    /// Print the axiom dependency graph.
    Graph {
        file: PathBuf,
        #[arg(long, default_value_t = false)]
        graphml: bool,
    },
    /// Fold a constant expression.
    Eval { expression: String },
    /// Call the compiler API of a running server.
    Remote(RemoteCommand),
    Ping,
}

#[derive(Args, Debug)]
struct CompileArgs {
    file: PathBuf,

    #[arg(long, default_value = "out")]
    out: PathBuf,

    #[command(flatten)]
    options: EvolutionArgs,
}

#[derive(Args, Debug, Clone, Copy)]
struct EvolutionArgs {
    #[arg(long, env = "HPMDL_TIME_STEP", default_value_t = DEFAULT_TIME_STEP)]
    time_step: f64,

    #[arg(long, env = "HPMDL_MAX_STEPS", default_value_t = DEFAULT_MAX_STEPS)]
    max_steps: usize,

    #[arg(long, env = "HPMDL_TOLERANCE", default_value_t = DEFAULT_TOLERANCE)]
    tolerance: f64,
}

impl From<EvolutionArgs> for CompilerOptions {
    fn from(args: EvolutionArgs) -> Self {
        Self { time_step: args.time_step, max_steps: args.max_steps, tolerance: args.tolerance }
    }
}

#[derive(Args, Debug)]
struct RemoteCommand {
    #[command(subcommand)]
    command: RemoteSubcommand,
}

#[derive(Subcommand, Debug)]
enum RemoteSubcommand {
    Check { file: PathBuf },
    Compile { file: PathBuf },
    Graph { file: PathBuf },
}

#[derive(Debug, Clone)]
struct CliContext {
    base_url: String,
    timeout: Duration,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let ctx = CliContext { base_url: cli.base_url, timeout: Duration::from_secs(cli.timeout_secs) };

    match cli.command {
        Command::Check { file } => run_check(&file),
        Command::Compile(args) => run_compile(&args),
        Command::Verify { dir } => run_verify(&dir),
        Command::Graph { file, graphml } => run_graph(&file, graphml),
        Command::Eval { expression } => run_eval(&expression),
        Command::Remote(remote) => run_remote(&ctx, remote).await,
        Command::Ping => run_ping(&ctx).await,
    }
}

// =============================================================================
// LOCAL COMMANDS
// =============================================================================

fn run_check(file: &Path) -> Result<(), CliError> {
    let source = read_source(file)?;
    let report = hpmdl::check(&source)?;
    if !report.safety.is_safe() {
        tracing::warn!(errors = report.safety.errors.len(), "program has safety errors");
    }
    print_json(&serde_json::to_value(&report)?)
}

fn run_compile(args: &CompileArgs) -> Result<(), CliError> {
    let source = read_source(&args.file)?;
    let compiled = hpmdl::compile(&source, &args.options.into())?;
    let manifest = ArtifactPackager::new().package(&args.out, &compiled).map_err(CompileError::from)?;
    tracing::info!(out = %args.out.display(), artifacts = manifest.artifacts.len(), "packaged artifacts");
    print_json(&serde_json::to_value(&manifest)?)
}

fn run_verify(dir: &Path) -> Result<(), CliError> {
    let manifest_path = dir.join(MANIFEST_FILE);
    let raw = read_source(&manifest_path)?;
    let manifest: ArtifactManifest = serde_json::from_str(&raw)?;

    let mismatched = verify_manifest(dir, &manifest);
    if !mismatched.is_empty() {
        return Err(CliError::ManifestMismatch(mismatched));
    }
    println!("ok");
    Ok(())
}

fn run_graph(file: &Path, graphml: bool) -> Result<(), CliError> {
    let source = read_source(file)?;
    let program = hpmdl::parse(&source).map_err(CompileError::from)?;
    let graph = AxiomGraph::from_program(&program);

    if graphml {
        print!("{}", graph.to_graphml());
        return Ok(());
    }
    let order = graph.topological_order().map_err(CompileError::from)?;
    print_json(&serde_json::json!({ "nodes": graph.nodes, "edges": graph.edges, "order": order }))
}

fn run_eval(expression: &str) -> Result<(), CliError> {
    let expr = hpmdl::parse_expression(expression).map_err(CompileError::from)?;
    print_json(&serde_json::json!({ "value": hpmdl::fold_constant(&expr), "variables": expr.variables() }))
}

// =============================================================================
// REMOTE COMMANDS
// =============================================================================

async fn run_remote(cli: &CliContext, remote: RemoteCommand) -> Result<(), CliError> {
    let (path, file) = match remote.command {
        RemoteSubcommand::Check { file } => ("/api/hpm-dl/check", file),
        RemoteSubcommand::Compile { file } => ("/api/hpm-dl/compile", file),
        RemoteSubcommand::Graph { file } => ("/api/axiom-graph", file),
    };
    let source = read_source(&file)?;
    let json = api_post(cli, path, &serde_json::json!({ "source": source })).await?;
    print_json(&json)
}

async fn run_ping(cli: &CliContext) -> Result<(), CliError> {
    let client = http_client(cli)?;
    let url = endpoint(&cli.base_url, "/healthz");
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(CliError::ServerError {
            status: format!("HTTP {}", status.as_u16()),
            message: "health check failed".to_owned(),
        });
    }
    println!("ok");
    Ok(())
}

async fn api_post(cli: &CliContext, path: &str, body: &Value) -> Result<Value, CliError> {
    let client = http_client(cli)?;
    let url = endpoint(&cli.base_url, path);

    let response = client.post(&url).json(body).send().await?;
    let status = response.status();
    let value = response.json::<Value>().await.unwrap_or_else(|_| Value::Null);

    if !status.is_success() {
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .map_or_else(|| value.to_string(), str::to_owned);
        return Err(CliError::ServerError { status: format!("HTTP {}", status.as_u16()), message });
    }

    Ok(value)
}

// =============================================================================
// HELPERS
// =============================================================================

fn http_client(cli: &CliContext) -> Result<reqwest::Client, CliError> {
    Ok(reqwest::Client::builder().timeout(cli.timeout).build()?)
}

fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

fn read_source(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|source| CliError::Io { path: path.display().to_string(), source })
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
