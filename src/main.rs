use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use pipewright::client::IngestClient;
use pipewright::compiler::logstash::LogstashCtx;
use pipewright::compiler::registry::Registry;
use pipewright::compiler::Generator;
use pipewright::config;
use pipewright::events::{self, EventFormat};
use std::io::Write;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "pipewright")]
#[command(about = "Compile declarative pipeline definitions for ingest node or logstash")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Target the Elasticsearch ingest node backend.
    #[command(subcommand)]
    Ingest(IngestCommands),
    /// Target the logstash backend.
    #[command(subcommand)]
    Logstash(LogstashCommands),
}

#[derive(Subcommand, Debug)]
enum IngestCommands {
    /// Print the compiled ingest pipeline as JSON.
    Generate(GenerateArgs),
    /// Compile and run the pipeline on sample events via the simulate API.
    Run(IngestRunArgs),
    /// Compile and install the pipeline on an ingest node.
    Install(InstallArgs),
}

#[derive(Subcommand, Debug)]
enum LogstashCommands {
    /// Print the compiled logstash filter configuration.
    Generate(LogstashGenerateArgs),
    /// Compile the pipeline and feed sample events through a local logstash.
    Run(LogstashRunArgs),
}

#[derive(clap::Args, Debug)]
struct GenerateArgs {
    /// Pipeline definition files, merged in order.
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

#[derive(clap::Args, Debug)]
struct IngestRunArgs {
    #[arg(long, default_value = "http://localhost:9200")]
    host: String,
    /// Sample events file; stdin when omitted.
    #[arg(short = 'i', long = "in")]
    input: Option<PathBuf>,
    #[arg(long, default_value = "plain")]
    format: String,
    /// Ask the simulate API for per-processor results.
    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

#[derive(clap::Args, Debug)]
struct InstallArgs {
    #[arg(long, default_value = "http://localhost:9200")]
    host: String,
    /// Pipeline id to install under.
    id: String,
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

#[derive(clap::Args, Debug)]
struct LogstashGenerateArgs {
    /// Guard the filter with a pipeline id check on [@metadata][pipeline].
    #[arg(long)]
    id: Option<String>,
    /// Insert event debug prints around each filter.
    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,
    /// Do not generate error handling support.
    #[arg(long, action = ArgAction::SetTrue)]
    noerr: bool,
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

#[derive(clap::Args, Debug)]
struct LogstashRunArgs {
    /// Logstash installation directory; $PATH lookup when omitted.
    #[arg(long)]
    lshome: Option<PathBuf>,
    /// Sample events file; stdin when omitted.
    #[arg(short = 'i', long = "in")]
    input: Option<PathBuf>,
    #[arg(long, default_value = "plain")]
    format: String,
    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,
    #[arg(long, action = ArgAction::SetTrue)]
    noerr: bool,
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

    let use_ansi = atty::is(atty::Stream::Stderr);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("pipewright={}", log_level).into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(use_ansi),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Ingest(IngestCommands::Generate(args)) => ingest_generate(args),
        Commands::Ingest(IngestCommands::Run(args)) => ingest_run(args).await,
        Commands::Ingest(IngestCommands::Install(args)) => ingest_install(args).await,
        Commands::Logstash(LogstashCommands::Generate(args)) => logstash_generate(args),
        Commands::Logstash(LogstashCommands::Run(args)) => logstash_run(args).await,
    }
}

fn load_generator(files: &[PathBuf]) -> anyhow::Result<Generator> {
    let spec = config::load_files(files)?;
    let registry = Registry::with_defaults();
    let gen = Generator::new(&registry, &spec.description, &spec.processors)?;
    Ok(gen)
}

fn ingest_generate(args: GenerateArgs) -> anyhow::Result<()> {
    let gen = load_generator(&args.files)?;
    let mut stdout = std::io::stdout().lock();
    gen.make_ingest(&mut stdout)?;
    Ok(())
}

async fn ingest_run(args: IngestRunArgs) -> anyhow::Result<()> {
    let format: EventFormat = args.format.parse()?;
    let gen = load_generator(&args.files)?;
    let pipeline = gen.compile_ingest()?;

    let events = events::read_events(format, args.input.as_deref())?;
    debug!(count = events.len(), "loaded sample events");

    let client = IngestClient::new(&args.host);
    let response = client.simulate(&pipeline, &events, args.verbose).await?;
    println!("{}", response);
    Ok(())
}

async fn ingest_install(args: InstallArgs) -> anyhow::Result<()> {
    let gen = load_generator(&args.files)?;
    let pipeline = gen.compile_ingest()?;

    let client = IngestClient::new(&args.host);
    let response = client.install(&args.id, &pipeline).await?;
    println!("{}", response);
    info!(id = %args.id, host = %args.host, "pipeline installed");
    Ok(())
}

fn logstash_generate(args: LogstashGenerateArgs) -> anyhow::Result<()> {
    let mut gen = load_generator(&args.files)?;
    gen.id = args.id;

    let mut ctx = LogstashCtx::new(args.verbose, args.noerr);
    let mut stdout = std::io::stdout().lock();
    gen.make_logstash(&mut stdout, &mut ctx)?;
    Ok(())
}

async fn logstash_run(args: LogstashRunArgs) -> anyhow::Result<()> {
    let format: EventFormat = args.format.parse()?;
    let gen = load_generator(&args.files)?;

    let mut conf = Vec::new();
    writeln!(conf, "input {{ stdin {{ codec => json }} }}")?;
    writeln!(conf)?;
    let mut ctx = LogstashCtx::new(args.verbose, args.noerr);
    gen.make_logstash(&mut conf, &mut ctx)?;
    writeln!(conf)?;
    writeln!(
        conf,
        "output {{ stdout {{ codec => rubydebug {{ metadata => true }} }} }}"
    )?;

    let mut conf_file = tempfile::Builder::new()
        .prefix("pipewright")
        .suffix(".conf")
        .tempfile()?;
    conf_file.write_all(&conf)?;
    conf_file.flush()?;
    debug!(path = %conf_file.path().display(), "wrote logstash configuration");

    let binary = match &args.lshome {
        Some(home) => home.join("bin").join("logstash"),
        None => PathBuf::from("logstash"),
    };

    let mut child = tokio::process::Command::new(&binary)
        .arg("-f")
        .arg(conf_file.path())
        .stdin(Stdio::piped())
        .spawn()
        .with_context(|| format!("failed to start {}", binary.display()))?;

    let events = events::read_events(format, args.input.as_deref())?;
    info!(count = events.len(), "feeding events to logstash");

    if let Some(mut stdin) = child.stdin.take() {
        for event in &events {
            let mut line = serde_json::to_vec(event)?;
            line.push(b'\n');
            stdin.write_all(&line).await?;
        }
        stdin.shutdown().await?;
    }

    let status = child.wait().await?;
    if !status.success() {
        anyhow::bail!("logstash exited with {}", status);
    }
    Ok(())
}
