use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand};
use findcode_indexer::discover_source_maps;
use findcode_protocol::{ElementDescriptor, ResolutionResponse};
use findcode_resolver::ResolverSession;
use findcode_search::ScoringProfile;
use findcode_sourcemap::SourceMapRecord;
use serde::Serialize;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod editor;
mod http_api;
mod server;

use editor::EditorCommand;

pub(crate) fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "find-code")]
#[command(about = "Jump from a clicked page element to the source that produced it", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for JSON)
    #[arg(long, global = true)]
    quiet: bool,

    /// Workspace root to resolve against
    #[arg(long, global = true, env = "FIND_CODE_ROOT")]
    root: Option<PathBuf>,

    /// Scoring profile (JSON or TOML) overriding the ranker weights
    #[arg(long, global = true, env = "FIND_CODE_PROFILE")]
    profile: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the WebSocket endpoint (GET /ws) with an HTTP fallback (POST /find-element)
    Serve(ServeArgs),

    /// Resolve one element descriptor and print the result as JSON
    Resolve(ResolveArgs),

    /// List the source maps found under the workspace root
    Maps(MapsArgs),
}

#[derive(Args)]
struct ServeArgs {
    /// Address to listen on
    #[arg(long, env = "FIND_CODE_BIND", default_value = "127.0.0.1:3000")]
    bind: String,

    /// Do not rebuild the source map index when maps change on disk
    #[arg(long)]
    no_watch: bool,

    /// Command that opens a resolved location, e.g. "code --goto {path}:{line}:{column}"
    #[arg(long, env = "FIND_CODE_EDITOR_CMD")]
    editor_cmd: Option<String>,
}

#[derive(Args)]
struct ResolveArgs {
    /// Descriptor JSON file; reads stdin when omitted or "-"
    input: Option<PathBuf>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

#[derive(Args)]
struct MapsArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

pub async fn main_entry() -> Result<()> {
    let mut cli = Cli::parse();

    if matches!(&cli.command, Commands::Maps(args) if args.json) {
        cli.quiet = true;
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let profile = match &cli.profile {
        Some(path) => ScoringProfile::load(path)
            .with_context(|| format!("Failed to load scoring profile {}", path.display()))?,
        None => ScoringProfile::default(),
    };

    match cli.command {
        Commands::Serve(args) => run_serve(cli.root.as_deref(), profile, args).await?,
        Commands::Resolve(args) => run_resolve(cli.root.as_deref(), profile, args).await?,
        Commands::Maps(args) => run_maps(cli.root.as_deref(), args)?,
    }

    Ok(())
}

fn open_session(root: Option<&Path>, profile: ScoringProfile) -> Result<ResolverSession> {
    match root {
        Some(root) => ResolverSession::open(root, profile)
            .with_context(|| format!("Invalid workspace root {}", root.display())),
        None => {
            log::warn!("No workspace root configured (--root or FIND_CODE_ROOT)");
            Ok(ResolverSession::new(profile))
        }
    }
}

async fn run_serve(root: Option<&Path>, profile: ScoringProfile, args: ServeArgs) -> Result<()> {
    let editor = args
        .editor_cmd
        .as_deref()
        .map(EditorCommand::parse)
        .transpose()?;
    let session = Arc::new(open_session(root, profile)?);
    let options = server::ServeOptions {
        bind: args.bind,
        watch: !args.no_watch,
        editor,
    };
    server::serve(session, options).await
}

async fn run_resolve(root: Option<&Path>, profile: ScoringProfile, args: ResolveArgs) -> Result<()> {
    let raw = match args.input.as_deref() {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        _ => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read descriptor from stdin")?;
            buf
        }
    };
    let descriptor: ElementDescriptor =
        serde_json::from_str(&raw).context("Invalid element descriptor JSON")?;

    let session = Arc::new(open_session(root, profile)?);
    let resolution = {
        let session = Arc::clone(&session);
        tokio::task::spawn_blocking(move || session.resolve(&descriptor)).await?
    };
    session.dispose();

    let response = ResolutionResponse::from(resolution);
    let text = if args.pretty {
        serde_json::to_string_pretty(&response)?
    } else {
        serde_json::to_string(&response)?
    };
    print_stdout(&text)?;

    if !response.is_resolved() {
        std::process::exit(1);
    }
    Ok(())
}

#[derive(Serialize)]
struct MapSummary {
    path: String,
    file: Option<String>,
    sources: Vec<String>,
    error: Option<String>,
}

fn run_maps(root: Option<&Path>, args: MapsArgs) -> Result<()> {
    let root = root.context("--root (or FIND_CODE_ROOT) is required")?;
    let root = root
        .canonicalize()
        .with_context(|| format!("Invalid workspace root {}", root.display()))?;

    let summaries: Vec<MapSummary> = discover_source_maps(&root)
        .into_iter()
        .map(|path| {
            let display = path
                .strip_prefix(&root)
                .unwrap_or(&path)
                .to_string_lossy()
                .replace('\\', "/");
            match SourceMapRecord::load(&path) {
                Ok(record) => MapSummary {
                    path: display,
                    file: record.file().map(str::to_string),
                    sources: record.sources().to_vec(),
                    error: None,
                },
                Err(err) => MapSummary {
                    path: display,
                    file: None,
                    sources: Vec::new(),
                    error: Some(err.to_string()),
                },
            }
        })
        .collect();

    if args.json {
        return print_stdout(&serde_json::to_string_pretty(&summaries)?);
    }
    if summaries.is_empty() {
        return print_stdout(&format!("No source maps under {}", root.display()));
    }
    for summary in &summaries {
        match &summary.error {
            Some(err) => print_stdout(&format!("{}  (skipped: {err})", summary.path))?,
            None => {
                print_stdout(&format!(
                    "{}  [{} source(s)]",
                    summary.path,
                    summary.sources.len()
                ))?;
                for source in &summary.sources {
                    print_stdout(&format!("    {source}"))?;
                }
            }
        }
    }
    Ok(())
}
