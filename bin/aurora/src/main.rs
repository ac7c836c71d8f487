//! aurora – command-line client for the Aurora conversion service.
//!
//! Startup order:
//! 1. Parse CLI arguments.
//! 2. Load configuration from environment variables.
//! 3. Initialise tracing.
//! 4. Build the identity-decorated transport and run the subcommand.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::info;

use aurora_client::{
    Config, ConvertApi, Engine, FileSessionStore, HistoryStore, IdentityProvider, TaskController,
    TaskState, Transport,
};

#[derive(Parser)]
#[command(
    name = "aurora",
    about = "Convert documents to natural speech via the Aurora service",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Submit a PDF and follow the conversion to completion.
    Convert {
        /// Path to the PDF document.
        file: PathBuf,
        /// Processing engine.
        #[arg(long, default_value = "edge")]
        engine: Engine,
        /// Where to write the finished audio (defaults to the input name
        /// with a `.wav` extension).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List previously completed conversions.
    History,
    /// Download the audio for a previous conversion by id.
    Download {
        id: String,
        #[arg(short, long, default_value = "aurora-audio.wav")]
        output: PathBuf,
    },
    /// Delete every converted file in this session.  Irreversible.
    Clear {
        /// Skip the interactive confirmation.
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = Config::from_env();
    init_tracing(&cfg);

    // One identity file per machine session: repeated invocations in the
    // same session correlate to the same server-side history.
    let store = FileSessionStore::new(std::env::temp_dir().join("aurora-session"));
    let identity = IdentityProvider::new(Arc::new(store));
    let transport = Arc::new(Transport::new(&cfg, identity)?);
    info!(base_url = %cfg.base_url, "aurora client ready");

    match cli.command {
        Command::Convert {
            file,
            engine,
            output,
        } => convert(transport, &cfg, &file, engine, output).await,
        Command::History => history(transport.as_ref()).await,
        Command::Download { id, output } => download(transport.as_ref(), &id, &output).await,
        Command::Clear { yes } => clear(transport.as_ref(), yes).await,
    }
}

async fn convert(
    api: Arc<Transport>,
    cfg: &Config,
    file: &Path,
    engine: Engine,
    output: Option<PathBuf>,
) -> Result<()> {
    let payload = tokio::fs::read(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    let file_name = file
        .file_name()
        .and_then(|n| n.to_str())
        .context("input path has no usable file name")?
        .to_owned();

    let controller = TaskController::new(Arc::clone(&api), cfg);
    let job = controller.submit(&file_name, payload.into(), engine).await?;
    println!("Submitted {} as task {} ({} engine)", file_name, job.task_id, job.engine);

    // Echo log lines as they appear until the job reaches a terminal state.
    let mut printed = 0usize;
    let result = loop {
        for entry in controller.log().await.iter().skip(printed) {
            println!("[{}] {}", entry.timestamp.format("%H:%M:%S"), entry.text);
            printed += 1;
        }
        match controller.state().await {
            TaskState::Completed { result, .. } => break result,
            TaskState::Failed { message, .. } => bail!("conversion failed: {message}"),
            state => {
                let progress = state.progress();
                if progress > 0 {
                    print!("\r{progress:>3}%");
                    use std::io::Write;
                    std::io::stdout().flush().ok();
                }
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
        }
    };
    println!("\rConversion complete: {result}");

    let output = output.unwrap_or_else(|| PathBuf::from(&file_name).with_extension("wav"));
    let audio = api.download(&job.task_id).await?;
    tokio::fs::write(&output, &audio)
        .await
        .with_context(|| format!("failed to write {}", output.display()))?;
    println!("Saved {} bytes to {}", audio.len(), output.display());
    Ok(())
}

async fn history(api: &Transport) -> Result<()> {
    let mut store = HistoryStore::new();
    let items = store.refresh(api).await?;
    if items.is_empty() {
        println!("No conversion history.");
        return Ok(());
    }
    for item in items {
        println!(
            "{}  {:>7.1} MB  {}  {}",
            item.date(),
            item.size_mib(),
            item.id,
            item.filename
        );
    }
    Ok(())
}

async fn download(api: &Transport, id: &str, output: &Path) -> Result<()> {
    let audio = api.download(id).await?;
    tokio::fs::write(output, &audio)
        .await
        .with_context(|| format!("failed to write {}", output.display()))?;
    println!("Saved {} bytes to {}", audio.len(), output.display());
    Ok(())
}

async fn clear(api: &Transport, yes: bool) -> Result<()> {
    if !yes && !confirm("Clear your session history? This deletes every converted file.")? {
        println!("Aborted.");
        return Ok(());
    }
    let mut store = HistoryStore::new();
    store.clear(api).await?;
    println!("Session cleared.");
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    use std::io::Write;
    print!("{prompt} [y/N] ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(matches!(line.trim(), "y" | "Y" | "yes"))
}

/// Build the log-level filter, warning loudly if the configured value is
/// not a valid tracing filter expression.
fn init_tracing(cfg: &Config) {
    let env_filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => match cfg.log_level.parse::<tracing_subscriber::EnvFilter>() {
            Ok(f) => f,
            Err(e) => {
                eprintln!(
                    "WARN: AURORA_LOG='{}' is not a valid tracing filter ({}); \
                     falling back to 'info'",
                    cfg.log_level, e
                );
                tracing_subscriber::EnvFilter::new("info")
            }
        },
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false);

    if cfg.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
