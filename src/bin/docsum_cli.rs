use std::{
    io::Read as _,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow, bail};
use axum::body::Bytes;
use clap::{Parser, Subcommand};
use docsum::{
    config,
    extraction::{ExtractionResult, MediaType},
    logging,
    service::{DocumentApi, DocumentService, build_extractor},
    summarization::{SummaryLength, SummaryResult},
};

#[derive(Parser)]
#[command(
    name = "docsum-cli",
    about = "Extract text from documents and summarize it without running the server"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the text extracted from a PDF, JPEG, or PNG file.
    Extract {
        file: PathBuf,
        /// Emit the full extraction result as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Extract a document and summarize its text.
    Summarize {
        file: PathBuf,
        /// short, medium, or long.
        #[arg(long, default_value = "medium")]
        length: String,
        #[arg(long)]
        json: bool,
    },
    /// Summarize text read from stdin.
    SummarizeText {
        #[arg(long, default_value = "medium")]
        length: String,
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    config::init_config().context("failed to load configuration")?;
    logging::init_cli_tracing();

    match cli.command {
        Command::Extract { file, json } => {
            let extraction = extract_file(&file).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&extraction)?);
            } else {
                println!("{}", extraction.text);
            }
        }
        Command::Summarize { file, length, json } => {
            let extraction = extract_file(&file).await?;
            if extraction.text.trim().is_empty() {
                bail!("no text could be extracted from {}", file.display());
            }
            let summary = summarize(&extraction.text, &length).await?;
            print_summary(&summary, json)?;
        }
        Command::SummarizeText { length, json } => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("failed to read stdin")?;
            let summary = summarize(&text, &length).await?;
            print_summary(&summary, json)?;
        }
    }
    Ok(())
}

async fn extract_file(path: &Path) -> Result<ExtractionResult> {
    let media_type = media_type_for(path)?;
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let extractor = build_extractor(config::get_config());
    extractor
        .extract_as(Bytes::from(bytes), media_type)
        .await
        .with_context(|| format!("failed to extract text from {}", path.display()))
}

async fn summarize(text: &str, length: &str) -> Result<SummaryResult> {
    let service = DocumentService::from_config(config::get_config())
        .context("failed to configure generation provider")?;
    let length = SummaryLength::from_token(Some(length));
    Ok(service.summarize(text, length).await?)
}

fn print_summary(summary: &SummaryResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
    } else {
        println!("{}", summary.summary_text);
        eprintln!(
            "({} summary: {} of {} characters)",
            summary.length, summary.summary_char_count, summary.original_char_count
        );
    }
    Ok(())
}

fn media_type_for(path: &Path) -> Result<MediaType> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .ok_or_else(|| anyhow!("{} has no file extension", path.display()))?;
    match extension.as_str() {
        "pdf" => Ok(MediaType::Pdf),
        "jpg" | "jpeg" => Ok(MediaType::Jpeg),
        "png" => Ok(MediaType::Png),
        other => bail!("unsupported file extension .{other}; expected .pdf, .jpg, or .png"),
    }
}
