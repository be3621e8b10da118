mod cleanup;
mod cli;
mod error;
mod models;
mod pipeline;
mod platform;
mod resolver;
mod scrape;
mod selector;
mod transcode;
mod workers;

use std::path::PathBuf;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::{Command, ProgressDisplay};
use error::JobError;
use models::Settings;
use pipeline::Pipeline;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "clipfetch=info,yt_dlp=info".into())
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = Command::from_args(&args) else {
        eprintln!("Please provide a social media URL as an argument");
        eprintln!("{}", cli::USAGE);
        std::process::exit(1);
    };

    let settings = Settings::from_env().context("failed to resolve the working directory")?;
    tracing::info!("Saving to {}", settings.output_dir.display());

    let url = match &command {
        Command::Interactive { url } | Command::Convert { url, .. } => url
    };
    if let Ok(platform) = platform::classify(url) {
        tracing::info!("Detected platform: {}", platform);
    }

    let pipeline = Pipeline::new(settings);
    pipeline.check_tools().await;

    let result = match command {
        Command::Interactive { url } => run_interactive(&pipeline, &url).await,
        Command::Convert { url, format, quality } => {
            println!("Downloading video from: {url}");
            println!("Format: {format}, Quality: {quality}");
            let mut display = ProgressDisplay::default();
            let result = pipeline
                .convert(&url, &format, &quality, |u| display.handle(u))
                .await;
            display.finish();
            result
        }
    };

    match result {
        Ok(path) => println!("Video downloaded successfully: {}", path.display()),
        Err(e) => {
            tracing::error!("Job failed: {}", e);
            eprintln!("Error downloading video: {e}");
        }
    }

    Ok(())
}

async fn run_interactive(pipeline: &Pipeline, url: &str) -> Result<PathBuf, JobError> {
    let inspection = pipeline.inspect(url).await?;
    tracing::info!(
        "{} video and {} audio choices for {}",
        inspection.menu.video_choices().len(),
        inspection.menu.audio_choices().len(),
        inspection.source.platform()
    );
    if inspection.menu.is_empty() {
        tracing::warn!("No selectable format found for {}", inspection.source);
    }

    print!("{}", cli::render_menu(&inspection.catalog.title, &inspection.menu));
    let choice = prompt("Enter format id: ").await?;

    let mut display = ProgressDisplay::default();
    let result = pipeline
        .download(&inspection, &choice, |u| display.handle(u))
        .await;
    display.finish();
    result
}

async fn prompt(message: &str) -> Result<String, JobError> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(message.as_bytes()).await?;
    stdout.flush().await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    Ok(lines.next_line().await?.unwrap_or_default().trim().to_string())
}
