//! carousel-dl CLI
//!
//! Opens the target post in a visible browser, waits for the operator to log
//! in and position the carousel, then downloads every distinct image.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use carousel_dl::{
    referer_origin, BrowserSession, CarouselWalker, GrabConfig, ImageFetcher, StopReason,
    WalkSummary,
};

#[derive(Parser)]
#[command(name = "carousel-dl")]
#[command(about = "Download every distinct image from a social-media photo carousel")]
#[command(version)]
struct Cli {
    /// URL of the post whose photo carousel should be walked
    url: String,

    /// Output directory for downloaded images
    #[arg(short, long, default_value = "./downloaded_images")]
    output_dir: PathBuf,

    /// Stop after this many images (hard safety cap)
    #[arg(long, default_value = "200")]
    max_images: usize,

    /// Seconds to wait after each carousel advance
    #[arg(long, default_value = "2.0")]
    navigate_delay: f64,

    /// Seconds to keep polling for the main image to load
    #[arg(long, default_value = "8")]
    image_load_timeout: u64,

    /// Seconds before a full download times out
    #[arg(long, default_value = "20")]
    download_timeout: u64,

    /// Consecutive unchanged-image checks before stopping
    #[arg(long, default_value = "3")]
    stale_threshold: u32,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = GrabConfig::builder()
        .target_url(&cli.url)
        .output_dir(cli.output_dir)
        .max_images(cli.max_images)
        .navigate_delay_secs(cli.navigate_delay)
        .image_load_timeout_secs(cli.image_load_timeout)
        .download_timeout_secs(cli.download_timeout)
        .stale_threshold(cli.stale_threshold)
        .build();

    // Fail on an unusable URL before a browser ever launches
    let referer = referer_origin(&config.target_url)?;

    let session = BrowserSession::launch(&config).await?;

    // The browser must be torn down on every path past this point
    let result = run(&session, &config, &referer).await;
    session.close().await;
    let summary = result?;

    println!("\n{}", "=".repeat(60));
    println!(
        "DONE! Downloaded {} images to '{}'",
        summary.downloaded,
        config.output_dir.display()
    );
    println!("{}", "=".repeat(60));

    Ok(())
}

/// Everything between browser launch and teardown.
async fn run(
    session: &BrowserSession,
    config: &GrabConfig,
    referer: &str,
) -> Result<WalkSummary> {
    print_instructions();
    wait_for_operator()?;

    std::fs::create_dir_all(&config.output_dir)?;

    // Auth cookies let the HTTP fetchers resolve high-res images
    let cookies = session.cookie_jar().await?;
    let fetcher = ImageFetcher::new(config, &cookies, referer)?;

    println!(
        "\nStarting download (max {} images)...\n",
        config.max_images
    );

    let mut walker = CarouselWalker::new(config.clone());
    let summary = walker.run(session, &fetcher).await?;

    match summary.reason {
        StopReason::NoImageFound => info!("Stopped: no image found"),
        StopReason::CarouselExhausted => info!("Stopped: carousel exhausted"),
        StopReason::MaxImagesReached => {
            println!(
                "\nReached the configured maximum of {} images.",
                config.max_images
            )
        }
    }

    Ok(summary)
}

fn print_instructions() {
    println!("\n{}", "=".repeat(60));
    println!("{}", "INSTRUCTIONS:".bold());
    println!("  1. Log in to the site if prompted.");
    println!("  2. Make sure the FIRST image of the post is open");
    println!("     in the photo viewer (the lightbox overlay).");
    println!("  3. Press ENTER in this terminal to start downloading.");
    println!("{}", "=".repeat(60));
}

/// Block until the operator confirms the carousel is positioned.
fn wait_for_operator() -> Result<()> {
    dialoguer::Input::<String>::new()
        .with_prompt(">>> Press ENTER when ready")
        .allow_empty(true)
        .interact_text()?;
    Ok(())
}
