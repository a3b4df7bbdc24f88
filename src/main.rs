mod browse;
mod browser;
mod config;
mod dataset;
mod extract;
mod search;

use std::time::Instant;

use clap::{Parser, Subcommand};
use scraper::Html;

use crate::config::Settings;
use crate::dataset::Device;
use crate::extract::PageShape;

#[derive(Parser)]
#[command(name = "tonedex", about = "Scrape and search the Spark amp & effect model catalog")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the source page headlessly and rebuild the local dataset
    Scrape,
    /// One-shot search of the local dataset
    Search {
        /// Matched against name, category and based-on; omit to list everything
        query: Option<String>,
    },
    /// Interactive live-filtering search
    Browse,
    /// Dataset totals per category
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load()?;

    let result = match cli.command {
        Commands::Scrape => scrape(&settings).await,
        Commands::Search { query } => run_search(&settings, query.as_deref().unwrap_or("")),
        Commands::Browse => {
            let devices = dataset::load(&settings.dataset_path)?;
            browse::run(devices, &settings)
        }
        Commands::Stats => stats(&settings),
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {:.1}s", elapsed.as_secs_f64());
    }

    result
}

async fn scrape(settings: &Settings) -> anyhow::Result<()> {
    // Bad selector config fails before the browser launches.
    let shape = PageShape::new(&settings.selectors)?;

    let html = browser::fetch_rendered(settings).await?;
    let doc = Html::parse_document(&html);
    let devices = extract::devices(&doc, &shape);

    dataset::save(&settings.dataset_path, &devices)?;
    println!(
        "Saved {} devices to {}",
        devices.len(),
        settings.dataset_path.display()
    );
    print_category_table(&devices);
    Ok(())
}

fn run_search(settings: &Settings, query: &str) -> anyhow::Result<()> {
    let devices = dataset::load(&settings.dataset_path)?;
    let matches = search::filter(&devices, query);
    if matches.is_empty() {
        println!("No devices match {:?}.", query);
        return Ok(());
    }

    let total = matches.len();
    for group in search::group(matches) {
        println!("\n{} ({})", group.category, group.devices.len());
        for device in &group.devices {
            match device.reference() {
                Some(reference) => {
                    println!("  {:<28} {}", truncate(&device.name, 28), reference)
                }
                None => println!("  {}", device.name),
            }
        }
    }
    println!("\n{} devices", total);
    Ok(())
}

fn stats(settings: &Settings) -> anyhow::Result<()> {
    let devices = dataset::load(&settings.dataset_path)?;
    println!("Total: {} devices", devices.len());
    print_category_table(&devices);
    Ok(())
}

fn print_category_table(devices: &[Device]) {
    let counts = dataset::category_counts(devices);
    if counts.is_empty() {
        return;
    }
    let width = counts
        .iter()
        .map(|(category, _)| category.chars().count())
        .max()
        .unwrap_or(0)
        .max("Category".len());

    println!("\n{:<width$} | {:>5}", "Category", "Count");
    println!("{}", "-".repeat(width + 8));
    for (category, count) in &counts {
        println!("{:<width$} | {:>5}", category, count);
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}
