use std::{
    fs,
    io::{self, Read},
    path::Path,
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tabled::{settings::Style, Table, Tabled};

use crate::recognition::{Pipeline, PipelineOutcome, Recognizer};

/// LINE rejects image messages above this size, so larger files are not screenshots.
pub const MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Tabled)]
pub struct VenueDisplay {
    #[tabled(rename = "#")]
    pub index: usize,
    #[tabled(rename = "🏪 Name")]
    pub name: String,
    #[tabled(rename = "📍 Address")]
    pub address: String,
    #[tabled(rename = "🔎 Query")]
    pub query: String,
}

pub fn load_image(path: &Path) -> Result<Vec<u8>> {
    let metadata =
        fs::metadata(path).with_context(|| format!("Cannot read {}", path.display()))?;
    if metadata.len() == 0 {
        return Err(anyhow!("{} is empty", path.display()));
    }
    if metadata.len() > MAX_IMAGE_BYTES {
        return Err(anyhow!(
            "{} is {} bytes, larger than the {} byte limit",
            path.display(),
            metadata.len(),
            MAX_IMAGE_BYTES
        ));
    }
    fs::read(path).with_context(|| format!("Cannot read {}", path.display()))
}

/// Raw model text from a file, or stdin when no path (or `-`) is given.
pub fn read_raw_text(path: Option<&Path>) -> Result<String> {
    match path {
        Some(p) if p != Path::new("-") => {
            fs::read_to_string(p).with_context(|| format!("Cannot read {}", p.display()))
        }
        _ => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("Cannot read stdin")?;
            Ok(buffer)
        }
    }
}

pub async fn recognize_with_spinner<R: Recognizer>(
    pipeline: &Pipeline<R>,
    image: &[u8],
) -> PipelineOutcome {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        spinner.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
    }
    spinner.set_message("Recognizing venues...");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let outcome = pipeline.run(image).await;
    spinner.finish_and_clear();
    outcome
}

pub fn venue_rows(outcome: &PipelineOutcome) -> Vec<VenueDisplay> {
    outcome
        .matches()
        .iter()
        .enumerate()
        .map(|(index, venue)| VenueDisplay {
            index: index + 1,
            name: venue.name.clone(),
            address: if venue.address.is_empty() {
                "-".to_string()
            } else {
                venue.address.clone()
            },
            query: venue.query.clone(),
        })
        .collect()
}

pub fn print_outcome(outcome: &PipelineOutcome) {
    match outcome {
        PipelineOutcome::Found(matches) => {
            println!("{}", format!("🏪 Found {} venue(s)", matches.len()).green().bold());
            let mut table = Table::new(venue_rows(outcome));
            table.with(Style::modern());
            println!("{}", table);
            println!();
            for (index, venue) in matches.iter().enumerate() {
                println!("  {} {}", format!("{}.", index + 1).blue(), venue.search_url.underline());
            }
        }
        PipelineOutcome::NotFound(reason) => {
            println!("{} No venue found", "😅".yellow());
            println!("  {} {}", "Reason:".dimmed(), reason.as_str().dimmed());
        }
    }
}
