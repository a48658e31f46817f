//! Command implementations

use anyhow::{Context, Result};
use chrono::SecondsFormat;
use clap::Subcommand;
use serde_json::json;
use std::path::PathBuf;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

use nucat_core::catalog::{CatalogEntry, CatalogReader, PageRef, TimeWindow};

use crate::WindowArgs;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List every entry committed in the window
    Entries {
        #[clap(flatten)]
        window: WindowArgs,

        /// Newest commits first
        #[clap(long)]
        desc: bool,

        /// Output as JSON
        #[clap(long)]
        json: bool,
    },

    /// List the latest entry per package id and version
    Rollup {
        #[clap(flatten)]
        window: WindowArgs,

        /// Output as JSON
        #[clap(long)]
        json: bool,
    },

    /// Write the latest id/version pairs as JSON
    Packages {
        #[clap(flatten)]
        window: WindowArgs,

        /// Leave out id/versions whose latest event is a delete
        #[clap(long)]
        exclude_deleted: bool,

        /// Output file (defaults to stdout)
        #[clap(long, short)]
        output: Option<PathBuf>,
    },

    /// Show which catalog pages a window would fetch
    Pages {
        #[clap(flatten)]
        window: WindowArgs,
    },
}

impl Command {
    pub async fn execute(self, reader: &CatalogReader) -> Result<()> {
        match self {
            Command::Entries { window, desc, json } => {
                let entries = match (window.window()?, desc) {
                    (Some(window), false) => reader.get_entries(&window).await?,
                    (None, false) => reader.get_all_entries().await?,
                    (Some(window), true) => reader.get_entries_commit_time_desc(&window).await?,
                    (None, true) => reader.get_all_entries_commit_time_desc().await?,
                };
                print_entries(&entries, json)
            }
            Command::Rollup { window, json } => {
                let entries = match window.window()? {
                    Some(window) => reader.get_rolled_up_entries(&window).await?,
                    None => reader.get_all_rolled_up_entries().await?,
                };
                print_entries(&entries, json)
            }
            Command::Packages {
                window,
                exclude_deleted,
                output,
            } => {
                let mut entries = match window.window()? {
                    Some(window) => reader.get_rolled_up_entries(&window).await?,
                    None => reader.get_all_rolled_up_entries().await?,
                };
                if exclude_deleted {
                    entries.retain(|entry| !entry.is_delete());
                }
                write_packages(entries, output)
            }
            Command::Pages { window } => {
                let window = window.window()?.unwrap_or_else(TimeWindow::full_history);
                let pages = reader.select_pages(&window).await?;
                print_pages(&pages);
                Ok(())
            }
        }
    }
}

/// Table row for catalog entries
#[derive(Tabled)]
struct EntryRow {
    #[tabled(rename = "Committed")]
    committed: String,
    #[tabled(rename = "Id")]
    id: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Event")]
    event: &'static str,
}

impl From<&CatalogEntry> for EntryRow {
    fn from(entry: &CatalogEntry) -> Self {
        Self {
            committed: entry
                .commit_timestamp()
                .to_rfc3339_opts(SecondsFormat::AutoSi, true),
            id: entry.id().to_string(),
            version: entry.version().to_string(),
            event: if entry.is_delete() { "delete" } else { "details" },
        }
    }
}

fn print_entries(entries: &[CatalogEntry], json_output: bool) -> Result<()> {
    if json_output {
        println!("{}", serde_json::to_string_pretty(entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No entries in window.");
        return Ok(());
    }

    let rows: Vec<EntryRow> = entries.iter().map(EntryRow::from).collect();
    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()))
        .to_string();

    println!("{table}");
    println!("{} entries", entries.len());
    Ok(())
}

/// `{"packages": [{"id", "version"}]}`, ordered by id then version
///
/// Each pair keeps the id casing of its own rolled-up entry.
fn packages_document(mut entries: Vec<CatalogEntry>) -> serde_json::Value {
    entries.sort_by_cached_key(|entry| (entry.id().to_lowercase(), entry.version().clone()));

    let items: Vec<serde_json::Value> = entries
        .iter()
        .map(|entry| {
            json!({
                "id": entry.id(),
                "version": entry.version().to_normalized_string(),
            })
        })
        .collect();

    json!({ "packages": items })
}

fn write_packages(entries: Vec<CatalogEntry>, output: Option<PathBuf>) -> Result<()> {
    let count = entries.len();
    let document = serde_json::to_string_pretty(&packages_document(entries))?;

    match output {
        Some(path) => {
            std::fs::write(&path, document)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Wrote {} package versions to {}", count, path.display());
        }
        None => println!("{document}"),
    }
    Ok(())
}

/// Table row for selected pages
#[derive(Tabled)]
struct PageRow {
    #[tabled(rename = "Latest commit")]
    committed: String,
    #[tabled(rename = "Page")]
    uri: String,
}

fn print_pages(pages: &[PageRef]) {
    if pages.is_empty() {
        println!("No pages selected.");
        return;
    }

    let rows: Vec<PageRow> = pages
        .iter()
        .map(|page| PageRow {
            committed: page
                .commit_timestamp
                .to_rfc3339_opts(SecondsFormat::AutoSi, true),
            uri: page.uri.to_string(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()))
        .to_string();

    println!("{table}");
}
