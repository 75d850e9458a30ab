//! `status` command - store tables and last run

use std::path::Path;

use anyhow::{Context, Result};
use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, Color, Table};
use console::style;

use crate::pipeline::{RunStatus, StageOutcomeKind, TableStore};

pub fn run_status(store_dir: &Path) -> Result<()> {
    let store = TableStore::open(store_dir)
        .with_context(|| format!("Failed to open store {}", store_dir.display()))?;

    println!();
    println!(
        "    {} {} {}",
        style("📂").cyan(),
        style("STORE").white().bold(),
        style(store_dir.display()).dim()
    );
    println!("    {}", style("─".repeat(50)).dim());
    println!("      Generation: {}", style(store.generation()).cyan());
    println!();

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec![
        Cell::new("Table").add_attribute(Attribute::Bold),
        Cell::new("Rows").add_attribute(Attribute::Bold),
        Cell::new("Columns").add_attribute(Attribute::Bold),
        Cell::new("Kind").add_attribute(Attribute::Bold),
    ]);
    for name in store.table_names() {
        let df = store.table(&name)?;
        let kind = if store.is_source(&name) {
            Cell::new("source").fg(Color::Cyan)
        } else {
            Cell::new("derived")
        };
        table.add_row(vec![
            Cell::new(&name),
            Cell::new(df.height()),
            Cell::new(df.width()),
            kind,
        ]);
    }
    for line in table.to_string().lines() {
        println!("    {}", line);
    }

    println!();
    match store.last_run() {
        None => println!("      {}", style("The pipeline has not been run on the current listings").dim()),
        Some(run) => {
            let status = match &run.status {
                RunStatus::Succeeded => style("succeeded".to_string()).green().bold(),
                RunStatus::Failed { stage, message } => {
                    style(format!("failed at '{}': {}", stage, message)).red().bold()
                }
            };
            println!("      Last run: {}", status);
            println!("      Started:  {}", style(&run.started_at).dim());
            println!("      Finished: {}", style(&run.finished_at).dim());
            for stage in &run.stages {
                let marker = match stage.outcome {
                    StageOutcomeKind::Completed => style("✓").green(),
                    StageOutcomeKind::Skipped => style("-").yellow(),
                    StageOutcomeKind::Failed => style("✗").red(),
                };
                println!("        {} {}", marker, stage.name);
            }
        }
    }
    println!();
    Ok(())
}
