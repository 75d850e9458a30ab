//! Pipeline run summary

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, Color, Table};
use console::style;

use crate::pipeline::{PipelineRun, StageStatus};

pub fn display_run_summary(run: &PipelineRun) {
    println!();
    println!(
        "    {} {}",
        style("📋").cyan(),
        style("PIPELINE SUMMARY").white().bold()
    );
    println!("    {}", style("─".repeat(50)).dim());
    println!();

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec![
        Cell::new("Stage").add_attribute(Attribute::Bold),
        Cell::new("Status").add_attribute(Attribute::Bold),
        Cell::new("Tables").add_attribute(Attribute::Bold),
        Cell::new("Time").add_attribute(Attribute::Bold),
    ]);

    for stage in &run.stages {
        let (status, detail) = match &stage.status {
            StageStatus::Completed { statements, tables } => (
                Cell::new(format!("✅ {} statements", statements)).fg(Color::Green),
                tables.join(", "),
            ),
            StageStatus::Skipped { reason } => {
                (Cell::new("⚠️  skipped").fg(Color::Yellow), reason.clone())
            }
        };
        table.add_row(vec![
            Cell::new(&stage.name),
            status,
            Cell::new(detail),
            Cell::new(format!("{:.2}s", stage.elapsed.as_secs_f64())),
        ]);
    }

    for line in table.to_string().lines() {
        println!("    {}", line);
    }

    println!();
    println!(
        "      {} completed, {} skipped, store generation {}",
        style(run.completed()).green().bold(),
        style(run.skipped()).yellow().bold(),
        style(run.generation).cyan()
    );
}
