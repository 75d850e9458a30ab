//! Terminal styling utilities

use console::{style, Emoji};
use std::path::Path;

// Emoji icons with fallbacks for terminals that don't support them
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "[*] ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "[!] ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", ">> ");
pub static CHART: Emoji<'_, '_> = Emoji("📊 ", "");
pub static FOLDER: Emoji<'_, '_> = Emoji("📂 ", "");
pub static TARGET: Emoji<'_, '_> = Emoji("🎯 ", "");

/// Print the application banner
pub fn print_banner(version: &str) {
    println!();
    println!(
        "    {} {}",
        style("staylift").cyan().bold(),
        style(format!("v{}", version)).dim()
    );
    println!(
        "    {}",
        style("Listing pipeline and category comparisons").dim()
    );
    println!("    {}", style("━".repeat(50)).dim());
    println!();
}

/// Print the store / table / outcome card shown before a comparison
pub fn print_compare_config(store: &Path, table: &str, outcome: &str, comparisons: usize) {
    let box_width = 56;
    let line = "─".repeat(box_width - 2);

    println!("    ┌{}┐", line);
    println!("    │ {:<width$}│", style("Configuration").cyan().bold(), width = box_width - 3);
    println!("    ├{}┤", line);
    println!(
        "    │  {}Store:       {:<36}│",
        FOLDER,
        truncate_path(store, 35)
    );
    println!(
        "    │  {}Table:       {:<36}│",
        CHART,
        truncate_string(table, 35)
    );
    println!(
        "    │  {}Outcome:     {:<36}│",
        TARGET,
        truncate_string(outcome, 35)
    );
    println!(
        "    │     Comparisons: {:<36}│",
        style(comparisons).yellow()
    );
    println!("    └{}┘", line);
    println!();
}

/// Print a step header with styling
pub fn print_step_header(step_num: u8, title: &str) {
    println!();
    println!(
        "    {} {} {}",
        style(format!("STEP {}", step_num)).cyan().bold(),
        style("│").dim(),
        style(title).white().bold()
    );
    println!("    {}", style("─".repeat(50)).dim());
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("    {} {}", style("✓").green().bold(), style(message).green());
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("    {} {}", INFO, message);
}

/// Print a warning to stderr
pub fn print_warning(message: &str) {
    eprintln!("    {} {}", WARN, style(message).yellow());
}

/// Print the final completion message
pub fn print_completion(message: &str) {
    println!();
    println!("    {} {}", ROCKET, style(message).green().bold());
    println!();
}

/// Print a styled count message
pub fn print_count(description: &str, count: usize, detail: Option<&str>) {
    if let Some(info) = detail {
        println!(
            "      Found {} {} {}",
            style(count).yellow().bold(),
            description,
            style(info).dim()
        );
    } else {
        println!(
            "      Found {} {}",
            style(count).yellow().bold(),
            description
        );
    }
}

/// Print elapsed time for a step
pub fn print_step_time(elapsed: std::time::Duration) {
    println!(
        "      {}",
        style(format!("completed in {:.2}s", elapsed.as_secs_f64())).dim()
    );
}

// Helper functions

fn truncate_path(path: &Path, max_len: usize) -> String {
    let path_str = path.display().to_string();
    truncate_string(&path_str, max_len)
}

fn truncate_string(s: &str, max_len: usize) -> String {
    let count = s.chars().count();
    if count <= max_len {
        s.to_string()
    } else {
        let tail: String = s.chars().skip(count - max_len + 3).collect();
        format!("...{}", tail)
    }
}
