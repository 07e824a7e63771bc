//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Format currency
pub fn format_currency(amount: f64, currency: &str) -> String {
    match currency {
        "USD" => format!("${:.2}", amount),
        "EUR" => format!("€{:.2}", amount),
        "GBP" => format!("£{:.2}", amount),
        _ => format!("{:.2} {}", amount, currency),
    }
}

/// Format a 0-100 percentage
pub fn format_percent(value: f64) -> String {
    format!("{:.0}%", value)
}

/// Color a lifecycle status
pub fn color_status(status: &str) -> String {
    match status {
        "pending" => status.yellow().to_string(),
        "in_progress" => status.blue().to_string(),
        "implemented" => status.green().to_string(),
        "dismissed" => status.dimmed().to_string(),
        "failed" => status.red().to_string(),
        _ => status.to_string(),
    }
}

/// Color a priority level
pub fn color_priority(priority: &str) -> String {
    match priority {
        "critical" => priority.red().bold().to_string(),
        "high" => priority.red().to_string(),
        "medium" => priority.yellow().to_string(),
        "low" => priority.dimmed().to_string(),
        _ => priority.to_string(),
    }
}

/// Truncate an id for table display
pub fn truncate_id(id: &str) -> String {
    if id.len() > 8 {
        format!("{}...", &id[..8])
    } else {
        id.to_string()
    }
}

/// Format an RFC 3339 timestamp for display
pub fn format_timestamp(ts: &str) -> String {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(ts) {
        dt.format("%Y-%m-%d %H:%M").to_string()
    } else {
        ts.to_string()
    }
}
