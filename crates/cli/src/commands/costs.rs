//! Savings summary CLI commands

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::{AccountSummary, ApiClient};
use crate::output::{format_currency, OutputFormat};

/// Row for the by-kind savings table
#[derive(Tabled)]
struct KindRow {
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Count")]
    count: u64,
    #[tabled(rename = "Potential/mo")]
    potential: String,
}

/// Row for the by-status table
#[derive(Tabled)]
struct StatusRow {
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Count")]
    count: u64,
}

/// Show the account savings summary
pub async fn show_summary(
    client: &ApiClient,
    owner_id: String,
    account_ref: String,
    format: OutputFormat,
) -> Result<()> {
    let path = format!(
        "api/v1/summary?owner_id={}&account_ref={}",
        owner_id, account_ref
    );
    let result: AccountSummary = client.get(&path).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        OutputFormat::Table => {
            println!("{}", "Savings Summary".bold());
            println!("{}", "=".repeat(50));
            println!("Account:                {}", account_ref.cyan());
            println!("Recommendations:        {}", result.total);
            println!();
            println!(
                "{} {}",
                "Potential Savings/mo: ".bold(),
                format_currency(result.potential_monthly_savings, &result.currency)
                    .green()
                    .bold()
            );
            println!(
                "Realized Savings/mo:    {}",
                format_currency(result.realized_monthly_savings, &result.currency).green()
            );

            if !result.by_kind.is_empty() {
                println!();
                println!("{}", "By Kind".bold());
                println!("{}", "-".repeat(50));
                let rows: Vec<KindRow> = result
                    .by_kind
                    .iter()
                    .map(|k| KindRow {
                        kind: k.kind.clone(),
                        count: k.count,
                        potential: format_currency(k.potential_savings, &result.currency),
                    })
                    .collect();
                let table = tabled::Table::new(rows)
                    .with(tabled::settings::Style::rounded())
                    .to_string();
                println!("{}", table);
            }

            if !result.by_status.is_empty() {
                println!();
                println!("{}", "By Status".bold());
                println!("{}", "-".repeat(50));
                let rows: Vec<StatusRow> = result
                    .by_status
                    .iter()
                    .map(|s| StatusRow {
                        status: s.status.clone(),
                        count: s.count,
                    })
                    .collect();
                let table = tabled::Table::new(rows)
                    .with(tabled::settings::Style::rounded())
                    .to_string();
                println!("{}", table);
            }
        }
    }

    Ok(())
}
