//! Cloud Cost Optimizer CLI
//!
//! A command-line tool for triggering evaluations, browsing cost
//! recommendations, and driving their lifecycle.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{costs, recommendations};

/// Cloud Cost Optimizer CLI
#[derive(Parser)]
#[command(name = "cco")]
#[command(author, version, about = "CLI for the Cloud Cost Optimizer", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via CCO_API_URL env var);
    /// defaults to http://localhost:8080
    #[arg(long, env = "CCO_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run an evaluation batch for one account
    Evaluate {
        /// Owner (tenant) id
        #[arg(long)]
        owner: Option<String>,

        /// Account reference
        #[arg(long)]
        account: Option<String>,
    },

    /// List resources and recommendations
    #[command(subcommand)]
    Get(GetCommands),

    /// Mark a recommendation implemented
    Implement {
        /// Recommendation ID
        id: String,

        /// Actor recorded on the transition
        #[arg(long, default_value = "cli-user")]
        actor: String,
    },

    /// Dismiss a recommendation (requires a reason)
    Dismiss {
        /// Recommendation ID
        id: String,

        /// Actor recorded on the transition
        #[arg(long, default_value = "cli-user")]
        actor: String,

        /// Reason for dismissal
        #[arg(long)]
        reason: String,
    },

    /// Show the account savings summary
    Summary {
        /// Owner (tenant) id
        #[arg(long)]
        owner: Option<String>,

        /// Account reference
        #[arg(long)]
        account: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum GetCommands {
    /// List cost recommendations
    Recommendations {
        /// Filter by owner id
        #[arg(long)]
        owner: Option<String>,

        /// Filter by account reference
        #[arg(long)]
        account: Option<String>,

        /// Filter by status (pending, in_progress, implemented, dismissed, failed)
        #[arg(long)]
        status: Option<String>,

        /// Filter by service (COMPUTE, OBJECT_STORAGE, RELATIONAL_DB)
        #[arg(long)]
        service: Option<String>,
    },
}

fn require_tenant(
    flag: Option<String>,
    fallback: Option<String>,
    name: &str,
) -> Result<String> {
    flag.or(fallback)
        .ok_or_else(|| anyhow::anyhow!("--{name} is required (or set it in the config file)"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let file_config = config::Config::load().unwrap_or_default();

    // Flag/env wins, then the config file, then the local default
    let api_url = cli
        .api_url
        .clone()
        .or_else(|| file_config.api_url.clone())
        .unwrap_or_else(|| "http://localhost:8080".to_string());
    let client = client::ApiClient::new(&api_url)?;

    match cli.command {
        Commands::Evaluate { owner, account } => {
            let owner = require_tenant(owner, file_config.default_owner.clone(), "owner")?;
            let account = require_tenant(account, file_config.default_account.clone(), "account")?;
            recommendations::run_evaluation(&client, owner, account, cli.format).await?;
        }
        Commands::Get(get_cmd) => match get_cmd {
            GetCommands::Recommendations {
                owner,
                account,
                status,
                service,
            } => {
                recommendations::get_recommendations(
                    &client,
                    owner.or(file_config.default_owner.clone()),
                    account.or(file_config.default_account.clone()),
                    status,
                    service,
                    cli.format,
                )
                .await?;
            }
        },
        Commands::Implement { id, actor } => {
            recommendations::implement_recommendation(&client, &id, &actor, cli.format).await?;
        }
        Commands::Dismiss { id, actor, reason } => {
            recommendations::dismiss_recommendation(&client, &id, &actor, &reason, cli.format)
                .await?;
        }
        Commands::Summary { owner, account } => {
            let owner = require_tenant(owner, file_config.default_owner.clone(), "owner")?;
            let account = require_tenant(account, file_config.default_account.clone(), "account")?;
            costs::show_summary(&client, owner, account, cli.format).await?;
        }
    }

    Ok(())
}
