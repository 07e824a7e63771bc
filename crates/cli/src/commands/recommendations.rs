//! Recommendation-related CLI commands

use anyhow::Result;
use tabled::Tabled;

use crate::client::{
    ApiClient, DismissRequest, EvaluationRequest, EvaluationSummary, ImplementRequest,
    Recommendation, RecommendationList,
};
use crate::output::{
    color_priority, color_status, format_currency, format_percent, format_timestamp,
    print_success, print_warning, truncate_id, OutputFormat,
};

/// Row for the recommendations table
#[derive(Tabled)]
struct RecommendationRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Resource")]
    resource: String,
    #[tabled(rename = "Service")]
    service: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Savings/mo")]
    savings: String,
    #[tabled(rename = "Savings %")]
    savings_pct: String,
    #[tabled(rename = "Priority")]
    priority: String,
    #[tabled(rename = "Risk")]
    risk: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Created")]
    created: String,
}

/// Trigger an evaluation batch for one account
pub async fn run_evaluation(
    client: &ApiClient,
    owner_id: String,
    account_ref: String,
    format: OutputFormat,
) -> Result<()> {
    let request = EvaluationRequest {
        owner_id,
        account_ref,
    };
    let summary: EvaluationSummary = client.post("api/v1/evaluations", &request).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        OutputFormat::Table => {
            print_success("Evaluation completed");
            println!("Created:    {}", summary.created);
            println!("Updated:    {}", summary.updated);
            println!("Unchanged:  {}", summary.unchanged);
            println!("Skipped:    {}", summary.skipped);
            if summary.failed > 0 {
                print_warning(&format!("{} resources failed to persist", summary.failed));
            }
        }
    }

    Ok(())
}

/// List recommendations with optional filters
pub async fn get_recommendations(
    client: &ApiClient,
    owner_id: Option<String>,
    account_ref: Option<String>,
    status: Option<String>,
    service: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let mut query = Vec::new();
    if let Some(owner) = &owner_id {
        query.push(format!("owner_id={owner}"));
    }
    if let Some(account) = &account_ref {
        query.push(format!("account_ref={account}"));
    }
    if let Some(status) = &status {
        query.push(format!("status={status}"));
    }
    if let Some(service) = &service {
        query.push(format!("service={service}"));
    }
    let path = if query.is_empty() {
        "api/v1/recommendations".to_string()
    } else {
        format!("api/v1/recommendations?{}", query.join("&"))
    };

    let result: RecommendationList = client.get(&path).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&result.recommendations)?);
        }
        OutputFormat::Table => {
            if result.recommendations.is_empty() {
                print_warning("No recommendations found");
                return Ok(());
            }

            let rows: Vec<RecommendationRow> = result
                .recommendations
                .iter()
                .map(|r| RecommendationRow {
                    id: truncate_id(&r.id),
                    resource: r.resource_id.clone(),
                    service: r.service.clone(),
                    kind: r.kind.clone(),
                    savings: format_currency(
                        r.estimated_savings.amount,
                        &r.estimated_savings.currency,
                    ),
                    savings_pct: format_percent(r.estimated_savings.percentage),
                    priority: color_priority(&r.priority),
                    risk: r.risk_level.clone(),
                    status: color_status(&r.status),
                    created: format_timestamp(&r.created_at),
                })
                .collect();

            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
            println!("\nTotal: {} recommendations", result.total);
        }
    }

    Ok(())
}

/// Mark a recommendation implemented
pub async fn implement_recommendation(
    client: &ApiClient,
    id: &str,
    actor: &str,
    format: OutputFormat,
) -> Result<()> {
    let path = format!("api/v1/recommendations/{}/implement", id);
    let request = ImplementRequest {
        actor: actor.to_string(),
    };

    let updated: Recommendation = client.post(&path, &request).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&updated)?);
        }
        OutputFormat::Table => {
            print_success(&format!("Recommendation {} implemented", truncate_id(id)));
            println!("Title:   {}", updated.title);
            println!(
                "Savings: {}/month",
                format_currency(updated.estimated_savings.amount, &updated.estimated_savings.currency)
            );
        }
    }

    Ok(())
}

/// Dismiss a recommendation with a reason
pub async fn dismiss_recommendation(
    client: &ApiClient,
    id: &str,
    actor: &str,
    reason: &str,
    format: OutputFormat,
) -> Result<()> {
    let path = format!("api/v1/recommendations/{}/dismiss", id);
    let request = DismissRequest {
        actor: actor.to_string(),
        reason: reason.to_string(),
    };

    let updated: Recommendation = client.post(&path, &request).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&updated)?);
        }
        OutputFormat::Table => {
            print_success(&format!("Recommendation {} dismissed", truncate_id(id)));
            println!("Title:  {}", updated.title);
            if let Some(reason) = &updated.dismissal_reason {
                println!("Reason: {}", reason);
            }
        }
    }

    Ok(())
}
