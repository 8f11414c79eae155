//! Example Mutasibank API client.
//!
//! Lists the registered bank accounts and the statement rows of the last seven days
//! for the first one, then looks for a pending payment amount and validates the match.
//!
//! Run with:
//! ```bash
//! cargo run --example client
//! ```
//!
//! Environment variables (a `.env` file is read if present):
//! - MUTASIBANK_API_TOKEN: API token from the dashboard (required)
//! - MUTASIBANK_REQUEST_TIMEOUT: request timeout in seconds (default: 45)
//! - MATCH_AMOUNT: amount to look for (default: 150000)

use chrono::{Duration, Utc};
use mutasibank::client::{ClientConfig, MutasibankClient};
use mutasibank::types::{ApiResult, MatchQuery};
use serde_json::Value;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let client = MutasibankClient::with_config(ClientConfig::from_env()?)?;
    let amount: u64 = std::env::var("MATCH_AMOUNT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(150_000);

    println!("Mutasibank example client");
    println!("   API: {}", client.base_url());
    println!();

    print_result("User", &client.get_user().await?);

    let accounts = client.get_accounts().await?;
    print_result("Accounts", &accounts);

    let Some(account_id) = first_account_id(&accounts) else {
        println!("No bank account registered yet.");
        return Ok(());
    };

    let today = Utc::now().date_naive();
    let statements = client
        .get_statements(&account_id, today - Duration::days(7), today)
        .await?;
    print_result("Statements (last 7 days)", &statements);

    let query = MatchQuery::new(amount).with_date_from(today - Duration::days(1));
    let matched = client.match_transaction(&account_id, &query).await?;
    print_result(&format!("Match for {}", amount), &matched);

    // Double check the matched row before trusting it.
    let matched_id = matched
        .get("data")
        .and_then(|data| data.get("id"))
        .and_then(id_string);
    if let Some(transaction_id) = matched_id {
        let validation = client.validate_transaction(&transaction_id).await?;
        print_result(&format!("Validation of {}", transaction_id), &validation);
        println!("Confirmed for {}: {}", amount, validation.confirms_transaction(amount));
    }

    Ok(())
}

fn first_account_id(accounts: &ApiResult) -> Option<String> {
    let first = accounts.get("data")?.as_array()?.first()?;
    id_string(first.get("id")?)
}

fn id_string(id: &Value) -> Option<String> {
    match id {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

fn print_result(title: &str, result: &ApiResult) {
    println!("== {} ==", title);
    match result {
        ApiResult::Success(_) => match serde_json::to_string_pretty(&result.to_value()) {
            Ok(pretty) => println!("{}", pretty),
            Err(e) => eprintln!("Could not render response: {}", e),
        },
        ApiResult::Error(err) => {
            eprintln!("Request failed (HTTP {}): {}", err.http_code, err.message)
        }
    }
    println!();
}
