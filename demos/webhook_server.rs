//! Example Mutasibank webhook receiver using Axum.
//!
//! Verifies incoming deliveries, double checks every credit with the API, and
//! marks the referenced order as paid.
//!
//! Run with:
//! ```bash
//! cargo run --example webhook_server
//! ```
//!
//! Environment variables (a `.env` file is read if present):
//! - MUTASIBANK_WEBHOOK_SECRET: webhook secret from the dashboard (required)
//! - MUTASIBANK_API_TOKEN: API token from the dashboard (required)
//! - MUTASIBANK_TIMESTAMP_TOLERANCE: accepted clock skew in seconds (default: 300)
//! - PORT: server port (default: 3000)

use async_trait::async_trait;
use axum::{response::IntoResponse, routing::get, Json, Router};
use mutasibank::client::{ClientConfig, MutasibankClient};
use mutasibank::server::{webhook_router, WEBHOOK_PATH};
use mutasibank::types::{TransactionRecord, WebhookEnvelope};
use mutasibank::utils::extract_order_reference;
use mutasibank::webhook::{DedupingHandler, TransactionHandler, WebhookConfig, WebhookVerifier};
use mutasibank::{MutasibankError, Result};
use serde_json::json;
use std::sync::Arc;

/// Marks orders as paid when a matching credit arrives.
struct OrderPayments {
    client: MutasibankClient,
}

#[async_trait]
impl TransactionHandler for OrderPayments {
    async fn handle(
        &self,
        envelope: &WebhookEnvelope,
        transaction: &TransactionRecord,
    ) -> Result<()> {
        if !transaction.is_credit() {
            tracing::info!(
                transaction_id = %transaction.id,
                amount = transaction.amount,
                "Ignoring debit"
            );
            return Ok(());
        }

        let Some(order) = extract_order_reference(&transaction.description) else {
            tracing::info!(
                transaction_id = %transaction.id,
                description = %transaction.description,
                "Credit without order reference"
            );
            return Ok(());
        };

        let validation = self.client.validate_transaction(&transaction.id).await?;
        // Only a credit the API confirms with the same amount settles an order.
        if !validation.confirms_transaction(transaction.amount) {
            return Err(MutasibankError::Handler(format!(
                "transaction {} of {} was not confirmed by the API",
                transaction.id, transaction.amount
            )));
        }

        // A real shop would update its order table here.
        tracing::info!(
            %order,
            amount = transaction.amount,
            bank = %envelope.module,
            account = %envelope.account_number,
            "Order paid"
        );
        Ok(())
    }
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "mutasibank-webhook",
    }))
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let verifier = WebhookVerifier::new(WebhookConfig::from_env()?)?;
    let client = MutasibankClient::with_config(ClientConfig::from_env()?)?;
    let handler = DedupingHandler::new(OrderPayments { client });

    let app = Router::new()
        .route("/health", get(health_handler))
        .merge(webhook_router(Arc::new(verifier), Arc::new(handler)));

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("0.0.0.0:{}", port);

    tracing::info!("Mutasibank webhook receiver listening on {}", addr);
    tracing::info!("  POST {} - webhook deliveries", WEBHOOK_PATH);
    tracing::info!("  GET  /health - health check");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
