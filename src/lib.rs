//! # mutasibank-rs
//!
//! A Rust client for the [Mutasibank](https://mutasibank.co.id) bank-statement monitoring
//! service, together with a verifier for the webhooks it sends.
//!
//! Mutasibank logs into Indonesian internet-banking portals on a schedule, collects new
//! statement rows, and pushes them to a merchant endpoint. This crate covers both sides
//! of that integration.
//!
//! ## Features
//!
//! - **API client**: every REST endpoint (accounts, statements, matching, categories,
//!   webhooks, credit top-up) with the body encoding each endpoint expects, as an async
//!   client and a blocking one (`client::blocking`, feature `blocking`, on by default)
//! - **Webhook verification**: timestamp window, HMAC-SHA256 signature over the raw body
//!   with constant-time comparison, and embedded API token check
//! - **Axum receiver**: a ready-made router that verifies deliveries and dispatches each
//!   transaction to your handler
//!
//! ## Quick Start
//!
//! ### Client Example
//!
//! ```rust,no_run
//! use mutasibank::client::MutasibankClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = MutasibankClient::new(std::env::var("MUTASIBANK_API_TOKEN")?)?;
//!
//! let user = client.get_user().await?;
//! if user.is_success() {
//!     println!("Credit: {:?}", user.get("credit"));
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### Webhook Example
//!
//! ```rust,no_run
//! use mutasibank::webhook::{WebhookConfig, WebhookVerifier};
//! use http::HeaderMap;
//!
//! # fn example(headers: HeaderMap, body: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
//! let verifier = WebhookVerifier::new(WebhookConfig::new("whsec_...", "api-token"))?;
//!
//! match verifier.verify(&headers, body) {
//!     Ok(webhook) => println!("{} new rows", webhook.envelope.data_mutasi.len()),
//!     Err(e) => println!("rejected with {}: {}", e.status_code(), e),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Security
//!
//! - **Signed bodies**: the signature is checked over the exact bytes received, before parsing
//! - **Replay window**: deliveries older or newer than the tolerance (300 s) are refused
//! - **No secrets in logs**: only ten-character signature prefixes are ever logged
//! - **TLS always on**: the client offers no way to disable certificate verification

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod client;
pub mod endpoints;
pub mod errors;
pub mod server;
pub mod types;
pub mod utils;
pub mod webhook;

// Re-export commonly used items
pub use client::{ClientConfig, MutasibankClient};
pub use errors::{MutasibankError, Result, WebhookError};
pub use types::{
    ApiError, ApiResult, Identifier, TransactionRecord, TransactionType, WebhookAck,
    WebhookEnvelope,
};
pub use webhook::{DedupingHandler, TransactionHandler, WebhookConfig, WebhookVerifier};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_accessibility() {
        // Ensure all modules are accessible
        let _ = MutasibankClient::new("token").unwrap();
        let _ = WebhookVerifier::new(WebhookConfig::new("secret", "token")).unwrap();
        let _ = server::WEBHOOK_PATH;
        let _ = endpoints::USER;
    }
}
