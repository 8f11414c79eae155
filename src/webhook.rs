//! Verification and dispatch of Mutasibank webhook deliveries.
//!
//! A delivery is accepted only when all of the following hold:
//!
//! 1. the `X-Mutasibank-Signature` and `X-Mutasibank-Timestamp` headers are present,
//! 2. the timestamp is within the tolerance window of the local clock,
//! 3. the HMAC-SHA256 of the raw body, keyed with the webhook secret, matches the
//!    signature header (compared in constant time),
//! 4. the body is a JSON webhook envelope,
//! 5. the envelope's `api_key` equals the configured API token.
//!
//! The checks run in that order and the first failure rejects the whole delivery.
//! The body is never parsed before its signature has been checked.

use crate::errors::{MutasibankError, Result, WebhookError};
use crate::types::{TransactionRecord, WebhookAck, WebhookEnvelope};
use crate::utils::{
    compute_signature, constant_time_eq, current_timestamp, env_parse, env_var, hmac_sha256,
    signature_preview,
};
use async_trait::async_trait;
use http::HeaderMap;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Header carrying the hex-encoded HMAC-SHA256 of the raw body.
pub const SIGNATURE_HEADER: &str = "x-mutasibank-signature";

/// Header carrying the delivery time in Unix seconds.
pub const TIMESTAMP_HEADER: &str = "x-mutasibank-timestamp";

/// Header carrying an opaque delivery id, for correlation only.
pub const WEBHOOK_ID_HEADER: &str = "x-mutasibank-webhook-id";

/// Default accepted clock difference, in seconds.
pub const DEFAULT_TIMESTAMP_TOLERANCE_SECS: u64 = 300;

/// Secrets and limits used to authenticate deliveries.
#[derive(Clone)]
pub struct WebhookConfig {
    /// Webhook signing secret (Dashboard > Pengaturan > Webhook)
    pub secret: String,

    /// API token expected in the envelope's `api_key` field
    pub api_token: String,

    /// Maximum accepted `|now - timestamp|`, in seconds
    pub tolerance_seconds: u64,
}

impl WebhookConfig {
    /// Creates a configuration with the default 300 second tolerance.
    pub fn new(secret: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            api_token: api_token.into(),
            tolerance_seconds: DEFAULT_TIMESTAMP_TOLERANCE_SECS,
        }
    }

    /// Loads the configuration from the environment.
    ///
    /// * `MUTASIBANK_WEBHOOK_SECRET` (required)
    /// * `MUTASIBANK_API_TOKEN` (required)
    /// * `MUTASIBANK_TIMESTAMP_TOLERANCE` in seconds (default 300)
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(
            env_var("MUTASIBANK_WEBHOOK_SECRET")?,
            env_var("MUTASIBANK_API_TOKEN")?,
        )
        .with_tolerance(env_parse(
            "MUTASIBANK_TIMESTAMP_TOLERANCE",
            DEFAULT_TIMESTAMP_TOLERANCE_SECS,
        )?))
    }

    /// Sets the timestamp tolerance in seconds.
    pub fn with_tolerance(mut self, seconds: u64) -> Self {
        self.tolerance_seconds = seconds;
        self
    }
}

impl fmt::Debug for WebhookConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookConfig")
            .field("secret", &"<redacted>")
            .field("api_token", &"<redacted>")
            .field("tolerance_seconds", &self.tolerance_seconds)
            .finish()
    }
}

/// A delivery that passed every check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedWebhook {
    /// Value of `X-Mutasibank-Webhook-Id`, empty when absent
    pub webhook_id: String,

    /// The authenticated envelope
    pub envelope: WebhookEnvelope,
}

/// Business logic run for each transaction of an accepted delivery.
///
/// Transactions are handed over one at a time, in the order of `data_mutasi`. The
/// next transaction is only handed over once the previous call returned.
///
/// # Example
///
/// ```rust,no_run
/// use async_trait::async_trait;
/// use mutasibank::types::{TransactionRecord, WebhookEnvelope};
/// use mutasibank::webhook::TransactionHandler;
///
/// struct ConfirmOrders;
///
/// #[async_trait]
/// impl TransactionHandler for ConfirmOrders {
///     async fn handle(
///         &self,
///         envelope: &WebhookEnvelope,
///         transaction: &TransactionRecord,
///     ) -> mutasibank::Result<()> {
///         if transaction.is_credit() {
///             println!("{} received {}", envelope.account_number, transaction.amount);
///         }
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait TransactionHandler: Send + Sync {
    /// Handles one transaction. An error stops the delivery; the sender will retry it.
    async fn handle(
        &self,
        envelope: &WebhookEnvelope,
        transaction: &TransactionRecord,
    ) -> Result<()>;
}

/// Authenticates webhook deliveries.
///
/// Holds only immutable configuration, so one instance can serve concurrent requests.
#[derive(Debug, Clone)]
pub struct WebhookVerifier {
    config: WebhookConfig,
}

impl WebhookVerifier {
    /// Creates a verifier. Fails if the secret or the API token is empty.
    pub fn new(config: WebhookConfig) -> Result<Self> {
        if config.secret.is_empty() {
            return Err(MutasibankError::ConfigError("Webhook secret is empty".to_string()));
        }
        if config.api_token.is_empty() {
            return Err(MutasibankError::ConfigError("API token is empty".to_string()));
        }
        Ok(Self { config })
    }

    /// The configuration in use.
    pub fn config(&self) -> &WebhookConfig {
        &self.config
    }

    /// Signs `payload` the way Mutasibank does. Useful for tests and local replays.
    pub fn sign(&self, payload: &[u8]) -> String {
        compute_signature(&self.config.secret, payload)
    }

    /// Verifies a delivery against the local clock.
    pub fn verify(
        &self,
        headers: &HeaderMap,
        body: &[u8],
    ) -> std::result::Result<VerifiedWebhook, WebhookError> {
        self.verify_at(headers, body, current_timestamp())
    }

    /// Verifies a delivery as if the local clock read `now` (Unix seconds).
    pub fn verify_at(
        &self,
        headers: &HeaderMap,
        body: &[u8],
        now: i64,
    ) -> std::result::Result<VerifiedWebhook, WebhookError> {
        let webhook_id = header_str(headers, WEBHOOK_ID_HEADER).unwrap_or_default().to_string();

        let signature = header_str(headers, SIGNATURE_HEADER).filter(|s| !s.is_empty());
        // A zero or negative timestamp counts as absent.
        let timestamp = header_str(headers, TIMESTAMP_HEADER)
            .and_then(|t| t.parse::<i64>().ok())
            .filter(|t| *t > 0);
        let (signature, timestamp) = match (signature, timestamp) {
            (Some(signature), Some(timestamp)) => (signature, timestamp),
            _ => {
                tracing::warn!(%webhook_id, "Webhook rejected: missing signature headers");
                return Err(WebhookError::MissingSignatureHeaders);
            }
        };

        let difference = now.abs_diff(timestamp);
        if difference > self.config.tolerance_seconds {
            tracing::warn!(
                %webhook_id,
                timestamp_received = timestamp,
                current_time = now,
                difference_seconds = difference,
                "Webhook rejected: timestamp outside tolerance"
            );
            return Err(WebhookError::RequestExpired {
                timestamp_received: timestamp,
                current_time: now,
                difference_seconds: difference,
            });
        }

        if body.is_empty() {
            tracing::warn!(%webhook_id, "Webhook rejected: empty payload");
            return Err(WebhookError::InvalidPayload("Empty payload".to_string()));
        }

        self.check_signature(&webhook_id, body, signature)?;
        tracing::debug!(%webhook_id, "Webhook signature verified");

        let value: Value = serde_json::from_slice(body).map_err(|e| {
            tracing::warn!(%webhook_id, error = %e, "Webhook rejected: invalid JSON");
            WebhookError::InvalidPayload(format!("Invalid JSON payload: {}", e))
        })?;
        if !value.is_object() {
            tracing::warn!(%webhook_id, "Webhook rejected: payload is not a JSON object");
            return Err(WebhookError::InvalidPayload(
                "Payload must be a JSON object".to_string(),
            ));
        }

        let received_token = match value.get("api_key") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };
        if received_token != self.config.api_token {
            tracing::warn!(%webhook_id, "Webhook rejected: invalid API token");
            return Err(WebhookError::InvalidApiToken);
        }

        let envelope: WebhookEnvelope = serde_json::from_value(value).map_err(|e| {
            tracing::warn!(%webhook_id, error = %e, "Webhook rejected: unexpected payload shape");
            WebhookError::InvalidPayload(format!("Unexpected payload shape: {}", e))
        })?;

        Ok(VerifiedWebhook {
            webhook_id,
            envelope,
        })
    }

    fn check_signature(
        &self,
        webhook_id: &str,
        body: &[u8],
        signature: &str,
    ) -> std::result::Result<(), WebhookError> {
        let expected = hmac_sha256(self.config.secret.as_bytes(), body);
        let matches = match hex::decode(signature) {
            Ok(provided) => constant_time_eq(&expected, &provided),
            Err(_) => false,
        };

        if !matches {
            tracing::warn!(
                %webhook_id,
                expected = %signature_preview(&hex::encode(&expected)),
                received = %signature_preview(signature),
                "Webhook rejected: invalid signature"
            );
            return Err(WebhookError::InvalidSignature);
        }
        Ok(())
    }

    /// Verifies a delivery and runs `handler` on each of its transactions.
    pub async fn process<H>(
        &self,
        headers: &HeaderMap,
        body: &[u8],
        handler: &H,
    ) -> std::result::Result<WebhookAck, WebhookError>
    where
        H: TransactionHandler + ?Sized,
    {
        self.process_at(headers, body, handler, current_timestamp()).await
    }

    /// Same as [`process`](Self::process) with an explicit clock reading.
    pub async fn process_at<H>(
        &self,
        headers: &HeaderMap,
        body: &[u8],
        handler: &H,
        now: i64,
    ) -> std::result::Result<WebhookAck, WebhookError>
    where
        H: TransactionHandler + ?Sized,
    {
        let VerifiedWebhook {
            webhook_id,
            envelope,
        } = self.verify_at(headers, body, now)?;

        tracing::info!(
            %webhook_id,
            account_id = %envelope.account_id,
            account_number = %envelope.account_number,
            module = %envelope.module,
            transaction_count = envelope.data_mutasi.len(),
            balance = envelope.balance,
            "Processing Mutasibank webhook"
        );

        for transaction in &envelope.data_mutasi {
            tracing::debug!(
                transaction_id = %transaction.id,
                date = %transaction.transaction_date,
                kind = %transaction.kind,
                amount = transaction.amount,
                "Processing transaction"
            );

            if let Err(e) = handler.handle(&envelope, transaction).await {
                tracing::error!(
                    %webhook_id,
                    transaction_id = %transaction.id,
                    error = %e,
                    "Webhook processing failed"
                );
                return Err(WebhookError::ProcessingFailed {
                    transaction_id: transaction.id.to_string(),
                    message: e.to_string(),
                });
            }
        }

        let processed = envelope.data_mutasi.len();
        tracing::info!(
            %webhook_id,
            transactions_processed = processed,
            "Webhook processed successfully"
        );

        Ok(WebhookAck {
            success: true,
            webhook_id,
            transactions_processed: processed,
            timestamp: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        })
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
}

/// Skips transactions that were already handled successfully by this process.
///
/// Mutasibank redelivers a webhook when the receiver does not answer 200, so the
/// same statement row can arrive more than once. Rows are keyed by bank module,
/// account id and transaction id. The set lives in memory only.
pub struct DedupingHandler<H> {
    inner: H,
    seen: Arc<RwLock<HashSet<String>>>,
}

impl<H> DedupingHandler<H> {
    /// Wraps `inner`.
    pub fn new(inner: H) -> Self {
        Self {
            inner,
            seen: Arc::new(RwLock::new(HashSet::new())),
        }
    }

    /// Number of distinct transactions handled so far.
    pub async fn handled_count(&self) -> usize {
        self.seen.read().await.len()
    }

    /// The wrapped handler.
    pub fn inner(&self) -> &H {
        &self.inner
    }
}

fn dedupe_key(envelope: &WebhookEnvelope, transaction: &TransactionRecord) -> String {
    format!("{}:{}:{}", envelope.module, envelope.account_id, transaction.id)
}

#[async_trait]
impl<H> TransactionHandler for DedupingHandler<H>
where
    H: TransactionHandler,
{
    async fn handle(
        &self,
        envelope: &WebhookEnvelope,
        transaction: &TransactionRecord,
    ) -> Result<()> {
        let key = dedupe_key(envelope, transaction);

        // Claim the key before running the handler so concurrent redeliveries skip it.
        if !self.seen.write().await.insert(key.clone()) {
            tracing::debug!(%key, "Skipping already handled transaction");
            return Ok(());
        }

        let result = self.inner.handle(envelope, transaction).await;
        if result.is_err() {
            self.seen.write().await.remove(&key);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Identifier;
    use http::HeaderValue;
    use serde_json::json;
    use std::sync::Mutex;

    const SECRET: &str = "whsec_test_secret";
    const TOKEN: &str = "api-token";
    const NOW: i64 = 1_736_500_000;

    fn verifier() -> WebhookVerifier {
        WebhookVerifier::new(WebhookConfig::new(SECRET, TOKEN)).unwrap()
    }

    fn payload(api_key: &str, transactions: usize) -> Vec<u8> {
        let rows: Vec<Value> = (0..transactions)
            .map(|i| {
                json!({
                    "id": i + 1,
                    "transaction_date": "2025-01-10 08:00:00",
                    "description": format!("TRF {} ORDER-{}", i, 1000 + i),
                    "type": if i % 2 == 0 { "CR" } else { "DB" },
                    "amount": 10_000 * (i + 1),
                    "balance": 500_000
                })
            })
            .collect();
        serde_json::to_vec(&json!({
            "api_key": api_key,
            "account_id": 10,
            "account_name": "Budi Santoso",
            "account_number": "1234567890",
            "module": "bca",
            "balance": 500_000,
            "data_mutasi": rows
        }))
        .unwrap()
    }

    fn headers(signature: Option<&str>, timestamp: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(signature) = signature {
            headers.insert(SIGNATURE_HEADER, HeaderValue::from_str(signature).unwrap());
        }
        if let Some(timestamp) = timestamp {
            headers.insert(TIMESTAMP_HEADER, HeaderValue::from_str(timestamp).unwrap());
        }
        headers.insert(WEBHOOK_ID_HEADER, HeaderValue::from_static("wh_42"));
        headers
    }

    fn signed(body: &[u8], timestamp: i64) -> HeaderMap {
        let signature = compute_signature(SECRET, body);
        headers(Some(&signature), Some(&timestamp.to_string()))
    }

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<String>>,
        fail_on: Option<String>,
    }

    #[async_trait]
    impl TransactionHandler for Recorder {
        async fn handle(
            &self,
            _envelope: &WebhookEnvelope,
            transaction: &TransactionRecord,
        ) -> Result<()> {
            let id = transaction.id.to_string();
            if self.fail_on.as_deref() == Some(id.as_str()) {
                return Err(MutasibankError::Handler("database unavailable".to_string()));
            }
            self.seen.lock().unwrap().push(id);
            Ok(())
        }
    }

    #[test]
    fn test_valid_delivery() {
        let body = payload(TOKEN, 2);
        let verified = verifier().verify_at(&signed(&body, NOW), &body, NOW).unwrap();

        assert_eq!(verified.webhook_id, "wh_42");
        assert_eq!(verified.envelope.account_id, Identifier::Number(10));
        assert_eq!(verified.envelope.data_mutasi.len(), 2);
    }

    #[test]
    fn test_tolerance_boundary() {
        let body = payload(TOKEN, 1);
        let v = verifier();

        assert!(v.verify_at(&signed(&body, NOW - 300), &body, NOW).is_ok());
        assert!(v.verify_at(&signed(&body, NOW + 300), &body, NOW).is_ok());

        let err = v.verify_at(&signed(&body, NOW - 301), &body, NOW).unwrap_err();
        assert_eq!(
            err,
            WebhookError::RequestExpired {
                timestamp_received: NOW - 301,
                current_time: NOW,
                difference_seconds: 301,
            }
        );
        let err = v.verify_at(&signed(&body, NOW + 301), &body, NOW).unwrap_err();
        assert!(matches!(err, WebhookError::RequestExpired { .. }));
    }

    #[test]
    fn test_custom_tolerance() {
        let body = payload(TOKEN, 0);
        let v = WebhookVerifier::new(WebhookConfig::new(SECRET, TOKEN).with_tolerance(10)).unwrap();
        assert!(v.verify_at(&signed(&body, NOW - 10), &body, NOW).is_ok());
        assert!(v.verify_at(&signed(&body, NOW - 11), &body, NOW).is_err());
    }

    #[test]
    fn test_missing_headers() {
        let body = payload(TOKEN, 1);
        let signature = compute_signature(SECRET, &body);
        let now = NOW.to_string();
        let v = verifier();

        for headers in [
            headers(None, Some(&now)),
            headers(Some(&signature), None),
            headers(Some(""), Some(&now)),
            headers(Some(&signature), Some("yesterday")),
            headers(Some(&signature), Some("")),
            headers(Some(&signature), Some("0")),
            headers(Some(&signature), Some("-5")),
        ] {
            assert_eq!(
                v.verify_at(&headers, &body, NOW).unwrap_err(),
                WebhookError::MissingSignatureHeaders
            );
        }
    }

    #[test]
    fn test_header_check_runs_before_any_body_check() {
        let v = verifier();
        let now = NOW.to_string();

        // Neither an empty body nor a stale timestamp is looked at without a signature.
        for (body, timestamp) in [(&b""[..], now.as_str()), (&b"not json"[..], "1")] {
            assert_eq!(
                v.verify_at(&headers(None, Some(timestamp)), body, NOW).unwrap_err(),
                WebhookError::MissingSignatureHeaders
            );
        }
    }

    #[test]
    fn test_any_flipped_signature_character_is_rejected() {
        let body = payload(TOKEN, 1);
        let signature = compute_signature(SECRET, &body);
        let v = verifier();

        for position in 0..signature.len() {
            let mut chars: Vec<char> = signature.chars().collect();
            chars[position] = if chars[position] == '0' { '1' } else { '0' };
            let tampered: String = chars.into_iter().collect();

            let err = v
                .verify_at(&headers(Some(&tampered), Some(&NOW.to_string())), &body, NOW)
                .unwrap_err();
            assert_eq!(err, WebhookError::InvalidSignature, "position {}", position);
        }
    }

    #[test]
    fn test_signature_over_exact_bytes() {
        let body = payload(TOKEN, 1);
        let headers = signed(&body, NOW);

        // Same JSON document, different bytes.
        let document: Value = serde_json::from_slice(&body).unwrap();
        let reformatted = serde_json::to_vec_pretty(&document).unwrap();
        let err = verifier().verify_at(&headers, &reformatted, NOW).unwrap_err();
        assert_eq!(err, WebhookError::InvalidSignature);
    }

    #[test]
    fn test_wrong_secret_and_malformed_signature() {
        let body = payload(TOKEN, 1);
        let other = compute_signature("another-secret", &body);
        let v = verifier();

        for signature in [other.as_str(), "not-hex", "abc", "sha256=deadbeef"] {
            let err = v
                .verify_at(&headers(Some(signature), Some(&NOW.to_string())), &body, NOW)
                .unwrap_err();
            assert_eq!(err, WebhookError::InvalidSignature);
        }
    }

    #[test]
    fn test_token_checked_after_signature() {
        let body = payload("stolen-token", 1);
        let err = verifier().verify_at(&signed(&body, NOW), &body, NOW).unwrap_err();
        assert_eq!(err, WebhookError::InvalidApiToken);

        // Right token, forged signature: the signature check wins.
        let body = payload(TOKEN, 1);
        let forged = compute_signature("forger", &body);
        let err = verifier()
            .verify_at(&headers(Some(&forged), Some(&NOW.to_string())), &body, NOW)
            .unwrap_err();
        assert_eq!(err, WebhookError::InvalidSignature);
    }

    #[test]
    fn test_missing_api_key_is_invalid_token() {
        let body = br#"{"account_id":1,"data_mutasi":[]}"#;
        let err = verifier().verify_at(&signed(body, NOW), body, NOW).unwrap_err();
        assert_eq!(err, WebhookError::InvalidApiToken);
    }

    #[test]
    fn test_payload_errors() {
        let v = verifier();

        let err = v.verify_at(&signed(b"", NOW), b"", NOW).unwrap_err();
        assert_eq!(err, WebhookError::InvalidPayload("Empty payload".to_string()));

        let body = b"{not json";
        let err = v.verify_at(&signed(body, NOW), body, NOW).unwrap_err();
        assert!(matches!(err, WebhookError::InvalidPayload(_)));

        let body = b"[1,2,3]";
        let err = v.verify_at(&signed(body, NOW), body, NOW).unwrap_err();
        assert!(matches!(err, WebhookError::InvalidPayload(_)));

        let body = serde_json::to_vec(&json!({"api_key": TOKEN, "data_mutasi": "none"})).unwrap();
        let err = v.verify_at(&signed(&body, NOW), &body, NOW).unwrap_err();
        assert!(matches!(err, WebhookError::InvalidPayload(_)));
        assert!(!err.is_authentication_failure());
    }

    #[test]
    fn test_config_validation() {
        assert!(WebhookVerifier::new(WebhookConfig::new("", TOKEN)).is_err());
        assert!(WebhookVerifier::new(WebhookConfig::new(SECRET, "")).is_err());

        let debug = format!("{:?}", WebhookConfig::new(SECRET, TOKEN));
        assert!(!debug.contains(SECRET));
        assert!(!debug.contains(TOKEN));
    }

    #[tokio::test]
    async fn test_handler_sees_transactions_in_order() {
        let body = payload(TOKEN, 5);
        let recorder = Recorder::default();

        let ack = verifier()
            .process_at(&signed(&body, NOW), &body, &recorder, NOW)
            .await
            .unwrap();

        assert!(ack.success);
        assert_eq!(ack.webhook_id, "wh_42");
        assert_eq!(ack.transactions_processed, 5);
        assert_eq!(*recorder.seen.lock().unwrap(), vec!["1", "2", "3", "4", "5"]);
    }

    #[tokio::test]
    async fn test_empty_batch_is_a_success() {
        let body = payload(TOKEN, 0);
        let recorder = Recorder::default();

        let ack = verifier()
            .process_at(&signed(&body, NOW), &body, &recorder, NOW)
            .await
            .unwrap();

        assert_eq!(ack.transactions_processed, 0);
        assert!(recorder.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_delivery_never_reaches_handler() {
        let body = payload("wrong", 3);
        let recorder = Recorder::default();

        let err = verifier()
            .process_at(&signed(&body, NOW), &body, &recorder, NOW)
            .await
            .unwrap_err();

        assert_eq!(err, WebhookError::InvalidApiToken);
        assert!(recorder.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_handler_failure_stops_processing() {
        let body = payload(TOKEN, 4);
        let recorder = Recorder {
            fail_on: Some("2".to_string()),
            ..Default::default()
        };

        let err = verifier()
            .process_at(&signed(&body, NOW), &body, &recorder, NOW)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            WebhookError::ProcessingFailed { ref transaction_id, .. } if transaction_id == "2"
        ));
        assert_eq!(*recorder.seen.lock().unwrap(), vec!["1"]);
    }

    #[tokio::test]
    async fn test_dedupe_skips_redelivered_transactions() {
        let handler = DedupingHandler::new(Recorder::default());
        let v = verifier();

        let first = payload(TOKEN, 2);
        v.process_at(&signed(&first, NOW), &first, &handler, NOW).await.unwrap();

        // Redelivery with one extra row.
        let second = payload(TOKEN, 3);
        let ack = v.process_at(&signed(&second, NOW), &second, &handler, NOW).await.unwrap();

        assert_eq!(ack.transactions_processed, 3);
        assert_eq!(*handler.inner().seen.lock().unwrap(), vec!["1", "2", "3"]);
        assert_eq!(handler.handled_count().await, 3);
    }

    #[tokio::test]
    async fn test_dedupe_retries_failed_transactions() {
        let handler = DedupingHandler::new(Recorder {
            fail_on: Some("1".to_string()),
            ..Default::default()
        });
        let body = payload(TOKEN, 1);
        let v = verifier();

        assert!(v.process_at(&signed(&body, NOW), &body, &handler, NOW).await.is_err());
        assert_eq!(handler.handled_count().await, 0);
    }
}
