//! Core type definitions for the Mutasibank API and its webhooks.
//!
//! This module contains the normalized API result, the webhook envelope and its
//! transaction records, and the request payloads sent by the client.

use crate::utils::format_date;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Outcome of one API call.
///
/// The remote API encodes its own failures inside the JSON body (for example a
/// `message` field), so any decoded body is a [`ApiResult::Success`]. Only
/// transport failures become [`ApiResult::Error`].
///
/// # Examples
///
/// ```
/// use mutasibank::types::{ApiError, ApiResult};
///
/// let result = ApiResult::Error(ApiError::new("connection reset", 0));
/// assert!(!result.is_success());
/// assert_eq!(result.to_value()["http_code"], 0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResult {
    /// Decoded JSON object returned by the API, unchanged
    Success(Map<String, Value>),

    /// The request never produced a decodable exchange
    Error(ApiError),
}

impl ApiResult {
    /// Returns true for [`ApiResult::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, ApiResult::Success(_))
    }

    /// Borrows the decoded body, if any.
    pub fn data(&self) -> Option<&Map<String, Value>> {
        match self {
            ApiResult::Success(map) => Some(map),
            ApiResult::Error(_) => None,
        }
    }

    /// Looks up a top-level field of a successful body.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data().and_then(|map| map.get(key))
    }

    /// Reads a `/validate/{id}` response: true only when the API flags the
    /// transaction as valid and reports exactly `amount` for it.
    ///
    /// # Examples
    ///
    /// ```
    /// use mutasibank::types::ApiResult;
    /// use serde_json::json;
    ///
    /// let body = json!({"valid": true, "data": {"amount": 150000}});
    /// let result = ApiResult::Success(body.as_object().unwrap().clone());
    /// assert!(result.confirms_transaction(150_000));
    /// assert!(!result.confirms_transaction(15_000));
    /// ```
    pub fn confirms_transaction(&self, amount: u64) -> bool {
        if self.get("valid").and_then(Value::as_bool) != Some(true) {
            return false;
        }
        match self.get("data").and_then(|data| data.get("amount")) {
            Some(Value::Number(n)) => {
                n.as_u64() == Some(amount) || n.as_f64() == Some(amount as f64)
            }
            Some(Value::String(s)) => s.trim().parse::<f64>().ok() == Some(amount as f64),
            _ => false,
        }
    }

    /// Renders the result as a single JSON value, error records included.
    pub fn to_value(&self) -> Value {
        match self {
            ApiResult::Success(map) => Value::Object(map.clone()),
            ApiResult::Error(err) => {
                serde_json::to_value(err).unwrap_or_else(|_| Value::Object(Map::new()))
            }
        }
    }
}

/// Error record produced when the HTTP exchange failed at transport level.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// Always `true`
    pub error: bool,

    /// Transport error description
    pub message: String,

    /// HTTP status observed before the failure, 0 if none was received
    pub http_code: u16,
}

impl ApiError {
    /// Creates a transport error record.
    pub fn new(message: impl Into<String>, http_code: u16) -> Self {
        Self {
            error: true,
            message: message.into(),
            http_code,
        }
    }
}

/// Server-issued identifier that may be numeric or textual (UUID).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum Identifier {
    /// Integer identifier
    Number(i64),
    /// String identifier
    Text(String),
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Number(n) => write!(f, "{}", n),
            Identifier::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Identifier {
    fn from(value: i64) -> Self {
        Identifier::Number(value)
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Identifier::Text(value.to_string())
    }
}

impl From<String> for Identifier {
    fn from(value: String) -> Self {
        Identifier::Text(value)
    }
}

/// Direction of a statement row.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionType {
    /// Incoming funds
    #[serde(rename = "CR")]
    Credit,
    /// Outgoing funds
    #[serde(rename = "DB")]
    Debit,
}

impl TransactionType {
    /// Wire code, `CR` or `DB`.
    pub fn code(&self) -> &'static str {
        match self {
            TransactionType::Credit => "CR",
            TransactionType::Debit => "DB",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One statement row delivered in a webhook.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    /// Unique per bank and account
    pub id: Identifier,

    /// Bank-side transaction time, as sent by the bank (`YYYY-MM-DD HH:MM:SS`)
    pub transaction_date: String,

    /// Free-text description from the bank
    pub description: String,

    /// Credit or debit
    #[serde(rename = "type")]
    pub kind: TransactionType,

    /// Amount in the smallest currency unit
    pub amount: u64,

    /// Running balance after this transaction
    pub balance: i64,
}

impl TransactionRecord {
    /// Returns true for incoming funds.
    pub fn is_credit(&self) -> bool {
        self.kind == TransactionType::Credit
    }
}

/// Signed payload of a webhook delivery.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct WebhookEnvelope {
    /// Shared token, checked against the configured API token
    #[serde(deserialize_with = "identifier_as_string")]
    pub api_key: String,

    /// Mutasibank account identifier
    pub account_id: Identifier,

    /// Account holder name
    pub account_name: String,

    /// Bank account number
    pub account_number: String,

    /// Bank code (e.g. `bca`, `bri`, `mandiri`, `bni`)
    pub module: String,

    /// Account balance in the smallest currency unit
    pub balance: i64,

    /// Transactions in the order the bank reported them
    pub data_mutasi: Vec<TransactionRecord>,
}

fn identifier_as_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Identifier::deserialize(deserializer).map(|id| id.to_string())
}

/// Body returned to the sender after a delivery was processed.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct WebhookAck {
    /// Always `true`
    pub success: bool,

    /// Correlation id from the `X-Mutasibank-Webhook-Id` header (empty if absent)
    pub webhook_id: String,

    /// Number of transactions handed to the handler
    pub transactions_processed: usize,

    /// Local processing time, `YYYY-MM-DD HH:MM:SS`
    pub timestamp: String,
}

/// Fields for registering a bank account.
///
/// Only the bank, holder name and account number are required; the rest depends on
/// the bank (internet banking credentials or API credentials for API-based banks).
#[derive(Serialize, Deserialize, Clone, Default)]
pub struct NewAccount {
    /// Bank id from `/list_bank`
    pub bank_id: i64,
    /// Account holder name
    pub account_name: String,
    /// Bank account number
    pub account_no: String,
    /// Internet banking username
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_banking: Option<String>,
    /// Internet banking password
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_banking: Option<String>,
    /// API key for API-based banks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// API secret for API-based banks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_secret: Option<String>,
    /// OAuth client id for API-based banks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    /// OAuth client secret for API-based banks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    /// Corporate id for corporate banking
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corp_id: Option<String>,
    /// Bot check interval in minutes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule_minutes: Option<u32>,
    /// Webhook URL for this account
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_callback: Option<String>,
    /// Notification e-mail
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_notification: Option<String>,
    /// Notification WhatsApp number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wa_number: Option<String>,
    /// Notification Telegram id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telegram_id: Option<String>,
    /// Free-form note
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl NewAccount {
    /// Creates an account payload with the required fields set.
    pub fn new(
        bank_id: i64,
        account_name: impl Into<String>,
        account_no: impl Into<String>,
    ) -> Self {
        Self {
            bank_id,
            account_name: account_name.into(),
            account_no: account_no.into(),
            ..Default::default()
        }
    }

    /// Sets the internet banking credentials.
    pub fn with_banking_login(
        mut self,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.user_banking = Some(user.into());
        self.password_banking = Some(password.into());
        self
    }

    /// Sets the webhook URL notified on new transactions.
    pub fn with_callback(mut self, url: impl Into<String>) -> Self {
        self.url_callback = Some(url.into());
        self
    }

    /// Sets the bot check interval.
    pub fn with_schedule(mut self, minutes: u32) -> Self {
        self.schedule_minutes = Some(minutes);
        self
    }
}

/// Form body of `/on_off/{id}`.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountStatus {
    /// 1 = on, 0 = off
    pub status: u8,
}

impl AccountStatus {
    /// Maps an on/off flag to the wire value.
    pub fn new(enabled: bool) -> Self {
        Self {
            status: u8::from(enabled),
        }
    }
}

/// Form body of `/input_token/{id}` (KeyBCA tokens).
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct TokenInput {
    /// First token
    pub token_1: String,
    /// Second token
    pub token_2: String,
}

/// Form body of `/statements/{id}`.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct StatementQuery {
    /// Start date, `YYYY-MM-DD`
    pub date_from: String,
    /// End date, `YYYY-MM-DD`
    pub date_to: String,
}

impl StatementQuery {
    /// Builds the query for an inclusive date range.
    pub fn new(date_from: NaiveDate, date_to: NaiveDate) -> Self {
        Self {
            date_from: format_date(date_from),
            date_to: format_date(date_to),
        }
    }
}

/// Form body of `/match/{id}` and `/matchs/{id}`.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use mutasibank::types::MatchQuery;
///
/// let query = MatchQuery::new(150_000)
///     .with_date_from(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
/// assert_eq!(query.date_from.as_deref(), Some("2025-01-01"));
/// assert!(query.date_to.is_none());
/// ```
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct MatchQuery {
    /// Amount to look for, smallest currency unit
    pub amount: u64,
    /// Optional start date, `YYYY-MM-DD`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_from: Option<String>,
    /// Optional end date, `YYYY-MM-DD`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_to: Option<String>,
}

impl MatchQuery {
    /// Matches on amount only.
    pub fn new(amount: u64) -> Self {
        Self {
            amount,
            date_from: None,
            date_to: None,
        }
    }

    /// Restricts the search to transactions on or after `date`.
    pub fn with_date_from(mut self, date: NaiveDate) -> Self {
        self.date_from = Some(format_date(date));
        self
    }

    /// Restricts the search to transactions on or before `date`.
    pub fn with_date_to(mut self, date: NaiveDate) -> Self {
        self.date_to = Some(format_date(date));
        self
    }
}

/// JSON body of `POST /category`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct NewCategory {
    /// Category name
    pub name: String,
    /// Transaction direction the category applies to
    #[serde(rename = "type")]
    pub kind: TransactionType,
    /// Description, may be empty
    pub description: String,
}

/// JSON body of `POST /webhook`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct NewWebhook {
    /// HTTPS URL receiving deliveries
    pub url: String,
    /// Bank account the webhook reports on
    pub bank_account_id: Identifier,
    /// Description, may be empty
    pub description: String,
}

/// Form body of `/topup_kredit`.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopupRequest {
    /// Amount to top up (minimum 10000)
    #[serde(rename = "jumlah")]
    pub amount: u64,
    /// Payment method (1 = BCA, 2 = Mandiri)
    pub payment_id: u32,
}
