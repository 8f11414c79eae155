//! Synchronous Mutasibank API client.
//!
//! Same operations and outcome rules as the async
//! [`MutasibankClient`](super::MutasibankClient). Each call blocks the current thread
//! until the response is read or the configured timeout elapses. Do not call it from
//! inside an async runtime; use the async client there.
//!
//! ```no_run
//! use mutasibank::client::blocking::MutasibankClient;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = MutasibankClient::new("my-token")?;
//! let validation = client.validate_transaction(1207)?;
//! println!("{}", validation.to_value());
//! # Ok(())
//! # }
//! ```

use super::{authorization_header, decode_body, transport_failure, ClientConfig};
use crate::endpoints::{self, BodyEncoding, Endpoint};
use crate::errors::Result;
use crate::types::{
    AccountStatus, ApiResult, MatchQuery, NewCategory, NewWebhook, StatementQuery, TokenInput,
    TopupRequest, TransactionType,
};
use chrono::NaiveDate;
use reqwest::blocking::Client;
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use url::Url;

/// Blocking Mutasibank API client.
#[derive(Clone)]
pub struct MutasibankClient {
    authorization: HeaderValue,
    base_url: Url,
    http_client: Client,
}

impl MutasibankClient {
    /// Creates a client for the production API with default settings.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(ClientConfig::new(api_key))
    }

    /// Creates a client from an explicit configuration.
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let authorization = authorization_header(&config.api_key)?;
        let base_url = Url::parse(&config.base_url)?;
        let http_client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            authorization,
            base_url,
            http_client,
        })
    }

    /// Base URL requests are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Sends one request for `endpoint` and normalizes the outcome.
    pub fn call<B>(
        &self,
        endpoint: Endpoint,
        params: &[&str],
        body: Option<&B>,
    ) -> Result<ApiResult>
    where
        B: Serialize + ?Sized,
    {
        let url = endpoint.url(&self.base_url, params)?;
        let mut request = self
            .http_client
            .request(endpoint.method.as_method(), url)
            .header(AUTHORIZATION, self.authorization.clone());

        if let (Some(body), Some(content_type)) = (body, endpoint.encoding.content_type()) {
            request = request.header(CONTENT_TYPE, content_type);
            request = match endpoint.encoding {
                BodyEncoding::Json => request.json(body),
                _ => request.form(body),
            };
        }

        tracing::debug!(
            method = %endpoint.method,
            path = endpoint.path,
            "Sending Mutasibank request (blocking)"
        );

        let response = match request.send() {
            Ok(response) => response,
            Err(e) => {
                let http_code = e.status().map(|s| s.as_u16()).unwrap_or(0);
                return Ok(transport_failure(endpoint, &e, http_code));
            }
        };

        let status = response.status().as_u16();
        let body = match response.bytes() {
            Ok(body) => body,
            Err(e) => return Ok(transport_failure(endpoint, &e, status)),
        };

        decode_body(status, &body)
    }

    fn fetch(&self, endpoint: Endpoint, params: &[&str]) -> Result<ApiResult> {
        self.call::<()>(endpoint, params, None)
    }

    // ------------------------------------------------------------------
    // User and banks
    // ------------------------------------------------------------------

    /// Current user, including wallet balance and package.
    pub fn get_user(&self) -> Result<ApiResult> {
        self.fetch(endpoints::USER, &[])
    }

    /// Supported banks and their configuration.
    pub fn list_banks(&self) -> Result<ApiResult> {
        self.fetch(endpoints::LIST_BANK, &[])
    }

    // ------------------------------------------------------------------
    // Accounts
    // ------------------------------------------------------------------

    /// All registered bank accounts.
    pub fn get_accounts(&self) -> Result<ApiResult> {
        self.fetch(endpoints::ACCOUNTS, &[])
    }

    /// One bank account.
    pub fn get_account(&self, account_id: impl fmt::Display) -> Result<ApiResult> {
        let id = account_id.to_string();
        self.fetch(endpoints::ACCOUNT, &[id.as_str()])
    }

    /// Registers a bank account. The payload is sent as JSON.
    pub fn create_account<T>(&self, account: &T) -> Result<ApiResult>
    where
        T: Serialize + ?Sized,
    {
        self.call(endpoints::ACCOUNT_CREATE, &[], Some(account))
    }

    /// Updates a bank account with a JSON payload.
    pub fn update_account<T>(
        &self,
        account_id: impl fmt::Display,
        changes: &T,
    ) -> Result<ApiResult>
    where
        T: Serialize + ?Sized,
    {
        let id = account_id.to_string();
        self.call(endpoints::ACCOUNT_UPDATE, &[id.as_str()], Some(changes))
    }

    /// Deletes a bank account.
    pub fn delete_account(&self, account_id: impl fmt::Display) -> Result<ApiResult> {
        let id = account_id.to_string();
        self.fetch(endpoints::ACCOUNT_DELETE, &[id.as_str()])
    }

    /// Switches the bot of an account on or off.
    pub fn set_account_status(
        &self,
        account_id: impl fmt::Display,
        enabled: bool,
    ) -> Result<ApiResult> {
        let id = account_id.to_string();
        self.call(endpoints::ACCOUNT_ON_OFF, &[id.as_str()], Some(&AccountStatus::new(enabled)))
    }

    /// Flips the on/off state of an account.
    pub fn toggle_account(&self, account_id: impl fmt::Display) -> Result<ApiResult> {
        let id = account_id.to_string();
        self.call(endpoints::ACCOUNT_TOGGLE, &[id.as_str()], Some(&Value::Array(Vec::new())))
    }

    /// Submits the two KeyBCA tokens an account is waiting for.
    pub fn input_token(
        &self,
        account_id: impl fmt::Display,
        token_1: impl Into<String>,
        token_2: impl Into<String>,
    ) -> Result<ApiResult> {
        let id = account_id.to_string();
        let tokens = TokenInput {
            token_1: token_1.into(),
            token_2: token_2.into(),
        };
        self.call(endpoints::INPUT_TOKEN, &[id.as_str()], Some(&tokens))
    }

    /// Schedules an immediate bot check. The response carries the next run time.
    pub fn rerun_check(&self, account_id: impl fmt::Display) -> Result<ApiResult> {
        let id = account_id.to_string();
        self.fetch(endpoints::RERUN, &[id.as_str()])
    }

    /// Bot activity history of an account.
    pub fn get_bot_log(&self, account_id: impl fmt::Display) -> Result<ApiResult> {
        let id = account_id.to_string();
        self.fetch(endpoints::LOG_BOT, &[id.as_str()])
    }

    // ------------------------------------------------------------------
    // Statements and matching
    // ------------------------------------------------------------------

    /// Statement rows of an account between two dates (inclusive).
    pub fn get_statements(
        &self,
        account_id: impl fmt::Display,
        date_from: NaiveDate,
        date_to: NaiveDate,
    ) -> Result<ApiResult> {
        let id = account_id.to_string();
        let query = StatementQuery::new(date_from, date_to);
        self.call(endpoints::STATEMENTS, &[id.as_str()], Some(&query))
    }

    /// First transaction with the given amount, optionally within a date range.
    ///
    /// The query is always sent form-urlencoded.
    pub fn match_transaction(
        &self,
        account_id: impl fmt::Display,
        query: &MatchQuery,
    ) -> Result<ApiResult> {
        let id = account_id.to_string();
        self.call(endpoints::MATCH, &[id.as_str()], Some(query))
    }

    /// Every transaction with the given amount.
    pub fn match_transactions(
        &self,
        account_id: impl fmt::Display,
        amount: u64,
    ) -> Result<ApiResult> {
        let id = account_id.to_string();
        self.call(endpoints::MATCH_ALL, &[id.as_str()], Some(&MatchQuery::new(amount)))
    }

    /// Confirms that a statement row exists server-side. Use it to double check
    /// transactions received through a webhook.
    pub fn validate_transaction(
        &self,
        transaction_id: impl fmt::Display,
    ) -> Result<ApiResult> {
        let id = transaction_id.to_string();
        self.fetch(endpoints::VALIDATE, &[id.as_str()])
    }

    // ------------------------------------------------------------------
    // Categories
    // ------------------------------------------------------------------

    /// All transaction categories.
    pub fn get_categories(&self) -> Result<ApiResult> {
        self.fetch(endpoints::CATEGORIES, &[])
    }

    /// One category.
    pub fn get_category(&self, category_id: impl fmt::Display) -> Result<ApiResult> {
        let id = category_id.to_string();
        self.fetch(endpoints::CATEGORY, &[id.as_str()])
    }

    /// Creates a category.
    pub fn create_category(
        &self,
        name: impl Into<String>,
        kind: TransactionType,
        description: impl Into<String>,
    ) -> Result<ApiResult> {
        let category = NewCategory {
            name: name.into(),
            kind,
            description: description.into(),
        };
        self.call(endpoints::CATEGORY_CREATE, &[], Some(&category))
    }

    /// Updates a category with a JSON payload.
    pub fn update_category<T>(
        &self,
        category_id: impl fmt::Display,
        changes: &T,
    ) -> Result<ApiResult>
    where
        T: Serialize + ?Sized,
    {
        let id = category_id.to_string();
        self.call(endpoints::CATEGORY_UPDATE, &[id.as_str()], Some(changes))
    }

    /// Deletes a category.
    pub fn delete_category(&self, category_id: impl fmt::Display) -> Result<ApiResult> {
        let id = category_id.to_string();
        self.fetch(endpoints::CATEGORY_DELETE, &[id.as_str()])
    }

    // ------------------------------------------------------------------
    // Webhooks
    // ------------------------------------------------------------------

    /// All configured webhooks.
    pub fn get_webhooks(&self) -> Result<ApiResult> {
        self.fetch(endpoints::WEBHOOKS, &[])
    }

    /// One webhook. The signing secret is not returned.
    pub fn get_webhook(&self, webhook_id: impl fmt::Display) -> Result<ApiResult> {
        let id = webhook_id.to_string();
        self.fetch(endpoints::WEBHOOK, &[id.as_str()])
    }

    /// Creates a webhook. The response contains the signing secret, which is shown
    /// only once.
    pub fn create_webhook(&self, webhook: &NewWebhook) -> Result<ApiResult> {
        self.call(endpoints::WEBHOOK_CREATE, &[], Some(webhook))
    }

    /// Updates a webhook with a JSON payload.
    pub fn update_webhook<T>(
        &self,
        webhook_id: impl fmt::Display,
        changes: &T,
    ) -> Result<ApiResult>
    where
        T: Serialize + ?Sized,
    {
        let id = webhook_id.to_string();
        self.call(endpoints::WEBHOOK_UPDATE, &[id.as_str()], Some(changes))
    }

    /// Deletes a webhook.
    pub fn delete_webhook(&self, webhook_id: impl fmt::Display) -> Result<ApiResult> {
        let id = webhook_id.to_string();
        self.fetch(endpoints::WEBHOOK_DELETE, &[id.as_str()])
    }

    // ------------------------------------------------------------------
    // Wallet
    // ------------------------------------------------------------------

    /// Creates a wallet top-up. The response holds the payment instructions.
    pub fn topup_credit(&self, topup: TopupRequest) -> Result<ApiResult> {
        self.call(endpoints::TOPUP_KREDIT, &[], Some(&topup))
    }
}

impl fmt::Debug for MutasibankClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("blocking::MutasibankClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}
