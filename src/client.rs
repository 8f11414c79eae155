//! Client for the Mutasibank REST API.
//!
//! Each method issues exactly one HTTP request and returns an [`ApiResult`].
//! Transport failures (DNS, TLS, timeout, connection reset) are reported as
//! [`ApiResult::Error`] values; an `Err` is only returned for local configuration
//! problems and for response bodies that are not JSON objects.
//!
//! [`MutasibankClient`] is async. The synchronous variant with the same operations
//! lives in [`blocking`] (enabled by the default `blocking` feature).

use crate::endpoints::{self, BodyEncoding, Endpoint};
use crate::errors::{MutasibankError, Result};
use crate::types::{
    AccountStatus, ApiError, ApiResult, MatchQuery, NewCategory, NewWebhook, StatementQuery,
    TokenInput, TopupRequest, TransactionType,
};
use crate::utils::{env_parse, env_var};
use chrono::NaiveDate;
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use url::Url;

#[cfg(feature = "blocking")]
pub mod blocking;

/// Production API base URL.
pub const DEFAULT_BASE_URL: &str = "https://mutasibank.co.id/api/v1";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 45;

/// Configuration for [`MutasibankClient`].
///
/// Certificate and hostname verification are always on; the client never accepts a
/// pre-built HTTP client.
#[derive(Clone)]
pub struct ClientConfig {
    /// API token from the Mutasibank dashboard, sent verbatim as `Authorization`
    pub api_key: String,

    /// API base URL
    pub base_url: String,

    /// Upper bound for one request, connect and body included
    pub timeout: Duration,

    /// `User-Agent` header value
    pub user_agent: String,
}

impl ClientConfig {
    /// Creates a configuration for the production API.
    ///
    /// # Examples
    ///
    /// ```
    /// use mutasibank::client::ClientConfig;
    /// use std::time::Duration;
    ///
    /// let config = ClientConfig::new("my-token").with_timeout(Duration::from_secs(10));
    /// assert_eq!(config.base_url, "https://mutasibank.co.id/api/v1");
    /// assert_eq!(config.timeout, Duration::from_secs(10));
    /// ```
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: format!("mutasibank-rs/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Loads the configuration from the environment.
    ///
    /// * `MUTASIBANK_API_TOKEN` (required)
    /// * `MUTASIBANK_REQUEST_TIMEOUT` in seconds (default 45)
    /// * `MUTASIBANK_BASE_URL` (default production)
    pub fn from_env() -> Result<Self> {
        let mut config = Self::new(env_var("MUTASIBANK_API_TOKEN")?)
            .with_timeout(Duration::from_secs(env_parse(
                "MUTASIBANK_REQUEST_TIMEOUT",
                DEFAULT_TIMEOUT_SECS,
            )?));
        if let Ok(base_url) = env_var("MUTASIBANK_BASE_URL") {
            config = config.with_base_url(base_url);
        }
        Ok(config)
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Points the client at another deployment of the API (staging, local mock).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the `User-Agent` header.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

/// Mutasibank API client.
///
/// Cheap to clone and safe to share between tasks; it holds no mutable state.
///
/// # Examples
///
/// ```no_run
/// use mutasibank::client::MutasibankClient;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = MutasibankClient::new("my-token")?;
/// let accounts = client.get_accounts().await?;
/// println!("{}", accounts.to_value());
/// # Ok(())
/// # }
/// ```
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
    ///
    /// Fails if the API key is empty or not a valid header value, or if the base URL
    /// does not parse.
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
    ///
    /// `body` is encoded as the endpoint dictates and ignored for endpoints without a
    /// body.
    pub async fn call<B>(
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
            "Sending Mutasibank request"
        );

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                let http_code = e.status().map(|s| s.as_u16()).unwrap_or(0);
                return Ok(transport_failure(endpoint, &e, http_code));
            }
        };

        let status = response.status().as_u16();
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => return Ok(transport_failure(endpoint, &e, status)),
        };

        decode_body(status, &body)
    }

    async fn fetch(&self, endpoint: Endpoint, params: &[&str]) -> Result<ApiResult> {
        self.call::<()>(endpoint, params, None).await
    }

    // ------------------------------------------------------------------
    // User and banks
    // ------------------------------------------------------------------

    /// Current user, including wallet balance and package.
    pub async fn get_user(&self) -> Result<ApiResult> {
        self.fetch(endpoints::USER, &[]).await
    }

    /// Supported banks and their configuration.
    pub async fn list_banks(&self) -> Result<ApiResult> {
        self.fetch(endpoints::LIST_BANK, &[]).await
    }

    // ------------------------------------------------------------------
    // Accounts
    // ------------------------------------------------------------------

    /// All registered bank accounts.
    pub async fn get_accounts(&self) -> Result<ApiResult> {
        self.fetch(endpoints::ACCOUNTS, &[]).await
    }

    /// One bank account.
    pub async fn get_account(&self, account_id: impl fmt::Display) -> Result<ApiResult> {
        let id = account_id.to_string();
        self.fetch(endpoints::ACCOUNT, &[id.as_str()]).await
    }

    /// Registers a bank account. The payload is sent as JSON; see
    /// [`NewAccount`](crate::types::NewAccount) for the accepted fields.
    pub async fn create_account<T>(&self, account: &T) -> Result<ApiResult>
    where
        T: Serialize + ?Sized,
    {
        self.call(endpoints::ACCOUNT_CREATE, &[], Some(account)).await
    }

    /// Updates a bank account with a JSON payload.
    pub async fn update_account<T>(
        &self,
        account_id: impl fmt::Display,
        changes: &T,
    ) -> Result<ApiResult>
    where
        T: Serialize + ?Sized,
    {
        let id = account_id.to_string();
        self.call(endpoints::ACCOUNT_UPDATE, &[id.as_str()], Some(changes)).await
    }

    /// Deletes a bank account.
    pub async fn delete_account(&self, account_id: impl fmt::Display) -> Result<ApiResult> {
        let id = account_id.to_string();
        self.fetch(endpoints::ACCOUNT_DELETE, &[id.as_str()]).await
    }

    /// Switches the bot of an account on or off.
    pub async fn set_account_status(
        &self,
        account_id: impl fmt::Display,
        enabled: bool,
    ) -> Result<ApiResult> {
        let id = account_id.to_string();
        self.call(endpoints::ACCOUNT_ON_OFF, &[id.as_str()], Some(&AccountStatus::new(enabled)))
            .await
    }

    /// Flips the on/off state of an account.
    pub async fn toggle_account(&self, account_id: impl fmt::Display) -> Result<ApiResult> {
        let id = account_id.to_string();
        self.call(endpoints::ACCOUNT_TOGGLE, &[id.as_str()], Some(&Value::Array(Vec::new())))
            .await
    }

    /// Submits the two KeyBCA tokens an account is waiting for.
    pub async fn input_token(
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
        self.call(endpoints::INPUT_TOKEN, &[id.as_str()], Some(&tokens)).await
    }

    /// Schedules an immediate bot check. The response carries the next run time.
    pub async fn rerun_check(&self, account_id: impl fmt::Display) -> Result<ApiResult> {
        let id = account_id.to_string();
        self.fetch(endpoints::RERUN, &[id.as_str()]).await
    }

    /// Bot activity history of an account.
    pub async fn get_bot_log(&self, account_id: impl fmt::Display) -> Result<ApiResult> {
        let id = account_id.to_string();
        self.fetch(endpoints::LOG_BOT, &[id.as_str()]).await
    }

    // ------------------------------------------------------------------
    // Statements and matching
    // ------------------------------------------------------------------

    /// Statement rows of an account between two dates (inclusive).
    pub async fn get_statements(
        &self,
        account_id: impl fmt::Display,
        date_from: NaiveDate,
        date_to: NaiveDate,
    ) -> Result<ApiResult> {
        let id = account_id.to_string();
        let query = StatementQuery::new(date_from, date_to);
        self.call(endpoints::STATEMENTS, &[id.as_str()], Some(&query)).await
    }

    /// First transaction with the given amount, optionally within a date range.
    ///
    /// The query is always sent form-urlencoded.
    pub async fn match_transaction(
        &self,
        account_id: impl fmt::Display,
        query: &MatchQuery,
    ) -> Result<ApiResult> {
        let id = account_id.to_string();
        self.call(endpoints::MATCH, &[id.as_str()], Some(query)).await
    }

    /// Every transaction with the given amount.
    pub async fn match_transactions(
        &self,
        account_id: impl fmt::Display,
        amount: u64,
    ) -> Result<ApiResult> {
        let id = account_id.to_string();
        self.call(endpoints::MATCH_ALL, &[id.as_str()], Some(&MatchQuery::new(amount)))
            .await
    }

    /// Confirms that a statement row exists server-side. Use it to double check
    /// transactions received through a webhook.
    pub async fn validate_transaction(
        &self,
        transaction_id: impl fmt::Display,
    ) -> Result<ApiResult> {
        let id = transaction_id.to_string();
        self.fetch(endpoints::VALIDATE, &[id.as_str()]).await
    }

    // ------------------------------------------------------------------
    // Categories
    // ------------------------------------------------------------------

    /// All transaction categories.
    pub async fn get_categories(&self) -> Result<ApiResult> {
        self.fetch(endpoints::CATEGORIES, &[]).await
    }

    /// One category.
    pub async fn get_category(&self, category_id: impl fmt::Display) -> Result<ApiResult> {
        let id = category_id.to_string();
        self.fetch(endpoints::CATEGORY, &[id.as_str()]).await
    }

    /// Creates a category.
    pub async fn create_category(
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
        self.call(endpoints::CATEGORY_CREATE, &[], Some(&category)).await
    }

    /// Updates a category with a JSON payload.
    pub async fn update_category<T>(
        &self,
        category_id: impl fmt::Display,
        changes: &T,
    ) -> Result<ApiResult>
    where
        T: Serialize + ?Sized,
    {
        let id = category_id.to_string();
        self.call(endpoints::CATEGORY_UPDATE, &[id.as_str()], Some(changes)).await
    }

    /// Deletes a category.
    pub async fn delete_category(&self, category_id: impl fmt::Display) -> Result<ApiResult> {
        let id = category_id.to_string();
        self.fetch(endpoints::CATEGORY_DELETE, &[id.as_str()]).await
    }

    // ------------------------------------------------------------------
    // Webhooks
    // ------------------------------------------------------------------

    /// All configured webhooks.
    pub async fn get_webhooks(&self) -> Result<ApiResult> {
        self.fetch(endpoints::WEBHOOKS, &[]).await
    }

    /// One webhook. The signing secret is not returned.
    pub async fn get_webhook(&self, webhook_id: impl fmt::Display) -> Result<ApiResult> {
        let id = webhook_id.to_string();
        self.fetch(endpoints::WEBHOOK, &[id.as_str()]).await
    }

    /// Creates a webhook. The response contains the signing secret, which is shown
    /// only once.
    pub async fn create_webhook(&self, webhook: &NewWebhook) -> Result<ApiResult> {
        self.call(endpoints::WEBHOOK_CREATE, &[], Some(webhook)).await
    }

    /// Updates a webhook with a JSON payload.
    pub async fn update_webhook<T>(
        &self,
        webhook_id: impl fmt::Display,
        changes: &T,
    ) -> Result<ApiResult>
    where
        T: Serialize + ?Sized,
    {
        let id = webhook_id.to_string();
        self.call(endpoints::WEBHOOK_UPDATE, &[id.as_str()], Some(changes)).await
    }

    /// Deletes a webhook.
    pub async fn delete_webhook(&self, webhook_id: impl fmt::Display) -> Result<ApiResult> {
        let id = webhook_id.to_string();
        self.fetch(endpoints::WEBHOOK_DELETE, &[id.as_str()]).await
    }

    // ------------------------------------------------------------------
    // Wallet
    // ------------------------------------------------------------------

    /// Creates a wallet top-up. The response holds the payment instructions.
    pub async fn topup_credit(&self, topup: TopupRequest) -> Result<ApiResult> {
        self.call(endpoints::TOPUP_KREDIT, &[], Some(&topup)).await
    }
}

impl fmt::Debug for MutasibankClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutasibankClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

/// Builds the `Authorization` header value: the raw token, marked sensitive.
pub(crate) fn authorization_header(api_key: &str) -> Result<HeaderValue> {
    if api_key.trim().is_empty() {
        return Err(MutasibankError::ConfigError("API key is empty".to_string()));
    }

    let mut authorization = HeaderValue::from_str(api_key).map_err(|_| {
        MutasibankError::ConfigError("API key contains invalid header characters".to_string())
    })?;
    authorization.set_sensitive(true);
    Ok(authorization)
}

pub(crate) fn transport_failure(
    endpoint: Endpoint,
    error: &reqwest::Error,
    http_code: u16,
) -> ApiResult {
    tracing::warn!(
        method = %endpoint.method,
        path = endpoint.path,
        http_code,
        error = %error,
        "Mutasibank request failed"
    );
    ApiResult::Error(ApiError::new(format!("HTTP transport error: {}", error), http_code))
}

/// Decodes a response body into a JSON object, whatever the HTTP status.
pub(crate) fn decode_body(status: u16, body: &[u8]) -> Result<ApiResult> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(ApiResult::Success(map)),
        Ok(_) => Err(MutasibankError::InvalidResponse {
            status,
            message: "expected a JSON object".to_string(),
        }),
        Err(e) => Err(MutasibankError::InvalidResponse {
            status,
            message: e.to_string(),
        }),
    }
}
