//! Endpoint descriptors of the Mutasibank REST API.
//!
//! Every operation of [`MutasibankClient`](crate::client::MutasibankClient) maps to exactly
//! one descriptor here. The body encoding is part of the descriptor because the API
//! enforces it per endpoint: sending JSON where it expects a form (or the other way
//! round) makes the server fail to parse the request.

use crate::errors::{MutasibankError, Result};
use reqwest::Method;
use std::fmt;
use url::Url;

/// HTTP verbs used by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// DELETE
    Delete,
}

impl HttpMethod {
    /// Converts to the `reqwest` method.
    pub fn as_method(&self) -> Method {
        match self {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Delete => Method::DELETE,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        })
    }
}

/// How the request body is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyEncoding {
    /// No body
    None,
    /// `application/json`
    Json,
    /// `application/x-www-form-urlencoded`
    Form,
}

impl BodyEncoding {
    /// Content-Type sent with the body, if any.
    pub fn content_type(&self) -> Option<&'static str> {
        match self {
            BodyEncoding::None => None,
            BodyEncoding::Json => Some("application/json"),
            BodyEncoding::Form => Some("application/x-www-form-urlencoded"),
        }
    }
}

/// A fixed (method, path template, body encoding) triple.
///
/// Path templates use `{name}` placeholders, substituted in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    /// HTTP method
    pub method: HttpMethod,
    /// Path relative to the API base, e.g. `/account/{id}`
    pub path: &'static str,
    /// Body encoding enforced by the server
    pub encoding: BodyEncoding,
}

impl Endpoint {
    const fn new(method: HttpMethod, path: &'static str, encoding: BodyEncoding) -> Self {
        Self {
            method,
            path,
            encoding,
        }
    }

    /// Resolves the path template against `base`, percent-encoding each parameter as
    /// one path segment.
    ///
    /// # Examples
    ///
    /// ```
    /// use mutasibank::endpoints::ACCOUNT_TOGGLE;
    /// use url::Url;
    ///
    /// let base = Url::parse("https://mutasibank.co.id/api/v1").unwrap();
    /// let url = ACCOUNT_TOGGLE.url(&base, &["a b"]).unwrap();
    /// assert_eq!(url.as_str(), "https://mutasibank.co.id/api/v1/account/a%20b/toggle");
    /// ```
    pub fn url(&self, base: &Url, params: &[&str]) -> Result<Url> {
        let mut url = base.clone();
        let mut params = params.iter();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                MutasibankError::ConfigError(format!("Base URL cannot carry a path: {}", base))
            })?;
            segments.pop_if_empty();

            for segment in self.path.trim_start_matches('/').split('/') {
                if segment.starts_with('{') && segment.ends_with('}') {
                    let value = params.next().ok_or_else(|| {
                        MutasibankError::Other(format!("Missing {} for {}", segment, self.path))
                    })?;
                    if value.is_empty() {
                        return Err(MutasibankError::Other(format!(
                            "Empty {} for {}",
                            segment, self.path
                        )));
                    }
                    segments.push(value);
                } else {
                    segments.push(segment);
                }
            }
        }

        if params.next().is_some() {
            return Err(MutasibankError::Other(format!(
                "Too many path parameters for {}",
                self.path
            )));
        }

        Ok(url)
    }
}

use BodyEncoding::{Form, Json, None as NoBody};
use HttpMethod::{Delete, Get, Post, Put};

/// `GET /user`
pub const USER: Endpoint = Endpoint::new(Get, "/user", NoBody);
/// `GET /list_bank`
pub const LIST_BANK: Endpoint = Endpoint::new(Get, "/list_bank", NoBody);

/// `GET /accounts`
pub const ACCOUNTS: Endpoint = Endpoint::new(Get, "/accounts", NoBody);
/// `GET /account/{id}`
pub const ACCOUNT: Endpoint = Endpoint::new(Get, "/account/{id}", NoBody);
/// `POST /account/create`, JSON
pub const ACCOUNT_CREATE: Endpoint = Endpoint::new(Post, "/account/create", Json);
/// `PUT /account/{id}`, JSON
pub const ACCOUNT_UPDATE: Endpoint = Endpoint::new(Put, "/account/{id}", Json);
/// `DELETE /account/{id}`
pub const ACCOUNT_DELETE: Endpoint = Endpoint::new(Delete, "/account/{id}", NoBody);
/// `POST /on_off/{id}`, form
pub const ACCOUNT_ON_OFF: Endpoint = Endpoint::new(Post, "/on_off/{id}", Form);
/// `POST /account/{id}/toggle`, JSON
pub const ACCOUNT_TOGGLE: Endpoint = Endpoint::new(Post, "/account/{id}/toggle", Json);
/// `POST /input_token/{id}`, form
pub const INPUT_TOKEN: Endpoint = Endpoint::new(Post, "/input_token/{id}", Form);
/// `GET /rerun/{id}`
pub const RERUN: Endpoint = Endpoint::new(Get, "/rerun/{id}", NoBody);
/// `GET /log_bot/{id}`
pub const LOG_BOT: Endpoint = Endpoint::new(Get, "/log_bot/{id}", NoBody);

/// `POST /statements/{id}`, form
pub const STATEMENTS: Endpoint = Endpoint::new(Post, "/statements/{id}", Form);
/// `POST /match/{id}`, form
pub const MATCH: Endpoint = Endpoint::new(Post, "/match/{id}", Form);
/// `POST /matchs/{id}`, form
pub const MATCH_ALL: Endpoint = Endpoint::new(Post, "/matchs/{id}", Form);
/// `GET /validate/{id}`
pub const VALIDATE: Endpoint = Endpoint::new(Get, "/validate/{id}", NoBody);

/// `GET /categories`
pub const CATEGORIES: Endpoint = Endpoint::new(Get, "/categories", NoBody);
/// `GET /category/{id}`
pub const CATEGORY: Endpoint = Endpoint::new(Get, "/category/{id}", NoBody);
/// `POST /category`, JSON
pub const CATEGORY_CREATE: Endpoint = Endpoint::new(Post, "/category", Json);
/// `PUT /category/{id}`, JSON
pub const CATEGORY_UPDATE: Endpoint = Endpoint::new(Put, "/category/{id}", Json);
/// `DELETE /category/{id}`
pub const CATEGORY_DELETE: Endpoint = Endpoint::new(Delete, "/category/{id}", NoBody);

/// `GET /webhooks`
pub const WEBHOOKS: Endpoint = Endpoint::new(Get, "/webhooks", NoBody);
/// `GET /webhook/{id}`
pub const WEBHOOK: Endpoint = Endpoint::new(Get, "/webhook/{id}", NoBody);
/// `POST /webhook`, JSON
pub const WEBHOOK_CREATE: Endpoint = Endpoint::new(Post, "/webhook", Json);
/// `PUT /webhook/{id}`, JSON
pub const WEBHOOK_UPDATE: Endpoint = Endpoint::new(Put, "/webhook/{id}", Json);
/// `DELETE /webhook/{id}`
pub const WEBHOOK_DELETE: Endpoint = Endpoint::new(Delete, "/webhook/{id}", NoBody);

/// `POST /topup_kredit`, form
pub const TOPUP_KREDIT: Endpoint = Endpoint::new(Post, "/topup_kredit", Form);

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://mutasibank.co.id/api/v1").unwrap()
    }

    #[test]
    fn test_static_path() {
        let url = USER.url(&base(), &[]).unwrap();
        assert_eq!(url.as_str(), "https://mutasibank.co.id/api/v1/user");
    }

    #[test]
    fn test_trailing_slash_base() {
        let base = Url::parse("https://mutasibank.co.id/api/v1/").unwrap();
        let url = ACCOUNT.url(&base, &["7"]).unwrap();
        assert_eq!(url.as_str(), "https://mutasibank.co.id/api/v1/account/7");
    }

    #[test]
    fn test_parameter_is_one_segment() {
        let url = VALIDATE.url(&base(), &["../user"]).unwrap();
        assert_eq!(url.path(), "/api/v1/validate/..%2Fuser");
    }

    #[test]
    fn test_parameter_count_mismatch() {
        assert!(ACCOUNT.url(&base(), &[]).is_err());
        assert!(ACCOUNT.url(&base(), &["1", "2"]).is_err());
        assert!(ACCOUNT.url(&base(), &[""]).is_err());
    }

    #[test]
    fn test_encodings_follow_endpoint_table() {
        let json_endpoints = [
            ACCOUNT_CREATE,
            ACCOUNT_UPDATE,
            ACCOUNT_TOGGLE,
            CATEGORY_CREATE,
            WEBHOOK_UPDATE,
        ];
        for endpoint in json_endpoints {
            assert_eq!(endpoint.encoding, BodyEncoding::Json, "{}", endpoint.path);
        }
        for endpoint in [MATCH, MATCH_ALL, STATEMENTS, ACCOUNT_ON_OFF, INPUT_TOKEN, TOPUP_KREDIT] {
            assert_eq!(endpoint.encoding, BodyEncoding::Form, "{}", endpoint.path);
        }
        for endpoint in [USER, ACCOUNT_DELETE, VALIDATE, WEBHOOK_DELETE] {
            assert_eq!(endpoint.encoding.content_type(), None, "{}", endpoint.path);
        }
    }
}
