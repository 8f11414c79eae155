//! Axum integration for receiving Mutasibank webhooks.
//!
//! The router hands the raw request body to [`WebhookVerifier`] before any JSON
//! parsing, so the signature is always checked over the exact bytes that were sent.
//!
//! ```rust,no_run
//! use mutasibank::server::webhook_router;
//! use mutasibank::webhook::{WebhookConfig, WebhookVerifier};
//! # use mutasibank::webhook::TransactionHandler;
//! # use mutasibank::types::{TransactionRecord, WebhookEnvelope};
//! # struct Noop;
//! # #[async_trait::async_trait]
//! # impl TransactionHandler for Noop {
//! #     async fn handle(
//! #         &self,
//! #         _: &WebhookEnvelope,
//! #         _: &TransactionRecord,
//! #     ) -> mutasibank::Result<()> {
//! #         Ok(())
//! #     }
//! # }
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let verifier = WebhookVerifier::new(WebhookConfig::from_env()?)?;
//! let app = webhook_router(Arc::new(verifier), Arc::new(Noop));
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

use crate::errors::WebhookError;
use crate::types::WebhookAck;
use crate::webhook::{TransactionHandler, WebhookVerifier};
use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use std::sync::Arc;

/// Path the router listens on.
pub const WEBHOOK_PATH: &str = "/webhook/mutasibank";

struct WebhookState<H: ?Sized> {
    verifier: Arc<WebhookVerifier>,
    handler: Arc<H>,
}

impl<H: ?Sized> Clone for WebhookState<H> {
    fn clone(&self) -> Self {
        Self {
            verifier: Arc::clone(&self.verifier),
            handler: Arc::clone(&self.handler),
        }
    }
}

/// Builds a router serving `POST /webhook/mutasibank`.
///
/// Accepted deliveries answer 200 with a [`WebhookAck`]. Rejections answer with
/// [`WebhookError::status_code`] and [`WebhookError::body`].
pub fn webhook_router<H>(verifier: Arc<WebhookVerifier>, handler: Arc<H>) -> Router
where
    H: TransactionHandler + ?Sized + 'static,
{
    Router::new()
        .route(WEBHOOK_PATH, post(receive_webhook::<H>))
        .with_state(WebhookState { verifier, handler })
}

async fn receive_webhook<H>(
    State(state): State<WebhookState<H>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, WebhookError>
where
    H: TransactionHandler + ?Sized + 'static,
{
    let ack = state
        .verifier
        .process(&headers, &body, state.handler.as_ref())
        .await?;
    Ok(Json(ack))
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Result;
    use crate::types::{TransactionRecord, WebhookEnvelope};
    use crate::utils::{compute_signature, current_timestamp};
    use crate::webhook::{WebhookConfig, SIGNATURE_HEADER, TIMESTAMP_HEADER};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    struct Accept;

    #[async_trait]
    impl TransactionHandler for Accept {
        async fn handle(
            &self,
            _envelope: &WebhookEnvelope,
            _transaction: &TransactionRecord,
        ) -> Result<()> {
            Ok(())
        }
    }

    fn app() -> Router {
        let verifier = WebhookVerifier::new(WebhookConfig::new("secret", "token")).unwrap();
        webhook_router(Arc::new(verifier), Arc::new(Accept))
    }

    async fn json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_signed_delivery_is_acknowledged() {
        let body = serde_json::to_string(&json!({
            "api_key": "token",
            "account_id": 1,
            "account_name": "A",
            "account_number": "1",
            "module": "bca",
            "balance": 0,
            "data_mutasi": []
        }))
        .unwrap();
        let request = Request::post(WEBHOOK_PATH)
            .header(SIGNATURE_HEADER, compute_signature("secret", body.as_bytes()))
            .header(TIMESTAMP_HEADER, current_timestamp().to_string())
            .body(Body::from(body))
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let ack = json_body(response).await;
        assert_eq!(ack["success"], true);
        assert_eq!(ack["transactions_processed"], 0);
    }

    #[tokio::test]
    async fn test_unsigned_delivery_is_unauthorized() {
        let request = Request::post(WEBHOOK_PATH).body(Body::from("{}")).unwrap();

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["error"], "MissingSignatureHeaders");
    }

    #[tokio::test]
    async fn test_only_post_is_routed() {
        let request = Request::get(WEBHOOK_PATH).body(Body::empty()).unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
