//! Notification gateway client.
//!
//! Every chunk is one `POST` of `{"to", "content"}` to the configured hook
//! URL, authenticated with a shared secret header. There is no retry here:
//! a failed chunk fails its message, and the dispatcher retries the whole
//! message on a later tick.

use std::future::Future;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use hub_common::error::DeliveryError;
use hub_common::types::{GatewayResponse, OutboundMessage};

/// Header carrying the shared gateway secret.
pub const AUTH_HEADER: &str = "x-ins-auth-key";

/// Sends one chunk to the downstream gateway.
pub trait DeliveryClient: Send + Sync {
    fn send(
        &self,
        message: &OutboundMessage,
    ) -> impl Future<Output = Result<GatewayResponse, DeliveryError>> + Send;
}

/// HTTP webhook implementation of [`DeliveryClient`].
pub struct GatewayClient {
    url: String,
    secret: SecretString,
    client: reqwest::Client,
}

impl GatewayClient {
    pub fn new(url: String, secret: SecretString, timeout: Duration) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        Ok(Self {
            url,
            secret,
            client,
        })
    }
}

impl DeliveryClient for GatewayClient {
    async fn send(&self, message: &OutboundMessage) -> Result<GatewayResponse, DeliveryError> {
        let response = self
            .client
            .post(&self.url)
            .header(AUTH_HEADER, self.secret.expose_secret())
            .json(message)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            tracing::debug!(status = status.as_u16(), body = %body, "Gateway rejected chunk");
            return Err(DeliveryError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<GatewayResponse>()
            .await
            .map_err(DeliveryError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::Json;
    use axum::Router;
    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use serde_json::{Value, json};
    use uuid::Uuid;

    use super::*;

    #[derive(Clone, Default)]
    struct Recorded {
        requests: Arc<Mutex<Vec<(Option<String>, Value)>>>,
    }

    async fn accept(
        State(recorded): State<Recorded>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        let secret = headers
            .get(AUTH_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        recorded.requests.lock().unwrap().push((secret, body));
        (
            StatusCode::ACCEPTED,
            Json(json!({ "message": "Accepted", "messageId": Uuid::new_v4().to_string() })),
        )
    }

    async fn reject() -> (StatusCode, &'static str) {
        (StatusCode::SERVICE_UNAVAILABLE, "gateway overloaded")
    }

    async fn garbage() -> &'static str {
        "not json"
    }

    /// Serve `router` on an ephemeral port and return its base URL.
    async fn spawn_gateway(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client_for(base: &str, path: &str) -> GatewayClient {
        GatewayClient::new(
            format!("{}{}", base, path),
            SecretString::from("s3cret".to_string()),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn outbound() -> OutboundMessage {
        OutboundMessage {
            to: "5325008081".to_string(),
            content: "Hello".to_string(),
        }
    }

    #[tokio::test]
    async fn test_send_posts_json_with_secret_header() {
        let recorded = Recorded::default();
        let router = Router::new()
            .route("/hook", post(accept))
            .with_state(recorded.clone());
        let base = spawn_gateway(router).await;

        let response = client_for(&base, "/hook").send(&outbound()).await.unwrap();

        assert_eq!(response.message, "Accepted");
        assert!(Uuid::parse_str(&response.message_id).is_ok());

        let requests = recorded.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].0.as_deref(), Some("s3cret"));
        assert_eq!(requests[0].1, json!({ "to": "5325008081", "content": "Hello" }));
    }

    #[tokio::test]
    async fn test_non_success_status_carries_code_and_body() {
        let base = spawn_gateway(Router::new().route("/hook", post(reject))).await;

        let err = client_for(&base, "/hook").send(&outbound()).await.unwrap_err();

        match err {
            DeliveryError::Status { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "gateway overloaded");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_undecodable_body_is_decode_error() {
        let base = spawn_gateway(Router::new().route("/hook", post(garbage))).await;

        let err = client_for(&base, "/hook").send(&outbound()).await.unwrap_err();

        assert!(matches!(err, DeliveryError::Decode(_)));
    }

    #[tokio::test]
    async fn test_unreachable_gateway_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client_for(&format!("http://{}", addr), "/hook")
            .send(&outbound())
            .await
            .unwrap_err();

        assert!(matches!(err, DeliveryError::Transport(_)));
    }
}
