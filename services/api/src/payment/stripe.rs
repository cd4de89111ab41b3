//! Stripe Checkout client
//!
//! Creates hosted checkout sessions through the form-encoded REST API.
//! Every call carries an explicit timeout and is retried with exponential
//! backoff on connection errors, timeouts, 429 and 5xx responses. The
//! booking id doubles as the `Idempotency-Key`, so a retried request can
//! never open a second session for the same booking.

use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{CheckoutSession, CheckoutSessionRequest, LineItemPrice, PaymentProcessor, ProcessorError};

/// Stripe configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StripeConfig {
    pub secret_key: String,
    pub webhook_secret: String,
    pub api_base: String,
    /// Redirect target after payment; `?session_id=...` is appended
    pub success_url: String,
    pub cancel_url: String,
    pub currency: String,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    pub webhook_tolerance_secs: u64,
    /// Processor price id per service type
    pub price_ids: HashMap<String, String>,
}

impl Default for StripeConfig {
    fn default() -> Self {
        Self {
            secret_key: String::new(),
            webhook_secret: String::new(),
            api_base: "https://api.stripe.com".to_string(),
            success_url: "http://localhost:3000/booking/success".to_string(),
            cancel_url: "http://localhost:3000/booking/cancel".to_string(),
            currency: "usd".to_string(),
            request_timeout_secs: 10,
            max_retries: 2,
            retry_backoff_ms: 250,
            webhook_tolerance_secs: 300,
            price_ids: HashMap::new(),
        }
    }
}

#[derive(Deserialize)]
struct SessionResponse {
    id: String,
    url: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Encode a session request as Stripe form parameters
pub fn form_params(request: &CheckoutSessionRequest) -> Vec<(String, String)> {
    let mut params = vec![
        ("mode".to_string(), "payment".to_string()),
        ("payment_method_types[0]".to_string(), "card".to_string()),
        (
            "line_items[0][quantity]".to_string(),
            request.quantity.to_string(),
        ),
    ];

    match &request.price {
        LineItemPrice::PriceId(price) => {
            params.push(("line_items[0][price]".to_string(), price.clone()));
        }
        LineItemPrice::Inline {
            currency,
            unit_amount_cents,
            product_name,
        } => {
            params.push((
                "line_items[0][price_data][currency]".to_string(),
                currency.clone(),
            ));
            params.push((
                "line_items[0][price_data][unit_amount]".to_string(),
                unit_amount_cents.to_string(),
            ));
            params.push((
                "line_items[0][price_data][product_data][name]".to_string(),
                product_name.clone(),
            ));
        }
    }

    params.push(("success_url".to_string(), request.success_url.clone()));
    params.push(("cancel_url".to_string(), request.cancel_url.clone()));
    params.push((
        "client_reference_id".to_string(),
        request.client_reference_id.clone(),
    ));
    params.push(("customer_email".to_string(), request.customer_email.clone()));
    for (key, value) in &request.metadata {
        params.push((format!("metadata[{key}]"), value.clone()));
    }

    params
}

/// Stripe API client
#[derive(Clone)]
pub struct StripeClient {
    http: Client,
    config: StripeConfig,
}

impl StripeClient {
    pub fn new(config: StripeConfig) -> Result<Self, ProcessorError> {
        let timeout = Duration::from_secs(config.request_timeout_secs.max(1));
        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| ProcessorError::Unavailable(e.to_string()))?;

        Ok(Self { http, config })
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.min(10);
        Duration::from_millis(self.config.retry_backoff_ms.saturating_mul(factor))
    }

    async fn rejected(status: StatusCode, response: reqwest::Response) -> ProcessorError {
        let message = response
            .json::<ErrorEnvelope>()
            .await
            .ok()
            .and_then(|envelope| envelope.error.message)
            .unwrap_or_else(|| status.to_string());
        ProcessorError::Rejected {
            status: status.as_u16(),
            message,
        }
    }
}

#[async_trait]
impl PaymentProcessor for StripeClient {
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, ProcessorError> {
        if self.config.secret_key.is_empty() {
            return Err(ProcessorError::NotConfigured);
        }

        let url = format!(
            "{}/v1/checkout/sessions",
            self.config.api_base.trim_end_matches('/')
        );
        let params = form_params(request);
        let idempotency_key = request.booking_id.to_string();

        let mut attempt = 0;
        loop {
            let result = self
                .http
                .post(&url)
                .bearer_auth(&self.config.secret_key)
                .header("Idempotency-Key", &idempotency_key)
                .form(&params)
                .send()
                .await;

            let failure = match result {
                Ok(response) if response.status().is_success() => {
                    let session: SessionResponse = response
                        .json()
                        .await
                        .map_err(|e| ProcessorError::InvalidResponse(e.to_string()))?;
                    let url = session.url.ok_or_else(|| {
                        ProcessorError::InvalidResponse("checkout session has no url".to_string())
                    })?;

                    info!(
                        booking_id = %request.booking_id,
                        session_id = %session.id,
                        attempts = attempt + 1,
                        "Checkout session created"
                    );
                    return Ok(CheckoutSession {
                        id: session.id,
                        url,
                    });
                }
                Ok(response)
                    if response.status() == StatusCode::TOO_MANY_REQUESTS
                        || response.status().is_server_error() =>
                {
                    format!("HTTP {}", response.status())
                }
                Ok(response) => {
                    let status = response.status();
                    return Err(Self::rejected(status, response).await);
                }
                Err(e) => e.to_string(),
            };

            if attempt >= self.config.max_retries {
                warn!(
                    booking_id = %request.booking_id,
                    attempts = attempt + 1,
                    error = %failure,
                    "Giving up on checkout session"
                );
                return Err(ProcessorError::Unavailable(failure));
            }

            let delay = self.backoff(attempt);
            debug!(
                booking_id = %request.booking_id,
                attempt = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                error = %failure,
                "Retrying checkout session request"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    use axum::{
        Form, Json, Router,
        extract::State,
        http::{HeaderMap, StatusCode as AxumStatus},
        response::{IntoResponse, Response},
        routing::post,
    };
    use serde_json::json;
    use uuid::Uuid;

    #[derive(Clone, Default)]
    struct FakeStripe {
        calls: Arc<AtomicUsize>,
        failures_before_success: usize,
        reject: bool,
        seen_keys: Arc<Mutex<Vec<String>>>,
        seen_forms: Arc<Mutex<Vec<HashMap<String, String>>>>,
    }

    async fn create_session(
        State(fake): State<FakeStripe>,
        headers: HeaderMap,
        Form(form): Form<HashMap<String, String>>,
    ) -> Response {
        let call = fake.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(key) = headers.get("idempotency-key").and_then(|v| v.to_str().ok()) {
            fake.seen_keys.lock().unwrap().push(key.to_string());
        }
        fake.seen_forms.lock().unwrap().push(form);

        if fake.reject {
            return (
                AxumStatus::BAD_REQUEST,
                Json(json!({"error": {"message": "No such price"}})),
            )
                .into_response();
        }
        if call < fake.failures_before_success {
            return AxumStatus::SERVICE_UNAVAILABLE.into_response();
        }
        Json(json!({"id": "cs_test_123", "url": "https://checkout.stripe.test/pay/cs_test_123"}))
            .into_response()
    }

    async fn spawn(fake: FakeStripe) -> String {
        let app = Router::new()
            .route("/v1/checkout/sessions", post(create_session))
            .with_state(fake);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn client(api_base: String, max_retries: u32) -> StripeClient {
        StripeClient::new(StripeConfig {
            secret_key: "sk_test".to_string(),
            api_base,
            max_retries,
            retry_backoff_ms: 1,
            ..StripeConfig::default()
        })
        .unwrap()
    }

    fn request() -> CheckoutSessionRequest {
        let booking_id = Uuid::new_v4();
        CheckoutSessionRequest {
            booking_id,
            price: LineItemPrice::Inline {
                currency: "usd".to_string(),
                unit_amount_cents: 15_000,
                product_name: "Portrait Session".to_string(),
            },
            quantity: 3,
            customer_email: "client@example.com".to_string(),
            success_url: "http://localhost/success?session_id={CHECKOUT_SESSION_ID}".to_string(),
            cancel_url: "http://localhost/cancel?session_id={CHECKOUT_SESSION_ID}".to_string(),
            client_reference_id: booking_id.to_string(),
            metadata: BTreeMap::from([("booking_id".to_string(), booking_id.to_string())]),
        }
    }

    #[test]
    fn test_form_params_with_price_id() {
        let mut req = request();
        req.price = LineItemPrice::PriceId("price_portrait".to_string());
        let params: HashMap<_, _> = form_params(&req).into_iter().collect();

        assert_eq!(params["mode"], "payment");
        assert_eq!(params["line_items[0][price]"], "price_portrait");
        assert_eq!(params["line_items[0][quantity]"], "3");
        assert_eq!(params["metadata[booking_id]"], req.booking_id.to_string());
        assert!(!params.contains_key("line_items[0][price_data][currency]"));
    }

    #[tokio::test]
    async fn test_retries_transient_failures_with_same_idempotency_key() {
        let fake = FakeStripe {
            failures_before_success: 2,
            ..FakeStripe::default()
        };
        let base = spawn(fake.clone()).await;
        let req = request();

        let session = client(base, 2).create_checkout_session(&req).await.unwrap();
        assert_eq!(session.id, "cs_test_123");
        assert_eq!(fake.calls.load(Ordering::SeqCst), 3);

        let keys = fake.seen_keys.lock().unwrap().clone();
        assert_eq!(keys, vec![req.booking_id.to_string(); 3]);

        let forms = fake.seen_forms.lock().unwrap().clone();
        assert_eq!(forms[0]["client_reference_id"], req.booking_id.to_string());
        assert_eq!(forms[0]["line_items[0][price_data][unit_amount]"], "15000");
    }

    #[tokio::test]
    async fn test_exhausted_retries_are_unavailable() {
        let fake = FakeStripe {
            failures_before_success: usize::MAX,
            ..FakeStripe::default()
        };
        let base = spawn(fake.clone()).await;

        let err = client(base, 1)
            .create_checkout_session(&request())
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessorError::Unavailable(_)));
        assert_eq!(fake.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let fake = FakeStripe {
            reject: true,
            ..FakeStripe::default()
        };
        let base = spawn(fake.clone()).await;

        let err = client(base, 3)
            .create_checkout_session(&request())
            .await
            .unwrap_err();
        match err {
            ProcessorError::Rejected { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "No such price");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
        assert_eq!(fake.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_connection_refused_is_unavailable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client(format!("http://{addr}"), 1)
            .create_checkout_session(&request())
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessorError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_missing_secret_key() {
        let client = StripeClient::new(StripeConfig::default()).unwrap();
        assert!(matches!(
            client.create_checkout_session(&request()).await,
            Err(ProcessorError::NotConfigured)
        ));
    }
}
