//! Checkout through webhook confirmation, driven over HTTP

mod support;

use api::{
    models::booking::{BookingStatus, PaymentStatus},
    repositories::BookingStore,
};
use axum::http::StatusCode;
use serde_json::{Value, json};
use support::{Harness, ScriptedProcessor, get, json_request, sign, webhook_request};
use uuid::Uuid;

fn checkout_body() -> Value {
    json!({
        "client_name": "Ada Lovelace",
        "client_email": "ada@example.com",
        "client_phone": "+44 20 7946 0000",
        "service_type": "portrait",
        "description": "Studio headshots",
        "scheduled_date": "2026-07-01T10:00:00Z",
        "duration": 3
    })
}

fn completed_event(session_id: &str, booking_id: Option<Uuid>) -> Vec<u8> {
    let mut session = json!({ "id": session_id, "payment_status": "paid" });
    if let Some(id) = booking_id {
        session["client_reference_id"] = json!(id.to_string());
    }
    serde_json::to_vec(&json!({
        "id": format!("evt_{}", Uuid::new_v4().simple()),
        "type": "checkout.session.completed",
        "data": { "object": session }
    }))
    .unwrap()
}

async fn start_checkout(harness: &Harness) -> (Uuid, String) {
    let (status, body) = harness
        .send(json_request("POST", "/api/stripe/checkout", &checkout_body(), None))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let booking_id: Uuid = body["booking_id"].as_str().unwrap().parse().unwrap();
    let session_id = body["session_id"].as_str().unwrap().to_string();
    assert!(body["checkout_url"].as_str().unwrap().starts_with("https://checkout.test/"));
    (booking_id, session_id)
}

#[tokio::test]
async fn test_checkout_then_webhook_confirms_booking() {
    let harness = Harness::new();
    let (booking_id, session_id) = start_checkout(&harness).await;

    let booking = harness.bookings.find_by_id(booking_id).await.unwrap().unwrap();
    assert_eq!(booking.price_cents, 45_000);
    assert_eq!(booking.status, BookingStatus::Pending);
    assert_eq!(booking.payment_status, PaymentStatus::Pending);
    assert_eq!(booking.checkout_session_id.as_deref(), Some(session_id.as_str()));

    let payload = completed_event(&session_id, Some(booking_id));
    let (status, body) = harness
        .send(webhook_request(&payload, Some(sign(&payload))))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "received": true }));

    let booking = harness.bookings.find_by_id(booking_id).await.unwrap().unwrap();
    assert_eq!(booking.status, BookingStatus::Confirmed);
    assert_eq!(booking.payment_status, PaymentStatus::Paid);
    assert!(booking.paid_at.is_some());

    let (status, body) = harness
        .send(get(&format!("/api/stripe/success?session_id={session_id}"), None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["booking"]["status"], "confirmed");
    assert_eq!(body["booking"]["payment_status"], "paid");
    assert_eq!(body["booking"]["price"], 450.0);
}

#[tokio::test]
async fn test_replayed_webhook_is_acknowledged() {
    let harness = Harness::new();
    let (booking_id, session_id) = start_checkout(&harness).await;
    let payload = completed_event(&session_id, None);

    let (first, _) = harness
        .send(webhook_request(&payload, Some(sign(&payload))))
        .await;
    let paid = harness.bookings.find_by_id(booking_id).await.unwrap().unwrap();

    let (second, _) = harness
        .send(webhook_request(&payload, Some(sign(&payload))))
        .await;
    assert_eq!((first, second), (StatusCode::OK, StatusCode::OK));
    assert_eq!(harness.bookings.find_by_id(booking_id).await.unwrap().unwrap(), paid);
}

#[tokio::test]
async fn test_forged_webhook_is_rejected() {
    let harness = Harness::new();
    let (booking_id, session_id) = start_checkout(&harness).await;
    let payload = completed_event(&session_id, Some(booking_id));

    let forged = api::payment::signature::sign(&payload, "whsec_attacker", chrono::Utc::now().timestamp())
        .unwrap();
    let (status, body) = harness.send(webhook_request(&payload, Some(forged))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, _) = harness.send(webhook_request(&payload, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let booking = harness.bookings.find_by_id(booking_id).await.unwrap().unwrap();
    assert_eq!(booking.payment_status, PaymentStatus::Pending);
}

#[tokio::test]
async fn test_webhook_for_unknown_booking_fails() {
    let harness = Harness::new();
    let (booking_id, _) = start_checkout(&harness).await;

    let payload = completed_event("cs_missing", Some(Uuid::new_v4()));
    let (status, body) = harness
        .send(webhook_request(&payload, Some(sign(&payload))))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Internal server error");

    let booking = harness.bookings.find_by_id(booking_id).await.unwrap().unwrap();
    assert_eq!(booking.status, BookingStatus::Pending);
}

#[tokio::test]
async fn test_invalid_checkout_requests() {
    let harness = Harness::new();

    for (field, value) in [
        ("service_type", json!("drone")),
        ("scheduled_date", json!("next tuesday")),
        ("duration", json!(0)),
        ("client_email", json!("ada")),
    ] {
        let mut body = checkout_body();
        body[field] = value;
        let (status, response) = harness
            .send(json_request("POST", "/api/stripe/checkout", &body, None))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{field}");
        assert_eq!(response["error"], "validation_error");
    }

    let (status, _) = harness
        .send(json_request("POST", "/api/stripe/checkout", &json!({"client_name": "Ada"}), None))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(harness.bookings.all().await.is_empty());
}

#[tokio::test]
async fn test_processor_outage_keeps_pending_booking() {
    let harness = Harness::with_processor(ScriptedProcessor {
        unavailable: true,
        ..ScriptedProcessor::default()
    });

    let (status, body) = harness
        .send(json_request("POST", "/api/stripe/checkout", &checkout_body(), None))
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "service_unavailable");

    let bookings = harness.bookings.all().await;
    assert_eq!(bookings.len(), 1);
    assert_eq!(bookings[0].status, BookingStatus::Pending);
    assert_eq!(bookings[0].checkout_session_id, None);
    assert_eq!(harness.processor.requests.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_redirect_pages() {
    let harness = Harness::new();
    let (_, session_id) = start_checkout(&harness).await;

    let (status, _) = harness
        .send(get("/api/stripe/success?session_id=cs_unknown", None))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = harness.send(get("/api/stripe/success", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = harness
        .send(get(&format!("/api/stripe/cancel?session_id={session_id}"), None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Payment cancelled");
    assert_eq!(body["booking"]["status"], "pending");

    let (status, body) = harness.send(get("/api/stripe/cancel", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["booking"], Value::Null);
}
