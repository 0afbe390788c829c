mod common;

use axum::{body::Body, http::Request};
use common::TestApp;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id};
use tracing::Subscriber;
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

/// Records the `request_id` field of every `http_request` span.
#[derive(Clone, Default)]
struct SpanRequestIds(Arc<Mutex<Vec<String>>>);

struct RequestIdField(Option<String>);

impl Visit for RequestIdField {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "request_id" {
            self.0 = Some(format!("{:?}", value));
        }
    }
}

impl<S: Subscriber> Layer<S> for SpanRequestIds {
    fn on_new_span(&self, attrs: &Attributes<'_>, _id: &Id, _ctx: Context<'_, S>) {
        if attrs.metadata().name() != "http_request" {
            return;
        }
        let mut field = RequestIdField(None);
        attrs.record(&mut field);
        if let Some(id) = field.0 {
            self.0.lock().unwrap().push(id);
        }
    }
}

fn recorded(ids: &SpanRequestIds) -> Vec<String> {
    ids.0.lock().unwrap().clone()
}

#[tokio::test]
async fn test_span_uses_minted_request_id() {
    let ids = SpanRequestIds::default();
    let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(ids.clone()));
    let t = TestApp::new().await;

    let response = t
        .app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let minted = response
        .headers()
        .get("x-request-id")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert_ne!(minted, "unknown");
    assert_eq!(recorded(&ids), vec![minted]);
}

#[tokio::test]
async fn test_incoming_request_id_is_echoed() {
    let ids = SpanRequestIds::default();
    let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(ids.clone()));
    let t = TestApp::new().await;

    let response = t
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/tools")
                .header("x-request-id", "client-42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.headers()["x-request-id"], "client-42");
    assert_eq!(recorded(&ids), vec!["client-42".to_string()]);
}
