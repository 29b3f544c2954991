//! Drives the full router in-process.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use bookstore_db::EntityStore;
use bookstore_kernel::{settings::Settings, ModuleRegistry};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

pub(crate) fn app(store: Arc<dyn EntityStore>) -> Router {
    app_with_settings(store, &Settings::default())
}

pub(crate) fn app_with_settings(store: Arc<dyn EntityStore>, settings: &Settings) -> Router {
    let mut registry = ModuleRegistry::new();
    super::register_all(&mut registry, &store, settings);
    bookstore_http::build_router(&registry, settings)
}

/// Send one request; non-JSON bodies come back as `Value::Null`.
pub(crate) async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}
