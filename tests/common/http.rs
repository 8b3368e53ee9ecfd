#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, Response},
    Router,
};
use std::time::Duration;
use tower::ServiceExt;

pub fn json_request(uri: &str, body: serde_json::Value) -> Request<Body> {
    let bytes = serde_json::to_vec(&body).expect("failed to serialize json request");
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(bytes))
        .expect("failed to build request")
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .expect("failed to build request")
}

/// Drive one request through the router without binding a socket.
pub async fn send(app: Router, req: Request<Body>) -> Response<Body> {
    tokio::time::timeout(Duration::from_secs(10), app.oneshot(req))
        .await
        .expect("request timed out")
        .expect("request failed")
}

pub async fn read_json_response(res: Response<Body>) -> serde_json::Value {
    let bytes = to_bytes(res.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    serde_json::from_slice(&bytes).expect("failed to parse response json")
}
