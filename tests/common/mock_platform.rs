#![allow(dead_code)]

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::{net::TcpListener, task::JoinHandle};

#[derive(Default)]
pub struct MockCounters {
    pub discover_hits: AtomicUsize,
    pub douyin_hits: AtomicUsize,
    pub tiktok_hits: AtomicUsize,
}

type Params = Query<HashMap<String, String>>;

/// Local stand-in for both platforms, so integration tests need no external
/// network.
///
/// Behaviour is keyed on the content id:
/// - bootstrap (`/discover?modal_id=`): `flaky-*` omits `RENDER_DATA` on its
///   first visit, `nocookie` never sets `ttwid`, `nowebid` never embeds an id.
/// - Douyin list: `empty`, `blank`, `garbage`, `paged`, `pagedbad` (page two
///   is a block page), `stuck`, `slow`,
///   `echo-*` (reflects the session and token it was called with).
/// - TikTok list: `echo-*` and a default single comment.
pub struct MockPlatformServer {
    pub base_url: String,
    pub counters: Arc<MockCounters>,
    _task: JoinHandle<()>,
}

fn param<'a>(q: &'a HashMap<String, String>, key: &str) -> &'a str {
    q.get(key).map(|s| s.as_str()).unwrap_or("")
}

fn render_data_page(device_id: Option<&str>) -> String {
    let data = match device_id {
        Some(id) => json!({"app": {"odin": {"user_unique_id": id}}}),
        None => json!({"app": {"odin": {}}}),
    };
    format!(
        "<!DOCTYPE html><html><body><script id=\"RENDER_DATA\" type=\"application/json\">{}</script></body></html>",
        urlencoding::encode(&data.to_string())
    )
}

async fn discover(
    State(counters): State<Arc<MockCounters>>,
    Query(q): Params,
) -> Response {
    let visit = counters.discover_hits.fetch_add(1, Ordering::SeqCst);
    let id = param(&q, "modal_id").to_string();
    let cookie = format!("ttwid=ttwid-{}; Path=/; Domain=127.0.0.1; HttpOnly", id);
    let device_id = format!("web-{}", id);

    if id.starts_with("flaky") && visit == 0 {
        let html = "<!DOCTYPE html><title>verify</title>".to_string();
        return ([(header::SET_COOKIE, cookie)], Html(html)).into_response();
    }

    match id.as_str() {
        "nocookie" => Html(render_data_page(Some(&device_id))).into_response(),
        "nowebid" => ([(header::SET_COOKIE, cookie)], Html(render_data_page(None))).into_response(),
        _ => (
            [(header::SET_COOKIE, cookie)],
            Html(render_data_page(Some(&device_id))),
        )
            .into_response(),
    }
}

fn default_comments() -> serde_json::Value {
    json!({
        "status_code": 0,
        "total": 2,
        "cursor": 2,
        "has_more": 0,
        "comments": [
            {"cid": "7259000000000000001", "text": "first", "digg_count": 3,
             "create_time": 1690000000, "user": {"nickname": "alice"}},
            {"cid": "7259000000000000002", "text": "second"}
        ]
    })
}

async fn douyin_comments(
    State(counters): State<Arc<MockCounters>>,
    headers: HeaderMap,
    Query(q): Params,
) -> Response {
    counters.douyin_hits.fetch_add(1, Ordering::SeqCst);

    if param(&q, "a_bogus").is_empty() || param(&q, "msToken").is_empty() {
        return (StatusCode::FORBIDDEN, "").into_response();
    }

    let id = param(&q, "aweme_id");
    let cursor: u64 = param(&q, "cursor").parse().unwrap_or(0);

    match id {
        "empty" => Json(json!({"status_code": 0, "total": 5, "comments": []})).into_response(),
        "blank" => (StatusCode::OK, "").into_response(),
        "garbage" => (StatusCode::FORBIDDEN, "<html>blocked</html>").into_response(),
        "slow" => {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(default_comments()).into_response()
        }
        "paged" => {
            let body = if cursor == 0 {
                json!({"total": 3, "cursor": 2, "has_more": 1, "comments": [
                    {"text": "p1", "user": {"nickname": "a"}},
                    {"text": "p2", "user": {"nickname": "b"}}
                ]})
            } else {
                json!({"total": 3, "cursor": 3, "has_more": 0, "comments": [
                    {"text": "p3", "user": {"nickname": "c"}}
                ]})
            };
            Json(body).into_response()
        }
        "pagedbad" if cursor > 0 => {
            (StatusCode::FORBIDDEN, "<html>blocked</html>").into_response()
        }
        "pagedbad" => Json(json!({"total": 40, "cursor": 2, "has_more": 1, "comments": [
            {"text": "p1", "user": {"nickname": "a"}},
            {"text": "p2", "user": {"nickname": "b"}}
        ]}))
        .into_response(),
        "stuck" => Json(json!({"total": 9, "cursor": 0, "has_more": true, "comments": [
            {"text": "again", "user": {"nickname": "loop"}}
        ]}))
        .into_response(),
        id if id.starts_with("echo") => {
            let cookie = headers
                .get(header::COOKIE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("");
            let ttwid = cookie
                .split(';')
                .find_map(|pair| pair.trim().strip_prefix("ttwid="))
                .unwrap_or("")
                .to_string();
            let referer = headers
                .get(header::REFERER)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string();
            Json(json!({"total": 1, "comments": [{
                "user": {"nickname": ttwid},
                "text": format!("{}|{}|{}", param(&q, "webid"), param(&q, "msToken"), referer)
            }]}))
            .into_response()
        }
        _ => Json(default_comments()).into_response(),
    }
}

async fn tiktok_comments(
    State(counters): State<Arc<MockCounters>>,
    headers: HeaderMap,
    Query(q): Params,
) -> Response {
    counters.tiktok_hits.fetch_add(1, Ordering::SeqCst);

    if param(&q, "X-Bogus").is_empty() || param(&q, "_signature").is_empty() {
        return (StatusCode::FORBIDDEN, "").into_response();
    }

    let id = param(&q, "aweme_id");
    if id.starts_with("echo") {
        let has_cookie = headers.contains_key(header::COOKIE);
        return Json(json!({"total": 1, "comments": [{
            "user": {"nickname": format!("cookie:{}", has_cookie)},
            "text": format!("{}|{}", param(&q, "msToken"), param(&q, "X-Bogus"))
        }]}))
        .into_response();
    }

    Json(json!({"total": 1, "cursor": 1, "has_more": false, "comments": [
        {"cid": 7341, "text": "nice", "user": {"nickname": "tt"}}
    ]}))
    .into_response()
}

impl MockPlatformServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind mock server");
        let addr: SocketAddr = listener
            .local_addr()
            .expect("failed to get mock server addr");
        let base_url = format!("http://{}", addr);

        let counters = Arc::new(MockCounters::default());
        let app = Router::new()
            .route("/discover", get(discover))
            .route("/aweme/v1/web/comment/list/", get(douyin_comments))
            .route("/api/comment/list/", get(tiktok_comments))
            .with_state(counters.clone());

        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("mock server failed");
        });

        Self {
            base_url,
            counters,
            _task: task,
        }
    }

    pub fn discover_hits(&self) -> usize {
        self.counters.discover_hits.load(Ordering::SeqCst)
    }

    pub fn douyin_hits(&self) -> usize {
        self.counters.douyin_hits.load(Ordering::SeqCst)
    }

    pub fn tiktok_hits(&self) -> usize {
        self.counters.tiktok_hits.load(Ordering::SeqCst)
    }
}
