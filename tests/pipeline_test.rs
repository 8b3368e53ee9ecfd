mod common;

use commentferry_lib::{
    config::RetryPolicy,
    signer::{Signers, UnconfiguredSigner, SignatureScheme, FixedSigner},
    CommentFerryError, CommentPipeline,
};
use common::{mock_platform::MockPlatformServer, test_config};
use std::{sync::Arc, time::Duration};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

fn pipeline(base_url: &str) -> CommentPipeline {
    CommentPipeline::new(test_config(base_url), Signers::fixed("abogus-sig", "xbogus-sig"))
        .expect("failed to build pipeline")
}

#[tokio::test]
async fn douyin_happy_path_bootstraps_then_fetches() {
    let mock = MockPlatformServer::start().await;
    let p = pipeline(&mock.base_url);

    let result = p
        .crawl(
            "https://www.douyin.com/discover?modal_id=7258913772092296485",
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(result.platform, "douyin");
    assert_eq!(result.content_id, "7258913772092296485");
    assert_eq!(result.pages_fetched, 1);

    let page = result.page.expect("expected a page");
    assert_eq!(page.total, 2);
    assert_eq!(page.comments.len(), 2);
    assert_eq!(page.comments[0].nickname, "alice");
    assert_eq!(page.comments[0].text, "first");
    assert_eq!(page.comments[0].like_count, Some(3));
    assert_eq!(page.comments[1].nickname, "unknown user");
    assert_eq!(page.comments[1].text, "second");

    assert_eq!(mock.discover_hits(), 1);
    assert_eq!(mock.douyin_hits(), 1);
}

#[tokio::test]
async fn bootstrap_retries_when_device_id_missing() {
    let mock = MockPlatformServer::start().await;
    let p = pipeline(&mock.base_url);

    let result = p
        .crawl("https://www.douyin.com/video/flaky-1", &CancellationToken::new())
        .await
        .unwrap();

    assert!(mock.discover_hits() >= 2);
    assert!(result.page.is_some());
}

#[tokio::test]
async fn bootstrap_gives_up_after_configured_attempts() {
    let mock = MockPlatformServer::start().await;
    let mut config = test_config(&mock.base_url);
    config.bootstrap = RetryPolicy::attempts(3, Duration::from_millis(10));
    let p = CommentPipeline::new(config, Signers::fixed("a", "x")).unwrap();

    let err = p
        .crawl("https://www.douyin.com/video/nocookie", &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, CommentFerryError::BootstrapExhausted { attempts: 3 }));
    assert_eq!(mock.discover_hits(), 3);
    assert_eq!(mock.douyin_hits(), 0);
}

#[tokio::test]
async fn unbounded_bootstrap_stops_on_cancel() {
    let mock = MockPlatformServer::start().await;
    let mut config = test_config(&mock.base_url);
    config.bootstrap = RetryPolicy::unbounded(Duration::from_millis(20));
    let p = CommentPipeline::new(config, Signers::fixed("a", "x")).unwrap();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        trigger.cancel();
    });

    let err = timeout(
        Duration::from_secs(5),
        p.crawl("https://www.douyin.com/video/nowebid", &cancel),
    )
    .await
    .expect("cancel did not stop the bootstrap loop")
    .unwrap_err();

    assert!(matches!(err, CommentFerryError::Cancelled));
    assert!(mock.discover_hits() >= 1);
}

#[tokio::test]
async fn cancel_interrupts_inflight_fetch() {
    let mock = MockPlatformServer::start().await;
    let p = pipeline(&mock.base_url);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let err = timeout(
        Duration::from_secs(2),
        p.crawl("https://www.douyin.com/video/slow", &cancel),
    )
    .await
    .expect("cancel did not interrupt the fetch")
    .unwrap_err();
    assert!(matches!(err, CommentFerryError::Cancelled));
}

#[tokio::test]
async fn empty_comment_list_is_a_page_with_total() {
    let mock = MockPlatformServer::start().await;
    let p = pipeline(&mock.base_url);

    let result = p
        .crawl("https://www.douyin.com/video/empty", &CancellationToken::new())
        .await
        .unwrap();

    let page = result.page.expect("empty list is still a page");
    assert_eq!(page.total, 5);
    assert!(page.comments.is_empty());
}

#[tokio::test]
async fn blank_body_yields_no_page() {
    let mock = MockPlatformServer::start().await;
    let p = pipeline(&mock.base_url);

    let result = p
        .crawl("https://www.douyin.com/video/blank", &CancellationToken::new())
        .await
        .unwrap();
    assert!(result.page.is_none());
    assert_eq!(result.pages_fetched, 0);
}

#[tokio::test]
async fn non_json_body_with_error_status_is_empty_page() {
    let mock = MockPlatformServer::start().await;
    let p = pipeline(&mock.base_url);

    let result = p
        .crawl("https://www.douyin.com/video/garbage", &CancellationToken::new())
        .await
        .unwrap();
    let page = result.page.expect("malformed body is treated as no comments");
    assert_eq!(page.total, 0);
    assert!(page.comments.is_empty());
}

#[tokio::test]
async fn pagination_follows_cursor_when_enabled() {
    let mock = MockPlatformServer::start().await;
    let p = pipeline(&mock.base_url);

    let result = p
        .crawl_pages("https://www.douyin.com/video/paged", 5, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.pages_fetched, 2);
    let page = result.page.unwrap();
    let texts: Vec<&str> = page.comments.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, vec!["p1", "p2", "p3"]);
    assert_eq!(page.total, 3);
    assert!(!page.has_more);
    // One bootstrap for the whole invocation.
    assert_eq!(mock.discover_hits(), 1);
    assert_eq!(mock.douyin_hits(), 2);
}

#[tokio::test]
async fn blocked_later_page_keeps_earlier_metadata() {
    let mock = MockPlatformServer::start().await;
    let p = pipeline(&mock.base_url);

    let result = p
        .crawl_pages("https://www.douyin.com/video/pagedbad", 5, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.pages_fetched, 1);
    let page = result.page.unwrap();
    assert_eq!(page.comments.len(), 2);
    assert_eq!(page.total, 40);
    assert_eq!(page.cursor, 2);
    assert!(page.has_more);
    assert_eq!(mock.douyin_hits(), 2);
}

#[tokio::test]
async fn single_page_by_default() {
    let mock = MockPlatformServer::start().await;
    let p = pipeline(&mock.base_url);

    let result = p
        .crawl("https://www.douyin.com/video/paged", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.pages_fetched, 1);
    let page = result.page.unwrap();
    assert_eq!(page.comments.len(), 2);
    assert!(page.has_more);
    assert_eq!(page.cursor, 2);
}

#[tokio::test]
async fn pagination_stops_when_cursor_does_not_advance() {
    let mock = MockPlatformServer::start().await;
    let p = pipeline(&mock.base_url);

    let result = p
        .crawl_pages("https://www.douyin.com/video/stuck", 10, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(result.pages_fetched, 1);
    assert_eq!(mock.douyin_hits(), 1);
}

#[tokio::test]
async fn concurrent_invocations_do_not_share_session_or_token() {
    let mock = MockPlatformServer::start().await;
    let p = pipeline(&mock.base_url);
    let cancel = CancellationToken::new();

    let (a, b) = tokio::join!(
        p.crawl("https://www.douyin.com/video/echo-a", &cancel),
        p.crawl("https://www.douyin.com/video/echo-b", &cancel),
    );
    let a = a.unwrap().page.unwrap().comments.remove(0);
    let b = b.unwrap().page.unwrap().comments.remove(0);

    assert_eq!(a.nickname, "ttwid-echo-a");
    assert_eq!(b.nickname, "ttwid-echo-b");

    let a_parts: Vec<&str> = a.text.split('|').collect();
    let b_parts: Vec<&str> = b.text.split('|').collect();
    assert_eq!(a_parts[0], "web-echo-a");
    assert_eq!(b_parts[0], "web-echo-b");
    assert_eq!(a_parts[1].len(), 107);
    assert_eq!(b_parts[1].len(), 107);
    assert_ne!(a_parts[1], b_parts[1]);
    assert!(a_parts[2].ends_with("/discover?modal_id=echo-a"));
    assert!(b_parts[2].ends_with("/discover?modal_id=echo-b"));
}

#[tokio::test]
async fn tiktok_skips_bootstrap_and_signs_with_x_bogus() {
    let mock = MockPlatformServer::start().await;
    let p = pipeline(&mock.base_url);

    let result = p
        .crawl(
            "https://www.tiktok.com/@someone/video/echo-t1",
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(result.platform, "tiktok");
    let comment = result.page.unwrap().comments.remove(0);
    assert_eq!(comment.nickname, "cookie:false");
    let parts: Vec<&str> = comment.text.split('|').collect();
    assert_eq!(parts[0].len(), 107);
    assert_eq!(parts[1], "xbogus-sig");
    assert_eq!(mock.discover_hits(), 0);
}

#[tokio::test]
async fn signer_failure_propagates_without_fetching() {
    let mock = MockPlatformServer::start().await;
    let signers = Signers::new(
        Arc::new(FixedSigner::new(SignatureScheme::ABogus, "a")),
        Arc::new(UnconfiguredSigner::new(SignatureScheme::XBogus)),
    );
    let p = CommentPipeline::new(test_config(&mock.base_url), signers).unwrap();

    let err = p
        .crawl("https://www.tiktok.com/@someone/video/123", &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        CommentFerryError::SignatureFailed { scheme, .. } => assert_eq!(scheme, "x_bogus"),
        other => panic!("expected SignatureFailed, got {:?}", other),
    }
    assert_eq!(mock.tiktok_hits(), 0);
}

#[tokio::test]
async fn unreachable_endpoint_yields_no_page() {
    // Nothing listens on port 1; TikTok needs no bootstrap so the fetch is
    // the first request made.
    let p = pipeline("http://127.0.0.1:1");

    let result = timeout(
        Duration::from_secs(10),
        p.crawl("https://www.tiktok.com/@someone/video/123", &CancellationToken::new()),
    )
    .await
    .expect("fetch should fail fast")
    .expect("transport failure is not an error");

    assert!(result.page.is_none());
}
