//! Pool behavior against in-process stub servers: failover, fail-fast,
//! round-robin fairness, timeouts, and ping.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use url::Url;

use fluxline_client::backoff::Backoff;
use fluxline_client::error::{ClientError, NO_HOST_AVAILABLE};
use fluxline_client::host::TransportOptions;
use fluxline_client::pool::{Pool, PoolOptions, PoolRequest};

use common::{StubBehavior, http_response, init_tracing, refused_addr, spawn_stub};

fn pool_options(backoff_ms: u64) -> PoolOptions {
    PoolOptions {
        request_timeout: Duration::from_millis(500),
        max_retries: 2,
        backoff: Backoff::constant(Duration::from_millis(backoff_ms), 0.0),
    }
}

fn host_url(addr: std::net::SocketAddr) -> Url {
    Url::parse(&format!("http://{addr}")).unwrap()
}

#[tokio::test]
async fn failover_disables_bad_host_and_readmits_it() {
    init_tracing();
    let bad_hits = Arc::new(AtomicUsize::new(0));
    let good_hits = Arc::new(AtomicUsize::new(0));
    let bad = spawn_stub(
        StubBehavior::Reply(http_response(502, "upstream sad", "")),
        Arc::clone(&bad_hits),
        None,
    )
    .await;
    let good = spawn_stub(
        StubBehavior::Reply(http_response(200, "ok", "")),
        Arc::clone(&good_hits),
        None,
    )
    .await;

    let pool = Pool::new(pool_options(300), None);
    pool.add_host(host_url(bad), TransportOptions::default())
        .unwrap();
    pool.add_host(host_url(good), TransportOptions::default())
        .unwrap();

    let body = pool.text(&PoolRequest::get("/query")).await.unwrap();
    assert_eq!(body, "ok");
    assert_eq!(bad_hits.load(Ordering::SeqCst), 1);
    assert_eq!(good_hits.load(Ordering::SeqCst), 1);
    assert_eq!(pool.hosts_available(), 1);
    assert_eq!(pool.hosts_disabled(), 1);

    // Still within the backoff interval: the second request goes to the
    // good host again.
    let body = pool.text(&PoolRequest::get("/query")).await.unwrap();
    assert_eq!(body, "ok");
    assert_eq!(bad_hits.load(Ordering::SeqCst), 1);
    assert_eq!(good_hits.load(Ordering::SeqCst), 2);

    // After the backoff interval the bad host rejoins at the tail.
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(pool.hosts_available(), 2);
    assert_eq!(pool.hosts_disabled(), 0);
}

#[tokio::test]
async fn exhausted_hosts_fail_fast_without_transport() {
    let first_hits = Arc::new(AtomicUsize::new(0));
    let second_hits = Arc::new(AtomicUsize::new(0));
    let first = spawn_stub(
        StubBehavior::Reply(http_response(502, "", "")),
        Arc::clone(&first_hits),
        None,
    )
    .await;
    let second = spawn_stub(
        StubBehavior::Reply(http_response(502, "", "")),
        Arc::clone(&second_hits),
        None,
    )
    .await;

    // Long backoff keeps both hosts disabled for the whole test.
    let pool = Pool::new(pool_options(60_000), None);
    pool.add_host(host_url(first), TransportOptions::default())
        .unwrap();
    pool.add_host(host_url(second), TransportOptions::default())
        .unwrap();

    let error = pool.text(&PoolRequest::get("/query")).await.unwrap_err();
    assert!(error.is_service_unavailable(), "{error}");
    assert_eq!(pool.hosts_available(), 0);
    assert_eq!(pool.hosts_disabled(), 2);
    let transport_attempts =
        first_hits.load(Ordering::SeqCst) + second_hits.load(Ordering::SeqCst);

    let error = pool.text(&PoolRequest::get("/query")).await.unwrap_err();
    assert!(matches!(
        &error,
        ClientError::ServiceUnavailable(message) if message == NO_HOST_AVAILABLE
    ));
    // No HTTP attempt was made for the fail-fast request.
    assert_eq!(
        first_hits.load(Ordering::SeqCst) + second_hits.load(Ordering::SeqCst),
        transport_attempts
    );
}

#[tokio::test]
async fn round_robin_visits_hosts_in_order() {
    let mut addrs = Vec::new();
    for body in ["a", "b", "c"] {
        let addr = spawn_stub(
            StubBehavior::Reply(http_response(200, body, "")),
            Arc::new(AtomicUsize::new(0)),
            None,
        )
        .await;
        addrs.push(addr);
    }

    let pool = Pool::new(pool_options(300), None);
    for addr in &addrs {
        pool.add_host(host_url(*addr), TransportOptions::default())
            .unwrap();
    }

    let mut bodies = Vec::new();
    for _ in 0..6 {
        bodies.push(pool.text(&PoolRequest::get("/")).await.unwrap());
    }
    assert_eq!(bodies, vec!["a", "b", "c", "a", "b", "c"]);
}

#[tokio::test]
async fn request_errors_surface_without_penalty_or_retry() {
    let hits = Arc::new(AtomicUsize::new(0));
    let addr = spawn_stub(
        StubBehavior::Reply(http_response(404, "measurement not found", "")),
        Arc::clone(&hits),
        None,
    )
    .await;

    let pool = Pool::new(pool_options(300), None);
    pool.add_host(host_url(addr), TransportOptions::default())
        .unwrap();

    let error = pool.text(&PoolRequest::get("/query")).await.unwrap_err();
    match error {
        ClientError::Request {
            status,
            message,
            body,
        } => {
            assert_eq!(status, 404);
            assert_eq!(message, "Not Found");
            assert_eq!(body, "measurement not found");
        }
        other => panic!("expected request error, got {other}"),
    }
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(pool.hosts_available(), 1);
    assert_eq!(pool.hosts_disabled(), 0);
}

#[tokio::test]
async fn stalled_host_times_out_and_is_penalized() {
    let hits = Arc::new(AtomicUsize::new(0));
    let addr = spawn_stub(StubBehavior::Stall, Arc::clone(&hits), None).await;

    let pool = Pool::new(
        PoolOptions {
            request_timeout: Duration::from_millis(200),
            max_retries: 2,
            backoff: Backoff::constant(Duration::from_secs(60), 0.0),
        },
        None,
    );
    pool.add_host(host_url(addr), TransportOptions::default())
        .unwrap();

    let error = pool.text(&PoolRequest::get("/query")).await.unwrap_err();
    assert!(error.is_service_unavailable(), "{error}");
    assert_eq!(pool.hosts_available(), 0);
    assert_eq!(pool.hosts_disabled(), 1);
}

#[tokio::test]
async fn connection_refused_is_service_unavailable() {
    let addr = refused_addr().await;
    let pool = Pool::new(pool_options(60_000), None);
    pool.add_host(host_url(addr), TransportOptions::default())
        .unwrap();

    let error = pool.text(&PoolRequest::get("/query")).await.unwrap_err();
    assert!(error.is_service_unavailable(), "{error}");
    assert_eq!(pool.hosts_disabled(), 1);
}

#[tokio::test]
async fn ping_probes_all_hosts_without_mutating_state() {
    let hits = Arc::new(AtomicUsize::new(0));
    let online = spawn_stub(
        StubBehavior::Reply(http_response(
            204,
            "",
            "X-Influxdb-Version: v1.8.10\r\n",
        )),
        Arc::clone(&hits),
        None,
    )
    .await;
    let offline = refused_addr().await;

    let pool = Pool::new(pool_options(300), None);
    pool.add_host(host_url(online), TransportOptions::default())
        .unwrap();
    pool.add_host(host_url(offline), TransportOptions::default())
        .unwrap();

    let probes = pool.ping(Duration::from_millis(500), "/ping").await;
    assert_eq!(probes.len(), 2);

    let online_url = host_url(online);
    let up = probes.iter().find(|probe| probe.url == online_url).unwrap();
    assert!(up.online);
    assert_eq!(up.version.as_deref(), Some("v1.8.10"));
    assert!(up.rtt < Duration::from_secs(1));

    let down = probes.iter().find(|probe| probe.url != online_url).unwrap();
    assert!(!down.online);
    assert_eq!(down.rtt, Duration::MAX);
    assert_eq!(down.version, None);

    // Ping never moves hosts between sets.
    assert_eq!(pool.hosts_available(), 2);
    assert_eq!(pool.hosts_disabled(), 0);
}

#[tokio::test]
async fn basic_auth_is_sent_when_configured() {
    let hits = Arc::new(AtomicUsize::new(0));
    let (sender, mut receiver) = tokio::sync::mpsc::unbounded_channel();
    let addr = spawn_stub(
        StubBehavior::Reply(http_response(200, "", "")),
        Arc::clone(&hits),
        Some(sender),
    )
    .await;

    let pool = Pool::new(
        pool_options(300),
        Some(("root".to_string(), "root".to_string())),
    );
    pool.add_host(host_url(addr), TransportOptions::default())
        .unwrap();
    pool.discard(&PoolRequest::get("/query")).await.unwrap();

    let request = receiver.recv().await.unwrap().to_lowercase();
    // `root:root` in base64.
    assert!(request.contains("authorization: basic cm9vddpyb290"), "{request}");
}
