//! Stream client against a local event-stream server.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use futures::stream;
use osdlyrics_core::testing::RecordingSink;
use osdlyrics_core::{bridge, Dispatch, DispatchReceiver, DisplayColor, DisplayConsumer};
use osdlyrics_sse::{ConnectionState, SseLyricClient, StreamSettings};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const KRC_EVENT: &str =
    "data: {\"type\":\"lyrics_update\",\"text\":\"[0,1000]<0,500,0>AB\",\"format\":\"krc\"}\n";

struct TestServer {
    url: String,
    shutdown: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    async fn spawn(router: Router) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            url: format!("http://{addr}/api/osd-lyrics/sse"),
            shutdown: Some(shutdown_tx),
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

fn event_stream(chunks: Vec<&'static str>, keep_open: bool) -> Response {
    let body = stream::iter(chunks.into_iter().map(Ok::<_, std::io::Error>));
    let body = if keep_open {
        Body::from_stream(futures::StreamExt::chain(body, stream::pending()))
    } else {
        Body::from_stream(body)
    };
    ([(header::CONTENT_TYPE, "text/event-stream")], body).into_response()
}

fn client_for(
    url: &str,
    reconnect_delay: Duration,
) -> (Arc<SseLyricClient>, DispatchReceiver, CancellationToken) {
    let (bridge, receiver) = bridge();
    let cancel = CancellationToken::new();
    let settings = StreamSettings::new(url)
        .unwrap()
        .with_reconnect_delay(reconnect_delay);
    let client = SseLyricClient::new(settings, bridge, cancel.clone()).unwrap();
    (Arc::new(client), receiver, cancel)
}

async fn wait_until(condition: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
}

async fn wait_for_state(client: &SseLyricClient, wanted: ConnectionState) {
    let mut states = client.subscribe_state();
    tokio::time::timeout(Duration::from_secs(5), states.wait_for(|s| *s == wanted))
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_krc_line_reaches_consumer() {
    let router = Router::new().route(
        "/api/osd-lyrics/sse",
        get(|| async { event_stream(vec!["data: {\"type\":\"connected\"}\n", KRC_EVENT], true) }),
    );
    let server = TestServer::spawn(router).await;
    let (client, mut receiver, cancel) = client_for(&server.url, Duration::from_secs(3));
    let handle = Arc::clone(&client).start();

    let dispatch = tokio::time::timeout(Duration::from_secs(5), receiver.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(dispatch, Dispatch::Progressive(_)));

    let mut consumer = DisplayConsumer::new(
        RecordingSink::new(),
        DisplayColor::default(),
        Duration::from_millis(100),
    );
    consumer.apply(dispatch);
    let engine = consumer.engine();
    assert_eq!(
        engine.render_at(0, consumer.color()).as_deref(),
        Some("<span foreground=\"#666666\">AB</span>")
    );
    assert_eq!(
        engine.render_at(600, consumer.color()).as_deref(),
        Some("<span foreground=\"#ff0000\">AB</span>")
    );

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(client.state(), ConnectionState::Stopped);
}

#[tokio::test]
async fn test_sends_event_stream_headers() {
    let (headers_tx, mut headers_rx) = mpsc::unbounded_channel::<HeaderMap>();
    let router = Router::new()
        .route(
            "/api/osd-lyrics/sse",
            get(
                |State(tx): State<mpsc::UnboundedSender<HeaderMap>>, headers: HeaderMap| async move {
                    let _ = tx.send(headers);
                    event_stream(vec![], true)
                },
            ),
        )
        .with_state(headers_tx);
    let server = TestServer::spawn(router).await;
    let (client, _receiver, cancel) = client_for(&server.url, Duration::from_secs(3));
    let handle = Arc::clone(&client).start();

    let headers = tokio::time::timeout(Duration::from_secs(5), headers_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(headers[header::ACCEPT], "text/event-stream");
    assert_eq!(headers[header::CACHE_CONTROL], "no-cache");

    wait_for_state(&client, ConnectionState::Streaming).await;
    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_split_frames_and_line_kinds() {
    let router = Router::new().route(
        "/api/osd-lyrics/sse",
        get(|| async {
            event_stream(
                vec![
                    "data: {\"type\":\"lyrics_update\",\"text\":\"[0,1000]<10",
                    "0,500,0>AB\",\"format\":\"krc\"}\ndata: {\"type\":\"heart",
                    "beat\"}\ndata: {\"type\":\"lyrics_update\",\"text\":\"[02:51.96]你走之后\"}\n",
                    "data: not json\n",
                    "data: {\"type\":\"lyrics_update\",\"text\":\"hello world\"}\n",
                ],
                true,
            )
        }),
    );
    let server = TestServer::spawn(router).await;
    let (client, mut receiver, cancel) = client_for(&server.url, Duration::from_secs(3));
    let handle = Arc::clone(&client).start();

    let mut received = Vec::new();
    for _ in 0..3 {
        let dispatch = tokio::time::timeout(Duration::from_secs(5), receiver.recv())
            .await
            .unwrap()
            .unwrap();
        received.push(dispatch);
    }

    let Dispatch::Progressive(line) = &received[0] else {
        panic!("expected progressive line, got {:?}", received[0]);
    };
    assert_eq!(line.text(), "AB");
    assert_eq!(line.syllables[0].start_ms, 100);
    assert_eq!(received[1], Dispatch::Plain("你走之后".to_string()));
    assert_eq!(received[2], Dispatch::Plain("hello world".to_string()));

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_reconnect_is_paced() {
    let hits = Arc::new(AtomicU64::new(0));
    let router = Router::new()
        .route(
            "/api/osd-lyrics/sse",
            get(|State(hits): State<Arc<AtomicU64>>| async move {
                hits.fetch_add(1, Ordering::SeqCst);
                StatusCode::INTERNAL_SERVER_ERROR
            }),
        )
        .with_state(Arc::clone(&hits));
    let server = TestServer::spawn(router).await;
    let (client, _receiver, cancel) = client_for(&server.url, Duration::from_millis(300));
    let handle = Arc::clone(&client).start();

    tokio::time::sleep(Duration::from_millis(1000)).await;
    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .unwrap()
        .unwrap();

    // Attempts at roughly 0, 300, 600 and 900 ms
    let attempts = client.attempts();
    assert!((2..=4).contains(&attempts), "attempts = {attempts}");
    assert!(hits.load(Ordering::SeqCst) <= attempts);

    // No further attempts once stopped
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(client.attempts(), attempts);
    assert_eq!(client.state(), ConnectionState::Stopped);
}

#[tokio::test]
async fn test_refused_connection_waits_and_stops_promptly() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let url = format!("http://{addr}/sse");
    let (client, _receiver, cancel) = client_for(&url, Duration::from_secs(30));
    let handle = Arc::clone(&client).start();

    wait_until(|| {
        client.attempts() == 1 && client.state() == ConnectionState::Disconnected
    })
    .await;

    // The reconnect wait is interrupted, not sat out
    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(client.attempts(), 1);
    assert_eq!(client.state(), ConnectionState::Stopped);
}
