mod support;

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use scrapedesk_engine::{run_session, EngineEvent, EngineSettings, ServerEvent, SessionCommand};
use serde_json::json;
use support::{is_terminal, spawn_server, TestSink};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use url::Url;

struct Client {
    sink: Arc<TestSink>,
    commands: mpsc::UnboundedSender<SessionCommand>,
    shutdown: CancellationToken,
    task: tokio::task::JoinHandle<()>,
}

fn start_client(settings: EngineSettings, submission: u64) -> Client {
    let sink = Arc::new(TestSink::default());
    let (commands, commands_rx) = mpsc::unbounded_channel();
    let shutdown = CancellationToken::new();
    let task = tokio::spawn({
        let sink = sink.clone();
        let shutdown = shutdown.clone();
        async move {
            run_session(&settings, submission, commands_rx, shutdown, sink.as_ref()).await;
        }
    });
    Client {
        sink,
        commands,
        shutdown,
        task,
    }
}

#[tokio::test]
async fn streams_server_events_in_order_until_client_closes() {
    let (url, server) = spawn_server(|mut conn| async move {
        conn.handshake().await;
        let request = conn.recv_text().await;
        conn.emit("log_message", json!({ "data": "Scraping http://a.com" }))
            .await;
        conn.emit("json_item", json!({ "title": "A", "content": "x" }))
            .await;
        conn.emit("json_item", json!({ "title": "B", "content": "y" }))
            .await;
        conn.emit("scrape_complete", json!({ "data": "Scraping complete" }))
            .await;
        let goodbye = conn.recv_text().await;
        (request, goodbye)
    })
    .await;

    let client = start_client(EngineSettings::with_server(url), 7);
    client
        .sink
        .wait_for(|events| events.contains(&EngineEvent::Connected { submission: 7 }))
        .await;
    client
        .commands
        .send(SessionCommand::Emit {
            event: "scrape_request".to_string(),
            payload: json!({ "urls": "http://a.com" }),
        })
        .unwrap();

    client
        .sink
        .wait_for(|events| {
            events.iter().any(|event| {
                matches!(
                    event,
                    EngineEvent::Server {
                        event: ServerEvent::ScrapeComplete(_),
                        ..
                    }
                )
            })
        })
        .await;
    client.shutdown.cancel();
    client.task.await.unwrap();

    let (request, goodbye) = server.await.unwrap();
    assert_eq!(
        request.as_deref(),
        Some(r#"42["scrape_request",{"urls":"http://a.com"}]"#)
    );
    assert_eq!(goodbye.as_deref(), Some("41"));

    assert_eq!(
        client.sink.snapshot(),
        vec![
            EngineEvent::Connected { submission: 7 },
            EngineEvent::Server {
                submission: 7,
                event: ServerEvent::LogMessage("Scraping http://a.com".to_string()),
            },
            EngineEvent::Server {
                submission: 7,
                event: ServerEvent::JsonItem(json!({ "title": "A", "content": "x" })),
            },
            EngineEvent::Server {
                submission: 7,
                event: ServerEvent::JsonItem(json!({ "title": "B", "content": "y" })),
            },
            EngineEvent::Server {
                submission: 7,
                event: ServerEvent::ScrapeComplete("Scraping complete".to_string()),
            },
            EngineEvent::Disconnected {
                submission: 7,
                reason: "io client disconnect".to_string(),
            },
        ]
    );
}

#[tokio::test]
async fn answers_pings_and_ignores_unknown_events() {
    let (url, server) = spawn_server(|mut conn| async move {
        conn.handshake().await;
        conn.send_text("2").await;
        let pong = conn.recv_text().await;
        conn.emit("progress", json!({ "pct": 10 })).await;
        conn.emit("log_message", json!({ "data": "after ping" })).await;
        conn.send_text("41").await;
        pong
    })
    .await;

    let client = start_client(EngineSettings::with_server(url), 1);
    let events = client
        .sink
        .wait_for(|events| events.iter().any(is_terminal))
        .await;
    client.task.await.unwrap();

    assert_eq!(server.await.unwrap().as_deref(), Some("3"));
    assert_eq!(
        events,
        vec![
            EngineEvent::Connected { submission: 1 },
            EngineEvent::Server {
                submission: 1,
                event: ServerEvent::LogMessage("after ping".to_string()),
            },
            EngineEvent::Disconnected {
                submission: 1,
                reason: "io server disconnect".to_string(),
            },
        ]
    );
}

#[tokio::test]
async fn namespace_refusal_is_a_connect_failure() {
    let (url, _server) = spawn_server(|mut conn| async move {
        conn.open(25_000, 20_000).await;
        let _ = conn.recv_text().await;
        conn.send_text(r#"44{"message":"Not authorized"}"#).await;
        let _ = conn.recv_text().await;
    })
    .await;

    let client = start_client(EngineSettings::with_server(url), 3);
    client.task.await.unwrap();
    assert_eq!(
        client.sink.snapshot(),
        vec![EngineEvent::ConnectFailed {
            submission: 3,
            reason: "Not authorized".to_string(),
        }]
    );
}

#[tokio::test]
async fn unreachable_server_is_a_connect_failure() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let settings = EngineSettings::with_server(Url::parse(&format!("http://{addr}")).unwrap());
    let client = start_client(settings, 4);
    client.task.await.unwrap();

    let events = client.sink.snapshot();
    assert_eq!(events.len(), 1);
    match &events[0] {
        EngineEvent::ConnectFailed { submission, reason } => {
            assert_eq!(*submission, 4);
            assert!(!reason.is_empty());
        }
        other => panic!("expected ConnectFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn silent_server_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let _hold = tokio::spawn(async move {
        let (_stream, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
    });

    let mut settings =
        EngineSettings::with_server(Url::parse(&format!("http://{addr}")).unwrap());
    settings.connect_timeout = Duration::from_millis(200);
    let client = start_client(settings, 5);
    client.task.await.unwrap();

    assert_eq!(
        client.sink.snapshot(),
        vec![EngineEvent::ConnectFailed {
            submission: 5,
            reason: "timeout".to_string(),
        }]
    );
}

#[tokio::test]
async fn missing_pings_end_the_session() {
    let (url, _server) = spawn_server(|mut conn| async move {
        conn.open(50, 50).await;
        let _ = conn.recv_text().await;
        conn.send_text(r#"40{"sid":"socket-sid"}"#).await;
        while conn.recv_text().await.is_some() {}
    })
    .await;

    let client = start_client(EngineSettings::with_server(url), 6);
    client.task.await.unwrap();
    assert_eq!(
        client.sink.snapshot(),
        vec![
            EngineEvent::Connected { submission: 6 },
            EngineEvent::Disconnected {
                submission: 6,
                reason: "ping timeout".to_string(),
            },
        ]
    );
}

#[tokio::test]
async fn cancel_before_connect_reports_client_disconnect() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let _hold = tokio::spawn(async move {
        let (_stream, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
    });

    let settings = EngineSettings::with_server(Url::parse(&format!("http://{addr}")).unwrap());
    let client = start_client(settings, 8);
    tokio::time::sleep(Duration::from_millis(50)).await;
    client.shutdown.cancel();
    client.task.await.unwrap();

    assert_eq!(
        client.sink.snapshot(),
        vec![EngineEvent::Disconnected {
            submission: 8,
            reason: "io client disconnect".to_string(),
        }]
    );
}

#[tokio::test]
async fn dropping_the_command_sender_closes_the_session() {
    let (url, server) = spawn_server(|mut conn| async move {
        conn.handshake().await;
        conn.recv_text().await
    })
    .await;

    let client = start_client(EngineSettings::with_server(url), 9);
    client
        .sink
        .wait_for(|events| events.contains(&EngineEvent::Connected { submission: 9 }))
        .await;
    drop(client.commands);
    client.task.await.unwrap();

    assert_eq!(server.await.unwrap().as_deref(), Some("41"));
    assert!(client.sink.snapshot().last().is_some_and(is_terminal));
}
