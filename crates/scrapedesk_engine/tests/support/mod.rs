//! In-process Socket.IO server good enough to script one client connection.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use scrapedesk_engine::{EngineEvent, EventSink};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use url::Url;

pub struct ServerConn {
    ws: WebSocketStream<TcpStream>,
}

impl ServerConn {
    pub async fn send_text(&mut self, text: &str) {
        self.ws
            .send(Message::Text(text.to_string().into()))
            .await
            .expect("server send");
    }

    /// Next text frame, or `None` once the client has gone.
    pub async fn recv_text(&mut self) -> Option<String> {
        while let Some(message) = self.ws.next().await {
            match message {
                Ok(Message::Text(text)) => return Some(text.as_str().to_owned()),
                Ok(Message::Close(_)) | Err(_) => return None,
                Ok(_) => continue,
            }
        }
        None
    }

    pub async fn open(&mut self, ping_interval: u64, ping_timeout: u64) {
        let open = json!({
            "sid": "engine-sid",
            "upgrades": [],
            "pingInterval": ping_interval,
            "pingTimeout": ping_timeout,
            "maxPayload": 1_000_000
        });
        self.send_text(&format!("0{open}")).await;
    }

    /// Open packet, namespace connect and its acknowledgement.
    pub async fn handshake(&mut self) {
        self.open(25_000, 20_000).await;
        assert_eq!(self.recv_text().await.as_deref(), Some("40"));
        self.send_text(r#"40{"sid":"socket-sid"}"#).await;
    }

    pub async fn emit(&mut self, name: &str, payload: Value) {
        self.send_text(&format!("42{}", json!([name, payload]))).await;
    }
}

/// Accepts one WebSocket client and runs `script` against it.
pub async fn spawn_server<F, Fut, T>(script: F) -> (Url, JoinHandle<T>)
where
    F: FnOnce(ServerConn) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = T> + Send,
    T: Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept");
        let ws = tokio_tungstenite::accept_async(stream)
            .await
            .expect("websocket accept");
        script(ServerConn { ws }).await
    });
    let url = Url::parse(&format!("http://{addr}")).expect("server url");
    (url, handle)
}

#[derive(Default)]
pub struct TestSink {
    events: Arc<Mutex<Vec<EngineEvent>>>,
}

impl TestSink {
    pub fn snapshot(&self) -> Vec<EngineEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Polls until `done` holds for the recorded events, failing after five seconds.
    pub async fn wait_for(&self, done: impl Fn(&[EngineEvent]) -> bool) -> Vec<EngineEvent> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let events = self.snapshot();
            if done(&events) {
                return events;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "timed out waiting, saw {events:?}"
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

impl EventSink for TestSink {
    fn emit(&self, event: EngineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

pub fn is_terminal(event: &EngineEvent) -> bool {
    matches!(
        event,
        EngineEvent::Disconnected { .. } | EngineEvent::ConnectFailed { .. }
    )
}
