use std::io::Write;
use std::sync::{mpsc, Arc};
use std::time::Duration;

use anyhow::Context as _;
use scrapedesk_core::{update, AppState, Msg, Phase};
use scrapedesk_engine::{DownloadStore, EngineHandle};
use scrapedesk_logging::desk_info;

use super::config::AppConfig;
use super::effects::{EffectRunner, MsgSink};
use super::ui::render::{render, RenderCursor};
use super::ui::terminal::Terminal;

const TICK: Duration = Duration::from_millis(75);

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub phase: Phase,
}

impl Outcome {
    pub fn succeeded(&self) -> bool {
        self.phase == Phase::Completed
    }
}

/// Submits the configured form once and drives the session until it settles.
/// The transcript is written to `out`.
pub fn run_app<W: Write>(config: AppConfig, out: W) -> anyhow::Result<Outcome> {
    let (msg_tx, msg_rx) = mpsc::channel::<Msg>();

    let sink = Arc::new(MsgSink::new(msg_tx.clone()));
    let engine = EngineHandle::new(config.engine.clone(), sink).context("start engine")?;
    let runner = EffectRunner::new(engine, DownloadStore::new(&config.out), msg_tx.clone());
    let mut terminal = Terminal::new(out, config.preview);
    let mut cursor = RenderCursor::default();

    desk_info!(
        "Submitting server={} urls_len={} pdf={:?}",
        config.engine.server_url,
        config.urls.len(),
        config.pdf.as_ref().map(|pdf| pdf.path())
    );
    for msg in [
        Msg::UrlsChanged(config.urls),
        Msg::PdfSelected(config.pdf),
        Msg::BrowserFallbackChanged(config.use_selenium),
        Msg::Submitted,
    ] {
        let _ = msg_tx.send(msg);
    }
    drop(msg_tx);

    let mut state = AppState::new();
    loop {
        let msg = match msg_rx.recv_timeout(TICK) {
            Ok(msg) => msg,
            Err(mpsc::RecvTimeoutError::Timeout) => Msg::Tick,
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        };

        let (next, effects) = update(state, msg);
        state = next;
        runner.run(effects);

        let view = state.view();
        if state.consume_dirty() {
            terminal
                .execute(render(&view, &mut cursor))
                .context("write to terminal")?;
        }
        if view.settled {
            break;
        }
    }

    let view = state.view();
    desk_info!(
        "Run finished phase={:?} items={} download={:?}",
        view.phase,
        view.item_count,
        view.download
    );
    Ok(Outcome { phase: view.phase })
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io;

    use super::*;
    use clap::Parser as _;
    use futures_util::{SinkExt, StreamExt};
    use pretty_assertions::assert_eq;
    use scrapedesk_core::ValidationError;
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;
    use tokio_tungstenite::tungstenite::Message;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::platform::Cli;

    fn config(args: &[&str]) -> AppConfig {
        let mut argv = vec!["scrapedesk", "--no-preview"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap().into_config().unwrap()
    }

    /// Socket.IO server that accepts one client, answers the namespace
    /// connect, waits for the scrape request and then streams one log line,
    /// `items` and the completion. Yields every text frame the client sent
    /// after connecting.
    async fn scrape_server(items: Vec<Value>) -> (String, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            let open = r#"0{"sid":"e1","upgrades":[],"pingInterval":25000,"pingTimeout":20000}"#;
            ws.send(Message::Text(open.to_string().into())).await.unwrap();

            let mut received = Vec::new();
            while let Some(Ok(frame)) = ws.next().await {
                let Message::Text(text) = frame else {
                    continue;
                };
                let text = text.as_str().to_owned();
                if text == "40" {
                    ws.send(Message::Text(r#"40{"sid":"s1"}"#.to_string().into()))
                        .await
                        .unwrap();
                    continue;
                }
                let is_request = text.starts_with(r#"42["scrape_request""#);
                received.push(text);
                if is_request {
                    let mut frames = vec![json!(["log_message", { "data": "Scraping..." }])];
                    frames.extend(items.iter().map(|item| json!(["json_item", item])));
                    frames.push(json!(["scrape_complete", { "data": "Scraping complete" }]));
                    for frame in frames {
                        ws.send(Message::Text(format!("42{frame}").into()))
                            .await
                            .unwrap();
                    }
                }
            }
            received
        });
        (base, handle)
    }

    fn event_payload(frame: &str) -> Value {
        serde_json::from_str(frame.strip_prefix("42").unwrap()).unwrap()
    }

    #[test]
    fn conflicting_form_settles_without_network() {
        let outcome = run_app(
            config(&["--url", "http://a.com", "--pdf", "doc.pdf"]),
            io::sink(),
        )
        .unwrap();
        assert_eq!(
            outcome.phase,
            Phase::Rejected(ValidationError::ConflictingInput)
        );
        assert!(!outcome.succeeded());
    }

    #[test]
    fn unreachable_server_ends_in_connection_failure() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let server = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let temp = TempDir::new().unwrap();
        let out = temp.path().join("results.json");
        let outcome = run_app(
            config(&[
                "--server",
                &server,
                "--url",
                "http://a.com",
                "--out",
                out.to_str().unwrap(),
            ]),
            io::sink(),
        )
        .unwrap();
        assert_eq!(outcome.phase, Phase::ConnectionFailed);
        assert!(!out.exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn url_scrape_writes_results_and_succeeds() {
        let (server, frames) =
            scrape_server(vec![json!({ "title": "A" }), json!({ "title": "B" })]).await;
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("results.json");
        let config = config(&[
            "--server",
            &server,
            "--url",
            "http://a.com",
            "--out",
            out.to_str().unwrap(),
        ]);

        let (outcome, transcript) = tokio::task::spawn_blocking(move || {
            let mut transcript = Vec::new();
            let outcome = run_app(config, &mut transcript).unwrap();
            (outcome, String::from_utf8(transcript).unwrap())
        })
        .await
        .unwrap();

        assert_eq!(outcome.phase, Phase::Completed);
        assert!(outcome.succeeded());
        assert_eq!(
            fs::read_to_string(&out).unwrap(),
            "{\n  \"team_id\": \"aline123\",\n  \"items\": [\n    {\n      \"title\": \"A\"\n    },\n    {\n      \"title\": \"B\"\n    }\n  ]\n}"
        );

        // The download is revealed before the client-side close is reported.
        let saved = transcript
            .find(&format!("Results saved to {}", out.display()))
            .expect("download line");
        let disconnected = transcript
            .find("Disconnected from server.")
            .expect("disconnect line");
        assert!(saved < disconnected);

        let frames = frames.await.unwrap();
        assert_eq!(frames[0], r#"42["scrape_request",{"urls":"http://a.com"}]"#);
        assert_eq!(frames.last().map(String::as_str), Some("41"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn pdf_scrape_sends_uploaded_id() {
        let upload = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/scrape_pdf"))
            .and(body_string_contains("name=\"pdf_file\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "pdf_id": "p1" })))
            .expect(1)
            .mount(&upload)
            .await;
        let (server, frames) = scrape_server(vec![json!({ "page": 1 })]).await;

        let temp = TempDir::new().unwrap();
        let pdf = temp.path().join("doc.pdf");
        fs::write(&pdf, b"%PDF-1.4").unwrap();
        let out = temp.path().join("results.json");
        let mut config = config(&[
            "--server",
            &server,
            "--pdf",
            pdf.to_str().unwrap(),
            "--out",
            out.to_str().unwrap(),
        ]);
        // An absolute upload path replaces the server base when joined.
        config.engine.upload_path = format!("{}/scrape_pdf", upload.uri());

        let outcome = tokio::task::spawn_blocking(move || run_app(config, io::sink()).unwrap())
            .await
            .unwrap();

        assert_eq!(outcome.phase, Phase::Completed);
        let frames = frames.await.unwrap();
        assert_eq!(
            event_payload(&frames[0]),
            json!(["scrape_request", { "urls": "", "pdf_id": "p1" }])
        );
        let written: Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(written, json!({ "team_id": "aline123", "items": [{ "page": 1 }] }));
    }
}
