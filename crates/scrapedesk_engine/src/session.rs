use futures_util::{SinkExt, StreamExt};
use scrapedesk_logging::{desk_debug, desk_info, desk_warn};
use serde_json::Value;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use crate::protocol::{
    decode_engine_packet, decode_socket_packet, encode_engine_packet, encode_event,
    encode_socket_packet, EnginePacket, OpenInfo, ProtocolError, SocketPacket,
};
use crate::{EngineEvent, EngineSettings, EventSink, ServerEvent, SubmissionId};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const CLIENT_DISCONNECT: &str = "io client disconnect";
const SERVER_DISCONNECT: &str = "io server disconnect";
const TRANSPORT_CLOSE: &str = "transport close";
const PING_TIMEOUT: &str = "ping timeout";

#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    Emit { event: String, payload: Value },
}

#[derive(Debug, Error)]
enum SessionError {
    #[error("timeout")]
    Timeout,
    #[error("{0}")]
    Refused(String),
    #[error("connection closed during handshake")]
    ClosedDuringHandshake,
    #[error("unexpected packet during handshake: {0}")]
    Unexpected(String),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Transport(#[from] tungstenite::Error),
}

enum FrameAction {
    Continue,
    Pong(String),
    Closed(&'static str),
}

/// Drives one real-time session from handshake to teardown.
///
/// Emits `Connected` once the namespace connect is acknowledged, forwards
/// server events in arrival order, and always finishes with exactly one
/// `ConnectFailed` or `Disconnected`. Cancelling `shutdown` or dropping the
/// command sender closes the session from the client side.
pub async fn run_session(
    settings: &EngineSettings,
    submission: SubmissionId,
    mut commands: mpsc::UnboundedReceiver<SessionCommand>,
    shutdown: CancellationToken,
    sink: &dyn EventSink,
) {
    let attempt = tokio::time::timeout(settings.connect_timeout, handshake(settings));
    let connected = tokio::select! {
        result = attempt => result.unwrap_or(Err(SessionError::Timeout)),
        _ = shutdown.cancelled() => {
            desk_debug!("Session submission={} closed before connecting", submission);
            sink.emit(EngineEvent::Disconnected {
                submission,
                reason: CLIENT_DISCONNECT.to_string(),
            });
            return;
        }
    };

    let (stream, open) = match connected {
        Ok(pair) => pair,
        Err(err) => {
            desk_warn!("Session submission={} connect failed: {}", submission, err);
            sink.emit(EngineEvent::ConnectFailed {
                submission,
                reason: err.to_string(),
            });
            return;
        }
    };

    desk_info!(
        "Session submission={} connected sid={} ping_deadline={:?}",
        submission,
        open.sid,
        open.ping_deadline()
    );
    sink.emit(EngineEvent::Connected { submission });

    let reason = pump(stream, &open, &mut commands, &shutdown, submission, sink).await;
    desk_info!("Session submission={} disconnected: {}", submission, reason);
    sink.emit(EngineEvent::Disconnected { submission, reason });
}

async fn handshake(settings: &EngineSettings) -> Result<(WsStream, OpenInfo), SessionError> {
    let url = settings.socket_url()?;
    desk_debug!("Opening socket url={}", url);
    let (mut ws, _response) = tokio_tungstenite::connect_async(url.as_str()).await?;

    let open = loop {
        let text = next_text(&mut ws).await?;
        match decode_engine_packet(&text)? {
            EnginePacket::Open(info) => break info,
            EnginePacket::Noop => continue,
            other => return Err(SessionError::Unexpected(format!("{other:?}"))),
        }
    };

    let connect = EnginePacket::Message(encode_socket_packet(&SocketPacket::Connect(None)));
    ws.send(Message::Text(encode_engine_packet(&connect).into()))
        .await?;

    loop {
        let text = next_text(&mut ws).await?;
        match decode_engine_packet(&text)? {
            EnginePacket::Ping(data) => {
                ws.send(Message::Text(encode_engine_packet(&EnginePacket::Pong(data)).into()))
                    .await?;
            }
            EnginePacket::Message(body) => match decode_socket_packet(&body)? {
                SocketPacket::Connect(_) => return Ok((ws, open)),
                SocketPacket::ConnectError(payload) => {
                    return Err(SessionError::Refused(SocketPacket::connect_error_message(
                        payload.as_ref(),
                    )))
                }
                _ => continue,
            },
            EnginePacket::Close => return Err(SessionError::ClosedDuringHandshake),
            _ => continue,
        }
    }
}

async fn next_text(ws: &mut WsStream) -> Result<String, SessionError> {
    while let Some(message) = ws.next().await {
        match message? {
            Message::Text(text) => return Ok(text.as_str().to_owned()),
            Message::Close(_) => return Err(SessionError::ClosedDuringHandshake),
            _ => continue,
        }
    }
    Err(SessionError::ClosedDuringHandshake)
}

/// Moves frames until either side ends the session; returns the reason.
async fn pump(
    ws: WsStream,
    open: &OpenInfo,
    commands: &mut mpsc::UnboundedReceiver<SessionCommand>,
    shutdown: &CancellationToken,
    submission: SubmissionId,
    sink: &dyn EventSink,
) -> String {
    let (mut write, mut read) = ws.split();
    let ping_deadline = open.ping_deadline();
    let watchdog = tokio::time::sleep(ping_deadline);
    tokio::pin!(watchdog);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                close_from_client(&mut write).await;
                return CLIENT_DISCONNECT.to_string();
            }
            command = commands.recv() => match command {
                Some(SessionCommand::Emit { event, payload }) => {
                    desk_debug!("Session submission={} emit event={}", submission, event);
                    let frame = encode_event(&event, &payload);
                    if let Err(err) = write.send(Message::Text(frame.into())).await {
                        return format!("transport error: {err}");
                    }
                }
                None => {
                    close_from_client(&mut write).await;
                    return CLIENT_DISCONNECT.to_string();
                }
            },
            _ = &mut watchdog => return PING_TIMEOUT.to_string(),
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => match handle_frame(text.as_str(), submission, sink) {
                    FrameAction::Continue => {}
                    FrameAction::Pong(data) => {
                        watchdog.as_mut().reset(Instant::now() + ping_deadline);
                        let pong = encode_engine_packet(&EnginePacket::Pong(data));
                        if let Err(err) = write.send(Message::Text(pong.into())).await {
                            return format!("transport error: {err}");
                        }
                    }
                    FrameAction::Closed(reason) => return reason.to_string(),
                },
                Some(Ok(Message::Close(_))) | None => return TRANSPORT_CLOSE.to_string(),
                Some(Ok(_)) => {}
                Some(Err(err)) => return format!("transport error: {err}"),
            },
        }
    }
}

fn handle_frame(text: &str, submission: SubmissionId, sink: &dyn EventSink) -> FrameAction {
    let packet = match decode_engine_packet(text) {
        Ok(packet) => packet,
        Err(err) => {
            desk_warn!("Session submission={} bad engine packet: {}", submission, err);
            return FrameAction::Continue;
        }
    };

    match packet {
        EnginePacket::Ping(data) => FrameAction::Pong(data),
        EnginePacket::Close => FrameAction::Closed(TRANSPORT_CLOSE),
        EnginePacket::Message(body) => match decode_socket_packet(&body) {
            Ok(SocketPacket::Event { name, args }) => {
                match ServerEvent::from_event(&name, args) {
                    Some(event) => sink.emit(EngineEvent::Server { submission, event }),
                    None => desk_debug!(
                        "Session submission={} ignored event={}",
                        submission,
                        name
                    ),
                }
                FrameAction::Continue
            }
            Ok(SocketPacket::Disconnect) => FrameAction::Closed(SERVER_DISCONNECT),
            Ok(_) => FrameAction::Continue,
            Err(err) => {
                desk_warn!("Session submission={} bad socket packet: {}", submission, err);
                FrameAction::Continue
            }
        },
        _ => FrameAction::Continue,
    }
}

async fn close_from_client<S>(write: &mut S)
where
    S: futures_util::Sink<Message> + Unpin,
{
    let disconnect = EnginePacket::Message(encode_socket_packet(&SocketPacket::Disconnect));
    let _ = write
        .send(Message::Text(encode_engine_packet(&disconnect).into()))
        .await;
    let _ = write.close().await;
}
