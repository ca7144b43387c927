//! WebSocket transport for the client.
//!
//! Provides [`TransportHandle`] which handles WebSocket I/O for the
//! STOMP-subset framing. This is a thin layer that performs the CONNECT
//! handshake, bridges frames over channels, and keeps heartbeats flowing
//! at the intervals negotiated with the server - protocol logic remains in
//! the Sans-IO [`crate::ChatClient`].
//!
//! Lifecycle is reported as [`TransportNotice`]s: `Up` once the server
//! accepts the session, `Frame` for deliveries, `Failed` for protocol or
//! socket errors, `Closed` for remote close or heartbeat timeout. The
//! transport never reconnects on its own; every reconnection is a fresh
//! [`connect`] call.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use roomwire_proto::{Command, Frame, HEARTBEAT_FRAME, HeartBeat};
use thiserror::Error;
use tokio::{net::TcpStream, sync::mpsc, time::Instant};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

/// Missed incoming heartbeats tolerated before the connection is declared
/// dead.
const HEARTBEAT_GRACE: u32 = 3;

/// Channel capacity for frames and notices.
const CHANNEL_CAPACITY: usize = 32;

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Stream error.
    #[error("stream error: {0}")]
    Stream(String),

    /// Protocol error.
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Lifecycle and delivery notifications from a transport session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportNotice {
    /// The server accepted the session (CONNECTED received).
    Up,

    /// A frame arrived on the session (MESSAGE, RECEIPT).
    Frame(Frame),

    /// The session failed: socket error, ERROR frame, or heartbeat
    /// timeout. The connection is unusable afterwards.
    Failed {
        /// Failure detail, server-supplied where available.
        reason: String,
    },

    /// The channel closed (remote close or graceful disconnect).
    Closed,
}

/// Transport configuration.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Time allowed for the TCP/WebSocket connect.
    pub connect_timeout: Duration,
    /// Heartbeat intervals promised in the CONNECT frame.
    pub heart_beat: HeartBeat,
}

impl TransportConfig {
    /// Configuration with a 10 second connect timeout.
    #[must_use]
    pub fn new(heart_beat: HeartBeat) -> Self {
        Self { connect_timeout: Duration::from_secs(10), heart_beat }
    }
}

/// Handle to a live transport session.
///
/// Frames are sent via `to_server`; lifecycle and deliveries arrive on
/// `notices`. An internal task owns the socket.
pub struct TransportHandle {
    /// Send frames to the server.
    pub to_server: mpsc::Sender<Frame>,
    /// Receive lifecycle notices and delivered frames.
    pub notices: mpsc::Receiver<TransportNotice>,
    /// Abort handle to stop the connection task.
    abort_handle: tokio::task::AbortHandle,
}

impl TransportHandle {
    /// Stop the connection task. Idempotent; the socket drops with the
    /// task.
    pub fn close(&self) {
        self.abort_handle.abort();
    }

    /// Clonable abort handle for closing the session from elsewhere.
    #[must_use]
    pub fn abort_handle(&self) -> tokio::task::AbortHandle {
        self.abort_handle.clone()
    }
}

/// Connect to the chat server and start a session for a room.
///
/// Opens the WebSocket, sends the CONNECT frame (room id as a connect
/// header, the configured heartbeat intervals as the offer), and returns
/// once the socket is up. The STOMP handshake completes asynchronously:
/// [`TransportNotice::Up`] arrives on the handle when the server replies
/// CONNECTED, and heartbeats start at the intervals negotiated via
/// [`HeartBeat::negotiate`] against the server's `heart-beat` header.
pub async fn connect(
    endpoint: &str,
    room_id: &str,
    config: TransportConfig,
) -> Result<TransportHandle, TransportError> {
    let attempt = tokio::time::timeout(config.connect_timeout, connect_async(endpoint));
    let (ws, _response) = attempt
        .await
        .map_err(|_| TransportError::Connection(format!("timed out connecting to {endpoint}")))?
        .map_err(|e| TransportError::Connection(e.to_string()))?;

    let (to_server_tx, to_server_rx) = mpsc::channel::<Frame>(CHANNEL_CAPACITY);
    let (notices_tx, notices_rx) = mpsc::channel::<TransportNotice>(CHANNEL_CAPACITY);

    let handle = tokio::spawn(run_connection(
        ws,
        room_id.to_string(),
        config.heart_beat,
        to_server_rx,
        notices_tx,
    ));

    Ok(TransportHandle {
        to_server: to_server_tx,
        notices: notices_rx,
        abort_handle: handle.abort_handle(),
    })
}

/// Run the session, bridging between channels and the WebSocket.
async fn run_connection(
    ws: Ws,
    room_id: String,
    heart_beat: HeartBeat,
    mut to_server: mpsc::Receiver<Frame>,
    notices: mpsc::Sender<TransportNotice>,
) {
    let (mut sink, mut stream) = ws.split();

    let connect_frame = Frame::connect(&room_id, heart_beat);
    if let Err(e) = sink.send(Message::Text(connect_frame.encode())).await {
        let _ = notices.send(TransportNotice::Failed { reason: e.to_string() }).await;
        return;
    }

    // Heartbeats stay off until the CONNECTED exchange fixes the effective
    // intervals; the configured values are only the offer in the CONNECT
    // frame.
    let mut send_heartbeats = false;
    let mut heartbeat = tokio::time::interval(Duration::from_secs(1));
    let mut idle_limit: Option<Duration> = None;
    let mut idle_deadline = Instant::now();

    loop {
        tokio::select! {
            () = tokio::time::sleep_until(idle_deadline), if idle_limit.is_some() => {
                let _ = notices
                    .send(TransportNotice::Failed { reason: "heartbeat timeout".to_string() })
                    .await;
                break;
            },
            _ = heartbeat.tick(), if send_heartbeats => {
                if sink.send(Message::Text(HEARTBEAT_FRAME.to_string())).await.is_err() {
                    let _ = notices.send(TransportNotice::Closed).await;
                    break;
                }
            },
            frame = to_server.recv() => match frame {
                Some(frame) => {
                    let graceful = frame.command == Command::Disconnect;
                    if sink.send(Message::Text(frame.encode())).await.is_err() {
                        let _ = notices.send(TransportNotice::Closed).await;
                        break;
                    }
                    if graceful {
                        let _ = sink.send(Message::Close(None)).await;
                        let _ = notices.send(TransportNotice::Closed).await;
                        break;
                    }
                },
                // Handle dropped: close the socket and stop.
                None => {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                },
            },
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    if let Some(limit) = idle_limit {
                        idle_deadline = Instant::now() + limit;
                    }
                    match handle_text(&text, &notices).await {
                        Inbound::Handled => {},
                        Inbound::Connected(server) => {
                            let effective = heart_beat.negotiate(server);
                            if effective.outgoing_ms > 0 {
                                let period = Duration::from_millis(effective.outgoing_ms);
                                heartbeat =
                                    tokio::time::interval_at(Instant::now() + period, period);
                                heartbeat.set_missed_tick_behavior(
                                    tokio::time::MissedTickBehavior::Delay,
                                );
                                send_heartbeats = true;
                            }
                            if effective.incoming_ms > 0 {
                                let limit = Duration::from_millis(effective.incoming_ms)
                                    * HEARTBEAT_GRACE;
                                idle_deadline = Instant::now() + limit;
                                idle_limit = Some(limit);
                            }
                        },
                        Inbound::Stop => break,
                    }
                },
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {
                    if let Some(limit) = idle_limit {
                        idle_deadline = Instant::now() + limit;
                    }
                },
                Some(Ok(Message::Close(_))) | None => {
                    let _ = notices.send(TransportNotice::Closed).await;
                    break;
                },
                Some(Ok(_)) => {},
                Some(Err(e)) => {
                    let _ = notices
                        .send(TransportNotice::Failed { reason: e.to_string() })
                        .await;
                    break;
                },
            },
        }
    }
}

/// Outcome of one incoming text payload.
enum Inbound {
    /// Heartbeat or dispatched frame; keep reading.
    Handled,
    /// CONNECTED arrived, carrying the server's advertised heartbeat
    /// intervals (disabled when the header is absent).
    Connected(HeartBeat),
    /// ERROR arrived; the session must stop.
    Stop,
}

/// Dispatch one incoming text payload.
async fn handle_text(text: &str, notices: &mpsc::Sender<TransportNotice>) -> Inbound {
    // A bare newline (or empty payload) is a heartbeat, not a frame.
    if text.trim_matches(['\r', '\n']).is_empty() {
        return Inbound::Handled;
    }

    // Some brokers omit the NUL terminator inside a websocket message
    // boundary; tolerate both.
    let owned;
    let normalized = if text.ends_with('\0') {
        text
    } else {
        owned = format!("{text}\0");
        &owned
    };

    let frame = match Frame::parse(normalized) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::warn!(error = %e, "dropping unparseable frame");
            return Inbound::Handled;
        },
    };

    match frame.command {
        Command::Connected => {
            let server = match frame.header("heart-beat").map(HeartBeat::parse) {
                Some(Ok(server)) => server,
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "ignoring malformed heart-beat header");
                    HeartBeat::disabled()
                },
                None => HeartBeat::disabled(),
            };
            let _ = notices.send(TransportNotice::Up).await;
            Inbound::Connected(server)
        },
        Command::Error => {
            let reason =
                frame.header("message").unwrap_or("server reported an error").to_string();
            let _ = notices.send(TransportNotice::Failed { reason }).await;
            Inbound::Stop
        },
        _ => {
            let _ = notices.send(TransportNotice::Frame(frame)).await;
            Inbound::Handled
        },
    }
}
