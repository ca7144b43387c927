//! Async driver bridging the Sans-IO client to real I/O.
//!
//! The driver owns a [`ChatClient`], executes the actions it produces
//! (open/close transports, subscribe, publish, fetch history), and pumps
//! transport notices and history results back in as events. The UI
//! collaborator talks to it over two channels: [`SessionCommand`]s in,
//! [`SessionUpdate`]s out.
//!
//! ```text
//! UI collaborator  ── SessionCommand ──>  SessionDriver  <──>  transport,
//!                  <── SessionUpdate ──                        history
//! ```
//!
//! Transport opens and history fetches run as spawned tasks so commands
//! never block on the network; their results re-enter the loop tagged with
//! the generation they were started for, and the state machine discards
//! anything stale.

use std::{collections::HashMap, time::Duration};

use roomwire_proto::{ChatMessage, Command, Frame, routes};
use tokio::sync::mpsc;

use crate::{
    ChatClient, ClientConfig, DEFAULT_HEARTBEAT_INTERVAL,
    event::{ClientAction, ClientEvent, ConnectionStatus, Generation, NotifyLevel},
    history::HistoryLoader,
    transport::{self, TransportConfig, TransportHandle, TransportNotice},
};

/// Time allowed for a graceful DISCONNECT to flush before the connection
/// task is aborted.
const CLOSE_GRACE: Duration = Duration::from_secs(2);

/// Commands from the UI collaborator.
#[derive(Debug, Clone)]
pub enum SessionCommand {
    /// Connect to a room.
    Connect {
        /// Room to connect to.
        room_id: String,
    },
    /// Tear down the current session (or cancel an attempt in flight).
    Disconnect,
    /// Publish a chat message to the current room.
    Send {
        /// Message text.
        text: String,
        /// Room the message is addressed to.
        room_id: String,
    },
}

/// Updates for the UI collaborator.
#[derive(Debug, Clone)]
pub enum SessionUpdate {
    /// Observable state changed; carries the full view to re-render.
    Render {
        /// Current connection status.
        status: ConnectionStatus,
        /// Current ordered message view.
        messages: Vec<ChatMessage>,
    },
    /// A user-visible notification (the UI's toast).
    Notice {
        /// Severity.
        level: NotifyLevel,
        /// Notification text.
        message: String,
    },
}

/// Driver configuration.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Base URL of the chat service (`http://host:port`); WebSocket and
    /// history endpoints derive from it.
    pub base_url: String,
    /// Heartbeat interval, applied to both directions.
    pub heartbeat: Duration,
}

impl DriverConfig {
    /// Configuration with the default heartbeat interval.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), heartbeat: DEFAULT_HEARTBEAT_INTERVAL }
    }
}

/// Internal loop events: state machine inputs plus transport-open results.
enum DriverEvent {
    Client(ClientEvent),
    TransportReady { generation: Generation, handle: TransportHandle },
}

/// Registered live transport session.
struct ActiveTransport {
    to_server: mpsc::Sender<Frame>,
    abort: tokio::task::AbortHandle,
}

/// Event loop owning the client, its transports, and the history loader.
pub struct SessionDriver {
    client: ChatClient,
    history: HistoryLoader,
    transports: HashMap<Generation, ActiveTransport>,
    commands: mpsc::Receiver<SessionCommand>,
    updates: mpsc::Sender<SessionUpdate>,
    events_tx: mpsc::Sender<DriverEvent>,
    events_rx: mpsc::Receiver<DriverEvent>,
}

impl SessionDriver {
    /// Create a driver wired to the given command and update channels.
    #[must_use]
    pub fn new(
        config: DriverConfig,
        commands: mpsc::Receiver<SessionCommand>,
        updates: mpsc::Sender<SessionUpdate>,
    ) -> Self {
        let client = ChatClient::new(ClientConfig {
            endpoint: routes::ws_endpoint(&config.base_url),
            heartbeat: config.heartbeat,
        });
        let history = HistoryLoader::new(config.base_url);
        let (events_tx, events_rx) = mpsc::channel(64);
        Self {
            client,
            history,
            transports: HashMap::new(),
            commands,
            updates,
            events_tx,
            events_rx,
        }
    }

    /// Run the event loop until the command channel closes.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => break,
                },
                event = self.events_rx.recv() => {
                    // `events_tx` lives in `self`, so this arm never yields
                    // `None` while the loop runs.
                    if let Some(event) = event {
                        self.handle_driver_event(event).await;
                    }
                },
            }
        }

        for (_, active) in self.transports.drain() {
            active.abort.abort();
        }
    }

    async fn handle_command(&mut self, command: SessionCommand) {
        let event = match command {
            SessionCommand::Connect { room_id } => ClientEvent::Connect { room_id },
            SessionCommand::Disconnect => ClientEvent::Disconnect,
            SessionCommand::Send { text, room_id } => ClientEvent::Send { text, room_id },
        };
        self.dispatch(event).await;
    }

    async fn handle_driver_event(&mut self, event: DriverEvent) {
        match event {
            DriverEvent::Client(event) => self.dispatch(event).await,
            DriverEvent::TransportReady { generation, handle } => {
                // The session may have been cancelled while the socket was
                // connecting; never keep a transport nobody owns.
                if self.client.session_generation() == Some(generation) {
                    self.transports.insert(
                        generation,
                        ActiveTransport {
                            to_server: handle.to_server.clone(),
                            abort: handle.abort_handle(),
                        },
                    );
                    self.spawn_forwarder(generation, handle);
                } else {
                    tracing::debug!(generation, "closing transport for cancelled session");
                    handle.close();
                }
            },
        }
    }

    /// Feed one event to the state machine and execute what comes out.
    /// Validation errors surface to the UI as warnings.
    async fn dispatch(&mut self, event: ClientEvent) {
        match self.client.handle(event) {
            Ok(actions) => self.execute(actions).await,
            Err(err) => {
                let _ = self
                    .updates
                    .send(SessionUpdate::Notice {
                        level: NotifyLevel::Warning,
                        message: err.to_string(),
                    })
                    .await;
            },
        }
    }

    async fn execute(&mut self, actions: Vec<ClientAction>) {
        for action in actions {
            match action {
                ClientAction::OpenTransport { generation, endpoint, room_id, heart_beat } => {
                    let events = self.events_tx.clone();
                    let config = TransportConfig::new(heart_beat);
                    tokio::spawn(async move {
                        let event = match transport::connect(&endpoint, &room_id, config).await {
                            Ok(handle) => DriverEvent::TransportReady { generation, handle },
                            Err(e) => DriverEvent::Client(ClientEvent::TransportError {
                                generation,
                                reason: e.to_string(),
                            }),
                        };
                        let _ = events.send(event).await;
                    });
                },
                ClientAction::Subscribe { generation, topic } => {
                    let frame = Frame::subscribe(&format!("sub-{generation}"), &topic);
                    self.send_frame(generation, frame).await;
                },
                ClientAction::FetchHistory { generation, room_id } => {
                    let history = self.history.clone();
                    let events = self.events_tx.clone();
                    tokio::spawn(async move {
                        let event = match history.fetch(&room_id).await {
                            Ok(messages) => ClientEvent::HistoryLoaded { generation, messages },
                            Err(e) => ClientEvent::HistoryFailed {
                                generation,
                                reason: e.to_string(),
                            },
                        };
                        let _ = events.send(DriverEvent::Client(event)).await;
                    });
                },
                ClientAction::Publish { destination, room_id, body } => {
                    if let Some(generation) = self.client.session_generation() {
                        let frame = Frame::send_message(&destination, &room_id, body);
                        self.send_frame(generation, frame).await;
                    }
                },
                ClientAction::CloseTransport { generation } => {
                    self.close_transport(generation);
                },
                ClientAction::Notify { level, message } => {
                    let _ = self.updates.send(SessionUpdate::Notice { level, message }).await;
                },
                ClientAction::Render => {
                    let update = SessionUpdate::Render {
                        status: self.client.status(),
                        messages: self.client.messages().to_vec(),
                    };
                    let _ = self.updates.send(update).await;
                },
                ClientAction::Log { message } => {
                    tracing::debug!(%message, "state machine");
                },
            }
        }
    }

    async fn send_frame(&self, generation: Generation, frame: Frame) {
        let Some(active) = self.transports.get(&generation) else {
            tracing::warn!(generation, command = frame.command.as_str(), "no live transport");
            return;
        };
        if active.to_server.send(frame).await.is_err() {
            tracing::warn!(generation, "send on closed transport");
        }
    }

    /// Release a transport: ask for a graceful DISCONNECT, then abort the
    /// connection task once the grace period passes.
    fn close_transport(&mut self, generation: Generation) {
        let Some(active) = self.transports.remove(&generation) else {
            // Still connecting; `TransportReady` handles the cleanup.
            return;
        };
        tokio::spawn(async move {
            let _ = active.to_server.send(Frame::disconnect()).await;
            tokio::time::sleep(CLOSE_GRACE).await;
            active.abort.abort();
        });
    }

    /// Forward transport notices into the event loop as generation-tagged
    /// client events.
    fn spawn_forwarder(&self, generation: Generation, mut handle: TransportHandle) {
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            while let Some(notice) = handle.notices.recv().await {
                let event = match notice {
                    TransportNotice::Up => ClientEvent::TransportUp { generation },
                    TransportNotice::Frame(frame) => {
                        if frame.command == Command::Message {
                            ClientEvent::Delivery { generation, body: frame.body }
                        } else {
                            continue;
                        }
                    },
                    TransportNotice::Failed { reason } => {
                        ClientEvent::TransportError { generation, reason }
                    },
                    TransportNotice::Closed => ClientEvent::TransportClosed { generation },
                };
                if events.send(DriverEvent::Client(event)).await.is_err() {
                    break;
                }
            }
        });
    }
}
