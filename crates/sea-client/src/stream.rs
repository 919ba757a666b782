//! WebSocket stream sessions.
//!
//! A [`StreamSession`] owns one socket subscribed to one named stream. After
//! the socket opens it sends a `connect` handshake carrying the access token,
//! then turns inbound JSON frames into [`StreamEvent`]s delivered in arrival
//! order. Sessions never reconnect: once `Closed`, they stay closed.
//!
//! Frame handling lives in [`FrameHandler`], which does no I/O.

use std::fmt;
use std::time::Duration;

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::error::{Constraint, SeaError, ValidationError};
use crate::types::{Post, record_at};

/// Close code for a normal, caller-requested close.
pub const CLOSE_NORMAL: u16 = 1000;
/// Close code sent when the server violates the stream protocol.
pub const CLOSE_PROTOCOL_ERROR: u16 = 1002;
/// Close code reported when the peer closed without a status.
pub const CLOSE_NO_STATUS: u16 = 1005;
/// Close code reported when the connection dropped without a close frame.
pub const CLOSE_ABNORMAL: u16 = 1006;

/// How long to wait for the peer to drop the connection after a close frame.
const CLOSE_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Frames sent to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientFrame {
    /// Subscribe to `stream`, authenticating with `token`.
    Connect { stream: String, token: String },
    /// Liveness reply to a server `ping`.
    Ping,
}

impl ClientFrame {
    pub fn to_json(&self) -> Result<String, SeaError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Lifecycle of a stream session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Events delivered to the owner of a session.
#[derive(Debug)]
pub enum StreamEvent {
    /// The server accepted the subscription.
    Connect,
    /// A post arrived on the stream.
    Message(Post),
    /// The socket closed. Always the last event of a session.
    Close { code: u16, reason: String },
    /// A protocol or transport fault.
    Error(SeaError),
}

/// What the session must do in response to one inbound frame.
#[derive(Debug, Default)]
pub struct FrameOutcome {
    /// Frame to send back immediately.
    pub reply: Option<ClientFrame>,
    /// Event to deliver to the caller.
    pub event: Option<StreamEvent>,
    /// The frame was a protocol violation the session cannot continue past.
    pub fatal: bool,
}

impl FrameOutcome {
    fn event(event: StreamEvent) -> Self {
        Self {
            event: Some(event),
            ..Default::default()
        }
    }

    fn error(err: impl Into<SeaError>, fatal: bool) -> Self {
        Self {
            event: Some(StreamEvent::Error(err.into())),
            fatal,
            ..Default::default()
        }
    }
}

/// Socket-free stream protocol state machine.
#[derive(Debug, Clone)]
pub struct FrameHandler {
    stream: String,
    token: String,
    state: SessionState,
}

impl FrameHandler {
    pub fn new(stream: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            stream: stream.into(),
            token: token.into(),
            state: SessionState::Disconnected,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn stream(&self) -> &str {
        &self.stream
    }

    /// The socket is being opened.
    pub fn begin_connect(&mut self) {
        if self.state == SessionState::Disconnected {
            self.state = SessionState::Connecting;
        }
    }

    /// The socket opened; returns the handshake to send.
    pub fn on_open(&mut self) -> ClientFrame {
        self.begin_connect();
        ClientFrame::Connect {
            stream: self.stream.clone(),
            token: self.token.clone(),
        }
    }

    /// Handle one inbound text frame.
    pub fn on_text(&mut self, text: &str) -> FrameOutcome {
        if self.state == SessionState::Closed {
            return FrameOutcome::default();
        }

        let frame: Value = match serde_json::from_str(text) {
            Ok(frame) => frame,
            Err(e) => {
                return FrameOutcome::error(
                    SeaError::Protocol(format!("malformed frame: {e}")),
                    false,
                );
            }
        };
        let Some(kind) = frame.get("type").and_then(Value::as_str) else {
            return FrameOutcome::error(
                SeaError::Protocol(format!("frame without a type: {text}")),
                false,
            );
        };

        match kind {
            "success" => {
                if self.state == SessionState::Connected {
                    debug!(stream = %self.stream, "ignoring repeated success frame");
                    return FrameOutcome::default();
                }
                self.state = SessionState::Connected;
                FrameOutcome::event(StreamEvent::Connect)
            }
            "message" => {
                let post = match frame.get("content") {
                    None | Some(Value::Null) => {
                        Err(ValidationError::new("content", Constraint::Required))
                    }
                    Some(content) => record_at::<Post>("content", content),
                };
                match post {
                    Ok(post) => FrameOutcome::event(StreamEvent::Message(post)),
                    Err(e) => FrameOutcome::error(e, false),
                }
            }
            "ping" => {
                trace!(stream = %self.stream, "answering ping");
                FrameOutcome {
                    reply: Some(ClientFrame::Ping),
                    ..Default::default()
                }
            }
            "error" => FrameOutcome::error(
                SeaError::Protocol(format!("server reported an error: {text}")),
                true,
            ),
            other => FrameOutcome::error(
                SeaError::Protocol(format!("unknown frame type {other:?}: {text}")),
                true,
            ),
        }
    }

    /// The socket closed; returns the final event.
    pub fn on_close(&mut self, code: u16, reason: impl Into<String>) -> StreamEvent {
        self.state = SessionState::Closed;
        StreamEvent::Close {
            code,
            reason: reason.into(),
        }
    }
}

#[derive(Debug)]
enum Command {
    Disconnect { code: u16, reason: String },
}

/// A live subscription to one named stream.
///
/// Dropping the session closes the socket normally.
#[derive(Debug)]
pub struct StreamSession {
    stream: String,
    events: mpsc::UnboundedReceiver<StreamEvent>,
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<SessionState>,
}

impl StreamSession {
    /// Open a socket to `url` and subscribe to `stream`.
    ///
    /// Connection starts immediately on a spawned task, so this must be
    /// called from within a tokio runtime. Connection failures arrive as an
    /// [`StreamEvent::Error`] followed by [`StreamEvent::Close`].
    pub fn connect(url: Url, stream: &str, token: impl Into<String>) -> Self {
        let mut handler = FrameHandler::new(stream, token);
        handler.begin_connect();
        let (session, channels) = Self::channels(&handler);

        tokio::spawn(async move {
            info!(url = %url, stream = %handler.stream(), "connecting to stream");
            match connect_async(url.as_str()).await {
                Ok((socket, _)) => run_session(socket, handler, channels).await,
                Err(e) => {
                    warn!(error = %e, "stream connection failed");
                    channels.fault(&mut handler, e.into());
                }
            }
        });

        session
    }

    /// Run a session over an already-open socket.
    pub fn from_socket<S>(socket: S, stream: &str, token: impl Into<String>) -> Self
    where
        S: Sink<Message, Error = WsError> + Stream<Item = Result<Message, WsError>>,
        S: Send + Unpin + 'static,
    {
        let mut handler = FrameHandler::new(stream, token);
        handler.begin_connect();
        let (session, channels) = Self::channels(&handler);
        tokio::spawn(run_session(socket, handler, channels));
        session
    }

    fn channels(handler: &FrameHandler) -> (Self, Channels) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(handler.state());

        let session = Self {
            stream: handler.stream().to_string(),
            events: events_rx,
            commands: commands_tx,
            state: state_rx,
        };
        let channels = Channels {
            events: events_tx,
            commands: commands_rx,
            state: state_tx,
        };
        (session, channels)
    }

    pub fn stream(&self) -> &str {
        &self.stream
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Wait for the next event. Returns `None` once the session has closed
    /// and every event has been received.
    pub async fn recv(&mut self) -> Option<StreamEvent> {
        self.events.recv().await
    }

    /// Ask the server to close the socket.
    ///
    /// The [`StreamEvent::Close`] event follows once the close handshake
    /// completes. Defaults to code 1000 with an empty reason. Has no effect
    /// on a closed session.
    pub fn disconnect(&self, code: Option<u16>, reason: Option<&str>) {
        let command = Command::Disconnect {
            code: code.unwrap_or(CLOSE_NORMAL),
            reason: reason.unwrap_or_default().to_string(),
        };
        if self.commands.send(command).is_err() {
            debug!(stream = %self.stream, "disconnect requested on a closed session");
        }
    }
}

/// Worker side of a session's channels.
struct Channels {
    events: mpsc::UnboundedSender<StreamEvent>,
    commands: mpsc::UnboundedReceiver<Command>,
    state: watch::Sender<SessionState>,
}

impl Channels {
    fn emit(&self, handler: &FrameHandler, event: StreamEvent) {
        self.state.send_replace(handler.state());
        // The owner may have dropped the session; nothing is waiting then.
        let _ = self.events.send(event);
    }

    /// Report a transport fault and finish the session.
    fn fault(&self, handler: &mut FrameHandler, err: SeaError) {
        self.emit(handler, StreamEvent::Error(err));
        let close = handler.on_close(CLOSE_ABNORMAL, "");
        self.emit(handler, close);
    }
}

async fn send_frame<S>(socket: &mut S, frame: &ClientFrame) -> Result<(), SeaError>
where
    S: Sink<Message, Error = WsError> + Unpin,
{
    socket.send(Message::Text(frame.to_json()?)).await?;
    Ok(())
}

async fn send_close<S>(socket: &mut S, code: u16, reason: String) -> Result<(), WsError>
where
    S: Sink<Message, Error = WsError> + Unpin,
{
    socket
        .send(Message::Close(Some(CloseFrame {
            code: CloseCode::from(code),
            reason: reason.into(),
        })))
        .await
}

async fn run_session<S>(mut socket: S, mut handler: FrameHandler, mut channels: Channels)
where
    S: Sink<Message, Error = WsError> + Stream<Item = Result<Message, WsError>> + Unpin,
{
    let handshake = handler.on_open();
    channels.state.send_replace(handler.state());
    if let Err(e) = send_frame(&mut socket, &handshake).await {
        channels.fault(&mut handler, e);
        return;
    }
    debug!(stream = %handler.stream(), "sent stream handshake");

    let mut closing = false;
    // Set once a fatal frame has been seen; later text frames are dropped.
    let mut failed = false;

    loop {
        tokio::select! {
            command = channels.commands.recv(), if !closing => {
                let (code, reason) = match command {
                    Some(Command::Disconnect { code, reason }) => (code, reason),
                    // Session handle dropped.
                    None => (CLOSE_NORMAL, String::new()),
                };
                closing = true;
                debug!(stream = %handler.stream(), code, "closing stream");
                if let Err(e) = send_close(&mut socket, code, reason).await {
                    channels.fault(&mut handler, e.into());
                    return;
                }
            }
            inbound = socket.next() => {
                match inbound {
                    Some(Ok(Message::Text(_))) if failed => {
                        trace!(stream = %handler.stream(), "dropping frame after protocol error");
                    }
                    Some(Ok(Message::Text(text))) => {
                        let outcome = handler.on_text(&text);
                        if let Some(reply) = outcome.reply {
                            if let Err(e) = send_frame(&mut socket, &reply).await {
                                channels.fault(&mut handler, e);
                                return;
                            }
                        }
                        if let Some(event) = outcome.event {
                            match &event {
                                StreamEvent::Connect => {
                                    info!(stream = %handler.stream(), "stream connected");
                                }
                                StreamEvent::Error(e) => {
                                    warn!(
                                        stream = %handler.stream(),
                                        error = %e,
                                        "stream protocol error"
                                    );
                                }
                                _ => {}
                            }
                            channels.emit(&handler, event);
                        }
                        if outcome.fatal {
                            failed = true;
                        }
                        if outcome.fatal && !closing {
                            closing = true;
                            let reason = "protocol error".to_string();
                            let sent = send_close(&mut socket, CLOSE_PROTOCOL_ERROR, reason).await;
                            if let Err(e) = sent {
                                channels.fault(&mut handler, e.into());
                                return;
                            }
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let (code, reason) = frame
                            .map(|f| (u16::from(f.code), f.reason.into_owned()))
                            .unwrap_or((CLOSE_NO_STATUS, String::new()));
                        info!(stream = %handler.stream(), code, reason = %reason, "stream closed");
                        // Drive the close handshake reply out before finishing.
                        let drain = async { while let Some(Ok(_)) = socket.next().await {} };
                        if tokio::time::timeout(CLOSE_DRAIN_TIMEOUT, drain).await.is_err() {
                            debug!(
                                stream = %handler.stream(),
                                "peer kept the connection open after close"
                            );
                        }
                        let close = handler.on_close(code, reason);
                        channels.emit(&handler, close);
                        return;
                    }
                    // Binary frames are not part of the protocol; transport
                    // pings are answered by tungstenite.
                    Some(Ok(_)) => {}
                    Some(Err(WsError::ConnectionClosed)) | None => {
                        let close = handler.on_close(CLOSE_ABNORMAL, "");
                        channels.emit(&handler, close);
                        return;
                    }
                    Some(Err(e)) => {
                        warn!(stream = %handler.stream(), error = %e, "stream transport error");
                        channels.fault(&mut handler, e.into());
                        return;
                    }
                }
            }
        }
    }
}
