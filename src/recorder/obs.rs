//! OBS WebSocket backend.

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use uuid::Uuid;

use super::protocol::{self, RequestResponse, ServerMessage};
use super::{RecorderError, RecordingBackend, RequestOutcome};
use crate::config::{ConfigError, ObsConfig};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Responses buffered between the reader task and the pending request.
const RESPONSE_CHANNEL_CAPACITY: usize = 16;

/// A live, identified OBS session.
struct ObsSession {
    sink: SplitSink<WsStream, Message>,
    responses: mpsc::Receiver<RequestResponse>,
    reader: JoinHandle<()>,
}

/// [`RecordingBackend`] speaking OBS WebSocket v5.
pub struct ObsBackend {
    url: String,
    password: Option<String>,
    session: Option<ObsSession>,
}

impl std::fmt::Debug for ObsBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObsBackend")
            .field("url", &self.url)
            .field("authenticated", &self.password.is_some())
            .field("connected", &self.session.is_some())
            .finish()
    }
}

impl ObsBackend {
    /// Create a backend for the configured OBS server. Does not connect.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured host and port do not form a valid URL.
    pub fn new(config: &ObsConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            url: config.url()?.to_string(),
            password: config.password().map(str::to_string),
            session: None,
        })
    }

    /// The WebSocket URL this backend connects to.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Whether an identified session is live.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| !session.reader.is_finished())
    }

    async fn handshake(
        &self,
        sink: &mut SplitSink<WsStream, Message>,
        stream: &mut SplitStream<WsStream>,
    ) -> Result<(), RecorderError> {
        let ServerMessage::Hello(hello) = next_message(stream).await? else {
            return Err(RecorderError::Handshake("expected Hello".into()));
        };
        tracing::debug!(
            version = hello.obs_web_socket_version.as_deref().unwrap_or("unknown"),
            rpc_version = hello.rpc_version,
            auth_required = hello.authentication.is_some(),
            "Received OBS Hello"
        );

        let identify = protocol::encode_identify(&hello, self.password.as_deref())?;
        sink.send(Message::Text(identify)).await?;

        loop {
            match next_message(stream).await? {
                ServerMessage::Identified(identified) => {
                    tracing::debug!(
                        rpc_version = identified.negotiated_rpc_version,
                        "OBS session identified"
                    );
                    return Ok(());
                }
                ServerMessage::Event(_) | ServerMessage::Other(_) => {}
                other => {
                    return Err(RecorderError::Handshake(format!(
                        "unexpected message before Identified: {other:?}"
                    )));
                }
            }
        }
    }
}

#[async_trait]
impl RecordingBackend for ObsBackend {
    async fn connect(&mut self) -> Result<(), RecorderError> {
        if self.is_connected() {
            return Ok(());
        }

        let (ws, _response) = tokio_tungstenite::connect_async(self.url.as_str()).await?;
        let (mut sink, mut stream) = ws.split();
        self.handshake(&mut sink, &mut stream).await?;

        let (responses_tx, responses) = mpsc::channel(RESPONSE_CHANNEL_CAPACITY);
        let reader = tokio::spawn(read_loop(stream, responses_tx));
        self.session = Some(ObsSession {
            sink,
            responses,
            reader,
        });
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), RecorderError> {
        let Some(mut session) = self.session.take() else {
            return Ok(());
        };
        session.reader.abort();
        if let Err(e) = session.sink.close().await {
            tracing::debug!(error = %e, "OBS socket already closed");
        }
        Ok(())
    }

    async fn request(&mut self, request_type: &str) -> Result<RequestOutcome, RecorderError> {
        let session = self.session.as_mut().ok_or(RecorderError::NotConnected)?;

        let request_id = Uuid::new_v4().to_string();
        let frame = protocol::encode_request(request_type, &request_id)?;
        if let Err(e) = session.sink.send(Message::Text(frame)).await {
            tracing::warn!(error = %e, "Failed to send OBS request");
            self.session = None;
            return Err(RecorderError::ConnectionLost);
        }

        loop {
            let next = session.responses.recv().await;
            match next {
                Some(response) if response.request_id == request_id => {
                    return Ok(response.request_status.into_outcome());
                }
                Some(stale) => {
                    tracing::debug!(
                        request_id = %stale.request_id,
                        request_type = %stale.request_type,
                        "Discarding stale OBS response"
                    );
                }
                None => {
                    self.session = None;
                    return Err(RecorderError::ConnectionLost);
                }
            }
        }
    }
}

/// Read the next decodable text frame during the handshake.
async fn next_message(stream: &mut SplitStream<WsStream>) -> Result<ServerMessage, RecorderError> {
    while let Some(frame) = stream.next().await {
        match frame? {
            Message::Text(text) => return ServerMessage::decode(&text),
            Message::Close(close) => {
                let reason = close.map_or_else(
                    || "connection closed".to_string(),
                    |frame| format!("closed with code {}: {}", frame.code, frame.reason),
                );
                return Err(RecorderError::Handshake(reason));
            }
            _ => {}
        }
    }
    Err(RecorderError::Handshake("connection closed".into()))
}

/// Route responses to the pending request and log events until the socket closes.
async fn read_loop(mut stream: SplitStream<WsStream>, responses: mpsc::Sender<RequestResponse>) {
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => match ServerMessage::decode(&text) {
                Ok(ServerMessage::RequestResponse(response)) => {
                    if responses.send(response).await.is_err() {
                        return;
                    }
                }
                Ok(ServerMessage::Event(event)) => {
                    tracing::debug!(
                        event_type = %event.event_type,
                        data = ?event.event_data,
                        "OBS event"
                    );
                }
                Ok(other) => tracing::trace!(message = ?other, "Ignoring OBS message"),
                Err(e) => tracing::warn!(error = %e, "Malformed OBS message"),
            },
            Ok(Message::Close(frame)) => {
                tracing::debug!(frame = ?frame, "OBS closed the connection");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "OBS socket error");
                break;
            }
        }
    }
    tracing::error!("Lost connection to OBS; recording commands will fail until restart");
}
