//! Control channel WebSocket server with graceful shutdown.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use super::{BroadcastHub, ControlError, ControlRequest};
use crate::config::ControlConfig;

/// State shared across handlers.
#[derive(Clone)]
struct AppState {
    hub: Arc<BroadcastHub>,
    cancel: CancellationToken,
}

/// Local WebSocket endpoint for control clients.
#[derive(Debug)]
pub struct ControlServer {
    listener: TcpListener,
    hub: Arc<BroadcastHub>,
}

impl ControlServer {
    /// Bind the configured address.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::BindError`] if the address is unavailable.
    pub async fn bind(config: &ControlConfig, hub: Arc<BroadcastHub>) -> Result<Self, ControlError> {
        let address = config.address();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|source| ControlError::BindError { address, source })?;
        Ok(Self { listener, hub })
    }

    /// Address actually bound (useful with port 0).
    ///
    /// # Errors
    ///
    /// Returns an error if the socket address cannot be read.
    pub fn local_addr(&self) -> Result<SocketAddr, ControlError> {
        Ok(self.listener.local_addr()?)
    }

    /// Build the axum router.
    pub fn build_router(hub: Arc<BroadcastHub>, cancel: CancellationToken) -> Router {
        Router::new()
            .route("/", get(ws_upgrade))
            .with_state(AppState { hub, cancel })
            .layer(TraceLayer::new_for_http())
    }

    /// Serve until the cancellation token fires.
    ///
    /// Open client connections are closed on cancellation as well.
    ///
    /// # Errors
    ///
    /// Returns an error if serving fails.
    pub async fn run(self, cancel: CancellationToken) -> Result<(), ControlError> {
        let addr = self.local_addr()?;
        let app = Self::build_router(self.hub, cancel.clone());

        tracing::info!(address = %addr, "Control server listening");

        axum::serve(self.listener, app)
            .with_graceful_shutdown(async move {
                cancel.cancelled().await;
                tracing::info!("Control server shutting down");
            })
            .await?;
        Ok(())
    }
}

async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| serve_client(socket, state.hub, state.cancel))
}

/// Pump one client: outbound notifications to the socket, inbound tokens to
/// the hub.
async fn serve_client(socket: WebSocket, hub: Arc<BroadcastHub>, cancel: CancellationToken) {
    let (id, mut outbound) = hub.register().await;
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                if let Err(e) = sink.send(Message::Close(None)).await {
                    tracing::debug!(client = %id, error = %e, "Control client socket already closed");
                }
                break;
            }

            Some(notification) = outbound.recv() => {
                if let Err(e) = sink.send(Message::Text(notification.as_str().into())).await {
                    tracing::warn!(
                        client = %id,
                        notification = %notification,
                        error = %e,
                        "Failed to write notification to control client"
                    );
                }
            }

            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => match ControlRequest::parse(&text) {
                    Some(request) => {
                        if let Err(e) = hub.handle_request(request).await {
                            tracing::warn!(
                                client = %id,
                                request = request.as_str(),
                                error = %e,
                                "Control request failed"
                            );
                        }
                    }
                    None => {
                        tracing::debug!(client = %id, message = %text, "Ignoring unknown control message");
                    }
                },
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(client = %id, error = %e, "Control client socket error");
                    break;
                }
            }
        }
    }

    hub.unregister(id).await;
}
