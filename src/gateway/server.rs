//! WebSocket gateway for realtime subscribers
//!
//! Accepts connections, optionally authenticates them with a signed token
//! from the `token` query parameter, and forwards user events and public
//! broadcasts as JSON frames. Connections without a valid token still get
//! the public market stream. A background task pushes the first page of
//! the market snapshot to everyone on a fixed cadence.

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast::error::RecvError;
use tokio::time::interval;
use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};
use tokio_tungstenite::tungstenite::http::Uri;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, info, warn};

use super::auth::verify_token;
use crate::common::errors::{ExchangeError, Result};
use crate::notify::{ChannelPublisher, ConnectedAck, Publisher, UserEvent};
use crate::service::ExchangeService;

/// Page size for the periodic markets broadcast
const BROADCAST_PER_PAGE: u32 = 120;

type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;

/// WebSocket gateway over the exchange service
pub struct Gateway {
    /// Service facade backing requests and broadcasts
    service: Arc<ExchangeService>,
    /// Publisher whose lanes this gateway drains
    publisher: Arc<ChannelPublisher>,
    /// Shared secret for access token verification
    token_secret: String,
    /// Cadence of the public markets broadcast
    broadcast_interval: Duration,
}

impl Gateway {
    pub fn new(
        service: Arc<ExchangeService>,
        publisher: Arc<ChannelPublisher>,
        token_secret: String,
        broadcast_interval: Duration,
    ) -> Self {
        Self {
            service,
            publisher,
            token_secret,
            broadcast_interval,
        }
    }

    /// Accept connections until the listener fails
    pub async fn serve(self: Arc<Self>, listener: TcpListener) -> Result<()> {
        if let Ok(addr) = listener.local_addr() {
            info!("Gateway listening on {}", addr);
        }

        let broadcaster = self.clone();
        tokio::spawn(async move { broadcaster.broadcast_markets().await });

        loop {
            let (stream, peer) = listener
                .accept()
                .await
                .map_err(|e| ExchangeError::Internal(format!("accept failed: {}", e)))?;

            let gateway = self.clone();
            tokio::spawn(async move {
                if let Err(err) = gateway.handle_connection(stream).await {
                    debug!("Connection from {} closed: {}", peer, err);
                }
            });
        }
    }

    async fn broadcast_markets(&self) {
        let mut ticker = interval(self.broadcast_interval);
        loop {
            ticker.tick().await;
            match self.service.markets(Some(1), Some(BROADCAST_PER_PAGE)).await {
                Ok(entries) => {
                    if let Err(err) = self.publisher.broadcast(UserEvent::Markets(entries)).await {
                        warn!("Markets broadcast failed: {}", err);
                    }
                }
                Err(err) => {
                    warn!("Markets refresh for broadcast failed: {}", err);
                }
            }
        }
    }

    async fn handle_connection(&self, stream: TcpStream) -> Result<()> {
        // Capture the upgrade URI so the token query parameter survives the handshake
        let mut request_uri: Option<Uri> = None;
        let ws = tokio_tungstenite::accept_hdr_async(stream, |req: &Request, resp: Response| {
            request_uri = Some(req.uri().clone());
            Ok(resp)
        })
        .await?;

        let user_id = request_uri
            .as_ref()
            .and_then(token_from_uri)
            .and_then(|token| match verify_token(&self.token_secret, &token) {
                Ok(user_id) => Some(user_id),
                Err(err) => {
                    // invalid tokens downgrade to the public stream
                    debug!("Token rejected: {}", err);
                    None
                }
            });

        let mut user_rx = match &user_id {
            Some(id) => Some(self.publisher.subscribe_user(id).await),
            None => None,
        };
        let mut public_rx = self.publisher.subscribe_public();

        debug!("Gateway connection established (user: {:?})", user_id);

        let (mut write, mut read) = ws.split();
        send_event(&mut write, &UserEvent::Connected(ConnectedAck { ok: true })).await?;

        loop {
            tokio::select! {
                event = async {
                    match user_rx.as_mut() {
                        Some(rx) => rx.recv().await,
                        None => std::future::pending().await,
                    }
                } => {
                    match event {
                        Ok(event) => send_event(&mut write, &event).await?,
                        Err(RecvError::Lagged(skipped)) => {
                            warn!("Subscriber lagged, {} events dropped", skipped);
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
                event = public_rx.recv() => {
                    match event {
                        Ok(event) => send_event(&mut write, &event).await?,
                        Err(RecvError::Lagged(skipped)) => {
                            warn!("Subscriber lagged, {} events dropped", skipped);
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
                incoming = read.next() => {
                    match incoming {
                        Some(Ok(Message::Text(text))) => {
                            if text.trim().eq_ignore_ascii_case("health") {
                                let frame = serde_json::to_string(&self.service.health())?;
                                write.send(Message::Text(frame)).await?;
                            }
                        }
                        Some(Ok(Message::Ping(payload))) => {
                            write.send(Message::Pong(payload)).await?;
                        }
                        Some(Ok(Message::Close(frame))) => {
                            debug!("Gateway connection closed: {:?}", frame);
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(err)) => return Err(err.into()),
                        None => break,
                    }
                }
            }
        }

        Ok(())
    }
}

/// Extract the `token` query parameter from the upgrade URI
fn token_from_uri(uri: &Uri) -> Option<String> {
    let url = url::Url::parse(&format!("ws://gateway{}", uri)).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "token")
        .map(|(_, value)| value.into_owned())
}

async fn send_event(write: &mut WsSink, event: &UserEvent) -> Result<()> {
    let frame = serde_json::to_string(event)?;
    write.send(Message::Text(frame)).await?;
    Ok(())
}
