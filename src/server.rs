use std::sync::Arc;

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::net::{lookup_host, TcpListener, TcpStream};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::protocol::Message;
use tracing::{error, info, warn};

use crate::pipeline::Pipeline;

// -----------------------------------------------------------------------------
// Wire types
// -----------------------------------------------------------------------------

/// Inbound classify request. A frame that does not parse as this JSON shape
/// is treated as a bare text message.
#[derive(Debug, Deserialize)]
struct ClassifyRequest {
    text: String,
}

// -----------------------------------------------------------------------------
// Server
// -----------------------------------------------------------------------------

/// Websocket front door for a trained pipeline.
///
/// Every connection shares one immutable pipeline behind an `Arc`; predictions
/// hold no mutable state, so concurrent clients never contend on a lock.
pub struct ClassifyServer {
    address: String,
    pipeline: Arc<Pipeline>,
}

impl ClassifyServer {
    pub fn new(address: &str, pipeline: Arc<Pipeline>) -> Self {
        Self {
            address: address.to_string(),
            pipeline,
        }
    }

    /// Start listening and accepting client connections
    pub async fn run(&self) -> Result<()> {
        info!("Resolving address: {}", self.address);
        let mut addrs = lookup_host(&self.address)
            .await
            .context("lookup_host failed")?;
        let addr = addrs
            .next()
            .ok_or_else(|| anyhow::anyhow!("No addr found for host"))?;
        let listener = TcpListener::bind(&addr).await.context("bind failed")?;
        info!("Listening on {}", addr);

        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    info!("Client connected: {}", peer);
                    let pipeline = self.pipeline.clone();
                    tokio::spawn(async move {
                        handle_connection(stream, pipeline).await;
                    });
                }
                Err(e) => {
                    error!("Accept failed: {}", e);
                }
            }
        }
    }
}

/// Handle a single TCP connection (websocket handshake done here).
async fn handle_connection(stream: TcpStream, pipeline: Arc<Pipeline>) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            error!("WebSocket accept error: {}", e);
            return;
        }
    };
    let (mut write, mut read) = ws_stream.split();

    while let Some(msg) = read.next().await {
        match msg {
            Ok(Message::Text(txt)) => {
                let reply = respond(&pipeline, txt.as_str());
                if write.send(Message::Text(reply.into())).await.is_err() {
                    // client gone
                    break;
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {} // ignore binary/ping/pong
            Err(e) => {
                warn!("Read loop error: {}", e);
                break;
            }
        }
    }
    info!("Connection handler finished");
}

/// Classify one inbound frame and render the JSON reply.
fn respond(pipeline: &Pipeline, raw: &str) -> String {
    let text = match serde_json::from_str::<ClassifyRequest>(raw) {
        Ok(request) => request.text,
        Err(_) => raw.to_string(),
    };

    match pipeline.predict(&text) {
        Ok(prediction) => serde_json::to_string(&prediction)
            .unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }).to_string()),
        Err(e) => {
            warn!("Classification failed: {}", e);
            serde_json::json!({ "error": e.to_string() }).to_string()
        }
    }
}
