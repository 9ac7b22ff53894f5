//! Gemini Live transport over `tokio-tungstenite`.
//!
//! Architecture:
//! - `connect()` performs the WebSocket handshake and sends the setup frame.
//! - A writer task owns the sink; `send_audio()`/`close()` push frames to it
//!   through an mpsc channel.
//! - A reader task parses server frames into `LiveEvent`s and forwards them
//!   in arrival order. It ends with `Closed` or `Failed`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::audio::AudioChunk;
use crate::error::SessionError;

use super::protocol::{RealtimeInputMessage, ServerMessage, SetupMessage};
use super::{LiveConnection, LiveEvent, LiveSession, LiveTransport, SessionSetup};

/// Outbound frame buffer.
const OUTBOUND_CAPACITY: usize = 64;
/// Inbound event buffer.
const EVENT_CAPACITY: usize = 256;
/// How long the writer gets to flush the close frame.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Opens Gemini Live sessions at a WebSocket URL.
pub struct GeminiLiveTransport {
    url: String,
}

impl GeminiLiveTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl LiveTransport for GeminiLiveTransport {
    async fn connect(
        &self,
        api_key: &SecretString,
        setup: &SessionSetup,
    ) -> Result<LiveSession, SessionError> {
        let separator = if self.url.contains('?') { '&' } else { '?' };
        let url = format!("{}{separator}key={}", self.url, api_key.expose_secret());

        let (ws, _response) =
            tokio_tungstenite::connect_async(url)
                .await
                .map_err(|e| SessionError::ConnectFailed {
                    endpoint: self.url.clone(),
                    reason: e.to_string(),
                })?;
        let (mut sink, stream) = ws.split();

        let frame = serde_json::to_string(&SetupMessage::new(setup))?;
        sink.send(Message::Text(frame.into()))
            .await
            .map_err(|e| SessionError::ConnectFailed {
                endpoint: self.url.clone(),
                reason: e.to_string(),
            })?;

        info!(kind = %setup.kind, model = %setup.model, "Live session setup sent");

        let (outbound_tx, mut outbound_rx) = mpsc::channel::<Message>(OUTBOUND_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel::<LiveEvent>(EVENT_CAPACITY);

        let writer = tokio::spawn(async move {
            while let Some(msg) = outbound_rx.recv().await {
                let closing = matches!(msg, Message::Close(_));
                if let Err(e) = sink.send(msg).await {
                    debug!(error = %e, "Live session write failed");
                    break;
                }
                if closing {
                    break;
                }
            }
        });

        let reader = tokio::spawn(read_events(stream, event_tx));

        Ok(LiveSession {
            connection: Arc::new(GeminiConnection {
                outbound: outbound_tx,
                tasks: Mutex::new(Some((reader, writer))),
            }),
            events: event_rx,
        })
    }
}

async fn read_events<S>(mut stream: S, events: mpsc::Sender<LiveEvent>)
where
    S: futures::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    while let Some(frame) = stream.next().await {
        let parsed = match frame {
            Ok(Message::Text(text)) => serde_json::from_str::<ServerMessage>(text.as_str()),
            Ok(Message::Binary(bytes)) => serde_json::from_slice::<ServerMessage>(&bytes),
            Ok(Message::Close(reason)) => {
                debug!(?reason, "Live session closed by server");
                let _ = events.send(LiveEvent::Closed).await;
                return;
            }
            Ok(_) => continue,
            Err(e) => {
                let _ = events.send(LiveEvent::Failed(e.to_string())).await;
                return;
            }
        };

        let message = match parsed {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "Ignoring unparseable live frame");
                continue;
            }
        };

        for event in message.into_events() {
            if events.send(event).await.is_err() {
                // Receiver gone: the session was torn down.
                return;
            }
        }
    }
    let _ = events.send(LiveEvent::Closed).await;
}

struct GeminiConnection {
    outbound: mpsc::Sender<Message>,
    tasks: Mutex<Option<(JoinHandle<()>, JoinHandle<()>)>>,
}

#[async_trait]
impl LiveConnection for GeminiConnection {
    async fn send_audio(&self, chunk: AudioChunk) -> Result<(), SessionError> {
        let frame = serde_json::to_string(&RealtimeInputMessage::from(chunk))?;
        self.outbound
            .send(Message::Text(frame.into()))
            .await
            .map_err(|_| SessionError::SendFailed("session closed".to_string()))
    }

    async fn close(&self) -> Result<(), SessionError> {
        let Some((reader, writer)) = self.tasks.lock().await.take() else {
            return Err(SessionError::Closed);
        };
        reader.abort();

        let writer_abort = writer.abort_handle();
        if let Err(e) = self.outbound.try_send(Message::Close(None)) {
            writer_abort.abort();
            return Err(SessionError::SendFailed(format!("close frame not queued: {e}")));
        }
        if tokio::time::timeout(CLOSE_GRACE, writer).await.is_err() {
            writer_abort.abort();
            return Err(SessionError::SendFailed(
                "close frame not flushed in time".to_string(),
            ));
        }
        Ok(())
    }
}

impl Drop for GeminiConnection {
    fn drop(&mut self) {
        if let Some((reader, writer)) = self.tasks.get_mut().take() {
            reader.abort();
            writer.abort();
        }
    }
}
