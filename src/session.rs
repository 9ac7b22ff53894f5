//! Conversation session manager: owns the one live session and every
//! resource attached to it.
//!
//! Lifecycle:
//! - `acquire_microphone()` asks for the microphone (where permission fails).
//! - `connect()` opens the remote session and the output device, and starts
//!   forwarding remote events into the assistant's mailbox tagged with the
//!   session id.
//! - `mark_opened()` starts pumping microphone frames once the endpoint has
//!   accepted the setup.
//! - `close()` tears everything down. It is idempotent and never fails.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use secrecy::SecretString;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::audio::{
    AudioChunk, AudioFragment, INPUT_SAMPLE_RATE, OUTPUT_SAMPLE_RATE, PlaybackScheduler,
    ScheduledFragment,
};
use crate::error::{self, MediaError};
use crate::live::{ConversationKind, LiveConnection, LiveEvent, LiveTransport, SessionSetup};
use crate::media::{AudioInput, AudioOutput, Microphone, PlaybackDevice};

/// Work delivered to the assistant's single dispatch loop.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// An event from the session with this id.
    Session { session_id: Uuid, event: LiveEvent },
    /// The cosmetic display reset after a turn. The pending detail is only
    /// cleared if it is still at `pending_revision`.
    ClearDisplay { pending_revision: u64 },
    /// A scheduled speech fragment has finished playing.
    PlaybackEnded { session_id: Uuid, fragment: u64 },
}

/// Upper bound on each teardown step that waits on something remote.
const TEARDOWN_TIMEOUT: Duration = Duration::from_secs(2);

struct MicPump {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<Box<dyn AudioInput>>,
}

struct ActiveSession {
    id: Uuid,
    kind: ConversationKind,
    connection: Arc<dyn LiveConnection>,
    /// Held here until the endpoint opens, then moved into the pump.
    microphone: Option<Box<dyn AudioInput>>,
    pump: Option<MicPump>,
    forwarder: JoinHandle<()>,
    output: Box<dyn PlaybackDevice>,
    scheduler: PlaybackScheduler,
}

impl Drop for ActiveSession {
    fn drop(&mut self) {
        self.forwarder.abort();
        if let Some(pump) = self.pump.take() {
            pump.handle.abort();
        }
    }
}

/// Owns at most one live session.
pub struct SessionManager {
    transport: Arc<dyn LiveTransport>,
    microphone: Arc<dyn Microphone>,
    speaker: Arc<dyn AudioOutput>,
    muted: Arc<AtomicBool>,
    active: Option<ActiveSession>,
}

impl SessionManager {
    pub fn new(
        transport: Arc<dyn LiveTransport>,
        microphone: Arc<dyn Microphone>,
        speaker: Arc<dyn AudioOutput>,
    ) -> Self {
        Self {
            transport,
            microphone,
            speaker,
            muted: Arc::new(AtomicBool::new(false)),
            active: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.active.is_some()
    }

    /// Id of the live session, if any.
    pub fn session_id(&self) -> Option<Uuid> {
        self.active.as_ref().map(|s| s.id)
    }

    /// Kind of the live session, if any.
    pub fn kind(&self) -> Option<ConversationKind> {
        self.active.as_ref().map(|s| s.kind)
    }

    /// Whether `session_id` is the live session.
    pub fn is_current(&self, session_id: Uuid) -> bool {
        self.session_id() == Some(session_id)
    }

    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::Relaxed)
    }

    /// Flip the mute flag. Muted microphone frames are dropped, not sent.
    pub fn toggle_mute(&self) -> bool {
        !self.muted.fetch_xor(true, Ordering::Relaxed)
    }

    /// Ask for the microphone.
    pub async fn acquire_microphone(&self) -> Result<Box<dyn AudioInput>, MediaError> {
        self.microphone.open(INPUT_SAMPLE_RATE).await
    }

    /// Open the remote session, closing any existing one first.
    ///
    /// On failure the microphone is released and nothing stays open.
    pub async fn connect(
        &mut self,
        mut microphone: Box<dyn AudioInput>,
        api_key: &SecretString,
        setup: &SessionSetup,
        mailbox: mpsc::UnboundedSender<Dispatch>,
    ) -> error::Result<Uuid> {
        self.close().await;

        let mut output = match self.speaker.open(OUTPUT_SAMPLE_RATE) {
            Ok(output) => output,
            Err(e) => {
                microphone.stop();
                return Err(e.into());
            }
        };

        let session = match self.transport.connect(api_key, setup).await {
            Ok(session) => session,
            Err(e) => {
                microphone.stop();
                if let Err(close_err) = output.close() {
                    warn!(error = %close_err, "Failed to close output device");
                }
                return Err(e.into());
            }
        };

        let id = Uuid::new_v4();
        let mut events = session.events;
        let forwarder = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if mailbox
                    .send(Dispatch::Session {
                        session_id: id,
                        event,
                    })
                    .is_err()
                {
                    break;
                }
            }
        });

        info!(session_id = %id, kind = %setup.kind, "Conversation session connected");

        self.active = Some(ActiveSession {
            id,
            kind: setup.kind,
            connection: session.connection,
            microphone: Some(microphone),
            pump: None,
            forwarder,
            output,
            scheduler: PlaybackScheduler::new(),
        });
        Ok(id)
    }

    /// Start streaming microphone audio into the live session.
    pub fn mark_opened(&mut self, session_id: Uuid) {
        let muted = Arc::clone(&self.muted);
        let Some(active) = self.active.as_mut().filter(|s| s.id == session_id) else {
            return;
        };
        let Some(input) = active.microphone.take() else {
            return;
        };

        let (stop_tx, stop_rx) = oneshot::channel();
        let handle = tokio::spawn(pump_microphone(
            input,
            Arc::clone(&active.connection),
            muted,
            stop_rx,
            session_id,
        ));
        active.pump = Some(MicPump {
            stop: stop_tx,
            handle,
        });
        debug!(session_id = %session_id, "Microphone streaming started");
    }

    /// Schedule a speech fragment for gapless playback.
    ///
    /// Returns `None` if the session is gone or the device rejected it.
    pub fn play(&mut self, session_id: Uuid, fragment: &AudioFragment) -> Option<ScheduledFragment> {
        let active = self.active.as_mut().filter(|s| s.id == session_id)?;
        let now = active.output.current_time();
        let scheduled = active.scheduler.schedule(now, fragment.duration());
        if let Err(e) = active.output.play_at(&fragment.samples, scheduled.start) {
            warn!(session_id = %session_id, error = %e, "Failed to queue speech fragment");
            active.scheduler.finish(scheduled.id);
            return None;
        }
        Some(scheduled)
    }

    /// Record that a fragment finished. Returns `Some(true)` when the
    /// assistant has stopped speaking, `None` for a stale session.
    pub fn fragment_ended(&mut self, session_id: Uuid, fragment: u64) -> Option<bool> {
        let active = self.active.as_mut().filter(|s| s.id == session_id)?;
        Some(active.scheduler.finish(fragment))
    }

    /// Whether speech is still scheduled on the live session.
    pub fn is_speaking(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|s| s.scheduler.is_speaking())
    }

    /// Tear down the live session. Safe to call when nothing is open.
    ///
    /// Failures are logged, never returned: release always proceeds.
    pub async fn close(&mut self) {
        let Some(mut active) = self.active.take() else {
            return;
        };

        active.forwarder.abort();

        match timeout(TEARDOWN_TIMEOUT, active.connection.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(session_id = %active.id, error = %e, "Failed to close live session");
            }
            Err(_) => warn!(session_id = %active.id, "Timed out closing live session"),
        }

        if let Some(pump) = active.pump.take() {
            let _ = pump.stop.send(());
            let abort = pump.handle.abort_handle();
            match timeout(TEARDOWN_TIMEOUT, pump.handle).await {
                Ok(Ok(mut input)) => input.stop(),
                Ok(Err(e)) => {
                    warn!(session_id = %active.id, error = %e, "Microphone pump ended abnormally");
                }
                Err(_) => {
                    abort.abort();
                    warn!(session_id = %active.id, "Timed out stopping microphone pump");
                }
            }
        }
        if let Some(mut input) = active.microphone.take() {
            input.stop();
        }

        if let Err(e) = active.output.close() {
            warn!(session_id = %active.id, error = %e, "Failed to close output device");
        }
        active.scheduler.reset();

        info!(session_id = %active.id, kind = %active.kind, "Conversation session closed");
    }
}

async fn pump_microphone(
    mut input: Box<dyn AudioInput>,
    connection: Arc<dyn LiveConnection>,
    muted: Arc<AtomicBool>,
    mut stop: oneshot::Receiver<()>,
    session_id: Uuid,
) -> Box<dyn AudioInput> {
    loop {
        tokio::select! {
            _ = &mut stop => break,
            frame = input.next_frame() => {
                let Some(samples) = frame else {
                    debug!(session_id = %session_id, "Microphone stream ended");
                    break;
                };
                if muted.load(Ordering::Relaxed) {
                    continue;
                }
                let chunk = AudioChunk::from_samples(&samples, INPUT_SAMPLE_RATE);
                tokio::select! {
                    _ = &mut stop => break,
                    sent = connection.send_audio(chunk) => {
                        if let Err(e) = sent {
                            debug!(session_id = %session_id, error = %e, "Dropping microphone frame");
                        }
                    }
                }
            }
        }
    }
    input
}
