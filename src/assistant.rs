//! The assistant: single owner of the check-up state.
//!
//! User actions (`start_onboarding`, `capture`, `analyze`, ...) and session
//! events are both processed through `&mut self`, so nothing mutates the
//! state in parallel. Session events and timer continuations arrive on the
//! [`Mailbox`] and are fed back in through [`Assistant::dispatch`].

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::analysis::ImageAnalyzer;
use crate::config::AssistantConfig;
use crate::error::{ARTIFACT_MESSAGE, AssistantError, Error, SessionError};
use crate::export::ReportExporter;
use crate::live::{ConversationKind, FunctionCall, LiveEvent, LiveTransport};
use crate::media::{AudioOutput, Camera, CameraStream, Microphone, mirror_jpeg};
use crate::model::{
    CapturedImage, CapturedImages, MIN_CAPTURES_FOR_ANALYSIS, PendingDetail, SkinReport,
    UserProfile,
};
use crate::phase::Phase;
use crate::prompts::{self, SEND_REPORT_TOOL, START_SCAN_TOOL};
use crate::session::{Dispatch, SessionManager};
use crate::slots::{SlotInterpreter, TurnOutcome};

/// Snapshot broadcast capacity.
const UPDATE_CAPACITY: usize = 64;

/// Everything the assistant talks to.
pub struct AssistantDeps {
    pub transport: Arc<dyn LiveTransport>,
    pub analyzer: Arc<dyn ImageAnalyzer>,
    pub exporter: Arc<dyn ReportExporter>,
    pub microphone: Arc<dyn Microphone>,
    pub camera: Arc<dyn Camera>,
    pub speaker: Arc<dyn AudioOutput>,
}

/// Receiving end of the assistant's work queue.
pub struct Mailbox {
    rx: mpsc::UnboundedReceiver<Dispatch>,
}

impl Mailbox {
    /// Wait for the next item. Hand it to [`Assistant::dispatch`].
    pub async fn recv(&mut self) -> Option<Dispatch> {
        self.rx.recv().await
    }

}

/// What a front end shows.
#[derive(Debug, Clone, Serialize)]
pub struct AssistantSnapshot {
    pub phase: Phase,
    pub error: Option<String>,
    pub spoken_text: String,
    pub pending: Option<PendingDetail>,
    pub profile: UserProfile,
    pub muted: bool,
    pub speaking: bool,
    pub captures: usize,
    pub report: Option<SkinReport>,
    pub last_export: Option<PathBuf>,
}

pub struct Assistant {
    config: AssistantConfig,
    sessions: SessionManager,
    analyzer: Arc<dyn ImageAnalyzer>,
    exporter: Arc<dyn ReportExporter>,
    camera: Arc<dyn Camera>,
    camera_stream: Option<Box<dyn CameraStream>>,
    mailbox: mpsc::UnboundedSender<Dispatch>,
    updates: broadcast::Sender<AssistantSnapshot>,

    phase: Phase,
    error: Option<String>,
    profile: UserProfile,
    slots: SlotInterpreter,
    spoken_text: String,
    images: CapturedImages,
    report: Option<SkinReport>,
    last_export: Option<PathBuf>,
}

impl Assistant {
    pub fn new(config: AssistantConfig, deps: AssistantDeps) -> (Self, Mailbox) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (updates, _) = broadcast::channel(UPDATE_CAPACITY);
        let assistant = Self {
            config,
            sessions: SessionManager::new(deps.transport, deps.microphone, deps.speaker),
            analyzer: deps.analyzer,
            exporter: deps.exporter,
            camera: deps.camera,
            camera_stream: None,
            mailbox: tx,
            updates,
            phase: Phase::Idle,
            error: None,
            profile: UserProfile::default(),
            slots: SlotInterpreter::new(),
            spoken_text: String::new(),
            images: CapturedImages::default(),
            report: None,
            last_export: None,
        };
        (assistant, Mailbox { rx })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    pub fn report(&self) -> Option<&SkinReport> {
        self.report.as_ref()
    }

    /// Subscribe to snapshots. One is published after every change.
    pub fn subscribe(&self) -> broadcast::Receiver<AssistantSnapshot> {
        self.updates.subscribe()
    }

    pub fn snapshot(&self) -> AssistantSnapshot {
        AssistantSnapshot {
            phase: self.phase,
            error: self.error.clone(),
            spoken_text: self.spoken_text.clone(),
            pending: self.slots.pending().cloned(),
            profile: self.profile.clone(),
            muted: self.sessions.is_muted(),
            speaking: self.sessions.is_speaking(),
            captures: self.images.len(),
            report: self.report.clone(),
            last_export: self.last_export.clone(),
        }
    }

    fn publish(&self) {
        // No subscribers is fine.
        let _ = self.updates.send(self.snapshot());
    }

    /// Apply a phase change if the table allows it.
    fn transition(&mut self, to: Phase) -> bool {
        if !self.phase.can_transition_to(to) {
            let err = AssistantError::InvalidTransition {
                from: self.phase,
                to,
            };
            warn!(error = %err, "Rejected phase transition");
            return false;
        }
        info!(from = %self.phase, to = %to, "Phase transition");
        self.phase = to;
        if !to.has_report() {
            self.report = None;
        }
        self.publish();
        true
    }

    /// Tear everything down and land in `Denied` or `Error`.
    async fn fail(&mut self, err: Error) {
        warn!(phase = %self.phase, error = %err, "Check-up failed");
        self.sessions.close().await;
        self.release_camera();
        self.error = Some(err.user_message());
        let target = if err.is_permission() {
            Phase::Denied
        } else {
            Phase::Error
        };
        self.transition(target);
    }

    fn release_camera(&mut self) {
        if let Some(mut stream) = self.camera_stream.take() {
            stream.stop();
            debug!("Camera released");
        }
    }

    fn reset_display(&mut self) {
        self.spoken_text.clear();
        self.slots.reset();
    }

    // ── User actions ────────────────────────────────────────────────────

    /// Start (or restart) the voice onboarding.
    ///
    /// Clears the profile, photos and report. Problems are reported through
    /// the phase and error message, never returned.
    pub async fn start_onboarding(&mut self) {
        self.sessions.close().await;
        self.release_camera();
        self.profile = UserProfile::default();
        self.images.clear();
        self.report = None;
        self.last_export = None;
        self.error = None;
        self.reset_display();

        let api_key = match self.config.credential.resolve() {
            Ok(key) => key,
            Err(e) => return self.fail(e.into()).await,
        };
        let microphone = match self.sessions.acquire_microphone().await {
            Ok(mic) => mic,
            Err(e) => return self.fail(e.into()).await,
        };

        self.transition(Phase::Connecting);

        let setup = prompts::session_setup(
            ConversationKind::Onboarding,
            &self.config.live_model,
            &self.config.voice,
        );
        if let Err(e) = self
            .sessions
            .connect(microphone, &api_key, &setup, self.mailbox.clone())
            .await
        {
            self.fail(e).await;
        }
    }

    /// Talk about a finished report.
    pub async fn start_post_report(&mut self) -> Result<(), AssistantError> {
        if self.phase != Phase::ReportReady {
            return Err(AssistantError::Unavailable {
                action: "discuss the report",
                phase: self.phase,
            });
        }
        self.error = None;
        self.reset_display();

        let api_key = match self.config.credential.resolve() {
            Ok(key) => key,
            Err(e) => {
                self.fail(e.into()).await;
                return Ok(());
            }
        };
        let microphone = match self.sessions.acquire_microphone().await {
            Ok(mic) => mic,
            Err(e) => {
                self.fail(e.into()).await;
                return Ok(());
            }
        };

        self.transition(Phase::PostReportConversation);

        let setup = prompts::session_setup(
            ConversationKind::PostReport,
            &self.config.live_model,
            &self.config.voice,
        );
        if let Err(e) = self
            .sessions
            .connect(microphone, &api_key, &setup, self.mailbox.clone())
            .await
        {
            self.fail(e).await;
        }
        Ok(())
    }

    /// Grab one photo. Returns `false` once the maximum is held.
    pub async fn capture(&mut self) -> Result<bool, AssistantError> {
        if self.phase != Phase::Scanning {
            return Err(AssistantError::Unavailable {
                action: "capture a photo",
                phase: self.phase,
            });
        }
        if self.images.is_full() {
            return Ok(false);
        }
        let Some(stream) = self.camera_stream.as_mut() else {
            return Ok(false);
        };

        let mirror = self.config.mirror_captures;
        let frame = stream.capture_jpeg().await.and_then(|jpeg| {
            if mirror { mirror_jpeg(&jpeg) } else { Ok(jpeg) }
        });
        match frame {
            Ok(jpeg) => {
                let added = self.images.push(CapturedImage::from_jpeg(&jpeg));
                info!(count = self.images.len(), "Photo captured");
                self.publish();
                Ok(added)
            }
            Err(e) => {
                self.fail(e.into()).await;
                Ok(false)
            }
        }
    }

    /// Send the photos for analysis and build the report.
    pub async fn analyze(&mut self) -> Result<(), AssistantError> {
        if self.phase != Phase::Scanning {
            return Err(AssistantError::Unavailable {
                action: "analyze",
                phase: self.phase,
            });
        }
        if !self.images.ready_for_analysis() {
            return Err(AssistantError::NotEnoughCaptures {
                have: self.images.len(),
                need: MIN_CAPTURES_FOR_ANALYSIS,
            });
        }

        self.transition(Phase::Analyzing);
        self.release_camera();

        let api_key = match self.config.credential.resolve() {
            Ok(key) => key,
            Err(e) => {
                self.fail(e.into()).await;
                return Ok(());
            }
        };

        let outcome = self
            .analyzer
            .analyze(&api_key, self.images.as_slice(), &self.profile.name)
            .await;

        match outcome {
            Ok(result) => {
                let report = SkinReport::new(&self.profile, result, Local::now());
                info!(
                    issues = report.issues.len(),
                    recommendations = report.recommendations.len(),
                    "Skin report ready"
                );
                self.report = Some(report);
                self.error = None;
                self.transition(Phase::ReportReady);
            }
            Err(e) => self.fail(e.into()).await,
        }
        Ok(())
    }

    /// Export the report to a file.
    ///
    /// Export failure keeps the report on screen with an error message.
    pub async fn download_report(&mut self) -> Result<Option<PathBuf>, AssistantError> {
        if !matches!(
            self.phase,
            Phase::ReportReady | Phase::PostReportConversation
        ) {
            return Err(AssistantError::Unavailable {
                action: "download the report",
                phase: self.phase,
            });
        }
        self.sessions.close().await;
        Ok(self.export_report().await)
    }

    async fn export_report(&mut self) -> Option<PathBuf> {
        let report = self.report.clone()?;
        if !self.transition(Phase::GeneratingArtifact) {
            return None;
        }

        let exported = match self.exporter.export(&report).await {
            Ok(path) => {
                self.error = None;
                self.last_export = Some(path.clone());
                Some(path)
            }
            Err(e) => {
                warn!(error = %e, "Report export failed");
                self.error = Some(ARTIFACT_MESSAGE.to_string());
                None
            }
        };
        self.transition(Phase::ReportReady);
        exported
    }

    /// Flip the microphone mute. Returns the new state.
    pub fn toggle_mute(&mut self) -> bool {
        let muted = self.sessions.toggle_mute();
        info!(muted, "Microphone mute toggled");
        self.publish();
        muted
    }

    /// Release every resource.
    pub async fn shutdown(&mut self) {
        self.sessions.close().await;
        self.release_camera();
    }

    // ── Mailbox ─────────────────────────────────────────────────────────

    /// Process one item from the [`Mailbox`].
    pub async fn dispatch(&mut self, item: Dispatch) {
        match item {
            Dispatch::Session { session_id, event } => {
                if !self.sessions.is_current(session_id) {
                    debug!(session_id = %session_id, "Ignoring event from stale session");
                    return;
                }
                self.handle_event(session_id, event).await;
            }
            Dispatch::ClearDisplay { pending_revision } => {
                let mut changed = !self.spoken_text.is_empty();
                self.spoken_text.clear();
                changed |= self.slots.clear_pending_if_unchanged(pending_revision);
                if changed {
                    self.publish();
                }
            }
            Dispatch::PlaybackEnded {
                session_id,
                fragment,
            } => {
                if self.sessions.fragment_ended(session_id, fragment) == Some(true) {
                    self.publish();
                }
            }
        }
    }

    async fn handle_event(&mut self, session_id: Uuid, event: LiveEvent) {
        let Some(kind) = self.sessions.kind() else {
            return;
        };

        match event {
            LiveEvent::Opened => {
                self.sessions.mark_opened(session_id);
                if kind == ConversationKind::Onboarding {
                    self.transition(Phase::GatheringDetails);
                }
            }
            LiveEvent::OutputTranscript(text) => {
                self.spoken_text.push_str(&text);
                if kind == ConversationKind::Onboarding {
                    self.slots.observe_output(&text);
                }
                self.publish();
            }
            LiveEvent::InputTranscript(text) => {
                if kind == ConversationKind::Onboarding
                    && self.slots.observe_input(&text).is_some()
                {
                    self.publish();
                }
            }
            LiveEvent::ToolCall(calls) => self.handle_tool_calls(kind, calls).await,
            LiveEvent::TurnComplete => {
                if kind == ConversationKind::Onboarding {
                    match self.slots.complete_turn(&mut self.profile) {
                        TurnOutcome::Committed { slot, value } => {
                            info!(slot = %slot, "Detail confirmed");
                            debug!(slot = %slot, value = %value, "Committed value");
                        }
                        TurnOutcome::Asked(slot) => debug!(slot = %slot, "Assistant asked for detail"),
                        TurnOutcome::Unchanged => {}
                    }
                }
                self.schedule_display_clear();
                self.publish();
            }
            LiveEvent::Audio(fragment) => {
                if let Some(scheduled) = self.sessions.play(session_id, &fragment) {
                    self.post_after(
                        Duration::from_secs_f64(scheduled.remaining()),
                        Dispatch::PlaybackEnded {
                            session_id,
                            fragment: scheduled.id,
                        },
                    );
                    self.publish();
                }
            }
            LiveEvent::Failed(reason) => {
                self.fail(SessionError::Protocol(reason).into()).await;
            }
            LiveEvent::Closed => {
                info!(session_id = %session_id, kind = %kind, "Session closed by remote");
                self.sessions.close().await;
                match self.phase {
                    Phase::PostReportConversation => {
                        self.transition(Phase::ReportReady);
                    }
                    Phase::Connecting | Phase::GatheringDetails => {
                        self.fail(SessionError::Closed.into()).await;
                    }
                    _ => self.publish(),
                }
            }
        }
    }

    async fn handle_tool_calls(&mut self, kind: ConversationKind, calls: Vec<FunctionCall>) {
        for call in calls {
            match (kind, call.name.as_str()) {
                (ConversationKind::Onboarding, START_SCAN_TOOL) => {
                    info!(call_id = ?call.id, "Starting facial scan");
                    self.sessions.close().await;
                    self.start_scanning().await;
                    return;
                }
                (ConversationKind::PostReport, SEND_REPORT_TOOL) => {
                    info!(call_id = ?call.id, "Sending report");
                    self.sessions.close().await;
                    self.export_report().await;
                    return;
                }
                (kind, name) => {
                    warn!(kind = %kind, tool = name, "Ignoring unexpected tool call");
                }
            }
        }
    }

    async fn start_scanning(&mut self) {
        if !self.transition(Phase::Scanning) {
            return;
        }
        match self.camera.open().await {
            Ok(stream) => {
                self.camera_stream = Some(stream);
                info!("Camera opened for scanning");
                self.publish();
            }
            Err(e) => self.fail(e.into()).await,
        }
    }

    fn schedule_display_clear(&self) {
        self.post_after(
            self.config.display_clear_delay,
            Dispatch::ClearDisplay {
                pending_revision: self.slots.pending_revision(),
            },
        );
    }

    /// Post `item` back to the mailbox after `delay`.
    fn post_after(&self, delay: Duration, item: Dispatch) {
        let tx = self.mailbox.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(item);
        });
    }
}
