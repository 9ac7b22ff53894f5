//! Realtime conversation endpoint abstraction.
//!
//! A `LiveTransport` opens a `LiveSession`: a handle for sending microphone
//! audio plus an ordered stream of `LiveEvent`s from the remote model.

pub mod gemini;
pub mod protocol;

pub use gemini::GeminiLiveTransport;

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::audio::{AudioChunk, AudioFragment};
use crate::error::SessionError;

/// Which conversation a session is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationKind {
    Onboarding,
    PostReport,
}

impl std::fmt::Display for ConversationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Onboarding => write!(f, "onboarding"),
            Self::PostReport => write!(f, "post_report"),
        }
    }
}

/// A function the remote model may call. Always parameterless.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
}

/// Everything needed to open a session.
#[derive(Debug, Clone)]
pub struct SessionSetup {
    pub kind: ConversationKind,
    pub model: String,
    pub voice: String,
    pub system_instruction: String,
    pub tool: ToolDeclaration,
}

/// A tool invocation from the remote model.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub id: Option<String>,
    pub name: String,
}

/// Inbound session events, in the order the endpoint emitted them.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveEvent {
    /// The endpoint accepted the setup; audio may flow.
    Opened,
    /// Fragment of what the assistant is saying.
    OutputTranscript(String),
    /// Fragment of what the user said.
    InputTranscript(String),
    /// The model decided to call one or more tools.
    ToolCall(Vec<FunctionCall>),
    /// The assistant finished its turn.
    TurnComplete,
    /// Synthesized speech.
    Audio(AudioFragment),
    /// The session failed.
    Failed(String),
    /// The endpoint closed the session.
    Closed,
}

/// Outbound half of an open session.
#[async_trait]
pub trait LiveConnection: Send + Sync {
    /// Stream one block of microphone audio.
    async fn send_audio(&self, chunk: AudioChunk) -> Result<(), SessionError>;

    /// Close the session. Closing twice returns `SessionError::Closed`.
    async fn close(&self) -> Result<(), SessionError>;
}

/// An open session: the connection plus its event stream.
pub struct LiveSession {
    pub connection: Arc<dyn LiveConnection>,
    pub events: mpsc::Receiver<LiveEvent>,
}

/// Opens realtime sessions.
#[async_trait]
pub trait LiveTransport: Send + Sync {
    async fn connect(
        &self,
        api_key: &SecretString,
        setup: &SessionSetup,
    ) -> Result<LiveSession, SessionError>;
}
