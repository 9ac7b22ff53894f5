//! Error types for the Medzeal assistant.

use std::fmt;

use crate::phase::Phase;

/// User-facing message shown when the credential is missing.
pub const MISSING_KEY_MESSAGE: &str =
    "The API key is missing. Please ensure it is configured correctly.";
/// User-facing message shown when the microphone is refused.
pub const MICROPHONE_DENIED_MESSAGE: &str =
    "Could not access microphone. Please check permissions and refresh.";
/// User-facing message shown when the camera is refused.
pub const CAMERA_DENIED_MESSAGE: &str =
    "Could not access camera. Please check permissions and refresh.";
/// User-facing message shown when the conversation endpoint fails.
pub const CONNECTION_MESSAGE: &str =
    "Connection error. Please check your internet connection and try again.";
/// User-facing message shown when image analysis fails.
pub const ANALYSIS_MESSAGE: &str = "Sorry, the analysis could not be completed. Please try again.";
/// User-facing message shown when the report file cannot be produced.
pub const ARTIFACT_MESSAGE: &str = "Could not generate the report file. Please try again.";

/// Top-level error type for the assistant.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("Artifact error: {0}")]
    Artifact(#[from] ArtifactError),
}

impl Error {
    /// Short message suitable for showing to the person using the assistant.
    pub fn user_message(&self) -> String {
        match self {
            Self::Config(_) => MISSING_KEY_MESSAGE.to_string(),
            Self::Media(MediaError::PermissionDenied { device }) => match device {
                MediaDevice::Camera => CAMERA_DENIED_MESSAGE.to_string(),
                _ => MICROPHONE_DENIED_MESSAGE.to_string(),
            },
            Self::Media(MediaError::Unavailable { device, .. }) => match device {
                MediaDevice::Camera => CAMERA_DENIED_MESSAGE.to_string(),
                MediaDevice::Microphone => MICROPHONE_DENIED_MESSAGE.to_string(),
                MediaDevice::Speaker => CONNECTION_MESSAGE.to_string(),
            },
            Self::Media(MediaError::Io(_)) => CONNECTION_MESSAGE.to_string(),
            Self::Session(_) => CONNECTION_MESSAGE.to_string(),
            Self::Analysis(_) => ANALYSIS_MESSAGE.to_string(),
            Self::Artifact(_) => ARTIFACT_MESSAGE.to_string(),
        }
    }

    /// Whether this error should leave the assistant in the `Denied` phase
    /// rather than `Error`.
    pub fn is_permission(&self) -> bool {
        match self {
            Self::Media(MediaError::PermissionDenied { .. }) => true,
            Self::Media(MediaError::Unavailable { device, .. }) => *device != MediaDevice::Speaker,
            _ => false,
        }
    }
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),
}

/// A local capture or playback device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaDevice {
    Microphone,
    Camera,
    Speaker,
}

impl fmt::Display for MediaDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Microphone => write!(f, "microphone"),
            Self::Camera => write!(f, "camera"),
            Self::Speaker => write!(f, "speaker"),
        }
    }
}

/// Microphone, camera and speaker errors.
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("Permission denied for {device}")]
    PermissionDenied { device: MediaDevice },

    #[error("{device} unavailable: {reason}")]
    Unavailable { device: MediaDevice, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Realtime conversation session errors.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Failed to connect to {endpoint}: {reason}")]
    ConnectFailed { endpoint: String, reason: String },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Failed to send on session: {0}")]
    SendFailed(String),

    #[error("Session already closed")]
    Closed,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Image analysis errors.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("No images supplied for analysis")]
    EmptyInput,

    #[error("Analysis request to {model} failed: {reason}")]
    RequestFailed { model: String, reason: String },

    #[error("Invalid response from {model}: {reason}")]
    InvalidResponse { model: String, reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Report export errors.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("Failed to render report: {0}")]
    Render(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Rejected user actions.
#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    #[error("Cannot transition from {from} to {to}")]
    InvalidTransition { from: Phase, to: Phase },

    #[error("At least {need} photos are needed for analysis, have {have}")]
    NotEnoughCaptures { have: usize, need: usize },

    #[error("Cannot {action} while {phase}")]
    Unavailable { action: &'static str, phase: Phase },
}

/// Result type alias for the assistant.
pub type Result<T> = std::result::Result<T, Error>;
