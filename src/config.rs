//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default realtime conversation model.
pub const DEFAULT_LIVE_MODEL: &str = "gemini-2.5-flash-native-audio-preview-09-2025";
/// Default image analysis model.
pub const DEFAULT_ANALYSIS_MODEL: &str = "gemini-2.5-flash";
/// Default prebuilt voice.
pub const DEFAULT_VOICE: &str = "Zephyr";
/// Default realtime endpoint.
pub const DEFAULT_LIVE_URL: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";
/// Default REST endpoint base.
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Where the API credential comes from.
///
/// The environment is consulted every time the key is needed, so a missing
/// key surfaces as an error on the action that needed it rather than at
/// startup.
#[derive(Debug, Clone)]
pub enum Credential {
    /// Read the first variable that is set.
    Env(Vec<String>),
    /// A fixed key (or deliberately none).
    Static(Option<SecretString>),
}

impl Default for Credential {
    fn default() -> Self {
        Self::Env(vec!["GEMINI_API_KEY".to_string(), "API_KEY".to_string()])
    }
}

impl Credential {
    /// Resolve the key, failing with `MissingEnvVar` if none is available.
    pub fn resolve(&self) -> Result<SecretString, ConfigError> {
        match self {
            Self::Env(vars) => vars
                .iter()
                .find_map(|var| std::env::var(var).ok().filter(|v| !v.trim().is_empty()))
                .map(SecretString::from)
                .ok_or_else(|| ConfigError::MissingEnvVar(vars.join(" or "))),
            Self::Static(Some(key)) => Ok(key.clone()),
            Self::Static(None) => Err(ConfigError::MissingEnvVar("api key".to_string())),
        }
    }
}

/// Assistant configuration.
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    /// Credential for both remote endpoints.
    pub credential: Credential,
    /// Realtime conversation model.
    pub live_model: String,
    /// Image analysis model.
    pub analysis_model: String,
    /// Prebuilt voice used by the realtime model.
    pub voice: String,
    /// WebSocket URL of the realtime endpoint.
    pub live_url: String,
    /// Base URL of the REST endpoint.
    pub api_base: String,
    /// Directory report files are written into.
    pub report_dir: PathBuf,
    /// How long spoken text and pending details stay on screen after a turn.
    pub display_clear_delay: Duration,
    /// Flip captured photos to match the mirrored camera preview.
    pub mirror_captures: bool,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            credential: Credential::default(),
            live_model: DEFAULT_LIVE_MODEL.to_string(),
            analysis_model: DEFAULT_ANALYSIS_MODEL.to_string(),
            voice: DEFAULT_VOICE.to_string(),
            live_url: DEFAULT_LIVE_URL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            report_dir: PathBuf::from("./reports"),
            display_clear_delay: Duration::from_millis(2000),
            mirror_captures: true,
        }
    }
}

impl AssistantConfig {
    /// Load overrides from `MEDZEAL_*` environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let display_clear_ms: u64 = std::env::var("MEDZEAL_DISPLAY_CLEAR_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(2000);
        let mirror_captures = std::env::var("MEDZEAL_MIRROR_CAPTURES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.mirror_captures);

        Self {
            credential: defaults.credential,
            live_model: std::env::var("MEDZEAL_LIVE_MODEL").unwrap_or(defaults.live_model),
            analysis_model: std::env::var("MEDZEAL_ANALYSIS_MODEL")
                .unwrap_or(defaults.analysis_model),
            voice: std::env::var("MEDZEAL_VOICE").unwrap_or(defaults.voice),
            live_url: std::env::var("MEDZEAL_LIVE_URL").unwrap_or(defaults.live_url),
            api_base: std::env::var("MEDZEAL_API_BASE").unwrap_or(defaults.api_base),
            report_dir: std::env::var("MEDZEAL_REPORT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.report_dir),
            display_clear_delay: Duration::from_millis(display_clear_ms),
            mirror_captures,
        }
    }
}
