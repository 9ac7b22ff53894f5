//! Image analysis: photos plus context in, structured skin findings out.

pub mod gemini;

pub use gemini::GeminiAnalyzer;

use async_trait::async_trait;
use secrecy::SecretString;

use crate::error::AnalysisError;
use crate::model::{AnalysisResult, CapturedImage};

/// A multimodal model that turns face photos into an [`AnalysisResult`].
#[async_trait]
pub trait ImageAnalyzer: Send + Sync {
    /// Analyse `images` for the user called `profile_name`.
    ///
    /// Implementations make exactly one request and do not retry.
    async fn analyze(
        &self,
        api_key: &SecretString,
        images: &[CapturedImage],
        profile_name: &str,
    ) -> Result<AnalysisResult, AnalysisError>;
}
