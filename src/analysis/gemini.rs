//! `generateContent` client for the Gemini image model.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::error::AnalysisError;
use crate::model::{AnalysisResult, CapturedImage};
use crate::prompts::{ANALYSIS_INSTRUCTION, analysis_context, report_schema};

use super::ImageAnalyzer;

const IMAGE_MIME_TYPE: &str = "image/jpeg";

/// Calls `POST {api_base}/v1beta/models/{model}:generateContent`.
pub struct GeminiAnalyzer {
    client: reqwest::Client,
    api_base: String,
    model: String,
}

impl GeminiAnalyzer {
    pub fn new(api_base: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base, self.model
        )
    }

    fn request_body(images: &[CapturedImage], profile_name: &str) -> Value {
        let mut parts = vec![json!({ "text": analysis_context(profile_name) })];
        parts.extend(images.iter().map(|image| {
            json!({
                "inlineData": { "mimeType": IMAGE_MIME_TYPE, "data": image.as_base64() }
            })
        }));

        json!({
            "systemInstruction": { "parts": [{ "text": ANALYSIS_INSTRUCTION }] },
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": report_schema()
            }
        })
    }

    fn invalid(&self, reason: impl Into<String>) -> AnalysisError {
        AnalysisError::InvalidResponse {
            model: self.model.clone(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate.
    fn text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

#[async_trait]
impl ImageAnalyzer for GeminiAnalyzer {
    async fn analyze(
        &self,
        api_key: &SecretString,
        images: &[CapturedImage],
        profile_name: &str,
    ) -> Result<AnalysisResult, AnalysisError> {
        if images.is_empty() {
            return Err(AnalysisError::EmptyInput);
        }

        info!(model = %self.model, images = images.len(), "Requesting skin analysis");

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key.expose_secret())
            .json(&Self::request_body(images, profile_name))
            .send()
            .await
            .map_err(|e| AnalysisError::RequestFailed {
                model: self.model.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::RequestFailed {
                model: self.model.clone(),
                reason: format!("HTTP {status}: {body}"),
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| self.invalid(e.to_string()))?;
        let text = parsed
            .text()
            .ok_or_else(|| self.invalid("response contained no text"))?;
        debug!(chars = text.len(), "Analysis response received");

        let result: AnalysisResult = serde_json::from_str(text.trim())?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_base_and_model() {
        let analyzer = GeminiAnalyzer::new("http://localhost:9000/", "gemini-2.5-flash");
        assert_eq!(
            analyzer.endpoint(),
            "http://localhost:9000/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn body_carries_context_then_every_image() {
        let images = vec![
            CapturedImage::from_base64("AAA"),
            CapturedImage::from_base64("BBB"),
            CapturedImage::from_base64("CCC"),
        ];
        let body = GeminiAnalyzer::request_body(&images, "Asha Rao");

        let parts = body["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0]["text"], "This analysis is for user Asha Rao.");
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(parts[3]["inlineData"]["data"], "CCC");
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(
            body["generationConfig"]["responseSchema"]["required"],
            json!(["summary", "issues", "recommendations"])
        );
        assert_eq!(
            body["systemInstruction"]["parts"][0]["text"],
            ANALYSIS_INSTRUCTION
        );
    }

    #[test]
    fn response_text_joins_first_candidate_parts() {
        let raw = json!({
            "candidates": [
                { "content": { "parts": [{ "text": "{\"summary\":" }, { "text": "\"ok\"}" }] } },
                { "content": { "parts": [{ "text": "ignored" }] } }
            ]
        });
        let parsed: GenerateResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(parsed.text().unwrap(), "{\"summary\":\"ok\"}");
    }

    #[test]
    fn empty_candidates_have_no_text() {
        let parsed: GenerateResponse = serde_json::from_value(json!({})).unwrap();
        assert!(parsed.text().is_none());
    }

    #[tokio::test]
    async fn empty_input_fails_without_request() {
        let analyzer = GeminiAnalyzer::new("http://127.0.0.1:1", "m");
        let err = analyzer
            .analyze(&SecretString::from("k"), &[], "Asha")
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::EmptyInput));
    }
}
