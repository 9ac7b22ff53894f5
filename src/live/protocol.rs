//! JSON frames of the Gemini Live `BidiGenerateContent` WebSocket protocol.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::warn;

use crate::audio::pcm::rate_from_mime;
use crate::audio::{AudioChunk, AudioFragment, OUTPUT_SAMPLE_RATE};

use super::{FunctionCall, LiveEvent, SessionSetup};

// ── Client → server ─────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct SetupMessage {
    pub setup: Setup,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Setup {
    pub model: String,
    pub generation_config: GenerationConfig,
    pub system_instruction: Content,
    pub tools: Vec<Tool>,
    pub input_audio_transcription: Value,
    pub output_audio_transcription: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<String>,
    pub speech_config: Value,
}

#[derive(Debug, Serialize)]
pub struct Content {
    pub parts: Vec<TextPart>,
}

#[derive(Debug, Serialize)]
pub struct TextPart {
    pub text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Serialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl SetupMessage {
    pub fn new(setup: &SessionSetup) -> Self {
        let model = if setup.model.starts_with("models/") {
            setup.model.clone()
        } else {
            format!("models/{}", setup.model)
        };
        Self {
            setup: Setup {
                model,
                generation_config: GenerationConfig {
                    response_modalities: vec!["AUDIO".to_string()],
                    speech_config: json!({
                        "voiceConfig": { "prebuiltVoiceConfig": { "voiceName": setup.voice } }
                    }),
                },
                system_instruction: Content {
                    parts: vec![TextPart {
                        text: setup.system_instruction.clone(),
                    }],
                },
                tools: vec![Tool {
                    function_declarations: vec![FunctionDeclaration {
                        name: setup.tool.name.clone(),
                        description: setup.tool.description.clone(),
                        parameters: json!({ "type": "OBJECT", "properties": {}, "required": [] }),
                    }],
                }],
                input_audio_transcription: json!({}),
                output_audio_transcription: json!({}),
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInputMessage {
    pub realtime_input: RealtimeInput,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInput {
    pub media_chunks: Vec<Blob>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub mime_type: String,
    pub data: String,
}

impl From<AudioChunk> for RealtimeInputMessage {
    fn from(chunk: AudioChunk) -> Self {
        Self {
            realtime_input: RealtimeInput {
                media_chunks: vec![Blob {
                    mime_type: chunk.mime_type,
                    data: chunk.data,
                }],
            },
        }
    }
}

// ── Server → client ─────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    #[serde(default)]
    pub setup_complete: Option<Value>,
    #[serde(default)]
    pub server_content: Option<ServerContent>,
    #[serde(default)]
    pub tool_call: Option<ToolCall>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerContent {
    #[serde(default)]
    pub model_turn: Option<ModelTurn>,
    #[serde(default)]
    pub turn_complete: bool,
    #[serde(default)]
    pub input_transcription: Option<Transcription>,
    #[serde(default)]
    pub output_transcription: Option<Transcription>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ModelTurn {
    #[serde(default)]
    pub parts: Vec<ModelPart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelPart {
    #[serde(default)]
    pub inline_data: Option<Blob>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Transcription {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCall {
    #[serde(default)]
    pub function_calls: Vec<WireFunctionCall>,
}

#[derive(Debug, Deserialize)]
pub struct WireFunctionCall {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
}

impl ServerMessage {
    /// Flatten one server frame into events.
    ///
    /// Order within a frame: setup, transcripts, tool calls, turn complete,
    /// audio.
    pub fn into_events(self) -> Vec<LiveEvent> {
        let mut events = Vec::new();

        if self.setup_complete.is_some() {
            events.push(LiveEvent::Opened);
        }

        let content = self.server_content.unwrap_or_default();

        if let Some(text) = content.output_transcription.and_then(|t| t.text) {
            events.push(LiveEvent::OutputTranscript(text));
        }
        if let Some(text) = content.input_transcription.and_then(|t| t.text) {
            events.push(LiveEvent::InputTranscript(text));
        }

        let calls: Vec<FunctionCall> = self
            .tool_call
            .map(|call| call.function_calls)
            .unwrap_or_default()
            .into_iter()
            .map(|fc| FunctionCall {
                id: fc.id,
                name: fc.name,
            })
            .collect();
        if !calls.is_empty() {
            events.push(LiveEvent::ToolCall(calls));
        }

        if content.turn_complete {
            events.push(LiveEvent::TurnComplete);
        }

        let parts = content.model_turn.map(|t| t.parts).unwrap_or_default();
        for blob in parts.into_iter().filter_map(|p| p.inline_data) {
            let rate = rate_from_mime(&blob.mime_type).unwrap_or(OUTPUT_SAMPLE_RATE);
            match AudioFragment::from_base64(&blob.data, rate) {
                Ok(fragment) => events.push(LiveEvent::Audio(fragment)),
                Err(e) => warn!(error = %e, "Dropping undecodable audio fragment"),
            }
        }

        events
    }
}
