//! User profile, captured photos and skin report models.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Maximum number of photos held for one check-up.
pub const MAX_CAPTURES: usize = 5;
/// Minimum number of photos before analysis is allowed.
pub const MIN_CAPTURES_FOR_ANALYSIS: usize = 3;

/// Details collected during onboarding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub phone: String,
}

impl UserProfile {
    /// Store a confirmed value under `slot`.
    pub fn set(&mut self, slot: Slot, value: impl Into<String>) {
        match slot {
            Slot::Name => self.name = value.into(),
            Slot::Phone => self.phone = value.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.phone.is_empty()
    }
}

/// A profile field captured by voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Name,
    Phone,
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Name => write!(f, "name"),
            Self::Phone => write!(f, "phone"),
        }
    }
}

/// A spoken value shown on screen for the user to confirm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingDetail {
    pub slot: Slot,
    pub value: String,
}

/// One base64-encoded JPEG still frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapturedImage(String);

impl CapturedImage {
    /// Wrap an already base64-encoded JPEG.
    pub fn from_base64(data: impl Into<String>) -> Self {
        Self(data.into())
    }

    /// Encode raw JPEG bytes.
    pub fn from_jpeg(bytes: &[u8]) -> Self {
        use base64::Engine as _;
        Self(base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    pub fn as_base64(&self) -> &str {
        &self.0
    }
}

/// Ordered, append-only set of photos, bounded at [`MAX_CAPTURES`].
#[derive(Debug, Clone, Default)]
pub struct CapturedImages {
    images: Vec<CapturedImage>,
}

impl CapturedImages {
    /// Append a photo. Returns `false` (and drops the photo) once full.
    pub fn push(&mut self, image: CapturedImage) -> bool {
        if self.is_full() {
            return false;
        }
        self.images.push(image);
        true
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.images.len() >= MAX_CAPTURES
    }

    pub fn ready_for_analysis(&self) -> bool {
        self.images.len() >= MIN_CAPTURES_FOR_ANALYSIS
    }

    pub fn as_slice(&self) -> &[CapturedImage] {
        &self.images
    }

    pub fn clear(&mut self) {
        self.images.clear();
    }
}

/// A detected skin condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkinIssue {
    pub issue: String,
    pub description: String,
}

/// A recommended treatment from the clinic's catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub treatment: String,
    pub description: String,
}

/// Structured output of the image model. Every field is required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub summary: String,
    pub issues: Vec<SkinIssue>,
    pub recommendations: Vec<Recommendation>,
}

/// The finished report shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkinReport {
    pub name: String,
    pub phone: String,
    pub date: String,
    pub summary: String,
    pub issues: Vec<SkinIssue>,
    pub recommendations: Vec<Recommendation>,
}

impl SkinReport {
    /// Merge the model output with the locally held profile.
    pub fn new(profile: &UserProfile, result: AnalysisResult, at: DateTime<Local>) -> Self {
        Self {
            name: profile.name.clone(),
            phone: profile.phone.clone(),
            date: at.format("%d/%m/%Y, %H:%M:%S").to_string(),
            summary: result.summary,
            issues: result.issues,
            recommendations: result.recommendations,
        }
    }
}
