//! Phase controller: the single state that decides what the user sees.

use serde::{Deserialize, Serialize};

/// Top-level phase of a check-up.
///
/// Happy path: Idle → Connecting → GatheringDetails → Scanning → Analyzing →
/// ReportReady, optionally followed by PostReportConversation and
/// GeneratingArtifact, both of which return to ReportReady.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Connecting,
    GatheringDetails,
    Denied,
    Scanning,
    Analyzing,
    GeneratingArtifact,
    ReportReady,
    Error,
    PostReportConversation,
}

impl Phase {
    /// Check if a transition from `self` to `target` is valid.
    ///
    /// Any phase may move to `Denied` or `Error`, and any phase may restart
    /// onboarding by moving to `Connecting`.
    pub fn can_transition_to(&self, target: Phase) -> bool {
        use Phase::*;
        matches!(
            (self, target),
            (_, Connecting)
                | (_, Denied)
                | (_, Error)
                | (Connecting, GatheringDetails)
                | (GatheringDetails, Scanning)
                | (Scanning, Analyzing)
                | (Analyzing, ReportReady)
                | (ReportReady, PostReportConversation)
                | (ReportReady, GeneratingArtifact)
                | (PostReportConversation, ReportReady)
                | (PostReportConversation, GeneratingArtifact)
                | (GeneratingArtifact, ReportReady)
        )
    }

    /// Whether a report is on screen in this phase.
    pub fn has_report(&self) -> bool {
        matches!(
            self,
            Self::ReportReady | Self::PostReportConversation | Self::GeneratingArtifact
        )
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::GatheringDetails => "gathering_details",
            Self::Denied => "denied",
            Self::Scanning => "scanning",
            Self::Analyzing => "analyzing",
            Self::GeneratingArtifact => "generating_artifact",
            Self::ReportReady => "report_ready",
            Self::Error => "error",
            Self::PostReportConversation => "post_report_conversation",
        };
        write!(f, "{s}")
    }
}
