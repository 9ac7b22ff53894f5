//! Report export: turns a finished `SkinReport` into a downloadable file.

use std::fmt::Write as _;
use std::path::PathBuf;

use async_trait::async_trait;
use tracing::info;

use crate::error::ArtifactError;
use crate::model::SkinReport;

/// Produces a shareable file from a report.
#[async_trait]
pub trait ReportExporter: Send + Sync {
    /// Write the report and return where it landed.
    async fn export(&self, report: &SkinReport) -> Result<PathBuf, ArtifactError>;
}

/// Deterministic file name: `Medzeal-AI-Report-{name}.md`, every whitespace
/// character in the name replaced by `_`, `user` when the name is empty.
pub fn artifact_file_name(name: &str) -> String {
    let stem: String = if name.is_empty() {
        "user".to_string()
    } else {
        name.chars()
            .map(|c| if c.is_whitespace() { '_' } else { c })
            .collect()
    };
    format!("Medzeal-AI-Report-{stem}.md")
}

/// Writes reports as Markdown documents into a directory.
pub struct MarkdownExporter {
    dir: PathBuf,
}

impl MarkdownExporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

/// Render the report body.
pub fn render_markdown(report: &SkinReport) -> Result<String, ArtifactError> {
    let mut out = String::new();
    render_into(&mut out, report).map_err(|e| ArtifactError::Render(e.to_string()))?;
    Ok(out)
}

fn render_into(out: &mut String, report: &SkinReport) -> std::fmt::Result {
    writeln!(out, "# Medzeal AI Skin Report")?;
    writeln!(out)?;
    writeln!(out, "- **Name:** {}", report.name)?;
    writeln!(out, "- **Mobile:** {}", report.phone)?;
    writeln!(out, "- **Date:** {}", report.date)?;
    writeln!(out)?;
    writeln!(out, "## Summary")?;
    writeln!(out)?;
    writeln!(out, "{}", report.summary)?;
    writeln!(out)?;

    writeln!(out, "## Detected Issues")?;
    writeln!(out)?;
    if report.issues.is_empty() {
        writeln!(out, "No specific skin issues were detected.")?;
    }
    for issue in &report.issues {
        writeln!(out, "- **{}**: {}", issue.issue, issue.description)?;
    }
    writeln!(out)?;

    writeln!(out, "## Recommended Treatments")?;
    writeln!(out)?;
    for rec in &report.recommendations {
        writeln!(out, "- **{}**: {}", rec.treatment, rec.description)?;
    }
    Ok(())
}

#[async_trait]
impl ReportExporter for MarkdownExporter {
    async fn export(&self, report: &SkinReport) -> Result<PathBuf, ArtifactError> {
        let body = render_markdown(report)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.dir.join(artifact_file_name(&report.name));
        tokio::fs::write(&path, body).await?;

        info!(path = %path.display(), "Report exported");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Recommendation, SkinIssue};

    fn report(name: &str) -> SkinReport {
        SkinReport {
            name: name.into(),
            phone: "9876543210".into(),
            date: "04/03/2025, 09:05:07".into(),
            summary: "Mild congestion on the forehead.".into(),
            issues: vec![SkinIssue {
                issue: "Blackheads".into(),
                description: "Clogged pores across the T-zone.".into(),
            }],
            recommendations: vec![Recommendation {
                treatment: "HydraFacial".into(),
                description: "Deep cleans and hydrates.".into(),
            }],
        }
    }

    #[test]
    fn file_name_replaces_each_whitespace_character() {
        assert_eq!(artifact_file_name("Asha Rao"), "Medzeal-AI-Report-Asha_Rao.md");
        assert_eq!(artifact_file_name("Asha  Rao"), "Medzeal-AI-Report-Asha__Rao.md");
        assert_eq!(artifact_file_name(" Asha"), "Medzeal-AI-Report-_Asha.md");
        assert_eq!(
            artifact_file_name("Asha\tRao "),
            "Medzeal-AI-Report-Asha_Rao_.md"
        );
    }

    #[test]
    fn empty_name_falls_back_to_user() {
        assert_eq!(artifact_file_name(""), "Medzeal-AI-Report-user.md");
        // Only an empty name falls back; whitespace is kept as underscores.
        assert_eq!(artifact_file_name("  "), "Medzeal-AI-Report-__.md");
    }

    #[test]
    fn markdown_lists_every_section() {
        let md = render_markdown(&report("Asha Rao")).unwrap();
        assert!(md.contains("- **Name:** Asha Rao"));
        assert!(md.contains("- **Mobile:** 9876543210"));
        assert!(md.contains("**Blackheads**"));
        assert!(md.contains("**HydraFacial**"));
    }

    #[test]
    fn healthy_report_says_so() {
        let mut r = report("Asha Rao");
        r.issues.clear();
        let md = render_markdown(&r).unwrap();
        assert!(md.contains("No specific skin issues were detected."));
    }

    #[tokio::test]
    async fn export_writes_into_directory() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = MarkdownExporter::new(dir.path().join("reports"));
        let path = exporter.export(&report("Asha Rao")).await.unwrap();

        assert_eq!(path, dir.path().join("reports/Medzeal-AI-Report-Asha_Rao.md"));
        let written = std::fs::read_to_string(path).unwrap();
        assert!(written.starts_with("# Medzeal AI Skin Report"));
    }

    #[tokio::test]
    async fn export_into_a_file_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"x").unwrap();

        let exporter = MarkdownExporter::new(&blocker);
        let err = exporter.export(&report("Asha")).await.unwrap_err();
        assert!(matches!(err, ArtifactError::Io(_)));
    }
}
