use std::path::PathBuf;
use std::sync::Arc;

use anyhow::anyhow;
use tokio::io::{AsyncBufReadExt, BufReader};

use medzeal_assist::analysis::GeminiAnalyzer;
use medzeal_assist::assistant::{Assistant, AssistantDeps, AssistantSnapshot};
use medzeal_assist::config::AssistantConfig;
use medzeal_assist::export::MarkdownExporter;
use medzeal_assist::live::GeminiLiveTransport;
use medzeal_assist::media::{DirectoryCamera, WavMicrophone, WavRecorder};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install rustls crypto provider"))?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AssistantConfig::from_env();

    let mic_wav = PathBuf::from(
        std::env::var("MEDZEAL_MIC_WAV").unwrap_or_else(|_| "./input.wav".to_string()),
    );
    let camera_dir = PathBuf::from(
        std::env::var("MEDZEAL_CAMERA_DIR").unwrap_or_else(|_| "./camera".to_string()),
    );
    let speech_dir = PathBuf::from(
        std::env::var("MEDZEAL_SPEECH_DIR").unwrap_or_else(|_| "./speech".to_string()),
    );

    eprintln!("🩺 Medzeal Assist v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Live model: {}", config.live_model);
    eprintln!("   Analysis model: {}", config.analysis_model);
    eprintln!("   Microphone: {}", mic_wav.display());
    eprintln!("   Camera: {}", camera_dir.display());
    eprintln!("   Speech out: {}", speech_dir.display());
    eprintln!("   Reports: {}", config.report_dir.display());
    eprintln!("   Commands: start, capture, analyze, discuss, download, mute, status, quit\n");

    let deps = AssistantDeps {
        transport: Arc::new(GeminiLiveTransport::new(config.live_url.clone())),
        analyzer: Arc::new(GeminiAnalyzer::new(
            config.api_base.clone(),
            config.analysis_model.clone(),
        )),
        exporter: Arc::new(MarkdownExporter::new(config.report_dir.clone())),
        microphone: Arc::new(WavMicrophone::new(mic_wav)),
        camera: Arc::new(DirectoryCamera::new(camera_dir)),
        speaker: Arc::new(WavRecorder::new(speech_dir)),
    };

    let (mut assistant, mut mailbox) = Assistant::new(config, deps);
    let mut updates = assistant.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut last_shown = String::new();

    loop {
        tokio::select! {
            Some(item) = mailbox.recv() => assistant.dispatch(item).await,
            Ok(snapshot) = updates.recv() => show_changes(&snapshot, &mut last_shown),
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !run_command(&mut assistant, line.trim()).await {
                    break;
                }
            }
        }
    }

    assistant.shutdown().await;
    eprintln!("Goodbye.");
    Ok(())
}

/// Execute one command line. Returns `false` to quit.
async fn run_command(assistant: &mut Assistant, command: &str) -> bool {
    let outcome = match command {
        "" => Ok(()),
        "start" => {
            assistant.start_onboarding().await;
            Ok(())
        }
        "capture" => assistant.capture().await.map(|added| {
            if !added {
                eprintln!("No photo added.");
            }
        }),
        "analyze" => assistant.analyze().await,
        "discuss" => assistant.start_post_report().await,
        "download" => assistant.download_report().await.map(|path| {
            if let Some(path) = path {
                eprintln!("Report saved to {}", path.display());
            }
        }),
        "mute" => {
            let muted = assistant.toggle_mute();
            eprintln!("Microphone {}", if muted { "muted" } else { "live" });
            Ok(())
        }
        "status" => {
            print_status(&assistant.snapshot());
            Ok(())
        }
        "quit" | "exit" | "/quit" => return false,
        other => {
            eprintln!("Unknown command: {other}");
            Ok(())
        }
    };
    if let Err(e) = outcome {
        eprintln!("{e}");
    }
    true
}

fn show_changes(snapshot: &AssistantSnapshot, last_shown: &mut String) {
    let line = match (&snapshot.pending, snapshot.spoken_text.is_empty()) {
        (Some(pending), _) => format!("[{}] {}: {}", snapshot.phase, pending.slot, pending.value),
        (None, false) => format!("[{}] Medzeal AI: {}", snapshot.phase, snapshot.spoken_text),
        (None, true) => format!("[{}]", snapshot.phase),
    };
    if *last_shown != line {
        eprintln!("{line}");
        if let Some(error) = &snapshot.error {
            eprintln!("   ⚠ {error}");
        }
        *last_shown = line;
    }
}

fn print_status(snapshot: &AssistantSnapshot) {
    eprintln!("Phase: {}", snapshot.phase);
    eprintln!("Name: {}", snapshot.profile.name);
    eprintln!("Mobile: {}", snapshot.profile.phone);
    eprintln!("Photos: {}", snapshot.captures);
    eprintln!("Muted: {}  Speaking: {}", snapshot.muted, snapshot.speaking);
    if let Some(error) = &snapshot.error {
        eprintln!("Error: {error}");
    }
    if let Some(report) = &snapshot.report {
        eprintln!("Report ({}): {}", report.date, report.summary);
        for issue in &report.issues {
            eprintln!("  - {}: {}", issue.issue, issue.description);
        }
        for rec in &report.recommendations {
            eprintln!("  + {}: {}", rec.treatment, rec.description);
        }
    }
}
