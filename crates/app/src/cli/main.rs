//! Earshot CLI Application
//!
//! Loads a scene, builds the listener's resolver, runs one resolution tick
//! and reports what every speaker sounds like.

use anyhow::Context;
use clap::Parser;
use earshot_core::domain::{
    AudioOutput, OverrideId, PlayerId, SceneConfig, TickSummary, VoiceDecision, VoiceParameters,
    VoiceResolver,
};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "earshot")]
#[command(about = "Resolve competing voice overrides for a listener", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Scene file (defaults to the built-in demo scene)
    #[arg(short, long)]
    scene: Option<PathBuf>,

    /// Resolve for this listener instead of the scene's local player
    #[arg(short, long)]
    listener: Option<i32>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Write the built-in scene to this path (or the default location) and exit
    #[arg(long, value_name = "PATH")]
    write_default: Option<Option<PathBuf>>,
}

/// One line of the tick report
#[derive(Debug, Serialize)]
struct SpeakerReport {
    speaker: PlayerId,
    decision: VoiceDecision,
    #[serde(skip_serializing_if = "Option::is_none")]
    override_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<VoiceParameters>,
}

#[derive(Debug, Serialize)]
struct TickReport {
    listener: PlayerId,
    #[serde(skip_serializing_if = "Option::is_none")]
    listener_override: Option<String>,
    summary: TickSummary,
    speakers: Vec<SpeakerReport>,
}

/// Audio output that turns each decision into a report line
struct ReportOutput<'a> {
    resolver: &'a VoiceResolver,
    speakers: Vec<SpeakerReport>,
}

impl ReportOutput<'_> {
    fn override_name(&self, id: Option<OverrideId>) -> Option<String> {
        id.and_then(|id| self.resolver.override_record(id))
            .map(|record| record.name.clone())
    }
}

impl AudioOutput for ReportOutput<'_> {
    fn apply_parameters(
        &mut self,
        listener: PlayerId,
        speaker: PlayerId,
        decision: VoiceDecision,
        parameters: &VoiceParameters,
    ) {
        tracing::debug!(
            listener = %listener,
            speaker = %speaker,
            ?decision,
            "Applying voice parameters"
        );
        let override_name = self.override_name(decision.source_override());
        self.speakers.push(SpeakerReport {
            speaker,
            decision,
            override_name,
            parameters: Some(parameters.clone()),
        });
    }

    fn mute(&mut self, listener: PlayerId, speaker: PlayerId) {
        tracing::debug!(listener = %listener, speaker = %speaker, "Muting speaker");
        self.speakers.push(SpeakerReport {
            speaker,
            decision: VoiceDecision::Muted,
            override_name: None,
            parameters: None,
        });
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    match EnvFilter::try_from_default_env() {
        Ok(filter) => tracing_subscriber::fmt().with_env_filter(filter).init(),
        Err(_) => tracing_subscriber::fmt().with_max_level(level).init(),
    }
}

async fn load_scene(path: Option<&PathBuf>) -> anyhow::Result<SceneConfig> {
    match path {
        Some(path) => SceneConfig::load_from_file(path)
            .await
            .with_context(|| format!("failed to load scene {}", path.display())),
        None => {
            tracing::info!("No scene given, using the built-in demo scene");
            Ok(SceneConfig::factory_default())
        }
    }
}

fn print_report(report: &TickReport) {
    println!("Listener {}", report.listener);
    if let Some(name) = &report.listener_override {
        println!("  inside override '{}'", name);
    }
    for line in &report.speakers {
        let verdict = match (&line.decision, &line.override_name) {
            (VoiceDecision::Muted, _) => "muted".to_string(),
            (VoiceDecision::Default, _) => "default parameters".to_string(),
            (VoiceDecision::Override(_), Some(name)) => format!("override '{}'", name),
            (VoiceDecision::Override(id), None) => id.to_string(),
        };
        println!("  speaker {:>4}: {}", line.speaker, verdict);
    }
    println!(
        "{} overridden, {} default, {} muted",
        report.summary.overridden, report.summary.defaulted, report.summary.muted
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    tracing::info!("Earshot starting...");

    if let Some(target) = cli.write_default {
        let path = target
            .or_else(SceneConfig::default_path)
            .context("no configuration directory available, pass a path")?;
        SceneConfig::factory_default().save_to_file(&path).await?;
        println!("Wrote default scene to {}", path.display());
        return Ok(());
    }

    let mut scene = load_scene(cli.scene.as_ref()).await?;
    if let Some(listener) = cli.listener {
        scene.local_player = PlayerId::new(listener);
        if !scene.players.contains(&scene.local_player) {
            scene.players.push(scene.local_player);
        }
    }

    let resolver = scene.build_resolver().context("invalid scene")?;
    let listener_override = resolver
        .max_priority_override_record(resolver.local_player())
        .map(|record| record.name.clone());

    let mut output = ReportOutput {
        resolver: &resolver,
        speakers: Vec::new(),
    };
    let summary = resolver.update(scene.speakers(), &mut output);

    let report = TickReport {
        listener: resolver.local_player(),
        listener_override,
        summary,
        speakers: output.speakers,
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}
