//! Reelcut CLI
//!
//! Headless companion to the Reelcut editor: validates and inspects
//! project files and probes which export format negotiation would pick
//! for a given output, without touching any real encoder.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use reelcut_core::core::{
    codec::{negotiate, Container},
    project::ProjectFile,
};

mod profile;

use profile::SoftwareProfile;

#[derive(Parser)]
#[command(name = "reelcut", version, about = "Reelcut project tooling")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check a project file's timeline invariants
    Validate {
        /// Path to the project JSON file
        project: PathBuf,
    },
    /// Print a summary of a project file
    Inspect {
        /// Path to the project JSON file
        project: PathBuf,
        /// Emit machine-readable JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Show which container/codec pair an export of this project would pick
    Negotiate {
        /// Path to the project JSON file
        project: PathBuf,
        /// Preferred container
        #[arg(long, value_enum)]
        container: Option<ContainerArg>,
        /// Capability profile to negotiate against
        #[arg(long, value_enum, default_value = "software")]
        profile: ProfileArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ProfileArg {
    /// Plain software codec stack (ffmpeg-style build)
    Software,
}

#[derive(Clone, Copy, ValueEnum)]
enum ContainerArg {
    Mp4,
    Webm,
    Mov,
    Mkv,
    Wav,
    Aac,
    Mp3,
}

impl From<ContainerArg> for Container {
    fn from(arg: ContainerArg) -> Self {
        match arg {
            ContainerArg::Mp4 => Container::Mp4,
            ContainerArg::Webm => Container::Webm,
            ContainerArg::Mov => Container::Mov,
            ContainerArg::Mkv => Container::Mkv,
            ContainerArg::Wav => Container::Wav,
            ContainerArg::Aac => Container::Aac,
            ContainerArg::Mp3 => Container::Mp3,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    match Cli::parse().command {
        Command::Validate { project } => validate(project),
        Command::Inspect { project, json } => inspect(project, json),
        Command::Negotiate {
            project,
            container,
            profile,
        } => negotiate_format(project, container.map(Into::into), profile),
    }
}

fn load_project(path: &PathBuf) -> anyhow::Result<ProjectFile> {
    let project =
        ProjectFile::load(path).with_context(|| format!("failed to load {}", path.display()))?;
    debug!(path = %path.display(), name = %project.name, "project loaded");
    Ok(project)
}

/// Whether any audible clip would reach the mixdown: a non-hidden,
/// non-muted track with a clip whose asset exposes an audio stream
fn project_needs_audio(project: &ProjectFile) -> bool {
    project
        .sequence
        .tracks
        .iter()
        .filter(|track| !track.hidden && !track.muted)
        .flat_map(|track| track.clips.iter())
        .filter(|clip| clip.kind.may_have_audio())
        .filter_map(|clip| clip.asset_id.as_deref())
        .any(|asset_id| project.get_asset(asset_id).is_some_and(|a| a.has_audio()))
}

fn validate(path: PathBuf) -> anyhow::Result<()> {
    let project = load_project(&path)?;
    println!(
        "ok: {} ({} assets, {} tracks, {:.2}s)",
        project.name,
        project.assets.len(),
        project.sequence.tracks.len(),
        project.sequence.duration()
    );
    Ok(())
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectSummary {
    name: String,
    version: u32,
    duration_sec: f64,
    assets: usize,
    tracks: Vec<TrackSummary>,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct TrackSummary {
    name: String,
    kind: String,
    hidden: bool,
    muted: bool,
    clips: usize,
}

fn inspect(path: PathBuf, json: bool) -> anyhow::Result<()> {
    let project = load_project(&path)?;
    let summary = ProjectSummary {
        name: project.name.clone(),
        version: project.version,
        duration_sec: project.sequence.duration(),
        assets: project.assets.len(),
        tracks: project
            .sequence
            .tracks
            .iter()
            .map(|t| TrackSummary {
                name: t.name.clone(),
                kind: t.kind.as_str().to_string(),
                hidden: t.hidden,
                muted: t.muted,
                clips: t.clips.len(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{} (v{}, {:.2}s, {} assets)", summary.name, summary.version, summary.duration_sec, summary.assets);
        for track in &summary.tracks {
            let mut flags = String::new();
            if track.hidden {
                flags.push_str(" hidden");
            }
            if track.muted {
                flags.push_str(" muted");
            }
            println!("  [{}] {}: {} clips{}", track.kind, track.name, track.clips, flags);
        }
    }
    Ok(())
}

fn negotiate_format(
    path: PathBuf,
    preference: Option<Container>,
    profile: ProfileArg,
) -> anyhow::Result<()> {
    let project = load_project(&path)?;
    let canvas = project.sequence.format.canvas;
    let needs_audio = project_needs_audio(&project);
    debug!(
        width = canvas.width,
        height = canvas.height,
        needs_audio,
        "negotiating export format"
    );

    let caps = match profile {
        ProfileArg::Software => SoftwareProfile,
    };
    match negotiate(&caps, canvas, needs_audio, preference) {
        Some(format) => {
            println!(
                "container: {} ({})",
                format.container.extension(),
                format.container.mime_type()
            );
            match format.video_codec {
                Some(codec) => println!("video: {codec:?}"),
                None => println!("video: none"),
            }
            match format.audio_codec {
                Some(codec) => println!("audio: {codec:?}"),
                None => println!("audio: none"),
            }
            Ok(())
        }
        None => anyhow::bail!("no encodable container/codec combination"),
    }
}
