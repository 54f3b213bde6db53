use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::camera::{CameraUniforms, PosePublisher};
use crate::chapter::ChapterRegistry;
use crate::config::TourConfig;
use crate::director::{Action, TourDirector};
use crate::input::{InputAggregator, InputEvent};
use crate::recorder::FrameRecorder;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the tour headless and record every frame
    Simulate {
        /// Frames per second
        #[arg(long, default_value_t = 60.0)]
        fps: f32,

        /// Duration in seconds (defaults to the full scripted tour)
        #[arg(long)]
        duration: Option<f32>,

        /// Chapter registry JSON
        #[arg(long)]
        chapters: Option<PathBuf>,

        /// Tour configuration JSON
        #[arg(long)]
        config: Option<PathBuf>,

        /// Timed input events and actions
        #[arg(long)]
        script: Option<PathBuf>,

        /// Output file for recorded frames (stdout if omitted)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print the chapter registry
    Chapters {
        /// Chapter registry JSON
        #[arg(long)]
        chapters: Option<PathBuf>,
    },
}

/// One timed entry of a simulation script.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScriptEntry {
    time: f32,
    #[serde(default)]
    event: Option<InputEvent>,
    #[serde(default)]
    action: Option<Action>,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            fps,
            duration,
            chapters,
            config,
            script,
            out,
        } => {
            let registry = load_registry(chapters.as_deref())?;
            let config = load_config(config.as_deref())?;
            let script = match script {
                Some(path) => load_script(&path)?,
                None => Vec::new(),
            };
            simulate(registry, config, script, fps, duration, out.as_deref())?;
        }
        Commands::Chapters { chapters } => {
            let registry = load_registry(chapters.as_deref())?;
            for chapter in registry.all() {
                println!(
                    "{:>2}  {:<36} {:<24} anchor={:?} quotes={}",
                    chapter.id,
                    chapter.content.title,
                    chapter.content.subtitle,
                    chapter.anchor.to_array(),
                    chapter.quote_count()
                );
            }
        }
    }
    Ok(())
}

fn read_to_string(path: &Path) -> Result<String> {
    let mut file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    Ok(contents)
}

fn load_registry(path: Option<&Path>) -> Result<ChapterRegistry> {
    match path {
        Some(path) => Ok(ChapterRegistry::from_json(&read_to_string(path)?)?),
        None => Ok(ChapterRegistry::default()),
    }
}

fn load_config(path: Option<&Path>) -> Result<TourConfig> {
    match path {
        Some(path) => serde_json::from_str(&read_to_string(path)?)
            .with_context(|| format!("invalid tour config in {}", path.display())),
        None => Ok(TourConfig::default()),
    }
}

fn load_script(path: &Path) -> Result<Vec<ScriptEntry>> {
    let mut entries: Vec<ScriptEntry> = serde_json::from_str(&read_to_string(path)?)
        .with_context(|| format!("invalid script in {}", path.display()))?;
    entries.sort_by(|a, b| a.time.total_cmp(&b.time));
    Ok(entries)
}

/// Length of an uninterrupted tour.
fn scripted_length(config: &TourConfig, chapters: usize) -> f32 {
    let per_chapter = config.approach_duration + config.dwell_duration + config.depart_duration;
    config.intro_duration + per_chapter * chapters as f32 + config.outro_duration
}

fn simulate(
    registry: ChapterRegistry,
    config: TourConfig,
    script: Vec<ScriptEntry>,
    fps: f32,
    duration: Option<f32>,
    out: Option<&Path>,
) -> Result<()> {
    if !(fps.is_finite() && fps > 0.0) {
        anyhow::bail!("fps must be positive, got {}", fps);
    }
    let duration = duration.unwrap_or_else(|| scripted_length(&config, registry.count()) + 1.0);
    let total_frames = (duration * fps).ceil() as usize;
    let dt = 1.0 / fps;

    let mut input = InputAggregator::new(config.input_deadzone);
    let mut director = TourDirector::new(registry, config)?;
    let mut uniforms = CameraUniforms::new();
    let mut recorder = FrameRecorder::default();
    let mut pending = script.into_iter().peekable();

    log::info!("Simulating {} frames at {} fps", total_frames, fps);

    for i in 0..total_frames {
        let time = i as f32 * dt;
        while let Some(entry) = pending.next_if(|e| e.time <= time) {
            if let Some(event) = &entry.event {
                input.handle(event);
            }
            if let Some(action) = entry.action {
                log::debug!("t={:.3} action {:?}", time, action);
                director.apply(action);
            }
        }

        let pose = director.frame(dt, &mut input, &mut uniforms);
        recorder.set_frame(time + dt, director.snapshot());
        recorder.publish(&pose);
    }

    for mark in recorder.phases() {
        log::info!(
            "{:>8.3}s  {} (chapter {})",
            mark.time,
            mark.phase,
            mark.chapter_index
        );
    }
    let recording = recorder.take();
    log::info!(
        "Recorded {} frames, final phase {}",
        recording.frames.len(),
        director.state().phase.label()
    );

    match out {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, &recording)?;
            writer.flush()?;
        }
        None => {
            let stdout = std::io::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            serde_json::to_writer_pretty(&mut writer, &recording)?;
            writeln!(writer)?;
        }
    }
    Ok(())
}
