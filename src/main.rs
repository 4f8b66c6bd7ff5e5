// src/main.rs
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use swing_tracker::data::SessionExporter;
use swing_tracker::simulation::SimulatedSwing;
use swing_tracker::{
    CoachingFeedbackGenerator, EngineConfig, LiveThrottledTracker, SwingAnalyzer,
};

#[derive(Parser)]
#[command(name = "swing_tracker", about = "Golf swing tempo, plane and sway from body pose")]
struct Cli {
    /// JSON engine configuration; defaults are used when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze a simulated recorded swing
    Analyze {
        #[arg(long, default_value_t = 1.2)]
        duration: f64,
        /// Time of the top of the backswing, in seconds
        #[arg(long, default_value_t = 0.9)]
        top: f64,
        #[arg(long, default_value_t = 52.0)]
        plane: f64,
        #[arg(long, default_value_t = 4.0)]
        sway: f64,
        /// Drop the pose on every n-th frame (0 = never)
        #[arg(long, default_value_t = 0)]
        dropout: usize,
        /// Write the pose track and analysis into the output directory
        #[arg(long)]
        export: bool,
        /// Print the result as JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Feed a simulated camera through the live overlay tracker
    Live {
        #[arg(long, default_value_t = 2.0)]
        seconds: f64,
        #[arg(long, default_value_t = 30.0)]
        fps: f64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => EngineConfig::load_from_file(path),
        None => EngineConfig::default(),
    };
    config.validate().context("invalid engine configuration")?;

    match cli.command {
        Command::Analyze {
            duration,
            top,
            plane,
            sway,
            dropout,
            export,
            json,
        } => {
            let swing = SimulatedSwing {
                duration,
                top_time: top,
                plane_deg: plane,
                sway_cm: sway,
                dropout_every: dropout,
                ..SimulatedSwing::default()
            };
            run_analysis(&config, swing, export, json).await
        }
        Command::Live { seconds, fps } => {
            let swing = SimulatedSwing {
                duration: seconds,
                ..SimulatedSwing::default()
            };
            run_live(&config, swing, fps).await
        }
    }
}

async fn run_analysis(
    config: &EngineConfig,
    swing: SimulatedSwing,
    export: bool,
    json: bool,
) -> Result<()> {
    let swing = Arc::new(swing);
    let analyzer = SwingAnalyzer::new(&config.batch)?;

    let (result, sequence) = analyzer
        .analyze_with_sequence(swing.clone(), swing)
        .await
        .context("analysis unavailable")?;
    let tips = CoachingFeedbackGenerator::generate(&result);

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", result.summary_chip());
        println!(
            "Posed {}/{} frames (confidence {:.0}%) in {:.1} ms",
            result.posed_frames,
            result.requested_frames,
            result.confidence * 100.0,
            result.processing_time.as_secs_f64() * 1000.0
        );
        for (i, tip) in tips.iter().enumerate() {
            let marker = if i == 0 { "*" } else { "-" };
            println!("{} Feel: {}", marker, tip.cue);
            println!("  Drill: {}", tip.drill);
        }
    }

    if export {
        let exporter = SessionExporter::new(&config.export.output_directory, None);
        let csv_path = exporter.export_sequence_csv(&sequence)?;
        let json_path = exporter.export_analysis_json(&result, &tips)?;
        eprintln!("Saved {} and {}", csv_path.display(), json_path.display());
    }

    Ok(())
}

async fn run_live(config: &EngineConfig, swing: SimulatedSwing, fps: f64) -> Result<()> {
    anyhow::ensure!(fps > 0.0, "fps must be positive");

    let swing = Arc::new(swing);
    let (mut tracker, mut reader) = LiveThrottledTracker::new(
        swing.clone(),
        &config.live,
        tokio::runtime::Handle::current(),
    )?;

    let overlay = tokio::spawn(async move {
        let mut updates = 0usize;
        while reader.changed().await {
            if let Some(pose) = reader.current() {
                updates += 1;
                println!(
                    "overlay t={:.3}s joints={}",
                    pose.timestamp,
                    pose.joint_count()
                );
            }
        }
        updates
    });

    let frame_interval = Duration::from_secs_f64(1.0 / fps);
    for frame in swing.live_feed(fps) {
        tracker.offer(frame);
        tokio::time::sleep(frame_interval).await;
    }

    let accepted = tracker.accepted_count();
    let dropped = tracker.dropped_count();
    // Let in-flight detections land before closing the slot.
    tokio::time::sleep(Duration::from_millis(50)).await;
    drop(tracker);

    let updates = overlay.await.context("overlay task failed")?;
    eprintln!(
        "Live feed: {} frames accepted, {} dropped, {} overlay updates",
        accepted, dropped, updates
    );
    Ok(())
}
