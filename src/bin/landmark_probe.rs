// src/bin/landmark_probe.rs
//
// Runs a landmark source without the window and prints what the classifier
// and mode machine make of it. Uses the simulated hand unless a script is
// given. Handy for tuning thresholds.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use clap::Parser;
use tree_lights::landmarks::{open_source, spawn_landmark_source};
use tree_lights::{Config, Experience, HandFrame, SourceConfig, SourceEvent};

#[derive(Parser, Debug)]
#[command(name = "landmark_probe", about = "Print gestures and mode changes for a landmark source")]
struct Args {
    /// Replay frames from a JSON script instead of the simulated hand
    #[arg(long)]
    script: Option<PathBuf>,

    /// Start the script over when it runs out
    #[arg(long)]
    looping: bool,

    /// Stop after this many frames
    #[arg(long, default_value_t = 300)]
    frames: usize,

    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Save the frames seen as a script that `--script` can replay
    #[arg(long)]
    record: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let source = match &args.script {
        Some(path) => SourceConfig::Scripted {
            path: path.clone(),
            looping: args.looping,
        },
        None => SourceConfig::Simulated,
    };
    let config = Config {
        particle_count: 0,
        source: source.clone(),
        source_fps: args.fps,
        ..Config::default()
    };

    let fps = args.fps;
    let feed = spawn_landmark_source(move || open_source(&source, fps), fps)
        .context("failed to start landmark thread")?;
    let mut experience = Experience::new(&config);
    let mut recorded: Vec<Option<HandFrame>> = Vec::new();
    let started = Instant::now();
    let mut seen = 0;

    while seen < args.frames {
        let Some(event) = feed.recv_timeout(Duration::from_secs(2)) else {
            println!("no frames for 2s, stopping");
            break;
        };
        let now = started.elapsed();
        match &event {
            SourceEvent::Ready => println!("source ready"),
            SourceEvent::Failed(reason) => bail!("source failed: {}", reason),
            SourceEvent::Frame(frame) => {
                seen += 1;
                if args.record.is_some() {
                    recorded.push(frame.clone());
                }
            }
        }

        let transition = experience.handle_event(event, now);
        let pose = experience.pose();
        println!(
            "{:>7}ms {:<9} x={:.2} y={:.2} tilt=({:+.2}, {:+.2}) mode={}",
            now.as_millis(),
            pose.gesture,
            pose.x,
            pose.y,
            pose.tilt_x,
            pose.tilt_y,
            experience.mode()
        );
        if let Some(t) = transition {
            println!("  -> {} to {} on {}", t.from, t.to, t.cause);
        }
    }

    if let Some(path) = &args.record {
        let json = serde_json::to_string_pretty(&recorded)?;
        std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
        println!("recorded {} frames to {}", recorded.len(), path.display());
    }

    println!("{} transitions", experience.log().records().len());
    Ok(())
}
