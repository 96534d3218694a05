// src/landmarks.rs - hand landmark input
//
// The detector is a black box: anything implementing `LandmarkSource` can
// feed the classifier, whether it wraps a camera and an ML model, replays a
// recorded script, or synthesises a moving hand. `spawn_landmark_source`
// runs a source on its own thread at a fixed cadence and delivers
// `SourceEvent`s over a bounded channel, independent of the render loop.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::SourceConfig;
use crate::error::{Error, Result};

/// Events buffered between the landmark thread and the app. Frames arriving
/// while the buffer is full are dropped.
pub const FEED_CAPACITY: usize = 8;

/// Number of keypoints in one hand.
pub const HAND_POINTS: usize = 21;

/// Hand landmark indices (MediaPipe hand model convention).
#[allow(dead_code)]
pub mod index {
    pub const WRIST: usize = 0;
    pub const THUMB_CMC: usize = 1;
    pub const THUMB_TIP: usize = 4;
    pub const INDEX_MCP: usize = 5;
    pub const INDEX_TIP: usize = 8;
    pub const MIDDLE_MCP: usize = 9;
    pub const MIDDLE_TIP: usize = 12;
    pub const RING_MCP: usize = 13;
    pub const RING_TIP: usize = 16;
    pub const PINKY_MCP: usize = 17;
    pub const PINKY_TIP: usize = 20;

    /// The four non-thumb fingertips.
    pub const FINGERTIPS: [usize; 4] = [INDEX_TIP, MIDDLE_TIP, RING_TIP, PINKY_TIP];
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn distance_2d(&self, other: &Landmark) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn distance_3d(&self, other: &Landmark) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// One detected hand: normalized screen landmarks plus, when the detector
/// provides them, world-space landmarks in meters with the same indexing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HandFrame {
    pub screen: Vec<Landmark>,
    #[serde(default)]
    pub world: Option<Vec<Landmark>>,
}

impl HandFrame {
    pub fn has_screen(&self) -> bool {
        self.screen.len() >= HAND_POINTS
    }

    /// World landmarks, only when the full set is present.
    pub fn world_points(&self) -> Option<&[Landmark]> {
        self.world
            .as_deref()
            .filter(|points| points.len() >= HAND_POINTS)
    }
}

/// Builds a straight-fingered hand: each finger is a ray out of the wrist
/// with its tip at `reach`. With `pinch` set, the thumb tip is moved onto the
/// index tip.
pub fn synthetic_hand(center: (f32, f32), screen_reach: f32, world_reach: f32, pinch: bool) -> HandFrame {
    let wrist_screen = Landmark::new(center.0, center.1 + screen_reach * 0.5, 0.0);
    let wrist_world = Landmark::default();

    let mut screen = vec![wrist_screen; HAND_POINTS];
    let mut world = vec![wrist_world; HAND_POINTS];

    for finger in 0..5 {
        // fan from thumb side to pinky side, fingers pointing up (-y on screen)
        let angle = (-50.0_f32 + finger as f32 * 25.0).to_radians();
        let (sin, cos) = angle.sin_cos();
        for joint in 1..=4 {
            let t = joint as f32 / 4.0;
            let idx = 1 + finger * 4 + (joint - 1);
            screen[idx] = Landmark::new(
                wrist_screen.x + sin * screen_reach * t,
                wrist_screen.y - cos * screen_reach * t,
                0.0,
            );
            world[idx] = Landmark::new(sin * world_reach * t, cos * world_reach * t, 0.0);
        }
    }

    if pinch {
        let s = screen[index::INDEX_TIP];
        screen[index::THUMB_TIP] = Landmark::new(s.x + 0.01, s.y, 0.0);
        let w = world[index::INDEX_TIP];
        world[index::THUMB_TIP] = Landmark::new(w.x + 0.01, w.y, 0.01);
    }

    HandFrame { screen, world: Some(world) }
}

/// Anything that can produce zero or one hand per tick.
pub trait LandmarkSource {
    fn name(&self) -> &str;

    /// Acquire resources (camera, model). Failure is reported, not fatal.
    fn start(&mut self) -> Result<()>;

    /// Poll one frame. `Ok(None)` means no hand in view.
    fn next_frame(&mut self) -> Result<Option<HandFrame>>;

    /// Release resources. Called once when the loop ends.
    fn stop(&mut self) {}
}

/// Reports an empty view on every tick. The default when no detector is
/// available, so nothing changes until the user acts.
#[derive(Debug, Default)]
pub struct IdleSource;

impl LandmarkSource for IdleSource {
    fn name(&self) -> &str {
        "idle"
    }

    fn start(&mut self) -> Result<()> {
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<HandFrame>> {
        Ok(None)
    }
}

/// A synthetic hand that cycles open, fist, open, pinch while drifting
/// across the view. Only used when asked for, e.g. by `landmark_probe`.
pub struct SimulatedSource {
    sim_time: f32,
    step: f32,
    phase_secs: f32,
}

impl SimulatedSource {
    pub fn new(fps: u32) -> Self {
        Self {
            sim_time: 0.0,
            step: 1.0 / fps.max(1) as f32,
            phase_secs: 3.0,
        }
    }

    fn frame_at(&self, t: f32) -> HandFrame {
        let center = (0.5 + 0.2 * (t * 0.4).sin(), 0.5 + 0.1 * (t * 0.7).cos());
        let phase = (t / self.phase_secs) as u32 % 4;
        match phase {
            0 | 2 => synthetic_hand(center, 0.45, 0.17, false),
            1 => synthetic_hand(center, 0.2, 0.06, false),
            _ => synthetic_hand(center, 0.35, 0.1, true),
        }
    }
}

impl LandmarkSource for SimulatedSource {
    fn name(&self) -> &str {
        "simulated"
    }

    fn start(&mut self) -> Result<()> {
        self.sim_time = 0.0;
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<HandFrame>> {
        let frame = self.frame_at(self.sim_time);
        self.sim_time += self.step;
        Ok(Some(frame))
    }
}

/// Replays a recorded sequence of frames; `null` entries are frames with no hand.
pub struct ScriptedSource {
    frames: Vec<Option<HandFrame>>,
    cursor: usize,
    looping: bool,
}

impl ScriptedSource {
    pub fn new(frames: Vec<Option<HandFrame>>, looping: bool) -> Self {
        Self { frames, cursor: 0, looping }
    }

    pub fn from_json(text: &str, looping: bool) -> Result<Self> {
        let frames: Vec<Option<HandFrame>> = serde_json::from_str(text)?;
        Ok(Self::new(frames, looping))
    }

    pub fn from_path(path: impl AsRef<Path>, looping: bool) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&text, looping)
    }

    pub fn is_finished(&self) -> bool {
        !self.looping && self.cursor >= self.frames.len()
    }
}

impl LandmarkSource for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    fn start(&mut self) -> Result<()> {
        if self.frames.is_empty() {
            return Err(Error::SourceInit("script contains no frames".to_string()));
        }
        self.cursor = 0;
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<HandFrame>> {
        if self.cursor >= self.frames.len() {
            if !self.looping || self.frames.is_empty() {
                return Ok(None);
            }
            self.cursor = 0;
        }
        let frame = self.frames[self.cursor].clone();
        self.cursor += 1;
        Ok(frame)
    }
}

/// Stands in for a source that cannot run here; `start` always fails with
/// the stored reason so the failure reaches the app like any other.
pub struct UnavailableSource {
    reason: String,
}

impl UnavailableSource {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

impl LandmarkSource for UnavailableSource {
    fn name(&self) -> &str {
        "unavailable"
    }

    fn start(&mut self) -> Result<()> {
        Err(Error::SourceInit(self.reason.clone()))
    }

    fn next_frame(&mut self) -> Result<Option<HandFrame>> {
        Ok(None)
    }
}

/// Builds the source named in the config. Problems become an
/// [`UnavailableSource`] rather than an error.
///
/// No hand landmark model ships with the crate, so `Camera` cannot be built
/// here. Hosts that have one pass `camera::CameraSource::new(index, detector)`
/// to [`spawn_landmark_source`] directly.
pub fn open_source(config: &SourceConfig, fps: u32) -> Box<dyn LandmarkSource> {
    match config {
        SourceConfig::Idle => Box::new(IdleSource),
        SourceConfig::Simulated => Box::new(SimulatedSource::new(fps)),
        SourceConfig::Scripted { path, looping } => match ScriptedSource::from_path(path, *looping) {
            Ok(source) => Box::new(source),
            Err(e) => Box::new(UnavailableSource::new(format!("{}: {}", path.display(), e))),
        },
        SourceConfig::Camera { index } => Box::new(UnavailableSource::new(format!(
            "camera {} needs a hand landmark detector, none is bundled",
            index
        ))),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SourceEvent {
    /// The source started and frames will follow.
    Ready,
    Frame(Option<HandFrame>),
    /// The source could not start; no frames will follow.
    Failed(String),
}

/// Receiving end of a running source. Dropping it stops the loop.
pub struct LandmarkFeed {
    rx: Receiver<SourceEvent>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl LandmarkFeed {
    /// Everything delivered since the last call, oldest first.
    pub fn drain(&self) -> Vec<SourceEvent> {
        let mut events = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        events
    }

    /// Blocks up to `timeout` for the next event.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<SourceEvent> {
        self.rx.recv_timeout(timeout).ok()
    }

    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("landmark thread panicked");
            }
        }
    }
}

impl Drop for LandmarkFeed {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Builds a source with `make` on a dedicated thread and polls it `fps`
/// times per second. The source never leaves that thread, so camera handles
/// that are not `Send` are fine.
pub fn spawn_landmark_source<F>(make: F, fps: u32) -> Result<LandmarkFeed>
where
    F: FnOnce() -> Box<dyn LandmarkSource> + Send + 'static,
{
    let (tx, rx) = mpsc::sync_channel(FEED_CAPACITY);
    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = Arc::clone(&stop);
    let period = Duration::from_secs_f64(1.0 / fps.max(1) as f64);

    let handle = thread::Builder::new()
        .name("landmarks".to_string())
        .spawn(move || {
            let mut source = make();
            if let Err(e) = source.start() {
                warn!(source = source.name(), error = %e, "landmark source failed to start");
                let _ = tx.send(SourceEvent::Failed(e.to_string()));
                return;
            }
            info!(source = source.name(), fps, "landmark source ready");
            if tx.send(SourceEvent::Ready).is_err() {
                source.stop();
                return;
            }

            let mut failures: u64 = 0;
            let mut dropped: u64 = 0;
            while !stop_flag.load(Ordering::Relaxed) {
                let tick = Instant::now();
                match source.next_frame() {
                    Ok(frame) => match tx.try_send(SourceEvent::Frame(frame)) {
                        Ok(()) => {}
                        Err(TrySendError::Full(_)) => {
                            dropped += 1;
                            debug!(source = source.name(), dropped, "feed full, frame dropped");
                        }
                        Err(TrySendError::Disconnected(_)) => break,
                    },
                    Err(e) => {
                        failures += 1;
                        warn!(source = source.name(), failures, error = %e, "landmark frame failed");
                    }
                }
                thread::sleep(period.saturating_sub(tick.elapsed()));
            }

            source.stop();
            debug!(source = source.name(), "landmark loop stopped");
        })?;

    Ok(LandmarkFeed {
        rx,
        stop,
        handle: Some(handle),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FlakySource {
        calls: u32,
    }

    impl LandmarkSource for FlakySource {
        fn name(&self) -> &str {
            "flaky"
        }

        fn start(&mut self) -> Result<()> {
            Ok(())
        }

        fn next_frame(&mut self) -> Result<Option<HandFrame>> {
            self.calls += 1;
            if self.calls % 2 == 0 {
                Err(Error::Inference("dropped frame".to_string()))
            } else {
                Ok(None)
            }
        }
    }

    fn wait_for(feed: &LandmarkFeed, wanted: usize) -> Vec<SourceEvent> {
        let mut events = Vec::new();
        while events.len() < wanted {
            match feed.recv_timeout(Duration::from_secs(2)) {
                Some(event) => events.push(event),
                None => break,
            }
        }
        events
    }

    #[test]
    fn test_synthetic_hand_fingertip_reach() {
        let hand = synthetic_hand((0.5, 0.5), 0.4, 0.15, false);
        let world = hand.world_points().unwrap();
        for tip in index::FINGERTIPS {
            let d = world[tip].distance_3d(&world[index::WRIST]);
            assert!((d - 0.15).abs() < 1e-5);
            let d2 = hand.screen[tip].distance_2d(&hand.screen[index::WRIST]);
            assert!((d2 - 0.4).abs() < 1e-5);
        }
    }

    #[test]
    fn test_short_world_set_is_ignored() {
        let mut hand = synthetic_hand((0.5, 0.5), 0.4, 0.15, false);
        hand.world = Some(vec![Landmark::default(); 5]);
        assert!(hand.has_screen());
        assert!(hand.world_points().is_none());
    }

    #[test]
    fn test_scripted_source_runs_out() {
        let mut source = ScriptedSource::new(vec![None, Some(HandFrame::default())], false);
        source.start().unwrap();
        assert_eq!(source.next_frame().unwrap(), None);
        assert_eq!(source.next_frame().unwrap(), Some(HandFrame::default()));
        assert!(source.is_finished());
        assert_eq!(source.next_frame().unwrap(), None);
    }

    #[test]
    fn test_scripted_source_loops() {
        let mut source = ScriptedSource::new(vec![Some(HandFrame::default())], true);
        source.start().unwrap();
        for _ in 0..3 {
            assert!(source.next_frame().unwrap().is_some());
        }
        assert!(!source.is_finished());
    }

    #[test]
    fn test_scripted_source_parses_json() {
        let source = ScriptedSource::from_json(
            r#"[null, { "screen": [{ "x": 0.1, "y": 0.2 }] }]"#,
            false,
        )
        .unwrap();
        assert_eq!(source.frames.len(), 2);
        let frame = source.frames[1].as_ref().unwrap();
        assert_eq!(frame.screen[0], Landmark::new(0.1, 0.2, 0.0));
        assert!(frame.world.is_none());
    }

    #[test]
    fn test_open_source_reports_missing_script() {
        let path = std::env::temp_dir().join(format!("missing_{}.json", uuid::Uuid::new_v4()));
        let mut source = open_source(&SourceConfig::Scripted { path, looping: false }, 30);
        assert_eq!(source.name(), "unavailable");
        assert!(matches!(source.start(), Err(Error::SourceInit(_))));

        let mut source = open_source(&SourceConfig::Simulated, 30);
        source.start().unwrap();
        assert!(source.next_frame().unwrap().is_some());
    }

    #[test]
    fn test_default_source_is_idle() {
        let mut source = open_source(&SourceConfig::default(), 30);
        assert_eq!(source.name(), "idle");
        source.start().unwrap();
        for _ in 0..100 {
            assert_eq!(source.next_frame().unwrap(), None);
        }
    }

    #[test]
    fn test_feed_buffer_is_bounded() {
        let feed = spawn_landmark_source(|| Box::new(IdleSource), 500).unwrap();
        thread::sleep(Duration::from_millis(300));
        let backlog = feed.drain();
        assert!(!backlog.is_empty());
        assert!(backlog.len() <= FEED_CAPACITY);
        assert_eq!(backlog[0], SourceEvent::Ready);

        // the loop keeps delivering once there is room again
        assert_eq!(feed.recv_timeout(Duration::from_secs(2)), Some(SourceEvent::Frame(None)));
    }

    #[test]
    fn test_empty_script_reports_failure() {
        let feed = spawn_landmark_source(|| Box::new(ScriptedSource::new(Vec::new(), false)), 60).unwrap();
        let events = wait_for(&feed, 1);
        assert!(matches!(events.first(), Some(SourceEvent::Failed(_))));
    }

    #[test]
    fn test_loop_survives_frame_errors() {
        let mut feed = spawn_landmark_source(|| Box::new(FlakySource { calls: 0 }), 200).unwrap();
        let events = wait_for(&feed, 4);
        feed.stop();
        assert_eq!(events[0], SourceEvent::Ready);
        assert_eq!(events.len(), 4);
        assert!(events[1..].iter().all(|e| *e == SourceEvent::Frame(None)));
    }
}
