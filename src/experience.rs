// src/experience.rs
//
// Wires the pieces together: landmark frames are classified into poses,
// poses drive the mode machine, and the animation driver turns the mode and
// the latest pose into per-object transforms every rendered frame. Poses
// arrive at the landmark source's cadence, frames at the renderer's;
// `Experience::advance` always works from the most recent pose.

use std::time::Duration;

use tracing::{info, warn};

use crate::animation::{AnimationDriver, FrameOutput};
use crate::config::Config;
use crate::gesture::{classify, GestureLabel, GestureThresholds, HandPose};
use crate::landmarks::{HandFrame, SourceEvent};
use crate::mode::{DisplayMode, ModeMachine, Transition};
use crate::photos::{PhotoCollection, PhotoItem};
use crate::session::SessionLog;

/// Snapshot for the status overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct Status {
    pub mode: DisplayMode,
    pub gesture: GestureLabel,
    pub photo_count: usize,
    pub source_ready: bool,
    pub source_error: Option<String>,
}

pub struct Experience {
    thresholds: GestureThresholds,
    machine: ModeMachine,
    photos: PhotoCollection,
    driver: AnimationDriver,
    pose: HandPose,
    source_ready: bool,
    source_error: Option<String>,
    log: SessionLog,
}

impl Experience {
    pub fn new(config: &Config) -> Self {
        Self {
            thresholds: config.thresholds,
            machine: ModeMachine::new(Duration::from_millis(config.debounce_ms)),
            photos: PhotoCollection::new(),
            driver: AnimationDriver::from_config(config),
            pose: HandPose::NEUTRAL,
            source_ready: false,
            source_error: None,
            log: SessionLog::new(None),
        }
    }

    /// Applies one event from the landmark feed at session time `now`.
    pub fn handle_event(&mut self, event: SourceEvent, now: Duration) -> Option<Transition> {
        match event {
            SourceEvent::Ready => {
                self.source_ready = true;
                self.source_error = None;
                None
            }
            SourceEvent::Failed(reason) => {
                warn!(%reason, "hand tracking unavailable, continuing without it");
                self.source_ready = false;
                self.source_error = Some(reason);
                self.pose = HandPose::NEUTRAL;
                None
            }
            SourceEvent::Frame(frame) => self.ingest_frame(frame.as_ref(), now),
        }
    }

    pub fn ingest_frame(&mut self, frame: Option<&HandFrame>, now: Duration) -> Option<Transition> {
        let pose = classify(frame, &self.thresholds);
        self.ingest_pose(pose, now)
    }

    /// Feeds an already classified pose, e.g. from the manual controls.
    pub fn ingest_pose(&mut self, pose: HandPose, now: Duration) -> Option<Transition> {
        self.pose = pose;
        let transition = self.machine.handle(pose.gesture, self.photos.len(), now);
        if let Some(t) = &transition {
            self.log.record(t, self.photos.len());
        }
        transition
    }

    /// Adds decoded photos. Adding any while the tree is assembled scatters it.
    pub fn add_photos(&mut self, items: Vec<PhotoItem>, now: Duration) -> Option<Transition> {
        let added = self.photos.add(items);
        if added == 0 {
            return None;
        }
        info!(added, total = self.photos.len(), "photos added");
        let transition = self.machine.photos_added(added, now);
        if let Some(t) = &transition {
            self.log.record(t, self.photos.len());
        }
        transition
    }

    /// Removes a photo. Removing the one on show, or the last one, ends ZOOM.
    pub fn remove_photo(&mut self, id: &str, now: Duration) -> Option<Transition> {
        let shown = self.driver.active_photo_id() == Some(id);
        if !self.photos.remove(id) {
            return None;
        }
        info!(remaining = self.photos.len(), "photo removed");
        let transition = self.machine.photo_removed(self.photos.len(), shown, now);
        if let Some(t) = &transition {
            self.log.record(t, self.photos.len());
        }
        transition
    }

    /// Computes transforms for this rendered frame.
    pub fn advance(&mut self, elapsed: f32, dt: f32) -> &FrameOutput {
        self.driver
            .advance(self.machine.mode(), &self.pose, &self.photos, elapsed, dt)
    }

    pub fn mode(&self) -> DisplayMode {
        self.machine.mode()
    }

    pub fn pose(&self) -> &HandPose {
        &self.pose
    }

    pub fn photos(&self) -> &PhotoCollection {
        &self.photos
    }

    pub fn driver(&self) -> &AnimationDriver {
        &self.driver
    }

    pub fn log(&self) -> &SessionLog {
        &self.log
    }

    pub fn status(&self) -> Status {
        Status {
            mode: self.machine.mode(),
            gesture: self.pose.gesture,
            photo_count: self.photos.len(),
            source_ready: self.source_ready,
            source_error: self.source_error.clone(),
        }
    }
}
