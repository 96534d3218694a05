// src/mode.rs
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::gesture::GestureLabel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisplayMode {
    #[default]
    Tree,
    Scattered,
    Zoom,
}

impl DisplayMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayMode::Tree => "TREE",
            DisplayMode::Scattered => "SCATTERED",
            DisplayMode::Zoom => "ZOOM",
        }
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionCause {
    Gesture(GestureLabel),
    PhotosAdded,
    PhotoRemoved,
}

impl fmt::Display for TransitionCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionCause::Gesture(g) => write!(f, "{}", g),
            TransitionCause::PhotosAdded => f.write_str("PHOTOS_ADDED"),
            TransitionCause::PhotoRemoved => f.write_str("PHOTO_REMOVED"),
        }
    }
}

/// An accepted mode change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: DisplayMode,
    pub to: DisplayMode,
    /// Session time the change was accepted at.
    pub at: Duration,
    pub cause: TransitionCause,
}

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Owns the display mode and the time of the last accepted transition.
///
/// FIST returns to the tree immediately. Every other change must come at
/// least `debounce` after the previous one, which keeps per-frame
/// classification noise from flickering the mode. Times are measured from
/// session start and the clock never moves backwards.
#[derive(Debug, Clone)]
pub struct ModeMachine {
    mode: DisplayMode,
    last_transition: Duration,
    debounce: Duration,
}

impl ModeMachine {
    pub fn new(debounce: Duration) -> Self {
        Self {
            mode: DisplayMode::Tree,
            last_transition: Duration::ZERO,
            debounce,
        }
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    pub fn last_transition(&self) -> Duration {
        self.last_transition
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Applies one classified gesture. At most one rule fires per call.
    pub fn handle(&mut self, gesture: GestureLabel, photo_count: usize, now: Duration) -> Option<Transition> {
        if gesture == GestureLabel::Fist && self.mode != DisplayMode::Tree {
            return Some(self.transition(DisplayMode::Tree, now, TransitionCause::Gesture(gesture)));
        }

        if now.saturating_sub(self.last_transition) < self.debounce {
            if gesture != GestureLabel::None {
                debug!(%gesture, mode = %self.mode, "gesture inside debounce window");
            }
            return None;
        }

        let next = match (gesture, self.mode) {
            (GestureLabel::OpenHand, DisplayMode::Tree) => DisplayMode::Scattered,
            (GestureLabel::Pinch, DisplayMode::Scattered) if photo_count > 0 => DisplayMode::Zoom,
            (GestureLabel::OpenHand, DisplayMode::Zoom) => DisplayMode::Scattered,
            _ => return None,
        };
        Some(self.transition(next, now, TransitionCause::Gesture(gesture)))
    }

    /// Uploading photos while the tree is assembled scatters it so the new
    /// photos are visible. Not subject to the debounce.
    pub fn photos_added(&mut self, added: usize, now: Duration) -> Option<Transition> {
        if added == 0 || self.mode != DisplayMode::Tree {
            return None;
        }
        Some(self.transition(DisplayMode::Scattered, now, TransitionCause::PhotosAdded))
    }

    /// ZOOM needs a photo on show. Losing the shown photo, or the last one,
    /// drops back to SCATTERED without waiting for the debounce.
    pub fn photo_removed(&mut self, remaining: usize, lost_selection: bool, now: Duration) -> Option<Transition> {
        if self.mode != DisplayMode::Zoom || (remaining > 0 && !lost_selection) {
            return None;
        }
        Some(self.transition(DisplayMode::Scattered, now, TransitionCause::PhotoRemoved))
    }

    fn transition(&mut self, to: DisplayMode, now: Duration, cause: TransitionCause) -> Transition {
        let from = self.mode;
        self.mode = to;
        self.last_transition = self.last_transition.max(now);
        info!(%from, %to, %cause, at_ms = self.last_transition.as_millis() as u64, "mode transition");
        Transition {
            from,
            to,
            at: self.last_transition,
            cause,
        }
    }
}

impl Default for ModeMachine {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}
