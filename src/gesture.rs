// src/gesture.rs
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::landmarks::{index, HandFrame, Landmark};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GestureLabel {
    #[default]
    None,
    Fist,
    OpenHand,
    Pinch,
}

impl GestureLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            GestureLabel::None => "NONE",
            GestureLabel::Fist => "FIST",
            GestureLabel::OpenHand => "OPEN_HAND",
            GestureLabel::Pinch => "PINCH",
        }
    }
}

impl fmt::Display for GestureLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Classified hand for one frame.
///
/// `x`/`y` is the palm center in normalized screen space, mirrored on `x` to
/// match the mirrored camera view. `tilt_x`/`tilt_y` are unnormalized drive
/// signals, not angles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HandPose {
    pub gesture: GestureLabel,
    pub x: f32,
    pub y: f32,
    pub tilt_x: f32,
    pub tilt_y: f32,
}

impl HandPose {
    /// No hand: screen center, no tilt.
    pub const NEUTRAL: HandPose = HandPose {
        gesture: GestureLabel::None,
        x: 0.5,
        y: 0.5,
        tilt_x: 0.0,
        tilt_y: 0.0,
    };

    pub fn with_gesture(gesture: GestureLabel) -> Self {
        Self { gesture, ..Self::NEUTRAL }
    }
}

impl Default for HandPose {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

/// Distance thresholds. These are empirically tuned; keep the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureThresholds {
    /// World space, meters.
    pub fist_3d: f32,
    pub pinch_3d: f32,
    pub open_3d: f32,
    /// Normalized screen space.
    pub fist_2d: f32,
    pub pinch_2d: f32,
    pub open_2d: f32,
}

impl Default for GestureThresholds {
    fn default() -> Self {
        Self {
            fist_3d: 0.085,
            pinch_3d: 0.035,
            open_3d: 0.11,
            fist_2d: 0.3,
            pinch_2d: 0.05,
            open_2d: 0.4,
        }
    }
}

const TILT_X_GAIN: f32 = 10.0;
const TILT_Y_GAIN: f32 = 5.0;

/// Classifies one frame. Pure: same input, same output.
///
/// Rules are checked in order FIST, PINCH, OPEN_HAND; an ambiguous hand is
/// `None`. World landmarks are preferred; without them the screen landmarks
/// are used with their own thresholds.
pub fn classify(frame: Option<&HandFrame>, thresholds: &GestureThresholds) -> HandPose {
    let Some(frame) = frame.filter(|f| f.has_screen()) else {
        return HandPose::NEUTRAL;
    };
    let screen = &frame.screen;

    let wrist = screen[index::WRIST];
    let index_base = screen[index::INDEX_MCP];
    let pinky_base = screen[index::PINKY_MCP];

    let palm_x = (wrist.x + index_base.x + pinky_base.x) / 3.0;
    let palm_y = (wrist.y + index_base.y + pinky_base.y) / 3.0;

    let gesture = match frame.world_points() {
        Some(world) => {
            let fist = mean_fingertip_distance(world, Landmark::distance_3d);
            let pinch = world[index::THUMB_TIP].distance_3d(&world[index::INDEX_TIP]);
            decide(fist, pinch, thresholds.fist_3d, thresholds.pinch_3d, thresholds.open_3d)
        }
        None => {
            let fist = mean_fingertip_distance(screen, Landmark::distance_2d);
            let pinch = screen[index::THUMB_TIP].distance_2d(&screen[index::INDEX_TIP]);
            decide(fist, pinch, thresholds.fist_2d, thresholds.pinch_2d, thresholds.open_2d)
        }
    };

    let pose = HandPose {
        gesture,
        x: 1.0 - palm_x,
        y: palm_y,
        tilt_x: (index_base.x - pinky_base.x) * TILT_X_GAIN,
        tilt_y: (wrist.y - index_base.y) * TILT_Y_GAIN,
    };

    if pose.x.is_finite() && pose.y.is_finite() && pose.tilt_x.is_finite() && pose.tilt_y.is_finite() {
        pose
    } else {
        HandPose::NEUTRAL
    }
}

fn mean_fingertip_distance(points: &[Landmark], distance: fn(&Landmark, &Landmark) -> f32) -> f32 {
    let wrist = &points[index::WRIST];
    let total: f32 = index::FINGERTIPS
        .iter()
        .map(|&tip| distance(&points[tip], wrist))
        .sum();
    total / index::FINGERTIPS.len() as f32
}

fn decide(fist_dist: f32, pinch_dist: f32, fist: f32, pinch: f32, open: f32) -> GestureLabel {
    if fist_dist < fist {
        GestureLabel::Fist
    } else if pinch_dist < pinch {
        GestureLabel::Pinch
    } else if fist_dist > open {
        GestureLabel::OpenHand
    } else {
        GestureLabel::None
    }
}
