// src/lib.rs
//
// Hand landmarks are classified into a `HandPose`, the pose drives the
// `ModeMachine` between tree, scattered and zoom layouts, and the
// `AnimationDriver` eases every particle and photo toward its target.

pub mod animation;
#[cfg(feature = "camera")]
pub mod camera;
pub mod config;
pub mod damping;
pub mod error;
pub mod experience;
pub mod gesture;
pub mod landmarks;
pub mod layout;
pub mod mode;
pub mod photos;
pub mod session;

pub use animation::{AnimationDriver, FrameOutput, ParticleFrame, PhotoFrame, Transform};
pub use config::{Config, SourceConfig};
pub use error::{Error, Result};
pub use experience::{Experience, Status};
pub use gesture::{classify, GestureLabel, GestureThresholds, HandPose};
pub use landmarks::{HandFrame, Landmark, LandmarkFeed, LandmarkSource, SourceEvent};
pub use mode::{DisplayMode, ModeMachine, Transition, TransitionCause};
pub use photos::{PhotoCollection, PhotoItem, PhotoLoader};
pub use session::SessionLog;
