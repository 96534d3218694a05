// src/animation.rs
//
// The driver keeps a damped "current" value for every particle and photo and
// moves it toward a target picked from the display mode. Nothing snaps: new
// objects start at their tree target and everything else eases. Cosmetic
// jitter and spin are layered on top of the damped state when the frame is
// emitted and never fed back into it.

use std::collections::HashMap;

use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::Config;
use crate::damping::{damp, damp_euler, damp_vec3, rate, wrap_angle};
use crate::gesture::{GestureLabel, HandPose};
use crate::layout::{photo_slots, LayoutParams, ParticleLayout, ParticleShape, PhotoSlot};
use crate::mode::DisplayMode;
use crate::photos::PhotoCollection;

// particles
const PARTICLE_RATE_TREE: f32 = 12.0;
const PARTICLE_RATE_LOOSE: f32 = 2.0;
const JITTER_TREE: f32 = 0.02;
const JITTER_LOOSE: f32 = 0.2;
const PARTICLE_SPIN: [f32; 3] = [0.4, 0.7, 0.25];
const GROUP_TILT_GAIN: f32 = 0.5;
const GROUP_TILT_TIME: f32 = 0.5;
const GROUP_RELAX_TIME: f32 = 1.0;

// photos
const PHOTO_TIME_TREE: f32 = 0.15;
const PHOTO_TIME_LOOSE: f32 = 0.6;
const PHOTO_FADE_TIME: f32 = 0.4;
const DIMMED_OPACITY: f32 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationParams {
    pub photo_base_size: f32,
    pub zoom_magnification: f32,
    pub zoom_point: Vector3<f32>,
    pub tree_spin_speed: f32,
}

impl From<&Config> for AnimationParams {
    fn from(config: &Config) -> Self {
        Self {
            photo_base_size: config.photo_base_size,
            zoom_magnification: config.zoom_magnification,
            zoom_point: Vector3::from(config.zoom_point),
            tree_spin_speed: config.tree_spin_speed,
        }
    }
}

impl Default for AnimationParams {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

/// Position, Euler XYZ rotation (radians), scale and opacity of one object,
/// in its group's local space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vector3<f32>,
    pub rotation: Vector3<f32>,
    pub scale: Vector3<f32>,
    pub opacity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleFrame {
    pub transform: Transform,
    pub color: [f32; 3],
    pub shape: ParticleShape,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhotoFrame {
    pub id: String,
    pub transform: Transform,
    pub selected: bool,
}

/// Everything the renderer needs for one frame.
#[derive(Debug, Clone, Default)]
pub struct FrameOutput {
    pub mode: DisplayMode,
    pub particles: Vec<ParticleFrame>,
    pub particle_group_rotation: Vector3<f32>,
    pub photos: Vec<PhotoFrame>,
    pub photo_group_rotation: Vector3<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PhotoState {
    position: Vector3<f32>,
    rotation: Vector3<f32>,
    scale: Vector3<f32>,
    opacity: f32,
}

pub struct AnimationDriver {
    params: AnimationParams,
    layout_params: LayoutParams,
    layout: ParticleLayout,
    particle_positions: Vec<Vector3<f32>>,
    particle_group_rotation: Vector3<f32>,

    photo_generation: Option<u64>,
    photo_ids: Vec<String>,
    photo_aspects: Vec<f32>,
    photo_slots: Vec<PhotoSlot>,
    photo_states: Vec<PhotoState>,
    photo_group_rotation: Vector3<f32>,
    active_photo: Option<usize>,

    last_mode: DisplayMode,
    rng: StdRng,
    output: FrameOutput,
}

impl AnimationDriver {
    pub fn new(particle_count: usize, layout_params: LayoutParams, params: AnimationParams) -> Self {
        let layout = ParticleLayout::generate(particle_count, &layout_params);
        let particle_positions = layout.particles().iter().map(|p| p.tree_position).collect();

        Self {
            params,
            layout_params,
            layout,
            particle_positions,
            particle_group_rotation: Vector3::zeros(),
            photo_generation: None,
            photo_ids: Vec::new(),
            photo_aspects: Vec::new(),
            photo_slots: Vec::new(),
            photo_states: Vec::new(),
            photo_group_rotation: Vector3::zeros(),
            active_photo: None,
            last_mode: DisplayMode::Tree,
            rng: StdRng::seed_from_u64(layout_params.seed.wrapping_add(1)),
            output: FrameOutput::default(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.particle_count, LayoutParams::from(config), AnimationParams::from(config))
    }

    pub fn layout(&self) -> &ParticleLayout {
        &self.layout
    }

    /// Damped particle positions, without jitter.
    pub fn damped_positions(&self) -> &[Vector3<f32>] {
        &self.particle_positions
    }

    /// Index of the photo shown in ZOOM, if any.
    pub fn active_photo(&self) -> Option<usize> {
        self.active_photo
    }

    /// Id of the photo shown in ZOOM, as of the last `advance`.
    pub fn active_photo_id(&self) -> Option<&str> {
        self.active_photo
            .and_then(|i| self.photo_ids.get(i))
            .map(String::as_str)
    }

    /// Computes the next frame. `elapsed` is seconds since start and `dt`
    /// the seconds since the previous call; `pose` may be stale.
    pub fn advance(
        &mut self,
        mode: DisplayMode,
        pose: &HandPose,
        photos: &PhotoCollection,
        elapsed: f32,
        dt: f32,
    ) -> &FrameOutput {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };

        self.sync_photos(photos);
        self.track_mode(mode);

        self.output.mode = mode;
        self.step_particles(mode, pose, elapsed, dt);
        self.step_photos(mode, dt);

        &self.output
    }

    fn track_mode(&mut self, mode: DisplayMode) {
        if mode == self.last_mode {
            return;
        }
        if mode == DisplayMode::Zoom {
            self.active_photo = if self.photo_states.is_empty() {
                None
            } else {
                Some(self.rng.gen_range(0..self.photo_states.len()))
            };
        } else if self.last_mode == DisplayMode::Zoom {
            self.active_photo = None;
        }
        self.last_mode = mode;
    }

    fn sync_photos(&mut self, photos: &PhotoCollection) {
        if self.photo_generation == Some(photos.generation()) {
            return;
        }
        self.photo_generation = Some(photos.generation());

        let active_id = self.active_photo.and_then(|i| self.photo_ids.get(i).cloned());
        let mut previous: HashMap<String, PhotoState> = self
            .photo_ids
            .drain(..)
            .zip(self.photo_states.drain(..))
            .collect();

        self.photo_slots = photo_slots(photos.len(), &self.layout_params);
        self.photo_aspects = photos.items().iter().map(|p| p.aspect_ratio).collect();
        self.photo_ids = photos.items().iter().map(|p| p.id.clone()).collect();

        let base = self.params.photo_base_size;
        self.photo_states = photos
            .items()
            .iter()
            .zip(&self.photo_slots)
            .map(|(photo, slot)| {
                previous.remove(&photo.id).unwrap_or(PhotoState {
                    position: slot.tree_position,
                    rotation: slot.base_rotation,
                    scale: Vector3::new(base * photo.aspect_ratio, base, 1.0),
                    opacity: 1.0,
                })
            })
            .collect();

        self.active_photo = active_id.and_then(|id| self.photo_ids.iter().position(|p| *p == id));
    }

    fn step_particles(&mut self, mode: DisplayMode, pose: &HandPose, elapsed: f32, dt: f32) {
        let tree = mode == DisplayMode::Tree;
        let lambda = if tree { PARTICLE_RATE_TREE } else { PARTICLE_RATE_LOOSE };
        let amplitude = if tree { JITTER_TREE } else { JITTER_LOOSE };
        let spin = Vector3::from(PARTICLE_SPIN) * elapsed;

        self.output.particles.clear();
        for (i, (seed, current)) in self
            .layout
            .particles()
            .iter()
            .zip(self.particle_positions.iter_mut())
            .enumerate()
        {
            let target = if tree { &seed.tree_position } else { &seed.scatter_position };
            *current = damp_vec3(current, target, lambda, dt);

            self.output.particles.push(ParticleFrame {
                transform: Transform {
                    position: *current + jitter(i, elapsed) * amplitude,
                    rotation: seed.base_rotation + spin,
                    scale: Vector3::repeat(1.0),
                    opacity: 1.0,
                },
                color: seed.color,
                shape: seed.shape,
            });
        }

        let (target, time) = if mode == DisplayMode::Scattered && pose.gesture == GestureLabel::OpenHand {
            (
                Vector3::new(pose.tilt_y * GROUP_TILT_GAIN, pose.tilt_x * GROUP_TILT_GAIN, 0.0),
                GROUP_TILT_TIME,
            )
        } else {
            (Vector3::zeros(), GROUP_RELAX_TIME)
        };
        self.particle_group_rotation = damp_euler(&self.particle_group_rotation, &target, rate(time), dt);
        self.output.particle_group_rotation = self.particle_group_rotation;
    }

    fn step_photos(&mut self, mode: DisplayMode, dt: f32) {
        let p = self.params;
        let lambda = rate(if mode == DisplayMode::Tree { PHOTO_TIME_TREE } else { PHOTO_TIME_LOOSE });
        let fade = rate(PHOTO_FADE_TIME);
        let zooming = mode == DisplayMode::Zoom;

        self.output.photos.clear();
        for (k, state) in self.photo_states.iter_mut().enumerate() {
            let slot = &self.photo_slots[k];
            let aspect = self.photo_aspects[k];
            let selected = zooming && self.active_photo == Some(k);

            let (position, rotation, size) = if selected {
                (p.zoom_point, Vector3::zeros(), p.photo_base_size * p.zoom_magnification)
            } else if mode == DisplayMode::Tree {
                (slot.tree_position, slot.base_rotation, p.photo_base_size)
            } else {
                (slot.scatter_position, slot.base_rotation, p.photo_base_size)
            };
            let opacity = if zooming && !selected { DIMMED_OPACITY } else { 1.0 };

            state.position = damp_vec3(&state.position, &position, lambda, dt);
            state.rotation = damp_euler(&state.rotation, &rotation, lambda, dt);
            state.scale = damp_vec3(&state.scale, &Vector3::new(size * aspect, size, 1.0), lambda, dt);
            state.opacity = damp(state.opacity, opacity, fade, dt);

            self.output.photos.push(PhotoFrame {
                id: self.photo_ids[k].clone(),
                transform: Transform {
                    position: state.position,
                    rotation: state.rotation,
                    scale: state.scale,
                    opacity: state.opacity,
                },
                selected,
            });
        }

        if mode == DisplayMode::Tree {
            let spun = self.photo_group_rotation.y + p.tree_spin_speed * dt;
            let settled = damp_euler(&self.photo_group_rotation, &Vector3::zeros(), rate(GROUP_RELAX_TIME), dt);
            self.photo_group_rotation = Vector3::new(settled.x, wrap_angle(spun), settled.z);
        } else {
            self.photo_group_rotation =
                damp_euler(&self.photo_group_rotation, &Vector3::zeros(), rate(GROUP_RELAX_TIME), dt);
        }
        self.output.photo_group_rotation = self.photo_group_rotation;
    }
}

/// Unit-amplitude wobble, different per particle.
fn jitter(index: usize, elapsed: f32) -> Vector3<f32> {
    let i = index as f32;
    Vector3::new(
        (elapsed * 1.3 + i * 0.37).sin(),
        (elapsed * 1.1 + i * 0.61).cos(),
        (elapsed * 0.9 + i * 0.89).sin(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::photos::PhotoItem;
    use image::{DynamicImage, RgbaImage};

    const FRAME: f32 = 1.0 / 60.0;

    fn driver(count: usize) -> AnimationDriver {
        AnimationDriver::new(count, LayoutParams::default(), AnimationParams::default())
    }

    fn photos(count: usize) -> PhotoCollection {
        let mut collection = PhotoCollection::new();
        collection.add((0..count).map(|_| {
            PhotoItem::from_image(DynamicImage::ImageRgba8(RgbaImage::new(20, 10))).unwrap()
        }));
        collection
    }

    fn run(
        driver: &mut AnimationDriver,
        mode: DisplayMode,
        pose: &HandPose,
        photos: &PhotoCollection,
        seconds: f32,
        dt: f32,
    ) -> FrameOutput {
        let steps = (seconds / dt).round() as usize;
        let mut out = FrameOutput::default();
        for n in 0..steps {
            out = driver.advance(mode, pose, photos, n as f32 * dt, dt).clone();
        }
        out
    }

    #[test]
    fn test_particles_start_on_tree() {
        let mut d = driver(50);
        let none = PhotoCollection::new();
        let out = d.advance(DisplayMode::Tree, &HandPose::NEUTRAL, &none, 0.0, 0.0).clone();
        for (frame, seed) in out.particles.iter().zip(d.layout().particles()) {
            assert!((frame.transform.position - seed.tree_position).norm() <= JITTER_TREE * 2.0);
        }
    }

    #[test]
    fn test_jitter_does_not_accumulate() {
        let mut d = driver(20);
        let none = PhotoCollection::new();
        let before = d.damped_positions().to_vec();
        for n in 0..100 {
            d.advance(DisplayMode::Scattered, &HandPose::NEUTRAL, &none, n as f32 * 0.37, 0.0);
        }
        assert_eq!(d.damped_positions(), &before[..]);
    }

    #[test]
    fn test_scatter_converges() {
        let mut d = driver(30);
        let none = PhotoCollection::new();
        run(&mut d, DisplayMode::Scattered, &HandPose::NEUTRAL, &none, 8.0, FRAME);
        for (pos, seed) in d.damped_positions().iter().zip(d.layout().particles()) {
            assert!((pos - seed.scatter_position).norm() < 1e-3 * seed.scatter_position.norm().max(1.0) + 1e-3);
        }
    }

    #[test]
    fn test_tree_assembles_faster_than_scatter() {
        let none = PhotoCollection::new();
        let mut d = driver(10);
        run(&mut d, DisplayMode::Scattered, &HandPose::NEUTRAL, &none, 10.0, FRAME);
        run(&mut d, DisplayMode::Tree, &HandPose::NEUTRAL, &none, 0.25, FRAME);
        let seed = &d.layout().particles()[3];
        let remaining = (d.damped_positions()[3] - seed.tree_position).norm();
        let start = (seed.scatter_position - seed.tree_position).norm();
        // rate 12 for 0.25s leaves e^-3 of the distance
        assert!(remaining < start * 0.06);
    }

    #[test]
    fn test_frame_rate_independent() {
        let none = PhotoCollection::new();
        let mut a = driver(25);
        let mut b = driver(25);
        run(&mut a, DisplayMode::Scattered, &HandPose::NEUTRAL, &none, 1.0, 1.0 / 120.0);
        run(&mut b, DisplayMode::Scattered, &HandPose::NEUTRAL, &none, 1.0, 1.0 / 30.0);
        for (pa, pb) in a.damped_positions().iter().zip(b.damped_positions()) {
            assert!((pa - pb).norm() < 1e-3);
        }
    }

    #[test]
    fn test_open_hand_tilts_scattered_group() {
        let none = PhotoCollection::new();
        let pose = HandPose {
            gesture: GestureLabel::OpenHand,
            x: 0.5,
            y: 0.5,
            tilt_x: 1.0,
            tilt_y: -0.4,
        };
        let mut d = driver(5);
        let out = run(&mut d, DisplayMode::Scattered, &pose, &none, 6.0, FRAME);
        assert!((out.particle_group_rotation - Vector3::new(-0.2, 0.5, 0.0)).norm() < 1e-3);

        // the same hand in TREE mode relaxes back to rest
        let out = run(&mut d, DisplayMode::Tree, &pose, &none, 12.0, FRAME);
        assert!(out.particle_group_rotation.norm() < 1e-3);
    }

    #[test]
    fn test_new_photos_start_on_tree_slot() {
        let mut d = driver(0);
        let set = photos(3);
        let out = d.advance(DisplayMode::Tree, &HandPose::NEUTRAL, &set, 0.0, 0.0).clone();
        let slots = photo_slots(3, &LayoutParams::default());
        assert_eq!(out.photos.len(), 3);
        for (frame, slot) in out.photos.iter().zip(&slots) {
            assert_eq!(frame.transform.position, slot.tree_position);
            assert_eq!(frame.transform.opacity, 1.0);
            let base = AnimationParams::default().photo_base_size;
            assert!((frame.transform.scale.x - base * 2.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_zoom_selects_and_dims() {
        let mut d = driver(0);
        let set = photos(4);
        let params = AnimationParams::default();
        run(&mut d, DisplayMode::Scattered, &HandPose::NEUTRAL, &set, 1.0, FRAME);
        let out = run(&mut d, DisplayMode::Zoom, &HandPose::NEUTRAL, &set, 6.0, FRAME);

        let active = d.active_photo().expect("zoom picks a photo");
        assert!(active < 4);
        for (k, frame) in out.photos.iter().enumerate() {
            if k == active {
                assert!(frame.selected);
                assert!((frame.transform.position - params.zoom_point).norm() < 1e-2);
                assert!((frame.transform.opacity - 1.0).abs() < 1e-3);
                let size = params.photo_base_size * params.zoom_magnification;
                assert!((frame.transform.scale.y - size).abs() < 1e-2);
                assert!((frame.transform.scale.x - size * 2.0).abs() < 1e-2);
            } else {
                assert!(!frame.selected);
                assert!((frame.transform.opacity - DIMMED_OPACITY).abs() < 1e-3);
            }
        }

        let out = run(&mut d, DisplayMode::Scattered, &HandPose::NEUTRAL, &set, 6.0, FRAME);
        assert_eq!(d.active_photo(), None);
        assert!(out.photos.iter().all(|p| (p.transform.opacity - 1.0).abs() < 1e-3));
    }

    #[test]
    fn test_zoom_without_photos_selects_nothing() {
        let mut d = driver(0);
        let none = PhotoCollection::new();
        d.advance(DisplayMode::Zoom, &HandPose::NEUTRAL, &none, 0.0, FRAME);
        assert_eq!(d.active_photo(), None);
    }

    #[test]
    fn test_selection_follows_photo_set_changes() {
        let mut d = driver(0);
        let mut set = photos(2);
        d.advance(DisplayMode::Zoom, &HandPose::NEUTRAL, &set, 0.0, FRAME);
        let active = d.active_photo().unwrap();
        let active_id = set.items()[active].id.clone();

        let other = set.items()[1 - active].id.clone();
        set.remove(&other);
        d.advance(DisplayMode::Zoom, &HandPose::NEUTRAL, &set, 0.1, FRAME);
        assert_eq!(d.active_photo(), Some(0));
        assert_eq!(set.items()[0].id, active_id);

        set.clear();
        let out = d.advance(DisplayMode::Zoom, &HandPose::NEUTRAL, &set, 0.2, FRAME).clone();
        assert_eq!(d.active_photo(), None);
        assert!(out.photos.is_empty());
    }

    #[test]
    fn test_photo_group_spins_only_in_tree() {
        let mut d = driver(0);
        let set = photos(1);
        let out = run(&mut d, DisplayMode::Tree, &HandPose::NEUTRAL, &set, 2.0, FRAME);
        let expected = AnimationParams::default().tree_spin_speed * 2.0;
        assert!((out.photo_group_rotation.y - expected).abs() < 1e-3);

        let out = run(&mut d, DisplayMode::Scattered, &HandPose::NEUTRAL, &set, 12.0, FRAME);
        assert!(out.photo_group_rotation.norm() < 1e-3);
    }

    #[test]
    fn test_photo_time_constant_per_mode() {
        let mut d = driver(0);
        let set = photos(1);
        let slot = photo_slots(1, &LayoutParams::default()).remove(0);
        let dt = 0.1;

        // a fresh photo sits on its tree slot; one loose step keeps e^(-dt/0.6)
        d.advance(DisplayMode::Tree, &HandPose::NEUTRAL, &set, 0.0, 0.0);
        let out = d.advance(DisplayMode::Scattered, &HandPose::NEUTRAL, &set, 0.0, dt).clone();
        let start = (slot.tree_position - slot.scatter_position).norm();
        let left = (out.photos[0].transform.position - slot.scatter_position).norm();
        assert!((left / start - (-dt / 0.6f32).exp()).abs() < 1e-4);

        // heading back to the tree is four times quicker: e^(-dt/0.15)
        let before = out.photos[0].transform.position;
        let out = d.advance(DisplayMode::Tree, &HandPose::NEUTRAL, &set, dt, dt).clone();
        let start = (before - slot.tree_position).norm();
        let left = (out.photos[0].transform.position - slot.tree_position).norm();
        assert!((left / start - (-dt / 0.15f32).exp()).abs() < 1e-4);
    }

    #[test]
    fn test_dimming_time_constant() {
        let mut d = driver(0);
        let set = photos(2);
        let dt = 0.1;
        let out = d.advance(DisplayMode::Zoom, &HandPose::NEUTRAL, &set, 0.0, dt).clone();
        let active = d.active_photo().unwrap();

        let expected = 0.15 + 0.85 * (-dt / 0.4f32).exp();
        for (k, frame) in out.photos.iter().enumerate() {
            if k == active {
                assert_eq!(frame.transform.opacity, 1.0);
            } else {
                assert!((frame.transform.opacity - expected).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn test_jitter_amplitude_per_mode() {
        let none = PhotoCollection::new();
        let offsets = |out: &FrameOutput, damped: &[Vector3<f32>]| -> Vec<f32> {
            out.particles
                .iter()
                .zip(damped)
                .map(|(p, at)| (p.transform.position - at).norm())
                .collect()
        };

        let mut d = driver(200);
        let out = run(&mut d, DisplayMode::Scattered, &HandPose::NEUTRAL, &none, 3.0, FRAME);
        let loose = offsets(&out, d.damped_positions());
        assert!(loose.iter().all(|o| *o <= 0.2 * 3f32.sqrt() + 1e-5));
        assert!(loose.iter().cloned().fold(0.0, f32::max) > 0.02 * 3f32.sqrt());

        let out = run(&mut d, DisplayMode::Tree, &HandPose::NEUTRAL, &none, 1.0, FRAME);
        let tight = offsets(&out, d.damped_positions());
        assert!(tight.iter().all(|o| *o <= 0.02 * 3f32.sqrt() + 1e-5));
    }

    #[test]
    fn test_negative_dt_is_ignored() {
        let mut d = driver(5);
        let none = PhotoCollection::new();
        let before = d.damped_positions().to_vec();
        d.advance(DisplayMode::Scattered, &HandPose::NEUTRAL, &none, 1.0, -0.5);
        d.advance(DisplayMode::Scattered, &HandPose::NEUTRAL, &none, 1.0, f32::NAN);
        assert_eq!(d.damped_positions(), &before[..]);
    }
}
