// src/layout.rs
use std::f32::consts::{FRAC_PI_2, TAU};

use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::Config;

/// Golden angle in radians, spreads photos evenly around the spiral.
const GOLDEN_ANGLE: f32 = 2.399_963;
const SPIRAL_TURNS: f32 = 9.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutParams {
    pub tree_height: f32,
    pub tree_radius: f32,
    pub scatter_radius: f32,
    pub photo_offset: f32,
    pub seed: u64,
}

impl From<&Config> for LayoutParams {
    fn from(config: &Config) -> Self {
        Self {
            tree_height: config.tree_height,
            tree_radius: config.tree_radius,
            scatter_radius: config.scatter_radius,
            photo_offset: config.photo_offset,
            seed: config.layout_seed,
        }
    }
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticleShape {
    Orb,
    Cube,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParticleSeed {
    pub tree_position: Vector3<f32>,
    pub scatter_position: Vector3<f32>,
    pub base_rotation: Vector3<f32>,
    /// Linear RGB, 0..1.
    pub color: [f32; 3],
    pub shape: ParticleShape,
}

/// Static particle placement for the whole session.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleLayout {
    particles: Vec<ParticleSeed>,
}

const PALETTE: [[f32; 3]; 5] = [
    [0.10, 0.60, 0.25],
    [0.05, 0.42, 0.18],
    [1.00, 0.80, 0.30],
    [0.85, 0.10, 0.15],
    [1.00, 0.95, 0.85],
];

impl ParticleLayout {
    /// Cone spiral for the tree, uniform ball for the scatter cloud.
    /// Same `count` and params always give the same layout.
    pub fn generate(count: usize, params: &LayoutParams) -> Self {
        let mut rng = StdRng::seed_from_u64(params.seed);
        let particles = (0..count)
            .map(|i| {
                let t = i as f32 / count.max(1) as f32;
                let radius = params.tree_radius * (1.0 - t) + rng.gen_range(-0.3..0.3);
                let angle = t * SPIRAL_TURNS * TAU + rng.gen_range(-0.2..0.2);
                let y = -params.tree_height / 2.0 + t * params.tree_height + rng.gen_range(-0.15..0.15);

                ParticleSeed {
                    tree_position: Vector3::new(radius * angle.cos(), y, radius * angle.sin()),
                    scatter_position: point_in_ball(&mut rng, params.scatter_radius),
                    base_rotation: Vector3::new(
                        rng.gen_range(0.0..TAU),
                        rng.gen_range(0.0..TAU),
                        rng.gen_range(0.0..TAU),
                    ),
                    color: PALETTE[rng.gen_range(0..PALETTE.len())],
                    shape: if rng.gen_bool(0.7) { ParticleShape::Orb } else { ParticleShape::Cube },
                }
            })
            .collect();

        Self { particles }
    }

    pub fn particles(&self) -> &[ParticleSeed] {
        &self.particles
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhotoSlot {
    pub tree_position: Vector3<f32>,
    pub scatter_position: Vector3<f32>,
    /// Faces outward from the trunk.
    pub base_rotation: Vector3<f32>,
}

/// Places `count` photos on a spiral just outside the particle cone, plus a
/// scatter position each. Recomputed whenever the photo set changes.
pub fn photo_slots(count: usize, params: &LayoutParams) -> Vec<PhotoSlot> {
    let mut rng = StdRng::seed_from_u64(params.seed ^ (count as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    let band = params.tree_height * 0.85;

    (0..count)
        .map(|k| {
            let t = (k as f32 + 0.5) / count as f32;
            let radius = params.tree_radius * (1.0 - t) + params.photo_offset;
            let angle = k as f32 * GOLDEN_ANGLE;
            let y = -band / 2.0 + t * band;

            PhotoSlot {
                tree_position: Vector3::new(radius * angle.cos(), y, radius * angle.sin()),
                scatter_position: point_in_ball(&mut rng, params.scatter_radius * 0.7),
                base_rotation: Vector3::new(0.0, FRAC_PI_2 - angle, rng.gen_range(-0.15..0.15)),
            }
        })
        .collect()
}

fn point_in_ball(rng: &mut StdRng, radius: f32) -> Vector3<f32> {
    loop {
        let p = Vector3::new(
            rng.gen_range(-1.0f32..1.0),
            rng.gen_range(-1.0f32..1.0),
            rng.gen_range(-1.0f32..1.0),
        );
        if p.norm_squared() <= 1.0 {
            return p * radius;
        }
    }
}
