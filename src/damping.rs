// src/damping.rs
//
// damp(current, target, λ, dt) = target + (current - target)·e^(-λ·dt)
// Two steps of dt/2 land exactly where one step of dt does, so the motion
// looks the same at any refresh rate.

use std::f32::consts::{PI, TAU};

use nalgebra::Vector3;

/// Decay rate for a time constant in seconds.
pub fn rate(time_constant: f32) -> f32 {
    if time_constant <= 0.0 {
        f32::INFINITY
    } else {
        1.0 / time_constant
    }
}

/// Fraction of the remaining distance still left after `dt` seconds.
fn retained(lambda: f32, dt: f32) -> f32 {
    (-lambda * dt).exp()
}

/// A non-positive `dt` leaves `current` untouched.
pub fn damp(current: f32, target: f32, lambda: f32, dt: f32) -> f32 {
    if dt <= 0.0 {
        return current;
    }
    target + (current - target) * retained(lambda, dt)
}

pub fn damp_vec3(current: &Vector3<f32>, target: &Vector3<f32>, lambda: f32, dt: f32) -> Vector3<f32> {
    if dt <= 0.0 {
        return *current;
    }
    target + (current - target) * retained(lambda, dt)
}

/// Wraps an angle into (-π, π].
pub fn wrap_angle(angle: f32) -> f32 {
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}

/// Damps Euler angles along the shortest way round on each axis.
pub fn damp_euler(current: &Vector3<f32>, target: &Vector3<f32>, lambda: f32, dt: f32) -> Vector3<f32> {
    if dt <= 0.0 {
        return *current;
    }
    let keep = retained(lambda, dt);
    Vector3::from_fn(|i, _| {
        let delta = wrap_angle(current[i] - target[i]);
        target[i] + delta * keep
    })
}
