// src/ui.rs - theme, projection and scene painting
use std::collections::HashMap;

use eframe::egui::{self, epaint::Vertex, Color32, Mesh, Pos2, Rect, Stroke, TextureHandle, Vec2};
use nalgebra::{Rotation3, Vector3};

use tree_lights::animation::{FrameOutput, Transform};
use tree_lights::layout::ParticleShape;
use tree_lights::{DisplayMode, GestureLabel, Status};

const FIELD_OF_VIEW: f32 = 50.0;
const NEAR_PLANE: f32 = 0.5;
const ORB_RADIUS: f32 = 0.09;
const CUBE_HALF: f32 = 0.08;

#[derive(Debug, Clone)]
pub struct Theme {
    pub primary: Color32,
    pub background: Color32,
    pub surface: Color32,
    pub error: Color32,
    pub warning: Color32,
    pub success: Color32,
    pub text_primary: Color32,
    pub text_secondary: Color32,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary: Color32::from_rgb(255, 196, 87),
            background: Color32::from_rgb(8, 12, 20),
            surface: Color32::from_rgb(24, 30, 40),
            error: Color32::from_rgb(244, 67, 54),
            warning: Color32::from_rgb(255, 152, 0),
            success: Color32::from_rgb(76, 175, 80),
            text_primary: Color32::WHITE,
            text_secondary: Color32::from_rgb(190, 195, 205),
        }
    }
}

impl Theme {
    pub fn mode_color(&self, mode: DisplayMode) -> Color32 {
        match mode {
            DisplayMode::Tree => self.success,
            DisplayMode::Scattered => self.primary,
            DisplayMode::Zoom => self.warning,
        }
    }

    pub fn gesture_color(&self, gesture: GestureLabel) -> Color32 {
        match gesture {
            GestureLabel::Fist => self.success,
            GestureLabel::OpenHand => self.primary,
            GestureLabel::Pinch => self.warning,
            GestureLabel::None => self.text_secondary,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projected {
    pub pos: Pos2,
    pub depth: f32,
    /// Screen pixels per world unit at this depth.
    pub scale: f32,
}

/// Pinhole camera on the +z axis looking at the origin.
#[derive(Debug, Clone, Copy)]
pub struct Projector {
    center: Pos2,
    focal: f32,
    distance: f32,
}

impl Projector {
    pub fn new(viewport: Rect, camera_distance: f32) -> Self {
        let focal = viewport.height() * 0.5 / (FIELD_OF_VIEW.to_radians() * 0.5).tan();
        Self {
            center: viewport.center(),
            focal,
            distance: camera_distance,
        }
    }

    pub fn project(&self, point: &Vector3<f32>) -> Option<Projected> {
        let depth = self.distance - point.z;
        if depth <= NEAR_PLANE || !depth.is_finite() {
            return None;
        }
        let scale = self.focal / depth;
        Some(Projected {
            pos: Pos2::new(self.center.x + point.x * scale, self.center.y - point.y * scale),
            depth,
            scale,
        })
    }
}

pub fn euler(rotation: &Vector3<f32>) -> Rotation3<f32> {
    Rotation3::from_euler_angles(rotation.x, rotation.y, rotation.z)
}

fn to_color(rgb: [f32; 3], opacity: f32) -> Color32 {
    let c = |v: f32| (v.clamp(0.0, 1.0) * 255.0) as u8;
    Color32::from_rgb(c(rgb[0]), c(rgb[1]), c(rgb[2])).gamma_multiply(opacity.clamp(0.0, 1.0))
}

/// Corners of a unit quad after scale, rotation, translation and the group
/// rotation, in the order top-left, top-right, bottom-right, bottom-left.
pub fn photo_corners(transform: &Transform, group: &Rotation3<f32>) -> [Vector3<f32>; 4] {
    let local = euler(&transform.rotation);
    [(-0.5, 0.5), (0.5, 0.5), (0.5, -0.5), (-0.5, -0.5)].map(|(x, y)| {
        let corner = Vector3::new(x * transform.scale.x, y * transform.scale.y, 0.0);
        group * (local * corner + transform.position)
    })
}

enum Draw<'a> {
    Orb { at: Projected, color: Color32 },
    Cube { at: Projected, color: Color32 },
    Photo { corners: [Projected; 4], texture: Option<&'a TextureHandle>, tint: Color32, selected: bool },
}

/// Paints particles and photos back to front.
pub fn paint_scene(
    painter: &egui::Painter,
    projector: &Projector,
    frame: &FrameOutput,
    textures: &HashMap<String, TextureHandle>,
    theme: &Theme,
) {
    let particle_group = euler(&frame.particle_group_rotation);
    let photo_group = euler(&frame.photo_group_rotation);
    let mut draws: Vec<(f32, Draw)> = Vec::with_capacity(frame.particles.len() + frame.photos.len());

    for particle in &frame.particles {
        let world = particle_group * particle.transform.position;
        let Some(at) = projector.project(&world) else { continue };
        let color = to_color(particle.color, particle.transform.opacity);
        let draw = match particle.shape {
            ParticleShape::Orb => Draw::Orb { at, color },
            ParticleShape::Cube => Draw::Cube { at, color },
        };
        draws.push((at.depth, draw));
    }

    for photo in &frame.photos {
        let corners = photo_corners(&photo.transform, &photo_group);
        let projected: Option<Vec<Projected>> = corners.iter().map(|c| projector.project(c)).collect();
        let Some(projected) = projected else { continue };
        let corners = [projected[0], projected[1], projected[2], projected[3]];
        let depth = corners.iter().map(|c| c.depth).sum::<f32>() / 4.0;
        draws.push((
            depth,
            Draw::Photo {
                corners,
                texture: textures.get(&photo.id),
                tint: Color32::WHITE.gamma_multiply(photo.transform.opacity.clamp(0.0, 1.0)),
                selected: photo.selected,
            },
        ));
    }

    draws.sort_by(|a, b| b.0.total_cmp(&a.0));

    for (_, draw) in draws {
        match draw {
            Draw::Orb { at, color } => {
                painter.circle_filled(at.pos, (ORB_RADIUS * at.scale).max(0.6), color);
            }
            Draw::Cube { at, color } => {
                let half = (CUBE_HALF * at.scale).max(0.6);
                painter.rect_filled(Rect::from_center_size(at.pos, Vec2::splat(half * 2.0)), 0.0, color);
            }
            Draw::Photo { corners, texture, tint, selected } => {
                paint_quad(painter, &corners, texture, tint, theme);
                if selected {
                    let outline: Vec<Pos2> = corners.iter().map(|c| c.pos).collect();
                    painter.add(egui::Shape::closed_line(outline, Stroke::new(2.0, theme.primary)));
                }
            }
        }
    }
}

fn paint_quad(
    painter: &egui::Painter,
    corners: &[Projected; 4],
    texture: Option<&TextureHandle>,
    tint: Color32,
    theme: &Theme,
) {
    let uvs = [Pos2::new(0.0, 0.0), Pos2::new(1.0, 0.0), Pos2::new(1.0, 1.0), Pos2::new(0.0, 1.0)];
    let (mut mesh, color) = match texture {
        Some(texture) => (Mesh::with_texture(texture.id()), tint),
        None => (Mesh::default(), theme.surface.gamma_multiply(tint.a() as f32 / 255.0)),
    };
    for (corner, uv) in corners.iter().zip(uvs) {
        mesh.vertices.push(Vertex { pos: corner.pos, uv, color });
    }
    mesh.add_triangle(0, 1, 2);
    mesh.add_triangle(0, 2, 3);
    painter.add(egui::Shape::mesh(mesh));
}

/// Mode, gesture, photo count and tracking state in the top-left corner.
pub fn paint_status(painter: &egui::Painter, rect: Rect, status: &Status, theme: &Theme) {
    let origin = rect.left_top() + Vec2::new(16.0, 16.0);
    let font = egui::FontId::proportional(16.0);

    painter.text(
        origin,
        egui::Align2::LEFT_TOP,
        status.mode.to_string(),
        egui::FontId::proportional(24.0),
        theme.mode_color(status.mode),
    );
    painter.text(
        origin + Vec2::new(0.0, 32.0),
        egui::Align2::LEFT_TOP,
        format!("Gesture: {}", status.gesture),
        font.clone(),
        theme.gesture_color(status.gesture),
    );
    painter.text(
        origin + Vec2::new(0.0, 54.0),
        egui::Align2::LEFT_TOP,
        format!("Photos: {}", status.photo_count),
        font.clone(),
        theme.text_secondary,
    );

    let (tracking, color) = match (&status.source_error, status.source_ready) {
        (Some(reason), _) => (format!("Hand tracking off: {}", reason), theme.error),
        (None, true) => ("Hand tracking on".to_string(), theme.success),
        (None, false) => ("Starting hand tracking...".to_string(), theme.text_secondary),
    };
    painter.text(origin + Vec2::new(0.0, 76.0), egui::Align2::LEFT_TOP, tracking, font, color);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn projector() -> Projector {
        Projector::new(Rect::from_min_size(Pos2::ZERO, Vec2::new(800.0, 600.0)), 26.0)
    }

    #[test]
    fn test_origin_projects_to_center() {
        let p = projector().project(&Vector3::zeros()).unwrap();
        assert_eq!(p.pos, Pos2::new(400.0, 300.0));
        assert_eq!(p.depth, 26.0);
    }

    #[test]
    fn test_up_is_up_on_screen() {
        let p = projector().project(&Vector3::new(1.0, 1.0, 0.0)).unwrap();
        assert!(p.pos.x > 400.0);
        assert!(p.pos.y < 300.0);
    }

    #[test]
    fn test_closer_is_larger() {
        let far = projector().project(&Vector3::new(0.0, 0.0, -5.0)).unwrap();
        let near = projector().project(&Vector3::new(0.0, 0.0, 14.0)).unwrap();
        assert!(near.scale > far.scale);
        assert!(projector().project(&Vector3::new(0.0, 0.0, 26.0)).is_none());
    }

    #[test]
    fn test_unrotated_photo_corners() {
        let transform = Transform {
            position: Vector3::new(0.0, 0.0, 14.0),
            rotation: Vector3::zeros(),
            scale: Vector3::new(2.0, 1.0, 1.0),
            opacity: 1.0,
        };
        let corners = photo_corners(&transform, &Rotation3::identity());
        assert!((corners[0] - Vector3::new(-1.0, 0.5, 14.0)).norm() < 1e-6);
        assert!((corners[2] - Vector3::new(1.0, -0.5, 14.0)).norm() < 1e-6);
    }
}
