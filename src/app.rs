// src/app.rs
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Instant;

use eframe::egui;
use tracing::{error, info, warn};

use tree_lights::landmarks::{open_source, spawn_landmark_source};
use tree_lights::{Config, Experience, GestureLabel, HandPose, LandmarkFeed, PhotoLoader};

use crate::ui::{paint_scene, paint_status, Projector, Theme};

const IMAGE_EXTENSIONS: [&str; 7] = ["png", "jpg", "jpeg", "webp", "bmp", "gif", "tiff"];

pub struct TreeLightsApp {
    experience: Experience,
    feed: Option<LandmarkFeed>,
    loader: PhotoLoader,
    textures: HashMap<String, egui::TextureHandle>,

    theme: Theme,
    camera_distance: f32,
    show_help: bool,
    notice: Option<String>,

    started: Instant,
    last_frame: Option<Instant>,
}

impl TreeLightsApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: Config) -> Self {
        let source = config.source.clone();
        let fps = config.source_fps;
        let (feed, notice) = match spawn_landmark_source(move || open_source(&source, fps), fps) {
            Ok(feed) => (Some(feed), None),
            Err(e) => {
                error!(error = %e, "could not start hand tracking");
                (None, Some(format!("Hand tracking unavailable: {}", e)))
            }
        };

        Self {
            experience: Experience::new(&config),
            feed,
            loader: PhotoLoader::new(),
            textures: HashMap::new(),
            theme: Theme::default(),
            camera_distance: config.camera_distance,
            show_help: false,
            notice,
            started: Instant::now(),
            last_frame: None,
        }
    }

    fn pump_sources(&mut self, ctx: &egui::Context) {
        let now = self.started.elapsed();

        if let Some(feed) = &self.feed {
            for event in feed.drain() {
                self.experience.handle_event(event, now);
            }
        }

        let dropped: Vec<PathBuf> = ctx.input(|i| {
            i.raw
                .dropped_files
                .iter()
                .filter_map(|f| f.path.clone())
                .collect()
        });
        if !dropped.is_empty() {
            self.queue_photos(dropped);
        }

        for batch in self.loader.poll() {
            if !batch.failed.is_empty() {
                self.notice = Some(format!("{} file(s) could not be opened", batch.failed.len()));
            }
            self.experience.add_photos(batch.loaded, now);
        }
    }

    fn queue_photos(&mut self, paths: Vec<PathBuf>) {
        info!(count = paths.len(), "loading photos");
        if let Err(e) = self.loader.load(paths) {
            warn!(error = %e, "photo loader failed to start");
            self.notice = Some(format!("Could not load photos: {}", e));
        }
    }

    /// Uploads new photos to the GPU and frees removed ones.
    fn sync_textures(&mut self, ctx: &egui::Context) {
        let photos = self.experience.photos();
        self.textures.retain(|id, _| photos.items().iter().any(|p| &p.id == id));
        for photo in photos.items() {
            if self.textures.contains_key(&photo.id) {
                continue;
            }
            let size = [photo.image.width() as usize, photo.image.height() as usize];
            let image = egui::ColorImage::from_rgba_unmultiplied(size, photo.image.pixels());
            let texture = ctx.load_texture(photo.id.clone(), image, egui::TextureOptions::LINEAR);
            self.textures.insert(photo.id.clone(), texture);
        }
    }

    fn render_header(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.add_space(8.0);
            egui::menu::bar(ui, |ui| {
                ui.heading("Tree Lights");
                ui.separator();

                if ui.button("Add photos...").clicked() {
                    if let Some(paths) = rfd::FileDialog::new()
                        .add_filter("Images", &IMAGE_EXTENSIONS)
                        .pick_files()
                    {
                        self.queue_photos(paths);
                    }
                }
                if self.loader.is_busy() {
                    ui.spinner();
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("? Gestures").clicked() {
                        self.show_help = !self.show_help;
                    }
                    if let Some(notice) = &self.notice {
                        ui.colored_label(self.theme.warning, notice);
                    }
                });
            });
            ui.add_space(8.0);
        });
    }

    /// Buttons standing in for gestures when no hand tracking is available.
    fn render_control_panel(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("controls").show(ctx, |ui| {
            ui.add_space(8.0);
            ui.horizontal(|ui| {
                let now = self.started.elapsed();
                let manual = [
                    ("✊ Fist", GestureLabel::Fist),
                    ("✋ Open", GestureLabel::OpenHand),
                    ("👌 Pinch", GestureLabel::Pinch),
                ];
                for (label, gesture) in manual {
                    let button = egui::Button::new(label).fill(self.theme.surface);
                    if ui.add_sized([96.0, 32.0], button).clicked() {
                        self.experience.ingest_pose(HandPose::with_gesture(gesture), now);
                    }
                }

                ui.separator();

                let shown = self.experience.driver().active_photo_id().map(str::to_string);
                if let Some(id) = shown {
                    if ui.button("Remove shown photo").clicked() {
                        self.experience.remove_photo(&id, now);
                    }
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(
                        egui::RichText::new(self.experience.log().session_name())
                            .color(self.theme.text_secondary),
                    );
                });
            });
            ui.add_space(8.0);
        });
    }

    fn render_scene(&mut self, ctx: &egui::Context) {
        let now = Instant::now();
        let dt = self
            .last_frame
            .map(|last| now.duration_since(last).as_secs_f32())
            .unwrap_or(0.0);
        self.last_frame = Some(now);
        let elapsed = self.started.elapsed().as_secs_f32();
        let status = self.experience.status();

        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(self.theme.background))
            .show(ctx, |ui| {
                let rect = ui.available_rect_before_wrap();
                let painter = ui.painter_at(rect);
                let projector = Projector::new(rect, self.camera_distance);

                let frame = self.experience.advance(elapsed, dt);
                paint_scene(&painter, &projector, frame, &self.textures, &self.theme);
                paint_status(&painter, rect, &status, &self.theme);
            });
    }

    fn render_help_window(&mut self, ctx: &egui::Context) {
        egui::Window::new("Gestures")
            .open(&mut self.show_help)
            .resizable(false)
            .default_size([320.0, 200.0])
            .show(ctx, |ui| {
                ui.label("✊ Fist: gather everything back into the tree");
                ui.label("✋ Open hand: scatter the tree, tilt your hand to turn the cloud");
                ui.label("👌 Pinch: bring one photo up close");
                ui.label("✋ Open hand while zoomed: let it go again");
                ui.add_space(10.0);
                ui.label("Drop image files on the window or use Add photos.");
            });
    }
}

impl eframe::App for TreeLightsApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.pump_sources(ctx);
        self.sync_textures(ctx);

        self.render_header(ctx);
        self.render_control_panel(ctx);
        if self.show_help {
            self.render_help_window(ctx);
        }
        self.render_scene(ctx);

        ctx.request_repaint();
    }
}
