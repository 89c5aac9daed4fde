mod config;
mod media;
mod popup;
mod presence;
mod scrub;
mod thumbnail;

use std::time::{Duration, Instant};

use eframe::egui::{self, ViewportBuilder, ViewportCommand, WindowLevel};

use crate::{
    config::{discover_config_path, Config, ConfigWatcher, WindowConfig},
    popup::PopupController,
    presence::SessionController,
    scrub::ScrubSpan,
    thumbnail::ThumbnailLoader,
};

const WINDOW_WIDTH: f32 = 320.0;
const WINDOW_HEIGHT: f32 = 430.0;
const THUMBNAIL_HEIGHT: f32 = 158.0;
const BAR_HEIGHT: f32 = 24.0;
const INDICATOR_RADIUS: f32 = 6.0;
const INDICATOR_GRAB_EXTENT: f32 = 18.0;

const BUTTON_PLAY_TEXT: &str = "⏵";
const BUTTON_PAUSE_TEXT: &str = "⏸";
const BUTTON_REWIND_TEXT: &str = "⏪";
const BUTTON_FAST_FORWARD_TEXT: &str = "⏩";
const BUTTON_LOOP_TEXT: &str = "🔁";

const STATUS_ENABLED_COLOR: egui::Color32 = egui::Color32::from_rgb(90, 200, 120);
const STATUS_DISABLED_COLOR: egui::Color32 = egui::Color32::from_rgb(220, 80, 80);

/// How often the UI wakes up without input. The popup's own 1 Hz poll rides
/// on top of this; the repaint cadence only bounds how stale the frame gets.
const REPAINT_INTERVAL: Duration = Duration::from_millis(200);

struct App {
    popup: PopupController<SessionController>,
    thumbnails: ThumbnailLoader,
    window: WindowConfig,
    config_watcher: Option<ConfigWatcher>,
    last_window_level: Option<WindowLevel>,
    last_pixels_per_point: Option<f32>,
}

impl App {
    fn new(config: Config) -> Self {
        let controller = SessionController::new(config.session.as_ref());
        let config_watcher =
            discover_config_path().and_then(|path| ConfigWatcher::watch(path).ok());

        Self {
            popup: PopupController::open(controller, Instant::now()),
            thumbnails: ThumbnailLoader::new(),
            window: config.window,
            config_watcher,
            last_window_level: None,
            last_pixels_per_point: None,
        }
    }

    fn maintain_window_options(&mut self, ctx: &egui::Context) {
        if let Some(watcher) = self.config_watcher.as_mut() {
            if let Some(window) = watcher.poll() {
                self.window = window;
            }
        }

        let desired_level = if self.window.always_on_top {
            WindowLevel::AlwaysOnTop
        } else {
            WindowLevel::Normal
        };
        if self.last_window_level != Some(desired_level) {
            ctx.send_viewport_cmd(ViewportCommand::WindowLevel(desired_level));
            self.last_window_level = Some(desired_level);
        }

        let desired_scale = self.window.pixels_per_point();
        if self.last_pixels_per_point != Some(desired_scale) {
            ctx.set_pixels_per_point(desired_scale);
            self.last_pixels_per_point = Some(desired_scale);
        }
    }

    fn render_header(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            let mut enabled = self.popup.is_enabled();
            if ui.checkbox(&mut enabled, "Rich presence").changed() {
                // The checkbox's new value is advisory: the popup only stays
                // enabled if the controller has a session, so the rendered
                // state next frame reflects the real outcome.
                self.popup.toggle(Instant::now());
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let color = if self.popup.is_enabled() {
                    STATUS_ENABLED_COLOR
                } else {
                    STATUS_DISABLED_COLOR
                };
                ui.colored_label(color, self.popup.status_text());
            });
        });
    }

    fn render_media_info(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        let thumbnail_url = self
            .popup
            .snapshot()
            .map(|snapshot| snapshot.thumbnail.clone());
        let size = egui::vec2(ui.available_width(), THUMBNAIL_HEIGHT);
        match self.thumbnails.update(ctx, thumbnail_url.as_deref()) {
            Some(texture) => {
                ui.add(
                    egui::Image::new(texture)
                        .fit_to_exact_size(size)
                        .corner_radius(4.0),
                );
            }
            None => {
                let (rect, _) = ui.allocate_exact_size(size, egui::Sense::hover());
                ui.painter()
                    .rect_filled(rect, 4.0, ui.visuals().extreme_bg_color);
            }
        }

        ui.label(
            egui::RichText::new(self.popup.platform_text())
                .small()
                .color(ui.visuals().weak_text_color()),
        );
        ui.label(egui::RichText::new(self.popup.title_text()).strong());
    }

    /// The scrubber. The bar and indicator are painted from numeric state;
    /// pointer handling goes through the global pointer so a drag keeps
    /// tracking after the cursor leaves the indicator.
    fn render_playback_bar(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        let desired = egui::vec2(ui.available_width(), BAR_HEIGHT);
        let (rect, _) = ui.allocate_exact_size(desired, egui::Sense::hover());
        let center_y = rect.center().y;
        let span = ScrubSpan::from_bar(rect.left(), rect.width());

        let painter = ui.painter();
        painter.line_segment(
            [
                egui::pos2(rect.left(), center_y),
                egui::pos2(rect.right(), center_y),
            ],
            egui::Stroke::new(3.0, ui.visuals().widgets.inactive.bg_fill),
        );

        let progress = self
            .popup
            .snapshot()
            .map_or(0.0, |snapshot| snapshot.progress());
        let indicator_x = if self.popup.scrub().dragging() {
            span.clamp(self.popup.scrub().drag_x())
        } else {
            span.x_for_progress(progress)
        };
        let indicator_center = egui::pos2(indicator_x, center_y);
        let indicator_color = if self.popup.is_enabled() {
            ui.visuals().widgets.active.fg_stroke.color
        } else {
            ui.visuals().widgets.noninteractive.fg_stroke.color
        };
        painter.circle_filled(indicator_center, INDICATOR_RADIUS, indicator_color);

        let grab_rect = egui::Rect::from_center_size(
            indicator_center,
            egui::vec2(INDICATOR_GRAB_EXTENT, INDICATOR_GRAB_EXTENT),
        );
        let (pointer_pos, pressed, down, released) = ctx.input(|input| {
            (
                input.pointer.latest_pos(),
                input.pointer.primary_pressed(),
                input.pointer.primary_down(),
                input.pointer.primary_released(),
            )
        });

        if let Some(pos) = pointer_pos {
            if pressed && grab_rect.contains(pos) {
                self.popup.scrub_pointer_down(pos.x);
            }
            if down && self.popup.scrub().dragging() {
                self.popup.scrub_pointer_move(span, pos.x);
                ctx.set_cursor_icon(egui::CursorIcon::Grabbing);
            } else if grab_rect.contains(pos) && self.popup.is_enabled() {
                ctx.set_cursor_icon(egui::CursorIcon::Grab);
            }
        }
        // Release fires regardless of where the pointer ended up; with no
        // drag in progress it only clears stale state.
        if released {
            self.popup.scrub_pointer_up(span);
        }
    }

    fn render_time_labels(&mut self, ui: &mut egui::Ui) {
        ui.columns(2, |columns| {
            columns[0].with_layout(egui::Layout::left_to_right(egui::Align::Center), |col| {
                col.label(self.popup.position_text());
            });
            columns[1].with_layout(egui::Layout::right_to_left(egui::Align::Center), |col| {
                col.label(self.popup.duration_text());
            });
        });
    }

    fn render_playback_controls(&mut self, ui: &mut egui::Ui) {
        let enabled = self.popup.is_enabled();
        let now = Instant::now();
        ui.horizontal(|ui| {
            ui.add_space((ui.available_width() - 180.0).max(0.0) / 2.0);
            ui.spacing_mut().item_spacing.x = 12.0;

            if ui
                .add_enabled(enabled, egui::Button::new(BUTTON_REWIND_TEXT))
                .clicked()
            {
                self.popup.rewind_clicked(now);
            }

            let play_text = if self.popup.show_pause_icon() {
                BUTTON_PAUSE_TEXT
            } else {
                BUTTON_PLAY_TEXT
            };
            if ui
                .add_enabled(enabled, egui::Button::new(play_text))
                .clicked()
            {
                self.popup.play_pause();
            }

            if ui
                .add_enabled(enabled, egui::Button::new(BUTTON_FAST_FORWARD_TEXT))
                .clicked()
            {
                self.popup.fast_forward_clicked(now);
            }

            let loop_button =
                egui::Button::new(BUTTON_LOOP_TEXT).selected(self.popup.loop_pressed());
            if ui.add_enabled(enabled, loop_button).clicked() {
                self.popup.toggle_loop();
            }
        });
    }
}

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.maintain_window_options(ctx);
        self.popup.tick(Instant::now());

        if ctx.input(|input| input.viewport().close_requested()) {
            self.popup.close();
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.spacing_mut().item_spacing.y = 8.0;
            self.render_header(ui);
            ui.separator();
            self.render_media_info(ui, ctx);
            self.render_playback_bar(ui, ctx);
            self.render_time_labels(ui);
            self.render_playback_controls(ui);
        });

        ctx.request_repaint_after(REPAINT_INTERVAL);
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.popup.close();
    }
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    let native_options = eframe::NativeOptions {
        viewport: ViewportBuilder::default()
            .with_inner_size([WINDOW_WIDTH, WINDOW_HEIGHT])
            .with_resizable(false),
        ..Default::default()
    };
    let run_res = eframe::run_native(
        "Rich Presence",
        native_options,
        Box::new(
            move |_cc| -> std::result::Result<
                Box<dyn eframe::App>,
                Box<dyn std::error::Error + Send + Sync>,
            > { Ok(Box::new(App::new(config))) },
        ),
    );
    if let Err(e) = run_res {
        return Err(Box::new(e));
    }

    Ok(())
}
