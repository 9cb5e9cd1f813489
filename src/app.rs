use eframe::egui;
use log::{info, warn};
use std::path::PathBuf;
use std::time::Duration;

use crate::localizations::Localizations;
use crate::models::DownloadForm;
use crate::queue::{DependencyStatus, QueueController};
use crate::settings;
use crate::theme::*;
use crate::ui;

const REPAINT_WHILE_BUSY: Duration = Duration::from_millis(100);

pub struct YtdlApp {
    pub form: DownloadForm,
    queue: QueueController,
    localizer: Localizations,
    settings_path: Option<PathBuf>,
    updating: bool,
}

impl YtdlApp {
    pub fn new(
        form: DownloadForm,
        queue: QueueController,
        localizer: Localizations,
        settings_path: Option<PathBuf>,
    ) -> Self {
        Self {
            form,
            queue,
            localizer,
            settings_path,
            updating: false,
        }
    }

    pub fn start_download(&mut self) {
        if self.queue.is_running() {
            return;
        }
        match self.form.urls() {
            Ok(urls) => {
                self.updating = false;
                let _ = self.queue.start(&urls, self.form.snapshot());
            }
            Err(err) => self.queue.reject(err),
        }
    }

    pub fn update_ytdlp(&mut self) {
        if self.queue.is_running() {
            return;
        }
        self.updating = self.queue.update_downloader().is_ok();
    }

    fn status_text(&self) -> String {
        if self.queue.is_running() {
            let key = if self.updating {
                "status-updating"
            } else {
                "status-downloading"
            };
            return self.localizer.text(key).to_string();
        }
        match self.queue.dependencies() {
            DependencyStatus::Checking => self.localizer.text("status-checking").to_string(),
            DependencyStatus::Failed(err) => err.to_string(),
            DependencyStatus::Ready(_) => self.localizer.text("status-ready").to_string(),
        }
    }

    pub fn update_ui(&mut self, ctx: &egui::Context) {
        if self.queue.poll() {
            ctx.request_repaint();
        }
        if self.queue.is_running() || matches!(self.queue.dependencies(), DependencyStatus::Checking) {
            ctx.request_repaint_after(REPAINT_WHILE_BUSY);
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.heading(self.localizer.text("app-title"));
                ui.label(egui::RichText::new(self.localizer.text("app-subtitle")).color(SECONDARY_TEXT));
                ui.add_space(16.0);

                let busy = self.queue.is_running();
                ui.add_enabled_ui(!busy, |ui| {
                    let url_response = ui::render_url_input(ui, &mut self.form, &self.localizer);
                    if !self.form.batch_mode
                        && url_response.lost_focus()
                        && ui.input(|i| i.key_pressed(egui::Key::Enter))
                    {
                        self.start_download();
                    }

                    ui.add_space(10.0);
                    ui::render_format_selector(ui, &mut self.form, &self.localizer);
                    ui.add_space(10.0);
                    ui::render_options(ui, &mut self.form, &self.localizer);
                });

                ui.add_space(10.0);
                if ui::render_download_dir_selector(ui, &mut self.form, &self.localizer) {
                    if let Some(dir) = self.form.output_directory.clone() {
                        self.queue.open_output_folder(&dir);
                    }
                }
                ui.add_space(16.0);

                let status = self.status_text();
                ui::render_status(ui, self.queue.state(), &status, &self.localizer);
                ui.add_space(12.0);

                self.render_buttons(ui);
                ui.add_space(12.0);

                ui::render_log(ui, self.queue.state(), &self.localizer);
            });
        });

        if ui::render_error_alert(ctx, self.queue.state(), &self.localizer) {
            self.queue.dismiss_error();
        }
    }

    fn render_buttons(&mut self, ui: &mut egui::Ui) {
        let ready = matches!(self.queue.dependencies(), DependencyStatus::Ready(_));

        ui.horizontal(|ui| {
            if self.queue.is_running() {
                let cancel_button = ui::styled_button(
                    self.localizer.text("cancel-button"),
                    DANGER_BUTTON_BG,
                    BUTTON_MAIN_TEXT,
                );
                if ui.add(cancel_button).clicked() {
                    self.queue.cancel();
                }
            } else {
                let download_button = ui::styled_button(
                    self.localizer.text("download-button"),
                    PRIMARY_BUTTON_BG,
                    BUTTON_MAIN_TEXT,
                );
                if ui.add_enabled(ready, download_button).clicked() {
                    self.start_download();
                }

                let update_button = ui::secondary_button(self.localizer.text("update-button"));
                if ui.add_enabled(ready, update_button).clicked() {
                    self.update_ytdlp();
                }
            }
        });
    }

    fn save_settings(&self) {
        let Some(path) = &self.settings_path else {
            return;
        };
        match settings::save(path, &self.form) {
            Ok(()) => info!("saved settings to {}", path.display()),
            Err(e) => warn!("could not save settings: {:#}", e),
        }
    }
}

impl eframe::App for YtdlApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.update_ui(ctx);
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        if !self.queue.shutdown() {
            warn!("exiting while a download process may still be running");
        }
        self.save_settings();
    }
}
