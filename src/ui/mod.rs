use rfd::FileDialog;
use std::fmt::Display;

use crate::localizations::Localizations;
use crate::models::{
    AudioFormat, AudioQuality, DownloadForm, DownloadFormat, VideoContainer, VideoQuality,
};
use crate::queue::QueueState;
use crate::theme::*;

/// URL entry: a single line, or one URL per line in batch mode.
pub fn render_url_input(
    ui: &mut egui::Ui,
    form: &mut DownloadForm,
    localizer: &Localizations,
) -> egui::Response {
    ui.horizontal(|ui| {
        ui.selectable_value(&mut form.batch_mode, false, localizer.text("mode-single"));
        ui.selectable_value(&mut form.batch_mode, true, localizer.text("mode-batch"));
    });
    ui.add_space(4.0);

    let label = if form.batch_mode { "batch-label" } else { "url-label" };
    ui.label(localizer.text(label));

    egui::Frame::group(ui.style())
        .fill(INPUT_BG)
        .stroke(egui::Stroke::new(1.0, egui::Color32::LIGHT_GRAY))
        .rounding(ROUNDING_FRAME)
        .show(ui, |ui| {
            if form.batch_mode {
                ui.add_sized(
                    [ui.available_width(), 90.0],
                    egui::TextEdit::multiline(&mut form.batch_urls)
                        .hint_text("https://...\nhttps://...")
                        .desired_rows(4),
                )
            } else {
                ui.add_sized(
                    [ui.available_width(), 32.0],
                    egui::TextEdit::singleline(&mut form.single_url)
                        .hint_text(localizer.text("url-placeholder"))
                        .font(egui::FontId::proportional(16.0)),
                )
            }
        })
        .inner
}

fn combo<T>(ui: &mut egui::Ui, id: &str, label: &str, value: &mut T, options: &[T])
where
    T: Copy + PartialEq + Display,
{
    ui.label(label);
    egui::ComboBox::from_id_source(id)
        .selected_text(value.to_string())
        .show_ui(ui, |ui| {
            for option in options {
                ui.selectable_value(value, *option, option.to_string());
            }
        });
}

pub fn render_format_selector(ui: &mut egui::Ui, form: &mut DownloadForm, localizer: &Localizations) {
    ui.horizontal(|ui| {
        ui.label(localizer.text("download-format"));
        ui.radio_value(&mut form.format, DownloadFormat::Best, localizer.text("format-best"));
        ui.radio_value(&mut form.format, DownloadFormat::Video, localizer.text("format-video"));
        ui.radio_value(&mut form.format, DownloadFormat::Audio, localizer.text("format-audio"));
    });

    ui.horizontal(|ui| match form.format {
        DownloadFormat::Best => {}
        DownloadFormat::Video => {
            combo(
                ui,
                "video_container",
                localizer.text("container-label"),
                &mut form.video_container,
                &VideoContainer::ALL,
            );
            combo(
                ui,
                "video_quality",
                localizer.text("quality-label"),
                &mut form.video_quality,
                &VideoQuality::ALL,
            );
        }
        DownloadFormat::Audio => {
            combo(
                ui,
                "audio_format",
                localizer.text("audio-format-label"),
                &mut form.audio_format,
                &AudioFormat::ALL,
            );
            combo(
                ui,
                "audio_quality",
                localizer.text("quality-label"),
                &mut form.audio_quality,
                &AudioQuality::ALL,
            );
        }
    });
}

pub fn render_options(ui: &mut egui::Ui, form: &mut DownloadForm, localizer: &Localizations) {
    egui::CollapsingHeader::new(localizer.text("options-label"))
        .id_source("more_options")
        .show(ui, |ui| {
            ui.horizontal_wrapped(|ui| {
                ui.checkbox(&mut form.embed_subtitles, localizer.text("embed-subtitles"));
                ui.checkbox(&mut form.embed_metadata, localizer.text("embed-metadata"));
                ui.checkbox(&mut form.skip_existing, localizer.text("skip-existing"));
                ui.checkbox(&mut form.auto_open_folder, localizer.text("auto-open"));
            });

            egui::Grid::new("option_fields")
                .num_columns(2)
                .spacing([12.0, 6.0])
                .show(ui, |ui| {
                    if form.embed_subtitles {
                        ui.label(localizer.text("subtitle-languages"));
                        ui.text_edit_singleline(&mut form.subtitle_languages);
                        ui.end_row();
                    }
                    ui.label(localizer.text("speed-limit"));
                    ui.text_edit_singleline(&mut form.speed_limit);
                    ui.end_row();

                    ui.label(localizer.text("throttle-rate"));
                    ui.text_edit_singleline(&mut form.throttle_rate);
                    ui.end_row();

                    ui.label(localizer.text("filename-template"));
                    ui.text_edit_singleline(&mut form.filename_template);
                    ui.end_row();
                });
        });
}

/// Folder picker. Returns true when "Open folder" was clicked.
pub fn render_download_dir_selector(
    ui: &mut egui::Ui,
    form: &mut DownloadForm,
    localizer: &Localizations,
) -> bool {
    let mut open_clicked = false;

    ui.label(localizer.text("download-to"));
    ui.horizontal(|ui| {
        let shown = form
            .output_directory
            .as_ref()
            .map(|dir| dir.display().to_string())
            .unwrap_or_else(|| localizer.text("no-folder").to_string());
        ui.label(egui::RichText::new(shown).color(SECONDARY_TEXT));

        if ui.button(localizer.text("browse-button")).clicked() {
            let mut dialog = FileDialog::new();
            if let Some(dir) = &form.output_directory {
                dialog = dialog.set_directory(dir);
            }
            if let Some(path) = dialog.pick_folder() {
                form.output_directory = Some(path);
            }
        }

        let can_open = form.output_directory.is_some();
        if ui
            .add_enabled(can_open, egui::Button::new(localizer.text("open-folder-button")))
            .clicked()
        {
            open_clicked = true;
        }
    });

    open_clicked
}

pub fn render_status(ui: &mut egui::Ui, state: &QueueState, status: &str, localizer: &Localizations) {
    egui::Frame::group(ui.style())
        .fill(STATUS_BG)
        .rounding(8.0)
        .show(ui, |ui| {
            ui.set_min_width(ui.available_width());
            ui.vertical(|ui| {
                let status_text = match &state.error.message {
                    Some(error) if !state.is_running => {
                        egui::RichText::new(format!("Error: {}", error.lines().next().unwrap_or_default()))
                            .color(TEXT_ERROR)
                    }
                    _ => egui::RichText::new(status).color(STATUS_TEXT),
                };
                ui.label(status_text);

                if state.is_running && state.total_items > 0 {
                    ui.add_space(6.0);
                    let text = if state.download_speed.is_empty() {
                        format!(
                            "{} {}/{}",
                            localizer.text("status-downloading"),
                            state.current_index,
                            state.total_items
                        )
                    } else {
                        format!(
                            "{}/{}  {} - ETA {}",
                            state.current_index, state.total_items, state.download_speed, state.eta
                        )
                    };
                    ui.add(
                        egui::ProgressBar::new(state.current_item_progress)
                            .show_percentage()
                            .text(text),
                    );
                }
            });
        });
}

pub fn render_log(ui: &mut egui::Ui, state: &QueueState, localizer: &Localizations) {
    ui.label(localizer.text("log-label"));
    egui::Frame::none()
        .fill(LOG_BG)
        .rounding(ROUNDING_FRAME)
        .inner_margin(egui::Margin::same(6.0))
        .show(ui, |ui| {
            egui::ScrollArea::vertical()
                .max_height(LOG_HEIGHT)
                .auto_shrink([false, false])
                .stick_to_bottom(true)
                .show(ui, |ui| {
                    for line in state.log.iter() {
                        ui.label(egui::RichText::new(line).monospace().color(LOG_TEXT));
                    }
                });
        });
}

/// Modal error window. Returns true once the user dismisses it.
pub fn render_error_alert(ctx: &egui::Context, state: &QueueState, localizer: &Localizations) -> bool {
    let Some(message) = state.error.message.as_deref().filter(|_| state.error.show_alert) else {
        return false;
    };

    let mut dismissed = false;
    egui::Window::new(localizer.text("error-title"))
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .show(ctx, |ui| {
            ui.label(egui::RichText::new(message).color(TEXT_ERROR));
            ui.add_space(8.0);
            if ui.button(localizer.text("ok-button")).clicked() {
                dismissed = true;
            }
        });
    dismissed
}

pub fn styled_button(text: &str, fill: egui::Color32, text_color: egui::Color32) -> egui::Button<'static> {
    egui::Button::new(
        egui::RichText::new(text.to_string())
            .size(BUTTON_FONT_SIZE)
            .color(text_color),
    )
    .min_size(MIN_SIZE_BUTTON)
    .fill(fill)
    .rounding(ROUNDING_BUTTON)
    .stroke(egui::Stroke::new(1.0, BORDER_COLOR))
}

pub fn secondary_button(text: &str) -> egui::Button<'static> {
    styled_button(text, SECONDARY_BUTTON_BG, BUTTON_SECONDARY_TEXT)
}
