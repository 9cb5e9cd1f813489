use eframe::egui;
use tracing_subscriber::EnvFilter;

mod app;
mod arguments;
mod dependencies;
mod download;
mod error;
mod localizations;
mod log_buffer;
mod models;
mod progress;
mod queue;
mod runner;
mod settings;
mod theme;
mod ui;

use app::YtdlApp;
use dependencies::Locator;
use localizations::Localizations;
use queue::QueueController;

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings_path = settings::default_path();
    let form = settings_path
        .as_deref()
        .map(settings::load)
        .unwrap_or_default();

    let mut queue = QueueController::new();
    queue.check_dependencies(Locator::new());

    let localizer = Localizations::new();
    let title = localizer.text("app-title").to_string();
    let app = YtdlApp::new(form, queue, localizer, settings_path);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([760.0, 720.0])
            .with_min_inner_size([620.0, 520.0])
            .with_title(title.clone()),
        ..Default::default()
    };

    eframe::run_native(
        &title,
        options,
        Box::new(|cc| {
            cc.egui_ctx.set_visuals(egui::Visuals::light());
            Box::new(app)
        }),
    )
}
