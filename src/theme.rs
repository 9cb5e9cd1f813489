use egui::Color32;

// Buttons
pub const PRIMARY_BUTTON_BG: Color32 = Color32::from_rgb(76, 154, 255);
pub const DANGER_BUTTON_BG: Color32 = Color32::from_rgb(220, 76, 70);
pub const SECONDARY_BUTTON_BG: Color32 = Color32::from_rgb(225, 225, 230);
pub const BUTTON_MAIN_TEXT: Color32 = Color32::WHITE;
pub const BUTTON_SECONDARY_TEXT: Color32 = Color32::from_rgb(36, 36, 36);

// Surfaces
pub const INPUT_BG: Color32 = Color32::from_rgb(250, 250, 250);
pub const STATUS_BG: Color32 = Color32::from_rgb(248, 248, 248);
pub const LOG_BG: Color32 = Color32::from_rgb(30, 30, 34);
pub const BORDER_COLOR: Color32 = Color32::from_rgba_premultiplied(60, 60, 67, 15);

// Text
pub const SECONDARY_TEXT: Color32 = Color32::from_rgb(138, 138, 143);
pub const LOG_TEXT: Color32 = Color32::from_rgb(210, 210, 215);
pub const TEXT_ERROR: Color32 = Color32::from_rgb(200, 30, 30);
pub const STATUS_TEXT: Color32 = Color32::DARK_GRAY;

// Sizing & Spacing
pub const ROUNDING_FRAME: f32 = 4.0;
pub const ROUNDING_BUTTON: f32 = 6.0;
pub const MIN_SIZE_BUTTON: egui::Vec2 = egui::Vec2::new(140.0, 40.0);
pub const BUTTON_FONT_SIZE: f32 = 16.0;
pub const LOG_HEIGHT: f32 = 160.0;
