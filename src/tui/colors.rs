//! Color constants for the terminal user interface.

use ratatui::style::Color;

use crate::fields::Urgency;

pub const LOW_GREEN: Color = Color::Rgb(46, 125, 50);
pub const MEDIUM_ORANGE: Color = Color::Rgb(230, 81, 0);
pub const HIGH_RED: Color = Color::Rgb(198, 40, 40);
/// Due-soon rows and the warning caption
pub const DUE_SOON_ORANGE: Color = Color::Rgb(245, 124, 0);
/// Header and status bar
pub const BRAND_PURPLE: Color = Color::Rgb(102, 126, 234);

/// Foreground and background for an urgency badge.
pub fn urgency_colors(urgency: Urgency) -> (Color, Color) {
    match urgency {
        Urgency::Low => (LOW_GREEN, Color::Reset),
        Urgency::Medium => (MEDIUM_ORANGE, Color::Reset),
        Urgency::High => (HIGH_RED, Color::Reset),
        Urgency::Critical => (Color::White, HIGH_RED),
    }
}
