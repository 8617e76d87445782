//! UI styling constants and helpers

use bevy::prelude::*;
use bevy::ui::{UiRect, Val};

/// Color palette for the UI
pub struct UiColors;

impl UiColors {
    pub const PANEL_BG: Color = Color::srgba(0.15, 0.15, 0.15, 0.95);
    pub const TOOLBAR_BG: Color = Color::srgba(0.12, 0.12, 0.12, 0.98);
    pub const BUTTON_BG: Color = Color::srgba(0.25, 0.25, 0.25, 1.0);
    pub const BUTTON_HOVER: Color = Color::srgba(0.35, 0.35, 0.35, 1.0);
    pub const BUTTON_ACTIVE: Color = Color::srgba(0.2, 0.5, 0.8, 1.0);

    pub const TEXT_PRIMARY: Color = Color::srgba(0.9, 0.9, 0.9, 1.0);
    pub const TEXT_SECONDARY: Color = Color::srgba(0.6, 0.6, 0.6, 1.0);
    pub const TEXT_ACCENT: Color = Color::srgba(0.4, 0.7, 1.0, 1.0);
    /// Hidden products in the hierarchy
    pub const TEXT_MUTED: Color = Color::srgba(0.45, 0.45, 0.45, 1.0);

    pub const BORDER: Color = Color::srgba(0.3, 0.3, 0.3, 1.0);

    // Matches the highlight material's green
    pub const SELECTED: Color = Color::srgba(0.2, 0.98, 0.2, 0.25);
    pub const HOVER: Color = Color::srgba(0.4, 0.4, 0.4, 0.3);
}

/// Common sizes
pub struct UiSizes;

impl UiSizes {
    pub const TOOLBAR_HEIGHT: f32 = 48.0;
    pub const STATUS_HEIGHT: f32 = 24.0;
    pub const PANEL_WIDTH: f32 = 300.0;
    pub const BUTTON_SIZE: f32 = 36.0;
    pub const PADDING: f32 = 8.0;
    pub const PADDING_SM: f32 = 4.0;
    pub const INDENT: f32 = 12.0;
    pub const BORDER_RADIUS: f32 = 4.0;
    pub const FONT_SIZE: f32 = 14.0;
    pub const FONT_SIZE_SM: f32 = 12.0;
    pub const FONT_SIZE_LG: f32 = 16.0;
}

/// Left padding for a hierarchy row at `depth`
pub fn row_indent(depth: usize) -> UiRect {
    UiRect::new(
        Val::Px(UiSizes::PADDING_SM + depth as f32 * UiSizes::INDENT),
        Val::Px(UiSizes::PADDING_SM),
        Val::Px(2.0),
        Val::Px(2.0),
    )
}

/// Small text with the panel font sizes
pub fn small_text(value: impl Into<String>, color: Color) -> (Text, TextFont, TextColor) {
    (
        Text::new(value),
        TextFont {
            font_size: UiSizes::FONT_SIZE_SM,
            ..default()
        },
        TextColor(color),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_indent_grows_with_depth() {
        assert_eq!(row_indent(0).left, Val::Px(UiSizes::PADDING_SM));
        assert_eq!(
            row_indent(3).left,
            Val::Px(UiSizes::PADDING_SM + 3.0 * UiSizes::INDENT)
        );
    }
}
