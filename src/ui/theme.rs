//! Terminal colors for the light and dark themes.

use crate::config::Theme;
use ratatui::style::Color;

/// Colors used by every screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub bg: Color,
    pub fg: Color,
    pub accent: Color,
    pub muted: Color,
    pub highlight: Color,
    pub alert_bg: Color,
    pub alert_fg: Color,
    pub paused: Color,
}

impl Palette {
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Dark => Self {
                bg: Color::Rgb(0, 0, 0),
                fg: Color::Rgb(206, 224, 220),
                accent: Color::Rgb(185, 207, 212),
                muted: Color::Rgb(100, 100, 100),
                highlight: Color::Rgb(20, 20, 20),
                alert_bg: Color::Rgb(255, 0, 0),
                alert_fg: Color::Rgb(255, 255, 255),
                paused: Color::Yellow,
            },
            Theme::Light => Self {
                bg: Color::Rgb(250, 250, 248),
                fg: Color::Rgb(30, 34, 38),
                accent: Color::Rgb(40, 90, 120),
                muted: Color::Rgb(140, 140, 140),
                highlight: Color::Rgb(225, 232, 238),
                alert_bg: Color::Rgb(200, 30, 30),
                alert_fg: Color::Rgb(255, 255, 255),
                paused: Color::Rgb(170, 120, 0),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn themes_differ_in_background() {
        assert_ne!(
            Palette::for_theme(Theme::Light).bg,
            Palette::for_theme(Theme::Dark).bg
        );
    }
}
