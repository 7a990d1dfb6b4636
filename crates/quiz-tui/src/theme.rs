use crossterm::style::Color;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Named theme, as stored in the user's settings and the config file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ThemeName {
    #[default]
    Dark,
    Light,
    HighContrast,
}

impl ThemeName {
    pub fn next(&self) -> ThemeName {
        match self {
            ThemeName::Dark => ThemeName::Light,
            ThemeName::Light => ThemeName::HighContrast,
            ThemeName::HighContrast => ThemeName::Dark,
        }
    }
}

impl fmt::Display for ThemeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThemeName::Dark => write!(f, "Dark"),
            ThemeName::Light => write!(f, "Light"),
            ThemeName::HighContrast => write!(f, "High contrast"),
        }
    }
}

impl FromStr for ThemeName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "dark" => Ok(ThemeName::Dark),
            "light" => Ok(ThemeName::Light),
            "high-contrast" | "highcontrast" => Ok(ThemeName::HighContrast),
            other => Err(format!("unknown theme '{}'", other)),
        }
    }
}

/// Color theme for the TUI
#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    /// Background color
    pub bg: Color,
    /// Default text color
    pub fg: Color,
    /// Frame and separator color
    pub border: Color,
    /// The problem being asked
    pub problem: Color,
    /// Digits typed so far
    pub input: Color,
    /// Selected menu row / field background
    pub selected_bg: Color,
    /// Correct answer feedback
    pub success: Color,
    /// Wrong answer and error feedback
    pub error: Color,
    /// Countdown bar while plenty of time is left
    pub timer: Color,
    /// Countdown bar in the last few seconds
    pub timer_low: Color,
    /// Secondary text
    pub info: Color,
    /// Key binding text color
    pub key: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

impl Theme {
    pub fn from_name(name: ThemeName) -> Self {
        match name {
            ThemeName::Dark => Self::dark(),
            ThemeName::Light => Self::light(),
            ThemeName::HighContrast => Self::high_contrast(),
        }
    }

    /// Dark theme (default)
    pub fn dark() -> Self {
        Self {
            bg: Color::Rgb { r: 0, g: 0, b: 0 },
            fg: Color::Rgb { r: 235, g: 235, b: 240 },
            border: Color::Rgb { r: 70, g: 75, b: 90 },
            problem: Color::Rgb { r: 255, g: 255, b: 255 },
            input: Color::Rgb { r: 80, g: 180, b: 255 },
            selected_bg: Color::Rgb { r: 60, g: 70, b: 110 },
            success: Color::Rgb { r: 90, g: 255, b: 130 },
            error: Color::Rgb { r: 255, g: 90, b: 90 },
            timer: Color::Rgb { r: 160, g: 165, b: 185 },
            timer_low: Color::Rgb { r: 255, g: 150, b: 60 },
            info: Color::Rgb { r: 150, g: 150, b: 165 },
            key: Color::Rgb { r: 255, g: 210, b: 100 },
        }
    }

    /// Light theme
    pub fn light() -> Self {
        Self {
            bg: Color::Rgb { r: 248, g: 248, b: 252 },
            fg: Color::Rgb { r: 30, g: 30, b: 40 },
            border: Color::Rgb { r: 180, g: 180, b: 195 },
            problem: Color::Rgb { r: 0, g: 0, b: 0 },
            input: Color::Rgb { r: 30, g: 100, b: 200 },
            selected_bg: Color::Rgb { r: 190, g: 205, b: 255 },
            success: Color::Rgb { r: 40, g: 160, b: 60 },
            error: Color::Rgb { r: 220, g: 50, b: 50 },
            timer: Color::Rgb { r: 90, g: 90, b: 110 },
            timer_low: Color::Rgb { r: 210, g: 110, b: 20 },
            info: Color::Rgb { r: 90, g: 90, b: 110 },
            key: Color::Rgb { r: 200, g: 120, b: 20 },
        }
    }

    /// High contrast theme
    pub fn high_contrast() -> Self {
        Self {
            bg: Color::Black,
            fg: Color::White,
            border: Color::Grey,
            problem: Color::Yellow,
            input: Color::Cyan,
            selected_bg: Color::Blue,
            success: Color::Green,
            error: Color::Red,
            timer: Color::White,
            timer_low: Color::Red,
            info: Color::Grey,
            key: Color::Yellow,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_names_parse() {
        assert_eq!("dark".parse::<ThemeName>().unwrap(), ThemeName::Dark);
        assert_eq!("Light".parse::<ThemeName>().unwrap(), ThemeName::Light);
        assert_eq!(
            "high_contrast".parse::<ThemeName>().unwrap(),
            ThemeName::HighContrast
        );
        assert!("neon".parse::<ThemeName>().is_err());
    }

    #[test]
    fn test_next_cycles_through_all() {
        let mut name = ThemeName::Dark;
        for _ in 0..3 {
            name = name.next();
        }
        assert_eq!(name, ThemeName::Dark);
        assert_eq!(Theme::from_name(ThemeName::Light), Theme::light());
    }
}
