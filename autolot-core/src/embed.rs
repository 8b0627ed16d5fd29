//! Iframe embed snippet for showing the inventory on another site.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedMode {
    #[default]
    Display,
    Edit,
}

impl EmbedMode {
    /// Mode requested by the `mode` query parameter; anything but `edit`
    /// is read-only display.
    pub fn from_query(mode: Option<&str>) -> Self {
        match mode {
            Some("edit") => Self::Edit,
            _ => Self::Display,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Display => "display",
            Self::Edit => "edit",
        }
    }
}

impl fmt::Display for EmbedMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Box-shadow preset of the embedded frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shadow {
    None,
    Sm,
    #[default]
    Md,
    Lg,
}

impl Shadow {
    /// CSS `box-shadow` value of the preset.
    pub fn css(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Sm => "0 1px 2px 0 rgba(0, 0, 0, 0.05)",
            Self::Md => "0 4px 6px -1px rgba(0, 0, 0, 0.1), 0 2px 4px -1px rgba(0, 0, 0, 0.06)",
            Self::Lg => "0 10px 15px -3px rgba(0, 0, 0, 0.1), 0 4px 6px -2px rgba(0, 0, 0, 0.05)",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedOptions {
    pub base_url: String,
    pub mode: EmbedMode,
    /// Frame height in pixels.
    pub height: u32,
    pub theme: Theme,
    /// Corner radius in pixels.
    pub border_radius: u32,
    pub shadow: Shadow,
}

impl EmbedOptions {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            mode: EmbedMode::default(),
            height: 800,
            theme: Theme::default(),
            border_radius: 8,
            shadow: Shadow::default(),
        }
    }

    /// Render the HTML snippet to paste into the host page.
    pub fn generate(&self) -> String {
        format!(
            "<iframe\n  src=\"{}?mode={}&theme={}\"\n  width=\"100%\"\n  height=\"{}px\"\n  style=\"border: none; border-radius: {}px; box-shadow: {}\"\n  allow=\"camera\"\n></iframe>",
            escape_attribute(self.base_url.trim_end_matches('/')),
            self.mode,
            self.theme,
            self.height,
            self.border_radius,
            self.shadow.css()
        )
    }
}

/// Escape text for use inside a double-quoted HTML attribute.
fn escape_attribute(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
