//! Colours, fonts and text measurement.
//!
//! Only the PDF builtin Helvetica family is used, so measurement works from the standard
//! Helvetica advance widths rather than from font files.

use crate::constants::DEFAULT_PRIMARY_COLOR;

/// 8-bit RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

pub const WHITE: Rgb = Rgb::new(0xff, 0xff, 0xff);
pub const TEXT_DARK: Rgb = Rgb::new(0x33, 0x33, 0x33);
pub const TEXT_MUTED: Rgb = Rgb::new(0x66, 0x66, 0x66);
pub const TEXT_FAINT: Rgb = Rgb::new(0x99, 0x99, 0x99);
pub const BORDER: Rgb = Rgb::new(0xe0, 0xe0, 0xe0);

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rgb` or `#rrggbb` (the leading `#` is optional).
    pub fn parse_hex(input: &str) -> Option<Self> {
        let hex = input.trim().trim_start_matches('#');
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        match hex.len() {
            3 => {
                let expand = |i: usize| channel(&hex[i..i + 1]).map(|v| v * 17);
                Some(Self::new(expand(0)?, expand(1)?, expand(2)?))
            }
            6 => Some(Self::new(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            _ => None,
        }
    }

    /// Blend towards white; `amount` 0.0 keeps the colour, 1.0 gives white.
    pub fn tint(self, amount: f32) -> Self {
        let amount = amount.clamp(0.0, 1.0);
        let mix = |c: u8| (c as f32 + (255.0 - c as f32) * amount).round() as u8;
        Self::new(mix(self.r), mix(self.g), mix(self.b))
    }

    /// Relative luminance in 0.0..=1.0 (Rec. 709 weights, no gamma correction).
    pub fn luminance(self) -> f32 {
        (0.2126 * self.r as f32 + 0.7152 * self.g as f32 + 0.0722 * self.b as f32) / 255.0
    }

    pub fn channels(self) -> (f32, f32, f32) {
        (
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        )
    }
}

/// Brand colours derived from the hospital's configured primary colour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Theme {
    /// Fills for the title band and strips.
    pub primary: Rgb,
    /// Header band background.
    pub header_tint: Rgb,
    /// Text drawn on white in the brand colour. Falls back to the default colour when the
    /// configured one would be unreadable.
    pub accent_text: Rgb,
}

impl Theme {
    pub fn from_primary(primary: Option<&str>) -> Self {
        let fallback = Rgb::parse_hex(DEFAULT_PRIMARY_COLOR).unwrap_or(TEXT_DARK);
        let primary = primary.and_then(Rgb::parse_hex).unwrap_or(fallback);
        let accent_text = if primary.luminance() > 0.8 {
            fallback
        } else {
            primary
        };
        Self {
            primary,
            header_tint: primary.tint(0.9),
            accent_text,
        }
    }

    /// Colour for text drawn on top of `primary` fills.
    pub fn on_primary(&self) -> Rgb {
        if self.primary.luminance() > 0.6 {
            TEXT_DARK
        } else {
            WHITE
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
    Italic,
}

/// Helvetica advance widths for ASCII 32..=126, in 1/1000 em.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    278, 278, 584, 584, 584, 556, 1015, // ':'..'@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // 'A'..'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // 'N'..'Z'
    278, 278, 278, 469, 556, 333, // '['..'`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // 'a'..'m'
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // 'n'..'z'
    334, 260, 334, 584, // '{'..'~'
];

const FALLBACK_WIDTH: u16 = 556;

// Helvetica-Bold runs roughly 6% wider than the regular cut.
const BOLD_FACTOR: f32 = 1.06;

fn char_width(c: char) -> u16 {
    let code = c as u32;
    if (32..=126).contains(&code) {
        HELVETICA_WIDTHS[(code - 32) as usize]
    } else {
        FALLBACK_WIDTH
    }
}

/// Approximate rendered width of `text` in points.
pub fn text_width(text: &str, size: f32, font: Font) -> f32 {
    let units: u32 = text.chars().map(|c| char_width(c) as u32).sum();
    let width = units as f32 * size / 1000.0;
    match font {
        Font::Bold => width * BOLD_FACTOR,
        Font::Regular | Font::Italic => width,
    }
}

/// Greedy word wrap within `max_width` points.
///
/// Explicit line breaks are kept. Words wider than a whole line are split by character. Blank
/// input lines are dropped.
pub fn wrap_text(text: &str, max_width: f32, size: f32, font: Font) -> Vec<String> {
    let mut lines = Vec::new();

    for raw_line in text.lines() {
        let mut current = String::new();
        for word in raw_line.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };

            if text_width(&candidate, size, font) <= max_width {
                current = candidate;
                continue;
            }

            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }

            if text_width(word, size, font) <= max_width {
                current = word.to_string();
            } else {
                for c in word.chars() {
                    current.push(c);
                    if text_width(&current, size, font) > max_width && current.chars().count() > 1 {
                        current.pop();
                        lines.push(std::mem::replace(&mut current, c.to_string()));
                    }
                }
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }

    lines
}

/// Shorten `text` with a trailing `...` so that it fits in `max_width`.
pub fn truncate_to_width(text: &str, max_width: f32, size: f32, font: Font) -> String {
    if text_width(text, size, font) <= max_width {
        return text.to_string();
    }

    let mut kept: String = text.to_string();
    while !kept.is_empty() {
        kept.pop();
        let candidate = format!("{}...", kept.trim_end());
        if text_width(&candidate, size, font) <= max_width {
            return candidate;
        }
    }
    "...".to_string()
}
