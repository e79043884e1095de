//! Text handling for the built-in PDF fonts
//!
//! The standard 14 fonts only cover a Latin character set and ship no metrics
//! with printpdf, so this module provides both: a sanitizer that reduces
//! arbitrary model output to printable characters, and approximate advance
//! widths (Helvetica AFM widths, scaled per face) for centering, wrapping and
//! truncation.

use crate::theme::FontStyle;

/// The built-in faces the renderer uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontFace {
    TimesRoman,
    TimesBold,
    TimesItalic,
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
}

impl FontFace {
    /// Width relative to regular Helvetica
    fn width_scale(self) -> f32 {
        match self {
            FontFace::Helvetica | FontFace::HelveticaOblique => 1.0,
            FontFace::HelveticaBold => 1.06,
            FontFace::TimesRoman => 0.89,
            FontFace::TimesBold => 0.93,
            FontFace::TimesItalic => 0.87,
        }
    }
}

/// Title/body/italic faces for a font style
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontSet {
    pub title: FontFace,
    pub body: FontFace,
    pub italic: FontFace,
}

impl FontSet {
    pub fn for_style(style: FontStyle) -> Self {
        match style {
            FontStyle::Serif => Self {
                title: FontFace::TimesBold,
                body: FontFace::TimesRoman,
                italic: FontFace::TimesItalic,
            },
            FontStyle::SansSerif => Self {
                title: FontFace::HelveticaBold,
                body: FontFace::Helvetica,
                italic: FontFace::HelveticaOblique,
            },
        }
    }
}

/// Helvetica advance widths for ' ' (0x20) through '~' (0x7e), per 1000 em
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

const FALLBACK_WIDTH: u16 = 556;

fn char_width(c: char) -> u16 {
    let code = c as u32;
    if (0x20..=0x7e).contains(&code) {
        HELVETICA_WIDTHS[(code - 0x20) as usize]
    } else {
        FALLBACK_WIDTH
    }
}

/// Approximate rendered width of `text` in points
pub fn text_width(text: &str, face: FontFace, size: f32) -> f32 {
    let units: u32 = text.chars().map(|c| char_width(c) as u32).sum();
    units as f32 / 1000.0 * size * face.width_scale()
}

/// Reduce text to characters the built-in fonts can show.
///
/// Typographic punctuation becomes its ASCII cousin, Latin-1 letters are
/// kept, everything else (emoji, music symbols, snowflakes) is dropped.
pub fn pdf_safe(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\u{2010}'..='\u{2015}' | '\u{2212}' => out.push('-'),
            '\u{2018}' | '\u{2019}' | '\u{201a}' | '\u{2032}' => out.push('\''),
            '\u{201c}' | '\u{201d}' | '\u{201e}' | '\u{2033}' => out.push('"'),
            '\u{2026}' => out.push_str("..."),
            '\u{2022}' | '\u{2219}' => out.push('\u{b7}'),
            '\t' | '\n' | '\r' => out.push(' '),
            c if c.is_control() => {}
            c if (c as u32) <= 0xff => out.push(c),
            _ => {}
        }
    }
    out
}

/// Sanitize a decoration; `None` when nothing printable is left.
pub fn printable_decoration(text: &str) -> Option<String> {
    let cleaned = pdf_safe(text);
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

/// Greedy word wrap to `max_width` points. Words wider than a line are split.
pub fn wrap(text: &str, face: FontFace, size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current, word)
        };

        if text_width(&candidate, face, size) <= max_width {
            current = candidate;
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }

        if text_width(word, face, size) <= max_width {
            current = word.to_string();
        } else {
            for c in word.chars() {
                current.push(c);
                if text_width(&current, face, size) > max_width && current.chars().count() > 1 {
                    current.pop();
                    lines.push(std::mem::take(&mut current));
                    current.push(c);
                }
            }
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Cut `text` so it fits in `max_width`, marking the cut with "...".
pub fn truncate_to_width(text: &str, face: FontFace, size: f32, max_width: f32) -> String {
    if text_width(text, face, size) <= max_width {
        return text.to_string();
    }
    let mut chars: Vec<char> = text.chars().collect();
    while !chars.is_empty() {
        chars.pop();
        let candidate: String = chars.iter().collect::<String>().trim_end().to_string() + "...";
        if text_width(&candidate, face, size) <= max_width {
            return candidate;
        }
    }
    String::new()
}
