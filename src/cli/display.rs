// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Terminal output helpers.
//!
//! Everything the CLI prints goes through `paint` with a semantic `Tone`, so the
//! palette lives in one place. `NO_COLOR` or a non-TTY stdout turns painting off.
//!
//! The light palette is used when `PULSE_THEME` says so, or, failing that, when
//! `COLORFGBG` reports a light background. Dark otherwise.

use std::sync::OnceLock;

// Width between │ and │ (excluding border chars)
pub const BOX_WIDTH: usize = 72;

pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";

// ═══════════════════════════════════════════════════════════════════════════
// PALETTE
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Dark,
    Light,
}

/// What a piece of output means, independent of the color it ends up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Good,
    Bad,
    Warn,
    Accent,
    Info,
    Muted,
}

type Rgb = (u8, u8, u8);

struct Palette {
    good: Rgb,
    bad: Rgb,
    warn: Rgb,
    accent: Rgb,
    info: Rgb,
    muted: Rgb,
}

impl Palette {
    fn get(&self, tone: Tone) -> Rgb {
        match tone {
            Tone::Good => self.good,
            Tone::Bad => self.bad,
            Tone::Warn => self.warn,
            Tone::Accent => self.accent,
            Tone::Info => self.info,
            Tone::Muted => self.muted,
        }
    }
}

const DARK: Palette = Palette {
    good: (152, 195, 121),
    bad: (224, 108, 117),
    warn: (229, 192, 123),
    accent: (97, 175, 239),
    info: (86, 182, 194),
    muted: (92, 99, 112),
};

const LIGHT: Palette = Palette {
    good: (80, 161, 79),
    bad: (228, 86, 73),
    warn: (193, 132, 1),
    accent: (64, 120, 242),
    info: (1, 132, 188),
    muted: (160, 161, 167),
};

/// Decide the theme from a `PULSE_THEME` value and a `COLORFGBG` value.
///
/// An unrecognized `PULSE_THEME` is ignored rather than rejected.
pub fn pick_theme(requested: Option<&str>, colorfgbg: Option<&str>) -> Theme {
    let requested = requested.and_then(|value| match value.trim().to_ascii_lowercase().as_str() {
        "light" | "l" => Some(Theme::Light),
        "dark" | "d" => Some(Theme::Dark),
        _ => None,
    });
    requested
        .or_else(|| colorfgbg.and_then(background_theme))
        .unwrap_or(Theme::Dark)
}

// COLORFGBG is "fg;bg" (sometimes "fg;default;bg"). Background 7 and 9-15 are light.
fn background_theme(colorfgbg: &str) -> Option<Theme> {
    let bg: u8 = colorfgbg.rsplit(';').next()?.trim().parse().ok()?;
    (bg >= 7 && bg != 8).then_some(Theme::Light)
}

static THEME: OnceLock<Theme> = OnceLock::new();

pub fn theme() -> Theme {
    *THEME.get_or_init(|| {
        let requested = std::env::var("PULSE_THEME").ok();
        let colorfgbg = std::env::var("COLORFGBG").ok();
        pick_theme(requested.as_deref(), colorfgbg.as_deref())
    })
}

fn foreground((r, g, b): Rgb) -> String {
    format!("\x1b[38;2;{};{};{}m", r, g, b)
}

fn tone_escape(theme: Theme, tone: Tone) -> String {
    let palette = match theme {
        Theme::Dark => &DARK,
        Theme::Light => &LIGHT,
    };
    foreground(palette.get(tone))
}

// ═══════════════════════════════════════════════════════════════════════════
// CORE UTILITIES
// ═══════════════════════════════════════════════════════════════════════════

/// False under `NO_COLOR` or when stdout is not a terminal.
pub fn use_colors() -> bool {
    std::env::var_os("NO_COLOR").is_none() && atty::is(atty::Stream::Stdout)
}

/// `text` in the tone's color plus any `modifiers`, or plain when colors are off.
pub fn paint(tone: Tone, modifiers: &[&str], text: &str) -> String {
    if !use_colors() {
        return text.to_string();
    }
    format!("{}{}{}{}", modifiers.concat(), tone_escape(theme(), tone), text, RESET)
}

/// Visible length, excluding ANSI codes
pub fn visible_len(s: &str) -> usize {
    let mut in_escape = false;
    let mut len = 0;
    for c in s.chars() {
        if c == '\x1b' {
            in_escape = true;
        } else if in_escape && c == 'm' {
            in_escape = false;
        } else if !in_escape {
            len += 1;
        }
    }
    len
}

// Escapes that open and close a stretch of box border.
fn frame() -> (String, &'static str) {
    if use_colors() {
        (tone_escape(theme(), Tone::Muted), RESET)
    } else {
        (String::new(), "")
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// BOX DRAWING
// ═══════════════════════════════════════════════════════════════════════════

/// Print a content line: │ content          │
pub fn row(content: &str) {
    let content = truncate(content, BOX_WIDTH);
    let pad = BOX_WIDTH.saturating_sub(visible_len(&content));
    let (b, r) = frame();
    println!("{}│{}{}{}{}│{}", b, r, content, " ".repeat(pad), b, r);
}

/// Print a label/value line: │ label      value │
pub fn field(label: &str, value: &str) {
    let label = paint(Tone::Muted, &[], &format!(" {:<16}", label));
    row(&format!("{}{}", label, value));
}

/// Print section header: ┌─ LABEL ──────────┐
pub fn section_top(label: &str) {
    let label_part = format!("─ {} ", paint(Tone::Info, &[BOLD], label));
    let remaining = BOX_WIDTH.saturating_sub(visible_len(&label_part));
    let (b, r) = frame();
    println!("{}┌{}{}{}{}┐{}", b, r, label_part, b, "─".repeat(remaining), r);
}

/// Print section footer: └──────────────────┘
pub fn section_bot() {
    let (b, r) = frame();
    println!("{}└{}┘{}", b, "─".repeat(BOX_WIDTH), r);
}

// ═══════════════════════════════════════════════════════════════════════════
// SEMANTIC FORMATTERS
// ═══════════════════════════════════════════════════════════════════════════

/// Right-pad a styled string to a fixed visible width
pub fn pad_right(s: &str, width: usize) -> String {
    let visible = visible_len(s);
    if visible >= width {
        s.to_string()
    } else {
        format!("{}{}", s, " ".repeat(width - visible))
    }
}

/// Cut plain text to `max` chars, ending in `…` when cut
pub fn truncate(s: &str, max: usize) -> String {
    if visible_len(s) <= max || s.contains('\x1b') {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// Format bytes as human-readable size
pub fn format_size(bytes: usize) -> String {
    if bytes >= 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / 1024.0 / 1024.0)
    } else if bytes >= 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{} B", bytes)
    }
}

/// Color-coded score value
pub fn score_value(score: f64) -> String {
    paint(score_tone(score), &[], &format!("{:>9.2}", score))
}

fn score_tone(score: f64) -> Tone {
    if score >= 50.0 {
        Tone::Good
    } else if score >= 10.0 {
        Tone::Warn
    } else if score < 0.0 {
        Tone::Bad
    } else {
        Tone::Muted
    }
}

/// Color-coded vote marker
pub fn vote_marker(vote: Option<pulse::Vote>) -> String {
    match vote {
        Some(pulse::Vote::Up) => paint(Tone::Good, &[BOLD], "▲"),
        Some(pulse::Vote::Down) => paint(Tone::Bad, &[BOLD], "▼"),
        Some(pulse::Vote::None) => paint(Tone::Muted, &[DIM], "·"),
        None => " ".to_string(),
    }
}
