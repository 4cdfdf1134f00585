use crossterm::style::Color;
use std::hash::{DefaultHasher, Hash, Hasher};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorDepth {
    X256,
    X16,
}

/// Detect terminal color depth from environment.
/// Priority: CHATMUX_COLOR override -> COLORTERM/TERM hints -> fallback 16.
pub fn detect_color_depth() -> ColorDepth {
    if let Ok(force) = std::env::var("CHATMUX_COLOR") {
        match force.trim().to_ascii_lowercase().as_str() {
            "256" | "x256" | "256color" | "truecolor" | "24bit" => return ColorDepth::X256,
            "16" | "ansi" | "x16" => return ColorDepth::X16,
            _ => {}
        }
    }

    if let Ok(colorterm) = std::env::var("COLORTERM") {
        let s = colorterm.to_ascii_lowercase();
        if s.contains("truecolor") || s.contains("24bit") || s.contains("24-bit") {
            return ColorDepth::X256;
        }
    }
    if let Ok(term) = std::env::var("TERM") {
        if term.to_ascii_lowercase().contains("256color") {
            return ColorDepth::X256;
        }
    }
    ColorDepth::X16
}

/// Picks a stable color for `origin` within one session.
///
/// The same `(seed, origin)` always maps to the same color; a different seed
/// reshuffles the mapping. Only the non-dark part of the xterm cube is used
/// (every component at least 1), so text stays readable on dark backgrounds.
pub fn origin_color(seed: u64, origin: &str, depth: ColorDepth) -> Color {
    let mut hasher = DefaultHasher::new();
    seed.hash(&mut hasher);
    origin.hash(&mut hasher);
    let h = hasher.finish();

    let r = 1 + (h % 5) as u8;
    let g = 1 + ((h / 5) % 5) as u8;
    let b = 1 + ((h / 25) % 5) as u8;
    let index = 16 + 36 * r + 6 * g + b;

    match depth {
        ColorDepth::X256 => Color::AnsiValue(index),
        ColorDepth::X16 => {
            let (r, g, b) = xterm256_to_rgb(index);
            nearest_ansi16_from_rgb(r, g, b)
        }
    }
}

fn nearest_ansi16_from_rgb(r: u8, g: u8, b: u8) -> Color {
    // Foreground-safe subset: no black, no dark gray.
    const ANSI16: &[(u8, u8, u8, Color)] = &[
        (205, 0, 0, Color::DarkRed),
        (0, 205, 0, Color::DarkGreen),
        (205, 205, 0, Color::DarkYellow),
        (0, 0, 205, Color::DarkBlue),
        (205, 0, 205, Color::DarkMagenta),
        (0, 205, 205, Color::DarkCyan),
        (229, 229, 229, Color::Grey),
        (255, 0, 0, Color::Red),
        (0, 255, 0, Color::Green),
        (255, 255, 0, Color::Yellow),
        (92, 92, 255, Color::Blue),
        (255, 0, 255, Color::Magenta),
        (0, 255, 255, Color::Cyan),
        (255, 255, 255, Color::White),
    ];

    let mut best = 0usize;
    let mut best_dist = u32::MAX;
    for (i, &(rr, gg, bb, _)) in ANSI16.iter().enumerate() {
        let dr = rr as i32 - r as i32;
        let dg = gg as i32 - g as i32;
        let db = bb as i32 - b as i32;
        let dist = (dr * dr + dg * dg + db * db) as u32;
        if dist < best_dist {
            best_dist = dist;
            best = i;
        }
    }
    ANSI16[best].3
}

fn xterm_cube_comp(i: u8) -> u8 {
    if i == 0 {
        0
    } else {
        55 + 40 * i
    }
}

fn xterm256_to_rgb(i: u8) -> (u8, u8, u8) {
    match i {
        16..=231 => {
            let mut n = i - 16;
            let r = n / 36;
            n %= 36;
            let g = n / 6;
            n %= 6;
            (xterm_cube_comp(r), xterm_cube_comp(g), xterm_cube_comp(n))
        }
        232..=255 => {
            let v = 8 + 10 * (i - 232);
            (v, v, v)
        }
        _ => (255, 255, 255),
    }
}
