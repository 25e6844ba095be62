//! Player color generation
//!
//! Hues advance by the golden ratio from a random start so consecutive players
//! get well separated colors. Saturation and brightness are bounded to keep
//! every color visible on a white board.

use hashbrown::HashSet;
use rand::Rng;

use crate::game::constants::grid::UNPAINTED;
use crate::game::constants::palette::*;
use crate::game::state::Color;

/// Stateful color generator
#[derive(Debug, Clone)]
pub struct ColorPalette {
    hue: f32,
}

impl ColorPalette {
    pub fn new() -> Self {
        Self {
            hue: rand::thread_rng().gen_range(0.0..1.0),
        }
    }

    /// Next color not present in `taken` and never the unpainted sentinel
    pub fn next_distinct(&mut self, taken: &HashSet<&str>) -> Color {
        let mut rng = rand::thread_rng();

        for _ in 0..MAX_DISTINCT_ATTEMPTS {
            self.hue = (self.hue + GOLDEN_RATIO_CONJUGATE).fract();
            let saturation = rng.gen_range(SATURATION_MIN..=SATURATION_MAX);
            let value = rng.gen_range(VALUE_MIN..=VALUE_MAX);
            let color = hsv_to_hex(self.hue, saturation, value);
            if color != UNPAINTED && !taken.contains(color.as_str()) {
                return color;
            }
        }

        // Saturated hue space; fall back to uniform sampling
        loop {
            let color = format!("#{:06X}", rng.gen_range(0..0xFF_FFFFu32));
            if color != UNPAINTED && !taken.contains(color.as_str()) {
                return color;
            }
        }
    }
}

impl Default for ColorPalette {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert HSV (all components 0-1) to an uppercase `#RRGGBB` string
pub fn hsv_to_hex(hue: f32, saturation: f32, value: f32) -> Color {
    let h = (hue.rem_euclid(1.0)) * 6.0;
    let c = value * saturation;
    let x = c * (1.0 - ((h % 2.0) - 1.0).abs());
    let m = value - c;

    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    let to_byte = |channel: f32| ((channel + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    format!("#{:02X}{:02X}{:02X}", to_byte(r), to_byte(g), to_byte(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_hex_color(value: &str) -> bool {
        value.len() == 7
            && value.starts_with('#')
            && value[1..].chars().all(|c| c.is_ascii_hexdigit())
    }

    #[test]
    fn test_hsv_primaries() {
        assert_eq!(hsv_to_hex(0.0, 1.0, 1.0), "#FF0000");
        assert_eq!(hsv_to_hex(1.0 / 3.0, 1.0, 1.0), "#00FF00");
        assert_eq!(hsv_to_hex(2.0 / 3.0, 1.0, 1.0), "#0000FF");
        assert_eq!(hsv_to_hex(0.5, 0.0, 1.0), "#FFFFFF");
    }

    #[test]
    fn test_generated_colors_are_hex_and_not_white() {
        let mut palette = ColorPalette::new();
        let taken = HashSet::new();
        for _ in 0..200 {
            let color = palette.next_distinct(&taken);
            assert!(is_hex_color(&color), "bad color {}", color);
            assert!(color.chars().skip(1).all(|c| !c.is_ascii_lowercase()));
            assert_ne!(color, UNPAINTED);
        }
    }

    #[test]
    fn test_generated_colors_avoid_taken() {
        let mut palette = ColorPalette::new();
        let mut owned: Vec<Color> = Vec::new();
        for _ in 0..100 {
            let taken: HashSet<&str> = owned.iter().map(String::as_str).collect();
            let color = palette.next_distinct(&taken);
            assert!(!taken.contains(color.as_str()));
            drop(taken);
            owned.push(color);
        }
    }

    #[test]
    fn test_is_hex_color() {
        assert!(is_hex_color("#A1b2C3"));
        assert!(!is_hex_color("A1B2C3"));
        assert!(!is_hex_color("#A1B2C"));
        assert!(!is_hex_color("#GGGGGG"));
    }
}
