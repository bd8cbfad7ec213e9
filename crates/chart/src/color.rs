/// Lightens a `#rgb` / `#rrggbb` color by raising its HSL lightness by
/// `ratio` of itself. Unparseable input is returned unchanged.
pub fn lighten(color: &str, ratio: f64) -> String {
    let Some((r, g, b)) = parse_hex(color) else {
        return color.to_string();
    };
    let (h, s, l) = rgb_to_hsl(r, g, b);
    let l = (l + l * ratio).clamp(0.0, 1.0);
    let (r, g, b) = hsl_to_rgb(h, s, l);
    format!("#{r:02x}{g:02x}{b:02x}")
}

fn parse_hex(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.strip_prefix('#')?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        3 => {
            let digit = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|d| d * 17);
            Some((digit(0)?, digit(1)?, digit(2)?))
        }
        6 => {
            let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
            Some((byte(0)?, byte(2)?, byte(4)?))
        }
        _ => None,
    }
}

fn rgb_to_hsl(r: u8, g: u8, b: u8) -> (f64, f64, f64) {
    let (r, g, b) = (r as f64 / 255.0, g as f64 / 255.0, b as f64 / 255.0);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;
    let delta = max - min;
    if delta == 0.0 {
        return (0.0, 0.0, l);
    }

    let s = if l > 0.5 {
        delta / (2.0 - max - min)
    } else {
        delta / (max + min)
    };
    let h = if max == r {
        (g - b) / delta + if g < b { 6.0 } else { 0.0 }
    } else if max == g {
        (b - r) / delta + 2.0
    } else {
        (r - g) / delta + 4.0
    };
    (h / 6.0, s, l)
}

fn hsl_to_rgb(h: f64, s: f64, l: f64) -> (u8, u8, u8) {
    if s == 0.0 {
        let v = to_byte(l);
        return (v, v, v);
    }
    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    (
        to_byte(hue_to_channel(p, q, h + 1.0 / 3.0)),
        to_byte(hue_to_channel(p, q, h)),
        to_byte(hue_to_channel(p, q, h - 1.0 / 3.0)),
    )
}

fn hue_to_channel(p: f64, q: f64, mut t: f64) -> f64 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

fn to_byte(v: f64) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lighten_grey() {
        // lightness 0.5 -> 0.65
        assert_eq!(lighten("#808080", 0.3), "#a6a6a6");
    }

    #[test]
    fn lighten_keeps_hue() {
        let out = lighten("#ff0000", 0.3);
        let (r, g, b) = parse_hex(&out).unwrap();
        assert_eq!(r, 255);
        assert_eq!(g, b);
        assert!(g > 0);
    }

    #[test]
    fn short_hex_and_bad_input() {
        assert_eq!(lighten("#000", 0.3), "#000000");
        assert_eq!(lighten("#fff", 0.3), "#ffffff");
        assert_eq!(lighten("teal", 0.3), "teal");
        assert_eq!(lighten("#12345", 0.3), "#12345");
    }

    #[test]
    fn round_trips_without_change() {
        assert_eq!(lighten("#444674", 0.0), "#444674");
    }
}
