use anyhow::{anyhow, Result};

/// An RGB color with an alpha channel, independent of any drawing backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f64,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b, a: 1.0 }
    }

    pub fn with_alpha(self, a: f64) -> Self {
        Color { a, ..self }
    }
}

/// Default categorical color cycle (matplotlib's tab10 palette).
pub const COLORS: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

/// Marker glyphs, advanced each time the color cycle wraps around.
pub const MARKERS: [char; 25] = [
    '^', 'x', 'v', 'o', '<', '>', '1', '2', '3', '4', '8', 's', 'p', 'P', '*', 'h', 'H', '+', 'X',
    'D', 'd', '.', ',', '|', '_',
];

/// Neutral fill for points whose z value cannot be mapped through a colormap.
pub const CMAP_FALLBACK: Color = Color {
    r: 153,
    g: 153,
    b: 153,
    a: 0.5,
};

/// Color for the nth distinct group, cycling through the palette.
pub fn cycle_color(index: usize) -> Color {
    parse_color(COLORS[index % COLORS.len()]).unwrap_or(CMAP_FALLBACK)
}

/// Marker for the nth distinct group; advances once per full color cycle.
pub fn cycle_marker(index: usize) -> char {
    MARKERS[(index / COLORS.len()) % MARKERS.len()]
}

/// Parse a `#rrggbb` hex string or a small table of well-known color names.
pub fn parse_color(s: &str) -> Result<Color> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix('#') {
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(anyhow!("Invalid hex color '{}'", s));
        }
        let r = u8::from_str_radix(&hex[0..2], 16)?;
        let g = u8::from_str_radix(&hex[2..4], 16)?;
        let b = u8::from_str_radix(&hex[4..6], 16)?;
        return Ok(Color::rgb(r, g, b));
    }
    let color = match s.to_ascii_lowercase().as_str() {
        "red" | "r" => Color::rgb(214, 39, 40),
        "green" | "g" => Color::rgb(44, 160, 44),
        "blue" | "b" => Color::rgb(31, 119, 180),
        "black" | "k" => Color::rgb(0, 0, 0),
        "white" | "w" => Color::rgb(255, 255, 255),
        "yellow" | "y" => Color::rgb(255, 255, 0),
        "cyan" | "c" => Color::rgb(23, 190, 207),
        "magenta" | "m" => Color::rgb(227, 119, 194),
        "orange" => Color::rgb(255, 127, 14),
        "purple" => Color::rgb(148, 103, 189),
        "brown" => Color::rgb(140, 86, 75),
        "pink" => Color::rgb(255, 192, 203),
        "olive" => Color::rgb(188, 189, 34),
        "gray" | "grey" => Color::rgb(127, 127, 127),
        other => return Err(anyhow!("Unknown color '{}'", other)),
    };
    Ok(color)
}

/// A continuous colormap defined by evenly understood stops, sampled by linear
/// interpolation between adjacent stops.
#[derive(Debug, Clone, Copy)]
pub struct Colormap {
    pub name: &'static str,
    stops: &'static [(f64, [u8; 3])],
}

const VIRIDIS: &[(f64, [u8; 3])] = &[
    (0.0, [68, 1, 84]),
    (0.13, [71, 44, 122]),
    (0.25, [59, 81, 139]),
    (0.38, [44, 113, 142]),
    (0.5, [33, 144, 141]),
    (0.63, [39, 173, 129]),
    (0.75, [92, 200, 99]),
    (0.88, [170, 220, 50]),
    (1.0, [253, 231, 37]),
];

const PLASMA: &[(f64, [u8; 3])] = &[
    (0.0, [13, 8, 135]),
    (0.25, [126, 3, 168]),
    (0.5, [204, 71, 120]),
    (0.75, [248, 149, 64]),
    (1.0, [240, 249, 33]),
];

const MAGMA: &[(f64, [u8; 3])] = &[
    (0.0, [0, 0, 4]),
    (0.25, [81, 18, 124]),
    (0.5, [183, 55, 121]),
    (0.75, [252, 137, 97]),
    (1.0, [252, 253, 191]),
];

const GRAY: &[(f64, [u8; 3])] = &[(0.0, [0, 0, 0]), (1.0, [255, 255, 255])];

const JET: &[(f64, [u8; 3])] = &[
    (0.0, [0, 0, 131]),
    (0.125, [0, 60, 170]),
    (0.375, [5, 255, 255]),
    (0.625, [255, 255, 0]),
    (0.875, [250, 0, 0]),
    (1.0, [128, 0, 0]),
];

const COOLWARM: &[(f64, [u8; 3])] = &[
    (0.0, [59, 76, 192]),
    (0.5, [221, 221, 221]),
    (1.0, [180, 4, 38]),
];

impl Colormap {
    /// Look up a colormap by its matplotlib name. Unknown names are a fatal
    /// configuration error for the caller.
    pub fn by_name(name: &str) -> Result<Colormap> {
        let (name, stops) = match name.to_ascii_lowercase().as_str() {
            "viridis" => ("viridis", VIRIDIS),
            "plasma" => ("plasma", PLASMA),
            "magma" => ("magma", MAGMA),
            "gray" | "grey" => ("gray", GRAY),
            "jet" => ("jet", JET),
            "coolwarm" => ("coolwarm", COOLWARM),
            _ => return Err(anyhow!("Unknown colormap '{}'", name)),
        };
        Ok(Colormap { name, stops })
    }

    pub fn default_map() -> Colormap {
        Colormap {
            name: "viridis",
            stops: VIRIDIS,
        }
    }

    /// Sample the map at t in [0, 1]; t is clamped.
    pub fn sample(&self, t: f64) -> Color {
        let t = t.clamp(0.0, 1.0);
        let mut prev = self.stops[0];
        for &stop in self.stops.iter() {
            if t <= stop.0 {
                let span = stop.0 - prev.0;
                let f = if span > 0.0 { (t - prev.0) / span } else { 0.0 };
                return Color::rgb(
                    lerp_channel(prev.1[0], stop.1[0], f),
                    lerp_channel(prev.1[1], stop.1[1], f),
                    lerp_channel(prev.1[2], stop.1[2], f),
                );
            }
            prev = stop;
        }
        let last = self.stops[self.stops.len() - 1].1;
        Color::rgb(last[0], last[1], last[2])
    }
}

fn lerp_channel(a: u8, b: u8, f: f64) -> u8 {
    (a as f64 + (b as f64 - a as f64) * f).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_color_hex() {
        let c = parse_color("#1f77b4").unwrap();
        assert_eq!((c.r, c.g, c.b), (0x1f, 0x77, 0xb4));
    }

    #[test]
    fn test_parse_color_name() {
        assert_eq!(parse_color("black").unwrap(), Color::rgb(0, 0, 0));
        assert_eq!(parse_color("w").unwrap(), Color::rgb(255, 255, 255));
    }

    #[test]
    fn test_parse_color_unknown_is_fatal() {
        assert!(parse_color("not-a-color").is_err());
        assert!(parse_color("#12345").is_err());
        // six bytes of UTF-8 is not six hex digits
        assert!(parse_color("#aé€").is_err());
    }

    #[test]
    fn test_cycle_color_wraps() {
        assert_eq!(cycle_color(0), cycle_color(COLORS.len()));
        assert_ne!(cycle_color(0), cycle_color(1));
    }

    #[test]
    fn test_cycle_marker_advances_per_color_cycle() {
        assert_eq!(cycle_marker(0), MARKERS[0]);
        assert_eq!(cycle_marker(COLORS.len() - 1), MARKERS[0]);
        assert_eq!(cycle_marker(COLORS.len()), MARKERS[1]);
    }

    #[test]
    fn test_colormap_endpoints() {
        let map = Colormap::by_name("viridis").unwrap();
        assert_eq!(map.sample(0.0), Color::rgb(68, 1, 84));
        assert_eq!(map.sample(1.0), Color::rgb(253, 231, 37));
        // out-of-range samples clamp
        assert_eq!(map.sample(-1.0), map.sample(0.0));
        assert_eq!(map.sample(2.0), map.sample(1.0));
    }

    #[test]
    fn test_colormap_interpolates() {
        let map = Colormap::by_name("gray").unwrap();
        let mid = map.sample(0.5);
        assert_eq!((mid.r, mid.g, mid.b), (128, 128, 128));
    }

    #[test]
    fn test_colormap_unknown_name() {
        assert!(Colormap::by_name("nope").is_err());
    }
}
