// Parsers for the small token grammars used on the scatter command line.
// Malformed tokens are fatal configuration errors, unlike malformed data rows.

use crate::palette::{parse_color, Color};
use anyhow::{anyhow, Context, Result};

/// One `label:color/marker` entry from --z_color_map.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorMapEntry {
    pub label: String,
    pub color: Color,
    pub marker: char,
}

/// Parse a `label:color/marker` token. The label may itself contain colons;
/// the split happens at the last one.
pub fn parse_color_map_entry(token: &str) -> Result<ColorMapEntry> {
    let (label, value) = token
        .rsplit_once(':')
        .ok_or_else(|| anyhow!("Expected 'label:color/marker', got '{}'", token))?;
    let (color, marker) = value
        .split_once('/')
        .ok_or_else(|| anyhow!("Expected 'color/marker' after ':' in '{}'", token))?;
    let mut marker_chars = marker.chars();
    let marker = marker_chars
        .next()
        .ok_or_else(|| anyhow!("Empty marker in '{}'", token))?;
    if marker_chars.next().is_some() {
        return Err(anyhow!("Marker must be a single character in '{}'", token));
    }
    Ok(ColorMapEntry {
        label: label.to_string(),
        color: parse_color(color).with_context(|| format!("In color map entry '{}'", token))?,
        marker,
    })
}

/// A labelled horizontal or vertical reference line, `label=value[:color]`.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisAnnot {
    pub label: String,
    pub value: f64,
    pub color: Color,
}

pub fn parse_axis_annot(token: &str) -> Result<AxisAnnot> {
    let (body, color) = match token.rsplit_once(':') {
        Some((body, color)) => (
            body,
            parse_color(color).with_context(|| format!("In annotation '{}'", token))?,
        ),
        None => (token, parse_color("red")?),
    };
    let (label, value) = body
        .split_once('=')
        .ok_or_else(|| anyhow!("Expected 'label=value' in annotation '{}'", token))?;
    let value: f64 = value
        .parse()
        .with_context(|| format!("Bad numeric value in annotation '{}'", token))?;
    Ok(AxisAnnot {
        label: label.to_string(),
        value,
        color,
    })
}

/// A free line segment from --lines, `x1,y1,x2,y2,color`.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub color: Color,
}

pub fn parse_segment(token: &str) -> Result<Segment> {
    let parts: Vec<&str> = token.split(',').collect();
    if parts.len() != 5 {
        return Err(anyhow!(
            "Expected 'x1,y1,x2,y2,color' with 5 fields, got '{}'",
            token
        ));
    }
    let coord = |s: &str| -> Result<f64> {
        s.parse()
            .with_context(|| format!("Bad coordinate '{}' in line '{}'", s, token))
    };
    Ok(Segment {
        x1: coord(parts[0])?,
        y1: coord(parts[1])?,
        x2: coord(parts[2])?,
        y2: coord(parts[3])?,
        color: parse_color(parts[4]).with_context(|| format!("In line '{}'", token))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::Color;

    #[test]
    fn test_color_map_entry_basic() {
        let entry = parse_color_map_entry("treated:red/o").unwrap();
        assert_eq!(entry.label, "treated");
        assert_eq!(entry.marker, 'o');
    }

    #[test]
    fn test_color_map_entry_label_with_colon() {
        let entry = parse_color_map_entry("a:b:#102030/x").unwrap();
        assert_eq!(entry.label, "a:b");
        assert_eq!(entry.color, Color::rgb(0x10, 0x20, 0x30));
        assert_eq!(entry.marker, 'x');
    }

    #[test]
    fn test_color_map_entry_malformed() {
        assert!(parse_color_map_entry("no-separator").is_err());
        assert!(parse_color_map_entry("label:redo").is_err());
        assert!(parse_color_map_entry("label:red/").is_err());
        assert!(parse_color_map_entry("label:red/oo").is_err());
        assert!(parse_color_map_entry("label:badcolor/o").is_err());
    }

    #[test]
    fn test_axis_annot_with_color() {
        let annot = parse_axis_annot("threshold=3.5:blue").unwrap();
        assert_eq!(annot.label, "threshold");
        assert_eq!(annot.value, 3.5);
        assert_eq!(annot.color, parse_color("blue").unwrap());
    }

    #[test]
    fn test_axis_annot_default_color_is_red() {
        let annot = parse_axis_annot("cutoff=1").unwrap();
        assert_eq!(annot.color, parse_color("red").unwrap());
    }

    #[test]
    fn test_axis_annot_malformed() {
        assert!(parse_axis_annot("no-equals").is_err());
        assert!(parse_axis_annot("label=notanumber").is_err());
        assert!(parse_axis_annot("label=1:nocolor").is_err());
    }

    #[test]
    fn test_segment() {
        let seg = parse_segment("0,0,1,2,black").unwrap();
        assert_eq!((seg.x1, seg.y1, seg.x2, seg.y2), (0.0, 0.0, 1.0, 2.0));
        assert_eq!(seg.color, Color::rgb(0, 0, 0));
    }

    #[test]
    fn test_segment_malformed() {
        assert!(parse_segment("1,2,3,4").is_err());
        assert!(parse_segment("1,2,3,4,5,6").is_err());
        assert!(parse_segment("a,2,3,4,red").is_err());
    }
}
