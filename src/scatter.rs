use crate::extract::{self, SkipReason};
use crate::palette::{self, Color, Colormap};
use crate::reader::TableData;
use crate::tokens::ColorMapEntry;
use log::debug;
use rand::Rng;

/// How point colors and markers are chosen.
#[derive(Debug, Clone, Default)]
pub struct ScatterOptions {
    pub x: String,
    pub y: String,
    pub z: Option<String>,
    pub label: Option<String>,
    /// Random jitter magnitude applied independently to x and y.
    pub wiggle: f64,
    /// Assign palette colors by first-seen order of distinct z values.
    pub z_color: bool,
    /// Explicit label -> color/marker mapping, tried before the palette.
    pub color_map: Vec<ColorMapEntry>,
    /// Continuous colormap over numeric z values.
    pub z_cmap: Option<Colormap>,
}

impl ScatterOptions {
    /// Discrete series per distinct z value, with a legend.
    pub fn grouped(&self) -> bool {
        self.z_color || !self.color_map.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct ScatterPoint {
    pub x: f64,
    pub y: f64,
    /// Raw z string, kept for grouping and annotation.
    pub z: Option<String>,
    pub color: Option<Color>,
    pub marker: Option<char>,
    /// Text from the label column, `/` already turned into a line break.
    pub label: Option<String>,
}

/// All included points plus what the renderer needs to group and scale them.
#[derive(Debug, Clone)]
pub struct ScatterData {
    pub points: Vec<ScatterPoint>,
    /// Distinct z values in first-seen order; drives series order and legend.
    pub groups: Vec<String>,
    /// Min/max over z values that parsed as numbers (colormap mode).
    pub z_range: Option<(f64, f64)>,
    pub included: usize,
    pub total: usize,
}

impl ScatterData {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Points belonging to one z group, in input order.
    pub fn group_points(&self, group: &str) -> Vec<&ScatterPoint> {
        self.points
            .iter()
            .filter(|p| p.z.as_deref() == Some(group))
            .collect()
    }
}

/// Single pass over the table assigning per-point attributes. The color/marker
/// precedence per point is: exact color-map match, then the cyclic palette
/// keyed by first-seen group order, then (after the pass, once the numeric
/// range is known) the continuous colormap.
pub fn collect(table: &TableData, opts: &ScatterOptions, rng: &mut impl Rng) -> ScatterData {
    let mut points: Vec<ScatterPoint> = Vec::new();
    let mut groups: Vec<String> = Vec::new();
    let mut z_min = f64::INFINITY;
    let mut z_max = f64::NEG_INFINITY;
    let mut included = 0usize;
    let mut total = 0usize;

    for record in table.records() {
        total += 1;
        let parsed = (|| -> Result<(f64, f64), SkipReason> {
            Ok((
                extract::numeric(&record, &opts.x)?,
                extract::numeric(&record, &opts.y)?,
            ))
        })();
        let (x, y) = match parsed {
            Ok(values) => values,
            Err(reason) => {
                debug!("skipping record {}: {}", total, reason);
                continue;
            }
        };

        let z = match &opts.z {
            Some(z_col) => match extract::text(&record, z_col) {
                Ok(raw) => Some(raw.to_string()),
                Err(reason) => {
                    debug!("skipping record {}: {}", total, reason);
                    continue;
                }
            },
            None => None,
        };

        let label = match &opts.label {
            Some(label_col) => match extract::text(&record, label_col) {
                Ok(raw) => Some(raw.replace('/', "\n")),
                Err(reason) => {
                    debug!("skipping record {}: {}", total, reason);
                    continue;
                }
            },
            None => None,
        };

        let x = x + (rng.gen::<f64>() - 0.5) * 2.0 * opts.wiggle;
        let y = y + (rng.gen::<f64>() - 0.5) * 2.0 * opts.wiggle;

        let mut color = None;
        let mut marker = None;
        if let Some(z_value) = &z {
            if opts.z_cmap.is_none() && !groups.contains(z_value) {
                groups.push(z_value.clone());
            }

            if let Some(entry) = opts.color_map.iter().find(|e| &e.label == z_value) {
                color = Some(entry.color);
                marker = Some(entry.marker);
            } else if opts.grouped() && opts.z_cmap.is_none() {
                let index = groups.iter().position(|g| g == z_value).unwrap_or(0);
                color = Some(palette::cycle_color(index));
                marker = Some(palette::cycle_marker(index));
            }

            if opts.z_cmap.is_some() {
                if let Ok(value) = z_value.trim().parse::<f64>() {
                    if value.is_finite() {
                        z_min = z_min.min(value);
                        z_max = z_max.max(value);
                    }
                }
            }
        }

        points.push(ScatterPoint {
            x,
            y,
            z,
            color,
            marker,
            label,
        });
        included += 1;
    }

    let z_range = if z_min <= z_max {
        Some((z_min, z_max))
    } else {
        None
    };

    // continuous colors need the full range, so they are assigned after the pass
    if let Some(cmap) = &opts.z_cmap {
        for point in &mut points {
            point.color = Some(colormap_color(cmap, z_range, point.z.as_deref()));
        }
    }

    ScatterData {
        points,
        groups,
        z_range,
        included,
        total,
    }
}

/// Map a raw z string through the colormap, falling back to the neutral fill
/// for non-numeric values or an empty range.
fn colormap_color(cmap: &Colormap, range: Option<(f64, f64)>, z: Option<&str>) -> Color {
    let value = match z.and_then(|raw| raw.trim().parse::<f64>().ok()) {
        Some(v) if v.is_finite() => v,
        _ => return palette::CMAP_FALLBACK,
    };
    match range {
        Some((lo, hi)) if hi > lo => cmap.sample((value - lo) / (hi - lo)),
        Some(_) => cmap.sample(0.5),
        None => palette::CMAP_FALLBACK,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::MARKERS;
    use crate::reader::read_table;
    use crate::tokens::parse_color_map_entry;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn table(header: &str, body: &str) -> TableData {
        read_table(format!("{}\n{}", header, body).as_bytes(), b'\t').unwrap()
    }

    fn options(z: Option<&str>) -> ScatterOptions {
        ScatterOptions {
            x: "x".to_string(),
            y: "y".to_string(),
            z: z.map(|s| s.to_string()),
            ..ScatterOptions::default()
        }
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn test_zero_wiggle_keeps_exact_coordinates() {
        let t = table("x\ty", "1.5\t2.5\n3\t4\n");
        let data = collect(&t, &options(None), &mut rng());
        assert_eq!(data.points[0].x, 1.5);
        assert_eq!(data.points[0].y, 2.5);
        assert_eq!(data.points[1].x, 3.0);
        assert_eq!(data.points[1].y, 4.0);
    }

    #[test]
    fn test_wiggle_stays_in_bounds() {
        let t = table("x\ty", "0\t0\n0\t0\n0\t0\n");
        let mut opts = options(None);
        opts.wiggle = 0.25;
        let data = collect(&t, &opts, &mut rng());
        for p in &data.points {
            assert!(p.x.abs() <= 0.25);
            assert!(p.y.abs() <= 0.25);
        }
    }

    #[test]
    fn test_counts() {
        let t = table("x\ty", "1\t2\nbad\t3\n4\t5\n");
        let data = collect(&t, &options(None), &mut rng());
        assert_eq!(data.total, 3);
        assert_eq!(data.included, 2);
        assert_eq!(data.total - data.included, 1);
    }

    #[test]
    fn test_groups_first_seen_order() {
        let t = table("x\ty\tz", "1\t1\tb\n2\t2\ta\n3\t3\tb\n");
        let mut opts = options(Some("z"));
        opts.z_color = true;
        let data = collect(&t, &opts, &mut rng());
        assert_eq!(data.groups, vec!["b", "a"]);
        assert_eq!(data.group_points("b").len(), 2);
    }

    #[test]
    fn test_color_map_exact_match() {
        let t = table("x\ty\tz", "1\t1\thot\n2\t2\tcold\n");
        let mut opts = options(Some("z"));
        opts.color_map = vec![
            parse_color_map_entry("hot:red/o").unwrap(),
            parse_color_map_entry("cold:blue/x").unwrap(),
        ];
        let data = collect(&t, &opts, &mut rng());
        assert_eq!(data.points[0].color, Some(crate::palette::parse_color("red").unwrap()));
        assert_eq!(data.points[0].marker, Some('o'));
        assert_eq!(data.points[1].color, Some(crate::palette::parse_color("blue").unwrap()));
        assert_eq!(data.points[1].marker, Some('x'));
    }

    #[test]
    fn test_color_map_miss_falls_back_to_palette() {
        let t = table("x\ty\tz", "1\t1\tmapped\n2\t2\tother\n");
        let mut opts = options(Some("z"));
        opts.color_map = vec![parse_color_map_entry("mapped:red/o").unwrap()];
        let data = collect(&t, &opts, &mut rng());
        // unmatched label still gets a concrete color and marker
        assert_eq!(data.points[1].color, Some(palette::cycle_color(1)));
        assert_eq!(data.points[1].marker, Some(MARKERS[0]));
    }

    #[test]
    fn test_z_color_cycles_palette() {
        let mut body = String::new();
        for i in 0..12 {
            body.push_str(&format!("{}\t{}\tg{}\n", i, i, i));
        }
        let t = table("x\ty\tz", &body);
        let mut opts = options(Some("z"));
        opts.z_color = true;
        let data = collect(&t, &opts, &mut rng());
        // 11th group wraps back to the first color with the next marker
        assert_eq!(data.points[10].color, data.points[0].color);
        assert_eq!(data.points[10].marker, Some(MARKERS[1]));
    }

    #[test]
    fn test_cmap_range_ignores_non_numeric() {
        let t = table("x\ty\tz", "1\t1\t10\n2\t2\tnope\n3\t3\t30\n");
        let mut opts = options(Some("z"));
        opts.z_cmap = Some(Colormap::default_map());
        let data = collect(&t, &opts, &mut rng());
        assert_eq!(data.z_range, Some((10.0, 30.0)));
        // endpoints map to the colormap ends, the bad value to the fallback
        let cmap = Colormap::default_map();
        assert_eq!(data.points[0].color, Some(cmap.sample(0.0)));
        assert_eq!(data.points[1].color, Some(crate::palette::CMAP_FALLBACK));
        assert_eq!(data.points[2].color, Some(cmap.sample(1.0)));
    }

    #[test]
    fn test_cmap_degenerate_range() {
        let t = table("x\ty\tz", "1\t1\t5\n2\t2\t5\n");
        let mut opts = options(Some("z"));
        opts.z_cmap = Some(Colormap::default_map());
        let data = collect(&t, &opts, &mut rng());
        let cmap = Colormap::default_map();
        assert_eq!(data.points[0].color, Some(cmap.sample(0.5)));
    }

    #[test]
    fn test_cmap_skips_group_tracking() {
        let t = table("x\ty\tz", "1\t1\t10\n2\t2\t20\n");
        let mut opts = options(Some("z"));
        opts.z_cmap = Some(Colormap::default_map());
        let data = collect(&t, &opts, &mut rng());
        assert!(data.groups.is_empty());
    }

    #[test]
    fn test_label_column_newlines() {
        let t = table("x\ty\tname", "1\t1\tfoo/bar\n");
        let mut opts = options(None);
        opts.label = Some("name".to_string());
        let data = collect(&t, &opts, &mut rng());
        assert_eq!(data.points[0].label.as_deref(), Some("foo\nbar"));
    }

    #[test]
    fn test_missing_z_column_skips_row() {
        let t = table("x\ty", "1\t1\n");
        let opts = options(Some("z"));
        let data = collect(&t, &opts, &mut rng());
        assert!(data.is_empty());
        assert_eq!(data.total, 1);
    }

    #[test]
    fn test_color_of_group_is_stable() {
        let t = table("x\ty\tz", "1\t1\ta\n2\t2\tb\n3\t3\ta\n");
        let mut opts = options(Some("z"));
        opts.z_color = true;
        let data = collect(&t, &opts, &mut rng());
        assert_eq!(data.points[0].color, data.points[2].color);
        assert_ne!(data.points[0].color, data.points[1].color);
    }
}
