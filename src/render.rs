// Rasterization for both chart kinds. Drawing goes through an RGB buffer and
// a buffer-backed bitmap backend; the finished frame is encoded to PNG bytes
// so nothing touches the filesystem until the caller writes the target.

use crate::heatmap::HeatmapGrid;
use crate::palette::{self, Colormap};
use crate::regress;
use crate::scatter::{ScatterData, ScatterOptions};
use crate::tokens::{AxisAnnot, Segment};
use anyhow::{Context, Result};
use image::ImageEncoder;
use log::debug;
use plotters::chart::ChartContext;
use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::element::Polygon;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::FontTransform;

/// Matplotlib's default figure dpi, used by the heatmap which has no dpi flag.
const HEATMAP_DPI: u32 = 100;

/// Width in pixels reserved for the color bar strip.
const COLORBAR_WIDTH: i32 = 90;

/// Display options for the heatmap renderer.
#[derive(Debug, Clone)]
pub struct HeatmapStyle {
    pub title: String,
    pub x_desc: String,
    pub y_desc: String,
    pub z_desc: String,
    pub figsize: f64,
    /// Fraction of max_z at which cell text flips from white to black.
    pub text_switch: f64,
    pub cmap: Colormap,
}

/// Display options for the scatter renderer.
#[derive(Debug, Clone)]
pub struct ScatterStyle {
    pub title: Option<String>,
    pub x_desc: String,
    pub y_desc: String,
    pub z_desc: Option<String>,
    pub figsize: f64,
    pub fontsize: u32,
    pub markersize: u32,
    pub marker: char,
    pub dpi: u32,
    pub log_axes: bool,
    pub join: bool,
    pub best_fit: bool,
    pub y_annots: Vec<AxisAnnot>,
    pub x_annots: Vec<AxisAnnot>,
    pub segments: Vec<Segment>,
    pub x_squiggem: f64,
    pub y_squiggem: f64,
}

/// Figure size in pixels: width is `figsize` inches, height grows with the
/// ratio of y to x entries, plus one inch for the title area.
pub fn figure_dims(figsize: f64, n_y: usize, n_x: usize, dpi: u32) -> (u32, u32) {
    let width_in = figsize.max(1.0);
    let ratio = if n_x == 0 {
        1.0
    } else {
        n_y as f64 / n_x as f64
    };
    let height_in = 1.0 + (width_in * ratio).floor();
    (
        (width_in * dpi as f64) as u32,
        (height_in * dpi as f64) as u32,
    )
}

/// Data range with the same 5% padding on both ends; degenerate ranges get a
/// fixed unit of slack.
fn padded_range(values: impl Iterator<Item = f64>) -> std::ops::Range<f64> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values {
        min = min.min(v);
        max = max.max(v);
    }
    if min > max {
        return 0.0..1.0;
    }
    if min == max {
        (min - 1.0)..(max + 1.0)
    } else {
        let padding = (max - min) * 0.05;
        (min - padding)..(max + padding)
    }
}

fn rgba(c: palette::Color) -> RGBAColor {
    RGBAColor(c.r, c.g, c.b, c.a)
}

/// Short numeric label for axis ticks.
fn format_tick(v: f64) -> String {
    if (v - v.round()).abs() < 1e-9 {
        format!("{}", v.round())
    } else {
        format!("{}", (v * 1000.0).round() / 1000.0)
    }
}

/// Render the aggregated grid to PNG bytes.
pub fn render_heatmap(grid: &HeatmapGrid, style: &HeatmapStyle) -> Result<Vec<u8>> {
    let n_x = grid.xs.len();
    let n_y = grid.ys.len();
    let (width, height) = figure_dims(style.figsize, n_y, n_x, HEATMAP_DPI);
    let mut buffer = vec![0u8; (width * height * 3) as usize];

    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        root.fill(&WHITE).context("Failed to fill background")?;

        let (chart_area, bar_area) = root.split_horizontally(width as i32 - COLORBAR_WIDTH);

        let mut chart = ChartBuilder::on(&chart_area)
            .margin(10)
            .caption(&style.title, ("sans-serif", 20))
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(-0.5..(n_x as f64 - 0.5), -0.5..(n_y as f64 - 0.5))
            .context("Failed to build chart")?;

        let xs = grid.xs.clone();
        let ys = grid.ys.clone();
        chart
            .configure_mesh()
            .disable_mesh()
            .x_labels(n_x)
            .y_labels(n_y)
            .x_desc(&style.x_desc)
            .y_desc(&style.y_desc)
            .x_label_formatter(&|v| index_label(*v, &xs, false))
            .y_label_formatter(&|v| index_label(*v, &ys, true))
            .draw()
            .context("Failed to draw mesh")?;

        // cell fills, colormap normalized against the max observed z
        let mut cells = Vec::with_capacity(n_x * n_y);
        for (row, z_row) in grid.z.iter().enumerate() {
            let cy = (n_y - 1 - row) as f64;
            for (col, &z) in z_row.iter().enumerate() {
                let t = if grid.max_z > 0.0 { z / grid.max_z } else { 0.0 };
                let fill = rgba(style.cmap.sample(t));
                cells.push(Rectangle::new(
                    [(col as f64 - 0.5, cy - 0.5), (col as f64 + 0.5, cy + 0.5)],
                    fill.filled(),
                ));
            }
        }
        chart
            .draw_series(cells)
            .context("Failed to draw heatmap cells")?;

        // cell text: black above the contrast threshold, white at or below it
        let mut texts = Vec::with_capacity(n_x * n_y);
        for (row, text_row) in grid.text.iter().enumerate() {
            let cy = (n_y - 1 - row) as f64;
            for (col, text) in text_row.iter().enumerate() {
                if text.is_empty() {
                    continue;
                }
                let foreground = if grid.z[row][col] > grid.max_z * style.text_switch {
                    BLACK
                } else {
                    WHITE
                };
                let font = ("sans-serif", 15)
                    .into_font()
                    .color(&foreground)
                    .pos(Pos::new(HPos::Center, VPos::Center));
                texts.push(Text::new(text.clone(), (col as f64, cy), font));
            }
        }
        chart
            .draw_series(texts)
            .context("Failed to draw cell text")?;

        draw_colorbar(
            &bar_area,
            &style.cmap,
            (0.0, grid.max_z),
            &style.z_desc,
            15,
        )?;

        root.present().context("Failed to present drawing")?;
    }

    encode_png(&buffer, width, height)
}

/// Tick label for an index axis: the data value at the nearest index, blank
/// between cells. The y axis is stored top-down, so it reads from the far end.
fn index_label(v: f64, values: &[f64], reversed: bool) -> String {
    let idx = v.round();
    if (v - idx).abs() > 0.3 || idx < 0.0 {
        return String::new();
    }
    let mut idx = idx as usize;
    if idx >= values.len() {
        return String::new();
    }
    if reversed {
        idx = values.len() - 1 - idx;
    }
    format_tick(values[idx])
}

/// Render the scatter data to PNG bytes.
pub fn render_scatter(
    data: &ScatterData,
    opts: &ScatterOptions,
    style: &ScatterStyle,
) -> Result<Vec<u8>> {
    // On log axes, coordinates are mapped through log10 and tick labels are
    // formatted back in data space; non-positive points cannot be shown.
    let log_axes = style.log_axes;
    let map = |v: f64| if log_axes { v.log10() } else { v };
    let plottable: Vec<usize> = data
        .points
        .iter()
        .enumerate()
        .filter(|(_, p)| !log_axes || (p.x > 0.0 && p.y > 0.0))
        .map(|(i, _)| i)
        .collect();
    if plottable.is_empty() {
        anyhow::bail!("No plottable points (log axes require positive coordinates)");
    }
    if plottable.len() < data.points.len() {
        debug!(
            "dropping {} non-positive points for log axes",
            data.points.len() - plottable.len()
        );
    }

    let x_range = padded_range(plottable.iter().map(|&i| map(data.points[i].x)));
    let y_range = padded_range(plottable.iter().map(|&i| map(data.points[i].y)));
    let x_data_min = plottable
        .iter()
        .map(|&i| data.points[i].x)
        .fold(f64::INFINITY, f64::min);
    let y_data_min = plottable
        .iter()
        .map(|&i| data.points[i].y)
        .fold(f64::INFINITY, f64::min);

    let (width, height) = figure_dims(style.figsize, plottable.len(), plottable.len(), style.dpi);
    let mut buffer = vec![0u8; (width * height * 3) as usize];
    let marker_size = (style.markersize / 4).max(2) as i32;

    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        // light grey panel in the manner of the seaborn style sheet
        root.fill(&RGBColor(234, 234, 242))
            .context("Failed to fill background")?;

        let (chart_area, bar_area) = if opts.z_cmap.is_some() {
            let (left, right) = root.split_horizontally(width as i32 - COLORBAR_WIDTH);
            (left, Some(right))
        } else {
            (root.clone(), None)
        };

        let mut chart = ChartBuilder::on(&chart_area)
            .margin(10)
            .caption(
                style.title.as_deref().unwrap_or(""),
                ("sans-serif", style.fontsize + 2),
            )
            .x_label_area_size(50)
            .y_label_area_size(70)
            .build_cartesian_2d(x_range.clone(), y_range.clone())
            .context("Failed to build chart")?;

        chart
            .configure_mesh()
            .light_line_style(WHITE.mix(0.7))
            .bold_line_style(WHITE)
            .x_desc(&style.x_desc)
            .y_desc(&style.y_desc)
            .axis_desc_style(("sans-serif", style.fontsize))
            .label_style(("sans-serif", style.fontsize * 2 / 3))
            .x_label_formatter(&|v| format_tick(if log_axes { 10f64.powf(*v) } else { *v }))
            .y_label_formatter(&|v| format_tick(if log_axes { 10f64.powf(*v) } else { *v }))
            .draw()
            .context("Failed to draw mesh")?;

        if opts.grouped() && !data.groups.is_empty() {
            // one series per distinct z value, in first-seen order
            for (group_index, group) in data.groups.iter().enumerate() {
                let members: Vec<&usize> = plottable
                    .iter()
                    .filter(|&&i| data.points[i].z.as_deref() == Some(group.as_str()))
                    .collect();
                if members.is_empty() {
                    continue;
                }
                let first = &data.points[*members[0]];
                let color = rgba(first.color.unwrap_or_else(|| palette::cycle_color(group_index)))
                    .mix(0.8);
                let marker = first.marker.unwrap_or(style.marker);
                let coords: Vec<(f64, f64)> = members
                    .iter()
                    .map(|&&i| (map(data.points[i].x), map(data.points[i].y)))
                    .collect();

                if style.join {
                    chart
                        .draw_series(LineSeries::new(coords.clone(), color.stroke_width(1)))
                        .context("Failed to draw join line")?;
                }
                let points: Vec<((f64, f64), RGBAColor)> =
                    coords.iter().map(|&c| (c, color)).collect();
                draw_markers(&mut chart, marker, marker_size, &points)
                    .context("Failed to draw group series")?;
                // legend entry only; the markers are already drawn
                let legend_color = color;
                chart
                    .draw_series(std::iter::empty::<Circle<(f64, f64), i32>>())
                    .context("Failed to register group legend")?
                    .label(group)
                    .legend(move |(x, y)| Circle::new((x + 10, y), 4, legend_color.filled()));
            }
        } else {
            let coords: Vec<(f64, f64)> = plottable
                .iter()
                .map(|&i| (map(data.points[i].x), map(data.points[i].y)))
                .collect();
            if opts.z_cmap.is_some() {
                let points: Vec<((f64, f64), RGBAColor)> = plottable
                    .iter()
                    .map(|&i| {
                        let p = &data.points[i];
                        let color = rgba(p.color.unwrap_or(palette::CMAP_FALLBACK));
                        ((map(p.x), map(p.y)), color)
                    })
                    .collect();
                draw_markers(&mut chart, style.marker, marker_size, &points)
                    .context("Failed to draw colormapped series")?;
            } else {
                let color = rgba(palette::cycle_color(0));
                let points: Vec<((f64, f64), RGBAColor)> =
                    coords.iter().map(|&c| (c, color)).collect();
                draw_markers(&mut chart, style.marker, marker_size, &points)
                    .context("Failed to draw scatter series")?;
                if style.join {
                    chart
                        .draw_series(LineSeries::new(coords, color.stroke_width(1)))
                        .context("Failed to draw join line")?;
                }
            }
        }

        if style.best_fit {
            // fitted in data space over the points as plotted (jitter included)
            let xs: Vec<f64> = plottable.iter().map(|&i| data.points[i].x).collect();
            let ys: Vec<f64> = plottable.iter().map(|&i| data.points[i].y).collect();
            if let Some(fit) = regress::linear_fit(&xs, &ys) {
                let mut line: Vec<(f64, f64)> = xs
                    .iter()
                    .map(|&x| (map(x), map(fit.intercept + fit.slope * x)))
                    .collect();
                line.sort_by(|a, b| a.0.total_cmp(&b.0));
                let orange = rgba(palette::parse_color("orange")?);
                chart
                    .draw_series(LineSeries::new(line, orange.stroke_width(1)))
                    .context("Failed to draw best fit line")?
                    .label(format!(
                        "correlation {:.3}, pvalue {:.3}",
                        fit.r, fit.p_value
                    ))
                    .legend(move |(x, y)| {
                        PathElement::new(vec![(x, y), (x + 18, y)], orange.stroke_width(1))
                    });
            } else {
                debug!("not enough spread to fit a line of best fit");
            }
        }

        // per-point annotations: the z value unless colors already encode it,
        // or the label column when configured
        let annot_font = ("sans-serif", style.fontsize).into_font().color(&BLACK);
        if opts.z.is_some() && !opts.z_color && opts.z_cmap.is_none() {
            chart
                .draw_series(plottable.iter().filter_map(|&i| {
                    let p = &data.points[i];
                    p.z.as_ref().map(|z| {
                        Text::new(z.clone(), (map(p.x), map(p.y)), annot_font.clone())
                    })
                }))
                .context("Failed to draw z annotations")?;
        }
        if opts.label.is_some() {
            for &i in &plottable {
                let p = &data.points[i];
                if let Some(text) = &p.label {
                    for (line_no, line) in text.lines().enumerate() {
                        let element = EmptyElement::at((map(p.x), map(p.y)))
                            + Text::new(
                                line.to_string(),
                                (0, (line_no as u32 * style.fontsize) as i32),
                                annot_font.clone(),
                            );
                        chart
                            .draw_series(std::iter::once(element))
                            .context("Failed to draw point labels")?;
                    }
                }
            }
        }

        let small_font = ("sans-serif", 12).into_font().color(&BLACK);
        for annot in &style.y_annots {
            let color = rgba(annot.color);
            let h = map(annot.value);
            chart
                .draw_series(std::iter::once(PathElement::new(
                    vec![(x_range.start, h), (x_range.end, h)],
                    color.stroke_width(1),
                )))
                .context("Failed to draw horizontal line")?;
            chart
                .draw_series(std::iter::once(Text::new(
                    annot.label.clone(),
                    (map(x_data_min), map(annot.value + style.y_squiggem)),
                    small_font.clone(),
                )))
                .context("Failed to draw horizontal line label")?;
        }
        for annot in &style.x_annots {
            let color = rgba(annot.color);
            let w = map(annot.value);
            chart
                .draw_series(std::iter::once(PathElement::new(
                    vec![(w, y_range.start), (w, y_range.end)],
                    color.stroke_width(1),
                )))
                .context("Failed to draw vertical line")?;
            chart
                .draw_series(std::iter::once(Text::new(
                    annot.label.clone(),
                    (map(annot.value + style.x_squiggem), map(y_data_min)),
                    small_font.clone(),
                )))
                .context("Failed to draw vertical line label")?;
        }

        for segment in &style.segments {
            let color = rgba(segment.color);
            chart
                .draw_series(std::iter::once(PathElement::new(
                    vec![
                        (map(segment.x1), map(segment.y1)),
                        (map(segment.x2), map(segment.y2)),
                    ],
                    color.stroke_width(1),
                )))
                .context("Failed to draw line segment")?;
        }

        if (opts.grouped() && !data.groups.is_empty()) || style.best_fit {
            chart
                .configure_series_labels()
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .label_font(("sans-serif", style.fontsize * 2 / 3))
                .draw()
                .context("Failed to draw legend")?;
        }

        if let (Some(bar_area), Some(cmap)) = (bar_area, opts.z_cmap.as_ref()) {
            let range = data.z_range.unwrap_or((0.0, 1.0));
            draw_colorbar(
                &bar_area,
                cmap,
                range,
                style.z_desc.as_deref().unwrap_or(""),
                12,
            )?;
        }

        root.present().context("Failed to present drawing")?;
    }

    encode_png(&buffer, width, height)
}

/// Vertical gradient strip with min/max labels and a rotated axis label.
fn draw_colorbar(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    cmap: &Colormap,
    range: (f64, f64),
    label: &str,
    fontsize: u32,
) -> Result<()> {
    let (_, height) = area.dim_in_pixel();
    let top = 30i32;
    let bottom = height as i32 - 50;
    if bottom <= top {
        return Ok(());
    }

    for py in top..bottom {
        let t = 1.0 - (py - top) as f64 / (bottom - top) as f64;
        let color = rgba(cmap.sample(t));
        area.draw(&Rectangle::new([(10, py), (30, py + 1)], color.filled()))
            .context("Failed to draw colorbar strip")?;
    }

    let font = ("sans-serif", fontsize).into_font().color(&BLACK);
    area.draw(&Text::new(
        format_tick(range.1),
        (34, top),
        font.clone(),
    ))
    .context("Failed to draw colorbar max label")?;
    area.draw(&Text::new(
        format_tick(range.0),
        (34, bottom - fontsize as i32),
        font.clone(),
    ))
    .context("Failed to draw colorbar min label")?;

    let rotated = ("sans-serif", fontsize)
        .into_font()
        .transform(FontTransform::Rotate90)
        .color(&BLACK);
    area.draw(&Text::new(
        label.to_string(),
        (60, top + (bottom - top) / 2),
        rotated,
    ))
    .context("Failed to draw colorbar label")?;

    Ok(())
}

/// Draw one series of points with a matplotlib-style marker glyph. Each glyph
/// maps to a concrete element type, so the dispatch happens once per series.
fn draw_markers(
    chart: &mut ChartContext<'_, BitMapBackend<'_>, Cartesian2d<RangedCoordf64, RangedCoordf64>>,
    marker: char,
    size: i32,
    points: &[((f64, f64), RGBAColor)],
) -> Result<()> {
    match marker {
        'x' | 'X' | '+' | 'P' | '*' => {
            chart.draw_series(
                points
                    .iter()
                    .map(|&(c, color)| Cross::new(c, size, color.stroke_width(2))),
            )?;
        }
        '^' | '1' => {
            chart.draw_series(
                points
                    .iter()
                    .map(|&(c, color)| TriangleMarker::new(c, size, color)),
            )?;
        }
        'v' | '2' => {
            chart.draw_series(points.iter().map(|&(c, color)| {
                EmptyElement::at(c)
                    + Polygon::new(vec![(-size, -size), (size, -size), (0, size)], color.filled())
            }))?;
        }
        '<' | '3' => {
            chart.draw_series(points.iter().map(|&(c, color)| {
                EmptyElement::at(c)
                    + Polygon::new(vec![(size, -size), (size, size), (-size, 0)], color.filled())
            }))?;
        }
        '>' | '4' => {
            chart.draw_series(points.iter().map(|&(c, color)| {
                EmptyElement::at(c)
                    + Polygon::new(vec![(-size, -size), (-size, size), (size, 0)], color.filled())
            }))?;
        }
        's' | 'p' | 'h' | 'H' | '8' => {
            chart.draw_series(points.iter().map(|&(c, color)| {
                EmptyElement::at(c) + Rectangle::new([(-size, -size), (size, size)], color.filled())
            }))?;
        }
        'D' | 'd' => {
            chart.draw_series(points.iter().map(|&(c, color)| {
                EmptyElement::at(c)
                    + Polygon::new(
                        vec![(0, -size), (size, 0), (0, size), (-size, 0)],
                        color.filled(),
                    )
            }))?;
        }
        '|' => {
            chart.draw_series(points.iter().map(|&(c, color)| {
                EmptyElement::at(c)
                    + PathElement::new(vec![(0, -size), (0, size)], color.stroke_width(2))
            }))?;
        }
        '_' | ',' => {
            chart.draw_series(points.iter().map(|&(c, color)| {
                EmptyElement::at(c)
                    + PathElement::new(vec![(-size, 0), (size, 0)], color.stroke_width(2))
            }))?;
        }
        // 'o', '.' and anything unrecognized render as a filled circle
        _ => {
            chart.draw_series(
                points
                    .iter()
                    .map(|&(c, color)| Circle::new(c, size, color.filled())),
            )?;
        }
    }
    Ok(())
}

/// Encode the finished RGB frame as PNG bytes.
fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let mut png_bytes = Vec::new();
    {
        let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
        encoder
            .write_image(buffer, width, height, image::ColorType::Rgb8)
            .context("Failed to encode PNG")?;
    }
    Ok(png_bytes)
}
