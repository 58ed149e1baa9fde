use anyhow::{anyhow, Context, Result};
use clap::Parser;
use log::{info, warn};
use plotme::palette::Colormap;
use plotme::render::{self, ScatterStyle};
use plotme::reader;
use plotme::scatter::{self, ScatterOptions};
use plotme::tokens;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs;
use std::io;

#[derive(Parser, Debug)]
#[command(name = "scatter")]
#[command(about = "Scatter plot from delimited data on stdin", long_about = None)]
#[command(rename_all = "snake_case")]
struct Args {
    /// x column name
    #[arg(long)]
    x: String,

    /// y column name
    #[arg(long)]
    y: String,

    /// z column name (colour)
    #[arg(long)]
    z: Option<String>,

    /// label column
    #[arg(long)]
    label: Option<String>,

    /// use colours for z
    #[arg(long)]
    z_color: bool,

    /// specify color/marker for z: label:color/marker
    #[arg(long, num_args = 1..)]
    z_color_map: Vec<String>,

    /// z is continuous and use a color map
    #[arg(long)]
    z_cmap: Option<String>,

    /// plot title
    #[arg(long)]
    title: Option<String>,

    /// label on x axis
    #[arg(long)]
    x_label: Option<String>,

    /// label on y axis
    #[arg(long)]
    y_label: Option<String>,

    /// figsize width
    #[arg(long, default_value_t = 12.0)]
    figsize: f64,

    /// fontsize
    #[arg(long, default_value_t = 18)]
    fontsize: u32,

    /// markersize
    #[arg(long, default_value_t = 20)]
    markersize: u32,

    /// default marker
    #[arg(long, default_value_t = 'o')]
    marker: char,

    /// dpi
    #[arg(long, default_value_t = 72)]
    dpi: u32,

    /// randomly perturb data
    #[arg(long, default_value_t = 0.0)]
    wiggle: f64,

    /// offset for text
    #[arg(long, default_value_t = 0.005)]
    x_squiggem: f64,

    /// offset for text
    #[arg(long, default_value_t = 0.005)]
    y_squiggem: f64,

    /// input file delimiter
    #[arg(long, default_value = "\t")]
    delimiter: String,

    /// log xy
    #[arg(long)]
    log: bool,

    /// join points
    #[arg(long)]
    join: bool,

    /// add horizontal lines of the form label=height[:color]
    #[arg(long, num_args = 0..)]
    y_annot: Vec<String>,

    /// add vertical lines of the form label=width[:color]
    #[arg(long, num_args = 0..)]
    x_annot: Vec<String>,

    /// add unannotated lines of the form x1,y1,x2,y2,color
    #[arg(long, num_args = 0..)]
    lines: Vec<String>,

    /// include line of best fit
    #[arg(long)]
    line_of_best_fit: bool,

    /// more logging
    #[arg(long)]
    verbose: bool,

    /// plot filename
    #[arg(long, default_value = "plot.png")]
    target: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::new()
        .filter_level(if args.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .init();

    info!("starting...");

    let delimiter = match args.delimiter.as_bytes() {
        [b] => *b,
        _ => return Err(anyhow!("Delimiter must be a single byte")),
    };

    let opts = ScatterOptions {
        x: args.x.clone(),
        y: args.y.clone(),
        z: args.z.clone(),
        label: args.label.clone(),
        wiggle: args.wiggle,
        z_color: args.z_color,
        color_map: args
            .z_color_map
            .iter()
            .map(|token| tokens::parse_color_map_entry(token))
            .collect::<Result<Vec<_>>>()?,
        z_cmap: args
            .z_cmap
            .as_deref()
            .map(Colormap::by_name)
            .transpose()?,
    };
    let style = ScatterStyle {
        title: args.title.clone(),
        x_desc: args.x_label.clone().unwrap_or_else(|| args.x.clone()),
        y_desc: args.y_label.clone().unwrap_or_else(|| args.y.clone()),
        z_desc: args.z.clone(),
        figsize: args.figsize,
        fontsize: args.fontsize,
        markersize: args.markersize,
        marker: args.marker,
        dpi: args.dpi,
        log_axes: args.log,
        join: args.join,
        best_fit: args.line_of_best_fit,
        y_annots: args
            .y_annot
            .iter()
            .map(|token| tokens::parse_axis_annot(token))
            .collect::<Result<Vec<_>>>()?,
        x_annots: args
            .x_annot
            .iter()
            .map(|token| tokens::parse_axis_annot(token))
            .collect::<Result<Vec<_>>>()?,
        segments: args
            .lines
            .iter()
            .map(|token| tokens::parse_segment(token))
            .collect::<Result<Vec<_>>>()?,
        x_squiggem: args.x_squiggem,
        y_squiggem: args.y_squiggem,
    };

    let table =
        reader::read_table(io::stdin().lock(), delimiter).context("Failed to read from stdin")?;

    let mut rng = StdRng::from_entropy();
    let data = scatter::collect(&table, &opts, &mut rng);
    info!(
        "finished reading {} of {} records",
        data.included, data.total
    );
    if let Some((lo, hi)) = data.z_range {
        info!("cmap has range ({}, {})", lo, hi);
    }

    if data.is_empty() {
        warn!("No data to plot");
        return Ok(());
    }

    let png_bytes =
        render::render_scatter(&data, &opts, &style).context("Failed to render scatter plot")?;
    fs::write(&args.target, png_bytes)
        .with_context(|| format!("Failed to write '{}'", args.target))?;

    info!(
        "done processing {} of {}. saved to {}",
        data.included, data.total, args.target
    );
    Ok(())
}
