use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use plotme::palette::Colormap;
use plotme::render::{self, HeatmapStyle};
use plotme::{heatmap, reader};
use std::fs;
use std::io;

#[derive(Parser, Debug)]
#[command(name = "heatmap")]
#[command(about = "Plot a heatmap from tab-delimited data on stdin", long_about = None)]
#[command(rename_all = "snake_case")]
struct Args {
    /// x column name
    #[arg(long)]
    x: String,

    /// y column name
    #[arg(long)]
    y: String,

    /// z column name
    #[arg(long)]
    z: String,

    /// plot title
    #[arg(long)]
    title: Option<String>,

    /// label on x axis
    #[arg(long)]
    x_label: Option<String>,

    /// label on y axis
    #[arg(long)]
    y_label: Option<String>,

    /// colormap name
    #[arg(long)]
    cmap: Option<String>,

    /// figsize width
    #[arg(long, default_value_t = 12.0)]
    figsize: f64,

    /// where to change text colour
    #[arg(long, default_value_t = 0.5)]
    text_switch: f64,

    /// log z
    #[arg(long)]
    log: bool,

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

    let table =
        reader::read_table(io::stdin().lock(), b'\t').context("Failed to read from stdin")?;

    let grid = heatmap::aggregate(&table, &args.x, &args.y, &args.z, args.log);
    info!(
        "finished reading {} of {} records with max_zval {:.2}",
        grid.included, grid.total, grid.max_z
    );

    if grid.is_empty() {
        warn!("No data to plot");
        return Ok(());
    }

    let cmap = match &args.cmap {
        Some(name) => Colormap::by_name(name)?,
        None => Colormap::default_map(),
    };
    let style = HeatmapStyle {
        title: args
            .title
            .unwrap_or_else(|| format!("{} given {} and {}", args.z, args.x, args.y)),
        x_desc: args.x_label.unwrap_or_else(|| args.x.clone()),
        y_desc: args.y_label.unwrap_or_else(|| args.y.clone()),
        z_desc: args.z.clone(),
        figsize: args.figsize,
        text_switch: args.text_switch,
        cmap,
    };

    let png_bytes = render::render_heatmap(&grid, &style).context("Failed to render heatmap")?;
    fs::write(&args.target, png_bytes)
        .with_context(|| format!("Failed to write '{}'", args.target))?;

    info!(
        "done processing {} of {}. saved to {}",
        grid.included, grid.total, args.target
    );
    Ok(())
}
