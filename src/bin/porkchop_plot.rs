use std::fs::File;
use std::path::PathBuf;

use anyhow::Context;
use astrochop::export::{OutputGuard, read_grid_records};
use astrochop::plot::{PlotField, PlotOptions, render_porkchop};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about = "Render a porkchop heatmap from a grid CSV")]
struct Cli {
    #[arg(long)]
    input: PathBuf,
    #[arg(long, default_value = "artifacts/porkchop.png")]
    output: PathBuf,
    #[arg(long, default_value_t = 1200)]
    width: u32,
    #[arg(long, default_value_t = 900)]
    height: u32,
    #[arg(long, default_value_t = 4.0)]
    high_clip_factor: f64,
    #[arg(long, default_value = "Porkchop plot")]
    title: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let file = File::open(&cli.input)
        .with_context(|| format!("opening {}", cli.input.display()))?;
    let records = read_grid_records(file)?;
    let field = PlotField::from_records(&records);

    let file_name = cli
        .output
        .file_name()
        .context("output path has no file name")?;
    let out_dir = cli
        .output
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| std::path::Path::new("."));
    let guard = OutputGuard::new(out_dir)?;

    let options = PlotOptions {
        width: cli.width,
        height: cli.height,
        high_clip_factor: cli.high_clip_factor,
        title: cli.title,
    };
    let written = render_porkchop(&field, file_name, &options, &guard)?;
    println!("wrote {}", written.display());
    Ok(())
}
