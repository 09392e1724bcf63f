// src/cli.rs

use crate::model::Metric;
use crate::renderer::MAX_CAP;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Measure bug fixes stored as before/after snapshots", long_about = None)]
pub struct Args {
    /// Folder holding one sub-directory per project, each with one folder per bug fix
    #[arg(short, long)]
    pub root: PathBuf,

    /// Only analyze these projects (repeatable); defaults to every sub-directory of the root
    #[arg(short, long = "project")]
    pub projects: Vec<String>,

    /// Unchanged lines of context around each change in the generated diffs
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u32).range(1..))]
    pub context_lines: u32,

    /// Write per-file and per-bug records to this JSON file
    #[arg(long)]
    pub json: Option<PathBuf>,

    /// Render a stacked histogram of the per-bug metric to this PNG file
    #[arg(long)]
    pub histogram: Option<PathBuf>,

    /// Metric shown in the histogram
    #[arg(long, value_enum, default_value_t = Metric::Lines)]
    pub metric: Metric,

    /// Values above this are drawn in the last histogram bin
    #[arg(
        long,
        default_value_t = 20,
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(..=MAX_CAP as u64)
    )]
    pub cap: usize,

    /// Metadata key that splits the histogram into stacks
    #[arg(long, default_value = "type")]
    pub category_key: String,

    /// Print how often each value of this metadata key was annotated
    #[arg(long)]
    pub count_by: Option<String>,

    /// JSON file with colours and aliases for categories
    #[arg(long)]
    pub labels: Option<PathBuf>,

    /// Width of the histogram in pixels
    #[arg(long, default_value_t = 1280)]
    pub width: u32,

    /// Height of the histogram in pixels
    #[arg(long, default_value_t = 720)]
    pub height: u32,

    /// Do not print the per-bug table or the progress bar
    #[arg(short, long)]
    pub quiet: bool,
}
