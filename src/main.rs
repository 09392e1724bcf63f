// src/main.rs

mod aggregate;
mod analyzer;
mod cli;
mod error;
mod export;
mod hunks;
mod labels;
mod model;
mod renderer;

use analyzer::DiffSettings;
use clap::Parser;
use cli::Args;
use labels::LabelConfig;
use renderer::{Histogram, HistogramOptions};
use std::process;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Log filter used when `RUST_LOG` is unset
const DEFAULT_LOG_FILTER: &str = "warn";

fn main() {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)))
        .with_writer(std::io::stderr)
        .init();

    let labels = match &args.labels {
        Some(path) => match LabelConfig::load(path) {
            Ok(labels) => labels,
            Err(e) => {
                eprintln!("Error loading labels: {}", e);
                process::exit(1);
            }
        },
        None => LabelConfig::default(),
    };

    let start_time = Instant::now();
    let settings = DiffSettings { context_lines: args.context_lines, show_progress: !args.quiet };

    let analysis = match analyzer::analyze(&args.root, &args.projects, &settings) {
        Ok(analysis) => analysis,
        Err(e) => {
            eprintln!("Error analyzing {}: {}", args.root.display(), e);
            process::exit(1);
        }
    };
    println!(
        "Diffed {} bug folders in {:.2?}: {} changed files, {} failed folders.",
        analysis.folders_scanned,
        start_time.elapsed(),
        analysis.records.len(),
        analysis.failures.len()
    );
    for failure in &analysis.failures {
        eprintln!("  {}: {}", failure.folder.display(), failure.error);
    }

    let aggregation = aggregate::aggregate_per_bug(&analysis.records);
    if !aggregation.incomplete.is_empty() {
        eprintln!(
            "{} file records lack a complete bug key and were left out of the per-bug totals.",
            aggregation.incomplete.len()
        );
    }
    if !args.quiet {
        print!("{}", export::format_table(&aggregation.bugs));
    }

    if let Some(key) = &args.count_by {
        println!("{}", "-".repeat(80));
        for (label, count) in labels::count_annotations(&aggregation.bugs, key, &labels) {
            println!("'{}' was annotated {} time(s).", label, count);
        }
        println!("{}", "-".repeat(80));
    }

    if let Some(path) = &args.json {
        match export::write_json(&export::Report::new(&analysis.records, &aggregation.bugs), path) {
            Ok(()) => println!("Wrote {}.", path.display()),
            Err(e) => {
                eprintln!("Error writing report: {}", e);
                process::exit(1);
            }
        }
    }

    if let Some(path) = &args.histogram {
        let options = HistogramOptions {
            metric: args.metric,
            cap: args.cap,
            category_key: args.category_key.clone(),
            width: args.width,
            height: args.height,
        };
        let rendered = Histogram::build(&aggregation.bugs, &options, &labels)
            .and_then(|histogram| renderer::save_histogram(&histogram, &options, path).map(|()| histogram));
        match rendered {
            Ok(histogram) => {
                println!("Wrote {} histogram to {}.", histogram.metric.label(), path.display());
                for category in &histogram.categories {
                    println!(
                        "  {}: {} bug fixes, median {} {}",
                        labels.display_name(&category.name),
                        category.total,
                        category.median,
                        histogram.metric.label()
                    );
                }
            }
            Err(e) => {
                eprintln!("Error rendering histogram: {}", e);
                process::exit(1);
            }
        }
    }

    println!("Total time: {:.2?}", start_time.elapsed());
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn test_default_log_level_is_warn() {
        assert_eq!(EnvFilter::new(DEFAULT_LOG_FILTER).max_level_hint(), Some(LevelFilter::WARN));
    }
}
