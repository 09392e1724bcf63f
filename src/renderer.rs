// src/renderer.rs

use crate::error::RenderError;
use crate::labels::{bug_field, LabelConfig};
use crate::model::*;
use image::{Rgb, RgbImage};
use palette::{FromColor, Lch, Srgb};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use std::path::Path;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const GRID: Rgb<u8> = Rgb([225, 225, 225]);
const AXIS: Rgb<u8> = Rgb([40, 40, 40]);
const UNKNOWN_CATEGORY: &str = "Unknown";

/// Largest accepted histogram cap, one bin per value up to it
pub const MAX_CAP: usize = 10_000;

#[derive(Debug, Clone)]
pub struct HistogramOptions {
    pub metric: Metric,
    /// Values above the cap land in the last bin
    pub cap: usize,
    /// Metadata key whose value picks the stack a bug belongs to
    pub category_key: String,
    pub width: u32,
    pub height: u32,
}

/// Bin counts of one stacked category
#[derive(Debug, Clone)]
pub struct CategoryBins {
    pub name: String,
    pub color: Rgb<u8>,
    /// One count per value `0..=cap`
    pub counts: Vec<usize>,
    pub median: f64,
    pub total: usize,
}

#[derive(Debug, Clone)]
pub struct Histogram {
    pub metric: Metric,
    pub cap: usize,
    pub categories: Vec<CategoryBins>,
}

impl Histogram {
    pub fn build(bugs: &[BugDiffRecord], options: &HistogramOptions, labels: &LabelConfig) -> Result<Histogram, RenderError> {
        if bugs.is_empty() {
            return Err(RenderError::Empty);
        }
        if options.cap > MAX_CAP {
            return Err(RenderError::CapTooLarge { cap: options.cap, max: MAX_CAP });
        }

        // 1. Capped values grouped by category
        let mut values: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for bug in bugs {
            let category = bug_field(bug, &options.category_key)
                .as_ref()
                .and_then(scalar_text)
                .unwrap_or_else(|| UNKNOWN_CATEGORY.to_string());
            values.entry(category).or_default().push(options.metric.of(bug).min(options.cap));
        }

        // 2. Colours: configured first, generated for the rest
        let missing = values.keys().filter(|name| labels.color(name).is_none()).count();
        let mut generated = generate_category_colors(missing).into_iter();

        let categories = values
            .into_iter()
            .map(|(name, mut capped)| {
                let color = match labels.color(&name) {
                    Some(rgb) => Rgb(rgb),
                    None => generated.next().unwrap_or(AXIS),
                };
                let mut counts = vec![0; options.cap + 1];
                for &value in &capped {
                    counts[value] += 1;
                }
                capped.sort_unstable();
                CategoryBins { name, color, counts, median: median(&capped), total: capped.len() }
            })
            .collect();

        Ok(Histogram { metric: options.metric, cap: options.cap, categories })
    }

    /// Height of the tallest stacked bar
    pub fn max_stack(&self) -> usize {
        (0..=self.cap)
            .map(|bin| self.categories.iter().map(|c| c.counts[bin]).sum())
            .max()
            .unwrap_or(0)
    }
}

// Expects sorted input; even lengths average the middle pair.
fn median(sorted: &[usize]) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n % 2 == 1 {
        sorted[n / 2] as f64
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) as f64 / 2.0
    }
}

/// Draws the histogram as stacked bars with one vertical median line per
/// category.
pub fn render_histogram(histogram: &Histogram, width: u32, height: u32) -> Result<RgbImage, RenderError> {
    if width == 0 || height == 0 {
        return Err(RenderError::InvalidSize { width, height });
    }
    let mut image = RgbImage::from_pixel(width, height, BACKGROUND);

    // 1. Layout
    let (w, h) = (width as f32, height as f32);
    let left = (w * 0.08).round();
    let right = w - (w * 0.03).round();
    let top = (h * 0.05).round();
    let bottom = h - (h * 0.10).round();
    let plot_w = (right - left).max(1.0);
    let plot_h = (bottom - top).max(1.0);

    let bins = histogram.cap + 1;
    let bin_w = plot_w / bins as f32;
    let max_stack = histogram.max_stack().max(1) as f32;

    // 2. Horizontal grid
    for i in 1..=4 {
        let y = bottom - plot_h * i as f32 / 4.0;
        fill_rect(&mut image, left, y, right, y + 1.0, GRID);
    }

    // 3. Stacked bars
    for bin in 0..bins {
        let x0 = left + bin as f32 * bin_w + bin_w * 0.05;
        let x1 = left + (bin + 1) as f32 * bin_w - bin_w * 0.05;
        let mut base = 0;
        for category in &histogram.categories {
            let count = category.counts[bin];
            if count == 0 {
                continue;
            }
            let y1 = bottom - base as f32 / max_stack * plot_h;
            let y0 = bottom - (base + count) as f32 / max_stack * plot_h;
            fill_rect(&mut image, x0, y0, x1, y1, category.color);
            outline_rect(&mut image, x0, y0, x1, y1, shade(category.color));
            base += count;
        }
    }

    // 4. Medians
    for category in &histogram.categories {
        let x = left + (category.median as f32 + 0.5) * bin_w;
        fill_rect(&mut image, x - 1.0, top, x + 1.0, bottom, category.color);
    }

    // 5. Axes
    fill_rect(&mut image, left, bottom, right, bottom + 1.0, AXIS);
    fill_rect(&mut image, left - 1.0, top, left, bottom + 1.0, AXIS);

    Ok(image)
}

pub fn save_histogram(histogram: &Histogram, options: &HistogramOptions, path: &Path) -> Result<(), RenderError> {
    let image = render_histogram(histogram, options.width, options.height)?;
    image
        .save(path)
        .map_err(|source| RenderError::Save { path: path.to_path_buf(), source })
}

fn fill_rect(image: &mut RgbImage, x0: f32, y0: f32, x1: f32, y1: f32, color: Rgb<u8>) {
    let (width, height) = image.dimensions();
    let clamp = |v: f32, max: u32| (v.round().max(0.0) as u32).min(max);
    for y in clamp(y0, height)..clamp(y1, height) {
        for x in clamp(x0, width)..clamp(x1, width) {
            image.put_pixel(x, y, color);
        }
    }
}

fn outline_rect(image: &mut RgbImage, x0: f32, y0: f32, x1: f32, y1: f32, color: Rgb<u8>) {
    fill_rect(image, x0, y0, x1, y0 + 1.0, color);
    fill_rect(image, x0, y1 - 1.0, x1, y1, color);
    fill_rect(image, x0, y0, x0 + 1.0, y1, color);
    fill_rect(image, x1 - 1.0, y0, x1, y1, color);
}

// Same hue, lower lightness
fn shade(color: Rgb<u8>) -> Rgb<u8> {
    let srgb = Srgb::new(color[0], color[1], color[2]).into_format::<f32>();
    let mut lch: Lch = Lch::from_color(srgb);
    lch.l = (lch.l - 20.0f32).max(0.0f32);
    to_rgb(Srgb::from_color(lch))
}

fn to_rgb(srgb: Srgb<f32>) -> Rgb<u8> {
    let (r, g, b) = srgb.into_components();
    Rgb([(r * 255.0f32) as u8, (g * 255.0f32) as u8, (b * 255.0f32) as u8])
}

fn generate_category_colors(num_categories: usize) -> Vec<Rgb<u8>> {
    let mut rng = StdRng::seed_from_u64(42); // Seed for deterministic colors
    (0..num_categories)
        .map(|_| {
            let hue = rng.gen_range(0.0f32..360.0f32);
            let color: Lch = Lch::new(60.0f32, 70.0f32, hue);
            to_rgb(Srgb::from_color(color))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn bug(id: usize, kind: &str, n_lines: usize) -> BugDiffRecord {
        let mut metadata = Metadata::new();
        metadata.insert("type".into(), json!(kind));
        BugDiffRecord {
            human_id: format!("bug#{id}"),
            id: id.into(),
            project_name: "p".into(),
            commit_hash: "c".into(),
            n_lines,
            n_hunks: 1,
            n_files: 1,
            comprehensive_id: format!("bug#{id} ({id})"),
            metadata,
        }
    }

    fn options(cap: usize) -> HistogramOptions {
        HistogramOptions { metric: Metric::Lines, cap, category_key: "type".into(), width: 320, height: 200 }
    }

    fn sample() -> Vec<BugDiffRecord> {
        vec![
            bug(1, "Quantum", 1),
            bug(2, "Quantum", 3),
            bug(3, "Quantum", 25),
            bug(4, "Classical", 2),
            bug(5, "Classical", 4),
        ]
    }

    #[test]
    fn test_build_caps_and_medians() {
        let histogram = Histogram::build(&sample(), &options(20), &LabelConfig::default()).unwrap();
        assert_eq!(histogram.categories.len(), 2);

        let classical = &histogram.categories[0];
        assert_eq!(classical.name, "Classical");
        assert_eq!(classical.median, 3.0);
        assert_eq!(classical.color, Rgb([31, 119, 180]));

        let quantum = &histogram.categories[1];
        assert_eq!(quantum.counts.len(), 21);
        assert_eq!(quantum.counts[20], 1);
        assert_eq!(quantum.median, 3.0);
        assert_eq!(quantum.total, 3);
        assert_eq!(histogram.max_stack(), 1);
    }

    #[test]
    fn test_unknown_category_gets_generated_color() {
        let mut bugs = sample();
        bugs[0].metadata.remove("type");
        let histogram = Histogram::build(&bugs, &options(5), &LabelConfig::default()).unwrap();
        let unknown = histogram.categories.iter().find(|c| c.name == UNKNOWN_CATEGORY).unwrap();
        assert_eq!(unknown.total, 1);
        assert_eq!(generate_category_colors(1), generate_category_colors(1));
    }

    #[test]
    fn test_oversized_cap_rejected() {
        assert!(matches!(
            Histogram::build(&sample(), &options(usize::MAX), &LabelConfig::default()),
            Err(RenderError::CapTooLarge { max: MAX_CAP, .. })
        ));
        assert!(Histogram::build(&sample(), &options(MAX_CAP), &LabelConfig::default()).is_ok());
    }

    #[test]
    fn test_empty_input_rejected() {
        assert!(matches!(
            Histogram::build(&[], &options(20), &LabelConfig::default()),
            Err(RenderError::Empty)
        ));
    }

    #[test]
    fn test_render_draws_bars() {
        let histogram = Histogram::build(&sample(), &options(20), &LabelConfig::default()).unwrap();
        let image = render_histogram(&histogram, 320, 200).unwrap();
        assert_eq!(image.dimensions(), (320, 200));
        assert!(image.pixels().any(|p| *p == Rgb([255, 127, 14])));
        assert!(matches!(render_histogram(&histogram, 0, 10), Err(RenderError::InvalidSize { .. })));
    }

    #[test]
    fn test_save_png() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hist.png");
        let histogram = Histogram::build(&sample(), &options(10), &LabelConfig::default()).unwrap();
        save_histogram(&histogram, &options(10), &path).unwrap();
        assert!(path.metadata().unwrap().len() > 0);
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[]), 0.0);
        assert_eq!(median(&[4]), 4.0);
        assert_eq!(median(&[1, 2]), 1.5);
    }
}
