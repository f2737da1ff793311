//! Structure-enhancing filters for z-disc segmentation.
//!
//! Z-discs appear as thin bright striations. A Laplacian pass boosts the
//! band-like features, a Gaussian pass suppresses the pixel noise the
//! Laplacian amplifies, and Otsu's method picks the binarization
//! threshold per frame.

use ndarray::Array2;

/// Discrete 4-neighbor Laplacian with replicated borders, negated so that
/// bright ridges (striations) come out positive.
pub fn laplacian(input: &Array2<f64>) -> Array2<f64> {
    let (h, w) = input.dim();
    let mut out = Array2::zeros((h, w));
    for y in 0..h {
        for x in 0..w {
            let up = input[[y.saturating_sub(1), x]];
            let down = input[[(y + 1).min(h - 1), x]];
            let left = input[[y, x.saturating_sub(1)]];
            let right = input[[y, (x + 1).min(w - 1)]];
            out[[y, x]] = 4.0 * input[[y, x]] - (up + down + left + right);
        }
    }
    out
}

/// Separable Gaussian blur with replicated borders.
pub fn gaussian_blur(input: &Array2<f64>, sigma: f64) -> Array2<f64> {
    let kernel = gaussian_kernel(sigma);
    let radius = kernel.len() / 2;
    let (h, w) = input.dim();

    // Horizontal pass
    let mut tmp = Array2::zeros((h, w));
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0;
            for (k, weight) in kernel.iter().enumerate() {
                let xi = (x + k).saturating_sub(radius).min(w - 1);
                acc += weight * input[[y, xi]];
            }
            tmp[[y, x]] = acc;
        }
    }

    // Vertical pass
    let mut out = Array2::zeros((h, w));
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0;
            for (k, weight) in kernel.iter().enumerate() {
                let yi = (y + k).saturating_sub(radius).min(h - 1);
                acc += weight * tmp[[yi, x]];
            }
            out[[y, x]] = acc;
        }
    }
    out
}

fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    let radius = (3.0 * sigma).ceil().max(1.0) as usize;
    let mut kernel: Vec<f64> = (0..=2 * radius)
        .map(|i| {
            let d = i as f64 - radius as f64;
            (-d * d / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f64 = kernel.iter().sum();
    for v in &mut kernel {
        *v /= sum;
    }
    kernel
}

/// Otsu's threshold over a 256-bin histogram of the value range.
///
/// Returns the threshold maximizing between-class variance. For a flat
/// image (no contrast) the midpoint of the range is returned, which
/// yields an empty mask downstream.
pub fn otsu_threshold(input: &Array2<f64>) -> f64 {
    const BINS: usize = 256;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &v in input.iter() {
        min = min.min(v);
        max = max.max(v);
    }
    if !(max > min) {
        return min;
    }
    let scale = (BINS as f64 - 1.0) / (max - min);

    let mut histogram = [0u64; BINS];
    for &v in input.iter() {
        let bin = ((v - min) * scale).round() as usize;
        histogram[bin.min(BINS - 1)] += 1;
    }

    let total = input.len() as f64;
    let total_mean: f64 = histogram
        .iter()
        .enumerate()
        .map(|(i, &count)| i as f64 * count as f64)
        .sum::<f64>()
        / total;

    let mut best_variance = f64::NEG_INFINITY;
    let mut best_bin = 0usize;
    let mut weight_bg = 0.0;
    let mut sum_bg = 0.0;
    for (i, &count) in histogram.iter().enumerate() {
        weight_bg += count as f64 / total;
        sum_bg += i as f64 * count as f64 / total;
        if weight_bg <= 0.0 || weight_bg >= 1.0 {
            continue;
        }
        let mean_bg = sum_bg / weight_bg;
        let mean_fg = (total_mean - sum_bg) / (1.0 - weight_bg);
        let variance = weight_bg * (1.0 - weight_bg) * (mean_bg - mean_fg).powi(2);
        if variance > best_variance {
            best_variance = variance;
            best_bin = i;
        }
    }

    min + (best_bin as f64 + 0.5) / scale
}
