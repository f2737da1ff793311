//! Connected-component extraction and principal-axis fitting.

use ndarray::Array2;

/// One 8-connected foreground component of the binary mask.
#[derive(Debug, Clone)]
pub struct Component {
    /// (row, col) coordinates of every member pixel.
    pub pixels: Vec<(usize, usize)>,
}

impl Component {
    pub fn size(&self) -> usize {
        self.pixels.len()
    }
}

/// Shape summary of a component from its intensity-weighted second
/// moments.
#[derive(Debug, Clone, Copy)]
pub struct MomentFit {
    /// Weighted centroid as (x, y), sub-pixel.
    pub center_x: f64,
    pub center_y: f64,
    /// Principal-axis orientation, radians in [0, pi).
    pub angle: f64,
    /// 4 * sqrt(major eigenvalue) — full extent along the principal axis.
    pub length: f64,
    /// 4 * sqrt(minor eigenvalue) — full extent across it.
    pub width: f64,
    /// Mean filtered intensity over the component.
    pub mean_intensity: f64,
}

/// Label 8-connected components of `filtered > threshold`, in scan order.
///
/// Scan order makes the component list deterministic, which keeps
/// detection output deterministic downstream.
pub fn find_components(filtered: &Array2<f64>, threshold: f64) -> Vec<Component> {
    let (h, w) = filtered.dim();
    let mut visited = vec![false; h * w];
    let mut components = Vec::new();
    let mut stack = Vec::new();

    for y in 0..h {
        for x in 0..w {
            if visited[y * w + x] || !(filtered[[y, x]] > threshold) {
                continue;
            }
            let mut pixels = Vec::new();
            visited[y * w + x] = true;
            stack.push((y, x));
            while let Some((cy, cx)) = stack.pop() {
                pixels.push((cy, cx));
                let y0 = cy.saturating_sub(1);
                let x0 = cx.saturating_sub(1);
                for ny in y0..=(cy + 1).min(h - 1) {
                    for nx in x0..=(cx + 1).min(w - 1) {
                        if !visited[ny * w + nx] && filtered[[ny, nx]] > threshold {
                            visited[ny * w + nx] = true;
                            stack.push((ny, nx));
                        }
                    }
                }
            }
            components.push(Component { pixels });
        }
    }
    components
}

/// Fit position, orientation, and extent from intensity-weighted first
/// and second central moments.
pub fn fit_moments(component: &Component, filtered: &Array2<f64>, threshold: f64) -> MomentFit {
    // Weights are the above-threshold part of the response, so a dim
    // fringe pixel pulls the centroid less than the bright core.
    let mut total = 0.0;
    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    let mut sum_intensity = 0.0;
    for &(y, x) in &component.pixels {
        let weight = (filtered[[y, x]] - threshold).max(f64::MIN_POSITIVE);
        total += weight;
        sum_x += weight * x as f64;
        sum_y += weight * y as f64;
        sum_intensity += filtered[[y, x]];
    }
    let center_x = sum_x / total;
    let center_y = sum_y / total;

    let mut m20 = 0.0;
    let mut m02 = 0.0;
    let mut m11 = 0.0;
    for &(y, x) in &component.pixels {
        let weight = (filtered[[y, x]] - threshold).max(f64::MIN_POSITIVE);
        let dx = x as f64 - center_x;
        let dy = y as f64 - center_y;
        m20 += weight * dx * dx;
        m02 += weight * dy * dy;
        m11 += weight * dx * dy;
    }
    m20 /= total;
    m02 /= total;
    m11 /= total;

    // Single-pixel components have zero spread; keep the eigenvalues at
    // zero rather than NaN.
    let half_trace = (m20 + m02) * 0.5;
    let delta = (((m20 - m02) * 0.5).powi(2) + m11 * m11).sqrt();
    let lambda_major = (half_trace + delta).max(0.0);
    let lambda_minor = (half_trace - delta).max(0.0);

    let mut angle = 0.5 * (2.0 * m11).atan2(m20 - m02);
    if angle < 0.0 {
        angle += std::f64::consts::PI;
    }

    MomentFit {
        center_x,
        center_y,
        angle,
        length: 4.0 * lambda_major.sqrt(),
        width: 4.0 * lambda_minor.sqrt(),
        mean_intensity: sum_intensity / component.pixels.len() as f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn mask_from(rows: &[&str]) -> Array2<f64> {
        let h = rows.len();
        let w = rows[0].len();
        let mut out = Array2::zeros((h, w));
        for (y, row) in rows.iter().enumerate() {
            for (x, c) in row.chars().enumerate() {
                if c == '#' {
                    out[[y, x]] = 1.0;
                }
            }
        }
        out
    }

    #[test]
    fn two_separate_blobs() {
        let mask = mask_from(&[
            "##....", //
            "##....", //
            "......", //
            "....##", //
            "....##",
        ]);
        let components = find_components(&mask, 0.5);
        assert_eq!(components.len(), 2);
        assert_eq!(components[0].size(), 4);
        assert_eq!(components[1].size(), 4);
    }

    #[test]
    fn diagonal_pixels_are_connected() {
        let mask = mask_from(&[
            "#..", //
            ".#.", //
            "..#",
        ]);
        let components = find_components(&mask, 0.5);
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].size(), 3);
    }

    #[test]
    fn horizontal_bar_orientation() {
        let mask = mask_from(&["......", "######", "......"]);
        let components = find_components(&mask, 0.5);
        assert_eq!(components.len(), 1);
        let fit = fit_moments(&components[0], &mask, 0.5);
        // Principal axis along x: angle near 0 or near pi
        let folded = fit.angle.min(std::f64::consts::PI - fit.angle);
        assert!(folded < 1e-6, "angle {} not horizontal", fit.angle);
        assert!(fit.length > fit.width);
        assert!((fit.center_x - 2.5).abs() < 1e-9);
        assert!((fit.center_y - 1.0).abs() < 1e-9);
    }

    #[test]
    fn vertical_bar_orientation() {
        let mask = mask_from(&["..#..", "..#..", "..#..", "..#.."]);
        let components = find_components(&mask, 0.5);
        let fit = fit_moments(&components[0], &mask, 0.5);
        assert!(
            (fit.angle - std::f64::consts::FRAC_PI_2).abs() < 1e-6,
            "angle {} not vertical",
            fit.angle
        );
    }
}
