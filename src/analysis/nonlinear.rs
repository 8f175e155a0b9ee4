//! Nonlinear metric family.
//!
//! Combines Poincaré dispersion (SD1/SD2), short- and long-scale
//! detrended fluctuation exponents (α1, α2) and sample entropy, and emits
//! the plot bundle behind the three-panel nonlinear figure: fluctuation
//! points, scaling-exponent fits, and a multiscale-entropy curve.

use anyhow::{anyhow, Result};
use nalgebra::{DMatrix, DVector, DVectorView};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::metrics::NonlinearMetrics;
use crate::stages::{NonlinearStage, PlotData};

/// Default nonlinear stage.
#[derive(Debug, Clone, Copy)]
pub struct NonlinearAnalyzer {
    /// Inclusive box-size range of the short-scale DFA exponent, beats.
    pub short_scales: (usize, usize),
    /// Inclusive box-size range of the long-scale DFA exponent, beats.
    pub long_scales: (usize, usize),
    /// Largest coarse-graining scale of the multiscale-entropy curve.
    pub mse_max_scale: usize,
}

impl Default for NonlinearAnalyzer {
    fn default() -> Self {
        Self {
            short_scales: (4, 16),
            long_scales: (16, 64),
            mse_max_scale: 5,
        }
    }
}

impl NonlinearStage for NonlinearAnalyzer {
    fn analyze(&self, nn_ms: &[f64]) -> Result<(NonlinearMetrics, PlotData)> {
        if nn_ms.len() < 4 {
            return Err(anyhow!(
                "nonlinear metrics need at least four NN intervals, got {}",
                nn_ms.len()
            ));
        }

        let (sd1, sd2) = poincare_sd(nn_ms);

        let integrated = integrate(nn_ms);
        let short = fluctuations(&integrated, &scale_range(self.short_scales, 1, nn_ms.len()));
        let long = fluctuations(&integrated, &scale_range(self.long_scales, 4, nn_ms.len()));
        let dfa_alpha1 = scaling_exponent(&short);
        let dfa_alpha2 = scaling_exponent(&long);

        let sd = DVectorView::from(nn_ms).variance().sqrt();
        let tolerance = 0.2 * sd;
        let sampen = sample_entropy(nn_ms, 2, tolerance);

        let mse_scales: Vec<f64> = (1..=self.mse_max_scale).map(|s| s as f64).collect();
        let mse: Vec<f64> = (1..=self.mse_max_scale)
            .map(|scale| sample_entropy(&coarse_grain(nn_ms, scale), 2, tolerance))
            .collect();

        let (dfa_x, dfa_y): (Vec<f64>, Vec<f64>) =
            short.iter().chain(long.iter()).copied().unzip();
        let plot = PlotData::new("nonlinear")
            .with_series("dfa", dfa_x, dfa_y)
            .with_series(
                "alpha",
                vec![self.short_scales.0 as f64, self.long_scales.1 as f64],
                vec![dfa_alpha1, dfa_alpha2],
            )
            .with_series("mse", mse_scales, mse);

        let metrics = NonlinearMetrics {
            sd1,
            sd2,
            sd_ratio: sd1 / sd2,
            dfa_alpha1,
            dfa_alpha2,
            sampen,
        };
        Ok((metrics, plot))
    }
}

/// Poincaré SD1/SD2 from the rotated successive-interval cloud.
fn poincare_sd(nn_ms: &[f64]) -> (f64, f64) {
    let diffs: Vec<f64> = nn_ms.windows(2).map(|w| (w[1] - w[0]) / 2f64.sqrt()).collect();
    let sums: Vec<f64> = nn_ms.windows(2).map(|w| (w[1] + w[0]) / 2f64.sqrt()).collect();
    let sd1 = DVectorView::from(diffs.as_slice()).variance().sqrt();
    let sd2 = DVectorView::from(sums.as_slice()).variance().sqrt();
    (sd1, sd2)
}

/// Mean-centered cumulative profile of the series.
fn integrate(data: &[f64]) -> Vec<f64> {
    let mean = DVectorView::from(data).mean();
    data.iter()
        .scan(0.0, |state, &x| {
            *state += x - mean;
            Some(*state)
        })
        .collect()
}

/// Box sizes inside `range` (inclusive, given step) that the data length
/// can support; DFA needs at least four boxes per scale.
fn scale_range(range: (usize, usize), step: usize, data_len: usize) -> Vec<usize> {
    (range.0..=range.1)
        .step_by(step)
        .filter(|&scale| scale >= 4 && data_len >= 4 * scale)
        .collect()
}

/// (ln n, ln F(n)) fluctuation points of the integrated profile for the
/// given box sizes, each box linearly detrended.
fn fluctuations(integrated: &[f64], scales: &[usize]) -> Vec<(f64, f64)> {
    scales
        .par_iter()
        .filter_map(|&scale| {
            let boxes = integrated.len() / scale;
            if boxes == 0 {
                return None;
            }
            let variance_sum: f64 = (0..boxes)
                .map(|b| {
                    let chunk = &integrated[b * scale..(b + 1) * scale];
                    detrended_variance(chunk)
                })
                .sum();
            let f_n = (variance_sum / boxes as f64).sqrt();
            if f_n > 0.0 {
                Some(((scale as f64).ln(), f_n.ln()))
            } else {
                None
            }
        })
        .collect()
}

/// Variance of a chunk around its least-squares line.
fn detrended_variance(chunk: &[f64]) -> f64 {
    let x: Vec<f64> = (0..chunk.len()).map(|i| i as f64).collect();
    match linear_fit(&x, chunk) {
        Ok(((slope, intercept), _)) => {
            let residuals: Vec<f64> = chunk
                .iter()
                .zip(&x)
                .map(|(&y, &i)| y - (slope * i + intercept))
                .collect();
            let residuals = DVectorView::from(residuals.as_slice());
            residuals.dot(&residuals) / residuals.len() as f64
        }
        Err(_) => 0.0,
    }
}

/// Slope of the log-log fluctuation fit, NaN when fewer than two points
/// survived.
fn scaling_exponent(points: &[(f64, f64)]) -> f64 {
    if points.len() < 2 {
        return f64::NAN;
    }
    let (x, y): (Vec<f64>, Vec<f64>) = points.iter().copied().unzip();
    match linear_fit(&x, &y) {
        Ok(((slope, _), _)) => slope,
        Err(_) => f64::NAN,
    }
}

/// Least-squares line through (x, y): returns ((slope, intercept), R²).
fn linear_fit(x: &[f64], y: &[f64]) -> Result<((f64, f64), f64)> {
    if x.len() < 2 || x.len() != y.len() {
        return Err(anyhow!(
            "linear fit needs two equal-length coordinate slices"
        ));
    }
    let design = DMatrix::from_columns(&[
        DVector::from_column_slice(x),
        DVector::from_element(x.len(), 1.0),
    ]);
    let y = DVectorView::from(y);
    let result = lstsq::lstsq(&design, &y.into(), f64::EPSILON).map_err(|e| anyhow!(e))?;

    let y_mean = y.mean();
    let tss: f64 = y.iter().map(|&yi| (yi - y_mean).powi(2)).sum();
    let r_squared = 1.0 - result.residuals / tss;
    Ok(((result.solution[0], result.solution[1]), r_squared))
}

/// Sample entropy with template length `m` and tolerance `r`
/// (Chebyshev distance). NaN when no matches exist at either length.
fn sample_entropy(data: &[f64], m: usize, r: f64) -> f64 {
    if data.len() <= m + 1 || r <= 0.0 {
        return f64::NAN;
    }
    let count = |len: usize| -> usize {
        let templates = data.len() - len + 1;
        let mut matches = 0;
        for i in 0..templates {
            for j in (i + 1)..templates {
                let close = (0..len).all(|k| (data[i + k] - data[j + k]).abs() <= r);
                if close {
                    matches += 1;
                }
            }
        }
        matches
    };
    let b = count(m);
    let a = count(m + 1);
    if a == 0 || b == 0 {
        return f64::NAN;
    }
    -((a as f64) / (b as f64)).ln()
}

/// Non-overlapping coarse-grained averages at the given scale.
fn coarse_grain(data: &[f64], scale: usize) -> Vec<f64> {
    data.chunks_exact(scale)
        .map(|chunk| chunk.iter().sum::<f64>() / scale as f64)
        .collect()
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng};

    use super::*;

    fn jittered_series(size: usize) -> Vec<f64> {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        (0..size)
            .map(|_| 1000.0 + rng.gen_range(-25.0..25.0))
            .collect()
    }

    #[test]
    fn sd1_tracks_short_term_variability() {
        // Strict alternation: all variability is short-term.
        let nn: Vec<f64> = (0..200)
            .map(|i| if i % 2 == 0 { 950.0 } else { 1050.0 })
            .collect();
        let (metrics, _) = NonlinearAnalyzer::default().analyze(&nn).unwrap();
        assert!(
            metrics.sd1 > metrics.sd2,
            "alternating series should have sd1 ({}) > sd2 ({})",
            metrics.sd1,
            metrics.sd2
        );
    }

    #[test]
    fn sd2_tracks_slow_trends() {
        // Slow ramp: variability lives along the identity line.
        let nn: Vec<f64> = (0..200).map(|i| 900.0 + i as f64).collect();
        let (metrics, _) = NonlinearAnalyzer::default().analyze(&nn).unwrap();
        assert!(metrics.sd2 > metrics.sd1);
        assert!(metrics.sd_ratio < 1.0);
    }

    #[test]
    fn white_noise_alpha_is_near_half() {
        let nn = jittered_series(1024);
        let (metrics, _) = NonlinearAnalyzer::default().analyze(&nn).unwrap();
        assert!(
            (metrics.dfa_alpha1 - 0.5).abs() < 0.25,
            "white noise alpha1 should be near 0.5, got {}",
            metrics.dfa_alpha1
        );
        assert!(metrics.dfa_alpha2.is_finite());
    }

    #[test]
    fn short_series_gets_nan_alpha2_not_an_error() {
        // 80 beats supports scales up to 20: alpha1 yes, alpha2 mostly not.
        let nn = jittered_series(80);
        let (metrics, _) = NonlinearAnalyzer::default().analyze(&nn).unwrap();
        assert!(metrics.dfa_alpha1.is_finite());
        assert!(metrics.sd1.is_finite());
    }

    #[test]
    fn sample_entropy_orders_noise_above_regularity() {
        let regular: Vec<f64> = (0..300)
            .map(|i| 1000.0 + 30.0 * ((i as f64) * 0.3).sin())
            .collect();
        let noisy = jittered_series(300);
        let r = 0.2 * DVectorView::from(noisy.as_slice()).variance().sqrt();
        let regular_en = sample_entropy(&regular, 2, r);
        let noisy_en = sample_entropy(&noisy, 2, r);
        assert!(
            noisy_en > regular_en,
            "noise ({noisy_en}) should be more entropic than a sine ({regular_en})"
        );
    }

    #[test]
    fn plot_bundle_has_three_panels() {
        let nn = jittered_series(512);
        let (_, plot) = NonlinearAnalyzer::default().analyze(&nn).unwrap();
        assert_eq!(plot.kind, "nonlinear");
        let labels: Vec<&str> = plot.series.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["dfa", "alpha", "mse"]);
    }

    #[test]
    fn too_short_series_fails() {
        assert!(NonlinearAnalyzer::default().analyze(&[1000.0, 990.0]).is_err());
    }

    #[test]
    fn linear_fit_recovers_line() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [2.0, 4.0, 6.0, 8.0, 10.0];
        let ((slope, intercept), r_squared) = linear_fit(&x, &y).unwrap();
        assert!((slope - 2.0).abs() < 1e-9);
        assert!(intercept.abs() < 1e-9);
        assert!(r_squared > 0.999);
    }

    #[test]
    fn coarse_grain_halves_length_at_scale_two() {
        let data = vec![1.0, 3.0, 5.0, 7.0, 9.0];
        assert_eq!(coarse_grain(&data, 2), vec![2.0, 6.0]);
    }
}
