//! Heart-rate fragmentation metric family (Costa et al., 2017).
//!
//! Fragmentation describes how often the sign of successive NN-interval
//! differences flips. The series is reduced to acceleration/deceleration
//! symbols; metrics are percentages over inflection points and over the
//! segment structure of the symbol sequence. Zero differences break
//! segments without counting as inflections.

use anyhow::{anyhow, Result};

use crate::metrics::FragmentationMetrics;
use crate::stages::FragmentationStage;

/// Default fragmentation stage.
pub struct FragmentationAnalyzer;

impl FragmentationStage for FragmentationAnalyzer {
    fn analyze(&self, nn_ms: &[f64]) -> Result<FragmentationMetrics> {
        if nn_ms.len() < 4 {
            return Err(anyhow!(
                "fragmentation metrics need at least four NN intervals, got {}",
                nn_ms.len()
            ));
        }

        let signs: Vec<i8> = nn_ms
            .windows(2)
            .map(|pair| {
                let diff = pair[1] - pair[0];
                if diff > 0.0 {
                    1
                } else if diff < 0.0 {
                    -1
                } else {
                    0
                }
            })
            .collect();

        let inflections = signs
            .windows(2)
            .filter(|pair| pair[0] as i16 * pair[1] as i16 == -1)
            .count();
        let pip = inflections as f64 / signs.len() as f64 * 100.0;

        let segments = same_sign_segments(&signs);
        let total_in_segments: usize = segments.iter().sum();
        let ials = if segments.is_empty() {
            f64::NAN
        } else {
            segments.len() as f64 / total_in_segments as f64
        };
        let short: usize = segments.iter().filter(|&&len| len < 3).sum();
        let pss = short as f64 / signs.len() as f64 * 100.0;

        let pas = alternation_fraction(&signs) * 100.0;

        Ok(FragmentationMetrics {
            pip,
            ials,
            pss,
            pas,
        })
    }
}

/// Lengths of maximal runs of identical nonzero sign.
fn same_sign_segments(signs: &[i8]) -> Vec<usize> {
    let mut segments = Vec::new();
    let mut run = 0usize;
    let mut current = 0i8;
    for &sign in signs {
        if sign != 0 && sign == current {
            run += 1;
        } else {
            if run > 0 {
                segments.push(run);
            }
            current = sign;
            run = usize::from(sign != 0);
        }
    }
    if run > 0 {
        segments.push(run);
    }
    segments
}

/// Fraction of differences inside alternation runs of at least four
/// symbols (sign flipping at every step).
fn alternation_fraction(signs: &[i8]) -> f64 {
    let mut in_alternation = 0usize;
    let mut run = 1usize;
    for pair in signs.windows(2) {
        if pair[0] as i16 * pair[1] as i16 == -1 {
            run += 1;
        } else {
            if run >= 4 {
                in_alternation += run;
            }
            run = 1;
        }
    }
    if run >= 4 {
        in_alternation += run;
    }
    in_alternation as f64 / signs.len() as f64
}
