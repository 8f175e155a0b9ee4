//! Frequency-domain metric family.
//!
//! The NN series is unevenly sampled in time, so it is first resampled to
//! a uniform rate by linear interpolation, then a Hann-windowed Welch
//! periodogram is computed and integrated over the conventional VLF, LF
//! and HF bands. Powers are in ms², peak frequencies in Hz.

use anyhow::{anyhow, Result};
use rustfft::{num_complex::Complex, FftPlanner};

use crate::metrics::FrequencyDomainMetrics;
use crate::stages::{FrequencyDomainStage, PlotData};

const VLF_BAND: (f64, f64) = (0.003, 0.04);
const LF_BAND: (f64, f64) = (0.04, 0.15);
const HF_BAND: (f64, f64) = (0.15, 0.4);

/// Default frequency-domain stage: Welch periodogram band powers.
#[derive(Debug, Clone, Copy)]
pub struct WelchAnalyzer {
    /// Uniform resampling rate of the NN series, Hz.
    pub resample_hz: f64,
    /// Welch segment length in resampled points; clamped to the series
    /// length and rounded down to a power of two. Segments overlap by half.
    pub segment_len: usize,
}

impl Default for WelchAnalyzer {
    fn default() -> Self {
        Self {
            resample_hz: 4.0,
            segment_len: 256,
        }
    }
}

impl FrequencyDomainStage for WelchAnalyzer {
    fn analyze(
        &self,
        nn_ms: &[f64],
        onsets_s: &[f64],
    ) -> Result<(FrequencyDomainMetrics, PlotData)> {
        if nn_ms.len() != onsets_s.len() {
            return Err(anyhow!(
                "NN intervals and onsets differ in length ({} vs {})",
                nn_ms.len(),
                onsets_s.len()
            ));
        }
        if nn_ms.len() < 4 {
            return Err(anyhow!(
                "frequency-domain metrics need at least four NN intervals, got {}",
                nn_ms.len()
            ));
        }

        let uniform = resample_uniform(nn_ms, onsets_s, self.resample_hz)?;
        let (freqs, psd) = welch_psd(&uniform, self.resample_hz, self.segment_len)?;

        let (vlf_power, _) = band_power(&freqs, &psd, VLF_BAND);
        let (lf_power, lf_peak_hz) = band_power(&freqs, &psd, LF_BAND);
        let (hf_power, hf_peak_hz) = band_power(&freqs, &psd, HF_BAND);

        let metrics = FrequencyDomainMetrics {
            vlf_power,
            lf_power,
            hf_power,
            total_power: vlf_power + lf_power + hf_power,
            lf_hf_ratio: lf_power / hf_power,
            lf_peak_hz,
            hf_peak_hz,
        };
        let plot = PlotData::new("psd").with_series("welch", freqs, psd);
        Ok((metrics, plot))
    }
}

/// Linearly interpolates the NN series onto a uniform grid spanning the
/// onset range.
fn resample_uniform(nn_ms: &[f64], onsets_s: &[f64], rate_hz: f64) -> Result<Vec<f64>> {
    if !(rate_hz.is_finite() && rate_hz > 0.0) {
        return Err(anyhow!("resample rate must be positive, got {rate_hz} Hz"));
    }
    if onsets_s.windows(2).any(|pair| pair[1] <= pair[0]) {
        return Err(anyhow!("interval onsets must be strictly increasing"));
    }

    let start = onsets_s[0];
    let span = onsets_s[onsets_s.len() - 1] - start;
    let count = (span * rate_hz).floor() as usize + 1;

    let mut upper = 1usize;
    let uniform = (0..count)
        .map(|k| {
            let t = start + k as f64 / rate_hz;
            while upper < onsets_s.len() - 1 && onsets_s[upper] < t {
                upper += 1;
            }
            let (t0, t1) = (onsets_s[upper - 1], onsets_s[upper]);
            let frac = (t - t0) / (t1 - t0);
            nn_ms[upper - 1] + frac * (nn_ms[upper] - nn_ms[upper - 1])
        })
        .collect();
    Ok(uniform)
}

/// Welch power spectral density with Hann windows and half-segment
/// overlap. Returns one-sided (frequency, density) vectors.
fn welch_psd(series: &[f64], rate_hz: f64, segment_len: usize) -> Result<(Vec<f64>, Vec<f64>)> {
    let mut seg_len = segment_len.min(series.len()).next_power_of_two();
    if seg_len > series.len() {
        seg_len /= 2;
    }
    if seg_len < 8 {
        return Err(anyhow!(
            "resampled series too short for spectral estimation ({} points)",
            series.len()
        ));
    }

    let mean = series.iter().sum::<f64>() / series.len() as f64;
    let hann: Vec<f64> = (0..seg_len)
        .map(|i| {
            let phase = 2.0 * std::f64::consts::PI * i as f64 / seg_len as f64;
            0.5 * (1.0 - phase.cos())
        })
        .collect();
    let window_power: f64 = hann.iter().map(|w| w * w).sum();

    let fft = FftPlanner::new().plan_fft_forward(seg_len);
    let step = seg_len / 2;
    let bins = seg_len / 2 + 1;
    let mut psd = vec![0.0; bins];
    let mut segments = 0usize;

    let mut start = 0;
    while start + seg_len <= series.len() {
        let mut buffer: Vec<Complex<f64>> = series[start..start + seg_len]
            .iter()
            .zip(&hann)
            .map(|(&value, &w)| Complex::new((value - mean) * w, 0.0))
            .collect();
        fft.process(&mut buffer);
        for (bin, value) in buffer[..bins].iter().enumerate() {
            // One-sided density: interior bins carry both spectrum halves.
            let fold = if bin == 0 || bin == bins - 1 { 1.0 } else { 2.0 };
            psd[bin] += fold * value.norm_sqr() / (rate_hz * window_power);
        }
        segments += 1;
        start += step;
    }

    for value in &mut psd {
        *value /= segments as f64;
    }
    let freqs = (0..bins)
        .map(|bin| bin as f64 * rate_hz / seg_len as f64)
        .collect();
    Ok((freqs, psd))
}

/// Integrated power and peak frequency inside `band` (Hz, half-open on
/// the upper edge). An empty band yields zero power and a NaN peak.
fn band_power(freqs: &[f64], psd: &[f64], band: (f64, f64)) -> (f64, f64) {
    let df = if freqs.len() > 1 { freqs[1] - freqs[0] } else { 0.0 };
    let mut power = 0.0;
    let mut peak = (f64::NAN, f64::NEG_INFINITY);
    for (&freq, &density) in freqs.iter().zip(psd) {
        if freq >= band.0 && freq < band.1 {
            power += density * df;
            if density > peak.1 {
                peak = (freq, density);
            }
        }
    }
    (power, peak.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// NN series with a pure modulation at `freq_hz`, one interval per
    /// ~`base_ms` milliseconds.
    fn modulated_series(freq_hz: f64, base_ms: f64, beats: usize) -> (Vec<f64>, Vec<f64>) {
        let mut nn = Vec::with_capacity(beats);
        let mut onsets = Vec::with_capacity(beats);
        let mut t = 0.0;
        for _ in 0..beats {
            let interval = base_ms + 40.0 * (2.0 * std::f64::consts::PI * freq_hz * t).sin();
            nn.push(interval);
            onsets.push(t);
            t += interval / 1000.0;
        }
        (nn, onsets)
    }

    #[test]
    fn hf_modulation_lands_in_hf_band() {
        let (nn, onsets) = modulated_series(0.25, 800.0, 800);
        let (metrics, plot) = WelchAnalyzer::default().analyze(&nn, &onsets).unwrap();
        assert!(
            metrics.hf_power > metrics.lf_power,
            "0.25 Hz modulation should concentrate power in HF \
             (hf={}, lf={})",
            metrics.hf_power,
            metrics.lf_power
        );
        assert!((metrics.hf_peak_hz - 0.25).abs() < 0.03);
        assert!(metrics.lf_hf_ratio < 1.0);
        assert_eq!(plot.kind, "psd");
        assert!(!plot.series[0].x.is_empty());
    }

    #[test]
    fn lf_modulation_lands_in_lf_band() {
        let (nn, onsets) = modulated_series(0.1, 800.0, 800);
        let (metrics, _) = WelchAnalyzer::default().analyze(&nn, &onsets).unwrap();
        assert!(metrics.lf_power > metrics.hf_power);
        assert!((metrics.lf_peak_hz - 0.1).abs() < 0.02);
        assert!(metrics.lf_hf_ratio > 1.0);
    }

    #[test]
    fn total_power_is_band_sum() {
        let (nn, onsets) = modulated_series(0.1, 900.0, 600);
        let (metrics, _) = WelchAnalyzer::default().analyze(&nn, &onsets).unwrap();
        let sum = metrics.vlf_power + metrics.lf_power + metrics.hf_power;
        assert!((metrics.total_power - sum).abs() < 1e-12);
    }

    #[test]
    fn mismatched_inputs_fail() {
        let result = WelchAnalyzer::default().analyze(&[800.0, 810.0], &[0.0]);
        assert!(result.is_err());
    }

    #[test]
    fn non_monotonic_onsets_fail() {
        let nn = vec![800.0; 8];
        let onsets = vec![0.0, 0.8, 0.7, 2.4, 3.2, 4.0, 4.8, 5.6];
        assert!(WelchAnalyzer::default().analyze(&nn, &onsets).is_err());
    }

    #[test]
    fn short_series_fails() {
        let nn = vec![800.0, 810.0, 790.0];
        let onsets = vec![0.0, 0.8, 1.6];
        assert!(WelchAnalyzer::default().analyze(&nn, &onsets).is_err());
    }
}
