//! Synthesis of output ramps as sequences of DAC codes.
//!
//! All generators work in code space: voltages are converted once at the
//! endpoints and the interpolation happens on integers, so a generated
//! ramp never overshoots its voltage bounds by more than one code.

use log::warn;

use crate::codec::{volts_to_counts, FULL_SCALE_VOLTS};
use crate::error::DaqError;
use crate::types::{RampShape, MAX_TRANSFER_SAMPLES};

/// A finite, device-ready sequence of output codes tagged with its shape.
#[derive(Debug, Clone)]
pub struct Waveform {
    shape: RampShape,
    samples: Vec<u16>,
}

impl Waveform {
    pub fn shape(&self) -> RampShape {
        self.shape
    }

    pub fn samples(&self) -> &[u16] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Fill `out` with a linear interpolation from `start` to `stop`, both
/// endpoints included, each intermediate value rounded to the nearest code.
///
/// Interpolation is degenerate below two samples, so shorter slices are
/// rejected.
pub fn integer_slope(start: u16, stop: u16, out: &mut [u16]) -> Result<(), DaqError> {
    if out.len() < 2 {
        return Err(DaqError::Value(format!(
            "slope needs at least 2 samples, got {}",
            out.len()
        )));
    }
    let step = (f64::from(stop) - f64::from(start)) / (out.len() - 1) as f64;
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = (f64::from(start) + step * i as f64).round() as u16;
    }
    Ok(())
}

/// Build the output waveform for one ramp of `n_samples` samples.
///
/// The first `n_prefix` samples hold the code for `offset` so the output
/// has settled before the active ramp begins. The following samples ramp
/// linearly between the codes for `offset - amplitude/2` and
/// `offset + amplitude/2` (direction per `shape`), and the final sample
/// returns to the offset code: the scan engine holds its last value after
/// the bounded scan drains, so the output parks at the reference level.
pub fn generate_signal(
    shape: RampShape,
    n_samples: usize,
    n_prefix: usize,
    amplitude: f64,
    offset: f64,
) -> Result<Waveform, DaqError> {
    if n_samples > MAX_TRANSFER_SAMPLES {
        return Err(DaqError::Value(format!(
            "{n_samples} samples exceed the {MAX_TRANSFER_SAMPLES} sample transfer limit"
        )));
    }
    if n_prefix > n_samples {
        return Err(DaqError::Value(format!(
            "settling prefix {n_prefix} longer than the {n_samples} sample signal"
        )));
    }
    if !(0.0..=2.0 * FULL_SCALE_VOLTS).contains(&amplitude) {
        return Err(DaqError::Value(format!(
            "amplitude {amplitude} V outside [0, {}] V",
            2.0 * FULL_SCALE_VOLTS
        )));
    }
    let low = offset - amplitude / 2.0;
    let high = offset + amplitude / 2.0;
    if low < -FULL_SCALE_VOLTS || high > FULL_SCALE_VOLTS {
        return Err(DaqError::Value(format!(
            "ramp from {low} V to {high} V leaves the ±{FULL_SCALE_VOLTS} V output range"
        )));
    }
    // Active region between prefix and the final settling sample.
    let slope_len = n_samples.saturating_sub(n_prefix + 1);
    if slope_len < 2 {
        return Err(DaqError::Value(format!(
            "{n_samples} samples with a {n_prefix} sample prefix leave no room for a slope"
        )));
    }

    let (start, stop) = match shape {
        RampShape::Descent => (volts_to_counts(high), volts_to_counts(low)),
        RampShape::Ascent => (volts_to_counts(low), volts_to_counts(high)),
        RampShape::Dip => return Err(DaqError::NotImplemented("dip-shaped ramp generation")),
    };

    let rest = volts_to_counts(offset);
    let mut samples = vec![rest; n_samples];
    integer_slope(start, stop, &mut samples[n_prefix..n_samples - 1])?;
    // samples[n_samples - 1] stays at the rest code.
    Ok(Waveform { shape, samples })
}

/// Build a symmetric V-shaped waveform spanning `[min_volts, max_volts]`.
///
/// The first half sweeps down from the second-highest step to the minimum,
/// the second half back up to the maximum. An invalid range (inverted or
/// outside full scale) falls back to the full ±10 V span with a warning
/// instead of failing, matching the long-standing behavior of the
/// calibration ramp this replaces.
pub fn generate_triangle(length: usize, min_volts: f64, max_volts: f64) -> Waveform {
    let (min_v, max_v) = if min_volts > max_volts
        || min_volts < -FULL_SCALE_VOLTS
        || max_volts > FULL_SCALE_VOLTS
    {
        warn!(
            "triangle range [{min_volts}, {max_volts}] V invalid, using full ±{FULL_SCALE_VOLTS} V"
        );
        (-FULL_SCALE_VOLTS, FULL_SCALE_VOLTS)
    } else {
        (min_volts, max_volts)
    };

    let lo = f64::from(volts_to_counts(min_v));
    let hi = f64::from(volts_to_counts(max_v));
    let half = length / 2;
    let mut samples = Vec::with_capacity(length);
    for i in 0..half {
        let fraction = (i + 1) as f64 / half as f64;
        samples.push((lo + (hi - lo) * (1.0 - fraction)).round() as u16);
    }
    for i in 0..half {
        let fraction = (i + 1) as f64 / half as f64;
        samples.push((lo + (hi - lo) * fraction).round() as u16);
    }
    if samples.len() < length {
        // Odd length: hold the maximum for the leftover sample.
        samples.push(hi.round() as u16);
    }
    Waveform {
        shape: RampShape::Dip,
        samples,
    }
}
