//! Conversion between physical voltages and the device's 16 bit codes.
//!
//! The DAC and ADC both map their bipolar full-scale range linearly onto
//! the full code range: full-scale negative is code 0, full-scale positive
//! is [`MAX_CODE`]. These are the ideal (uncalibrated) mappings; per-device
//! gain tables are deliberately not applied here.

use ndarray::Array2;

use crate::types::{AnalogRange, ChannelSpec};

/// Highest digital code the 16 bit converters can represent.
pub const MAX_CODE: u16 = u16::MAX;

/// Bipolar full-scale voltage of the analog outputs.
pub const FULL_SCALE_VOLTS: f64 = 10.0;

/// Convert a voltage in `[-10 V, +10 V]` to the matching output code.
///
/// The scaled value is rounded half away from zero. Callers are expected
/// to validate their range beforehand; out-of-range inputs saturate at the
/// code limits rather than wrapping.
pub fn volts_to_counts(volts: f64) -> u16 {
    let span = 2.0 * FULL_SCALE_VOLTS;
    let scaled = f64::from(MAX_CODE) * (volts + FULL_SCALE_VOLTS) / span;
    scaled.round().clamp(0.0, f64::from(MAX_CODE)) as u16
}

/// Convert an output code back to volts at the fixed ±10 V range.
pub fn counts_to_volts(counts: u16) -> f64 {
    2.0 * FULL_SCALE_VOLTS * f64::from(counts) / f64::from(MAX_CODE) - FULL_SCALE_VOLTS
}

/// Convert an input code to volts under the given channel range.
///
/// Input channels may run at a narrower gain setting than the fixed ±10 V
/// output range, in which case the full code span maps onto the narrower
/// voltage span.
pub fn counts_to_volts_in(range: AnalogRange, counts: u16) -> f64 {
    let full_scale = range.full_scale_volts();
    2.0 * full_scale * f64::from(counts) / f64::from(MAX_CODE) - full_scale
}

/// Convert a raw readback matrix to volts, column by column.
///
/// `sample_channels` returns raw codes; this is the explicit conversion
/// step for callers wanting physical units. Column `i` of `data` is
/// converted with the range of `channels[i]`; extra columns fall back to
/// ±10 V.
pub fn scan_to_volts(data: &Array2<u16>, channels: &[ChannelSpec]) -> Array2<f64> {
    Array2::from_shape_fn(data.dim(), |(row, col)| {
        let range = channels
            .get(col)
            .map(|spec| spec.range)
            .unwrap_or(AnalogRange::Bipolar10V);
        counts_to_volts_in(range, data[(row, col)])
    })
}
