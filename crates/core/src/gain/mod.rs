use crate::{Result, TranscriberError};

pub const MIN_VOLUME_PERCENT: f64 = 0.0;
pub const MAX_VOLUME_PERCENT: f64 = 100.0;

/// Converts a linear volume percentage into decibels of gain.
///
/// `100` maps to exactly `0 dB` and `0` maps to negative infinity, which
/// sinks must treat as mute.
pub fn to_gain_db(volume_percent: f64) -> Result<f64> {
    if !(MIN_VOLUME_PERCENT..=MAX_VOLUME_PERCENT).contains(&volume_percent) {
        return Err(TranscriberError::OutOfRange {
            name: "volume",
            value: volume_percent,
            min: MIN_VOLUME_PERCENT,
            max: MAX_VOLUME_PERCENT,
        });
    }

    if volume_percent == MAX_VOLUME_PERCENT {
        return Ok(0.0);
    }

    Ok(20.0 * (volume_percent / MAX_VOLUME_PERCENT).log10())
}

/// True when a gain value means silence.
pub fn is_mute(gain_db: f64) -> bool {
    gain_db == f64::NEG_INFINITY
}
