use serde::{Deserialize, Serialize};

use crate::{Result, TunerDevice, TunerError};

/// Caller-facing frequencies are expressed in kHz.
const REFERENCE_UNIT_HZ: f64 = 1_000.0;

/// Immutable snapshot of what the opened tuner reports about itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TunerCapabilities {
    pub driver: String,
    pub card: String,
    /// Lowest receivable frequency in device-native units.
    pub range_low: u32,
    /// Highest receivable frequency in device-native units.
    pub range_high: u32,
    /// One native unit equals `unit_multiplier / unit_divisor` Hz.
    pub unit_multiplier: u32,
    pub unit_divisor: u32,
    pub stereo: bool,
    pub hw_seek: bool,
}

impl TunerCapabilities {
    /// Size of one native tuning step in Hz.
    pub fn native_unit_hz(&self) -> f64 {
        self.unit_multiplier as f64 / self.unit_divisor as f64
    }

    /// Receivable band converted to kHz, `None` when the unit is degenerate.
    pub fn band_khz(&self) -> Option<(f64, f64)> {
        let unit = self.native_unit_hz();
        if !unit.is_finite() || unit <= 0.0 {
            return None;
        }
        Some((
            self.range_low as f64 * unit / REFERENCE_UNIT_HZ,
            self.range_high as f64 * unit / REFERENCE_UNIT_HZ,
        ))
    }
}

/// Scalar converting kHz into the tuner's native units, bound to the native
/// band it was derived from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationFactor {
    factor: f64,
    native_low: u32,
    native_high: u32,
}

impl CalibrationFactor {
    pub fn value(&self) -> f64 {
        self.factor
    }

    /// Converts a kHz frequency to native units, rejecting values outside the
    /// tuner's band.
    pub fn to_native(&self, khz: u32) -> Result<u32> {
        let native = (khz as f64 * self.factor).round() as u64;
        if native < self.native_low as u64 || native > self.native_high as u64 {
            return Err(TunerError::OutOfRange {
                requested_khz: khz,
                native,
                low: self.native_low,
                high: self.native_high,
            });
        }
        Ok(native as u32)
    }

    pub fn to_khz(&self, native: u32) -> u32 {
        (native as f64 / self.factor).round() as u32
    }
}

/// Queries the radio capability and tuner description of an opened device.
pub fn query_capabilities<D: TunerDevice>(device: &mut D) -> Result<TunerCapabilities> {
    let capability = device
        .query_capability()
        .map_err(|err| TunerError::query("querycap", err))?;
    if !capability.is_radio_tuner {
        return Err(TunerError::query(
            "querycap",
            format!("`{}` is not a radio tuner", capability.card),
        ));
    }

    let status = device
        .tuner_status()
        .map_err(|err| TunerError::query("g_tuner", err))?;

    Ok(TunerCapabilities {
        driver: capability.driver,
        card: capability.card,
        range_low: status.range_low,
        range_high: status.range_high,
        unit_multiplier: status.unit_multiplier,
        unit_divisor: status.unit_divisor,
        stereo: status.stereo_capable,
        hw_seek: capability.hw_seek,
    })
}

/// Derives the kHz-to-native factor. Bring-up must not continue when this
/// fails, since every later frequency write would land on the wrong channel.
pub fn compute_calibration_factor(caps: &TunerCapabilities) -> Result<CalibrationFactor> {
    if caps.range_low == 0 || caps.range_high < caps.range_low {
        return Err(TunerError::Calibration(format!(
            "degenerate band {}..={}",
            caps.range_low, caps.range_high
        )));
    }
    if caps.unit_multiplier == 0 || caps.unit_divisor == 0 {
        return Err(TunerError::Calibration(format!(
            "invalid native unit {}/{} Hz",
            caps.unit_multiplier, caps.unit_divisor
        )));
    }

    let factor = REFERENCE_UNIT_HZ * caps.unit_divisor as f64 / caps.unit_multiplier as f64;
    if !factor.is_finite() || factor <= 0.0 {
        return Err(TunerError::Calibration(format!("non-positive factor {factor}")));
    }

    Ok(CalibrationFactor {
        factor,
        native_low: caps.range_low,
        native_high: caps.range_high,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(low: u32, high: u32, multiplier: u32, divisor: u32) -> TunerCapabilities {
        TunerCapabilities {
            driver: "fake".to_string(),
            card: "fake radio".to_string(),
            range_low: low,
            range_high: high,
            unit_multiplier: multiplier,
            unit_divisor: divisor,
            stereo: true,
            hw_seek: false,
        }
    }

    #[test]
    fn khz_native_unit_gives_unit_factor() {
        let factor = compute_calibration_factor(&caps(87_500, 108_000, 1_000, 1)).unwrap();
        assert_eq!(factor.value(), 1.0);
        assert_eq!(factor.to_native(104_400).unwrap(), 104_400);
    }

    #[test]
    fn low_resolution_tuner_uses_sixteen_steps_per_khz() {
        // 62.5 Hz units: 87.5 MHz .. 108 MHz.
        let factor = compute_calibration_factor(&caps(1_400_000, 1_728_000, 125, 2)).unwrap();
        assert_eq!(factor.value(), 16.0);
        assert_eq!(factor.to_native(104_400).unwrap(), 1_670_400);
        assert_eq!(factor.to_khz(1_670_400), 104_400);
    }

    #[test]
    fn valid_bands_always_give_positive_finite_factor() {
        for (low, high) in [(1, 1), (1, u32::MAX), (87_500, 108_000), (76_000, 90_000)] {
            for (multiplier, divisor) in [(1, 1), (125, 2), (62_500, 1), (1_000, 1)] {
                let factor = compute_calibration_factor(&caps(low, high, multiplier, divisor))
                    .expect("valid capabilities calibrate");
                assert!(factor.value().is_finite());
                assert!(factor.value() > 0.0);
            }
        }
    }

    #[test]
    fn degenerate_band_fails_calibration() {
        let err = compute_calibration_factor(&caps(0, 0, 1_000, 1)).unwrap_err();
        assert!(matches!(err, TunerError::Calibration(_)));

        let err = compute_calibration_factor(&caps(108_000, 87_500, 1_000, 1)).unwrap_err();
        assert!(matches!(err, TunerError::Calibration(_)));
    }

    #[test]
    fn zero_unit_fails_calibration() {
        let err = compute_calibration_factor(&caps(87_500, 108_000, 0, 1)).unwrap_err();
        assert!(matches!(err, TunerError::Calibration(_)));
    }

    #[test]
    fn out_of_band_frequency_is_rejected() {
        let factor = compute_calibration_factor(&caps(87_500, 108_000, 1_000, 1)).unwrap();
        let err = factor.to_native(120_000).unwrap_err();
        assert!(matches!(
            err,
            TunerError::OutOfRange {
                requested_khz: 120_000,
                ..
            }
        ));
    }

    #[test]
    fn band_is_reported_in_khz() {
        let (low, high) = caps(1_400_000, 1_728_000, 125, 2).band_khz().unwrap();
        assert_eq!(low, 87_500.0);
        assert_eq!(high, 108_000.0);
        assert!(caps(1, 2, 0, 1).band_khz().is_none());
    }
}
