//! Tuner handle ownership and the state controller operations.

mod calibration;

use std::io;

use serde::{Deserialize, Serialize};

use crate::{Result, TunerError};

pub use calibration::{
    compute_calibration_factor, query_capabilities, CalibrationFactor, TunerCapabilities,
};

/// Stereo/mono reception mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StereoMode {
    Mono,
    Stereo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekDirection {
    Up,
    Down,
}

/// Device controls addressed by the state controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TunerControl {
    Volume,
    Mute,
}

/// Identity and feature flags reported by the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceCapability {
    pub driver: String,
    pub card: String,
    pub is_radio_tuner: bool,
    pub hw_seek: bool,
}

/// Tuner description and live reception status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunerStatus {
    pub range_low: u32,
    pub range_high: u32,
    pub unit_multiplier: u32,
    pub unit_divisor: u32,
    pub stereo_capable: bool,
    pub receiving_stereo: bool,
    pub mode: StereoMode,
    pub signal: u16,
}

/// Device control transport. Each call is one blocking round trip.
pub trait TunerDevice {
    fn query_capability(&mut self) -> io::Result<DeviceCapability>;
    fn tuner_status(&mut self) -> io::Result<TunerStatus>;
    fn set_audio_mode(&mut self, mode: StereoMode) -> io::Result<()>;
    fn set_frequency(&mut self, native: u32) -> io::Result<()>;
    fn frequency(&mut self) -> io::Result<u32>;
    fn set_control(&mut self, control: TunerControl, value: i32) -> io::Result<()>;
    fn seek(&mut self, direction: SeekDirection, wrap_around: bool) -> io::Result<()>;
    fn close(&mut self) -> io::Result<()>;
}

/// Opens tuner devices by path.
pub trait TunerTransport {
    type Device: TunerDevice;

    fn open(&mut self, path: &str) -> io::Result<Self::Device>;
}

/// Raw 16-bit signal strength as reported by the tuner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SignalLevel(pub u16);

impl SignalLevel {
    pub fn raw(self) -> u16 {
        self.0
    }

    pub fn percent(self) -> u8 {
        (self.0 as u32 * 100 / u16::MAX as u32) as u8
    }
}

/// Last successfully applied tuner settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunerState {
    pub frequency_khz: u32,
    pub native_frequency: u32,
    pub mode: StereoMode,
    pub volume: u8,
    pub muted: bool,
}

impl Default for TunerState {
    fn default() -> Self {
        Self {
            frequency_khz: 0,
            native_frequency: 0,
            mode: StereoMode::Mono,
            volume: 0,
            muted: true,
        }
    }
}

/// Exclusively owned, opened tuner device.
///
/// Dropping an unclosed handle closes the device; [`TunerHandle::close`]
/// does the same but reports the outcome.
pub struct TunerHandle<D: TunerDevice> {
    device: D,
    path: String,
    state: TunerState,
    closed: bool,
}

impl<D: TunerDevice> TunerHandle<D> {
    /// Opens the device at `path`. A failed open leaves nothing to close.
    pub fn open<T>(transport: &mut T, path: &str) -> Result<Self>
    where
        T: TunerTransport<Device = D>,
    {
        let device = transport.open(path).map_err(|source| TunerError::DeviceOpen {
            path: path.to_string(),
            source,
        })?;

        Ok(Self {
            device,
            path: path.to_string(),
            state: TunerState::default(),
            closed: false,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn state(&self) -> &TunerState {
        &self.state
    }

    pub fn capabilities(&mut self) -> Result<TunerCapabilities> {
        query_capabilities(&mut self.device)
    }

    pub fn set_mode(&mut self, mode: StereoMode) -> Result<()> {
        self.device
            .set_audio_mode(mode)
            .map_err(|err| TunerError::control("s_tuner", err))?;
        self.state.mode = mode;
        Ok(())
    }

    /// Tunes to `khz`, converted through `factor` into native units.
    pub fn set_frequency(&mut self, khz: u32, factor: &CalibrationFactor) -> Result<()> {
        let native = factor.to_native(khz)?;
        self.device
            .set_frequency(native)
            .map_err(|err| TunerError::control("s_frequency", err))?;
        self.state.frequency_khz = khz;
        self.state.native_frequency = native;
        Ok(())
    }

    /// Reads back the tuned frequency in kHz.
    pub fn frequency(&mut self, factor: &CalibrationFactor) -> Result<u32> {
        let native = self
            .device
            .frequency()
            .map_err(|err| TunerError::query("g_frequency", err))?;
        Ok(factor.to_khz(native))
    }

    pub fn set_volume(&mut self, level: u8) -> Result<()> {
        self.device
            .set_control(TunerControl::Volume, level as i32)
            .map_err(|err| TunerError::control("s_ctrl volume", err))?;
        self.state.volume = level;
        Ok(())
    }

    pub fn set_mute(&mut self, muted: bool) -> Result<()> {
        self.device
            .set_control(TunerControl::Mute, muted as i32)
            .map_err(|err| TunerError::control("s_ctrl mute", err))?;
        self.state.muted = muted;
        Ok(())
    }

    pub fn signal_strength(&mut self) -> Result<SignalLevel> {
        let status = self
            .device
            .tuner_status()
            .map_err(|err| TunerError::query("g_tuner", err))?;
        Ok(SignalLevel(status.signal))
    }

    pub fn is_receiving_stereo(&mut self) -> Result<bool> {
        let status = self
            .device
            .tuner_status()
            .map_err(|err| TunerError::query("g_tuner", err))?;
        Ok(status.receiving_stereo)
    }

    /// Runs a hardware seek and returns the frequency the tuner settled on.
    pub fn seek(
        &mut self,
        direction: SeekDirection,
        wrap_around: bool,
        caps: &TunerCapabilities,
        factor: &CalibrationFactor,
    ) -> Result<u32> {
        if !caps.hw_seek {
            return Err(TunerError::control(
                "s_hw_freq_seek",
                "hardware seek not supported",
            ));
        }
        self.device
            .seek(direction, wrap_around)
            .map_err(|err| TunerError::control("s_hw_freq_seek", err))?;

        let native = self
            .device
            .frequency()
            .map_err(|err| TunerError::query("g_frequency", err))?;
        let khz = factor.to_khz(native);
        self.state.frequency_khz = khz;
        self.state.native_frequency = native;
        Ok(khz)
    }

    pub fn close(mut self) -> Result<()> {
        self.closed = true;
        self.device.close()?;
        tracing::info!(path = %self.path, "tuner device closed");
        Ok(())
    }
}

impl<D: TunerDevice> Drop for TunerHandle<D> {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(err) = self.device.close() {
                tracing::warn!(path = %self.path, %err, "failed to close tuner device");
            }
        }
    }
}

impl<D: TunerDevice> std::fmt::Debug for TunerHandle<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TunerHandle")
            .field("path", &self.path)
            .field("state", &self.state)
            .field("closed", &self.closed)
            .finish()
    }
}
