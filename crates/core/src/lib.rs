//! Core library for bringing an FM tuner into an operating state.
//!
//! The crate sequences control-plane operations only. A tuner is opened and
//! calibrated through [`TunerHandle`], an ordered list of mixer writes builds
//! the audio route ([`apply_sequence`]), and a matched capture/playback
//! stream pair carries the demodulated audio to the sink
//! ([`open_pair`]/[`start_pair`]). [`BringUp`] drives all of it in order and
//! then polls signal strength until cancelled.

pub mod bringup;
pub mod config;
pub mod error;
#[cfg(target_os = "linux")]
pub mod linux;
pub mod route;
pub mod stream;
pub mod tuner;

#[cfg(test)]
mod testing;

pub use bringup::{BringUp, BringUpState, CancellationToken, PollReport};
pub use config::{AppConfig, AudioConfig, TunerConfig};
pub use error::{Result, TunerError};
pub use route::{
    apply_sequence, ControlKind, ControlSequence, ControlValue, MixerControlDescriptor,
    MixerTransport, ResolvedControl, RouteProfile,
};
pub use stream::{
    open_pair, start_pair, AudioStream, AudioStreamPair, SampleFormat, StreamConfig,
    StreamDirection, StreamEndpoint, StreamTransport,
};
pub use tuner::{
    compute_calibration_factor, query_capabilities, CalibrationFactor, DeviceCapability,
    SeekDirection, SignalLevel, StereoMode, TunerCapabilities, TunerControl, TunerDevice,
    TunerHandle, TunerState, TunerStatus, TunerTransport,
};
