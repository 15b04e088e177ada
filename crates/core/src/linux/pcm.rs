//! ALSA PCM streams on `hw:<card>,<device>`.

use std::io;

use alsa::{
    pcm::{Access, Format, Frames, HwParams, PCM},
    Direction, ValueOr,
};

use super::alsa_error;
use crate::{
    AudioStream, SampleFormat, StreamConfig, StreamDirection, StreamEndpoint, StreamTransport,
};

/// Software thresholds in frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Thresholds {
    avail_min: Frames,
    start: Frames,
    stop: Frames,
}

impl Thresholds {
    /// Zero fields fall back to one period, half the buffer and the whole
    /// buffer respectively.
    fn from_config(config: &StreamConfig) -> io::Result<Self> {
        let buffer = config.buffer_frames().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "buffer size overflows")
        })?;
        Ok(Self {
            avail_min: frames(or_default(config.avail_min, config.period_size))?,
            start: frames(or_default(config.start_threshold, buffer / 2))?,
            stop: frames(or_default(config.stop_threshold, buffer))?,
        })
    }
}

fn or_default(value: u32, fallback: u32) -> u32 {
    if value == 0 {
        fallback
    } else {
        value
    }
}

fn frames(value: u32) -> io::Result<Frames> {
    Frames::try_from(value).map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))
}

fn alsa_format(format: SampleFormat) -> Format {
    match format {
        SampleFormat::S16Le => Format::S16LE,
        SampleFormat::S24Le => Format::S24LE,
        SampleFormat::S32Le => Format::S32LE,
    }
}

fn device_name(endpoint: &StreamEndpoint) -> String {
    format!("hw:{},{}", endpoint.card, endpoint.device)
}

#[derive(Debug, Default)]
pub struct PcmTransport;

impl StreamTransport for PcmTransport {
    type Stream = PcmStream;

    fn open(
        &mut self,
        endpoint: &StreamEndpoint,
        direction: StreamDirection,
        config: &StreamConfig,
    ) -> io::Result<PcmStream> {
        let name = device_name(endpoint);
        let alsa_direction = match direction {
            StreamDirection::Capture => Direction::Capture,
            StreamDirection::Playback => Direction::Playback,
        };
        let pcm = PCM::new(&name, alsa_direction, false).map_err(|err| alsa_error(&name, err))?;

        let error = configure(&pcm, config)
            .err()
            .map(|err| format!("{name}: {err}"));
        Ok(PcmStream { name, pcm, error })
    }
}

fn configure(pcm: &PCM, config: &StreamConfig) -> io::Result<()> {
    let period = frames(config.period_size)?;
    let thresholds = Thresholds::from_config(config)?;
    apply_hw_params(pcm, config, period).map_err(|err| alsa_error("hw params", err))?;
    apply_sw_params(pcm, thresholds).map_err(|err| alsa_error("sw params", err))
}

fn apply_hw_params(pcm: &PCM, config: &StreamConfig, period: Frames) -> alsa::Result<()> {
    let hw = HwParams::any(pcm)?;
    hw.set_access(Access::RWInterleaved)?;
    hw.set_format(alsa_format(config.format))?;
    hw.set_channels(config.channels)?;
    hw.set_rate(config.rate, ValueOr::Nearest)?;
    hw.set_period_size(period, ValueOr::Nearest)?;
    hw.set_periods(config.period_count, ValueOr::Nearest)?;
    pcm.hw_params(&hw)
}

fn apply_sw_params(pcm: &PCM, thresholds: Thresholds) -> alsa::Result<()> {
    let sw = pcm.sw_params_current()?;
    sw.set_avail_min(thresholds.avail_min)?;
    sw.set_start_threshold(thresholds.start)?;
    sw.set_stop_threshold(thresholds.stop)?;
    pcm.sw_params(&sw)
}

/// A configured PCM. Not ready when the driver refused the parameters.
pub struct PcmStream {
    name: String,
    pcm: PCM,
    error: Option<String>,
}

impl std::fmt::Debug for PcmStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PcmStream")
            .field("name", &self.name)
            .field("error", &self.error)
            .finish()
    }
}

impl AudioStream for PcmStream {
    fn is_ready(&self) -> bool {
        self.error.is_none()
    }

    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn start(&mut self) -> io::Result<()> {
        self.pcm
            .prepare()
            .and_then(|_| self.pcm.start())
            .map_err(|err| alsa_error(&self.name, err))
    }
}
