//! Capture/playback stream pair carrying the tuner audio to the sink.

use std::io;

use serde::{Deserialize, Serialize};

use crate::{Result, TunerError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamDirection {
    Capture,
    Playback,
}

impl StreamDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Capture => "capture",
            Self::Playback => "playback",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleFormat {
    S16Le,
    S24Le,
    S32Le,
}

impl SampleFormat {
    pub fn bits(self) -> u32 {
        match self {
            Self::S16Le => 16,
            Self::S24Le | Self::S32Le => 32,
        }
    }
}

/// Hardware endpoint a stream binds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamEndpoint {
    pub card: u32,
    pub device: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub channels: u32,
    pub rate: u32,
    pub format: SampleFormat,
    pub period_size: u32,
    pub period_count: u32,
    /// Zero lets the transport pick its default.
    pub start_threshold: u32,
    pub stop_threshold: u32,
    pub avail_min: u32,
}

/// Largest frame count any threshold or buffer may take.
pub const MAX_FRAMES: u32 = i32::MAX as u32;

impl StreamConfig {
    /// Total ring buffer size, `None` when the periods overflow a `u32`.
    pub fn buffer_frames(&self) -> Option<u32> {
        self.period_size.checked_mul(self.period_count)
    }

    /// Checks the geometry before any device sees it.
    pub fn validate(&self) -> std::result::Result<(), String> {
        for (field, value) in [
            ("channels", self.channels),
            ("rate", self.rate),
            ("period_size", self.period_size),
            ("period_count", self.period_count),
        ] {
            if value == 0 {
                return Err(format!("{field} must be non-zero"));
            }
        }

        let buffer = self
            .buffer_frames()
            .filter(|frames| *frames <= MAX_FRAMES)
            .ok_or_else(|| {
                format!(
                    "{} periods of {} frames exceed {MAX_FRAMES} frames",
                    self.period_count, self.period_size
                )
            })?;
        if self.format.bits().checked_mul(self.channels).is_none() {
            return Err(format!("{} channels is too many", self.channels));
        }
        for (field, value) in [
            ("start_threshold", self.start_threshold),
            ("stop_threshold", self.stop_threshold),
            ("avail_min", self.avail_min),
        ] {
            if value > MAX_FRAMES {
                return Err(format!("{field} {value} exceeds {MAX_FRAMES} frames"));
            }
        }
        if self.avail_min > buffer {
            return Err(format!(
                "avail_min {} exceeds the {buffer} frame buffer",
                self.avail_min
            ));
        }
        Ok(())
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            channels: 2,
            rate: 48_000,
            format: SampleFormat::S16Le,
            period_size: 256,
            period_count: 4,
            start_threshold: 0,
            stop_threshold: i32::MAX as u32,
            avail_min: 0,
        }
    }
}

/// An opened stream. A stream can be open but not ready when the transport
/// refused its parameters.
pub trait AudioStream {
    fn is_ready(&self) -> bool;
    /// Why the stream is not ready, if known.
    fn error(&self) -> Option<&str>;
    fn start(&mut self) -> io::Result<()>;
}

/// Streaming audio transport.
pub trait StreamTransport {
    type Stream: AudioStream;

    fn open(
        &mut self,
        endpoint: &StreamEndpoint,
        direction: StreamDirection,
        config: &StreamConfig,
    ) -> io::Result<Self::Stream>;
}

/// Matched capture and playback streams.
#[derive(Debug)]
pub struct AudioStreamPair<S> {
    capture: S,
    playback: S,
}

impl<S: AudioStream> AudioStreamPair<S> {
    pub fn new(capture: S, playback: S) -> Self {
        Self { capture, playback }
    }

    pub fn is_ready(&self) -> bool {
        self.capture.is_ready() && self.playback.is_ready()
    }
}

/// Opens the playback and capture streams. Fails unless both end up ready.
pub fn open_pair<T: StreamTransport>(
    transport: &mut T,
    capture: &StreamEndpoint,
    capture_config: &StreamConfig,
    playback: &StreamEndpoint,
    playback_config: &StreamConfig,
) -> Result<AudioStreamPair<T::Stream>> {
    if capture_config.rate != playback_config.rate
        || capture_config.format != playback_config.format
    {
        return Err(TunerError::StreamOpen {
            direction: StreamDirection::Capture.as_str(),
            reason: format!(
                "capture {} Hz {:?} does not match playback {} Hz {:?}",
                capture_config.rate,
                capture_config.format,
                playback_config.rate,
                playback_config.format
            ),
        });
    }

    let playback = open_ready(transport, playback, StreamDirection::Playback, playback_config)?;
    let capture = open_ready(transport, capture, StreamDirection::Capture, capture_config)?;

    Ok(AudioStreamPair::new(capture, playback))
}

fn open_ready<T: StreamTransport>(
    transport: &mut T,
    endpoint: &StreamEndpoint,
    direction: StreamDirection,
    config: &StreamConfig,
) -> Result<T::Stream> {
    config.validate().map_err(|reason| TunerError::StreamOpen {
        direction: direction.as_str(),
        reason,
    })?;

    let stream = transport
        .open(endpoint, direction, config)
        .map_err(|err| TunerError::StreamOpen {
            direction: direction.as_str(),
            reason: err.to_string(),
        })?;

    if !stream.is_ready() {
        return Err(TunerError::StreamOpen {
            direction: direction.as_str(),
            reason: stream.error().unwrap_or("stream not ready").to_string(),
        });
    }

    tracing::info!(
        direction = direction.as_str(),
        card = endpoint.card,
        device = endpoint.device,
        "stream opened"
    );
    Ok(stream)
}

/// Starts playback then capture. Neither is started unless both are ready.
pub fn start_pair<S: AudioStream>(pair: &mut AudioStreamPair<S>) -> Result<()> {
    for (direction, stream) in [
        (StreamDirection::Playback, &pair.playback),
        (StreamDirection::Capture, &pair.capture),
    ] {
        if !stream.is_ready() {
            return Err(TunerError::StreamStart {
                direction: direction.as_str(),
                reason: stream.error().unwrap_or("stream not ready").to_string(),
            });
        }
    }

    for (direction, stream) in [
        (StreamDirection::Playback, &mut pair.playback),
        (StreamDirection::Capture, &mut pair.capture),
    ] {
        stream.start().map_err(|err| TunerError::StreamStart {
            direction: direction.as_str(),
            reason: err.to_string(),
        })?;
        tracing::info!(direction = direction.as_str(), "stream started");
    }

    Ok(())
}
