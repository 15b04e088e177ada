//! In-memory transports that record what the core asks of them.

use std::{
    cell::RefCell,
    collections::{HashMap, HashSet},
    io,
    rc::Rc,
};

use crate::{
    AudioStream, CancellationToken, ControlKind, ControlSequence, ControlValue,
    DeviceCapability, MixerTransport, ResolvedControl, SeekDirection, StereoMode, StreamConfig,
    StreamDirection, StreamEndpoint, StreamTransport, TunerControl, TunerDevice, TunerStatus,
    TunerTransport,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TunerCall {
    QueryCapability,
    TunerStatus,
    SetMode(StereoMode),
    SetFrequency(u32),
    Frequency,
    SetVolume(i32),
    SetMute(bool),
    Seek(SeekDirection),
    Close,
}

#[derive(Debug, Default)]
struct TunerRecord {
    calls: Vec<TunerCall>,
    native_frequency: u32,
    status_calls: usize,
}

/// Shared call log of every tuner opened through one [`FakeTransport`].
#[derive(Debug, Clone, Default)]
pub struct TunerLog(Rc<RefCell<TunerRecord>>);

impl TunerLog {
    pub fn calls(&self) -> Vec<TunerCall> {
        self.0.borrow().calls.clone()
    }

    pub fn native_frequency(&self) -> u32 {
        self.0.borrow().native_frequency
    }

    pub fn close_count(&self) -> usize {
        self.0
            .borrow()
            .calls
            .iter()
            .filter(|call| **call == TunerCall::Close)
            .count()
    }

    fn record(&self, call: TunerCall) {
        self.0.borrow_mut().calls.push(call);
    }
}

#[derive(Debug, Clone)]
pub struct FakeTransport {
    pub log: TunerLog,
    pub fail_open: bool,
    /// Operation name that fails: querycap, g_tuner, mode, frequency,
    /// volume, mute, seek or close.
    pub fail_on: Option<&'static str>,
    /// 1-based `tuner_status` call numbers that fail.
    pub failing_status_calls: Vec<usize>,
    pub hw_seek: bool,
    pub range: (u32, u32),
    pub unit: (u32, u32),
    pub signal: u16,
    cancel_at_status_call: Option<(usize, CancellationToken)>,
}

impl Default for FakeTransport {
    fn default() -> Self {
        Self {
            log: TunerLog::default(),
            fail_open: false,
            fail_on: None,
            failing_status_calls: Vec::new(),
            hw_seek: false,
            range: (87_500, 108_000),
            unit: (1_000, 1),
            signal: 32_768,
            cancel_at_status_call: None,
        }
    }
}

impl FakeTransport {
    /// Tuner counting in 62.5 Hz steps.
    pub fn low_resolution() -> Self {
        Self {
            range: (1_400_000, 1_728_000),
            unit: (125, 2),
            ..Self::default()
        }
    }

    /// Cancels `token` once `probes` signal reads have followed the
    /// capability query.
    pub fn cancel_after_probes(mut self, probes: usize, token: &CancellationToken) -> Self {
        self.cancel_at_status_call = Some((probes + 1, token.clone()));
        self
    }
}

impl TunerTransport for FakeTransport {
    type Device = FakeTuner;

    fn open(&mut self, path: &str) -> io::Result<FakeTuner> {
        if self.fail_open {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{path}: no such device"),
            ));
        }
        Ok(FakeTuner {
            settings: self.clone(),
        })
    }
}

#[derive(Debug)]
pub struct FakeTuner {
    settings: FakeTransport,
}

impl FakeTuner {
    fn check(&self, operation: &str) -> io::Result<()> {
        if self.settings.fail_on == Some(operation) {
            return Err(io::Error::other(format!("{operation} rejected")));
        }
        Ok(())
    }
}

impl TunerDevice for FakeTuner {
    fn query_capability(&mut self) -> io::Result<DeviceCapability> {
        self.settings.log.record(TunerCall::QueryCapability);
        self.check("querycap")?;
        Ok(DeviceCapability {
            driver: "fake".to_string(),
            card: "Fake FM Radio".to_string(),
            is_radio_tuner: true,
            hw_seek: self.settings.hw_seek,
        })
    }

    fn tuner_status(&mut self) -> io::Result<TunerStatus> {
        self.settings.log.record(TunerCall::TunerStatus);
        let call = {
            let mut record = self.settings.log.0.borrow_mut();
            record.status_calls += 1;
            record.status_calls
        };
        if let Some((at, token)) = &self.settings.cancel_at_status_call {
            if call >= *at {
                token.cancel();
            }
        }
        self.check("g_tuner")?;
        if self.settings.failing_status_calls.contains(&call) {
            return Err(io::Error::other("signal read failed"));
        }

        Ok(TunerStatus {
            range_low: self.settings.range.0,
            range_high: self.settings.range.1,
            unit_multiplier: self.settings.unit.0,
            unit_divisor: self.settings.unit.1,
            stereo_capable: true,
            receiving_stereo: true,
            mode: StereoMode::Stereo,
            signal: self.settings.signal,
        })
    }

    fn set_audio_mode(&mut self, mode: StereoMode) -> io::Result<()> {
        self.settings.log.record(TunerCall::SetMode(mode));
        self.check("mode")
    }

    fn set_frequency(&mut self, native: u32) -> io::Result<()> {
        self.settings.log.record(TunerCall::SetFrequency(native));
        self.check("frequency")?;
        self.settings.log.0.borrow_mut().native_frequency = native;
        Ok(())
    }

    fn frequency(&mut self) -> io::Result<u32> {
        self.settings.log.record(TunerCall::Frequency);
        self.check("frequency")?;
        Ok(self.settings.log.native_frequency())
    }

    fn set_control(&mut self, control: TunerControl, value: i32) -> io::Result<()> {
        match control {
            TunerControl::Volume => {
                self.settings.log.record(TunerCall::SetVolume(value));
                self.check("volume")
            }
            TunerControl::Mute => {
                self.settings.log.record(TunerCall::SetMute(value != 0));
                self.check("mute")
            }
        }
    }

    fn seek(&mut self, direction: SeekDirection, _wrap_around: bool) -> io::Result<()> {
        self.settings.log.record(TunerCall::Seek(direction));
        self.check("seek")?;
        // Next station 100 kHz away.
        let (multiplier, divisor) = self.settings.unit;
        let step = (100_000 * divisor as u64 / multiplier as u64) as u32;
        let mut record = self.settings.log.0.borrow_mut();
        record.native_frequency = match direction {
            SeekDirection::Up => record.native_frequency + step,
            SeekDirection::Down => record.native_frequency - step,
        };
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.settings.log.record(TunerCall::Close);
        self.check("close")
    }
}

#[derive(Debug, Default)]
struct MixerRecord {
    controls: HashMap<String, ControlKind>,
    rejecting: HashSet<String>,
    resolved: Vec<String>,
    written: Vec<(String, ControlValue)>,
}

/// Mixer with a fixed set of named controls.
#[derive(Debug, Clone, Default)]
pub struct FakeMixer {
    record: Rc<RefCell<MixerRecord>>,
    pub unavailable: bool,
}

impl FakeMixer {
    /// Mixer exposing every control of `sequence` with the matching kind.
    pub fn accepting(sequence: &ControlSequence) -> Self {
        let mixer = Self::default();
        for descriptor in &sequence.controls {
            mixer.insert(&descriptor.name, descriptor.kind());
        }
        mixer
    }

    pub fn insert(&self, name: &str, kind: ControlKind) {
        self.record
            .borrow_mut()
            .controls
            .insert(name.to_string(), kind);
    }

    pub fn remove(&self, name: &str) {
        self.record.borrow_mut().controls.remove(name);
    }

    pub fn reject(&self, name: &str) {
        self.record.borrow_mut().rejecting.insert(name.to_string());
    }

    pub fn written_names(&self) -> Vec<String> {
        self.record
            .borrow()
            .written
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn was_resolved(&self, name: &str) -> bool {
        self.record.borrow().resolved.iter().any(|n| n == name)
    }
}

impl MixerTransport for FakeMixer {
    fn resolve(&mut self, name: &str) -> io::Result<Option<ResolvedControl>> {
        if self.unavailable {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                "/dev/snd/controlC0 missing",
            ));
        }
        let mut record = self.record.borrow_mut();
        record.resolved.push(name.to_string());
        Ok(record
            .controls
            .get(name)
            .copied()
            .map(|kind| ResolvedControl {
                name: name.to_string(),
                kind,
                count: 1,
            }))
    }

    fn write(&mut self, control: &ResolvedControl, value: &ControlValue) -> io::Result<()> {
        let mut record = self.record.borrow_mut();
        if record.rejecting.contains(&control.name) {
            return Err(io::Error::from_raw_os_error(22));
        }
        record.written.push((control.name.clone(), value.clone()));
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Opened(StreamDirection),
    Started(StreamDirection),
}

#[derive(Debug, Clone, Default)]
pub struct StreamLog(Rc<RefCell<Vec<StreamEvent>>>);

impl StreamLog {
    pub fn events(&self) -> Vec<StreamEvent> {
        self.0.borrow().clone()
    }

    fn push(&self, event: StreamEvent) {
        self.0.borrow_mut().push(event);
    }
}

#[derive(Debug, Default)]
pub struct FakeStreams {
    pub log: StreamLog,
    pub fail_open: Option<StreamDirection>,
    pub not_ready: Option<StreamDirection>,
    pub fail_start: Option<StreamDirection>,
}

impl StreamTransport for FakeStreams {
    type Stream = FakeStream;

    fn open(
        &mut self,
        _endpoint: &StreamEndpoint,
        direction: StreamDirection,
        _config: &StreamConfig,
    ) -> io::Result<FakeStream> {
        if self.fail_open == Some(direction) {
            return Err(io::Error::new(io::ErrorKind::NotFound, "no such pcm"));
        }
        self.log.push(StreamEvent::Opened(direction));
        let mut stream = FakeStream::new(direction, self.not_ready != Some(direction), &self.log);
        stream.fail_start = self.fail_start == Some(direction);
        Ok(stream)
    }
}

#[derive(Debug)]
pub struct FakeStream {
    direction: StreamDirection,
    ready: bool,
    fail_start: bool,
    log: StreamLog,
}

impl FakeStream {
    pub fn new(direction: StreamDirection, ready: bool, log: &StreamLog) -> Self {
        Self {
            direction,
            ready,
            fail_start: false,
            log: log.clone(),
        }
    }
}

impl AudioStream for FakeStream {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn error(&self) -> Option<&str> {
        (!self.ready).then_some("hw params rejected")
    }

    fn start(&mut self) -> io::Result<()> {
        if self.fail_start {
            return Err(io::Error::from_raw_os_error(5));
        }
        self.log.push(StreamEvent::Started(self.direction));
        Ok(())
    }
}
