//! Bring-up orchestrator: takes the tuner from closed to polling.

mod cancel;

pub use cancel::CancellationToken;

use crate::{
    apply_sequence, compute_calibration_factor, open_pair, start_pair, AppConfig,
    AudioStreamPair, ControlSequence, MixerTransport, Result, SignalLevel, StreamTransport,
    TunerCapabilities, TunerError, TunerHandle, TunerState, TunerTransport,
};

/// Phases of a bring-up. Transitions only move forward; any failure lands
/// in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BringUpState {
    Closed,
    Opened,
    CapabilitiesKnown,
    Calibrated,
    ModeSet,
    FrequencySet,
    VolumeSet,
    Unmuted,
    RouteApplied,
    StreamsRunning,
    Polling,
    Failed,
}

/// Outcome of a bring-up that reached polling and was then cancelled.
#[derive(Debug, Clone)]
pub struct PollReport {
    pub capabilities: TunerCapabilities,
    pub tuner: TunerState,
    pub probes: u64,
    pub failed_probes: u64,
    pub last_signal: Option<SignalLevel>,
}

pub struct BringUp<T, M, S>
where
    T: TunerTransport,
    M: MixerTransport,
    S: StreamTransport,
{
    config: AppConfig,
    route: Option<ControlSequence>,
    tuner: T,
    mixer: M,
    streams: S,
    state: BringUpState,
    history: Vec<BringUpState>,
    running_streams: Option<AudioStreamPair<S::Stream>>,
}

impl<T, M, S> BringUp<T, M, S>
where
    T: TunerTransport,
    M: MixerTransport,
    S: StreamTransport,
{
    /// Creates an orchestrator using the routing profile named in `config`.
    pub fn new(config: AppConfig, tuner: T, mixer: M, streams: S) -> Self {
        let route = config.audio.route.sequence();
        Self {
            config,
            route,
            tuner,
            mixer,
            streams,
            state: BringUpState::Closed,
            history: vec![BringUpState::Closed],
            running_streams: None,
        }
    }

    /// Replaces the routing sequence; `None` skips the audio phases.
    pub fn with_route(mut self, route: Option<ControlSequence>) -> Self {
        self.route = route;
        self
    }

    pub fn state(&self) -> BringUpState {
        self.state
    }

    /// Every state entered so far, starting with `Closed`.
    pub fn history(&self) -> &[BringUpState] {
        &self.history
    }

    /// Runs the bring-up, then polls signal strength until `cancel` fires.
    ///
    /// The tuner is closed before returning whenever it was opened; a failed
    /// open leaves nothing to close.
    pub fn run(&mut self, cancel: &CancellationToken) -> Result<PollReport> {
        let path = self.config.tuner.device.clone();
        tracing::info!(%path, "opening tuner device");

        let mut handle = match TunerHandle::open(&mut self.tuner, &path) {
            Ok(handle) => handle,
            Err(err) => {
                self.fail(&err);
                return Err(err);
            }
        };
        self.advance(BringUpState::Opened);

        match self.drive(&mut handle, cancel) {
            Ok(report) => {
                handle.close()?;
                Ok(report)
            }
            Err(err) => {
                self.fail(&err);
                if let Err(close_err) = handle.close() {
                    tracing::warn!(%close_err, "closing tuner after failure");
                }
                Err(err)
            }
        }
    }

    fn drive(
        &mut self,
        handle: &mut TunerHandle<T::Device>,
        cancel: &CancellationToken,
    ) -> Result<PollReport> {
        let tuner = self.config.tuner.clone();

        let caps = handle.capabilities()?;
        tracing::info!(
            driver = %caps.driver,
            card = %caps.card,
            range_low = caps.range_low,
            range_high = caps.range_high,
            band_khz = ?caps.band_khz(),
            "tuner capabilities read"
        );
        self.advance(BringUpState::CapabilitiesKnown);

        let factor = compute_calibration_factor(&caps)?;
        tracing::info!(factor = factor.value(), "calibration factor derived");
        self.advance(BringUpState::Calibrated);

        handle.set_mode(tuner.mode)?;
        self.advance(BringUpState::ModeSet);

        handle.set_frequency(tuner.frequency_khz, &factor)?;
        tracing::info!(
            khz = tuner.frequency_khz,
            native = handle.state().native_frequency,
            "frequency set"
        );
        self.advance(BringUpState::FrequencySet);

        handle.set_volume(tuner.volume)?;
        self.advance(BringUpState::VolumeSet);

        handle.set_mute(false)?;
        self.advance(BringUpState::Unmuted);

        if let Some(route) = self.route.clone() {
            let applied = apply_sequence(&mut self.mixer, &route)?;
            tracing::info!(route = %route.name, applied, "audio route applied");
            self.advance(BringUpState::RouteApplied);

            let audio = &self.config.audio;
            let mut pair = open_pair(
                &mut self.streams,
                &audio.capture,
                &audio.stream,
                &audio.playback,
                &audio.stream,
            )?;
            start_pair(&mut pair)?;
            self.running_streams = Some(pair);
            self.advance(BringUpState::StreamsRunning);
        }

        self.advance(BringUpState::Polling);
        let mut report = PollReport {
            capabilities: caps,
            tuner: handle.state().clone(),
            probes: 0,
            failed_probes: 0,
            last_signal: None,
        };
        self.poll(handle, cancel, &mut report);
        Ok(report)
    }

    fn poll(
        &self,
        handle: &mut TunerHandle<T::Device>,
        cancel: &CancellationToken,
        report: &mut PollReport,
    ) {
        let interval = self.config.tuner.poll_interval();
        while !cancel.is_cancelled() {
            match handle.signal_strength() {
                Ok(level) => {
                    report.probes += 1;
                    report.last_signal = Some(level);
                    tracing::info!(
                        signal = level.raw(),
                        percent = level.percent(),
                        "signal strength"
                    );
                }
                Err(err) => {
                    report.failed_probes += 1;
                    tracing::warn!(%err, "signal strength probe failed");
                }
            }

            if cancel.wait_timeout(interval) {
                break;
            }
        }
        tracing::info!(probes = report.probes, "polling stopped");
    }

    fn advance(&mut self, next: BringUpState) {
        tracing::debug!(from = ?self.state, to = ?next, "bring-up transition");
        self.state = next;
        self.history.push(next);
    }

    fn fail(&mut self, err: &TunerError) {
        tracing::error!(
            phase = ?self.state,
            control = err.failed_control().unwrap_or("-"),
            %err,
            "bring-up failed"
        );
        self.state = BringUpState::Failed;
        self.history.push(BringUpState::Failed);
    }
}

impl<T, M, S> std::fmt::Debug for BringUp<T, M, S>
where
    T: TunerTransport,
    M: MixerTransport,
    S: StreamTransport,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BringUp")
            .field("state", &self.state)
            .field("route", &self.route.as_ref().map(|route| &route.name))
            .field("streams_running", &self.running_streams.is_some())
            .finish()
    }
}
