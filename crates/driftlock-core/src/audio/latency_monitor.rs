//! Per-session latency monitor driving adaptive resampling
//!
//! Sits at the seam between the packet queue plus depacketizer
//! (upstream, observed) and the resampler plus frame reader
//! (downstream, pulled). Each `read()` refreshes end-to-end latency
//! from frame capture timestamps; each `update()` tick measures how
//! much audio is queued ahead of playback, verifies it against the
//! configured window, and advances the frequency estimator that keeps
//! long-run playback rate locked to the sender's clock.
//!
//! A false return from `update()` is the session teardown signal: the
//! monitor never recovers on its own.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::audio::frame::{Frame, FrameReader};
use crate::audio::freq_estimator::{FeProfile, FreqEstimator};
use crate::audio::resampler::Resampler;
use crate::audio::sample_spec::SampleSpec;
use crate::packet::{timestamp_diff, Depacketizer, PacketQueue, StreamTimestamp, StreamTimestampDelta};
use crate::util::rate_limiter::RateLimiter;
use crate::util::time::{unix_timestamp_ns, MILLISECOND};

/// Minimum interval between periodic latency reports.
const LOG_INTERVAL: Duration = Duration::from_secs(5);

fn timestamp_to_ms(sample_spec: &SampleSpec, timestamp: StreamTimestampDelta) -> f64 {
    sample_spec.stream_timestamp_to_ns(timestamp) as f64 / MILLISECOND as f64
}

/// Configuration rejected at monitor construction.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("target latency {target_ns}ns outside window [{min_ns}ns, {max_ns}ns]")]
    TargetOutOfWindow {
        target_ns: i64,
        min_ns: i64,
        max_ns: i64,
    },

    #[error("non-positive controller update interval {0}ns")]
    InvalidUpdateInterval(i64),

    #[error("invalid sample rates: input={input} output={output}")]
    InvalidSampleRates { input: u32, output: u32 },

    #[error("resampler rejected initial scaling factor 1.0")]
    InitialScalingRejected,
}

fn default_fe_enable() -> bool {
    true
}

fn default_fe_profile() -> FeProfile {
    FeProfile::Gradual
}

fn default_fe_update_interval() -> i64 {
    50 * MILLISECOND
}

fn default_min_latency() -> i64 {
    50 * MILLISECOND
}

fn default_max_latency() -> i64 {
    500 * MILLISECOND
}

fn default_max_scaling_delta() -> f32 {
    0.005
}

/// Latency monitor parameters. All durations are nanoseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatencyMonitorConfig {
    /// Whether the frequency estimator and resampler scaling are active.
    #[serde(default = "default_fe_enable")]
    pub fe_enable: bool,

    /// Gain/windowing profile of the frequency estimator.
    #[serde(default = "default_fe_profile")]
    pub fe_profile: FeProfile,

    /// Period between controller ticks, in stream time.
    #[serde(default = "default_fe_update_interval")]
    pub fe_update_interval: i64,

    /// Lower bound of the acceptable queue latency.
    #[serde(default = "default_min_latency")]
    pub min_latency: i64,

    /// Upper bound of the acceptable queue latency.
    #[serde(default = "default_max_latency")]
    pub max_latency: i64,

    /// Absolute bound on `|scaling - 1.0|` handed to the resampler.
    #[serde(default = "default_max_scaling_delta")]
    pub max_scaling_delta: f32,
}

impl Default for LatencyMonitorConfig {
    fn default() -> Self {
        Self {
            fe_enable: default_fe_enable(),
            fe_profile: default_fe_profile(),
            fe_update_interval: default_fe_update_interval(),
            min_latency: default_min_latency(),
            max_latency: default_max_latency(),
            max_scaling_delta: default_max_scaling_delta(),
        }
    }
}

/// Latencies reported to diagnostics, nanoseconds at the API boundary.
#[derive(Debug, Clone, Copy, Default)]
pub struct LatencyMonitorStats {
    /// Network-in-queue latency: queued audio ahead of playback.
    pub niq_latency: i64,
    /// End-to-end latency: sender capture to receiver consumption.
    pub e2e_latency: i64,
}

/// Per-session latency monitor.
///
/// Created per session and discarded with it; collaborators are
/// borrowed for the monitor's lifetime, the frequency estimator is
/// owned exclusively. Construction either yields a usable monitor or an
/// invalid one (`is_valid() == false`) for a rejected config; calling
/// any operation on an invalid monitor is a programmer error and
/// panics.
pub struct LatencyMonitor<'a> {
    frame_reader: &'a mut dyn FrameReader,
    queue: &'a dyn PacketQueue,
    depacketizer: &'a dyn Depacketizer,
    resampler: Option<&'a mut dyn Resampler>,

    fe: Option<FreqEstimator>,
    rate_limiter: RateLimiter,

    update_interval: StreamTimestamp,
    update_pos: StreamTimestamp,
    has_update_pos: bool,

    freq_coeff: f32,

    niq_latency: StreamTimestampDelta,
    e2e_latency: StreamTimestampDelta,
    has_niq_latency: bool,
    has_e2e_latency: bool,

    target_latency: StreamTimestampDelta,
    min_latency: StreamTimestampDelta,
    max_latency: StreamTimestampDelta,
    max_scaling_delta: f32,

    input_sample_spec: SampleSpec,
    output_sample_spec: SampleSpec,

    valid: bool,
}

impl<'a> LatencyMonitor<'a> {
    /// Build a monitor for one session.
    ///
    /// `target_latency` is the queue depth the controller steers
    /// towards, in nanoseconds. Timestamps and latencies are kept
    /// internally in samples at the input (sender) rate.
    ///
    /// # Panics
    /// Panics when `fe_enable` is set but no resampler is attached;
    /// that composition is a caller bug, not a configuration error.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        frame_reader: &'a mut dyn FrameReader,
        queue: &'a dyn PacketQueue,
        depacketizer: &'a dyn Depacketizer,
        resampler: Option<&'a mut dyn Resampler>,
        config: &LatencyMonitorConfig,
        target_latency: i64,
        input_sample_spec: SampleSpec,
        output_sample_spec: SampleSpec,
    ) -> Self {
        let mut monitor = Self {
            frame_reader,
            queue,
            depacketizer,
            resampler,
            fe: None,
            rate_limiter: RateLimiter::new(LOG_INTERVAL),
            update_interval: input_sample_spec
                .ns_to_stream_timestamp(config.fe_update_interval)
                .max(0) as StreamTimestamp,
            update_pos: 0,
            has_update_pos: false,
            freq_coeff: 0.0,
            niq_latency: 0,
            e2e_latency: 0,
            has_niq_latency: false,
            has_e2e_latency: false,
            target_latency: input_sample_spec.ns_to_stream_timestamp(target_latency),
            min_latency: input_sample_spec.ns_to_stream_timestamp(config.min_latency),
            max_latency: input_sample_spec.ns_to_stream_timestamp(config.max_latency),
            max_scaling_delta: config.max_scaling_delta,
            input_sample_spec,
            output_sample_spec,
            valid: false,
        };

        tracing::debug!(
            target_latency = monitor.target_latency,
            target_latency_ms = timestamp_to_ms(&input_sample_spec, monitor.target_latency),
            in_rate = input_sample_spec.sample_rate(),
            out_rate = output_sample_spec.sample_rate(),
            fe_enable = config.fe_enable,
            fe_profile = config.fe_profile.as_str(),
            fe_interval_ms = timestamp_to_ms(
                &input_sample_spec,
                monitor.update_interval as StreamTimestampDelta
            ),
            "latency monitor: initializing"
        );

        if target_latency < config.min_latency
            || target_latency > config.max_latency
            || target_latency <= 0
        {
            let err = ConfigError::TargetOutOfWindow {
                target_ns: target_latency,
                min_ns: config.min_latency,
                max_ns: config.max_latency,
            };
            tracing::error!(error = %err, "latency monitor: invalid config");
            return monitor;
        }

        if config.fe_enable {
            if config.fe_update_interval <= 0 || monitor.update_interval == 0 {
                let err = ConfigError::InvalidUpdateInterval(config.fe_update_interval);
                tracing::error!(error = %err, "latency monitor: invalid config");
                return monitor;
            }

            assert!(
                monitor.resampler.is_some(),
                "latency monitor: frequency estimator enabled, but no resampler attached"
            );

            monitor.fe = Some(FreqEstimator::new(
                config.fe_profile,
                monitor.target_latency as StreamTimestamp,
            ));

            if !monitor.init_scaling() {
                return monitor;
            }
        }

        monitor.valid = true;
        monitor
    }

    /// Whether construction accepted the configuration.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Current latencies for diagnostics.
    pub fn stats(&self) -> LatencyMonitorStats {
        assert!(self.valid, "latency monitor: stats() on invalid monitor");

        LatencyMonitorStats {
            niq_latency: self.input_sample_spec.stream_timestamp_to_ns(self.niq_latency),
            e2e_latency: self.input_sample_spec.stream_timestamp_to_ns(self.e2e_latency),
        }
    }

    /// Pull one frame from the downstream source and refresh end-to-end
    /// latency from its capture timestamp (if any). Returns the
    /// downstream reader's result; never touches the controller.
    pub fn read(&mut self, frame: &mut Frame) -> bool {
        assert!(self.valid, "latency monitor: read() on invalid monitor");

        if !self.frame_reader.read(frame) {
            return false;
        }

        self.update_e2e_latency(frame.capture_timestamp());

        true
    }

    /// Periodic tick driven by the session, with the current playback
    /// position in stream time.
    ///
    /// Measures the queue latency when upstream is observable, checks
    /// it against the configured window and, with the estimator
    /// enabled, reprograms the resampler. Returns false when the
    /// session must be torn down: latency out of bounds, or resampler
    /// refusal. Never pulls a frame and never blocks.
    pub fn update(&mut self, stream_position: StreamTimestamp) -> bool {
        assert!(self.valid, "latency monitor: update() on invalid monitor");

        // Control acts only on a sample taken this tick; the stored
        // value is kept for stats() even when upstream goes quiet.
        let fresh_niq = self.update_niq_latency();

        if fresh_niq {
            if !self.check_latency(self.niq_latency) {
                return false;
            }
            if self.fe.is_some() && !self.update_scaling(stream_position, self.niq_latency) {
                return false;
            }
            self.report_latency();
        }

        true
    }

    /// Sample the network-in-queue latency. Returns true when a fresh
    /// sample was taken this tick.
    fn update_niq_latency(&mut self) -> bool {
        if !self.depacketizer.is_started() {
            return false;
        }

        let niq_head = self.depacketizer.next_timestamp();

        let latest_packet = match self.queue.latest() {
            Some(packet) => packet,
            None => return false,
        };
        let niq_tail = latest_packet.end();

        self.niq_latency = timestamp_diff(niq_tail, niq_head);
        self.has_niq_latency = true;

        true
    }

    fn update_e2e_latency(&mut self, capture_ts: i64) {
        if capture_ts == 0 {
            return;
        }

        let current_ts = unix_timestamp_ns();

        self.e2e_latency = self
            .input_sample_spec
            .ns_to_stream_timestamp(current_ts - capture_ts);
        self.has_e2e_latency = true;
    }

    /// The bounds check sees the signed sample: a negative queue
    /// latency means upstream is broken and fails through min_latency.
    fn check_latency(&self, latency: StreamTimestampDelta) -> bool {
        if latency < self.min_latency {
            tracing::debug!(
                latency,
                latency_ms = timestamp_to_ms(&self.input_sample_spec, latency),
                min = self.min_latency,
                min_ms = timestamp_to_ms(&self.input_sample_spec, self.min_latency),
                "latency monitor: latency out of bounds"
            );
            return false;
        }

        if latency > self.max_latency {
            tracing::debug!(
                latency,
                latency_ms = timestamp_to_ms(&self.input_sample_spec, latency),
                max = self.max_latency,
                max_ms = timestamp_to_ms(&self.input_sample_spec, self.max_latency),
                "latency monitor: latency out of bounds"
            );
            return false;
        }

        true
    }

    fn init_scaling(&mut self) -> bool {
        let input_rate = self.input_sample_spec.sample_rate();
        let output_rate = self.output_sample_spec.sample_rate();

        if input_rate == 0 || output_rate == 0 {
            let err = ConfigError::InvalidSampleRates {
                input: input_rate,
                output: output_rate,
            };
            tracing::error!(error = %err, "latency monitor: invalid config");
            return false;
        }

        let resampler = self
            .resampler
            .as_deref_mut()
            .expect("latency monitor: scaling init without resampler");

        if !resampler.set_scaling(1.0) {
            let err = ConfigError::InitialScalingRejected;
            tracing::error!(error = %err, "latency monitor: invalid config");
            return false;
        }

        true
    }

    fn update_scaling(
        &mut self,
        stream_position: StreamTimestamp,
        mut latency: StreamTimestampDelta,
    ) -> bool {
        let fe = self
            .fe
            .as_mut()
            .expect("latency monitor: scaling update without estimator");
        let resampler = self
            .resampler
            .as_deref_mut()
            .expect("latency monitor: scaling update without resampler");

        // The queue can be transiently behind playback; that is not a
        // "negative target error" for the controller.
        if latency < 0 {
            latency = 0;
        }

        if !self.has_update_pos {
            self.has_update_pos = true;
            self.update_pos = stream_position;
        }

        // Issue one step per update interval elapsed since the last
        // call, each with the same sample (zero-order hold across the
        // gap).
        while timestamp_diff(stream_position, self.update_pos) >= 0 {
            fe.update(latency as StreamTimestamp);
            self.update_pos = self.update_pos.wrapping_add(self.update_interval);
        }

        let raw = fe.freq_coeff();
        self.freq_coeff = raw.clamp(
            1.0 - self.max_scaling_delta,
            1.0 + self.max_scaling_delta,
        );

        if !resampler.set_scaling(self.freq_coeff) {
            tracing::debug!(
                fe = raw,
                trim_fe = self.freq_coeff,
                "latency monitor: scaling factor rejected by resampler"
            );
            return false;
        }

        true
    }

    fn report_latency(&mut self) {
        if !self.rate_limiter.allow() {
            return;
        }

        let raw_fe = self.fe.as_ref().map(|fe| fe.freq_coeff()).unwrap_or(0.0);

        tracing::debug!(
            e2e_latency = self.e2e_latency,
            e2e_latency_ms = timestamp_to_ms(&self.input_sample_spec, self.e2e_latency),
            e2e_valid = self.has_e2e_latency,
            niq_latency = self.niq_latency,
            niq_latency_ms = timestamp_to_ms(&self.input_sample_spec, self.niq_latency),
            niq_valid = self.has_niq_latency,
            target_latency = self.target_latency,
            target_latency_ms = timestamp_to_ms(&self.input_sample_spec, self.target_latency),
            fe = raw_fe,
            trim_fe = self.freq_coeff,
            "latency monitor"
        );
    }
}
