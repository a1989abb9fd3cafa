//! Discrete PI controller mapping latency samples to a rate-scaling
//! coefficient
//!
//! Each tick the estimator receives the current queue latency (in
//! samples at the input rate), smooths it over a short moving window,
//! and produces a dimensionless coefficient near 1.0 for the resampler:
//! above 1.0 the consumer speeds up and drains the queue, below 1.0 it
//! slows down and lets the queue refill. Long-run playback rate then
//! tracks the sender's clock without ever stepping the stream.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::packet::StreamTimestamp;

/// Bound on the integral contribution, to keep a long excursion from
/// winding the accumulator far past anything the resampler can act on.
const MAX_INTEGRAL_TERM: f64 = 0.05;

/// Safety band on the raw output; the monitor applies the much tighter
/// configured clamp on top.
const MIN_COEFF: f64 = 0.5;
const MAX_COEFF: f64 = 2.0;

/// Gain/windowing profile of the frequency estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeProfile {
    /// Short window, high gain: settles within about a second at a
    /// 50 ms tick, at the cost of a larger transient overshoot.
    Responsive,
    /// Long window, low gain: settles within about five seconds with
    /// minimal overshoot. The default for steady network playback.
    Gradual,
}

impl FeProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeProfile::Responsive => "responsive",
            FeProfile::Gradual => "gradual",
        }
    }
}

/// Fixed gains selected by profile, tuned for a 50 ms tick at 48 kHz.
struct Gains {
    proportional: f64,
    integral: f64,
    window_len: usize,
}

fn profile_gains(profile: FeProfile) -> Gains {
    match profile {
        FeProfile::Responsive => Gains {
            proportional: 6e-5,
            integral: 1e-6,
            window_len: 4,
        },
        FeProfile::Gradual => Gains {
            proportional: 2.5e-5,
            integral: 2e-7,
            window_len: 16,
        },
    }
}

/// PI-type frequency estimator.
///
/// # Example
/// ```
/// use driftlock_core::audio::freq_estimator::{FeProfile, FreqEstimator};
///
/// let mut fe = FreqEstimator::new(FeProfile::Responsive, 4800);
/// fe.update(4800); // latency exactly on target
/// assert_eq!(fe.freq_coeff(), 1.0);
/// ```
#[derive(Debug)]
pub struct FreqEstimator {
    target: f64,
    proportional: f64,
    integral: f64,
    window_len: usize,
    window: VecDeque<f64>,
    window_sum: f64,
    accum_error: f64,
    coeff: f64,
}

impl FreqEstimator {
    /// Create an estimator for the given target latency in samples at
    /// the input rate.
    ///
    /// # Panics
    /// Panics on a zero target; the monitor rejects such configs before
    /// constructing the controller.
    pub fn new(profile: FeProfile, target: StreamTimestamp) -> Self {
        assert!(target > 0, "freq estimator: zero target latency");

        let gains = profile_gains(profile);
        Self {
            target: target as f64,
            proportional: gains.proportional,
            integral: gains.integral,
            window_len: gains.window_len,
            window: VecDeque::with_capacity(gains.window_len),
            window_sum: 0.0,
            accum_error: 0.0,
            coeff: 1.0,
        }
    }

    /// Advance the controller by one tick with the current latency in
    /// samples at the input rate.
    pub fn update(&mut self, latency: StreamTimestamp) {
        if self.window.len() == self.window_len {
            let oldest = self.window.pop_front().unwrap_or(0.0);
            self.window_sum -= oldest;
        }
        self.window.push_back(latency as f64);
        self.window_sum += latency as f64;

        let smoothed = self.window_sum / self.window.len() as f64;
        let error = smoothed - self.target;

        self.accum_error += error;
        let max_accum = MAX_INTEGRAL_TERM / self.integral;
        self.accum_error = self.accum_error.clamp(-max_accum, max_accum);

        let raw = 1.0 + self.proportional * error + self.integral * self.accum_error;
        self.coeff = raw.clamp(MIN_COEFF, MAX_COEFF);
    }

    /// Current scaling coefficient; 1.0 before the first update.
    pub fn freq_coeff(&self) -> f32 {
        self.coeff as f32
    }
}
