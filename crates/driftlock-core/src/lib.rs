//! Driftlock Core - receiver-side latency monitoring and adaptive
//! resampling for real-time audio streams
//!
//! This library provides the control loop that keeps a decoded network
//! audio stream playing at the listener's clock rate: a per-session
//! latency monitor observing queue depth and capture-to-play delay, a
//! PI-type frequency estimator, and the small contracts it consumes
//! from the packet queue, depacketizer and resampler.

pub mod audio;
pub mod packet;
pub mod util;

pub use audio::freq_estimator::{FeProfile, FreqEstimator};
pub use audio::latency_monitor::{LatencyMonitor, LatencyMonitorConfig, LatencyMonitorStats};
pub use audio::sample_spec::SampleSpec;
pub use packet::{SortedQueue, StreamTimestamp};

/// Library version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default sample rate for network audio sessions (48kHz)
pub const DEFAULT_SAMPLE_RATE: u32 = 48000;
