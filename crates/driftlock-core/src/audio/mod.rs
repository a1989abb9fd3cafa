//! Audio-side functionality of the receiver session
//!
//! This module contains:
//! - Sample stream parameters and time/sample arithmetic ([`sample_spec`])
//! - Frames and the downstream reader contract ([`frame`])
//! - The resampler scaling contract ([`resampler`])
//! - The PI-type frequency estimator ([`freq_estimator`])
//! - The per-session latency monitor ([`latency_monitor`])
//! - Standalone end-to-end latency observation ([`e2e_monitor`])

pub mod e2e_monitor;
pub mod frame;
pub mod freq_estimator;
pub mod latency_monitor;
pub mod resampler;
pub mod sample_spec;
