//! Resampler scaling contract
//!
//! The DSP kernel lives outside this crate; the latency monitor only
//! needs the one knob that trades queue depth against playback rate.

/// Scaling input of the session resampler.
pub trait Resampler {
    /// Set the multiplicative adjustment applied to the output/input
    /// rate ratio. 1.0 means nominal rate; values above 1.0 consume
    /// input faster.
    ///
    /// Returns false iff the factor is outside the backend's supported
    /// range. Never panics on out-of-range input.
    fn set_scaling(&mut self, factor: f32) -> bool;
}
