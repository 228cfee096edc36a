//! Voice Activity Detection (VAD) abstraction used by `EnergyRecognizer`.
//!
//! The recognizer decodes PCM frames and asks a `VoiceActivityDetector`
//! whether each frame is speech; swap in another detector without touching
//! the recognizer.

pub mod energy;

pub use energy::EnergyVad;

/// Whether a given audio frame contains speech or silence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VadDecision {
    /// The frame contains speech energy above threshold.
    Speech,
    /// The frame is silent (or below threshold, including hangover period).
    Silence,
}

impl VadDecision {
    pub fn is_speech(self) -> bool {
        self == VadDecision::Speech
    }
}

/// Trait for all VAD implementations.
///
/// Implementors may be stateful (hangover counters, etc.).
pub trait VoiceActivityDetector: Send + 'static {
    /// Classify one frame of mono samples in [-1.0, 1.0].
    fn classify(&mut self, frame: &[f32]) -> VadDecision;

    /// Reset any internal state.
    fn reset(&mut self);
}
