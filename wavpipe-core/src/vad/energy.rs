//! RMS-threshold detector with a hangover window.
//!
//! A frame is speech when its RMS reaches the threshold. After the last loud
//! frame, up to `hangover_frames` quiet frames are still reported as speech so
//! that word tails and short pauses do not split a region in two.

use super::{VadDecision, VoiceActivityDetector};

pub const DEFAULT_THRESHOLD: f32 = 0.02;
/// 160 ms at 20 ms frames.
pub const DEFAULT_HANGOVER_FRAMES: u32 = 8;

#[derive(Debug, Clone)]
pub struct EnergyVad {
    /// Compared against the frame's mean square, so no `sqrt` per frame.
    threshold_sq: f32,
    hangover_frames: u32,
    hangover_left: u32,
}

impl EnergyVad {
    pub fn new(threshold: f32, hangover_frames: u32) -> Self {
        let threshold = threshold.max(0.0);
        Self {
            threshold_sq: threshold * threshold,
            hangover_frames,
            hangover_left: 0,
        }
    }

    pub fn rms(samples: &[f32]) -> f32 {
        mean_square(samples).sqrt()
    }

    /// Quiet frames that will still count as speech.
    pub fn hangover_left(&self) -> u32 {
        self.hangover_left
    }
}

fn mean_square(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32
}

impl Default for EnergyVad {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD, DEFAULT_HANGOVER_FRAMES)
    }
}

impl VoiceActivityDetector for EnergyVad {
    fn classify(&mut self, frame: &[f32]) -> VadDecision {
        // An empty frame carries no energy; it never arms the hangover.
        let loud = !frame.is_empty() && mean_square(frame) >= self.threshold_sq;
        if loud {
            self.hangover_left = self.hangover_frames;
            return VadDecision::Speech;
        }
        match self.hangover_left.checked_sub(1) {
            Some(left) => {
                self.hangover_left = left;
                VadDecision::Speech
            }
            None => VadDecision::Silence,
        }
    }

    fn reset(&mut self) {
        self.hangover_left = 0;
    }
}
