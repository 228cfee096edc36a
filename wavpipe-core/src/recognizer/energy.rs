//! `EnergyRecognizer`: finds speech regions in 16-bit little-endian mono PCM.
//!
//! ## Per `accept`
//!
//! ```text
//! bytes ─► i16 LE pairs (odd byte carried to the next call)
//!        ─► f32 frame of `sample_rate / 50` samples (20 ms)
//!        ─► VAD decision ─► open / close a SpeechSpan
//! ```
//!
//! `finalize` flushes the partial last frame and closes any open span.

use tracing::debug;

use crate::error::{Result, WavpipeError};
use crate::ipc::events::{RecognitionResult, SpeechSpan};
use crate::recognizer::Recognizer;
use crate::vad::{EnergyVad, VoiceActivityDetector};

/// Frames per second; 50 gives 20 ms frames.
const FRAMES_PER_SECOND: u32 = 50;

pub struct EnergyRecognizer {
    sample_rate: u32,
    frame_len: usize,
    vad: Box<dyn VoiceActivityDetector>,
    /// Low byte of a sample whose high byte is in the next chunk.
    pending_byte: Option<u8>,
    frame: Vec<f32>,
    samples_processed: u64,
    span_start: Option<u64>,
    spans: Vec<SpeechSpan>,
    bytes_accepted: u64,
    chunks_accepted: u64,
    finalized: bool,
}

impl EnergyRecognizer {
    pub fn new(sample_rate: u32, vad: Box<dyn VoiceActivityDetector>) -> Self {
        let sample_rate = sample_rate.max(1);
        let frame_len = (sample_rate / FRAMES_PER_SECOND).max(1) as usize;
        Self {
            sample_rate,
            frame_len,
            vad,
            pending_byte: None,
            frame: Vec::with_capacity(frame_len),
            samples_processed: 0,
            span_start: None,
            spans: Vec::new(),
            bytes_accepted: 0,
            chunks_accepted: 0,
            finalized: false,
        }
    }

    pub fn with_default_vad(sample_rate: u32) -> Self {
        Self::new(sample_rate, Box::new(EnergyVad::default()))
    }

    fn push_sample(&mut self, sample: i16) {
        self.frame.push(f32::from(sample) / 32_768.0);
        if self.frame.len() == self.frame_len {
            self.process_frame();
        }
    }

    fn process_frame(&mut self) {
        if self.frame.is_empty() {
            return;
        }
        let frame_start = self.samples_processed;
        let is_speech = self.vad.classify(&self.frame).is_speech();

        match (is_speech, self.span_start) {
            (true, None) => self.span_start = Some(frame_start),
            (false, Some(start)) => {
                self.spans.push(self.span(start, frame_start));
                self.span_start = None;
            }
            _ => {}
        }

        self.samples_processed += self.frame.len() as u64;
        self.frame.clear();
    }

    fn span(&self, start: u64, end: u64) -> SpeechSpan {
        SpeechSpan {
            start_secs: self.secs(start),
            end_secs: self.secs(end),
        }
    }

    fn secs(&self, samples: u64) -> f64 {
        samples as f64 / f64::from(self.sample_rate)
    }
}

impl Recognizer for EnergyRecognizer {
    fn accept(&mut self, bytes: &[u8]) {
        self.bytes_accepted += bytes.len() as u64;
        self.chunks_accepted += 1;

        let mut rest = bytes;
        if let Some(low) = self.pending_byte.take() {
            match rest.split_first() {
                Some((&high, tail)) => {
                    self.push_sample(i16::from_le_bytes([low, high]));
                    rest = tail;
                }
                None => {
                    self.pending_byte = Some(low);
                    return;
                }
            }
        }

        let mut pairs = rest.chunks_exact(2);
        for pair in &mut pairs {
            self.push_sample(i16::from_le_bytes([pair[0], pair[1]]));
        }
        if let [odd] = pairs.remainder() {
            self.pending_byte = Some(*odd);
        }
    }

    fn finalize(&mut self) -> Result<RecognitionResult> {
        // Spans were moved out by the first call; a second result would be empty.
        if self.finalized {
            return Err(WavpipeError::Recognizer(
                "EnergyRecognizer already finalized".into(),
            ));
        }
        self.finalized = true;
        self.process_frame();
        if let Some(start) = self.span_start.take() {
            self.spans.push(self.span(start, self.samples_processed));
        }
        if self.pending_byte.is_some() {
            debug!("dropping trailing half sample");
        }

        let spans = std::mem::take(&mut self.spans);
        let text = spans
            .iter()
            .map(|s| format!("[speech {:.2}-{:.2}s]", s.start_secs, s.end_secs))
            .collect::<Vec<_>>()
            .join(" ");

        debug!(
            spans = spans.len(),
            samples = self.samples_processed,
            "EnergyRecognizer::finalize"
        );

        Ok(RecognitionResult {
            text,
            segments: spans,
            bytes_accepted: self.bytes_accepted,
            chunks_accepted: self.chunks_accepted,
            duration_secs: self.secs(self.samples_processed),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const RATE: u32 = 16_000;

    fn pcm(samples: impl IntoIterator<Item = i16>) -> Vec<u8> {
        samples.into_iter().flat_map(i16::to_le_bytes).collect()
    }

    /// 1 s silence, 1 s loud square wave, 1 s silence.
    fn speech_in_the_middle() -> Vec<u8> {
        let silence = std::iter::repeat(0i16).take(RATE as usize);
        let loud = (0..RATE as usize).map(|i| if i % 2 == 0 { 8_000 } else { -8_000 });
        pcm(silence.clone().chain(loud).chain(silence))
    }

    fn no_hangover() -> EnergyRecognizer {
        EnergyRecognizer::new(RATE, Box::new(EnergyVad::new(0.02, 0)))
    }

    #[test]
    fn silence_yields_no_spans() {
        let mut rec = EnergyRecognizer::with_default_vad(RATE);
        rec.accept(&pcm(std::iter::repeat(0i16).take(RATE as usize)));
        let result = rec.finalize().unwrap();
        assert!(result.segments.is_empty());
        assert!(result.text.is_empty());
        assert_abs_diff_eq!(result.duration_secs, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn loud_region_becomes_one_span() {
        let mut rec = no_hangover();
        rec.accept(&speech_in_the_middle());
        let result = rec.finalize().unwrap();

        assert_eq!(result.segments.len(), 1);
        let span = result.segments[0];
        assert_abs_diff_eq!(span.start_secs, 1.0, epsilon = 0.021);
        assert_abs_diff_eq!(span.end_secs, 2.0, epsilon = 0.021);
        assert_eq!(result.text, "[speech 1.00-2.00s]");
        assert_eq!(result.bytes_accepted, 3 * 2 * RATE as u64);
    }

    #[test]
    fn odd_chunk_boundaries_match_one_big_chunk() {
        let bytes = speech_in_the_middle();

        let mut whole = no_hangover();
        whole.accept(&bytes);
        let expected = whole.finalize().unwrap();

        let mut split = no_hangover();
        for piece in bytes.chunks(4_001) {
            split.accept(piece);
        }
        split.accept(&[]);
        let actual = split.finalize().unwrap();

        assert_eq!(actual.segments, expected.segments);
        assert_eq!(actual.bytes_accepted, expected.bytes_accepted);
        assert_abs_diff_eq!(actual.duration_secs, expected.duration_secs, epsilon = 1e-12);
    }

    #[test]
    fn second_finalize_is_a_recognizer_error() {
        let mut rec = no_hangover();
        rec.accept(&speech_in_the_middle());
        assert_eq!(rec.finalize().unwrap().segments.len(), 1);

        let err = rec.finalize().unwrap_err();
        assert!(matches!(err, WavpipeError::Recognizer(_)), "{err}");
    }

    #[test]
    fn span_open_at_end_is_closed_by_finalize() {
        let mut rec = no_hangover();
        rec.accept(&pcm(std::iter::repeat(10_000i16).take(500)));
        let result = rec.finalize().unwrap();
        assert_eq!(result.segments.len(), 1);
        assert_abs_diff_eq!(result.segments[0].end_secs, 500.0 / 16_000.0, epsilon = 1e-9);
    }
}
