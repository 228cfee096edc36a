//! `StubRecognizer`: placeholder backend that only counts what it was fed.
//!
//! Lets the whole pipeline be exercised end-to-end without any model.

use tracing::debug;

use crate::error::Result;
use crate::ipc::events::RecognitionResult;
use crate::recognizer::Recognizer;

/// Produces `"[stub: <N> bytes in <M> chunks]"`.
#[derive(Debug, Default)]
pub struct StubRecognizer {
    bytes: u64,
    chunks: u64,
}

impl StubRecognizer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Recognizer for StubRecognizer {
    fn accept(&mut self, bytes: &[u8]) {
        self.bytes += bytes.len() as u64;
        self.chunks += 1;
    }

    fn finalize(&mut self) -> Result<RecognitionResult> {
        debug!(bytes = self.bytes, chunks = self.chunks, "StubRecognizer::finalize");
        Ok(RecognitionResult {
            text: format!("[stub: {} bytes in {} chunks]", self.bytes, self.chunks),
            segments: Vec::new(),
            bytes_accepted: self.bytes,
            chunks_accepted: self.chunks,
            duration_secs: 0.0,
        })
    }
}
