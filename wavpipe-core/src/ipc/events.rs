//! Event and result types emitted by the pipeline.
//!
//! | Type | Delivered through |
//! |------|-------------------|
//! | `ProgressEvent` | `ChannelProgress` (crossbeam, lossy) |
//! | `PipelineStatusEvent` | `Pipeline::subscribe_status` (tokio broadcast) |
//! | `RecognitionResult` | return value of `Pipeline::run` |

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Progress events
// ---------------------------------------------------------------------------

/// Bytes read from the source so far, relative to its declared length.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub current_bytes: u64,
    pub total_bytes: u64,
    /// Percentage in [0.0, 100.0].
    pub percent: f32,
}

impl ProgressEvent {
    pub fn new(current_bytes: u64, total_bytes: u64) -> Self {
        Self {
            current_bytes,
            total_bytes,
            percent: percent_of(current_bytes, total_bytes),
        }
    }
}

/// `current / total` as a percentage. An empty source counts as complete.
pub fn percent_of(current: u64, total: u64) -> f32 {
    if total == 0 {
        return 100.0;
    }
    ((current as f64 / total as f64) * 100.0).clamp(0.0, 100.0) as f32
}

// ---------------------------------------------------------------------------
// Pipeline status events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStatusEvent {
    pub status: PipelineStatus,
    /// Optional human-readable detail (e.g. error message).
    pub detail: Option<String>,
}

/// Lifecycle of a single transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStatus {
    /// Created, `run()` not yet called.
    Idle,
    /// Producer and consumer both active.
    Running,
    /// Producer finished; consumer emptying the queue.
    Draining,
    /// Final result produced. No further work is accepted.
    Done,
    /// Setup error, worker failure or cancellation.
    Failed,
}

impl PipelineStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineStatus::Done | PipelineStatus::Failed)
    }
}

// ---------------------------------------------------------------------------
// Recognition result
// ---------------------------------------------------------------------------

/// Aggregated output of a recognizer, requested once after the last chunk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognitionResult {
    pub text: String,
    pub segments: Vec<SpeechSpan>,
    pub bytes_accepted: u64,
    pub chunks_accepted: u64,
    pub duration_secs: f64,
}

/// A region of detected speech.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechSpan {
    pub start_secs: f64,
    pub end_secs: f64,
}
