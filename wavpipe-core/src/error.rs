use thiserror::Error;

/// All errors produced by wavpipe-core.
#[derive(Debug, Error)]
pub enum WavpipeError {
    #[error("cannot open audio source {path}: {source}")]
    SourceOpen {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to spawn pipeline thread: {0}")]
    ThreadSpawn(#[source] std::io::Error),

    #[error("{0} thread panicked")]
    WorkerPanicked(&'static str),

    #[error("consumer side of the queue is closed")]
    ConsumerGone,

    #[error("pipeline was cancelled")]
    Cancelled,

    #[error("pipeline has already been started")]
    AlreadyStarted,

    #[error("recognizer error: {0}")]
    Recognizer(String),
}

impl WavpipeError {
    /// True for failures that happen before any worker thread starts.
    pub fn is_setup(&self) -> bool {
        matches!(
            self,
            WavpipeError::SourceOpen { .. }
                | WavpipeError::InvalidConfig(_)
                | WavpipeError::ThreadSpawn(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, WavpipeError>;
