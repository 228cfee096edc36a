//! WAV file source: skip the fixed RIFF header, stream the rest as raw bytes.
//!
//! The header is parsed with `hound` only to log the format and warn when it
//! is not what the recognizer expects. Bytes are never decoded here; the
//! producer forwards them untouched.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::ByteSource;
use crate::error::{Result, WavpipeError};

/// Size of a canonical PCM RIFF/WAVE header.
pub const WAV_HEADER_BYTES: u64 = 44;

/// Format fields read from the RIFF header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    pub is_float: bool,
}

impl WavFormat {
    /// 16-bit integer mono PCM, the layout the recognizers accept.
    pub fn is_pcm16_mono(&self) -> bool {
        !self.is_float && self.bits_per_sample == 16 && self.channels == 1
    }
}

/// An open WAV file positioned just past its header.
#[derive(Debug)]
pub struct WavFileSource {
    path: PathBuf,
    reader: BufReader<File>,
    declared_len: u64,
    format: Option<WavFormat>,
}

impl WavFileSource {
    /// Open `path`, skip `header_bytes` and declare the remaining length.
    ///
    /// # Errors
    /// `WavpipeError::SourceOpen` if the file cannot be opened, its length
    /// cannot be determined, or the header cannot be skipped.
    pub fn open(path: impl AsRef<Path>, header_bytes: u64) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let open_err = |source| WavpipeError::SourceOpen {
            path: path.clone(),
            source,
        };

        let mut file = File::open(&path).map_err(open_err)?;
        let file_len = file.metadata().map_err(open_err)?.len();

        let format = probe_format(&path);
        match format {
            Some(f) if f.is_pcm16_mono() => {
                info!(
                    path = %path.display(),
                    sample_rate = f.sample_rate,
                    "opened WAV source"
                );
            }
            Some(f) => {
                warn!(
                    path = %path.display(),
                    sample_rate = f.sample_rate,
                    channels = f.channels,
                    bits_per_sample = f.bits_per_sample,
                    float = f.is_float,
                    "WAV is not 16-bit mono PCM; streaming raw bytes anyway"
                );
            }
            None => {
                warn!(path = %path.display(), "no readable RIFF header; streaming raw bytes");
            }
        }

        file.seek(SeekFrom::Start(header_bytes)).map_err(open_err)?;
        let declared_len = file_len.saturating_sub(header_bytes);

        Ok(Self {
            path,
            reader: BufReader::new(file),
            declared_len,
            format,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Header format, if the file carried a parseable RIFF header.
    pub fn format(&self) -> Option<WavFormat> {
        self.format
    }
}

impl ByteSource for WavFileSource {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.reader.read(buf)
    }

    fn declared_len(&self) -> u64 {
        self.declared_len
    }
}

fn probe_format(path: &Path) -> Option<WavFormat> {
    let reader = hound::WavReader::open(path).ok()?;
    let spec = reader.spec();
    Some(WavFormat {
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        bits_per_sample: spec.bits_per_sample,
        is_float: spec.sample_format == hound::SampleFormat::Float,
    })
}
