//! Byte sources feeding the producer.
//!
//! The `ByteSource` trait decouples the producer from where the bytes come
//! from (a WAV file on disk, an in-memory buffer in tests, ...).

pub mod wav;

pub use wav::{WavFileSource, WavFormat, WAV_HEADER_BYTES};

use std::io::Read;

/// Contract for anything the producer can stream from.
pub trait ByteSource: Send {
    /// Read up to `buf.len()` bytes. May return fewer; `Ok(0)` means the
    /// stream has ended.
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize>;

    /// Payload length in bytes, excluding any header already skipped.
    /// Used for progress reporting only.
    fn declared_len(&self) -> u64;
}

/// Any `Read` implementor paired with a declared length.
#[derive(Debug)]
pub struct StreamSource<R> {
    reader: R,
    declared_len: u64,
}

impl<R: Read + Send> StreamSource<R> {
    pub fn new(reader: R, declared_len: u64) -> Self {
        Self {
            reader,
            declared_len,
        }
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl StreamSource<std::io::Cursor<Vec<u8>>> {
    /// In-memory source whose declared length is the buffer length.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let len = bytes.len() as u64;
        Self::new(std::io::Cursor::new(bytes), len)
    }
}

impl<R: Read + Send> ByteSource for StreamSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.reader.read(buf)
    }

    fn declared_len(&self) -> u64 {
        self.declared_len
    }
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        (**self).read(buf)
    }

    fn declared_len(&self) -> u64 {
        (**self).declared_len()
    }
}
