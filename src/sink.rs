//! Destinations for encoded bytes.

extern crate alloc;
use alloc::vec::Vec;

use std::io::{self, Write};

/// Append-only byte channel the encoder writes into.
///
/// Failures are reported to the caller as-is; the encoder never retries and
/// leaves discarding partial output to whoever owns the sink.
pub trait OutputSink {
    fn append_bytes(&mut self, bytes: &[u8]) -> io::Result<()>;

    fn append_str(&mut self, text: &str) -> io::Result<()> {
        self.append_bytes(text.as_bytes())
    }

    /// Abandon the stream. Called for a cancelled capture session.
    fn cancel(&mut self) {}

    /// Called once after the trailer has been appended.
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl OutputSink for Vec<u8> {
    fn append_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.extend_from_slice(bytes);
        Ok(())
    }

    fn cancel(&mut self) {
        self.clear();
    }
}

impl<T: OutputSink + ?Sized> OutputSink for &mut T {
    fn append_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        (**self).append_bytes(bytes)
    }

    fn append_str(&mut self, text: &str) -> io::Result<()> {
        (**self).append_str(text)
    }

    fn cancel(&mut self) {
        (**self).cancel();
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

/// Adapts any [`Write`] (a file, a socket, a `BufWriter`) into a sink.
/// `close` flushes; cancelling leaves already written bytes in place.
#[derive(Debug)]
pub struct IoSink<W: Write> {
    inner: W,
}

impl<W: Write> IoSink<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> OutputSink for IoSink<W> {
    fn append_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.inner.write_all(bytes)
    }

    fn close(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec_sink_appends_and_cancels() {
        let mut sink = Vec::new();
        sink.append_str("GIF").unwrap();
        sink.append_bytes(&[1, 2]).unwrap();
        assert_eq!(sink, b"GIF\x01\x02".to_vec());
        sink.cancel();
        assert!(sink.is_empty());
    }

    #[test]
    fn io_sink_writes_through() {
        let mut sink = IoSink::new(io::Cursor::new(Vec::new()));
        sink.append_bytes(b"abc").unwrap();
        sink.close().unwrap();
        assert_eq!(sink.into_inner().into_inner(), b"abc".to_vec());
    }

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn io_errors_surface() {
        let mut sink = IoSink::new(Broken);
        let err = sink.append_bytes(b"x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
