//! Sample Destinations

use std::io::{self, Write};

/// Destination for samples copied out of the pool.
///
/// A failed write stops the drain; the sample being copied is not counted
/// as delivered.
pub trait SampleSink {
    /// Accept one sample payload tagged with its sequence number
    fn write_sample(&mut self, sequence: u32, payload: &[u8]) -> io::Result<()>;
}

/// Packs payloads back to back into a byte slice
#[derive(Debug)]
pub struct SliceSink<'a> {
    dst: &'a mut [u8],
    written: usize,
}

impl<'a> SliceSink<'a> {
    /// Write into `dst` from the start
    pub fn new(dst: &'a mut [u8]) -> Self {
        Self { dst, written: 0 }
    }

    /// Bytes written so far
    pub fn written(&self) -> usize {
        self.written
    }
}

impl SampleSink for SliceSink<'_> {
    fn write_sample(&mut self, _sequence: u32, payload: &[u8]) -> io::Result<()> {
        let end = self.written + payload.len();
        let dst = self
            .dst
            .get_mut(self.written..end)
            .ok_or_else(|| io::Error::new(io::ErrorKind::WriteZero, "destination full"))?;
        dst.copy_from_slice(payload);
        self.written = end;
        Ok(())
    }
}

/// Streams raw payloads into any writer
#[derive(Debug)]
pub struct WriterSink<W: Write> {
    inner: W,
}

impl<W: Write> WriterSink<W> {
    /// Wrap a writer
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Unwrap the writer
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> SampleSink for WriterSink<W> {
    fn write_sample(&mut self, _sequence: u32, payload: &[u8]) -> io::Result<()> {
        self.inner.write_all(payload)
    }
}

/// Adapts a closure into a sink
pub struct FnSink<F>(pub F);

impl<F> SampleSink for FnSink<F>
where
    F: FnMut(u32, &[u8]) -> io::Result<()>,
{
    fn write_sample(&mut self, sequence: u32, payload: &[u8]) -> io::Result<()> {
        (self.0)(sequence, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_sink_packs_payloads() {
        let mut dst = [0u8; 6];
        let mut sink = SliceSink::new(&mut dst);
        sink.write_sample(1, &[1, 2, 3]).unwrap();
        sink.write_sample(2, &[4, 5, 6]).unwrap();
        assert_eq!(sink.written(), 6);

        let err = sink.write_sample(3, &[7, 8, 9]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WriteZero);
        assert_eq!(dst, [1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_writer_sink() {
        let mut sink = WriterSink::new(Vec::new());
        sink.write_sample(1, b"ab").unwrap();
        sink.write_sample(2, b"cd").unwrap();
        assert_eq!(sink.into_inner(), b"abcd");
    }

    #[test]
    fn test_fn_sink_sees_sequence() {
        let mut seen = Vec::new();
        let mut sink = FnSink(|seq: u32, _payload: &[u8]| -> io::Result<()> {
            seen.push(seq);
            Ok(())
        });
        sink.write_sample(7, &[0]).unwrap();
        sink.write_sample(9, &[0]).unwrap();
        drop(sink);
        assert_eq!(seen, vec![7, 9]);
    }
}
