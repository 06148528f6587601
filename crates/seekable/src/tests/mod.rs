use crate::{BlockCodec, CodecError, SeekableWriter};
use std::cell::Cell;
use std::io::{self, Write};
use std::rc::Rc;

mod reader_tests;

// -------------------- Helpers --------------------

/// Codec that stores frames verbatim and counts decodes. Makes compressed
/// sizes predictable.
#[derive(Default, Clone)]
pub(crate) struct IdentityCodec {
    pub decodes: Rc<Cell<usize>>,
}

impl BlockCodec for IdentityCodec {
    fn encode(&mut self, src: &[u8], dst: &mut Vec<u8>) -> Result<(), CodecError> {
        dst.clear();
        dst.extend_from_slice(src);
        Ok(())
    }

    fn decode(
        &mut self,
        src: &[u8],
        _expected_len: usize,
        dst: &mut Vec<u8>,
    ) -> Result<(), CodecError> {
        self.decodes.set(self.decodes.get() + 1);
        dst.clear();
        dst.extend_from_slice(src);
        Ok(())
    }
}

/// Sink that accepts `limit` bytes and then fails every write.
pub(crate) struct LimitedSink {
    pub buf: Vec<u8>,
    pub limit: usize,
}

impl LimitedSink {
    pub fn new(limit: usize) -> Self {
        Self {
            buf: Vec::new(),
            limit,
        }
    }
}

impl Write for LimitedSink {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let room = self.limit.saturating_sub(self.buf.len());
        if room == 0 {
            return Err(io::Error::new(io::ErrorKind::Other, "sink full"));
        }
        let n = room.min(data.len());
        self.buf.extend_from_slice(&data[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Deterministic, moderately compressible test data.
pub(crate) fn sample_data(len: usize) -> Vec<u8> {
    (0..len)
        .map(|i| ((i * 31) ^ (i >> 7)) as u8 % 64 + b' ')
        .collect()
}

/// Compresses `data` with zstd in a single `write_all`.
pub(crate) fn compress(data: &[u8], frame_size: usize) -> Vec<u8> {
    let mut w = SeekableWriter::new(Vec::new(), frame_size).unwrap();
    w.write_all(data).unwrap();
    w.finish().unwrap()
}

/// Compresses `data` with the identity codec.
pub(crate) fn store(data: &[u8], frame_size: usize) -> Vec<u8> {
    let mut w =
        SeekableWriter::with_codec(Vec::new(), frame_size, IdentityCodec::default()).unwrap();
    w.append(data).unwrap();
    w.finish().unwrap()
}
