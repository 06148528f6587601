//! Block codec contract and the zstd implementation.
//!
//! A codec turns one frame of raw bytes into a self-contained compressed block
//! and back. Each writer and reader owns exactly one codec instance.

use crate::error::CodecError;

/// Largest decoded/encoded size ratio a zstd frame can reach: an RLE block
/// stores at most 128 KiB in 4 bytes.
const ZSTD_MAX_RATIO: usize = 128 * 1024 / 4;

/// Compresses and decompresses whole frames.
///
/// Output goes into a caller-owned buffer that is cleared first, so the same
/// allocation is reused from frame to frame.
pub trait BlockCodec {
    /// Compresses `src` into `dst`, replacing its contents.
    fn encode(&mut self, src: &[u8], dst: &mut Vec<u8>) -> Result<(), CodecError>;

    /// Decompresses the block `src` into `dst`, replacing its contents.
    ///
    /// `expected_len` is the decoded size recorded in the seek table; it is a
    /// capacity hint. The reader rejects a frame that decodes to any other
    /// length.
    fn decode(
        &mut self,
        src: &[u8],
        expected_len: usize,
        dst: &mut Vec<u8>,
    ) -> Result<(), CodecError>;
}

/// zstd block codec.
///
/// Uses single-threaded bulk contexts, so identical input and level always
/// produce byte-identical frames. The compression context is created on first
/// use when the codec comes from [`ZstdCodec::decoder`].
pub struct ZstdCodec {
    level: i32,
    compressor: Option<zstd::bulk::Compressor<'static>>,
    decompressor: zstd::bulk::Decompressor<'static>,
}

fn init_error(source: std::io::Error) -> CodecError {
    CodecError::Init {
        codec: "zstd",
        source,
    }
}

impl ZstdCodec {
    /// Creates a codec with the given compression level.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Init`] if a zstd context cannot be created.
    pub fn new(level: i32) -> Result<Self, CodecError> {
        Ok(Self {
            level,
            compressor: Some(zstd::bulk::Compressor::new(level).map_err(init_error)?),
            decompressor: zstd::bulk::Decompressor::new().map_err(init_error)?,
        })
    }

    /// Creates a codec for reading. Only the decompression context is
    /// allocated up front.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Init`] if the zstd context cannot be created.
    pub fn decoder() -> Result<Self, CodecError> {
        Ok(Self {
            level: config::DEFAULT_LEVEL,
            compressor: None,
            decompressor: zstd::bulk::Decompressor::new().map_err(init_error)?,
        })
    }

    #[must_use]
    pub fn level(&self) -> i32 {
        self.level
    }
}

impl BlockCodec for ZstdCodec {
    fn encode(&mut self, src: &[u8], dst: &mut Vec<u8>) -> Result<(), CodecError> {
        let compressor = match self.compressor.take() {
            Some(c) => c,
            None => zstd::bulk::Compressor::new(self.level).map_err(init_error)?,
        };
        let compressor = self.compressor.insert(compressor);

        dst.clear();
        dst.reserve(zstd::zstd_safe::compress_bound(src.len()));
        compressor
            .compress_to_buffer(src, dst)
            .map_err(|source| CodecError::Encode {
                codec: "zstd",
                source,
            })?;
        Ok(())
    }

    fn decode(
        &mut self,
        src: &[u8],
        expected_len: usize,
        dst: &mut Vec<u8>,
    ) -> Result<(), CodecError> {
        dst.clear();
        // A corrupt table entry must not drive the allocation: no valid frame
        // of this length decodes to more than the ratio bound.
        dst.reserve(expected_len.min(src.len().saturating_mul(ZSTD_MAX_RATIO)));
        self.decompressor
            .decompress_to_buffer(src, dst)
            .map_err(|source| CodecError::Decode {
                codec: "zstd",
                source,
            })?;
        Ok(())
    }
}
