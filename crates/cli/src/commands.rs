//! File-level operations behind the shell commands.

use anyhow::{Context, Result};
use config::Config;
use seekable::{SeekableReader, SeekableWriter};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::info;

/// Outcome of [`compress_file`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressStats {
    pub frames: usize,
    pub input_bytes: u64,
    pub output_bytes: u64,
}

/// Summary of a seekable file, as printed by `INFO`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileInfo {
    pub frames: usize,
    pub decompressed_size: u64,
    pub compressed_data_size: u64,
    pub table_size: usize,
}

fn open_reader(path: &Path) -> Result<SeekableReader<BufReader<File>>> {
    let f = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    SeekableReader::new(BufReader::new(f))
        .with_context(|| format!("{} is not a seekable stream", path.display()))
}

/// Compresses `input` into a seekable stream at `output`.
pub fn compress_file(input: &Path, output: &Path, cfg: &Config) -> Result<CompressStats> {
    let mut src = BufReader::new(
        File::open(input).with_context(|| format!("opening {}", input.display()))?,
    );
    let dst = BufWriter::new(
        File::create(output).with_context(|| format!("creating {}", output.display()))?,
    );

    let mut w = SeekableWriter::from_config(dst, cfg)?;
    let input_bytes = io::copy(&mut src, &mut w).context("compressing")?;
    w.close().context("writing seek table")?;
    let frames = w.table().len();
    drop(w.finish()?);

    let output_bytes = std::fs::metadata(output)
        .with_context(|| format!("stat {}", output.display()))?
        .len();
    info!(
        input = %input.display(),
        output = %output.display(),
        frames,
        input_bytes,
        output_bytes,
        "compressed"
    );

    Ok(CompressStats {
        frames,
        input_bytes,
        output_bytes,
    })
}

/// Decompresses the seekable stream at `input` into `output`. Returns the
/// number of bytes written.
pub fn decompress_file(input: &Path, output: &Path) -> Result<u64> {
    let mut r = open_reader(input)?;
    let mut dst = BufWriter::new(
        File::create(output).with_context(|| format!("creating {}", output.display()))?,
    );
    let n = io::copy(&mut r, &mut dst).context("decompressing")?;
    dst.flush().context("flushing output")?;
    info!(input = %input.display(), output = %output.display(), bytes = n, "decompressed");
    Ok(n)
}

/// Reads up to `len` decompressed bytes starting at `offset`.
pub fn read_range(path: &Path, offset: u64, len: u64) -> Result<Vec<u8>> {
    let mut r = open_reader(path)?;
    r.seek(SeekFrom::Start(offset))
        .with_context(|| format!("seeking to {offset}"))?;

    let mut out = Vec::new();
    r.take(len).read_to_end(&mut out).context("reading range")?;
    Ok(out)
}

/// Loads the seek table of `path` and summarizes it.
pub fn file_info(path: &Path) -> Result<FileInfo> {
    let r = open_reader(path)?;
    Ok(FileInfo {
        frames: r.frame_count(),
        decompressed_size: r.decompressed_size(),
        compressed_data_size: r.compressed_data_size(),
        table_size: r.table().serialized_size(),
    })
}
