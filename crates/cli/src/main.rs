//! # CLI - seekz interactive shell
//!
//! A REPL-style front end for seekable zstd files. Reads commands from stdin,
//! runs them, and prints results to stdout. Works interactively or with
//! commands piped through stdin.
//!
//! ## Commands
//!
//! ```text
//! COMPRESS in out        Compress a file into a seekable stream
//! DECOMPRESS in out      Decompress a whole seekable stream
//! READ file offset len   Print len decompressed bytes starting at offset
//! INFO file              Print frame count and sizes
//! EXIT / QUIT            Quit
//! ```
//!
//! ## Configuration
//!
//! ```text
//! SEEKZ_FRAME_SIZE   decompressed bytes per frame   (default: 1048576)
//! SEEKZ_LEVEL        zstd compression level         (default: 3)
//! SEEKZ_LOG          tracing filter, logs to stderr (default: "warn")
//! ```
//!
//! ## Example
//!
//! ```text
//! $ SEEKZ_FRAME_SIZE=65536 cargo run -p seekz-cli
//! seekz started (frame_size=65536, level=3)
//! > COMPRESS access.log access.log.zst
//! OK (frames=18, in=1150000, out=204113)
//! > READ access.log.zst 1000000 12
//! GET /index.h
//! > EXIT
//! bye
//! ```

mod commands;

use anyhow::{anyhow, Context, Result};
use config::Config;
use std::io::{self, BufRead, Write};
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// What the loop does after a command.
#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

fn init_logging(filter: &str) -> Result<()> {
    let filter = EnvFilter::try_new(filter).with_context(|| format!("bad log filter {filter:?}"))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
    Ok(())
}

fn parse_u64(s: Option<&str>, what: &str) -> Result<u64> {
    let s = s.ok_or_else(|| anyhow!("missing {what}"))?;
    s.parse().with_context(|| format!("{what} {s:?} is not a number"))
}

/// Runs one command line, writing its output to `out`.
fn dispatch(line: &str, cfg: &Config, out: &mut impl Write) -> io::Result<Flow> {
    let mut parts = line.split_whitespace();
    let Some(cmd) = parts.next() else {
        return Ok(Flow::Continue);
    };

    match cmd.to_uppercase().as_str() {
        "COMPRESS" => match (parts.next(), parts.next()) {
            (Some(input), Some(output)) => {
                match commands::compress_file(Path::new(input), Path::new(output), cfg) {
                    Ok(s) => writeln!(
                        out,
                        "OK (frames={}, in={}, out={})",
                        s.frames, s.input_bytes, s.output_bytes
                    )?,
                    Err(e) => writeln!(out, "ERR compress failed: {e:#}")?,
                }
            }
            _ => writeln!(out, "ERR usage: COMPRESS in out")?,
        },
        "DECOMPRESS" => match (parts.next(), parts.next()) {
            (Some(input), Some(output)) => {
                match commands::decompress_file(Path::new(input), Path::new(output)) {
                    Ok(n) => writeln!(out, "OK ({n} bytes)")?,
                    Err(e) => writeln!(out, "ERR decompress failed: {e:#}")?,
                }
            }
            _ => writeln!(out, "ERR usage: DECOMPRESS in out")?,
        },
        "READ" => {
            let Some(file) = parts.next() else {
                writeln!(out, "ERR usage: READ file offset len")?;
                return Ok(Flow::Continue);
            };
            let res = parse_u64(parts.next(), "offset").and_then(|offset| {
                let len = parse_u64(parts.next(), "len")?;
                commands::read_range(Path::new(file), offset, len)
            });
            match res {
                Ok(bytes) => writeln!(out, "{}", String::from_utf8_lossy(&bytes))?,
                Err(e) => writeln!(out, "ERR read failed: {e:#}")?,
            }
        }
        "INFO" => match parts.next() {
            Some(file) => match commands::file_info(Path::new(file)) {
                Ok(i) => writeln!(
                    out,
                    "frames={} decompressed={} compressed={} table={}",
                    i.frames, i.decompressed_size, i.compressed_data_size, i.table_size
                )?,
                Err(e) => writeln!(out, "ERR info failed: {e:#}")?,
            },
            None => writeln!(out, "ERR usage: INFO file")?,
        },
        "EXIT" | "QUIT" => {
            writeln!(out, "bye")?;
            return Ok(Flow::Exit);
        }
        other => writeln!(out, "unknown command: {other}")?,
    }

    Ok(Flow::Continue)
}

fn main() -> Result<()> {
    let cfg = Config::from_env()?;
    init_logging(&cfg.log_filter)?;

    println!(
        "seekz started (frame_size={}, level={})",
        cfg.frame_size, cfg.level
    );
    println!("Commands: COMPRESS in out | DECOMPRESS in out | READ file offset len");
    println!("          INFO file | EXIT");
    print!("> ");
    io::stdout().flush().ok();

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = line?;
        if dispatch(&line, &cfg, &mut stdout)? == Flow::Exit {
            break;
        }
        print!("> ");
        stdout.flush().ok();
    }

    Ok(())
}
