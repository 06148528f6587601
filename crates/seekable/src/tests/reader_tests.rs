use super::*;
use crate::reader::resolve_relative;
use crate::{BlockCodec, SeekableError, SeekableReader, ZstdCodec};
use proptest::prelude::*;
use seektable::{encode_table, Table, TableEntry};
use std::io::{Cursor, Read, Seek, SeekFrom};
use tempfile::tempdir;

fn open(stream: Vec<u8>) -> SeekableReader<Cursor<Vec<u8>>> {
    SeekableReader::new(Cursor::new(stream)).unwrap()
}

fn read_all<R: Read>(r: &mut R) -> Vec<u8> {
    let mut out = Vec::new();
    r.read_to_end(&mut out).unwrap();
    out
}

// -------------------- Sequential reads --------------------

#[test]
fn sequential_read_reproduces_input() {
    let data = sample_data(123_457);
    for frame_size in [1000, 4096, 123_457, 1_000_000] {
        let mut r = open(compress(&data, frame_size));
        assert_eq!(r.decompressed_size(), data.len() as u64);
        assert_eq!(read_all(&mut r), data, "frame_size {frame_size}");
    }
}

#[test]
fn tiny_frames_roundtrip() {
    let data = b"seekable frames of one byte each".to_vec();
    let mut r = open(compress(&data, 1));
    assert_eq!(r.frame_count(), data.len());
    assert_eq!(read_all(&mut r), data);
}

#[test]
fn small_buffers_cross_frame_boundaries() {
    let data = sample_data(1000);
    let mut r = open(compress(&data, 64));
    let mut out = Vec::new();
    let mut buf = [0u8; 7];
    loop {
        let n = r.read(&mut buf).unwrap();
        if n == 0 {
            break;
        }
        out.extend_from_slice(&buf[..n]);
    }
    assert_eq!(out, data);
    // End of data stays end of data.
    assert_eq!(r.read(&mut buf).unwrap(), 0);
}

#[test]
fn empty_buffer_reads_nothing() {
    let mut r = open(compress(b"abc", 2));
    assert_eq!(r.read(&mut []).unwrap(), 0);
    assert_eq!(r.position(), 0);
}

#[test]
fn reads_from_file_on_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("data.zst");
    let data = sample_data(300_000);
    std::fs::write(&path, compress(&data, 65_536)).unwrap();

    let f = std::fs::File::open(&path).unwrap();
    let mut r = SeekableReader::new(std::io::BufReader::new(f)).unwrap();
    r.seek(SeekFrom::Start(200_000)).unwrap();
    let mut buf = vec![0u8; 1000];
    r.read_exact(&mut buf).unwrap();
    assert_eq!(buf, &data[200_000..201_000]);
}

// -------------------- Seeking --------------------

#[test]
fn seek_to_every_offset_then_read_suffix() {
    let data = sample_data(200);
    let mut r = open(compress(&data, 7));
    for o in 0..=data.len() {
        assert_eq!(r.seek(SeekFrom::Start(o as u64)).unwrap(), o as u64);
        assert_eq!(read_all(&mut r), &data[o..], "offset {o}");
    }
}

#[test]
fn seek_relative_to_current_and_end() {
    let data = sample_data(10_000);
    let mut r = open(compress(&data, 1000));

    assert_eq!(r.seek(SeekFrom::End(-3)).unwrap(), 9_997);
    assert_eq!(read_all(&mut r), &data[9_997..]);

    r.seek(SeekFrom::Start(5_000)).unwrap();
    assert_eq!(r.seek(SeekFrom::Current(-1_500)).unwrap(), 3_500);
    assert_eq!(r.seek(SeekFrom::Current(250)).unwrap(), 3_750);
    let mut buf = [0u8; 10];
    r.read_exact(&mut buf).unwrap();
    assert_eq!(&buf, &data[3_750..3_760]);
}

#[test]
fn current_zero_always_reports_position() {
    let data = sample_data(500);
    let mut r = open(compress(&data, 100));
    assert_eq!(r.seek(SeekFrom::Current(0)).unwrap(), 0);
    read_all(&mut r);
    assert_eq!(r.seek(SeekFrom::Current(0)).unwrap(), 500);
    assert_eq!(r.stream_position().unwrap(), 500);
}

#[test]
fn seek_to_end_then_read_is_eof() {
    let data = sample_data(500);
    let mut r = open(compress(&data, 100));
    assert_eq!(r.seek(SeekFrom::End(0)).unwrap(), 500);
    assert!(read_all(&mut r).is_empty());

    let mut empty = open(compress(&[], 100));
    assert_eq!(empty.seek(SeekFrom::Start(0)).unwrap(), 0);
    assert!(read_all(&mut empty).is_empty());
}

#[test]
fn out_of_range_seeks_are_rejected() {
    let mut r = open(compress(&sample_data(500), 100));
    r.seek(SeekFrom::Start(10)).unwrap();

    let err = r.seek(SeekFrom::Start(501)).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
    assert!(r.seek(SeekFrom::Current(-11)).is_err());
    assert!(r.seek(SeekFrom::End(-501)).is_err());
    assert!(r.seek(SeekFrom::End(1)).is_err());

    // Failed seeks leave the position alone.
    assert_eq!(r.position(), 10);
}

#[test]
fn seek_within_loaded_frame_does_not_decode_again() {
    let data = sample_data(100);
    let codec = IdentityCodec::default();
    let decodes = codec.decodes.clone();
    let mut r = SeekableReader::with_codec(Cursor::new(store(&data, 10)), codec).unwrap();

    let mut b = [0u8; 1];
    r.read_exact(&mut b).unwrap();
    assert_eq!(decodes.get(), 1);

    r.seek(SeekFrom::Start(6)).unwrap();
    r.read_exact(&mut b).unwrap();
    assert_eq!(b[0], data[6]);
    assert_eq!(decodes.get(), 1);

    r.seek(SeekFrom::Start(2)).unwrap();
    r.read_exact(&mut b).unwrap();
    assert_eq!(b[0], data[2]);
    assert_eq!(decodes.get(), 1);

    r.seek(SeekFrom::Start(55)).unwrap();
    assert_eq!(decodes.get(), 1, "seeking alone never decodes");
    r.read_exact(&mut b).unwrap();
    assert_eq!(b[0], data[55]);
    assert_eq!(decodes.get(), 2);
}

#[test]
fn upward_overflow_is_out_of_range() {
    assert!(matches!(
        resolve_relative(u64::MAX - 1, 5, 10),
        Err(SeekableError::OutOfRange { size: 10, .. })
    ));
    assert!(matches!(
        resolve_relative(3, -4, 10),
        Err(SeekableError::NegativeOffset)
    ));
    assert_eq!(resolve_relative(3, 4, 10).unwrap(), 7);

    let mut r = open(compress(&sample_data(500), 100));
    r.seek(SeekFrom::Start(10)).unwrap();
    let err = r.seek(SeekFrom::Current(i64::MAX)).unwrap_err();
    let inner = err.into_inner().unwrap().downcast::<SeekableError>().unwrap();
    assert!(matches!(*inner, SeekableError::OutOfRange { .. }));
}

// -------------------- Construction checks --------------------

#[test]
fn sizes_are_reported() {
    let data = sample_data(10_000);
    let stream = compress(&data, 1000);
    let len = stream.len() as u64;
    let r = open(stream);
    assert_eq!(r.frame_count(), 10);
    assert_eq!(r.decompressed_size(), 10_000);
    assert_eq!(r.compressed_data_size(), len - r.table().serialized_size() as u64);
    assert_eq!(r.table().total_compressed_size(), r.compressed_data_size());
}

#[test]
fn truncated_frames_are_detected() {
    let mut stream = compress(&sample_data(10_000), 1000);
    stream.drain(..5);
    let err = SeekableReader::new(Cursor::new(stream)).err().unwrap();
    assert!(matches!(err, SeekableError::InconsistentTable { .. }));
}

#[test]
fn padding_before_table_is_tolerated() {
    let data = sample_data(5_000);
    let stream = compress(&data, 1000);
    let table_len = seektable::read_table(&mut Cursor::new(&stream))
        .unwrap()
        .serialized_size();
    let (frames, table) = stream.split_at(stream.len() - table_len);

    let mut padded = frames.to_vec();
    padded.extend_from_slice(&[0u8; 64]);
    padded.extend_from_slice(table);

    let mut r = open(padded);
    assert_eq!(r.compressed_data_size(), frames.len() as u64 + 64);
    assert_eq!(read_all(&mut r), data);
}

#[test]
fn missing_seek_table_is_a_format_error() {
    let data = sample_data(1000);
    let plain = zstd::encode_all(&data[..], 3).unwrap();
    let err = SeekableReader::new(Cursor::new(plain)).err().unwrap();
    match err {
        SeekableError::Table(inner) => assert!(inner.is_format_error()),
        other => panic!("expected table error, got {other:?}"),
    }
}

#[test]
fn corrupt_frame_fails_to_decode() {
    let data = sample_data(5_000);
    let mut stream = compress(&data, 1000);
    // Clobber the magic of the first zstd frame.
    stream[0] ^= 0xFF;
    let mut r = open(stream);
    let mut buf = [0u8; 16];
    let err = r.read(&mut buf).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
}

#[test]
fn frame_decoding_to_wrong_length_is_rejected() {
    let mut table = Table::new();
    table.append_entry(TableEntry::new(6, 5));
    let mut stream = b"abcdef".to_vec();
    stream.extend_from_slice(&encode_table(&table).unwrap());

    let mut r = SeekableReader::with_codec(Cursor::new(stream), IdentityCodec::default()).unwrap();
    let err = r.read(&mut [0u8; 4]).unwrap_err();
    let inner = err.into_inner().unwrap().downcast::<SeekableError>().unwrap();
    assert!(matches!(
        *inner,
        SeekableError::FrameSizeMismatch {
            index: 0,
            expected: 5,
            actual: 6
        }
    ));
}

#[test]
fn oversized_table_entry_is_rejected_without_huge_allocation() {
    let mut frame = Vec::new();
    ZstdCodec::new(3).unwrap().encode(b"hello world", &mut frame).unwrap();

    let mut table = Table::new();
    table.append_entry(TableEntry::new(frame.len() as u32, u32::MAX));
    let mut stream = frame;
    stream.extend_from_slice(&encode_table(&table).unwrap());

    let mut r = open(stream);
    let err = r.read(&mut [0u8; 4]).unwrap_err();
    let inner = err.into_inner().unwrap().downcast::<SeekableError>().unwrap();
    assert!(matches!(
        *inner,
        SeekableError::FrameSizeMismatch {
            index: 0,
            expected: u32::MAX,
            actual: 11
        }
    ));
}

// -------------------- Close --------------------

#[test]
fn read_after_close_fails_and_close_is_idempotent() {
    let mut r = open(compress(&sample_data(100), 10));
    r.close();
    r.close();
    assert!(r.read(&mut [0u8; 4]).is_err());
    let inner = r.into_inner();
    assert!(!inner.get_ref().is_empty());
}

// -------------------- Properties --------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn roundtrip_any_data_any_frame_size(
        data in proptest::collection::vec(any::<u8>(), 0..4096),
        frame_size in 1usize..600,
        chunk in 1usize..900,
    ) {
        let mut w = SeekableWriter::new(Vec::new(), frame_size).unwrap();
        for c in data.chunks(chunk) {
            w.append(c).unwrap();
        }
        let stream = w.finish().unwrap();
        prop_assert_eq!(&stream, &compress(&data, frame_size));

        let mut r = SeekableReader::new(Cursor::new(stream)).unwrap();
        let expected_frames = data.len().div_ceil(frame_size);
        prop_assert_eq!(r.frame_count(), expected_frames);
        prop_assert_eq!(read_all(&mut r), data);
    }

    #[test]
    fn seek_then_read_returns_suffix(
        data in proptest::collection::vec(any::<u8>(), 0..2048),
        frame_size in 1usize..300,
        raw_offset in any::<usize>(),
    ) {
        let offset = raw_offset % (data.len() + 1);
        let mut r = SeekableReader::with_codec(
            Cursor::new(store(&data, frame_size)),
            IdentityCodec::default(),
        ).unwrap();
        prop_assert_eq!(r.seek(SeekFrom::Start(offset as u64)).unwrap(), offset as u64);
        prop_assert_eq!(read_all(&mut r), &data[offset..]);
    }
}
