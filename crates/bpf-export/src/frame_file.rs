// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Recorded frame files (.bpfx)
//!
//! # Format
//!
//! ```text
//! +---------------------------------------------------------+
//! |  Magic "BPFXFRM\0" (8) | Version (4)                     |
//! +---------------------------------------------------------+
//! |  timestamp_nanos (8) | source_id (4) | len (4) | bytes   |
//! |  ... one record per frame, until end of file             |
//! +---------------------------------------------------------+
//! ```
//!
//! All integers are little-endian. Frame bytes are stored verbatim, in the
//! producer's byte order.

use crate::decode::RawEvent;
use crate::error::FrameFileError;
use crate::stream::{EventSource, SourcePoll};
use crate::types::MAX_TYPE_SIZE;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use chrono::{TimeZone, Utc};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::time::Duration;

/// Magic bytes: "BPFXFRM\0"
pub const MAGIC: [u8; 8] = *b"BPFXFRM\0";

/// Current format version.
pub const FORMAT_VERSION: u32 = 1;

/// Largest frame a reader accepts.
pub const MAX_FRAME_LEN: u32 = MAX_TYPE_SIZE as u32;

/// Writes frames to a recorded frame file.
pub struct FrameWriter<W: Write> {
    writer: W,
    frames_written: u64,
}

impl FrameWriter<BufWriter<File>> {
    /// Create (or truncate) a frame file.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, FrameFileError> {
        let file = File::create(path)?;
        Self::new(BufWriter::new(file))
    }
}

impl<W: Write> FrameWriter<W> {
    /// Write the file header to `writer`.
    pub fn new(mut writer: W) -> Result<Self, FrameFileError> {
        writer.write_all(&MAGIC)?;
        writer.write_u32::<LittleEndian>(FORMAT_VERSION)?;
        Ok(Self {
            writer,
            frames_written: 0,
        })
    }

    /// Append one frame.
    pub fn write_frame(&mut self, raw: &RawEvent) -> Result<(), FrameFileError> {
        let len = u32::try_from(raw.bytes.len())
            .ok()
            .filter(|len| *len <= MAX_FRAME_LEN)
            .ok_or_else(|| {
                FrameFileError::InvalidFormat(format!(
                    "frame of {} bytes exceeds the {} byte limit",
                    raw.bytes.len(),
                    MAX_FRAME_LEN
                ))
            })?;
        let nanos = raw.received_at.timestamp_nanos_opt().unwrap_or(0).max(0) as u64;

        self.writer.write_u64::<LittleEndian>(nanos)?;
        self.writer.write_u32::<LittleEndian>(raw.source_id)?;
        self.writer.write_u32::<LittleEndian>(len)?;
        self.writer.write_all(&raw.bytes)?;
        self.frames_written += 1;
        Ok(())
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Flush and return the underlying writer.
    pub fn finish(mut self) -> Result<W, FrameFileError> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

/// Reads frames back from a recorded frame file.
pub struct FrameReader<R: Read> {
    reader: R,
    frames_read: u64,
    done: bool,
}

impl FrameReader<BufReader<File>> {
    /// Open a frame file and validate its header.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FrameFileError> {
        let file = File::open(path)?;
        Self::new(BufReader::new(file))
    }
}

impl<R: Read> FrameReader<R> {
    /// Read and validate the header from `reader`.
    pub fn new(mut reader: R) -> Result<Self, FrameFileError> {
        let mut magic = [0u8; 8];
        reader.read_exact(&mut magic).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => {
                FrameFileError::InvalidFormat("file too short for header".into())
            }
            _ => FrameFileError::Io(e),
        })?;
        if magic != MAGIC {
            return Err(FrameFileError::InvalidFormat("bad magic".into()));
        }
        let version = reader.read_u32::<LittleEndian>()?;
        if version != FORMAT_VERSION {
            return Err(FrameFileError::VersionMismatch {
                expected: FORMAT_VERSION,
                got: version,
            });
        }
        Ok(Self {
            reader,
            frames_read: 0,
            done: false,
        })
    }

    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// Next frame, or `None` at a clean end of file.
    pub fn next_frame(&mut self) -> Result<Option<RawEvent>, FrameFileError> {
        if self.done {
            return Ok(None);
        }

        let mut first = [0u8; 1];
        if read_some(&mut self.reader, &mut first)? == 0 {
            self.done = true;
            return Ok(None);
        }
        let mut rest = [0u8; 15];
        self.reader
            .read_exact(&mut rest)
            .map_err(|e| self.truncated(e))?;
        let mut header = [0u8; 16];
        header[0] = first[0];
        header[1..].copy_from_slice(&rest);

        let mut cursor = &header[..];
        let nanos = cursor.read_u64::<LittleEndian>()?;
        let source_id = cursor.read_u32::<LittleEndian>()?;
        let len = cursor.read_u32::<LittleEndian>()?;
        if len > MAX_FRAME_LEN {
            self.done = true;
            return Err(FrameFileError::InvalidFormat(format!(
                "frame {} declares {} bytes (limit {})",
                self.frames_read, len, MAX_FRAME_LEN
            )));
        }

        let mut bytes = vec![0u8; len as usize];
        self.reader
            .read_exact(&mut bytes)
            .map_err(|e| self.truncated(e))?;
        self.frames_read += 1;

        let received_at = Utc.timestamp_nanos(nanos.min(i64::MAX as u64) as i64);
        Ok(Some(
            RawEvent::new(bytes)
                .with_source(source_id)
                .with_timestamp(received_at),
        ))
    }

    fn truncated(&mut self, err: io::Error) -> FrameFileError {
        self.done = true;
        if err.kind() == io::ErrorKind::UnexpectedEof {
            FrameFileError::InvalidFormat(format!("frame {} is cut short", self.frames_read))
        } else {
            FrameFileError::Io(err)
        }
    }
}

fn read_some<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match reader.read(buf) {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}

impl<R: Read> Iterator for FrameReader<R> {
    type Item = Result<RawEvent, FrameFileError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_frame().transpose()
    }
}

impl<R: Read> EventSource for FrameReader<R> {
    fn poll(&mut self, _timeout: Duration) -> SourcePoll {
        match self.next_frame() {
            Ok(Some(raw)) => SourcePoll::Event(raw),
            Ok(None) => SourcePoll::Closed,
            Err(err) => {
                tracing::warn!(frames_read = self.frames_read, "Frame file unreadable: {}", err);
                SourcePoll::Closed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn sample(bytes: &[u8], source_id: u32) -> RawEvent {
        RawEvent::new(bytes.to_vec())
            .with_source(source_id)
            .with_timestamp(Utc.timestamp_nanos(1_700_000_000_123_456_789))
    }

    #[test]
    fn test_write_then_read_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("frames.bpfx");

        let mut writer = FrameWriter::create(&path).unwrap();
        writer.write_frame(&sample(b"abc", 1)).unwrap();
        writer.write_frame(&sample(b"", 2)).unwrap();
        assert_eq!(writer.frames_written(), 2);
        writer.finish().unwrap();

        let frames: Vec<_> = FrameReader::open(&path)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(frames, vec![sample(b"abc", 1), sample(b"", 2)]);
    }

    #[test]
    fn test_bad_magic_and_version() {
        let err = FrameReader::new(Cursor::new(b"NOTAFILE\x01\0\0\0".to_vec()))
            .err()
            .unwrap();
        assert!(matches!(err, FrameFileError::InvalidFormat(_)));

        let mut data = MAGIC.to_vec();
        data.extend_from_slice(&7u32.to_le_bytes());
        let err = FrameReader::new(Cursor::new(data)).err().unwrap();
        assert!(matches!(
            err,
            FrameFileError::VersionMismatch {
                expected: 1,
                got: 7
            }
        ));
    }

    #[test]
    fn test_cut_short_record() {
        let mut writer = FrameWriter::new(Vec::new()).unwrap();
        writer.write_frame(&sample(b"abcdef", 0)).unwrap();
        let mut data = writer.finish().unwrap();
        data.truncate(data.len() - 2);

        let mut reader = FrameReader::new(Cursor::new(data)).unwrap();
        let err = reader.next_frame().unwrap_err();
        assert!(err.to_string().contains("cut short"));
        assert!(reader.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_reader_as_source() {
        let mut writer = FrameWriter::new(Vec::new()).unwrap();
        writer.write_frame(&sample(b"xy", 4)).unwrap();
        let data = writer.finish().unwrap();

        let mut reader = FrameReader::new(Cursor::new(data)).unwrap();
        let timeout = Duration::from_millis(1);
        assert_eq!(reader.poll(timeout), SourcePoll::Event(sample(b"xy", 4)));
        assert_eq!(reader.poll(timeout), SourcePoll::Closed);
    }
}
