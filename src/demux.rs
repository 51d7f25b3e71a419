// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Splits a decoder's raw I420 output into frames.
//!
//! Every frame is reassembled into one buffer holding the luma plane, then
//! the U plane, then the V plane. Hashes are always computed over that
//! canonical layout.

use std::io;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;

use crate::manifest::TestVector;
use crate::Resolution;
use crate::Result;
use crate::VerifyError;

/// Upper bound on the buffer reserved before a frame's bytes arrive. Larger
/// frames grow as they are read.
const MAX_PREALLOC: usize = 16 << 20;

/// One reassembled frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    index: u32,
    luma_len: usize,
    chroma_len: usize,
    data: Vec<u8>,
}

impl Frame {
    /// Wraps `data`, which must hold exactly one frame in Y, U, V order.
    pub fn from_planar(index: u32, resolution: Resolution, data: Vec<u8>) -> Option<Self> {
        if data.len() != resolution.frame_len()? {
            return None;
        }
        Some(Self {
            index,
            luma_len: resolution.luma_len()?,
            chroma_len: resolution.chroma_len()?,
            data,
        })
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn y(&self) -> &[u8] {
        &self.data[..self.luma_len]
    }

    pub fn u(&self) -> &[u8] {
        &self.data[self.luma_len..self.luma_len + self.chroma_len]
    }

    pub fn v(&self) -> &[u8] {
        &self.data[self.luma_len + self.chroma_len..]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

/// Yields exactly `frame_count` frames from a raw planar stream.
///
/// A stream that ends early produces a single `StreamTruncated` error for the
/// incomplete frame, after which the iterator is exhausted.
pub struct FrameDemuxer<R> {
    reader: R,
    vector: String,
    resolution: Resolution,
    frame_count: u32,
    next_frame: u32,
    failed: bool,
}

impl<R: Read> FrameDemuxer<R> {
    pub fn new(reader: R, vector: impl Into<String>, frame_count: u32, resolution: Resolution) -> Self {
        Self {
            reader,
            vector: vector.into(),
            resolution,
            frame_count,
            next_frame: 0,
            failed: false,
        }
    }

    pub fn for_vector(reader: R, vector: &TestVector) -> Self {
        Self::new(reader, vector.name.clone(), vector.frame_count, vector.resolution)
    }

    fn read_frame(&mut self) -> Result<Frame> {
        let index = self.next_frame;
        let (Some(frame_len), Some(luma_len), Some(chroma_len)) = (
            self.resolution.frame_len(),
            self.resolution.luma_len(),
            self.resolution.chroma_len(),
        ) else {
            return Err(VerifyError::frame_too_large(self.vector.as_str(), self.resolution));
        };

        let mut data = Vec::with_capacity(frame_len.min(MAX_PREALLOC));
        for plane_len in [luma_len, chroma_len, chroma_len] {
            let read = self.reader.by_ref().take(plane_len as u64).read_to_end(&mut data);
            match read {
                Ok(read) if read == plane_len => {}
                Ok(_) => {
                    return Err(VerifyError::StreamTruncated { vector: self.vector.clone(), frame: index })
                }
                Err(err) => return Err(self.read_error(index, err)),
            }
        }
        Ok(Frame { index, luma_len, chroma_len, data })
    }

    fn read_error(&self, frame: u32, err: io::Error) -> VerifyError {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            VerifyError::StreamTruncated { vector: self.vector.clone(), frame }
        } else {
            VerifyError::io(format!("reading frame {} of {}", frame, self.vector), err)
        }
    }

    /// Drains the stream and returns how many bytes follow the last
    /// declared frame. Only meaningful once every frame has been read.
    pub fn trailing_bytes(&mut self) -> Result<u64> {
        io::copy(&mut self.reader, &mut io::sink())
            .map_err(|err| VerifyError::io(format!("draining output of {}", self.vector), err))
    }
}

impl<R: Read + Seek> FrameDemuxer<R> {
    /// Restarts the sequence at frame 0.
    pub fn rewind(&mut self) -> Result<()> {
        self.reader
            .seek(SeekFrom::Start(0))
            .map_err(|err| VerifyError::io(format!("rewinding output of {}", self.vector), err))?;
        self.next_frame = 0;
        self.failed = false;
        Ok(())
    }
}

impl<R: Read> Iterator for FrameDemuxer<R> {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.next_frame >= self.frame_count {
            return None;
        }
        let frame = self.read_frame();
        match frame {
            Ok(_) => self.next_frame += 1,
            Err(_) => self.failed = true,
        }
        Some(frame)
    }
}
