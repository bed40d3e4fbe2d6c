// src/frame.rs
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Packs a grid's entity layer into the 2-bit-per-cell wire format consumed
//! by external viewers, and writes it out frame by frame.
//!
//! Layout: a 16-byte header (`width: u32`, `height: u32`,
//! `bytes_per_frame: u64`, all little-endian) precedes only the first
//! frame. Every frame after that follows immediately, with no per-frame
//! header. Cells are packed 4 to a byte, row-major, least-significant pair
//! first; `11` is reserved and this writer never emits it.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::cell::entity_code;
use crate::error::Result;
use crate::grid::Grid;

const HEADER_LEN: usize = 16;
const CELLS_PER_BYTE: usize = 4;

/// Number of packed bytes one frame of a `width`x`height` grid occupies.
pub fn bytes_per_frame(width: usize, height: usize) -> u64 {
    let cells = (width * height) as u64;
    cells.div_ceil(CELLS_PER_BYTE as u64)
}

fn header_bytes(width: u32, height: u32) -> [u8; HEADER_LEN] {
    let mut buf = [0u8; HEADER_LEN];
    buf[0..4].copy_from_slice(&width.to_le_bytes());
    buf[4..8].copy_from_slice(&height.to_le_bytes());
    buf[8..16].copy_from_slice(&bytes_per_frame(width as usize, height as usize).to_le_bytes());
    buf
}

/// Packs `grid`'s current entity layer, row-major, 4 cells per byte.
pub fn encode_frame(grid: &Grid) -> Vec<u8> {
    let width = grid.width();
    let height = grid.height();
    let mut out = vec![0u8; bytes_per_frame(width, height) as usize];

    let mut cell_index = 0usize;
    for y in 0..height {
        for x in 0..width {
            let code = entity_code(grid.cell(y, x).entity());
            let byte_index = cell_index / CELLS_PER_BYTE;
            let shift = (cell_index % CELLS_PER_BYTE) * 2;
            out[byte_index] |= code << shift;
            cell_index += 1;
        }
    }
    out
}

/// Destination for a simulation's encoded frames.
pub trait FrameSink {
    fn write_header(&mut self, width: u32, height: u32) -> Result<()>;
    fn write_frame(&mut self, frame: &[u8]) -> Result<()>;
    fn flush(&mut self) -> Result<()>;
}

/// A `FrameSink` backed by a buffered file handle.
///
/// `BufWriter` is the same buffering strategy the teacher's data generator
/// uses for its output stream; frame writes here are on the hot per-chronon
/// path, so unbuffered syscalls per frame would dominate runtime on small
/// grids.
pub struct FileFrameSink {
    writer: BufWriter<File>,
    header_written: bool,
}

impl FileFrameSink {
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(FileFrameSink {
            writer: BufWriter::new(file),
            header_written: false,
        })
    }
}

impl FrameSink for FileFrameSink {
    fn write_header(&mut self, width: u32, height: u32) -> Result<()> {
        if !self.header_written {
            self.writer.write_all(&header_bytes(width, height))?;
            self.header_written = true;
        }
        Ok(())
    }

    fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
        self.writer.write_all(frame)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// An in-memory sink, used by tests and by `--output /dev/null`-style runs
/// that still want frame content to assert against.
#[derive(Debug, Default)]
pub struct MemoryFrameSink {
    pub header: Option<(u32, u32)>,
    pub frames: Vec<Vec<u8>>,
}

impl FrameSink for MemoryFrameSink {
    fn write_header(&mut self, width: u32, height: u32) -> Result<()> {
        if self.header.is_none() {
            self.header = Some((width, height));
        }
        Ok(())
    }

    fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
        self.frames.push(frame.to_vec());
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}
