//! Nibble-packed tile grids
//!
//! Tiles are stored as a stream of 4-bit values, low nibble of each byte
//! first. A nibble of 0xF is an escape: the tile value is `0xF` in its low
//! four bits and the following nibble in its high four bits. Decoding keeps a
//! little-endian bit buffer and refills it one byte at a time.
//!
//! The simpler games store exactly two tiles per byte with no escapes; see
//! [`NibbleOrder`] and [`unpack_pair`].

use log::debug;
use serde::Serialize;

use super::TileGrid;
use crate::error::{CodecError, Result};

const ESCAPE: u8 = 0x0f;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct GridConfig {
    pub width: usize,
    pub height: usize,
    /// Bytes reserved for one packed level
    pub allotment: usize,
}

impl GridConfig {
    pub const fn new(width: usize, height: usize, allotment: usize) -> Self {
        GridConfig {
            width,
            height,
            allotment,
        }
    }
}

/// True if `value` survives an encode/decode cycle.
///
/// Values below 0x10 other than 0xF take one nibble; anything with a low
/// nibble of 0xF takes two. Other values cannot be expressed.
pub fn is_encodable(value: u8) -> bool {
    value < 0x10 || value & 0x0f == ESCAPE
}

/// Decode one packed level. `data` must be exactly `config.allotment` long.
pub fn decode_grid(data: &[u8], config: &GridConfig) -> Result<TileGrid> {
    if data.len() != config.allotment {
        return Err(CodecError::size_mismatch(
            "packed level",
            config.allotment,
            data.len(),
        ));
    }

    let mut cells = Vec::with_capacity(config.width * config.height);
    let mut pos = 0;
    let mut current: u32 = 0;
    let mut offset = 0;
    let mut read_more = false;

    for row in 0..config.height {
        let mut column = 0;

        while column < config.width {
            if offset < 4 || read_more {
                let byte = *data.get(pos).ok_or_else(|| {
                    CodecError::MalformedStream(format!(
                        "nibble stream ends at row {} column {}{}",
                        row,
                        column,
                        if read_more { " inside an escape" } else { "" }
                    ))
                })?;
                current |= (byte as u32) << offset;
                pos += 1;
                offset += 8;
            }

            while offset >= 4 && column < config.width {
                let mut value = (current & 0x0f) as u8;

                if value == ESCAPE && offset == 4 {
                    // The high nibble is still in the next byte
                    read_more = true;
                    break;
                }

                if value == ESCAPE {
                    current >>= 4;
                    offset -= 4;
                    value |= ((current & 0x0f) as u8) << 4;
                    read_more = false;
                }

                current >>= 4;
                offset -= 4;
                cells.push(value);
                column += 1;
            }
        }
    }

    debug!(
        "decoded {}x{} nibble grid from {:#x} of {:#x} bytes",
        config.width, config.height, pos, config.allotment
    );

    TileGrid::from_cells(config.width, config.height, cells)
}

/// Pack a grid into exactly `config.allotment` bytes, zero padded.
///
/// `level` only identifies the level in an overflow error.
pub fn encode_grid(grid: &TileGrid, config: &GridConfig, level: usize) -> Result<Vec<u8>> {
    if grid.width() != config.width || grid.height() != config.height {
        return Err(CodecError::size_mismatch(
            format!("level {} grid", level),
            config.width * config.height,
            grid.width() * grid.height(),
        ));
    }

    let mut packed = Vec::with_capacity(config.allotment);
    let mut current: u32 = 0;
    let mut offset = 0;

    for &value in grid.cells() {
        if !is_encodable(value) {
            return Err(CodecError::UnencodableValue { value });
        }

        current |= ((value & 0x0f) as u32) << offset;
        offset += 4;

        if value & 0x0f == ESCAPE {
            current |= ((value >> 4) as u32) << offset;
            offset += 4;
        }

        while offset >= 8 {
            packed.push((current & 0xff) as u8);
            current >>= 8;
            offset -= 8;
        }
    }

    // A final lone nibble still needs its byte
    if offset > 0 {
        packed.push((current & 0xff) as u8);
    }

    if packed.len() > config.allotment {
        return Err(CodecError::EncodingOverflow {
            level,
            size: packed.len(),
            limit: config.allotment,
        });
    }

    packed.resize(config.allotment, 0);
    Ok(packed)
}

/// Which nibble of a byte holds the first of its two tiles
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NibbleOrder {
    LowFirst,
    HighFirst,
}

pub fn unpack_pair(byte: u8, order: NibbleOrder) -> [u8; 2] {
    let (low, high) = (byte & 0x0f, byte >> 4);
    match order {
        NibbleOrder::LowFirst => [low, high],
        NibbleOrder::HighFirst => [high, low],
    }
}

pub fn pack_pair(first: u8, second: u8, order: NibbleOrder) -> Result<u8> {
    for value in [first, second] {
        if value > 0x0f {
            return Err(CodecError::UnencodableValue { value });
        }
    }
    Ok(match order {
        NibbleOrder::LowFirst => first | (second << 4),
        NibbleOrder::HighFirst => (first << 4) | second,
    })
}
