//! Packed pixel byte decoding
//!
//! Acorn screen memory packs several pixels into each byte with the bits of
//! one pixel spread across the byte. In the four colour modes pixel 0 (the
//! leftmost) is made from bits 3 and 7, pixel 3 from bits 0 and 4. In the
//! sixteen colour mode each byte holds two pixels built from alternating
//! bits, and the games draw each of them two screen pixels wide.

use serde::Serialize;

use crate::error::{CodecError, Result};

/// Pixels produced from one source byte, left to right
pub const PIXELS_PER_BYTE: usize = 4;

/// Rows in a standard character block
pub const BLOCK_ROWS: usize = 8;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum PixelFormat {
    /// Two bits per pixel, colours 0-3
    #[default]
    FourColour,
    /// Four bits per pixel, colours 0-15, each pixel doubled horizontally
    SixteenColour,
}

impl PixelFormat {
    pub fn decode(self, byte: u8) -> [u8; PIXELS_PER_BYTE] {
        match self {
            PixelFormat::FourColour => decode_four_colour(byte),
            PixelFormat::SixteenColour => decode_sixteen_colour(byte),
        }
    }
}

/// Split a byte into four 2-bit pixels.
///
/// Each extraction pairs bit 0 (low plane) with bit 4 (high plane) and then
/// shifts the byte right; the four values come out right to left, so they
/// are reversed at the end.
pub fn decode_four_colour(byte: u8) -> [u8; PIXELS_PER_BYTE] {
    let mut pixels = [0u8; PIXELS_PER_BYTE];
    let mut value = byte;

    for pixel in pixels.iter_mut() {
        *pixel = (value & 0x01) | (((value >> 4) & 0x01) << 1);
        value >>= 1;
    }

    pixels.reverse();
    pixels
}

/// Split a byte into two 4-bit pixels, each emitted twice.
pub fn decode_sixteen_colour(byte: u8) -> [u8; PIXELS_PER_BYTE] {
    let left = pack_alternate_bits((byte >> 1) & 0x55);
    let right = pack_alternate_bits(byte & 0x55);
    [left, left, right, right]
}

/// Gather bits 0, 2, 4 and 6 into a colour number 0-15
fn pack_alternate_bits(masked: u8) -> u8 {
    (masked & 0x01)
        | ((masked >> 1) & 0x02)
        | ((masked >> 2) & 0x04)
        | ((masked >> 3) & 0x08)
}

/// Decode `rows` bytes starting at `offset`, `stride` bytes apart.
///
/// Most games store the rows of a block contiguously (stride 1), but some
/// interleave several columns or lay a sprite out across screen lines.
pub fn decode_block(
    data: &[u8],
    offset: usize,
    rows: usize,
    stride: usize,
    format: PixelFormat,
) -> Result<Vec<[u8; PIXELS_PER_BYTE]>> {
    if rows == 0 {
        return Ok(Vec::new());
    }

    let last = offset + (rows - 1) * stride;
    if last >= data.len() {
        return Err(CodecError::OutOfBounds {
            offset: last,
            len: data.len(),
        });
    }

    Ok((0..rows)
        .map(|row| format.decode(data[offset + row * stride]))
        .collect())
}
