//! Sprite assembly from offset-addressed blocks
//!
//! A sprite is a grid of blocks, each block `PIXELS_PER_BYTE` pixels wide
//! and `block_height` rows tall. Offset tables list the blocks row by row,
//! so entry `i` lands in block column `i % columns`. Equivalently, every
//! `columns`-th entry forms one pixel column group stacked top to bottom.

use log::trace;
use serde::Serialize;

use super::bitplane::{decode_block, PixelFormat, BLOCK_ROWS, PIXELS_PER_BYTE};
use super::SpriteImage;
use crate::error::{CodecError, Result};

/// Block offset within the source buffer; `None` draws a blank block
pub type BlockOffset = Option<usize>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct BlockLayout {
    /// Blocks per sprite row
    pub columns: usize,
    /// Source bytes (pixel rows) per block
    pub block_height: usize,
    /// Distance in bytes between consecutive rows of a block
    pub row_stride: usize,
    pub format: PixelFormat,
}

impl BlockLayout {
    pub const fn columns(columns: usize) -> Self {
        BlockLayout {
            columns,
            block_height: BLOCK_ROWS,
            row_stride: 1,
            format: PixelFormat::FourColour,
        }
    }

    pub const fn with_block_height(mut self, block_height: usize) -> Self {
        self.block_height = block_height;
        self
    }

    pub const fn with_row_stride(mut self, row_stride: usize) -> Self {
        self.row_stride = row_stride;
        self
    }

    pub const fn with_format(mut self, format: PixelFormat) -> Self {
        self.format = format;
        self
    }

    pub fn sprite_width(&self) -> usize {
        self.columns * PIXELS_PER_BYTE
    }

    pub fn sprite_height(&self, block_count: usize) -> usize {
        (block_count / self.columns.max(1)) * self.block_height
    }
}

/// Build one sprite from its block offsets.
pub fn assemble_sprite(
    data: &[u8],
    offsets: &[BlockOffset],
    layout: &BlockLayout,
) -> Result<SpriteImage> {
    if layout.columns == 0 || offsets.len() % layout.columns != 0 {
        return Err(CodecError::InvalidLayout(format!(
            "{} block offsets do not fill rows of {} columns",
            offsets.len(),
            layout.columns
        )));
    }

    let width = layout.sprite_width();
    let height = layout.sprite_height(offsets.len());
    let mut pixels = vec![0u8; width * height];

    for (index, offset) in offsets.iter().enumerate() {
        let Some(offset) = *offset else {
            // Already zero
            continue;
        };

        let block = decode_block(
            data,
            offset,
            layout.block_height,
            layout.row_stride,
            layout.format,
        )?;

        let x0 = (index % layout.columns) * PIXELS_PER_BYTE;
        let y0 = (index / layout.columns) * layout.block_height;

        for (row, row_pixels) in block.iter().enumerate() {
            let start = (y0 + row) * width + x0;
            pixels[start..start + PIXELS_PER_BYTE].copy_from_slice(row_pixels);
        }
    }

    trace!(
        "assembled {}x{} sprite from {} blocks",
        width,
        height,
        offsets.len()
    );

    Ok(SpriteImage::new(width, height, pixels))
}

/// Wrap a table of plain offsets, for games with no blank blocks
pub fn present(offsets: &[usize]) -> Vec<BlockOffset> {
    offsets.iter().copied().map(Some).collect()
}

/// Offsets for a sprite stored as `rows` x `columns` contiguous blocks,
/// where each block row starts `row_step` bytes after the previous one.
pub fn grid_offsets(base: usize, rows: usize, columns: usize, row_step: usize) -> Vec<BlockOffset> {
    (0..rows)
        .flat_map(|row| {
            (0..columns).map(move |column| Some(base + row * row_step + column * BLOCK_ROWS))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 64 bytes: four distinct solid blocks
    fn four_blocks() -> Vec<u8> {
        let mut data = Vec::new();
        // colours 0, 1, 2, 3 as full bytes
        for byte in [0x00u8, 0x0f, 0xf0, 0xff] {
            data.extend(std::iter::repeat(byte).take(8));
        }
        data.extend(std::iter::repeat(0x00).take(32));
        data
    }

    #[test]
    fn double_width_pairs_stack_left_and_right() {
        let data = four_blocks();
        let offsets = present(&[0x08, 0x10, 0x18, 0x00]);
        let sprite = assemble_sprite(&data, &offsets, &BlockLayout::columns(2)).unwrap();

        assert_eq!((sprite.width, sprite.height), (8, 16));
        assert_eq!(sprite.pixel(0, 0), Some(1));
        assert_eq!(sprite.pixel(4, 0), Some(2));
        assert_eq!(sprite.pixel(3, 8), Some(3));
        assert_eq!(sprite.pixel(7, 15), Some(0));
    }

    #[test]
    fn quadruple_width_groups_every_fourth_offset() {
        let data = four_blocks();
        // Column 2 is offsets[2] and offsets[6]
        let mut offsets = vec![Some(0x00); 8];
        offsets[2] = Some(0x18);
        offsets[6] = Some(0x10);
        let sprite = assemble_sprite(&data, &offsets, &BlockLayout::columns(4)).unwrap();

        assert_eq!((sprite.width, sprite.height), (16, 16));
        assert_eq!(sprite.pixel(8, 7), Some(3));
        assert_eq!(sprite.pixel(11, 8), Some(2));
        assert_eq!(sprite.pixel(12, 8), Some(0));
    }

    #[test]
    fn missing_offset_yields_blank_block() {
        let data = vec![0xffu8; 8];
        let offsets = vec![Some(0), None];
        let sprite = assemble_sprite(&data, &offsets, &BlockLayout::columns(2)).unwrap();
        assert!(sprite.pixels[0..4].iter().all(|&p| p == 3));
        assert!(sprite.pixels[4..8].iter().all(|&p| p == 0));
    }

    #[test]
    fn out_of_range_offset_is_an_error() {
        let data = vec![0u8; 12];
        let err = assemble_sprite(&data, &[Some(8)], &BlockLayout::columns(1)).unwrap_err();
        assert!(matches!(err, CodecError::OutOfBounds { .. }));

        let err = assemble_sprite(&data, &[Some(0)], &BlockLayout::columns(2)).unwrap_err();
        assert!(matches!(err, CodecError::InvalidLayout(_)));
    }

    #[test]
    fn strided_rows_and_tall_blocks() {
        // Two columns interleaved byte by byte, six rows each
        let data: Vec<u8> = (0..12).map(|i| if i % 2 == 0 { 0xff } else { 0x00 }).collect();
        let layout = BlockLayout::columns(2)
            .with_block_height(6)
            .with_row_stride(2);
        let sprite = assemble_sprite(&data, &present(&[0, 1]), &layout).unwrap();
        assert_eq!((sprite.width, sprite.height), (8, 6));
        assert!(sprite.rows().all(|row| row == [3, 3, 3, 3, 0, 0, 0, 0]));
    }

    #[test]
    fn grid_offsets_walk_rows_then_columns() {
        let offsets = grid_offsets(0x100, 2, 4, 0x20);
        assert_eq!(
            offsets,
            present(&[0x100, 0x108, 0x110, 0x118, 0x120, 0x128, 0x130, 0x138])
        );
    }
}
