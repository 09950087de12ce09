//! Sparse entity tables and per-cell bit grids
//!
//! Games keep their objects in parallel arrays: one array of X coordinates,
//! one of Y coordinates, one of types and so on, all indexed by slot. A slot
//! holding the 0xFF sentinel in a required field is unused.

use std::collections::BTreeMap;

use log::warn;
use serde::Serialize;

use crate::error::{CodecError, Result};

pub const ABSENT: u8 = 0xff;

/// (x, y) in tile units
pub type Position = (u8, u8);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    X,
    Y,
    /// Index into `EntityLayout::values`
    Value(usize),
}

/// Where the arrays for one kind of entity live.
///
/// Slot `i` reads its X coordinate from `x + i`, its Y coordinate from
/// `y + i` and so on. Slots run from `first_slot` to `first_slot + slots - 1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntityLayout {
    pub first_slot: usize,
    pub slots: usize,
    pub x: usize,
    pub y: usize,
    pub values: &'static [usize],
    /// A slot is skipped when any of these fields holds [`ABSENT`]
    pub absent_if: &'static [Field],
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EntityRecord {
    pub slot: usize,
    pub values: Vec<u8>,
}

/// A slot that replaced an earlier slot at the same position
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Overwrite {
    pub position: Position,
    pub replaced_slot: usize,
    pub slot: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct EntityTable {
    #[serde(serialize_with = "serialize_positions")]
    pub entries: BTreeMap<Position, EntityRecord>,
    pub overwrites: Vec<Overwrite>,
}

impl EntityTable {
    pub fn get(&self, position: Position) -> Option<&EntityRecord> {
        self.entries.get(&position)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn serialize_positions<S: serde::Serializer>(
    entries: &BTreeMap<Position, EntityRecord>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    use serde::ser::SerializeSeq;

    let mut seq = serializer.serialize_seq(Some(entries.len()))?;
    for ((x, y), record) in entries {
        seq.serialize_element(&serde_json::json!({
            "x": x,
            "y": y,
            "slot": record.slot,
            "values": record.values,
        }))?;
    }
    seq.end()
}

fn byte_at(data: &[u8], offset: usize) -> Result<u8> {
    data.get(offset).copied().ok_or(CodecError::OutOfBounds {
        offset,
        len: data.len(),
    })
}

/// Build a position-keyed table from parallel slot arrays.
///
/// When two slots share a position the later slot wins. Each replacement is
/// logged and listed in [`EntityTable::overwrites`].
pub fn decode_entities(data: &[u8], layout: &EntityLayout) -> Result<EntityTable> {
    let mut table = EntityTable::default();

    for slot in layout.first_slot..layout.first_slot + layout.slots {
        let x = byte_at(data, layout.x + slot)?;
        let y = byte_at(data, layout.y + slot)?;
        let values = layout
            .values
            .iter()
            .map(|&base| byte_at(data, base + slot))
            .collect::<Result<Vec<u8>>>()?;

        let absent = layout.absent_if.iter().any(|field| {
            let value = match *field {
                Field::X => Some(x),
                Field::Y => Some(y),
                Field::Value(i) => values.get(i).copied(),
            };
            value == Some(ABSENT)
        });
        if absent {
            continue;
        }

        let record = EntityRecord { slot, values };
        if let Some(previous) = table.entries.insert((x, y), record) {
            warn!(
                "slot {} replaces slot {} at ({}, {})",
                slot, previous.slot, x, y
            );
            table.overwrites.push(Overwrite {
                position: (x, y),
                replaced_slot: previous.slot,
                slot,
            });
        }
    }

    Ok(table)
}

/// One bit per cell, MSB leftmost, stored in character-block order.
///
/// Each byte column of a block row holds 8 consecutive scanlines, so row `r`
/// and byte column `c` live at
/// `offset + (r / 8) * block_stride + (r % 8) + c * 8`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BitGridLayout {
    pub offset: usize,
    pub rows: usize,
    /// Cells per row; a multiple of 8
    pub columns: usize,
    pub block_stride: usize,
}

impl BitGridLayout {
    pub fn byte_offset(&self, row: usize, byte_column: usize) -> usize {
        self.offset + (row / 8) * self.block_stride + (row % 8) + byte_column * 8
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BitGrid {
    pub columns: usize,
    pub rows: usize,
    bits: Vec<bool>,
}

impl BitGrid {
    pub fn is_set(&self, row: usize, column: usize) -> bool {
        row < self.rows && column < self.columns && self.bits[row * self.columns + column]
    }

    pub fn count_set(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }

    pub fn row_strings(&self, set: char, clear: char) -> Vec<String> {
        self.bits
            .chunks_exact(self.columns.max(1))
            .map(|row| row.iter().map(|&b| if b { set } else { clear }).collect())
            .collect()
    }
}

impl Serialize for BitGrid {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.row_strings('1', '0').serialize(serializer)
    }
}

pub fn decode_bit_grid(data: &[u8], layout: &BitGridLayout) -> Result<BitGrid> {
    if layout.columns % 8 != 0 {
        return Err(CodecError::InvalidLayout(format!(
            "bit grid width {} is not a whole number of bytes",
            layout.columns
        )));
    }

    let mut bits = Vec::with_capacity(layout.rows * layout.columns);
    for row in 0..layout.rows {
        for byte_column in 0..layout.columns / 8 {
            let byte = byte_at(data, layout.byte_offset(row, byte_column))?;
            bits.extend((0..8).rev().map(|bit| byte & (1 << bit) != 0));
        }
    }

    Ok(BitGrid {
        columns: layout.columns,
        rows: layout.rows,
        bits,
    })
}
