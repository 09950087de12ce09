//! Level map codecs
//!
//! Each game stores its levels differently, but they all decode to a
//! [`TileGrid`]: a fixed-size, row-major array of tile ids.

pub mod entities;
pub mod nibble;
pub mod run_length;
pub mod scramble;

use serde::{Serialize, Serializer};

use crate::error::{CodecError, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileGrid {
    width: usize,
    height: usize,
    cells: Vec<u8>,
}

impl TileGrid {
    pub fn new(width: usize, height: usize) -> Self {
        TileGrid {
            width,
            height,
            cells: vec![0; width * height],
        }
    }

    pub fn from_cells(width: usize, height: usize, cells: Vec<u8>) -> Result<Self> {
        if cells.len() != width * height {
            return Err(CodecError::size_mismatch(
                format!("{}x{} grid", width, height),
                width * height,
                cells.len(),
            ));
        }
        Ok(TileGrid {
            width,
            height,
            cells,
        })
    }

    /// Build a grid from rows, which must all be `width` long
    pub fn from_rows(width: usize, rows: Vec<Vec<u8>>) -> Result<Self> {
        let height = rows.len();
        let mut cells = Vec::with_capacity(width * height);
        for (index, row) in rows.into_iter().enumerate() {
            if row.len() != width {
                return Err(CodecError::size_mismatch(
                    format!("grid row {}", index),
                    width,
                    row.len(),
                ));
            }
            cells.extend(row);
        }
        Ok(TileGrid {
            width,
            height,
            cells,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    pub fn get(&self, column: usize, row: usize) -> Option<u8> {
        if column >= self.width || row >= self.height {
            return None;
        }
        Some(self.cells[row * self.width + column])
    }

    pub fn set(&mut self, column: usize, row: usize, value: u8) -> Result<()> {
        if column >= self.width || row >= self.height {
            return Err(CodecError::OutOfBounds {
                offset: row * self.width + column,
                len: self.cells.len(),
            });
        }
        self.cells[row * self.width + column] = value;
        Ok(())
    }

    pub fn rows(&self) -> impl DoubleEndedIterator<Item = &[u8]> {
        self.cells.chunks_exact(self.width.max(1))
    }

    /// Swap rows and columns
    pub fn transposed(&self) -> TileGrid {
        let mut out = TileGrid::new(self.height, self.width);
        for row in 0..self.height {
            for column in 0..self.width {
                out.cells[column * self.height + row] = self.cells[row * self.width + column];
            }
        }
        out
    }

    /// Same grid with the row order reversed (bottom row first)
    pub fn flipped_vertically(&self) -> TileGrid {
        let cells = self
            .rows()
            .rev()
            .flat_map(|row| row.iter().copied())
            .collect();
        TileGrid {
            width: self.width,
            height: self.height,
            cells,
        }
    }
}

impl Serialize for TileGrid {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let rows: Vec<&[u8]> = self.rows().collect();
        rows.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get_are_bounds_checked() {
        let mut grid = TileGrid::new(3, 2);
        grid.set(2, 1, 9).unwrap();
        assert_eq!(grid.get(2, 1), Some(9));
        assert_eq!(grid.get(3, 0), None);
        assert!(grid.set(0, 2, 1).is_err());
    }

    #[test]
    fn transpose_and_flip() {
        let grid = TileGrid::from_rows(3, vec![vec![1, 2, 3], vec![4, 5, 6]]).unwrap();

        let transposed = grid.transposed();
        assert_eq!((transposed.width(), transposed.height()), (2, 3));
        assert_eq!(transposed.cells(), &[1, 4, 2, 5, 3, 6]);

        let flipped = grid.flipped_vertically();
        assert_eq!(flipped.cells(), &[4, 5, 6, 1, 2, 3]);
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let err = TileGrid::from_rows(2, vec![vec![1, 2], vec![3]]).unwrap_err();
        assert!(matches!(err, CodecError::SizeMismatch { expected: 2, actual: 1, .. }));
    }

    #[test]
    fn serialises_as_nested_rows() {
        let grid = TileGrid::from_rows(2, vec![vec![1, 2], vec![3, 4]]).unwrap();
        assert_eq!(serde_json::to_string(&grid).unwrap(), "[[1,2],[3,4]]");
    }
}
