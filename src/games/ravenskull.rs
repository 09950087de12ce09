//! Ravenskull
//!
//! `DAT2` starts with the item records for all four levels, followed by the
//! maps. Each map is a ring of nibble-packed columns, so a level's first
//! column does not have to start at the beginning of its region. `DATA`
//! holds the 12x24 tile sprites.

use std::io::Cursor;

use log::warn;
use serde::Serialize;
use serde_json::{json, Value};

use super::{level_name, nth_level, sheet_from_named, tile_key, Game, GameKind, NamedLevel};
use crate::binary_utils::{read_i8, read_u8, seek_to};
use crate::error::{CodecError, Result};
use crate::filesystem::FileCatalogue;
use crate::graphics::assembler::{assemble_sprite, present, BlockLayout};
use crate::graphics::{SpriteImage, SpriteSheet};
use crate::maps::nibble::{unpack_pair, NibbleOrder};
use crate::maps::TileGrid;

pub const SPRITE_FILE: &str = "DATA";
pub const SPRITE_FILE_LEN: usize = 0xc80;
pub const MAP_FILE: &str = "DAT2";
pub const MAP_FILE_LEN: usize = 0x2100;

pub const LEVEL_COUNT: usize = 4;
pub const SIZE: usize = 64;

const ITEMS_PER_LEVEL: usize = 12;
const ITEM_RECORD_LEN: usize = 5;
/// Items for one level plus the four unused bytes that follow them
const ITEM_BLOCK_LEN: usize = ITEMS_PER_LEVEL * ITEM_RECORD_LEN + 4;

/// Start, first column and end of each level's map ring
const MAP_REGIONS: [(usize, usize, usize); LEVEL_COUNT] = [
    (0x11f, 0x11f, 0x91f),
    (0x8ff, 0x8ff, 0x10bf),
    (0x10df, 0x10df, 0x189f),
    (0x18df, 0x207f, 0x209f),
];
/// Bytes per stored column; each byte holds two rows
const COLUMN_LEN: usize = SIZE / 2;

pub const SPRITE_WIDTH: usize = 12;
pub const SPRITE_HEIGHT: usize = 24;

const SPRITE_BASE: usize = 0x538;
const SPRITE_STEP: usize = 0x48;
const SPRITE_LAYOUT: BlockLayout = BlockLayout::columns(3).with_block_height(SPRITE_HEIGHT);

/// Offsets from [`SPRITE_BASE`] of the sprites for tiles 0 to 15
const SPRITE_TABLE: [Option<usize>; 16] = [
    None,
    Some(SPRITE_STEP),
    Some(2 * SPRITE_STEP),
    Some(13 * SPRITE_STEP - 8),
    Some(14 * SPRITE_STEP - 8),
    Some(17 * SPRITE_STEP - 8),
    Some(3 * SPRITE_STEP),
    Some(6 * SPRITE_STEP),
    Some(5 * SPRITE_STEP),
    Some(4 * SPRITE_STEP),
    Some(24 * SPRITE_STEP - 8),
    Some(10 * SPRITE_STEP - 8),
    Some(7 * SPRITE_STEP),
    Some(15 * SPRITE_STEP - 8),
    Some(12 * SPRITE_STEP - 8),
    Some(11 * SPRITE_STEP - 8),
];

// 20-row sprites, centred in a full tile and numbered after the map tiles
const SMALL_SPRITE_BASE: usize = 0x180;
const SMALL_SPRITE_HEIGHT: usize = 20;
const SMALL_SPRITE_TABLE: [usize; 3] = [0, 20 + 0x3c, 20 + 64 + 2 * 0x3c];
const SMALL_SPRITE_LAYOUT: BlockLayout =
    BlockLayout::columns(3).with_block_height(SMALL_SPRITE_HEIGHT);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct RavenskullItem {
    pub column: i8,
    pub row: i8,
    pub kind: u8,
    pub x: u8,
    pub y: u8,
}

/// Item records of one level in stored order
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ItemList {
    pub items: Vec<RavenskullItem>,
}

impl ItemList {
    /// The item placed at a map cell. Later records replace earlier ones.
    pub fn at(&self, row: i8, column: i8) -> Option<&RavenskullItem> {
        self.items
            .iter()
            .rev()
            .find(|item| item.row == row && item.column == column)
    }

    /// Records hidden by a later record for the same cell
    pub fn overwritten(&self) -> Vec<RavenskullItem> {
        self.items
            .iter()
            .enumerate()
            .filter(|&(i, item)| {
                self.items[i + 1..]
                    .iter()
                    .any(|later| later.row == item.row && later.column == item.column)
            })
            .map(|(_, item)| *item)
            .collect()
    }
}

pub struct Ravenskull {
    sprite_data: Vec<u8>,
    map_data: Vec<u8>,
}

impl Ravenskull {
    pub fn new(sprite_data: Vec<u8>, map_data: Vec<u8>) -> Result<Self> {
        if map_data.len() != MAP_FILE_LEN {
            return Err(CodecError::size_mismatch(MAP_FILE, MAP_FILE_LEN, map_data.len()));
        }
        Ok(Ravenskull {
            sprite_data,
            map_data,
        })
    }

    pub fn from_catalogue(catalogue: &FileCatalogue) -> Result<Self> {
        Ravenskull::new(
            catalogue.get_sized(SPRITE_FILE, SPRITE_FILE_LEN)?.to_vec(),
            catalogue.get_sized(MAP_FILE, MAP_FILE_LEN)?.to_vec(),
        )
    }

    pub fn read_items(&self) -> Result<Vec<ItemList>> {
        let mut cursor = Cursor::new(self.map_data.as_slice());
        let mut levels = Vec::with_capacity(LEVEL_COUNT);

        for level in 0..LEVEL_COUNT {
            seek_to(&mut cursor, (level * ITEM_BLOCK_LEN) as u64)?;
            let mut list = ItemList::default();
            for _ in 0..ITEMS_PER_LEVEL {
                list.items.push(RavenskullItem {
                    column: read_i8(&mut cursor)?,
                    row: read_i8(&mut cursor)?,
                    kind: read_u8(&mut cursor)?,
                    x: read_u8(&mut cursor)?,
                    y: read_u8(&mut cursor)?,
                });
            }

            for hidden in list.overwritten() {
                warn!(
                    "level {}: item {:#04x} at ({}, {}) is replaced by a later record",
                    level + 1,
                    hidden.kind,
                    hidden.column,
                    hidden.row
                );
            }
            levels.push(list);
        }
        Ok(levels)
    }

    pub fn read_level(&self, number: usize) -> Result<TileGrid> {
        let &(start, first, end) = nth_level(&MAP_REGIONS, number)?;
        let ring = end - start;
        let mut grid = TileGrid::new(SIZE, SIZE);

        for column in 0..SIZE {
            for pair in 0..COLUMN_LEN {
                let index = start + (first - start + column * COLUMN_LEN + pair) % ring;
                let byte = *self.map_data.get(index).ok_or(CodecError::OutOfBounds {
                    offset: index,
                    len: self.map_data.len(),
                })?;
                let [upper, lower] = unpack_pair(byte, NibbleOrder::LowFirst);
                grid.set(column, pair * 2, upper)?;
                grid.set(column, pair * 2 + 1, lower)?;
            }
        }

        Ok(grid)
    }

    pub fn read_levels(&self) -> Result<Vec<TileGrid>> {
        (1..=LEVEL_COUNT).map(|n| self.read_level(n)).collect()
    }

    /// Tiles 0 to 15 followed by the small sprites as 16 to 18
    pub fn read_sprites(&self) -> Result<SpriteSheet<usize>> {
        let mut sheet = SpriteSheet::new();

        for (tile, entry) in SPRITE_TABLE.iter().enumerate() {
            let sprite = match entry {
                None => SpriteImage::blank(SPRITE_WIDTH, SPRITE_HEIGHT),
                Some(address) => {
                    let offset = SPRITE_BASE + address;
                    let blocks = present(&[offset, offset + SPRITE_HEIGHT, offset + 2 * SPRITE_HEIGHT]);
                    assemble_sprite(&self.sprite_data, &blocks, &SPRITE_LAYOUT)?
                }
            };
            sheet.insert(tile, sprite);
        }

        let padding = (SPRITE_HEIGHT - SMALL_SPRITE_HEIGHT) / 2;
        for (i, address) in SMALL_SPRITE_TABLE.iter().enumerate() {
            let offset = SMALL_SPRITE_BASE + address;
            let blocks = present(&[
                offset,
                offset + SMALL_SPRITE_HEIGHT,
                offset + 2 * SMALL_SPRITE_HEIGHT,
            ]);
            let sprite = assemble_sprite(&self.sprite_data, &blocks, &SMALL_SPRITE_LAYOUT)?;
            sheet.insert(SPRITE_TABLE.len() + i, sprite.pad_vertically(padding));
        }

        Ok(sheet)
    }
}

impl Game for Ravenskull {
    fn kind(&self) -> GameKind {
        GameKind::Ravenskull
    }

    fn levels(&self) -> Result<Vec<NamedLevel>> {
        Ok(self
            .read_levels()?
            .into_iter()
            .enumerate()
            .map(|(i, grid)| NamedLevel::new(level_name("level", i + 1), grid))
            .collect())
    }

    fn sprites(&self) -> Result<SpriteSheet<String>> {
        Ok(sheet_from_named(
            self.read_sprites()?
                .sprites
                .into_iter()
                .map(|(tile, sprite)| (tile_key(tile), sprite)),
        ))
    }

    fn entities(&self) -> Result<Value> {
        let levels = self
            .read_items()?
            .into_iter()
            .enumerate()
            .map(|(i, list)| {
                json!({
                    "level": i + 1,
                    "items": list.items,
                    "overwritten": list.overwritten(),
                })
            })
            .collect();
        Ok(Value::Array(levels))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank_game() -> Ravenskull {
        Ravenskull::new(vec![0; SPRITE_FILE_LEN], vec![0; MAP_FILE_LEN]).unwrap()
    }

    #[test]
    fn items_are_read_in_blocks_of_sixty_four() {
        let mut map = vec![0u8; MAP_FILE_LEN];
        map[..5].copy_from_slice(&[3, 0xff, 0x21, 7, 9]);
        // Second level, third record, overwriting its first record
        map[0x40..0x45].copy_from_slice(&[1, 2, 0x10, 0, 0]);
        map[0x4a..0x4f].copy_from_slice(&[1, 2, 0x11, 4, 5]);

        let game = Ravenskull::new(vec![0; SPRITE_FILE_LEN], map).unwrap();
        let items = game.read_items().unwrap();
        assert_eq!(items.len(), LEVEL_COUNT);
        assert!(items.iter().all(|list| list.items.len() == ITEMS_PER_LEVEL));

        assert_eq!(
            items[0].items[0],
            RavenskullItem {
                column: 3,
                row: -1,
                kind: 0x21,
                x: 7,
                y: 9
            }
        );
        assert_eq!(items[1].at(2, 1).unwrap().kind, 0x11);
        assert_eq!(items[1].overwritten().first().map(|item| item.kind), Some(0x10));
    }

    #[test]
    fn map_columns_unpack_low_nibble_first() {
        let mut map = vec![0u8; MAP_FILE_LEN];
        map[0x11f] = 0x21;
        map[0x11f + COLUMN_LEN + 1] = 0x05;
        let game = Ravenskull::new(vec![0; SPRITE_FILE_LEN], map).unwrap();

        let grid = game.read_level(1).unwrap();
        assert_eq!((grid.width(), grid.height()), (SIZE, SIZE));
        assert_eq!(grid.get(0, 0), Some(1));
        assert_eq!(grid.get(0, 1), Some(2));
        assert_eq!(grid.get(1, 2), Some(5));
        assert_eq!(grid.get(1, 3), Some(0));
    }

    #[test]
    fn last_map_wraps_around_its_ring() {
        let (start, first, end) = MAP_REGIONS[3];
        let mut map = vec![0u8; MAP_FILE_LEN];
        map[first] = 0x03;
        // One column fits before the end of the region, the next starts over
        map[start] = 0x40;

        let game = Ravenskull::new(vec![0; SPRITE_FILE_LEN], map).unwrap();
        let grid = game.read_level(4).unwrap();
        assert_eq!(end - first, COLUMN_LEN);
        assert_eq!(grid.get(0, 0), Some(3));
        assert_eq!(grid.get(1, 1), Some(4));
        assert!(matches!(
            game.read_level(5),
            Err(CodecError::LevelOutOfRange { level: 5, count: 4 })
        ));
    }

    #[test]
    fn sprites_include_padded_small_tiles() {
        let mut data = vec![0u8; SPRITE_FILE_LEN];
        data[SPRITE_BASE + SPRITE_STEP] = 0x08;
        data[SMALL_SPRITE_BASE + 2 * SMALL_SPRITE_HEIGHT] = 0xff;

        let game = Ravenskull::new(data, vec![0; MAP_FILE_LEN]).unwrap();
        let sheet = game.read_sprites().unwrap();
        assert_eq!(sheet.len(), 19);

        let first = sheet.get(&1).unwrap();
        assert_eq!((first.width, first.height), (SPRITE_WIDTH, SPRITE_HEIGHT));
        assert_eq!(first.pixel(0, 0), Some(1));

        let small = sheet.get(&16).unwrap();
        assert_eq!((small.width, small.height), (SPRITE_WIDTH, SPRITE_HEIGHT));
        assert_eq!(small.pixel(8, 1), Some(0));
        assert_eq!(small.pixel(8, 2), Some(3));

        assert!(sheet.get(&0).unwrap().pixels.iter().all(|&p| p == 0));
        assert!(blank_game().read_sprites().is_ok());
    }
}
