//! Firetrack
//!
//! File `5` holds every level as a run-length stream, stored bottom row
//! first. File `4` holds 64 sprites of 8x16 whose rows are 64 bytes apart.

use super::{level_name, sheet_from_named, text_maps, tile_key, Game, GameKind, NamedLevel};
use crate::error::Result;
use crate::filesystem::FileCatalogue;
use crate::graphics::assembler::{assemble_sprite, present, BlockLayout};
use crate::graphics::SpriteSheet;
use crate::maps::run_length::{decode_levels, RunLengthLevel};
use crate::maps::TileGrid;

pub const SPRITE_FILE: &str = "4";
pub const SPRITE_FILE_LEN: usize = 0xc00;
pub const MAP_FILE: &str = "5";
pub const MAP_FILE_LEN: usize = 0x1e73;

pub const MAP_WIDTH: usize = 20;

pub const SPRITE_COUNT: usize = 64;
const SPRITE_START: usize = SPRITE_FILE_LEN - SPRITE_COUNT * 32;
const SPRITE_ROW_STRIDE: usize = 64;
/// Distance between the four 8-row quarters of a sprite
const QUARTER_STEP: usize = 8 * SPRITE_ROW_STRIDE;
const SPRITE_LAYOUT: BlockLayout = BlockLayout::columns(2).with_row_stride(SPRITE_ROW_STRIDE);

/// Draw a level as rows of two-digit hex tiles separated by spaces
pub fn text_map(grid: &TileGrid) -> String {
    let mut text = String::with_capacity(3 * grid.width() * grid.height());
    for row in grid.rows() {
        let tiles: Vec<String> = row.iter().map(|tile| format!("{:02x}", tile)).collect();
        text.push_str(&tiles.join(" "));
        text.push('\n');
    }
    text
}

pub struct Firetrack {
    sprite_data: Vec<u8>,
    map_data: Vec<u8>,
}

impl Firetrack {
    pub fn new(sprite_data: Vec<u8>, map_data: Vec<u8>) -> Self {
        Firetrack {
            sprite_data,
            map_data,
        }
    }

    pub fn from_catalogue(catalogue: &FileCatalogue) -> Result<Self> {
        Ok(Firetrack::new(
            catalogue.get_sized(SPRITE_FILE, SPRITE_FILE_LEN)?.to_vec(),
            catalogue.get_sized(MAP_FILE, MAP_FILE_LEN)?.to_vec(),
        ))
    }

    /// Levels with their rows in screen order, top first
    pub fn read_levels(&self) -> Result<Vec<RunLengthLevel>> {
        let mut levels = decode_levels(&self.map_data, MAP_WIDTH)?;
        for level in &mut levels {
            level.grid = level.grid.flipped_vertically();
        }
        Ok(levels)
    }

    pub fn read_sprites(&self) -> Result<SpriteSheet<usize>> {
        let mut sheet = SpriteSheet::new();
        for number in 0..SPRITE_COUNT {
            let top = SPRITE_START + number;
            let offsets = present(&[
                top,
                top + QUARTER_STEP,
                top + 2 * QUARTER_STEP,
                top + 3 * QUARTER_STEP,
            ]);
            sheet.insert(number, assemble_sprite(&self.sprite_data, &offsets, &SPRITE_LAYOUT)?);
        }
        Ok(sheet)
    }
}

impl Game for Firetrack {
    fn kind(&self) -> GameKind {
        GameKind::Firetrack
    }

    fn levels(&self) -> Result<Vec<NamedLevel>> {
        Ok(self
            .read_levels()?
            .into_iter()
            .enumerate()
            .map(|(i, level)| NamedLevel::new(level_name("level", i + 1), level.grid))
            .collect())
    }

    fn sprites(&self) -> Result<SpriteSheet<String>> {
        Ok(sheet_from_named(
            self.read_sprites()?
                .sprites
                .into_iter()
                .map(|(number, sprite)| (tile_key(number), sprite)),
        ))
    }

    /// Last level first
    fn text_map(&self) -> Result<Option<String>> {
        let levels = self.read_levels()?;
        Ok(Some(text_maps(
            levels.iter().rev().map(|level| text_map(&level.grid)),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_are_flipped_to_screen_order() {
        let mut map = vec![0, 0, 0];
        map.extend_from_slice(&[0x10; 8]);
        map.extend_from_slice(&[0; 8]);
        // Twenty 1s, then a single 2 on the second stored row
        map.extend_from_slice(&[0x41, 20, 0x02, 0x80]);

        let game = Firetrack::new(vec![0; SPRITE_FILE_LEN], map);
        let levels = game.read_levels().unwrap();
        assert_eq!(levels.len(), 1);
        let grid = &levels[0].grid;
        assert_eq!(grid.height(), 2);
        assert_eq!(grid.get(0, 0), Some(2));
        assert_eq!(grid.get(0, 1), Some(1));
    }

    #[test]
    fn text_maps_are_hex_with_the_last_level_first() {
        let mut map = Vec::new();
        for tile in [0x1a, 0x02] {
            map.extend_from_slice(&[0; 3 + 8 + 8]);
            // A single row of one tile
            map.extend_from_slice(&[0x40 | tile, 20, 0x80]);
        }

        let game = Firetrack::new(vec![0; SPRITE_FILE_LEN], map);
        let row = |tile: &str| vec![tile; MAP_WIDTH].join(" ");
        let expected = format!("{}\n\n{}\n\n", row("02"), row("1a"));
        assert_eq!(Game::text_map(&game).unwrap().unwrap(), expected);
    }

    #[test]
    fn sprite_quarters_are_spread_through_the_file() {
        let mut data = vec![0u8; SPRITE_FILE_LEN];
        // Sprite 3: top-left row 0, top-right row 1, bottom-left row 15 (last of quarter 2)
        data[SPRITE_START + 3] = 0x88;
        data[SPRITE_START + 3 + QUARTER_STEP + SPRITE_ROW_STRIDE] = 0x01;
        data[SPRITE_START + 3 + 2 * QUARTER_STEP + 7 * SPRITE_ROW_STRIDE] = 0xf0;

        let game = Firetrack::new(data, Vec::new());
        let sheet = game.read_sprites().unwrap();
        assert_eq!(sheet.len(), SPRITE_COUNT);

        let sprite = sheet.get(&3).unwrap();
        assert_eq!((sprite.width, sprite.height), (8, 16));
        assert_eq!(sprite.pixel(0, 0), Some(3));
        assert_eq!(sprite.pixel(7, 1), Some(1));
        assert_eq!(&sprite.pixels[15 * 8..15 * 8 + 4], &[2, 2, 2, 2]);
        assert!(sheet.get(&2).unwrap().pixels.iter().all(|&p| p == 0));
    }
}
