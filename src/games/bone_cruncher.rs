//! Bone Cruncher
//!
//! Thirty 40x25 levels, six to a file, each nibble packed into 0x200 bytes.
//! The first file also holds the sprites as 4x4 grids of character blocks.

use log::debug;

use super::{level_name, sheet_from_named, text_maps, tile_key, Game, GameKind, NamedLevel};
use crate::binary_utils::ByteBuffer;
use crate::error::{CodecError, Result};
use crate::filesystem::FileCatalogue;
use crate::graphics::assembler::{assemble_sprite, grid_offsets, BlockLayout};
use crate::graphics::{SpriteImage, SpriteSheet};
use crate::maps::nibble::{decode_grid, encode_grid, GridConfig};
use crate::maps::TileGrid;

/// File name, required length and offset of the first level, in level order
pub const FILES: [(&str, usize, usize); 5] = [
    ("BONE_2", 0x5b88, 0x2500),
    ("SCREEN 1", 0xc00, 0),
    ("SCREEN 2", 0xc00, 0),
    ("SCREEN 3", 0xc00, 0),
    ("SCREEN 4", 0xc00, 0),
];

pub const LEVELS_PER_FILE: usize = 6;
pub const LEVEL_COUNT: usize = LEVELS_PER_FILE * FILES.len();
pub const GRID: GridConfig = GridConfig::new(40, 25, 0x200);

pub const SPRITE_WIDTH: usize = 16;
pub const SPRITE_HEIGHT: usize = 32;

const SPRITE_DATA_LEN: usize = 0x1400;
const SPRITE_LAYOUT: BlockLayout = BlockLayout::columns(4);
const SPRITE_ROW_STEP: usize = 0x20;

#[derive(Clone, Copy, Debug)]
enum SpriteSource {
    Blank,
    Blocks(usize),
    /// Another tile's sprite with one colour swapped
    Recolour { tile: u8, from: u8, to: u8 },
}

const SPRITE_TABLE: [(u8, SpriteSource); 22] = [
    (0x00, SpriteSource::Blank),
    (0x01, SpriteSource::Blocks(0x000)),
    (0x02, SpriteSource::Blocks(0x080)),
    (0x03, SpriteSource::Blocks(0x100)),
    (0x04, SpriteSource::Blocks(0x200)),
    (0x05, SpriteSource::Blocks(0x480)),
    (0x06, SpriteSource::Blocks(0x500)),
    (0x07, SpriteSource::Blocks(0x600)),
    (0x08, SpriteSource::Blocks(0x580)),
    (0x09, SpriteSource::Blocks(0x180)),
    // glook, skeleton, monster, spider
    (0x0a, SpriteSource::Blocks(0x780)),
    (0x0b, SpriteSource::Blocks(0x680)),
    (0x0c, SpriteSource::Blocks(0x900)),
    (0x0d, SpriteSource::Blocks(0xa80)),
    (0x0e, SpriteSource::Blank),
    // fozzy
    (0x0f, SpriteSource::Blocks(0xb80)),
    (0x1f, SpriteSource::Blocks(0x280)),
    (0x2f, SpriteSource::Blocks(0x300)),
    (0x3f, SpriteSource::Blocks(0x380)),
    (0x4f, SpriteSource::Blocks(0x400)),
    // Bono
    (0x5f, SpriteSource::Blocks(0x1380)),
    // volcano
    (
        0x6f,
        SpriteSource::Recolour {
            tile: 0x07,
            from: 3,
            to: 1,
        },
    ),
];

/// Text map symbol for each tile; any other tile shows its high nibble in hex
const TEXT_SYMBOLS: [(u8, char); 22] = [
    (0x00, ' '),
    (0x01, '-'),
    (0x02, '|'),
    (0x03, '+'),
    (0x04, 'c'),
    (0x05, 'd'),
    (0x06, 'k'),
    (0x07, '.'),
    (0x08, 'x'), // trapdoor
    (0x09, '~'),
    (0x0a, 'O'),
    (0x0b, '$'),
    (0x0c, 'm'), // monster
    (0x0d, 'S'),
    (0x0e, '?'),
    (0x0f, 'F'), // fozzy
    (0x1f, '>'),
    (0x2f, '<'),
    (0x3f, '^'),
    (0x4f, 'v'),
    (0x5f, 'B'), // Bono
    (0x6f, 'A'), // volcano
];

/// Draw a level as 25 lines of 40 symbols
pub fn text_map(grid: &TileGrid) -> String {
    let mut text = String::with_capacity((grid.width() + 1) * grid.height());
    for row in grid.rows() {
        for &tile in row {
            let symbol = TEXT_SYMBOLS
                .iter()
                .find(|&&(value, _)| value == tile)
                .map(|&(_, symbol)| symbol)
                .or_else(|| char::from_digit(u32::from(tile >> 4), 16))
                .unwrap_or('?');
            text.push(symbol);
        }
        text.push('\n');
    }
    text
}

pub struct BoneCruncher {
    files: Vec<ByteBuffer>,
}

impl BoneCruncher {
    /// `files` must be given in [`FILES`] order with the listed lengths.
    pub fn new(files: Vec<Vec<u8>>) -> Result<Self> {
        if files.len() != FILES.len() {
            return Err(CodecError::InvalidLayout(format!(
                "expected {} files, got {}",
                FILES.len(),
                files.len()
            )));
        }

        for (data, (name, length, _)) in files.iter().zip(FILES) {
            if data.len() != length {
                return Err(CodecError::size_mismatch(name, length, data.len()));
            }
        }

        Ok(BoneCruncher {
            files: files.into_iter().map(ByteBuffer::new).collect(),
        })
    }

    pub fn from_catalogue(catalogue: &FileCatalogue) -> Result<Self> {
        let files = FILES
            .iter()
            .map(|&(name, length, _)| catalogue.get_sized(name, length).map(<[u8]>::to_vec))
            .collect::<Result<Vec<_>>>()?;
        BoneCruncher::new(files)
    }

    /// Name and contents of each file, reflecting any levels written since loading
    pub fn files(&self) -> impl Iterator<Item = (&'static str, &[u8])> {
        FILES
            .iter()
            .zip(&self.files)
            .map(|(&(name, _, _), data)| (name, data.as_slice()))
    }

    /// File index and byte offset of a 1-based level
    fn locate(number: usize) -> Result<(usize, usize)> {
        if number == 0 || number > LEVEL_COUNT {
            return Err(CodecError::LevelOutOfRange {
                level: number,
                count: LEVEL_COUNT,
            });
        }
        let index = number - 1;
        let file = index / LEVELS_PER_FILE;
        let offset = FILES[file].2 + (index % LEVELS_PER_FILE) * GRID.allotment;
        Ok((file, offset))
    }

    pub fn read_level(&self, number: usize) -> Result<TileGrid> {
        let (file, offset) = Self::locate(number)?;
        let packed = self.files[file].slice(offset, GRID.allotment)?;
        debug!("level {}: {} at {:#x}", number, FILES[file].0, offset);
        decode_grid(packed, &GRID)
    }

    pub fn read_levels(&self) -> Result<Vec<TileGrid>> {
        (1..=LEVEL_COUNT).map(|n| self.read_level(n)).collect()
    }

    pub fn write_level(&mut self, number: usize, grid: &TileGrid) -> Result<()> {
        let (file, offset) = Self::locate(number)?;
        let packed = encode_grid(grid, &GRID, number)?;
        self.files[file].splice(offset, &packed)
    }

    /// Replace every level. Nothing is written unless all of them encode.
    pub fn write_levels(&mut self, levels: &[TileGrid]) -> Result<()> {
        if levels.len() != LEVEL_COUNT {
            return Err(CodecError::InvalidLayout(format!(
                "expected {} levels, got {}",
                LEVEL_COUNT,
                levels.len()
            )));
        }

        let packed = levels
            .iter()
            .enumerate()
            .map(|(i, grid)| encode_grid(grid, &GRID, i + 1))
            .collect::<Result<Vec<_>>>()?;

        for (i, bytes) in packed.iter().enumerate() {
            let (file, offset) = Self::locate(i + 1)?;
            self.files[file].splice(offset, bytes)?;
        }
        Ok(())
    }

    pub fn read_sprites(&self) -> Result<SpriteSheet<u8>> {
        let data = self.files[0].slice(0, SPRITE_DATA_LEN)?;
        let mut sheet = SpriteSheet::new();

        for (tile, source) in SPRITE_TABLE {
            let sprite = match source {
                SpriteSource::Blank => SpriteImage::blank(SPRITE_WIDTH, SPRITE_HEIGHT),
                SpriteSource::Blocks(offset) => assemble_sprite(
                    data,
                    &grid_offsets(offset, 4, 4, SPRITE_ROW_STEP),
                    &SPRITE_LAYOUT,
                )?,
                SpriteSource::Recolour { tile: base, from, to } => sheet
                    .get(&base)
                    .map(|sprite: &SpriteImage| sprite.recolour(from, to))
                    .ok_or_else(|| {
                        CodecError::InvalidLayout(format!(
                            "sprite {:#04x} is derived from undecoded sprite {:#04x}",
                            tile, base
                        ))
                    })?,
            };
            sheet.insert(tile, sprite);
        }

        Ok(sheet)
    }
}

impl Game for BoneCruncher {
    fn kind(&self) -> GameKind {
        GameKind::BoneCruncher
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
        let sheet = self.read_sprites()?;
        Ok(sheet_from_named(
            sheet
                .sprites
                .into_iter()
                .map(|(tile, sprite)| (tile_key(tile as usize), sprite)),
        ))
    }

    fn text_map(&self) -> Result<Option<String>> {
        Ok(Some(text_maps(self.read_levels()?.iter().map(text_map))))
    }
}
