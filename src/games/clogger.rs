//! Clogger
//!
//! Each of the four level sets is one file holding five 32x32 byte maps,
//! the level passwords, the target square of every puzzle piece, the
//! puzzle pieces themselves and the tile graphics.

use log::warn;
use serde::Serialize;
use serde_json::{json, Value};

use super::{sheet_from_named, text_maps, tile_key, Game, GameKind, NamedLevel};
use crate::binary_utils::ByteBuffer;
use crate::error::{CodecError, Result};
use crate::filesystem::FileCatalogue;
use crate::graphics::assembler::{assemble_sprite, present, BlockLayout};
use crate::graphics::{SpriteImage, SpriteSheet};
use crate::maps::entities::Position;
use crate::maps::TileGrid;

pub const SETS: [&str; 4] = ["SLIPPER", "BRUSHES", "ARTIST", "PAINT"];
pub const LEVELS_PER_SET: usize = 5;
pub const SIZE: usize = 32;

const MAP_START: usize = 0xf7d;
const MAP_LEN: usize = SIZE * SIZE;
pub const MIN_SET_LEN: usize = MAP_START + LEVELS_PER_SET * MAP_LEN;

pub const PASSWORD_LEN: usize = 7;

pub const PUZZLE_PIECES: usize = 21;
const TARGETS_START: usize = 35;
const TARGETS_STRIDE: usize = 2 * PUZZLE_PIECES;
const PUZZLE_START: usize = 0x3a5;
const PIECE_LEN: usize = 16;
const PIECE_BLOCKS: usize = 4;

const SPRITE_BASE: usize = 0xabd;
const SPRITE_LAYOUT: BlockLayout = BlockLayout::columns(4);
const SPRITE_BLOCKS: usize = 16;
/// Tiles 1 to 5 use the next set of blocks on every second level
const ALTERNATE_TILES: std::ops::RangeInclusive<u8> = 0x01..=0x05;
const ALTERNATE_SHIFT: usize = 0x30;

pub const BLACK: u8 = 0x00;

/// Two characters per tile in text maps; other tiles are written in hex
const TEXT_SYMBOLS: [(u8, &str); 22] = [
    (0x00, "  "),
    (0x01, "ww"),
    (0x02, "--"),
    (0x03, "-\\"),
    (0x04, "/-"),
    (0x05, "/\\"),
    (0x06, ",,"), // blue earth
    (0x07, ",,"),
    (0x08, ".."), // yellow earth
    (0x09, ".."),
    (0x0a, ".."),
    (0x0b, ">>"), // springs
    (0x0c, "<<"),
    (0x0d, "pp"),
    (0x0e, "aa"),
    (0x0f, "gg"),
    (0x25, "m>"), // mowers
    (0x26, "<m"),
    (0x27, "d>"), // drills
    (0x28, "<d"),
    (0x29, "GG"),
    (0x2a, "bb"),
];

/// Draw a level as 32 lines of 64 characters
pub fn text_map(grid: &TileGrid) -> String {
    let mut text = String::with_capacity((2 * grid.width() + 1) * grid.height());
    for row in grid.rows() {
        for &tile in row {
            match TEXT_SYMBOLS.iter().find(|&&(value, _)| value == tile) {
                Some(&(_, symbols)) => text.push_str(symbols),
                None => text.push_str(&format!("{:02x}", tile)),
            }
        }
        text.push('\n');
    }
    text
}

/// Block id to absolute block offset for puzzle pieces
const PUZZLE_BLOCKS: [(u8, usize); 12] = [
    (BLACK, SPRITE_BASE + 0x3c0),
    (0x08, SPRITE_BASE + 0x038),
    (0x09, SPRITE_BASE + 0x040),
    (0x0a, SPRITE_BASE + 0x048), // light blue
    (0x45, SPRITE_BASE + 0x220), // red
    (0x46, SPRITE_BASE + 0x228), // blue
    (0x47, SPRITE_BASE + 0x230),
    (0x48, SPRITE_BASE + 0x238),
    (0x49, SPRITE_BASE + 0x240), // dark blue
    (0x4a, SPRITE_BASE + 0x248), // yellow
    (0x4e, SPRITE_BASE + 0x268),
    (0x4f, SPRITE_BASE + 0x270),
];

/// Tile id to its 4x4 block offsets, relative to the graphics
#[rustfmt::skip]
const SPRITE_TABLE: [(u8, [usize; SPRITE_BLOCKS]); 22] = [
    (
        0x00,
        [
            0x3c0, 0x3c0, 0x3c0, 0x3c0,
            0x3c0, 0x3c0, 0x3c0, 0x3c0,
            0x3c0, 0x3c0, 0x3c0, 0x3c0,
            0x3c0, 0x3c0, 0x3c0, 0x3c0,
        ],
    ),
    (
        0x01,
        [
            0x2f0, 0x2f8, 0x2f0, 0x2f8,
            0x2f0, 0x2f8, 0x2f0, 0x2f8,
            0x2f0, 0x2f8, 0x2f0, 0x2f8,
            0x2f0, 0x2f8, 0x2f0, 0x2f8,
        ],
    ),
    (
        0x02,
        [
            0x300, 0x308, 0x300, 0x308,
            0x2f0, 0x2f8, 0x2f0, 0x2f8,
            0x2f0, 0x2f8, 0x2f0, 0x2f8,
            0x2f0, 0x2f8, 0x2f0, 0x2f8,
        ],
    ),
    (
        0x03,
        [
            0x300, 0x308, 0x300, 0x310,
            0x2f0, 0x2f8, 0x2f0, 0x2f8,
            0x2f0, 0x2f8, 0x2f0, 0x2f8,
            0x2f0, 0x2f8, 0x2f0, 0x2f8,
        ],
    ),
    (
        0x04,
        [
            0x318, 0x308, 0x300, 0x308,
            0x2f0, 0x2f8, 0x2f0, 0x2f8,
            0x2f0, 0x2f8, 0x2f0, 0x2f8,
            0x2f0, 0x2f8, 0x2f0, 0x2f8,
        ],
    ),
    (
        0x05,
        [
            0x318, 0x308, 0x300, 0x310,
            0x2f0, 0x2f8, 0x2f0, 0x2f8,
            0x2f0, 0x2f8, 0x2f0, 0x2f8,
            0x2f0, 0x2f8, 0x2f0, 0x2f8,
        ],
    ),
    (
        0x06,
        [
            0x030, 0x030, 0x030, 0x030,
            0x030, 0x030, 0x030, 0x030,
            0x030, 0x030, 0x030, 0x030,
            0x030, 0x030, 0x030, 0x030,
        ],
    ),
    (
        0x07,
        [
            0x250, 0x250, 0x250, 0x250,
            0x250, 0x250, 0x250, 0x250,
            0x250, 0x250, 0x250, 0x250,
            0x250, 0x250, 0x250, 0x250,
        ],
    ),
    (
        0x08,
        [
            0x258, 0x258, 0x258, 0x258,
            0x258, 0x258, 0x258, 0x258,
            0x258, 0x258, 0x258, 0x258,
            0x258, 0x258, 0x258, 0x258,
        ],
    ),
    (
        0x09,
        [
            0x278, 0x278, 0x278, 0x278,
            0x278, 0x278, 0x278, 0x278,
            0x278, 0x278, 0x278, 0x278,
            0x278, 0x278, 0x278, 0x278,
        ],
    ),
    (
        0x0a,
        [
            0x260, 0x260, 0x260, 0x260,
            0x260, 0x260, 0x260, 0x260,
            0x260, 0x260, 0x260, 0x260,
            0x260, 0x260, 0x260, 0x260,
        ],
    ),
    (
        0x0b,
        [
            0x050, 0x050, 0x050, 0x050,
            0x050, 0x050, 0x050, 0x050,
            0x050, 0x050, 0x050, 0x050,
            0x050, 0x050, 0x050, 0x050,
        ],
    ),
    (
        0x0c,
        [
            0x058, 0x058, 0x058, 0x058,
            0x058, 0x058, 0x058, 0x058,
            0x058, 0x058, 0x058, 0x058,
            0x058, 0x058, 0x058, 0x058,
        ],
    ),
    (
        0x0d,
        [
            0x3c0, 0x3c8, 0x3c0, 0x3c0,
            0x0d8, 0x0d0, 0x0c8, 0x0c0,
            0x0f8, 0x0f0, 0x0e8, 0x0e0,
            0x118, 0x110, 0x108, 0x100,
        ],
    ),
    (
        0x0e,
        [
            0x3c0, 0x280, 0x288, 0x290,
            0x298, 0x2a0, 0x2a8, 0x2b0,
            0x2b8, 0x2c0, 0x2c8, 0x2d0,
            0x2d8, 0x2e0, 0x2e8, 0x3c0,
        ],
    ),
    (
        0x0f,
        [
            0x3c0, 0x3c0, 0x3c0, 0x3c0,
            0x3c0, 0x3c0, 0x3c0, 0x3c0,
            0x3c0, 0x3c0, 0x3c0, 0x3c0,
            0x060, 0x060, 0x060, 0x060,
        ],
    ),
    (
        0x26,
        [
            0x3c0, 0x3c0, 0x3c0, 0x068,
            0x078, 0x3c0, 0x3c0, 0x070,
            0x098, 0x090, 0x088, 0x080,
            0x0b8, 0x0b0, 0x0a8, 0x0a0,
        ],
    ),
    (
        0x27,
        [
            0x120, 0x3c0, 0x3c0, 0x130,
            0x120, 0x128, 0x128, 0x130,
            0x120, 0x128, 0x128, 0x130,
            0x120, 0x3c0, 0x3c0, 0x130,
        ],
    ),
    (
        0x28,
        [
            0x138, 0x3c0, 0x3c0, 0x120,
            0x138, 0x128, 0x128, 0x120,
            0x138, 0x128, 0x128, 0x120,
            0x138, 0x3c0, 0x3c0, 0x120,
        ],
    ),
    (
        0x29,
        [
            0x140, 0x160, 0x180, 0x1a0,
            0x148, 0x168, 0x188, 0x1a8,
            0x150, 0x170, 0x190, 0x1b0,
            0x158, 0x178, 0x198, 0x1b8,
        ],
    ),
    (
        0x2a,
        [
            0x3c0, 0x1d0, 0x1f0, 0x3c0,
            0x1c0, 0x1d8, 0x1f8, 0x210,
            0x1c8, 0x1e0, 0x200, 0x218,
            0x3c0, 0x1e8, 0x208, 0x3c0,
        ],
    ),
    (
        0xff,
        [
            0x060, 0x040, 0x020, 0x000,
            0x068, 0x048, 0x028, 0x008,
            0x070, 0x050, 0x030, 0x010,
            0x078, 0x058, 0x038, 0x018,
        ],
    ),
];

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PuzzlePiece {
    pub number: usize,
    /// Block ids, `blocks[row][column]`
    pub blocks: [[u8; PIECE_BLOCKS]; PIECE_BLOCKS],
    pub sprite: SpriteImage,
    /// Ids with no block definition; drawn as black
    pub unknown_values: Vec<u8>,
}

/// One level set file
pub struct CloggerSet {
    name: String,
    data: ByteBuffer,
}

fn check_level(level: usize) -> Result<usize> {
    if level == 0 || level > LEVELS_PER_SET {
        return Err(CodecError::LevelOutOfRange {
            level,
            count: LEVELS_PER_SET,
        });
    }
    Ok(level - 1)
}

fn check_piece(piece: usize) -> Result<()> {
    if piece >= PUZZLE_PIECES {
        return Err(CodecError::InvalidLayout(format!(
            "puzzle piece {} (pieces are 0..{})",
            piece, PUZZLE_PIECES
        )));
    }
    Ok(())
}

fn check_cell(column: usize, row: usize, size: usize) -> Result<()> {
    if column >= size || row >= size {
        return Err(CodecError::InvalidLayout(format!(
            "cell ({}, {}) outside {}x{}",
            column, row, size, size
        )));
    }
    Ok(())
}

impl CloggerSet {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Result<Self> {
        let name = name.into();
        if data.len() < MIN_SET_LEN {
            return Err(CodecError::size_mismatch(name, MIN_SET_LEN, data.len()));
        }
        Ok(CloggerSet {
            name,
            data: ByteBuffer::new(data),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &[u8] {
        self.data.as_slice()
    }

    fn map_offset(level: usize, column: usize, row: usize) -> Result<usize> {
        let index = check_level(level)?;
        check_cell(column, row, SIZE)?;
        Ok(MAP_START + index * MAP_LEN + row * SIZE + column)
    }

    pub fn read_level(&self, level: usize) -> Result<TileGrid> {
        let start = Self::map_offset(level, 0, 0)?;
        TileGrid::from_cells(SIZE, SIZE, self.data.slice(start, MAP_LEN)?.to_vec())
    }

    pub fn write_level(&mut self, level: usize, grid: &TileGrid) -> Result<()> {
        if grid.width() != SIZE || grid.height() != SIZE {
            return Err(CodecError::size_mismatch(
                "Clogger map",
                MAP_LEN,
                grid.width() * grid.height(),
            ));
        }
        let start = Self::map_offset(level, 0, 0)?;
        self.data.splice(start, grid.cells())
    }

    pub fn read_tile(&self, level: usize, column: usize, row: usize) -> Result<u8> {
        self.data.get(Self::map_offset(level, column, row)?)
    }

    pub fn write_tile(&mut self, level: usize, column: usize, row: usize, value: u8) -> Result<()> {
        let offset = Self::map_offset(level, column, row)?;
        self.data.set(offset, value)
    }

    /// Each password byte is XORed with its own offset in the file
    pub fn password(&self, level: usize) -> Result<String> {
        let start = check_level(level)? * PASSWORD_LEN;
        (start..start + PASSWORD_LEN)
            .map(|offset| Ok(char::from(self.data.get(offset)? ^ offset as u8)))
            .collect()
    }

    /// Store a password, padded with spaces or cut to seven characters
    pub fn set_password(&mut self, level: usize, text: &str) -> Result<()> {
        let start = check_level(level)? * PASSWORD_LEN;
        let padded = text.bytes().chain(std::iter::repeat(b' ')).take(PASSWORD_LEN);
        for (i, byte) in padded.enumerate() {
            if !byte.is_ascii() {
                return Err(CodecError::UnencodableValue { value: byte });
            }
            let offset = start + i;
            self.data.set(offset, byte ^ offset as u8)?;
        }
        Ok(())
    }

    fn target_offset(level: usize, piece: usize) -> Result<usize> {
        let index = check_level(level)?;
        check_piece(piece)?;
        Ok(TARGETS_START + index * TARGETS_STRIDE + piece * 2)
    }

    /// Square the piece must be pushed to, packed into two bytes
    pub fn target_position(&self, level: usize, piece: usize) -> Result<Position> {
        let offset = Self::target_offset(level, piece)?;
        let low = self.data.get(offset)?;
        let high = self.data.get(offset + 1)?;
        Ok((low & 0x1f, ((high & 0x03) << 3) | (low >> 5)))
    }

    pub fn set_target_position(&mut self, level: usize, piece: usize, (x, y): Position) -> Result<()> {
        check_cell(x as usize, y as usize, SIZE)?;
        let offset = Self::target_offset(level, piece)?;
        self.data.set(offset, x | ((y & 0x07) << 5))?;
        self.data.set(offset + 1, (y >> 3) | 0x04)
    }

    /// The sprite for `tile` on `level`. Tiles with no graphics come back blank.
    pub fn read_sprite(&self, level: usize, tile: u8) -> Result<SpriteImage> {
        let index = check_level(level)?;
        let Some((_, offsets)) = SPRITE_TABLE.iter().find(|(id, _)| *id == tile) else {
            warn!(
                "{} level {}: {}, using a blank sprite",
                self.name,
                level,
                CodecError::UnknownTileValue { value: tile }
            );
            return Ok(SpriteImage::blank(
                SPRITE_LAYOUT.sprite_width(),
                SPRITE_LAYOUT.sprite_height(SPRITE_BLOCKS),
            ));
        };

        let shift = if index % 2 == 1 && ALTERNATE_TILES.contains(&tile) {
            ALTERNATE_SHIFT
        } else {
            0
        };
        let absolute: Vec<usize> = offsets.iter().map(|o| SPRITE_BASE + o + shift).collect();
        assemble_sprite(self.data.as_slice(), &present(&absolute), &SPRITE_LAYOUT)
    }

    pub fn read_sprites(&self, level: usize) -> Result<SpriteSheet<u8>> {
        let mut sheet = SpriteSheet::new();
        for (tile, _) in SPRITE_TABLE {
            sheet.insert(tile, self.read_sprite(level, tile)?);
        }
        Ok(sheet)
    }

    fn block_offset(level: usize, piece: usize, column: usize, row: usize) -> Result<usize> {
        let index = check_level(level)?;
        check_piece(piece)?;
        check_cell(column, row, PIECE_BLOCKS)?;
        // Blocks are stored a column at a time
        Ok(PUZZLE_START
            + index * PUZZLE_PIECES * PIECE_LEN
            + piece * PIECE_LEN
            + column * PIECE_BLOCKS
            + row)
    }

    pub fn read_block_number(&self, level: usize, piece: usize, column: usize, row: usize) -> Result<u8> {
        self.data.get(Self::block_offset(level, piece, column, row)?)
    }

    pub fn write_block_number(
        &mut self,
        level: usize,
        piece: usize,
        column: usize,
        row: usize,
        value: u8,
    ) -> Result<()> {
        let offset = Self::block_offset(level, piece, column, row)?;
        self.data.set(offset, value)
    }

    /// Decode one puzzle piece. Unknown block ids are drawn black and listed
    /// in [`PuzzlePiece::unknown_values`].
    pub fn read_puzzle_piece(&self, level: usize, piece: usize) -> Result<PuzzlePiece> {
        let mut blocks = [[BLACK; PIECE_BLOCKS]; PIECE_BLOCKS];
        let mut offsets = Vec::with_capacity(PIECE_LEN);
        let mut unknown_values = Vec::new();

        for (row, block_row) in blocks.iter_mut().enumerate() {
            for (column, block) in block_row.iter_mut().enumerate() {
                let value = self.read_block_number(level, piece, column, row)?;
                *block = value;

                let offset = match puzzle_block(value) {
                    Some(offset) => offset,
                    None => {
                        warn!(
                            "{} level {} piece {}: {}, using black",
                            self.name,
                            level,
                            piece,
                            CodecError::UnknownTileValue { value }
                        );
                        unknown_values.push(value);
                        puzzle_block(BLACK).unwrap_or(SPRITE_BASE)
                    }
                };
                offsets.push(Some(offset));
            }
        }

        Ok(PuzzlePiece {
            number: piece,
            blocks,
            sprite: assemble_sprite(self.data.as_slice(), &offsets, &SPRITE_LAYOUT)?,
            unknown_values,
        })
    }
}

fn puzzle_block(value: u8) -> Option<usize> {
    PUZZLE_BLOCKS
        .iter()
        .find(|(id, _)| *id == value)
        .map(|&(_, offset)| offset)
}

/// All level sets found in a catalogue
pub struct Clogger {
    sets: Vec<CloggerSet>,
}

impl Clogger {
    pub fn new(sets: Vec<CloggerSet>) -> Self {
        Clogger { sets }
    }

    /// Load whichever of the four sets are present; at least one must be
    pub fn from_catalogue(catalogue: &FileCatalogue) -> Result<Self> {
        let sets = SETS
            .iter()
            .filter(|name| catalogue.contains(name))
            .map(|&name| CloggerSet::new(name, catalogue.get(name)?.to_vec()))
            .collect::<Result<Vec<_>>>()?;

        if sets.is_empty() {
            return Err(CodecError::MissingFile(SETS[0].to_string()));
        }
        Ok(Clogger::new(sets))
    }

    pub fn sets(&self) -> &[CloggerSet] {
        &self.sets
    }

    pub fn set_mut(&mut self, name: &str) -> Option<&mut CloggerSet> {
        self.sets.iter_mut().find(|set| set.name == name)
    }
}

impl Game for Clogger {
    fn kind(&self) -> GameKind {
        GameKind::Clogger
    }

    fn levels(&self) -> Result<Vec<NamedLevel>> {
        let mut levels = Vec::new();
        for set in &self.sets {
            for level in 1..=LEVELS_PER_SET {
                levels.push(NamedLevel::new(
                    format!("{} {}", set.name, level),
                    set.read_level(level)?,
                ));
            }
        }
        Ok(levels)
    }

    fn sprites(&self) -> Result<SpriteSheet<String>> {
        let mut named = Vec::new();
        for set in &self.sets {
            for level in 1..=LEVELS_PER_SET {
                for (tile, sprite) in set.read_sprites(level)?.sprites {
                    named.push((
                        format!("{} {} {}", set.name, level, tile_key(tile as usize)),
                        sprite,
                    ));
                }
                for piece in 0..PUZZLE_PIECES {
                    named.push((
                        format!("{} {} piece {:02}", set.name, level, piece),
                        set.read_puzzle_piece(level, piece)?.sprite,
                    ));
                }
            }
        }
        Ok(sheet_from_named(named))
    }

    fn entities(&self) -> Result<Value> {
        let mut levels = Vec::new();
        for set in &self.sets {
            for level in 1..=LEVELS_PER_SET {
                let mut targets = Vec::with_capacity(PUZZLE_PIECES);
                let mut unknown = Vec::new();
                for piece in 0..PUZZLE_PIECES {
                    targets.push(set.target_position(level, piece)?);
                    let decoded = set.read_puzzle_piece(level, piece)?;
                    if !decoded.unknown_values.is_empty() {
                        unknown.push(json!({ "piece": piece, "values": decoded.unknown_values }));
                    }
                }
                levels.push(json!({
                    "set": set.name,
                    "level": level,
                    "password": set.password(level)?,
                    "targets": targets,
                    "unknown_blocks": unknown,
                }));
            }
        }
        Ok(Value::Array(levels))
    }

    fn text_map(&self) -> Result<Option<String>> {
        let mut levels = Vec::new();
        for set in &self.sets {
            for level in 1..=LEVELS_PER_SET {
                levels.push(text_map(&set.read_level(level)?));
            }
        }
        Ok(Some(text_maps(levels)))
    }
}
