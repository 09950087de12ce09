//! Repton sprites
//!
//! The Electron and BBC Micro versions draw the same 32 tiles from different
//! block tables: 2x2 blocks (8x16) on the Electron, 4x4 blocks (16x32) on the
//! BBC. Unused blocks point at a blank area of the file.

use super::{sheet_from_named, tile_key, Game, GameKind, NamedLevel};
use crate::error::Result;
use crate::filesystem::FileCatalogue;
use crate::graphics::assembler::{assemble_sprite, present, BlockLayout};
use crate::graphics::SpriteSheet;

pub const SPRITE_FILE: &str = "REPTON2";
pub const TILE_COUNT: usize = 32;

#[rustfmt::skip]
const ELECTRON_TABLE: [[usize; 4]; TILE_COUNT] = [
    [0x6a0, 0x6a0, 0x6a0, 0x6a0], // blank
    [0x110, 0x118, 0x120, 0x128], // diamond
    [0x130, 0x138, 0x140, 0x148], // boulder
    [0x150, 0x158, 0x160, 0x168], // egg
    [0x170, 0x178, 0x180, 0x188], // key
    [0x108, 0x108, 0x108, 0x108], // earth
    [0x0f0, 0x0f8, 0x100, 0x0f0], // earth
    [0x0f8, 0x0f0, 0x0f0, 0x100], // earth
    [0x0d0, 0x0d8, 0x0e0, 0x0e8], // safe
    [0x050, 0x050, 0x050, 0x050], // brick wall
    [0x0b0, 0x0b8, 0x0b0, 0x0b8], // double (top/bottom) wall
    [0x0a0, 0x0a0, 0x0a8, 0x0a8], // double (left/right) wall
    [0x000, 0x008, 0x008, 0x000], // quadruple wall
    [0x0c0, 0x0c8, 0x0c0, 0x0c8], // fancy wall
    [0x098, 0x098, 0x098, 0x098], // smooth wall
    [0x098, 0x098, 0x078, 0x078], // lower edged smooth wall
    [0x060, 0x060, 0x098, 0x098], // upper edged smooth wall
    [0x098, 0x090, 0x098, 0x090], // right edged smooth wall
    [0x088, 0x098, 0x088, 0x098], // left edged smooth wall
    [0x098, 0x090, 0x078, 0x080], // lower right curved smooth wall
    [0x088, 0x098, 0x070, 0x078], // lower left curved smooth wall
    [0x060, 0x068, 0x098, 0x090], // upper right curved smooth wall
    [0x058, 0x060, 0x088, 0x098], // upper left curved smooth wall
    [0x190, 0x198, 0x1a0, 0x1a8], // map
    [0x050, 0x050, 0x030, 0x030], // lower edged brick wall
    [0x018, 0x018, 0x050, 0x050], // upper edged brick wall
    [0x050, 0x048, 0x050, 0x048], // right edged brick wall
    [0x040, 0x050, 0x040, 0x050], // left edged brick wall
    [0x050, 0x048, 0x030, 0x038], // lower right curved brick wall
    [0x040, 0x050, 0x028, 0x030], // lower left curved brick wall
    [0x018, 0x020, 0x050, 0x048], // upper right curved brick wall
    [0x010, 0x018, 0x040, 0x050], // upper left curved brick wall
];

#[rustfmt::skip]
const BBC_TABLE: [[usize; 16]; TILE_COUNT] = [
    // blank
    [
        0x6a0, 0x6a0, 0x6a0, 0x6a0,
        0x6a0, 0x6a0, 0x6a0, 0x6a0,
        0x6a0, 0x6a0, 0x6a0, 0x6a0,
        0x6a0, 0x6a0, 0x6a0, 0x6a0,
    ],
    // diamond
    [
        0x6a0, 0x0e0, 0x0e8, 0x6a0,
        0x0e0, 0x100, 0x108, 0x0e8,
        0x0f0, 0x108, 0x100, 0x0f8,
        0x6a0, 0x0f0, 0x0f8, 0x6a0,
    ],
    // boulder
    [
        0x000, 0x008, 0x010, 0x018,
        0x140, 0x148, 0x150, 0x158,
        0x280, 0x288, 0x290, 0x298,
        0x3c0, 0x3c8, 0x3d0, 0x3d8,
    ],
    // egg
    [
        0x020, 0x028, 0x030, 0x038,
        0x160, 0x168, 0x170, 0x178,
        0x2a0, 0x2a8, 0x2b0, 0x2b8,
        0x3e0, 0x3e8, 0x3f0, 0x3f8,
    ],
    // key
    [
        0x040, 0x048, 0x050, 0x058,
        0x180, 0x188, 0x190, 0x198,
        0x2c0, 0x2c8, 0x2d0, 0x2d8,
        0x400, 0x408, 0x410, 0x418,
    ],
    // earth
    [
        0x110, 0x118, 0x120, 0x128,
        0x130, 0x138, 0x128, 0x130,
        0x110, 0x120, 0x138, 0x138,
        0x128, 0x110, 0x120, 0x130,
    ],
    // earth
    [
        0x138, 0x110, 0x120, 0x138,
        0x118, 0x128, 0x118, 0x110,
        0x138, 0x120, 0x110, 0x138,
        0x110, 0x118, 0x130, 0x128,
    ],
    // earth
    [
        0x110, 0x118, 0x120, 0x128,
        0x130, 0x138, 0x118, 0x130,
        0x110, 0x120, 0x118, 0x138,
        0x128, 0x110, 0x120, 0x130,
    ],
    // safe
    [
        0x1b8, 0x1c0, 0x1c0, 0x1c8,
        0x1d0, 0x1d8, 0x1d8, 0x1e0,
        0x1d0, 0x1d8, 0x1d8, 0x1e0,
        0x1e8, 0x1f0, 0x1f0, 0x1f8,
    ],
    // brick wall
    [
        0x200, 0x208, 0x200, 0x208,
        0x200, 0x208, 0x200, 0x208,
        0x200, 0x208, 0x200, 0x208,
        0x200, 0x208, 0x200, 0x208,
    ],
    // double (top/bottom) wall
    [
        0x088, 0x080, 0x080, 0x090,
        0x098, 0x070, 0x070, 0x0a0,
        0x088, 0x080, 0x080, 0x090,
        0x098, 0x070, 0x070, 0x0a0,
    ],
    // double (left/right) wall
    [
        0x0d0, 0x0d8, 0x0d0, 0x0d8,
        0x0b0, 0x0b8, 0x0b0, 0x0b8,
        0x0b0, 0x0b8, 0x0b0, 0x0b8,
        0x0c0, 0x0c8, 0x0c0, 0x0c8,
    ],
    // quadruple wall
    [
        0x0d0, 0x0d8, 0x0d0, 0x0d8,
        0x0c0, 0x0c8, 0x0c0, 0x0c8,
        0x0d0, 0x0d8, 0x0d0, 0x0d8,
        0x0c0, 0x0c8, 0x0c0, 0x0c8,
    ],
    // fancy wall
    [
        0x1a0, 0x1a8, 0x1a8, 0x1b0,
        0x1a8, 0x1b0, 0x1a0, 0x1a8,
        0x1a0, 0x1a8, 0x1a8, 0x1b0,
        0x1a8, 0x1b0, 0x1a0, 0x1a8,
    ],
    // smooth wall
    [
        0x060, 0x060, 0x060, 0x060,
        0x060, 0x060, 0x060, 0x060,
        0x060, 0x060, 0x060, 0x060,
        0x060, 0x060, 0x060, 0x060,
    ],
    // lower edged smooth wall
    [
        0x060, 0x060, 0x060, 0x060,
        0x060, 0x060, 0x060, 0x060,
        0x060, 0x060, 0x060, 0x060,
        0x070, 0x070, 0x070, 0x070,
    ],
    // upper edged smooth wall
    [
        0x080, 0x080, 0x080, 0x080,
        0x060, 0x060, 0x060, 0x060,
        0x060, 0x060, 0x060, 0x060,
        0x060, 0x060, 0x060, 0x060,
    ],
    // right edged smooth wall
    [
        0x060, 0x060, 0x060, 0x078,
        0x060, 0x060, 0x060, 0x078,
        0x060, 0x060, 0x060, 0x078,
        0x060, 0x060, 0x060, 0x078,
    ],
    // left edged smooth wall
    [
        0x068, 0x060, 0x060, 0x060,
        0x068, 0x060, 0x060, 0x060,
        0x068, 0x060, 0x060, 0x060,
        0x068, 0x060, 0x060, 0x060,
    ],
    // lower right curved smooth wall
    [
        0x060, 0x060, 0x060, 0x078,
        0x060, 0x060, 0x060, 0x078,
        0x060, 0x060, 0x060, 0x078,
        0x070, 0x070, 0x070, 0x0a0,
    ],
    // lower left curved smooth wall
    [
        0x068, 0x060, 0x060, 0x060,
        0x068, 0x060, 0x060, 0x060,
        0x068, 0x060, 0x060, 0x060,
        0x098, 0x070, 0x070, 0x070,
    ],
    // upper right curved smooth wall
    [
        0x080, 0x080, 0x080, 0x090,
        0x060, 0x060, 0x060, 0x078,
        0x060, 0x060, 0x060, 0x078,
        0x060, 0x060, 0x060, 0x078,
    ],
    // upper left curved smooth wall
    [
        0x088, 0x080, 0x080, 0x080,
        0x068, 0x060, 0x060, 0x060,
        0x068, 0x060, 0x060, 0x060,
        0x068, 0x060, 0x060, 0x060,
    ],
    // brick wall
    [
        0x200, 0x208, 0x200, 0x208,
        0x200, 0x208, 0x200, 0x208,
        0x200, 0x208, 0x200, 0x208,
        0x200, 0x208, 0x200, 0x208,
    ],
    // lower edged brick wall
    [
        0x200, 0x208, 0x200, 0x208,
        0x200, 0x208, 0x200, 0x208,
        0x200, 0x208, 0x200, 0x208,
        0x230, 0x238, 0x230, 0x238,
    ],
    // upper edged brick wall
    [
        0x210, 0x218, 0x210, 0x218,
        0x200, 0x208, 0x200, 0x208,
        0x200, 0x208, 0x200, 0x208,
        0x200, 0x208, 0x200, 0x208,
    ],
    // right edged brick wall
    [
        0x200, 0x208, 0x200, 0x228,
        0x200, 0x208, 0x200, 0x228,
        0x200, 0x208, 0x200, 0x228,
        0x200, 0x208, 0x200, 0x228,
    ],
    // left edged brick wall
    [
        0x220, 0x208, 0x200, 0x208,
        0x220, 0x208, 0x200, 0x208,
        0x220, 0x208, 0x200, 0x208,
        0x220, 0x208, 0x200, 0x208,
    ],
    // lower right curved brick wall
    [
        0x200, 0x208, 0x200, 0x228,
        0x200, 0x208, 0x200, 0x228,
        0x200, 0x208, 0x200, 0x228,
        0x230, 0x238, 0x270, 0x278,
    ],
    // lower left curved brick wall
    [
        0x220, 0x208, 0x200, 0x208,
        0x220, 0x208, 0x200, 0x208,
        0x220, 0x208, 0x200, 0x208,
        0x260, 0x268, 0x230, 0x238,
    ],
    // upper right curved brick wall
    [
        0x210, 0x218, 0x250, 0x258,
        0x200, 0x208, 0x200, 0x228,
        0x200, 0x208, 0x200, 0x228,
        0x200, 0x208, 0x200, 0x228,
    ],
    // upper left curved brick wall
    [
        0x240, 0x248, 0x210, 0x218,
        0x220, 0x208, 0x200, 0x208,
        0x220, 0x208, 0x200, 0x208,
        0x220, 0x208, 0x200, 0x208,
    ],
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReptonVersion {
    Electron,
    Bbc,
}

impl ReptonVersion {
    pub fn layout(self) -> BlockLayout {
        match self {
            ReptonVersion::Electron => BlockLayout::columns(2),
            ReptonVersion::Bbc => BlockLayout::columns(4),
        }
    }

    pub fn offsets(self, tile: usize) -> Option<&'static [usize]> {
        match self {
            ReptonVersion::Electron => ELECTRON_TABLE.get(tile).map(|o| o.as_slice()),
            ReptonVersion::Bbc => BBC_TABLE.get(tile).map(|o| o.as_slice()),
        }
    }
}

/// Sprite reader only; the level format is not decoded
pub struct Repton {
    version: ReptonVersion,
    data: Vec<u8>,
}

impl Repton {
    pub fn new(version: ReptonVersion, data: Vec<u8>) -> Self {
        Repton { version, data }
    }

    pub fn from_catalogue(catalogue: &FileCatalogue, version: ReptonVersion) -> Result<Self> {
        Ok(Repton::new(version, catalogue.get(SPRITE_FILE)?.to_vec()))
    }

    pub fn read_sprites(&self) -> Result<SpriteSheet<usize>> {
        let layout = self.version.layout();
        let mut sheet = SpriteSheet::new();
        for tile in 0..TILE_COUNT {
            let offsets = self.version.offsets(tile).unwrap_or_default();
            sheet.insert(tile, assemble_sprite(&self.data, &present(offsets), &layout)?);
        }
        Ok(sheet)
    }
}

impl Game for Repton {
    fn kind(&self) -> GameKind {
        match self.version {
            ReptonVersion::Electron => GameKind::ReptonElectron,
            ReptonVersion::Bbc => GameKind::ReptonBbc,
        }
    }

    fn levels(&self) -> Result<Vec<NamedLevel>> {
        Ok(Vec::new())
    }

    fn sprites(&self) -> Result<SpriteSheet<String>> {
        Ok(sheet_from_named(
            self.read_sprites()?
                .sprites
                .into_iter()
                .map(|(tile, sprite)| (tile_key(tile), sprite)),
        ))
    }
}
