//! Icarus
//!
//! Twenty scrambled level files, one per deck, each starting with a 32x32
//! byte map. Edited levels are written back into the unscrambled bytes and
//! then checksummed and scrambled again.

use log::debug;
use serde::Serialize;
use serde_json::{json, Value};

use super::{narrow_tile, nth_level, sheet_from_named, Game, GameKind, NamedLevel, NARROW_TILE_LEN};
use crate::binary_utils::ByteBuffer;
use crate::error::{CodecError, Result};
use crate::filesystem::FileCatalogue;
use crate::graphics::{SpriteImage, SpriteSheet};
use crate::maps::entities::Position;
use crate::maps::scramble::{ChecksumConfig, ScrambleKey};
use crate::maps::TileGrid;

pub const LEVEL_COUNT: usize = 20;
pub const SPRITE_FILE: &str = "Prog2";
pub const SIZE: usize = 32;

/// Shortest file holding the map and both positions
pub const MIN_LEVEL_LEN: usize = 0x40c;

pub const CHECKSUMS: ChecksumConfig = ChecksumConfig {
    key: ScrambleKey::IndexPlusOne,
    checksums: &[
        0xf4, 0x6f, 0xfe, 0x74, 0x83, 0x5b, 0x5f, 0x14, 0xd3, 0xdc, 0x18, 0x89, 0xf1, 0xbd, 0x20,
        0x34, 0xfa, 0xbb, 0x06, 0x73,
    ],
};

const EXIT: (usize, usize) = (0x402, 0x403);
const PLAYER: (usize, usize) = (0x40a, 0x40b);

const SPRITE_STEP: usize = 24;

// "tl_pipe" appears twice; the second entry is the one kept.
const SPRITE_NAMES: &[(usize, &[&str])] = &[
    (0x040c, &["wall1"]),
    (0x0500, &["wall2"]),
    (
        0x0530,
        &[
            "vending", "player_up0", "player_up1", "player_right0",
            "player_left0", "beam", "robot_up", "robot_left",
            "v_laser", "h_laser", "fire_up", "fire_left",
            "explosion0", "explosion1", "lift", "v_dead_top",
            "v_dead_bottom", "h_dead_top", "h_dead_bottom",
            "breakable0", "breakable1", "breakable2", "breakable3",
            "one_way_up", "one_way_left", "mine_inactive", "v_pipe",
            "h_pipe", "tl_pipe", "tl_pipe", "emitter_up",
            "emitter_left", "switch", "h_door1", "h_door2",
            "h_door3", "v_door1", "v_door2", "v_door3",
            "blank", "h_door_thin1", "h_door_thin2", "h_door_thin3",
            "v_door_thin1", "v_door_thin2", "v_door_thin3",
            "exit_open", "exit_closed", "credit", "mine_active",
            "crate", "card1", "door1", "door2",
            "door3", "door4", "door5", "door6",
            "card2", "card3", "card4", "card5",
            "card6", "wall3", "wall4", "h_door",
            "v_door", "armour", "weapon", "recharge",
        ],
    ),
];

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IcarusLevel {
    pub tiles: TileGrid,
    /// Stored by the game but apparently unused
    pub exit: Position,
    pub player: Position,
    pub wall_sprite: SpriteImage,
}

impl IcarusLevel {
    pub fn from_plain(data: &[u8]) -> Result<Self> {
        if data.len() < MIN_LEVEL_LEN {
            return Err(CodecError::size_mismatch(
                "Icarus level",
                MIN_LEVEL_LEN,
                data.len(),
            ));
        }

        Ok(IcarusLevel {
            tiles: TileGrid::from_cells(SIZE, SIZE, data[..SIZE * SIZE].to_vec())?,
            exit: (data[EXIT.0], data[EXIT.1]),
            player: (data[PLAYER.0], data[PLAYER.1]),
            wall_sprite: narrow_tile(data, data.len() - 2 * NARROW_TILE_LEN)?,
        })
    }

    /// Copy the map and positions into unscrambled level bytes
    pub fn write_into(&self, plain: &mut ByteBuffer) -> Result<()> {
        if self.tiles.width() != SIZE || self.tiles.height() != SIZE {
            return Err(CodecError::size_mismatch(
                "Icarus map",
                SIZE * SIZE,
                self.tiles.width() * self.tiles.height(),
            ));
        }
        plain.splice(0, self.tiles.cells())?;
        plain.set(EXIT.0, self.exit.0)?;
        plain.set(EXIT.1, self.exit.1)?;
        plain.set(PLAYER.0, self.player.0)?;
        plain.set(PLAYER.1, self.player.1)
    }
}

pub struct Icarus {
    /// Level files as stored, still scrambled
    levels: Vec<Vec<u8>>,
    sprite_data: Vec<u8>,
}

impl Icarus {
    pub fn new(levels: Vec<Vec<u8>>, sprite_data: Vec<u8>) -> Self {
        Icarus {
            levels,
            sprite_data,
        }
    }

    /// DECKA for level 1 through DECKT for level 20
    pub fn level_file(number: usize) -> String {
        let letter = (b'A' + (number.saturating_sub(1) % 26) as u8) as char;
        format!("DECK{}", letter)
    }

    pub fn from_catalogue(catalogue: &FileCatalogue) -> Result<Self> {
        let levels = (1..=LEVEL_COUNT)
            .map(|n| catalogue.get(&Self::level_file(n)).map(<[u8]>::to_vec))
            .collect::<Result<Vec<_>>>()?;
        let sprite_data = catalogue.get(SPRITE_FILE)?.to_vec();
        Ok(Icarus::new(levels, sprite_data))
    }

    pub fn stored_level(&self, number: usize) -> Result<&[u8]> {
        nth_level(&self.levels, number).map(Vec::as_slice)
    }

    pub fn read_level(&self, number: usize) -> Result<IcarusLevel> {
        let plain = CHECKSUMS.decode_level(self.stored_level(number)?);
        if !CHECKSUMS.verify(number, &plain)? {
            debug!("deck {}: checksum does not match", number);
        }
        IcarusLevel::from_plain(&plain)
    }

    /// Replace a level, keeping the bytes the decoder does not interpret
    pub fn write_level(&mut self, number: usize, level: &IcarusLevel) -> Result<()> {
        let mut plain = ByteBuffer::new(CHECKSUMS.decode_level(self.stored_level(number)?));
        level.write_into(&mut plain)?;
        let stored = CHECKSUMS.encode_level(number, plain.as_slice())?;
        self.levels[number - 1] = stored;
        Ok(())
    }

    pub fn read_sprites(&self) -> Result<SpriteSheet<String>> {
        let mut named = Vec::new();
        for &(base, names) in SPRITE_NAMES {
            for (i, name) in names.iter().enumerate() {
                let sprite = narrow_tile(&self.sprite_data, base + i * SPRITE_STEP)?;
                named.push((name.to_string(), sprite));
            }
        }
        Ok(sheet_from_named(named))
    }
}

impl Game for Icarus {
    fn kind(&self) -> GameKind {
        GameKind::Icarus
    }

    fn levels(&self) -> Result<Vec<NamedLevel>> {
        (1..=self.levels.len())
            .map(|n| Ok(NamedLevel::new(Self::level_file(n), self.read_level(n)?.tiles)))
            .collect()
    }

    fn sprites(&self) -> Result<SpriteSheet<String>> {
        self.read_sprites()
    }

    fn entities(&self) -> Result<Value> {
        let levels = (1..=self.levels.len())
            .map(|n| {
                let level = self.read_level(n)?;
                Ok(json!({
                    "level": Self::level_file(n),
                    "exit": level.exit,
                    "player": level.player,
                }))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Value::Array(levels))
    }
}
