//! Readers for the individual games
//!
//! Each reader owns the bytes of the files it needs and composes the codecs
//! in [`crate::maps`] and [`crate::graphics`] with that game's offsets and
//! tables. [`GameKind::open`] builds one from a [`FileCatalogue`].

pub mod bone_cruncher;
pub mod clogger;
pub mod dunjunz;
pub mod firetrack;
pub mod icarus;
pub mod mushrooms;
pub mod ravenskull;
pub mod repton;
pub mod shark;

use clap::ValueEnum;
use serde::Serialize;
use serde_json::Value;

use crate::error::{CodecError, Result};
use crate::filesystem::FileCatalogue;
use crate::graphics::assembler::{assemble_sprite, BlockLayout};
use crate::graphics::{SpriteImage, SpriteSheet};
use crate::maps::scramble::ChecksumConfig;
use crate::maps::TileGrid;

pub use bone_cruncher::BoneCruncher;
pub use clogger::Clogger;
pub use dunjunz::Dunjunz;
pub use firetrack::Firetrack;
pub use icarus::Icarus;
pub use mushrooms::MagicMushrooms;
pub use ravenskull::Ravenskull;
pub use repton::{Repton, ReptonVersion};
pub use shark::Shark;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GameKind {
    BoneCruncher,
    Dunjunz,
    Icarus,
    Firetrack,
    ReptonElectron,
    ReptonBbc,
    Clogger,
    Ravenskull,
    Shark,
    MagicMushrooms,
}

/// A decoded level together with the name the game (or file) gives it
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NamedLevel {
    pub name: String,
    pub grid: TileGrid,
}

impl NamedLevel {
    pub fn new(name: impl Into<String>, grid: TileGrid) -> Self {
        NamedLevel {
            name: name.into(),
            grid,
        }
    }
}

/// Common read interface used by the command line tool
pub trait Game {
    fn kind(&self) -> GameKind;

    fn levels(&self) -> Result<Vec<NamedLevel>>;

    fn sprites(&self) -> Result<SpriteSheet<String>>;

    /// Objects placed on the levels, for games that store them apart from the map
    fn entities(&self) -> Result<Value> {
        Ok(Value::Null)
    }

    /// Every level drawn as text, each followed by a blank line, or `None`
    /// for games without a text format
    fn text_map(&self) -> Result<Option<String>> {
        Ok(None)
    }
}

impl GameKind {
    pub fn open(self, catalogue: &FileCatalogue) -> Result<Box<dyn Game>> {
        self.open_with_maps(catalogue, &[])
    }

    /// Like [`GameKind::open`], naming the map files for games that keep
    /// them under arbitrary names (Magic Mushrooms)
    pub fn open_with_maps(
        self,
        catalogue: &FileCatalogue,
        map_files: &[String],
    ) -> Result<Box<dyn Game>> {
        Ok(match self {
            GameKind::BoneCruncher => Box::new(BoneCruncher::from_catalogue(catalogue)?),
            GameKind::Dunjunz => Box::new(Dunjunz::from_catalogue(catalogue)?),
            GameKind::Icarus => Box::new(Icarus::from_catalogue(catalogue)?),
            GameKind::Firetrack => Box::new(Firetrack::from_catalogue(catalogue)?),
            GameKind::ReptonElectron => {
                Box::new(Repton::from_catalogue(catalogue, ReptonVersion::Electron)?)
            }
            GameKind::ReptonBbc => Box::new(Repton::from_catalogue(catalogue, ReptonVersion::Bbc)?),
            GameKind::Clogger => Box::new(Clogger::from_catalogue(catalogue)?),
            GameKind::Ravenskull => Box::new(Ravenskull::from_catalogue(catalogue)?),
            GameKind::Shark => Box::new(Shark::from_catalogue(catalogue)?),
            GameKind::MagicMushrooms => {
                Box::new(MagicMushrooms::from_catalogue(catalogue, map_files)?)
            }
        })
    }

    /// Scramble key and checksum table, for games whose levels carry them
    pub fn checksum_config(self) -> Option<ChecksumConfig> {
        match self {
            GameKind::Dunjunz => Some(dunjunz::CHECKSUMS),
            GameKind::Icarus => Some(icarus::CHECKSUMS),
            _ => None,
        }
    }
}

/// Key used in sprite sheets for numbered tiles
pub(crate) fn tile_key(number: usize) -> String {
    format!("{:#04x}", number)
}

pub(crate) fn level_name(prefix: &str, number: usize) -> String {
    format!("{} {}", prefix, number)
}

/// Look up the 1-based level `number` in `levels`
pub(crate) fn nth_level<T>(levels: &[T], number: usize) -> Result<&T> {
    number
        .checked_sub(1)
        .and_then(|i| levels.get(i))
        .ok_or(CodecError::LevelOutOfRange {
            level: number,
            count: levels.len(),
        })
}

/// Join rendered levels into one text, each followed by a blank line
pub(crate) fn text_maps<I>(levels: I) -> String
where
    I: IntoIterator<Item = String>,
{
    let mut text = String::new();
    for level in levels {
        text.push_str(&level);
        text.push('\n');
    }
    text
}

/// Gather (name, sprite) pairs into a sheet; a repeated name keeps the last sprite
pub(crate) fn sheet_from_named<I>(named: I) -> SpriteSheet<String>
where
    I: IntoIterator<Item = (String, SpriteImage)>,
{
    let mut sheet = SpriteSheet::new();
    for (name, sprite) in named {
        sheet.insert(name, sprite);
    }
    sheet
}

/// 8x12 tiles stored as twelve rows of two bytes, left byte first
pub(crate) const NARROW_TILE: BlockLayout = BlockLayout::columns(2)
    .with_block_height(12)
    .with_row_stride(2);
pub(crate) const NARROW_TILE_LEN: usize = 24;

pub(crate) fn narrow_tile(data: &[u8], offset: usize) -> Result<SpriteImage> {
    assemble_sprite(data, &[Some(offset), Some(offset + 1)], &NARROW_TILE)
}
