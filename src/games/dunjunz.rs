//! Dunjunz
//!
//! Each of the 25 levels is a scrambled file holding entity tables, two bit
//! grids (solid walls and collectable squares) and the level's wall tile.
//! There is no tile map: the map view is derived from those parts.

use std::collections::BTreeSet;

use log::debug;
use serde::Serialize;
use serde_json::{json, Value};

use super::{
    narrow_tile, nth_level, sheet_from_named, text_maps, Game, GameKind, NamedLevel, NARROW_TILE_LEN,
};
use crate::error::{CodecError, Result};
use crate::filesystem::FileCatalogue;
use crate::graphics::{SpriteImage, SpriteSheet};
use crate::maps::entities::{
    decode_bit_grid, decode_entities, BitGrid, BitGridLayout, EntityLayout, EntityTable, Field,
    Position,
};
use crate::maps::scramble::{ChecksumConfig, ScrambleKey};
use crate::maps::TileGrid;

pub const LEVEL_COUNT: usize = 25;
pub const SPRITE_FILE: &str = "Dunjunz";

/// Shortest file that holds every table and both bit grids
pub const MIN_LEVEL_LEN: usize = 0x270;

pub const COLUMNS: usize = 32;
pub const ROWS: usize = 48;

pub const CHECKSUMS: ChecksumConfig = ChecksumConfig {
    key: ScrambleKey::Index,
    checksums: &[
        0x62, 0xcd, 0x0c, 0x44, 0x4d, 0x22, 0xf6, 0x42, 0x21, 0x7d, 0x5d, 0xd8, 0xa0, 0xf1, 0x0f,
        0xcc, 0xd3, 0x53, 0x3b, 0x83, 0x71, 0xb2, 0x6f, 0xf3, 0xf1,
    ],
};

pub const ITEMS: EntityLayout = EntityLayout {
    first_slot: 1,
    slots: 0x1f,
    x: 0x00,
    y: 0x20,
    values: &[0x40],
    absent_if: &[Field::Value(0)],
};

/// Doors carry their orientation as the single value
pub const DOORS: EntityLayout = EntityLayout {
    first_slot: 1,
    slots: 20,
    x: 0x60,
    y: 0x75,
    values: &[0x8a],
    absent_if: &[Field::X, Field::Y, Field::Value(0)],
};

pub const KEYS: EntityLayout = EntityLayout {
    first_slot: 1,
    slots: 20,
    x: 0xa0,
    y: 0xb5,
    values: &[],
    absent_if: &[Field::X, Field::Y],
};

const TRAPDOOR_X: usize = 0xd0;
const TRAPDOOR_Y: usize = 0xd8;
const TRAPDOORS: usize = 8;

pub const SOLID: BitGridLayout = BitGridLayout {
    offset: 0xe0,
    rows: ROWS,
    columns: COLUMNS,
    block_stride: 0x20,
};

pub const COLLECTABLE: BitGridLayout = BitGridLayout {
    offset: 0x1b0,
    ..SOLID
};

const EXIT_X: usize = 0x1e;
const EXIT_Y: usize = 0x3e;

pub const TELEPORTER: u8 = 0x2b;
pub const HORIZONTAL_DOOR: u8 = 0x1d;

/// Squares the players start on
const START_AREA: std::ops::RangeInclusive<usize> = 11..=12;

const SPRITE_STEP: usize = 48;

const SPRITE_NAMES: &[(usize, &[&str])] = &[
    (0x0140, &["boots", "armour", "potion", "dagger", "weapons", "crucifix"]),
    (0x0e40, &["sword_up", "sword_right", "sword_down", "sword_left"]),
    (
        0x1100,
        &["ranger_left1", "skull0", "skull1", "skull2", "skull3", "skull4"],
    ),
    (0x1910, &["drainer"]),
    (0x19e0, &["exit"]),
    (
        0x1a40,
        &[
            "wizard_up0", "wizard_up1", "wizard_right0", "wizard_right1",
            "wizard_down0", "wizard_down1", "wizard_left0", "wizard_left1",
            "barbarian_up0", "barbarian_up1", "barbarian_right0", "barbarian_right1",
            "barbarian_down0", "barbarian_down1", "barbarian_left0", "barbarian_left1",
            "fighter_up0", "fighter_up1", "fighter_right0", "fighter_right1",
            "fighter_down0", "fighter_down1", "fighter_left0", "fighter_left1",
            "fireball_up", "fireball_right", "fireball_down", "fireball_left",
            "axe_up", "axe_right", "axe_down", "axe_left",
            "key", "treasure", "food",
        ],
    ),
    (0x2100, &["teleport"]),
    (0x2208, &["v_door"]),
    (0x2240, &["exp0", "exp1", "exp2", "exp3", "trapdoor"]),
    (
        0x2340,
        &["arrow_up", "arrow_right", "arrow_down", "arrow_left", "h_door"],
    ),
    (
        0x2440,
        &[
            "block", "ranger_up0", "ranger_up1", "ranger_right0", "ranger_right1",
            "ranger_down0", "ranger_down1", "ranger_left0",
            "enemy_up0", "enemy_up1", "enemy_right0", "enemy_right1",
            "enemy_down0", "enemy_down1", "enemy_left0", "enemy_left1",
        ],
    ),
];

/// What occupies one square of the derived map
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cell {
    Empty,
    Wall,
    HorizontalDoor,
    VerticalDoor,
    Key,
    Trapdoor,
    Start,
    /// Collectable square with no item listed for it
    UnknownCollectable,
    Item(u8),
}

impl Cell {
    /// Tile id used in the derived [`TileGrid`]; items keep their type byte
    pub fn code(self) -> u8 {
        match self {
            Cell::Empty => 0x00,
            Cell::Wall => 0x01,
            Cell::HorizontalDoor => 0x02,
            Cell::VerticalDoor => 0x03,
            Cell::Key => 0x04,
            Cell::Trapdoor => 0x05,
            Cell::Start => 0x06,
            Cell::UnknownCollectable => 0x07,
            Cell::Item(kind) => kind,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Cell::Empty => ' ',
            Cell::Wall => '#',
            Cell::HorizontalDoor => '-',
            Cell::VerticalDoor => '|',
            Cell::Key => 'k',
            Cell::Trapdoor => 'O',
            Cell::Start => 'S',
            Cell::UnknownCollectable => '!',
            Cell::Item(kind) => item_symbol(kind),
        }
    }
}

fn item_symbol(kind: u8) -> char {
    match kind {
        0x28 => 'T', // treasure
        0x29 => 'F', // food
        0x2a => '+', // crucifix
        TELEPORTER => 'X',
        0x51 => 'E', // exit
        0x53 => '*', // energy drainer
        0x5f => 'B', // boots of speed
        0x60 => 'A', // armour
        0x61 => 'P', // potion
        0x62 => 'W', // weapons
        0x63 => 'D', // dagger
        _ => '?',
    }
}

/// One unscrambled level
#[derive(Clone, Debug, Serialize)]
pub struct DunjunzLevel {
    pub items: EntityTable,
    /// Teleporter squares in slot order; each leads to the next
    pub teleporters: Vec<Position>,
    pub doors: EntityTable,
    pub keys: EntityTable,
    pub trapdoors: BTreeSet<Position>,
    pub solid: BitGrid,
    pub collectable: BitGrid,
    pub exit: Position,
    pub wall_sprite: SpriteImage,
}

impl DunjunzLevel {
    pub fn from_plain(data: &[u8]) -> Result<Self> {
        if data.len() < MIN_LEVEL_LEN {
            return Err(CodecError::size_mismatch(
                "Dunjunz level",
                MIN_LEVEL_LEN,
                data.len(),
            ));
        }

        let items = decode_entities(data, &ITEMS)?;
        let teleporters = (ITEMS.first_slot..ITEMS.first_slot + ITEMS.slots)
            .filter(|&slot| data[ITEMS.values[0] + slot] == TELEPORTER)
            .map(|slot| (data[ITEMS.x + slot], data[ITEMS.y + slot]))
            .collect();

        // Unused trapdoor slots are not marked; they all land on one square.
        let trapdoors = (0..TRAPDOORS)
            .map(|i| (data[TRAPDOOR_X + i], data[TRAPDOOR_Y + i]))
            .collect();

        Ok(DunjunzLevel {
            items,
            teleporters,
            doors: decode_entities(data, &DOORS)?,
            keys: decode_entities(data, &KEYS)?,
            trapdoors,
            solid: decode_bit_grid(data, &SOLID)?,
            collectable: decode_bit_grid(data, &COLLECTABLE)?,
            exit: (data[EXIT_X], data[EXIT_Y]),
            wall_sprite: narrow_tile(data, data.len() - 2 * NARROW_TILE_LEN)?,
        })
    }

    pub fn is_solid(&self, row: usize, column: usize) -> bool {
        self.solid.is_set(row, column)
    }

    /// Collectable squares are the clear bits
    pub fn is_collectable(&self, row: usize, column: usize) -> bool {
        row < ROWS && column < COLUMNS && !self.collectable.is_set(row, column)
    }

    pub fn cell(&self, column: usize, row: usize) -> Cell {
        let position = (column as u8, row as u8);

        if START_AREA.contains(&row) && START_AREA.contains(&column) {
            Cell::Start
        } else if self.keys.get(position).is_some() {
            Cell::Key
        } else if self.trapdoors.contains(&position) {
            Cell::Trapdoor
        } else if self.is_solid(row, column) {
            match self.doors.get(position) {
                Some(door) if door.values.first() == Some(&HORIZONTAL_DOOR) => {
                    Cell::HorizontalDoor
                }
                Some(_) => Cell::VerticalDoor,
                None => Cell::Wall,
            }
        } else if self.is_collectable(row, column) {
            self.items
                .get(position)
                .and_then(|item| item.values.first().copied())
                .map_or(Cell::UnknownCollectable, Cell::Item)
        } else {
            Cell::Empty
        }
    }

    pub fn to_grid(&self) -> Result<TileGrid> {
        let mut grid = TileGrid::new(COLUMNS, ROWS);
        for row in 0..ROWS {
            for column in 0..COLUMNS {
                grid.set(column, row, self.cell(column, row).code())?;
            }
        }
        Ok(grid)
    }

    pub fn text_map(&self) -> Vec<String> {
        (0..ROWS)
            .map(|row| (0..COLUMNS).map(|column| self.cell(column, row).symbol()).collect())
            .collect()
    }
}

pub struct Dunjunz {
    /// Level files as stored, still scrambled
    levels: Vec<Vec<u8>>,
    sprite_data: Vec<u8>,
}

impl Dunjunz {
    pub fn new(levels: Vec<Vec<u8>>, sprite_data: Vec<u8>) -> Self {
        Dunjunz {
            levels,
            sprite_data,
        }
    }

    pub fn level_file(number: usize) -> String {
        format!("Level{}", number)
    }

    pub fn from_catalogue(catalogue: &FileCatalogue) -> Result<Self> {
        let levels = (1..=LEVEL_COUNT)
            .map(|n| catalogue.get(&Self::level_file(n)).map(<[u8]>::to_vec))
            .collect::<Result<Vec<_>>>()?;
        let sprite_data = catalogue.get(SPRITE_FILE)?.to_vec();
        Ok(Dunjunz::new(levels, sprite_data))
    }

    pub fn read_level(&self, number: usize) -> Result<DunjunzLevel> {
        let stored = nth_level(&self.levels, number)?;
        let plain = CHECKSUMS.decode_level(stored);
        if !CHECKSUMS.verify(number, &plain)? {
            debug!("level {}: checksum does not match", number);
        }
        DunjunzLevel::from_plain(&plain)
    }

    /// Patch the checksum of edited, unscrambled level bytes and scramble them
    pub fn encode_level(number: usize, plain: &[u8]) -> Result<Vec<u8>> {
        CHECKSUMS.encode_level(number, plain)
    }

    pub fn read_sprites(&self) -> Result<SpriteSheet<String>> {
        let mut named = Vec::new();
        for &(base, names) in SPRITE_NAMES {
            for (i, name) in names.iter().enumerate() {
                let sprite = narrow_tile(&self.sprite_data, base + i * SPRITE_STEP)?;
                named.push((name.to_string(), sprite));
            }
        }
        named.push(("blank".to_string(), SpriteImage::blank(8, 12)));
        Ok(sheet_from_named(named))
    }
}

impl Game for Dunjunz {
    fn kind(&self) -> GameKind {
        GameKind::Dunjunz
    }

    fn levels(&self) -> Result<Vec<NamedLevel>> {
        (1..=self.levels.len())
            .map(|n| {
                let level = self.read_level(n)?;
                Ok(NamedLevel::new(Self::level_file(n), level.to_grid()?))
            })
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
                    "level": n,
                    "tables": level,
                    "map": level.text_map(),
                }))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Value::Array(levels))
    }

    fn text_map(&self) -> Result<Option<String>> {
        let levels = (1..=self.levels.len())
            .map(|n| {
                let mut text = self.read_level(n)?.text_map().join("\n");
                text.push('\n');
                Ok(text)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Some(text_maps(levels)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maps::entities::ABSENT;
    use crate::maps::scramble::checksum;

    /// Unscrambled level with a handful of entities and one solid square
    fn plain_level() -> Vec<u8> {
        let mut data = vec![0u8; MIN_LEVEL_LEN];
        data[0x41..0x60].fill(ABSENT);
        data[0x60..0xca].fill(ABSENT);
        data[COLLECTABLE.offset..].fill(0xff);

        // Treasure in slot 3, a teleporter in slot 4
        data[0x03] = 5;
        data[0x23] = 6;
        data[0x43] = 0x28;
        data[0x04] = 7;
        data[0x24] = 8;
        data[0x44] = TELEPORTER;

        // Horizontal door in slot 2 over a solid square
        data[0x62] = 9;
        data[0x77] = 10;
        data[0x8c] = HORIZONTAL_DOOR;
        data[SOLID.byte_offset(10, 1)] = 0x40;

        // Key in slot 1
        data[0xa1] = 1;
        data[0xb6] = 2;

        // Row 6, columns 5 and 6 are collectable
        data[COLLECTABLE.byte_offset(6, 0)] = 0xf9;
        data
    }

    #[test]
    fn map_cells_follow_classification_order() {
        let level = DunjunzLevel::from_plain(&plain_level()).unwrap();

        assert_eq!(level.cell(5, 6), Cell::Item(0x28));
        assert_eq!(level.cell(6, 6), Cell::UnknownCollectable);
        assert_eq!(level.cell(9, 10), Cell::HorizontalDoor);
        assert_eq!(level.cell(1, 2), Cell::Key);
        // Every trapdoor slot is zero
        assert_eq!(level.trapdoors.len(), 1);
        assert_eq!(level.cell(0, 0), Cell::Trapdoor);
        assert_eq!(level.cell(11, 12), Cell::Start);
        assert_eq!(level.cell(20, 20), Cell::Empty);

        assert_eq!(level.teleporters, vec![(7, 8)]);
        assert_eq!(level.exit, (0, 0));

        let map = level.text_map();
        assert_eq!(map.len(), ROWS);
        assert_eq!(&map[6][4..7], " T!");
        assert_eq!(level.to_grid().unwrap().get(9, 10), Some(0x02));
    }

    #[test]
    fn stored_level_is_checksummed_then_scrambled() {
        let plain = plain_level();
        let stored = Dunjunz::encode_level(4, &plain).unwrap();
        assert_eq!(stored.len(), plain.len());
        assert_eq!(checksum(&CHECKSUMS.decode_level(&stored)), 0x44);

        let mut levels = vec![Vec::new(); LEVEL_COUNT];
        levels[3] = stored;
        let game = Dunjunz::new(levels, Vec::new());
        let level = game.read_level(4).unwrap();
        assert_eq!(level.cell(5, 6), Cell::Item(0x28));
        assert!(matches!(
            game.read_level(26),
            Err(CodecError::LevelOutOfRange { level: 26, count: 25 })
        ));
        assert!(matches!(
            game.read_level(1),
            Err(CodecError::SizeMismatch { .. })
        ));
    }

    #[test]
    fn wall_sprite_comes_from_the_end_of_the_level() {
        let mut plain = plain_level();
        let start = plain.len() - 48;
        plain[start..start + 24].fill(0);
        // Row 0: left byte colour 3 everywhere, right byte blank
        plain[start] = 0xff;
        // Row 11: right byte colour 1 in its last pixel
        plain[start + 23] = 0x01;

        let level = DunjunzLevel::from_plain(&plain).unwrap();
        let sprite = &level.wall_sprite;
        assert_eq!((sprite.width, sprite.height), (8, 12));
        assert_eq!(sprite.rows().next().unwrap(), &[3, 3, 3, 3, 0, 0, 0, 0]);
        assert_eq!(sprite.pixel(7, 11), Some(1));
    }
}
