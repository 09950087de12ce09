//! Magic Mushrooms
//!
//! Screen files hold nine 20x22 screens at 0xf0 byte strides, two tiles per
//! byte with the left tile in the high nibble, each followed by its title.
//! The sprites sit near the end of the main program, whose file name is a
//! single carriage return.

use serde_json::{json, Value};

use super::{sheet_from_named, tile_key, Game, GameKind, NamedLevel};
use crate::error::{CodecError, Result};
use crate::filesystem::FileCatalogue;
use crate::graphics::assembler::{assemble_sprite, grid_offsets, BlockLayout};
use crate::graphics::{PixelFormat, SpriteImage, SpriteSheet};
use crate::maps::nibble::{unpack_pair, NibbleOrder};
use crate::maps::TileGrid;

pub const SPRITE_FILE: &str = "\r";
/// Shortest program that contains every sprite
pub const MIN_SPRITE_FILE_LEN: usize = 0x2600;

pub const SCREENS_PER_FILE: usize = 9;
pub const WIDTH: usize = 20;
pub const HEIGHT: usize = 22;

const SCREEN_STRIDE: usize = 0xf0;
const SCREEN_MAP_LEN: usize = WIDTH * HEIGHT / 2;
const TITLE_LEN: usize = 20;
/// Shortest screen file that holds all nine screens
pub const MIN_SCREEN_FILE_LEN: usize = SCREEN_STRIDE * SCREENS_PER_FILE;

/// Sprite data is gathered from these ranges of the program, in order
const SPRITE_RANGES: [(usize, usize); 3] = [(0x2440, 0x25a0), (0x2400, 0x2420), (0x25a0, 0x2600)];
const SPRITE_COUNT: usize = 15;
const SPRITE_LEN: usize = 32;
const SPRITE_LAYOUT: BlockLayout = BlockLayout::columns(4).with_format(PixelFormat::SixteenColour);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Screen {
    pub title: String,
    pub tiles: TileGrid,
}

impl Screen {
    /// Decode the screen starting at `offset`
    pub fn read(data: &[u8], offset: usize) -> Result<Screen> {
        let end = offset + SCREEN_MAP_LEN + TITLE_LEN;
        let bytes = data.get(offset..end).ok_or(CodecError::OutOfBounds {
            offset: end,
            len: data.len(),
        })?;
        let (map, title) = bytes.split_at(SCREEN_MAP_LEN);

        let cells = map
            .iter()
            .flat_map(|&byte| unpack_pair(byte, NibbleOrder::HighFirst))
            .collect();

        Ok(Screen {
            title: title
                .iter()
                .filter(|byte| (32..=122).contains(*byte))
                .map(|&byte| byte as char)
                .collect(),
            tiles: TileGrid::from_cells(WIDTH, HEIGHT, cells)?,
        })
    }
}

/// The nine screens of one screen file
pub fn read_screens(data: &[u8]) -> Result<Vec<Screen>> {
    if data.len() < MIN_SCREEN_FILE_LEN {
        return Err(CodecError::size_mismatch(
            "Magic Mushrooms screens",
            MIN_SCREEN_FILE_LEN,
            data.len(),
        ));
    }
    (0..SCREENS_PER_FILE)
        .map(|i| Screen::read(data, i * SCREEN_STRIDE))
        .collect()
}

pub struct MagicMushrooms {
    program: Vec<u8>,
    /// Screen files by name
    screen_files: Vec<(String, Vec<u8>)>,
}

impl MagicMushrooms {
    pub fn new(program: Vec<u8>, screen_files: Vec<(String, Vec<u8>)>) -> Result<Self> {
        if program.len() < MIN_SPRITE_FILE_LEN {
            return Err(CodecError::size_mismatch(
                "Magic Mushrooms program",
                MIN_SPRITE_FILE_LEN,
                program.len(),
            ));
        }
        Ok(MagicMushrooms {
            program,
            screen_files,
        })
    }

    /// Load the program and the named screen files. Screen files come on
    /// separate tapes under names of the user's choosing, so at least one
    /// must be given.
    pub fn from_catalogue(catalogue: &FileCatalogue, map_files: &[String]) -> Result<Self> {
        if map_files.is_empty() {
            return Err(CodecError::InvalidLayout(
                "Magic Mushrooms needs the name of at least one screen file".to_string(),
            ));
        }
        let program = catalogue.get(SPRITE_FILE)?.to_vec();
        let screen_files = map_files
            .iter()
            .map(|name| Ok((name.clone(), catalogue.get(name)?.to_vec())))
            .collect::<Result<Vec<(String, Vec<u8>)>>>()?;
        MagicMushrooms::new(program, screen_files)
    }

    pub fn read_screens(&self) -> Result<Vec<(&str, Vec<Screen>)>> {
        self.screen_files
            .iter()
            .map(|(name, data)| Ok((name.as_str(), read_screens(data)?)))
            .collect()
    }

    /// A blank sprite 0 followed by the fifteen stored ones
    pub fn read_sprites(&self) -> Result<SpriteSheet<usize>> {
        let data: Vec<u8> = SPRITE_RANGES
            .iter()
            .flat_map(|&(start, end)| self.program[start..end].iter().copied())
            .collect();

        let mut sheet = SpriteSheet::new();
        sheet.insert(0, SpriteImage::blank(SPRITE_LAYOUT.sprite_width(), 8));
        for i in 0..SPRITE_COUNT {
            let offsets = grid_offsets(i * SPRITE_LEN, 1, 4, 0);
            sheet.insert(i + 1, assemble_sprite(&data, &offsets, &SPRITE_LAYOUT)?);
        }
        Ok(sheet)
    }
}

impl Game for MagicMushrooms {
    fn kind(&self) -> GameKind {
        GameKind::MagicMushrooms
    }

    fn levels(&self) -> Result<Vec<NamedLevel>> {
        let mut levels = Vec::new();
        for (name, screens) in self.read_screens()? {
            for (i, screen) in screens.into_iter().enumerate() {
                levels.push(NamedLevel::new(format!("{} {}", name, i + 1), screen.tiles));
            }
        }
        Ok(levels)
    }

    fn sprites(&self) -> Result<SpriteSheet<String>> {
        Ok(sheet_from_named(
            self.read_sprites()?
                .sprites
                .into_iter()
                .map(|(number, sprite)| (tile_key(number), sprite)),
        ))
    }

    fn entities(&self) -> Result<Value> {
        let titles = self
            .read_screens()?
            .into_iter()
            .map(|(name, screens)| {
                let titles: Vec<String> = screens.into_iter().map(|screen| screen.title).collect();
                json!({ "file": name, "titles": titles })
            })
            .collect();
        Ok(Value::Array(titles))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screens_unpack_high_nibble_first_and_keep_printable_titles() {
        let mut data = vec![0u8; MIN_SCREEN_FILE_LEN];
        let second = SCREEN_STRIDE;
        data[second] = 0x12;
        data[second + SCREEN_MAP_LEN - 1] = 0x0f;
        data[second + SCREEN_MAP_LEN..second + SCREEN_MAP_LEN + 8]
            .copy_from_slice(b"\x81Spore\r!");

        let screens = read_screens(&data).unwrap();
        assert_eq!(screens.len(), SCREENS_PER_FILE);

        let screen = &screens[1];
        assert_eq!(screen.title, "Spore!");
        assert_eq!((screen.tiles.width(), screen.tiles.height()), (WIDTH, HEIGHT));
        assert_eq!(screen.tiles.get(0, 0), Some(1));
        assert_eq!(screen.tiles.get(1, 0), Some(2));
        assert_eq!(screen.tiles.get(19, 21), Some(15));
        assert_eq!(screens[0].title, "");
    }

    #[test]
    fn short_screen_file_is_rejected() {
        assert!(matches!(
            read_screens(&[0u8; 0x100]),
            Err(CodecError::SizeMismatch { expected: 0x870, .. })
        ));
    }

    #[test]
    fn sprites_are_gathered_from_three_ranges() {
        let mut program = vec![0u8; MIN_SPRITE_FILE_LEN];
        // First byte of sprite 1, and the sprite made from the second range
        program[0x2440] = 0x02;
        program[0x2400 + 8] = 0x01;

        let game = MagicMushrooms::new(program, Vec::new()).unwrap();
        let sheet = game.read_sprites().unwrap();
        assert_eq!(sheet.len(), SPRITE_COUNT + 1);

        let first = sheet.get(&1).unwrap();
        assert_eq!((first.width, first.height), (16, 8));
        assert_eq!(&first.pixels[..4], &[1, 1, 0, 0]);

        // 0x160 bytes precede the second range: eleven whole sprites
        let moved = sheet.get(&12).unwrap();
        assert_eq!(&moved.pixels[4..8], &[0, 0, 1, 1]);
        assert!(sheet.get(&0).unwrap().pixels.iter().all(|&p| p == 0));
    }

    #[test]
    fn catalogue_loads_only_the_named_screen_files() {
        let mut catalogue = FileCatalogue::new();
        catalogue.insert(SPRITE_FILE, vec![0; MIN_SPRITE_FILE_LEN]);
        catalogue.insert("MAP1", vec![0; MIN_SCREEN_FILE_LEN]);
        catalogue.insert("MAP2", vec![0; MIN_SCREEN_FILE_LEN]);
        catalogue.insert("LOADER", vec![0; MIN_SCREEN_FILE_LEN]);

        let game = MagicMushrooms::from_catalogue(&catalogue, &["MAP2".to_string()]).unwrap();
        let levels = game.levels().unwrap();
        assert_eq!(levels.len(), SCREENS_PER_FILE);
        assert_eq!(levels[8].name, "MAP2 9");

        assert!(matches!(
            MagicMushrooms::from_catalogue(&catalogue, &[]),
            Err(CodecError::InvalidLayout(_))
        ));
        assert!(matches!(
            MagicMushrooms::from_catalogue(&catalogue, &["MAP3".to_string()]),
            Err(CodecError::MissingFile(_))
        ));
    }
}
