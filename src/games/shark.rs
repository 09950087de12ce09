//! Shark
//!
//! Everything lives in the `CODE` executable. The three levels are 172
//! columns wide and 12 rows tall, stored as pairs of columns: each byte
//! holds one row of the left column in its low nibble and the same row of
//! the right column in its high nibble.

use log::debug;

use super::{level_name, sheet_from_named, text_maps, Game, GameKind, NamedLevel};
use crate::binary_utils::ByteBuffer;
use crate::error::{CodecError, Result};
use crate::filesystem::FileCatalogue;
use crate::graphics::assembler::{assemble_sprite, grid_offsets, BlockLayout};
use crate::graphics::{PixelFormat, SpriteImage, SpriteSheet};
use crate::maps::nibble::{pack_pair, unpack_pair, NibbleOrder};
use crate::maps::TileGrid;

pub const CODE_FILE: &str = "CODE";
pub const CODE_FILE_LEN: usize = 0x3c00;

pub const LEVEL_COUNT: usize = 3;
pub const WIDTH: usize = 172;
pub const HEIGHT: usize = 12;

const MAP_START: usize = 0x2be0;
const LEVEL_LEN: usize = WIDTH / 2 * HEIGHT;
const MAPS_LEN: usize = LEVEL_COUNT * LEVEL_LEN;

/// Characters used for tiles 0 to 15 in text maps
pub const SYMBOLS: [char; 16] = [
    ' ', '=', '#', '^', '-', 'X', 'x', '*', '[', ']', '.', 'V', 'v', '+', ':', '|',
];
/// Filler for missing cells on the bottom row of a text map
const FLOOR_SYMBOL: char = '^';

pub const SPRITE_SIZE: usize = 16;
const SPRITES_PER_SET: usize = 16;
const SPRITE_LEN: usize = 64;
const SPRITE_LAYOUT: BlockLayout = BlockLayout::columns(4).with_format(PixelFormat::SixteenColour);

/// Start of each level's sprite set and the slots the game leaves empty
const SPRITE_SETS: [(usize, &[usize]); LEVEL_COUNT] = [
    (0x1d00, &[0x00, 0x0a]),
    (0x2100, &[0x00]),
    (0x0000, &[]),
];

pub struct Shark {
    code: ByteBuffer,
}

impl Shark {
    pub fn new(code: Vec<u8>) -> Result<Self> {
        if code.len() != CODE_FILE_LEN {
            return Err(CodecError::size_mismatch(CODE_FILE, CODE_FILE_LEN, code.len()));
        }
        Ok(Shark {
            code: ByteBuffer::new(code),
        })
    }

    pub fn from_catalogue(catalogue: &FileCatalogue) -> Result<Self> {
        Shark::new(catalogue.get_sized(CODE_FILE, CODE_FILE_LEN)?.to_vec())
    }

    /// The executable, including any levels written since loading
    pub fn code(&self) -> &[u8] {
        self.code.as_slice()
    }

    pub fn read_level(&self, number: usize) -> Result<TileGrid> {
        if number == 0 || number > LEVEL_COUNT {
            return Err(CodecError::LevelOutOfRange {
                level: number,
                count: LEVEL_COUNT,
            });
        }
        let offset = MAP_START + (number - 1) * LEVEL_LEN;
        decode_level(self.code.slice(offset, LEVEL_LEN)?)
    }

    pub fn read_levels(&self) -> Result<Vec<TileGrid>> {
        (1..=LEVEL_COUNT).map(|n| self.read_level(n)).collect()
    }

    /// Replace all three levels at once
    pub fn write_levels(&mut self, levels: &[TileGrid]) -> Result<()> {
        if levels.len() != LEVEL_COUNT {
            return Err(CodecError::InvalidLayout(format!(
                "expected {} levels, got {}",
                LEVEL_COUNT,
                levels.len()
            )));
        }

        let mut maps = Vec::with_capacity(MAPS_LEN);
        for grid in levels {
            maps.extend(encode_level(grid)?);
        }
        if maps.len() != MAPS_LEN {
            return Err(CodecError::size_mismatch("Shark maps", MAPS_LEN, maps.len()));
        }

        debug!("writing {:#x} bytes of map data at {:#x}", maps.len(), MAP_START);
        self.code.splice(MAP_START, &maps)
    }

    /// Parse a map file and write its three levels into the executable
    pub fn compile_map_file(&mut self, text: &str) -> Result<()> {
        let levels = parse_map_file(text)?;
        self.write_levels(&levels)
    }

    pub fn read_sprites(&self) -> Result<SpriteSheet<(usize, usize)>> {
        let mut sheet = SpriteSheet::new();

        for (set, &(base, blanks)) in SPRITE_SETS.iter().enumerate() {
            for index in 0..SPRITES_PER_SET {
                let sprite = if blanks.contains(&index) {
                    SpriteImage::blank(SPRITE_SIZE, SPRITE_SIZE)
                } else {
                    let offsets = grid_offsets(base + index * SPRITE_LEN, 2, 4, SPRITE_LEN / 2);
                    assemble_sprite(self.code.as_slice(), &offsets, &SPRITE_LAYOUT)?
                };
                sheet.insert((set, index), sprite);
            }
        }

        Ok(sheet)
    }
}

/// Decode one level's column-pair bytes into a 172x12 grid
pub fn decode_level(data: &[u8]) -> Result<TileGrid> {
    if data.len() != LEVEL_LEN {
        return Err(CodecError::size_mismatch("Shark level", LEVEL_LEN, data.len()));
    }

    let mut grid = TileGrid::new(WIDTH, HEIGHT);
    for (pair, rows) in data.chunks_exact(HEIGHT).enumerate() {
        for (row, &byte) in rows.iter().enumerate() {
            let [left, right] = unpack_pair(byte, NibbleOrder::LowFirst);
            grid.set(pair * 2, row, left)?;
            grid.set(pair * 2 + 1, row, right)?;
        }
    }
    Ok(grid)
}

pub fn encode_level(grid: &TileGrid) -> Result<Vec<u8>> {
    if grid.width() != WIDTH || grid.height() != HEIGHT {
        return Err(CodecError::InvalidLayout(format!(
            "Shark levels are {}x{}, got {}x{}",
            WIDTH,
            HEIGHT,
            grid.width(),
            grid.height()
        )));
    }

    let mut data = Vec::with_capacity(LEVEL_LEN);
    for pair in 0..WIDTH / 2 {
        for row in 0..HEIGHT {
            let left = grid.get(pair * 2, row).unwrap_or(0);
            let right = grid.get(pair * 2 + 1, row).unwrap_or(0);
            data.push(pack_pair(left, right, NibbleOrder::LowFirst)?);
        }
    }
    Ok(data)
}

/// Render a level as twelve lines of [`SYMBOLS`]
pub fn text_map(grid: &TileGrid) -> String {
    let mut text = String::with_capacity((grid.width() + 1) * grid.height());
    for row in grid.rows() {
        text.extend(row.iter().map(|&tile| SYMBOLS.get(tile as usize).copied().unwrap_or('?')));
        text.push('\n');
    }
    text
}

/// Render every level as one map file, each level followed by a blank line
pub fn map_file(levels: &[TileGrid]) -> String {
    text_maps(levels.iter().map(text_map))
}

/// Parse a level drawn with [`SYMBOLS`].
///
/// Empty lines before the map are skipped. Rows shorter than 172 columns
/// are padded with empty space, except the bottom row which is padded with
/// floor, so empty cells at the end of the bottom row must be written out.
pub fn parse_text_map(text: &str) -> Result<TileGrid> {
    parse_level(&mut numbered_lines(text))
}

/// Parse a map file holding all three levels, as written by [`map_file`]
pub fn parse_map_file(text: &str) -> Result<Vec<TileGrid>> {
    let mut lines = numbered_lines(text);
    (0..LEVEL_COUNT).map(|_| parse_level(&mut lines)).collect()
}

fn numbered_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines().enumerate().map(|(i, line)| (i + 1, line))
}

fn parse_level<'a, I>(lines: &mut I) -> Result<TileGrid>
where
    I: Iterator<Item = (usize, &'a str)>,
{
    let rows: Vec<(usize, &str)> = lines
        .skip_while(|(_, line)| line.is_empty())
        .take(HEIGHT)
        .collect();
    if rows.len() != HEIGHT {
        return Err(CodecError::MalformedStream(format!(
            "text map has {} rows, expected {}",
            rows.len(),
            HEIGHT
        )));
    }

    let mut grid = TileGrid::new(WIDTH, HEIGHT);
    for (row, (line_number, line)) in rows.into_iter().enumerate() {
        // Trailing spaces are only dropped when they overrun the row
        let line = if line.chars().count() > WIDTH {
            line.trim_end()
        } else {
            line
        };
        let mut symbols: Vec<char> = line.chars().collect();
        if symbols.len() > WIDTH {
            return Err(CodecError::MalformedStream(format!(
                "line {} is {} columns wide, at most {} allowed",
                line_number,
                symbols.len(),
                WIDTH
            )));
        }
        let filler = if row == HEIGHT - 1 { FLOOR_SYMBOL } else { ' ' };
        symbols.resize(WIDTH, filler);

        for (column, symbol) in symbols.into_iter().enumerate() {
            let tile = SYMBOLS.iter().position(|&s| s == symbol).ok_or_else(|| {
                CodecError::MalformedStream(format!(
                    "unknown map symbol {:?} at line {}, column {}",
                    symbol,
                    line_number,
                    column + 1
                ))
            })?;
            grid.set(column, row, tile as u8)?;
        }
    }
    Ok(grid)
}

impl Game for Shark {
    fn kind(&self) -> GameKind {
        GameKind::Shark
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
                .map(|((set, index), sprite)| (format!("{}-{:02}", set + 1, index), sprite)),
        ))
    }

    fn text_map(&self) -> Result<Option<String>> {
        Ok(Some(map_file(&self.read_levels()?)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_pairs_share_a_byte() {
        let mut data = vec![0u8; LEVEL_LEN];
        data[0] = 0x21;
        // Second column pair, last row
        data[HEIGHT + HEIGHT - 1] = 0xf3;

        let grid = decode_level(&data).unwrap();
        assert_eq!((grid.width(), grid.height()), (WIDTH, HEIGHT));
        assert_eq!(grid.get(0, 0), Some(1));
        assert_eq!(grid.get(1, 0), Some(2));
        assert_eq!(grid.get(2, 11), Some(3));
        assert_eq!(grid.get(3, 11), Some(15));
        assert_eq!(encode_level(&grid).unwrap(), data);
    }

    #[test]
    fn written_levels_replace_only_the_map_region() {
        let mut code = vec![0xaa; CODE_FILE_LEN];
        code[MAP_START..MAP_START + MAPS_LEN].fill(0);
        let mut game = Shark::new(code).unwrap();

        let mut levels = game.read_levels().unwrap();
        levels[2].set(171, 0, 0x0d).unwrap();
        game.write_levels(&levels).unwrap();

        assert_eq!(game.read_level(3).unwrap().get(171, 0), Some(0x0d));
        assert_eq!(game.code()[MAP_START + 2 * LEVEL_LEN + 85 * HEIGHT], 0xd0);
        assert_eq!(game.code()[MAP_START - 1], 0xaa);
        assert_eq!(game.code()[MAP_START + MAPS_LEN], 0xaa);
    }

    #[test]
    fn wide_values_and_wrong_shapes_are_rejected() {
        let mut game = Shark::new(vec![0; CODE_FILE_LEN]).unwrap();
        let mut levels = game.read_levels().unwrap();
        levels[0].set(5, 5, 0x10).unwrap();
        assert!(matches!(
            game.write_levels(&levels),
            Err(CodecError::UnencodableValue { value: 0x10 })
        ));
        assert!(game.code().iter().all(|&b| b == 0));

        assert!(encode_level(&TileGrid::new(WIDTH, HEIGHT - 1)).is_err());
        assert!(game.write_levels(&levels[..2]).is_err());
    }

    #[test]
    fn text_maps_pad_short_rows() {
        let mut text = String::from("\n\n=#\n");
        for _ in 0..10 {
            text.push('\n');
        }
        text.push_str("x");
        let grid = parse_text_map(&text).unwrap();

        assert_eq!(grid.get(0, 0), Some(1));
        assert_eq!(grid.get(1, 0), Some(2));
        assert_eq!(grid.get(2, 0), Some(0));
        assert_eq!(grid.get(0, 11), Some(6));
        assert_eq!(grid.get(1, 11), Some(3));

        let rendered = text_map(&grid);
        assert_eq!(rendered.lines().count(), HEIGHT);
        assert!(rendered.lines().all(|line| line.chars().count() == WIDTH));
        assert_eq!(parse_text_map(&rendered).unwrap(), grid);
    }

    #[test]
    fn empty_cells_at_the_end_of_the_bottom_row_are_kept() {
        let mut grid = TileGrid::new(WIDTH, HEIGHT);
        for column in 0..WIDTH - 2 {
            grid.set(column, HEIGHT - 1, 3).unwrap();
        }
        grid.set(0, 0, 0x0f).unwrap();

        let text = text_map(&grid);
        assert!(text.ends_with("^^  \n"));
        assert_eq!(parse_text_map(&text).unwrap(), grid);
    }

    #[test]
    fn bad_text_maps_are_rejected() {
        let too_long = "=".repeat(WIDTH + 1);
        assert!(parse_text_map(&too_long).is_err());
        assert!(parse_text_map("@\n\n\n\n\n\n\n\n\n\n\n\n").is_err());

        // Overrunning spaces are forgiven, overrunning tiles are not
        let padded = format!("{}   \n", "=".repeat(WIDTH)).repeat(HEIGHT);
        assert_eq!(parse_text_map(&padded).unwrap().get(WIDTH - 1, 11), Some(1));
    }

    #[test]
    fn map_files_hold_all_three_levels() {
        let mut code = vec![0u8; CODE_FILE_LEN];
        code[MAP_START] = 0x21;
        code[MAP_START + LEVEL_LEN + 1] = 0x0d;
        code[MAP_START + 2 * LEVEL_LEN + LEVEL_LEN - 1] = 0x50;
        let original = Shark::new(code).unwrap();

        let text = original.text_map().unwrap().unwrap();
        assert_eq!(text.lines().count(), LEVEL_COUNT * (HEIGHT + 1));
        assert_eq!(text.lines().nth(HEIGHT), Some(""));
        assert!(text.lines().nth(HEIGHT + 2).unwrap().starts_with('+'));

        let levels = parse_map_file(&text).unwrap();
        assert_eq!(levels, original.read_levels().unwrap());

        let mut game = Shark::new(vec![0xaa; CODE_FILE_LEN]).unwrap();
        game.compile_map_file(&text).unwrap();
        assert_eq!(
            &game.code()[MAP_START..MAP_START + MAPS_LEN],
            &original.code()[MAP_START..MAP_START + MAPS_LEN]
        );
        assert_eq!(game.code()[MAP_START - 1], 0xaa);
    }

    #[test]
    fn map_file_missing_a_level_is_rejected() {
        let grid = TileGrid::new(WIDTH, HEIGHT);
        let text = map_file(&[grid.clone(), grid]);

        let mut game = Shark::new(vec![0; CODE_FILE_LEN]).unwrap();
        assert!(matches!(
            game.compile_map_file(&text),
            Err(CodecError::MalformedStream(_))
        ));
        assert!(game.code().iter().all(|&b| b == 0));
    }

    #[test]
    fn sprite_sets_leave_blank_slots() {
        let mut code = vec![0u8; CODE_FILE_LEN];
        code[0x1d00] = 0xff;
        code[0x1d00 + SPRITE_LEN] = 0x02;
        code[0x2100 + 0x0a * SPRITE_LEN] = 0x01;

        let game = Shark::new(code).unwrap();
        let sheet = game.read_sprites().unwrap();
        assert_eq!(sheet.len(), LEVEL_COUNT * SPRITES_PER_SET);

        assert!(sheet.get(&(0, 0)).unwrap().pixels.iter().all(|&p| p == 0));
        let second = sheet.get(&(0, 1)).unwrap();
        assert_eq!((second.width, second.height), (SPRITE_SIZE, SPRITE_SIZE));
        assert_eq!(&second.pixels[..4], &[1, 1, 0, 0]);

        let door = sheet.get(&(1, 0x0a)).unwrap();
        assert_eq!(&door.pixels[..4], &[0, 0, 1, 1]);
    }
}
