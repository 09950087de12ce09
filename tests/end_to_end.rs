use std::fs;

use acorn_scraper::binary_utils::ByteBuffer;
use acorn_scraper::games::{bone_cruncher, dunjunz, mushrooms, shark, BoneCruncher, Shark};
use acorn_scraper::graphics::assembler::{assemble_sprite, BlockLayout};
use acorn_scraper::graphics::bitplane::decode_four_colour;
use acorn_scraper::maps::entities::{decode_entities, EntityLayout, Field};
use acorn_scraper::maps::nibble::{decode_grid, encode_grid, GridConfig};
use acorn_scraper::maps::run_length::decode_levels;
use acorn_scraper::maps::scramble::{checksum, scramble, unscramble, ScrambleKey};
use acorn_scraper::maps::TileGrid;
use acorn_scraper::{CodecError, FileCatalogue, Game, GameKind};

const LEVEL: GridConfig = GridConfig::new(40, 25, 0x200);

#[test]
fn single_escaped_cell_survives_decode_and_encode() {
    let mut packed = vec![0u8; 0x200];
    packed[0] = 0x1f;

    let grid = decode_grid(&packed, &LEVEL).unwrap();
    let mut expected = TileGrid::new(40, 25);
    expected.set(0, 0, 0x1f).unwrap();
    assert_eq!(grid, expected);

    assert_eq!(encode_grid(&grid, &LEVEL, 1).unwrap(), packed);
}

#[test]
fn escapes_straddle_bytes_and_row_boundaries() {
    let mut grid = TileGrid::new(40, 25);
    // Odd nibble position: the escape's high nibble lands in the next byte
    grid.set(1, 0, 0x2f).unwrap();
    grid.set(2, 0, 0x03).unwrap();
    grid.set(39, 3, 0x4f).unwrap();
    grid.set(0, 4, 0x0e).unwrap();

    let packed = encode_grid(&grid, &LEVEL, 1).unwrap();
    assert_eq!(packed.len(), 0x200);
    assert_eq!(&packed[..2], &[0xf0, 0x32]);
    assert_eq!(decode_grid(&packed, &LEVEL).unwrap(), grid);
}

#[test]
fn four_colour_bits_pair_with_their_high_plane() {
    assert_eq!(decode_four_colour(0b1001_0001), [2, 0, 0, 3]);

    let sprite = assemble_sprite(&[0b1001_0001; 8], &[Some(0), None], &BlockLayout::columns(2))
        .unwrap();
    assert_eq!((sprite.width, sprite.height), (8, 8));
    assert_eq!(sprite.rows().next().unwrap(), &[2, 0, 0, 3, 0, 0, 0, 0]);
}

#[test]
fn short_and_long_spans() {
    let mut data = vec![0, 0, 0];
    data.extend_from_slice(&[0, 0, 9, 0, 0, 0, 0, 0]);
    data.extend_from_slice(&[0; 8]);
    data.extend_from_slice(&[0x80 | (5 << 3) | 2, 0x40 | 0x05, 0x0a, 0x80]);

    let levels = decode_levels(&data, 15).unwrap();
    assert_eq!(levels.len(), 1);
    let cells = levels[0].grid.cells();
    assert_eq!(&cells[..5], &[9; 5]);
    assert_eq!(&cells[5..15], &[5; 10]);
}

#[test]
fn checksum_patch_and_scramble() {
    let plain: Vec<u8> = (0..0x300).map(|i| (i * 7 % 251) as u8).collect();
    let config = GameKind::Dunjunz.checksum_config().unwrap();

    let stored = config.encode_level(4, &plain).unwrap();
    let decoded = config.decode_level(&stored);
    assert_eq!(checksum(&decoded), dunjunz::CHECKSUMS.checksums[3]);
    assert_eq!(&decoded[..plain.len() - 1], &plain[..plain.len() - 1]);

    for key in [ScrambleKey::Index, ScrambleKey::IndexPlusOne] {
        assert_eq!(unscramble(&scramble(&plain, key), key), plain);
    }
    assert!(GameKind::Shark.checksum_config().is_none());
}

#[test]
fn later_entity_slot_wins() {
    const LAYOUT: EntityLayout = EntityLayout {
        first_slot: 0,
        slots: 3,
        x: 0,
        y: 3,
        values: &[6],
        absent_if: &[Field::Value(0)],
    };
    // Slots 0 and 2 both sit at (4, 5); slot 1 is absent
    let data = [4, 1, 4, 5, 1, 5, 0x21, 0xff, 0x22];

    let table = decode_entities(&data, &LAYOUT).unwrap();
    assert_eq!(table.len(), 1);
    let record = table.get((4, 5)).unwrap();
    assert_eq!((record.slot, record.values.as_slice()), (2, &[0x22][..]));
    assert_eq!(table.overwrites.len(), 1);
    assert_eq!(table.overwrites[0].replaced_slot, 0);
}

#[test]
fn byte_buffer_rejects_out_of_range_edits() {
    let mut buffer = ByteBuffer::zeroed(4);
    buffer.splice(2, &[1, 2]).unwrap();
    assert_eq!(buffer.as_slice(), &[0, 0, 1, 2]);
    assert!(matches!(buffer.splice(3, &[1, 2]), Err(CodecError::OutOfBounds { .. })));
    assert!(buffer.get(4).is_err());
}

#[test]
fn games_open_from_a_directory_of_extracted_files() {
    let dir = tempfile::tempdir().unwrap();
    for (name, length, _) in bone_cruncher::FILES {
        fs::write(dir.path().join(name), vec![0u8; length]).unwrap();
    }
    let mut code = vec![0u8; shark::CODE_FILE_LEN];
    code[0x2be0] = 0x21;
    fs::write(dir.path().join(shark::CODE_FILE), &code).unwrap();

    let catalogue = FileCatalogue::from_dir(dir.path()).unwrap();

    let game = GameKind::Shark.open(&catalogue).unwrap();
    assert_eq!(game.kind(), GameKind::Shark);
    let levels = game.levels().unwrap();
    assert_eq!(levels.len(), shark::LEVEL_COUNT);
    assert_eq!(levels[0].grid.get(1, 0), Some(2));
    assert_eq!(game.sprites().unwrap().len(), 48);

    let game = GameKind::BoneCruncher.open(&catalogue).unwrap();
    assert_eq!(game.levels().unwrap().len(), bone_cruncher::LEVEL_COUNT);
    assert!(game.entities().unwrap().is_null());

    assert!(matches!(
        GameKind::Dunjunz.open(&catalogue),
        Err(CodecError::MissingFile(_))
    ));
}

#[test]
fn edited_bone_cruncher_level_reaches_its_file() {
    let files = bone_cruncher::FILES
        .iter()
        .map(|&(_, length, _)| vec![0u8; length])
        .collect();
    let mut game = BoneCruncher::new(files).unwrap();

    let mut grid = TileGrid::new(40, 25);
    grid.set(0, 0, 0x1f).unwrap();
    game.write_level(1, &grid).unwrap();

    let (name, data) = game.files().next().unwrap();
    assert_eq!(name, "BONE_2");
    assert_eq!(data[0x2500], 0x1f);
    assert_eq!(game.read_level(1).unwrap(), grid);
}

#[test]
fn exported_shark_maps_compile_back_into_the_code() {
    let dir = tempfile::tempdir().unwrap();
    let mut code = vec![0u8; shark::CODE_FILE_LEN];
    code[0x2be0 + 0x408] = 0xb3;
    fs::write(dir.path().join(shark::CODE_FILE), &code).unwrap();
    let catalogue = FileCatalogue::from_dir(dir.path()).unwrap();

    let text = GameKind::Shark.open(&catalogue).unwrap().text_map().unwrap().unwrap();
    // Level 2 starts after twelve rows and a blank line
    assert!(text.lines().nth(13).unwrap().starts_with("^V "));

    let edited = text.replacen("^V", "^v", 1);
    let mut game = Shark::from_catalogue(&catalogue).unwrap();
    game.compile_map_file(&edited).unwrap();
    assert_eq!(game.code()[0x2be0 + 0x408], 0xc3);
    assert_eq!(game.read_level(2).unwrap().get(1, 0), Some(0x0c));

    assert!(GameKind::Firetrack.open(&catalogue).is_err());
}

#[test]
fn magic_mushrooms_reads_the_named_screen_files() {
    let mut catalogue = FileCatalogue::new();
    catalogue.insert(mushrooms::SPRITE_FILE, vec![0; mushrooms::MIN_SPRITE_FILE_LEN]);
    catalogue.insert("Screens A", vec![0; mushrooms::MIN_SCREEN_FILE_LEN]);

    let game = GameKind::MagicMushrooms
        .open_with_maps(&catalogue, &["Screens A".to_string()])
        .unwrap();
    assert_eq!(game.levels().unwrap().len(), mushrooms::SCREENS_PER_FILE);
    assert!(game.text_map().unwrap().is_none());
    assert!(GameKind::MagicMushrooms.open(&catalogue).is_err());
}
