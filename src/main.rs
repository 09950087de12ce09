use std::error::Error;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::{error, info, warn};
use serde::Serialize;
use serde_json::json;

use acorn_scraper::games::Shark;
use acorn_scraper::{CodecError, FileCatalogue, Game, GameKind};

#[derive(Parser, Debug)]
#[command(author, version, about = "Read levels and sprites from Acorn game files", long_about = None)]
struct Cli {
    #[arg(long, value_enum)]
    game: GameKind,

    /// Directory holding the files extracted from the tape or disc image
    #[arg(long, default_value = ".")]
    input: PathBuf,

    /// Where to write the result (stdout if omitted)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Screen file to read, for games whose map files have no fixed name
    #[arg(long = "map-file")]
    map_files: Vec<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Every level grid as JSON
    Levels,
    /// Sprite sizes and content hashes, with duplicates grouped
    Sprites,
    /// Items, doors and other objects stored apart from the maps
    Entities,
    /// Every level drawn as text
    Text,
    /// Write the levels of a text map file back into the game (Shark only)
    Compile {
        #[arg(long)]
        file: PathBuf,
    },
    /// Checksum and scramble an unscrambled level file
    Checksum {
        /// 1-based level number, selecting the checksum to solve for
        #[arg(long)]
        level: usize,

        #[arg(long)]
        file: PathBuf,

        /// Unscramble a stored level instead
        #[arg(long)]
        reverse: bool,
    },
}

#[derive(Serialize)]
struct SpriteSummary {
    name: String,
    width: usize,
    height: usize,
    hash: String,
    /// Index among the distinct images
    image: usize,
}

fn write_output(path: Option<&Path>, bytes: &[u8]) -> io::Result<()> {
    match path {
        Some(path) => {
            fs::write(path, bytes)?;
            info!("wrote {} bytes to {}", bytes.len(), path.display());
            Ok(())
        }
        None => io::stdout().write_all(bytes),
    }
}

fn write_json<T: Serialize>(path: Option<&Path>, value: &T) -> Result<(), Box<dyn Error>> {
    let mut text = serde_json::to_string_pretty(value)?;
    text.push('\n');
    write_output(path, text.as_bytes())?;
    Ok(())
}

fn checksum(
    game: GameKind,
    level: usize,
    file: &Path,
    reverse: bool,
    output: Option<&Path>,
) -> Result<(), Box<dyn Error>> {
    let Some(output) = output else {
        return Err("checksum needs --output for the binary result".into());
    };
    let config = game.checksum_config().ok_or_else(|| {
        CodecError::InvalidLayout(format!("{:?} levels are not checksummed", game))
    })?;

    let data = fs::read(file)?;
    let result = if reverse {
        let plain = config.decode_level(&data);
        if !config.verify(level, &plain)? {
            warn!("level {}: checksum does not match", level);
        }
        plain
    } else {
        config.encode_level(level, &data)?
    };
    write_output(Some(output), &result)?;
    Ok(())
}

fn compile(
    game: GameKind,
    input: &Path,
    file: &Path,
    output: Option<&Path>,
) -> Result<(), Box<dyn Error>> {
    if game != GameKind::Shark {
        return Err(format!("text maps cannot be compiled for {:?}", game).into());
    }
    let Some(output) = output else {
        return Err("compile needs --output for the patched executable".into());
    };

    let mut shark = Shark::from_catalogue(&FileCatalogue::from_dir(input)?)?;
    shark.compile_map_file(&fs::read_to_string(file)?)?;
    info!("compiled {}", file.display());
    write_output(Some(output), shark.code())?;
    Ok(())
}

fn open(kind: GameKind, input: &Path, map_files: &[String]) -> Result<Box<dyn Game>, Box<dyn Error>> {
    let catalogue = FileCatalogue::from_dir(input)?;
    let game = kind.open_with_maps(&catalogue, map_files)?;
    info!("opened {:?} from {}", game.kind(), input.display());
    Ok(game)
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let output = cli.output.as_deref();
    let open_game = || open(cli.game, &cli.input, &cli.map_files);

    match cli.command {
        Command::Levels => write_json(output, &open_game()?.levels()?),
        Command::Sprites => {
            let sheet = open_game()?.sprites()?;
            let (images, mapping) = sheet.unique();
            info!("{} sprites, {} distinct", sheet.len(), images.len());

            let sprites: Vec<SpriteSummary> = sheet
                .sprites
                .iter()
                .map(|(name, sprite)| SpriteSummary {
                    name: name.clone(),
                    width: sprite.width,
                    height: sprite.height,
                    hash: format!("{:016x}", sprite.content_hash()),
                    image: mapping.get(name).copied().unwrap_or_default(),
                })
                .collect();
            write_json(
                output,
                &json!({ "distinct": images.len(), "sprites": sprites }),
            )
        }
        Command::Entities => write_json(output, &open_game()?.entities()?),
        Command::Text => {
            let text = open_game()?.text_map()?.ok_or_else(|| {
                CodecError::InvalidLayout(format!("{:?} has no text map format", cli.game))
            })?;
            write_output(output, text.as_bytes())?;
            Ok(())
        }
        Command::Compile { file } => compile(cli.game, &cli.input, &file, output),
        Command::Checksum {
            level,
            file,
            reverse,
        } => checksum(cli.game, level, &file, reverse, output),
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
