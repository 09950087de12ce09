//! Level and sprite codecs for Acorn 8-bit games.
//!
//! [`maps`] and [`graphics`] hold the game-independent codecs. [`games`]
//! wires them to the file layouts of each supported title.

pub mod binary_utils;
pub mod error;
pub mod filesystem;
pub mod games;
pub mod graphics;
pub mod maps;

pub use error::{CodecError, Result};
pub use filesystem::FileCatalogue;
pub use games::{Game, GameKind};
