//! Run-length compressed level maps, as used by Firetrack.
//!
//! The file is a sequence of levels. Each level starts with a 19 byte header
//! (3 bytes, an 8 entry span table, 8 more bytes) followed by a token stream
//! ended by a single 0x80 byte.

use std::io::{self, Cursor};

use log::debug;

use super::TileGrid;
use crate::binary_utils::{read_bytes, read_u8};
use crate::error::{CodecError, Result};

pub const SPAN_TABLE_LEN: usize = 8;
pub const LEVEL_TERMINATOR: u8 = 0x80;

const SHORT_SPAN_FLAG: u8 = 0x80;
const LONG_SPAN_FLAG: u8 = 0x40;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunLengthLevel {
    pub header: [u8; 3],
    pub span_table: [u8; SPAN_TABLE_LEN],
    /// Header bytes after the span table; not used by the decoder
    pub trailer: [u8; 8],
    pub grid: TileGrid,
}

/// One decoded token
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Token {
    /// `count` copies of `span_table[index]`
    ShortSpan { index: usize, count: usize },
    /// `count` copies of `value`, count read from the next byte
    LongSpan { value: u8, count: usize },
    Literal(u8),
    End,
}

/// Classify a control byte. Long spans need their count byte, so the caller
/// supplies it lazily.
pub fn read_token(
    control: u8,
    next_byte: impl FnOnce() -> io::Result<u8>,
) -> io::Result<Token> {
    if control == LEVEL_TERMINATOR {
        return Ok(Token::End);
    }

    if control & SHORT_SPAN_FLAG != 0 {
        Ok(Token::ShortSpan {
            index: (control & 0x07) as usize,
            count: ((control >> 3) & 0x0f) as usize,
        })
    } else if control & LONG_SPAN_FLAG != 0 {
        Ok(Token::LongSpan {
            value: control & 0x3f,
            count: next_byte()? as usize,
        })
    } else {
        Ok(Token::Literal(control))
    }
}

fn malformed(level: usize, what: &str, err: io::Error) -> CodecError {
    CodecError::MalformedStream(format!("level {}: {} ({})", level, what, err))
}

/// Decode every level in `data`, slicing tiles into rows of `width`.
pub fn decode_levels(data: &[u8], width: usize) -> Result<Vec<RunLengthLevel>> {
    let mut cursor = Cursor::new(data);
    let mut levels = Vec::new();

    while (cursor.position() as usize) < data.len() {
        let number = levels.len() + 1;
        let level = decode_level(&mut cursor, width, number)?;
        debug!(
            "run-length level {}: {} rows, stream ends at {:#x}",
            number,
            level.grid.height(),
            cursor.position()
        );
        levels.push(level);
    }

    Ok(levels)
}

/// Decode one level starting at the cursor; leaves the cursor after its terminator.
pub fn decode_level(cursor: &mut Cursor<&[u8]>, width: usize, number: usize) -> Result<RunLengthLevel> {
    if width == 0 {
        return Err(CodecError::InvalidLayout("row width of zero".to_string()));
    }

    let mut header = [0u8; 3];
    header.copy_from_slice(&read_bytes(cursor, 3).map_err(|e| malformed(number, "truncated header", e))?);

    let mut span_table = [0u8; SPAN_TABLE_LEN];
    span_table.copy_from_slice(
        &read_bytes(cursor, SPAN_TABLE_LEN).map_err(|e| malformed(number, "truncated span table", e))?,
    );

    let mut trailer = [0u8; 8];
    trailer.copy_from_slice(&read_bytes(cursor, 8).map_err(|e| malformed(number, "truncated header", e))?);

    let mut rows: Vec<Vec<u8>> = Vec::new();
    let mut line: Vec<u8> = Vec::with_capacity(width * 2);

    loop {
        let control = read_u8(cursor).map_err(|e| malformed(number, "missing terminator", e))?;
        let token = read_token(control, || read_u8(cursor))
            .map_err(|e| malformed(number, "long span without count", e))?;

        match token {
            Token::End => break,
            Token::ShortSpan { index, count } => {
                line.extend(std::iter::repeat(span_table[index]).take(count));
            }
            Token::LongSpan { value, count } => {
                line.extend(std::iter::repeat(value).take(count));
            }
            Token::Literal(value) => line.push(value),
        }

        while line.len() >= width {
            let rest = line.split_off(width);
            rows.push(std::mem::replace(&mut line, rest));
        }
    }

    if !line.is_empty() {
        line.resize(width, 0);
        rows.push(line);
    }

    Ok(RunLengthLevel {
        header,
        span_table,
        trailer,
        grid: TileGrid::from_rows(width, rows)?,
    })
}
