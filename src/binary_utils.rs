use std::io::{self, Cursor, Read, Seek};

use crate::error::{CodecError, Result};

pub fn read_u8(cursor: &mut Cursor<&[u8]>) -> io::Result<u8> {
    if cursor.position() >= cursor.get_ref().len() as u64 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "End of buffer reached",
        ));
    }

    let mut buf = [0u8; 1];
    cursor.read_exact(&mut buf)?;
    Ok(buf[0])
}

pub fn read_i8(cursor: &mut Cursor<&[u8]>) -> io::Result<i8> {
    if cursor.position() >= cursor.get_ref().len() as u64 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "End of buffer reached",
        ));
    }

    let mut buf = [0u8; 1];
    cursor.read_exact(&mut buf)?;
    Ok(i8::from_le_bytes(buf))
}

pub fn seek_to(cursor: &mut Cursor<&[u8]>, position: u64) -> io::Result<()> {
    use std::io::SeekFrom;

    if position > cursor.get_ref().len() as u64 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "Cannot seek to position {} (buffer length: {})",
                position,
                cursor.get_ref().len()
            ),
        ));
    }

    cursor.seek(SeekFrom::Start(position))?;
    Ok(())
}

pub fn read_bytes(cursor: &mut Cursor<&[u8]>, length: usize) -> io::Result<Vec<u8>> {
    if cursor.position() + (length as u64) > cursor.get_ref().len() as u64 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("Not enough bytes remaining for read_bytes({})", length),
        ));
    }

    let mut buffer = vec![0u8; length];
    cursor.read_exact(&mut buffer)?;
    Ok(buffer)
}

/// Fixed-size, owned byte array used by the level write paths.
///
/// The length is set at construction and never changes; every access is
/// bounds-checked and reports `OutOfBounds` instead of panicking.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ByteBuffer {
    data: Vec<u8>,
}

impl ByteBuffer {
    pub fn new(data: Vec<u8>) -> Self {
        ByteBuffer { data }
    }

    pub fn zeroed(len: usize) -> Self {
        ByteBuffer { data: vec![0; len] }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }

    pub fn get(&self, offset: usize) -> Result<u8> {
        self.data
            .get(offset)
            .copied()
            .ok_or(CodecError::OutOfBounds {
                offset,
                len: self.data.len(),
            })
    }

    pub fn set(&mut self, offset: usize, value: u8) -> Result<()> {
        let len = self.data.len();
        match self.data.get_mut(offset) {
            Some(byte) => {
                *byte = value;
                Ok(())
            }
            None => Err(CodecError::OutOfBounds { offset, len }),
        }
    }

    pub fn slice(&self, offset: usize, length: usize) -> Result<&[u8]> {
        let end = offset.checked_add(length).ok_or(CodecError::OutOfBounds {
            offset,
            len: self.data.len(),
        })?;
        self.data.get(offset..end).ok_or(CodecError::OutOfBounds {
            offset: end,
            len: self.data.len(),
        })
    }

    /// Overwrite `bytes.len()` bytes starting at `offset`. The buffer never grows.
    pub fn splice(&mut self, offset: usize, bytes: &[u8]) -> Result<()> {
        let len = self.data.len();
        let end = offset
            .checked_add(bytes.len())
            .filter(|&end| end <= len)
            .ok_or(CodecError::OutOfBounds {
                offset: offset.saturating_add(bytes.len()),
                len,
            })?;
        self.data[offset..end].copy_from_slice(bytes);
        Ok(())
    }
}

impl From<Vec<u8>> for ByteBuffer {
    fn from(data: Vec<u8>) -> Self {
        ByteBuffer::new(data)
    }
}

impl AsRef<[u8]> for ByteBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}
