//! Positional XOR scrambling and checksum repair
//!
//! Levels are stored XORed with a mask derived from each byte's index. The
//! games also sum every byte of the unscrambled level and compare the total
//! with a per-level constant, so an edited level has its last byte rewritten
//! to make the sum come out right. The checksum is always computed on the
//! unscrambled bytes: patch first, scramble second.

use log::debug;
use serde::Serialize;

use crate::error::{CodecError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ScrambleKey {
    /// `i mod 256`
    Index,
    /// `(i + 1) mod 256`
    IndexPlusOne,
}

impl ScrambleKey {
    pub fn mask(self, index: usize) -> u8 {
        match self {
            ScrambleKey::Index => (index % 256) as u8,
            ScrambleKey::IndexPlusOne => ((index + 1) % 256) as u8,
        }
    }
}

pub fn unscramble(data: &[u8], key: ScrambleKey) -> Vec<u8> {
    data.iter()
        .enumerate()
        .map(|(i, &byte)| byte ^ key.mask(i))
        .collect()
}

/// XOR is its own inverse, so scrambling is the same operation
pub fn scramble(data: &[u8], key: ScrambleKey) -> Vec<u8> {
    unscramble(data, key)
}

/// Sum of all bytes modulo 256
pub fn checksum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |total, &byte| total.wrapping_add(byte))
}

/// Per-game scramble key and table of expected level checksums
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ChecksumConfig {
    pub key: ScrambleKey,
    pub checksums: &'static [u8],
}

impl ChecksumConfig {
    pub fn level_count(&self) -> usize {
        self.checksums.len()
    }

    /// Target checksum for a 1-based level number
    pub fn expected(&self, level_number: usize) -> Result<u8> {
        level_number
            .checked_sub(1)
            .and_then(|i| self.checksums.get(i))
            .copied()
            .ok_or(CodecError::LevelOutOfRange {
                level: level_number,
                count: self.checksums.len(),
            })
    }

    /// Replace the last byte of `data` (unscrambled) so that the byte sum
    /// matches the level's checksum constant.
    pub fn add_checksum(&self, level_number: usize, data: &[u8]) -> Result<Vec<u8>> {
        let target = self.expected(level_number)?;
        let Some((_, body)) = data.split_last() else {
            return Err(CodecError::size_mismatch("checksummed level", 1, 0));
        };

        let patch = target.wrapping_sub(checksum(body));
        debug!(
            "level {}: checksum patch byte {:#04x} for target {:#04x}",
            level_number, patch, target
        );

        let mut patched = data.to_vec();
        if let Some(last) = patched.last_mut() {
            *last = patch;
        }
        Ok(patched)
    }

    pub fn verify(&self, level_number: usize, data: &[u8]) -> Result<bool> {
        Ok(checksum(data) == self.expected(level_number)?)
    }

    /// Unscramble a stored level
    pub fn decode_level(&self, stored: &[u8]) -> Vec<u8> {
        unscramble(stored, self.key)
    }

    /// Patch the checksum of an unscrambled level, then scramble it for storage
    pub fn encode_level(&self, level_number: usize, plain: &[u8]) -> Result<Vec<u8>> {
        let patched = self.add_checksum(level_number, plain)?;
        Ok(scramble(&patched, self.key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: ChecksumConfig = ChecksumConfig {
        key: ScrambleKey::IndexPlusOne,
        checksums: &[0x00, 0x7f, 0xf4],
    };

    #[test]
    fn masks_differ_by_one_between_keys() {
        assert_eq!(ScrambleKey::Index.mask(0), 0);
        assert_eq!(ScrambleKey::IndexPlusOne.mask(0), 1);
        assert_eq!(ScrambleKey::Index.mask(0x1ff), 0xff);
        assert_eq!(ScrambleKey::IndexPlusOne.mask(0xff), 0x00);
    }

    #[test]
    fn scramble_then_unscramble_restores_data() {
        let data: Vec<u8> = (0..600u32).map(|i| (i * 7 % 251) as u8).collect();
        for key in [ScrambleKey::Index, ScrambleKey::IndexPlusOne] {
            let scrambled = scramble(&data, key);
            assert_ne!(scrambled, data);
            assert_eq!(unscramble(&scrambled, key), data);
        }
    }

    #[test]
    fn patched_data_sums_to_target() {
        let data: Vec<u8> = (0..300u32).map(|i| (i * 13) as u8).collect();
        for level in 1..=3 {
            let patched = CONFIG.add_checksum(level, &data).unwrap();
            assert_eq!(patched.len(), data.len());
            assert_eq!(&patched[..299], &data[..299]);
            assert_eq!(checksum(&patched), CONFIG.checksums[level - 1]);
            assert!(CONFIG.verify(level, &patched).unwrap());
        }
    }

    #[test]
    fn patch_wraps_when_target_is_below_sum() {
        // Body sums to 0xf0, target 0x7f -> patch 0x8f
        let data = [0xf0, 0x00];
        let patched = CONFIG.add_checksum(2, &data).unwrap();
        assert_eq!(patched, vec![0xf0, 0x8f]);
    }

    #[test]
    fn encode_checksums_before_scrambling() {
        let plain = vec![0x10u8; 32];
        let stored = CONFIG.encode_level(3, &plain).unwrap();
        let decoded = CONFIG.decode_level(&stored);
        assert!(CONFIG.verify(3, &decoded).unwrap());
        // The scrambled bytes are not what the checksum is computed on
        assert!(!CONFIG.verify(3, &stored).unwrap());
    }

    #[test]
    fn unknown_levels_and_empty_data_are_errors() {
        assert!(matches!(
            CONFIG.add_checksum(0, &[1, 2]),
            Err(CodecError::LevelOutOfRange { level: 0, count: 3 })
        ));
        assert!(matches!(
            CONFIG.add_checksum(4, &[1, 2]),
            Err(CodecError::LevelOutOfRange { level: 4, count: 3 })
        ));
        assert!(matches!(
            CONFIG.add_checksum(1, &[]),
            Err(CodecError::SizeMismatch { .. })
        ));
    }
}
