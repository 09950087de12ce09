//! Sprite graphics for the supported games
//!
//! Every game stores its graphics as small 8-row strips of packed pixel
//! bytes. [`bitplane`] turns single bytes into pixels and [`assembler`]
//! stitches strips into whole sprites using a per-game offset table.

pub mod assembler;
pub mod bitplane;

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};

use serde::Serialize;
use twox_hash::XxHash64;

pub use assembler::{assemble_sprite, BlockLayout};
pub use bitplane::{decode_block, PixelFormat};

/// A decoded sprite: one palette index per pixel, row-major.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SpriteImage {
    pub width: usize,
    pub height: usize,
    #[serde(skip)]
    pub pixels: Vec<u8>,
}

impl SpriteImage {
    pub fn new(width: usize, height: usize, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(pixels.len(), width * height);
        SpriteImage {
            width,
            height,
            pixels,
        }
    }

    pub fn blank(width: usize, height: usize) -> Self {
        SpriteImage::new(width, height, vec![0; width * height])
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get(y * self.width + x).copied()
    }

    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        self.pixels.chunks_exact(self.width.max(1))
    }

    /// Copy of this sprite with every pixel of colour `from` replaced by `to`
    pub fn recolour(&self, from: u8, to: u8) -> SpriteImage {
        let pixels = self
            .pixels
            .iter()
            .map(|&p| if p == from { to } else { p })
            .collect();
        SpriteImage::new(self.width, self.height, pixels)
    }

    /// Place `blank_rows` empty rows above and below the sprite.
    pub fn pad_vertically(&self, blank_rows: usize) -> SpriteImage {
        let padding = vec![0u8; blank_rows * self.width];
        let mut pixels = Vec::with_capacity(self.pixels.len() + padding.len() * 2);
        pixels.extend_from_slice(&padding);
        pixels.extend_from_slice(&self.pixels);
        pixels.extend_from_slice(&padding);
        SpriteImage::new(self.width, self.height + blank_rows * 2, pixels)
    }

    /// 64-bit hash of the dimensions and pixels, for fast duplicate detection
    pub fn content_hash(&self) -> u64 {
        let mut hasher = XxHash64::default();
        self.width.hash(&mut hasher);
        self.height.hash(&mut hasher);
        self.pixels.hash(&mut hasher);
        hasher.finish()
    }
}

/// Sprites of one game, keyed by tile id or by name.
#[derive(Clone, Debug, Default, Serialize)]
pub struct SpriteSheet<K: Ord> {
    pub sprites: BTreeMap<K, SpriteImage>,
}

impl<K: Ord + Clone> SpriteSheet<K> {
    pub fn new() -> Self {
        SpriteSheet {
            sprites: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, key: K, sprite: SpriteImage) {
        self.sprites.insert(key, sprite);
    }

    pub fn get(&self, key: &K) -> Option<&SpriteImage> {
        self.sprites.get(key)
    }

    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }

    /// Collapse identical sprites.
    ///
    /// Returns the distinct images in first-seen key order and, for every
    /// key, the index of its image in that list.
    pub fn unique(&self) -> (Vec<SpriteImage>, BTreeMap<K, usize>) {
        let mut seen: HashMap<u64, Vec<usize>> = HashMap::new();
        let mut unique_sprites: Vec<SpriteImage> = Vec::new();
        let mut mapping = BTreeMap::new();

        for (key, sprite) in &self.sprites {
            let index = match seen.entry(sprite.content_hash()) {
                Entry::Occupied(mut entry) => {
                    // Confirm against the pixels in case two sprites share a hash
                    let found = entry
                        .get()
                        .iter()
                        .copied()
                        .find(|&i| unique_sprites[i] == *sprite);
                    match found {
                        Some(i) => i,
                        None => {
                            let i = unique_sprites.len();
                            unique_sprites.push(sprite.clone());
                            entry.get_mut().push(i);
                            i
                        }
                    }
                }
                Entry::Vacant(entry) => {
                    let i = unique_sprites.len();
                    unique_sprites.push(sprite.clone());
                    entry.insert(vec![i]);
                    i
                }
            };
            mapping.insert(key.clone(), index);
        }

        (unique_sprites, mapping)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recolour_only_touches_matching_pixels() {
        let sprite = SpriteImage::new(2, 2, vec![0, 3, 3, 1]);
        let recoloured = sprite.recolour(3, 1);
        assert_eq!(recoloured.pixels, vec![0, 1, 1, 1]);
        assert_eq!(sprite.pixels, vec![0, 3, 3, 1]);
    }

    #[test]
    fn padding_adds_blank_rows_at_both_ends() {
        let sprite = SpriteImage::new(2, 1, vec![2, 2]);
        let padded = sprite.pad_vertically(2);
        assert_eq!(padded.height, 5);
        assert_eq!(padded.pixels, vec![0, 0, 0, 0, 2, 2, 0, 0, 0, 0]);
        assert_eq!(padded.pixel(1, 2), Some(2));
        assert_eq!(padded.pixel(2, 0), None);
    }

    #[test]
    fn unique_groups_identical_sprites() {
        let mut sheet = SpriteSheet::new();
        sheet.insert(0u8, SpriteImage::blank(4, 8));
        sheet.insert(1u8, SpriteImage::new(4, 8, vec![1; 32]));
        sheet.insert(2u8, SpriteImage::blank(4, 8));
        // Same pixel count, different shape
        sheet.insert(3u8, SpriteImage::blank(8, 4));

        let (unique, mapping) = sheet.unique();
        assert_eq!(unique.len(), 3);
        assert_eq!(mapping[&0], mapping[&2]);
        assert_ne!(mapping[&0], mapping[&1]);
        assert_ne!(mapping[&0], mapping[&3]);
    }
}
