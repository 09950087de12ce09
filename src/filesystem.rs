use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use log::debug;

use crate::error::{CodecError, Result};

/// Named files extracted from a tape or disc image.
///
/// Parsing the image itself happens elsewhere; this only maps each entry's
/// name to its bytes.
#[derive(Clone, Debug, Default)]
pub struct FileCatalogue {
    files: BTreeMap<String, Vec<u8>>,
}

impl FileCatalogue {
    pub fn new() -> Self {
        FileCatalogue::default()
    }

    /// Load every regular file in `dir`, named by its file name.
    ///
    /// `%XX` sequences in file names are decoded, so entries whose names
    /// contain control characters (Magic Mushrooms' main program is called
    /// `"\r"`) can be stored as `%0D`.
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let mut catalogue = FileCatalogue::new();

        for entry in fs::read_dir(dir.as_ref())? {
            let entry = entry?;
            let path: PathBuf = entry.path();
            if !entry.file_type()?.is_file() {
                continue;
            }

            let name = unescape_name(&entry.file_name().to_string_lossy());
            let data = fs::read(&path)?;
            debug!("catalogue: {} ({:#x} bytes)", name, data.len());
            catalogue.insert(name, data);
        }

        Ok(catalogue)
    }

    pub fn insert(&mut self, name: impl Into<String>, data: Vec<u8>) {
        self.files.insert(name.into(), data);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn get(&self, name: &str) -> Result<&[u8]> {
        self.files
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| CodecError::MissingFile(name.to_string()))
    }

    /// Fetch a file that must have exactly `expected` bytes
    pub fn get_sized(&self, name: &str, expected: usize) -> Result<&[u8]> {
        let data = self.get(name)?;
        if data.len() != expected {
            return Err(CodecError::size_mismatch(name, expected, data.len()));
        }
        Ok(data)
    }
}

fn unescape_name(name: &str) -> String {
    let bytes = name.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let escaped = (bytes[i] == b'%')
            .then(|| bytes.get(i + 1..i + 3))
            .flatten()
            .and_then(|hex| std::str::from_utf8(hex).ok())
            .and_then(|hex| u8::from_str_radix(hex, 16).ok());
        match escaped {
            Some(byte) => {
                out.push(byte);
                i += 3;
            }
            None => {
                out.push(bytes[i]);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_report_missing_and_wrong_sized_files() {
        let mut catalogue = FileCatalogue::new();
        catalogue.insert("DATA", vec![0; 4]);

        assert_eq!(catalogue.get_sized("DATA", 4).unwrap().len(), 4);
        assert!(matches!(
            catalogue.get_sized("DATA", 5),
            Err(CodecError::SizeMismatch {
                expected: 5,
                actual: 4,
                ..
            })
        ));
        assert!(matches!(catalogue.get("DAT2"), Err(CodecError::MissingFile(_))));
    }

    #[test]
    fn loads_files_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("SCREEN 1"), [1u8, 2, 3]).unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();

        let catalogue = FileCatalogue::from_dir(dir.path()).unwrap();
        assert_eq!(catalogue.names().collect::<Vec<_>>(), vec!["SCREEN 1"]);
        assert_eq!(catalogue.get("SCREEN 1").unwrap(), &[1, 2, 3]);
    }

    #[test]
    fn escaped_names_are_decoded() {
        assert_eq!(unescape_name("%0D"), "\r");
        assert_eq!(unescape_name("SCREEN%201"), "SCREEN 1");
        assert_eq!(unescape_name("100%"), "100%");
        assert_eq!(unescape_name("%zz"), "%zz");

        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("%0D"), [7u8]).unwrap();
        let catalogue = FileCatalogue::from_dir(dir.path()).unwrap();
        assert!(catalogue.contains("\r"));
    }
}
