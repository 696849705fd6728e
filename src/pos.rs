//! Part-of-speech tag table.
//!
//! Tags come from a definition file, one tag per line; the index of a tag
//! is its position after lexicographic sorting, which is what the packed
//! dictionary cells store in their high byte.

use std::fs;
use std::path::Path;

use crate::errors::{Error, Result};

#[derive(Debug, Default)]
pub struct PosTable {
    tags: Vec<String>,
}

impl PosTable {
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::MissingResource(path.to_path_buf()));
        }
        let text = fs::read_to_string(path)?;
        Ok(Self::from_lines(text.lines()))
    }

    pub fn from_lines<'a, I: IntoIterator<Item = &'a str>>(lines: I) -> Self {
        let mut tags: Vec<String> = lines
            .into_iter()
            .map(|l| l.trim_end_matches('\r').trim())
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect();
        tags.sort();
        tags.dedup();
        PosTable { tags }
    }

    /// Index of `tag`, erroring on tags the definition file does not carry.
    pub fn index_of(&self, tag: &str) -> Result<u8> {
        self.tags
            .binary_search_by(|t| t.as_str().cmp(tag))
            .map(|i| i as u8)
            .map_err(|_| Error::UnknownPosTag(tag.to_string()))
    }

    /// Tag string for `index`, `""` when out of range.
    pub fn name(&self, index: u8) -> &str {
        self.tags.get(index as usize).map_or("", |s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorted_indices() {
        let table = PosTable::from_lines(["v", "n", "a", "d"]);
        assert_eq!(table.index_of("a").unwrap(), 0);
        assert_eq!(table.index_of("d").unwrap(), 1);
        assert_eq!(table.index_of("n").unwrap(), 2);
        assert_eq!(table.index_of("v").unwrap(), 3);
        assert_eq!(table.name(2), "n");
        assert_eq!(table.name(9), "");
    }

    #[test]
    fn test_unknown_tag() {
        let table = PosTable::from_lines(["n", "v"]);
        assert!(matches!(table.index_of("zz"), Err(Error::UnknownPosTag(_))));
    }

    #[test]
    fn test_blank_lines_and_cr() {
        let table = PosTable::from_lines(["n\r", "", "  ", "v"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.index_of("n").unwrap(), 0);
    }
}
