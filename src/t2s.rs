//! Traditional → simplified Chinese conversion.
//!
//! The converter consumes the character dictionary of an OpenCC bundle
//! (`TSCharacters.txt`: source, tab, space-separated candidates; the first
//! candidate wins). Only single-codepoint entries are kept so that
//! conversion is a strict codepoint-to-codepoint substitution, which keeps
//! the byte position mapping of the normalizer total and makes repeated
//! conversion idempotent.

use std::fs;
use std::path::Path;

use hashbrown::HashMap;

use crate::errors::{Error, Result};

#[derive(Debug, Default)]
pub struct CharConverter {
    table: HashMap<char, char>,
}

impl CharConverter {
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::MissingResource(path.to_path_buf()));
        }
        let text = fs::read_to_string(path)?;
        Ok(Self::from_lines(text.lines()))
    }

    pub fn from_lines<'a, I: IntoIterator<Item = &'a str>>(lines: I) -> Self {
        let mut table = HashMap::new();
        for line in lines {
            let line = line.trim_end_matches('\r');
            let mut fields = line.split_whitespace();
            let (Some(from), Some(to)) = (fields.next(), fields.next()) else {
                continue;
            };
            let mut from_chars = from.chars();
            let mut to_chars = to.chars();
            match (from_chars.next(), from_chars.next(), to_chars.next()) {
                (Some(f), None, Some(t)) if f != t => {
                    if to_chars.next().is_none() {
                        table.insert(f, t);
                    }
                }
                _ => {}
            }
        }
        CharConverter { table }
    }

    #[inline]
    pub fn convert_char(&self, ch: char) -> char {
        self.table.get(&ch).copied().unwrap_or(ch)
    }

    pub fn convert(&self, src: &str) -> String {
        src.chars().map(|c| self.convert_char(c)).collect()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
