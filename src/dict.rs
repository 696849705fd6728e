//! Dictionary loader and lookup front.
//!
//! The source file has one `word frequency pos_tag` entry per line. Every
//! word contributes two trie keys: the case-folded word itself, packed with
//! its log-frequency field and POS index, and a `"DD"`-prefixed key made of
//! the word's codepoints reversed, packed as `encode(1, 0)`. The reversed
//! shadow keys let the backward scanner answer "does any word end with this
//! suffix" with an ordinary forward prefix probe; the `"DD"` namespace
//! cannot collide with folded words because folded ASCII never contains an
//! uppercase `D`.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use fxhash::FxHashMap;
use log::{debug, info, warn};

use crate::errors::{Error, Result};
use crate::pos::PosTable;
use crate::trie::{Dat, DatBuilder, Traverse};
use crate::utf8::{fold_into, fold_lower};
use crate::value;

pub struct WordDict {
    dat: Dat,
    pos: PosTable,
}

/// Reversed shadow key of `word`: `"DD"` + case-folded codepoints in
/// reverse order.
pub fn reversed_key(word: &str) -> Vec<u8> {
    let mut key = b"DD".to_vec();
    for ch in word.chars().rev() {
        let mut buf = [0u8; 4];
        fold_into(ch.encode_utf8(&mut buf), &mut key);
    }
    key
}

impl WordDict {
    /// Load the dictionary for `dict_path`, reusing `cache_path` when a
    /// prebuilt trie is present and writing one back after a fresh build.
    pub fn load(dict_path: &Path, cache_path: &Path, pos: PosTable) -> Result<Self> {
        if cache_path.is_file() {
            debug!("loading prebuilt trie from {}", cache_path.display());
            let dat = Dat::read_from(cache_path)?;
            return Ok(WordDict { dat, pos });
        }
        if !dict_path.is_file() {
            return Err(Error::MissingResource(dict_path.to_path_buf()));
        }
        info!("building trie from {}", dict_path.display());
        let dat = Self::build(dict_path, &pos)?;
        if let Err(err) = dat.write_to(cache_path) {
            warn!("cannot persist trie cache {}: {}", cache_path.display(), err);
        }
        Ok(WordDict { dat, pos })
    }

    fn build(dict_path: &Path, pos: &PosTable) -> Result<Dat> {
        let reader = BufReader::new(File::open(dict_path)?);
        // Duplicate surface forms keep the higher frequency field.
        let mut forward: FxHashMap<Vec<u8>, i32> = FxHashMap::default();
        let mut builder = DatBuilder::new();
        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            let mut parts = line.split_whitespace();
            let (word, freq, tag) = match (parts.next(), parts.next(), parts.next()) {
                (Some(w), Some(f), Some(t)) => (w, f, t),
                _ => {
                    return Err(Error::InvalidDictEntry(format!(
                        "line {}: expected `word freq tag`, got {:?}",
                        lineno + 1,
                        line
                    )))
                }
            };
            let raw: f64 = freq.parse().map_err(|_| {
                Error::InvalidDictEntry(format!("line {}: bad frequency {:?}", lineno + 1, freq))
            })?;
            let field = value::freq_field(raw);
            let packed = value::encode(field, pos.index_of(tag)?);
            forward
                .entry(fold_lower(word))
                .and_modify(|v| {
                    if value::decode_freq(*v) < field {
                        *v = packed;
                    }
                })
                .or_insert(packed);
            builder.insert(&reversed_key(word), value::encode(1, 0));
        }
        let entries = forward.len();
        for (key, packed) in forward {
            builder.insert(&key, packed);
        }
        debug!("loaded {} entries from dictionary", entries);
        Ok(builder.build())
    }

    /// Build directly from in-memory lines, for tests and benches.
    #[cfg(test)]
    pub fn from_lines(dict: &str, pos: PosTable) -> Result<Self> {
        use std::io::Write;
        let mut tmp = tempfile::NamedTempFile::new()?;
        tmp.write_all(dict.as_bytes())?;
        let dat = Self::build(tmp.path(), &pos)?;
        Ok(WordDict { dat, pos })
    }

    /// Packed cell for the case-folded `term`, if it is a dictionary word.
    pub fn get(&self, term: &str) -> Option<i32> {
        self.dat.get(&fold_lower(term))
    }

    /// Whether some dictionary word starts with the case-folded `prefix`.
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.dat.has_prefix(&fold_lower(prefix))
    }

    /// Whether some dictionary word ends with `suffix`, via the reversed
    /// shadow namespace.
    pub fn has_suffix_stem(&self, suffix: &str) -> bool {
        self.dat.has_prefix(&reversed_key(suffix))
    }

    /// Raw byte-key prefix probe, for callers that maintain their own
    /// folded key buffers.
    pub fn has_key_prefix(&self, key: &[u8]) -> bool {
        self.dat.has_prefix(key)
    }

    /// Incremental traversal over a folded byte key.
    pub fn traverse(&self, key: &[u8], node_pos: &mut usize, key_pos: &mut usize) -> Traverse {
        self.dat.traverse(key, node_pos, key_pos)
    }

    /// Approximate raw frequency of `term`, 0 when absent.
    pub fn freq(&self, term: &str) -> i32 {
        self.get(term).map_or(0, value::raw_freq)
    }

    /// Signed log-frequency field of `term`, if present.
    pub fn freq_field(&self, term: &str) -> Option<i32> {
        self.get(term).map(value::decode_freq)
    }

    /// POS tag of `term`, `""` when absent.
    pub fn tag(&self, term: &str) -> &str {
        match self.get(term) {
            Some(v) => self.pos.name(value::decode_pos(v)),
            None => "",
        }
    }

    pub fn num_keys(&self) -> usize {
        self.dat.num_keys()
    }
}
