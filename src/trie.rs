//! Double-array trie over raw key bytes.
//!
//! Layout: `child = base[node] + code`, where `code` is the key byte plus
//! one; code 0 is the terminal edge. A cell belongs to `node` iff
//! `check[cell] == node`. Free cells carry the dead sentinel `-1` in
//! `check`. Terminal children are pure leaves whose `base` stores the
//! bitwise index into `values` as `-(index + 1)`, which keeps both arrays
//! plain `i32` and makes the structure trivially serializable.
//!
//! The builder consumes `(key, value)` pairs, sorts them once and settles
//! nodes depth-first, so sibling groups are placed together. Lookups never
//! mutate, so a built trie is safe to share across threads.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use crate::errors::{Error, Result};

const MAGIC: &[u8; 4] = b"HQTR";
const VERSION: u32 = 1;
const DEAD: i32 = -1;

/// One step of an incremental traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Traverse {
    /// The consumed key is a stored key with this value.
    Value(i32),
    /// The consumed key is a strict prefix of at least one stored key.
    NoValue,
    /// No stored key continues with the byte at the reported position.
    DeadEnd,
}

/// Immutable double-array trie.
#[derive(Debug, Default)]
pub struct Dat {
    base: Vec<i32>,
    check: Vec<i32>,
    values: Vec<i32>,
}

impl Dat {
    /// Number of stored keys.
    pub fn num_keys(&self) -> usize {
        self.values.len()
    }

    #[inline]
    fn step(&self, node: usize, code: usize) -> Option<usize> {
        let b = self.base[node];
        if b <= 0 {
            return None;
        }
        let child = b as usize + code;
        if child < self.check.len() && self.check[child] == node as i32 {
            Some(child)
        } else {
            None
        }
    }

    /// Exact-match lookup.
    pub fn get(&self, key: &[u8]) -> Option<i32> {
        if self.base.is_empty() {
            return None;
        }
        let mut node = 0;
        for &b in key {
            node = self.step(node, b as usize + 1)?;
        }
        let leaf = self.step(node, 0)?;
        let idx = (-self.base[leaf] - 1) as usize;
        Some(self.values[idx])
    }

    /// Whether some stored key starts with `key`. The empty key reports
    /// whether the trie holds any key at all.
    pub fn has_prefix(&self, key: &[u8]) -> bool {
        if self.base.is_empty() {
            return false;
        }
        if key.is_empty() {
            return !self.values.is_empty();
        }
        let mut node = 0;
        for &b in key {
            match self.step(node, b as usize + 1) {
                Some(next) => node = next,
                None => return false,
            }
        }
        true
    }

    /// Incremental traversal of `key[*key_pos..]` starting at `*node_pos`.
    ///
    /// Cursors are updated in place so the caller can extend the key and
    /// call again. On `DeadEnd`, `key_pos` is left at the offending byte.
    pub fn traverse(&self, key: &[u8], node_pos: &mut usize, key_pos: &mut usize) -> Traverse {
        if self.base.is_empty() {
            return Traverse::DeadEnd;
        }
        while *key_pos < key.len() {
            match self.step(*node_pos, key[*key_pos] as usize + 1) {
                Some(next) => {
                    *node_pos = next;
                    *key_pos += 1;
                }
                None => return Traverse::DeadEnd,
            }
        }
        match self.step(*node_pos, 0) {
            Some(leaf) => {
                let idx = (-self.base[leaf] - 1) as usize;
                Traverse::Value(self.values[idx])
            }
            None => Traverse::NoValue,
        }
    }

    /// Persist as little-endian `i32` arrays.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let mut w = BufWriter::new(File::create(path)?);
        w.write_all(MAGIC)?;
        w.write_all(&VERSION.to_le_bytes())?;
        w.write_all(&(self.base.len() as u32).to_le_bytes())?;
        w.write_all(&(self.values.len() as u32).to_le_bytes())?;
        for arr in [&self.base, &self.check, &self.values] {
            for v in arr.iter() {
                w.write_all(&v.to_le_bytes())?;
            }
        }
        w.flush()?;
        Ok(())
    }

    /// Load a trie previously written by [`Dat::write_to`].
    pub fn read_from(path: &Path) -> Result<Self> {
        let mut buf = Vec::new();
        File::open(path)?.read_to_end(&mut buf)?;
        let fail = |msg: &str| Error::InvalidTrieCache(format!("{}: {}", path.display(), msg));
        if buf.len() < 16 || &buf[0..4] != MAGIC {
            return Err(fail("bad magic"));
        }
        let word = |at: usize| u32::from_le_bytes(buf[at..at + 4].try_into().unwrap());
        if word(4) != VERSION {
            return Err(fail("unsupported version"));
        }
        let len = word(8) as usize;
        let vlen = word(12) as usize;
        if buf.len() != 16 + (len * 2 + vlen) * 4 {
            return Err(fail("truncated"));
        }
        let read_arr = |at: usize, n: usize| -> Vec<i32> {
            buf[at..at + n * 4]
                .chunks_exact(4)
                .map(|c| i32::from_le_bytes(c.try_into().unwrap()))
                .collect()
        };
        let base = read_arr(16, len);
        let check = read_arr(16 + len * 4, len);
        let values = read_arr(16 + len * 8, vlen);
        Ok(Dat { base, check, values })
    }
}

/// Construction-time companion of [`Dat`].
#[derive(Debug, Default)]
pub struct DatBuilder {
    entries: Vec<(Vec<u8>, i32)>,
}

impl DatBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a key for the final build. Duplicate keys keep the larger value.
    pub fn insert(&mut self, key: &[u8], value: i32) {
        self.entries.push((key.to_vec(), value));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sort, deduplicate and settle the double array. The builder buffer is
    /// consumed.
    pub fn build(mut self) -> Dat {
        self.entries.sort_by(|a, b| a.0.cmp(&b.0));
        self.entries.dedup_by(|next, prev| {
            if next.0 == prev.0 {
                prev.1 = prev.1.max(next.1);
                true
            } else {
                false
            }
        });
        let mut settle = Settle {
            base: vec![0; 1024],
            check: vec![DEAD; 1024],
            values: Vec::with_capacity(self.entries.len()),
            first_free: 1,
        };
        if !self.entries.is_empty() {
            settle.place(&self.entries, 0, self.entries.len(), 0, 0);
        }
        let top = settle
            .check
            .iter()
            .rposition(|&c| c != DEAD)
            .map_or(1, |i| i + 1);
        settle.base.truncate(top.max(1));
        settle.check.truncate(top.max(1));
        Dat {
            base: settle.base,
            check: settle.check,
            values: settle.values,
        }
    }
}

struct Settle {
    base: Vec<i32>,
    check: Vec<i32>,
    values: Vec<i32>,
    first_free: usize,
}

impl Settle {
    fn grow(&mut self, need: usize) {
        if need >= self.check.len() {
            let new_len = (need + 1).next_power_of_two();
            self.base.resize(new_len, 0);
            self.check.resize(new_len, DEAD);
        }
    }

    fn find_base(&mut self, codes: &[usize]) -> usize {
        debug_assert!(!codes.is_empty());
        let min_code = codes[0];
        let mut b = self.first_free.saturating_sub(min_code).max(1);
        'search: loop {
            self.grow(b + *codes.last().unwrap());
            for &code in codes {
                if self.check[b + code] != DEAD {
                    b += 1;
                    continue 'search;
                }
            }
            return b;
        }
    }

    /// Settle the children of `parent`, which owns `entries[lo..hi]` at
    /// byte position `depth`, then recurse into each child group.
    fn place(&mut self, entries: &[(Vec<u8>, i32)], lo: usize, hi: usize, depth: usize, parent: usize) {
        // Sibling codes with their entry sub-ranges; a key ending exactly
        // here sorts first and becomes the terminal (code 0) child.
        let mut codes: Vec<usize> = Vec::new();
        let mut ranges: Vec<(usize, usize)> = Vec::new();
        let mut i = lo;
        if entries[i].0.len() == depth {
            codes.push(0);
            ranges.push((i, i + 1));
            i += 1;
        }
        while i < hi {
            let code = entries[i].0[depth] as usize + 1;
            let mut j = i + 1;
            while j < hi && entries[j].0[depth] as usize + 1 == code {
                j += 1;
            }
            codes.push(code);
            ranges.push((i, j));
            i = j;
        }
        let b = self.find_base(&codes);
        self.base[parent] = b as i32;
        for &code in &codes {
            self.check[b + code] = parent as i32;
        }
        while self.first_free < self.check.len() && self.check[self.first_free] != DEAD {
            self.first_free += 1;
        }
        for (&code, &(glo, ghi)) in codes.iter().zip(&ranges) {
            let child = b + code;
            if code == 0 {
                self.values.push(entries[glo].1);
                self.base[child] = -(self.values.len() as i32);
            } else {
                self.place(entries, glo, ghi, depth + 1, child);
            }
        }
    }
}
