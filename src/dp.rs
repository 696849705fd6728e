//! Top-K dynamic programming over dictionary-consistent splits.
//!
//! The trellis runs over codepoint positions. A state is the pair
//! (tokens so far, multi-codepoint tokens so far) at an end position; each
//! state keeps its K best candidates by summed log-frequency. Extensions
//! from a start position come from one incremental trie traversal plus a
//! single-codepoint fallback with a fixed penalty, so unknown characters
//! are always absorbable. Candidates chain through arena indices and are
//! dropped together when the trellis is done.

use fxhash::FxHashMap;
use ordered_float::OrderedFloat;
use smallvec::SmallVec;

use crate::dict::WordDict;
use crate::segment::{score_parts, Span};
use crate::trie::Traverse;
use crate::utf8;
use crate::value;

/// Log-frequency field charged to a single codepoint with no dictionary
/// entry.
pub(crate) const UNKNOWN_PENALTY: i32 = -12;

const NONE: u32 = u32::MAX;

#[derive(Debug)]
pub(crate) struct Path {
    /// Byte spans into the segmented text, in order.
    pub spans: Vec<Span>,
    pub score: f64,
}

#[derive(Clone, Copy)]
struct Cand {
    freq_sum: i32,
    n_tokens: u32,
    two_plus: u32,
    start_cp: u32,
    end_cp: u32,
    prev: u32,
}

/// The K highest-scoring dictionary-consistent splits of `text`.
pub(crate) fn best_paths(dict: &WordDict, text: &str, k: usize) -> Vec<Path> {
    let mut bounds: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    bounds.push(text.len());
    let n = bounds.len() - 1;
    if n == 0 || k == 0 {
        return Vec::new();
    }

    let mut arena: Vec<Cand> = Vec::with_capacity(n * 4);
    arena.push(Cand {
        freq_sum: 0,
        n_tokens: 0,
        two_plus: 0,
        start_cp: 0,
        end_cp: 0,
        prev: NONE,
    });
    let mut states: Vec<FxHashMap<(u32, u32), SmallVec<[u32; 2]>>> =
        (0..=n).map(|_| FxHashMap::default()).collect();
    states[0].insert((0, 0), SmallVec::from_slice(&[0]));

    let mut key: Vec<u8> = Vec::new();
    let mut exts: SmallVec<[(usize, i32); 8]> = SmallVec::new();
    for s in 0..n {
        if states[s].is_empty() {
            continue;
        }
        // One incremental traversal yields every dictionary word at `s`.
        exts.clear();
        key.clear();
        let mut node_pos = 0;
        let mut key_pos = 0;
        let mut first_matched = false;
        for e in (s + 1)..=n {
            utf8::fold_into(&text[bounds[e - 1]..bounds[e]], &mut key);
            match dict.traverse(&key, &mut node_pos, &mut key_pos) {
                Traverse::Value(v) => {
                    if e == s + 1 {
                        first_matched = true;
                    }
                    exts.push((e, value::decode_freq(v)));
                }
                Traverse::NoValue => {}
                Traverse::DeadEnd => break,
            }
        }
        if !first_matched {
            exts.push((s + 1, UNKNOWN_PENALTY));
        }

        let cand_ids: SmallVec<[u32; 8]> =
            states[s].values().flat_map(|ids| ids.iter().copied()).collect();
        for &(e, w) in exts.iter() {
            for &cid in cand_ids.iter() {
                let c = arena[cid as usize];
                let cand = Cand {
                    freq_sum: c.freq_sum + w,
                    n_tokens: c.n_tokens + 1,
                    two_plus: c.two_plus + (e - s >= 2) as u32,
                    start_cp: s as u32,
                    end_cp: e as u32,
                    prev: cid,
                };
                let bucket = states[e]
                    .entry((cand.n_tokens, cand.two_plus))
                    .or_default();
                let pos = bucket
                    .iter()
                    .position(|&id| arena[id as usize].freq_sum < cand.freq_sum)
                    .unwrap_or(bucket.len());
                if pos < k {
                    arena.push(cand);
                    bucket.insert(pos, (arena.len() - 1) as u32);
                    bucket.truncate(k);
                }
            }
        }
    }

    let mut finals: Vec<(OrderedFloat<f64>, u32)> = Vec::new();
    for (&(n_tokens, two_plus), ids) in states[n].iter() {
        for &id in ids.iter() {
            let sc = score_parts(
                n_tokens as usize,
                two_plus as usize,
                arena[id as usize].freq_sum as i64,
            );
            finals.push((OrderedFloat(sc), id));
        }
    }
    finals.sort_by(|a, b| b.0.cmp(&a.0));
    finals
        .into_iter()
        .take(k)
        .map(|(sc, id)| {
            let mut spans = Vec::new();
            let mut cur = id;
            while cur != NONE {
                let c = arena[cur as usize];
                if c.prev == NONE {
                    break;
                }
                spans.push(bounds[c.start_cp as usize]..bounds[c.end_cp as usize]);
                cur = c.prev;
            }
            spans.reverse();
            Path {
                spans,
                score: sc.into_inner(),
            }
        })
        .collect()
}
