//! Normalization front-end: three transformations, each threading a
//! byte-level back-mapping so token offsets can be reported against the
//! original input.
//!
//! 1. Non-word runs collapse to a single space. `.`, `,` and `-` survive
//!    between ASCII alphanumerics, so decimals (`95.7`), versions and
//!    hyphenated terms stay whole while `"Hello, world!"` loses its
//!    punctuation.
//! 2. Full-width forms fold to half-width (`Ａ` → `A`, ideographic space
//!    → space).
//! 3. Traditional Chinese folds to simplified through the character
//!    converter.
//!
//! Every output byte of every stage records the byte of the stage's input
//! it came from; composing the three gives normalized byte → raw byte.

use crate::t2s::CharConverter;

/// Byte mapping from a derived string back to the original input. Entry
/// `i` is the raw byte the `i`-th normalized byte came from; the final
/// entry is the raw length, so exclusive end offsets map cleanly.
#[derive(Debug)]
pub(crate) struct PosMap {
    map: Vec<u32>,
}

impl PosMap {
    #[inline]
    pub fn raw(&self, norm_byte: usize) -> usize {
        self.map[norm_byte] as usize
    }
}

#[inline]
fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[inline]
fn is_joiner(c: char) -> bool {
    matches!(c, '.' | ',' | '-')
}

/// Full-width → half-width fold of one codepoint.
#[inline]
pub fn str_q2b_char(c: char) -> char {
    match c {
        '\u{3000}' => ' ',
        '\u{FF01}'..='\u{FF5E}' => {
            char::from_u32(c as u32 - 0xFEE0).unwrap_or(c)
        }
        _ => c,
    }
}

/// Full-width → half-width fold of a whole string.
pub fn str_q2b(s: &str) -> String {
    s.chars().map(str_q2b_char).collect()
}

/// Stage 1: collapse runs of non-word codepoints to one space, keeping
/// joiners that glue ASCII alphanumerics together.
fn collapse(raw: &str) -> (String, Vec<u32>) {
    let mut out = String::with_capacity(raw.len());
    let mut map = Vec::with_capacity(raw.len() + 1);
    let mut prev: Option<char> = None;
    let mut iter = raw.char_indices().peekable();
    while let Some((i, c)) = iter.next() {
        let keep = if is_word(c) {
            true
        } else if is_joiner(c) {
            let prev_ok = prev.map_or(false, |p| p.is_ascii_alphanumeric());
            let next_ok = iter
                .peek()
                .map_or(false, |&(_, n)| n.is_ascii_alphanumeric());
            prev_ok && next_ok
        } else {
            false
        };
        if keep {
            for _ in 0..c.len_utf8() {
                map.push(i as u32);
            }
            out.push(c);
        } else if !out.ends_with(' ') {
            map.push(i as u32);
            out.push(' ');
        }
        prev = Some(c);
    }
    map.push(raw.len() as u32);
    (out, map)
}

/// Apply a codepoint-to-codepoint fold, rebasing the byte mapping.
fn fold_chars<F: Fn(char) -> char>(src: &str, map_in: &[u32], f: F) -> (String, Vec<u32>) {
    let mut out = String::with_capacity(src.len());
    let mut map = Vec::with_capacity(map_in.len());
    for (i, c) in src.char_indices() {
        let folded = f(c);
        for _ in 0..folded.len_utf8() {
            map.push(map_in[i]);
        }
        out.push(folded);
    }
    map.push(map_in[src.len()]);
    (out, map)
}

/// Run all three stages over `raw`.
pub(crate) fn normalize(raw: &str, t2s: &CharConverter) -> (String, PosMap) {
    let (collapsed, map) = collapse(raw);
    let (half, map) = fold_chars(&collapsed, &map, str_q2b_char);
    let (simplified, map) = fold_chars(&half, &map, |c| t2s.convert_char(c));
    (simplified, PosMap { map })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() -> CharConverter {
        CharConverter::from_lines(["萬\t万", "與\t与"])
    }

    #[test]
    fn test_collapse_punctuation() {
        let (out, _) = collapse("Hello, world!");
        assert_eq!(out, "Hello world ");
    }

    #[test]
    fn test_collapse_keeps_numeric_joiners() {
        let (out, _) = collapse("准确率95.7%，提升3.2%");
        assert_eq!(out, "准确率95.7 提升3.2 ");
        let (out, _) = collapse("state-of-the-art");
        assert_eq!(out, "state-of-the-art");
        let (out, _) = collapse("trailing. dot");
        assert_eq!(out, "trailing dot");
    }

    #[test]
    fn test_collapse_runs_of_whitespace() {
        let (out, map) = collapse("a \t\r\n b");
        assert_eq!(out, "a b");
        assert_eq!(map, vec![0, 1, 6, 7]);
    }

    #[test]
    fn test_q2b() {
        assert_eq!(str_q2b("ＡＢＣ１２３"), "ABC123");
        assert_eq!(str_q2b("\u{3000}"), " ");
        assert_eq!(str_q2b("，．！？"), ",.!?");
        assert_eq!(str_q2b("abc 中文"), "abc 中文");
    }

    #[test]
    fn test_q2b_idempotent() {
        let s = "ＡＢＣ　１２.３中文";
        let once = str_q2b(s);
        assert_eq!(str_q2b(&once), once);
    }

    #[test]
    fn test_mapping_identity_text() {
        let t2s = plain();
        let raw = "ImageNet数据集";
        let (norm, map) = normalize(raw, &t2s);
        assert_eq!(norm, raw);
        assert_eq!(map.raw(0), 0);
        assert_eq!(map.raw(8), 8);
        assert_eq!(map.raw(norm.len()), raw.len());
    }

    #[test]
    fn test_mapping_through_deletions() {
        let t2s = plain();
        let raw = "Hello, world!";
        let (norm, map) = normalize(raw, &t2s);
        assert_eq!(norm, "Hello world ");
        // "world" sits at norm bytes 6..11 and raw bytes 7..12.
        assert_eq!(&norm[6..11], "world");
        assert_eq!(map.raw(6), 7);
        assert_eq!(map.raw(11), 12);
        assert_eq!(&raw[map.raw(6)..map.raw(11)], "world");
    }

    #[test]
    fn test_mapping_through_width_fold() {
        let t2s = plain();
        let raw = "ｘ５中";
        let (norm, map) = normalize(raw, &t2s);
        assert_eq!(norm, "x5中");
        assert_eq!(map.raw(0), 0); // x came from the 3-byte ｘ
        assert_eq!(map.raw(1), 3); // 5 came from the 3-byte ５
        assert_eq!(map.raw(2), 6);
        assert_eq!(map.raw(norm.len()), raw.len());
    }

    #[test]
    fn test_mapping_through_t2s() {
        let t2s = plain();
        let raw = "萬卷";
        let (norm, map) = normalize(raw, &t2s);
        assert_eq!(norm, "万卷");
        assert_eq!(&raw[map.raw(0)..map.raw(3)], "萬");
    }

    #[test]
    fn test_mapping_is_monotonic() {
        let t2s = plain();
        let raw = "Ａ１，mixed-up 萬物！？ 99.5%";
        let (norm, map) = normalize(raw, &t2s);
        let mut last = 0;
        for i in 0..=norm.len() {
            let r = map.raw(i);
            assert!(r >= last, "mapping went backwards at {}", i);
            assert!(r <= raw.len());
            last = r;
        }
    }
}
