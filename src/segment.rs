//! Greedy maximum-match scanners and the forward/backward reconciler.
//!
//! Both scanners emit byte spans into the scanned text together with the
//! log-frequency field of the matched word (0 for unmatched fallbacks).
//! The reconciler emits agreeing tokens straight from the forward stream
//! and hands every diverging byte range to the dynamic-programming
//! segmenter, so ambiguous regions are decided by score rather than by
//! scan direction.

use std::ops::Range;

use crate::dict::WordDict;
use crate::dp;
use crate::utf8;
use crate::value;

pub(crate) type Span = Range<usize>;

pub(crate) const SCORE_BASE: f64 = 30.0;

/// Shared scoring: summed log-frequency fields, plus a bonus that rewards
/// fewer tokens and a higher share of multi-codepoint tokens.
#[inline]
pub(crate) fn score_parts(n_tokens: usize, two_plus: usize, freq_sum: i64) -> f64 {
    (SCORE_BASE + two_plus as f64) / n_tokens as f64 + freq_sum as f64
}

fn score_spans(text: &str, spans: &[(Span, i32)]) -> f64 {
    if spans.is_empty() {
        return 0.0;
    }
    let freq_sum: i64 = spans.iter().map(|(_, f)| *f as i64).sum();
    let two_plus = spans
        .iter()
        .filter(|(s, _)| utf8::cp_len(&text[s.clone()]) >= 2)
        .count();
    score_parts(spans.len(), two_plus, freq_sum)
}

fn char_bounds(text: &str) -> Vec<usize> {
    let mut bounds: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    bounds.push(text.len());
    bounds
}

/// Left-to-right longest match.
pub(crate) fn max_forward(dict: &WordDict, text: &str) -> (Vec<(Span, i32)>, f64) {
    let bounds = char_bounds(text);
    let n = bounds.len() - 1;
    let mut out = Vec::new();
    let mut key = Vec::new();
    let mut s = 0;
    while s < n {
        let mut e = s + 1;
        key.clear();
        utf8::fold_into(&text[bounds[s]..bounds[e]], &mut key);
        while e < n && dict.has_key_prefix(&key) {
            e += 1;
            utf8::fold_into(&text[bounds[e - 1]..bounds[e]], &mut key);
        }
        while e - 1 > s && dict.get(&text[bounds[s]..bounds[e]]).is_none() {
            e -= 1;
        }
        let span = bounds[s]..bounds[e];
        let freq = dict
            .get(&text[span.clone()])
            .map_or(0, value::decode_freq);
        out.push((span, freq));
        s = e;
    }
    let sc = score_spans(text, &out);
    (out, sc)
}

/// Right-to-left longest match, probing the reversed shadow namespace.
pub(crate) fn max_backward(dict: &WordDict, text: &str) -> (Vec<(Span, i32)>, f64) {
    let bounds = char_bounds(text);
    let n = bounds.len() - 1;
    let mut out = Vec::new();
    let mut rkey = Vec::new();
    let mut s = n as isize - 1;
    while s >= 0 {
        let e = s as usize + 1;
        rkey.clear();
        rkey.extend_from_slice(b"DD");
        utf8::fold_into(&text[bounds[s as usize]..bounds[e]], &mut rkey);
        while s > 0 && dict.has_key_prefix(&rkey) {
            s -= 1;
            utf8::fold_into(&text[bounds[s as usize]..bounds[s as usize + 1]], &mut rkey);
        }
        let mut from = s as usize;
        while from + 1 < e && dict.get(&text[bounds[from]..bounds[e]]).is_none() {
            from += 1;
        }
        let span = bounds[from]..bounds[e];
        let freq = dict
            .get(&text[span.clone()])
            .map_or(0, value::decode_freq);
        out.push((span, freq));
        s = from as isize - 1;
    }
    out.reverse();
    let sc = score_spans(text, &out);
    (out, sc)
}

/// Segment `text` by reconciling the two scan directions.
pub(crate) fn reconcile(dict: &WordDict, text: &str) -> Vec<Span> {
    let (fwd, _) = max_forward(dict, text);
    let (bwd, _) = max_backward(dict, text);
    let mut out = Vec::with_capacity(fwd.len());
    let mut i = 0;
    let mut j = 0;
    while i < fwd.len() && j < bwd.len() {
        if fwd[i].0 == bwd[j].0 {
            out.push(fwd[i].0.clone());
            i += 1;
            j += 1;
            continue;
        }
        // Grow minimal differing regions until both cover the same bytes.
        let start = fwd[i].0.start;
        let mut a = fwd[i].0.end;
        let mut b = bwd[j].0.end;
        i += 1;
        j += 1;
        while a != b {
            if a < b {
                a = fwd[i].0.end;
                i += 1;
            } else {
                b = bwd[j].0.end;
                j += 1;
            }
        }
        let region = &text[start..a];
        match dp::best_paths(dict, region, 1).into_iter().next() {
            Some(best) => out.extend(best.spans.into_iter().map(|s| s.start + start..s.end + start)),
            None => out.push(start..a),
        }
    }
    while i < fwd.len() {
        out.push(fwd[i].0.clone());
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pos::PosTable;

    fn dict() -> WordDict {
        let pos = PosTable::from_lines(["n", "v", "nz"]);
        WordDict::from_lines(
            "中华人民共和国\t1600000\tnz\n\
             研究\t5000000\tv\n\
             研究生\t1000000\tn\n\
             生命\t3000000\tn\n\
             数据\t4000000\tn\n\
             集\t500000\tn\n",
            pos,
        )
        .unwrap()
    }

    fn texts<'a>(text: &'a str, spans: &[(Span, i32)]) -> Vec<&'a str> {
        spans.iter().map(|(s, _)| &text[s.clone()]).collect()
    }

    #[test]
    fn test_forward_longest_match() {
        let d = dict();
        let text = "中华人民共和国";
        let (spans, _) = max_forward(&d, text);
        assert_eq!(texts(text, &spans), vec!["中华人民共和国"]);
    }

    #[test]
    fn test_forward_prefers_longer_word() {
        let d = dict();
        let text = "研究生命";
        let (spans, _) = max_forward(&d, text);
        assert_eq!(texts(text, &spans), vec!["研究生", "命"]);
    }

    #[test]
    fn test_backward_splits_from_the_right() {
        let d = dict();
        let text = "研究生命";
        let (spans, _) = max_backward(&d, text);
        assert_eq!(texts(text, &spans), vec!["研究", "生命"]);
    }

    #[test]
    fn test_backward_unknown_chars() {
        let d = dict();
        let text = "数据集";
        let (spans, _) = max_backward(&d, text);
        assert_eq!(texts(text, &spans), vec!["数据", "集"]);
    }

    #[test]
    fn test_scores_favor_fewer_tokens() {
        let d = dict();
        let (_, one) = max_forward(&d, "中华人民共和国");
        let (_, many) = max_forward(&d, "数据集");
        assert!(one > many);
    }

    #[test]
    fn test_reconcile_agreeing_streams() {
        let d = dict();
        let text = "数据集";
        let spans = reconcile(&d, text);
        let tokens: Vec<&str> = spans.iter().map(|s| &text[s.clone()]).collect();
        assert_eq!(tokens, vec!["数据", "集"]);
    }

    #[test]
    fn test_reconcile_divergence_uses_dp() {
        let d = dict();
        let text = "研究生命";
        let spans = reconcile(&d, text);
        let tokens: Vec<&str> = spans.iter().map(|s| &text[s.clone()]).collect();
        assert_eq!(tokens, vec!["研究", "生命"]);
    }

    #[test]
    fn test_reconcile_shared_prefix_and_suffix() {
        let d = dict();
        let text = "数据研究生命集";
        let spans = reconcile(&d, text);
        let tokens: Vec<&str> = spans.iter().map(|s| &text[s.clone()]).collect();
        assert_eq!(tokens, vec!["数据", "研究", "生命", "集"]);
    }
}
