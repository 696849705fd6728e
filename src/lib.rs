//! Multilingual analyzer for retrieval-augmented indexing.
//!
//! Input text is normalized (punctuation collapse, full-width fold,
//! traditional → simplified), split into script runs, and segmented:
//! Chinese runs through a dictionary-backed reconciliation of forward and
//! backward maximum matching with dynamic programming over disagreements,
//! everything else through an English tokenize/lemmatize/stem chain.
//! Byte-accurate position mappings are threaded through every
//! transformation, so tokens can report offsets into the original input.
//!
//! ```no_run
//! use huqie::Huqie;
//!
//! let analyzer = Huqie::from_dir("/var/lib/huqie")?;
//! assert_eq!(analyzer.tokenize("研究生命"), "研究 生命");
//! # Ok::<(), huqie::Error>(())
//! ```

use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

use lazy_static::lazy_static;
use regex::{Matches, Regex};
use rust_stemmers::{Algorithm, Stemmer};

mod dict;
mod dp;
mod english;
mod errors;
pub mod normalize;
mod pos;
mod segment;
mod t2s;
mod trie;
pub mod utf8;
mod value;
mod wordnet;

pub use crate::dict::WordDict;
pub use crate::errors::{Error, Result};
pub use crate::pos::PosTable;
pub use crate::t2s::CharConverter;
pub use crate::trie::{Dat, DatBuilder, Traverse};
pub use crate::wordnet::Lemmatizer;

use crate::segment::Span;

lazy_static! {
    static ref RE_SPLIT_CHAR: Regex = Regex::new(
        r"([ ,\.<>/?;:'\[\]\\`!@#$%^&*\(\)\{\}\|_+=《》，。？、；‘’：“”【】~！￥%……（）——-]+|[a-zA-Z0-9,\.\-]+)"
    )
    .unwrap();
    static ref RE_NUMERIC: Regex = Regex::new(r"^[0-9,\.\-]+$").unwrap();
    static ref RE_ALPHA_TOKEN: Regex = Regex::new(r"^[a-zA-Z\.\-]+$").unwrap();
}

/// Codepoints the segmenter routes through the Chinese dictionary.
#[inline]
pub fn is_chinese(c: char) -> bool {
    ('\u{4E00}'..='\u{9FFF}').contains(&c)
}

/// Splits text into the spans matched by a regex and the gaps between
/// them, in order.
struct SplitMatches<'r, 't> {
    finder: Matches<'r, 't>,
    text: &'t str,
    last: usize,
    matched: Option<Range<usize>>,
}

impl<'r, 't> SplitMatches<'r, 't> {
    fn new(re: &'r Regex, text: &'t str) -> Self {
        SplitMatches {
            finder: re.find_iter(text),
            text,
            last: 0,
            matched: None,
        }
    }
}

impl<'r, 't> Iterator for SplitMatches<'r, 't> {
    type Item = Range<usize>;

    fn next(&mut self) -> Option<Range<usize>> {
        if let Some(m) = self.matched.take() {
            return Some(m);
        }
        match self.finder.next() {
            None => {
                if self.last >= self.text.len() {
                    None
                } else {
                    let s = self.last..self.text.len();
                    self.last = self.text.len();
                    Some(s)
                }
            }
            Some(m) => {
                let unmatched = self.last..m.start();
                self.last = m.end();
                self.matched = Some(m.start()..m.end());
                if unmatched.is_empty() {
                    self.matched.take()
                } else {
                    Some(unmatched)
                }
            }
        }
    }
}

/// One emitted token: normalized text plus its byte span in the
/// normalized string.
#[derive(Debug, Clone)]
struct Token {
    text: String,
    span: Span,
}

/// A token of a position-tracking result. Offsets are byte positions into
/// the original input; with positions disabled, `start_offset` is the
/// token's sequence number and `end_offset` is zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    pub text: String,
    pub start_offset: u32,
    pub end_offset: u32,
    pub payload: u16,
}

/// The immutable dictionary bundle: word trie + POS table, WordNet lemma
/// tables and the traditional → simplified table. Loaded once, shared by
/// any number of analyzers, safe for concurrent reads.
pub struct Resources {
    dict: WordDict,
    lemmatizer: Lemmatizer,
    converter: CharConverter,
}

impl Resources {
    pub fn new(dict: WordDict, lemmatizer: Lemmatizer, converter: CharConverter) -> Self {
        Resources {
            dict,
            lemmatizer,
            converter,
        }
    }

    /// Load a resource directory:
    ///
    /// ```text
    /// <root>/rag/huqie.txt       source dictionary
    /// <root>/rag/pos-id.def     POS definitions
    /// <root>/rag/huqie.trie     prebuilt trie (built and written if absent)
    /// <root>/wordnet/           WordNet index.<pos> and <pos>.exc files
    /// <root>/opencc/            OpenCC character dictionary
    /// ```
    pub fn from_dir<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        let pos = PosTable::from_file(&root.join("rag").join("pos-id.def"))?;
        let dict = WordDict::load(
            &root.join("rag").join("huqie.txt"),
            &root.join("rag").join("huqie.trie"),
            pos,
        )?;
        let lemmatizer = Lemmatizer::from_dir(&root.join("wordnet"))?;
        let converter = CharConverter::from_file(&root.join("opencc").join("TSCharacters.txt"))?;
        Ok(Resources::new(dict, lemmatizer, converter))
    }

    pub fn dict(&self) -> &WordDict {
        &self.dict
    }
}

/// The analyzer. Cheap to clone per concurrent user; all heavy state
/// lives behind the shared [`Resources`] handle, and the per-instance
/// stemmer environment is never shared.
pub struct Huqie {
    res: Arc<Resources>,
    stemmer: Stemmer,
    fine_grained: bool,
    enable_position: bool,
}

impl Huqie {
    /// Load the resource bundle at `root` and build an analyzer over it.
    pub fn from_dir<P: AsRef<Path>>(root: P) -> Result<Self> {
        Ok(Self::with_resources(Arc::new(Resources::from_dir(root)?)))
    }

    /// Build an analyzer over an already-loaded shared bundle.
    pub fn with_resources(res: Arc<Resources>) -> Self {
        Huqie {
            res,
            stemmer: Stemmer::create(Algorithm::English),
            fine_grained: false,
            enable_position: false,
        }
    }

    pub fn resources(&self) -> &Arc<Resources> {
        &self.res
    }

    /// Re-segment each coarse token by its second-best split.
    pub fn set_fine_grained(&mut self, on: bool) {
        self.fine_grained = on;
    }

    /// Report byte offsets into the original input instead of sequence
    /// numbers.
    pub fn set_enable_position(&mut self, on: bool) {
        self.enable_position = on;
    }

    /// Approximate raw dictionary frequency of `term`, 0 when absent.
    pub fn freq(&self, term: &str) -> i32 {
        self.res.dict.freq(term)
    }

    /// POS tag of `term`, `""` when absent.
    pub fn tag(&self, term: &str) -> &str {
        self.res.dict.tag(term)
    }

    /// Tokenize to a space-joined string.
    pub fn tokenize(&self, line: &str) -> String {
        let (tokens, _) = self.analyze(line);
        let mut out = String::with_capacity(line.len());
        for (i, t) in tokens.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            out.push_str(&t.text);
        }
        out
    }

    /// Tokenize to terms. Token texts are identical to [`Huqie::tokenize`]
    /// output; offsets depend on the position flag.
    pub fn tokenize_with_position(&self, line: &str) -> Vec<Term> {
        let (tokens, map) = self.analyze(line);
        tokens
            .into_iter()
            .enumerate()
            .map(|(i, t)| {
                let (start, end) = if self.enable_position {
                    (map.raw(t.span.start) as u32, map.raw(t.span.end) as u32)
                } else {
                    (i as u32, 0)
                };
                Term {
                    text: t.text,
                    start_offset: start,
                    end_offset: end,
                    payload: 0,
                }
            })
            .collect()
    }

    fn analyze(&self, line: &str) -> (Vec<Token>, normalize::PosMap) {
        let (norm, map) = normalize::normalize(line, &self.res.converter);
        let mut tokens: Vec<Token> = Vec::new();
        for (span, zh) in split_by_lang(&norm) {
            let seg = &norm[span.clone()];
            if !zh {
                for (s, text) in english::tokenize_segment(seg, &self.res.lemmatizer, &self.stemmer)
                {
                    tokens.push(Token {
                        text,
                        span: s.start + span.start..s.end + span.start,
                    });
                }
                continue;
            }
            if utf8::cp_len(seg) < 2 {
                tokens.push(Token {
                    text: seg.to_string(),
                    span,
                });
                continue;
            }
            for s in segment::reconcile(&self.res.dict, seg) {
                tokens.push(Token {
                    text: norm[s.start + span.start..s.end + span.start].to_string(),
                    span: s.start + span.start..s.end + span.start,
                });
            }
        }
        let mut tokens = self.merge(tokens);
        if self.fine_grained {
            tokens = self.refine(tokens, &norm);
        }
        (tokens, map)
    }

    /// Re-glue adjacent tokens whose concatenation is a dictionary word,
    /// looking ahead up to five tokens.
    fn merge(&self, tokens: Vec<Token>) -> Vec<Token> {
        let mut out = Vec::with_capacity(tokens.len());
        let mut s = 0;
        while s < tokens.len() {
            let mut glue_to = s + 1;
            let mut candidate = tokens[s].text.clone();
            let mut probe = candidate.clone();
            for e in (s + 2)..=(tokens.len().min(s + 5)) {
                probe.push_str(&tokens[e - 1].text);
                if RE_SPLIT_CHAR.is_match(&probe) && self.res.dict.freq(&probe) > 0 {
                    glue_to = e;
                    candidate = probe.clone();
                }
            }
            out.push(Token {
                text: candidate,
                span: tokens[s].span.start..tokens[glue_to - 1].span.end,
            });
            s = glue_to;
        }
        out
    }

    /// Fine-grained pass: replace each eligible coarse token by its
    /// second-best dictionary split.
    fn refine(&self, tokens: Vec<Token>, norm: &str) -> Vec<Token> {
        let zh_num = tokens
            .iter()
            .filter(|t| t.text.chars().next().map_or(false, is_chinese))
            .count();
        let mut out = Vec::with_capacity(tokens.len());
        if (zh_num as f64) < tokens.len() as f64 * 0.2 {
            for t in tokens {
                if t.text.contains('/') {
                    for piece in t.text.split('/').filter(|p| !p.is_empty()) {
                        out.push(Token {
                            text: piece.to_string(),
                            span: t.span.clone(),
                        });
                    }
                } else {
                    out.push(t);
                }
            }
            return self.renormalize_english(out);
        }

        for t in tokens {
            let cp = utf8::cp_len(&t.text);
            if cp < 3 || RE_NUMERIC.is_match(&t.text) || cp > 10 {
                out.push(t);
                continue;
            }
            let paths = dp::best_paths(&self.res.dict, &t.text, 2);
            if paths.len() < 2 {
                out.push(t);
                continue;
            }
            let second = &paths[1];
            if second.spans.len() == cp {
                out.push(t);
                continue;
            }
            if RE_ALPHA_TOKEN.is_match(&t.text)
                && second
                    .spans
                    .iter()
                    .any(|s| utf8::cp_len(&t.text[s.clone()]) < 3)
            {
                out.push(t);
                continue;
            }
            // Children subdivide the parent span when the token text is a
            // slice of the normalized string; rewritten English keeps the
            // parent span for every child.
            let aligned = norm.get(t.span.clone()) == Some(t.text.as_str());
            for s in &second.spans {
                let span = if aligned {
                    t.span.start + s.start..t.span.start + s.end
                } else {
                    t.span.clone()
                };
                out.push(Token {
                    text: t.text[s.clone()].to_string(),
                    span,
                });
            }
        }
        self.renormalize_english(out)
    }

    fn renormalize_english(&self, tokens: Vec<Token>) -> Vec<Token> {
        tokens
            .into_iter()
            .map(|t| {
                if english::RE_ENG_WORD.is_match(&t.text) {
                    let text =
                        english::normalize_word(&t.text, &self.res.lemmatizer, &self.stemmer);
                    Token { text, span: t.span }
                } else {
                    t
                }
            })
            .collect()
    }
}

/// Partition normalized text into script runs: first around
/// punctuation/ASCII islands, then at every Chinese ↔ non-Chinese
/// transition. Empty runs are dropped.
fn split_by_lang(norm: &str) -> Vec<(Span, bool)> {
    let mut out = Vec::new();
    for piece in SplitMatches::new(&RE_SPLIT_CHAR, norm) {
        let seg = &norm[piece.clone()];
        if seg.is_empty() {
            continue;
        }
        let mut start = 0;
        let mut current = None;
        for (i, c) in seg.char_indices() {
            let zh = is_chinese(c);
            match current {
                None => current = Some(zh),
                Some(prev) if prev != zh => {
                    out.push((piece.start + start..piece.start + i, prev));
                    start = i;
                    current = Some(zh);
                }
                _ => {}
            }
        }
        if let Some(zh) = current {
            out.push((piece.start + start..piece.start + seg.len(), zh));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resources() -> Arc<Resources> {
        let pos = PosTable::from_lines(["n", "v", "nz", "d", "m"]);
        let dict = WordDict::from_lines(
            "中华人民共和国\t1600000\tnz\n\
             研究\t5000000\tv\n\
             研究生\t1000000\tn\n\
             生命\t3000000\tn\n\
             数据\t4000000\tn\n\
             集\t500000\tn\n\
             架构\t2000000\tn\n\
             准确率\t1200000\tn\n\
             提升\t2500000\tv\n\
             在\t80000000\td\n\
             上\t60000000\td\n\
             认识论\t900000\tn\n\
             认识\t4000000\tv\n\
             knowhow\t1000000\tn\n",
            pos,
        )
        .unwrap();
        let converter = CharConverter::from_lines(["萬\t万", "與\t与", "書\t书"]);
        Arc::new(Resources::new(dict, Lemmatizer::default(), converter))
    }

    fn analyzer() -> Huqie {
        Huqie::with_resources(resources())
    }

    #[test]
    fn test_split_by_lang() {
        let runs = split_by_lang("在transformer架构上");
        let texts: Vec<(&str, bool)> = runs
            .iter()
            .map(|(s, zh)| (&"在transformer架构上"[s.clone()], *zh))
            .collect();
        assert_eq!(
            texts,
            vec![
                ("在", true),
                ("transformer", false),
                ("架构上", true)
            ]
        );
    }

    #[test]
    fn test_split_matches_covers_everything() {
        let text = "abc中文 def，更多";
        let mut covered = 0;
        for r in SplitMatches::new(&RE_SPLIT_CHAR, text) {
            assert_eq!(r.start, covered);
            covered = r.end;
        }
        assert_eq!(covered, text.len());
    }

    #[test]
    fn test_tokenize_pure_chinese_single_word() {
        assert_eq!(analyzer().tokenize("中华人民共和国"), "中华人民共和国");
    }

    #[test]
    fn test_tokenize_ambiguous_chinese() {
        assert_eq!(analyzer().tokenize("研究生命"), "研究 生命");
    }

    #[test]
    fn test_tokenize_english_lowercases_and_stems() {
        assert_eq!(analyzer().tokenize("Hello, world!"), "hello world");
    }

    #[test]
    fn test_tokenize_mixed_script() {
        assert_eq!(
            analyzer().tokenize("在Transformer架构上"),
            "在 transform 架构 上"
        );
    }

    #[test]
    fn test_tokenize_digits_and_punctuation() {
        assert_eq!(
            analyzer().tokenize("准确率95.7%，提升3.2%"),
            "准确率 95.7 提升 3.2"
        );
    }

    #[test]
    fn test_traditional_input_folds_to_simplified() {
        let mut a = analyzer();
        a.set_enable_position(true);
        // 萬 folds to 万 before segmentation; offsets still reach the
        // traditional bytes.
        let terms = a.tokenize_with_position("萬與書");
        assert!(!terms.is_empty());
        assert_eq!(terms.first().unwrap().start_offset, 0);
        assert_eq!(terms.last().unwrap().end_offset as usize, "萬與書".len());
    }

    #[test]
    fn test_merge_recovers_dictionary_word() {
        // "know" and "how" fragment in English, but the dictionary knows
        // the concatenation.
        assert_eq!(analyzer().tokenize("know how"), "knowhow");
    }

    #[test]
    fn test_merge_window_respects_limit() {
        let a = analyzer();
        let toks = vec!["a", "b", "c", "d", "e", "f", "g"]
            .into_iter()
            .enumerate()
            .map(|(i, t)| Token {
                text: t.to_string(),
                span: i..i + 1,
            })
            .collect::<Vec<_>>();
        let merged = a.merge(toks);
        // Nothing merges without dictionary support.
        assert_eq!(merged.len(), 7);
    }

    #[test]
    fn test_fine_grained_second_best() {
        let mut a = analyzer();
        a.set_fine_grained(true);
        // Coarse keeps 认识论 whole; the second-best split surfaces the
        // alternative decomposition.
        assert_eq!(a.tokenize("认识论"), "认识 论");
    }

    #[test]
    fn test_fine_grained_leaves_short_and_numeric() {
        let mut a = analyzer();
        a.set_fine_grained(true);
        assert_eq!(a.tokenize("95.7"), "95.7");
        assert_eq!(a.tokenize("研究"), "研究");
    }

    #[test]
    fn test_positionless_terms_number_sequentially() {
        let a = analyzer();
        let terms = a.tokenize_with_position("研究生命");
        assert_eq!(
            terms
                .iter()
                .map(|t| (t.start_offset, t.end_offset))
                .collect::<Vec<_>>(),
            vec![(0, 0), (1, 0)]
        );
    }

    #[test]
    fn test_position_offsets_into_raw_input() {
        let mut a = analyzer();
        a.set_enable_position(true);
        let raw = "ImageNet数据集";
        let terms = a.tokenize_with_position(raw);
        let texts: Vec<&str> = terms.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["imagenet", "数据", "集"]);
        assert_eq!(
            &raw[terms[0].start_offset as usize..terms[0].end_offset as usize],
            "ImageNet"
        );
        assert_eq!(
            &raw[terms[1].start_offset as usize..terms[1].end_offset as usize],
            "数据"
        );
        assert_eq!(
            &raw[terms[2].start_offset as usize..terms[2].end_offset as usize],
            "集"
        );
    }

    #[test]
    fn test_offsets_monotonic_and_in_bounds() {
        let mut a = analyzer();
        a.set_enable_position(true);
        a.set_fine_grained(true);
        let raw = "在Transformer架构上，准确率95.7%。研究生命的萬物！";
        let terms = a.tokenize_with_position(raw);
        let mut last = 0;
        for t in &terms {
            assert!(!t.text.is_empty());
            assert!(t.start_offset >= last, "start went backwards");
            assert!(t.start_offset <= t.end_offset);
            assert!((t.end_offset as usize) <= raw.len());
            last = t.start_offset;
        }
    }

    #[test]
    fn test_tokenize_consistent_with_terms() {
        for fine in [false, true] {
            let mut a = analyzer();
            a.set_fine_grained(fine);
            for line in [
                "Hello, world!",
                "在Transformer架构上",
                "准确率95.7%，提升3.2%",
                "ImageNet数据集",
                "研究生命",
            ] {
                let joined = a.tokenize(line);
                let terms = a.tokenize_with_position(line);
                let from_terms: Vec<&str> = terms.iter().map(|t| t.text.as_str()).collect();
                let from_string: Vec<&str> = joined.split_whitespace().collect();
                assert_eq!(from_terms, from_string, "divergence on {:?}", line);
            }
        }
    }

    #[test]
    fn test_freq_and_tag_surface() {
        let a = analyzer();
        assert!(a.freq("研究") > 0);
        assert_eq!(a.freq("不存在的词"), 0);
        assert_eq!(a.tag("研究"), "v");
        assert_eq!(a.tag("不存在的词"), "");
    }

    #[test]
    fn test_empty_input() {
        let a = analyzer();
        assert_eq!(a.tokenize(""), "");
        assert!(a.tokenize_with_position("").is_empty());
    }
}
