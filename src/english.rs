//! English sub-pipeline: sentence split, Treebank-style word tokenization,
//! then lemmatize → ASCII-lowercase → stem.
//!
//! Tokens keep the byte span of their surface form in the segment, so a
//! stemmed token can still be mapped back onto the bytes it came from.
//! The Treebank rules only ever split or pad, never rewrite characters,
//! so every produced token is a contiguous substring of its sentence and
//! spans are recovered with a forward scan.

use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::Stemmer;

use crate::segment::Span;
use crate::wordnet::Lemmatizer;

lazy_static! {
    static ref RE_SENTENCE: Regex = Regex::new(r#" *[.?!]["')\]]* *"#).unwrap();
    pub(crate) static ref RE_ENG_WORD: Regex = Regex::new(r"^[a-zA-Z_-]+$").unwrap();
    static ref PTB_RULES: Vec<(Regex, &'static str)> = vec![
        (Regex::new(r"([:,])([^\d])").unwrap(), " $1 $2"),
        (Regex::new(r"([:,])$").unwrap(), " $1 "),
        (Regex::new(r"\.\.\.").unwrap(), " ... "),
        (Regex::new(r"[;@#$%&]").unwrap(), " $0 "),
        (
            Regex::new(r#"([^\.])(\.)([\]\)}>"']*)\s*$"#).unwrap(),
            "$1 $2$3 ",
        ),
        (Regex::new(r"[?!]").unwrap(), " $0 "),
        (Regex::new(r"([^'])' ").unwrap(), "$1 ' "),
        (Regex::new(r"[\]\[\(\)\{\}<>]").unwrap(), " $0 "),
        (Regex::new(r"--").unwrap(), " -- "),
        (
            Regex::new(r"(?i)([^' ])('s|'m|'d|'ll|'re|'ve|n't)\b").unwrap(),
            "$1 $2",
        ),
        (Regex::new(r"(?i)\b(can)(not)\b").unwrap(), "$1 $2"),
        (Regex::new(r"(?i)\b(gon)(na)\b").unwrap(), "$1 $2"),
        (Regex::new(r"(?i)\b(wan)(na)\b").unwrap(), "$1 $2"),
    ];
}

/// Sentence spans of `segment`, the delimiter run glued to the sentence it
/// closes. A delimiter only closes a sentence when followed by space or
/// the end of the segment, so `95.7` never splits at its dot.
fn sentences(segment: &str) -> Vec<Span> {
    let mut out = Vec::new();
    let mut last = 0;
    for m in RE_SENTENCE.find_iter(segment) {
        if m.end() < segment.len() && !m.as_str().ends_with(' ') {
            continue;
        }
        if m.end() <= last {
            continue;
        }
        out.push(last..m.end());
        last = m.end();
    }
    if last < segment.len() {
        out.push(last..segment.len());
    }
    out
}

/// Treebank-style word split of one sentence.
fn ptb_tokenize(sentence: &str) -> Vec<String> {
    let mut text = sentence.to_string();
    for (re, rep) in PTB_RULES.iter() {
        text = re.replace_all(&text, *rep).into_owned();
    }
    text.split_whitespace().map(String::from).collect()
}

/// Lemmatize, ASCII-fold and stem one word.
pub(crate) fn normalize_word(word: &str, lem: &Lemmatizer, stemmer: &Stemmer) -> String {
    let base = lem.lemmatize(word).to_ascii_lowercase();
    stemmer.stem(&base).into_owned()
}

/// Tokenize a non-Chinese segment, yielding each token's normalized text
/// and the byte span of its surface form within `segment`.
pub(crate) fn tokenize_segment(
    segment: &str,
    lem: &Lemmatizer,
    stemmer: &Stemmer,
) -> Vec<(Span, String)> {
    let mut out = Vec::new();
    for sent_span in sentences(segment) {
        let sentence = &segment[sent_span.clone()];
        let mut cursor = 0;
        for token in ptb_tokenize(sentence) {
            let span = match sentence[cursor..].find(&token) {
                Some(p) => cursor + p..cursor + p + token.len(),
                None => cursor..cursor,
            };
            cursor = span.end;
            let text = normalize_word(&token, lem, stemmer);
            if !text.is_empty() {
                out.push((
                    span.start + sent_span.start..span.end + sent_span.start,
                    text,
                ));
            }
        }
    }
    out
}
