//! WordNet-backed lemmatizer.
//!
//! Loads, per part of speech, the lemma inventory from `index.<pos>` (the
//! first whitespace token of every non-blank, non-indented line) and the
//! irregular forms from `<pos>.exc` (inflected form followed by its base
//! forms). `lemmatize` resolves a word by trying the parts of speech in
//! the order noun, verb, adjective, adverb: exceptions first, then the
//! morphy detachment rules, returning the first form present in the
//! inventory. Words that resolve nowhere are returned unchanged.

use std::fs;
use std::path::Path;

use hashbrown::{HashMap, HashSet};

use crate::errors::{Error, Result};

const POS_COUNT: usize = 4;
const NOUN: usize = 0;
const VERB: usize = 1;
const ADJ: usize = 2;
const ADV: usize = 3;

static FILE_STEMS: [&str; POS_COUNT] = ["noun", "verb", "adj", "adv"];

/// Suffix detachment rules per part of speech, applied longest-suffix
/// first as listed.
static SUBSTITUTIONS: [&[(&str, &str)]; POS_COUNT] = [
    // noun
    &[
        ("ches", "ch"),
        ("shes", "sh"),
        ("ses", "s"),
        ("ves", "f"),
        ("xes", "x"),
        ("zes", "z"),
        ("men", "man"),
        ("ies", "y"),
        ("s", ""),
    ],
    // verb
    &[
        ("ies", "y"),
        ("es", "e"),
        ("es", ""),
        ("ed", "e"),
        ("ed", ""),
        ("ing", "e"),
        ("ing", ""),
        ("s", ""),
    ],
    // adjective
    &[("est", ""), ("est", "e"), ("er", ""), ("er", "e")],
    // adverb
    &[],
];

#[derive(Debug, Default)]
pub struct Lemmatizer {
    lemmas: [HashSet<String>; POS_COUNT],
    exceptions: [HashMap<String, String>; POS_COUNT],
}

impl Lemmatizer {
    /// Load the four index/exception file pairs from a WordNet bundle.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let mut lem = Lemmatizer::default();
        for (pos, stem) in FILE_STEMS.iter().enumerate() {
            let index_path = dir.join(format!("index.{}", stem));
            if !index_path.is_file() {
                return Err(Error::MissingResource(index_path));
            }
            for line in fs::read_to_string(&index_path)?.lines() {
                if line.is_empty() || line.starts_with(' ') {
                    continue;
                }
                if let Some(lemma) = line.split_whitespace().next() {
                    lem.lemmas[pos].insert(lemma.to_string());
                }
            }
            let exc_path = dir.join(format!("{}.exc", stem));
            if !exc_path.is_file() {
                return Err(Error::MissingResource(exc_path));
            }
            for line in fs::read_to_string(&exc_path)?.lines() {
                let mut fields = line.split_whitespace();
                if let (Some(form), Some(base)) = (fields.next(), fields.next()) {
                    lem.exceptions[pos].insert(form.to_string(), base.to_string());
                }
            }
        }
        Ok(lem)
    }

    fn pos_index(pos: char) -> Option<usize> {
        match pos {
            'n' => Some(NOUN),
            'v' => Some(VERB),
            // the adjective-satellite tag aliases the adjective tables
            'a' | 's' => Some(ADJ),
            'r' => Some(ADV),
            _ => None,
        }
    }

    fn morphy(&self, word: &str, pos: usize) -> Option<String> {
        if let Some(base) = self.exceptions[pos].get(word) {
            return Some(base.clone());
        }
        if self.lemmas[pos].contains(word) {
            return Some(word.to_string());
        }
        for &(suffix, replacement) in SUBSTITUTIONS[pos] {
            if let Some(stripped) = word.strip_suffix(suffix) {
                if stripped.is_empty() {
                    continue;
                }
                let candidate = format!("{}{}", stripped, replacement);
                if self.lemmas[pos].contains(&candidate) {
                    return Some(candidate);
                }
            }
        }
        None
    }

    /// Base form of `word` for an explicit part of speech.
    pub fn lemmatize_pos(&self, word: &str, pos: char) -> String {
        match Self::pos_index(pos) {
            Some(idx) => self.morphy(word, idx).unwrap_or_else(|| word.to_string()),
            None => word.to_string(),
        }
    }

    /// Base form of `word`, trying noun, verb, adjective, adverb in order.
    pub fn lemmatize(&self, word: &str) -> String {
        for pos in 0..POS_COUNT {
            if let Some(base) = self.morphy(word, pos) {
                return base;
            }
        }
        word.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lemmatizer() -> Lemmatizer {
        let mut lem = Lemmatizer::default();
        for w in ["datum", "dog", "church", "wolf", "box", "model", "dataset"] {
            lem.lemmas[NOUN].insert(w.to_string());
        }
        for w in ["run", "train", "be", "index"] {
            lem.lemmas[VERB].insert(w.to_string());
        }
        lem.lemmas[ADJ].insert("large".to_string());
        lem.exceptions[NOUN].insert("data".to_string(), "datum".to_string());
        lem.exceptions[VERB].insert("was".to_string(), "be".to_string());
        lem.exceptions[VERB].insert("ran".to_string(), "run".to_string());
        lem
    }

    #[test]
    fn test_exceptions_win() {
        let lem = lemmatizer();
        assert_eq!(lem.lemmatize("data"), "datum");
        assert_eq!(lem.lemmatize("was"), "be");
        assert_eq!(lem.lemmatize("ran"), "run");
    }

    #[test]
    fn test_suffix_rules() {
        let lem = lemmatizer();
        assert_eq!(lem.lemmatize("dogs"), "dog");
        assert_eq!(lem.lemmatize("churches"), "church");
        assert_eq!(lem.lemmatize("wolves"), "wolf");
        assert_eq!(lem.lemmatize("boxes"), "box");
        assert_eq!(lem.lemmatize("models"), "model");
        assert_eq!(lem.lemmatize("training"), "train");
    }

    #[test]
    fn test_pos_order_noun_first() {
        // "indexes" resolves as a noun form before the verb tables run.
        let mut lem = lemmatizer();
        lem.lemmas[NOUN].insert("index".to_string());
        assert_eq!(lem.lemmatize("indexes"), "index");
    }

    #[test]
    fn test_unknown_words_unchanged() {
        let lem = lemmatizer();
        assert_eq!(lem.lemmatize("transformer"), "transformer");
        assert_eq!(lem.lemmatize("imagenet"), "imagenet");
        assert_eq!(lem.lemmatize(""), "");
    }

    #[test]
    fn test_satellite_alias() {
        let lem = lemmatizer();
        assert_eq!(lem.lemmatize_pos("larger", 's'), "large");
        assert_eq!(lem.lemmatize_pos("larger", 'a'), "large");
    }
}
