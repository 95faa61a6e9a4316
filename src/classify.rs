//! Keyword taxonomy matching.
//!
//! A taxonomy maps topic names to keywords. Keywords containing a space are
//! phrases and match by substring; all others are single words and match on
//! word boundaries. Matching is case-insensitive.
//!
//! Phrases are masked before single words are checked: every matched phrase
//! span is overwritten with `_` in a working copy of the title, so the words
//! inside "vector database" cannot also fire a lone `database` rule. Phrases
//! are masked in taxonomy order (topics in order, keywords in order), and a
//! phrase overlapping an already-masked span no longer matches the working
//! copy, so the earlier phrase wins.

use regex::Regex;
use std::collections::BTreeSet;

const MASK: char = '_';

/// The keywords configured for one topic, in configuration order.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicKeywords {
    pub topic: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone)]
enum Matcher {
    Phrase(String),
    Word(Regex),
}

impl Matcher {
    fn compile(keyword: &str) -> Result<Self, regex::Error> {
        let keyword = keyword.trim().to_lowercase();
        if keyword.contains(' ') {
            Ok(Matcher::Phrase(keyword))
        } else {
            let pattern = format!(r"\b{}\b", regex::escape(&keyword));
            Ok(Matcher::Word(Regex::new(&pattern)?))
        }
    }

    fn is_match(&self, text: &str) -> bool {
        match self {
            Matcher::Phrase(phrase) => text.contains(phrase.as_str()),
            Matcher::Word(re) => re.is_match(text),
        }
    }
}

#[derive(Debug, Clone)]
struct CompiledTopic {
    name: String,
    matchers: Vec<Matcher>,
}

/// Classifies titles against a compiled keyword taxonomy.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    topics: Vec<CompiledTopic>,
}

impl KeywordClassifier {
    /// Compile a taxonomy. Fails only if a keyword produces an invalid
    /// pattern, which escaping makes practically unreachable.
    pub fn new(taxonomy: &[TopicKeywords]) -> Result<Self, regex::Error> {
        let topics = taxonomy
            .iter()
            .map(|t| {
                Ok(CompiledTopic {
                    name: t.topic.clone(),
                    matchers: t
                        .keywords
                        .iter()
                        .map(|k| Matcher::compile(k))
                        .collect::<Result<_, _>>()?,
                })
            })
            .collect::<Result<_, regex::Error>>()?;
        Ok(Self { topics })
    }

    /// Overwrite every matched phrase span with the mask character.
    fn mask_phrases(&self, text: &str) -> String {
        let mut masked = text.to_string();
        for matcher in self.topics.iter().flat_map(|t| &t.matchers) {
            if let Matcher::Phrase(phrase) = matcher {
                if masked.contains(phrase.as_str()) {
                    let blank: String = std::iter::repeat_n(MASK, phrase.chars().count()).collect();
                    masked = masked.replace(phrase.as_str(), &blank);
                }
            }
        }
        masked
    }

    /// Topics with at least one matching keyword.
    pub fn classify(&self, title: &str) -> BTreeSet<String> {
        let lower = title.to_lowercase();
        let masked = self.mask_phrases(&lower);

        self.topics
            .iter()
            .filter(|topic| {
                topic.matchers.iter().any(|m| match m {
                    Matcher::Phrase(_) => m.is_match(&lower),
                    Matcher::Word(_) => m.is_match(&masked),
                })
            })
            .map(|topic| topic.name.clone())
            .collect()
    }

    /// Keyword hits across the whole taxonomy divided by the title's word
    /// count. Each keyword counts at most once, masking does not apply, and
    /// an empty title scores 0.
    pub fn keyword_density(&self, title: &str) -> f64 {
        let lower = title.to_lowercase();
        let words = lower.split_whitespace().count();
        if words == 0 {
            return 0.0;
        }
        let hits = self
            .topics
            .iter()
            .flat_map(|t| &t.matchers)
            .filter(|m| m.is_match(&lower))
            .count();
        hits as f64 / words as f64
    }
}
