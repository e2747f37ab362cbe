use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref RE: Regex = Regex::new(r"(?u)[\p{L}\p{N}][\p{L}\p{N}_']*").expect("valid regex");
    static ref ENGLISH_STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","an","and","at","by","for","from","in","of","on","or","the","to","with",
            "di","dan","ke","dari","yang",
        ];
        words.iter().copied().collect()
    };
}

/// Splits field text into index terms.
pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Vec<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stemming {
    #[default]
    None,
    English,
}

/// NFKC-normalizing, lower-casing word tokenizer with optional stopword
/// removal and stemming. Place names are kept verbatim by default.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextTokenizer {
    stemming: Stemming,
    drop_stopwords: bool,
}

impl TextTokenizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stemming(mut self, stemming: Stemming) -> Self {
        self.stemming = stemming;
        self
    }

    pub fn with_stopwords(mut self, drop: bool) -> Self {
        self.drop_stopwords = drop;
        self
    }

    /// Tokenize text into (term, position); positions count stopwords too.
    pub fn tokenize_with_positions(&self, text: &str) -> Vec<(String, usize)> {
        let normalized = text.nfkc().collect::<String>().to_lowercase();
        let mut tokens = Vec::new();
        for (pos, mat) in RE.find_iter(&normalized).enumerate() {
            let token = mat.as_str();
            if self.drop_stopwords && STOPWORDS.contains(token) {
                continue;
            }
            let term = match self.stemming {
                Stemming::None => token.to_string(),
                Stemming::English => ENGLISH_STEMMER.stem(token).to_string(),
            };
            tokens.push((term, pos));
        }
        tokens
    }
}

impl Tokenizer for TextTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        self.tokenize_with_positions(text).into_iter().map(|(t, _)| t).collect()
    }
}
