//! Text feature extraction

use super::ColumnTransform;
use crate::data::{ColumnData, CsrMatrix, FeatureMatrix};
use crate::error::{PredictorError, Result};
use ndarray::Array1;
use regex::Regex;
use std::collections::{HashMap, HashSet};

/// English stop words removed before counting
pub const ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "about", "above", "across", "after", "afterwards", "again", "against", "all", "almost",
    "alone", "along", "already", "also", "although", "always", "am", "among", "amongst", "amoungst",
    "amount", "an", "and", "another", "any", "anyhow", "anyone", "anything", "anyway", "anywhere",
    "are", "around", "as", "at", "back", "be", "became", "because", "become", "becomes", "becoming",
    "been", "before", "beforehand", "behind", "being", "below", "beside", "besides", "between",
    "beyond", "bill", "both", "bottom", "but", "by", "call", "can", "cannot", "cant", "co", "con",
    "could", "couldnt", "cry", "de", "describe", "detail", "do", "done", "down", "due", "during",
    "each", "eg", "eight", "either", "eleven", "else", "elsewhere", "empty", "enough", "etc",
    "even", "ever", "every", "everyone", "everything", "everywhere", "except", "few", "fifteen",
    "fifty", "fill", "find", "fire", "first", "five", "for", "former", "formerly", "forty",
    "found", "four", "from", "front", "full", "further", "get", "give", "go", "had", "has",
    "hasnt", "have", "he", "hence", "her", "here", "hereafter", "hereby", "herein", "hereupon",
    "hers", "herself", "him", "himself", "his", "how", "however", "hundred", "i", "ie", "if",
    "in", "inc", "indeed", "interest", "into", "is", "it", "its", "itself", "keep", "last",
    "latter", "latterly", "least", "less", "ltd", "made", "many", "may", "me", "meanwhile",
    "might", "mill", "mine", "more", "moreover", "most", "mostly", "move", "much", "must", "my",
    "myself", "name", "namely", "neither", "never", "nevertheless", "next", "nine", "no",
    "nobody", "none", "noone", "nor", "not", "nothing", "now", "nowhere", "of", "off", "often",
    "on", "once", "one", "only", "onto", "or", "other", "others", "otherwise", "our", "ours",
    "ourselves", "out", "over", "own", "part", "per", "perhaps", "please", "put", "rather", "re",
    "same", "see", "seem", "seemed", "seeming", "seems", "serious", "several", "she", "should",
    "show", "side", "since", "sincere", "six", "sixty", "so", "some", "somehow", "someone",
    "something", "sometime", "sometimes", "somewhere", "still", "such", "system", "take", "ten",
    "than", "that", "the", "their", "them", "themselves", "then", "thence", "there",
    "thereafter", "thereby", "therefore", "therein", "thereupon", "these", "they", "thick",
    "thin", "third", "this", "those", "though", "three", "through", "throughout", "thru", "thus",
    "to", "together", "too", "top", "toward", "towards", "twelve", "twenty", "two", "un",
    "under", "until", "up", "upon", "us", "very", "via", "was", "we", "well", "were", "what",
    "whatever", "when", "whence", "whenever", "where", "whereafter", "whereas", "whereby",
    "wherein", "whereupon", "wherever", "whether", "which", "while", "whither", "who", "whoever",
    "whole", "whom", "whose", "why", "will", "with", "within", "without", "would", "yet", "you",
    "your", "yours", "yourself", "yourselves",
];

/// Lowercasing word tokenizer: runs of two or more word characters
#[derive(Debug, Clone)]
pub struct TextTokenizer {
    pattern: Regex,
    stop_words: HashSet<String>,
}

impl TextTokenizer {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(r"(?u)\b\w\w+\b").expect("static token pattern"),
            stop_words: HashSet::new(),
        }
    }

    pub fn with_english_stop_words(mut self) -> Self {
        self.stop_words = ENGLISH_STOP_WORDS.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        self.pattern
            .find_iter(&lowered)
            .map(|m| m.as_str())
            .filter(|t| !self.stop_words.contains(*t))
            .map(str::to_string)
            .collect()
    }
}

impl Default for TextTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Count-based text vectorizer (bag of words)
#[derive(Debug, Clone)]
pub struct CountVectorizer {
    tokenizer: TextTokenizer,
    vocabulary: HashMap<String, usize>,
    max_features: Option<usize>,
    is_fitted: bool,
}

impl CountVectorizer {
    pub fn new() -> Self {
        Self {
            tokenizer: TextTokenizer::new(),
            vocabulary: HashMap::new(),
            max_features: None,
            is_fitted: false,
        }
    }

    pub fn with_max_features(mut self, n: usize) -> Self {
        self.max_features = Some(n);
        self
    }

    pub fn with_english_stop_words(mut self) -> Self {
        self.tokenizer = self.tokenizer.with_english_stop_words();
        self
    }

    /// Learn the vocabulary. With `max_features`, keep the most frequent terms
    /// across the corpus (ties broken alphabetically); columns are ordered alphabetically.
    pub fn fit(&mut self, documents: &[String]) -> Result<()> {
        let mut term_freq: HashMap<String, usize> = HashMap::new();
        for doc in documents {
            for token in self.tokenizer.tokenize(doc) {
                *term_freq.entry(token).or_insert(0) += 1;
            }
        }

        if term_freq.is_empty() {
            return Err(PredictorError::PreprocessingError(
                "empty vocabulary; perhaps the documents only contain stop words".to_string(),
            ));
        }

        let mut terms: Vec<(String, usize)> = term_freq.into_iter().collect();
        terms.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        if let Some(max_n) = self.max_features {
            terms.truncate(max_n);
        }

        let mut kept: Vec<String> = terms.into_iter().map(|(t, _)| t).collect();
        kept.sort();

        self.vocabulary = kept.into_iter().enumerate().map(|(idx, t)| (t, idx)).collect();
        self.is_fitted = true;
        Ok(())
    }

    /// Term counts per document; repeated terms accumulate
    pub fn transform(&self, documents: &[String]) -> Result<CsrMatrix> {
        if !self.is_fitted {
            return Err(PredictorError::ModelNotFitted);
        }

        let rows: Vec<Vec<(usize, f64)>> = documents
            .iter()
            .map(|doc| {
                self.tokenizer
                    .tokenize(doc)
                    .iter()
                    .filter_map(|token| self.vocabulary.get(token).map(|&idx| (idx, 1.0)))
                    .collect()
            })
            .collect();
        CsrMatrix::from_rows(self.vocabulary.len(), rows)
    }

    pub fn fit_transform(&mut self, documents: &[String]) -> Result<CsrMatrix> {
        self.fit(documents)?;
        self.transform(documents)
    }

    pub fn get_feature_names(&self) -> Vec<String> {
        let mut names = vec![String::new(); self.vocabulary.len()];
        for (term, &idx) in &self.vocabulary {
            names[idx] = term.clone();
        }
        names
    }
}

impl Default for CountVectorizer {
    fn default() -> Self {
        Self::new()
    }
}

impl ColumnTransform for CountVectorizer {
    fn fit(&mut self, columns: &[&ColumnData], _target: Option<&Array1<f64>>) -> Result<()> {
        CountVectorizer::fit(self, single_text(columns)?)
    }

    fn transform(&self, columns: &[&ColumnData]) -> Result<FeatureMatrix> {
        Ok(CountVectorizer::transform(self, single_text(columns)?)?.into())
    }

    fn n_features_out(&self) -> usize {
        self.vocabulary.len()
    }
}

fn single_text<'a>(columns: &[&'a ColumnData]) -> Result<&'a [String]> {
    match columns {
        [col] => col.as_text().ok_or_else(|| {
            PredictorError::PreprocessingError(format!("count vectorizer needs a text column, got {}", col.kind()))
        }),
        _ => Err(PredictorError::PreprocessingError(format!(
            "count vectorizer takes exactly one column, got {}",
            columns.len()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_tokenizer_drops_short_tokens_and_stop_words() {
        let tok = TextTokenizer::new().with_english_stop_words();
        assert_eq!(tok.tokenize("A Dice game, for the Players!"), vec!["dice", "game", "players"]);
    }

    #[test]
    fn test_counts_and_alphabetical_columns() {
        let mut cv = CountVectorizer::new();
        let x = cv.fit_transform(&docs(&["zebra apple apple", "apple"])).unwrap();
        assert_eq!(cv.get_feature_names(), vec!["apple", "zebra"]);
        assert_eq!(x.get(0, 0), 2.0);
        assert_eq!(x.get(0, 1), 1.0);
        assert_eq!(x.get(1, 1), 0.0);
        assert_eq!(x.nnz(), 3);
    }

    #[test]
    fn test_max_features_keeps_most_frequent() {
        let mut cv = CountVectorizer::new().with_max_features(2);
        cv.fit(&docs(&["war war war card card dice", "trade"])).unwrap();
        assert_eq!(cv.get_feature_names(), vec!["card", "war"]);
    }

    #[test]
    fn test_unknown_terms_ignored() {
        let mut cv = CountVectorizer::new();
        cv.fit(&docs(&["farming"])).unwrap();
        let x = cv.transform(&docs(&["space trading"])).unwrap();
        assert_eq!(x.nnz(), 0);
        assert_eq!(x.nrows(), 1);
    }

    #[test]
    fn test_only_stop_words_fails() {
        let mut cv = CountVectorizer::new().with_english_stop_words();
        assert!(cv.fit(&docs(&["the and of"])).is_err());
    }
}
