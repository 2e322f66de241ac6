use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::tokenize::terms;

/// Sparse feature row: (column, value) pairs sorted by column.
pub type SparseRow = Vec<(usize, f64)>;

/// TF-IDF vectorizer over unigram through `ngram_max`-gram terms.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TfidfVectorizer {
    pub max_features: usize,
    pub ngram_max: usize,
    vocabulary: BTreeMap<String, usize>,
    idf: Vec<f64>,
}

impl TfidfVectorizer {
    /// Learn the vocabulary and inverse document frequencies.
    ///
    /// When the corpus has more distinct terms than `max_features`, the most
    /// frequent terms across the corpus are kept (ties broken alphabetically).
    pub fn fit<S: AsRef<str>>(docs: &[S], max_features: usize, ngram_max: usize) -> Self {
        let mut term_freq: HashMap<String, u64> = HashMap::new();
        let mut doc_freq: HashMap<String, u64> = HashMap::new();

        for doc in docs {
            let doc_terms = terms(doc.as_ref(), ngram_max);
            let mut seen: HashSet<&String> = HashSet::with_capacity(doc_terms.len());
            for term in &doc_terms {
                *term_freq.entry(term.clone()).or_insert(0) += 1;
                seen.insert(term);
            }
            for term in seen {
                *doc_freq.entry(term.clone()).or_insert(0) += 1;
            }
        }

        let mut ranked: Vec<(String, u64)> = term_freq.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(max_features);

        let mut kept: Vec<String> = ranked.into_iter().map(|(term, _)| term).collect();
        kept.sort();

        let n_docs = docs.len() as f64;
        let idf = kept
            .iter()
            .map(|term| {
                let df = doc_freq.get(term).copied().unwrap_or(0) as f64;
                ((1.0 + n_docs) / (1.0 + df)).ln() + 1.0
            })
            .collect();
        let vocabulary = kept
            .into_iter()
            .enumerate()
            .map(|(i, term)| (term, i))
            .collect();

        Self {
            max_features,
            ngram_max,
            vocabulary,
            idf,
        }
    }

    pub fn n_features(&self) -> usize {
        self.idf.len()
    }

    pub fn vocabulary(&self) -> &BTreeMap<String, usize> {
        &self.vocabulary
    }

    /// L2-normalised TF-IDF row for one document. Unknown terms are ignored.
    pub fn transform(&self, doc: &str) -> SparseRow {
        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for term in terms(doc, self.ngram_max) {
            if let Some(&col) = self.vocabulary.get(&term) {
                *counts.entry(col).or_insert(0.0) += 1.0;
            }
        }

        let mut row: SparseRow = counts
            .into_iter()
            .map(|(col, tf)| (col, tf * self.idf[col]))
            .collect();

        let norm = row.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, v) in row.iter_mut() {
                *v /= norm;
            }
        }
        row
    }

    pub fn transform_all<S: AsRef<str>>(&self, docs: &[S]) -> Vec<SparseRow> {
        docs.iter().map(|d| self.transform(d.as_ref())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vocabulary_is_capped_by_frequency() {
        let docs = ["cap cap cap space", "cap guard", "guard forward"];
        let v = TfidfVectorizer::fit(&docs, 2, 1);
        assert_eq!(v.n_features(), 2);
        assert!(v.vocabulary().contains_key("cap"));
        assert!(v.vocabulary().contains_key("guard"));
    }

    #[test]
    fn rows_are_unit_length() {
        let docs = ["favorable salary implications", "over salary cap"];
        let v = TfidfVectorizer::fit(&docs, 100, 2);
        let row = v.transform("favorable salary salary");
        let norm: f64 = row.iter().map(|(_, x)| x * x).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-9);
    }

    #[test]
    fn shared_terms_get_lower_idf() {
        let docs = ["salary favorable", "salary cap"];
        let v = TfidfVectorizer::fit(&docs, 100, 1);
        let row = v.transform("salary favorable");
        let weight = |term: &str| {
            let col = v.vocabulary()[term];
            row.iter().find(|(c, _)| *c == col).map(|(_, x)| *x).unwrap()
        };
        assert!(weight("salary") < weight("favorable"));
    }

    #[test]
    fn document_frequency_counts_each_doc_once() {
        let docs = ["cap cap cap", "guard"];
        let v = TfidfVectorizer::fit(&docs, 100, 1);
        let row = v.transform("cap guard");
        assert_eq!(row.len(), 2);
        assert!((row[0].1 - row[1].1).abs() < 1e-12);
    }

    #[test]
    fn long_document_fits() {
        let doc: String = (0..20_000).map(|i| format!("term{i} ")).collect();
        let v = TfidfVectorizer::fit(&[doc.as_str(), "term0 guard"], 50_000, 2);
        assert_eq!(v.n_features(), 40_001);
    }

    #[test]
    fn unknown_text_is_empty_row() {
        let v = TfidfVectorizer::fit(&["guard forward"], 100, 2);
        assert!(v.transform("center rebounding").is_empty());
    }
}
