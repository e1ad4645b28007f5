use crate::lexicon::Lexicon;
use crate::model::Product;
use crate::utils::contains_word_run;
use std::collections::BTreeMap;

/// Fields that identify a product rather than describe it; left out of the
/// default corpus.
const IDENTIFIER_FIELDS: &[&str] = &[
    "id", "product_id", "sku", "url", "link", "href", "image", "image_url",
];

/// Folded words of one field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedText {
    words: Vec<String>,
}

impl NormalizedText {
    pub fn new(words: Vec<String>) -> Self {
        Self { words }
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn as_text(&self) -> String {
        self.words.join(" ")
    }

    pub fn contains_words(&self, needle: &[String]) -> bool {
        contains_word_run(&self.words, needle)
    }

    pub fn contains_substring(&self, needle: &str) -> bool {
        !needle.is_empty() && self.as_text().contains(needle)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusSegment {
    pub field: String,
    pub text: NormalizedText,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedProduct {
    pub id: String,
    pub title: String,
    fields: BTreeMap<String, NormalizedText>,
    corpus: Vec<CorpusSegment>,
}

impl NormalizedProduct {
    pub fn field(&self, name: &str) -> Option<&NormalizedText> {
        self.fields.get(name)
    }

    /// Corpus kept per field so a phrase never spans two fields.
    pub fn corpus(&self) -> &[CorpusSegment] {
        &self.corpus
    }

    pub fn corpus_text(&self) -> String {
        self.corpus
            .iter()
            .map(|segment| segment.text.as_text())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

pub fn normalize_all(products: &[Product], lexicon: &Lexicon) -> Vec<NormalizedProduct> {
    products
        .iter()
        .map(|product| normalize(product, lexicon))
        .collect()
}

/// Folds every raw field; empty and missing fields simply end up absent.
pub fn normalize(product: &Product, lexicon: &Lexicon) -> NormalizedProduct {
    let fields: BTreeMap<String, NormalizedText> = product
        .fields
        .iter()
        .map(|(name, value)| (name.clone(), NormalizedText::new(lexicon.fold(value))))
        .filter(|(_, text)| !text.is_empty())
        .collect();

    let corpus = if lexicon.corpus_fields().is_empty() {
        fields
            .iter()
            .filter(|(name, _)| !IDENTIFIER_FIELDS.contains(&name.as_str()))
            .map(|(name, text)| CorpusSegment {
                field: name.clone(),
                text: text.clone(),
            })
            .collect()
    } else {
        lexicon
            .corpus_fields()
            .iter()
            .filter_map(|name| {
                fields.get(name).map(|text| CorpusSegment {
                    field: name.clone(),
                    text: text.clone(),
                })
            })
            .collect()
    };

    NormalizedProduct {
        id: product.id.clone(),
        title: product.title().trim().to_string(),
        fields,
        corpus,
    }
}
