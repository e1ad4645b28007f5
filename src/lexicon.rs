//! Compiled, read-only form of [`MatchConfig`].
//!
//! Built once at startup; every term is folded with the same rules the
//! tokenizer and normalizer use, so lookups are plain string comparisons.
//! A malformed table is a [`ConfigError`]: proceeding with it would make every
//! verdict suspect.

use crate::config::{CorpusMatch, MatchConfig};
use crate::model::{ConfigError, TokenClass};
use crate::utils::{fold_text, split_words};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone)]
pub struct Lexicon {
    case_sensitive: bool,
    stop_words: HashSet<String>,
    /// Longest first.
    phrases: Vec<Vec<String>>,
    vocabulary: HashMap<String, TokenClass>,
    synonym_groups: Vec<Vec<String>>,
    synonym_index: HashMap<String, usize>,
    class_fields: HashMap<TokenClass, Vec<String>>,
    class_markers: HashMap<String, TokenClass>,
    corpus_fields: Vec<String>,
    pub free_text_tolerance: usize,
    pub corpus_match: CorpusMatch,
    pub fallback_on_field_conflict: bool,
}

impl Lexicon {
    pub fn compile(cfg: &MatchConfig) -> Result<Self, ConfigError> {
        let case_sensitive = cfg.case_sensitive;
        let fold = |text: &str| split_words(&fold_text(text, case_sensitive));
        let folded_term = |text: &str, what: &str| -> Result<String, ConfigError> {
            let words = fold(text);
            if words.is_empty() {
                return Err(ConfigError::Invalid(format!("empty {} '{}'", what, text)));
            }
            Ok(words.join(" "))
        };

        let stop_words = cfg
            .stop_words
            .iter()
            .map(|w| fold(w).join(" "))
            .filter(|w| !w.is_empty())
            .collect();

        let mut vocabulary: HashMap<String, TokenClass> = HashMap::new();
        for (class, terms) in &cfg.vocabularies {
            if !class.is_classified() {
                return Err(ConfigError::Invalid(
                    "free_text cannot have a vocabulary".into(),
                ));
            }
            for term in terms {
                let term = folded_term(term, "vocabulary term")?;
                match vocabulary.get(&term) {
                    Some(existing) if existing != class => {
                        return Err(ConfigError::Invalid(format!(
                            "term '{}' is listed under both {} and {}",
                            term, existing, class
                        )));
                    }
                    _ => {
                        vocabulary.insert(term, *class);
                    }
                }
            }
        }

        let mut phrases: Vec<Vec<String>> = Vec::new();
        for phrase in &cfg.phrases {
            let words = fold(phrase);
            if words.len() < 2 {
                return Err(ConfigError::Invalid(format!(
                    "phrase '{}' must contain at least two words",
                    phrase
                )));
            }
            phrases.push(words);
        }

        let mut synonym_groups: Vec<Vec<String>> = Vec::new();
        let mut synonym_index: HashMap<String, usize> = HashMap::new();
        for (canonical, aliases) in &cfg.synonyms {
            let group_id = synonym_groups.len();
            let mut group = vec![folded_term(canonical, "synonym")?];
            for alias in aliases {
                let alias = folded_term(alias, "synonym alias")?;
                if !group.contains(&alias) {
                    group.push(alias);
                }
            }
            for member in &group {
                if let Some(&other) = synonym_index.get(member) {
                    return Err(ConfigError::Invalid(format!(
                        "'{}' belongs to both the '{}' and '{}' synonym groups",
                        member, synonym_groups[other][0], group[0]
                    )));
                }
                synonym_index.insert(member.clone(), group_id);
            }
            synonym_groups.push(group);
        }

        // Multi-word vocabulary terms and synonyms collapse like configured phrases.
        phrases.extend(
            vocabulary
                .keys()
                .chain(synonym_groups.iter().flatten())
                .filter(|term| term.contains(' '))
                .map(|term| term.split(' ').map(str::to_string).collect()),
        );
        phrases.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        phrases.dedup();

        let mut class_fields = HashMap::new();
        for (class, fields) in &cfg.class_fields {
            if !class.is_classified() {
                return Err(ConfigError::Invalid(
                    "free_text cannot be mapped to fields".into(),
                ));
            }
            let fields: Vec<String> = fields
                .iter()
                .map(|f| f.trim().to_lowercase())
                .filter(|f| !f.is_empty())
                .collect();
            if fields.is_empty() {
                return Err(ConfigError::Invalid(format!("no fields listed for class {}", class)));
            }
            class_fields.insert(*class, fields);
        }

        let mut class_markers = HashMap::new();
        for (marker, class) in &cfg.class_markers {
            let words = fold(marker);
            if words.len() != 1 {
                return Err(ConfigError::Invalid(format!(
                    "class marker '{}' must be a single word",
                    marker
                )));
            }
            if !class.is_classified() {
                return Err(ConfigError::Invalid(format!(
                    "class marker '{}' must point at an attribute class",
                    marker
                )));
            }
            class_markers.insert(words[0].clone(), *class);
        }

        let corpus_fields = cfg
            .corpus_fields
            .iter()
            .map(|f| f.trim().to_lowercase())
            .filter(|f| !f.is_empty())
            .collect();

        Ok(Self {
            case_sensitive,
            stop_words,
            phrases,
            vocabulary,
            synonym_groups,
            synonym_index,
            class_fields,
            class_markers,
            corpus_fields,
            free_text_tolerance: cfg.free_text_tolerance,
            corpus_match: cfg.corpus_match,
            fallback_on_field_conflict: cfg.fallback_on_field_conflict,
        })
    }

    /// Folds and splits text exactly like keywords and product fields are.
    pub fn fold(&self, text: &str) -> Vec<String> {
        split_words(&fold_text(text, self.case_sensitive))
    }

    pub fn is_stop_word(&self, word: &str) -> bool {
        self.stop_words.contains(word)
    }

    /// Length of the longest phrase starting at the head of `words`.
    pub fn phrase_at(&self, words: &[String]) -> Option<usize> {
        self.phrases
            .iter()
            .find(|phrase| words.starts_with(phrase))
            .map(Vec::len)
    }

    pub fn marker(&self, word: &str) -> Option<TokenClass> {
        self.class_markers.get(word).copied()
    }

    /// Vocabulary class of a term, falling back to its synonym group.
    pub fn classify(&self, term: &str) -> TokenClass {
        if let Some(class) = self.vocabulary.get(term) {
            return *class;
        }
        self.synonym_index
            .get(term)
            .and_then(|&group| {
                self.synonym_groups[group]
                    .iter()
                    .find_map(|member| self.vocabulary.get(member))
            })
            .copied()
            .unwrap_or(TokenClass::FreeText)
    }

    /// Other members of the term's synonym group.
    pub fn synonyms_of(&self, term: &str) -> Vec<String> {
        match self.synonym_index.get(term) {
            Some(&group) => self.synonym_groups[group]
                .iter()
                .filter(|member| member.as_str() != term)
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn fields_for(&self, class: TokenClass) -> &[String] {
        self.class_fields
            .get(&class)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn corpus_fields(&self) -> &[String] {
        &self.corpus_fields
    }
}
