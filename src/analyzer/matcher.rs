use crate::config::CorpusMatch;
use crate::lexicon::Lexicon;
use crate::model::{MatchResult, MatchedVia, Token};
use crate::normalizer::{NormalizedProduct, NormalizedText};

/// Needle words for the literal token followed by each synonym.
struct Needles {
    literal: Vec<String>,
    synonyms: Vec<(String, Vec<String>)>,
}

impl Needles {
    fn of(token: &Token) -> Self {
        Self {
            literal: token.words(),
            synonyms: token
                .synonyms
                .iter()
                .map(|s| (s.clone(), s.split(' ').map(str::to_string).collect()))
                .collect(),
        }
    }

    /// Word-boundary search for the literal token, then its synonyms.
    /// Returns the term that matched and whether it was a synonym.
    fn find_words<'a>(
        &'a self,
        token: &'a Token,
        text: &NormalizedText,
    ) -> Option<(&'a str, bool)> {
        if text.contains_words(&self.literal) {
            return Some((token.text.as_str(), false));
        }
        self.synonyms
            .iter()
            .find(|(_, words)| text.contains_words(words))
            .map(|(term, _)| (term.as_str(), true))
    }
}

/// Decides whether one token is satisfied by one product.
///
/// Classified tokens look in their class fields first (`field_exact`); every
/// token may then fall back to the corpus (`corpus_fallback`). Synonyms always
/// need whole-word alignment; only a free-text literal honours
/// `CorpusMatch::Contains`.
pub fn match_token(token: &Token, product: &NormalizedProduct, lexicon: &Lexicon) -> MatchResult {
    let needles = Needles::of(token);
    let mut observed: Option<(String, String)> = None;

    if token.is_classified() {
        for field in lexicon.fields_for(token.class) {
            let Some(text) = product.field(field) else {
                continue;
            };
            if let Some((term, by_synonym)) = needles.find_words(token, text) {
                return MatchResult::hit(
                    token.position,
                    MatchedVia::FieldExact,
                    term,
                    by_synonym,
                    field,
                );
            }
            if observed.is_none() {
                observed = Some((field.clone(), text.as_text()));
            }
        }
        if observed.is_some() && !lexicon.fallback_on_field_conflict {
            return MatchResult::unmatched(token.position, observed);
        }
    }

    let substring = !token.is_classified() && lexicon.corpus_match == CorpusMatch::Contains;
    for segment in product.corpus() {
        if substring && segment.text.contains_substring(&token.text) {
            return MatchResult::hit(
                token.position,
                MatchedVia::CorpusFallback,
                &token.text,
                false,
                &segment.field,
            );
        }
        if let Some((term, by_synonym)) = needles.find_words(token, &segment.text) {
            return MatchResult::hit(
                token.position,
                MatchedVia::CorpusFallback,
                term,
                by_synonym,
                &segment.field,
            );
        }
    }

    MatchResult::unmatched(token.position, observed)
}

/// Matches every token against one product, in token order.
pub fn match_tokens(
    tokens: &[Token],
    product: &NormalizedProduct,
    lexicon: &Lexicon,
) -> Vec<MatchResult> {
    tokens
        .iter()
        .map(|token| match_token(token, product, lexicon))
        .collect()
}
