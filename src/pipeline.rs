//! Per-keyword validation as a chain of consuming stages.
//!
//! `Received -> Tokenized -> ProductsNormalized -> Matched -> KeywordReport`.
//! Each transition takes `self`, so a stage can neither be skipped nor run
//! twice. A keyword with nothing to check leaves through
//! [`Tokenized::no_data`] instead of pretending every product passed.

use crate::analyzer::{aggregate_keyword, aggregate_product, match_tokens, no_data};
use crate::lexicon::Lexicon;
use crate::model::{Keyword, KeywordReport, MatchResult, NoDataReason, Product, Token};
use crate::normalizer::{NormalizedProduct, normalize_all};
use crate::tokenizer::tokenize;

#[derive(Debug)]
pub struct Received {
    keyword: Keyword,
}

#[derive(Debug)]
pub struct Tokenized {
    keyword: Keyword,
    tokens: Vec<Token>,
}

#[derive(Debug)]
pub struct ProductsNormalized {
    keyword: Keyword,
    tokens: Vec<Token>,
    products: Vec<NormalizedProduct>,
}

#[derive(Debug)]
pub struct Matched {
    keyword: Keyword,
    tokens: Vec<Token>,
    products: Vec<(NormalizedProduct, Vec<MatchResult>)>,
}

impl Received {
    pub fn new(keyword: Keyword) -> Self {
        Self { keyword }
    }

    pub fn tokenize(self, lexicon: &Lexicon) -> Tokenized {
        let tokens = tokenize(&self.keyword, lexicon);
        Tokenized {
            keyword: self.keyword,
            tokens,
        }
    }
}

impl Tokenized {
    pub fn keyword(&self) -> &Keyword {
        &self.keyword
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Zero products go straight to an explicit no-data report.
    pub fn normalize(
        self,
        products: &[Product],
        lexicon: &Lexicon,
    ) -> Result<ProductsNormalized, KeywordReport> {
        if products.is_empty() {
            return Err(self.no_data(NoDataReason::EmptyResults));
        }
        Ok(ProductsNormalized {
            keyword: self.keyword,
            tokens: self.tokens,
            products: normalize_all(products, lexicon),
        })
    }

    pub fn no_data(self, reason: NoDataReason) -> KeywordReport {
        no_data(self.keyword, self.tokens, reason)
    }
}

impl ProductsNormalized {
    pub fn match_tokens(self, lexicon: &Lexicon) -> Matched {
        let products = self
            .products
            .into_iter()
            .map(|product| {
                let results = match_tokens(&self.tokens, &product, lexicon);
                (product, results)
            })
            .collect();
        Matched {
            keyword: self.keyword,
            tokens: self.tokens,
            products,
        }
    }
}

impl Matched {
    pub fn aggregate(self, lexicon: &Lexicon) -> KeywordReport {
        let verdicts = self
            .products
            .into_iter()
            .enumerate()
            .map(|(idx, (product, results))| {
                aggregate_product(
                    &product,
                    idx + 1,
                    &self.tokens,
                    results,
                    lexicon.free_text_tolerance,
                )
            })
            .collect();
        aggregate_keyword(self.keyword, self.tokens, verdicts)
    }
}

/// Runs one keyword and its scraped products through every stage.
pub fn validate_keyword(
    keyword: Keyword,
    products: &[Product],
    lexicon: &Lexicon,
) -> KeywordReport {
    match Received::new(keyword).tokenize(lexicon).normalize(products, lexicon) {
        Ok(normalized) => normalized.match_tokens(lexicon).aggregate(lexicon),
        Err(report) => report,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchConfig;
    use crate::model::{KeywordStatus, TokenClass};

    fn lexicon() -> Lexicon {
        let mut cfg = MatchConfig::default();
        cfg.vocabularies
            .insert(TokenClass::Category, vec!["jacket".into()]);
        Lexicon::compile(&cfg).unwrap()
    }

    #[test]
    fn stages_run_in_order() {
        let lex = lexicon();
        let products = vec![
            Product::new("1").with_field("title", "Blue rain jacket"),
            Product::new("2").with_field("title", "Red rain jacket"),
        ];
        let tokenized = Received::new(Keyword::new(2, "blue jacket")).tokenize(&lex);
        assert_eq!(tokenized.tokens().len(), 2);
        let report = tokenized
            .normalize(&products, &lex)
            .unwrap()
            .match_tokens(&lex)
            .aggregate(&lex);
        assert_eq!(report.status, KeywordStatus::Flagged);
        assert_eq!(report.verdicts[1].position, 2);
        assert!(!report.verdicts[1].passed);
    }

    #[test]
    fn empty_products_take_no_data_transition() {
        let report = validate_keyword(Keyword::new(1, "blue jacket"), &[], &lexicon());
        assert_eq!(report.status, KeywordStatus::NoData(NoDataReason::EmptyResults));
        assert_eq!(report.tokens.len(), 2);
    }

    #[test]
    fn scrape_failure_keeps_tokens() {
        let tokenized = Received::new(Keyword::new(1, "blue jacket")).tokenize(&lexicon());
        let report = tokenized.no_data(NoDataReason::ScrapeFailed("timeout".into()));
        assert_eq!(report.status.as_str(), "no_data");
        assert_eq!(report.token_failures.len(), 2);
    }
}
