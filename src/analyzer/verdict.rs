use crate::model::{
    Keyword, KeywordReport, KeywordStatus, MatchResult, NoDataReason, ProductVerdict, Token,
};
use crate::normalizer::NormalizedProduct;
use tracing::debug;

/// Folds one product's match results into a verdict.
///
/// Any unmatched classified token fails the product outright. Unmatched
/// free-text tokens only fail it once they exceed `tolerance`.
pub fn aggregate_product(
    product: &NormalizedProduct,
    position: usize,
    tokens: &[Token],
    results: Vec<MatchResult>,
    tolerance: usize,
) -> ProductVerdict {
    let unmatched: Vec<Token> = tokens
        .iter()
        .zip(&results)
        .filter(|(_, result)| !result.matched())
        .map(|(token, _)| token.clone())
        .collect();

    let classified_miss = unmatched.iter().any(Token::is_classified);
    let free_text_misses = unmatched.iter().filter(|t| !t.is_classified()).count();

    ProductVerdict {
        product_id: product.id.clone(),
        title: product.title.clone(),
        position,
        results,
        passed: !classified_miss && free_text_misses <= tolerance,
        unmatched,
    }
}

/// Rolls product verdicts up into the keyword's report.
pub fn aggregate_keyword(
    keyword: Keyword,
    tokens: Vec<Token>,
    verdicts: Vec<ProductVerdict>,
) -> KeywordReport {
    if verdicts.is_empty() {
        return no_data(keyword, tokens, NoDataReason::EmptyResults);
    }

    let total_count = verdicts.len();
    let failing_count = verdicts.iter().filter(|v| !v.passed).count();
    let token_failures: Vec<(Token, usize)> = tokens
        .iter()
        .map(|token| {
            let failures = verdicts
                .iter()
                .filter(|v| !v.passed && v.unmatched.iter().any(|t| t.position == token.position))
                .count();
            (token.clone(), failures)
        })
        .collect();

    let status = if tokens.is_empty() {
        KeywordStatus::Unconstrained
    } else if failing_count > 0 {
        KeywordStatus::Flagged
    } else {
        KeywordStatus::Passed
    };

    debug!(
        "row {} '{}': {} ({}/{} failing)",
        keyword.row,
        keyword.text,
        status.as_str(),
        failing_count,
        total_count
    );

    KeywordReport {
        keyword,
        tokens,
        verdicts,
        status,
        failing_count,
        total_count,
        token_failures,
    }
}

/// Report for a keyword whose search gave nothing to check.
pub fn no_data(keyword: Keyword, tokens: Vec<Token>, reason: NoDataReason) -> KeywordReport {
    let token_failures = tokens.iter().map(|t| (t.clone(), 0)).collect();
    KeywordReport {
        keyword,
        tokens,
        verdicts: Vec::new(),
        status: KeywordStatus::NoData(reason),
        failing_count: 0,
        total_count: 0,
        token_failures,
    }
}

/// Report for an input row that could not be read as a keyword.
pub fn invalid_input(row: usize, raw: &str, reason: &str) -> KeywordReport {
    KeywordReport {
        keyword: Keyword::new(row, raw),
        tokens: Vec::new(),
        verdicts: Vec::new(),
        status: KeywordStatus::InvalidInput(reason.to_string()),
        failing_count: 0,
        total_count: 0,
        token_failures: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchConfig;
    use crate::lexicon::Lexicon;
    use crate::model::{MatchedVia, Product, TokenClass};
    use crate::normalizer::normalize;

    fn token(text: &str, class: TokenClass, position: usize) -> Token {
        Token {
            text: text.into(),
            class,
            synonyms: Vec::new(),
            keyword_row: 1,
            position,
        }
    }

    fn product(id: &str) -> NormalizedProduct {
        let lex = Lexicon::compile(&MatchConfig::default()).unwrap();
        normalize(&Product::new(id).with_field("title", format!("Item {}", id)), &lex)
    }

    fn hit(position: usize) -> MatchResult {
        MatchResult::hit(position, MatchedVia::CorpusFallback, "x", false, "title")
    }

    fn miss(position: usize) -> MatchResult {
        MatchResult::unmatched(position, None)
    }

    #[test]
    fn classified_miss_fails_product() {
        let tokens = vec![
            token("blue", TokenClass::Color, 0),
            token("waterproof", TokenClass::FreeText, 1),
        ];
        let verdict = aggregate_product(&product("a"), 1, &tokens, vec![miss(0), hit(1)], 5);
        assert!(!verdict.passed);
        assert_eq!(verdict.unmatched, vec![tokens[0].clone()]);
        assert_eq!(verdict.title, "Item a");
    }

    #[test]
    fn free_text_misses_within_tolerance_pass() {
        let tokens = vec![
            token("blue", TokenClass::Color, 0),
            token("waterproof", TokenClass::FreeText, 1),
        ];
        let strict = aggregate_product(&product("a"), 1, &tokens, vec![hit(0), miss(1)], 0);
        assert!(!strict.passed);
        let lenient = aggregate_product(&product("a"), 1, &tokens, vec![hit(0), miss(1)], 1);
        assert!(lenient.passed);
        assert_eq!(lenient.unmatched.len(), 1);
    }

    #[test]
    fn keyword_flagged_with_per_token_counts() {
        let tokens = vec![
            token("blue", TokenClass::Color, 0),
            token("jacket", TokenClass::Category, 1),
        ];
        let verdicts = vec![
            aggregate_product(&product("a"), 1, &tokens, vec![hit(0), hit(1)], 0),
            aggregate_product(&product("b"), 2, &tokens, vec![miss(0), hit(1)], 0),
            aggregate_product(&product("c"), 3, &tokens, vec![miss(0), miss(1)], 0),
        ];
        let report = aggregate_keyword(Keyword::new(7, "blue jacket"), tokens, verdicts);
        assert_eq!(report.status, KeywordStatus::Flagged);
        assert_eq!(report.failing_count, 2);
        assert_eq!(report.total_count, 3);
        let counts: Vec<(String, usize)> = report
            .token_failures
            .iter()
            .map(|(t, n)| (t.label(), *n))
            .collect();
        assert_eq!(
            counts,
            vec![("blue[color]".to_string(), 2), ("jacket[category]".to_string(), 1)]
        );
        let pct = report.relevance_pct().unwrap();
        assert!((pct - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn all_passing_keyword_is_not_flagged() {
        let tokens = vec![token("jacket", TokenClass::Category, 0)];
        let verdicts = vec![aggregate_product(&product("a"), 1, &tokens, vec![hit(0)], 0)];
        let report = aggregate_keyword(Keyword::new(1, "jacket"), tokens, verdicts);
        assert_eq!(report.status, KeywordStatus::Passed);
        assert!(!report.flagged());
    }

    #[test]
    fn no_products_is_no_data_not_passed() {
        let tokens = vec![token("jacket", TokenClass::Category, 0)];
        let report = aggregate_keyword(Keyword::new(1, "jacket"), tokens, Vec::new());
        assert_eq!(report.status, KeywordStatus::NoData(NoDataReason::EmptyResults));
        assert!(!report.flagged());
        assert_eq!(report.token_failures.len(), 1);
    }

    #[test]
    fn tokenless_keyword_is_unconstrained() {
        let verdicts = vec![aggregate_product(&product("a"), 1, &[], Vec::new(), 0)];
        assert!(verdicts[0].passed);
        let report = aggregate_keyword(Keyword::new(1, "the"), Vec::new(), verdicts);
        assert_eq!(report.status, KeywordStatus::Unconstrained);
        assert_eq!(report.failing_count, 0);
    }

    #[test]
    fn invalid_input_keeps_raw_row() {
        let report = invalid_input(3, "\"unterminated", "unterminated quote");
        assert_eq!(report.status.as_str(), "invalid_input");
        assert_eq!(report.keyword.text, "\"unterminated");
        assert_eq!(report.keyword.row, 3);
    }
}
