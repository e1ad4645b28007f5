//! Keyword tokenizer.
//!
//! `men's blue running shoes` becomes `men's[gender]`, `blue[color]` and
//! `running shoes[category]`. Pure: the output depends only on the keyword
//! text and the lexicon.

use crate::lexicon::Lexicon;
use crate::model::{Keyword, Token};

struct Unit {
    text: String,
    phrase: bool,
}

/// Splits a keyword into classified tokens, in keyword order.
pub fn tokenize(keyword: &Keyword, lexicon: &Lexicon) -> Vec<Token> {
    let words = lexicon.fold(&keyword.text);

    // Phrases first, longest match wins; stop words only drop as single words.
    let mut units = Vec::with_capacity(words.len());
    let mut i = 0;
    while i < words.len() {
        if let Some(len) = lexicon.phrase_at(&words[i..]) {
            units.push(Unit {
                text: words[i..i + len].join(" "),
                phrase: true,
            });
            i += len;
            continue;
        }
        if !lexicon.is_stop_word(&words[i]) {
            units.push(Unit {
                text: words[i].clone(),
                phrase: false,
            });
        }
        i += 1;
    }

    let mut tokens: Vec<Token> = Vec::with_capacity(units.len());
    let mut forced = None;
    for (idx, unit) in units.iter().enumerate() {
        let has_next = idx + 1 < units.len();
        if !unit.phrase && has_next {
            if let Some(class) = lexicon.marker(&unit.text) {
                forced = Some(class);
                continue;
            }
        }
        let class = forced.take().unwrap_or_else(|| lexicon.classify(&unit.text));
        tokens.push(Token {
            synonyms: lexicon.synonyms_of(&unit.text),
            text: unit.text.clone(),
            class,
            keyword_row: keyword.row,
            position: tokens.len(),
        });
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchConfig;
    use crate::model::TokenClass;

    fn lexicon() -> Lexicon {
        let mut cfg = MatchConfig::default();
        cfg.vocabularies.insert(
            TokenClass::Category,
            vec![
                "running shoes".into(),
                "shoes".into(),
                "sneakers".into(),
                "jacket".into(),
            ],
        );
        cfg.phrases.push("made in usa".into());
        Lexicon::compile(&cfg).unwrap()
    }

    fn labels(tokens: &[Token]) -> Vec<String> {
        tokens.iter().map(Token::label).collect()
    }

    #[test]
    fn classifies_gender_color_and_category_phrase() {
        let tokens = tokenize(&Keyword::new(1, "men's blue running shoes"), &lexicon());
        assert_eq!(
            labels(&tokens),
            vec!["men's[gender]", "blue[color]", "running shoes[category]"]
        );
        assert_eq!(tokens[0].synonyms, vec!["mens".to_string(), "men".to_string()]);
        assert!(tokens.iter().all(|t| t.keyword_row == 1));
        assert_eq!(
            tokens.iter().map(|t| t.position).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn stop_words_removed_but_kept_inside_phrases() {
        let tokens = tokenize(&Keyword::new(1, "Jacket for the trip, made in USA"), &lexicon());
        assert_eq!(
            labels(&tokens),
            vec!["jacket[category]", "trip[free_text]", "made in usa[free_text]"]
        );
    }

    #[test]
    fn multi_word_synonym_is_one_token() {
        let mut cfg = MatchConfig::default();
        cfg.synonyms.insert("navy".into(), vec!["dark blue".into()]);
        let lex = Lexicon::compile(&cfg).unwrap();

        let tokens = tokenize(&Keyword::new(1, "Dark Blue hoodie"), &lex);
        assert_eq!(labels(&tokens), vec!["dark blue[color]", "hoodie[free_text]"]);
        assert_eq!(tokens[0].synonyms, vec!["navy".to_string()]);

        let tokens = tokenize(&Keyword::new(1, "navy hoodie"), &lex);
        assert_eq!(tokens[0].synonyms, vec!["dark blue".to_string()]);
    }

    #[test]
    fn case_sensitive_lexicon_needs_exact_casing() {
        let mut cfg = MatchConfig::default();
        cfg.case_sensitive = true;
        let lex = Lexicon::compile(&cfg).unwrap();

        let tokens = tokenize(&Keyword::new(1, "Blue blue jacket"), &lex);
        assert_eq!(
            labels(&tokens),
            vec!["Blue[free_text]", "blue[color]", "jacket[free_text]"]
        );
    }

    #[test]
    fn size_marker_classifies_next_word() {
        let tokens = tokenize(&Keyword::new(4, "size 10 sneakers"), &lexicon());
        assert_eq!(labels(&tokens), vec!["10[size]", "sneakers[category]"]);
    }

    #[test]
    fn trailing_marker_is_an_ordinary_word() {
        let tokens = tokenize(&Keyword::new(1, "sneakers size"), &lexicon());
        assert_eq!(labels(&tokens), vec!["sneakers[category]", "size[free_text]"]);
    }

    #[test]
    fn empty_keyword_has_no_tokens() {
        assert!(tokenize(&Keyword::new(1, ""), &lexicon()).is_empty());
        assert!(tokenize(&Keyword::new(1, "  ,  "), &lexicon()).is_empty());
        assert!(tokenize(&Keyword::new(1, "the for a"), &lexicon()).is_empty());
    }

    #[test]
    fn numerals_survive_tokenization() {
        let tokens = tokenize(&Keyword::new(1, "32GB usb-c 10.5"), &lexicon());
        assert_eq!(
            tokens.iter().map(|t| t.text.as_str()).collect::<Vec<_>>(),
            vec!["32gb", "usb", "c", "10.5"]
        );
    }

    #[test]
    fn tokenize_is_deterministic_and_never_grows() {
        let lex = lexicon();
        for text in [
            "men's blue running shoes",
            "waterproof jacket",
            "size 10 sneakers",
            "the best made in usa running shoes for men",
            "Crème brûlée mug",
        ] {
            let keyword = Keyword::new(1, text);
            let first = tokenize(&keyword, &lex);
            assert_eq!(first, tokenize(&keyword, &lex));
            assert!(first.len() <= lex.fold(text).len());
        }
    }
}
