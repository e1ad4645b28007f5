pub mod analyzer;
pub mod config;
pub mod csv;
pub mod export;
pub mod input;
pub mod lexicon;
pub mod model;
pub mod normalizer;
pub mod parser;
pub mod pipeline;
pub mod report;
pub mod runner;
pub mod scraper;
pub mod storage;
pub mod tokenizer;
pub mod utils;
