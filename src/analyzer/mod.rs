// Analyzer module: token matching and verdict aggregation.

pub mod matcher;
pub mod verdict;

pub use matcher::{match_token, match_tokens};
pub use verdict::{aggregate_keyword, aggregate_product, invalid_input, no_data};
