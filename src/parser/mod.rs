pub mod search_parser;

pub use search_parser::{ApiParser, HtmlParser, Parser};
