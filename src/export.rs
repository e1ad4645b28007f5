use crate::model::{Keyword, Product};
use crate::utils::to_kebab_case;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

fn or_na(value: &str) -> &str {
    if value.trim().is_empty() { "N/A" } else { value }
}

/// Plain-text digest of one keyword's results, meant to be pasted into an
/// LLM prompt for a second opinion on relevance.
pub fn llm_digest(keyword: &str, products: &[Product]) -> String {
    let blocks: Vec<String> = products
        .iter()
        .enumerate()
        .map(|(i, product)| {
            format!(
                "prod {}:\ntitle: {}\ndescription: {}",
                i + 1,
                or_na(product.title()),
                or_na(product.field("description"))
            )
        })
        .collect();
    format!("search term: {}\n\n{}", keyword, blocks.join("\n\n"))
}

/// Writes the digest to `<dir>/<row>-<keyword>.txt` and returns the path.
pub fn write_llm_digest(
    dir: &Path,
    keyword: &Keyword,
    products: &[Product],
) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let stem = to_kebab_case(&keyword.text);
    let name = if stem.is_empty() {
        format!("{:03}.txt", keyword.row)
    } else {
        format!("{:03}-{}.txt", keyword.row, stem)
    };
    let path = dir.join(name);
    fs::write(&path, llm_digest(&keyword.text, products))?;
    Ok(path)
}
