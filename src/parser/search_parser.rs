// Search-result parsing: configurable HTML listings and JSON search APIs
use crate::config::HtmlBackend;
use crate::model::{ParserError, Product};
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;

pub trait Parser {
    fn parse(&self, body: &str) -> Result<Vec<Product>, ParserError>;
}

fn selector(css: &str) -> Result<Selector, ParserError> {
    Selector::parse(css)
        .map_err(|e| ParserError::HtmlParseError(format!("bad selector '{}': {}", css, e)))
}

/// Where a field's value is read from inside a result item.
struct FieldSelector {
    name: String,
    selector: Selector,
    /// `a.title@href` reads the attribute instead of the text.
    attr: Option<String>,
}

impl FieldSelector {
    fn parse(name: &str, spec: &str) -> Result<Self, ParserError> {
        let (css, attr) = match spec.rsplit_once('@') {
            Some((css, attr))
                if !attr.is_empty()
                    && attr.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') =>
            {
                (css, Some(attr.to_string()))
            }
            _ => (spec, None),
        };
        Ok(Self {
            name: name.to_string(),
            selector: selector(css)?,
            attr,
        })
    }

    fn read(&self, item: ElementRef<'_>) -> String {
        let Some(node) = item.select(&self.selector).next() else {
            return String::new();
        };
        match &self.attr {
            Some(attr) => node.value().attr(attr).unwrap_or("").trim().to_string(),
            None => collapse_whitespace(&node.text().collect::<String>()),
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parses a search results page with the selectors from the config.
pub struct HtmlParser {
    item: Selector,
    id: Option<Selector>,
    id_attr: String,
    fields: Vec<FieldSelector>,
}

impl HtmlParser {
    pub fn from_backend(cfg: &HtmlBackend) -> Result<Self, ParserError> {
        let fields = cfg
            .field_selectors
            .iter()
            .map(|(name, spec)| FieldSelector::parse(name, spec))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            item: selector(&cfg.item_selector)?,
            id: cfg.id_selector.as_deref().map(selector).transpose()?,
            id_attr: cfg.id_attr.clone(),
            fields,
        })
    }

    /// Like [`Parser::parse`], numbering id-less items from `first_position`.
    pub fn parse_from(&self, html: &str, first_position: usize) -> Vec<Product> {
        let document = Html::parse_document(html);
        let mut products = Vec::new();

        for (idx, item) in document.select(&self.item).enumerate() {
            let mut product = Product::default();
            for field in &self.fields {
                product.set_field(&field.name, field.read(item));
            }

            let id_node = match &self.id {
                Some(sel) => item.select(sel).next(),
                None => Some(item),
            };
            product.id = id_node
                .and_then(|node| node.value().attr(&self.id_attr))
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .or_else(|| {
                    ["url", "link"]
                        .iter()
                        .map(|name| product.field(name))
                        .find(|value| !value.is_empty())
                        .map(str::to_string)
                })
                .unwrap_or_else(|| format!("item-{}", first_position + idx));

            products.push(product);
        }

        products
    }
}

impl Parser for HtmlParser {
    fn parse(&self, html: &str) -> Result<Vec<Product>, ParserError> {
        Ok(self.parse_from(html, 1))
    }
}

/// Reads the `products` array of a JSON search response.
pub struct ApiParser {
    id_field: String,
}

impl ApiParser {
    pub fn new(id_field: &str) -> Self {
        Self {
            id_field: id_field.to_string(),
        }
    }
}

impl Parser for ApiParser {
    fn parse(&self, body: &str) -> Result<Vec<Product>, ParserError> {
        let value: Value =
            serde_json::from_str(body).map_err(|e| ParserError::JsonParseError(e.to_string()))?;
        let items = value
            .get("products")
            .and_then(Value::as_array)
            .ok_or_else(|| ParserError::MissingField("products".into()))?;

        items
            .iter()
            .enumerate()
            .map(|(idx, item)| {
                if !item.is_object() {
                    return Err(ParserError::JsonParseError(format!(
                        "product #{} is not an object",
                        idx + 1
                    )));
                }
                let mut product = Product::default();
                flatten_into(&mut product, "", item);
                let id = product.field(&self.id_field).trim().to_string();
                product.id = if id.is_empty() {
                    format!("item-{}", idx + 1)
                } else {
                    id
                };
                Ok(product)
            })
            .collect()
    }
}

/// Nested keys become `outer.inner`; arrays collapse to their leaf text.
fn flatten_into(product: &mut Product, prefix: &str, value: &Value) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let key = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten_into(product, &key, child);
            }
        }
        other => product.set_field(prefix, leaf_text(other)),
    }
}

fn leaf_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => join_leaves(items.iter()),
        Value::Object(map) => join_leaves(map.values()),
    }
}

fn join_leaves<'a>(values: impl Iterator<Item = &'a Value>) -> String {
    values
        .map(leaf_text)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
