//! HTML parsing for plugins, backed by `scraper`.
//!
//! Elements are plain snapshots. Each carries its position in document
//! order so that a nested query can be scoped to it later without keeping
//! the parsed tree alive.

use std::collections::{BTreeMap, HashMap};

use scraper::{ElementRef, Html, Selector};
use serde::Serialize;

use super::ApiError;

/// A matched element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Element {
    /// Position of the element in document order.
    pub index: usize,
    /// Tag name, lowercase.
    pub name: String,
    /// Concatenated text of the element and its descendants.
    pub text: String,
    pub html: String,
    pub inner_html: String,
    pub attrs: BTreeMap<String, String>,
}

/// A parsed HTML document.
pub struct Document {
    html: Html,
}

impl Document {
    pub fn parse(html: &str) -> Self {
        Self {
            html: Html::parse_document(html),
        }
    }

    /// All elements matching `css`, in document order.
    pub fn select(&self, css: &str) -> Result<Vec<Element>, ApiError> {
        let selector = parse_selector(css)?;
        Ok(self.snapshot(self.html.select(&selector)))
    }

    /// Descendants of the element at `scope` matching `css`.
    ///
    /// An out-of-range scope matches nothing.
    pub fn select_within(&self, scope: usize, css: &str) -> Result<Vec<Element>, ApiError> {
        let selector = parse_selector(css)?;
        let Some(scope_ref) = self.elements().nth(scope) else {
            return Ok(Vec::new());
        };
        let scope_id = scope_ref.id();
        Ok(self.snapshot(
            scope_ref
                .select(&selector)
                .filter(|element| element.id() != scope_id),
        ))
    }

    /// Text content of the whole document.
    pub fn text(&self) -> String {
        self.html.root_element().text().collect()
    }

    fn elements(&self) -> impl Iterator<Item = ElementRef<'_>> {
        self.html
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
    }

    fn snapshot<'a>(&'a self, matches: impl Iterator<Item = ElementRef<'a>>) -> Vec<Element> {
        let order: HashMap<_, usize> = self
            .elements()
            .enumerate()
            .map(|(index, element)| (element.id(), index))
            .collect();

        matches
            .map(|element| Element {
                index: order.get(&element.id()).copied().unwrap_or_default(),
                name: element.value().name().to_string(),
                text: element.text().collect(),
                html: element.html(),
                inner_html: element.inner_html(),
                attrs: element
                    .value()
                    .attrs()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            })
            .collect()
    }
}

fn parse_selector(css: &str) -> Result<Selector, ApiError> {
    Selector::parse(css).map_err(|_| ApiError::Selector(css.to_string()))
}
