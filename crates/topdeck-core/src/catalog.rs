//! Card catalog.
//!
//! The catalog is supplied once at startup and never changes. Matches refer
//! to cards by [`CardId`] and share the catalog through an `Arc`, so reading
//! it needs no locking.

use std::sync::Arc;

use topdeck_proto::CatalogItem;

use crate::error::CatalogError;

const BUILTIN: &str = include_str!("../data/dogs.json");

/// Index of a card in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CardId(pub usize);

/// Index of an attribute in the catalog's attribute list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttributeId(usize);

/// Immutable, shared set of comparable cards.
#[derive(Debug, Clone)]
pub struct Catalog {
    items: Arc<[CatalogItem]>,
    attributes: Arc<[String]>,
}

impl Catalog {
    /// Build a catalog, checking that every item has the same attributes.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if there are fewer than 2 items, no attributes,
    /// duplicate attribute names, or items whose attribute names (in order)
    /// differ from the first item's.
    pub fn new(items: Vec<CatalogItem>) -> Result<Self, CatalogError> {
        if items.len() < 2 {
            return Err(CatalogError::TooFewItems(items.len()));
        }

        let expected: Vec<String> = items[0].attribute_names().map(str::to_owned).collect();
        if expected.is_empty() {
            return Err(CatalogError::NoAttributes);
        }
        for (i, name) in expected.iter().enumerate() {
            if expected[..i].contains(name) {
                return Err(CatalogError::DuplicateAttribute(name.clone()));
            }
        }

        for item in &items[1..] {
            if !item.attribute_names().eq(expected.iter().map(String::as_str)) {
                return Err(CatalogError::InconsistentAttributes {
                    item: item.name.clone(),
                    expected,
                    found: item.attribute_names().map(str::to_owned).collect(),
                });
            }
        }

        Ok(Self { items: items.into(), attributes: expected.into() })
    }

    /// Parse a JSON array of items.
    pub fn from_json(text: &str) -> Result<Self, CatalogError> {
        let items: Vec<CatalogItem> = serde_json::from_str(text)?;
        Self::new(items)
    }

    /// The built-in roster of 30 dogs.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN)
    }

    /// Number of cards.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Always false for a validated catalog.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// All card ids in catalog order.
    pub fn card_ids(&self) -> impl Iterator<Item = CardId> + use<> {
        (0..self.items.len()).map(CardId)
    }

    /// Card by id.
    pub fn get(&self, id: CardId) -> Option<&CatalogItem> {
        self.items.get(id.0)
    }

    /// Attribute names in presentation order.
    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    /// Resolve an attribute name.
    pub fn attribute(&self, name: &str) -> Option<AttributeId> {
        self.attributes.iter().position(|a| a == name).map(AttributeId)
    }

    /// Attribute name by id.
    pub fn attribute_name(&self, attribute: AttributeId) -> Option<&str> {
        self.attributes.get(attribute.0).map(String::as_str)
    }

    /// Value of `attribute` on card `id`.
    ///
    /// Validation guarantees every item lists attributes in the same order,
    /// so the attribute index addresses the item's list directly.
    pub fn value(&self, id: CardId, attribute: AttributeId) -> Option<i64> {
        self.get(id).and_then(|item| item.attributes.get(attribute.0)).map(|a| a.value)
    }
}
