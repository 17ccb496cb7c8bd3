//! Card payload types.

use serde::{Deserialize, Serialize};

/// A single named numeric attribute on a card.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Attribute {
    /// Attribute name, e.g. "Cuteness"
    pub name: String,
    /// Attribute value compared during a round
    pub value: i64,
}

impl Attribute {
    /// Create an attribute.
    pub fn new(name: impl Into<String>, value: i64) -> Self {
        Self { name: name.into(), value }
    }
}

/// A comparable card.
///
/// Attributes are ordered. The order only matters for presentation; lookups
/// are by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Card name
    pub name: String,
    /// Display label shown under the name
    pub country: String,
    /// Ordered attribute list
    pub attributes: Vec<Attribute>,
}

impl CatalogItem {
    /// Create a card.
    pub fn new(
        name: impl Into<String>,
        country: impl Into<String>,
        attributes: Vec<Attribute>,
    ) -> Self {
        Self { name: name.into(), country: country.into(), attributes }
    }

    /// Value of the named attribute, if the card has it.
    pub fn value(&self, attribute: &str) -> Option<i64> {
        self.attributes.iter().find(|a| a.name == attribute).map(|a| a.value)
    }

    /// Attribute names in presentation order.
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|a| a.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pug() -> CatalogItem {
        CatalogItem::new(
            "Pug",
            "China",
            vec![Attribute::new("Size", 1), Attribute::new("Cuteness", 27)],
        )
    }

    #[test]
    fn value_looks_up_by_name() {
        let card = pug();
        assert_eq!(card.value("Cuteness"), Some(27));
        assert_eq!(card.value("Size"), Some(1));
        assert_eq!(card.value("Speed"), None);
    }

    #[test]
    fn attribute_order_is_preserved_on_the_wire() {
        let json = serde_json::to_string(&pug()).unwrap();
        let size_at = json.find("Size").unwrap();
        let cuteness_at = json.find("Cuteness").unwrap();
        assert!(size_at < cuteness_at);
    }
}
