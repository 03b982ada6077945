use crate::domain::value_objects::{InstrumentId, Timestamp};
use serde::{Deserialize, Serialize};

/// Static catalog entry loaded at startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: InstrumentId,
    pub name: String,
    pub description: String,
}

impl CatalogItem {
    pub fn new(id: InstrumentId, name: impl Into<String>, description: impl Into<String>) -> Self {
        CatalogItem {
            id,
            name: name.into(),
            description: description.into(),
        }
    }

    /// Display label sent in the connection handshake: `<name>-<description>`
    pub fn label(&self) -> String {
        format!("{}-{}", self.name, self.description)
    }
}

/// Top-of-book quote fields
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub best_bid_price: u32,
    pub best_bid_quantity: u32,
    pub best_offer_price: u32,
    pub best_offer_quantity: u32,
}

impl Quote {
    pub fn new(
        best_bid_price: u32,
        best_bid_quantity: u32,
        best_offer_price: u32,
        best_offer_quantity: u32,
    ) -> Self {
        Quote {
            best_bid_price,
            best_bid_quantity,
            best_offer_price,
            best_offer_quantity,
        }
    }
}

/// A tradable instrument with its live quote
///
/// Instruments are value types: the store hands out copies, never references
/// into shared state. Serializes to the wire record
/// `{id, name, description, updated, bestBidPrice, ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    pub id: InstrumentId,
    pub name: String,
    pub description: String,
    pub updated: Timestamp,
    #[serde(flatten)]
    pub quote: Quote,
}

impl Instrument {
    pub fn new(item: &CatalogItem, quote: Quote, updated: Timestamp) -> Self {
        Instrument {
            id: item.id,
            name: item.name.clone(),
            description: item.description.clone(),
            updated,
            quote,
        }
    }

    /// Same instrument with a new quote and timestamp
    pub fn requoted(&self, quote: Quote, updated: Timestamp) -> Self {
        Instrument {
            quote,
            updated,
            ..self.clone()
        }
    }

    /// Whether any of the four quote fields differs. Timestamps are ignored.
    pub fn quote_differs(&self, other: &Instrument) -> bool {
        self.quote != other.quote
    }

    pub fn label(&self) -> String {
        format!("{}-{}", self.name, self.description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn sample() -> Instrument {
        let item = CatalogItem::new(7, "Apple", "Fruit");
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Instrument::new(&item, Quote::new(10, 20, 30, 40), at)
    }

    #[test]
    fn test_label_joins_name_and_description() {
        assert_eq!(CatalogItem::new(1, "A", "d1").label(), "A-d1");
        assert_eq!(sample().label(), "Apple-Fruit");
    }

    #[test]
    fn test_timestamp_only_change_is_not_a_quote_change() {
        let original = sample();
        let later = original.requoted(original.quote, original.updated + Duration::seconds(5));
        assert!(!original.quote_differs(&later));

        let repriced = original.requoted(Quote::new(11, 20, 30, 40), original.updated);
        assert!(original.quote_differs(&repriced));
    }

    #[test]
    fn test_wire_record_field_names() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["name"], "Apple");
        assert_eq!(json["description"], "Fruit");
        assert_eq!(json["bestBidPrice"], 10);
        assert_eq!(json["bestBidQuantity"], 20);
        assert_eq!(json["bestOfferPrice"], 30);
        assert_eq!(json["bestOfferQuantity"], 40);
        assert!(json["updated"].as_str().unwrap().starts_with("2024-01-01T00:00:00"));
    }
}
