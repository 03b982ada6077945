use crate::application::ports::CatalogSource;
use crate::domain::CatalogItem;
use crate::error::CatalogError;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// One record of the catalog file
///
/// `type` carries the display description. Other fields present in catalog
/// files (such as `duplicate`) are ignored.
#[derive(Debug, Clone, Deserialize)]
struct CatalogRecord {
    id: i64,
    #[serde(default)]
    name: String,
    #[serde(rename = "type", default)]
    description: String,
}

impl From<CatalogRecord> for CatalogItem {
    fn from(record: CatalogRecord) -> Self {
        CatalogItem::new(record.id, record.name, record.description)
    }
}

/// Catalog read from a JSON array of `{id, name, type}` records
#[derive(Debug, Clone)]
pub struct JsonFileCatalog {
    path: PathBuf,
}

impl JsonFileCatalog {
    pub fn new(path: impl AsRef<Path>) -> Self {
        JsonFileCatalog {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse catalog records from a JSON string, rejecting duplicate ids
    pub fn parse(json: &str) -> Result<Vec<CatalogItem>, CatalogError> {
        let records: Vec<CatalogRecord> = serde_json::from_str(json)?;

        let mut seen = HashSet::with_capacity(records.len());
        for record in &records {
            if !seen.insert(record.id) {
                return Err(CatalogError::DuplicateId(record.id));
            }
        }

        Ok(records.into_iter().map(CatalogItem::from).collect())
    }
}

impl CatalogSource for JsonFileCatalog {
    fn load(&self) -> Result<Vec<CatalogItem>, CatalogError> {
        let content = std::fs::read_to_string(&self.path).map_err(|source| CatalogError::Io {
            path: self.path.display().to_string(),
            source,
        })?;
        let items = Self::parse(&content)?;
        tracing::info!(path = %self.path.display(), items = items.len(), "Catalog loaded");
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_catalog_records() {
        let json = r#"[
            {"id": 1, "name": "A", "type": "d1", "duplicate": false},
            {"id": 2, "name": "B", "type": "d2"}
        ]"#;

        let items = JsonFileCatalog::parse(json).unwrap();
        assert_eq!(
            items,
            vec![CatalogItem::new(1, "A", "d1"), CatalogItem::new(2, "B", "d2")]
        );
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let json = r#"[{"id": 1, "name": "A", "type": "x"}, {"id": 1, "name": "B", "type": "y"}]"#;
        assert!(matches!(
            JsonFileCatalog::parse(json),
            Err(CatalogError::DuplicateId(1))
        ));
    }

    #[test]
    fn test_malformed_catalog() {
        assert!(matches!(
            JsonFileCatalog::parse("{not json"),
            Err(CatalogError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let catalog = JsonFileCatalog::new("/nonexistent/items.json");
        assert!(matches!(catalog.load(), Err(CatalogError::Io { .. })));
    }
}
