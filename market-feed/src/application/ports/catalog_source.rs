use crate::domain::CatalogItem;
use crate::error::CatalogError;

/// Provider of the static instrument catalog, read once at startup
pub trait CatalogSource: Send + Sync {
    /// Load the catalog in slot order
    fn load(&self) -> Result<Vec<CatalogItem>, CatalogError>;
}

impl CatalogSource for Vec<CatalogItem> {
    fn load(&self) -> Result<Vec<CatalogItem>, CatalogError> {
        Ok(self.clone())
    }
}
