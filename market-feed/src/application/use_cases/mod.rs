mod consolidate_changes;

pub use consolidate_changes::ChangeConsolidator;
