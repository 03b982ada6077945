mod instrument;

pub use instrument::{CatalogItem, Instrument, Quote};
