pub mod errors;
pub mod formats;
pub mod model;
mod registry;

pub use errors::{LayoutAttempt, LoadError};
pub use formats::{parse_ring_width_table, parse_site_table};
pub use model::{ClimateIndex, RingWidthTable, Site, YEAR_COLUMN};
pub use registry::{parse_climate_index, parse_with_parsers, ClimateIndexParser};
