mod annual_index;
mod common;
mod monthly_index;
mod ring_width;
mod sites;

pub use annual_index::AnnualIndexParser;
pub use monthly_index::MonthlyIndexParser;
pub use ring_width::parse_ring_width_table;
pub use sites::parse_site_table;
