pub mod loader;
pub mod types;

pub use loader::{InputFormat, LoaderError, PriceLoader, DEFAULT_PRICE_COLUMN, DEFAULT_TIME_COLUMN};
pub use types::{parse_timestamp, PricePoint, PriceSeries};
