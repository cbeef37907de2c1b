//! Reverse-engineers the implied competitor market price (PVP) for pharmacy
//! products from two partial exports — revenue per product and unit volume
//! per product — each carrying a "this pharmacy" column and a "regional
//! average over N pharmacies" column.
//!
//! Pipeline: [`loader`] normalizes the two tables by fixed column position,
//! [`engine`] merges them on product code and reconstructs the competitor
//! aggregate (`average * N - own`), deriving unit prices, market share,
//! pricing gaps and opportunity values. [`cache`] memoizes runs over
//! identical inputs.

pub mod cache;
pub mod engine;
pub mod error;
pub mod loader;
pub mod output;
pub mod types;
pub mod util;
