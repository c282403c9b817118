// src/lib.rs
//! Downloads, deduplicates, parses, caches and assembles the Czech
//! traffic-accident dataset published as per-year zip archives behind an
//! HTML index page.
//!
//! The pipeline, leaves first: [`fetch::urls`] lists the remote archives,
//! [`fetch::dedup`] picks one canonical archive per year, [`fetch::zips`]
//! downloads what is missing, [`process`] parses the per-region CSV members
//! into Arrow batches, [`cache`] persists them as Parquet, and
//! [`dataset::DatasetStore`] ties it all together.

pub mod cache;
pub mod dataset;
pub mod error;
pub mod fetch;
pub mod process;
pub mod region;
pub mod schema;
pub mod stats;

pub use dataset::DatasetStore;
pub use error::{Result, ScrapeError};
pub use region::Region;
