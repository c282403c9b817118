// src/fetch/mod.rs
pub mod dedup;
pub mod urls;
pub mod zips;

use std::io::Write;

use crate::error::Result;

/// Remote source of year archives.
///
/// Production uses [`urls::HttpIndex`]; tests drive the pipeline with an
/// in-memory stub.
pub trait RemoteIndex {
    /// Hrefs of every downloadable year archive, in index order.
    fn list_archives(&self) -> Result<Vec<String>>;

    /// Stream the archive at `href` into `dest`, returning the byte count.
    fn fetch(&self, href: &str, dest: &mut dyn Write) -> Result<u64>;
}
