// src/dataset/mod.rs
pub mod table;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use arrow::compute::concat_batches;
use arrow::record_batch::RecordBatch;
use tracing::{debug, info};

use crate::cache::RegionCache;
use crate::error::{Result, ScrapeError};
use crate::fetch::{dedup, urls::HttpIndex, zips, RemoteIndex};
use crate::process;
use crate::region::Region;
use crate::schema;

/// Default archive index of the Czech police accident exports.
pub const DEFAULT_URL: &str = "https://ehw.fit.vutbr.cz/izv/";

/// Default local data directory.
pub const DEFAULT_DIR: &str = "data";

/// Default cache file pattern.
pub const DEFAULT_CACHE_PATTERN: &str = "data_{}.parquet";

/// Owns the whole acquisition pipeline: remote index, local archive
/// directory, per-region cache, and the in-memory map of already assembled
/// regions.
///
/// One store instance assumes exclusive ownership of its directory; two
/// instances pointed at the same directory are not safe.
pub struct DatasetStore {
    index: Box<dyn RemoteIndex>,
    dir: PathBuf,
    cache: RegionCache,
    resident: HashMap<Region, RecordBatch>,
    /// Canonical local archive names, computed lazily and dropped whenever
    /// new archives arrive.
    canonical: Option<Vec<String>>,
}

impl DatasetStore {
    /// Build a store over any [`RemoteIndex`], creating `dir` if needed.
    pub fn new(
        index: Box<dyn RemoteIndex>,
        dir: impl AsRef<Path>,
        cache_pattern: &str,
    ) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|source| ScrapeError::Directory {
            path: dir.clone(),
            source,
        })?;
        let cache = RegionCache::new(&dir, cache_pattern)?;
        Ok(DatasetStore {
            index,
            dir,
            cache,
            resident: HashMap::new(),
            canonical: None,
        })
    }

    /// Convenience constructor for the production HTTP index.
    pub fn open(url: &str, dir: impl AsRef<Path>, cache_pattern: &str) -> Result<Self> {
        Self::new(Box::new(HttpIndex::new(url)?), dir, cache_pattern)
    }

    /// Column labels of every assembled dataset, in schema order.
    pub fn labels(&self) -> Vec<String> {
        schema::labels()
    }

    /// Local directory holding archives and cache blobs.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Sync local archives with the remote index, returning how many were
    /// downloaded.
    ///
    /// Any download invalidates every cache entry and resident dataset: a
    /// new archive may contain rows for any region.
    pub fn refresh(&mut self) -> Result<usize> {
        let hrefs = self.index.list_archives()?;
        let canonical = dedup::select_canonical(&hrefs)?;
        let downloaded = zips::ensure_local(self.index.as_ref(), &self.dir, &canonical)?;

        if downloaded > 0 {
            let cleared = self.cache.clear()?;
            self.resident.clear();
            self.canonical = None;
            info!(downloaded, cleared, "new archives arrived, caches invalidated");
        }
        Ok(downloaded)
    }

    fn canonical_local(&mut self) -> Result<&[String]> {
        if self.canonical.is_none() {
            let names = zips::local_archives(&self.dir)?;
            self.canonical = Some(dedup::select_canonical(&names)?);
        }
        Ok(self.canonical.as_deref().expect("just computed"))
    }

    /// Parse one region from the canonical local archives, without touching
    /// the network or the cache.
    pub fn parse_region(&mut self, region: Region) -> Result<RecordBatch> {
        let archives = self.canonical_local()?.to_vec();
        process::load_region(&self.dir, &archives, region)
    }

    fn resolve_region(&mut self, region: Region) -> Result<()> {
        if self.resident.contains_key(&region) {
            return Ok(());
        }
        let batch = match self.cache.load(region)? {
            Some(batch) => batch,
            None => {
                let batch = self.parse_region(region)?;
                self.cache.store(region, &batch)?;
                batch
            }
        };
        debug!(region = %region, rows = batch.num_rows(), "region resident");
        self.resident.insert(region, batch);
        Ok(())
    }

    /// Assemble the combined dataset for `regions` (all regions when
    /// `None`), concatenated in request order.
    ///
    /// Two calls with no new remote archives in between return
    /// value-identical batches.
    pub fn get(&mut self, regions: Option<&[Region]>) -> Result<RecordBatch> {
        self.refresh()?;
        let regions = regions.unwrap_or(&Region::ALL);

        for &region in regions {
            self.resolve_region(region)?;
        }

        let batches: Vec<&RecordBatch> = regions
            .iter()
            .map(|r| self.resident.get(r).expect("resolved above"))
            .collect();
        if batches.is_empty() {
            return Ok(RecordBatch::new_empty(schema::arrow_schema()));
        }
        let combined = concat_batches(&schema::arrow_schema(), batches)?;
        info!(
            regions = regions.len(),
            rows = combined.num_rows(),
            "assembled combined dataset"
        );
        Ok(combined)
    }
}
