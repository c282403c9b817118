// src/cache.rs
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use arrow::compute::concat_batches;
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use regex::Regex;
use tracing::debug;

use crate::error::{Result, ScrapeError};
use crate::region::Region;
use crate::schema;

/// On-disk store of parsed per-region datasets, one compressed Parquet file
/// per region.
///
/// The cache only maps regions to blobs; it performs no staleness checks.
/// Deciding when entries are stale (new remote archives) is the dataset
/// store's job, which calls [`RegionCache::clear`].
pub struct RegionCache {
    dir: PathBuf,
    pattern: String,
    file_re: Regex,
}

impl RegionCache {
    /// `pattern` names the per-region file with a single `{}` placeholder,
    /// e.g. `data_{}.parquet`.
    pub fn new(dir: &Path, pattern: &str) -> Result<Self> {
        if pattern.matches("{}").count() != 1 {
            return Err(ScrapeError::InvalidArgument(format!(
                "cache pattern must contain exactly one {{}} placeholder: {pattern:?}"
            )));
        }
        if pattern.contains('/') || pattern.contains('\\') {
            return Err(ScrapeError::InvalidArgument(format!(
                "cache pattern must not contain path separators: {pattern:?}"
            )));
        }
        if !pattern.ends_with(".parquet") {
            return Err(ScrapeError::InvalidArgument(format!(
                "cache pattern must end with .parquet: {pattern:?}"
            )));
        }

        let escaped = regex::escape(pattern).replacen(r"\{\}", r"(\w{3})", 1);
        let file_re = Regex::new(&format!("^{escaped}$")).expect("escaped pattern is valid");

        Ok(RegionCache {
            dir: dir.to_path_buf(),
            pattern: pattern.to_string(),
            file_re,
        })
    }

    fn path_for(&self, region: Region) -> PathBuf {
        self.dir.join(self.pattern.replacen("{}", region.code(), 1))
    }

    /// Load the cached dataset for `region`, or `None` if no entry exists.
    pub fn load(&self, region: Region) -> Result<Option<RecordBatch>> {
        let path = self.path_for(region);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
        let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
        let batch = concat_batches(&schema::arrow_schema(), &batches)?;
        debug!(region = %region, rows = batch.num_rows(), "cache hit");
        Ok(Some(batch))
    }

    /// Persist the dataset for `region`, replacing any previous entry.
    pub fn store(&self, region: Region, batch: &RecordBatch) -> Result<()> {
        let path = self.path_for(region);
        let tmp = path.with_extension("parquet.tmp");

        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();
        let file = File::create(&tmp)?;
        let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
        writer.write(batch)?;
        writer.close()?;
        fs::rename(&tmp, &path)?;

        debug!(region = %region, rows = batch.num_rows(), path = %path.display(), "cache stored");
        Ok(())
    }

    /// Regions with an entry on disk, with their blob paths.
    pub fn cached_regions(&self) -> Result<Vec<(Region, PathBuf)>> {
        let mut found = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Some(caps) = self.file_re.captures(&name) {
                if let Ok(region) = caps[1].parse::<Region>() {
                    found.push((region, entry.path()));
                }
            }
        }
        found.sort_by_key(|(region, _)| *region);
        Ok(found)
    }

    /// Delete every cache entry, returning how many were removed.
    pub fn clear(&self) -> Result<usize> {
        let entries = self.cached_regions()?;
        let removed = entries.len();
        for (_, path) in entries {
            fs::remove_file(path)?;
        }
        if removed > 0 {
            debug!(removed, "cleared region cache");
        }
        Ok(removed)
    }
}
