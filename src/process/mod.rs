// src/process/mod.rs
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{
    ArrayRef, Date32Builder, Float64Builder, Int16Builder, Int32Builder, Int64Builder,
    Int8Builder, StringBuilder,
};
use arrow::compute::concat_batches;
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use csv::ReaderBuilder;
use tracing::{debug, instrument};
use zip::ZipArchive;

use crate::error::{Result, ScrapeError};
use crate::region::Region;
use crate::schema::{self, ColumnType, COLUMNS, CSV_COLUMNS};

/// Sentinel written for an integer field that fails to convert.
const INT_SENTINEL: i64 = -1;

/// One Arrow builder per schema column, with the conversion-failure policy
/// baked into `append`: integers fall back to `-1`, floats to `NaN`, the
/// date column to null, strings to the empty string.
enum ColumnBuilder {
    Int8(Int8Builder),
    Int16(Int16Builder),
    Int32(Int32Builder),
    Int64(Int64Builder),
    Float64(Float64Builder),
    Utf8(StringBuilder),
    Date(Date32Builder),
}

impl ColumnBuilder {
    fn with_capacity(ty: ColumnType, capacity: usize) -> Self {
        match ty {
            ColumnType::Int8 => ColumnBuilder::Int8(Int8Builder::with_capacity(capacity)),
            ColumnType::Int16 => ColumnBuilder::Int16(Int16Builder::with_capacity(capacity)),
            ColumnType::Int32 => ColumnBuilder::Int32(Int32Builder::with_capacity(capacity)),
            ColumnType::Int64 => ColumnBuilder::Int64(Int64Builder::with_capacity(capacity)),
            ColumnType::Float64 => {
                ColumnBuilder::Float64(Float64Builder::with_capacity(capacity))
            }
            ColumnType::Utf8 => ColumnBuilder::Utf8(StringBuilder::new()),
            ColumnType::Date => ColumnBuilder::Date(Date32Builder::with_capacity(capacity)),
        }
    }

    /// Append one field, substituting the column's sentinel when conversion
    /// fails. Returns whether a substitution happened.
    fn append(&mut self, field: Option<&str>) -> bool {
        match self {
            ColumnBuilder::Int8(b) => append_int(b, field, |v| i8::try_from(v).ok()),
            ColumnBuilder::Int16(b) => append_int(b, field, |v| i16::try_from(v).ok()),
            ColumnBuilder::Int32(b) => append_int(b, field, |v| i32::try_from(v).ok()),
            ColumnBuilder::Int64(b) => append_int(b, field, Some),
            ColumnBuilder::Float64(b) => {
                // decimal commas appear in the coordinate columns
                let parsed = field.and_then(|f| f.replace(',', ".").parse::<f64>().ok());
                b.append_value(parsed.unwrap_or(f64::NAN));
                parsed.is_none()
            }
            ColumnBuilder::Utf8(b) => {
                b.append_value(field.unwrap_or(""));
                field.is_none()
            }
            ColumnBuilder::Date(b) => {
                let parsed = field
                    .and_then(|f| NaiveDate::parse_from_str(f, "%Y-%m-%d").ok())
                    .map(days_since_epoch);
                b.append_option(parsed);
                parsed.is_none()
            }
        }
    }

    fn finish(self) -> ArrayRef {
        match self {
            ColumnBuilder::Int8(mut b) => Arc::new(b.finish()),
            ColumnBuilder::Int16(mut b) => Arc::new(b.finish()),
            ColumnBuilder::Int32(mut b) => Arc::new(b.finish()),
            ColumnBuilder::Int64(mut b) => Arc::new(b.finish()),
            ColumnBuilder::Float64(mut b) => Arc::new(b.finish()),
            ColumnBuilder::Utf8(mut b) => Arc::new(b.finish()),
            ColumnBuilder::Date(mut b) => Arc::new(b.finish()),
        }
    }
}

fn append_int<B, T>(builder: &mut B, field: Option<&str>, narrow: fn(i64) -> Option<T>) -> bool
where
    B: IntBuilder<T>,
{
    let parsed = field.and_then(|f| f.trim().parse::<i64>().ok()).and_then(narrow);
    match parsed {
        Some(v) => {
            builder.push(v);
            false
        }
        None => {
            builder.push_sentinel();
            true
        }
    }
}

/// Small shim so the integer widths share one sentinel-substituting path.
trait IntBuilder<T> {
    fn push(&mut self, value: T);
    fn push_sentinel(&mut self);
}

macro_rules! impl_int_builder {
    ($builder:ty, $ty:ty) => {
        impl IntBuilder<$ty> for $builder {
            fn push(&mut self, value: $ty) {
                self.append_value(value);
            }
            fn push_sentinel(&mut self) {
                self.append_value(INT_SENTINEL as $ty);
            }
        }
    };
}

impl_int_builder!(Int8Builder, i8);
impl_int_builder!(Int16Builder, i16);
impl_int_builder!(Int32Builder, i32);
impl_int_builder!(Int64Builder, i64);

fn days_since_epoch(date: NaiveDate) -> i32 {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).expect("valid epoch date");
    (date - epoch).num_days() as i32
}

/// Parse one archive member (a `;`-separated, `"`-quoted, Windows-1250
/// encoded CSV without a header row) into a record batch, stamping `region`
/// into the trailing column of every row.
///
/// Individual fields that fail to convert are replaced by their column's
/// sentinel and never abort the parse; an empty input produces a zero-row
/// batch.
pub fn parse_member(bytes: &[u8], region: Region) -> Result<RecordBatch> {
    let (text, _, _) = encoding_rs::WINDOWS_1250.decode(bytes);

    // one pre-scan to size every builder for the final row count
    let row_estimate = text.lines().count();
    let mut builders: Vec<ColumnBuilder> = COLUMNS
        .iter()
        .map(|c| ColumnBuilder::with_capacity(c.ty, row_estimate))
        .collect();

    let mut reader = ReaderBuilder::new()
        .delimiter(b';')
        .quote(b'"')
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows = 0usize;
    let mut substituted = 0usize;
    for record in reader.records() {
        let record = record?;
        for (i, builder) in builders.iter_mut().take(CSV_COLUMNS).enumerate() {
            if builder.append(record.get(i)) {
                substituted += 1;
            }
        }
        // trailing synthetic column
        builders
            .last_mut()
            .expect("schema has columns")
            .append(Some(region.code()));
        rows += 1;
    }

    if substituted > 0 {
        debug!(region = %region, rows, substituted, "sentinel substitutions during parse");
    }

    let arrays: Vec<ArrayRef> = builders.into_iter().map(ColumnBuilder::finish).collect();
    Ok(RecordBatch::try_new(schema::arrow_schema(), arrays)?)
}

/// Parse one region out of every canonical archive in `dir`, concatenating
/// the per-archive batches in archive order.
#[instrument(level = "info", skip(dir, archives), fields(region = %region, archives = archives.len()))]
pub fn load_region<S: AsRef<str>>(
    dir: &Path,
    archives: &[S],
    region: Region,
) -> Result<RecordBatch> {
    let mut batches = Vec::with_capacity(archives.len());
    for name in archives {
        let path = dir.join(name.as_ref());
        let file = File::open(&path)?;
        let archive_err = |source| ScrapeError::Archive {
            path: path.clone(),
            source,
        };
        let mut archive = ZipArchive::new(file).map_err(archive_err)?;
        let mut member = archive.by_name(region.member_file()).map_err(archive_err)?;
        let mut bytes = Vec::with_capacity(member.size() as usize);
        member.read_to_end(&mut bytes)?;

        let batch = parse_member(&bytes, region)?;
        debug!(archive = %path.display(), rows = batch.num_rows(), "parsed member");
        batches.push(batch);
    }

    if batches.is_empty() {
        return Ok(RecordBatch::new_empty(schema::arrow_schema()));
    }
    Ok(concat_batches(&schema::arrow_schema(), &batches)?)
}
