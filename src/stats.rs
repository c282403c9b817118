// src/stats.rs
use std::collections::BTreeMap;
use std::fmt::Write as _;

use arrow::array::{Array, Date32Array, StringArray};
use arrow::record_batch::RecordBatch;
use chrono::{Datelike, Duration, NaiveDate};
use tracing::warn;

use crate::error::{Result, ScrapeError};
use crate::region::Region;
use crate::schema::{DATE_COLUMN, REGION_COLUMN};

/// Default lower bound on reported years.
pub const DEFAULT_SINCE_YEAR: i32 = 2016;

/// Accident counts per year and region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearlyCounts {
    /// Rows keyed by year; each year maps region to its accident count.
    pub rows: BTreeMap<i32, BTreeMap<Region, u64>>,
}

/// Count rows per (year, region) from the accident-date and region columns,
/// keeping years >= `since_year`. Rows with a null date are skipped.
pub fn yearly_region_counts(batch: &RecordBatch, since_year: i32) -> Result<YearlyCounts> {
    let dates = typed_column::<Date32Array>(batch, DATE_COLUMN)?;
    let regions = typed_column::<StringArray>(batch, REGION_COLUMN)?;

    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).expect("valid epoch date");
    let mut rows: BTreeMap<i32, BTreeMap<Region, u64>> = BTreeMap::new();
    let mut skipped = 0usize;

    for i in 0..batch.num_rows() {
        if dates.is_null(i) {
            skipped += 1;
            continue;
        }
        let days = dates.value(i);
        let Some(date) = epoch.checked_add_signed(Duration::days(days as i64)) else {
            skipped += 1;
            continue;
        };
        let year = date.year();
        if year < since_year {
            continue;
        }
        let Ok(region) = regions.value(i).parse::<Region>() else {
            skipped += 1;
            continue;
        };
        *rows.entry(year).or_default().entry(region).or_insert(0) += 1;
    }

    if skipped > 0 {
        warn!(skipped, "rows without a usable date or region left out of statistics");
    }
    Ok(YearlyCounts { rows })
}

fn typed_column<'a, T: 'static>(batch: &'a RecordBatch, label: &str) -> Result<&'a T> {
    batch
        .column_by_name(label)
        .and_then(|c| c.as_any().downcast_ref::<T>())
        .ok_or_else(|| ScrapeError::InvalidArgument(format!("dataset has no {label} column")))
}

/// Aligned text table: one row per year, one column per region.
pub fn render_text(counts: &YearlyCounts) -> String {
    let mut out = String::new();
    write!(out, "{:>4}", "year").expect("writing to string");
    for region in Region::ALL {
        write!(out, " {:>7}", region.code()).expect("writing to string");
    }
    out.push('\n');

    for (year, per_region) in &counts.rows {
        write!(out, "{year:>4}").expect("writing to string");
        for region in Region::ALL {
            let count = per_region.get(&region).copied().unwrap_or(0);
            write!(out, " {count:>7}").expect("writing to string");
        }
        out.push('\n');
    }
    out
}

/// Booktabs LaTeX `tabular`, years as rows, regions as columns.
pub fn render_latex(counts: &YearlyCounts) -> String {
    let mut out = String::new();
    let columns = "r".repeat(Region::ALL.len());
    writeln!(out, "\\begin{{tabular}}{{l{columns}}}").expect("writing to string");
    writeln!(out, "\\toprule").expect("writing to string");

    let header: Vec<&str> = Region::ALL.iter().map(|r| r.code()).collect();
    writeln!(out, "Year & {} \\\\", header.join(" & ")).expect("writing to string");
    writeln!(out, "\\midrule").expect("writing to string");

    for (year, per_region) in &counts.rows {
        let cells: Vec<String> = Region::ALL
            .iter()
            .map(|r| per_region.get(r).copied().unwrap_or(0).to_string())
            .collect();
        writeln!(out, "{year} & {} \\\\", cells.join(" & ")).expect("writing to string");
    }

    writeln!(out, "\\bottomrule").expect("writing to string");
    writeln!(out, "\\end{{tabular}}").expect("writing to string");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::parse_member;
    use crate::schema::CSV_COLUMNS;
    use arrow::compute::concat_batches;

    fn batch_with_dates(region: Region, dates: &[&str]) -> RecordBatch {
        let rows: Vec<String> = dates
            .iter()
            .map(|d| {
                let mut fields = vec!["0".to_string(); CSV_COLUMNS];
                fields[3] = d.to_string();
                fields.join(";")
            })
            .collect();
        parse_member(rows.join("\n").as_bytes(), region).unwrap()
    }

    fn sample_counts() -> YearlyCounts {
        let pha = batch_with_dates(
            Region::PHA,
            &["2019-01-01", "2019-05-05", "2020-02-02", "bad-date"],
        );
        let stc = batch_with_dates(Region::STC, &["2019-12-31", "2015-01-01"]);
        let combined =
            concat_batches(&crate::schema::arrow_schema(), &[pha, stc]).unwrap();
        yearly_region_counts(&combined, 2016).unwrap()
    }

    #[test]
    fn counts_by_year_and_region() {
        let counts = sample_counts();
        assert_eq!(counts.rows.len(), 2);
        assert_eq!(counts.rows[&2019][&Region::PHA], 2);
        assert_eq!(counts.rows[&2019][&Region::STC], 1);
        assert_eq!(counts.rows[&2020][&Region::PHA], 1);
        // 2015 is below the cutoff, the bad date is skipped
        assert!(!counts.rows.contains_key(&2015));
    }

    #[test]
    fn text_table_lists_each_year_once() {
        let rendered = render_text(&sample_counts());
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("PHA"));
        assert!(lines[1].starts_with("2019"));
        assert!(lines[2].starts_with("2020"));
    }

    #[test]
    fn latex_table_is_booktabs_shaped() {
        let rendered = render_latex(&sample_counts());
        assert!(rendered.starts_with("\\begin{tabular}{l"));
        assert!(rendered.contains("\\toprule"));
        assert!(rendered.contains("\\midrule"));
        assert!(rendered.contains("2019 & 2 &"));
        assert!(rendered.ends_with("\\end{tabular}\n"));
    }
}
