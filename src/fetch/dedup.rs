// src/fetch/dedup.rs
use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Result, ScrapeError};

static YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4})\.zip$").expect("valid year regex"));

/// A monthly cut of a year, e.g. `datagis-11-2021.zip`.
static MONTH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{2})-(\d{4})\.zip$").expect("valid month regex"));

/// A whole-year archive: the year is not preceded by a two-digit month and a
/// dash, e.g. `2020.zip` or `datagis-2016.zip`.
static WHOLE_YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[^\d-])-?(\d{4})\.zip$").expect("valid whole-year regex"));

/// Reduce a set of archive names to one canonical archive per year.
///
/// A whole-year archive always wins its year outright; otherwise the monthly
/// cut with the numerically highest month wins, ties keeping the first-seen
/// name. Names without a recognizable year are ignored. A year whose names
/// match neither pattern is a defined failure, not a silent skip.
///
/// The result is ordered by ascending year, so it is deterministic for a
/// given input set.
pub fn select_canonical<S: AsRef<str>>(names: &[S]) -> Result<Vec<String>> {
    let mut by_year: BTreeMap<u16, Vec<&str>> = BTreeMap::new();
    for name in names {
        let name = name.as_ref();
        if let Some(caps) = YEAR_RE.captures(name) {
            let year: u16 = caps[1].parse().expect("four digits fit in u16");
            by_year.entry(year).or_default().push(name);
        }
    }

    let mut canonical = Vec::with_capacity(by_year.len());
    for (year, group) in by_year {
        canonical.push(best_match(year, &group)?);
    }
    Ok(canonical)
}

fn best_match(year: u16, group: &[&str]) -> Result<String> {
    if let Some(name) = group.iter().find(|n| WHOLE_YEAR_RE.is_match(n)) {
        return Ok(name.to_string());
    }

    let mut highest_month = 0u8;
    let mut best: Option<&str> = None;
    for name in group {
        if let Some(caps) = MONTH_RE.captures(name) {
            let month: u8 = caps[1].parse().expect("two digits fit in u8");
            if month > highest_month {
                highest_month = month;
                best = Some(name);
            }
        }
    }

    best.map(str::to_string)
        .ok_or(ScrapeError::NoCanonicalArchive { year })
}
