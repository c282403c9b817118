// tests/store.rs
//! End-to-end assembler tests driven by a stub remote index, no network.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::io::{Cursor, Write};

use arrow::array::{Array, Int64Array, StringArray};
use arrow::record_batch::RecordBatch;
use zip::write::{ExtendedFileOptions, FileOptions};
use zip::ZipWriter;

use nehoda::error::Result;
use nehoda::fetch::RemoteIndex;
use nehoda::schema::CSV_COLUMNS;
use nehoda::{DatasetStore, Region};

/// One accident row with the given id and date, zeros elsewhere.
fn csv_row(id: u64, date: &str) -> String {
    let mut fields = vec!["0".to_string(); CSV_COLUMNS];
    fields[0] = id.to_string();
    fields[3] = date.to_string();
    fields.join(";")
}

/// Build a year archive holding one member CSV per region.
fn year_archive(members: &[(Region, &[String])]) -> Vec<u8> {
    let mut buf = Vec::new();
    {
        let mut zip = ZipWriter::new(Cursor::new(&mut buf));
        for (region, rows) in members {
            let options = FileOptions::<ExtendedFileOptions>::default();
            zip.start_file(region.member_file(), options)
                .expect("start zip member");
            zip.write_all(rows.join("\n").as_bytes())
                .expect("write zip member");
        }
        zip.finish().expect("finish zip");
    }
    buf
}

/// In-memory stand-in for the archive index page.
struct StubIndex {
    archives: RefCell<BTreeMap<String, Vec<u8>>>,
}

impl StubIndex {
    fn new() -> Self {
        StubIndex {
            archives: RefCell::new(BTreeMap::new()),
        }
    }

    fn add(&self, name: &str, bytes: Vec<u8>) {
        self.archives
            .borrow_mut()
            .insert(format!("data/{name}"), bytes);
    }
}

impl RemoteIndex for StubIndex {
    fn list_archives(&self) -> Result<Vec<String>> {
        Ok(self.archives.borrow().keys().cloned().collect())
    }

    fn fetch(&self, href: &str, dest: &mut dyn Write) -> Result<u64> {
        let archives = self.archives.borrow();
        let bytes = archives.get(href).expect("stub only serves known hrefs");
        dest.write_all(bytes)?;
        Ok(bytes.len() as u64)
    }
}

fn two_region_index() -> StubIndex {
    let pha_rows = vec![csv_row(1, "2020-01-01"), csv_row(2, "2020-06-15")];
    let stc_rows = vec![csv_row(3, "2020-03-03")];
    let index = StubIndex::new();
    index.add(
        "datagis-2020.zip",
        year_archive(&[(Region::PHA, &pha_rows), (Region::STC, &stc_rows)]),
    );
    index
}

fn ids(batch: &RecordBatch) -> Vec<i64> {
    let col = batch
        .column_by_name("p1")
        .unwrap()
        .as_any()
        .downcast_ref::<Int64Array>()
        .unwrap();
    (0..col.len()).map(|i| col.value(i)).collect()
}

fn regions(batch: &RecordBatch) -> Vec<String> {
    let col = batch
        .column_by_name("region")
        .unwrap()
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap();
    (0..col.len()).map(|i| col.value(i).to_string()).collect()
}

#[test]
fn get_assembles_requested_regions_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut store =
        DatasetStore::new(Box::new(two_region_index()), dir.path(), "data_{}.parquet").unwrap();

    let batch = store.get(Some(&[Region::STC, Region::PHA])).unwrap();
    assert_eq!(ids(&batch), vec![3, 1, 2]);
    assert_eq!(regions(&batch), vec!["STC", "PHA", "PHA"]);
    assert_eq!(store.labels().len(), batch.num_columns());
}

#[test]
fn get_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let mut store =
        DatasetStore::new(Box::new(two_region_index()), dir.path(), "data_{}.parquet").unwrap();

    let first = store.get(Some(&[Region::PHA])).unwrap();
    let second = store.get(Some(&[Region::PHA])).unwrap();
    assert_eq!(first, second);
}

#[test]
fn concatenation_matches_individual_gets() {
    let dir = tempfile::tempdir().unwrap();
    let mut store =
        DatasetStore::new(Box::new(two_region_index()), dir.path(), "data_{}.parquet").unwrap();

    let combined = store.get(Some(&[Region::PHA, Region::STC])).unwrap();
    let pha = store.get(Some(&[Region::PHA])).unwrap();
    let stc = store.get(Some(&[Region::STC])).unwrap();

    let mut expected = ids(&pha);
    expected.extend(ids(&stc));
    assert_eq!(ids(&combined), expected);
}

#[test]
fn default_request_covers_all_regions() {
    let dir = tempfile::tempdir().unwrap();
    // archive contains members for every region, only PHA non-empty
    let pha_rows = vec![csv_row(1, "2021-01-01")];
    let empty: Vec<String> = Vec::new();
    let members: Vec<(Region, &[String])> = Region::ALL
        .iter()
        .map(|&r| {
            if r == Region::PHA {
                (r, pha_rows.as_slice())
            } else {
                (r, empty.as_slice())
            }
        })
        .collect();
    let index = StubIndex::new();
    index.add("datagis-2021.zip", year_archive(&members));

    let mut store = DatasetStore::new(Box::new(index), dir.path(), "data_{}.parquet").unwrap();
    let batch = store.get(None).unwrap();
    assert_eq!(batch.num_rows(), 1);
    assert_eq!(regions(&batch), vec!["PHA"]);
}

#[test]
fn second_run_reuses_cache_and_downloads_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let index = two_region_index();

    let mut store = DatasetStore::new(Box::new(index), dir.path(), "data_{}.parquet").unwrap();
    let first = store.get(Some(&[Region::PHA])).unwrap();
    assert!(dir.path().join("data_PHA.parquet").exists());

    // a fresh store over the same directory must come up from cache
    let index = two_region_index();
    let mut store = DatasetStore::new(Box::new(index), dir.path(), "data_{}.parquet").unwrap();
    let second = store.get(Some(&[Region::PHA])).unwrap();
    assert_eq!(first, second);
}

#[test]
fn new_remote_archive_invalidates_caches() {
    let dir = tempfile::tempdir().unwrap();
    let index = two_region_index();
    let mut store = DatasetStore::new(Box::new(index), dir.path(), "data_{}.parquet").unwrap();

    let before = store.get(Some(&[Region::PHA])).unwrap();
    assert_eq!(before.num_rows(), 2);

    // a new year appears remotely: caches must be dropped and the region
    // re-parsed to include the new rows
    let index = two_region_index();
    let rows_2021 = vec![csv_row(9, "2021-02-02")];
    index.add(
        "datagis-2021.zip",
        year_archive(&[(Region::PHA, &rows_2021), (Region::STC, &[])]),
    );
    let mut store = DatasetStore::new(Box::new(index), dir.path(), "data_{}.parquet").unwrap();

    let after = store.get(Some(&[Region::PHA])).unwrap();
    assert_eq!(after.num_rows(), 3);
    assert_eq!(ids(&after), vec![1, 2, 9]);
}

#[test]
fn monthly_cut_is_superseded_by_whole_year_archive() {
    let dir = tempfile::tempdir().unwrap();

    let partial = vec![csv_row(1, "2022-01-10")];
    let full = vec![csv_row(1, "2022-01-10"), csv_row(2, "2022-11-20")];
    let index = StubIndex::new();
    index.add(
        "datagis-06-2022.zip",
        year_archive(&[(Region::PHA, &partial), (Region::STC, &[])]),
    );
    let mut store = DatasetStore::new(Box::new(index), dir.path(), "data_{}.parquet").unwrap();
    assert_eq!(store.get(Some(&[Region::PHA])).unwrap().num_rows(), 1);

    // the whole-year archive replaces the monthly cut as canonical
    let index = StubIndex::new();
    index.add(
        "datagis-06-2022.zip",
        year_archive(&[(Region::PHA, &partial), (Region::STC, &[])]),
    );
    index.add(
        "datagis-2022.zip",
        year_archive(&[(Region::PHA, &full), (Region::STC, &[])]),
    );
    let mut store = DatasetStore::new(Box::new(index), dir.path(), "data_{}.parquet").unwrap();
    let batch = store.get(Some(&[Region::PHA])).unwrap();
    assert_eq!(ids(&batch), vec![1, 2]);
}
