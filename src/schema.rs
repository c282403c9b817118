// src/schema.rs
use std::sync::Arc;

use arrow::datatypes::{DataType, Field, Schema as ArrowSchema, SchemaRef};
use once_cell::sync::Lazy;

/// Element type of one schema column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Int8,
    Int16,
    Int32,
    Int64,
    Float64,
    Utf8,
    Date,
}

/// One column of the fixed accident-record layout.
#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub label: &'static str,
    pub ty: ColumnType,
}

const fn col(label: &'static str, ty: ColumnType) -> Column {
    Column { label, ty }
}

/// Label of the accident-date column (`YYYY-MM-DD`).
pub const DATE_COLUMN: &str = "p2a";

/// Label of the synthetic trailing region column.
pub const REGION_COLUMN: &str = "region";

/// The fixed column layout of the source CSVs, in physical order, plus the
/// trailing synthetic `region` column. Source rows carry the first
/// [`CSV_COLUMNS`] fields; `region` is stamped in by the parser.
///
/// Labels follow the official police export; the short single-letter columns
/// at the end are location/GIS fields.
pub static COLUMNS: [Column; 65] = [
    // accident identification and road classification
    col("p1", ColumnType::Int64),
    col("p36", ColumnType::Int8),
    col("p37", ColumnType::Int32),
    col("p2a", ColumnType::Date),
    col("weekday(p2a)", ColumnType::Int8),
    col("p2b", ColumnType::Int16),
    // accident kind, cause and culprit
    col("p6", ColumnType::Int8),
    col("p7", ColumnType::Int8),
    col("p8", ColumnType::Int8),
    col("p9", ColumnType::Int8),
    col("p10", ColumnType::Int8),
    col("p11", ColumnType::Int8),
    col("p12", ColumnType::Int16),
    // casualty counts and total damage
    col("p13a", ColumnType::Int8),
    col("p13b", ColumnType::Int8),
    col("p13c", ColumnType::Int8),
    col("p14", ColumnType::Int32),
    // road surface, weather and visibility conditions
    col("p15", ColumnType::Int8),
    col("p16", ColumnType::Int8),
    col("p17", ColumnType::Int8),
    col("p18", ColumnType::Int8),
    col("p19", ColumnType::Int8),
    col("p20", ColumnType::Int8),
    col("p21", ColumnType::Int8),
    col("p22", ColumnType::Int8),
    col("p23", ColumnType::Int8),
    col("p24", ColumnType::Int8),
    col("p27", ColumnType::Int8),
    col("p28", ColumnType::Int8),
    col("p34", ColumnType::Int8),
    col("p35", ColumnType::Int8),
    col("p39", ColumnType::Int8),
    // vehicle description and post-accident state
    col("p44", ColumnType::Int8),
    col("p45a", ColumnType::Int8),
    col("p47", ColumnType::Int8),
    col("p48a", ColumnType::Int8),
    col("p49", ColumnType::Int8),
    col("p50a", ColumnType::Int8),
    col("p50b", ColumnType::Int8),
    col("p51", ColumnType::Int8),
    col("p52", ColumnType::Int8),
    col("p53", ColumnType::Int32),
    // driver category and state
    col("p55a", ColumnType::Int8),
    col("p57", ColumnType::Int8),
    col("p58", ColumnType::Int8),
    // location coordinates
    col("a", ColumnType::Float64),
    col("b", ColumnType::Float64),
    col("d", ColumnType::Float64),
    col("e", ColumnType::Float64),
    col("f", ColumnType::Float64),
    col("g", ColumnType::Float64),
    // location descriptions (free text) and road identification
    col("h", ColumnType::Utf8),
    col("i", ColumnType::Utf8),
    col("j", ColumnType::Int8),
    col("k", ColumnType::Utf8),
    col("l", ColumnType::Utf8),
    col("n", ColumnType::Int64),
    col("o", ColumnType::Float64),
    col("p", ColumnType::Utf8),
    col("q", ColumnType::Utf8),
    col("r", ColumnType::Int64),
    col("s", ColumnType::Int64),
    col("t", ColumnType::Utf8),
    col("p5a", ColumnType::Int8),
    // synthetic, filled by the parser
    col("region", ColumnType::Utf8),
];

/// Number of physical columns in a source CSV row (everything but `region`).
pub const CSV_COLUMNS: usize = COLUMNS.len() - 1;

static ARROW_SCHEMA: Lazy<SchemaRef> = Lazy::new(|| {
    let fields: Vec<Field> = COLUMNS
        .iter()
        .map(|c| {
            let dt = match c.ty {
                ColumnType::Int8 => DataType::Int8,
                ColumnType::Int16 => DataType::Int16,
                ColumnType::Int32 => DataType::Int32,
                ColumnType::Int64 => DataType::Int64,
                ColumnType::Float64 => DataType::Float64,
                ColumnType::Utf8 => DataType::Utf8,
                ColumnType::Date => DataType::Date32,
            };
            // sentinels fill conversion failures everywhere except the date
            // column, which becomes null instead
            Field::new(c.label, dt, c.ty == ColumnType::Date)
        })
        .collect();
    Arc::new(ArrowSchema::new(fields))
});

/// Arrow schema shared by every parsed batch.
pub fn arrow_schema() -> SchemaRef {
    Arc::clone(&ARROW_SCHEMA)
}

/// Column labels in schema order.
pub fn labels() -> Vec<String> {
    COLUMNS.iter().map(|c| c.label.to_string()).collect()
}
