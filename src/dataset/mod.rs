// src/dataset/mod.rs

pub mod cache;
pub mod date_parser;
pub mod loader;

use arrow::{
    array::{Array, ArrayRef, Date32Array, Int64Array, StringArray},
    compute::cast,
    datatypes::{DataType, Field, Schema as ArrowSchema, SchemaRef},
    record_batch::RecordBatch,
};
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::error::LoadError;

pub use cache::load_cached;
pub use loader::load_dataset;

/// Source column names, as stored in the KOBIS daily box-office export.
pub mod columns {
    pub const DT: &str = "dt";
    pub const MOVIE_CD: &str = "movieCd";
    pub const MOVIE_NM: &str = "movieNm";
    pub const AUDI_CNT: &str = "audiCnt";
    pub const SALES_AMT: &str = "salesAmt";
    pub const AUDI_ACC: &str = "audiAcc";
    pub const MULTI_MOVIE_YN: &str = "multiMovieYn";
    pub const REP_NATION_CD: &str = "repNationCd";
    pub const RANK: &str = "rank";

    /// Every column a dataset must expose.
    pub const REQUIRED: [&str; 9] = [
        DT,
        MOVIE_CD,
        MOVIE_NM,
        AUDI_CNT,
        SALES_AMT,
        AUDI_ACC,
        MULTI_MOVIE_YN,
        REP_NATION_CD,
        RANK,
    ];
}

/// One daily box-office observation for a single movie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    #[serde(rename = "dt")]
    pub date: Option<NaiveDate>,
    pub movie_cd: Option<String>,
    pub movie_nm: Option<String>,
    pub audi_cnt: Option<i64>,
    pub sales_amt: Option<i64>,
    pub audi_acc: Option<i64>,
    pub multi_movie_yn: Option<String>,
    pub rep_nation_cd: Option<String>,
    pub rank: Option<i64>,
}

/// The loaded box-office table.
///
/// Holds the full source table (every stored column, `dt` normalized to
/// `Date32`) next to the typed [`Record`] view of it. Nothing is mutated after
/// construction, so a `Dataset` can be shared freely across threads.
#[derive(Debug, Clone)]
pub struct Dataset {
    table: RecordBatch,
    records: Vec<Record>,
}

impl Dataset {
    /// Build a dataset from a raw table: normalizes `dt` and derives records.
    pub fn from_table(table: RecordBatch) -> Result<Self, LoadError> {
        for name in columns::REQUIRED {
            if table.schema().index_of(name).is_err() {
                return Err(LoadError::MissingColumn(name.to_string()));
            }
        }
        let table = normalize_date_column(table)?;
        let records = extract_records(&table)?;
        debug!(
            rows = records.len(),
            columns = table.num_columns(),
            "dataset materialized"
        );
        Ok(Self { table, records })
    }

    /// Build a dataset holding exactly the required columns for `records`.
    pub fn from_records(records: Vec<Record>) -> Result<Self, LoadError> {
        let schema = record_schema();
        let arrays: Vec<ArrayRef> = vec![
            Arc::new(Date32Array::from(
                records
                    .iter()
                    .map(|r| r.date.map(date_parser::to_epoch_days))
                    .collect::<Vec<_>>(),
            )),
            string_array(&records, |r| r.movie_cd.as_deref()),
            string_array(&records, |r| r.movie_nm.as_deref()),
            int_array(&records, |r| r.audi_cnt),
            int_array(&records, |r| r.sales_amt),
            int_array(&records, |r| r.audi_acc),
            string_array(&records, |r| r.multi_movie_yn.as_deref()),
            string_array(&records, |r| r.rep_nation_cd.as_deref()),
            int_array(&records, |r| r.rank),
        ];
        let table = RecordBatch::try_new(schema, arrays)?;
        Ok(Self { table, records })
    }

    pub fn table(&self) -> &RecordBatch {
        &self.table
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All column names in table order.
    pub fn column_names(&self) -> Vec<String> {
        self.table
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect()
    }

    /// Earliest and latest non-null `dt`, or `None` when no row has a date.
    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        let mut dates = self.records.iter().filter_map(|r| r.date);
        let first = dates.next()?;
        Some(dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
    }

    /// Distinct non-null movie names in order of first appearance.
    pub fn movie_names(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        self.records
            .iter()
            .filter_map(|r| r.movie_nm.as_deref())
            .filter(|name| seen.insert(*name))
            .collect()
    }
}

/// Arrow schema of [`Dataset::from_records`] tables.
pub fn record_schema() -> SchemaRef {
    Arc::new(ArrowSchema::new(vec![
        Field::new(columns::DT, DataType::Date32, true),
        Field::new(columns::MOVIE_CD, DataType::Utf8, true),
        Field::new(columns::MOVIE_NM, DataType::Utf8, true),
        Field::new(columns::AUDI_CNT, DataType::Int64, true),
        Field::new(columns::SALES_AMT, DataType::Int64, true),
        Field::new(columns::AUDI_ACC, DataType::Int64, true),
        Field::new(columns::MULTI_MOVIE_YN, DataType::Utf8, true),
        Field::new(columns::REP_NATION_CD, DataType::Utf8, true),
        Field::new(columns::RANK, DataType::Int64, true),
    ]))
}

fn string_array(records: &[Record], get: impl Fn(&Record) -> Option<&str>) -> ArrayRef {
    Arc::new(StringArray::from(
        records.iter().map(get).collect::<Vec<Option<&str>>>(),
    ))
}

fn int_array(records: &[Record], get: impl Fn(&Record) -> Option<i64>) -> ArrayRef {
    Arc::new(Int64Array::from(
        records.iter().map(get).collect::<Vec<Option<i64>>>(),
    ))
}

/// Replace `dt` with a `Date32` column.
///
/// - Date32                  → kept
/// - Date64, Timestamp(*)    → cast to Date32
/// - anything else           → rendered as text, parsed as `YYYYMMDD`
///
/// Values that do not parse become null.
fn normalize_date_column(table: RecordBatch) -> Result<RecordBatch, LoadError> {
    let schema = table.schema();
    let idx = schema
        .index_of(columns::DT)
        .map_err(|_| LoadError::MissingColumn(columns::DT.to_string()))?;
    let raw = table.column(idx);

    let normalized: ArrayRef = match raw.data_type() {
        DataType::Date32 => return Ok(table),
        DataType::Date64 | DataType::Timestamp(_, _) => cast(raw, &DataType::Date32)?,
        _ => {
            let text = cast(raw, &DataType::Utf8)?;
            let text = downcast::<StringArray>(&text, columns::DT)?;
            let mut failed = 0usize;
            let days: Date32Array = text
                .iter()
                .map(|opt| {
                    opt.and_then(|s| {
                        let parsed = date_parser::parse_yyyymmdd(s);
                        if parsed.is_none() {
                            failed += 1;
                            trace!(raw = s, "unparseable dt value");
                        }
                        parsed.map(date_parser::to_epoch_days)
                    })
                })
                .collect();
            if failed > 0 {
                debug!(failed, "dt values coerced to null");
            }
            Arc::new(days)
        }
    };

    let mut fields: Vec<Field> = schema.fields().iter().map(|f| f.as_ref().clone()).collect();
    fields[idx] = Field::new(columns::DT, DataType::Date32, true);
    let mut arrays = table.columns().to_vec();
    arrays[idx] = normalized;
    Ok(RecordBatch::try_new(
        Arc::new(ArrowSchema::new(fields)),
        arrays,
    )?)
}

fn extract_records(table: &RecordBatch) -> Result<Vec<Record>, LoadError> {
    let dates = typed_column(table, columns::DT, &DataType::Date32)?;
    let dates = downcast::<Date32Array>(&dates, columns::DT)?;
    let strings = |name: &str| typed_column(table, name, &DataType::Utf8);
    let ints = |name: &str| typed_column(table, name, &DataType::Int64);

    let movie_cd = strings(columns::MOVIE_CD)?;
    let movie_nm = strings(columns::MOVIE_NM)?;
    let multi = strings(columns::MULTI_MOVIE_YN)?;
    let nation = strings(columns::REP_NATION_CD)?;
    let audi_cnt = ints(columns::AUDI_CNT)?;
    let sales_amt = ints(columns::SALES_AMT)?;
    let audi_acc = ints(columns::AUDI_ACC)?;
    let rank = ints(columns::RANK)?;

    let movie_cd = downcast::<StringArray>(&movie_cd, columns::MOVIE_CD)?;
    let movie_nm = downcast::<StringArray>(&movie_nm, columns::MOVIE_NM)?;
    let multi = downcast::<StringArray>(&multi, columns::MULTI_MOVIE_YN)?;
    let nation = downcast::<StringArray>(&nation, columns::REP_NATION_CD)?;
    let audi_cnt = downcast::<Int64Array>(&audi_cnt, columns::AUDI_CNT)?;
    let sales_amt = downcast::<Int64Array>(&sales_amt, columns::SALES_AMT)?;
    let audi_acc = downcast::<Int64Array>(&audi_acc, columns::AUDI_ACC)?;
    let rank = downcast::<Int64Array>(&rank, columns::RANK)?;

    let text = |arr: &StringArray, i: usize| (!arr.is_null(i)).then(|| arr.value(i).to_string());
    let int = |arr: &Int64Array, i: usize| (!arr.is_null(i)).then(|| arr.value(i));

    Ok((0..table.num_rows())
        .map(|i| Record {
            date: if dates.is_null(i) {
                None
            } else {
                date_parser::from_epoch_days(dates.value(i))
            },
            movie_cd: text(movie_cd, i),
            movie_nm: text(movie_nm, i),
            audi_cnt: int(audi_cnt, i),
            sales_amt: int(sales_amt, i),
            audi_acc: int(audi_acc, i),
            multi_movie_yn: text(multi, i),
            rep_nation_cd: text(nation, i),
            rank: int(rank, i),
        })
        .collect())
}

/// Fetch `name` cast to `ty`; unconvertible values become null.
fn typed_column(table: &RecordBatch, name: &str, ty: &DataType) -> Result<ArrayRef, LoadError> {
    let col = table
        .column_by_name(name)
        .ok_or_else(|| LoadError::MissingColumn(name.to_string()))?;
    if col.data_type() == ty {
        return Ok(Arc::clone(col));
    }
    Ok(cast(col, ty)?)
}

fn downcast<'a, T: 'static>(arr: &'a ArrayRef, name: &str) -> Result<&'a T, LoadError> {
    arr.as_any().downcast_ref::<T>().ok_or_else(|| {
        LoadError::Arrow(arrow::error::ArrowError::CastError(format!(
            "column `{}` has unexpected type {}",
            name,
            arr.data_type()
        )))
    })
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use parquet::arrow::ArrowWriter;
    use std::{fs, fs::File, path::Path};

    pub fn init_test_logging() {
        use tracing_subscriber::{EnvFilter, FmtSubscriber};
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,boxoffice=debug")),
            )
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    pub fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    /// Record with the fields most queries look at; everything else null.
    pub fn record(
        dt: Option<NaiveDate>,
        name: &str,
        audi: i64,
        sales: i64,
        multi: Option<&str>,
        nation: Option<&str>,
    ) -> Record {
        Record {
            date: dt,
            movie_cd: Some(format!("cd-{}", name)),
            movie_nm: Some(name.to_string()),
            audi_cnt: Some(audi),
            sales_amt: Some(sales),
            audi_acc: Some(audi),
            multi_movie_yn: multi.map(str::to_string),
            rep_nation_cd: nation.map(str::to_string),
            rank: Some(1),
        }
    }

    /// The three-row scenario used across the query tests.
    pub fn scenario() -> Dataset {
        Dataset::from_records(vec![
            record(date(2024, 1, 1), "A", 100, 1000, Some("Y"), Some("K")),
            record(date(2024, 1, 1), "B", 50, 500, None, Some("F")),
            record(date(2024, 1, 2), "A", 200, 2000, Some("Y"), Some("K")),
        ])
        .unwrap()
    }

    /// Raw export layout: every column stored as text, `dt` as `YYYYMMDD`.
    pub fn raw_schema(with_dt: bool) -> SchemaRef {
        let mut fields = Vec::new();
        if with_dt {
            fields.push(Field::new(columns::DT, DataType::Utf8, true));
        }
        for name in &columns::REQUIRED[1..] {
            fields.push(Field::new(*name, DataType::Utf8, true));
        }
        Arc::new(ArrowSchema::new(fields))
    }

    /// One raw row; `None` in any slot is a null.
    pub type RawRow<'a> = [Option<&'a str>; 9];

    pub fn raw_batch(rows: &[RawRow<'_>], with_dt: bool) -> RecordBatch {
        let skip = if with_dt { 0 } else { 1 };
        let arrays: Vec<ArrayRef> = (skip..9)
            .map(|c| {
                Arc::new(StringArray::from(
                    rows.iter().map(|r| r[c]).collect::<Vec<_>>(),
                )) as ArrayRef
            })
            .collect();
        RecordBatch::try_new(raw_schema(with_dt), arrays).unwrap()
    }

    pub fn write_parquet(path: &Path, batch: &RecordBatch) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let file = File::create(path).unwrap();
        let mut writer = ArrowWriter::try_new(file, batch.schema(), None).unwrap();
        writer.write(batch).unwrap();
        writer.close().unwrap();
    }
}
