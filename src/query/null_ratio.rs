use arrow::{
    array::{Array, ArrayRef, Float64Array},
    datatypes::{DataType, Field, Schema as ArrowSchema, SchemaRef},
};
use chrono::NaiveDate;
use serde::Serialize;
use std::{collections::BTreeMap, sync::Arc};

use super::{date_array, ToRecordBatch};
use crate::dataset::{columns, Dataset};
use crate::error::QueryError;

/// Null fractions of several columns on one date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NullRatioRow {
    #[serde(rename = "dt")]
    pub date: NaiveDate,
    /// One entry per column of the owning [`NullRatioTable`], same order.
    pub ratios: Vec<f64>,
}

/// Per-date null fractions, ascending by date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NullRatioTable {
    pub columns: Vec<String>,
    pub rows: Vec<NullRatioRow>,
}

impl NullRatioTable {
    /// Ratio series for one column, as `(date, ratio)` points.
    pub fn series(&self, column: &str) -> Option<Vec<(NaiveDate, f64)>> {
        let idx = self.columns.iter().position(|c| c == column)?;
        Some(self.rows.iter().map(|r| (r.date, r.ratios[idx])).collect())
    }
}

/// Fraction of all rows where `column` is null; `None` for an empty dataset.
pub fn null_ratio(ds: &Dataset, column: &str) -> Result<Option<f64>, QueryError> {
    let col = lookup(ds, column)?;
    if col.is_empty() {
        return Ok(None);
    }
    Ok(Some(col.null_count() as f64 / col.len() as f64))
}

/// Null fraction of each of `targets`, grouped by `dt`.
///
/// Only dates that occur in the data appear, and rows without a `dt` belong
/// to no group.
pub fn null_ratio_by_date<S: AsRef<str>>(
    ds: &Dataset,
    targets: &[S],
) -> Result<NullRatioTable, QueryError> {
    let arrays = targets
        .iter()
        .map(|t| lookup(ds, t.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;

    // date → (rows, nulls per target)
    let mut groups: BTreeMap<NaiveDate, (usize, Vec<usize>)> = BTreeMap::new();
    for (i, record) in ds.records().iter().enumerate() {
        let Some(date) = record.date else {
            continue;
        };
        let (rows, nulls) = groups
            .entry(date)
            .or_insert_with(|| (0, vec![0; arrays.len()]));
        *rows += 1;
        for (n, arr) in nulls.iter_mut().zip(&arrays) {
            if arr.is_null(i) {
                *n += 1;
            }
        }
    }

    let rows = groups
        .into_iter()
        .map(|(date, (rows, nulls))| NullRatioRow {
            date,
            ratios: nulls
                .into_iter()
                .map(|n| n as f64 / rows as f64)
                .collect(),
        })
        .collect();

    Ok(NullRatioTable {
        columns: targets.iter().map(|t| t.as_ref().to_string()).collect(),
        rows,
    })
}

fn lookup<'a>(ds: &'a Dataset, column: &str) -> Result<&'a ArrayRef, QueryError> {
    ds.table()
        .column_by_name(column)
        .ok_or_else(|| QueryError::UnknownColumn(column.to_string()))
}

impl ToRecordBatch for NullRatioTable {
    fn schema(&self) -> SchemaRef {
        let mut fields = vec![Field::new(columns::DT, DataType::Date32, false)];
        for c in &self.columns {
            fields.push(Field::new(
                format!("{}_null_ratio", c),
                DataType::Float64,
                false,
            ));
        }
        Arc::new(ArrowSchema::new(fields))
    }

    fn to_arrays(&self) -> Vec<ArrayRef> {
        let mut arrays = vec![date_array(self.rows.iter().map(|r| Some(r.date)))];
        for idx in 0..self.columns.len() {
            arrays.push(Arc::new(Float64Array::from(
                self.rows.iter().map(|r| r.ratios[idx]).collect::<Vec<_>>(),
            )));
        }
        arrays
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::fixtures::*;

    #[test]
    fn overall_ratio_is_exact() {
        let ds = scenario();
        assert_eq!(null_ratio(&ds, "multiMovieYn").unwrap(), Some(1.0 / 3.0));
        assert_eq!(null_ratio(&ds, "repNationCd").unwrap(), Some(0.0));
    }

    #[test]
    fn empty_dataset_has_no_ratio() {
        let ds = Dataset::from_records(Vec::new()).unwrap();
        assert_eq!(null_ratio(&ds, "multiMovieYn").unwrap(), None);
        let table = null_ratio_by_date(&ds, &["multiMovieYn"]).unwrap();
        assert!(table.rows.is_empty());
    }

    #[test]
    fn grouped_by_date() {
        let ds = scenario();
        let table = null_ratio_by_date(&ds, &["multiMovieYn", "repNationCd"]).unwrap();
        assert_eq!(
            table.rows,
            vec![
                NullRatioRow {
                    date: date(2024, 1, 1).unwrap(),
                    ratios: vec![0.5, 0.0],
                },
                NullRatioRow {
                    date: date(2024, 1, 2).unwrap(),
                    ratios: vec![0.0, 0.0],
                },
            ]
        );
        assert_eq!(
            table.series("multiMovieYn").unwrap()[0],
            (date(2024, 1, 1).unwrap(), 0.5)
        );
        assert!(table.series("rank").is_none());
    }

    #[test]
    fn dates_without_rows_and_null_dates_are_absent() {
        let ds = Dataset::from_records(vec![
            record(date(2024, 1, 1), "A", 1, 1, None, None),
            record(date(2024, 1, 1), "A", 1, 1, None, Some("K")),
            record(date(2024, 1, 1), "A", 1, 1, Some("N"), Some("K")),
            record(None, "B", 1, 1, None, None),
            record(date(2024, 1, 5), "C", 1, 1, None, None),
        ])
        .unwrap();
        let table = null_ratio_by_date(&ds, &["multiMovieYn", "repNationCd"]).unwrap();
        let dates: Vec<_> = table.rows.iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![date(2024, 1, 1).unwrap(), date(2024, 1, 5).unwrap()]);
        assert_eq!(table.rows[0].ratios, vec![2.0 / 3.0, 1.0 / 3.0]);
        assert_eq!(table.rows[1].ratios, vec![1.0, 1.0]);
    }

    #[test]
    fn unknown_column_is_an_error() {
        let ds = scenario();
        assert!(matches!(
            null_ratio(&ds, "nope"),
            Err(QueryError::UnknownColumn(_))
        ));
        assert!(null_ratio_by_date(&ds, &["nope"]).is_err());
    }

    #[test]
    fn record_batch_layout() {
        let ds = scenario();
        let batch = null_ratio_by_date(&ds, &["multiMovieYn"])
            .unwrap()
            .to_record_batch()
            .unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.schema().field(0).name(), "dt");
        assert_eq!(batch.schema().field(1).name(), "multiMovieYn_null_ratio");
    }
}
