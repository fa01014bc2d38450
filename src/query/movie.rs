use arrow::{
    array::{ArrayRef, Int64Array},
    datatypes::{DataType, Field, Schema as ArrowSchema, SchemaRef},
};
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;

use super::{date_array, ToRecordBatch};
use crate::dataset::{columns, Dataset};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieSeriesRow {
    #[serde(rename = "dt")]
    pub date: Option<NaiveDate>,
    pub audi_cnt: Option<i64>,
    pub sales_amt: Option<i64>,
}

/// Daily audience and sales for one movie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieSeries {
    pub movie_nm: String,
    pub rows: Vec<MovieSeriesRow>,
}

/// Every record whose name equals `movie_nm` exactly, ascending by date.
///
/// Rows sharing a date are all kept in source order; rows without a date
/// go last.
pub fn movie_series(ds: &Dataset, movie_nm: &str) -> MovieSeries {
    let mut rows: Vec<MovieSeriesRow> = ds
        .records()
        .iter()
        .filter(|r| r.movie_nm.as_deref() == Some(movie_nm))
        .map(|r| MovieSeriesRow {
            date: r.date,
            audi_cnt: r.audi_cnt,
            sales_amt: r.sales_amt,
        })
        .collect();
    rows.sort_by_key(|r| (r.date.is_none(), r.date));
    MovieSeries {
        movie_nm: movie_nm.to_string(),
        rows,
    }
}

impl ToRecordBatch for MovieSeries {
    fn schema(&self) -> SchemaRef {
        Arc::new(ArrowSchema::new(vec![
            Field::new(columns::DT, DataType::Date32, true),
            Field::new(columns::AUDI_CNT, DataType::Int64, true),
            Field::new(columns::SALES_AMT, DataType::Int64, true),
        ]))
    }

    fn to_arrays(&self) -> Vec<ArrayRef> {
        vec![
            date_array(self.rows.iter().map(|r| r.date)),
            Arc::new(Int64Array::from(
                self.rows.iter().map(|r| r.audi_cnt).collect::<Vec<_>>(),
            )),
            Arc::new(Int64Array::from(
                self.rows.iter().map(|r| r.sales_amt).collect::<Vec<_>>(),
            )),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::fixtures::*;

    #[test]
    fn two_records_in_date_order() {
        let ds = Dataset::from_records(vec![
            record(date(2024, 1, 3), "Dune", 2, 20, None, None),
            record(date(2024, 1, 2), "Other", 9, 90, None, None),
            record(date(2024, 1, 1), "Dune", 1, 10, None, None),
        ])
        .unwrap();
        let series = movie_series(&ds, "Dune");
        assert_eq!(
            series.rows,
            vec![
                MovieSeriesRow {
                    date: date(2024, 1, 1),
                    audi_cnt: Some(1),
                    sales_amt: Some(10),
                },
                MovieSeriesRow {
                    date: date(2024, 1, 3),
                    audi_cnt: Some(2),
                    sales_amt: Some(20),
                },
            ]
        );
    }

    #[test]
    fn duplicate_dates_are_not_merged() {
        let d = date(2024, 1, 1);
        let ds = Dataset::from_records(vec![
            record(None, "Dune", 7, 70, None, None),
            record(d, "Dune", 1, 10, Some("Y"), None),
            record(d, "Dune", 2, 20, Some("N"), None),
        ])
        .unwrap();
        let series = movie_series(&ds, "Dune");
        let audi: Vec<_> = series.rows.iter().map(|r| r.audi_cnt).collect();
        assert_eq!(audi, vec![Some(1), Some(2), Some(7)]);
        assert_eq!(series.rows[2].date, None);
    }

    #[test]
    fn exact_match_only() {
        let ds = scenario();
        assert!(movie_series(&ds, "a").rows.is_empty());
        assert!(movie_series(&ds, "").rows.is_empty());
        assert_eq!(movie_series(&ds, "A").rows.len(), 2);
    }
}
