use arrow::{
    array::{ArrayRef, Int64Array, StringArray},
    datatypes::{DataType, Field, Schema as ArrowSchema, SchemaRef},
};
use serde::Serialize;
use std::{collections::HashMap, fmt, sync::Arc};

use super::ToRecordBatch;
use crate::dataset::{columns, Dataset, Record};

pub const DEFAULT_TOP_N: usize = 10;

/// Summable per-record measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Measure {
    SalesAmt,
    AudiCnt,
}

impl Measure {
    /// Source column the measure is read from.
    pub fn column(self) -> &'static str {
        match self {
            Measure::SalesAmt => columns::SALES_AMT,
            Measure::AudiCnt => columns::AUDI_CNT,
        }
    }

    fn value(self, record: &Record) -> Option<i64> {
        match self {
            Measure::SalesAmt => record.sales_amt,
            Measure::AudiCnt => record.audi_cnt,
        }
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedMovie {
    pub movie_nm: String,
    pub total: i64,
}

/// Movies ordered by a summed measure, largest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ranking {
    pub measure: Measure,
    pub rows: Vec<RankedMovie>,
}

/// Sum `measure` per movie name and keep the `n` largest.
///
/// Equal totals keep the order in which the movies first appear. Null
/// measures add nothing; rows without a movie name are ignored.
pub fn top_n(ds: &Dataset, measure: Measure, n: usize) -> Ranking {
    let mut order: Vec<RankedMovie> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for record in ds.records() {
        let Some(name) = record.movie_nm.as_deref() else {
            continue;
        };
        let slot = *index.entry(name).or_insert_with(|| {
            order.push(RankedMovie {
                movie_nm: name.to_string(),
                total: 0,
            });
            order.len() - 1
        });
        if let Some(v) = measure.value(record) {
            order[slot].total = order[slot].total.saturating_add(v);
        }
    }

    // stable: ties stay in first-seen order
    order.sort_by(|a, b| b.total.cmp(&a.total));
    order.truncate(n);
    Ranking {
        measure,
        rows: order,
    }
}

impl ToRecordBatch for Ranking {
    fn schema(&self) -> SchemaRef {
        Arc::new(ArrowSchema::new(vec![
            Field::new(columns::MOVIE_NM, DataType::Utf8, false),
            Field::new(self.measure.column(), DataType::Int64, false),
        ]))
    }

    fn to_arrays(&self) -> Vec<ArrayRef> {
        vec![
            Arc::new(StringArray::from(
                self.rows
                    .iter()
                    .map(|r| r.movie_nm.as_str())
                    .collect::<Vec<_>>(),
            )),
            Arc::new(Int64Array::from(
                self.rows.iter().map(|r| r.total).collect::<Vec<_>>(),
            )),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::fixtures::*;

    fn names(r: &Ranking) -> Vec<&str> {
        r.rows.iter().map(|m| m.movie_nm.as_str()).collect()
    }

    #[test]
    fn top_one_by_audience() {
        let ranking = top_n(&scenario(), Measure::AudiCnt, 1);
        assert_eq!(
            ranking.rows,
            vec![RankedMovie {
                movie_nm: "A".into(),
                total: 300
            }]
        );
    }

    #[test]
    fn ties_keep_first_appearance() {
        let d = date(2024, 1, 1);
        let ds = Dataset::from_records(vec![
            record(d, "Second", 1, 100, None, None),
            record(d, "First", 1, 100, None, None),
            record(d, "Third", 1, 50, None, None),
        ])
        .unwrap();
        let ranking = top_n(&ds, Measure::SalesAmt, DEFAULT_TOP_N);
        assert_eq!(names(&ranking), vec!["Second", "First", "Third"]);
        let totals: Vec<i64> = ranking.rows.iter().map(|m| m.total).collect();
        assert_eq!(totals, vec![100, 100, 50]);
    }

    #[test]
    fn length_is_bounded_by_n_and_groups() {
        let d = date(2024, 1, 1);
        let records: Vec<_> = (0..15)
            .map(|i| record(d, &format!("M{i:02}"), i, i * 10, None, None))
            .collect();
        let ds = Dataset::from_records(records).unwrap();

        let top = top_n(&ds, Measure::SalesAmt, DEFAULT_TOP_N);
        assert_eq!(top.rows.len(), 10);
        assert_eq!(top.rows[0].movie_nm, "M14");
        assert!(top.rows.windows(2).all(|w| w[0].total >= w[1].total));

        assert_eq!(top_n(&scenario(), Measure::SalesAmt, 10).rows.len(), 2);
        assert!(top_n(&scenario(), Measure::SalesAmt, 0).rows.is_empty());
    }

    #[test]
    fn nulls_are_skipped() {
        let d = date(2024, 1, 1);
        let mut missing_sales = record(d, "A", 5, 0, None, None);
        missing_sales.sales_amt = None;
        let mut unnamed = record(d, "B", 1000, 1000, None, None);
        unnamed.movie_nm = None;
        let ds = Dataset::from_records(vec![
            missing_sales,
            record(d, "A", 5, 70, None, None),
            unnamed,
        ])
        .unwrap();
        let ranking = top_n(&ds, Measure::SalesAmt, 10);
        assert_eq!(
            ranking.rows,
            vec![RankedMovie {
                movie_nm: "A".into(),
                total: 70
            }]
        );
    }

    #[test]
    fn batch_uses_measure_column_name() {
        let batch = top_n(&scenario(), Measure::AudiCnt, 10)
            .to_record_batch()
            .unwrap();
        assert_eq!(batch.schema().field(1).name(), "audiCnt");
        assert_eq!(batch.num_rows(), 2);
    }
}
