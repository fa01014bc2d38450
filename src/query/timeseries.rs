use arrow::{
    array::{ArrayRef, Int64Array, StringArray},
    datatypes::{DataType, Field, Schema as ArrowSchema, SchemaRef},
};
use chrono::NaiveDate;
use serde::Serialize;
use std::{collections::BTreeMap, sync::Arc};

use super::{date_array, ToRecordBatch};
use crate::dataset::{columns, Dataset};

/// Inclusive date window. A missing bound leaves that side open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self::new(Some(start), Some(end))
    }

    /// True when no date can satisfy the range (`start > end`).
    pub fn is_empty(&self) -> bool {
        matches!((self.start, self.end), (Some(s), Some(e)) if s > e)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudienceRow {
    #[serde(rename = "dt")]
    pub date: NaiveDate,
    pub multi_movie_yn: String,
    pub rep_nation_cd: String,
    pub audi_cnt: i64,
}

/// One point of a per-category line: audience on `date` for `category`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPoint {
    #[serde(rename = "dt")]
    pub date: NaiveDate,
    pub category: String,
    pub audi_cnt: i64,
}

/// Audience totals per (date, multi-theater flag, nation code).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudienceSeries {
    pub range: DateRange,
    pub rows: Vec<AudienceRow>,
}

impl AudienceSeries {
    /// Collapse to one line per multi-theater flag.
    pub fn by_multi_flag(&self) -> Vec<CategoryPoint> {
        collapse(&self.rows, |r| &r.multi_movie_yn)
    }

    /// Collapse to one line per nation code.
    pub fn by_nation(&self) -> Vec<CategoryPoint> {
        collapse(&self.rows, |r| &r.rep_nation_cd)
    }
}

fn collapse(rows: &[AudienceRow], key: impl Fn(&AudienceRow) -> &String) -> Vec<CategoryPoint> {
    let mut sums: BTreeMap<(NaiveDate, &str), i64> = BTreeMap::new();
    for r in rows {
        let total = sums.entry((r.date, key(r).as_str())).or_default();
        *total = total.saturating_add(r.audi_cnt);
    }
    sums.into_iter()
        .map(|((date, category), audi_cnt)| CategoryPoint {
            date,
            category: category.to_string(),
            audi_cnt,
        })
        .collect()
}

/// Sum `audiCnt` per (`dt`, `multiMovieYn`, `repNationCd`) within `range`.
///
/// Only observed combinations are emitted, ordered by key. Rows with a null
/// date, flag or nation code belong to no group; null audiences count as 0.
pub fn audience_by_date_flag_nation(ds: &Dataset, range: DateRange) -> AudienceSeries {
    let mut groups: BTreeMap<(NaiveDate, &str, &str), i64> = BTreeMap::new();
    if !range.is_empty() {
        for r in ds.records() {
            let (Some(date), Some(flag), Some(nation)) = (
                r.date,
                r.multi_movie_yn.as_deref(),
                r.rep_nation_cd.as_deref(),
            ) else {
                continue;
            };
            if !range.contains(date) {
                continue;
            }
            let total = groups.entry((date, flag, nation)).or_default();
            *total = total.saturating_add(r.audi_cnt.unwrap_or(0));
        }
    }

    AudienceSeries {
        range,
        rows: groups
            .into_iter()
            .map(|((date, flag, nation), audi_cnt)| AudienceRow {
                date,
                multi_movie_yn: flag.to_string(),
                rep_nation_cd: nation.to_string(),
                audi_cnt,
            })
            .collect(),
    }
}

impl ToRecordBatch for AudienceSeries {
    fn schema(&self) -> SchemaRef {
        Arc::new(ArrowSchema::new(vec![
            Field::new(columns::DT, DataType::Date32, false),
            Field::new(columns::MULTI_MOVIE_YN, DataType::Utf8, false),
            Field::new(columns::REP_NATION_CD, DataType::Utf8, false),
            Field::new(columns::AUDI_CNT, DataType::Int64, false),
        ]))
    }

    fn to_arrays(&self) -> Vec<ArrayRef> {
        vec![
            date_array(self.rows.iter().map(|r| Some(r.date))),
            Arc::new(StringArray::from(
                self.rows
                    .iter()
                    .map(|r| r.multi_movie_yn.as_str())
                    .collect::<Vec<_>>(),
            )),
            Arc::new(StringArray::from(
                self.rows
                    .iter()
                    .map(|r| r.rep_nation_cd.as_str())
                    .collect::<Vec<_>>(),
            )),
            Arc::new(Int64Array::from(
                self.rows.iter().map(|r| r.audi_cnt).collect::<Vec<_>>(),
            )),
        ]
    }
}
