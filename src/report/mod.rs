// src/report/mod.rs

pub mod render;

use arrow::record_batch::RecordBatch;
use serde::{Serialize, Serializer};
use tracing::{debug, info};

use crate::dataset::Dataset;
use crate::error::QueryError;
use crate::query::{
    self, AudienceSeries, CategoryPoint, DateRange, Measure, MovieSeries, NullRatioTable, Ranking,
};

pub use render::{render_json, render_text};

/// What the operator asked to see.
#[derive(Debug, Clone, Default)]
pub struct ReportRequest {
    /// Preview columns; empty means `default_columns`.
    pub columns: Vec<String>,
    pub default_columns: Vec<String>,
    pub preview_rows: usize,
    pub null_columns: Vec<String>,
    pub top_n: usize,
    /// `None` means the full span of the data.
    pub range: Option<DateRange>,
    /// `None` means the first movie in the data.
    pub movie: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnNullRatio {
    pub column: String,
    pub ratio: Option<f64>,
}

/// Every dashboard section, in display order.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardReport {
    pub rows: usize,
    pub columns: Vec<String>,
    #[serde(serialize_with = "serialize_batch")]
    pub preview: RecordBatch,
    pub null_ratios: Vec<ColumnNullRatio>,
    pub null_trend: NullRatioTable,
    pub top_sales: Ranking,
    pub top_audience: Ranking,
    pub audience: AudienceSeries,
    pub audience_by_flag: Vec<CategoryPoint>,
    pub audience_by_nation: Vec<CategoryPoint>,
    pub movie: Option<MovieSeries>,
}

pub fn build_report(ds: &Dataset, req: &ReportRequest) -> Result<DashboardReport, QueryError> {
    let columns = query::column_projection(&req.columns, &req.default_columns).to_vec();
    if req.columns.is_empty() {
        debug!("no columns selected; using defaults");
    }
    let preview = query::preview(ds, &columns, req.preview_rows)?;

    let null_ratios = req
        .null_columns
        .iter()
        .map(|c| {
            Ok(ColumnNullRatio {
                column: c.clone(),
                ratio: query::null_ratio(ds, c)?,
            })
        })
        .collect::<Result<Vec<_>, QueryError>>()?;
    let null_trend = query::null_ratio_by_date(ds, &req.null_columns)?;

    let top_sales = query::top_n(ds, Measure::SalesAmt, req.top_n);
    let top_audience = query::top_n(ds, Measure::AudiCnt, req.top_n);

    let range = req.range.unwrap_or_else(|| match ds.date_bounds() {
        Some((lo, hi)) => DateRange::between(lo, hi),
        None => DateRange::default(),
    });
    let audience = query::audience_by_date_flag_nation(ds, range);
    let audience_by_flag = audience.by_multi_flag();
    let audience_by_nation = audience.by_nation();

    let movie = match req.movie.as_deref() {
        Some("") => None,
        Some(name) => Some(name.to_string()),
        None => ds.movie_names().first().map(|s| s.to_string()),
    }
    .map(|name| query::movie_series(ds, &name));

    info!(
        rows = ds.len(),
        ranked = top_sales.rows.len(),
        series = audience.rows.len(),
        movie = movie.as_ref().map(|m| m.movie_nm.as_str()).unwrap_or("-"),
        "report built"
    );

    Ok(DashboardReport {
        rows: ds.len(),
        columns,
        preview,
        null_ratios,
        null_trend,
        top_sales,
        top_audience,
        audience,
        audience_by_flag,
        audience_by_nation,
        movie,
    })
}

fn serialize_batch<S: Serializer>(batch: &RecordBatch, serializer: S) -> Result<S::Ok, S::Error> {
    render::batch_to_json_rows(batch)
        .map_err(serde::ser::Error::custom)?
        .serialize(serializer)
}
