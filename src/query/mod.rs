// src/query/mod.rs

pub mod movie;
pub mod null_ratio;
pub mod projection;
pub mod ranking;
pub mod timeseries;

use arrow::{
    array::{ArrayRef, Date32Array},
    datatypes::SchemaRef,
    record_batch::RecordBatch,
};
use chrono::NaiveDate;
use std::sync::Arc;

use crate::dataset::date_parser::to_epoch_days;
use crate::error::QueryError;

pub use movie::{movie_series, MovieSeries, MovieSeriesRow};
pub use null_ratio::{null_ratio, null_ratio_by_date, NullRatioRow, NullRatioTable};
pub use projection::{column_projection, preview};
pub use ranking::{top_n, Measure, RankedMovie, Ranking, DEFAULT_TOP_N};
pub use timeseries::{audience_by_date_flag_nation, AudienceRow, AudienceSeries, CategoryPoint, DateRange};

/// A query result the presentation layer can take as an Arrow table.
///
/// Implementors define the column layout once; `to_record_batch` stitches
/// schema and arrays together.
pub trait ToRecordBatch {
    /// Arrow schema of the result table.
    fn schema(&self) -> SchemaRef;
    /// Column arrays matching [`ToRecordBatch::schema`].
    fn to_arrays(&self) -> Vec<ArrayRef>;

    fn to_record_batch(&self) -> Result<RecordBatch, QueryError> {
        Ok(RecordBatch::try_new(self.schema(), self.to_arrays())?)
    }
}

pub(crate) fn date_array(dates: impl Iterator<Item = Option<NaiveDate>>) -> ArrayRef {
    Arc::new(dates.map(|d| d.map(to_epoch_days)).collect::<Date32Array>())
}
