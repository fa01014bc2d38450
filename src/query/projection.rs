use arrow::record_batch::RecordBatch;

use crate::dataset::Dataset;
use crate::error::QueryError;

/// The columns to show: the requested ones, or `default` when nothing was picked.
pub fn column_projection<'a, T>(requested: &'a [T], default: &'a [T]) -> &'a [T] {
    if requested.is_empty() {
        default
    } else {
        requested
    }
}

/// First `limit` rows of `columns`, in the order given.
pub fn preview<S: AsRef<str>>(
    ds: &Dataset,
    columns: &[S],
    limit: usize,
) -> Result<RecordBatch, QueryError> {
    let schema = ds.table().schema();
    let indices = columns
        .iter()
        .map(|c| {
            schema
                .index_of(c.as_ref())
                .map_err(|_| QueryError::UnknownColumn(c.as_ref().to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let projected = ds.table().project(&indices)?;
    Ok(projected.slice(0, limit.min(projected.num_rows())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::fixtures::scenario;
    use arrow::array::{Array, StringArray};

    #[test]
    fn empty_selection_falls_back_to_default() {
        let default = vec!["dt".to_string(), "movieNm".to_string()];
        let none: Vec<String> = Vec::new();
        assert_eq!(column_projection(&none, &default), default.as_slice());

        let picked = vec!["rank".to_string()];
        assert_eq!(column_projection(&picked, &default), picked.as_slice());
    }

    #[test]
    fn preview_projects_and_limits() {
        let ds = scenario();
        let batch = preview(&ds, &["movieNm", "dt"], 2).unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.num_columns(), 2);
        assert_eq!(batch.schema().field(0).name(), "movieNm");
        let names = batch
            .column(0)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(names.value(1), "B");

        let all = preview(&ds, &["rank"], 50).unwrap();
        assert_eq!(all.num_rows(), 3);
        assert_eq!(all.column(0).len(), 3);
    }

    #[test]
    fn preview_rejects_unknown_columns() {
        let ds = scenario();
        match preview(&ds, &["boxOfficeType"], 5) {
            Err(QueryError::UnknownColumn(c)) => assert_eq!(c, "boxOfficeType"),
            other => panic!("expected UnknownColumn, got {:?}", other),
        }
    }
}
