// src/dataset/loader.rs

use arrow::{
    array::{new_null_array, ArrayRef, StringArray},
    compute::{cast, concat_batches},
    datatypes::{DataType, Field, Schema as ArrowSchema, SchemaRef},
    record_batch::RecordBatch,
};
use glob::glob;
use parquet::{arrow::arrow_reader::ParquetRecordBatchReaderBuilder, errors::ParquetError};
use rayon::prelude::*;
use std::{
    collections::HashMap,
    fs::File,
    io,
    path::{Path, PathBuf},
    sync::Arc,
    time::Instant,
};
use tracing::{debug, info, warn};

use super::Dataset;
use crate::error::LoadError;

/// Directory value hive writers use for a null partition key.
pub const HIVE_NULL_PARTITION: &str = "__HIVE_DEFAULT_PARTITION__";

/// One parquet file plus the `key=value` pairs encoded in its directory path.
/// A `None` value is a null partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionFile {
    pub path: PathBuf,
    pub keys: Vec<(String, Option<String>)>,
}

/// Read every partition under `root` into a single [`Dataset`].
///
/// `root` may be a hive-partitioned directory (`dt=20240101/part-0.parquet`)
/// or a single parquet file.
#[tracing::instrument(level = "info", skip(root), fields(root = %root.as_ref().display()))]
pub fn load_dataset<P: AsRef<Path>>(root: P) -> Result<Dataset, LoadError> {
    let root = root.as_ref();
    let start = Instant::now();

    let partitions = discover_partitions(root)?;
    info!(files = partitions.len(), "discovered partitions");

    // decode files in parallel; collect() keeps path order
    let parts = partitions
        .par_iter()
        .map(read_partition)
        .collect::<Result<Vec<_>, _>>()?;

    let schema = unify_schemas(parts.iter().map(|(schema, _)| schema));
    let mut aligned = Vec::new();
    for (_, batches) in &parts {
        for batch in batches {
            aligned.push(align_batch(batch, &schema)?);
        }
    }
    let table = concat_batches(&schema, &aligned)?;

    let dataset = Dataset::from_table(table)?;
    info!(
        rows = dataset.len(),
        columns = dataset.table().num_columns(),
        elapsed = ?start.elapsed(),
        "dataset loaded"
    );
    Ok(dataset)
}

/// List the parquet files under `root`, sorted by path, with their partition keys.
///
/// Files and directories whose name starts with `.` or `_` (`_SUCCESS`,
/// `.part.crc`, `_temporary/`) are skipped.
pub fn discover_partitions(root: &Path) -> Result<Vec<PartitionFile>, LoadError> {
    if !root.exists() {
        return Err(LoadError::NotFound(root.to_path_buf()));
    }
    // glob drops a leading `./`, so match and strip against the resolved root
    let root = &root.canonicalize().map_err(|source| LoadError::Io {
        path: root.to_path_buf(),
        source,
    })?;
    if root.is_file() {
        return Ok(vec![PartitionFile {
            path: root.to_path_buf(),
            keys: Vec::new(),
        }]);
    }

    let pattern = format!("{}/**/*.parquet", glob::Pattern::escape(&root.to_string_lossy()));
    let mut files = Vec::new();
    for entry in glob(&pattern).map_err(|source| LoadError::Pattern {
        path: root.to_path_buf(),
        source,
    })? {
        let path = entry.map_err(|e| LoadError::Io {
            path: e.path().to_path_buf(),
            source: e.into_error(),
        })?;
        if !path.is_file() {
            continue;
        }
        let relative = path.strip_prefix(root).map_err(|_| LoadError::Io {
            path: path.clone(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "file outside dataset root"),
        })?;
        if relative.iter().any(|c| {
            let c = c.to_string_lossy();
            c.starts_with('.') || c.starts_with('_')
        }) {
            debug!(path = %path.display(), "skipping hidden file");
            continue;
        }
        let keys = partition_keys(relative);
        files.push(PartitionFile { path, keys });
    }

    if files.is_empty() {
        return Err(LoadError::NoPartitions(root.to_path_buf()));
    }
    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}

/// Parse `key=value` directory components of a path relative to the dataset root.
///
/// Values are percent-decoded; [`HIVE_NULL_PARTITION`] becomes `None`.
pub fn partition_keys(relative: &Path) -> Vec<(String, Option<String>)> {
    let Some(parent) = relative.parent() else {
        return Vec::new();
    };
    parent
        .iter()
        .filter_map(|c| {
            let c = c.to_string_lossy();
            let (k, v) = c.split_once('=')?;
            if k.is_empty() {
                return None;
            }
            let value = (v != HIVE_NULL_PARTITION).then(|| {
                urlencoding::decode(v)
                    .map(|d| d.into_owned())
                    .unwrap_or_else(|_| v.to_string())
            });
            Some((k.to_string(), value))
        })
        .collect()
}

/// Read one file; partition keys the file does not store become constant Utf8 columns.
fn read_partition(part: &PartitionFile) -> Result<(SchemaRef, Vec<RecordBatch>), LoadError> {
    let file = File::open(&part.path).map_err(|source| LoadError::Io {
        path: part.path.clone(),
        source,
    })?;
    let parquet_err = |source: ParquetError| LoadError::Parquet {
        path: part.path.clone(),
        source,
    };
    let builder = ParquetRecordBatchReaderBuilder::try_new(file).map_err(parquet_err)?;
    let file_schema = builder.schema().clone();
    let reader = builder.with_batch_size(8192).build().map_err(parquet_err)?;

    let extra: Vec<&(String, Option<String>)> = part
        .keys
        .iter()
        .filter(|(k, _)| file_schema.index_of(k).is_err())
        .collect();

    let mut fields: Vec<Field> = file_schema
        .fields()
        .iter()
        .map(|f| f.as_ref().clone())
        .collect();
    for (k, _) in &extra {
        fields.push(Field::new(k.as_str(), DataType::Utf8, true));
    }
    let schema = Arc::new(ArrowSchema::new(fields));

    let mut batches = Vec::new();
    for batch in reader {
        let batch = batch?;
        let mut arrays = batch.columns().to_vec();
        for (_, v) in &extra {
            let values = vec![v.as_deref(); batch.num_rows()];
            arrays.push(Arc::new(StringArray::from(values)) as ArrayRef);
        }
        batches.push(RecordBatch::try_new(Arc::clone(&schema), arrays)?);
    }

    let rows: usize = batches.iter().map(|b| b.num_rows()).sum();
    if rows == 0 {
        warn!(path = %part.path.display(), "partition file holds no rows");
    } else {
        debug!(path = %part.path.display(), rows, "read partition");
    }
    Ok((schema, batches))
}

/// Union of all fields in first-seen order; the first type seen for a name wins.
fn unify_schemas<'a>(schemas: impl Iterator<Item = &'a SchemaRef>) -> SchemaRef {
    let mut fields: Vec<Field> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for schema in schemas {
        for f in schema.fields() {
            if let Some(&i) = index.get(f.name()) {
                if fields[i].data_type() != f.data_type() {
                    warn!(
                        column = %f.name(),
                        expected = %fields[i].data_type(),
                        found = %f.data_type(),
                        "type mismatch across partitions; casting"
                    );
                }
                continue;
            }
            index.insert(f.name().clone(), fields.len());
            fields.push(Field::new(f.name(), f.data_type().clone(), true));
        }
    }
    Arc::new(ArrowSchema::new(fields))
}

/// Reorder, cast and null-fill `batch` to match `schema`.
fn align_batch(batch: &RecordBatch, schema: &SchemaRef) -> Result<RecordBatch, LoadError> {
    let columns = schema
        .fields()
        .iter()
        .map(|f| match batch.column_by_name(f.name()) {
            Some(col) if col.data_type() == f.data_type() => Ok(Arc::clone(col)),
            Some(col) => cast(col, f.data_type()),
            None => Ok(new_null_array(f.data_type(), batch.num_rows())),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(RecordBatch::try_new(Arc::clone(schema), columns)?)
}
