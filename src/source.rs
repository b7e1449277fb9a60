use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Instant;

use polars::prelude::*;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::domain::RecsError;
use crate::record::{Record, Value};

#[derive(Debug)]
enum FileType {
    JSON,
    CSV,
}

/// A loaded record collection: the file stem as display name, the field
/// names in source order, and the records themselves.
#[derive(Debug)]
pub struct Collection {
    pub name: String,
    pub fields: Vec<String>,
    pub records: Vec<Record>,
}

pub fn load_collection(path: &Path) -> Result<Collection, RecsError> {
    let file_type = get_file_type(path)?;
    let start_time = Instant::now();

    let (fields, records) = match file_type {
        FileType::JSON => load_json(path)?,
        FileType::CSV => load_csv(path)?,
    };

    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("???")
        .to_string();

    info!(
        "Loaded {} records ({} fields) from {} in {}ms",
        records.len(),
        fields.len(),
        path.display(),
        start_time.elapsed().as_millis()
    );

    Ok(Collection {
        name,
        fields,
        records,
    })
}

fn get_file_type(path: &Path) -> Result<FileType, RecsError> {
    let metadata = fs::metadata(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => RecsError::FileNotFound,
        ErrorKind::PermissionDenied => RecsError::PermissionDenied,
        _ => RecsError::IoError(e),
    })?;
    if !metadata.is_file() {
        return Err(RecsError::LoadingFailed("Not a file!".into()));
    }

    detect_file_type(path)
}

fn detect_file_type(path: &Path) -> Result<FileType, RecsError> {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_uppercase())
        .as_deref()
    {
        Some("JSON") => Ok(FileType::JSON),
        Some("CSV") => Ok(FileType::CSV),
        _ => Err(RecsError::UnknownFileType),
    }
}

/// A json collection is either an array of objects, or an object wrapping
/// one ({"count": n, "results": [...]}), as the backend api serves them.
/// Field order is first-seen across the document.
fn load_json(path: &Path) -> Result<(Vec<String>, Vec<Record>), RecsError> {
    let text = fs::read_to_string(path)?;
    let document: serde_json::Value = serde_json::from_str(&text)?;

    let rows = match document {
        serde_json::Value::Array(rows) => rows,
        // A null document is an empty collection, not an error
        serde_json::Value::Null => Vec::new(),
        serde_json::Value::Object(map) => map
            .into_iter()
            .find_map(|(_, value)| match value {
                serde_json::Value::Array(rows) => Some(rows),
                _ => None,
            })
            .ok_or_else(|| {
                RecsError::LoadingFailed("No record array in json document!".into())
            })?,
        _ => {
            return Err(RecsError::LoadingFailed(
                "Json document is not a record collection!".into(),
            ));
        }
    };

    let mut fields: Vec<String> = Vec::new();
    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let serde_json::Value::Object(map) = row else {
            return Err(RecsError::LoadingFailed(
                "Record collections must contain json objects!".into(),
            ));
        };
        let mut record = Record::new();
        for (key, value) in map.iter() {
            if !fields.iter().any(|f| f == key) {
                fields.push(key.clone());
            }
            record.set(key.clone(), Value::from_json(value));
        }
        records.push(record);
    }

    Ok((fields, records))
}

/// Load a csv through the polars lazy reader and convert every column to
/// Values, each column on its own thread. The column dtype decides the
/// Value variant; missing cells become null.
fn load_csv(path: &Path) -> Result<(Vec<String>, Vec<Record>), RecsError> {
    let frame = LazyCsvReader::new(PlPath::Local(path.into()))
        .with_has_header(true)
        .finish()?;
    let df = frame.collect()?;

    let fields: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();

    let c_: Result<Vec<Vec<Value>>, PolarsError> = df
        .get_column_names()
        .par_iter()
        .map(|name| load_column(&df, name))
        .collect();
    let columns = c_?;

    for (field, column) in fields.iter().zip(columns.iter()) {
        debug!("Column \"{}\": {} rows", field, column.len());
    }

    let mut records = Vec::with_capacity(df.height());
    for ridx in 0..df.height() {
        let record: Record = fields
            .iter()
            .cloned()
            .zip(columns.iter().map(|column| column[ridx].clone()))
            .collect();
        records.push(record);
    }

    Ok((fields, records))
}

fn is_numeric_type(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

fn load_column(df: &DataFrame, name: &str) -> Result<Vec<Value>, PolarsError> {
    let column = df.column(name)?;

    if *column.dtype() == DataType::Boolean {
        let series = column.bool()?;
        return Ok(series
            .into_iter()
            .map(|v| v.map(Value::Bool).unwrap_or(Value::Null))
            .collect());
    }

    if is_numeric_type(column.dtype()) {
        let cast = column.cast(&DataType::Float64)?;
        let series = cast.f64()?;
        return Ok(series
            .into_iter()
            .map(|v| v.map(Value::Num).unwrap_or(Value::Null))
            .collect());
    }

    let cast = column.cast(&DataType::String)?;
    let series = cast.str()?;
    Ok(series
        .into_iter()
        .map(|v| match v {
            Some(s) => Value::Str(s.replace("\r\n", " ↵ ").replace('\n', " ↵ ")),
            None => Value::Null,
        })
        .collect())
}
