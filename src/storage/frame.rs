//! Turns raw JSON payloads into flat polars frames.
//!
//! Two payload shapes exist: history sends a list of (possibly nested) record
//! objects, forecasts send a single object of parallel arrays.

use crate::storage::error::StorageError;
use polars::prelude::*;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Flattens a list of JSON objects into a frame, one row per object.
///
/// Nested objects become `parent.child` columns. Columns appear in the order
/// they are first seen; a key missing from a record is null in that row.
pub fn normalize_records(records: &[Value]) -> Result<DataFrame, StorageError> {
    let mut names: Vec<String> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut rows: Vec<HashMap<usize, Value>> = Vec::with_capacity(records.len());

    for (i, record) in records.iter().enumerate() {
        let object = record.as_object().ok_or_else(|| {
            StorageError::MalformedPayload(format!("record {i} is not a JSON object"))
        })?;

        let mut flat = Vec::new();
        flatten_into("", object, &mut flat);

        let mut row = HashMap::with_capacity(flat.len());
        for (name, value) in flat {
            let position = match positions.get(&name) {
                Some(&position) => position,
                None => {
                    names.push(name.clone());
                    positions.insert(name, names.len() - 1);
                    names.len() - 1
                }
            };
            row.insert(position, value);
        }
        rows.push(row);
    }

    let columns = names
        .iter()
        .enumerate()
        .map(|(position, name)| {
            let values: Vec<Option<&Value>> = rows
                .iter()
                .map(|row| row.get(&position).filter(|v| !v.is_null()))
                .collect();
            json_series(name, &values).into()
        })
        .collect::<Vec<Column>>();

    if columns.is_empty() {
        return Ok(DataFrame::empty());
    }
    Ok(DataFrame::new(columns)?)
}

/// Builds a frame from a column-oriented object (`{"col": [v0, v1, ...], ...}`).
///
/// Scalar fields are repeated on every row. All array fields must have the same length.
pub fn columns_frame(object: &Map<String, Value>) -> Result<DataFrame, StorageError> {
    let mut height: Option<usize> = None;
    for (name, value) in object {
        if let Value::Array(values) = value {
            match height {
                None => height = Some(values.len()),
                Some(h) if h != values.len() => {
                    return Err(StorageError::MalformedPayload(format!(
                        "field '{}' has {} values, expected {}",
                        name,
                        values.len(),
                        h
                    )))
                }
                Some(_) => {}
            }
        }
    }

    let Some(height) = height else {
        if object.is_empty() {
            return Ok(DataFrame::empty());
        }
        return Err(StorageError::MalformedPayload(
            "no array fields to build rows from".to_string(),
        ));
    };

    let columns = object
        .iter()
        .map(|(name, value)| {
            let values: Vec<Option<&Value>> = match value {
                Value::Array(values) => values
                    .iter()
                    .map(|v| Some(v).filter(|v| !v.is_null()))
                    .collect(),
                scalar => vec![Some(scalar).filter(|v| !v.is_null()); height],
            };
            json_series(name, &values).into()
        })
        .collect::<Vec<Column>>();

    Ok(DataFrame::new(columns)?)
}

/// Removes `prefix` from the start of every column name that carries it.
pub fn strip_prefix(frame: &mut DataFrame, prefix: &str) -> Result<(), StorageError> {
    let names: Vec<String> = frame
        .get_column_names()
        .into_iter()
        .map(|name| {
            let name = name.as_str();
            name.strip_prefix(prefix).unwrap_or(name).to_string()
        })
        .collect();
    frame.set_column_names(names)?;
    Ok(())
}

fn flatten_into(prefix: &str, object: &Map<String, Value>, out: &mut Vec<(String, Value)>) {
    for (key, value) in object {
        let name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            Value::Object(inner) => flatten_into(&name, inner, out),
            other => out.push((name, other.clone())),
        }
    }
}

/// Picks the narrowest dtype holding every non-null value of a JSON column.
fn json_series(name: &str, values: &[Option<&Value>]) -> Series {
    let mut present = values.iter().flatten().peekable();
    if present.peek().is_none() {
        return Series::full_null(name.into(), values.len(), &DataType::String);
    }

    if values.iter().flatten().all(|v| v.is_i64()) {
        let ints: Vec<Option<i64>> = values.iter().map(|v| v.and_then(Value::as_i64)).collect();
        Series::new(name.into(), ints)
    } else if values.iter().flatten().all(|v| v.is_number()) {
        let floats: Vec<Option<f64>> = values.iter().map(|v| v.and_then(Value::as_f64)).collect();
        Series::new(name.into(), floats)
    } else if values.iter().flatten().all(|v| v.is_boolean()) {
        let bools: Vec<Option<bool>> = values.iter().map(|v| v.and_then(Value::as_bool)).collect();
        Series::new(name.into(), bools)
    } else {
        let texts: Vec<Option<String>> = values
            .iter()
            .map(|v| {
                v.map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
            })
            .collect();
        Series::new(name.into(), texts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_records_flattens_nested_objects() -> Result<(), Box<dyn std::error::Error>> {
        let records = vec![
            json!({"obsTimeLocal": "2023-03-10 00:04:59", "epoch": 1678406699, "metric": {"tempAvg": 11.2, "pressureMax": 1012}}),
            json!({"obsTimeLocal": "2023-03-10 01:04:59", "epoch": 1678410299, "metric": {"tempAvg": 10.9, "pressureMax": null}, "qcStatus": 1}),
        ];

        let df = normalize_records(&records)?;

        assert_eq!(df.shape(), (2, 5));
        assert_eq!(
            df.get_column_names(),
            ["obsTimeLocal", "epoch", "metric.tempAvg", "metric.pressureMax", "qcStatus"]
        );
        assert_eq!(df.column("epoch")?.dtype(), &DataType::Int64);
        assert_eq!(df.column("metric.tempAvg")?.dtype(), &DataType::Float64);
        assert_eq!(df.column("metric.pressureMax")?.null_count(), 1);
        assert_eq!(df.column("qcStatus")?.null_count(), 1);
        assert_eq!(
            df.column("obsTimeLocal")?.str()?.get(1),
            Some("2023-03-10 01:04:59")
        );
        Ok(())
    }

    #[test]
    fn test_normalize_records_empty_and_invalid() {
        let df = normalize_records(&[]).unwrap();
        assert_eq!(df.height(), 0);

        let err = normalize_records(&[json!(3)]).unwrap_err();
        assert!(matches!(err, StorageError::MalformedPayload(_)));
    }

    #[test]
    fn test_mixed_numbers_widen_to_float_and_mixed_types_to_text() -> Result<(), Box<dyn std::error::Error>> {
        let records = vec![
            json!({"a": 1, "b": true, "c": "x"}),
            json!({"a": 1.5, "b": false, "c": 2}),
        ];
        let df = normalize_records(&records)?;
        assert_eq!(df.column("a")?.dtype(), &DataType::Float64);
        assert_eq!(df.column("b")?.dtype(), &DataType::Boolean);
        assert_eq!(df.column("c")?.dtype(), &DataType::String);
        assert_eq!(df.column("c")?.str()?.get(1), Some("2"));
        Ok(())
    }

    #[test]
    fn test_columns_frame() -> Result<(), Box<dyn std::error::Error>> {
        let payload = json!({
            "validTimeLocal": ["2023-01-08T01:00:00+0200", "2023-01-08T02:00:00+0200"],
            "temperature": [12, 11],
            "wxPhraseLong": ["Clear", null],
        });
        let df = columns_frame(payload.as_object().unwrap())?;
        assert_eq!(df.shape(), (2, 3));
        assert_eq!(df.column("temperature")?.dtype(), &DataType::Int64);
        assert_eq!(df.column("wxPhraseLong")?.null_count(), 1);
        Ok(())
    }

    #[test]
    fn test_columns_frame_rejects_ragged_arrays() {
        let payload = json!({"validTimeLocal": ["a", "b"], "temperature": [1]});
        let err = columns_frame(payload.as_object().unwrap()).unwrap_err();
        assert!(matches!(err, StorageError::MalformedPayload(_)));
    }

    #[test]
    fn test_strip_prefix() -> Result<(), Box<dyn std::error::Error>> {
        let records = vec![json!({"obsTimeLocal": "t", "metric": {"tempAvg": 1.0}})];
        let mut df = normalize_records(&records)?;
        strip_prefix(&mut df, "metric.")?;
        assert_eq!(df.get_column_names(), ["obsTimeLocal", "tempAvg"]);
        Ok(())
    }
}
