// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Metrics reported by a training run via `metrics.json`.

use serde_json::{Map, Value};
use thiserror::Error;

/// File name the training process writes its metrics to, inside the output mount.
pub const METRICS_FILE: &str = "metrics.json";

/// Reported metrics: a flat JSON object, values uninterpreted.
pub type Metrics = Map<String, Value>;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("metrics are not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("metrics must be a JSON object, got {0}")]
    NotAnObject(&'static str),
}

/// Parse the contents of a metrics file.
pub fn parse_metrics(bytes: &[u8]) -> Result<Metrics, MetricsError> {
    match serde_json::from_slice::<Value>(bytes)? {
        Value::Object(map) => Ok(map),
        Value::Null => Err(MetricsError::NotAnObject("null")),
        Value::Bool(_) => Err(MetricsError::NotAnObject("bool")),
        Value::Number(_) => Err(MetricsError::NotAnObject("number")),
        Value::String(_) => Err(MetricsError::NotAnObject("string")),
        Value::Array(_) => Err(MetricsError::NotAnObject("array")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_object() {
        let metrics = parse_metrics(br#"{"acc":0.9,"loss":0.1}"#).unwrap();
        assert_eq!(metrics.get("acc").and_then(Value::as_f64), Some(0.9));
        assert_eq!(metrics.len(), 2);
    }

    #[yare::parameterized(
        array  = { "[1,2]",   "array" },
        number = { "42",      "number" },
        null   = { "null",    "null" },
    )]
    fn rejects_non_objects(input: &str, kind: &str) {
        match parse_metrics(input.as_bytes()) {
            Err(MetricsError::NotAnObject(k)) => assert_eq!(k, kind),
            other => panic!("expected NotAnObject, got {:?}", other),
        }
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            parse_metrics(b"{not json"),
            Err(MetricsError::Json(_))
        ));
    }
}
