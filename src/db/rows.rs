use chrono::{DateTime, NaiveTime, Utc};
use duckdb::types::{TimeUnit, ValueRef};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Tagged scalar union for dynamically-typed query results. Keeps
/// serialization to the caller deterministic instead of leaning on an open
/// "any" type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
}

fn to_micros(unit: &TimeUnit, value: i64) -> i64 {
    match unit {
        TimeUnit::Second => value.saturating_mul(1_000_000),
        TimeUnit::Millisecond => value.saturating_mul(1_000),
        TimeUnit::Microsecond => value,
        TimeUnit::Nanosecond => value / 1_000,
    }
}

impl From<ValueRef<'_>> for SqlValue {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => SqlValue::Null,
            ValueRef::Boolean(b) => SqlValue::Boolean(b),
            ValueRef::TinyInt(i) => SqlValue::Integer(i64::from(i)),
            ValueRef::SmallInt(i) => SqlValue::Integer(i64::from(i)),
            ValueRef::Int(i) => SqlValue::Integer(i64::from(i)),
            ValueRef::BigInt(i) => SqlValue::Integer(i),
            ValueRef::HugeInt(i) => match i64::try_from(i) {
                Ok(v) => SqlValue::Integer(v),
                Err(_) => SqlValue::Text(i.to_string()),
            },
            ValueRef::UTinyInt(i) => SqlValue::Integer(i64::from(i)),
            ValueRef::USmallInt(i) => SqlValue::Integer(i64::from(i)),
            ValueRef::UInt(i) => SqlValue::Integer(i64::from(i)),
            ValueRef::UBigInt(i) => match i64::try_from(i) {
                Ok(v) => SqlValue::Integer(v),
                Err(_) => SqlValue::Text(i.to_string()),
            },
            ValueRef::Float(f) => SqlValue::Float(f64::from(f)),
            ValueRef::Double(f) => SqlValue::Float(f),
            ValueRef::Decimal(d) => {
                let rendered = d.to_string();
                match rendered.parse::<f64>() {
                    Ok(f) => SqlValue::Float(f),
                    Err(_) => SqlValue::Text(rendered),
                }
            }
            ValueRef::Text(bytes) => SqlValue::Text(String::from_utf8_lossy(bytes).into_owned()),
            ValueRef::Blob(bytes) => {
                let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
                SqlValue::Text(hex)
            }
            ValueRef::Timestamp(unit, raw) => {
                match DateTime::from_timestamp_micros(to_micros(&unit, raw)) {
                    Some(ts) => SqlValue::Timestamp(ts),
                    None => SqlValue::Null,
                }
            }
            ValueRef::Date32(days) => {
                match DateTime::from_timestamp(i64::from(days) * 86_400, 0) {
                    Some(ts) => SqlValue::Timestamp(ts),
                    None => SqlValue::Null,
                }
            }
            ValueRef::Time64(unit, raw) => {
                let micros = to_micros(&unit, raw);
                let secs = (micros / 1_000_000) as u32;
                let nanos = ((micros % 1_000_000) * 1_000) as u32;
                match NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos) {
                    Some(t) => SqlValue::Text(t.to_string()),
                    None => SqlValue::Null,
                }
            }
            // Nested and interval types fall back to their debug rendering
            other => SqlValue::Text(format!("{:?}", other)),
        }
    }
}

/// One query result row: column names and values in the order the store
/// returned them. Serializes as a JSON object preserving that order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    columns: Vec<(String, SqlValue)>,
}

impl ResultRow {
    pub fn new(columns: Vec<(String, SqlValue)>) -> Self {
        Self { columns }
    }

    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, value)| value)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(column, _)| column.as_str())
    }
}

impl Serialize for ResultRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (column, value) in &self.columns {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_object_in_column_order() {
        let row = ResultRow::new(vec![
            ("z_last".to_string(), SqlValue::Integer(1)),
            ("a_first".to_string(), SqlValue::Text("x".to_string())),
        ]);
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"z_last":1,"a_first":"x"}"#);
    }

    #[test]
    fn scalar_variants_serialize_to_plain_json_values() {
        let row = ResultRow::new(vec![
            ("n".to_string(), SqlValue::Null),
            ("b".to_string(), SqlValue::Boolean(true)),
            ("f".to_string(), SqlValue::Float(2.5)),
        ]);
        let json = serde_json::to_value(&row).unwrap();
        assert!(json["n"].is_null());
        assert_eq!(json["b"], true);
        assert_eq!(json["f"], 2.5);
    }

    #[test]
    fn get_finds_columns_by_name() {
        let row = ResultRow::new(vec![("part_id".to_string(), SqlValue::Integer(7))]);
        assert_eq!(row.get("part_id"), Some(&SqlValue::Integer(7)));
        assert_eq!(row.get("missing"), None);
    }

    #[test]
    fn timestamp_serializes_rfc3339() {
        let ts = DateTime::from_timestamp(86_400, 0).unwrap();
        let row = ResultRow::new(vec![("t".to_string(), SqlValue::Timestamp(ts))]);
        let json = serde_json::to_value(&row).unwrap();
        let rendered = json["t"].as_str().unwrap();
        assert!(rendered.starts_with("1970-01-02T00:00:00"));
    }
}
