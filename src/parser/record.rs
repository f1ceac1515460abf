use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::collections::HashMap;

use crate::schema::{ColumnType, TableSchema};

/// A parsed row ready for insertion
#[derive(Debug)]
pub struct ParsedRow {
    pub values: HashMap<String, SqlValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Text(String),
}

impl SqlValue {
    pub fn bind_to(&self, idx: usize, stmt: &mut rusqlite::Statement) -> rusqlite::Result<()> {
        match self {
            SqlValue::Null => stmt.raw_bind_parameter(idx, rusqlite::types::Null)?,
            SqlValue::Integer(i) => stmt.raw_bind_parameter(idx, i)?,
            SqlValue::Text(s) => stmt.raw_bind_parameter(idx, s.as_str())?,
        }
        Ok(())
    }
}

/// Parse a JSON line into a row for the given table schema.
/// Required columns that come out NULL are rejected here rather than by
/// the NOT NULL constraint, so the error names the field.
pub fn parse_record(line: &str, schema: &TableSchema) -> Result<ParsedRow> {
    let json: Value = serde_json::from_str(line).context("Failed to parse JSON")?;

    if !json.is_object() {
        bail!("Expected a JSON object, got: {}", json);
    }

    let mut values = HashMap::new();

    for col in schema.columns {
        let value = extract_value(&json, col.name, col.col_type)
            .with_context(|| format!("Invalid field '{}' for {}", col.name, schema.name))?;
        if value == SqlValue::Null && !col.nullable {
            bail!("Missing required field '{}' for {}", col.name, schema.name);
        }
        values.insert(col.name.to_string(), value);
    }

    Ok(ParsedRow { values })
}

fn extract_value(json: &Value, key: &str, col_type: ColumnType) -> Result<SqlValue> {
    let Some(v) = json.get(key).filter(|v| !v.is_null()) else {
        return Ok(SqlValue::Null);
    };

    let value = match col_type {
        // Raw exports sometimes quote ids ("7") or leave them blank ("")
        ColumnType::Integer => match v {
            Value::Number(n) => match n.as_i64() {
                Some(i) => SqlValue::Integer(i),
                None => bail!("expected an integer id, got {}", n),
            },
            Value::String(s) if s.trim().is_empty() => SqlValue::Null,
            Value::String(s) => match s.trim().parse() {
                Ok(i) => SqlValue::Integer(i),
                Err(_) => bail!("expected an integer id, got {:?}", s),
            },
            other => bail!("expected an integer id, got {}", other),
        },
        ColumnType::Text => match v {
            Value::String(s) => SqlValue::Text(s.clone()),
            other => SqlValue::Text(other.to_string()),
        },
    };

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{POKEMON, TYPES};

    #[test]
    fn test_parse_pokemon_with_optional_type() {
        let row = parse_record(
            r#"{"id": 4, "name": "Bulbasaur", "type1_id": 4, "type2_id": 5}"#,
            &POKEMON,
        )
        .unwrap();
        assert_eq!(row.values["id"], SqlValue::Integer(4));
        assert_eq!(row.values["name"], SqlValue::Text("Bulbasaur".into()));
        assert_eq!(row.values["type2_id"], SqlValue::Integer(5));

        let row =
            parse_record(r#"{"id": 1, "name": "Pikachu", "type1_id": "1"}"#, &POKEMON).unwrap();
        assert_eq!(row.values["type1_id"], SqlValue::Integer(1));
        assert_eq!(row.values["type2_id"], SqlValue::Null);
    }

    #[test]
    fn test_blank_optional_id_is_null() {
        let row = parse_record(
            r#"{"id": 2, "name": "Charmander", "type1_id": 2, "type2_id": ""}"#,
            &POKEMON,
        )
        .unwrap();
        assert_eq!(row.values["type2_id"], SqlValue::Null);

        let row = parse_record(
            r#"{"id": 2, "name": "Charmander", "type1_id": 2, "type2_id": "  "}"#,
            &POKEMON,
        )
        .unwrap();
        assert_eq!(row.values["type2_id"], SqlValue::Null);
    }

    #[test]
    fn test_unparsable_id_names_the_field() {
        for bad in [r#""x""#, "1.5", "true", r#"{"id": 5}"#] {
            let line = format!(
                r#"{{"id": 2, "name": "Charmander", "type1_id": 2, "type2_id": {}}}"#,
                bad
            );
            let err = parse_record(&line, &POKEMON).unwrap_err();
            assert!(err.to_string().contains("type2_id"), "{}: {:#}", bad, err);
        }

        let err = parse_record(r#"{"id": "one", "name": "Fire"}"#, &TYPES).unwrap_err();
        assert!(err.to_string().contains("'id'"), "{:#}", err);
    }

    #[test]
    fn test_missing_required_field_is_error() {
        assert!(parse_record(r#"{"id": 1}"#, &TYPES).is_err());
        assert!(parse_record(r#"{"name": "Fire"}"#, &TYPES).is_err());
    }

    #[test]
    fn test_non_object_line_is_error() {
        assert!(parse_record("[1, 2]", &TYPES).is_err());
        assert!(parse_record("not json", &TYPES).is_err());
    }
}
