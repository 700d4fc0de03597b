//! PostgreSQL type mappings.
//!
//! Rows are decoded into column-name keyed JSON maps, which serde then binds
//! to caller types by field name.
//!
//! # Architecture
//!
//! Type conversion uses a two-phase approach:
//! 1. `TypeCategory` classifies column types into logical categories
//! 2. Per-category decoders extract the value
//!
//! Unlike a display-oriented decoder, a value that cannot be decoded is an
//! error, never a silent NULL.

use serde_json::Value as JsonValue;
use sqlx::postgres::{PgRow, PgTypeInfo, PgValueRef};
use sqlx::{Column, Decode, Row, Type, TypeInfo};

// =============================================================================
// Type Classification
// =============================================================================

/// Logical category for database column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    SmallInt,
    Integer,
    BigInt,
    Real,
    Double,
    Decimal,
    Boolean,
    Text,
    Binary,
    Json,
    Uuid,
    Timestamp,
    TimestampTz,
    Date,
    Time,
    Unknown,
}

/// Classify a PostgreSQL type name into a logical category.
pub fn categorize_type(type_name: &str) -> TypeCategory {
    match type_name.to_lowercase().as_str() {
        "int2" | "smallint" | "smallserial" => TypeCategory::SmallInt,
        "int4" | "int" | "integer" | "serial" => TypeCategory::Integer,
        "int8" | "bigint" | "bigserial" => TypeCategory::BigInt,
        "float4" | "real" => TypeCategory::Real,
        "float8" | "double precision" => TypeCategory::Double,
        "numeric" | "decimal" => TypeCategory::Decimal,
        "bool" | "boolean" => TypeCategory::Boolean,
        "text" | "varchar" | "character varying" | "char" | "character" | "bpchar" | "name"
        | "citext" => TypeCategory::Text,
        "bytea" => TypeCategory::Binary,
        "json" | "jsonb" => TypeCategory::Json,
        "uuid" => TypeCategory::Uuid,
        "timestamp" => TypeCategory::Timestamp,
        "timestamptz" => TypeCategory::TimestampTz,
        "date" => TypeCategory::Date,
        "time" => TypeCategory::Time,
        _ => TypeCategory::Unknown,
    }
}

// =============================================================================
// Decimal Type Support
// =============================================================================

/// Wrapper type for raw NUMERIC values as strings.
/// This preserves the exact database representation.
#[derive(Debug)]
pub struct RawDecimal(pub String);

impl Type<sqlx::Postgres> for RawDecimal {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_name("numeric")
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        let name = ty.name().to_lowercase();
        name == "numeric" || name == "decimal"
    }
}

impl<'r> Decode<'r, sqlx::Postgres> for RawDecimal {
    fn decode(value: PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let big = <sqlx::types::BigDecimal as Decode<sqlx::Postgres>>::decode(value)?;
        Ok(RawDecimal(big.to_string()))
    }
}

// =============================================================================
// Row to JSON Trait
// =============================================================================

/// Trait for converting database rows to JSON maps.
pub trait RowToJson {
    fn to_json_map(&self) -> Result<serde_json::Map<String, JsonValue>, sqlx::Error>;
}

impl RowToJson for PgRow {
    fn to_json_map(&self) -> Result<serde_json::Map<String, JsonValue>, sqlx::Error> {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let category = categorize_type(col.type_info().name());
                decode_column(self, idx, category).map(|value| (col.name().to_string(), value))
            })
            .collect()
    }
}

// =============================================================================
// Decoders
// =============================================================================

fn decode_column(row: &PgRow, idx: usize, category: TypeCategory) -> Result<JsonValue, sqlx::Error> {
    match category {
        TypeCategory::SmallInt => decode_as::<i16>(row, idx),
        TypeCategory::Integer => decode_as::<i32>(row, idx),
        TypeCategory::BigInt => decode_as::<i64>(row, idx),
        TypeCategory::Real => decode_float(row.try_get::<Option<f32>, _>(idx)?.map(f64::from)),
        TypeCategory::Double => decode_float(row.try_get::<Option<f64>, _>(idx)?),
        TypeCategory::Decimal => Ok(row
            .try_get::<Option<RawDecimal>, _>(idx)?
            .map_or(JsonValue::Null, |v| JsonValue::String(v.0))),
        TypeCategory::Boolean => decode_as::<bool>(row, idx),
        // bytea becomes an array of numbers so it binds to Vec<u8>
        TypeCategory::Binary => decode_as::<Vec<u8>>(row, idx),
        TypeCategory::Json => Ok(row
            .try_get::<Option<JsonValue>, _>(idx)?
            .unwrap_or(JsonValue::Null)),
        TypeCategory::Uuid => decode_as::<uuid::Uuid>(row, idx),
        TypeCategory::Timestamp => decode_as::<chrono::NaiveDateTime>(row, idx),
        TypeCategory::TimestampTz => decode_as::<chrono::DateTime<chrono::Utc>>(row, idx),
        TypeCategory::Date => decode_as::<chrono::NaiveDate>(row, idx),
        TypeCategory::Time => decode_as::<chrono::NaiveTime>(row, idx),
        TypeCategory::Text | TypeCategory::Unknown => decode_as::<String>(row, idx),
    }
}

/// Decode a nullable column through its serde representation.
fn decode_as<T>(row: &PgRow, idx: usize) -> Result<JsonValue, sqlx::Error>
where
    T: for<'r> Decode<'r, sqlx::Postgres> + Type<sqlx::Postgres> + serde::Serialize,
{
    match row.try_get::<Option<T>, _>(idx)? {
        Some(v) => serde_json::to_value(v).map_err(|e| sqlx::Error::ColumnDecode {
            index: idx.to_string(),
            source: Box::new(e),
        }),
        None => Ok(JsonValue::Null),
    }
}

fn decode_float(value: Option<f64>) -> Result<JsonValue, sqlx::Error> {
    Ok(match value {
        Some(v) => serde_json::Number::from_f64(v)
            .map(JsonValue::Number)
            .unwrap_or_else(|| JsonValue::String(v.to_string())),
        None => JsonValue::Null,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize_integers() {
        assert_eq!(categorize_type("INT2"), TypeCategory::SmallInt);
        assert_eq!(categorize_type("int4"), TypeCategory::Integer);
        assert_eq!(categorize_type("INT8"), TypeCategory::BigInt);
    }

    #[test]
    fn test_categorize_temporal() {
        assert_eq!(categorize_type("TIMESTAMPTZ"), TypeCategory::TimestampTz);
        assert_eq!(categorize_type("TIMESTAMP"), TypeCategory::Timestamp);
        assert_eq!(categorize_type("DATE"), TypeCategory::Date);
    }

    #[test]
    fn test_categorize_misc() {
        assert_eq!(categorize_type("NUMERIC"), TypeCategory::Decimal);
        assert_eq!(categorize_type("JSONB"), TypeCategory::Json);
        assert_eq!(categorize_type("UUID"), TypeCategory::Uuid);
        assert_eq!(categorize_type("BYTEA"), TypeCategory::Binary);
        assert_eq!(categorize_type("VARCHAR"), TypeCategory::Text);
        assert_eq!(categorize_type("inet"), TypeCategory::Unknown);
    }

    #[test]
    fn test_decode_float_non_finite() {
        assert_eq!(
            decode_float(Some(f64::NAN)).unwrap(),
            JsonValue::String("NaN".to_string())
        );
        assert_eq!(decode_float(None).unwrap(), JsonValue::Null);
        assert_eq!(decode_float(Some(1.5)).unwrap(), serde_json::json!(1.5));
    }
}
