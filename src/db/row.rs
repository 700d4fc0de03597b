//! Row to record mapping.
//!
//! Result columns bind to destination fields by name. Two strategies are
//! offered:
//!
//! - [`ByName`]: any `serde::Deserialize` type. Columns without a matching
//!   field are ignored, missing `Option` fields become `None`.
//! - [`Derived`]: types deriving `sqlx::FromRow`, decoded by the driver.

use crate::db::types::RowToJson;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use sqlx::postgres::PgRow;
use std::marker::PhantomData;

/// Converts one result row into a destination record.
pub trait RowMapper<T>: Send + Sync {
    fn map_row(&self, row: &PgRow) -> Result<T, sqlx::Error>;
}

/// Name-based mapping through serde.
#[derive(Debug)]
pub struct ByName<T>(PhantomData<fn() -> T>);

impl<T> ByName<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for ByName<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DeserializeOwned> RowMapper<T> for ByName<T> {
    fn map_row(&self, row: &PgRow) -> Result<T, sqlx::Error> {
        let map = row.to_json_map()?;
        from_json_map(map)
    }
}

/// Driver-side mapping via `#[derive(sqlx::FromRow)]`.
#[derive(Debug)]
pub struct Derived<T>(PhantomData<fn() -> T>);

impl<T> Derived<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for Derived<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RowMapper<T> for Derived<T>
where
    T: for<'r> FromRow<'r, PgRow>,
{
    fn map_row(&self, row: &PgRow) -> Result<T, sqlx::Error> {
        T::from_row(row)
    }
}

/// Bind a decoded column map to a record.
pub(crate) fn from_json_map<T: DeserializeOwned>(
    map: serde_json::Map<String, JsonValue>,
) -> Result<T, sqlx::Error> {
    serde_json::from_value(JsonValue::Object(map)).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct User {
        id: i64,
        name: String,
        nickname: Option<String>,
    }

    fn map_of(value: JsonValue) -> serde_json::Map<String, JsonValue> {
        match value {
            JsonValue::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_extra_columns_are_ignored() {
        let user: User = from_json_map(map_of(json!({
            "id": 1,
            "name": "ada",
            "nickname": "countess",
            "created_at": "2024-01-01T00:00:00Z"
        })))
        .unwrap();
        assert_eq!(user.nickname.as_deref(), Some("countess"));
    }

    #[test]
    fn test_missing_optional_field_is_none() {
        let user: User = from_json_map(map_of(json!({"id": 1, "name": "ada"}))).unwrap();
        assert_eq!(
            user,
            User {
                id: 1,
                name: "ada".into(),
                nickname: None
            }
        );
    }

    #[test]
    fn test_type_mismatch_is_decode_error() {
        let err = from_json_map::<User>(map_of(json!({"id": "one", "name": "ada"}))).unwrap_err();
        assert!(matches!(err, sqlx::Error::Decode(_)));
    }

    #[test]
    fn test_bytea_array_maps_to_bytes() {
        #[derive(Deserialize)]
        struct Blob {
            data: Vec<u8>,
        }
        let blob: Blob = from_json_map(map_of(json!({"data": [104, 105]}))).unwrap();
        assert_eq!(blob.data, b"hi");
    }
}
