//! Column encodings shared by the SQL backends.
//!
//! Set-valued fields are stored as JSON arrays in text columns. SQLite stores
//! timestamps as fixed-width RFC 3339 strings so that they compare correctly
//! as text.

use crate::errors::StorageError;
use crate::storage::traits::Result;
#[cfg(feature = "sqlite")]
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::BTreeSet;

/// Serialize a string set to a JSON array
pub(crate) fn encode_set(values: &BTreeSet<String>) -> Result<String> {
    serde_json::to_string(values).map_err(|e| StorageError::SerializationFailed(e.to_string()))
}

/// Deserialize a JSON array into a string set
pub(crate) fn decode_set(column: &str, json: &str) -> Result<BTreeSet<String>> {
    serde_json::from_str(json).map_err(|e| {
        StorageError::SerializationFailed(format!("Invalid {} column: {}", column, e))
    })
}

#[cfg(feature = "sqlite")]
pub(crate) fn encode_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[cfg(feature = "sqlite")]
pub(crate) fn decode_timestamp(column: &str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|e| StorageError::InvalidData(format!("Invalid {} timestamp: {}", column, e)))
}

/// Map a failed column read
pub(crate) fn column_error(column: &str) -> impl FnOnce(sqlx::Error) -> StorageError + '_ {
    move |e| StorageError::DatabaseError(format!("Failed to get {}: {}", column, e))
}

/// Map an insert failure, reporting unique-key violations as conflicts
pub(crate) fn insert_error(key: &str, e: sqlx::Error) -> StorageError {
    match &e {
        sqlx::Error::Database(db_error) if db_error.is_unique_violation() => {
            StorageError::Conflict(format!("'{}' already exists", key))
        }
        _ => StorageError::DatabaseError(e.to_string()),
    }
}

/// Convert a stored validity into seconds
/// Wrap a connect or URL parse failure
pub(crate) fn connection_failed(context: &str, e: impl std::fmt::Display) -> StorageError {
    StorageError::ConnectionFailed(format!("{}: {}", context, e))
}

pub(crate) fn decode_validity(value: i64) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| StorageError::InvalidData(format!("Invalid access token validity: {}", value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_encoding_is_sorted_json() {
        let values = BTreeSet::from(["write".to_string(), "read".to_string()]);
        let encoded = encode_set(&values).unwrap();
        assert_eq!(encoded, r#"["read","write"]"#);
        assert_eq!(decode_set("scope", &encoded).unwrap(), values);
        assert!(decode_set("scope", "read write").is_err());
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn test_timestamps_are_fixed_width() {
        let early = DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let later = early + chrono::Duration::milliseconds(500);

        let early_text = encode_timestamp(&early);
        let later_text = encode_timestamp(&later);
        assert_eq!(early_text.len(), later_text.len());
        assert!(early_text < later_text);
        assert_eq!(decode_timestamp("created_at", &later_text).unwrap(), later);
    }

    #[test]
    fn test_connection_failed_keeps_context() {
        let err = connection_failed("SQLite connection failed", "unable to open database file");
        assert!(matches!(
            &err,
            StorageError::ConnectionFailed(message)
                if message == "SQLite connection failed: unable to open database file"
        ));
    }

    #[test]
    fn test_decode_validity_rejects_negative() {
        assert_eq!(decode_validity(1800).unwrap(), 1800);
        assert!(decode_validity(-1).is_err());
    }
}
