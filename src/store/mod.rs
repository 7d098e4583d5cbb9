//! Read-only query boundary over the relational backing store.
//!
//! [`DataStore`] is the async trait the pipeline issues SQL text against.
//! [`PgStore`] implements it over a Postgres pool; [`ScriptedStore`] answers
//! from canned rows keyed by SQL text.

mod postgres;
mod scripted;

pub use postgres::PgStore;
pub use scripted::ScriptedStore;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use crate::error::StoreError;

/// A single decoded column value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            Value::Timestamp(ts) => Some(ts.date()),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }
}

/// One result tuple, columns in select-list order.
pub type Row = Vec<Value>;

#[async_trait]
pub trait DataStore: Send + Sync {
    /// Runs `sql` and returns every row in the order the store produced them.
    async fn query(&self, sql: &str) -> Result<Vec<Row>, StoreError>;
}

/// Checks that `name` can be interpolated as a bare SQL identifier.
pub fn identifier(name: &str) -> Result<&str, StoreError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(name)
    } else {
        Err(StoreError::InvalidIdentifier(name.to_string()))
    }
}

/// Renders `value` as a single-quoted SQL string literal.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_accepts_word_characters() {
        assert_eq!(identifier("cat_042").unwrap(), "cat_042");
    }

    #[test]
    fn test_identifier_rejects_injection() {
        assert_eq!(
            identifier("x; DROP TABLE subjects"),
            Err(StoreError::InvalidIdentifier(
                "x; DROP TABLE subjects".to_string()
            ))
        );
        assert!(identifier("").is_err());
    }

    #[test]
    fn test_quote_literal_escapes_quotes() {
        assert_eq!(quote_literal("o'malley"), "'o''malley'");
        assert_eq!(quote_literal("2021-06-01"), "'2021-06-01'");
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(Value::Int(3).as_f64(), Some(3.0));
        assert_eq!(Value::Text("a".into()).as_f64(), None);
        let ts = NaiveDate::from_ymd_opt(2021, 6, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        assert_eq!(Value::Timestamp(ts).as_date(), Some(ts.date()));
        assert_eq!(Value::Null.as_bool(), None);
    }
}
