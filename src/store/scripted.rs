use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use super::{DataStore, Row};
use crate::error::StoreError;

/// [`DataStore`] that answers from responses registered per SQL text.
///
/// Every query is recorded, so callers can assert how often a statement ran.
/// Unregistered SQL fails with [`StoreError::Query`].
#[derive(Default)]
pub struct ScriptedStore {
    responses: Mutex<HashMap<String, Result<Vec<Row>, StoreError>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `rows` as the answer to `sql`.
    pub fn respond(&self, sql: impl Into<String>, rows: Vec<Row>) -> &Self {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(sql.into(), Ok(rows));
        self
    }

    /// Registers `err` as the answer to `sql`.
    pub fn fail(&self, sql: impl Into<String>, err: StoreError) -> &Self {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(sql.into(), Err(err));
        self
    }

    /// All statements executed so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn call_count(&self, sql: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|c| c.as_str() == sql)
            .count()
    }
}

#[async_trait]
impl DataStore for ScriptedStore {
    async fn query(&self, sql: &str) -> Result<Vec<Row>, StoreError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sql.to_string());

        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(sql)
            .cloned()
            .unwrap_or_else(|| Err(StoreError::Query(format!("no response scripted for `{sql}`"))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Value;

    #[tokio::test]
    async fn test_scripted_response_and_call_log() {
        let store = ScriptedStore::new();
        store.respond("SELECT 1", vec![vec![Value::Int(1)]]);

        let rows = store.query("SELECT 1").await.unwrap();
        assert_eq!(rows, vec![vec![Value::Int(1)]]);
        assert_eq!(store.call_count("SELECT 1"), 1);
    }

    #[tokio::test]
    async fn test_unscripted_sql_fails() {
        let store = ScriptedStore::new();
        let err = store.query("SELECT 2").await.unwrap_err();
        assert!(matches!(err, StoreError::Query(_)));
        assert_eq!(store.calls(), vec!["SELECT 2".to_string()]);
    }
}
