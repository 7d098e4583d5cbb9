//! Per-subject GPS sample queries.

use chrono::NaiveDate;
use tracing::{debug, instrument};

use crate::error::{StoreError, TrackError, TrackResult};
use crate::model::{LocationSample, SubjectId};
use crate::store::{DataStore, Row, identifier, quote_literal};

/// Samples with an HDOP at or above this are never loaded.
pub const HDOP_THRESHOLD: f64 = 1.3;

pub fn dates_sql(subject_id: &SubjectId) -> TrackResult<String> {
    let table = subject_id.table_name();
    Ok(format!(
        "SELECT DISTINCT timestamp_local::date FROM {}",
        identifier(&table)?
    ))
}

pub fn samples_sql(subject_id: &SubjectId, date: NaiveDate) -> TrackResult<String> {
    let table = subject_id.table_name();
    Ok(format!(
        "SELECT timestamp_local, location_lat, location_long, gps_hdop FROM {} \
         WHERE timestamp_local::date = {} AND gps_hdop < {}",
        identifier(&table)?,
        quote_literal(&date.format("%Y-%m-%d").to_string()),
        HDOP_THRESHOLD
    ))
}

/// Distinct dates with data for `subject_id`, ascending.
#[instrument(skip(store), fields(subject_id = %subject_id))]
pub async fn list_available_dates(
    store: &dyn DataStore,
    subject_id: &SubjectId,
) -> TrackResult<Vec<NaiveDate>> {
    let sql = dates_sql(subject_id)?;
    let rows = store
        .query(&sql)
        .await
        .map_err(|e| unavailable(e, subject_id))?;

    let mut dates = rows
        .iter()
        .map(|row| {
            row.first()
                .and_then(|v| v.as_date())
                .ok_or_else(|| TrackError::Decode(format!("date row {row:?}")))
        })
        .collect::<TrackResult<Vec<_>>>()?;
    dates.sort_unstable();
    dates.dedup();

    debug!(count = dates.len(), "Available dates listed");
    Ok(dates)
}

/// Samples for `subject_id` on `date` with HDOP below [`HDOP_THRESHOLD`].
///
/// Order is whatever the store returns. A missing partition is
/// [`TrackError::DataUnavailable`]; a date without rows is an empty `Vec`.
#[instrument(skip(store), fields(subject_id = %subject_id, date = %date))]
pub async fn load_samples(
    store: &dyn DataStore,
    subject_id: &SubjectId,
    date: NaiveDate,
) -> TrackResult<Vec<LocationSample>> {
    let sql = samples_sql(subject_id, date)?;
    let rows = store
        .query(&sql)
        .await
        .map_err(|e| unavailable(e, subject_id))?;

    let samples = rows
        .iter()
        .map(sample_from_row)
        .collect::<TrackResult<Vec<_>>>()?;

    debug!(rows = samples.len(), "Samples loaded");
    Ok(samples)
}

fn unavailable(err: StoreError, subject_id: &SubjectId) -> TrackError {
    match err {
        StoreError::UndefinedTable(_) => TrackError::DataUnavailable {
            subject_id: subject_id.to_string(),
        },
        other => other.into(),
    }
}

fn sample_from_row(row: &Row) -> TrackResult<LocationSample> {
    let decode = || TrackError::Decode(format!("sample row {row:?}"));
    match row.as_slice() {
        [ts, lat, lon, hdop] => Ok(LocationSample {
            timestamp: ts.as_timestamp().ok_or_else(decode)?,
            latitude: lat.as_f64().ok_or_else(decode)?,
            longitude: lon.as_f64().ok_or_else(decode)?,
            hdop: hdop.as_f64().ok_or_else(decode)?,
        }),
        _ => Err(decode()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ScriptedStore, Value};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 6, 1).unwrap()
    }

    #[test]
    fn test_samples_sql() {
        let sql = samples_sql(&SubjectId::new("Cat_01"), date()).unwrap();
        assert_eq!(
            sql,
            "SELECT timestamp_local, location_lat, location_long, gps_hdop FROM cat_01 \
             WHERE timestamp_local::date = '2021-06-01' AND gps_hdop < 1.3"
        );
    }

    #[test]
    fn test_sql_rejects_bad_subject_id() {
        let err = dates_sql(&SubjectId::new("cat;--")).unwrap_err();
        assert!(matches!(
            err,
            TrackError::Store(StoreError::InvalidIdentifier(_))
        ));
    }

    #[tokio::test]
    async fn test_dates_sorted_and_deduplicated() {
        let id = SubjectId::new("c1");
        let d = |day| Value::Date(NaiveDate::from_ymd_opt(2021, 6, day).unwrap());
        let store = ScriptedStore::new();
        store.respond(
            dates_sql(&id).unwrap(),
            vec![vec![d(3)], vec![d(1)], vec![d(3)], vec![d(2)]],
        );

        let dates = list_available_dates(&store, &id).await.unwrap();
        let days: Vec<u32> = dates.iter().map(|d| chrono::Datelike::day(d)).collect();
        assert_eq!(days, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_missing_partition_is_unavailable() {
        let id = SubjectId::new("c404");
        let store = ScriptedStore::new();
        store.fail(
            samples_sql(&id, date()).unwrap(),
            StoreError::UndefinedTable("c404".into()),
        );

        let err = load_samples(&store, &id, date()).await.unwrap_err();
        assert!(matches!(err, TrackError::DataUnavailable { subject_id } if subject_id == "c404"));
    }

    #[tokio::test]
    async fn test_empty_date_is_not_an_error() {
        let id = SubjectId::new("c1");
        let store = ScriptedStore::new();
        store.respond(samples_sql(&id, date()).unwrap(), vec![]);

        assert!(load_samples(&store, &id, date()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_other_store_errors_propagate() {
        let id = SubjectId::new("c1");
        let store = ScriptedStore::new();
        store.fail(dates_sql(&id).unwrap(), StoreError::Connect("refused".into()));

        let err = list_available_dates(&store, &id).await.unwrap_err();
        assert!(matches!(err, TrackError::Store(StoreError::Connect(_))));
    }

    #[tokio::test]
    async fn test_rows_decode_into_samples() {
        let id = SubjectId::new("c1");
        let ts = date().and_hms_opt(10, 0, 0).unwrap();
        let store = ScriptedStore::new();
        store.respond(
            samples_sql(&id, date()).unwrap(),
            vec![vec![
                Value::Timestamp(ts),
                Value::Float(35.0),
                Value::Float(-78.0),
                Value::Float(0.5),
            ]],
        );

        let samples = load_samples(&store, &id, date()).await.unwrap();
        assert_eq!(
            samples,
            vec![LocationSample {
                timestamp: ts,
                latitude: 35.0,
                longitude: -78.0,
                hdop: 0.5,
            }]
        );
    }
}
