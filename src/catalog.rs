//! Subject lookup by human-entered name.

use std::collections::BTreeSet;
use tracing::{debug, instrument};

use crate::error::{TrackError, TrackResult};
use crate::model::{Subject, SubjectId, normalize_name};
use crate::store::{DataStore, Row, Value};

pub const SUBJECTS_SQL: &str = "SELECT simple_id, cat_name, hidden FROM subjects";

/// Snapshot of the `subjects` table.
#[derive(Debug, Clone, Default)]
pub struct SubjectCatalog {
    subjects: Vec<Subject>,
}

impl SubjectCatalog {
    pub fn new(subjects: Vec<Subject>) -> Self {
        Self { subjects }
    }

    /// Reads every subject, hidden ones included, from the catalog database.
    #[instrument(skip(store))]
    pub async fn load(store: &dyn DataStore) -> TrackResult<Self> {
        let rows = store.query(SUBJECTS_SQL).await?;
        let subjects = rows
            .iter()
            .map(subject_from_row)
            .collect::<TrackResult<Vec<_>>>()?;

        debug!(count = subjects.len(), "Subject catalog loaded");
        Ok(Self { subjects })
    }

    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    /// Normalized display names of every subject that is not hidden.
    pub fn list_visible(&self) -> BTreeSet<String> {
        self.visible().map(Subject::display_name).collect()
    }

    /// Finds the visible subject whose normalized name equals `name`'s.
    ///
    /// Blank input resolves to `Ok(None)`; an unknown or hidden name is
    /// [`TrackError::NotFound`].
    pub fn resolve(&self, name: &str) -> TrackResult<Option<&Subject>> {
        let wanted = normalize_name(name);
        if wanted.is_empty() {
            return Ok(None);
        }

        self.visible()
            .find(|s| s.display_name() == wanted)
            .map(Some)
            .ok_or(TrackError::NotFound { name: wanted })
    }

    /// Like [`resolve`](Self::resolve), returning only the id.
    pub fn resolve_id(&self, name: &str) -> TrackResult<Option<SubjectId>> {
        Ok(self.resolve(name)?.map(|s| s.id.clone()))
    }

    fn visible(&self) -> impl Iterator<Item = &Subject> {
        self.subjects.iter().filter(|s| !s.hidden)
    }
}

/// A NULL `hidden` flag counts as hidden; only an explicit `false` is searchable.
fn subject_from_row(row: &Row) -> TrackResult<Subject> {
    match row.as_slice() {
        [id, name, hidden, ..] => {
            let decode = || TrackError::Decode(format!("subject row {row:?}"));
            Ok(Subject {
                id: SubjectId::new(id.as_str().ok_or_else(decode)?),
                name: name.as_str().ok_or_else(decode)?.to_string(),
                hidden: match hidden {
                    Value::Null => true,
                    other => other.as_bool().ok_or_else(decode)?,
                },
            })
        }
        _ => Err(TrackError::Decode(format!(
            "subject row has {} columns, expected 3",
            row.len()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ScriptedStore;

    fn subject(id: &str, name: &str, hidden: bool) -> Subject {
        Subject {
            id: SubjectId::new(id),
            name: name.to_string(),
            hidden,
        }
    }

    fn catalog() -> SubjectCatalog {
        SubjectCatalog::new(vec![
            subject("C001", "tabby", false),
            subject("C002", "shadow", true),
            subject("C003", "mr whiskers", false),
        ])
    }

    #[test]
    fn test_resolve_is_case_and_whitespace_insensitive() {
        let c = catalog();
        assert_eq!(c.resolve_id("  tabby  ").unwrap(), Some(SubjectId::new("C001")));
        assert_eq!(c.resolve_id("TABBY").unwrap(), Some(SubjectId::new("C001")));
        assert_eq!(
            c.resolve_id("Mr Whiskers").unwrap(),
            Some(SubjectId::new("C003"))
        );
    }

    #[test]
    fn test_resolve_hidden_subject_is_not_found() {
        let err = catalog().resolve("Shadow").unwrap_err();
        assert!(matches!(err, TrackError::NotFound { name } if name == "Shadow"));
    }

    #[test]
    fn test_resolve_unknown_is_not_found() {
        assert!(matches!(
            catalog().resolve("garfield"),
            Err(TrackError::NotFound { .. })
        ));
    }

    #[test]
    fn test_resolve_blank_is_no_result() {
        assert_eq!(catalog().resolve_id("").unwrap(), None);
        assert_eq!(catalog().resolve_id("   ").unwrap(), None);
    }

    #[test]
    fn test_list_visible_excludes_hidden() {
        let visible = catalog().list_visible();
        assert!(visible.contains("Tabby"));
        assert!(visible.contains("Mr whiskers"));
        assert!(!visible.contains("Shadow"));
        assert_eq!(visible.len(), 2);
    }

    #[tokio::test]
    async fn test_load_from_store() {
        let store = ScriptedStore::new();
        store.respond(
            SUBJECTS_SQL,
            vec![vec![
                Value::Text("C001".into()),
                Value::Text("tabby".into()),
                Value::Bool(false),
            ]],
        );

        let c = SubjectCatalog::load(&store).await.unwrap();
        assert_eq!(c.subjects(), &[subject("C001", "tabby", false)]);
    }

    #[tokio::test]
    async fn test_null_hidden_flag_hides_subject() {
        let store = ScriptedStore::new();
        store.respond(
            SUBJECTS_SQL,
            vec![
                vec![
                    Value::Text("C001".into()),
                    Value::Text("tabby".into()),
                    Value::Bool(false),
                ],
                vec![
                    Value::Text("C002".into()),
                    Value::Text("legacy".into()),
                    Value::Null,
                ],
            ],
        );

        let c = SubjectCatalog::load(&store).await.unwrap();
        assert_eq!(c.resolve_id("tabby").unwrap(), Some(SubjectId::new("C001")));
        assert!(matches!(c.resolve("legacy"), Err(TrackError::NotFound { .. })));
        assert_eq!(c.list_visible().into_iter().collect::<Vec<_>>(), vec!["Tabby"]);
    }

    #[tokio::test]
    async fn test_load_rejects_wrong_typed_hidden_flag() {
        let store = ScriptedStore::new();
        store.respond(
            SUBJECTS_SQL,
            vec![vec![
                Value::Text("C001".into()),
                Value::Text("tabby".into()),
                Value::Text("no".into()),
            ]],
        );

        let err = SubjectCatalog::load(&store).await.unwrap_err();
        assert!(matches!(err, TrackError::Decode(_)));
    }

    #[tokio::test]
    async fn test_load_rejects_malformed_rows() {
        let store = ScriptedStore::new();
        store.respond(SUBJECTS_SQL, vec![vec![Value::Text("C001".into())]]);

        let err = SubjectCatalog::load(&store).await.unwrap_err();
        assert!(matches!(err, TrackError::Decode(_)));
    }
}
