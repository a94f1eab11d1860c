use policy::Resource;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use storage::{
    ChangeSet, CommitSummary, Document, EntityState, ModificationAction, PendingModification,
    PersistenceSession, Record, SqliteSession,
};
use submit::{Caller, EntityFields, Error, MissingFlag, SoftDeleteConfig, SubmitInterceptor};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Note {
    id: u32,
    body: String,
    #[serde(rename = "Deleted")]
    deleted: bool,
}

impl Resource for Note {
    const RESOURCE_TYPE: &'static str = "notes";
}

impl Record for Note {
    fn id(&self) -> String {
        self.id.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Attachment {
    id: u32,
    name: String,
}

impl Resource for Attachment {
    const RESOURCE_TYPE: &'static str = "attachments";
}

impl Record for Attachment {
    fn id(&self) -> String {
        self.id.to_string()
    }
}

fn note(id: u32) -> Note {
    Note {
        id,
        body: format!("note {id}"),
        deleted: false,
    }
}

/// What a commit saw for one entry.
#[derive(Debug, Clone, PartialEq)]
struct Seen {
    action: ModificationAction,
    state: EntityState,
    value: Value,
}

fn snapshot(changes: &ChangeSet) -> Vec<Seen> {
    changes
        .iter()
        .map(|m| Seen {
            action: m.action,
            state: m.state,
            value: m.entity.to_value().unwrap(),
        })
        .collect()
}

/// Session that records every commit instead of writing.
#[derive(Default)]
struct RecordingSession {
    commits: Mutex<Vec<Vec<Seen>>>,
    fail: bool,
}

impl RecordingSession {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn commits(&self) -> Vec<Vec<Seen>> {
        self.commits.lock().unwrap().clone()
    }
}

impl PersistenceSession for RecordingSession {
    async fn commit(
        &self,
        changes: &ChangeSet,
        _cancel: &CancellationToken,
    ) -> storage::Result<CommitSummary> {
        self.commits.lock().unwrap().push(snapshot(changes));
        if self.fail {
            return Err(storage::Error::NotFound("constraint violated".into()));
        }
        Ok(CommitSummary::default())
    }
}

fn interceptor(admin_role: Option<&str>, missing_flag: MissingFlag) -> SubmitInterceptor {
    let mut config = SoftDeleteConfig::new("Deleted")
        .unwrap()
        .with_missing_flag(missing_flag);
    if let Some(role) = admin_role {
        config = config.with_admin_role(role);
    }
    let fields = EntityFields::new().declare::<Note>("Deleted", |n| &mut n.deleted);
    SubmitInterceptor::new(config, fields).unwrap()
}

#[tokio::test]
async fn test_admin_caller_commits_hard_delete() {
    let interceptor = interceptor(Some("admin"), MissingFlag::Reject);
    let session = RecordingSession::default();
    let caller = Caller::new("root").with_role("admin");

    let changes = ChangeSet::new().with(PendingModification::remove(note(1)));
    let result = interceptor
        .execute(&session, &caller, changes, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.soft_deleted, 0);
    let commits = session.commits();
    assert_eq!(commits.len(), 1);
    assert_eq!(commits[0][0].action, ModificationAction::Remove);
    assert_eq!(commits[0][0].state, EntityState::Deleted);
    assert_eq!(commits[0][0].value["Deleted"], Value::Bool(false));
    assert_eq!(result.changes.remove_count(), 1);
}

#[tokio::test]
async fn test_remove_becomes_flagged_update() {
    let interceptor = interceptor(None, MissingFlag::Reject);
    let session = RecordingSession::default();

    let changes = ChangeSet::new().with(PendingModification::remove(note(1)));
    let result = interceptor
        .execute(&session, &Caller::new("ada"), changes, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.soft_deleted, 1);
    assert_eq!(result.changes.remove_count(), 0);

    let entry = result.changes.get(0).unwrap();
    assert_eq!(entry.state, EntityState::Modified);
    assert!(entry.entity_as::<Note>().unwrap().deleted);

    let commits = session.commits();
    assert_eq!(commits.len(), 1);
    assert_eq!(commits[0][0].state, EntityState::Modified);
    assert_eq!(commits[0][0].value["Deleted"], Value::Bool(true));
}

#[tokio::test]
async fn test_non_admin_is_rewritten_when_admin_role_configured() {
    let interceptor = interceptor(Some("admin"), MissingFlag::Reject);
    let session = RecordingSession::default();
    let caller = Caller::new("ada").with_role("editor");

    let changes = ChangeSet::new().with(PendingModification::remove(note(1)));
    let result = interceptor
        .execute(&session, &caller, changes, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.soft_deleted, 1);
    assert_eq!(session.commits()[0][0].state, EntityState::Modified);
}

#[tokio::test]
async fn test_missing_flag_field_falls_back_to_hard_delete() {
    let interceptor = interceptor(None, MissingFlag::Fallback);
    let session = RecordingSession::default();

    let attachment = Attachment {
        id: 4,
        name: "scan.pdf".into(),
    };
    let changes = ChangeSet::new().with(PendingModification::remove(attachment));
    let result = interceptor
        .execute(&session, &Caller::anonymous(), changes, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.soft_deleted, 0);
    assert_eq!(result.changes.remove_count(), 1);
    let commits = session.commits();
    assert_eq!(commits.len(), 1);
    assert_eq!(commits[0][0].action, ModificationAction::Remove);
    assert_eq!(commits[0][0].state, EntityState::Deleted);
}

#[tokio::test]
async fn test_missing_flag_field_rejects_without_commit() {
    let interceptor = interceptor(None, MissingFlag::Reject);
    let session = RecordingSession::default();

    let changes = ChangeSet::new()
        .with(PendingModification::remove(note(1)))
        .with(PendingModification::remove(Attachment {
            id: 4,
            name: "scan.pdf".into(),
        }));
    let err = interceptor
        .execute(&session, &Caller::anonymous(), changes, &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        Error::MissingSoftDeleteField {
            resource_type,
            field,
        } => {
            assert_eq!(resource_type.as_str(), "attachments");
            assert_eq!(field, "Deleted");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(session.commits().is_empty());
}

#[test]
fn test_declared_type_without_flag_fails_construction() {
    let config = SoftDeleteConfig::new("Deleted").unwrap();
    let fields = EntityFields::new()
        .declare::<Note>("Deleted", |n| &mut n.deleted)
        .declare_document("attachments", "Archived");

    let err = SubmitInterceptor::new(config.clone(), fields).unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));

    let fields = EntityFields::new().declare_document("attachments", "Archived");
    let lenient = config.with_missing_flag(MissingFlag::Fallback);
    assert!(SubmitInterceptor::new(lenient, fields).is_ok());
}

#[test]
fn test_empty_flag_name_fails_construction() {
    let config = SoftDeleteConfig {
        flag_property_name: " ".into(),
        admin_role_name: None,
        missing_flag: MissingFlag::Fallback,
    };
    let err = SubmitInterceptor::new(config, EntityFields::new()).unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
}

#[tokio::test]
async fn test_only_removes_are_altered() {
    let interceptor = interceptor(None, MissingFlag::Reject);
    let session = RecordingSession::default();

    let changes = ChangeSet::new()
        .with(PendingModification::insert(note(1)))
        .with(PendingModification::remove(note(2)))
        .with(PendingModification::update(Note {
            body: "edited".into(),
            ..note(3)
        }));
    let before = snapshot(&changes);

    let result = interceptor
        .execute(&session, &Caller::anonymous(), changes, &CancellationToken::new())
        .await
        .unwrap();
    let after = snapshot(&result.changes);

    assert_eq!(after.len(), 3);
    assert_eq!(after[0], before[0]);
    assert_eq!(after[2], before[2]);

    assert_eq!(after[1].action, ModificationAction::Remove);
    assert_eq!(after[1].state, EntityState::Modified);
    assert_eq!(after[1].value["id"], Value::from(2));
    assert_eq!(after[1].value["Deleted"], Value::Bool(true));

    assert_eq!(session.commits(), vec![after]);
}

#[tokio::test]
async fn test_cancelled_before_commit_abandons_run() {
    let interceptor = interceptor(None, MissingFlag::Reject);
    let session = RecordingSession::default();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let changes = ChangeSet::new().with(PendingModification::remove(note(1)));
    let err = interceptor
        .execute(&session, &Caller::anonymous(), changes, &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Cancelled));
    assert!(session.commits().is_empty());
}

#[tokio::test]
async fn test_persistence_failure_propagates() {
    let interceptor = interceptor(None, MissingFlag::Reject);
    let session = RecordingSession::failing();

    let changes = ChangeSet::new().with(PendingModification::remove(note(1)));
    let err = interceptor
        .execute(&session, &Caller::anonymous(), changes, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Persistence(storage::Error::NotFound(_))));
    let commits = session.commits();
    assert_eq!(commits.len(), 1);
    assert_eq!(commits[0][0].value["Deleted"], Value::Bool(true));
}

#[tokio::test]
async fn test_documents_are_soft_deleted_in_sqlite() {
    let config = SoftDeleteConfig::new("deleted").unwrap();
    let fields = EntityFields::new().declare_document("tasks", "deleted");
    let interceptor = SubmitInterceptor::new(config, fields).unwrap();
    let session = SqliteSession::in_memory().unwrap();
    let cancel = CancellationToken::new();

    let task = Document::new("tasks", "t1")
        .with_field("title", "write tests")
        .with_field("deleted", false);
    let seed = ChangeSet::new().with(PendingModification::insert(task.clone()));
    interceptor
        .execute(&session, &Caller::anonymous(), seed, &cancel)
        .await
        .unwrap();

    let changes = ChangeSet::new().with(PendingModification::remove(task));
    let result = interceptor
        .execute(&session, &Caller::anonymous(), changes, &cancel)
        .await
        .unwrap();
    assert_eq!(result.summary.updated, 1);
    assert_eq!(result.summary.deleted, 0);

    let stored = session.load(&"tasks".into(), "t1").unwrap().unwrap();
    assert_eq!(stored.document.flag("deleted"), Some(true));
}

#[tokio::test]
async fn test_key_only_remove_keeps_stored_content() {
    let config = SoftDeleteConfig::new("deleted").unwrap();
    let fields = EntityFields::new().declare_document("notes", "deleted");
    let interceptor = SubmitInterceptor::new(config, fields).unwrap();
    let session = SqliteSession::in_memory().unwrap();
    let cancel = CancellationToken::new();

    let seed = ChangeSet::new().with(PendingModification::insert(
        Document::new("notes", "1")
            .with_field("body", "keep me")
            .with_field("deleted", false),
    ));
    interceptor
        .execute(&session, &Caller::anonymous(), seed, &cancel)
        .await
        .unwrap();

    let changes = ChangeSet::new().with(PendingModification::remove(Document::new("notes", "1")));
    let result = interceptor
        .execute(&session, &Caller::anonymous(), changes, &cancel)
        .await
        .unwrap();
    assert_eq!(result.soft_deleted, 1);

    let stored = session.load(&"notes".into(), "1").unwrap().unwrap();
    assert_eq!(stored.document.fields["body"], Value::from("keep me"));
    assert_eq!(stored.document.flag("deleted"), Some(true));
}

#[tokio::test]
async fn test_concurrent_submits_share_one_interceptor() {
    let interceptor = Arc::new(interceptor(Some("admin"), MissingFlag::Reject));
    let session = Arc::new(SqliteSession::in_memory().unwrap());
    let cancel = CancellationToken::new();

    let seed: ChangeSet = (1..=4).map(|id| PendingModification::insert(note(id))).collect();
    interceptor
        .execute(&*session, &Caller::anonymous(), seed, &cancel)
        .await
        .unwrap();

    let mut handles = Vec::new();
    for id in 1..=4u32 {
        let interceptor = Arc::clone(&interceptor);
        let session = Arc::clone(&session);
        let cancel = cancel.clone();
        handles.push(tokio::spawn(async move {
            let caller = if id % 2 == 0 {
                Caller::new("root").with_role("admin")
            } else {
                Caller::new("ada")
            };
            let changes = ChangeSet::new().with(PendingModification::remove(note(id)));
            interceptor
                .execute(&*session, &caller, changes, &cancel)
                .await
                .map(|r| r.soft_deleted)
        }));
    }

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert!(session.get::<Note>("1").unwrap().unwrap().deleted);
    assert!(session.get::<Note>("2").unwrap().is_none());
    assert!(session.get::<Note>("3").unwrap().unwrap().deleted);
    assert!(session.get::<Note>("4").unwrap().is_none());
}
