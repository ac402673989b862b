use crate::error::{McError, Result};
use crate::task::Task;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// A document with a fixed key and a known shape.
///
/// `Default` is the value a read returns when nothing has been written yet.
pub trait Document: Serialize + DeserializeOwned + Default {
    const KEY: &'static str;
}

// ---------------------------------------------------------------------------
// DocumentKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    PipelineState,
    SocialPosts,
    BuildTracker,
    Tasks,
    Approvals,
    ActivityLog,
}

impl DocumentKind {
    pub fn all() -> &'static [DocumentKind] {
        &[
            DocumentKind::PipelineState,
            DocumentKind::SocialPosts,
            DocumentKind::BuildTracker,
            DocumentKind::Tasks,
            DocumentKind::Approvals,
            DocumentKind::ActivityLog,
        ]
    }

    pub fn key(self) -> &'static str {
        match self {
            DocumentKind::PipelineState => PipelineState::KEY,
            DocumentKind::SocialPosts => SocialPosts::KEY,
            DocumentKind::BuildTracker => BuildTracker::KEY,
            DocumentKind::Tasks => TaskBoard::KEY,
            DocumentKind::Approvals => Approvals::KEY,
            DocumentKind::ActivityLog => ActivityLog::KEY,
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::all().iter().copied().find(|k| k.key() == key)
    }

    /// The empty value for this kind, as raw JSON.
    pub fn empty(self) -> Value {
        match self {
            DocumentKind::PipelineState => empty_of::<PipelineState>(),
            DocumentKind::SocialPosts => empty_of::<SocialPosts>(),
            DocumentKind::BuildTracker => empty_of::<BuildTracker>(),
            DocumentKind::Tasks => empty_of::<TaskBoard>(),
            DocumentKind::Approvals => empty_of::<Approvals>(),
            DocumentKind::ActivityLog => Value::Array(Vec::new()),
        }
    }

    /// Check that `value` still has this kind's shape.
    pub fn validate(self, value: &Value) -> Result<()> {
        match self {
            DocumentKind::PipelineState => check::<PipelineState>(value),
            DocumentKind::SocialPosts => check::<SocialPosts>(value),
            DocumentKind::BuildTracker => check::<BuildTracker>(value),
            DocumentKind::Tasks => check::<TaskBoard>(value),
            DocumentKind::Approvals => check::<Approvals>(value),
            DocumentKind::ActivityLog => check::<ActivityLog>(value),
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Empty default for any key: the kind's empty value, or `{}` for keys the
/// dashboard does not model.
pub fn empty_for_key(key: &str) -> Value {
    DocumentKind::from_key(key)
        .map(DocumentKind::empty)
        .unwrap_or_else(|| Value::Object(Map::new()))
}

/// Validate `value` against the kind registered for `key`, if any.
pub fn validate_for_key(key: &str, value: &Value) -> Result<()> {
    match DocumentKind::from_key(key) {
        Some(kind) => kind.validate(value),
        None if value.is_object() || value.is_array() => Ok(()),
        None => Err(McError::InvalidDocument {
            key: key.to_string(),
            reason: "top-level value must be an object or an array".to_string(),
        }),
    }
}

fn empty_of<D: Document>() -> Value {
    serde_json::to_value(D::default()).unwrap_or(Value::Null)
}

fn check<D: Document>(value: &Value) -> Result<()> {
    D::deserialize(value)
        .map(|_| ())
        .map_err(|e| McError::InvalidDocument {
            key: D::KEY.to_string(),
            reason: e.to_string(),
        })
}

// ---------------------------------------------------------------------------
// pipeline-state.json
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    #[serde(default)]
    pub items: BTreeMap<String, PipelineItem>,
}

impl Document for PipelineState {
    const KEY: &'static str = "pipeline-state.json";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineItem {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub stage: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PipelineItem {
    pub fn new(id: impl Into<String>, title: impl Into<String>, stage: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            stage: stage.into(),
            owner: None,
            updated_at: Some(Utc::now()),
            extra: Map::new(),
        }
    }
}

impl PipelineState {
    /// Insert or replace an item, keyed by its id.
    pub fn upsert(&mut self, item: PipelineItem) {
        self.items.insert(item.id.clone(), item);
    }
}

// ---------------------------------------------------------------------------
// social-posts.json
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SocialPosts {
    #[serde(default)]
    pub posts: Vec<SocialPost>,
}

impl Document for SocialPosts {
    const KEY: &'static str = "social-posts.json";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    #[default]
    Draft,
    Scheduled,
    Published,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialPost {
    pub id: String,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub status: PostStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_for: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ---------------------------------------------------------------------------
// build-tracker.json
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildTracker {
    #[serde(default)]
    pub builds: Vec<BuildEntry>,
}

impl Document for BuildTracker {
    const KEY: &'static str = "build-tracker.json";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildEntry {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ---------------------------------------------------------------------------
// tasks.json
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskBoard {
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl Document for TaskBoard {
    const KEY: &'static str = "tasks.json";
}

// ---------------------------------------------------------------------------
// approvals.json
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Approvals {
    #[serde(default)]
    pub approvals: Vec<Approval>,
}

impl Document for Approvals {
    const KEY: &'static str = "approvals.json";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Approval {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: ApprovalStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decided_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ---------------------------------------------------------------------------
// activity-log.json
// ---------------------------------------------------------------------------

/// Newest entries last. Writers append unconditionally and trim from the
/// front, accepting that a racing append may be lost.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityLog(pub Vec<ActivityEntry>);

impl Document for ActivityLog {
    const KEY: &'static str = "activity-log.json";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub timestamp: DateTime<Utc>,
    pub actor: String,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ActivityEntry {
    pub fn new(actor: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            actor: actor.into(),
            action: action.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn every_kind_round_trips_its_key() {
        for kind in DocumentKind::all() {
            assert_eq!(DocumentKind::from_key(kind.key()), Some(*kind));
            crate::paths::validate_key(kind.key()).unwrap();
        }
        assert_eq!(DocumentKind::from_key("notes.json"), None);
    }

    #[test]
    fn empty_shapes() {
        assert_eq!(DocumentKind::PipelineState.empty(), json!({"items": {}}));
        assert_eq!(DocumentKind::SocialPosts.empty(), json!({"posts": []}));
        assert_eq!(DocumentKind::ActivityLog.empty(), json!([]));
        assert_eq!(empty_for_key("notes.json"), json!({}));
    }

    #[test]
    fn validate_accepts_extra_fields() {
        let value = json!({
            "items": {
                "x1": {"id": "x1", "title": "Draft brief", "stage": "research", "priority": 2}
            }
        });
        DocumentKind::PipelineState.validate(&value).unwrap();
        let state: PipelineState = serde_json::from_value(value).unwrap();
        assert_eq!(state.items["x1"].extra["priority"], json!(2));
    }

    #[test]
    fn validate_rejects_wrong_shape() {
        let err = DocumentKind::SocialPosts
            .validate(&json!({"posts": {"not": "a list"}}))
            .unwrap_err();
        assert!(matches!(err, McError::InvalidDocument { .. }));

        let err = DocumentKind::SocialPosts
            .validate(&json!({"posts": [{"id": "p1", "status": "viral"}]}))
            .unwrap_err();
        assert!(matches!(err, McError::InvalidDocument { .. }));
    }

    #[test]
    fn unknown_keys_need_object_or_array() {
        validate_for_key("notes.json", &json!({"a": 1})).unwrap();
        validate_for_key("notes.json", &json!([1, 2])).unwrap();
        assert!(validate_for_key("notes.json", &json!(42)).is_err());
    }

    #[test]
    fn pipeline_upsert_replaces_by_id() {
        let mut state = PipelineState::default();
        state.upsert(PipelineItem::new("x1", "Brief", "research"));
        state.upsert(PipelineItem::new("x1", "Brief", "writing"));
        assert_eq!(state.items.len(), 1);
        assert_eq!(state.items["x1"].stage, "writing");
    }
}
