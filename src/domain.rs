//! Core domain types: issues, labels and timeline events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Schema version written into JSON reports.
pub const REPORT_SCHEMA_VERSION: &str = "1.0.0";

/// Open/closed state as GitHub reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    #[default]
    Open,
    Closed,
}

/// A label attached to an issue. Identity is the numeric `id`; names can be
/// edited upstream without changing it. Issue-event payloads from the REST API
/// omit the id, so those labels are matched by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Label {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self { id: Some(id), name: name.into(), color: None }
    }

    /// Label without an id, as carried by `labeled`/`unlabeled` events.
    pub fn named(name: impl Into<String>) -> Self {
        Self { id: None, name: name.into(), color: None }
    }

    /// Same label: by id when both sides carry one, by name otherwise.
    pub fn same_as(&self, other: &Label) -> bool {
        match (self.id, other.id) {
            (Some(a), Some(b)) => a == b,
            _ => self.name.eq_ignore_ascii_case(&other.name),
        }
    }
}

/// An issue or pull request together with its timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub state: IssueState,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub labels: Vec<Label>,
    pub created_at: DateTime<Utc>,
    /// GitHub marks pull requests with a `pull_request` object on the issue
    /// payload; only its presence matters here.
    #[serde(
        default,
        rename = "pull_request",
        skip_serializing_if = "std::ops::Not::not",
        deserialize_with = "deserialize_presence",
        serialize_with = "serialize_presence"
    )]
    pub is_pull_request: bool,
    /// Timeline, oldest first.
    #[serde(default)]
    pub events: Vec<Event>,
}

impl Issue {
    pub fn new(number: u64, created_at: DateTime<Utc>) -> Self {
        Self {
            number,
            title: String::new(),
            state: IssueState::Open,
            locked: false,
            labels: Vec::new(),
            created_at,
            is_pull_request: false,
            events: Vec::new(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.state == IssueState::Open
    }

    pub fn is_closed(&self) -> bool {
        self.state == IssueState::Closed
    }

    /// Case-insensitive label name lookup.
    pub fn has_label(&self, name: &str) -> bool {
        self.labels.iter().any(|l| l.name.eq_ignore_ascii_case(name))
    }

    pub fn has_label_id(&self, id: u64) -> bool {
        self.labels.iter().any(|l| l.id == Some(id))
    }

    pub fn has_same_label(&self, label: &Label) -> bool {
        self.labels.iter().any(|l| l.same_as(label))
    }

    pub fn label_names(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(|l| l.name.as_str())
    }
}

fn deserialize_presence<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(b) => b,
        _ => true,
    })
}

fn serialize_presence<S>(value: &bool, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_bool(*value)
}

/// One timeline entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl Event {
    pub fn new(created_at: DateTime<Utc>, kind: EventKind) -> Self {
        Self { created_at, kind }
    }
}

/// Tags with a dedicated [`EventKind`] variant.
const KNOWN_TAGS: &[&str] = &[
    "closed",
    "reopened",
    "labeled",
    "unlabeled",
    "locked",
    "unlocked",
    "renamed",
    "assigned",
    "unassigned",
    "milestoned",
    "demilestoned",
    "commented",
    "mentioned",
    "subscribed",
    "referenced",
];

/// Timeline event tags. Anything GitHub sends that is not listed here
/// deserializes as [`EventKind::Unrecognized`], keeping its raw tag, and
/// cannot be replayed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EventKind {
    Closed,
    Reopened,
    Labeled { label: Label },
    Unlabeled { label: Label },
    Locked,
    Unlocked,
    Renamed { rename: Rename },
    Assigned,
    Unassigned,
    Milestoned,
    Demilestoned,
    Commented,
    Mentioned,
    Subscribed,
    Referenced,
    #[serde(untagged)]
    Unrecognized {
        #[serde(deserialize_with = "deserialize_unknown_tag")]
        event: String,
    },
}

/// A known tag with a malformed payload must not pass as unrecognized.
fn deserialize_unknown_tag<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let tag = String::deserialize(deserializer)?;
    if KNOWN_TAGS.contains(&tag.as_str()) {
        return Err(serde::de::Error::custom(format!("malformed '{tag}' event")));
    }
    Ok(tag)
}

impl EventKind {
    pub fn name(&self) -> &str {
        match self {
            EventKind::Closed => "closed",
            EventKind::Reopened => "reopened",
            EventKind::Labeled { .. } => "labeled",
            EventKind::Unlabeled { .. } => "unlabeled",
            EventKind::Locked => "locked",
            EventKind::Unlocked => "unlocked",
            EventKind::Renamed { .. } => "renamed",
            EventKind::Assigned => "assigned",
            EventKind::Unassigned => "unassigned",
            EventKind::Milestoned => "milestoned",
            EventKind::Demilestoned => "demilestoned",
            EventKind::Commented => "commented",
            EventKind::Mentioned => "mentioned",
            EventKind::Subscribed => "subscribed",
            EventKind::Referenced => "referenced",
            EventKind::Unrecognized { event } => event,
        }
    }
}

/// Title change carried by a `renamed` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rename {
    pub from: String,
    pub to: String,
}
