//! Point-in-time reconstruction of issues from their timelines.
//!
//! The live issue is the latest state. To see it as of an earlier instant, walk
//! the timeline from newest to oldest and undo every event that happened after
//! that instant.

use crate::domain::{Event, EventKind, Issue, IssueState};
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("issue #{number}: cannot unwind '{kind}' event at {at}")]
    UnsupportedEvent { number: u64, kind: String, at: DateTime<Utc> },
}

/// Outcome of [`replay`].
#[derive(Debug, Clone, PartialEq)]
pub enum Replayed {
    /// The issue was created after the requested instant.
    NotYetCreated,
    Snapshot(Issue),
}

impl Replayed {
    pub fn into_snapshot(self) -> Option<Issue> {
        match self {
            Replayed::Snapshot(issue) => Some(issue),
            Replayed::NotYetCreated => None,
        }
    }
}

/// Reconstruct `issue` as it was at `as_of`. The input is never modified.
pub fn replay(issue: &Issue, as_of: DateTime<Utc>) -> Result<Replayed, ReplayError> {
    if as_of < issue.created_at {
        return Ok(Replayed::NotYetCreated);
    }

    let mut snapshot = issue.clone();
    if snapshot.events.iter().all(|e| e.created_at <= as_of) {
        return Ok(Replayed::Snapshot(snapshot));
    }

    let mut index = snapshot.events.len();
    while index > 0 {
        index -= 1;
        if snapshot.events[index].created_at > as_of {
            let event = snapshot.events.remove(index);
            unwind(&mut snapshot, &event)?;
        }
    }
    tracing::trace!(number = issue.number, %as_of, remaining = snapshot.events.len(), "replayed");
    Ok(Replayed::Snapshot(snapshot))
}

/// Replay every issue that existed at `as_of`, skipping the ones created later.
pub fn replay_many<'a, I>(issues: I, as_of: DateTime<Utc>) -> Result<Vec<Issue>, ReplayError>
where
    I: IntoIterator<Item = &'a Issue>,
{
    let mut snapshots = Vec::new();
    for issue in issues {
        if let Replayed::Snapshot(snapshot) = replay(issue, as_of)? {
            snapshots.push(snapshot);
        }
    }
    Ok(snapshots)
}

fn unwind(issue: &mut Issue, event: &Event) -> Result<(), ReplayError> {
    match &event.kind {
        EventKind::Closed => issue.state = IssueState::Open,
        EventKind::Reopened => issue.state = IssueState::Closed,
        EventKind::Labeled { label } => {
            // The label may have been deleted from the repository since.
            issue.labels.retain(|l| !l.same_as(label));
        }
        EventKind::Unlabeled { label } => {
            if !issue.has_same_label(label) {
                issue.labels.push(label.clone());
            }
        }
        EventKind::Locked => issue.locked = false,
        EventKind::Unlocked => issue.locked = true,
        EventKind::Renamed { rename } => issue.title = rename.from.clone(),
        EventKind::Assigned
        | EventKind::Unassigned
        | EventKind::Milestoned
        | EventKind::Demilestoned
        | EventKind::Commented
        | EventKind::Mentioned
        | EventKind::Subscribed
        | EventKind::Referenced => {}
        EventKind::Unrecognized { .. } => {
            return Err(ReplayError::UnsupportedEvent {
                number: issue.number,
                kind: event.kind.name().to_string(),
                at: event.created_at,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Label, Rename};
    use chrono::{Duration, TimeZone};

    fn t(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, 5, day, 12, 0, 0).unwrap()
    }

    fn issue_created(day: u32) -> Issue {
        Issue::new(7, t(day))
    }

    #[test]
    fn before_creation_does_not_exist() {
        let issue = issue_created(10);
        assert_eq!(replay(&issue, t(9)).expect("replay"), Replayed::NotYetCreated);
        assert!(matches!(replay(&issue, t(10)).expect("replay"), Replayed::Snapshot(_)));
    }

    #[test]
    fn after_last_event_is_value_equal_copy() {
        let mut issue = issue_created(1);
        issue.labels.push(Label::new(1, "bug"));
        issue.events.push(Event::new(t(2), EventKind::Labeled { label: Label::new(1, "bug") }));
        issue.events.push(Event::new(t(3), EventKind::Commented));

        let replayed = replay(&issue, t(3)).expect("replay").into_snapshot().expect("exists");
        assert_eq!(replayed, issue);
    }

    #[test]
    fn close_then_reopen_timeline() {
        let mut issue = issue_created(1);
        issue.events.push(Event::new(t(5), EventKind::Closed));
        issue.events.push(Event::new(t(8), EventKind::Reopened));

        let at = |when| replay(&issue, when).expect("replay").into_snapshot().expect("exists");

        assert!(at(t(3)).is_open());
        assert!(at(t(5)).is_closed());
        assert!(at(t(7)).is_closed());
        assert!(at(t(8)).is_open());
        assert!(at(t(20)).is_open());
        assert!(issue.is_open());
        assert_eq!(issue.events.len(), 2);
    }

    #[test]
    fn unwinds_label_changes() {
        let bug = Label::new(11, "bug");
        let stale = Label::new(12, "stale");

        let mut issue = issue_created(1);
        issue.labels.push(bug.clone());
        issue.events.push(Event::new(t(4), EventKind::Labeled { label: bug.clone() }));
        issue.events.push(Event::new(t(6), EventKind::Unlabeled { label: stale.clone() }));

        let before_unlabel = replay(&issue, t(5)).expect("replay").into_snapshot().expect("exists");
        assert!(before_unlabel.has_label_id(11));
        assert!(before_unlabel.has_label_id(12));
        assert_eq!(before_unlabel.events.len(), 1);

        let before_label = replay(&issue, t(2)).expect("replay").into_snapshot().expect("exists");
        assert!(!before_label.has_label_id(11));
        assert!(before_label.has_label_id(12));
        assert!(before_label.events.is_empty());

        assert!(issue.has_label_id(11));
        assert!(!issue.has_label_id(12));
    }

    #[test]
    fn event_labels_without_id_unwind_by_name() {
        let mut issue = issue_created(1);
        issue.labels.push(Label::new(11, "Bug"));
        issue.events.push(Event::new(t(4), EventKind::Labeled { label: Label::named("bug") }));
        issue.events.push(Event::new(t(6), EventKind::Unlabeled { label: Label::named("stale") }));

        let snapshot = replay(&issue, t(2)).expect("replay").into_snapshot().expect("exists");
        assert!(!snapshot.has_label("bug"));
        assert!(snapshot.has_label("stale"));
        assert_eq!(snapshot.labels[0].id, None);
    }

    #[test]
    fn labeled_event_for_deleted_label_is_noop() {
        let mut issue = issue_created(1);
        issue.events.push(Event::new(t(4), EventKind::Labeled { label: Label::new(99, "gone") }));

        let snapshot = replay(&issue, t(2)).expect("replay").into_snapshot().expect("exists");
        assert!(snapshot.labels.is_empty());
    }

    #[test]
    fn unwinds_lock_and_title() {
        let mut issue = issue_created(1);
        issue.title = "Panic in parser".to_string();
        issue.locked = true;
        issue.events.push(Event::new(
            t(3),
            EventKind::Renamed {
                rename: Rename { from: "parser bug".to_string(), to: "Panic in parser".to_string() },
            },
        ));
        issue.events.push(Event::new(t(4), EventKind::Locked));
        issue.events.push(Event::new(t(5), EventKind::Assigned));

        let snapshot = replay(&issue, t(2)).expect("replay").into_snapshot().expect("exists");
        assert!(!snapshot.locked);
        assert_eq!(snapshot.title, "parser bug");
    }

    #[test]
    fn unlocked_event_unwinds_to_locked() {
        let mut issue = issue_created(1);
        issue.events.push(Event::new(t(4), EventKind::Unlocked));
        let snapshot = replay(&issue, t(3)).expect("replay").into_snapshot().expect("exists");
        assert!(snapshot.locked);
    }

    #[test]
    fn unrecognized_event_fails_loudly() {
        let mut issue = issue_created(1);
        let tag = "cross-referenced".to_string();
        issue.events.push(Event::new(t(4), EventKind::Unrecognized { event: tag }));

        let err = replay(&issue, t(2)).expect_err("must fail");
        assert!(err.to_string().contains("cannot unwind 'cross-referenced' event"));

        // Only events being unwound are inspected.
        assert!(replay(&issue, t(5)).is_ok());
    }

    #[test]
    fn replay_is_deterministic() {
        let mut issue = issue_created(1);
        issue.events.push(Event::new(t(2), EventKind::Closed));
        issue.events.push(Event::new(t(2) + Duration::hours(1), EventKind::Reopened));
        let a = replay(&issue, t(2)).expect("replay");
        let b = replay(&issue, t(2)).expect("replay");
        assert_eq!(a, b);
    }

    #[test]
    fn replay_many_skips_issues_not_yet_created() {
        let early = issue_created(1);
        let late = issue_created(20);
        let snapshots = replay_many([&early, &late], t(10)).expect("replay");
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].created_at, early.created_at);
    }
}
