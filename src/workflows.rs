//! Query engine projecting raw stored events into workflow summaries.
//!
//! Records qualify by carrying a `workflow_job` field; everything else in
//! the container is invisible here. Qualifying records are sorted newest
//! first by their store-assigned `createdAt`, truncated, and projected
//! into the fixed camelCase [`WorkflowSummary`] shape.

use crate::event_store::FileEventStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

/// One step of a workflow job run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStep {
    pub name: String,
    pub status: String,
    pub conclusion: Option<String>,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
}

/// The typed view of a workflow-job event exposed to readers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSummary {
    pub action: String,
    pub run_attempt: i64,
    pub name: String,
    pub run_url: String,
    pub run_id: i64,
    pub conclusion: Option<String>,
    pub steps: Vec<WorkflowStep>,
}

/// Shape a stored event must deserialize into to be projectable.
/// Field names here are GitHub's snake_case wire names.
#[derive(Deserialize)]
struct RawWorkflowEvent {
    action: String,
    workflow_job: RawWorkflowJob,
}

#[derive(Deserialize)]
struct RawWorkflowJob {
    run_attempt: i64,
    name: String,
    run_url: String,
    run_id: i64,
    conclusion: Option<String>,
    steps: Vec<RawStep>,
}

#[derive(Deserialize)]
struct RawStep {
    name: String,
    status: String,
    conclusion: Option<String>,
    started_at: Option<String>,
    completed_at: Option<String>,
}

/// Returns at most `limit` summaries of the most recent workflow-job
/// events, newest first.
///
/// A qualifying record that fails projection (missing or mistyped nested
/// fields) is skipped with a warning rather than failing the whole list.
pub fn list_recent_workflows(store: &FileEventStore, limit: usize) -> Vec<WorkflowSummary> {
    let mut qualifying: Vec<Value> = store
        .all_raw()
        .into_iter()
        .filter(|event| event.get("workflow_job").is_some())
        .collect();

    // Stable sort on the timestamp alone keeps append order among equal
    // (or unparseable) timestamps deterministic.
    qualifying.sort_by(|a, b| compare_created_at_desc(a, b));

    qualifying
        .into_iter()
        .take(limit)
        .filter_map(|event| match project(&event) {
            Ok(summary) => Some(summary),
            Err(e) => {
                tracing::warn!(error = %e, "skipping workflow event that failed projection");
                None
            }
        })
        .collect()
}

/// Orders two records newest-first by `createdAt`. Records without a
/// parseable timestamp sort after all dated ones.
fn compare_created_at_desc(a: &Value, b: &Value) -> Ordering {
    match (created_at(a), created_at(b)) {
        (Some(a_ts), Some(b_ts)) => b_ts.cmp(&a_ts),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn created_at(event: &Value) -> Option<DateTime<Utc>> {
    let raw = event.get("createdAt")?.as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

/// Pure mapping from one stored event to its summary. Renames the nested
/// snake_case fields (`run_attempt` -> `runAttempt` and so on).
fn project(event: &Value) -> Result<WorkflowSummary, serde_json::Error> {
    let raw: RawWorkflowEvent = serde_json::from_value(event.clone())?;
    let job = raw.workflow_job;

    Ok(WorkflowSummary {
        action: raw.action,
        run_attempt: job.run_attempt,
        name: job.name,
        run_url: job.run_url,
        run_id: job.run_id,
        conclusion: job.conclusion,
        steps: job
            .steps
            .into_iter()
            .map(|step| WorkflowStep {
                name: step.name,
                status: step.status,
                conclusion: step.conclusion,
                started_at: step.started_at,
                completed_at: step.completed_at,
            })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn store_with_events(events: &[Value]) -> (tempfile::TempDir, FileEventStore) {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("github-events.json");
        let container = json!({ "githubEvents": events });
        std::fs::write(&path, serde_json::to_string_pretty(&container).unwrap()).unwrap();
        (dir, FileEventStore::new(path))
    }

    fn job_event(created_at: &str, run_id: i64) -> Value {
        json!({
            "action": "completed",
            "createdAt": created_at,
            "workflow_job": {
                "run_attempt": 1,
                "name": "build",
                "run_url": "https://api.github.com/repos/o/r/actions/runs/1",
                "run_id": run_id,
                "conclusion": "success",
                "steps": []
            }
        })
    }

    #[test]
    fn projects_all_fields_with_camel_case_renames() {
        let (_dir, store) = store_with_events(&[json!({
            "action": "completed",
            "createdAt": "2026-08-29T10:00:00.000Z",
            "workflow_job": {
                "run_attempt": 2,
                "name": "build",
                "run_url": "u",
                "run_id": 7,
                "conclusion": "success",
                "steps": [{
                    "name": "s1",
                    "status": "completed",
                    "conclusion": "success",
                    "started_at": "t0",
                    "completed_at": "t1"
                }]
            }
        })]);

        let summaries = list_recent_workflows(&store, 1);
        assert_eq!(
            summaries,
            vec![WorkflowSummary {
                action: "completed".to_string(),
                run_attempt: 2,
                name: "build".to_string(),
                run_url: "u".to_string(),
                run_id: 7,
                conclusion: Some("success".to_string()),
                steps: vec![WorkflowStep {
                    name: "s1".to_string(),
                    status: "completed".to_string(),
                    conclusion: Some("success".to_string()),
                    started_at: Some("t0".to_string()),
                    completed_at: Some("t1".to_string()),
                }],
            }]
        );

        let wire = serde_json::to_value(&summaries[0]).unwrap();
        assert_eq!(wire["runAttempt"], 2);
        assert_eq!(wire["runUrl"], "u");
        assert_eq!(wire["runId"], 7);
        assert_eq!(wire["steps"][0]["startedAt"], "t0");
        assert_eq!(wire["steps"][0]["completedAt"], "t1");
    }

    #[test]
    fn events_without_workflow_job_are_invisible() {
        let (_dir, store) = store_with_events(&[
            json!({ "action": "opened", "createdAt": "2026-08-29T10:00:00.000Z", "pull_request": {} }),
            job_event("2026-08-29T11:00:00.000Z", 1),
        ]);

        let summaries = list_recent_workflows(&store, 10);
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].run_id, 1);
    }

    #[test]
    fn orders_newest_first_and_truncates() {
        let (_dir, store) = store_with_events(&[
            job_event("2026-08-29T01:00:00.000Z", 1),
            job_event("2026-08-29T02:00:00.000Z", 2),
            job_event("2026-08-29T03:00:00.000Z", 3),
        ]);

        let summaries = list_recent_workflows(&store, 2);
        let ids: Vec<i64> = summaries.iter().map(|s| s.run_id).collect();
        assert_eq!(ids, vec![3, 2]);
    }

    #[test]
    fn equal_timestamps_preserve_append_order() {
        let (_dir, store) = store_with_events(&[
            job_event("2026-08-29T02:00:00.000Z", 1),
            job_event("2026-08-29T02:00:00.000Z", 2),
            job_event("2026-08-29T01:00:00.000Z", 3),
        ]);

        let ids: Vec<i64> = list_recent_workflows(&store, 10)
            .iter()
            .map(|s| s.run_id)
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn limit_zero_yields_empty_for_nonempty_store() {
        let (_dir, store) = store_with_events(&[job_event("2026-08-29T01:00:00.000Z", 1)]);
        assert!(list_recent_workflows(&store, 0).is_empty());
    }

    #[test]
    fn empty_and_missing_stores_yield_empty() {
        let (_dir, store) = store_with_events(&[]);
        assert!(list_recent_workflows(&store, 10).is_empty());

        let dir = tempdir().unwrap();
        let missing = FileEventStore::new(dir.path().join("never-written.json"));
        assert!(list_recent_workflows(&missing, 10).is_empty());
    }

    #[test]
    fn malformed_qualifying_record_is_skipped_not_fatal() {
        let (_dir, store) = store_with_events(&[
            // workflow_job present but null: qualifies, fails projection
            json!({ "action": "x", "createdAt": "2026-08-29T04:00:00.000Z", "workflow_job": null }),
            // steps missing entirely
            json!({
                "action": "completed",
                "createdAt": "2026-08-29T03:00:00.000Z",
                "workflow_job": { "run_attempt": 1, "name": "n", "run_url": "u", "run_id": 9 }
            }),
            job_event("2026-08-29T02:00:00.000Z", 5),
        ]);

        let summaries = list_recent_workflows(&store, 10);
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].run_id, 5);
    }

    #[test]
    fn unparseable_timestamps_sort_last() {
        let mut undated = job_event("", 1);
        undated["createdAt"] = Value::Null;
        let (_dir, store) = store_with_events(&[
            undated,
            job_event("2026-08-29T01:00:00.000Z", 2),
        ]);

        let ids: Vec<i64> = list_recent_workflows(&store, 10)
            .iter()
            .map(|s| s.run_id)
            .collect();
        assert_eq!(ids, vec![2, 1]);
    }
}
