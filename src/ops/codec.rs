use std::collections::HashSet;

use chrono::{DateTime, SecondsFormat, Utc};
use log::info;
use serde::Serialize;

use crate::io::kv_store::KeyValueStore;
use crate::model::task::{Task, TaskId};
use crate::ops::store::{StoreError, TaskStore};

/// Version tag written into every export
pub const EXPORT_VERSION: &str = "1.0";

/// Error type for import/export
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("could not parse import file: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("invalid file format: expected a \"tasks\" array")]
    MissingTasks,
    #[error("invalid task at index {index}: {reason}")]
    Record { index: usize, reason: String },
    #[error("duplicate task id {0} in import file")]
    DuplicateId(TaskId),
    #[error("could not serialize export: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CodecError {
    /// Whether the input itself was rejected (as opposed to a save failure)
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            CodecError::Parse(_)
                | CodecError::MissingTasks
                | CodecError::Record { .. }
                | CodecError::DuplicateId(_)
        )
    }
}

/// The portable document
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportDocument<'a> {
    tasks: &'a [Task],
    export_date: String,
    version: &'static str,
}

/// Serialize the whole collection, in storage order, as pretty JSON.
pub fn export_document(tasks: &[Task], now: DateTime<Utc>) -> Result<String, CodecError> {
    let doc = ExportDocument {
        tasks,
        export_date: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        version: EXPORT_VERSION,
    };
    let out = serde_json::to_string_pretty(&doc).map_err(CodecError::Serialize)?;
    info!("exported {} tasks", tasks.len());
    Ok(out)
}

/// `<prefix>-YYYY-MM-DD.json` for the (UTC) export date
pub fn export_file_name(prefix: &str, now: DateTime<Utc>) -> String {
    format!("{}-{}.json", prefix, now.format("%Y-%m-%d"))
}

/// A validated import, waiting for confirmation
#[derive(Debug)]
pub struct ImportPlan {
    pub tasks: Vec<Task>,
}

impl ImportPlan {
    pub fn count(&self) -> usize {
        self.tasks.len()
    }

    /// The question put to the user before replacing anything
    pub fn confirmation_prompt(&self) -> String {
        format!(
            "Import {} tasks? This will replace your current tasks.",
            self.count()
        )
    }
}

/// Parse and validate raw import text.
/// The document must be an object with an array-typed `tasks` field and every
/// element must decode as a task with non-blank text and a unique id.
pub fn parse_import(raw: &str) -> Result<ImportPlan, CodecError> {
    let value: serde_json::Value = serde_json::from_str(raw).map_err(CodecError::Parse)?;
    let Some(records) = value.get("tasks").and_then(|t| t.as_array()) else {
        return Err(CodecError::MissingTasks);
    };

    let mut tasks = Vec::with_capacity(records.len());
    let mut seen = HashSet::new();
    for (index, record) in records.iter().enumerate() {
        let task: Task = serde_json::from_value(record.clone()).map_err(|e| CodecError::Record {
            index,
            reason: e.to_string(),
        })?;
        if task.text.trim().is_empty() {
            return Err(CodecError::Record {
                index,
                reason: "text is empty".to_string(),
            });
        }
        if !seen.insert(task.id) {
            return Err(CodecError::DuplicateId(task.id));
        }
        tasks.push(task);
    }
    Ok(ImportPlan { tasks })
}

/// What happened to a validated import
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    Imported(usize),
    Declined(usize),
}

/// Validate `raw`, ask `confirm` with the task count, and on `true` replace
/// the whole collection. Nothing changes on a validation error or a decline.
pub fn import_document<S, F>(
    store: &mut TaskStore<S>,
    raw: &str,
    confirm: F,
) -> Result<ImportOutcome, CodecError>
where
    S: KeyValueStore,
    F: FnOnce(&ImportPlan) -> bool,
{
    let plan = parse_import(raw)?;
    let count = plan.count();
    if !confirm(&plan) {
        info!("import of {} tasks declined", count);
        return Ok(ImportOutcome::Declined(count));
    }
    store.replace_all(plan.tasks)?;
    info!("imported {} tasks", count);
    Ok(ImportOutcome::Imported(count))
}
