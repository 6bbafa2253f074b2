use chrono::{DateTime, NaiveDate, Utc};
use log::{debug, warn};

use crate::io::kv_store::{KeyValueStore, PersistenceError};
use crate::io::persistence;
use crate::model::task::{Category, Task, TaskId};

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("task text cannot be empty")]
    EmptyText,
    #[error("no task id left above {0}")]
    IdsExhausted(TaskId),
    #[error("could not save tasks: {0}")]
    Persistence(#[from] PersistenceError),
}

/// A field edit: leave it, clear it, or set it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch<T> {
    Keep,
    Clear,
    Set(T),
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Patch::Keep
    }
}

impl<T> Patch<T> {
    fn apply(self, field: &mut Option<T>) {
        match self {
            Patch::Keep => {}
            Patch::Clear => *field = None,
            Patch::Set(v) => *field = Some(v),
        }
    }
}

impl Patch<Category> {
    /// Adapter input: `""` clears, anything else sets.
    pub fn from_input(s: &str) -> Self {
        let s = s.trim();
        if s.is_empty() {
            Patch::Clear
        } else {
            Patch::Set(Category::from(s.to_string()))
        }
    }
}

impl Patch<NaiveDate> {
    /// Adapter input: `""` clears, otherwise a `YYYY-MM-DD` date.
    pub fn from_input(s: &str) -> Result<Self, chrono::ParseError> {
        let s = s.trim();
        if s.is_empty() {
            Ok(Patch::Clear)
        } else {
            NaiveDate::parse_from_str(s, "%Y-%m-%d").map(Patch::Set)
        }
    }
}

/// Fields to change on an existing task. `text: None` keeps the current text.
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub text: Option<String>,
    pub due_date: Patch<NaiveDate>,
    pub category: Patch<Category>,
}

/// The authoritative task collection, saved to `backend` after every mutation.
///
/// Iteration order is newest-first (creation prepends). Display order is
/// never taken from iteration order; it comes from `position`.
///
/// When a save fails the in-memory change is kept and the error is returned;
/// the next successful save brings storage back in line.
#[derive(Debug)]
pub struct TaskStore<S> {
    tasks: Vec<Task>,
    backend: S,
}

impl<S: KeyValueStore> TaskStore<S> {
    /// Load the collection from `backend`.
    pub fn open(mut backend: S) -> Result<Self, StoreError> {
        let tasks = persistence::load_tasks(&mut backend)?;
        Ok(TaskStore { tasks, backend })
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut S {
        &mut self.backend
    }

    /// Give back the backend, e.g. at shutdown after a final `persist`.
    pub fn into_backend(self) -> S {
        self.backend
    }

    /// Read-only snapshot in storage order.
    pub fn all(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Write the whole collection to the backend.
    pub fn persist(&mut self) -> Result<(), StoreError> {
        persistence::save_tasks(&mut self.backend, &self.tasks).map_err(|e| {
            warn!("persist failed, storage is behind memory: {}", e);
            StoreError::from(e)
        })
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Create a task at the head of the collection.
    pub fn create(
        &mut self,
        text: &str,
        due_date: Option<NaiveDate>,
        category: Option<Category>,
    ) -> Result<Task, StoreError> {
        self.create_at(text, due_date, category, Utc::now())
    }

    /// `create` with an explicit creation time.
    pub fn create_at(
        &mut self,
        text: &str,
        due_date: Option<NaiveDate>,
        category: Option<Category>,
        now: DateTime<Utc>,
    ) -> Result<Task, StoreError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(StoreError::EmptyText);
        }

        let id = self.next_id(now)?;
        let mut task = Task::new(id, text.to_string(), now, self.tasks.len() as i64);
        task.due_date = due_date;
        task.category = category;

        self.tasks.insert(0, task.clone());
        debug!("created task {} at position {}", task.id, task.position);
        self.persist()?;
        Ok(task)
    }

    /// Remove a task. Returns the removed task, or `None` if no such id.
    pub fn delete(&mut self, id: TaskId) -> Result<Option<Task>, StoreError> {
        let Some(idx) = self.tasks.iter().position(|t| t.id == id) else {
            return Ok(None);
        };
        let removed = self.tasks.remove(idx);
        debug!("deleted task {}", id);
        self.persist()?;
        Ok(Some(removed))
    }

    /// Flip `completed`. Returns the new value, or `None` if no such id.
    pub fn toggle_completed(&mut self, id: TaskId) -> Result<Option<bool>, StoreError> {
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            return Ok(None);
        };
        task.completed = !task.completed;
        let completed = task.completed;
        debug!("task {} completed={}", id, completed);
        self.persist()?;
        Ok(Some(completed))
    }

    /// Edit a task. Returns the updated task, or `None` if no such id.
    /// Blank resolved text is rejected before anything changes.
    pub fn update(&mut self, id: TaskId, update: TaskUpdate) -> Result<Option<Task>, StoreError> {
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            return Ok(None);
        };
        let text = match &update.text {
            Some(t) => t.trim().to_string(),
            None => task.text.clone(),
        };
        if text.is_empty() {
            return Err(StoreError::EmptyText);
        }

        task.text = text;
        update.due_date.apply(&mut task.due_date);
        update.category.apply(&mut task.category);
        let updated = task.clone();
        debug!("updated task {}", id);
        self.persist()?;
        Ok(Some(updated))
    }

    /// Remove every completed task. Always persists. Returns how many were removed.
    pub fn clear_completed(&mut self) -> Result<usize, StoreError> {
        let before = self.tasks.len();
        self.tasks.retain(|t| !t.completed);
        let removed = before - self.tasks.len();
        debug!("cleared {} completed tasks", removed);
        self.persist()?;
        Ok(removed)
    }

    /// Replace the whole collection. Positions are renormalized to `0..n-1`
    /// keeping their existing relative order (ties keep input order).
    pub fn replace_all(&mut self, mut tasks: Vec<Task>) -> Result<(), StoreError> {
        normalize_positions(&mut tasks);
        debug!("replaced collection with {} tasks", tasks.len());
        self.tasks = tasks;
        self.persist()
    }

    /// Set `position = i` for the id at index `i`. Ids not listed keep their
    /// position; listed ids that do not exist are skipped. Always persists.
    /// Returns how many tasks were renumbered.
    pub fn renumber(&mut self, ordered_ids: &[TaskId]) -> Result<usize, StoreError> {
        let mut touched = 0;
        for (i, id) in ordered_ids.iter().enumerate() {
            if let Some(task) = self.tasks.iter_mut().find(|t| t.id == *id) {
                task.position = i as i64;
                touched += 1;
            }
        }
        debug!("renumbered {} of {} tasks", touched, self.tasks.len());
        self.persist()?;
        Ok(touched)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Millisecond timestamp, bumped past the largest id already in use.
    fn next_id(&self, now: DateTime<Utc>) -> Result<TaskId, StoreError> {
        let floor = match self.tasks.iter().map(|t| t.id).max() {
            Some(max) => max.checked_add(1).ok_or(StoreError::IdsExhausted(max))?,
            None => TaskId::MIN,
        };
        Ok(now.timestamp_millis().max(floor))
    }
}

/// Rewrite positions as `0..n-1` in current position order, stable on ties.
/// The vector itself is left in its original order.
pub fn normalize_positions(tasks: &mut [Task]) {
    let mut order: Vec<usize> = (0..tasks.len()).collect();
    order.sort_by_key(|&i| tasks[i].position);
    for (rank, idx) in order.into_iter().enumerate() {
        tasks[idx].position = rank as i64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::kv_store::MemoryStore;
    use crate::io::persistence::{TASKS_KEY, load_tasks};
    use pretty_assertions::assert_eq;

    fn store() -> TaskStore<MemoryStore> {
        TaskStore::open(MemoryStore::new()).unwrap()
    }

    fn at(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(ms).unwrap()
    }

    fn ids<S: KeyValueStore>(store: &TaskStore<S>) -> Vec<TaskId> {
        store.all().iter().map(|t| t.id).collect()
    }

    #[test]
    fn create_prepends_and_counts_positions() {
        let mut s = store();
        let a = s.create_at("first", None, None, at(1000)).unwrap();
        let b = s.create_at("second", None, None, at(2000)).unwrap();
        assert_eq!(a.position, 0);
        assert_eq!(b.position, 1);
        assert_eq!(ids(&s), vec![2000, 1000]);
        assert_eq!(load_tasks(s.backend_mut()).unwrap().len(), 2);
    }

    #[test]
    fn create_trims_and_keeps_line_breaks() {
        let mut s = store();
        let t = s.create_at("  line one\nline two  \n", None, None, at(1)).unwrap();
        assert_eq!(t.text, "line one\nline two");
    }

    #[test]
    fn create_rejects_blank_text() {
        let mut s = store();
        assert!(matches!(s.create("", None, None), Err(StoreError::EmptyText)));
        assert!(matches!(s.create("   ", None, None), Err(StoreError::EmptyText)));
        assert!(s.is_empty());
        // Nothing was written either
        assert_eq!(s.backend().get(TASKS_KEY).unwrap(), None);
    }

    #[test]
    fn ids_stay_unique_within_one_millisecond() {
        let mut s = store();
        let a = s.create_at("a", None, None, at(5000)).unwrap();
        let b = s.create_at("b", None, None, at(5000)).unwrap();
        let c = s.create_at("c", None, None, at(4000)).unwrap();
        assert_eq!(a.id, 5000);
        assert_eq!(b.id, 5001);
        assert_eq!(c.id, 5002);
    }

    #[test]
    fn create_after_largest_id_is_an_error() {
        let mut s = store();
        s.replace_all(vec![Task::new(TaskId::MAX, "last".into(), at(1), 0)])
            .unwrap();
        let stored = s.backend().get(TASKS_KEY).unwrap();

        let err = s.create_at("after", None, None, at(2)).unwrap_err();
        assert!(matches!(err, StoreError::IdsExhausted(TaskId::MAX)));
        assert_eq!(ids(&s), vec![TaskId::MAX]);
        assert_eq!(s.backend().get(TASKS_KEY).unwrap(), stored);
    }

    #[test]
    fn missing_ids_do_not_persist() {
        let mut s = store();
        assert_eq!(s.delete(99).unwrap(), None);
        assert_eq!(s.toggle_completed(99).unwrap(), None);
        assert_eq!(s.backend().get(TASKS_KEY).unwrap(), None);
    }

    #[test]
    fn delete_missing_is_noop() {
        let mut s = store();
        s.create_at("a", None, None, at(1)).unwrap();
        assert_eq!(s.delete(99).unwrap(), None);
        assert_eq!(s.len(), 1);
        let removed = s.delete(1).unwrap().unwrap();
        assert_eq!(removed.text, "a");
        assert!(s.is_empty());
    }

    #[test]
    fn toggle_twice_restores() {
        let mut s = store();
        s.create_at("a", None, None, at(1)).unwrap();
        assert_eq!(s.toggle_completed(1).unwrap(), Some(true));
        assert_eq!(s.toggle_completed(1).unwrap(), Some(false));
        assert_eq!(s.toggle_completed(42).unwrap(), None);
        assert!(!s.get(1).unwrap().completed);
    }

    #[test]
    fn update_keep_clear_set() {
        let mut s = store();
        let due = NaiveDate::from_ymd_opt(2024, 6, 14);
        s.create_at("a", due, Some(Category::Work), at(1)).unwrap();

        // Keep everything except text
        let t = s
            .update(
                1,
                TaskUpdate {
                    text: Some(" renamed ".into()),
                    ..Default::default()
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(t.text, "renamed");
        assert_eq!(t.due_date, due);
        assert_eq!(t.category, Some(Category::Work));

        // Clear due, set category, keep text
        let t = s
            .update(
                1,
                TaskUpdate {
                    text: None,
                    due_date: Patch::Clear,
                    category: Patch::Set(Category::Health),
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(t.text, "renamed");
        assert_eq!(t.due_date, None);
        assert_eq!(t.category, Some(Category::Health));
    }

    #[test]
    fn update_blank_text_changes_nothing() {
        let mut s = store();
        s.create_at("keep me", None, None, at(1)).unwrap();
        let err = s
            .update(
                1,
                TaskUpdate {
                    text: Some("  ".into()),
                    category: Patch::Set(Category::Other),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::EmptyText));
        let t = s.get(1).unwrap();
        assert_eq!(t.text, "keep me");
        assert_eq!(t.category, None);

        let stored = load_tasks(s.backend_mut()).unwrap();
        assert_eq!(stored[0].text, "keep me");
        assert_eq!(stored[0].category, None);
    }

    #[test]
    fn update_persists_on_success() {
        let mut s = store();
        s.create_at("draft", None, None, at(1)).unwrap();
        let update = TaskUpdate {
            text: Some("final".into()),
            category: Patch::Set(Category::Academic),
            ..Default::default()
        };
        s.update(1, update).unwrap().unwrap();

        let stored = load_tasks(s.backend_mut()).unwrap();
        assert_eq!(stored[0].text, "final");
        assert_eq!(stored[0].category, Some(Category::Academic));
    }

    #[test]
    fn update_missing_is_none() {
        let mut s = store();
        assert!(s.update(7, TaskUpdate::default()).unwrap().is_none());
    }

    #[test]
    fn patch_from_input() {
        assert_eq!(Patch::<Category>::from_input(""), Patch::Clear);
        assert_eq!(
            Patch::<Category>::from_input("errands"),
            Patch::Set(Category::Custom("errands".into()))
        );
        assert_eq!(Patch::<NaiveDate>::from_input(" ").unwrap(), Patch::Clear);
        assert_eq!(
            Patch::<NaiveDate>::from_input("2024-06-15").unwrap(),
            Patch::Set(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap())
        );
        assert!(Patch::<NaiveDate>::from_input("tomorrow").is_err());
    }

    #[test]
    fn clear_completed_is_idempotent() {
        let mut s = store();
        s.create_at("a", None, None, at(1)).unwrap();
        s.create_at("b", None, None, at(2)).unwrap();
        s.toggle_completed(1).unwrap();
        assert_eq!(s.clear_completed().unwrap(), 1);
        assert_eq!(ids(&s), vec![2]);
        assert_eq!(s.clear_completed().unwrap(), 0);
        assert_eq!(ids(&s), vec![2]);
    }

    #[test]
    fn clear_completed_writes_even_when_nothing_removed() {
        let mut s = store();
        assert_eq!(s.clear_completed().unwrap(), 0);
        assert_eq!(s.backend().get(TASKS_KEY).unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn replace_all_normalizes_positions() {
        let mut s = store();
        s.create_at("old", None, None, at(1)).unwrap();
        let mut a = Task::new(10, "a".into(), at(10), 7);
        let b = Task::new(11, "b".into(), at(11), 3);
        let c = Task::new(12, "c".into(), at(12), 7);
        a.completed = true;
        s.replace_all(vec![a, b, c]).unwrap();

        let positions: Vec<(TaskId, i64)> = s.all().iter().map(|t| (t.id, t.position)).collect();
        assert_eq!(positions, vec![(10, 1), (11, 0), (12, 2)]);
        assert!(s.get(1).is_none());
        assert!(s.get(10).unwrap().completed);
    }

    #[test]
    fn renumber_sets_listed_positions_only() {
        let mut s = store();
        for ms in 1..=4 {
            s.create_at(&format!("t{}", ms), None, None, at(ms)).unwrap();
        }
        // 4 keeps its prior position (3); 99 does not exist
        assert_eq!(s.renumber(&[3, 1, 99, 2]).unwrap(), 3);
        assert_eq!(s.get(3).unwrap().position, 0);
        assert_eq!(s.get(1).unwrap().position, 1);
        assert_eq!(s.get(2).unwrap().position, 3);
        assert_eq!(s.get(4).unwrap().position, 3);
    }

    #[test]
    fn persist_failure_keeps_memory_change() {
        // Enough room for one small task, not two
        let mut s = TaskStore::open(MemoryStore::with_quota(200)).unwrap();
        s.create_at("a", None, None, at(1)).unwrap();
        let err = s.create_at("b", None, None, at(2)).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Persistence(PersistenceError::QuotaExceeded { .. })
        ));
        assert_eq!(s.len(), 2);
        // Storage still holds the last good state
        assert_eq!(load_tasks(s.backend_mut()).unwrap().len(), 1);
        // The store stays usable
        s.delete(2).unwrap();
        assert_eq!(load_tasks(s.backend_mut()).unwrap().len(), 1);
    }
}
