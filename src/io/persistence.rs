use log::{debug, warn};

use crate::io::kv_store::{KeyValueStore, PersistenceError};
use crate::model::task::Task;
use crate::model::theme::Theme;

/// Key holding the JSON array of tasks
pub const TASKS_KEY: &str = "tasks";
/// Key holding `light` or `dark`
pub const THEME_KEY: &str = "theme";
/// Where an unreadable tasks blob is set aside
pub const TASKS_BACKUP_KEY: &str = "tasks.bak";

/// Load the task collection.
/// A missing key is an empty collection. A corrupted blob is copied to
/// `tasks.bak` and an empty collection is returned.
pub fn load_tasks<S: KeyValueStore>(store: &mut S) -> Result<Vec<Task>, PersistenceError> {
    let Some(content) = store.get(TASKS_KEY)? else {
        return Ok(Vec::new());
    };
    match serde_json::from_str::<Option<Vec<Task>>>(&content) {
        Ok(tasks) => {
            let tasks = tasks.unwrap_or_default();
            debug!("loaded {} tasks", tasks.len());
            Ok(tasks)
        }
        Err(e) => {
            store.set(TASKS_BACKUP_KEY, &content)?;
            warn!(
                "could not parse stored tasks (backed up as {}): {}",
                TASKS_BACKUP_KEY, e
            );
            Ok(Vec::new())
        }
    }
}

/// Overwrite the stored task collection.
pub fn save_tasks<S: KeyValueStore>(store: &mut S, tasks: &[Task]) -> Result<(), PersistenceError> {
    let content = serde_json::to_string(tasks)?;
    store.set(TASKS_KEY, &content)
}

/// Load the theme preference. Absent or unrecognized means light.
pub fn load_theme<S: KeyValueStore>(store: &S) -> Theme {
    match store.get(THEME_KEY) {
        Ok(Some(value)) => value.trim().parse().unwrap_or_else(|e| {
            warn!("{}; using light", e);
            Theme::Light
        }),
        Ok(None) => Theme::Light,
        Err(e) => {
            warn!("could not read theme: {}", e);
            Theme::Light
        }
    }
}

/// Persist the theme preference.
pub fn save_theme<S: KeyValueStore>(store: &mut S, theme: Theme) -> Result<(), PersistenceError> {
    store.set(THEME_KEY, theme.as_str())
}
