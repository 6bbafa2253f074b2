use std::time::{Duration, Instant};

use chrono::NaiveDate;
use log::debug;

use crate::io::kv_store::KeyValueStore;
use crate::io::persistence;
use crate::model::task::Task;
use crate::model::theme::Theme;
use crate::ops::debounce::SearchDebouncer;
use crate::ops::filter::{
    self, CategoryFilter, StatusFilter, TaskStats, ViewFilters, filtered_view,
};
use crate::ops::store::{StoreError, TaskStore};

/// One running app: the store plus the view state the UI manipulates.
/// Built once from persisted state; `close` does the final save.
#[derive(Debug)]
pub struct Session<S> {
    store: TaskStore<S>,
    filters: ViewFilters,
    theme: Theme,
    debouncer: SearchDebouncer,
}

impl<S: KeyValueStore> Session<S> {
    pub fn open(backend: S, debounce: Duration) -> Result<Self, StoreError> {
        let theme = persistence::load_theme(&backend);
        let store = TaskStore::open(backend)?;
        debug!("session opened: {} tasks, {} theme", store.len(), theme);
        Ok(Session {
            store,
            filters: ViewFilters::default(),
            theme,
            debouncer: SearchDebouncer::new(debounce),
        })
    }

    pub fn store(&self) -> &TaskStore<S> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut TaskStore<S> {
        &mut self.store
    }

    pub fn filters(&self) -> &ViewFilters {
        &self.filters
    }

    pub fn set_status(&mut self, status: StatusFilter) {
        self.filters.status = status;
    }

    pub fn set_category(&mut self, category: CategoryFilter) {
        self.filters.category = category;
    }

    /// Apply a search query immediately.
    pub fn set_search_now(&mut self, query: &str) {
        self.filters.search = query.to_lowercase();
    }

    /// Record typed search input; it takes effect on a later `poll_search`.
    /// For interactive front ends. One-shot commands use `set_search_now`.
    pub fn push_search(&mut self, query: &str, at: Instant) {
        self.debouncer.push(query, at);
    }

    /// Apply the pending search if its quiet window has passed.
    /// Returns whether the view needs re-deriving.
    pub fn poll_search(&mut self, now: Instant) -> bool {
        match self.debouncer.poll(now) {
            Some(query) => {
                self.set_search_now(&query);
                true
            }
            None => false,
        }
    }

    /// The display list for the current filters.
    pub fn view(&self, today: NaiveDate) -> Vec<&Task> {
        filtered_view(self.store.all(), &self.filters, today)
    }

    pub fn stats(&self, today: NaiveDate) -> TaskStats {
        filter::task_stats(self.store.all(), today)
    }

    /// Footer text for the current status filter
    pub fn count_label(&self, today: NaiveDate) -> String {
        filter::count_label(self.filters.status, &self.stats(today))
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn set_theme(&mut self, theme: Theme) -> Result<(), StoreError> {
        self.theme = theme;
        persistence::save_theme(self.store.backend_mut(), theme)?;
        Ok(())
    }

    pub fn toggle_theme(&mut self) -> Result<Theme, StoreError> {
        let next = self.theme.toggled();
        self.set_theme(next)?;
        Ok(next)
    }

    /// Final save; hands back the backend.
    pub fn close(mut self) -> Result<S, StoreError> {
        self.store.persist()?;
        Ok(self.store.into_backend())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::persistence::{THEME_KEY, load_tasks};
    use crate::io::kv_store::MemoryStore;
    use crate::model::task::Category;
    use crate::ops::debounce::DEFAULT_DEBOUNCE;
    use chrono::{DateTime, Utc};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn at(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(ms).unwrap()
    }

    fn session() -> Session<MemoryStore> {
        let mut s = Session::open(MemoryStore::new(), DEFAULT_DEBOUNCE).unwrap();
        let store = s.store_mut();
        store
            .create_at("Buy Milk", None, Some(Category::Shopping), at(1))
            .unwrap();
        store
            .create_at(
                "File taxes",
                NaiveDate::from_ymd_opt(2024, 4, 15),
                Some(Category::Personal),
                at(2),
            )
            .unwrap();
        store.create_at("Stretch", None, Some(Category::Health), at(3)).unwrap();
        store.toggle_completed(3).unwrap();
        s
    }

    fn view_ids(s: &Session<MemoryStore>) -> Vec<i64> {
        s.view(today()).iter().map(|t| t.id).collect()
    }

    #[test]
    fn filters_drive_view_and_label() {
        let mut s = session();
        assert_eq!(view_ids(&s), vec![1, 2, 3]);
        assert_eq!(s.count_label(today()), "3 tasks total");

        s.set_status(StatusFilter::Overdue);
        assert_eq!(view_ids(&s), vec![2]);
        assert_eq!(s.count_label(today()), "1 overdue task");

        s.set_status(StatusFilter::All);
        s.set_category(CategoryFilter::Only(Category::Health));
        assert_eq!(view_ids(&s), vec![3]);
    }

    #[test]
    fn debounced_search_applies_latest_query() {
        let mut s = session();
        let t0 = Instant::now();
        s.push_search("TAX", t0);
        assert!(!s.poll_search(t0 + Duration::from_millis(10)));
        assert_eq!(view_ids(&s), vec![1, 2, 3]);

        s.push_search("MILK", t0 + Duration::from_millis(100));
        assert!(s.poll_search(t0 + Duration::from_millis(400)));
        assert_eq!(s.filters().search, "milk");
        assert_eq!(view_ids(&s), vec![1]);
    }

    #[test]
    fn theme_is_persisted() {
        let mut s = session();
        assert_eq!(s.theme(), Theme::Light);
        assert_eq!(s.toggle_theme().unwrap(), Theme::Dark);
        let backend = s.close().unwrap();
        assert_eq!(backend.get(THEME_KEY).unwrap().as_deref(), Some("dark"));

        let reopened = Session::open(backend, DEFAULT_DEBOUNCE).unwrap();
        assert_eq!(reopened.theme(), Theme::Dark);
        assert_eq!(reopened.store().len(), 3);
    }

    #[test]
    fn close_writes_final_state() {
        let s = session();
        let mut backend = s.close().unwrap();
        assert_eq!(load_tasks(&mut backend).unwrap().len(), 3);
    }
}
