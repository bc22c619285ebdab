use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::task::Task;

const DEMO_MOVIES: [(&str, &str, &str); 5] = [
    ("The Godfather", "175 min", "(R)"),
    ("World War Z", "125 min", "(PG-13)"),
    ("The Conjuring", "100 min", "(PG-13)"),
    ("The Gladiator", "130 min", "(R)"),
    ("Man of Steel", "135 min", "(PG)"),
];

/// In-memory owner of the watch-list.
///
/// Holds the active list in display order and the archive as a LIFO stack.
/// Every operation is total: an unknown id is reported through the return
/// value and leaves both lists untouched.
#[derive(Debug, Clone, Default)]
pub struct TaskStore {
    active: Vec<Task>,
    archive: Vec<Task>,
    revision: u64,
}

/// Owned view of the store handed to renderers and exporters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreSnapshot {
    pub active: Vec<Task>,
    pub archived_count: usize,
    pub has_active_tasks: bool,
    pub has_archived_tasks: bool,
    pub revision: u64,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a new task and returns its id.
    #[tracing::instrument(skip(self, title, runtime, rating))]
    pub fn add(
        &mut self,
        title: impl Into<String>,
        runtime: impl Into<String>,
        rating: impl Into<String>,
    ) -> Uuid {
        let id = self.fresh_id();
        self.active
            .push(Task::new(id, title.into(), runtime.into(), rating.into()));
        self.revision += 1;

        debug!(%id, active = self.active.len(), "task added");
        id
    }

    /// Replaces the content fields of the active task `id` in place.
    #[tracing::instrument(skip(self, title, runtime, rating), fields(id = %id))]
    pub fn update(
        &mut self,
        id: Uuid,
        title: impl Into<String>,
        runtime: impl Into<String>,
        rating: impl Into<String>,
    ) -> bool {
        let Some(task) = self.active.iter_mut().find(|t| t.id == id) else {
            debug!("update ignored; id not in active list");
            return false;
        };

        task.title = title.into();
        task.runtime = runtime.into();
        task.rating = rating.into();
        self.revision += 1;

        debug!("task updated");
        true
    }

    /// Moves the active task `id` onto the archive stack.
    ///
    /// The archive only grows when the removal happened.
    #[tracing::instrument(skip(self), fields(id = %id))]
    pub fn delete(&mut self, id: Uuid) -> bool {
        let Some(idx) = self.active.iter().position(|t| t.id == id) else {
            debug!("delete ignored; id not in active list");
            return false;
        };

        let task = self.active.remove(idx);
        self.archive.push(task);
        self.revision += 1;

        debug!(
            active = self.active.len(),
            archived = self.archive.len(),
            "task archived"
        );
        true
    }

    /// Pops the most recently archived task back to the end of the active list.
    #[tracing::instrument(skip(self))]
    pub fn restore_last(&mut self) -> Option<Uuid> {
        let Some(task) = self.archive.pop() else {
            debug!("restore ignored; archive is empty");
            return None;
        };

        let id = task.id;
        self.active.push(task);
        self.revision += 1;

        debug!(%id, archived = self.archive.len(), "task restored");
        Some(id)
    }

    /// Adds the fixed demo movies, for trying the list out by hand.
    #[tracing::instrument(skip(self))]
    pub fn seed_demo(&mut self) {
        for (title, runtime, rating) in DEMO_MOVIES {
            self.add(title, runtime, rating);
        }
    }

    pub fn has_archived_tasks(&self) -> bool {
        !self.archive.is_empty()
    }

    // Only checks that the active list is non-empty.
    pub fn has_active_tasks(&self) -> bool {
        !self.active.is_empty()
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.active.iter().any(|t| t.id == id)
    }

    pub fn get(&self, id: Uuid) -> Option<&Task> {
        self.active.iter().find(|t| t.id == id)
    }

    pub fn tasks(&self) -> &[Task] {
        &self.active
    }

    /// Archived tasks, oldest first; the last one is restored next.
    pub fn archived(&self) -> &[Task] {
        &self.archive
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            active: self.active.clone(),
            archived_count: self.archive.len(),
            has_active_tasks: self.has_active_tasks(),
            has_archived_tasks: self.has_archived_tasks(),
            revision: self.revision,
        }
    }

    fn fresh_id(&self) -> Uuid {
        loop {
            let id = Uuid::new_v4();
            let taken = self.contains(id) || self.archive.iter().any(|t| t.id == id);
            if !taken {
                return id;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::TaskStore;

    fn titles(store: &TaskStore) -> Vec<&str> {
        store.tasks().iter().map(|t| t.title.as_str()).collect()
    }

    #[test]
    fn add_appends_in_order_with_unique_ids() {
        let mut store = TaskStore::new();
        let a = store.add("A", "10 min", "(G)");
        let b = store.add("B", "20 min", "(R)");
        let c = store.add("", "", "");

        assert_eq!(titles(&store), vec!["A", "B", ""]);
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_ne!(a, c);
        assert!(store.has_active_tasks());
        assert!(!store.has_archived_tasks());
    }

    #[test]
    fn update_keeps_id_and_position() {
        let mut store = TaskStore::new();
        store.add("A", "10 min", "(G)");
        let b = store.add("B", "20 min", "(R)");
        store.add("C", "30 min", "(PG)");

        assert!(store.update(b, "B2", "21 min", "(PG)"));

        let task = &store.tasks()[1];
        assert_eq!(task.id, b);
        assert_eq!(task.title, "B2");
        assert_eq!(task.runtime, "21 min");
        assert_eq!(task.rating, "(PG)");
        assert_eq!(titles(&store), vec!["A", "B2", "C"]);
    }

    #[test]
    fn update_unknown_id_is_a_noop() {
        let mut store = TaskStore::new();
        store.add("A", "10 min", "(G)");
        let before = store.tasks().to_vec();
        let revision = store.revision();

        assert!(!store.update(Uuid::new_v4(), "X", "1 min", "(R)"));
        assert_eq!(store.tasks(), before.as_slice());
        assert_eq!(store.revision(), revision);
    }

    #[test]
    fn archived_tasks_cannot_be_updated() {
        let mut store = TaskStore::new();
        let a = store.add("A", "10 min", "(G)");
        store.delete(a);

        assert!(!store.update(a, "A2", "11 min", "(R)"));
        assert_eq!(store.archived()[0].title, "A");
    }

    #[test]
    fn delete_unknown_id_leaves_archive_alone() {
        let mut store = TaskStore::new();
        store.add("A", "10 min", "(G)");

        assert!(!store.delete(Uuid::new_v4()));
        assert_eq!(store.tasks().len(), 1);
        assert!(store.archived().is_empty());
        assert!(!store.has_archived_tasks());
    }

    #[test]
    fn deleting_twice_archives_once() {
        let mut store = TaskStore::new();
        let a = store.add("A", "10 min", "(G)");

        assert!(store.delete(a));
        assert!(!store.delete(a));
        assert_eq!(store.archived().len(), 1);
    }

    #[test]
    fn restore_on_empty_archive_does_nothing() {
        let mut store = TaskStore::new();
        store.add("A", "10 min", "(G)");
        let revision = store.revision();

        assert_eq!(store.restore_last(), None);
        assert_eq!(titles(&store), vec!["A"]);
        assert_eq!(store.revision(), revision);
    }

    #[test]
    fn restores_in_reverse_deletion_order() {
        let mut store = TaskStore::new();
        let a = store.add("A", "", "");
        let b = store.add("B", "", "");
        let c = store.add("C", "", "");

        store.delete(b);
        store.delete(a);
        store.delete(c);
        assert!(!store.has_active_tasks());

        assert_eq!(store.restore_last(), Some(c));
        assert_eq!(store.restore_last(), Some(a));
        assert_eq!(store.restore_last(), Some(b));
        assert_eq!(titles(&store), vec!["C", "A", "B"]);
        assert!(!store.has_archived_tasks());
    }

    #[test]
    fn revision_counts_successful_mutations() {
        let mut store = TaskStore::new();
        assert_eq!(store.revision(), 0);

        let a = store.add("A", "", "");
        store.update(a, "A2", "", "");
        store.delete(Uuid::new_v4());
        store.delete(a);
        store.restore_last();
        store.restore_last();

        assert_eq!(store.revision(), 4);
    }

    #[test]
    fn seed_demo_adds_five_movies() {
        let mut store = TaskStore::new();
        store.seed_demo();

        assert_eq!(
            titles(&store),
            vec![
                "The Godfather",
                "World War Z",
                "The Conjuring",
                "The Gladiator",
                "Man of Steel",
            ]
        );
        assert_eq!(store.tasks()[1].rating, "(PG-13)");
        assert_eq!(store.tasks()[4].runtime, "135 min");
    }

    #[test]
    fn snapshot_reflects_flags() {
        let mut store = TaskStore::new();
        let a = store.add("A", "10 min", "(G)");
        store.add("B", "20 min", "(R)");
        store.delete(a);

        let snap = store.snapshot();
        assert_eq!(snap.active.len(), 1);
        assert_eq!(snap.archived_count, 1);
        assert!(snap.has_active_tasks);
        assert!(snap.has_archived_tasks);
        assert_eq!(snap.revision, store.revision());
    }
}
