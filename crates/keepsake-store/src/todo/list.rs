//! The persisted todo list.

use chrono::{DateTime, Utc};
use tracing::{debug, instrument, warn};

use super::{Filter, TODOS_KEY, Todo};
use crate::backend::PersistentStore;
use crate::cache::CachedStorage;
use crate::error::{StoreError, StoreResult};
use crate::position::{next_position, normalize_positions, reconcile_positions, sort_by_position};

/// In-memory view of the todos key, kept sorted by position.
///
/// Every mutation is applied to a copy, written through the cache, and only
/// then committed to `self`. A failed write leaves the list as it was.
#[derive(Debug, Clone, Default)]
pub struct TodoList {
    items: Vec<Todo>,
}

impl TodoList {
    /// Read the list from `storage`. A missing or undecodable value loads
    /// as an empty list. Positions are renumbered to `0..n` in stored
    /// order; the next mutation persists them.
    pub fn load<S: PersistentStore>(storage: &mut CachedStorage<S>) -> Self {
        let mut items: Vec<Todo> = match storage.try_get_json(TODOS_KEY) {
            Ok(items) => items.unwrap_or_default(),
            Err(err) => {
                warn!(%err, "stored todos unreadable, starting empty");
                Vec::new()
            }
        };
        normalize_positions(&mut items);
        debug!(count = items.len(), "todos loaded");
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Todo> {
        self.items.iter()
    }

    pub fn get(&self, id: &str) -> Option<&Todo> {
        self.items.iter().find(|todo| todo.id == id)
    }

    pub fn filtered(&self, filter: Filter) -> impl Iterator<Item = &Todo> {
        self.items.iter().filter(move |todo| filter.matches(todo))
    }

    pub fn active_count(&self) -> usize {
        self.items.iter().filter(|todo| !todo.completed).count()
    }

    pub fn completed_count(&self) -> usize {
        self.items.len() - self.active_count()
    }

    pub fn high_priority_count(&self) -> usize {
        self.items.iter().filter(|todo| todo.is_high_priority()).count()
    }

    // ── mutations ────────────────────────────────────────────────────

    /// Append a todo parsed from `input`. Returns the new todo.
    #[instrument(skip(self, storage))]
    pub fn add<S: PersistentStore>(
        &mut self,
        storage: &mut CachedStorage<S>,
        input: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Todo> {
        let todo = Todo::from_input(input, next_position(&self.items), now)?;
        let added = todo.clone();
        self.apply(storage, |items| {
            items.push(todo);
            Ok(())
        })?;
        Ok(added)
    }

    /// Flip the completed flag of `id`. Returns the new state.
    #[instrument(skip(self, storage))]
    pub fn toggle<S: PersistentStore>(
        &mut self,
        storage: &mut CachedStorage<S>,
        id: &str,
    ) -> StoreResult<bool> {
        let mut completed = false;
        self.apply(storage, |items| {
            let todo = find_mut(items, id)?;
            todo.completed = !todo.completed;
            completed = todo.completed;
            Ok(())
        })?;
        Ok(completed)
    }

    /// Delete `id` and renumber the rest.
    #[instrument(skip(self, storage))]
    pub fn remove<S: PersistentStore>(
        &mut self,
        storage: &mut CachedStorage<S>,
        id: &str,
    ) -> StoreResult<Todo> {
        let mut removed = None;
        self.apply(storage, |items| {
            let index = items
                .iter()
                .position(|todo| todo.id == id)
                .ok_or_else(|| not_found(id))?;
            removed = Some(items.remove(index));
            normalize_positions(items);
            Ok(())
        })?;
        removed.ok_or_else(|| not_found(id))
    }

    /// Replace the text of `id`, re-parsing priority and tags.
    #[instrument(skip(self, storage))]
    pub fn edit<S: PersistentStore>(
        &mut self,
        storage: &mut CachedStorage<S>,
        id: &str,
        input: &str,
    ) -> StoreResult<()> {
        self.apply(storage, |items| find_mut(items, id)?.apply_input(input))
    }

    /// Drop every completed todo. Returns how many were removed.
    #[instrument(skip(self, storage))]
    pub fn clear_completed<S: PersistentStore>(
        &mut self,
        storage: &mut CachedStorage<S>,
    ) -> StoreResult<usize> {
        let before = self.items.len();
        if self.completed_count() == 0 {
            return Ok(0);
        }
        self.apply(storage, |items| {
            items.retain(|todo| !todo.completed);
            normalize_positions(items);
            Ok(())
        })?;
        Ok(before - self.items.len())
    }

    /// Mark everything active when all todos are completed, otherwise mark
    /// everything completed. Returns how many todos changed.
    #[instrument(skip(self, storage))]
    pub fn toggle_all<S: PersistentStore>(
        &mut self,
        storage: &mut CachedStorage<S>,
    ) -> StoreResult<usize> {
        let all_completed = self.items.iter().all(|todo| todo.completed);
        let mut changed = 0;
        self.apply(storage, |items| {
            for todo in items.iter_mut().filter(|todo| todo.completed == all_completed) {
                todo.completed = !all_completed;
                changed += 1;
            }
            Ok(())
        })?;
        Ok(changed)
    }

    /// Move `source_id` into the slot of `target_id` and persist the new
    /// order. Returns `false` if nothing moved.
    #[instrument(skip(self, storage))]
    pub fn move_item<S: PersistentStore>(
        &mut self,
        storage: &mut CachedStorage<S>,
        source_id: &str,
        target_id: &str,
    ) -> StoreResult<bool> {
        if source_id == target_id {
            return Ok(false);
        }
        let mut moved = false;
        self.apply(storage, |items| {
            moved = reconcile_positions(items, source_id, target_id)?;
            Ok(())
        })?;
        Ok(moved)
    }

    /// Persist the current list as is.
    pub fn save<S: PersistentStore>(&self, storage: &mut CachedStorage<S>) -> StoreResult<()> {
        storage.set_json(TODOS_KEY, &self.items)
    }

    fn apply<S, F>(&mut self, storage: &mut CachedStorage<S>, mutate: F) -> StoreResult<()>
    where
        S: PersistentStore,
        F: FnOnce(&mut Vec<Todo>) -> StoreResult<()>,
    {
        let mut next = self.items.clone();
        mutate(&mut next)?;
        sort_by_position(&mut next);
        storage.set_json(TODOS_KEY, &next)?;
        self.items = next;
        Ok(())
    }
}

fn find_mut<'a>(items: &'a mut [Todo], id: &str) -> StoreResult<&'a mut Todo> {
    items
        .iter_mut()
        .find(|todo| todo.id == id)
        .ok_or_else(|| not_found(id))
}

fn not_found(id: &str) -> StoreError {
    StoreError::NotFound {
        entity: "todo",
        id: id.to_string(),
    }
}

// ── tests ────────────────────────────────────────────────────────────
