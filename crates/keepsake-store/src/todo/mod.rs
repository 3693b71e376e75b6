//! Todo entities on top of the persistence layer.
//!
//! A [`Todo`] is one list entry; the whole list is persisted as a JSON
//! array under [`TODOS_KEY`]. Input text carries two lightweight
//! conventions: a priority marker (`!`, `!!` or `!!!`) and `#tags`. Both
//! are stripped from the stored text and kept in their own fields.

mod legacy;
mod list;

pub use legacy::{TODO_SCHEMA_VERSION, migrate_legacy_todos, todo_migrations};
pub use list::TodoList;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::backend::PersistentStore;
use crate::cache::CachedStorage;
use crate::error::{StoreError, StoreResult};
use crate::position::Positioned;

/// Key holding the JSON-encoded todo list.
pub const TODOS_KEY: &str = "todos";

/// Key holding the active list filter.
pub const FILTER_KEY: &str = "todo-filter";

/// Priority at or above which a todo counts as high priority.
pub const HIGH_PRIORITY: u8 = 2;

/// A single todo entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    /// Unique identifier (UUID v7 for new entries).
    pub id: String,
    /// Text with priority markers and tags removed.
    pub text: String,
    pub completed: bool,
    /// Unix timestamp (seconds) when the todo was created.
    pub created_at: i64,
    /// Place in the list; see [`crate::position`].
    pub position: u32,
    /// 0 (none) to 3 (high).
    pub priority: u8,
    pub tags: Vec<String>,
}

impl Todo {
    /// Build a todo from raw user input. Fails on blank input.
    pub fn from_input(input: &str, position: u32, now: DateTime<Utc>) -> StoreResult<Self> {
        if input.trim().is_empty() {
            return Err(StoreError::InvalidArgument("todo text is empty".into()));
        }
        Ok(Self {
            id: Uuid::now_v7().to_string(),
            text: clean_text(input),
            completed: false,
            created_at: now.timestamp(),
            position,
            priority: extract_priority(input),
            tags: extract_tags(input),
        })
    }

    /// Replace text, priority and tags from new raw input.
    pub fn apply_input(&mut self, input: &str) -> StoreResult<()> {
        if input.trim().is_empty() {
            return Err(StoreError::InvalidArgument("todo text is empty".into()));
        }
        self.text = clean_text(input);
        self.priority = extract_priority(input);
        self.tags = extract_tags(input);
        Ok(())
    }

    pub fn is_high_priority(&self) -> bool {
        self.priority >= HIGH_PRIORITY
    }
}

impl Positioned for Todo {
    fn id(&self) -> &str {
        &self.id
    }

    fn position(&self) -> u32 {
        self.position
    }

    fn set_position(&mut self, position: u32) {
        self.position = position;
    }
}

const PRIORITY_MARKERS: [(&str, u8); 3] = [("!!!", 3), ("!!", 2), ("!", 1)];

/// Priority implied by the strongest marker present in `input`.
pub fn extract_priority(input: &str) -> u8 {
    PRIORITY_MARKERS
        .iter()
        .find(|(marker, _)| input.contains(marker))
        .map_or(0, |(_, level)| *level)
}

/// Words starting with `#`, without the `#`. A bare `#` is ignored.
pub fn extract_tags(input: &str) -> Vec<String> {
    input
        .split_whitespace()
        .filter_map(|word| word.strip_prefix('#'))
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

/// `input` without its priority marker and tag words, whitespace collapsed.
pub fn clean_text(input: &str) -> String {
    let without_marker = PRIORITY_MARKERS
        .iter()
        .find(|(marker, _)| input.contains(marker))
        .map_or_else(|| input.to_string(), |(marker, _)| input.replacen(marker, "", 1));

    without_marker
        .split_whitespace()
        .filter(|word| !word.starts_with('#'))
        .collect::<Vec<_>>()
        .join(" ")
}

// ── filter ───────────────────────────────────────────────────────────

/// Which todos a view shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Filter {
    #[default]
    All,
    Active,
    Completed,
    /// Todos with any priority marker.
    Priority,
}

impl Filter {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Priority => "priority",
        }
    }

    pub fn matches(self, todo: &Todo) -> bool {
        match self {
            Self::All => true,
            Self::Active => !todo.completed,
            Self::Completed => todo.completed,
            Self::Priority => todo.priority > 0,
        }
    }

    /// The persisted filter, or [`Filter::All`] if none or unreadable.
    pub fn load<S: PersistentStore>(storage: &mut CachedStorage<S>) -> Self {
        match storage.get(FILTER_KEY) {
            None => Self::default(),
            Some(raw) => raw.parse().unwrap_or_else(|err: StoreError| {
                warn!(%err, "malformed stored filter, using default");
                Self::default()
            }),
        }
    }

    pub fn save<S: PersistentStore>(self, storage: &mut CachedStorage<S>) -> StoreResult<()> {
        storage.set(FILTER_KEY, self.as_str())
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Filter {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "priority" => Ok(Self::Priority),
            other => Err(StoreError::decode(FILTER_KEY, format!("unknown filter `{other}`"))),
        }
    }
}

// ── tests ────────────────────────────────────────────────────────────
