//! Ordering of positioned collections.
//!
//! Items carry an integer `position`. After [`normalize_positions`] the
//! positions of a collection are exactly `0..n`, and [`reconcile_positions`]
//! keeps it that way under single-item moves: it only permutes the
//! existing values, so no position is created, lost or duplicated.

use crate::error::{StoreError, StoreResult};

/// An entity with a stable id and a mutable ordering field.
pub trait Positioned {
    fn id(&self) -> &str;
    fn position(&self) -> u32;
    fn set_position(&mut self, position: u32);
}

/// Move the item `source_id` into the slot held by `target_id`.
///
/// Items between the two slots shift by one toward the source's old slot;
/// everything else keeps its position. Returns `false` (and leaves `items`
/// alone) when source and target are the same item.
///
/// Positions must be distinct for the result to stay a permutation;
/// [`normalize_positions`] establishes that.
pub fn reconcile_positions<T: Positioned>(
    items: &mut [T],
    source_id: &str,
    target_id: &str,
) -> StoreResult<bool> {
    if source_id == target_id {
        return Ok(false);
    }

    let find = |id: &str| -> StoreResult<u32> {
        items
            .iter()
            .find(|item| item.id() == id)
            .map(Positioned::position)
            .ok_or_else(|| StoreError::NotFound {
                entity: "item",
                id: id.to_string(),
            })
    };
    let source = find(source_id)?;
    let target = find(target_id)?;

    for item in items.iter_mut() {
        let position = item.position();
        if item.id() == source_id {
            item.set_position(target);
        } else if source < target && position > source && position <= target {
            item.set_position(position - 1);
        } else if source > target && position >= target && position < source {
            item.set_position(position + 1);
        }
    }

    Ok(source != target)
}

/// Stable ascending sort by position.
pub fn sort_by_position<T: Positioned>(items: &mut [T]) {
    items.sort_by_key(Positioned::position);
}

/// Sort by position, then renumber to `0..n` keeping that order.
pub fn normalize_positions<T: Positioned>(items: &mut [T]) {
    sort_by_position(items);
    for (index, item) in items.iter_mut().enumerate() {
        item.set_position(u32::try_from(index).unwrap_or(u32::MAX));
    }
}

/// The position a newly appended item should take.
pub fn next_position<T: Positioned>(items: &[T]) -> u32 {
    items
        .iter()
        .map(Positioned::position)
        .max()
        .map_or(0, |max| max.saturating_add(1))
}

// ── tests ────────────────────────────────────────────────────────────
