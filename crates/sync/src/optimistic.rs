//! Locally mutable list with exact rollback.
//!
//! Every mutation returns a [`Rollback`] that restores the list to the
//! snapshot it had before the mutation. Items are unique by
//! [`Identified::identity`]; when a page brings a duplicate, the copy already
//! in the list wins.

use std::collections::HashSet;

use fitfind_core::{FitFindError, Identified, Pagination};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPosition {
    Prepend,
    Append,
}

/// An item taken out of a list, with the index it occupied.
#[derive(Debug, Clone, PartialEq)]
pub struct Removal<T> {
    pub item: T,
    pub index: usize,
}

/// Inverse of one optimistic mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Rollback<T> {
    Added { id: String },
    Removed(Removal<T>),
    Reordered { previous: Vec<T> },
    Updated { previous: T },
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptimisticList<T> {
    items: Vec<T>,
    pagination: Pagination,
}

impl<T> Default for OptimisticList<T> {
    fn default() -> Self {
        Self { items: Vec::new(), pagination: Pagination::default() }
    }
}

impl<T: Identified + Clone> OptimisticList<T> {
    #[must_use]
    pub fn new(limit: u32) -> Self {
        Self { items: Vec::new(), pagination: Pagination::empty(limit) }
    }

    #[must_use]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    #[must_use]
    pub const fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.identity() == id)
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&T> {
        self.items.iter().find(|item| item.identity() == id)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    /// Replace the contents with a freshly fetched first page.
    pub fn replace_page(&mut self, items: Vec<T>, pagination: Pagination) {
        self.items.clear();
        self.extend_unique(items);
        self.pagination = pagination;
    }

    /// Append a further page. Returns how many new items were added.
    pub fn append_page(&mut self, items: Vec<T>, pagination: Pagination) -> usize {
        let before = self.items.len();
        self.extend_unique(items);
        self.pagination = pagination;
        self.items.len() - before
    }

    fn extend_unique(&mut self, items: Vec<T>) {
        let mut seen: HashSet<String> =
            self.items.iter().map(|item| item.identity().to_owned()).collect();
        for item in items {
            if seen.insert(item.identity().to_owned()) {
                self.items.push(item);
            }
        }
    }

    /// Insert a not-yet-confirmed item. An item with the same identity is replaced.
    pub fn add(&mut self, item: T, position: InsertPosition) -> Rollback<T> {
        let id = item.identity().to_owned();
        if let Some(index) = self.position(&id) {
            self.items.remove(index);
        }
        match position {
            InsertPosition::Prepend => self.items.insert(0, item),
            InsertPosition::Append => self.items.push(item),
        }
        Rollback::Added { id }
    }

    /// Swap the placeholder for the server record and count it.
    ///
    /// If the server record is already present elsewhere the placeholder is
    /// dropped instead, so the list stays unique. A placeholder that is gone
    /// is re-inserted at `position`.
    pub fn confirm_add(&mut self, placeholder_id: &str, confirmed: T, position: InsertPosition) {
        let duplicate = confirmed.identity() != placeholder_id && self.contains(confirmed.identity());
        match self.position(placeholder_id) {
            Some(index) if duplicate => {
                self.items.remove(index);
            },
            Some(index) => self.items[index] = confirmed,
            None if duplicate => {},
            None => match position {
                InsertPosition::Prepend => self.items.insert(0, confirmed),
                InsertPosition::Append => self.items.push(confirmed),
            },
        }
        if !duplicate {
            self.pagination.total_count = self.pagination.total_count.saturating_add(1);
        }
    }

    /// Take an item out of the list and decrement the total.
    pub fn remove(&mut self, id: &str) -> Option<Removal<T>> {
        let index = self.position(id)?;
        let item = self.items.remove(index);
        self.pagination.total_count = self.pagination.total_count.saturating_sub(1);
        Some(Removal { item, index })
    }

    /// Put a removed item back at its original index, clamped to the length.
    pub fn restore(&mut self, removal: Removal<T>) {
        if self.contains(removal.item.identity()) {
            return;
        }
        let index = removal.index.min(self.items.len());
        self.items.insert(index, removal.item);
        self.pagination.total_count = self.pagination.total_count.saturating_add(1);
    }

    /// Apply a new order given as identities.
    ///
    /// # Errors
    /// Returns `Validation` unless `ids` is a permutation of the current items.
    pub fn reorder(&mut self, ids: &[String]) -> Result<Rollback<T>, FitFindError> {
        let current: HashSet<&str> = self.items.iter().map(Identified::identity).collect();
        let requested: HashSet<&str> = ids.iter().map(String::as_str).collect();
        if ids.len() != self.items.len() || requested.len() != ids.len() || current != requested {
            return Err(FitFindError::Validation(
                "Reorder must list every item exactly once".to_owned(),
            ));
        }
        let previous = self.items.clone();
        let mut reordered = Vec::with_capacity(previous.len());
        for id in ids {
            if let Some(item) = previous.iter().find(|item| item.identity() == id) {
                reordered.push(item.clone());
            }
        }
        self.items = reordered;
        Ok(Rollback::Reordered { previous })
    }

    /// Replace the item with identity `id`. Returns its rollback if it existed.
    pub fn replace(&mut self, id: &str, item: T) -> Option<Rollback<T>> {
        let index = self.position(id)?;
        let previous = std::mem::replace(&mut self.items[index], item);
        Some(Rollback::Updated { previous })
    }

    /// Mutable access for in-place edits that need no rollback.
    pub fn items_mut(&mut self) -> &mut [T] {
        &mut self.items
    }

    pub const fn pagination_mut(&mut self) -> &mut Pagination {
        &mut self.pagination
    }

    /// Undo one mutation.
    pub fn rollback(&mut self, rollback: Rollback<T>) {
        match rollback {
            Rollback::Added { id } => {
                if let Some(index) = self.position(&id) {
                    self.items.remove(index);
                }
            },
            Rollback::Removed(removal) => self.restore(removal),
            Rollback::Reordered { previous } => self.items = previous,
            Rollback::Updated { previous } => {
                if let Some(index) = self.position(previous.identity()) {
                    self.items[index] = previous;
                }
            },
        }
    }
}
