use super::{ListKind, Store, UserRef};
use chrono::{DateTime, Utc};

/// Lists refuse new entries past this many items.
pub const MAX_LIST_ITEMS: usize = 100;

/// An entry of an [`ItemList`], identified by a case-insensitive key.
pub trait ListEntry {
    fn key(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroceryItem {
    pub name: String,
    pub added_by: UserRef,
    pub added_at: DateTime<Utc>,
}

impl ListEntry for GroceryItem {
    fn key(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventItem {
    pub name: String,
    pub starts_at: Option<DateTime<Utc>>,
    pub added_by: UserRef,
    pub added_at: DateTime<Utc>,
}

impl ListEntry for EventItem {
    fn key(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaintenanceItem {
    pub description: String,
    pub added_by: UserRef,
    pub added_at: DateTime<Utc>,
}

impl ListEntry for MaintenanceItem {
    fn key(&self) -> &str {
        &self.description
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleaningEntry {
    pub task: String,
    pub done_by: UserRef,
    pub done_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    Duplicate,
    Full,
}

/// Case-folded form used for every list key comparison.
pub(crate) fn fold_key(key: &str) -> String {
    key.trim().to_lowercase()
}

fn same_key(a: &str, b: &str) -> bool {
    fold_key(a) == fold_key(b)
}

/// Ordered, bounded collection with case-insensitive unique keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemList<T> {
    items: Vec<T>,
}

impl<T> Default for ItemList<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: ListEntry> ItemList<T> {
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.items.iter().any(|item| same_key(item.key(), key))
    }

    pub fn add_unique(&mut self, item: T) -> AddOutcome {
        if self.contains(item.key()) {
            return AddOutcome::Duplicate;
        }
        if self.items.len() >= MAX_LIST_ITEMS {
            return AddOutcome::Full;
        }
        self.items.push(item);
        AddOutcome::Added
    }

    /// Removes the entry whose key equals `key`, ignoring case.
    pub fn remove_exact(&mut self, key: &str) -> Option<T> {
        let index = self.items.iter().position(|item| same_key(item.key(), key))?;
        Some(self.items.remove(index))
    }

    /// Removes the first entry whose key contains `search`, ignoring case.
    pub fn remove_matching(&mut self, search: &str) -> Option<T> {
        let needle = fold_key(search);
        if needle.is_empty() {
            return None;
        }
        let index = self
            .items
            .iter()
            .position(|item| fold_key(item.key()).contains(&needle))?;
        Some(self.items.remove(index))
    }

    pub fn clear(&mut self) -> usize {
        let removed = self.items.len();
        self.items.clear();
        removed
    }
}

/// Result of adding a batch of comma-separated names.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AddReport {
    pub added: Vec<String>,
    pub duplicates: Vec<String>,
    pub overflow: Vec<String>,
}

/// Result of removing a batch of comma-separated names.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RemoveReport {
    pub removed: Vec<String>,
    pub missing: Vec<String>,
}

fn record_add(report: &mut AddReport, name: String, outcome: AddOutcome) {
    match outcome {
        AddOutcome::Added => report.added.push(name),
        AddOutcome::Duplicate => report.duplicates.push(name),
        AddOutcome::Full => report.overflow.push(name),
    }
}

impl Store {
    pub fn add_groceries(&self, names: &[String], by: &UserRef, at: DateTime<Utc>) -> AddReport {
        self.write(|state| {
            let mut report = AddReport::default();
            for name in names {
                let outcome = state.groceries.add_unique(GroceryItem {
                    name: name.clone(),
                    added_by: by.clone(),
                    added_at: at,
                });
                record_add(&mut report, name.clone(), outcome);
            }
            report
        })
    }

    pub fn remove_groceries(&self, names: &[String]) -> RemoveReport {
        self.write(|state| {
            let mut report = RemoveReport::default();
            for name in names {
                match state.groceries.remove_exact(name) {
                    Some(item) => report.removed.push(item.name),
                    None => report.missing.push(name.clone()),
                }
            }
            report
        })
    }

    pub fn add_event(&self, event: EventItem) -> AddOutcome {
        self.write(|state| state.events.add_unique(event))
    }

    pub fn remove_event(&self, search: &str) -> Option<EventItem> {
        self.write(|state| state.events.remove_matching(search))
    }

    pub fn add_maintenance(&self, descriptions: &[String], by: &UserRef, at: DateTime<Utc>) -> AddReport {
        self.write(|state| {
            let mut report = AddReport::default();
            for description in descriptions {
                let outcome = state.maintenance.add_unique(MaintenanceItem {
                    description: description.clone(),
                    added_by: by.clone(),
                    added_at: at,
                });
                record_add(&mut report, description.clone(), outcome);
            }
            report
        })
    }

    pub fn remove_maintenance(&self, search: &str) -> Option<MaintenanceItem> {
        self.write(|state| state.maintenance.remove_matching(search))
    }

    /// Records that `task` was done; a later entry for the same task replaces the earlier one.
    /// Returns the entry it replaced.
    pub fn record_cleaning(&self, task: &str, by: &UserRef, at: DateTime<Utc>) -> Option<CleaningEntry> {
        let task = task.trim();
        self.write(|state| {
            state.cleaning.insert(
                fold_key(task),
                CleaningEntry {
                    task: task.to_string(),
                    done_by: by.clone(),
                    done_at: at,
                },
            )
        })
    }

    /// Empties one list. Reminders are never cleared in bulk.
    pub fn clear_list(&self, kind: ListKind) -> usize {
        self.write(|state| match kind {
            ListKind::Groceries => state.groceries.clear(),
            ListKind::Events => state.events.clear(),
            ListKind::Maintenance => state.maintenance.clear(),
            ListKind::Cleaning => {
                let removed = state.cleaning.len();
                state.cleaning.clear();
                removed
            }
            ListKind::Reminders => 0,
        })
    }
}
