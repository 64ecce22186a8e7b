//! In-memory state shared by the command handlers and the scheduler.
//!
//! Everything lives behind one mutex. The lock is only ever taken inside the
//! synchronous methods here and is never held across an `.await`.

pub mod lists;
pub mod reminders;

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;
use uuid::Uuid;

pub use lists::{
    AddOutcome, AddReport, CleaningEntry, EventItem, GroceryItem, ItemList, ListEntry,
    MaintenanceItem, RemoveReport, MAX_LIST_ITEMS,
};
pub use reminders::{
    CompleteOutcome, FrequencyRule, FrequencyUnit, OccurrenceId, RecurringReminder, Reminder,
    ReminderTarget,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRef {
    pub id: u64,
    pub name: String,
}

impl UserRef {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// The lists that get a pinned message of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ListKind {
    Groceries,
    Events,
    Cleaning,
    Maintenance,
    Reminders,
}

impl ListKind {
    pub fn label(&self) -> &'static str {
        match self {
            ListKind::Groceries => "grocery list",
            ListKind::Events => "events list",
            ListKind::Cleaning => "cleaning log",
            ListKind::Maintenance => "maintenance list",
            ListKind::Reminders => "reminders",
        }
    }
}

/// A destructive action waiting for a confirm/cancel button press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmableAction {
    ClearList(ListKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAction {
    pub id: String,
    pub action: ConfirmableAction,
    pub channel_id: u64,
    pub requested_by: UserRef,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct State {
    pub reminders: Vec<Reminder>,
    pub recurring: Vec<RecurringReminder>,
    pub groceries: ItemList<GroceryItem>,
    pub events: ItemList<EventItem>,
    /// Keyed by lowercased task name.
    pub cleaning: BTreeMap<String, CleaningEntry>,
    pub maintenance: ItemList<MaintenanceItem>,
    anchors: HashMap<(ListKind, u64), u64>,
    pending: HashMap<String, PendingAction>,
}

#[derive(Clone, Default)]
pub struct Store {
    state: Arc<Mutex<State>>,
}

/// `<unix millis>-<8 hex chars>`; collisions are not checked for.
pub(crate) fn new_id(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", now.timestamp_millis(), &suffix[..8])
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // State stays consistent even if a holder panicked; every mutation is a single step.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn read<R>(&self, f: impl FnOnce(&State) -> R) -> R {
        f(&self.lock())
    }

    pub fn write<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        f(&mut self.lock())
    }

    // --- Pinned anchors ---

    pub fn anchor(&self, kind: ListKind, channel_id: u64) -> Option<u64> {
        self.read(|state| state.anchors.get(&(kind, channel_id)).copied())
    }

    /// Records `message_id` as the anchor unless one already exists, in which
    /// case the existing anchor is returned and nothing changes.
    pub fn set_anchor_if_absent(&self, kind: ListKind, channel_id: u64, message_id: u64) -> Option<u64> {
        self.write(|state| match state.anchors.get(&(kind, channel_id)) {
            Some(existing) => Some(*existing),
            None => {
                state.anchors.insert((kind, channel_id), message_id);
                None
            }
        })
    }

    pub fn clear_anchor(&self, kind: ListKind, channel_id: u64) -> Option<u64> {
        self.write(|state| state.anchors.remove(&(kind, channel_id)))
    }

    /// All anchors, ordered by list then channel.
    pub fn anchors(&self) -> Vec<(ListKind, u64, u64)> {
        let mut anchors: Vec<(ListKind, u64, u64)> = self.read(|state| {
            state
                .anchors
                .iter()
                .map(|((kind, channel_id), message_id)| (*kind, *channel_id, *message_id))
                .collect()
        });
        anchors.sort();
        anchors
    }

    // --- Pending confirmations ---

    pub fn add_pending(
        &self,
        action: ConfirmableAction,
        channel_id: u64,
        requested_by: UserRef,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> PendingAction {
        let pending = PendingAction {
            id: new_id(now),
            action,
            channel_id,
            requested_by,
            expires_at,
        };
        self.write(|state| {
            state.pending.retain(|_, p| p.expires_at > now);
            state.pending.insert(pending.id.clone(), pending.clone());
        });
        pending
    }

    /// Removes and returns the pending action, or `None` if it is unknown or expired.
    pub fn take_pending(&self, id: &str, now: DateTime<Utc>) -> Option<PendingAction> {
        let pending = self.write(|state| state.pending.remove(id))?;
        if pending.expires_at <= now {
            debug!("Pending action {} expired at {}", id, pending.expires_at);
            return None;
        }
        Some(pending)
    }
}
