use crate::config::Config;
use crate::pinned::refresh_anchor;
use crate::platform::ChatPlatform;
use crate::services::reminder::{due_prompt, recurring_prompt};
use crate::store::{ListKind, Store};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{debug, error, info};

/// Completed reminders stay visible this many days before the refresher drops them.
pub const COMPLETED_RETENTION_DAYS: i64 = 7;

/// Periodic due-checks, recurrence-checks and list refreshes.
#[derive(Clone)]
pub struct ReminderScheduler {
    store: Store,
    platform: Arc<dyn ChatPlatform>,
    tz: Tz,
    snooze_minutes: i64,
    due_interval: Duration,
    recurring_interval: Duration,
    refresh_interval: Duration,
}

impl ReminderScheduler {
    pub fn new(store: Store, platform: Arc<dyn ChatPlatform>, config: &Config) -> Self {
        Self {
            store,
            platform,
            tz: config.timezone,
            snooze_minutes: config.snooze_minutes,
            due_interval: Duration::from_secs(config.reminder_poll_interval_secs.max(1)),
            recurring_interval: Duration::from_secs(config.recurring_poll_interval_secs.max(1)),
            refresh_interval: Duration::from_secs(config.list_refresh_interval_secs.max(1)),
        }
    }

    pub async fn run_due_checks(self) {
        let mut ticker = interval(self.due_interval);
        loop {
            ticker.tick().await;
            self.check_due(Utc::now()).await;
        }
    }

    pub async fn run_recurrence_checks(self) {
        let mut ticker = interval(self.recurring_interval);
        loop {
            ticker.tick().await;
            self.check_recurring(Utc::now()).await;
        }
    }

    pub async fn run_list_refresh(self) {
        let mut ticker = interval(self.refresh_interval);
        loop {
            ticker.tick().await;
            self.refresh_lists(Utc::now()).await;
        }
    }

    /// Delivers every one-time reminder that has come due. Returns how many were sent.
    pub async fn check_due(&self, now: DateTime<Utc>) -> usize {
        let claimed = self.store.claim_due(now);
        if claimed.is_empty() {
            return 0;
        }

        let mut delivered = 0;
        let mut touched = BTreeSet::new();
        for reminder in claimed {
            debug!(
                "Dispatching reminder {} to channel {} for user {}",
                reminder.id, reminder.channel_id, reminder.created_by.id
            );
            let prompt = due_prompt(&reminder, self.tz, self.snooze_minutes);
            match self.platform.post_message(reminder.channel_id, &prompt).await {
                Ok(_) => {
                    if self.store.mark_sent(&reminder.id, reminder.due_date) {
                        delivered += 1;
                    } else {
                        debug!("Reminder {} changed while in flight; left armed", reminder.id);
                    }
                    touched.insert(reminder.channel_id);
                }
                Err(e) => {
                    self.store.release_claim(&reminder.id);
                    error!("Failed to send reminder {}: {}", reminder.id, e);
                }
            }
        }

        self.refresh_reminder_anchors(touched, now).await;
        delivered
    }

    /// Fires every recurring reminder whose rule says a new occurrence is due.
    pub async fn check_recurring(&self, now: DateTime<Utc>) -> usize {
        let mut fired = 0;
        let mut touched = BTreeSet::new();
        for reminder in self.store.recurring_snapshot() {
            if !reminder.frequency.is_due(now, reminder.last_fired, self.tz) {
                continue;
            }
            let prompt = recurring_prompt(&reminder, now);
            match self.platform.post_message(reminder.channel_id, &prompt).await {
                Ok(_) => {
                    if self.store.touch_last_fired(&reminder.id, now) {
                        fired += 1;
                        touched.insert(reminder.channel_id);
                    }
                }
                Err(e) => {
                    error!("Failed to send recurring reminder {}: {}", reminder.id, e);
                }
            }
        }

        self.refresh_reminder_anchors(touched, now).await;
        fired
    }

    /// Drops long-completed reminders and re-renders every anchored list.
    pub async fn refresh_lists(&self, now: DateTime<Utc>) {
        let pruned = self
            .store
            .prune_completed(now - chrono::Duration::days(COMPLETED_RETENTION_DAYS));
        if pruned > 0 {
            info!("Pruned {} completed reminders", pruned);
        }

        for (kind, channel_id, _) in self.store.anchors() {
            refresh_anchor(&self.store, self.platform.as_ref(), kind, channel_id, now, self.tz).await;
        }
    }

    async fn refresh_reminder_anchors(&self, channels: BTreeSet<u64>, now: DateTime<Utc>) {
        for channel_id in channels {
            if self.store.anchor(ListKind::Reminders, channel_id).is_some() {
                refresh_anchor(
                    &self.store,
                    self.platform.as_ref(),
                    ListKind::Reminders,
                    channel_id,
                    now,
                    self.tz,
                )
                .await;
            }
        }
    }
}
