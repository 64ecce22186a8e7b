use super::lists::fold_key;
use super::{new_id, Store, UserRef};
use chrono::{DateTime, Datelike, Duration, Utc, Weekday};
use chrono_tz::Tz;
use std::fmt;

/// Who a reminder is addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReminderTarget {
    Creator,
    Everyone,
    Named(String),
}

impl ReminderTarget {
    /// Text used to ping the target when the reminder is delivered.
    pub fn mention(&self, creator: &UserRef) -> String {
        match self {
            ReminderTarget::Creator => format!("<@{}>", creator.id),
            ReminderTarget::Everyone => "@everyone".to_string(),
            ReminderTarget::Named(name) => format!("@{}", name),
        }
    }

    /// Plain label used in rendered lists.
    pub fn label(&self, creator: &UserRef) -> String {
        match self {
            ReminderTarget::Creator => creator.name.clone(),
            ReminderTarget::Everyone => "everyone".to_string(),
            ReminderTarget::Named(name) => name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub id: String,
    pub message: String,
    pub due_date: DateTime<Utc>,
    pub target: ReminderTarget,
    pub created_by: UserRef,
    pub created_at: DateTime<Utc>,
    pub channel_id: u64,
    pub completed: bool,
    pub completed_by: Option<UserRef>,
    pub completed_at: Option<DateTime<Utc>>,
    pub sent: bool,
    /// Claimed by a running due-check whose delivery has not finished yet.
    in_flight: bool,
}

impl Reminder {
    pub fn new(
        message: impl Into<String>,
        due_date: DateTime<Utc>,
        target: ReminderTarget,
        created_by: UserRef,
        channel_id: u64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: new_id(now),
            message: message.into(),
            due_date,
            target,
            created_by,
            created_at: now,
            channel_id,
            completed: false,
            completed_by: None,
            completed_at: None,
            sent: false,
            in_flight: false,
        }
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.completed && self.due_date <= now
    }

    fn is_deliverable(&self, now: DateTime<Utc>) -> bool {
        self.due_date <= now && !self.completed && !self.sent && !self.in_flight
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrequencyUnit {
    Days,
    Weeks,
    Months,
}

impl FrequencyUnit {
    /// Length of one unit; a month counts as 30 days.
    pub fn duration(&self) -> Duration {
        match self {
            FrequencyUnit::Days => Duration::days(1),
            FrequencyUnit::Weeks => Duration::weeks(1),
            FrequencyUnit::Months => Duration::days(30),
        }
    }

    /// Length of `interval` units, or `None` if it does not fit in a `Duration`.
    pub fn span(&self, interval: u32) -> Option<Duration> {
        self.duration().checked_mul(i32::try_from(interval).ok()?)
    }

    fn noun(&self) -> &'static str {
        match self {
            FrequencyUnit::Days => "day",
            FrequencyUnit::Weeks => "week",
            FrequencyUnit::Months => "month",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrequencyRule {
    Daily,
    Weekly(Option<Weekday>),
    Monthly,
    Custom { interval: u32, unit: FrequencyUnit },
}

impl FrequencyRule {
    /// Whether a new occurrence is due at `now` given when the rule last fired.
    /// Calendar comparisons (`Daily`, `Monthly`) happen in `tz`.
    /// A weekly rule with a weekday only fires on that local weekday.
    pub fn is_due(&self, now: DateTime<Utc>, last_fired: Option<DateTime<Utc>>, tz: Tz) -> bool {
        if let FrequencyRule::Weekly(Some(day)) = self {
            if now.with_timezone(&tz).weekday() != *day {
                return false;
            }
            return match last_fired {
                Some(last) => now - last >= Duration::days(6),
                None => true,
            };
        }

        let Some(last) = last_fired else {
            return true;
        };
        if now < last {
            return false;
        }

        match self {
            FrequencyRule::Daily => {
                now.with_timezone(&tz).date_naive() != last.with_timezone(&tz).date_naive()
            }
            FrequencyRule::Weekly(_) => now - last >= Duration::days(7),
            FrequencyRule::Monthly => {
                let now_local = now.with_timezone(&tz);
                let last_local = last.with_timezone(&tz);
                now_local.month() != last_local.month() || now_local.year() != last_local.year()
            }
            FrequencyRule::Custom { interval, unit } => match unit.span(*interval) {
                Some(span) => now - last >= span,
                None => false,
            },
        }
    }
}

impl fmt::Display for FrequencyRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrequencyRule::Daily => write!(f, "every day"),
            FrequencyRule::Weekly(None) => write!(f, "every week"),
            FrequencyRule::Weekly(Some(day)) => write!(f, "every week ({})", weekday_name(*day)),
            FrequencyRule::Monthly => write!(f, "every month"),
            FrequencyRule::Custom { interval: 1, unit } => write!(f, "every {}", unit.noun()),
            FrequencyRule::Custom { interval, unit } => {
                write!(f, "every {} {}s", interval, unit.noun())
            }
        }
    }
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurringReminder {
    pub id: String,
    pub message: String,
    pub frequency: FrequencyRule,
    pub target: ReminderTarget,
    pub created_by: UserRef,
    pub created_at: DateTime<Utc>,
    pub channel_id: u64,
    pub last_fired: Option<DateTime<Utc>>,
}

impl RecurringReminder {
    pub fn new(
        message: impl Into<String>,
        frequency: FrequencyRule,
        target: ReminderTarget,
        created_by: UserRef,
        channel_id: u64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: new_id(now),
            message: message.into(),
            frequency,
            target,
            created_by,
            created_at: now,
            channel_id,
            last_fired: None,
        }
    }
}

/// Identifies one firing of a recurring reminder: `<rule id>@<unix millis>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccurrenceId {
    pub rule_id: String,
    pub fired_at: DateTime<Utc>,
}

impl OccurrenceId {
    pub fn new(rule_id: impl Into<String>, fired_at: DateTime<Utc>) -> Self {
        Self {
            rule_id: rule_id.into(),
            fired_at,
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let (rule_id, millis) = raw.rsplit_once('@')?;
        if rule_id.is_empty() {
            return None;
        }
        let fired_at = DateTime::<Utc>::from_timestamp_millis(millis.parse().ok()?)?;
        Some(Self::new(rule_id, fired_at))
    }
}

impl fmt::Display for OccurrenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.rule_id, self.fired_at.timestamp_millis())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompleteOutcome {
    Completed(Reminder),
    AlreadyCompleted(Reminder),
    NotFound,
}

fn matches_search(message: &str, search: &str) -> bool {
    fold_key(message).contains(&fold_key(search))
}

impl Store {
    pub fn add_one_time(&self, reminder: Reminder) -> String {
        let id = reminder.id.clone();
        self.write(|state| state.reminders.push(reminder));
        id
    }

    pub fn add_recurring(&self, reminder: RecurringReminder) -> String {
        let id = reminder.id.clone();
        self.write(|state| state.recurring.push(reminder));
        id
    }

    pub fn find_one_time(&self, id: &str) -> Option<Reminder> {
        self.read(|state| state.reminders.iter().find(|r| r.id == id).cloned())
    }

    pub fn find_recurring(&self, id: &str) -> Option<RecurringReminder> {
        self.read(|state| state.recurring.iter().find(|r| r.id == id).cloned())
    }

    /// Removes the first one-time reminder (in insertion order) whose message
    /// contains `search`, ignoring case.
    pub fn remove_one_time(&self, search: &str) -> Option<Reminder> {
        if search.trim().is_empty() {
            return None;
        }
        self.write(|state| {
            let index = state
                .reminders
                .iter()
                .position(|r| matches_search(&r.message, search))?;
            Some(state.reminders.remove(index))
        })
    }

    /// Same first-match rule as [`Store::remove_one_time`], over recurring reminders.
    pub fn remove_recurring(&self, search: &str) -> Option<RecurringReminder> {
        if search.trim().is_empty() {
            return None;
        }
        self.write(|state| {
            let index = state
                .recurring
                .iter()
                .position(|r| matches_search(&r.message, search))?;
            Some(state.recurring.remove(index))
        })
    }

    pub fn mark_completed(&self, id: &str, by: &UserRef, at: DateTime<Utc>) -> CompleteOutcome {
        self.write(|state| {
            let Some(reminder) = state.reminders.iter_mut().find(|r| r.id == id) else {
                return CompleteOutcome::NotFound;
            };
            if reminder.completed {
                return CompleteOutcome::AlreadyCompleted(reminder.clone());
            }
            reminder.completed = true;
            reminder.completed_by = Some(by.clone());
            reminder.completed_at = Some(at);
            CompleteOutcome::Completed(reminder.clone())
        })
    }

    /// Moves the due date and re-arms delivery. Completed reminders cannot be snoozed.
    pub fn snooze(&self, id: &str, new_due: DateTime<Utc>) -> Option<Reminder> {
        self.write(|state| {
            let reminder = state
                .reminders
                .iter_mut()
                .find(|r| r.id == id && !r.completed)?;
            reminder.due_date = new_due;
            reminder.sent = false;
            Some(reminder.clone())
        })
    }

    /// Selects every deliverable reminder and claims it for this tick.
    pub fn claim_due(&self, now: DateTime<Utc>) -> Vec<Reminder> {
        self.write(|state| {
            state
                .reminders
                .iter_mut()
                .filter(|r| r.is_deliverable(now))
                .map(|r| {
                    r.in_flight = true;
                    r.clone()
                })
                .collect()
        })
    }

    /// Drops a claim after a failed delivery so the next tick retries it.
    pub fn release_claim(&self, id: &str) {
        self.write(|state| {
            if let Some(reminder) = state.reminders.iter_mut().find(|r| r.id == id) {
                reminder.in_flight = false;
            }
        });
    }

    /// Records a successful delivery of the occurrence due at `claimed_due`.
    /// Returns false when the reminder is gone or was snoozed while in flight.
    pub fn mark_sent(&self, id: &str, claimed_due: DateTime<Utc>) -> bool {
        self.write(|state| {
            let Some(reminder) = state.reminders.iter_mut().find(|r| r.id == id) else {
                return false;
            };
            reminder.in_flight = false;
            if reminder.due_date != claimed_due {
                return false;
            }
            reminder.sent = true;
            true
        })
    }

    /// Advances `last_fired`; never moves it backwards.
    pub fn touch_last_fired(&self, id: &str, when: DateTime<Utc>) -> bool {
        self.write(|state| {
            let Some(reminder) = state.recurring.iter_mut().find(|r| r.id == id) else {
                return false;
            };
            match reminder.last_fired {
                Some(last) if last > when => false,
                _ => {
                    reminder.last_fired = Some(when);
                    true
                }
            }
        })
    }

    pub fn one_time_snapshot(&self) -> Vec<Reminder> {
        self.read(|state| state.reminders.clone())
    }

    pub fn recurring_snapshot(&self) -> Vec<RecurringReminder> {
        self.read(|state| state.recurring.clone())
    }

    /// Drops reminders completed before `before`. Returns how many were removed.
    pub fn prune_completed(&self, before: DateTime<Utc>) -> usize {
        self.write(|state| {
            let len = state.reminders.len();
            state.reminders.retain(|r| match r.completed_at {
                Some(at) => !r.completed || at >= before,
                None => true,
            });
            len - state.reminders.len()
        })
    }
}
