use crate::platform::{ActionButton, ActionEvent, ButtonTone, OutgoingMessage};
use crate::render::format_local;
use crate::store::{
    CompleteOutcome, FrequencyRule, OccurrenceId, RecurringReminder, Reminder, ReminderTarget,
    Store, UserRef,
};
use crate::timeparse::{extract_frequency, parse_due_date, split_message_and_time};
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use thiserror::Error;
use tracing::info;

pub const COMPLETE_ACTION: &str = "reminder_complete";
pub const SNOOZE_ACTION: &str = "reminder_snooze";

const MAX_REMINDER_MESSAGE_CHARS: usize = 1500;

/// Why a reminder request was refused. The message is the reply shown to the user.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReminderInputError {
    #[error("❌ What should I remind you about? Try `remind me: take out trash tomorrow at 7pm`.")]
    EmptyMessage,
    #[error("❌ Reminder message is too long (max 1500 characters).")]
    TooLong,
    #[error("🤔 I couldn't understand when. Try something like `remind me: take out trash tomorrow at 7pm`.")]
    UnparseableTime,
    #[error("⚠️ That time has already passed. Pick a time in the future.")]
    PastTime,
    #[error("🤔 I couldn't tell how often. Try `daily`, `weekly`, `monthly`, `every friday`, `every 3 days` or `every other week`.")]
    UnparseableFrequency,
}

/// What pressing "Mark complete" resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionResult {
    Completed(Reminder),
    AlreadyCompleted(Reminder),
    Occurrence(RecurringReminder),
    NotFound,
}

#[derive(Clone)]
pub struct ReminderService {
    store: Store,
    tz: Tz,
}

impl ReminderService {
    pub fn new(store: Store, tz: Tz) -> Self {
        Self { store, tz }
    }

    /// Parses "<message> <when>" and stores a one-time reminder.
    pub fn create_one_time(
        &self,
        text: &str,
        target: ReminderTarget,
        created_by: &UserRef,
        channel_id: u64,
        now: DateTime<Utc>,
    ) -> Result<Reminder, ReminderInputError> {
        let text = text.trim();
        if text.is_empty() || parse_due_date(text, now, self.tz).is_some() {
            return Err(ReminderInputError::EmptyMessage);
        }
        let (message, due) =
            split_message_and_time(text, now, self.tz).ok_or(ReminderInputError::UnparseableTime)?;
        if message.chars().count() > MAX_REMINDER_MESSAGE_CHARS {
            return Err(ReminderInputError::TooLong);
        }
        if due <= now {
            return Err(ReminderInputError::PastTime);
        }

        let reminder = Reminder::new(message, due, target, created_by.clone(), channel_id, now);
        self.store.add_one_time(reminder.clone());
        info!(
            "Created reminder {} for user {} in channel {} at {}",
            reminder.id, created_by.id, channel_id, due
        );
        Ok(reminder)
    }

    /// Parses "<message> <frequency>" and stores a recurring reminder. A
    /// frequency phrase in the text wins over `default`.
    pub fn create_recurring(
        &self,
        text: &str,
        default: Option<FrequencyRule>,
        target: ReminderTarget,
        created_by: &UserRef,
        channel_id: u64,
        now: DateTime<Utc>,
    ) -> Result<RecurringReminder, ReminderInputError> {
        let (frequency, message) = match (extract_frequency(text), default) {
            (Some(found), _) => found,
            (None, Some(rule)) => (rule, text.trim().to_string()),
            (None, None) => return Err(ReminderInputError::UnparseableFrequency),
        };
        if message.is_empty() {
            return Err(ReminderInputError::EmptyMessage);
        }
        if message.chars().count() > MAX_REMINDER_MESSAGE_CHARS {
            return Err(ReminderInputError::TooLong);
        }

        let reminder =
            RecurringReminder::new(message, frequency, target, created_by.clone(), channel_id, now);
        self.store.add_recurring(reminder.clone());
        info!(
            "Created recurring reminder {} ({}) for user {} in channel {}",
            reminder.id, frequency, created_by.id, channel_id
        );
        Ok(reminder)
    }

    /// `value` is a reminder id or an [`OccurrenceId`] from a recurring prompt.
    pub fn complete(&self, value: &str, by: &UserRef, now: DateTime<Utc>) -> CompletionResult {
        if let Some(occurrence) = OccurrenceId::parse(value) {
            return match self.store.find_recurring(&occurrence.rule_id) {
                Some(rule) => {
                    info!("Occurrence {} acknowledged by user {}", occurrence, by.id);
                    CompletionResult::Occurrence(rule)
                }
                None => CompletionResult::NotFound,
            };
        }

        match self.store.mark_completed(value, by, now) {
            CompleteOutcome::Completed(reminder) => {
                info!("Reminder {} completed by user {}", reminder.id, by.id);
                CompletionResult::Completed(reminder)
            }
            CompleteOutcome::AlreadyCompleted(reminder) => CompletionResult::AlreadyCompleted(reminder),
            CompleteOutcome::NotFound => CompletionResult::NotFound,
        }
    }

    pub fn snooze(&self, id: &str, now: DateTime<Utc>, minutes: i64) -> Option<Reminder> {
        let reminder = self.store.snooze(id, now + Duration::minutes(minutes))?;
        info!("Reminder {} snoozed until {}", reminder.id, reminder.due_date);
        Some(reminder)
    }
}

/// "Snooze 1 hour", "Snooze 2 hours", "Snooze 15 min".
pub fn snooze_label(minutes: i64) -> String {
    match minutes {
        60 => "Snooze 1 hour".to_string(),
        m if m > 0 && m % 60 == 0 => format!("Snooze {} hours", m / 60),
        m => format!("Snooze {} min", m),
    }
}

pub fn due_prompt(reminder: &Reminder, tz: Tz, snooze_minutes: i64) -> OutgoingMessage {
    let text = format!(
        "⏰ {} Reminder: {}\nDue: {}",
        reminder.target.mention(&reminder.created_by),
        reminder.message,
        format_local(reminder.due_date, tz)
    );
    OutgoingMessage::text(text).with_buttons(vec![
        ActionButton::new(
            ActionEvent::custom_id(COMPLETE_ACTION, &reminder.id),
            "Mark complete",
            ButtonTone::Success,
        ),
        ActionButton::new(
            ActionEvent::custom_id(SNOOZE_ACTION, &reminder.id),
            snooze_label(snooze_minutes),
            ButtonTone::Secondary,
        ),
    ])
}

pub fn recurring_prompt(reminder: &RecurringReminder, fired_at: DateTime<Utc>) -> OutgoingMessage {
    let occurrence = OccurrenceId::new(reminder.id.clone(), fired_at);
    let text = format!(
        "🔁 {} Recurring reminder ({}): {}",
        reminder.target.mention(&reminder.created_by),
        reminder.frequency,
        reminder.message
    );
    OutgoingMessage::text(text).with_buttons(vec![ActionButton::new(
        ActionEvent::custom_id(COMPLETE_ACTION, &occurrence.to_string()),
        "Mark complete",
        ButtonTone::Success,
    )])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FrequencyUnit;
    use chrono::TimeZone;

    fn tz() -> Tz {
        chrono_tz::America::New_York
    }

    fn now() -> DateTime<Utc> {
        tz().with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap().with_timezone(&Utc)
    }

    fn sam() -> UserRef {
        UserRef::new(7, "Sam")
    }

    fn service() -> (ReminderService, Store) {
        let store = Store::new();
        (ReminderService::new(store.clone(), tz()), store)
    }

    #[test]
    fn test_create_one_time() {
        let (service, store) = service();
        let reminder = service
            .create_one_time("take out trash tomorrow at 7pm", ReminderTarget::Creator, &sam(), 5, now())
            .unwrap();

        assert_eq!(reminder.message, "take out trash");
        assert_eq!(
            reminder.due_date,
            tz().with_ymd_and_hms(2024, 1, 2, 19, 0, 0).unwrap().with_timezone(&Utc)
        );
        assert_eq!(store.one_time_snapshot(), vec![reminder]);
    }

    #[test]
    fn test_unparseable_time_stores_nothing() {
        let (service, store) = service();
        let err = service
            .create_one_time("take out trash someday", ReminderTarget::Creator, &sam(), 5, now())
            .unwrap_err();
        assert_eq!(err, ReminderInputError::UnparseableTime);
        assert_eq!(
            err.to_string(),
            "🤔 I couldn't understand when. Try something like `remind me: take out trash tomorrow at 7pm`."
        );
        assert!(store.one_time_snapshot().is_empty());
    }

    #[test]
    fn test_past_and_empty_requests_are_refused() {
        let (service, store) = service();
        assert_eq!(
            service.create_one_time("pay rent 2023-12-01", ReminderTarget::Creator, &sam(), 5, now()),
            Err(ReminderInputError::PastTime)
        );
        assert_eq!(
            service.create_one_time("tomorrow at 9am", ReminderTarget::Creator, &sam(), 5, now()),
            Err(ReminderInputError::EmptyMessage)
        );
        assert!(store.one_time_snapshot().is_empty());
    }

    #[test]
    fn test_create_recurring() {
        let (service, store) = service();
        let reminder = service
            .create_recurring(
                "charge battery every 3 months",
                None,
                ReminderTarget::Everyone,
                &sam(),
                5,
                now(),
            )
            .unwrap();
        assert_eq!(reminder.message, "charge battery");
        assert_eq!(
            reminder.frequency,
            FrequencyRule::Custom {
                interval: 3,
                unit: FrequencyUnit::Months
            }
        );
        assert_eq!(reminder.last_fired, None);

        let daily = service
            .create_recurring("take vitamins", Some(FrequencyRule::Daily), ReminderTarget::Creator, &sam(), 5, now())
            .unwrap();
        assert_eq!(daily.frequency, FrequencyRule::Daily);
        assert_eq!(daily.message, "take vitamins");

        assert_eq!(
            service.create_recurring("water plants sometimes", None, ReminderTarget::Creator, &sam(), 5, now()),
            Err(ReminderInputError::UnparseableFrequency)
        );
        assert_eq!(store.recurring_snapshot().len(), 2);
    }

    #[test]
    fn test_complete_one_time_and_occurrence() {
        let (service, store) = service();
        let reminder = service
            .create_one_time("stretch in 10 minutes", ReminderTarget::Creator, &sam(), 5, now())
            .unwrap();
        let alex = UserRef::new(8, "Alex");

        assert!(matches!(
            service.complete(&reminder.id, &alex, now()),
            CompletionResult::Completed(r) if r.completed_by == Some(alex.clone())
        ));
        assert!(matches!(
            service.complete(&reminder.id, &sam(), now()),
            CompletionResult::AlreadyCompleted(_)
        ));
        assert_eq!(service.complete("gone", &sam(), now()), CompletionResult::NotFound);

        let rule = service
            .create_recurring("vitamins daily", None, ReminderTarget::Creator, &sam(), 5, now())
            .unwrap();
        let occurrence = OccurrenceId::new(rule.id.clone(), now()).to_string();
        assert_eq!(
            service.complete(&occurrence, &alex, now()),
            CompletionResult::Occurrence(rule.clone())
        );
        // Acknowledging an occurrence leaves the rule untouched.
        assert_eq!(store.find_recurring(&rule.id), Some(rule));
    }

    #[test]
    fn test_prompts_carry_action_ids() {
        let (service, _) = service();
        let reminder = service
            .create_one_time("stretch in 10 minutes", ReminderTarget::Creator, &sam(), 5, now())
            .unwrap();
        let prompt = due_prompt(&reminder, tz(), 60);
        assert!(prompt.text.starts_with("⏰ <@7> Reminder: stretch"));
        assert_eq!(prompt.buttons[0].custom_id, format!("reminder_complete:{}", reminder.id));
        assert_eq!(prompt.buttons[1].custom_id, format!("reminder_snooze:{}", reminder.id));
        assert_eq!(prompt.buttons[1].label, "Snooze 1 hour");

        let rule = RecurringReminder::new("vitamins", FrequencyRule::Daily, ReminderTarget::Everyone, sam(), 5, now());
        let prompt = recurring_prompt(&rule, now());
        assert_eq!(prompt.text, "🔁 @everyone Recurring reminder (every day): vitamins");
        assert_eq!(prompt.buttons.len(), 1);
        assert_eq!(
            prompt.buttons[0].custom_id,
            format!("reminder_complete:{}@{}", rule.id, now().timestamp_millis())
        );
    }

    #[test]
    fn test_snooze_label() {
        assert_eq!(snooze_label(60), "Snooze 1 hour");
        assert_eq!(snooze_label(120), "Snooze 2 hours");
        assert_eq!(snooze_label(15), "Snooze 15 min");
    }
}
