use crate::pinned::refresh_anchor;
use crate::platform::ActionEvent;
use crate::render::format_local;
use crate::services::reminder::{CompletionResult, ReminderService, COMPLETE_ACTION, SNOOZE_ACTION};
use crate::store::{ConfirmableAction, ListKind, UserRef};
use crate::Data;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

pub const CONFIRM_ACTION: &str = "confirm_action";
pub const CANCEL_ACTION: &str = "cancel_action";

const EXPIRED: &str = "⌛ This action has expired. Please run the command again.";
const MISSING_REMINDER: &str = "❌ That reminder no longer exists.";

/// How the bot answers a button press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionReply {
    /// Replace the pressed message's content and drop its buttons.
    Update(String),
    /// Answer only the user who pressed.
    Ephemeral(String),
}

pub async fn handle_action(data: &Data, event: &ActionEvent, now: DateTime<Utc>) -> ActionReply {
    match event.action_id.as_str() {
        COMPLETE_ACTION => complete(data, event, now).await,
        SNOOZE_ACTION => snooze(data, event, now).await,
        CONFIRM_ACTION => confirm(data, event, now).await,
        CANCEL_ACTION => match data.store.take_pending(&event.value, now) {
            Some(pending) => {
                info!("Pending action {} cancelled by user {}", pending.id, event.invoking_user_id);
                ActionReply::Update("↩️ Cancelled. Nothing was cleared.".to_string())
            }
            None => ActionReply::Ephemeral(EXPIRED.to_string()),
        },
        other => {
            warn!("Unknown action '{}' from user {}", other, event.invoking_user_id);
            ActionReply::Ephemeral("❌ Unknown action.".to_string())
        }
    }
}

async fn invoking_user(data: &Data, event: &ActionEvent) -> UserRef {
    let name = match data.platform.user_display_name(event.invoking_user_id).await {
        Ok(name) => name,
        Err(e) => {
            warn!("Failed to look up user {}: {}", event.invoking_user_id, e);
            format!("user {}", event.invoking_user_id)
        }
    };
    UserRef::new(event.invoking_user_id, name)
}

async fn complete(data: &Data, event: &ActionEvent, now: DateTime<Utc>) -> ActionReply {
    let tz = data.config.timezone;
    let user = invoking_user(data, event).await;
    let service = ReminderService::new(data.store.clone(), tz);

    match service.complete(&event.value, &user, now) {
        CompletionResult::Completed(reminder) => {
            refresh_anchor(
                &data.store,
                data.platform.as_ref(),
                ListKind::Reminders,
                reminder.channel_id,
                now,
                tz,
            )
            .await;
            ActionReply::Update(format!(
                "✅ {} — completed by <@{}>",
                reminder.message, user.id
            ))
        }
        CompletionResult::AlreadyCompleted(reminder) => {
            let by = reminder
                .completed_by
                .map(|u| u.name)
                .unwrap_or_else(|| "someone".to_string());
            ActionReply::Ephemeral(format!(
                "ℹ️ \"{}\" was already completed by {}.",
                reminder.message, by
            ))
        }
        CompletionResult::Occurrence(rule) => ActionReply::Update(format!(
            "✅ {} ({}) — done for now, thanks <@{}>",
            rule.message, rule.frequency, user.id
        )),
        CompletionResult::NotFound => ActionReply::Ephemeral(MISSING_REMINDER.to_string()),
    }
}

async fn snooze(data: &Data, event: &ActionEvent, now: DateTime<Utc>) -> ActionReply {
    let tz = data.config.timezone;
    let service = ReminderService::new(data.store.clone(), tz);

    let Some(reminder) = service.snooze(&event.value, now, data.config.snooze_minutes) else {
        return match data.store.find_one_time(&event.value) {
            Some(_) => ActionReply::Ephemeral("ℹ️ That reminder is already completed.".to_string()),
            None => ActionReply::Ephemeral(MISSING_REMINDER.to_string()),
        };
    };

    refresh_anchor(
        &data.store,
        data.platform.as_ref(),
        ListKind::Reminders,
        reminder.channel_id,
        now,
        tz,
    )
    .await;
    ActionReply::Update(format!(
        "😴 Snoozed \"{}\" until {}",
        reminder.message,
        format_local(reminder.due_date, tz)
    ))
}

async fn confirm(data: &Data, event: &ActionEvent, now: DateTime<Utc>) -> ActionReply {
    let Some(pending) = data.store.take_pending(&event.value, now) else {
        return ActionReply::Ephemeral(EXPIRED.to_string());
    };

    match pending.action {
        ConfirmableAction::ClearList(kind) => {
            let removed = data.store.clear_list(kind);
            info!(
                "Cleared {} in channel {} ({} items) for user {}",
                kind.label(),
                pending.channel_id,
                removed,
                event.invoking_user_id
            );
            refresh_anchor(
                &data.store,
                data.platform.as_ref(),
                kind,
                pending.channel_id,
                now,
                data.config.timezone,
            )
            .await;
            ActionReply::Update(format!(
                "🗑️ Cleared the {} ({} items removed).",
                kind.label(),
                removed
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::handler::handle_message;
    use crate::platform::InboundMessage;
    use crate::store::{FrequencyRule, OccurrenceId, RecurringReminder, Reminder, ReminderTarget};
    use crate::testing::test_data;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 17, 0, 0).unwrap()
    }

    fn press(action_id: &str, value: &str) -> ActionEvent {
        ActionEvent {
            action_id: action_id.to_string(),
            value: value.to_string(),
            invoking_user_id: 8,
            source_channel_id: 5,
            source_message_id: 900,
        }
    }

    fn add_reminder(data: &Data) -> String {
        data.store.add_one_time(Reminder::new(
            "water plants",
            now(),
            ReminderTarget::Creator,
            UserRef::new(7, "Sam"),
            5,
            now() - Duration::hours(1),
        ))
    }

    #[tokio::test]
    async fn test_complete_marks_reminder_done() {
        let (data, _) = test_data();
        let id = add_reminder(&data);

        let reply = handle_action(&data, &press(COMPLETE_ACTION, &id), now()).await;
        assert_eq!(
            reply,
            ActionReply::Update("✅ water plants — completed by <@8>".to_string())
        );
        let reminder = data.store.find_one_time(&id).unwrap();
        assert!(reminder.completed);
        assert_eq!(reminder.completed_by, Some(UserRef::new(8, "user-8")));

        let again = handle_action(&data, &press(COMPLETE_ACTION, &id), now()).await;
        assert_eq!(
            again,
            ActionReply::Ephemeral("ℹ️ \"water plants\" was already completed by user-8.".to_string())
        );
    }

    #[tokio::test]
    async fn test_complete_missing_reminder() {
        let (data, _) = test_data();
        let reply = handle_action(&data, &press(COMPLETE_ACTION, "1-deadbeef"), now()).await;
        assert_eq!(reply, ActionReply::Ephemeral(MISSING_REMINDER.to_string()));
    }

    #[tokio::test]
    async fn test_complete_occurrence_leaves_rule() {
        let (data, _) = test_data();
        let rule = RecurringReminder::new(
            "vitamins",
            FrequencyRule::Daily,
            ReminderTarget::Creator,
            UserRef::new(7, "Sam"),
            5,
            now(),
        );
        data.store.add_recurring(rule.clone());
        let occurrence = OccurrenceId::new(rule.id.clone(), now()).to_string();

        let reply = handle_action(&data, &press(COMPLETE_ACTION, &occurrence), now()).await;
        assert_eq!(
            reply,
            ActionReply::Update("✅ vitamins (every day) — done for now, thanks <@8>".to_string())
        );
        assert_eq!(data.store.recurring_snapshot(), vec![rule]);
    }

    #[tokio::test]
    async fn test_snooze_moves_due_date_and_rearms() {
        let (data, _) = test_data();
        let id = add_reminder(&data);
        data.store.claim_due(now());
        data.store.mark_sent(&id, now());

        let reply = handle_action(&data, &press(SNOOZE_ACTION, &id), now()).await;
        let reminder = data.store.find_one_time(&id).unwrap();
        assert_eq!(reminder.due_date, now() + Duration::hours(1));
        assert!(!reminder.sent);
        assert_eq!(
            reply,
            ActionReply::Update("😴 Snoozed \"water plants\" until Mon Jan 1 at 1:00 PM".to_string())
        );

        // Nothing is due again until the new time.
        assert!(data.store.claim_due(now() + Duration::minutes(30)).is_empty());
    }

    #[tokio::test]
    async fn test_snooze_completed_reminder_is_refused() {
        let (data, _) = test_data();
        let id = add_reminder(&data);
        handle_action(&data, &press(COMPLETE_ACTION, &id), now()).await;

        let reply = handle_action(&data, &press(SNOOZE_ACTION, &id), now()).await;
        assert_eq!(
            reply,
            ActionReply::Ephemeral("ℹ️ That reminder is already completed.".to_string())
        );
    }

    fn from_sam(text: &str) -> InboundMessage {
        InboundMessage {
            channel_id: 5,
            channel_name: "household".to_string(),
            user_id: 7,
            user_display_name: "Sam".to_string(),
            text: text.to_string(),
            is_bot: false,
        }
    }

    fn pending_id(platform: &crate::testing::RecordingPlatform) -> String {
        let (_, prompt) = platform.posts().last().cloned().unwrap();
        prompt.buttons[0]
            .custom_id
            .split_once(':')
            .map(|(_, id)| id.to_string())
            .unwrap()
    }

    #[tokio::test]
    async fn test_confirm_clears_list() {
        let (data, platform) = test_data();
        handle_message(&data, &from_sam("buy: milk, eggs"), now()).await.unwrap();
        handle_message(&data, &from_sam("clear list"), now()).await.unwrap();
        let id = pending_id(&platform);

        let reply = handle_action(&data, &press(CONFIRM_ACTION, &id), now()).await;
        assert_eq!(
            reply,
            ActionReply::Update("🗑️ Cleared the grocery list (2 items removed).".to_string())
        );
        assert!(data.store.read(|state| state.groceries.is_empty()));

        let (_, _, anchor) = platform.updates().last().cloned().unwrap();
        assert_eq!(anchor.card.unwrap().body, "_No items needed!_");

        // The confirmation is single-use.
        let again = handle_action(&data, &press(CONFIRM_ACTION, &id), now()).await;
        assert_eq!(again, ActionReply::Ephemeral(EXPIRED.to_string()));
    }

    #[tokio::test]
    async fn test_expired_and_cancelled_confirmations() {
        let (data, platform) = test_data();
        handle_message(&data, &from_sam("buy: milk"), now()).await.unwrap();
        handle_message(&data, &from_sam("clear list"), now()).await.unwrap();
        let id = pending_id(&platform);

        let late = now() + Duration::seconds(data.config.confirm_timeout_secs as i64 + 1);
        let reply = handle_action(&data, &press(CONFIRM_ACTION, &id), late).await;
        assert_eq!(
            reply,
            ActionReply::Ephemeral("⌛ This action has expired. Please run the command again.".to_string())
        );
        assert_eq!(data.store.read(|state| state.groceries.len()), 1);

        handle_message(&data, &from_sam("clear list"), now()).await.unwrap();
        let id = pending_id(&platform);
        let reply = handle_action(&data, &press(CANCEL_ACTION, &id), now()).await;
        assert_eq!(
            reply,
            ActionReply::Update("↩️ Cancelled. Nothing was cleared.".to_string())
        );
        assert_eq!(data.store.read(|state| state.groceries.len()), 1);
    }

    #[tokio::test]
    async fn test_unknown_action() {
        let (data, _) = test_data();
        let reply = handle_action(&data, &press("launch_rockets", "x"), now()).await;
        assert_eq!(reply, ActionReply::Ephemeral("❌ Unknown action.".to_string()));
    }
}
