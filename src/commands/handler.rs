use super::help::help_text;
use super::interaction::{CANCEL_ACTION, CONFIRM_ACTION};
use super::router::{route, Command};
use crate::config::DISCORD_MESSAGE_LIMIT;
use crate::pinned::refresh_anchor;
use crate::platform::{ActionButton, ActionEvent, ButtonTone, InboundMessage, OutgoingMessage};
use crate::render::{format_local, render_list, truncate_chars};
use crate::services::reminder::ReminderService;
use crate::store::{
    AddOutcome, AddReport, ConfirmableAction, EventItem, ListKind, ReminderTarget, UserRef,
    MAX_LIST_ITEMS,
};
use crate::timeparse::{parse_due_date, split_message_and_time};
use crate::Data;
use anyhow::Context as AnyhowContext;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

/// Routes one chat message: mutate the store, refresh the affected pinned
/// list, then reply in the same channel.
pub async fn handle_message(
    data: &Data,
    message: &InboundMessage,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    if message.is_bot {
        return Ok(());
    }
    if !data.config.listens_to(&message.channel_name) {
        debug!("Ignoring message in #{}", message.channel_name);
        return Ok(());
    }
    let Some(command) = route(&message.text) else {
        return Ok(());
    };

    debug!(
        "Command {:?} from user {} in channel {}",
        command, message.user_id, message.channel_id
    );
    let mut reply = execute(data, message, command, now).await;
    reply.text = truncate_chars(&reply.text, DISCORD_MESSAGE_LIMIT);

    data.platform
        .post_message(message.channel_id, &reply)
        .await
        .with_context(|| format!("Failed to reply in channel {}", message.channel_id))?;
    Ok(())
}

async fn execute(
    data: &Data,
    message: &InboundMessage,
    command: Command,
    now: DateTime<Utc>,
) -> OutgoingMessage {
    let user = UserRef::new(message.user_id, message.user_display_name.clone());
    let channel_id = message.channel_id;
    let tz = data.config.timezone;
    let service = ReminderService::new(data.store.clone(), tz);

    let (touched, text) = match command {
        Command::AddGroceries(items) => {
            if items.is_empty() {
                return OutgoingMessage::text("❌ Tell me what to add, like `buy: milk, eggs`.");
            }
            let report = data.store.add_groceries(&items, &user, now);
            (Some(ListKind::Groceries), describe_add(&report, "Added to list", "grocery list"))
        }
        Command::RemoveGroceries(items) => {
            if items.is_empty() {
                return OutgoingMessage::text("❌ Tell me what you got, like `got: milk, eggs`.");
            }
            let report = data.store.remove_groceries(&items);
            let mut lines = Vec::new();
            if !report.removed.is_empty() {
                lines.push(format!("Removed from list: {}", report.removed.join(", ")));
            }
            if !report.missing.is_empty() {
                lines.push(format!("Not on the list: {}", report.missing.join(", ")));
            }
            (Some(ListKind::Groceries), lines.join("\n"))
        }
        Command::AddEvent(text) => add_event(data, &text, &user, now),
        Command::RemoveEvent(search) => match data.store.remove_event(&search) {
            Some(event) => (Some(ListKind::Events), format!("🗑️ Removed event: {}", event.name)),
            None => (None, format!("❌ No event matching \"{}\" found.", search)),
        },
        Command::LogCleaning(task) => {
            if task.is_empty() {
                return OutgoingMessage::text("❌ Tell me what you cleaned, like `cleaned: bathroom`.");
            }
            data.store.record_cleaning(&task, &user, now);
            (
                Some(ListKind::Cleaning),
                format!("🧹 Logged: {} cleaned by {}", task, user.name),
            )
        }
        Command::AddMaintenance(items) => {
            if items.is_empty() {
                return OutgoingMessage::text("❌ Tell me what needs fixing, like `fix: porch light`.");
            }
            let report = data.store.add_maintenance(&items, &user, now);
            (
                Some(ListKind::Maintenance),
                describe_add(&report, "🔧 Added to maintenance", "maintenance list"),
            )
        }
        Command::RemoveMaintenance(search) => match data.store.remove_maintenance(&search) {
            Some(item) => (Some(ListKind::Maintenance), format!("✅ Fixed: {}", item.description)),
            None => (
                None,
                format!("❌ No maintenance item matching \"{}\" found.", search),
            ),
        },
        Command::RemoveReminder(search) => {
            let removed = data
                .store
                .remove_one_time(&search)
                .map(|r| r.message)
                .or_else(|| data.store.remove_recurring(&search).map(|r| r.message));
            match removed {
                Some(text) => {
                    info!("Removed reminder \"{}\" for user {}", text, user.id);
                    (Some(ListKind::Reminders), format!("🗑️ Removed reminder: \"{}\"", text))
                }
                None => (None, format!("❌ No reminder matching \"{}\" found.", search)),
            }
        }
        Command::Remind { target, text } => {
            match service.create_one_time(&text, target, &user, channel_id, now) {
                Ok(reminder) => (
                    Some(ListKind::Reminders),
                    format!(
                        "✅ Reminder set: \"{}\" for {}",
                        reminder.message,
                        format_local(reminder.due_date, tz)
                    ),
                ),
                Err(e) => (None, e.to_string()),
            }
        }
        Command::Recurring { text, default } => {
            let created = service.create_recurring(
                &text,
                default,
                ReminderTarget::Creator,
                &user,
                channel_id,
                now,
            );
            match created {
                Ok(reminder) => (
                    Some(ListKind::Reminders),
                    format!(
                        "✅ Recurring reminder set: \"{}\" {}",
                        reminder.message, reminder.frequency
                    ),
                ),
                Err(e) => (None, e.to_string()),
            }
        }
        Command::ClearList(kind) => return confirm_clear(data, kind, &user, channel_id, now),
        Command::Show(kind) => {
            refresh_anchor(&data.store, data.platform.as_ref(), kind, channel_id, now, tz).await;
            let card = data.store.read(|state| render_list(kind, state, now, tz));
            return OutgoingMessage::card(card);
        }
        Command::Time => (
            None,
            format!("🕐 It's {} ({}).", format_local(now, tz), tz.name()),
        ),
        Command::Hello => (
            None,
            format!("👋 Hi {}! Say `help` to see what I can do.", user.name),
        ),
        Command::Help => (None, help_text()),
    };

    if let Some(kind) = touched {
        refresh_anchor(&data.store, data.platform.as_ref(), kind, channel_id, now, tz).await;
    }
    OutgoingMessage::text(text)
}

fn describe_add(report: &AddReport, added_label: &str, list_label: &str) -> String {
    let mut lines = Vec::new();
    if !report.added.is_empty() {
        lines.push(format!("{}: {}", added_label, report.added.join(", ")));
    }
    if !report.duplicates.is_empty() {
        lines.push(format!("Already on the list: {}", report.duplicates.join(", ")));
    }
    if !report.overflow.is_empty() {
        lines.push(format!(
            "❌ The {} is full ({} items). Couldn't add: {}",
            list_label,
            MAX_LIST_ITEMS,
            report.overflow.join(", ")
        ));
    }
    lines.join("\n")
}

/// `Dinner at Pat's friday at 7pm` becomes an event named `Dinner at Pat's`
/// starting Friday 19:00; text without a recognisable time is kept whole.
fn add_event(
    data: &Data,
    text: &str,
    user: &UserRef,
    now: DateTime<Utc>,
) -> (Option<ListKind>, String) {
    let tz = data.config.timezone;
    if text.is_empty() || parse_due_date(text, now, tz).is_some() {
        return (
            None,
            "❌ Give the event a name, like `event: dinner at Pat's friday at 7pm`.".to_string(),
        );
    }

    let (name, starts_at) = match split_message_and_time(text, now, tz) {
        Some((name, at)) => (name, Some(at)),
        None => (text.to_string(), None),
    };
    let when = starts_at
        .map(|at| format!(" — {}", format_local(at, tz)))
        .unwrap_or_default();

    let outcome = data.store.add_event(EventItem {
        name: name.clone(),
        starts_at,
        added_by: user.clone(),
        added_at: now,
    });
    match outcome {
        AddOutcome::Added => (Some(ListKind::Events), format!("📅 Added event: {}{}", name, when)),
        AddOutcome::Duplicate => (None, format!("Already on the events list: {}", name)),
        AddOutcome::Full => (
            None,
            format!("❌ The events list is full ({} items).", MAX_LIST_ITEMS),
        ),
    }
}

fn confirm_clear(
    data: &Data,
    kind: ListKind,
    user: &UserRef,
    channel_id: u64,
    now: DateTime<Utc>,
) -> OutgoingMessage {
    let expires_at = now + Duration::seconds(data.config.confirm_timeout_secs as i64);
    let pending = data.store.add_pending(
        ConfirmableAction::ClearList(kind),
        channel_id,
        user.clone(),
        now,
        expires_at,
    );

    OutgoingMessage::text(format!(
        "⚠️ Clear the {}? This can't be undone.",
        kind.label()
    ))
    .with_buttons(vec![
        ActionButton::new(
            ActionEvent::custom_id(CONFIRM_ACTION, &pending.id),
            "Confirm",
            ButtonTone::Danger,
        ),
        ActionButton::new(
            ActionEvent::custom_id(CANCEL_ACTION, &pending.id),
            "Cancel",
            ButtonTone::Secondary,
        ),
    ])
}
