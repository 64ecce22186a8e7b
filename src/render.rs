//! Turns list state into the card shown in each list's pinned message.
//!
//! Rendering is pure: the same state, clock and timezone always produce the
//! same card, so the refresher can re-render blindly.

use crate::calendar::calendar_links;
use crate::config::DISCORD_EMBED_LIMIT;
use crate::store::{ListKind, State};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListCard {
    pub title: String,
    pub body: String,
    pub footer: String,
}

/// `Tue Jan 2 at 7:00 PM` in the configured timezone.
pub fn format_local(at: DateTime<Utc>, tz: Tz) -> String {
    at.with_timezone(&tz).format("%a %b %-d at %-I:%M %p").to_string()
}

fn format_local_date(at: DateTime<Utc>, tz: Tz) -> String {
    at.with_timezone(&tz).format("%b %-d").to_string()
}

pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    truncated.push('…');
    truncated
}

pub fn render_list(kind: ListKind, state: &State, now: DateTime<Utc>, tz: Tz) -> ListCard {
    let (title, body, footer) = match kind {
        ListKind::Groceries => (
            "🛒 Grocery List",
            render_groceries(state),
            "Use `buy: item1, item2` to add items • Use `got: item1, item2` to remove items",
        ),
        ListKind::Events => (
            "📅 Upcoming Events",
            render_events(state, tz),
            "Use `event: name on date` to add • Use `remove event: name` to remove",
        ),
        ListKind::Cleaning => (
            "🧹 Cleaning Log",
            render_cleaning(state, tz),
            "Use `cleaned: task` to log a chore",
        ),
        ListKind::Maintenance => (
            "🔧 Maintenance",
            render_maintenance(state),
            "Use `fix: item` to add • Use `fixed: item` to remove",
        ),
        ListKind::Reminders => (
            "⏰ Reminders",
            render_reminders(state, now, tz),
            "Use `remind me: task tomorrow at 7pm` or `recurring: task every week`",
        ),
    };

    ListCard {
        title: title.to_string(),
        body: truncate_chars(&body, DISCORD_EMBED_LIMIT),
        footer: footer.to_string(),
    }
}

fn render_groceries(state: &State) -> String {
    if state.groceries.is_empty() {
        return "_No items needed!_".to_string();
    }
    state
        .groceries
        .iter()
        .enumerate()
        .map(|(i, item)| format!("{}. {} _(added by {})_", i + 1, item.name, item.added_by.name))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_events(state: &State, tz: Tz) -> String {
    if state.events.is_empty() {
        return "_No upcoming events._".to_string();
    }

    let mut lines = Vec::new();
    for (i, event) in state.events.iter().enumerate() {
        let Some(starts_at) = event.starts_at else {
            lines.push(format!("{}. **{}** _(no date)_", i + 1, event.name));
            continue;
        };
        lines.push(format!(
            "{}. **{}** — {}",
            i + 1,
            event.name,
            format_local(starts_at, tz)
        ));
        match calendar_links(&event.name, starts_at) {
            Ok(links) => lines.push(format!(
                "   [Google]({}) • [Outlook]({}) • [Yahoo]({})",
                links.google, links.outlook, links.yahoo
            )),
            Err(e) => debug!("Skipping calendar links for '{}': {}", event.name, e),
        }
    }
    lines.join("\n")
}

fn render_cleaning(state: &State, tz: Tz) -> String {
    if state.cleaning.is_empty() {
        return "_Nothing logged yet._".to_string();
    }
    state
        .cleaning
        .values()
        .map(|entry| {
            format!(
                "**{}** — last done by {} on {}",
                entry.task,
                entry.done_by.name,
                format_local_date(entry.done_at, tz)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_maintenance(state: &State) -> String {
    if state.maintenance.is_empty() {
        return "_Nothing needs fixing._".to_string();
    }
    state
        .maintenance
        .iter()
        .enumerate()
        .map(|(i, item)| {
            format!(
                "{}. {} _(added by {})_",
                i + 1,
                item.description,
                item.added_by.name
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_reminders(state: &State, now: DateTime<Utc>, tz: Tz) -> String {
    let mut pending: Vec<_> = state.reminders.iter().filter(|r| !r.completed).collect();
    pending.sort_by_key(|r| r.due_date);

    if pending.is_empty() && state.recurring.is_empty() {
        return "_No reminders set._".to_string();
    }

    let mut sections = Vec::new();

    if !pending.is_empty() {
        let lines: Vec<String> = pending
            .iter()
            .map(|r| {
                let overdue = if r.is_overdue(now) { " ⚠️ OVERDUE" } else { "" };
                format!(
                    "• \"{}\" for {} — {}{}",
                    r.message,
                    r.target.label(&r.created_by),
                    format_local(r.due_date, tz),
                    overdue
                )
            })
            .collect();
        sections.push(format!("**Upcoming**\n{}", lines.join("\n")));
    }

    if !state.recurring.is_empty() {
        let lines: Vec<String> = state
            .recurring
            .iter()
            .map(|r| {
                let last = r
                    .last_fired
                    .map(|at| format_local(at, tz))
                    .unwrap_or_else(|| "never".to_string());
                format!(
                    "• \"{}\" for {} — {} (last: {})",
                    r.message,
                    r.target.label(&r.created_by),
                    r.frequency,
                    last
                )
            })
            .collect();
        sections.push(format!("**Recurring**\n{}", lines.join("\n")));
    }

    sections.join("\n\n")
}
