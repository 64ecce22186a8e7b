use crate::store::{FrequencyRule, ListKind, ReminderTarget};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref REMIND_NAMED: Regex = Regex::new(r"^remind\s+(@?[a-z0-9_][a-z0-9_ .'-]{0,31}?)\s*:").unwrap();
}

/// A parsed chat command. Arguments keep the caller's original casing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    AddGroceries(Vec<String>),
    RemoveGroceries(Vec<String>),
    RemoveEvent(String),
    AddEvent(String),
    LogCleaning(String),
    RemoveMaintenance(String),
    AddMaintenance(Vec<String>),
    RemoveReminder(String),
    Remind {
        target: ReminderTarget,
        text: String,
    },
    Recurring {
        text: String,
        default: Option<FrequencyRule>,
    },
    ClearList(ListKind),
    Show(ListKind),
    Time,
    Hello,
    Help,
}

/// Splits `milk, eggs ,, bread` into trimmed, non-empty items.
pub fn split_items(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

/// Returns the argument after the first of `prefixes` that `lowered` starts
/// with, sliced out of `text` so its casing survives.
fn strip_any<'a>(text: &'a str, lowered: &str, prefixes: &[&str]) -> Option<&'a str> {
    prefixes
        .iter()
        .find(|prefix| lowered.starts_with(*prefix))
        .map(|prefix| text[prefix.len()..].trim())
}

fn named_target(name: &str) -> ReminderTarget {
    let name = name.trim().trim_start_matches('@');
    match name.to_ascii_lowercase().as_str() {
        "everyone" | "everybody" | "all" | "us" | "here" => ReminderTarget::Everyone,
        _ => ReminderTarget::Named(name.to_string()),
    }
}

/// Maps a chat message to a command. The first matching prefix wins; text
/// that matches nothing is `None` and gets no reply.
pub fn route(text: &str) -> Option<Command> {
    let text = text.trim();
    // ASCII lowercasing keeps byte offsets aligned with `text`.
    let lowered = text.to_ascii_lowercase();

    if let Some(rest) = strip_any(text, &lowered, &["buy:"]) {
        return Some(Command::AddGroceries(split_items(rest)));
    }
    if let Some(rest) = strip_any(text, &lowered, &["got:", "i got:"]) {
        return Some(Command::RemoveGroceries(split_items(rest)));
    }
    if let Some(rest) = strip_any(text, &lowered, &["remove event:", "delete event:"]) {
        return Some(Command::RemoveEvent(rest.to_string()));
    }
    if let Some(rest) = strip_any(text, &lowered, &["event:"]) {
        return Some(Command::AddEvent(rest.to_string()));
    }
    if let Some(rest) = strip_any(text, &lowered, &["cleaned:", "clean:"]) {
        return Some(Command::LogCleaning(rest.to_string()));
    }
    if let Some(rest) = strip_any(text, &lowered, &["fixed:"]) {
        return Some(Command::RemoveMaintenance(rest.to_string()));
    }
    if let Some(rest) = strip_any(text, &lowered, &["maintenance:", "fix:"]) {
        return Some(Command::AddMaintenance(split_items(rest)));
    }
    if let Some(rest) = strip_any(text, &lowered, &["remove reminder:", "delete reminder:"]) {
        return Some(Command::RemoveReminder(rest.to_string()));
    }
    if let Some(rest) = strip_any(text, &lowered, &["remind me:", "remind:"]) {
        return Some(Command::Remind {
            target: ReminderTarget::Creator,
            text: rest.to_string(),
        });
    }
    if let Some(caps) = REMIND_NAMED.captures(&lowered) {
        let whole = caps.get(0)?;
        let name = caps.get(1)?;
        return Some(Command::Remind {
            target: named_target(&text[name.start()..name.end()]),
            text: text[whole.end()..].trim().to_string(),
        });
    }
    if let Some(rest) = strip_any(text, &lowered, &["recurring:"]) {
        return Some(Command::Recurring {
            text: rest.to_string(),
            default: None,
        });
    }
    for (prefix, rule) in [
        ("daily:", FrequencyRule::Daily),
        ("weekly:", FrequencyRule::Weekly(None)),
        ("monthly:", FrequencyRule::Monthly),
    ] {
        if let Some(rest) = strip_any(text, &lowered, &[prefix]) {
            return Some(Command::Recurring {
                text: rest.to_string(),
                default: Some(rule),
            });
        }
    }

    match lowered.as_str() {
        "clear list" | "clear groceries" => Some(Command::ClearList(ListKind::Groceries)),
        "clear events" => Some(Command::ClearList(ListKind::Events)),
        "clear maintenance" => Some(Command::ClearList(ListKind::Maintenance)),
        "list" | "groceries" => Some(Command::Show(ListKind::Groceries)),
        "events" => Some(Command::Show(ListKind::Events)),
        "cleaning" => Some(Command::Show(ListKind::Cleaning)),
        "maintenance" => Some(Command::Show(ListKind::Maintenance)),
        "reminders" => Some(Command::Show(ListKind::Reminders)),
        "time" => Some(Command::Time),
        "hello" | "hi" => Some(Command::Hello),
        "help" => Some(Command::Help),
        _ => None,
    }
}
