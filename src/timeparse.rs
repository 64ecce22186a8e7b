//! Natural-language due dates ("tomorrow at 7pm", "in 2 hours", "jan 5")
//! and recurrence phrases ("daily", "every 3 months").
//!
//! Due dates are interpreted in the configured timezone, never the host's,
//! so "tomorrow" means the next local calendar day. Anything that does not
//! match a known form as a whole yields `None`; callers ask the user to
//! rephrase.

use crate::store::{FrequencyRule, FrequencyUnit};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use lazy_static::lazy_static;
use regex::Regex;

/// Time of day used when a phrase names a day but no time.
const DEFAULT_HOUR: u32 = 9;
const TONIGHT_HOUR: u32 = 20;

lazy_static! {
    static ref CLOCK_TIME: Regex =
        Regex::new(r"^(\d{1,2})(?::(\d{2}))?\s*(am|pm|a\.m\.?|p\.m\.?)?$").unwrap();
    static ref ISO_DATE: Regex = Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})$").unwrap();
    static ref SLASH_DATE: Regex =
        Regex::new(r"^(\d{1,2})/(\d{1,2})(?:/(\d{4}|\d{2}))?$").unwrap();
    static ref MONTH_DAY: Regex =
        Regex::new(r"^([a-z]+)\.?\s+(\d{1,2})(?:st|nd|rd|th)?(?:,?\s+(\d{4}))?$").unwrap();
    static ref DAY_MONTH: Regex =
        Regex::new(r"^(\d{1,2})(?:st|nd|rd|th)?\s+(?:of\s+)?([a-z]+)\.?(?:,?\s+(\d{4}))?$").unwrap();
    static ref SPACED_UNIT: Regex = Regex::new(r"(\d+)\s+([a-z]+)").unwrap();

    /// Tested in order before the capture patterns below; first match wins.
    static ref FREQUENCY_KEYWORDS: Vec<(Regex, FrequencyRule)> = vec![
        (Regex::new(r"\bdaily\b").unwrap(), FrequencyRule::Daily),
        (Regex::new(r"\bevery\s+day\b").unwrap(), FrequencyRule::Daily),
        (Regex::new(r"\bweekly\b").unwrap(), FrequencyRule::Weekly(None)),
        (Regex::new(r"\bevery\s+week\b").unwrap(), FrequencyRule::Weekly(None)),
        (Regex::new(r"\bmonthly\b").unwrap(), FrequencyRule::Monthly),
        (Regex::new(r"\bevery\s+month\b").unwrap(), FrequencyRule::Monthly),
    ];
    static ref EVERY_OTHER: Regex = Regex::new(r"\bevery\s+other\s+(day|week|month)\b").unwrap();
    static ref EVERY_N: Regex = Regex::new(r"\bevery\s+(\d+)\s+(days?|weeks?|months?)\b").unwrap();
    static ref EVERY_WEEKDAY: Regex = Regex::new(
        r"\bevery\s+(monday|mon|tuesday|tues|tue|wednesday|wed|thursday|thurs|thu|friday|fri|saturday|sat|sunday|sun)\b"
    )
    .unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DaySpec {
    Today,
    Tonight,
    Tomorrow,
    /// `next` excludes today even if the time is still ahead.
    Weekday { day: Weekday, next: bool },
    Date { year: Option<i32>, month: u32, day: u32 },
}

/// Parses `text` into an absolute instant relative to `reference`.
pub fn parse_due_date(text: &str, reference: DateTime<Utc>, tz: Tz) -> Option<DateTime<Utc>> {
    let normalized = normalize(text);
    let phrase = strip_leading_word(&normalized, &["on", "by"]);
    if phrase.is_empty() {
        return None;
    }

    if let Some(rest) = phrase.strip_prefix("in ") {
        return parse_relative(rest).and_then(|offset| reference.checked_add_signed(offset));
    }

    let (day, time) = parse_day_and_time(phrase)?;
    resolve(day, time, reference.with_timezone(&tz), tz)
}

/// Splits "call mom tomorrow at 9am" into ("call mom", due). The longest
/// trailing run of words that parses as a date wins; the message part must
/// not be empty.
pub fn split_message_and_time(
    text: &str,
    reference: DateTime<Utc>,
    tz: Tz,
) -> Option<(String, DateTime<Utc>)> {
    let text = text.trim();
    if parse_due_date(text, reference, tz).is_some() {
        return None;
    }
    for start in word_starts(text).into_iter().skip(1) {
        let Some(due) = parse_due_date(&text[start..], reference, tz) else {
            continue;
        };
        let message = trim_separators(&text[..start]);
        if !message.is_empty() {
            return Some((message.to_string(), due));
        }
    }
    None
}

pub fn parse_frequency(text: &str) -> Option<FrequencyRule> {
    extract_frequency(text).map(|(rule, _)| rule)
}

/// Finds the first recurrence phrase in `text` and returns the rule together
/// with the text that remains once the phrase is cut out.
///
/// Keywords ("daily", "every week", ...) are tested before the numeric
/// patterns, so "daily, or every 3 days" is `Daily`.
pub fn extract_frequency(text: &str) -> Option<(FrequencyRule, String)> {
    // ASCII lowercasing keeps byte offsets aligned with `text`.
    let lowered = text.to_ascii_lowercase();

    for (pattern, rule) in FREQUENCY_KEYWORDS.iter() {
        if let Some(found) = pattern.find(&lowered) {
            return Some((*rule, cut_span(text, found.start(), found.end())));
        }
    }

    if let Some(caps) = EVERY_OTHER.captures(&lowered) {
        let whole = caps.get(0)?;
        let unit = parse_unit(&caps[1])?;
        return Some((
            FrequencyRule::Custom { interval: 2, unit },
            cut_span(text, whole.start(), whole.end()),
        ));
    }

    if let Some(caps) = EVERY_N.captures(&lowered) {
        let whole = caps.get(0)?;
        let interval: u32 = caps[1].parse().ok().filter(|n| *n >= 1)?;
        let unit = parse_unit(&caps[2])?;
        unit.span(interval)?;
        return Some((
            FrequencyRule::Custom { interval, unit },
            cut_span(text, whole.start(), whole.end()),
        ));
    }

    if let Some(caps) = EVERY_WEEKDAY.captures(&lowered) {
        let whole = caps.get(0)?;
        let day = parse_weekday(&caps[1])?;
        return Some((
            FrequencyRule::Weekly(Some(day)),
            cut_span(text, whole.start(), whole.end()),
        ));
    }

    None
}

fn normalize(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches(|c: char| matches!(c, '.' | '!' | '?'))
        .to_string()
}

fn strip_leading_word<'a>(phrase: &'a str, words: &[&str]) -> &'a str {
    for word in words {
        if let Some(rest) = phrase.strip_prefix(word).and_then(|r| r.strip_prefix(' ')) {
            return rest.trim();
        }
    }
    phrase
}

fn trim_separators(text: &str) -> &str {
    text.trim()
        .trim_matches(|c: char| c == ',' || c == ':' || c == '-' || c.is_whitespace())
}

fn word_starts(text: &str) -> Vec<usize> {
    let mut starts = Vec::new();
    let mut after_space = true;
    for (index, c) in text.char_indices() {
        if c.is_whitespace() {
            after_space = true;
        } else {
            if after_space {
                starts.push(index);
            }
            after_space = false;
        }
    }
    starts
}

fn cut_span(text: &str, start: usize, end: usize) -> String {
    let joined = format!("{} {}", &text[..start], &text[end..]);
    let collapsed = joined.split_whitespace().collect::<Vec<_>>().join(" ");
    trim_separators(&collapsed).to_string()
}

/// "2 hours", "an hour", "1h 30m", "half an hour".
fn parse_relative(rest: &str) -> Option<Duration> {
    let rest = rest.trim();
    let expanded = if rest == "half an hour" || rest == "half hour" {
        "30 minutes".to_string()
    } else if let Some(unit) = rest.strip_prefix("an ").or_else(|| rest.strip_prefix("a ")) {
        format!("1 {}", unit)
    } else {
        rest.to_string()
    };

    let compact = SPACED_UNIT.replace_all(&expanded, "$1$2");
    let compact = compact
        .split_whitespace()
        .map(|span| {
            span.replace("mins", "min")
                .replace("hrs", "h")
                .replace("secs", "s")
                .replace("wks", "w")
                .replace("wk", "w")
        })
        .collect::<Vec<_>>()
        .join(" ");

    let duration = humantime::parse_duration(&compact).ok()?;
    if duration.is_zero() {
        return None;
    }
    Duration::from_std(duration).ok()
}

fn parse_day_and_time(phrase: &str) -> Option<(Option<DaySpec>, Option<NaiveTime>)> {
    if let Some(time) = parse_time(phrase) {
        return Some((None, Some(time)));
    }
    if let Some(day) = parse_day(phrase) {
        return Some((Some(day), None));
    }

    for (index, _) in phrase.match_indices(' ') {
        let (left, right) = (phrase[..index].trim(), phrase[index + 1..].trim());
        if let (Some(day), Some(time)) = (parse_day(left), parse_time(right)) {
            return Some((Some(day), Some(time)));
        }
        if let (Some(time), Some(day)) = (parse_time(left), parse_day(right)) {
            return Some((Some(day), Some(time)));
        }
    }
    None
}

fn parse_time(phrase: &str) -> Option<NaiveTime> {
    match phrase.strip_prefix("at ") {
        Some(rest) => parse_clock(rest.trim(), true),
        None => parse_clock(phrase, false),
    }
}

/// A bare hour ("at 8") is only accepted after an explicit "at".
fn parse_clock(phrase: &str, explicit: bool) -> Option<NaiveTime> {
    let named = match phrase {
        "noon" | "midday" => Some(12),
        "midnight" => Some(0),
        "morning" | "in the morning" => Some(9),
        "afternoon" | "in the afternoon" => Some(15),
        "evening" | "in the evening" => Some(18),
        _ => None,
    };
    if let Some(hour) = named {
        return NaiveTime::from_hms_opt(hour, 0, 0);
    }

    let caps = CLOCK_TIME.captures(phrase)?;
    let hour: u32 = caps[1].parse().ok()?;
    let minute: u32 = match caps.get(2) {
        Some(m) => m.as_str().parse().ok()?,
        None => 0,
    };

    let hour = match caps.get(3).map(|m| m.as_str()) {
        Some(meridiem) => {
            if !(1..=12).contains(&hour) {
                return None;
            }
            let pm = meridiem.starts_with('p');
            match (hour, pm) {
                (12, false) => 0,
                (12, true) => 12,
                (h, true) => h + 12,
                (h, false) => h,
            }
        }
        None if caps.get(2).is_some() || explicit => hour,
        None => return None,
    };

    NaiveTime::from_hms_opt(hour, minute, 0)
}

fn parse_day(phrase: &str) -> Option<DaySpec> {
    match phrase {
        "today" => return Some(DaySpec::Today),
        "tonight" => return Some(DaySpec::Tonight),
        "tomorrow" | "tmrw" | "tmr" => return Some(DaySpec::Tomorrow),
        _ => {}
    }

    if let Some(rest) = phrase.strip_prefix("next ") {
        return parse_weekday(rest).map(|day| DaySpec::Weekday { day, next: true });
    }
    let bare = phrase.strip_prefix("this ").unwrap_or(phrase);
    if let Some(day) = parse_weekday(bare) {
        return Some(DaySpec::Weekday { day, next: false });
    }

    if let Some(caps) = ISO_DATE.captures(phrase) {
        return Some(DaySpec::Date {
            year: Some(caps[1].parse().ok()?),
            month: caps[2].parse().ok()?,
            day: caps[3].parse().ok()?,
        });
    }
    if let Some(caps) = SLASH_DATE.captures(phrase) {
        let year = match caps.get(3) {
            Some(y) if y.as_str().len() == 2 => Some(2000 + y.as_str().parse::<i32>().ok()?),
            Some(y) => Some(y.as_str().parse().ok()?),
            None => None,
        };
        return Some(DaySpec::Date {
            year,
            month: caps[1].parse().ok()?,
            day: caps[2].parse().ok()?,
        });
    }
    if let Some(caps) = MONTH_DAY.captures(phrase) {
        return Some(DaySpec::Date {
            year: caps.get(3).and_then(|y| y.as_str().parse().ok()),
            month: parse_month(&caps[1])?,
            day: caps[2].parse().ok()?,
        });
    }
    if let Some(caps) = DAY_MONTH.captures(phrase) {
        return Some(DaySpec::Date {
            year: caps.get(3).and_then(|y| y.as_str().parse().ok()),
            month: parse_month(&caps[2])?,
            day: caps[1].parse().ok()?,
        });
    }
    None
}

fn parse_weekday(word: &str) -> Option<Weekday> {
    match word {
        "monday" | "mon" => Some(Weekday::Mon),
        "tuesday" | "tues" | "tue" => Some(Weekday::Tue),
        "wednesday" | "wed" => Some(Weekday::Wed),
        "thursday" | "thurs" | "thu" => Some(Weekday::Thu),
        "friday" | "fri" => Some(Weekday::Fri),
        "saturday" | "sat" => Some(Weekday::Sat),
        "sunday" | "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

fn parse_month(word: &str) -> Option<u32> {
    let month = match word {
        "january" | "jan" => 1,
        "february" | "feb" => 2,
        "march" | "mar" => 3,
        "april" | "apr" => 4,
        "may" => 5,
        "june" | "jun" => 6,
        "july" | "jul" => 7,
        "august" | "aug" => 8,
        "september" | "sept" | "sep" => 9,
        "october" | "oct" => 10,
        "november" | "nov" => 11,
        "december" | "dec" => 12,
        _ => return None,
    };
    Some(month)
}

fn parse_unit(word: &str) -> Option<FrequencyUnit> {
    match word.trim_end_matches('s') {
        "day" => Some(FrequencyUnit::Days),
        "week" => Some(FrequencyUnit::Weeks),
        "month" => Some(FrequencyUnit::Months),
        _ => None,
    }
}

fn resolve(
    day: Option<DaySpec>,
    time: Option<NaiveTime>,
    local_now: DateTime<Tz>,
    tz: Tz,
) -> Option<DateTime<Utc>> {
    let today = local_now.date_naive();
    let now = local_now.with_timezone(&Utc);
    let default_time = NaiveTime::from_hms_opt(DEFAULT_HOUR, 0, 0)?;

    let Some(day) = day else {
        // A bare time is the next occurrence of that time.
        let time = time?;
        let today_at = localize(today.and_time(time), tz)?;
        if today_at > now {
            return Some(today_at);
        }
        return localize(today.succ_opt()?.and_time(time), tz);
    };

    match day {
        DaySpec::Today => localize(today.and_time(time.unwrap_or(default_time)), tz),
        DaySpec::Tonight => {
            let tonight = NaiveTime::from_hms_opt(TONIGHT_HOUR, 0, 0)?;
            localize(today.and_time(time.unwrap_or(tonight)), tz)
        }
        DaySpec::Tomorrow => localize(today.succ_opt()?.and_time(time.unwrap_or(default_time)), tz),
        DaySpec::Weekday { day, next } => {
            let time = time.unwrap_or(default_time);
            let ahead = (day.num_days_from_monday() + 7 - today.weekday().num_days_from_monday()) % 7;
            let ahead = match ahead {
                0 if next => 7,
                0 => {
                    let today_at = localize(today.and_time(time), tz)?;
                    if today_at > now {
                        return Some(today_at);
                    }
                    7
                }
                n => n,
            };
            localize((today + Duration::days(ahead as i64)).and_time(time), tz)
        }
        DaySpec::Date { year: Some(year), month, day } => {
            localize(NaiveDate::from_ymd_opt(year, month, day)?.and_time(time.unwrap_or(default_time)), tz)
        }
        DaySpec::Date { year: None, month, day } => {
            let time = time.unwrap_or(default_time);
            let this_year = NaiveDate::from_ymd_opt(today.year(), month, day)
                .and_then(|date| localize(date.and_time(time), tz));
            match this_year {
                Some(candidate) if candidate > now => Some(candidate),
                _ => localize(NaiveDate::from_ymd_opt(today.year() + 1, month, day)?.and_time(time), tz),
            }
        }
    }
}

/// Local wall-clock time to an instant. Times skipped by a DST jump move
/// forward an hour; repeated times take the earlier instant.
fn localize(naive: NaiveDateTime, tz: Tz) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(naive + Duration::hours(1))).earliest())
        .map(|dt| dt.with_timezone(&Utc))
}
