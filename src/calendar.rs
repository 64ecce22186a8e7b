//! "Add to calendar" deep links for events. Every event is assumed to last one hour.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use reqwest::Url;

const GOOGLE_BASE: &str = "https://calendar.google.com/calendar/render";
const OUTLOOK_BASE: &str = "https://outlook.live.com/calendar/0/deeplink/compose";
const YAHOO_BASE: &str = "https://calendar.yahoo.com/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarLinks {
    pub google: String,
    pub outlook: String,
    pub yahoo: String,
}

/// `20240105T190000Z`
fn compact_utc(at: DateTime<Utc>) -> String {
    at.format("%Y%m%dT%H%M%SZ").to_string()
}

pub fn calendar_links(name: &str, start: DateTime<Utc>) -> anyhow::Result<CalendarLinks> {
    let end = start + Duration::hours(1);

    let google = Url::parse_with_params(
        GOOGLE_BASE,
        &[
            ("action", "TEMPLATE".to_string()),
            ("text", name.to_string()),
            (
                "dates",
                format!("{}/{}", compact_utc(start), compact_utc(end)),
            ),
        ],
    )?;

    let outlook = Url::parse_with_params(
        OUTLOOK_BASE,
        &[
            ("subject", name.to_string()),
            ("startdt", start.to_rfc3339_opts(SecondsFormat::Secs, true)),
            ("enddt", end.to_rfc3339_opts(SecondsFormat::Secs, true)),
            ("path", "/calendar/action/compose".to_string()),
            ("rru", "addevent".to_string()),
        ],
    )?;

    let yahoo = Url::parse_with_params(
        YAHOO_BASE,
        &[
            ("v", "60".to_string()),
            ("title", name.to_string()),
            ("st", compact_utc(start)),
            ("et", compact_utc(end)),
        ],
    )?;

    Ok(CalendarLinks {
        google: google.into(),
        outlook: outlook.into(),
        yahoo: yahoo.into(),
    })
}
