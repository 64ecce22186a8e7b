use chrono_tz::Tz;
use dotenvy::dotenv;
use std::env;

#[derive(Clone)]
pub struct Config {
    pub discord_token: String,
    pub dev_guild_id: Option<u64>,
    pub status_message: String,
    /// Timezone every date phrase and calendar day is interpreted in
    pub timezone: Tz,
    /// Channel names the bot listens in; empty means every channel it can see
    pub listen_channels: Vec<String>,

    // Scheduler cadences
    pub reminder_poll_interval_secs: u64,
    pub recurring_poll_interval_secs: u64,
    pub list_refresh_interval_secs: u64,

    pub snooze_minutes: i64,
    pub confirm_timeout_secs: u64,
}

const DEFAULT_TIMEZONE: &str = "America/New_York";

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok();
        Self::build()
    }

    fn build() -> anyhow::Result<Self> {
        let timezone_name =
            env::var("BOT_TIMEZONE").unwrap_or_else(|_| DEFAULT_TIMEZONE.to_string());
        let timezone: Tz = timezone_name
            .parse()
            .map_err(|_| anyhow::anyhow!("BOT_TIMEZONE '{}' is not a valid IANA timezone", timezone_name))?;

        Ok(Config {
            discord_token: env::var("DISCORD_TOKEN")
                .map_err(|_| anyhow::anyhow!("DISCORD_TOKEN must be set"))?,
            dev_guild_id: env::var("DEV_GUILD_ID").ok().and_then(|id| id.parse().ok()),
            status_message: env::var("STATUS_MESSAGE")
                .unwrap_or_else(|_| "Keeping the lists tidy".to_string()),
            timezone,
            listen_channels: env::var("LISTEN_CHANNELS")
                .map(|raw| parse_channel_list(&raw))
                .unwrap_or_default(),
            reminder_poll_interval_secs: env::var("REMINDER_POLL_INTERVAL_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .unwrap_or(60),
            recurring_poll_interval_secs: env::var("RECURRING_POLL_INTERVAL_SECS")
                .unwrap_or_else(|_| "3600".to_string())
                .parse()
                .unwrap_or(3600),
            list_refresh_interval_secs: env::var("LIST_REFRESH_INTERVAL_SECS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .unwrap_or(300),
            snooze_minutes: env::var("SNOOZE_MINUTES")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .unwrap_or(60),
            confirm_timeout_secs: env::var("CONFIRM_TIMEOUT_SECS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .unwrap_or(300),
        })
    }

    /// Whether messages from `channel_name` should be routed at all.
    pub fn listens_to(&self, channel_name: &str) -> bool {
        self.listen_channels.is_empty()
            || self
                .listen_channels
                .iter()
                .any(|name| name.eq_ignore_ascii_case(channel_name.trim_start_matches('#')))
    }
}

fn parse_channel_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|name| name.trim().trim_start_matches('#').to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("discord_token", &"[REDACTED]")
            .field("dev_guild_id", &self.dev_guild_id)
            .field("status_message", &self.status_message)
            .field("timezone", &self.timezone.name())
            .field("listen_channels", &self.listen_channels)
            .field(
                "reminder_poll_interval_secs",
                &self.reminder_poll_interval_secs,
            )
            .field(
                "recurring_poll_interval_secs",
                &self.recurring_poll_interval_secs,
            )
            .field(
                "list_refresh_interval_secs",
                &self.list_refresh_interval_secs,
            )
            .field("snooze_minutes", &self.snooze_minutes)
            .field("confirm_timeout_secs", &self.confirm_timeout_secs)
            .finish()
    }
}

/// Discord message limit is 2000 characters
pub const DISCORD_MESSAGE_LIMIT: usize = 2000;
/// Embed description limit is 4096 characters
pub const DISCORD_EMBED_LIMIT: usize = 4096;
