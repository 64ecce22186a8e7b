pub mod calendar;
pub mod commands;
pub mod config;
pub mod pinned;
pub mod platform;
pub mod reminders;
pub mod render;
pub mod services;
pub mod store;
pub mod timeparse;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

/// Custom data passed to all commands
pub struct Data {
    pub config: config::Config,
    pub store: store::Store,
    pub platform: Arc<dyn platform::ChatPlatform>,
}

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
