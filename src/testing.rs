//! Fakes and fixtures shared by the unit tests.

use crate::config::Config;
use crate::platform::{ChatPlatform, OutgoingMessage, PlatformError, PlatformResult};
use crate::store::Store;
use crate::Data;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    Post {
        channel_id: u64,
        message_id: u64,
        message: OutgoingMessage,
    },
    Update {
        channel_id: u64,
        message_id: u64,
        message: OutgoingMessage,
    },
    Delete {
        channel_id: u64,
        message_id: u64,
    },
    Pin {
        channel_id: u64,
        message_id: u64,
    },
}

type PostHook = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct Inner {
    calls: Vec<Recorded>,
    next_id: u64,
    missing: HashSet<u64>,
    fail_posts: bool,
    fail_updates: bool,
    before_post: Option<PostHook>,
}

/// A [`ChatPlatform`] that records every call instead of talking to Discord.
#[derive(Default)]
pub struct RecordingPlatform {
    inner: Mutex<Inner>,
}

impl RecordingPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Recorded> {
        self.inner.lock().unwrap().calls.clone()
    }

    /// `(channel_id, message)` for every post, in order.
    pub fn posts(&self) -> Vec<(u64, OutgoingMessage)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Recorded::Post {
                    channel_id,
                    message,
                    ..
                } => Some((channel_id, message)),
                _ => None,
            })
            .collect()
    }

    /// `(channel_id, message_id, message)` for every edit, in order.
    pub fn updates(&self) -> Vec<(u64, u64, OutgoingMessage)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Recorded::Update {
                    channel_id,
                    message_id,
                    message,
                } => Some((channel_id, message_id, message)),
                _ => None,
            })
            .collect()
    }

    /// Makes later calls on `message_id` fail as if the message had been deleted.
    pub fn forget_message(&self, message_id: u64) {
        self.inner.lock().unwrap().missing.insert(message_id);
    }

    pub fn fail_posts(&self, fail: bool) {
        self.inner.lock().unwrap().fail_posts = fail;
    }

    /// Runs `hook` once, inside the next `post_message` call.
    pub fn before_next_post(&self, hook: impl FnOnce() + Send + 'static) {
        self.inner.lock().unwrap().before_post = Some(Box::new(hook));
    }

    pub fn fail_updates(&self, fail: bool) {
        self.inner.lock().unwrap().fail_updates = fail;
    }

    fn check_exists(inner: &Inner, channel_id: u64, message_id: u64) -> PlatformResult<()> {
        if inner.missing.contains(&message_id) {
            return Err(PlatformError::NotFound {
                channel_id,
                message_id,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ChatPlatform for RecordingPlatform {
    async fn post_message(&self, channel_id: u64, message: &OutgoingMessage) -> PlatformResult<u64> {
        let hook = self.inner.lock().unwrap().before_post.take();
        if let Some(hook) = hook {
            hook();
        }

        let mut inner = self.inner.lock().unwrap();
        if inner.fail_posts {
            return Err(PlatformError::Transport("post refused".to_string()));
        }
        inner.next_id += 1;
        let message_id = 1000 + inner.next_id;
        inner.calls.push(Recorded::Post {
            channel_id,
            message_id,
            message: message.clone(),
        });
        Ok(message_id)
    }

    async fn update_message(
        &self,
        channel_id: u64,
        message_id: u64,
        message: &OutgoingMessage,
    ) -> PlatformResult<()> {
        let mut inner = self.inner.lock().unwrap();
        Self::check_exists(&inner, channel_id, message_id)?;
        if inner.fail_updates {
            return Err(PlatformError::Transport("edit refused".to_string()));
        }
        inner.calls.push(Recorded::Update {
            channel_id,
            message_id,
            message: message.clone(),
        });
        Ok(())
    }

    async fn delete_message(&self, channel_id: u64, message_id: u64) -> PlatformResult<()> {
        let mut inner = self.inner.lock().unwrap();
        Self::check_exists(&inner, channel_id, message_id)?;
        inner.calls.push(Recorded::Delete {
            channel_id,
            message_id,
        });
        Ok(())
    }

    async fn pin_message(&self, channel_id: u64, message_id: u64) -> PlatformResult<()> {
        let mut inner = self.inner.lock().unwrap();
        Self::check_exists(&inner, channel_id, message_id)?;
        inner.calls.push(Recorded::Pin {
            channel_id,
            message_id,
        });
        Ok(())
    }

    async fn channel_name(&self, channel_id: u64) -> PlatformResult<String> {
        Ok(format!("channel-{}", channel_id))
    }

    async fn user_display_name(&self, user_id: u64) -> PlatformResult<String> {
        Ok(format!("user-{}", user_id))
    }
}

pub fn test_config() -> Config {
    Config {
        discord_token: "test_token".to_string(),
        dev_guild_id: None,
        status_message: "testing".to_string(),
        timezone: chrono_tz::America::New_York,
        listen_channels: Vec::new(),
        reminder_poll_interval_secs: 60,
        recurring_poll_interval_secs: 3600,
        list_refresh_interval_secs: 300,
        snooze_minutes: 60,
        confirm_timeout_secs: 300,
    }
}

pub fn test_data() -> (Data, Arc<RecordingPlatform>) {
    let platform = Arc::new(RecordingPlatform::new());
    let data = Data {
        config: test_config(),
        store: Store::new(),
        platform: platform.clone(),
    };
    (data, platform)
}
