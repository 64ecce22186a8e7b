//! The slice of the chat platform the bot depends on.
//!
//! Handlers and the scheduler only talk to [`ChatPlatform`], so they run
//! against a recording fake in tests and against Discord in production.

use crate::render::ListCard;
use async_trait::async_trait;
use serenity::all::{
    ButtonStyle, ChannelId, CreateActionRow, CreateButton, CreateEmbed, CreateEmbedFooter,
    CreateMessage, EditMessage, MessageId, UserId,
};
use serenity::http::{Http, HttpError};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("message {message_id} not found in channel {channel_id}")]
    NotFound { channel_id: u64, message_id: u64 },
    #[error("chat platform request failed: {0}")]
    Transport(String),
}

pub type PlatformResult<T> = Result<T, PlatformError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonTone {
    Primary,
    Success,
    Secondary,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionButton {
    pub custom_id: String,
    pub label: String,
    pub tone: ButtonTone,
}

impl ActionButton {
    pub fn new(custom_id: impl Into<String>, label: impl Into<String>, tone: ButtonTone) -> Self {
        Self {
            custom_id: custom_id.into(),
            label: label.into(),
            tone,
        }
    }
}

/// Content of a message the bot posts or edits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub text: String,
    pub card: Option<ListCard>,
    pub buttons: Vec<ActionButton>,
}

impl OutgoingMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn card(card: ListCard) -> Self {
        Self {
            card: Some(card),
            ..Default::default()
        }
    }

    pub fn with_buttons(mut self, buttons: Vec<ActionButton>) -> Self {
        self.buttons = buttons;
        self
    }
}

/// A chat message as the router sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub channel_id: u64,
    pub channel_name: String,
    pub user_id: u64,
    pub user_display_name: String,
    pub text: String,
    pub is_bot: bool,
}

/// A button press on one of the bot's messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionEvent {
    pub action_id: String,
    pub value: String,
    pub invoking_user_id: u64,
    pub source_channel_id: u64,
    pub source_message_id: u64,
}

impl ActionEvent {
    /// Button custom ids are `<action>:<value>`.
    pub fn custom_id(action_id: &str, value: &str) -> String {
        format!("{}:{}", action_id, value)
    }

    pub fn from_custom_id(
        custom_id: &str,
        invoking_user_id: u64,
        source_channel_id: u64,
        source_message_id: u64,
    ) -> Self {
        let (action_id, value) = custom_id.split_once(':').unwrap_or((custom_id, ""));
        Self {
            action_id: action_id.to_string(),
            value: value.to_string(),
            invoking_user_id,
            source_channel_id,
            source_message_id,
        }
    }
}

#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Posts a message and returns its id.
    async fn post_message(&self, channel_id: u64, message: &OutgoingMessage) -> PlatformResult<u64>;
    async fn update_message(
        &self,
        channel_id: u64,
        message_id: u64,
        message: &OutgoingMessage,
    ) -> PlatformResult<()>;
    async fn delete_message(&self, channel_id: u64, message_id: u64) -> PlatformResult<()>;
    async fn pin_message(&self, channel_id: u64, message_id: u64) -> PlatformResult<()>;
    async fn channel_name(&self, channel_id: u64) -> PlatformResult<String>;
    async fn user_display_name(&self, user_id: u64) -> PlatformResult<String>;
}

pub struct DiscordPlatform {
    http: Arc<Http>,
}

impl DiscordPlatform {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

fn classify(err: serenity::Error, channel_id: u64, message_id: Option<u64>) -> PlatformError {
    if let (serenity::Error::Http(HttpError::UnsuccessfulRequest(response)), Some(message_id)) =
        (&err, message_id)
    {
        if response.status_code.as_u16() == 404 {
            return PlatformError::NotFound {
                channel_id,
                message_id,
            };
        }
    }
    PlatformError::Transport(err.to_string())
}

pub fn card_embed(card: &ListCard) -> CreateEmbed {
    CreateEmbed::new()
        .title(&card.title)
        .description(&card.body)
        .footer(CreateEmbedFooter::new(&card.footer))
        .color(0x5865F2)
}

fn action_rows(buttons: &[ActionButton]) -> Vec<CreateActionRow> {
    if buttons.is_empty() {
        return Vec::new();
    }
    let buttons = buttons
        .iter()
        .map(|button| {
            let style = match button.tone {
                ButtonTone::Primary => ButtonStyle::Primary,
                ButtonTone::Success => ButtonStyle::Success,
                ButtonTone::Secondary => ButtonStyle::Secondary,
                ButtonTone::Danger => ButtonStyle::Danger,
            };
            CreateButton::new(button.custom_id.clone())
                .label(button.label.clone())
                .style(style)
        })
        .collect();
    vec![CreateActionRow::Buttons(buttons)]
}

#[async_trait]
impl ChatPlatform for DiscordPlatform {
    async fn post_message(&self, channel_id: u64, message: &OutgoingMessage) -> PlatformResult<u64> {
        let mut builder = CreateMessage::new();
        if !message.text.is_empty() {
            builder = builder.content(message.text.clone());
        }
        if let Some(card) = &message.card {
            builder = builder.embed(card_embed(card));
        }
        if !message.buttons.is_empty() {
            builder = builder.components(action_rows(&message.buttons));
        }

        let sent = ChannelId::new(channel_id)
            .send_message(&self.http, builder)
            .await
            .map_err(|e| classify(e, channel_id, None))?;
        debug!("Posted message {} in channel {}", sent.id, channel_id);
        Ok(sent.id.get())
    }

    async fn update_message(
        &self,
        channel_id: u64,
        message_id: u64,
        message: &OutgoingMessage,
    ) -> PlatformResult<()> {
        let builder = EditMessage::new()
            .content(message.text.clone())
            .embeds(message.card.iter().map(card_embed).collect())
            .components(action_rows(&message.buttons));

        ChannelId::new(channel_id)
            .edit_message(&self.http, MessageId::new(message_id), builder)
            .await
            .map_err(|e| classify(e, channel_id, Some(message_id)))?;
        Ok(())
    }

    async fn delete_message(&self, channel_id: u64, message_id: u64) -> PlatformResult<()> {
        ChannelId::new(channel_id)
            .delete_message(&self.http, MessageId::new(message_id))
            .await
            .map_err(|e| classify(e, channel_id, Some(message_id)))
    }

    async fn pin_message(&self, channel_id: u64, message_id: u64) -> PlatformResult<()> {
        ChannelId::new(channel_id)
            .pin(&self.http, MessageId::new(message_id))
            .await
            .map_err(|e| classify(e, channel_id, Some(message_id)))
    }

    async fn channel_name(&self, channel_id: u64) -> PlatformResult<String> {
        let channel = ChannelId::new(channel_id)
            .to_channel(&self.http)
            .await
            .map_err(|e| classify(e, channel_id, None))?;
        Ok(channel
            .guild()
            .map(|guild_channel| guild_channel.name)
            .unwrap_or_else(|| "direct-message".to_string()))
    }

    async fn user_display_name(&self, user_id: u64) -> PlatformResult<String> {
        let user = UserId::new(user_id)
            .to_user(&self.http)
            .await
            .map_err(|e| PlatformError::Transport(e.to_string()))?;
        Ok(user.global_name.clone().unwrap_or_else(|| user.name.clone()))
    }
}
