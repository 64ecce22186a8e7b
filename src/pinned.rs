use crate::platform::{ChatPlatform, OutgoingMessage, PlatformError};
use crate::render::{render_list, ListCard};
use crate::store::{ListKind, Store};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::{debug, info, warn};

/// Shows `card` in the channel's pinned message for `kind`, creating and
/// pinning that message the first time. Failures are logged, never returned.
pub async fn upsert_anchor(
    store: &Store,
    platform: &dyn ChatPlatform,
    kind: ListKind,
    channel_id: u64,
    card: ListCard,
) {
    let message = OutgoingMessage::card(card);

    if let Some(message_id) = store.anchor(kind, channel_id) {
        match platform.update_message(channel_id, message_id, &message).await {
            Ok(()) => {
                debug!("Updated {} anchor {} in channel {}", kind.label(), message_id, channel_id);
                return;
            }
            Err(PlatformError::NotFound { .. }) => {
                info!(
                    "Anchor {} for {} in channel {} is gone; posting a new one",
                    message_id,
                    kind.label(),
                    channel_id
                );
                store.clear_anchor(kind, channel_id);
            }
            Err(e) => {
                warn!("Failed to update {} anchor in channel {}: {}", kind.label(), channel_id, e);
                return;
            }
        }
    }

    let message_id = match platform.post_message(channel_id, &message).await {
        Ok(id) => id,
        Err(e) => {
            warn!("Failed to post {} in channel {}: {}", kind.label(), channel_id, e);
            return;
        }
    };

    // Another task may have anchored this list while we were posting.
    if let Some(existing) = store.set_anchor_if_absent(kind, channel_id, message_id) {
        debug!(
            "{} already anchored at {} in channel {}; dropping duplicate {}",
            kind.label(),
            existing,
            channel_id,
            message_id
        );
        if let Err(e) = platform.delete_message(channel_id, message_id).await {
            warn!("Failed to delete duplicate message {}: {}", message_id, e);
        }
        if let Err(e) = platform.update_message(channel_id, existing, &message).await {
            warn!("Failed to update {} anchor in channel {}: {}", kind.label(), channel_id, e);
        }
        return;
    }

    if let Err(e) = platform.pin_message(channel_id, message_id).await {
        warn!("Failed to pin {} message {}: {}", kind.label(), message_id, e);
    }
    info!("Anchored {} at message {} in channel {}", kind.label(), message_id, channel_id);
}

/// Re-renders `kind` from the current state and upserts it.
pub async fn refresh_anchor(
    store: &Store,
    platform: &dyn ChatPlatform,
    kind: ListKind,
    channel_id: u64,
    now: DateTime<Utc>,
    tz: Tz,
) {
    let card = store.read(|state| render_list(kind, state, now, tz));
    upsert_anchor(store, platform, kind, channel_id, card).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingPlatform, Recorded};
    use chrono::TimeZone;

    fn card(body: &str) -> ListCard {
        ListCard {
            title: "🛒 Grocery List".to_string(),
            body: body.to_string(),
            footer: String::new(),
        }
    }

    #[tokio::test]
    async fn test_first_upsert_posts_and_pins() {
        let store = Store::new();
        let platform = RecordingPlatform::new();

        upsert_anchor(&store, &platform, ListKind::Groceries, 5, card("1. milk")).await;

        let message_id = store.anchor(ListKind::Groceries, 5).unwrap();
        assert_eq!(
            platform.calls(),
            vec![
                Recorded::Post {
                    channel_id: 5,
                    message_id,
                    message: OutgoingMessage::card(card("1. milk")),
                },
                Recorded::Pin {
                    channel_id: 5,
                    message_id,
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_second_upsert_edits_in_place() {
        let store = Store::new();
        let platform = RecordingPlatform::new();

        upsert_anchor(&store, &platform, ListKind::Groceries, 5, card("1. milk")).await;
        let message_id = store.anchor(ListKind::Groceries, 5).unwrap();
        upsert_anchor(&store, &platform, ListKind::Groceries, 5, card("1. milk\n2. eggs")).await;

        assert_eq!(platform.posts().len(), 1);
        assert_eq!(
            platform.calls().last(),
            Some(&Recorded::Update {
                channel_id: 5,
                message_id,
                message: OutgoingMessage::card(card("1. milk\n2. eggs")),
            })
        );
        assert_eq!(store.anchor(ListKind::Groceries, 5), Some(message_id));
    }

    #[tokio::test]
    async fn test_deleted_anchor_is_reposted() {
        let store = Store::new();
        let platform = RecordingPlatform::new();
        store.set_anchor_if_absent(ListKind::Groceries, 5, 999);
        platform.forget_message(999);

        upsert_anchor(&store, &platform, ListKind::Groceries, 5, card("1. milk")).await;

        let anchor = store.anchor(ListKind::Groceries, 5).unwrap();
        assert_ne!(anchor, 999);
        assert_eq!(platform.posts().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_anchor_wins_and_duplicate_is_deleted() {
        let store = Store::new();
        let platform = RecordingPlatform::new();
        let racing = store.clone();
        platform.before_next_post(move || {
            racing.set_anchor_if_absent(ListKind::Groceries, 5, 777);
        });

        upsert_anchor(&store, &platform, ListKind::Groceries, 5, card("1. milk")).await;

        assert_eq!(store.anchor(ListKind::Groceries, 5), Some(777));
        let posted = platform.posts();
        assert_eq!(posted.len(), 1);
        let calls = platform.calls();
        let duplicate = match &calls[0] {
            Recorded::Post { message_id, .. } => *message_id,
            other => panic!("expected a post first, got {:?}", other),
        };
        assert_ne!(duplicate, 777);
        assert_eq!(
            calls[1..].to_vec(),
            vec![
                Recorded::Delete {
                    channel_id: 5,
                    message_id: duplicate,
                },
                Recorded::Update {
                    channel_id: 5,
                    message_id: 777,
                    message: OutgoingMessage::card(card("1. milk")),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_post_leaves_no_anchor() {
        let store = Store::new();
        let platform = RecordingPlatform::new();
        platform.fail_posts(true);

        upsert_anchor(&store, &platform, ListKind::Events, 5, card("x")).await;

        assert_eq!(store.anchor(ListKind::Events, 5), None);
    }

    #[tokio::test]
    async fn test_refresh_renders_current_state() {
        let store = Store::new();
        let platform = RecordingPlatform::new();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        store.add_groceries(&["milk".to_string()], &crate::store::UserRef::new(1, "Sam"), now);

        refresh_anchor(&store, &platform, ListKind::Groceries, 5, now, chrono_tz::UTC).await;

        let posts = platform.posts();
        assert_eq!(posts.len(), 1);
        let body = &posts[0].1.card.as_ref().unwrap().body;
        assert_eq!(body, "1. milk _(added by Sam)_");
    }
}
