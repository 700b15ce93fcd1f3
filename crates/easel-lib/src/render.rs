//! Display helpers shared by front ends: icons, badge text and relative
//! timestamps for the notification dropdown.

use crate::models::{Notification, NotificationId, NotificationKind};
use chrono::{DateTime, Utc};
use serde::Serialize;

const BADGE_MAX: u64 = 99;

pub fn icon_for(kind: &NotificationKind) -> &'static str {
    match kind {
        NotificationKind::Follow => "👤",
        NotificationKind::Reaction => "❤️",
        NotificationKind::Comment => "💬",
        NotificationKind::Other(_) => "🔔",
    }
}

/// Text for the bell badge, or `None` when there is nothing unread.
pub fn badge_text(count: u64) -> Option<String> {
    match count {
        0 => None,
        n if n > BADGE_MAX => Some(format!("{}+", BADGE_MAX)),
        n => Some(n.to_string()),
    }
}

pub fn bell_label(count: u64) -> String {
    if count > 0 {
        format!("Notifications ({} unread)", count)
    } else {
        "Notifications".to_string()
    }
}

/// Short relative age of `ts` as seen at `now`. Anything a week or older is
/// shown as a plain date.
pub fn format_relative(ts: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let age = now.signed_duration_since(ts);

    if age.num_minutes() < 1 {
        "Just now".to_string()
    } else if age.num_hours() < 1 {
        format!("{}m ago", age.num_minutes())
    } else if age.num_days() < 1 {
        format!("{}h ago", age.num_hours())
    } else if age.num_weeks() < 1 {
        format!("{}d ago", age.num_days())
    } else {
        ts.format("%-m/%-d/%Y").to_string()
    }
}

/// One row of the dropdown list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationRow {
    pub id: NotificationId,
    pub icon: &'static str,
    pub message: String,
    pub relative_time: String,
    pub unread: bool,
    pub kind_class: String,
}

impl NotificationRow {
    pub fn from_notification(notification: &Notification, now: DateTime<Utc>) -> Self {
        Self {
            id: notification.id.clone(),
            icon: icon_for(&notification.kind),
            message: notification.message.clone(),
            relative_time: format_relative(notification.timestamp, now),
            unread: !notification.is_read,
            kind_class: format!("notification-{}", notification.kind),
        }
    }
}
