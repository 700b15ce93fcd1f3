//! Terminal rendering of the bell badge and the dropdown panel.

use chrono::{DateTime, Utc};
use easel_lib::api::SessionState;
use easel_lib::render::{badge_text, bell_label, NotificationRow};
use easel_lib::sync::{CounterSnapshot, ListSnapshot};
use tokio::sync::watch;

pub fn badge_line(snapshot: &CounterSnapshot) -> String {
    let bell = if snapshot.is_signaling { "🔔 *ding*" } else { "🔔" };
    match badge_text(snapshot.count) {
        Some(badge) => format!("{} [{}]  {}", bell, badge, bell_label(snapshot.count)),
        None => format!("{}  {}", bell, bell_label(snapshot.count)),
    }
}

pub fn panel_lines(snapshot: &ListSnapshot, now: DateTime<Utc>) -> Vec<String> {
    if snapshot.is_loading && snapshot.items.is_empty() {
        return vec!["  Loading notifications...".to_string()];
    }
    if snapshot.items.is_empty() {
        return vec!["  🔔 No notifications yet".to_string()];
    }

    snapshot
        .items
        .iter()
        .map(|n| {
            let row = NotificationRow::from_notification(n, now);
            let marker = if row.unread { "•" } else { " " };
            format!(
                "{} {} {}  ({}, id {})",
                marker, row.icon, row.message, row.relative_time, row.id
            )
        })
        .collect()
}

/// Print the badge whenever it visibly changes and announce session expiry.
pub async fn run(
    mut counter: watch::Receiver<CounterSnapshot>,
    mut session: watch::Receiver<SessionState>,
) {
    let initial = *counter.borrow();
    let mut shown = (initial.count, initial.is_signaling);

    loop {
        tokio::select! {
            changed = counter.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = *counter.borrow_and_update();
                let visible = (snapshot.count, snapshot.is_signaling);
                if visible != shown {
                    shown = visible;
                    println!("{}", badge_line(&snapshot));
                }
            }
            changed = session.changed() => {
                if changed.is_err() {
                    break;
                }
                if *session.borrow_and_update() == SessionState::Expired {
                    println!("Your session has expired. Use `login <token>` to sign in again.");
                }
            }
        }
    }
}
