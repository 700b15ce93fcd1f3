pub mod notification;

pub use notification::{
    MarkReadAck, Notification, NotificationId, NotificationKind, NotificationListResponse,
    UnreadCountResponse,
};
