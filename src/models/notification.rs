use serde::{Deserialize, Serialize};

use super::enums::NotificationStatus;

/// A queued outbound message. The engine only enqueues; an external
/// dispatcher delivers and flips the status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub status: NotificationStatus,
    pub attempts: i64,
    pub created_at: i64,
    pub sent_at: Option<i64>,
}
