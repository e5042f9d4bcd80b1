use serde::{Deserialize, Serialize};

/// An administrative blocker (vacation, lunch break, training). Always
/// active: a blocker occupies its interval until it is deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Blocker {
    pub id: String,
    pub title: String,
    pub start_time: i64,
    pub end_time: i64,
    pub blocker_group_id: Option<String>,
    pub created_at: i64,
}
