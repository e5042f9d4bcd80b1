use serde::{Deserialize, Serialize};

/// A bookable half-open interval `[start_time, end_time)` in epoch
/// milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub start_time: i64,
    pub end_time: i64,
}

impl Slot {
    pub fn new(start_time: i64, end_time: i64) -> Self {
        Self { start_time, end_time }
    }

    pub fn duration_ms(&self) -> i64 {
        self.end_time - self.start_time
    }
}
