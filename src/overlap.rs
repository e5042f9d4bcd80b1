//! Interval overlap primitive and the conflict resolver built on it.
//!
//! Everything on the calendar is a half-open interval `[start, end)` in
//! epoch milliseconds. Adjacent intervals do not overlap; that policy is
//! what makes back-to-back slots legal. The resolver answers "is this
//! interval free?" in two access patterns: per-candidate SQL queries, or a
//! pre-loaded in-memory checker for series expansion where one candidate at
//! a time would cost two queries each.

use rusqlite::Connection;

use crate::db::repository;
use crate::db::DatabaseError;
use crate::models::Commitment;

/// Half-open interval intersection: true iff `[a_start, a_end)` and
/// `[b_start, b_end)` share at least one millisecond. Pure; callers are
/// responsible for `start < end` operands.
pub fn overlaps(a_start: i64, a_end: i64, b_start: i64, b_end: i64) -> bool {
    a_start < b_end && a_end > b_start
}

// ─── Single-query mode ────────────────────────────────────────────────────────

/// True if `[start, end)` overlaps any active appointment or any blocker.
/// `exclude_id` lets a reschedule ignore the appointment being moved.
pub fn has_conflicts(
    conn: &Connection,
    start: i64,
    end: i64,
    exclude_id: Option<&str>,
) -> Result<bool, DatabaseError> {
    if !repository::find_overlapping_active(conn, start, end, exclude_id)?.is_empty() {
        return Ok(true);
    }
    Ok(!repository::find_overlapping_blockers(conn, start, end)?.is_empty())
}

/// Every commitment in conflict with `[start, end)`, appointments first,
/// each group ordered by start. For diagnostics and admin display.
pub fn find_conflicts(
    conn: &Connection,
    start: i64,
    end: i64,
    exclude_id: Option<&str>,
) -> Result<Vec<Commitment>, DatabaseError> {
    let mut hits: Vec<Commitment> = repository::find_overlapping_active(conn, start, end, exclude_id)?
        .into_iter()
        .map(Commitment::Appointment)
        .collect();
    hits.extend(
        repository::find_overlapping_blockers(conn, start, end)?
            .into_iter()
            .map(Commitment::Blocker),
    );
    Ok(hits)
}

// ─── Batch mode ───────────────────────────────────────────────────────────────

/// Conflict checker over a pre-loaded outer range.
///
/// Two storage queries at construction, then every candidate slot is tested
/// in memory. Candidates outside the loaded range are not meaningful.
pub struct BatchConflictChecker {
    occupied: Vec<(i64, i64)>,
}

impl BatchConflictChecker {
    /// Load every commitment overlapping `[range_start, range_end)`.
    pub fn load(
        conn: &Connection,
        range_start: i64,
        range_end: i64,
    ) -> Result<Self, DatabaseError> {
        let mut commitments: Vec<Commitment> =
            repository::find_overlapping_active(conn, range_start, range_end, None)?
                .into_iter()
                .map(Commitment::Appointment)
                .collect();
        commitments.extend(
            repository::find_overlapping_blockers(conn, range_start, range_end)?
                .into_iter()
                .map(Commitment::Blocker),
        );
        Ok(Self::from_commitments(&commitments))
    }

    /// Build from already-loaded commitments; inert ones are dropped here.
    pub fn from_commitments(commitments: &[Commitment]) -> Self {
        let occupied = commitments
            .iter()
            .filter(|c| c.occupies_calendar())
            .map(|c| (c.start_time(), c.end_time()))
            .collect();
        Self { occupied }
    }

    pub fn is_free(&self, start: i64, end: i64) -> bool {
        !self.conflicts(start, end)
    }

    pub fn conflicts(&self, start: i64, end: i64) -> bool {
        self.occupied
            .iter()
            .any(|&(s, e)| overlaps(start, end, s, e))
    }

    /// Record an interval accepted after the load, so later candidates in
    /// the same batch are checked against it too.
    pub fn occupy(&mut self, start: i64, end: i64) {
        self.occupied.push((start, end));
    }

    /// Number of occupied intervals loaded.
    pub fn occupied_count(&self) -> usize {
        self.occupied.len()
    }
}
