//! Moderation filter for the free-text booking note.
//!
//! The note travels with the appointment row and later appears in plain-text
//! notifications, so clinical content does not belong in it. A hard
//! blocklist rejects German clinical vocabulary (diagnoses, findings,
//! imaging, medication); a softer list only flags the note for admin
//! review. Patients are expected to use treatment shorthand (KG, MT,
//! Lymph) instead.

use std::sync::LazyLock;

use regex::Regex;

/// Longest accepted note, in characters.
pub const MAX_NOTE_LENGTH: usize = 200;

/// Clinical vocabulary that rejects the note outright.
static BLOCKED_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)diagnos").unwrap(),
        Regex::new(r"(?i)befund").unwrap(),
        Regex::new(r"(?i)symptom").unwrap(),
        Regex::new(r"(?i)schmerz").unwrap(),
        Regex::new(r"(?i)entz[üu]nd").unwrap(),
        Regex::new(r"(?i)fraktur").unwrap(),
        Regex::new(r"(?i)operation").unwrap(),
        Regex::new(r"(?i)medikament").unwrap(),
        Regex::new(r"(?i)krankheit").unwrap(),
        Regex::new(r"(?i)therapiebericht").unwrap(),
        Regex::new(r"(?i)anamnese").unwrap(),
        Regex::new(r"(?i)pathologi").unwrap(),
        Regex::new(r"(?i)r[öo]ntgen").unwrap(),
        Regex::new(r"(?i)mrt\b").unwrap(),
        Regex::new(r"(?i)\bct\b").unwrap(),
        Regex::new(r"(?i)tumor").unwrap(),
        Regex::new(r"(?i)arthros").unwrap(),
        Regex::new(r"(?i)hernie").unwrap(),
        Regex::new(r"(?i)prolaps").unwrap(),
        Regex::new(r"(?i)degenerat").unwrap(),
        Regex::new(r"(?i)fibromyalg").unwrap(),
        Regex::new(r"(?i)rheuma").unwrap(),
        Regex::new(r"(?i)depression").unwrap(),
        Regex::new(r"(?i)allergi").unwrap(),
        Regex::new(r"(?i)blutdruck").unwrap(),
        Regex::new(r"(?i)diabetes").unwrap(),
    ]
});

/// Vocabulary that is suspicious but not disqualifying; the note is kept
/// and marked for admin review.
static FLAGGED_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)beschwerden").unwrap(),
        Regex::new(r"(?i)untersuchung").unwrap(),
        Regex::new(r"(?i)behandlung\s+wegen").unwrap(),
        Regex::new(r"(?i)arzt").unwrap(),
        Regex::new(r"(?i)klinik").unwrap(),
        Regex::new(r"(?i)rezept").unwrap(),
    ]
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotesVerdict {
    Accepted,
    /// Stored, but marked for admin review.
    Flagged,
    Rejected {
        reason: String,
    },
}

impl NotesVerdict {
    pub fn is_flagged(&self) -> bool {
        matches!(self, NotesVerdict::Flagged)
    }
}

/// Review a booking note. Empty and absent notes pass unflagged.
pub fn review_notes(notes: Option<&str>) -> NotesVerdict {
    let text = match notes.map(str::trim) {
        None | Some("") => return NotesVerdict::Accepted,
        Some(text) => text,
    };

    if text.chars().count() > MAX_NOTE_LENGTH {
        return NotesVerdict::Rejected {
            reason: format!("note exceeds {MAX_NOTE_LENGTH} characters"),
        };
    }

    if BLOCKED_PATTERNS.iter().any(|p| p.is_match(text)) {
        return NotesVerdict::Rejected {
            reason: "medical details are not allowed in the note; \
                     use treatment shorthand such as KG, MT or Lymph"
                .into(),
        };
    }

    if FLAGGED_PATTERNS.iter().any(|p| p.is_match(text)) {
        return NotesVerdict::Flagged;
    }

    NotesVerdict::Accepted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_absent_notes_pass() {
        assert_eq!(review_notes(None), NotesVerdict::Accepted);
        assert_eq!(review_notes(Some("")), NotesVerdict::Accepted);
        assert_eq!(review_notes(Some("   ")), NotesVerdict::Accepted);
    }

    #[test]
    fn treatment_shorthand_passes() {
        assert_eq!(review_notes(Some("KG 2x wöchentlich")), NotesVerdict::Accepted);
        assert_eq!(review_notes(Some("MT + Lymph, Folgetermin")), NotesVerdict::Accepted);
    }

    #[test]
    fn clinical_vocabulary_is_rejected_case_insensitively() {
        for note in [
            "Diagnose: LWS-Syndrom",
            "neuer BEFUND vom Hausarzt liegt vor",
            "starke schmerzen im Knie",
            "Entzündung am Ellenbogen",
            "Röntgen war unauffällig",
            "MRT vom 12.05. mitbringen",
        ] {
            match review_notes(Some(note)) {
                NotesVerdict::Rejected { reason } => {
                    assert!(reason.contains("medical details"), "unexpected reason: {reason}")
                }
                other => panic!("expected rejection for {note:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn word_boundary_keeps_ct_out_of_ordinary_words() {
        // "direct" contains "ct" but only as a fragment.
        assert_eq!(review_notes(Some("direct follow-up")), NotesVerdict::Accepted);
        assert!(matches!(
            review_notes(Some("CT Bilder vorhanden")),
            NotesVerdict::Rejected { .. }
        ));
    }

    #[test]
    fn soft_vocabulary_is_flagged_not_rejected() {
        for note in [
            "Beschwerden seit letzter Woche",
            "Untersuchung beim Orthopäden war gestern",
            "Behandlung wegen Verordnung läuft",
            "Rezept liegt bei",
        ] {
            assert_eq!(review_notes(Some(note)), NotesVerdict::Flagged, "note: {note}");
        }
    }

    #[test]
    fn overlong_note_is_rejected_with_length_reason() {
        let long = "a".repeat(MAX_NOTE_LENGTH + 1);
        match review_notes(Some(&long)) {
            NotesVerdict::Rejected { reason } => assert!(reason.contains("200")),
            other => panic!("expected rejection, got {other:?}"),
        }

        let exactly = "a".repeat(MAX_NOTE_LENGTH);
        assert_eq!(review_notes(Some(&exactly)), NotesVerdict::Accepted);
    }
}
