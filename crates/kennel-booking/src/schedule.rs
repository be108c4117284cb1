//! Staff shift validation

use chrono::{DateTime, Utc};
use kennel_core::ValidationErrors;
use serde::{Deserialize, Serialize};

/// One scheduled shift for a staff member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffShift {
    /// `None` for a shift not yet saved
    #[serde(default)]
    pub id: Option<String>,
    pub staff_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl StaffShift {
    /// Half-open overlap: a shift ending at 12:00 does not clash with one starting at 12:00
    pub fn overlaps(&self, other: &StaffShift) -> bool {
        self.start_time < other.end_time && other.start_time < self.end_time
    }

    fn is_same_shift(&self, other: &StaffShift) -> bool {
        matches!((&self.id, &other.id), (Some(a), Some(b)) if a == b)
    }
}

/// Check a new or edited shift against the staff member's other shifts
pub fn validate_shift(shift: &StaffShift, existing: &[StaffShift]) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    if shift.staff_id.trim().is_empty() {
        errors.add("staffId", "Select a staff member");
    }

    if shift.end_time <= shift.start_time {
        errors.add("endTime", "End time must be after start time");
        return Err(errors);
    }

    for other in existing
        .iter()
        .filter(|o| o.staff_id == shift.staff_id && !o.is_same_shift(shift))
    {
        if shift.overlaps(other) {
            errors.add(
                "startTime",
                format!(
                    "Overlaps an existing shift from {} to {}",
                    other.start_time.format("%Y-%m-%d %H:%M"),
                    other.end_time.format("%Y-%m-%d %H:%M")
                ),
            );
        }
    }

    errors.into_result(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::at;

    fn shift(id: Option<&str>, staff: &str, start: &str, end: &str) -> StaffShift {
        StaffShift {
            id: id.map(str::to_string),
            staff_id: staff.to_string(),
            start_time: at(start),
            end_time: at(end),
        }
    }

    #[test]
    fn test_end_before_start() {
        let s = shift(None, "s1", "2025-04-10T12:00:00Z", "2025-04-10T08:00:00Z");
        let errors = validate_shift(&s, &[]).unwrap_err();
        assert!(errors.has_field("endTime"));
    }

    #[test]
    fn test_overlap_with_same_staff() {
        let existing = vec![shift(Some("a"), "s1", "2025-04-10T08:00:00Z", "2025-04-10T16:00:00Z")];
        let s = shift(None, "s1", "2025-04-10T15:00:00Z", "2025-04-10T20:00:00Z");
        let errors = validate_shift(&s, &existing).unwrap_err();
        assert!(errors.has_field("startTime"));
    }

    #[test]
    fn test_back_to_back_and_other_staff_allowed() {
        let existing = vec![
            shift(Some("a"), "s1", "2025-04-10T08:00:00Z", "2025-04-10T16:00:00Z"),
            shift(Some("b"), "s2", "2025-04-10T16:00:00Z", "2025-04-10T22:00:00Z"),
        ];
        let s = shift(None, "s1", "2025-04-10T16:00:00Z", "2025-04-10T22:00:00Z");
        assert!(validate_shift(&s, &existing).is_ok());
    }

    #[test]
    fn test_editing_does_not_clash_with_itself() {
        let existing = vec![shift(Some("a"), "s1", "2025-04-10T08:00:00Z", "2025-04-10T16:00:00Z")];
        let edited = shift(Some("a"), "s1", "2025-04-10T09:00:00Z", "2025-04-10T17:00:00Z");
        assert!(validate_shift(&edited, &existing).is_ok());
    }
}
