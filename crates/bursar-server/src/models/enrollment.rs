//! Enrollment model: a student's registration for one semester under
//! one tuition scheme.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Lifecycle states of an enrollment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "enrollment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentStatus {
    /// Registered but no qualifying payment yet.
    Pending,
    /// Qualifying payment completed.
    Enrolled,
    /// Semester finished.
    Completed,
    /// Enrollment abandoned.
    Withdrawn,
}

/// How far along the enrollment's billing is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "billing_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BillingStatus {
    Unpaid,
    PartiallyPaid,
    FullyPaid,
}

/// A student's registration for a given semester and tuition scheme.
///
/// Owned by the enrollment workflow; the billing core reads it and
/// advances `status`/`payment_status` when payments complete.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Enrollment {
    pub id: Uuid,
    /// Opaque reference to the student service's record.
    pub student_id: Uuid,
    pub program_id: Uuid,
    pub semester_id: Uuid,
    pub year_level: i32,
    pub scheme_id: Uuid,
    pub status: EnrollmentStatus,
    pub payment_status: BillingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Enrollment {
    pub fn is_enrolled(&self) -> bool {
        self.status == EnrollmentStatus::Enrolled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enrollment_status_serialization() {
        assert_eq!(
            serde_json::to_string(&EnrollmentStatus::Pending).unwrap(),
            "\"pending\""
        );
        assert_eq!(
            serde_json::to_string(&EnrollmentStatus::Enrolled).unwrap(),
            "\"enrolled\""
        );
        assert_eq!(
            serde_json::to_string(&EnrollmentStatus::Withdrawn).unwrap(),
            "\"withdrawn\""
        );
    }

    #[test]
    fn test_billing_status_serialization() {
        assert_eq!(
            serde_json::to_string(&BillingStatus::Unpaid).unwrap(),
            "\"unpaid\""
        );
        assert_eq!(
            serde_json::to_string(&BillingStatus::PartiallyPaid).unwrap(),
            "\"partially_paid\""
        );
        assert_eq!(
            serde_json::to_string(&BillingStatus::FullyPaid).unwrap(),
            "\"fully_paid\""
        );
    }

    #[test]
    fn test_billing_status_deserialization() {
        assert_eq!(
            serde_json::from_str::<BillingStatus>("\"partially_paid\"").unwrap(),
            BillingStatus::PartiallyPaid
        );
    }
}
