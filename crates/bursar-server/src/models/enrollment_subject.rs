//! Subject catalog and enrollment-subject link models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A subject offered for a program/semester/year-level.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Subject {
    pub id: Uuid,
    pub program_id: Uuid,
    pub semester_id: Uuid,
    pub year_level: i32,
    pub code: String,
    pub title: String,
    pub units: i32,
    pub created_at: DateTime<Utc>,
}

/// Links an enrollment to one subject. Created lazily by the
/// completion engine's best-effort post-step.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EnrollmentSubject {
    pub id: Uuid,
    pub enrollment_id: Uuid,
    pub subject_id: Uuid,
    pub created_at: DateTime<Utc>,
}
