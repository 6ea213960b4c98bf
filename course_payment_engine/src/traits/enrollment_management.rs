use crate::{db_types::Enrollment, traits::StoreError};

/// The result of an idempotent enrollment insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertEnrollmentResult {
    Inserted(Enrollment),
    AlreadyExists(Enrollment),
}

impl InsertEnrollmentResult {
    pub fn enrollment(&self) -> &Enrollment {
        match self {
            Self::Inserted(e) | Self::AlreadyExists(e) => e,
        }
    }

    pub fn into_enrollment(self) -> Enrollment {
        match self {
            Self::Inserted(e) | Self::AlreadyExists(e) => e,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, Self::Inserted(_))
    }
}

#[allow(async_fn_in_trait)]
pub trait EnrollmentManagement: Clone {
    /// Grants the student access to the course. If the student is already enrolled, the existing enrollment is
    /// returned untouched. Concurrent calls for the same pair produce exactly one `Inserted` result.
    async fn grant_access(&self, student_id: &str, course_id: &str) -> Result<InsertEnrollmentResult, StoreError>;

    async fn fetch_enrollment(&self, student_id: &str, course_id: &str) -> Result<Option<Enrollment>, StoreError>;

    async fn fetch_enrollments_for_student(&self, student_id: &str) -> Result<Vec<Enrollment>, StoreError>;
}
