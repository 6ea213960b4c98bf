use std::fmt::Debug;

use log::*;

use crate::{
    cpe_api::errors::PaymentFlowError,
    db_types::{Enrollment, PaymentTransaction, TransactionStatus},
    events::{EnrollmentGrantedEvent, EventProducers},
    traits::{CourseManagement, EnrollmentManagement},
};

/// Grants course access. Access is granted either for a completed payment, or directly for free courses.
#[derive(Clone)]
pub struct EnrollmentApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for EnrollmentApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EnrollmentApi")
    }
}

impl<B> EnrollmentApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> EnrollmentApi<B>
where B: EnrollmentManagement + CourseManagement
{
    /// Enrolls the student in the course, or returns the existing enrollment unchanged.
    pub async fn grant_access(&self, student_id: &str, course_id: &str) -> Result<Enrollment, PaymentFlowError> {
        self.grant(student_id, course_id, None).await
    }

    /// Grants access for a completed payment.
    pub async fn grant_access_for_payment(&self, tx: &PaymentTransaction) -> Result<Enrollment, PaymentFlowError> {
        if tx.status != TransactionStatus::Completed {
            return Err(PaymentFlowError::InvalidRequest(format!(
                "Transaction {} is {}. Only completed payments grant access",
                tx.id, tx.status
            )));
        }
        self.grant(&tx.student_id, &tx.course_id, Some(tx.clone())).await
    }

    /// Direct enrollment for published courses that cost nothing.
    pub async fn enroll_free(&self, student_id: &str, course_id: &str) -> Result<Enrollment, PaymentFlowError> {
        if student_id.trim().is_empty() {
            return Err(PaymentFlowError::InvalidRequest("A student id is required".into()));
        }
        let course = self
            .db
            .fetch_course(course_id)
            .await?
            .ok_or_else(|| PaymentFlowError::InvalidRequest(format!("Course {course_id} does not exist")))?;
        if !course.is_free() {
            debug!("🎓️ {student_id} tried to enroll for free in {course_id}, which costs {}", course.price);
            return Err(PaymentFlowError::InvalidRequest(format!("Course {course_id} is not a free, published course")));
        }
        self.grant(student_id, course_id, None).await
    }

    pub async fn enrollment(&self, student_id: &str, course_id: &str) -> Result<Option<Enrollment>, PaymentFlowError> {
        let enrollment = self.db.fetch_enrollment(student_id, course_id).await?;
        Ok(enrollment)
    }

    pub async fn enrollments_for_student(&self, student_id: &str) -> Result<Vec<Enrollment>, PaymentFlowError> {
        let enrollments = self.db.fetch_enrollments_for_student(student_id).await?;
        Ok(enrollments)
    }

    async fn grant(
        &self,
        student_id: &str,
        course_id: &str,
        tx: Option<PaymentTransaction>,
    ) -> Result<Enrollment, PaymentFlowError> {
        let result = self.db.grant_access(student_id, course_id).await?;
        if result.is_new() {
            info!("🎓️ {student_id} now has access to {course_id}");
            let event = EnrollmentGrantedEvent::new(result.enrollment().clone(), tx);
            for producer in &self.producers.enrollment_granted_producer {
                producer.publish_event(event.clone()).await;
            }
        }
        Ok(result.into_enrollment())
    }
}
