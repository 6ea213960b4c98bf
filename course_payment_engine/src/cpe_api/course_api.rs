use std::fmt::Debug;

use log::*;

use crate::{
    cpe_api::errors::CourseApiError,
    db_types::{Course, NewCourse},
    traits::CourseManagement,
};

#[derive(Clone)]
pub struct CourseApi<B> {
    db: B,
}

impl<B> Debug for CourseApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CourseApi")
    }
}

impl<B> CourseApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> CourseApi<B>
where B: CourseManagement
{
    pub async fn fetch_course(&self, course_id: &str) -> Result<Option<Course>, CourseApiError> {
        let course = self.db.fetch_course(course_id).await?;
        Ok(course)
    }

    /// Creates or replaces a course in the read model. Prices may be zero (free courses) but never negative.
    pub async fn upsert_course(&self, mut course: NewCourse) -> Result<Course, CourseApiError> {
        if course.id.trim().is_empty() {
            return Err(CourseApiError::InvalidCourse("The course id cannot be empty".into()));
        }
        if course.title.trim().is_empty() {
            return Err(CourseApiError::InvalidCourse(format!("Course {} has no title", course.id)));
        }
        if course.price.value() < 0 {
            return Err(CourseApiError::InvalidCourse(format!("Course {} has a negative price", course.id)));
        }
        course.currency = course.currency.trim().to_uppercase();
        if course.currency.len() != 3 {
            return Err(CourseApiError::InvalidCourse(format!(
                "'{}' is not an ISO currency code",
                course.currency
            )));
        }
        let course = self.db.upsert_course(course).await?;
        info!("📚️ Course {} ({}) saved at {} {}", course.id, course.title, course.price, course.currency);
        Ok(course)
    }
}
