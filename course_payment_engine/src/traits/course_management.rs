use crate::{
    db_types::{Course, NewCourse},
    traits::StoreError,
};

/// The read model of the external course catalog.
#[allow(async_fn_in_trait)]
pub trait CourseManagement: Clone {
    async fn fetch_course(&self, course_id: &str) -> Result<Option<Course>, StoreError>;

    /// Inserts the course, or replaces the title, price, currency and published flag of an existing one.
    async fn upsert_course(&self, course: NewCourse) -> Result<Course, StoreError>;
}
