use chrono::Utc;
use log::debug;
use sqlx::SqliteConnection;

use crate::{db_types::Enrollment, traits::InsertEnrollmentResult};

/// Inserts an enrollment for the pair, unless one exists already. The unique (student_id, course_id) constraint makes
/// this safe to call concurrently.
pub async fn idempotent_insert(
    student_id: &str,
    course_id: &str,
    conn: &mut SqliteConnection,
) -> Result<InsertEnrollmentResult, sqlx::Error> {
    let mut inserted: Vec<Enrollment> = sqlx::query_as(
        r#"
            INSERT INTO enrollments (student_id, course_id, enrollment_date)
            VALUES ($1, $2, $3)
            ON CONFLICT (student_id, course_id) DO NOTHING
            RETURNING *;
        "#,
    )
    .bind(student_id)
    .bind(course_id)
    .bind(Utc::now())
    .fetch_all(&mut *conn)
    .await?;
    let result = match inserted.pop() {
        Some(enrollment) => {
            debug!("🗃️ Enrollment #{} created for {student_id} in {course_id}", enrollment.id);
            InsertEnrollmentResult::Inserted(enrollment)
        },
        None => {
            let existing = fetch_enrollment(student_id, course_id, conn).await?.ok_or(sqlx::Error::RowNotFound)?;
            debug!("🗃️ {student_id} is already enrolled in {course_id} (enrollment #{})", existing.id);
            InsertEnrollmentResult::AlreadyExists(existing)
        },
    };
    Ok(result)
}

pub async fn fetch_enrollment(
    student_id: &str,
    course_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Enrollment>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM enrollments WHERE student_id = $1 AND course_id = $2")
        .bind(student_id)
        .bind(course_id)
        .fetch_optional(conn)
        .await
}

pub async fn fetch_enrollments_for_student(
    student_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<Enrollment>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM enrollments WHERE student_id = $1 ORDER BY enrollment_date ASC, id ASC")
        .bind(student_id)
        .fetch_all(conn)
        .await
}
