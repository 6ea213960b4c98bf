use chrono::Utc;
use log::debug;
use sqlx::SqliteConnection;

use crate::db_types::{Course, NewCourse};

pub async fn fetch_course(course_id: &str, conn: &mut SqliteConnection) -> Result<Option<Course>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM courses WHERE id = $1").bind(course_id).fetch_optional(conn).await
}

pub async fn upsert_course(course: NewCourse, conn: &mut SqliteConnection) -> Result<Course, sqlx::Error> {
    let now = Utc::now();
    let mut rows: Vec<Course> = sqlx::query_as(
        r#"
            INSERT INTO courses (id, title, price, currency, published, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            ON CONFLICT (id) DO UPDATE SET
                title = excluded.title,
                price = excluded.price,
                currency = excluded.currency,
                published = excluded.published,
                updated_at = excluded.updated_at
            RETURNING *;
        "#,
    )
    .bind(course.id)
    .bind(course.title)
    .bind(course.price.value())
    .bind(course.currency)
    .bind(course.published)
    .bind(now)
    .fetch_all(conn)
    .await?;
    let course = rows.pop().ok_or(sqlx::Error::RowNotFound)?;
    debug!("🗃️ Course {} saved. Price {} {}", course.id, course.price, course.currency);
    Ok(course)
}
