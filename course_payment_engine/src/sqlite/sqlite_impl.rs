//! `SqliteDatabase` is a concrete implementation of a course payment engine backend.
//!
//! It uses SQLite for storage and implements all the traits defined in the [`crate::traits`] module.
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use sqlx::{migrate::MigrateError, SqlitePool};

use super::db::{courses, db_url, enrollments, new_pool, transactions};
use crate::{
    db_types::{
        Course,
        Enrollment,
        NewCourse,
        NewPaymentTransaction,
        PaymentTransaction,
        TransactionId,
        TransactionStatus,
        TransactionUpdate,
    },
    traits::{
        CourseManagement,
        CreatedTransaction,
        EnrollmentManagement,
        InsertEnrollmentResult,
        StoreError,
        TransactionManagement,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl TransactionManagement for SqliteDatabase {
    /// Supersedes the pair's pending transaction and stores the new one in a single atomic transaction.
    async fn create_transaction(&self, transaction: NewPaymentTransaction) -> Result<CreatedTransaction, StoreError> {
        let mut tx = self.pool.begin().await?;
        let superseded =
            transactions::fail_pending_for(&transaction.student_id, &transaction.course_id, &mut tx).await?;
        let transaction = transactions::insert_transaction(transaction, &mut tx).await?;
        tx.commit().await?;
        if !superseded.is_empty() {
            debug!("🗃️ Transaction {} superseded {} pending transaction(s)", transaction.id, superseded.len());
        }
        Ok(CreatedTransaction { transaction, superseded })
    }

    async fn fetch_transaction(&self, id: &TransactionId) -> Result<Option<PaymentTransaction>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let tx = transactions::fetch_transaction(id, &mut conn).await?;
        Ok(tx)
    }

    async fn fetch_transaction_by_gateway_order_id(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<PaymentTransaction>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let tx = transactions::fetch_transaction_by_gateway_order_id(gateway_order_id, &mut conn).await?;
        Ok(tx)
    }

    async fn fetch_transactions_for_student(&self, student_id: &str) -> Result<Vec<PaymentTransaction>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let result = transactions::fetch_transactions_for_student(student_id, &mut conn).await?;
        Ok(result)
    }

    async fn fetch_stale_pending_transactions(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<PaymentTransaction>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let stale = transactions::fetch_pending_created_before(cutoff, &mut conn).await?;
        trace!("🗃️ {} pending transactions were created before {cutoff}", stale.len());
        Ok(stale)
    }

    async fn conditional_update(
        &self,
        id: &TransactionId,
        expected: TransactionStatus,
        update: TransactionUpdate,
    ) -> Result<Option<PaymentTransaction>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let result = transactions::update_if_status(id, expected, update, &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }
}

impl EnrollmentManagement for SqliteDatabase {
    async fn grant_access(&self, student_id: &str, course_id: &str) -> Result<InsertEnrollmentResult, StoreError> {
        let mut tx = self.pool.begin().await?;
        let result = enrollments::idempotent_insert(student_id, course_id, &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn fetch_enrollment(&self, student_id: &str, course_id: &str) -> Result<Option<Enrollment>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let enrollment = enrollments::fetch_enrollment(student_id, course_id, &mut conn).await?;
        Ok(enrollment)
    }

    async fn fetch_enrollments_for_student(&self, student_id: &str) -> Result<Vec<Enrollment>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let result = enrollments::fetch_enrollments_for_student(student_id, &mut conn).await?;
        Ok(result)
    }
}

impl CourseManagement for SqliteDatabase {
    async fn fetch_course(&self, course_id: &str) -> Result<Option<Course>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let course = courses::fetch_course(course_id, &mut conn).await?;
        Ok(course)
    }

    async fn upsert_course(&self, course: NewCourse) -> Result<Course, StoreError> {
        let mut tx = self.pool.begin().await?;
        let course = courses::upsert_course(course, &mut tx).await?;
        tx.commit().await?;
        Ok(course)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object, using the URL in `CPG_DATABASE_URL`.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Brings the schema up to date.
    pub async fn migrate(&self) -> Result<(), MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
