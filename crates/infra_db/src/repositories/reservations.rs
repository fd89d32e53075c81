//! Reservation repository
//!
//! Status changes are guarded by an expected-status predicate so stale
//! writers fail instead of clobbering a concurrent audit decision, and a
//! double-submitted insert resolves to the already-persisted row through
//! the unique reservation number.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use core_kernel::{BranchId, CurrencyId, OperatorId, ReservationId, TransactionId};
use domain_compliance::ReportType;
use domain_exchange::TradeDirection;
use domain_reservation::{Reservation, ReservationStatus};

use crate::error::DatabaseError;

/// Database row for a reservation
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReservationRow {
    pub id: Uuid,
    pub reservation_no: String,
    pub customer_id: String,
    pub customer_name: String,
    pub customer_country: String,
    pub currency_id: Uuid,
    pub direction: String,
    pub foreign_amount: Decimal,
    pub local_amount: Decimal,
    pub rate: Decimal,
    pub trigger_type: String,
    pub report_type: String,
    pub status: String,
    pub branch_id: Uuid,
    pub created_by: Uuid,
    pub auditor_id: Option<Uuid>,
    pub audit_time: Option<DateTime<Utc>>,
    pub reject_reason: Option<String>,
    pub form_data: serde_json::Value,
    pub linked_transaction_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Data for inserting a reservation
#[derive(Debug, Clone)]
pub struct NewReservation {
    pub id: Uuid,
    pub reservation_no: String,
    pub customer_id: String,
    pub customer_name: String,
    pub customer_country: String,
    pub currency_id: Uuid,
    pub direction: String,
    pub foreign_amount: Decimal,
    pub local_amount: Decimal,
    pub rate: Decimal,
    pub trigger_type: String,
    pub report_type: String,
    pub branch_id: Uuid,
    pub created_by: Uuid,
    pub form_data: serde_json::Value,
}

/// Repository over reservations
#[derive(Debug, Clone)]
pub struct ReservationRepository {
    pool: PgPool,
}

impl ReservationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a reservation inside the caller's transaction
    ///
    /// A duplicate reservation number (an operator retrying the same
    /// submission) surfaces as `DuplicateEntry`; the caller resolves it to
    /// the existing row after its transaction ends.
    pub async fn insert(
        conn: &mut PgConnection,
        new: &NewReservation,
    ) -> Result<ReservationRow, DatabaseError> {
        let row = sqlx::query_as(
            "INSERT INTO reservations (\
                 id, reservation_no, customer_id, customer_name, customer_country, \
                 currency_id, direction, foreign_amount, local_amount, rate, \
                 trigger_type, report_type, status, branch_id, created_by, form_data, \
                 created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, 'pending', $13, $14, $15, now(), now()) \
             RETURNING *",
        )
        .bind(new.id)
        .bind(&new.reservation_no)
        .bind(&new.customer_id)
        .bind(&new.customer_name)
        .bind(&new.customer_country)
        .bind(new.currency_id)
        .bind(&new.direction)
        .bind(new.foreign_amount)
        .bind(new.local_amount)
        .bind(new.rate)
        .bind(&new.trigger_type)
        .bind(&new.report_type)
        .bind(new.branch_id)
        .bind(new.created_by)
        .bind(&new.form_data)
        .fetch_one(conn)
        .await?;
        Ok(row)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<ReservationRow>, DatabaseError> {
        let row = sqlx::query_as("SELECT * FROM reservations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn find_by_no(&self, reservation_no: &str) -> Result<Option<ReservationRow>, DatabaseError> {
        let row = sqlx::query_as("SELECT * FROM reservations WHERE reservation_no = $1")
            .bind(reservation_no)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Locks a reservation row for a status decision
    pub async fn lock_by_id(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<ReservationRow>, DatabaseError> {
        let row = sqlx::query_as("SELECT * FROM reservations WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row)
    }

    /// The customer's newest approved reservation, locked, if any
    ///
    /// Used by the execute path to re-check the envelope under lock before
    /// consuming it.
    pub async fn lock_approved_for_customer(
        conn: &mut PgConnection,
        customer_id: &str,
    ) -> Result<Option<ReservationRow>, DatabaseError> {
        if customer_id.is_empty() {
            return Ok(None);
        }
        let row = sqlx::query_as(
            "SELECT * FROM reservations \
             WHERE customer_id = $1 AND status = 'approved' \
             ORDER BY created_at DESC LIMIT 1 \
             FOR UPDATE",
        )
        .bind(customer_id)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(row)
    }

    /// The customer's newest approved reservation without locking, for
    /// the validation preview
    pub async fn find_approved_for_customer(
        &self,
        customer_id: &str,
    ) -> Result<Option<ReservationRow>, DatabaseError> {
        if customer_id.is_empty() {
            return Ok(None);
        }
        let row = sqlx::query_as(
            "SELECT * FROM reservations \
             WHERE customer_id = $1 AND status = 'approved' \
             ORDER BY created_at DESC LIMIT 1",
        )
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Applies a status transition guarded by the expected current status
    ///
    /// Zero rows affected means a concurrent writer got there first; the
    /// caller surfaces that as an invalid transition.
    #[allow(clippy::too_many_arguments)]
    pub async fn update_status(
        conn: &mut PgConnection,
        id: Uuid,
        expected: &str,
        status: &str,
        auditor_id: Option<Uuid>,
        audit_time: Option<DateTime<Utc>>,
        reject_reason: Option<&str>,
        linked_transaction_id: Option<Uuid>,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "UPDATE reservations SET \
                 status = $3, auditor_id = $4, audit_time = $5, reject_reason = $6, \
                 linked_transaction_id = COALESCE($7, linked_transaction_id), \
                 updated_at = now() \
             WHERE id = $1 AND status = $2",
        )
        .bind(id)
        .bind(expected)
        .bind(status)
        .bind(auditor_id)
        .bind(audit_time)
        .bind(reject_reason)
        .bind(linked_transaction_id)
        .execute(conn)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// A just-submitted reservation for the same customer at the same
    /// branch, used to absorb double-clicked submissions
    pub async fn find_recent_duplicate(
        &self,
        customer_id: &str,
        branch_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Option<ReservationRow>, DatabaseError> {
        let row = sqlx::query_as(
            "SELECT * FROM reservations \
             WHERE customer_id = $1 AND branch_id = $2 AND status = 'pending' \
               AND created_at >= $3 \
             ORDER BY created_at DESC LIMIT 1",
        )
        .bind(customer_id)
        .bind(branch_id)
        .bind(since)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Reservations pending audit at a branch, oldest first
    pub async fn list_pending(&self, branch_id: Uuid) -> Result<Vec<ReservationRow>, DatabaseError> {
        let rows = sqlx::query_as(
            "SELECT * FROM reservations \
             WHERE branch_id = $1 AND status = 'pending' ORDER BY created_at",
        )
        .bind(branch_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

/// Hydrates the domain aggregate from a database row
pub fn reservation_from_row(row: ReservationRow) -> Result<Reservation, DatabaseError> {
    let status = ReservationStatus::parse(&row.status)
        .map_err(|e| DatabaseError::SerializationError(e.to_string()))?;
    let direction = TradeDirection::parse(&row.direction)
        .map_err(|e| DatabaseError::SerializationError(e.to_string()))?;
    let report_type = ReportType::parse(&row.report_type)
        .map_err(|e| DatabaseError::SerializationError(e.to_string()))?;

    Ok(Reservation {
        id: ReservationId::from_uuid(row.id),
        reservation_no: row.reservation_no,
        customer_id: row.customer_id,
        customer_name: row.customer_name,
        customer_country: row.customer_country,
        currency_id: CurrencyId::from_uuid(row.currency_id),
        direction,
        foreign_amount: row.foreign_amount,
        local_amount: row.local_amount,
        rate: row.rate,
        trigger_type: row.trigger_type,
        report_type,
        status,
        branch_id: BranchId::from_uuid(row.branch_id),
        created_by: OperatorId::from_uuid(row.created_by),
        auditor_id: row.auditor_id.map(OperatorId::from_uuid),
        audit_time: row.audit_time,
        reject_reason: row.reject_reason,
        form_data: row.form_data,
        linked_transaction_id: row.linked_transaction_id.map(TransactionId::from_uuid),
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}
