//! Report registry
//!
//! AMLO reports are one-per-reservation and idempotent on the approval
//! path: the unique reservation reference makes a retried approval find
//! the existing report instead of minting a second number. BOT event rows
//! are append-only and reconstructible; only their `is_reported` bit ever
//! changes, batch-wise and all-or-none.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use core_kernel::ReportingWindow;
use domain_compliance::BotForm;

use crate::error::DatabaseError;

/// Database row for an AMLO report
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AmloReportRow {
    pub id: Uuid,
    pub report_no: String,
    pub report_format: String,
    pub reservation_id: Uuid,
    pub transaction_id: Option<Uuid>,
    pub customer_id: String,
    pub customer_name: String,
    pub customer_country: String,
    pub amount: Decimal,
    pub transaction_date: NaiveDate,
    pub pdf_path: Option<String>,
    pub is_reported: bool,
    pub reported_at: Option<DateTime<Utc>>,
    pub branch_id: Uuid,
    pub operator_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Data for inserting an AMLO report
#[derive(Debug, Clone)]
pub struct NewAmloReport {
    pub id: Uuid,
    pub report_no: String,
    pub report_format: String,
    pub reservation_id: Uuid,
    pub transaction_id: Option<Uuid>,
    pub customer_id: String,
    pub customer_name: String,
    pub customer_country: String,
    pub amount: Decimal,
    pub transaction_date: NaiveDate,
    pub branch_id: Uuid,
    pub operator_id: Uuid,
}

/// Database row for a BOT FX event
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BotFxEventRow {
    pub id: Uuid,
    pub branch_id: Uuid,
    pub transaction_id: Uuid,
    pub customer_type: String,
    pub customer_name: String,
    pub id_type: String,
    pub id_number: String,
    pub country_code: String,
    pub currency_code: String,
    pub rate: Decimal,
    pub foreign_amount: Decimal,
    pub local_amount: Decimal,
    pub usd_equivalent: Decimal,
    pub payment_method: String,
    pub remarks: Option<String>,
    pub event_time: DateTime<Utc>,
    pub is_reported: bool,
    pub reported_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Database row for a BOT FCD event
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BotFcdEventRow {
    pub id: Uuid,
    pub branch_id: Uuid,
    pub transaction_id: Uuid,
    pub event_date: NaiveDate,
    pub bank_name: String,
    pub account_no: String,
    pub currency_code: String,
    pub balance: Decimal,
    pub amount: Decimal,
    pub remarks: Option<String>,
    pub event_time: DateTime<Utc>,
    pub is_reported: bool,
    pub reported_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Database row for a BOT Provider event
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BotProviderEventRow {
    pub id: Uuid,
    pub branch_id: Uuid,
    pub adjustment_id: Uuid,
    pub currency_code: String,
    pub delta_amount: Decimal,
    pub usd_equivalent: Decimal,
    pub remarks: Option<String>,
    pub event_time: DateTime<Utc>,
    pub is_reported: bool,
    pub reported_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

fn fx_table(form: BotForm) -> &'static str {
    match form {
        BotForm::BuyFx => "bot_buy_fx_events",
        BotForm::SellFx => "bot_sell_fx_events",
        other => unreachable!("{other} is not an FX form"),
    }
}

/// Registry over AMLO reports and BOT event rows
#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: PgPool,
}

impl ReportRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // --- AMLO ---------------------------------------------------------

    /// Inserts an AMLO report inside the caller's transaction
    pub async fn insert_amlo(
        conn: &mut PgConnection,
        new: &NewAmloReport,
    ) -> Result<AmloReportRow, DatabaseError> {
        let row = sqlx::query_as(
            "INSERT INTO amlo_reports (\
                 id, report_no, report_format, reservation_id, transaction_id, \
                 customer_id, customer_name, customer_country, amount, \
                 transaction_date, branch_id, operator_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             RETURNING *",
        )
        .bind(new.id)
        .bind(&new.report_no)
        .bind(&new.report_format)
        .bind(new.reservation_id)
        .bind(new.transaction_id)
        .bind(&new.customer_id)
        .bind(&new.customer_name)
        .bind(&new.customer_country)
        .bind(new.amount)
        .bind(new.transaction_date)
        .bind(new.branch_id)
        .bind(new.operator_id)
        .fetch_one(conn)
        .await?;
        Ok(row)
    }

    /// The report already issued for a reservation, if any
    pub async fn find_amlo_by_reservation(
        conn: &mut PgConnection,
        reservation_id: Uuid,
    ) -> Result<Option<AmloReportRow>, DatabaseError> {
        let row = sqlx::query_as("SELECT * FROM amlo_reports WHERE reservation_id = $1")
            .bind(reservation_id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row)
    }

    pub async fn find_amlo_by_id(&self, id: Uuid) -> Result<Option<AmloReportRow>, DatabaseError> {
        let row = sqlx::query_as("SELECT * FROM amlo_reports WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn find_amlo_by_no(
        &self,
        report_no: &str,
    ) -> Result<Option<AmloReportRow>, DatabaseError> {
        let row = sqlx::query_as("SELECT * FROM amlo_reports WHERE report_no = $1")
            .bind(report_no)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// AMLO reports of one branch-month, optionally one format
    pub async fn list_amlo_month(
        &self,
        branch_id: Uuid,
        window: ReportingWindow,
        report_format: Option<&str>,
    ) -> Result<Vec<AmloReportRow>, DatabaseError> {
        let rows = match report_format {
            Some(format) => {
                sqlx::query_as(
                    "SELECT * FROM amlo_reports \
                     WHERE branch_id = $1 AND created_at >= $2 AND created_at < $3 \
                       AND report_format = $4 \
                     ORDER BY created_at, id",
                )
                .bind(branch_id)
                .bind(window.start)
                .bind(window.end)
                .bind(format)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(
                    "SELECT * FROM amlo_reports \
                     WHERE branch_id = $1 AND created_at >= $2 AND created_at < $3 \
                     ORDER BY created_at, id",
                )
                .bind(branch_id)
                .bind(window.start)
                .bind(window.end)
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(rows)
    }

    /// Records the rendered artifact path after a successful render
    pub async fn set_amlo_pdf_path(&self, id: Uuid, pdf_path: &str) -> Result<(), DatabaseError> {
        sqlx::query("UPDATE amlo_reports SET pdf_path = $2 WHERE id = $1")
            .bind(id)
            .bind(pdf_path)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Links the consuming transaction onto the reservation's report
    pub async fn link_amlo_transaction(
        conn: &mut PgConnection,
        reservation_id: Uuid,
        transaction_id: Uuid,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            "UPDATE amlo_reports SET transaction_id = $2 \
             WHERE reservation_id = $1 AND transaction_id IS NULL",
        )
        .bind(reservation_id)
        .bind(transaction_id)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Flips `is_reported` for a batch, all-or-none
    pub async fn mark_amlo_reported(
        conn: &mut PgConnection,
        ids: &[Uuid],
        at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        if ids.is_empty() {
            return Ok(());
        }
        let result = sqlx::query(
            "UPDATE amlo_reports SET is_reported = TRUE, reported_at = $2 \
             WHERE id = ANY($1) AND is_reported = FALSE",
        )
        .bind(ids)
        .bind(at)
        .execute(conn)
        .await?;
        if result.rows_affected() as usize != ids.len() {
            return Err(DatabaseError::TransactionFailed(format!(
                "marked {} of {} AMLO reports; batch must be all-or-none",
                result.rows_affected(),
                ids.len()
            )));
        }
        Ok(())
    }

    // --- BOT ----------------------------------------------------------

    /// Inserts a Buy FX or Sell FX event inside the caller's transaction
    pub async fn insert_bot_fx(
        conn: &mut PgConnection,
        form: BotForm,
        row: &BotFxEventRow,
    ) -> Result<(), DatabaseError> {
        sqlx::query(&format!(
            "INSERT INTO {} (\
                 id, branch_id, transaction_id, customer_type, customer_name, id_type, \
                 id_number, country_code, currency_code, rate, foreign_amount, \
                 local_amount, usd_equivalent, payment_method, remarks, event_time) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
            fx_table(form)
        ))
        .bind(row.id)
        .bind(row.branch_id)
        .bind(row.transaction_id)
        .bind(&row.customer_type)
        .bind(&row.customer_name)
        .bind(&row.id_type)
        .bind(&row.id_number)
        .bind(&row.country_code)
        .bind(&row.currency_code)
        .bind(row.rate)
        .bind(row.foreign_amount)
        .bind(row.local_amount)
        .bind(row.usd_equivalent)
        .bind(&row.payment_method)
        .bind(row.remarks.as_deref())
        .bind(row.event_time)
        .execute(conn)
        .await?;
        Ok(())
    }

    pub async fn insert_bot_fcd(
        conn: &mut PgConnection,
        row: &BotFcdEventRow,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO bot_fcd_events (\
                 id, branch_id, transaction_id, event_date, bank_name, account_no, \
                 currency_code, balance, amount, remarks, event_time) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(row.id)
        .bind(row.branch_id)
        .bind(row.transaction_id)
        .bind(row.event_date)
        .bind(&row.bank_name)
        .bind(&row.account_no)
        .bind(&row.currency_code)
        .bind(row.balance)
        .bind(row.amount)
        .bind(row.remarks.as_deref())
        .bind(row.event_time)
        .execute(conn)
        .await?;
        Ok(())
    }

    pub async fn insert_bot_provider(
        conn: &mut PgConnection,
        row: &BotProviderEventRow,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO bot_provider_events (\
                 id, branch_id, adjustment_id, currency_code, delta_amount, \
                 usd_equivalent, remarks, event_time) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(row.id)
        .bind(row.branch_id)
        .bind(row.adjustment_id)
        .bind(&row.currency_code)
        .bind(row.delta_amount)
        .bind(row.usd_equivalent)
        .bind(row.remarks.as_deref())
        .bind(row.event_time)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// FX events of one branch-month, ordered for the workbook
    pub async fn list_bot_fx_month(
        &self,
        form: BotForm,
        branch_id: Uuid,
        window: ReportingWindow,
    ) -> Result<Vec<BotFxEventRow>, DatabaseError> {
        let rows = sqlx::query_as(&format!(
            "SELECT * FROM {} \
             WHERE branch_id = $1 AND event_time >= $2 AND event_time < $3 \
             ORDER BY event_time, id",
            fx_table(form)
        ))
        .bind(branch_id)
        .bind(window.start)
        .bind(window.end)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn list_bot_fcd_month(
        &self,
        branch_id: Uuid,
        window: ReportingWindow,
    ) -> Result<Vec<BotFcdEventRow>, DatabaseError> {
        let rows = sqlx::query_as(
            "SELECT * FROM bot_fcd_events \
             WHERE branch_id = $1 AND event_time >= $2 AND event_time < $3 \
             ORDER BY event_time, id",
        )
        .bind(branch_id)
        .bind(window.start)
        .bind(window.end)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn list_bot_provider_month(
        &self,
        branch_id: Uuid,
        window: ReportingWindow,
    ) -> Result<Vec<BotProviderEventRow>, DatabaseError> {
        let rows = sqlx::query_as(
            "SELECT * FROM bot_provider_events \
             WHERE branch_id = $1 AND event_time >= $2 AND event_time < $3 \
             ORDER BY event_time, id",
        )
        .bind(branch_id)
        .bind(window.start)
        .bind(window.end)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Deletes the month's unreported derived events ahead of a rebuild
    pub async fn delete_bot_month(
        conn: &mut PgConnection,
        branch_id: Uuid,
        window: ReportingWindow,
    ) -> Result<u64, DatabaseError> {
        let mut deleted = 0;
        for table in [
            "bot_buy_fx_events",
            "bot_sell_fx_events",
            "bot_fcd_events",
            "bot_provider_events",
        ] {
            let result = sqlx::query(&format!(
                "DELETE FROM {table} \
                 WHERE branch_id = $1 AND event_time >= $2 AND event_time < $3 \
                   AND is_reported = FALSE",
            ))
            .bind(branch_id)
            .bind(window.start)
            .bind(window.end)
            .execute(&mut *conn)
            .await?;
            deleted += result.rows_affected();
        }
        Ok(deleted)
    }

    /// Flips `is_reported` on every BOT row of the month, all-or-none
    pub async fn mark_bot_month_reported(
        conn: &mut PgConnection,
        branch_id: Uuid,
        window: ReportingWindow,
        at: DateTime<Utc>,
    ) -> Result<u64, DatabaseError> {
        let mut marked = 0;
        for table in [
            "bot_buy_fx_events",
            "bot_sell_fx_events",
            "bot_fcd_events",
            "bot_provider_events",
        ] {
            let result = sqlx::query(&format!(
                "UPDATE {table} SET is_reported = TRUE, reported_at = $3 \
                 WHERE branch_id = $1 AND event_time >= $2 AND event_time < $4 \
                   AND is_reported = FALSE",
            ))
            .bind(branch_id)
            .bind(window.start)
            .bind(at)
            .bind(window.end)
            .execute(&mut *conn)
            .await?;
            marked += result.rows_affected();
        }
        Ok(marked)
    }
}
