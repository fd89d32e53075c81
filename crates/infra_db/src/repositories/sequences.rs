//! Sequence ledgers and report-number allocation
//!
//! One ledger row per (branch, key, year-month) where the key is the
//! currency code for AMLO and the report type for BOT. Allocation runs
//! entirely inside the caller's transaction and never commits: the caller
//! commits the increment together with the report insert, so a crashed
//! filing rolls the number back and leaves no gap.
//!
//! The protocol per allocation:
//! 1. `SELECT ... FOR UPDATE` the ledger row.
//! 2. If absent, insert it at zero; a concurrent allocator winning the
//!    insert is detected and the select is retried.
//! 3. Under the lock, increment `last_sequence` and stamp `last_used_at`.
//! 4. Compose the number and append a row to the allocation log.

use sqlx::PgConnection;
use tracing::warn;
use uuid::Uuid;

use core_kernel::{CurrencyCode, YearMonth};
use domain_reporting::{BranchCodes, ReportNumber};

use crate::error::DatabaseError;

/// Outcome of one allocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocatedNumber {
    pub number: String,
    pub sequence: u32,
    pub sequence_row_id: Uuid,
}

/// Extra context recorded in the allocation log
#[derive(Debug, Clone, Copy, Default)]
pub struct AllocationContext {
    pub transaction_id: Option<Uuid>,
    pub operator_id: Option<Uuid>,
}

/// The two sequence ledgers
#[derive(Debug, Clone)]
pub struct SequenceLedger {
    /// Bound on insert-race retries before giving up with
    /// `SequenceContention`
    retry_bound: u32,
}

impl SequenceLedger {
    pub fn new(retry_bound: u32) -> Self {
        Self { retry_bound }
    }

    /// Allocates the next AMLO number for (branch, currency, month)
    pub async fn allocate_amlo(
        &self,
        conn: &mut PgConnection,
        branch_id: Uuid,
        codes: &BranchCodes,
        currency: CurrencyCode,
        ym: YearMonth,
        report_type: &str,
        context: AllocationContext,
    ) -> Result<AllocatedNumber, DatabaseError> {
        let (row_id, sequence) = self
            .next_sequence(
                conn,
                "amlo_sequences",
                "currency_code",
                branch_id,
                currency.as_str(),
                ym,
            )
            .await?;

        let number = ReportNumber::compose_amlo(codes, ym, sequence, currency)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?;
        self.log_allocation(
            conn,
            &number,
            report_type,
            branch_id,
            Some(currency.as_str()),
            row_id,
            context,
        )
        .await?;

        Ok(AllocatedNumber {
            number,
            sequence,
            sequence_row_id: row_id,
        })
    }

    /// Allocates the next BOT number for (branch, report-type, month)
    pub async fn allocate_bot(
        &self,
        conn: &mut PgConnection,
        branch_id: Uuid,
        codes: &BranchCodes,
        report_type: &str,
        ym: YearMonth,
        context: AllocationContext,
    ) -> Result<AllocatedNumber, DatabaseError> {
        let (row_id, sequence) = self
            .next_sequence(
                conn,
                "bot_sequences",
                "report_type",
                branch_id,
                report_type,
                ym,
            )
            .await?;

        let number = ReportNumber::compose_bot(codes, ym, sequence)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?;
        self.log_allocation(conn, &number, report_type, branch_id, None, row_id, context)
            .await?;

        Ok(AllocatedNumber {
            number,
            sequence,
            sequence_row_id: row_id,
        })
    }

    /// Locks (creating if needed) the ledger row and increments it
    async fn next_sequence(
        &self,
        conn: &mut PgConnection,
        table: &str,
        key_column: &str,
        branch_id: Uuid,
        key: &str,
        ym: YearMonth,
    ) -> Result<(Uuid, u32), DatabaseError> {
        let ym_text = ym.to_string();

        for attempt in 0..self.retry_bound {
            let locked: Option<(Uuid, i32)> = sqlx::query_as(&format!(
                "SELECT id, last_sequence FROM {table} \
                 WHERE branch_id = $1 AND {key_column} = $2 AND year_month = $3 \
                 FOR UPDATE",
            ))
            .bind(branch_id)
            .bind(key)
            .bind(&ym_text)
            .fetch_optional(&mut *conn)
            .await?;

            let (row_id, last) = match locked {
                Some(found) => found,
                None => {
                    // First allocation this month: create the row at zero.
                    // A concurrent allocator may win the insert; detected
                    // by the conflict clause, in which case we loop back
                    // to the locking select.
                    let inserted: Option<(Uuid,)> = sqlx::query_as(&format!(
                        "INSERT INTO {table} (id, branch_id, {key_column}, year_month, last_sequence) \
                         VALUES ($1, $2, $3, $4, 0) \
                         ON CONFLICT (branch_id, {key_column}, year_month) DO NOTHING \
                         RETURNING id",
                    ))
                    .bind(Uuid::new_v4())
                    .bind(branch_id)
                    .bind(key)
                    .bind(&ym_text)
                    .fetch_optional(&mut *conn)
                    .await?;

                    match inserted {
                        // Freshly inserted row is exclusively ours until commit
                        Some((id,)) => (id, 0),
                        None => {
                            warn!(
                                table,
                                key,
                                attempt,
                                "lost sequence-row insert race, retrying lock"
                            );
                            continue;
                        }
                    }
                }
            };

            let next = last + 1;
            sqlx::query(&format!(
                "UPDATE {table} SET last_sequence = $2, last_used_at = now() WHERE id = $1",
            ))
            .bind(row_id)
            .bind(next)
            .execute(&mut *conn)
            .await?;

            return Ok((row_id, next as u32));
        }

        Err(DatabaseError::SequenceContention(format!(
            "{table} ({branch_id}, {key}, {ym_text})"
        )))
    }

    async fn log_allocation(
        &self,
        conn: &mut PgConnection,
        number: &str,
        report_type: &str,
        branch_id: Uuid,
        currency_code: Option<&str>,
        sequence_row_id: Uuid,
        context: AllocationContext,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO report_number_log (\
                 id, report_number, report_type, branch_id, currency_code, \
                 sequence_row_id, transaction_id, operator_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(Uuid::new_v4())
        .bind(number)
        .bind(report_type)
        .bind(branch_id)
        .bind(currency_code)
        .bind(sequence_row_id)
        .bind(context.transaction_id)
        .bind(context.operator_id)
        .execute(conn)
        .await?;
        Ok(())
    }
}

impl Default for SequenceLedger {
    fn default() -> Self {
        Self::new(5)
    }
}
