//! Transaction log repository
//!
//! The append-only record of executed trades, plus the windowed customer
//! aggregates the rule engine consumes. Aggregates are read with plain
//! read-committed queries on purpose: a peer trade committing just before
//! the read should be included, since the regulator tolerates slight
//! over-reporting far better than under-reporting.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use core_kernel::ReportingWindow;
use domain_compliance::{AggregateScope, CustomerAggregates};

use crate::error::DatabaseError;

/// Database row for an executed trade
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TransactionRow {
    pub id: Uuid,
    pub transaction_no: i64,
    pub branch_id: Uuid,
    pub currency_id: Uuid,
    pub currency_code: String,
    pub direction: String,
    pub foreign_amount: Decimal,
    pub local_amount: Decimal,
    pub rate: Decimal,
    pub customer_id: String,
    pub customer_name: String,
    pub customer_country: String,
    pub executed_at: DateTime<Utc>,
    pub operator_id: Uuid,
    pub business_group_id: Option<Uuid>,
    pub group_sequence: Option<i32>,
    pub amlo_flag: bool,
    pub bot_flag: bool,
    pub fcd_flag: bool,
    pub reversal_of: Option<Uuid>,
}

/// Data for inserting a trade
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub id: Uuid,
    pub branch_id: Uuid,
    pub currency_id: Uuid,
    pub currency_code: String,
    pub direction: String,
    pub foreign_amount: Decimal,
    pub local_amount: Decimal,
    pub rate: Decimal,
    pub customer_id: String,
    pub customer_name: String,
    pub customer_country: String,
    pub executed_at: DateTime<Utc>,
    pub operator_id: Uuid,
    pub business_group_id: Option<Uuid>,
    pub group_sequence: Option<i32>,
    pub reversal_of: Option<Uuid>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct AggregateRow {
    cumulative_30d: Decimal,
    count_24h: i64,
    count_30d: i64,
    last_at: Option<DateTime<Utc>>,
}

/// Repository over the transaction log
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: PgPool,
}

impl TransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Allocates the next per-branch transaction number
    ///
    /// Callers hold the branch's local-currency balance row lock by the
    /// time this runs, which serializes trades within a branch; the unique
    /// `(branch_id, transaction_no)` index backstops the invariant and a
    /// collision surfaces as a retriable duplicate.
    pub async fn next_transaction_no(
        conn: &mut PgConnection,
        branch_id: Uuid,
    ) -> Result<i64, DatabaseError> {
        let (next,): (i64,) = sqlx::query_as(
            "SELECT COALESCE(MAX(transaction_no), 0) + 1 \
             FROM exchange_transactions WHERE branch_id = $1",
        )
        .bind(branch_id)
        .fetch_one(conn)
        .await?;
        Ok(next)
    }

    /// Inserts a trade row inside the caller's transaction
    pub async fn insert(
        conn: &mut PgConnection,
        transaction_no: i64,
        new: &NewTransaction,
    ) -> Result<TransactionRow, DatabaseError> {
        let row = sqlx::query_as(
            "INSERT INTO exchange_transactions (\
                 id, transaction_no, branch_id, currency_id, currency_code, direction, \
                 foreign_amount, local_amount, rate, customer_id, customer_name, \
                 customer_country, executed_at, operator_id, business_group_id, \
                 group_sequence, reversal_of) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17) \
             RETURNING *",
        )
        .bind(new.id)
        .bind(transaction_no)
        .bind(new.branch_id)
        .bind(new.currency_id)
        .bind(&new.currency_code)
        .bind(&new.direction)
        .bind(new.foreign_amount)
        .bind(new.local_amount)
        .bind(new.rate)
        .bind(&new.customer_id)
        .bind(&new.customer_name)
        .bind(&new.customer_country)
        .bind(new.executed_at)
        .bind(new.operator_id)
        .bind(new.business_group_id)
        .bind(new.group_sequence)
        .bind(new.reversal_of)
        .fetch_one(conn)
        .await?;
        Ok(row)
    }

    /// Sets the regulatory flag bits, the only post-commit mutation a
    /// transaction row ever receives
    pub async fn set_flags(
        conn: &mut PgConnection,
        id: Uuid,
        amlo_flag: bool,
        bot_flag: bool,
        fcd_flag: bool,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            "UPDATE exchange_transactions \
             SET amlo_flag = $2, bot_flag = $3, fcd_flag = $4 WHERE id = $1",
        )
        .bind(id)
        .bind(amlo_flag)
        .bind(bot_flag)
        .bind(fcd_flag)
        .execute(conn)
        .await?;
        Ok(())
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<TransactionRow>, DatabaseError> {
        let row = sqlx::query_as("SELECT * FROM exchange_transactions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// All legs of a split order, in group-sequence order
    pub async fn find_by_group(
        &self,
        business_group_id: Uuid,
    ) -> Result<Vec<TransactionRow>, DatabaseError> {
        let rows = sqlx::query_as(
            "SELECT * FROM exchange_transactions \
             WHERE business_group_id = $1 ORDER BY group_sequence",
        )
        .bind(business_group_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Trades of one branch inside a window, oldest first
    pub async fn list_in_window(
        &self,
        branch_id: Uuid,
        window: ReportingWindow,
    ) -> Result<Vec<TransactionRow>, DatabaseError> {
        let rows = sqlx::query_as(
            "SELECT * FROM exchange_transactions \
             WHERE branch_id = $1 AND executed_at >= $2 AND executed_at < $3 \
             ORDER BY executed_at, id",
        )
        .bind(branch_id)
        .bind(window.start)
        .bind(window.end)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Windowed cumulative sums and counts for one customer
    ///
    /// Generic over the executor so the validate path reads through the
    /// pool while the execute path reads inside its own transaction (and
    /// so sees sibling split legs already inserted there). Customers
    /// without an identification string have no meaningful history; they
    /// aggregate to zero.
    pub async fn customer_aggregates<'e, E>(
        executor: E,
        customer_id: &str,
        branch_id: Uuid,
        scope: AggregateScope,
        now: DateTime<Utc>,
    ) -> Result<CustomerAggregates, DatabaseError>
    where
        E: sqlx::PgExecutor<'e>,
    {
        if customer_id.is_empty() {
            return Ok(CustomerAggregates::empty());
        }

        let window_30d = ReportingWindow::trailing_days(now, 30);
        let window_24h = ReportingWindow::trailing_hours(now, 24);

        let base = "SELECT \
                COALESCE(SUM(ABS(local_amount)) FILTER (WHERE executed_at >= $2), 0) AS cumulative_30d, \
                COUNT(*) FILTER (WHERE executed_at >= $3) AS count_24h, \
                COUNT(*) FILTER (WHERE executed_at >= $2) AS count_30d, \
                MAX(executed_at) AS last_at \
             FROM exchange_transactions \
             WHERE customer_id = $1 AND executed_at <= $4";

        let row: AggregateRow = match scope {
            AggregateScope::CrossBranch => {
                sqlx::query_as(base)
                    .bind(customer_id)
                    .bind(window_30d.start)
                    .bind(window_24h.start)
                    .bind(now)
                    .fetch_one(executor)
                    .await?
            }
            AggregateScope::BranchLocal => {
                sqlx::query_as(
                    "SELECT \
                        COALESCE(SUM(ABS(local_amount)) FILTER (WHERE executed_at >= $2), 0) AS cumulative_30d, \
                        COUNT(*) FILTER (WHERE executed_at >= $3) AS count_24h, \
                        COUNT(*) FILTER (WHERE executed_at >= $2) AS count_30d, \
                        MAX(executed_at) AS last_at \
                     FROM exchange_transactions \
                     WHERE customer_id = $1 AND executed_at <= $4 AND branch_id = $5",
                )
                .bind(customer_id)
                .bind(window_30d.start)
                .bind(window_24h.start)
                .bind(now)
                .bind(branch_id)
                .fetch_one(executor)
                .await?
            }
        };

        Ok(CustomerAggregates {
            cumulative_amount_30d: row.cumulative_30d,
            transaction_count_24h: row.count_24h,
            transaction_count_30d: row.count_30d,
            last_transaction_at: row.last_at,
        })
    }
}
