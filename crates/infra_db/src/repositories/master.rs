//! Master-data lookups
//!
//! Branches and currencies are administered by an external system; the
//! core only reads them. Branch rows carry the regulatory identity used to
//! compose report numbers and the BOT workbook header.

use sqlx::PgPool;
use uuid::Uuid;

use domain_reporting::BranchCodes;

use crate::error::DatabaseError;

/// Database row for a currency
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CurrencyRow {
    pub id: Uuid,
    pub code: String,
    pub name_en: String,
    pub name_th: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct BranchRow {
    institution_code: String,
    branch_code: String,
    bot_sender_code: String,
    bot_branch_area_code: String,
    license_no: String,
    license_holder: String,
    branch_name: String,
}

/// Read-only repository over the master-data tables
#[derive(Debug, Clone)]
pub struct MasterDataRepository {
    pool: PgPool,
}

impl MasterDataRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Loads the regulatory identity of a branch
    pub async fn branch_codes(&self, branch_id: Uuid) -> Result<BranchCodes, DatabaseError> {
        let row: BranchRow = sqlx::query_as(
            "SELECT institution_code, branch_code, bot_sender_code, bot_branch_area_code, \
                    license_no, license_holder, branch_name \
             FROM branches WHERE id = $1",
        )
        .bind(branch_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Branch", branch_id))?;

        Ok(BranchCodes {
            institution_code: row.institution_code.trim().to_string(),
            branch_code: row.branch_code.trim().to_string(),
            bot_sender_code: row.bot_sender_code,
            bot_branch_area_code: row.bot_branch_area_code,
            license_no: row.license_no,
            license_holder: row.license_holder,
            branch_name: row.branch_name,
        })
    }

    /// Looks up a currency by id
    pub async fn currency(&self, currency_id: Uuid) -> Result<CurrencyRow, DatabaseError> {
        sqlx::query_as("SELECT id, code, name_en, name_th FROM currencies WHERE id = $1")
            .bind(currency_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Currency", currency_id))
    }

    /// Looks up a currency by ISO code
    pub async fn currency_by_code(&self, code: &str) -> Result<CurrencyRow, DatabaseError> {
        sqlx::query_as("SELECT id, code, name_en, name_th FROM currencies WHERE code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Currency", code))
    }
}
