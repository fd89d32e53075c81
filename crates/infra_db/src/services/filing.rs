//! Filing drivers
//!
//! Rendering is best-effort after the fact: a report row without its PDF
//! is a valid state that a retry pass recovers, and the monthly BOT
//! workbook can always be re-derived because the event rows are
//! reconstructible from the transaction log. The one hard rule is the
//! reported flag: it flips batch-wise in the same transaction that
//! observed a successful render, all-or-none.

use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use std::path::PathBuf;
use tracing::{info, warn};
use uuid::Uuid;

use core_kernel::{CurrencyCode, ReportingWindow, YearMonth};
use domain_compliance::{BotForm, ReportType};
use domain_exchange::TradeDirection;
use domain_reporting::{
    AmloPdfGenerator, AmloReport, BotClassifier, BotExcelGenerator, BotFcdEvent, BotFxEvent,
    BotMonthData, CustomerTypeCode, IdType,
};

use crate::error::DatabaseError;
use crate::pool::apply_statement_timeout;
use crate::repositories::{
    balances::BalanceRepository,
    master::MasterDataRepository,
    rates::RateRepository,
    reports::{
        AmloReportRow, BotFcdEventRow, BotFxEventRow, BotProviderEventRow, ReportRepository,
    },
    reservations::ReservationRepository,
    transactions::TransactionRepository,
};
use crate::services::config::CoreConfig;
use crate::services::ServiceError;

/// Drives the AMLO PDF and BOT workbook generators against the registry
#[derive(Debug, Clone)]
pub struct FilingService {
    pool: PgPool,
    config: CoreConfig,
    reports: ReportRepository,
    reservations: ReservationRepository,
    transactions: TransactionRepository,
    balances: BalanceRepository,
    rates: RateRepository,
    master: MasterDataRepository,
    pdf: AmloPdfGenerator,
    excel: BotExcelGenerator,
    classifier: BotClassifier,
}

impl FilingService {
    pub fn new(pool: PgPool, config: CoreConfig) -> Self {
        let pdf = AmloPdfGenerator::new(
            config.amlo_template_dir.clone(),
            config.amlo_output_dir(),
        );
        let excel = BotExcelGenerator::new(
            config.bot_template_path.clone(),
            config.bot_output_root(),
        );
        let classifier = BotClassifier::new(
            config.provider_threshold_usd,
            config.usd_fallback_rate,
        );
        Self {
            reports: ReportRepository::new(pool.clone()),
            reservations: ReservationRepository::new(pool.clone()),
            transactions: TransactionRepository::new(pool.clone()),
            balances: BalanceRepository::new(pool.clone()),
            rates: RateRepository::new(pool.clone()),
            master: MasterDataRepository::new(pool.clone()),
            pdf,
            excel,
            classifier,
            pool,
            config,
        }
    }

    /// Renders (or re-renders) the PDF for one AMLO report
    ///
    /// The artifact path lands on the report row only after a successful
    /// render; failures leave it unset for the retry pass.
    pub async fn render_amlo(&self, report_id: Uuid) -> Result<PathBuf, ServiceError> {
        let row = self
            .reports
            .find_amlo_by_id(report_id)
            .await?
            .ok_or_else(|| DatabaseError::not_found("AMLO report", report_id))?;
        let reservation = self
            .reservations
            .find_by_id(row.reservation_id)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Reservation", row.reservation_id))?;

        let report = amlo_report_from_row(&row)?;
        let path = self.pdf.render(&report, &reservation.form_data)?;

        self.reports
            .set_amlo_pdf_path(report_id, &path.to_string_lossy())
            .await?;
        info!(report_no = %row.report_no, path = %path.display(), "AMLO PDF rendered");
        Ok(path)
    }

    /// Renders every report of a branch-month that still lacks its PDF
    pub async fn render_amlo_retry_pass(
        &self,
        branch_id: Uuid,
        ym: YearMonth,
    ) -> Result<usize, ServiceError> {
        let window = ReportingWindow::for_month(ym);
        let rows = self.reports.list_amlo_month(branch_id, window, None).await?;
        let mut rendered = 0;
        for row in rows.iter().filter(|r| r.pdf_path.is_none()) {
            match self.render_amlo(row.id).await {
                Ok(_) => rendered += 1,
                Err(e) => warn!(report_no = %row.report_no, error = %e, "render retry failed"),
            }
        }
        Ok(rendered)
    }

    /// Produces the monthly BOT workbook and marks its rows reported
    ///
    /// One writer per (branch, month): concurrent runs serialize on a
    /// transaction-scoped advisory lock. The mark happens in the same
    /// transaction that held the lock, after the workbook hit disk.
    pub async fn render_bot_month(
        &self,
        branch_id: Uuid,
        ym: YearMonth,
    ) -> Result<PathBuf, ServiceError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from)?;
        apply_statement_timeout(&mut tx, self.config.statement_timeout()).await?;
        advisory_lock_month(&mut tx, branch_id, ym).await?;

        let window = ReportingWindow::for_month(ym);
        let codes = self.master.branch_codes(branch_id).await?;
        let buy = self
            .reports
            .list_bot_fx_month(BotForm::BuyFx, branch_id, window)
            .await?;
        let sell = self
            .reports
            .list_bot_fx_month(BotForm::SellFx, branch_id, window)
            .await?;
        let fcd = self.reports.list_bot_fcd_month(branch_id, window).await?;

        let data = BotMonthData {
            codes,
            ym,
            buy_fx: buy.iter().map(fx_event_from_row).collect::<Result<_, _>>()?,
            sell_fx: sell.iter().map(fx_event_from_row).collect::<Result<_, _>>()?,
            fcd: fcd.iter().map(fcd_event_from_row).collect::<Result<_, _>>()?,
        };
        let path = self.excel.render(&data)?;

        let marked = ReportRepository::mark_bot_month_reported(&mut tx, branch_id, window, now)
            .await?;
        tx.commit().await.map_err(DatabaseError::from)?;

        info!(
            month = %ym,
            marked,
            path = %path.display(),
            "BOT monthly workbook filed"
        );
        Ok(path)
    }

    /// Marks a batch of AMLO reports as delivered, all-or-none
    pub async fn mark_amlo_reported(&self, ids: &[Uuid]) -> Result<(), ServiceError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from)?;
        apply_statement_timeout(&mut tx, self.config.statement_timeout()).await?;
        ReportRepository::mark_amlo_reported(&mut tx, ids, now).await?;
        tx.commit().await.map_err(DatabaseError::from)?;
        Ok(())
    }

    /// Re-derives the month's BOT event rows from the transaction log
    ///
    /// Deletes the month's unreported rows and replays the classifier over
    /// every trade and adjustment in the window. Reproduces the same rows
    /// modulo timestamps, which is what makes the event tables disposable
    /// derived data.
    pub async fn rebuild_bot_month(
        &self,
        branch_id: Uuid,
        ym: YearMonth,
    ) -> Result<u64, ServiceError> {
        let now = Utc::now();
        let window = ReportingWindow::for_month(ym);
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from)?;
        apply_statement_timeout(&mut tx, self.config.statement_timeout()).await?;
        advisory_lock_month(&mut tx, branch_id, ym).await?;

        let deleted = ReportRepository::delete_bot_month(&mut tx, branch_id, window).await?;

        let trades = self.transactions.list_in_window(branch_id, window).await?;
        let mut inserted: u64 = 0;
        for trade in trades.iter().filter(|t| t.reversal_of.is_none()) {
            let direction = TradeDirection::parse(&trade.direction)
                .map_err(|e| DatabaseError::SerializationError(e.to_string()))?;
            let form = match direction {
                TradeDirection::Buy => BotForm::BuyFx,
                TradeDirection::Sell => BotForm::SellFx,
            };
            let id_type = IdType::infer(&trade.customer_id);
            let usd_rate = self
                .rates
                .usd_rate_for(branch_id, trade.executed_at.date_naive())
                .await?
                .map(|r| r.sell_rate);
            let code = CurrencyCode::new(trade.currency_code.trim())
                .map_err(|e| DatabaseError::SerializationError(e.to_string()))?;
            let usd_equivalent = self.classifier.usd_equivalent(
                code,
                trade.foreign_amount.abs(),
                trade.rate,
                usd_rate,
            );

            let row = BotFxEventRow {
                id: Uuid::new_v4(),
                branch_id,
                transaction_id: trade.id,
                customer_type: CustomerTypeCode::from_id_type(id_type).as_str().to_string(),
                customer_name: trade.customer_name.clone(),
                id_type: id_type.code().to_string(),
                id_number: trade.customer_id.clone(),
                country_code: trade.customer_country.clone(),
                currency_code: trade.currency_code.trim().to_string(),
                rate: trade.rate,
                foreign_amount: trade.foreign_amount.abs(),
                local_amount: trade.local_amount.abs(),
                usd_equivalent,
                payment_method: "CASH".to_string(),
                remarks: None,
                event_time: trade.executed_at,
                is_reported: false,
                reported_at: None,
                created_at: now,
            };
            ReportRepository::insert_bot_fx(&mut tx, form, &row).await?;
            inserted += 1;
        }

        let adjustments = self
            .balances
            .list_adjustments_in_window(branch_id, window.start, window.end)
            .await?;
        for adjustment in adjustments {
            let currency = self.master.currency(adjustment.currency_id).await?;
            let code = CurrencyCode::new(&currency.code)
                .map_err(|e| DatabaseError::SerializationError(e.to_string()))?;
            let date = adjustment.adjusted_at.date_naive();
            let currency_rate = self
                .rates
                .rate_for(branch_id, adjustment.currency_id, date)
                .await?
                .map(|r| r.buy_rate)
                .unwrap_or(rust_decimal::Decimal::ONE);
            let usd_rate = self
                .rates
                .usd_rate_for(branch_id, date)
                .await?
                .map(|r| r.sell_rate);

            if let Some(usd_equivalent) =
                self.classifier
                    .classify_adjustment(code, adjustment.delta, currency_rate, usd_rate)
            {
                let event = BotProviderEventRow {
                    id: Uuid::new_v4(),
                    branch_id,
                    adjustment_id: adjustment.id,
                    currency_code: currency.code,
                    delta_amount: adjustment.delta,
                    usd_equivalent,
                    remarks: adjustment.remarks,
                    event_time: adjustment.adjusted_at,
                    is_reported: false,
                    reported_at: None,
                    created_at: now,
                };
                ReportRepository::insert_bot_provider(&mut tx, &event).await?;
                inserted += 1;
            }
        }

        tx.commit().await.map_err(DatabaseError::from)?;
        info!(month = %ym, deleted, inserted, "BOT month rebuilt from the transaction log");
        Ok(inserted)
    }
}

/// Serializes writers of one (branch, month) output path
async fn advisory_lock_month(
    conn: &mut PgConnection,
    branch_id: Uuid,
    ym: YearMonth,
) -> Result<(), DatabaseError> {
    let branch_key = i64::from_le_bytes(
        branch_id.as_bytes()[..8]
            .try_into()
            .unwrap_or([0u8; 8]),
    );
    let month_key = i64::from(ym.year) * 100 + i64::from(ym.month);
    sqlx::query("SELECT pg_advisory_xact_lock($1, $2)")
        .bind((branch_key % i64::from(i32::MAX)) as i32)
        .bind((month_key % i64::from(i32::MAX)) as i32)
        .execute(conn)
        .await?;
    Ok(())
}

fn amlo_report_from_row(row: &AmloReportRow) -> Result<AmloReport, DatabaseError> {
    Ok(AmloReport {
        id: core_kernel::AmloReportId::from_uuid(row.id),
        report_no: row.report_no.clone(),
        report_format: ReportType::parse(&row.report_format)
            .map_err(|e| DatabaseError::SerializationError(e.to_string()))?,
        reservation_id: core_kernel::ReservationId::from_uuid(row.reservation_id),
        transaction_id: row.transaction_id.map(core_kernel::TransactionId::from_uuid),
        customer_id: row.customer_id.clone(),
        customer_name: row.customer_name.clone(),
        customer_country: row.customer_country.clone(),
        amount: row.amount,
        transaction_date: row.transaction_date,
        pdf_path: row.pdf_path.clone().map(PathBuf::from),
        is_reported: row.is_reported,
        reported_at: row.reported_at,
        branch_id: core_kernel::BranchId::from_uuid(row.branch_id),
        operator_id: core_kernel::OperatorId::from_uuid(row.operator_id),
        created_at: row.created_at,
    })
}

fn fx_event_from_row(row: &BotFxEventRow) -> Result<BotFxEvent, DatabaseError> {
    Ok(BotFxEvent {
        id: core_kernel::BotEventId::from_uuid(row.id),
        branch_id: core_kernel::BranchId::from_uuid(row.branch_id),
        transaction_id: core_kernel::TransactionId::from_uuid(row.transaction_id),
        customer_type: customer_type_from_code(&row.customer_type),
        customer_name: row.customer_name.clone(),
        id_type: id_type_from_code(&row.id_type),
        id_number: row.id_number.clone(),
        country_code: row.country_code.clone(),
        currency_code: CurrencyCode::new(row.currency_code.trim())
            .map_err(|e| DatabaseError::SerializationError(e.to_string()))?,
        rate: row.rate,
        foreign_amount: row.foreign_amount,
        local_amount: row.local_amount,
        usd_equivalent: row.usd_equivalent,
        payment_method: row.payment_method.clone(),
        remarks: row.remarks.clone(),
        event_time: row.event_time,
        is_reported: row.is_reported,
        reported_at: row.reported_at,
        created_at: row.created_at,
    })
}

fn fcd_event_from_row(row: &BotFcdEventRow) -> Result<BotFcdEvent, DatabaseError> {
    Ok(BotFcdEvent {
        id: core_kernel::BotEventId::from_uuid(row.id),
        branch_id: core_kernel::BranchId::from_uuid(row.branch_id),
        transaction_id: core_kernel::TransactionId::from_uuid(row.transaction_id),
        event_date: row.event_date,
        bank_name: row.bank_name.clone(),
        account_no: row.account_no.clone(),
        currency_code: CurrencyCode::new(row.currency_code.trim())
            .map_err(|e| DatabaseError::SerializationError(e.to_string()))?,
        balance: row.balance,
        amount: row.amount,
        remarks: row.remarks.clone(),
        event_time: row.event_time,
        is_reported: row.is_reported,
        reported_at: row.reported_at,
        created_at: row.created_at,
    })
}

fn customer_type_from_code(code: &str) -> CustomerTypeCode {
    match code {
        "120" => CustomerTypeCode::LegalEntity,
        "210" => CustomerTypeCode::IndividualNonResident,
        _ => CustomerTypeCode::IndividualResident,
    }
}

fn id_type_from_code(code: &str) -> IdType {
    match code {
        "2" => IdType::Passport,
        "3" => IdType::CorporateRegistration,
        _ => IdType::ThaiCitizenId,
    }
}
