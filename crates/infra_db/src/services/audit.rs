//! Reservation audit workflow
//!
//! Approval is the money moment: the state change and the idempotent
//! report creation (with its freshly allocated number) commit in one
//! transaction, so a crash can never leave an approved reservation without
//! its report, or a report without its approval. Reversing an approval
//! re-opens the reservation but leaves the issued report untouched:
//! numbers, once burned, are never reused, and a re-approval returns the
//! surviving report.

use chrono::{Duration, Utc};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use core_kernel::temporal::bangkok_today;
use core_kernel::{CurrencyCode, ReservationId, YearMonth};
use domain_reservation::{
    Reservation, ReservationError, ReservationStatus, SaveReservation, SaveResult,
};

use crate::error::DatabaseError;
use crate::pool::apply_statement_timeout;
use crate::repositories::{
    master::MasterDataRepository,
    reports::{AmloReportRow, NewAmloReport, ReportRepository},
    reservations::{reservation_from_row, NewReservation, ReservationRepository, ReservationRow},
    rules::RuleRepository,
    sequences::{AllocationContext, SequenceLedger},
};
use crate::services::config::CoreConfig;
use crate::services::ServiceError;

/// Result of an approval
#[derive(Debug, Clone)]
pub struct ApprovalOutcome {
    pub reservation: Reservation,
    pub report: AmloReportRow,
    /// False when a prior approval's report was returned instead of a new
    /// one being minted
    pub report_created: bool,
}

/// The reservation store and audit state machine
#[derive(Debug, Clone)]
pub struct AuditService {
    pool: PgPool,
    config: CoreConfig,
    reservations: ReservationRepository,
    rules: RuleRepository,
    master: MasterDataRepository,
    sequences: SequenceLedger,
}

impl AuditService {
    pub fn new(pool: PgPool, config: CoreConfig) -> Self {
        let sequences = SequenceLedger::new(config.allocator_retry_bound);
        Self {
            reservations: ReservationRepository::new(pool.clone()),
            rules: RuleRepository::new(pool.clone()),
            master: MasterDataRepository::new(pool.clone()),
            sequences,
            pool,
            config,
        }
    }

    /// Persists a new reservation with its number
    ///
    /// The reservation number comes out of the AMLO sequence ledger at
    /// persistence time so the filled form shows it at audit. The form
    /// payload is validated against the report type's field definitions
    /// first, and a double-clicked submission inside the dedup window
    /// returns the already-persisted row.
    pub async fn save_reservation(
        &self,
        req: &SaveReservation,
    ) -> Result<SaveResult, ServiceError> {
        let definitions = self.rules.field_definitions(req.report_type).await?;
        if !definitions.is_empty() {
            domain_reporting::validate_form(&definitions, &req.form_data)?;
        }

        let now = Utc::now();
        let dedup_since = now - Duration::seconds(self.config.reservation_dedup_secs as i64);
        if let Some(existing) = self
            .reservations
            .find_recent_duplicate(&req.customer_id, *req.branch_id.as_uuid(), dedup_since)
            .await?
        {
            info!(reservation_no = %existing.reservation_no, "returning deduplicated reservation");
            return Ok(SaveResult {
                reservation_id: ReservationId::from_uuid(existing.id),
                reservation_no: existing.reservation_no,
                report_id: None,
                report_no: None,
                pdf_path: None,
            });
        }

        let branch = *req.branch_id.as_uuid();
        let codes = self.master.branch_codes(branch).await?;
        let currency = self.master.currency(*req.currency_id.as_uuid()).await?;
        let currency_code = CurrencyCode::new(&currency.code)?;
        let ym = YearMonth::from_instant(now);

        let mut tx = self.pool.begin().await.map_err(DatabaseError::from)?;
        apply_statement_timeout(&mut tx, self.config.statement_timeout()).await?;

        let allocated = self
            .sequences
            .allocate_amlo(
                &mut tx,
                branch,
                &codes,
                currency_code,
                ym,
                req.report_type.code(),
                AllocationContext {
                    transaction_id: None,
                    operator_id: Some(*req.operator_id.as_uuid()),
                },
            )
            .await?;

        let new = NewReservation {
            id: Uuid::new_v4(),
            reservation_no: allocated.number.clone(),
            customer_id: req.customer_id.clone(),
            customer_name: req.customer_name.clone(),
            customer_country: req.customer_country.clone(),
            currency_id: *req.currency_id.as_uuid(),
            direction: req.direction.as_str().to_string(),
            foreign_amount: req.amount,
            local_amount: req.local_amount,
            rate: req.rate,
            trigger_type: req.trigger_type.clone(),
            report_type: req.report_type.code().to_string(),
            branch_id: branch,
            created_by: *req.operator_id.as_uuid(),
            form_data: req.form_data.clone(),
        };
        let row = match ReservationRepository::insert(&mut tx, &new).await {
            Ok(row) => row,
            Err(e) if e.is_duplicate() => {
                // A concurrent retry with this number already persisted it;
                // drop our transaction and return the winner.
                drop(tx);
                let existing = self
                    .reservations
                    .find_by_no(&allocated.number)
                    .await?
                    .ok_or_else(|| DatabaseError::not_found("Reservation", &allocated.number))?;
                return Ok(SaveResult {
                    reservation_id: ReservationId::from_uuid(existing.id),
                    reservation_no: existing.reservation_no,
                    report_id: None,
                    report_no: None,
                    pdf_path: None,
                });
            }
            Err(e) => return Err(e.into()),
        };
        tx.commit().await.map_err(DatabaseError::from)?;

        info!(reservation_no = %row.reservation_no, "reservation saved");
        Ok(SaveResult {
            reservation_id: ReservationId::from_uuid(row.id),
            reservation_no: row.reservation_no,
            report_id: None,
            report_no: None,
            pdf_path: None,
        })
    }

    /// Approves a pending reservation and idempotently issues its report
    pub async fn approve(
        &self,
        reservation_id: Uuid,
        auditor_id: Uuid,
    ) -> Result<ApprovalOutcome, ServiceError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from)?;
        apply_statement_timeout(&mut tx, self.config.statement_timeout()).await?;

        let row = ReservationRepository::lock_by_id(&mut tx, reservation_id)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Reservation", reservation_id))?;
        let mut reservation = reservation_from_row(row.clone())?;
        reservation.approve(core_kernel::OperatorId::from_uuid(auditor_id))?;

        let updated = ReservationRepository::update_status(
            &mut tx,
            reservation_id,
            ReservationStatus::Pending.as_str(),
            ReservationStatus::Approved.as_str(),
            Some(auditor_id),
            Some(now),
            None,
            None,
        )
        .await?;
        if !updated {
            return Err(ReservationError::InvalidStatusTransition {
                from: row.status,
                to: ReservationStatus::Approved.to_string(),
            }
            .into());
        }

        // Idempotent report creation: a report issued by an earlier
        // approval (even one later reversed) is returned as-is.
        let (report, report_created) =
            match ReportRepository::find_amlo_by_reservation(&mut tx, reservation_id).await? {
                Some(existing) => (existing, false),
                None => {
                    let codes = self.master.branch_codes(row.branch_id).await?;
                    let currency = self.master.currency(row.currency_id).await?;
                    let currency_code = CurrencyCode::new(&currency.code)?;
                    let ym = YearMonth::from_instant(now);

                    let allocated = self
                        .sequences
                        .allocate_amlo(
                            &mut tx,
                            row.branch_id,
                            &codes,
                            currency_code,
                            ym,
                            &row.report_type,
                            AllocationContext {
                                transaction_id: row.linked_transaction_id,
                                operator_id: Some(auditor_id),
                            },
                        )
                        .await?;

                    let new = NewAmloReport {
                        id: Uuid::new_v4(),
                        report_no: allocated.number,
                        report_format: row.report_type.clone(),
                        reservation_id,
                        transaction_id: row.linked_transaction_id,
                        customer_id: row.customer_id.clone(),
                        customer_name: row.customer_name.clone(),
                        customer_country: row.customer_country.clone(),
                        amount: row.local_amount,
                        transaction_date: bangkok_today(now),
                        branch_id: row.branch_id,
                        operator_id: auditor_id,
                    };
                    (ReportRepository::insert_amlo(&mut tx, &new).await?, true)
                }
            };

        tx.commit().await.map_err(DatabaseError::from)?;
        info!(
            reservation_no = %reservation.reservation_no,
            report_no = %report.report_no,
            report_created,
            "reservation approved"
        );
        Ok(ApprovalOutcome {
            reservation,
            report,
            report_created,
        })
    }

    /// Rejects a pending reservation with a mandatory reason
    pub async fn reject(
        &self,
        reservation_id: Uuid,
        auditor_id: Uuid,
        reason: &str,
    ) -> Result<Reservation, ServiceError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from)?;
        apply_statement_timeout(&mut tx, self.config.statement_timeout()).await?;

        let row = ReservationRepository::lock_by_id(&mut tx, reservation_id)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Reservation", reservation_id))?;
        let mut reservation = reservation_from_row(row.clone())?;
        reservation.reject(core_kernel::OperatorId::from_uuid(auditor_id), reason)?;

        let updated = ReservationRepository::update_status(
            &mut tx,
            reservation_id,
            ReservationStatus::Pending.as_str(),
            ReservationStatus::Rejected.as_str(),
            Some(auditor_id),
            Some(now),
            Some(reason),
            None,
        )
        .await?;
        if !updated {
            return Err(ReservationError::InvalidStatusTransition {
                from: row.status,
                to: ReservationStatus::Rejected.to_string(),
            }
            .into());
        }

        tx.commit().await.map_err(DatabaseError::from)?;
        Ok(reservation)
    }

    /// Re-opens an approved or rejected reservation
    ///
    /// Fails on completed reservations. An already-issued report keeps its
    /// number and stays linked; only the reservation state re-opens.
    pub async fn reverse(&self, reservation_id: Uuid) -> Result<Reservation, ServiceError> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from)?;
        apply_statement_timeout(&mut tx, self.config.statement_timeout()).await?;

        let row = ReservationRepository::lock_by_id(&mut tx, reservation_id)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Reservation", reservation_id))?;
        let mut reservation = reservation_from_row(row.clone())?;
        reservation.reverse()?;

        let updated = ReservationRepository::update_status(
            &mut tx,
            reservation_id,
            &row.status,
            ReservationStatus::Pending.as_str(),
            None,
            None,
            None,
            None,
        )
        .await?;
        if !updated {
            return Err(ReservationError::InvalidStatusTransition {
                from: row.status,
                to: ReservationStatus::Pending.to_string(),
            }
            .into());
        }

        tx.commit().await.map_err(DatabaseError::from)?;
        info!(reservation_no = %reservation.reservation_no, "audit decision reversed");
        Ok(reservation)
    }

    /// Cancels a pending reservation
    pub async fn cancel(&self, reservation_id: Uuid) -> Result<Reservation, ServiceError> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from)?;
        apply_statement_timeout(&mut tx, self.config.statement_timeout()).await?;

        let row = ReservationRepository::lock_by_id(&mut tx, reservation_id)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Reservation", reservation_id))?;
        let mut reservation = reservation_from_row(row.clone())?;
        reservation.cancel()?;

        let updated = ReservationRepository::update_status(
            &mut tx,
            reservation_id,
            ReservationStatus::Pending.as_str(),
            ReservationStatus::Cancelled.as_str(),
            None,
            None,
            None,
            None,
        )
        .await?;
        if !updated {
            return Err(ReservationError::InvalidStatusTransition {
                from: row.status,
                to: ReservationStatus::Cancelled.to_string(),
            }
            .into());
        }

        tx.commit().await.map_err(DatabaseError::from)?;
        Ok(reservation)
    }

    /// Reservations waiting for an audit decision at a branch
    pub async fn pending(&self, branch_id: Uuid) -> Result<Vec<ReservationRow>, ServiceError> {
        Ok(self.reservations.list_pending(branch_id).await?)
    }
}
