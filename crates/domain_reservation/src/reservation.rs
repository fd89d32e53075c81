//! Reservation aggregate and audit state machine
//!
//! ```text
//! pending ──approve──▶ approved ──consume──▶ completed
//!    │
//!    └──reject──▶ rejected
//! approved/rejected ──reverse──▶ pending   (undo within retention window)
//! pending ──cancel──▶ cancelled
//! ```
//!
//! Reversing an approval does not delete the already-issued report: numbers,
//! once burned, are never reused. Only the reservation state re-opens.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use core_kernel::{BranchId, CurrencyId, OperatorId, ReservationId, TransactionId};
use domain_compliance::ReportType;
use domain_exchange::TradeDirection;

use crate::error::ReservationError;

/// Reservation lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
    Cancelled,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Approved => "approved",
            ReservationStatus::Rejected => "rejected",
            ReservationStatus::Completed => "completed",
            ReservationStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ReservationError> {
        match s {
            "pending" => Ok(ReservationStatus::Pending),
            "approved" => Ok(ReservationStatus::Approved),
            "rejected" => Ok(ReservationStatus::Rejected),
            "completed" => Ok(ReservationStatus::Completed),
            "cancelled" => Ok(ReservationStatus::Cancelled),
            other => Err(ReservationError::NotFound(format!(
                "unknown reservation status '{other}'"
            ))),
        }
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Checks the audit state-machine transition table
pub fn can_transition(from: ReservationStatus, to: ReservationStatus) -> bool {
    use ReservationStatus::*;
    matches!(
        (from, to),
        (Pending, Approved)
            | (Pending, Rejected)
            | (Pending, Cancelled)
            | (Approved, Completed)
            | (Approved, Pending)
            | (Rejected, Pending)
    )
}

/// A pre-approval envelope for a rule-triggered trade
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    /// Shares the AMLO report-number namespace; allocated at persistence
    /// so the number is visible on the filled form at audit time
    pub reservation_no: String,
    pub customer_id: String,
    pub customer_name: String,
    pub customer_country: String,
    pub currency_id: CurrencyId,
    pub direction: TradeDirection,
    /// Proposed foreign amount
    pub foreign_amount: Decimal,
    /// The approved envelope: consumption must stay at or below this
    pub local_amount: Decimal,
    pub rate: Decimal,
    /// Which rule family tripped, e.g. a threshold or cumulative trigger
    pub trigger_type: String,
    pub report_type: ReportType,
    pub status: ReservationStatus,
    pub branch_id: BranchId,
    /// Operator who keyed the reservation
    pub created_by: OperatorId,
    pub auditor_id: Option<OperatorId>,
    pub audit_time: Option<DateTime<Utc>>,
    pub reject_reason: Option<String>,
    /// The full filled report form, schema-driven per report type
    pub form_data: Value,
    pub linked_transaction_id: Option<TransactionId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    fn transition(&mut self, to: ReservationStatus) -> Result<(), ReservationError> {
        if !can_transition(self.status, to) {
            return Err(ReservationError::InvalidStatusTransition {
                from: self.status.to_string(),
                to: to.to_string(),
            });
        }
        self.status = to;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Approves a pending reservation
    ///
    /// The caller creates the AMLO report in the same database transaction;
    /// see the audit service.
    pub fn approve(&mut self, auditor_id: OperatorId) -> Result<(), ReservationError> {
        self.transition(ReservationStatus::Approved)?;
        self.auditor_id = Some(auditor_id);
        self.audit_time = Some(Utc::now());
        self.reject_reason = None;
        Ok(())
    }

    /// Rejects a pending reservation with a mandatory reason
    pub fn reject(
        &mut self,
        auditor_id: OperatorId,
        reason: &str,
    ) -> Result<(), ReservationError> {
        if reason.trim().is_empty() {
            return Err(ReservationError::EmptyRejectionReason);
        }
        self.transition(ReservationStatus::Rejected)?;
        self.auditor_id = Some(auditor_id);
        self.audit_time = Some(Utc::now());
        self.reject_reason = Some(reason.to_string());
        Ok(())
    }

    /// Consumes the approved envelope with an executed trade
    ///
    /// `actual_local` is the executed trade's absolute local amount; it must
    /// fit inside the approved envelope. An approved reservation is consumed
    /// at most once: the transition to `completed` guards re-consumption.
    pub fn consume(
        &mut self,
        transaction_id: TransactionId,
        actual_local: Decimal,
    ) -> Result<(), ReservationError> {
        if self.status == ReservationStatus::Completed {
            return Err(ReservationError::AlreadyConsumed);
        }
        if actual_local > self.local_amount {
            return Err(ReservationError::AmountExceedsApproved {
                approved: self.local_amount,
                requested: actual_local,
            });
        }
        self.transition(ReservationStatus::Completed)?;
        self.linked_transaction_id = Some(transaction_id);
        self.audit_time = Some(Utc::now());
        Ok(())
    }

    /// Re-opens an approved or rejected reservation
    ///
    /// Completed reservations are final. An already-issued report survives
    /// the reversal with its number; re-approval returns it.
    pub fn reverse(&mut self) -> Result<(), ReservationError> {
        if self.status == ReservationStatus::Completed {
            return Err(ReservationError::AlreadyConsumed);
        }
        self.transition(ReservationStatus::Pending)?;
        self.auditor_id = None;
        self.audit_time = None;
        self.reject_reason = None;
        Ok(())
    }

    /// Cancels a pending reservation
    pub fn cancel(&mut self) -> Result<(), ReservationError> {
        self.transition(ReservationStatus::Cancelled)
    }

    /// True when this reservation's envelope can cover `local_amount`
    pub fn covers(&self, local_amount: Decimal) -> bool {
        self.status == ReservationStatus::Approved && local_amount <= self.local_amount
    }
}

/// Inbound contract for creating a reservation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveReservation {
    pub customer_id: String,
    pub customer_name: String,
    pub customer_country: String,
    pub currency_id: CurrencyId,
    pub direction: TradeDirection,
    pub amount: Decimal,
    pub local_amount: Decimal,
    pub rate: Decimal,
    pub trigger_type: String,
    pub report_type: ReportType,
    pub form_data: Value,
    pub exchange_type: Option<String>,
    pub funding_source: Option<String>,
    pub branch_id: BranchId,
    pub operator_id: OperatorId,
}

/// Outcome of persisting a reservation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveResult {
    pub reservation_id: ReservationId,
    pub reservation_no: String,
    pub report_id: Option<core_kernel::AmloReportId>,
    pub report_no: Option<String>,
    pub pdf_path: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    pub(crate) fn pending_reservation() -> Reservation {
        let now = Utc::now();
        Reservation {
            id: ReservationId::new(),
            reservation_no: "001-001-68-100001USD".to_string(),
            customer_id: "1234567890123".to_string(),
            customer_name: "Test Customer".to_string(),
            customer_country: "TH".to_string(),
            currency_id: CurrencyId::new(),
            direction: TradeDirection::Buy,
            foreign_amount: dec!(70000),
            local_amount: dec!(2500000),
            rate: dec!(35.71),
            trigger_type: "threshold".to_string(),
            report_type: ReportType::Amlo101,
            status: ReservationStatus::Pending,
            branch_id: BranchId::new(),
            created_by: OperatorId::new(),
            auditor_id: None,
            audit_time: None,
            reject_reason: None,
            form_data: json!({}),
            linked_transaction_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_approve_sets_auditor() {
        let mut r = pending_reservation();
        let auditor = OperatorId::new();
        r.approve(auditor).unwrap();

        assert_eq!(r.status, ReservationStatus::Approved);
        assert_eq!(r.auditor_id, Some(auditor));
        assert!(r.audit_time.is_some());
    }

    #[test]
    fn test_reject_requires_reason() {
        let mut r = pending_reservation();
        assert!(matches!(
            r.reject(OperatorId::new(), "  "),
            Err(ReservationError::EmptyRejectionReason)
        ));
        r.reject(OperatorId::new(), "identity document expired").unwrap();
        assert_eq!(r.status, ReservationStatus::Rejected);
        assert_eq!(
            r.reject_reason.as_deref(),
            Some("identity document expired")
        );
    }

    #[test]
    fn test_consume_within_envelope() {
        let mut r = pending_reservation();
        r.approve(OperatorId::new()).unwrap();

        let txn = TransactionId::new();
        r.consume(txn, dec!(2499999)).unwrap();
        assert_eq!(r.status, ReservationStatus::Completed);
        assert_eq!(r.linked_transaction_id, Some(txn));
    }

    #[test]
    fn test_consume_over_envelope_rejected() {
        let mut r = pending_reservation();
        r.approve(OperatorId::new()).unwrap();

        let err = r.consume(TransactionId::new(), dec!(2500001)).unwrap_err();
        assert!(matches!(
            err,
            ReservationError::AmountExceedsApproved { approved, requested }
                if approved == dec!(2500000) && requested == dec!(2500001)
        ));
        // Envelope intact after the failed consume
        assert_eq!(r.status, ReservationStatus::Approved);
    }

    #[test]
    fn test_consume_exact_envelope_allowed() {
        let mut r = pending_reservation();
        r.approve(OperatorId::new()).unwrap();
        r.consume(TransactionId::new(), dec!(2500000)).unwrap();
        assert_eq!(r.status, ReservationStatus::Completed);
    }

    #[test]
    fn test_consume_twice_fails() {
        let mut r = pending_reservation();
        r.approve(OperatorId::new()).unwrap();
        r.consume(TransactionId::new(), dec!(1000)).unwrap();

        assert!(matches!(
            r.consume(TransactionId::new(), dec!(1000)),
            Err(ReservationError::AlreadyConsumed)
        ));
    }

    #[test]
    fn test_reverse_reopens_approved_and_rejected() {
        let mut approved = pending_reservation();
        approved.approve(OperatorId::new()).unwrap();
        approved.reverse().unwrap();
        assert_eq!(approved.status, ReservationStatus::Pending);
        assert!(approved.auditor_id.is_none());

        let mut rejected = pending_reservation();
        rejected.reject(OperatorId::new(), "incomplete form").unwrap();
        rejected.reverse().unwrap();
        assert_eq!(rejected.status, ReservationStatus::Pending);
        assert!(rejected.reject_reason.is_none());
    }

    #[test]
    fn test_reverse_completed_fails() {
        let mut r = pending_reservation();
        r.approve(OperatorId::new()).unwrap();
        r.consume(TransactionId::new(), dec!(1000)).unwrap();
        assert!(r.reverse().is_err());
    }

    #[test]
    fn test_cancel_only_from_pending() {
        let mut r = pending_reservation();
        r.cancel().unwrap();
        assert_eq!(r.status, ReservationStatus::Cancelled);

        let mut approved = pending_reservation();
        approved.approve(OperatorId::new()).unwrap();
        assert!(approved.cancel().is_err());
    }

    #[test]
    fn test_transition_table_is_exact() {
        use ReservationStatus::*;
        let legal = [
            (Pending, Approved),
            (Pending, Rejected),
            (Pending, Cancelled),
            (Approved, Completed),
            (Approved, Pending),
            (Rejected, Pending),
        ];
        for from in [Pending, Approved, Rejected, Completed, Cancelled] {
            for to in [Pending, Approved, Rejected, Completed, Cancelled] {
                let expected = legal.contains(&(from, to));
                assert_eq!(
                    can_transition(from, to),
                    expected,
                    "transition {from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn test_covers() {
        let mut r = pending_reservation();
        assert!(!r.covers(dec!(1000)));
        r.approve(OperatorId::new()).unwrap();
        assert!(r.covers(dec!(2500000)));
        assert!(!r.covers(dec!(2500001)));
    }
}
