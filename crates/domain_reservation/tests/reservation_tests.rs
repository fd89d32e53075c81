//! Reservation lifecycle tests
//!
//! The envelope-and-audit flows as the services drive them, against the
//! pure aggregate.

use chrono::Utc;
use rust_decimal_macros::dec;
use serde_json::json;

use core_kernel::{BranchId, CurrencyId, OperatorId, ReservationId, TransactionId};
use domain_compliance::ReportType;
use domain_exchange::TradeDirection;
use domain_reservation::{Reservation, ReservationError, ReservationStatus};

fn reservation() -> Reservation {
    let now = Utc::now();
    Reservation {
        id: ReservationId::new(),
        reservation_no: "001-001-68-100007USD".to_string(),
        customer_id: "1234567890123".to_string(),
        customer_name: "Somchai Jaidee".to_string(),
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
        form_data: json!({ "id_type": "citizen" }),
        linked_transaction_id: None,
        created_at: now,
        updated_at: now,
    }
}

/// The envelope boundary: one satang under and exactly at the ceiling
/// pass, one satang over fails, and the failed attempt leaves the
/// envelope consumable.
#[test]
fn envelope_boundary_is_exact() {
    let mut under = reservation();
    under.approve(OperatorId::new()).unwrap();
    under.consume(TransactionId::new(), dec!(2499999.99)).unwrap();
    assert_eq!(under.status, ReservationStatus::Completed);

    let mut exact = reservation();
    exact.approve(OperatorId::new()).unwrap();
    exact.consume(TransactionId::new(), dec!(2500000)).unwrap();
    assert_eq!(exact.status, ReservationStatus::Completed);

    let mut over = reservation();
    over.approve(OperatorId::new()).unwrap();
    let err = over.consume(TransactionId::new(), dec!(2500000.01)).unwrap_err();
    assert!(matches!(
        err,
        ReservationError::AmountExceedsApproved { .. }
    ));
    assert_eq!(over.status, ReservationStatus::Approved);
    // Still consumable after the rejected attempt
    over.consume(TransactionId::new(), dec!(2000000)).unwrap();
}

/// Approve, reverse, approve again: the reservation cycles through
/// pending while its identity (and thus its issued report) is stable.
#[test]
fn reverse_and_reapprove_cycle() {
    let mut r = reservation();
    let first_auditor = OperatorId::new();
    r.approve(first_auditor).unwrap();
    assert_eq!(r.auditor_id, Some(first_auditor));

    r.reverse().unwrap();
    assert_eq!(r.status, ReservationStatus::Pending);
    assert!(r.auditor_id.is_none());
    assert!(r.audit_time.is_none());

    let second_auditor = OperatorId::new();
    r.approve(second_auditor).unwrap();
    assert_eq!(r.status, ReservationStatus::Approved);
    assert_eq!(r.auditor_id, Some(second_auditor));
    // Number never changes across the cycle
    assert_eq!(r.reservation_no, "001-001-68-100007USD");
}

/// A consumed reservation is frozen: no reversal, no second consumption,
/// no re-approval.
#[test]
fn completed_is_terminal() {
    let mut r = reservation();
    r.approve(OperatorId::new()).unwrap();
    r.consume(TransactionId::new(), dec!(1000)).unwrap();

    assert!(matches!(r.reverse(), Err(ReservationError::AlreadyConsumed)));
    assert!(matches!(
        r.consume(TransactionId::new(), dec!(1)),
        Err(ReservationError::AlreadyConsumed)
    ));
    assert!(r.approve(OperatorId::new()).is_err());
    assert!(r.cancel().is_err());
}

/// Rejection and the paper trail it leaves.
#[test]
fn rejection_records_reason_and_reopens() {
    let mut r = reservation();
    let auditor = OperatorId::new();
    r.reject(auditor, "customer refused to present id").unwrap();

    assert_eq!(r.status, ReservationStatus::Rejected);
    assert_eq!(r.auditor_id, Some(auditor));
    assert_eq!(
        r.reject_reason.as_deref(),
        Some("customer refused to present id")
    );

    // A rejected reservation can re-open for a second look
    r.reverse().unwrap();
    assert_eq!(r.status, ReservationStatus::Pending);
    assert!(r.reject_reason.is_none());
}

/// A cancelled reservation cannot be revived.
#[test]
fn cancelled_is_terminal() {
    let mut r = reservation();
    r.cancel().unwrap();
    assert!(r.approve(OperatorId::new()).is_err());
    assert!(r.reverse().is_err());
    assert!(r.consume(TransactionId::new(), dec!(1)).is_err());
}
