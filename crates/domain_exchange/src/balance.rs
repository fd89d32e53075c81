//! Balance semantics
//!
//! A balance row is the signed inventory of one currency at one branch.
//! Rows are created lazily at zero on first reference, mutated only under a
//! row lock, and every committed trade touches exactly two of them (the
//! foreign leg and the local leg) inside one database transaction.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{BranchId, CurrencyId};

/// Per-(branch, currency) inventory row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub branch_id: BranchId,
    pub currency_id: CurrencyId,
    /// Signed inventory amount; negative only when overdraw is allowed
    pub amount: Decimal,
    pub updated_at: DateTime<Utc>,
}

/// The before/after pair observed within the locked view of a mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceMutation {
    pub before: Decimal,
    pub after: Decimal,
}

impl BalanceMutation {
    /// The delta this mutation applied
    pub fn delta(&self) -> Decimal {
        self.after - self.before
    }
}

/// Orders two balance keys into the canonical lock order
///
/// Balance rows are always acquired in ascending `(branch_id, currency_id)`
/// order within a trade; taking them in any other order can deadlock
/// against a concurrent trade on the same pair.
pub fn lock_order(
    a: (BranchId, CurrencyId),
    b: (BranchId, CurrencyId),
) -> ((BranchId, CurrencyId), (BranchId, CurrencyId)) {
    if (a.0.as_uuid(), a.1.as_uuid()) <= (b.0.as_uuid(), b.1.as_uuid()) {
        (a, b)
    } else {
        (b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    #[test]
    fn test_mutation_delta() {
        let m = BalanceMutation {
            before: dec!(100.00),
            after: dec!(64.50),
        };
        assert_eq!(m.delta(), dec!(-35.50));
    }

    #[test]
    fn test_lock_order_is_symmetric() {
        let branch = BranchId::new();
        let low = CurrencyId::from_uuid(Uuid::from_u128(1));
        let high = CurrencyId::from_uuid(Uuid::from_u128(2));

        let forward = lock_order((branch, low), (branch, high));
        let backward = lock_order((branch, high), (branch, low));
        assert_eq!(forward, backward);
        assert_eq!(forward.0 .1, low);
    }

    #[test]
    fn test_lock_order_branch_takes_precedence() {
        let branch_low = BranchId::from_uuid(Uuid::from_u128(1));
        let branch_high = BranchId::from_uuid(Uuid::from_u128(2));
        let ccy_low = CurrencyId::from_uuid(Uuid::from_u128(1));
        let ccy_high = CurrencyId::from_uuid(Uuid::from_u128(9));

        let (first, _) = lock_order((branch_high, ccy_low), (branch_low, ccy_high));
        assert_eq!(first.0, branch_low);
    }
}
