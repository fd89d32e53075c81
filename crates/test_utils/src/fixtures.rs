//! Pre-built test fixtures
//!
//! Ready-to-use test data for common entities across the exchange
//! platform, designed to be consistent and predictable for unit tests.
//! The seed rules mirror the filing thresholds the platform ships with: a
//! 2,000,000 THB CTR floor and a 5,000,000 THB trailing-30-day STR
//! cumulative.

use serde_json::json;
use std::collections::HashMap;
use uuid::Uuid;

use core_kernel::RuleId;
use domain_compliance::{Op, ReportType, RuleExpr, TriggerRule};
use domain_reporting::BranchCodes;

/// Fixture for branch regulatory identities
pub struct BranchFixtures;

impl BranchFixtures {
    /// The standard test branch: institution 001, branch 001
    pub fn silom() -> BranchCodes {
        BranchCodes {
            institution_code: "001".to_string(),
            branch_code: "001".to_string(),
            bot_sender_code: "C001".to_string(),
            bot_branch_area_code: "10".to_string(),
            license_no: "MC-123/2560".to_string(),
            license_holder: "Siam Exchange Co., Ltd.".to_string(),
            branch_name: "Silom Road Branch".to_string(),
        }
    }

    /// A second branch for cross-branch aggregate tests
    pub fn chiang_mai() -> BranchCodes {
        BranchCodes {
            institution_code: "001".to_string(),
            branch_code: "002".to_string(),
            bot_sender_code: "C002".to_string(),
            bot_branch_area_code: "50".to_string(),
            license_no: "MC-124/2560".to_string(),
            license_holder: "Siam Exchange Co., Ltd.".to_string(),
            branch_name: "Chiang Mai Nimman Branch".to_string(),
        }
    }
}

/// Fixture for customer identification data
pub struct CustomerFixtures;

impl CustomerFixtures {
    /// A Thai citizen id (13 digits, leading non-zero)
    pub fn thai_citizen_id() -> &'static str {
        "1234567890123"
    }

    /// A corporate registration number (13 digits, leading zero)
    pub fn corporate_registration() -> &'static str {
        "0105536041711"
    }

    /// A passport number
    pub fn passport() -> &'static str {
        "AB1234567"
    }

    pub fn name() -> &'static str {
        "Somchai Jaidee"
    }
}

/// Fixture for trigger rules
pub struct RuleFixtures;

impl RuleFixtures {
    /// CTR: cash transactions at or above 2,000,000 THB require approval
    pub fn ctr_threshold() -> TriggerRule {
        TriggerRule {
            id: RuleId::from_uuid(Uuid::from_u128(0x0101)),
            name: HashMap::from([
                ("en".to_string(), "CTR threshold 2M THB".to_string()),
                ("th".to_string(), "ธุรกรรมเงินสดเกิน 2 ล้านบาท".to_string()),
            ]),
            report_type: ReportType::Amlo101,
            expression: RuleExpr::predicate("local_amount", Op::Ge, json!("2000000")),
            priority: 100,
            allow_continue: false,
            warnings: HashMap::from([(
                "en".to_string(),
                "Cash transaction report (1-01) required".to_string(),
            )]),
            branch_id: None,
            active: true,
            branch_scope_aggregates: false,
        }
    }

    /// STR: trailing-30-day cumulative above 5,000,000 THB
    pub fn str_cumulative() -> TriggerRule {
        TriggerRule {
            id: RuleId::from_uuid(Uuid::from_u128(0x0103)),
            name: HashMap::from([(
                "en".to_string(),
                "STR cumulative 5M THB / 30 days".to_string(),
            )]),
            report_type: ReportType::Amlo103,
            expression: RuleExpr::predicate(
                "cumulative_with_current",
                Op::Gt,
                json!("5000000"),
            ),
            priority: 50,
            allow_continue: false,
            warnings: HashMap::from([(
                "en".to_string(),
                "Suspicious transaction report (1-03) required".to_string(),
            )]),
            branch_id: None,
            active: true,
            branch_scope_aggregates: false,
        }
    }

    /// An advisory rule that warns but lets the trade proceed
    pub fn advisory_frequency() -> TriggerRule {
        TriggerRule {
            id: RuleId::from_uuid(Uuid::from_u128(0x0199)),
            name: HashMap::from([(
                "en".to_string(),
                "High frequency advisory".to_string(),
            )]),
            report_type: ReportType::Amlo103,
            expression: RuleExpr::predicate("transaction_count_24h", Op::Ge, json!(5)),
            priority: 10,
            allow_continue: true,
            warnings: HashMap::from([(
                "en".to_string(),
                "Customer traded 5+ times in 24 hours".to_string(),
            )]),
            branch_id: None,
            active: true,
            branch_scope_aggregates: false,
        }
    }

    /// All seed rules together
    pub fn all() -> Vec<TriggerRule> {
        vec![
            Self::ctr_threshold(),
            Self::str_cumulative(),
            Self::advisory_frequency(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_branch_codes_validate() {
        BranchFixtures::silom().validate().unwrap();
        BranchFixtures::chiang_mai().validate().unwrap();
    }

    #[test]
    fn test_fixture_rules_have_valid_expressions() {
        for rule in RuleFixtures::all() {
            rule.expression.validate().unwrap();
        }
    }
}
